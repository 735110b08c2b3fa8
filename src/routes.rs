use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::HeaderMap,
    middleware,
    response::Html,
    routing::{get, post},
};

use crate::{create, listing, session, state::AppState, template, transfer};

/// Build the full application router. Everything except `/` and `/login`
/// sits behind the session middleware; `/` checks the session itself so it
/// can fall back to the login page.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(index))
        .route("/login", get(session::get_login).post(session::post_login));

    let protected = Router::new()
        .route("/api/list", get(listing::api_list))
        .route("/api/create", post(create::api_create))
        .route(
            "/upload",
            post(transfer::post_upload).layer(DefaultBodyLimit::max(transfer::UPLOAD_BODY_LIMIT)),
        )
        .route("/download", get(transfer::get_download))
        .route("/download-zip", get(transfer::get_download_zip))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_session,
        ));

    Router::new().merge(public).merge(protected).with_state(state)
}

async fn index(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    if !state.gate.is_authorized(&headers) {
        return Html(template::login_page(None).into_string());
    }
    let folders = listing::all_folders(&state.root).await;
    let root = state.root.display().to_string();
    Html(template::main_page(&root, &folders).into_string())
}
