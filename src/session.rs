use axum::{
    Form,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

use crate::{error::AppError, state::AppState, template};

/// Session cookie name.
pub const SESSION_COOKIE: &str = "fileport_auth";

/// The one credential valid for this process run, and the password that
/// unlocks it. Both are fixed at construction.
pub struct SessionGate {
    password: String,
    token: String,
}

impl SessionGate {
    pub fn new(password: impl Into<String>) -> Self {
        Self::with_token(password, new_session_token())
    }

    pub fn with_token(password: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            token: token.into(),
        }
    }

    pub fn check_password(&self, submitted: &str) -> bool {
        !self.password.is_empty() && submitted == self.password
    }

    /// True iff the request carries the current token in its session cookie.
    pub fn is_authorized(&self, headers: &HeaderMap) -> bool {
        if self.token.is_empty() {
            return false;
        }
        extract_session_cookie(headers).is_some_and(|tok| tok == self.token)
    }

    /// `Set-Cookie` value: whole site, HTTP-only, expires with the browser session.
    pub fn cookie(&self) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE, self.token
        )
    }
}

// ── Middleware ────────────────────────────────────────────────────────────────

pub async fn require_session(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if state.gate.is_authorized(req.headers()) {
        return next.run(req).await;
    }
    AppError::Unauthorized.into_response()
}

// ── Login ─────────────────────────────────────────────────────────────────────

pub async fn get_login() -> Html<String> {
    Html(template::login_page(None).into_string())
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    password: String,
}

pub async fn post_login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    if state.gate.check_password(&form.password) {
        tracing::info!("Login accepted");
        return (
            StatusCode::SEE_OTHER,
            [
                (header::SET_COOKIE, state.gate.cookie()),
                (header::LOCATION, "/".to_string()),
            ],
        )
            .into_response();
    }

    tracing::warn!("Login rejected: wrong password");
    Html(template::login_page(Some("Wrong password, try again.")).into_string()).into_response()
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn extract_session_cookie(headers: &HeaderMap) -> Option<&str> {
    let prefix = format!("{}=", SESSION_COOKIE);
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .find_map(|part| part.trim().strip_prefix(prefix.as_str()))
}

fn new_session_token() -> String {
    use rand::{TryRngCore, rngs::OsRng};
    let mut bytes = [0u8; 16];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => bytes.iter().map(|b| format!("{:02x}", b)).collect(),
        Err(e) => {
            tracing::warn!(
                "Secure randomness unavailable ({}); session token is time-derived (degraded)",
                e
            );
            let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
            format!("tok_{}", nanos)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(cookie: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        h
    }

    #[test]
    fn token_is_random_hex() {
        let a = new_session_token();
        let b = new_session_token();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn authorizes_only_exact_token() {
        let gate = SessionGate::with_token("pw", "abc123");
        assert!(gate.is_authorized(&headers_with("fileport_auth=abc123")));
        assert!(gate.is_authorized(&headers_with("theme=dark; fileport_auth=abc123")));
        assert!(!gate.is_authorized(&headers_with("fileport_auth=abc1234")));
        assert!(!gate.is_authorized(&headers_with("fileport_auth=")));
        assert!(!gate.is_authorized(&headers_with("other=abc123")));
        assert!(!gate.is_authorized(&HeaderMap::new()));
    }

    #[test]
    fn fresh_gate_rejects_old_token() {
        let old = SessionGate::with_token("pw", "first-run");
        let restarted = SessionGate::new("pw");
        let h = headers_with(&format!("{}=first-run", SESSION_COOKIE));
        assert!(old.is_authorized(&h));
        assert!(!restarted.is_authorized(&h));
    }

    #[test]
    fn password_compared_verbatim() {
        let gate = SessionGate::with_token("0000", "t");
        assert!(gate.check_password("0000"));
        assert!(!gate.check_password(" 0000"));
        assert!(!gate.check_password(""));
    }

    #[test]
    fn cookie_is_site_wide_http_only() {
        let gate = SessionGate::with_token("pw", "t0k");
        let c = gate.cookie();
        assert!(c.starts_with("fileport_auth=t0k;"));
        assert!(c.contains("Path=/"));
        assert!(c.contains("HttpOnly"));
        assert!(!c.contains("Max-Age"));
    }
}
