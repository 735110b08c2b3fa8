use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::io;

use crate::{
    error::AppError,
    paths::{self, ConfinedPath},
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    File,
    Directory,
}

/// Create an empty file or a directory at `target`.
///
/// Directories are created with all missing ancestors and succeed when
/// already present. Files get their parent created first and never replace
/// an existing entry.
pub async fn create(target: &ConfinedPath, kind: ItemKind) -> Result<(), AppError> {
    let path = target.as_path();
    match kind {
        ItemKind::Directory => {
            tokio::fs::create_dir_all(path).await?;
        }
        ItemKind::File => {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            if tokio::fs::symlink_metadata(path).await.is_ok() {
                return Err(AppError::AlreadyExists);
            }
            // create_new turns a concurrent duplicate into AlreadyExists
            // rather than a silent truncate.
            tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
                .await
                .map_err(|e| match e.kind() {
                    io::ErrorKind::AlreadyExists => AppError::AlreadyExists,
                    _ => AppError::Io(e),
                })?;
        }
    }
    Ok(())
}

// ── Handler ───────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub path: String,
    #[serde(default)]
    pub is_dir: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponse {
    pub path: String,
    pub is_dir: bool,
}

pub async fn api_create(
    State(state): State<AppState>,
    body: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateResponse>), AppError> {
    let Json(req) = body?;
    let target = paths::resolve(&state.root, &req.path)?;
    let kind = if req.is_dir {
        ItemKind::Directory
    } else {
        ItemKind::File
    };

    create(&target, kind).await?;
    tracing::info!("Created {:?} {:?}", kind, target.rel());

    Ok((
        StatusCode::CREATED,
        Json(CreateResponse {
            path: target.rel().to_string(),
            is_dir: req.is_dir,
        }),
    ))
}
