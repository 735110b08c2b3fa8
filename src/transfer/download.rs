use axum::{
    body::Body,
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::Response,
};
use std::io;
use tokio_util::io::ReaderStream;

use super::{FileParam, attachment_disposition};
use crate::{
    error::AppError,
    paths::{self, ConfinedPath},
    state::AppState,
};

/// Open a regular file for download, returning it with its length.
pub async fn open_file(file: &ConfinedPath) -> Result<(tokio::fs::File, u64), AppError> {
    let meta = tokio::fs::metadata(file.as_path()).await.map_err(io_err)?;
    if meta.is_dir() {
        return Err(AppError::IsADirectory);
    }
    let handle = tokio::fs::File::open(file.as_path()).await.map_err(io_err)?;
    Ok((handle, meta.len()))
}

pub async fn get_download(
    State(state): State<AppState>,
    query: Result<Query<FileParam>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = query?;
    let target = paths::resolve(&state.root, &params.file)?;
    let (file, content_length) = open_file(&target).await?;

    let file_name = target
        .as_path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());

    let mime: &'static str = mime_guess::from_path(target.as_path())
        .first_raw()
        .unwrap_or("application/octet-stream");

    tracing::info!("Download {:?} ({} bytes)", target.rel(), content_length);
    let body = Body::from_stream(ReaderStream::new(file));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime)
        .header(header::CONTENT_LENGTH, content_length)
        .header(header::CONTENT_DISPOSITION, attachment_disposition(&file_name))
        .body(body)
        .map_err(|e| AppError::Internal(e.to_string()))
}

fn io_err(e: io::Error) -> AppError {
    if e.kind() == io::ErrorKind::NotFound {
        AppError::NotFound
    } else {
        AppError::Io(e)
    }
}
