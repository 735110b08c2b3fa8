use axum::{
    body::Bytes,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use std::{
    fmt,
    path::{Path, PathBuf},
};

use crate::{
    error::AppError,
    paths::{self, ConfinedPath},
    state::AppState,
};

/// Ceiling for a whole upload request body.
pub const UPLOAD_BODY_LIMIT: usize = 32 * 1024 * 1024;

pub struct IncomingFile {
    /// File name as submitted by the client, possibly with directory parts.
    pub file_name: String,
    pub data: Bytes,
}

#[derive(Debug)]
pub enum FileOutcome {
    Ok { name: String, dest: PathBuf },
    Failed { name: String, reason: String },
}

#[derive(Debug)]
pub struct UploadReport {
    pub target_dir: PathBuf,
    pub outcomes: Vec<FileOutcome>,
}

impl fmt::Display for UploadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Target directory:\n{}\n", self.target_dir.display())?;
        writeln!(f, "Received {} file(s):\n", self.outcomes.len())?;
        for outcome in &self.outcomes {
            match outcome {
                FileOutcome::Ok { name, dest } => {
                    writeln!(f, "OK: {} -> {}", name, dest.display())?;
                }
                FileOutcome::Failed { name, reason } => {
                    writeln!(f, "FAILED: {} ({})", name, reason)?;
                }
            }
        }
        Ok(())
    }
}

/// Write every file into `target`. Individual failures land in the report;
/// only a missing batch or an uncreatable target directory aborts.
pub async fn upload(
    target: &ConfinedPath,
    files: Vec<IncomingFile>,
) -> Result<UploadReport, AppError> {
    tokio::fs::create_dir_all(target.as_path()).await?;

    if files.is_empty() {
        return Err(AppError::BadRequest("no files uploaded".to_string()));
    }

    let mut outcomes = Vec::with_capacity(files.len());
    for file in files {
        let name = file.file_name.clone();
        let outcome = match store(target.as_path(), &file).await {
            Ok(dest) => FileOutcome::Ok { name, dest },
            Err(reason) => {
                tracing::warn!("Upload of {:?} failed: {}", name, reason);
                FileOutcome::Failed { name, reason }
            }
        };
        outcomes.push(outcome);
    }

    Ok(UploadReport {
        target_dir: target.as_path().to_path_buf(),
        outcomes,
    })
}

async fn store(dir: &Path, file: &IncomingFile) -> Result<PathBuf, String> {
    let base = base_name(&file.file_name).ok_or_else(|| "invalid file name".to_string())?;
    let dest = dir.join(base);

    let mut out = tokio::fs::File::create(&dest)
        .await
        .map_err(|e| e.to_string())?;
    let mut src: &[u8] = &file.data;
    tokio::io::copy(&mut src, &mut out)
        .await
        .map_err(|e| e.to_string())?;
    Ok(dest)
}

/// Last path component of a submitted file name; `None` when nothing usable
/// remains.
fn base_name(submitted: &str) -> Option<&str> {
    let base = submitted.rsplit(['/', '\\']).next()?.trim();
    match base {
        "" | "." | ".." => None,
        b => Some(b),
    }
}

// ── Handler ───────────────────────────────────────────────────────────────────

pub async fn post_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > UPLOAD_BODY_LIMIT) {
        return Err(AppError::PayloadTooLarge);
    }

    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;

    // The browser may send `target` after the files, so the whole form is
    // collected before anything touches the disk.
    let mut target_rel = String::new();
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(str::to_owned);
        match field_name.as_deref() {
            Some("files") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                files.push(IncomingFile { file_name, data });
            }
            Some("target") => target_rel = field.text().await?,
            _ => {}
        }
    }

    let target = paths::resolve(&state.root, &target_rel)?;
    let report = upload(&target, files).await?;
    tracing::info!(
        "Upload into {:?}: {} file(s)",
        target.rel(),
        report.outcomes.len()
    );

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        report.to_string(),
    )
        .into_response())
}
