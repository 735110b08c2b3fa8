use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::{io, path::Path};

use crate::{
    error::AppError,
    paths::{self, ConfinedPath},
    state::AppState,
};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub name: String,
    pub is_dir: bool,
    pub rel_path: String,
    /// Bytes; always 0 for directories.
    pub size: u64,
    pub mod_time: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListing {
    pub dir: String,
    pub display_path: String,
    pub entries: Vec<DirectoryEntry>,
    /// Children left out: unreadable metadata or a non-UTF-8 name.
    #[serde(skip)]
    pub skipped: Vec<String>,
}

/// List the immediate children of `dir`. Order is whatever the filesystem
/// returns.
pub async fn list(dir: &ConfinedPath) -> Result<DirectoryListing, AppError> {
    ensure_dir(dir.as_path()).await?;

    let mut read_dir = tokio::fs::read_dir(dir.as_path()).await?;
    let mut entries = Vec::new();
    let mut skipped = Vec::new();

    while let Some(entry) = read_dir.next_entry().await? {
        // A lossy name would give a relPath that never resolves back.
        let name = match entry.file_name().into_string() {
            Ok(n) => n,
            Err(raw) => {
                tracing::debug!("Skipping non-UTF-8 name {:?}", raw);
                skipped.push(raw.to_string_lossy().into_owned());
                continue;
            }
        };
        let meta = match entry.metadata().await {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!("Skipping {}: {}", entry.path().display(), e);
                skipped.push(name);
                continue;
            }
        };

        let is_dir = meta.is_dir();
        let mod_time = meta.modified().map(format_time).unwrap_or_default();

        entries.push(DirectoryEntry {
            rel_path: dir.child_rel(&name),
            name,
            is_dir,
            size: if is_dir { 0 } else { meta.len() },
            mod_time,
        });
    }

    Ok(DirectoryListing {
        dir: dir.rel().to_string(),
        display_path: dir.as_path().display().to_string(),
        entries,
        skipped,
    })
}

/// Fails with `NotADirectory` when `path` is missing or is not a directory.
pub async fn ensure_dir(path: &Path) -> Result<(), AppError> {
    match tokio::fs::metadata(path).await {
        Ok(m) if m.is_dir() => Ok(()),
        Ok(_) => Err(AppError::NotADirectory),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(AppError::NotADirectory),
        Err(e) => Err(AppError::Io(e)),
    }
}

/// Every directory below `root` (root excluded) as slash-separated relative
/// paths, sorted. Unreadable subtrees and non-UTF-8 paths are skipped.
pub async fn all_folders(root: &Path) -> Vec<String> {
    let root = root.to_path_buf();
    let walk = tokio::task::spawn_blocking(move || {
        let mut folders: Vec<String> = walkdir::WalkDir::new(&root)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .filter_map(|e| {
                e.path()
                    .strip_prefix(&root)
                    .ok()
                    .and_then(|rel| rel.to_str())
                    .map(|rel| rel.replace('\\', "/"))
            })
            .collect();
        folders.sort_unstable();
        folders
    });

    walk.await.unwrap_or_else(|e| {
        tracing::error!("Folder walk panicked: {}", e);
        Vec::new()
    })
}

fn format_time(t: std::time::SystemTime) -> String {
    DateTime::<Local>::from(t).to_rfc3339_opts(SecondsFormat::Secs, false)
}

// ── Handler ───────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct DirParam {
    #[serde(default)]
    pub dir: String,
}

pub async fn api_list(
    State(state): State<AppState>,
    query: Result<Query<DirParam>, QueryRejection>,
) -> Result<Json<DirectoryListing>, AppError> {
    let Query(params) = query?;
    let dir = paths::resolve(&state.root, &params.dir)?;
    let listing = list(&dir).await?;
    if !listing.skipped.is_empty() {
        tracing::debug!(
            "Listing of {:?} skipped {} entr(ies)",
            listing.dir,
            listing.skipped.len()
        );
    }
    Ok(Json(listing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn confined(root: &Path, rel: &str) -> ConfinedPath {
        paths::resolve(root, rel).unwrap()
    }

    #[tokio::test]
    async fn lists_files_and_dirs() {
        let tmp = TempDir::new().unwrap();
        let root = fs::canonicalize(tmp.path()).unwrap();
        fs::create_dir_all(root.join("docs/y")).unwrap();
        fs::write(root.join("docs/x.txt"), b"0123456789").unwrap();

        let listing = list(&confined(&root, "docs")).await.unwrap();
        assert_eq!(listing.dir, "docs");
        assert_eq!(listing.display_path, root.join("docs").display().to_string());

        let mut entries = listing.entries.clone();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].name, "x.txt");
        assert!(!entries[0].is_dir);
        assert_eq!(entries[0].rel_path, "docs/x.txt");
        assert_eq!(entries[0].size, 10);
        assert!(
            DateTime::parse_from_rfc3339(&entries[0].mod_time).is_ok(),
            "{}",
            entries[0].mod_time
        );

        assert_eq!(entries[1].name, "y");
        assert!(entries[1].is_dir);
        assert_eq!(entries[1].rel_path, "docs/y");
        assert_eq!(entries[1].size, 0);
    }

    #[tokio::test]
    async fn empty_directory_has_no_entries() {
        let tmp = TempDir::new().unwrap();
        let listing = list(&confined(tmp.path(), "")).await.unwrap();
        assert!(listing.entries.is_empty());
        assert_eq!(listing.dir, "");
    }

    #[tokio::test]
    async fn root_entries_have_bare_rel_paths() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), b"a").unwrap();
        let listing = list(&confined(tmp.path(), ".")).await.unwrap();
        assert_eq!(listing.entries[0].rel_path, "a.txt");
    }

    #[tokio::test]
    async fn missing_or_file_is_not_a_directory() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("f.txt"), b"x").unwrap();
        assert!(matches!(
            list(&confined(tmp.path(), "nope")).await,
            Err(AppError::NotADirectory)
        ));
        assert!(matches!(
            list(&confined(tmp.path(), "f.txt")).await,
            Err(AppError::NotADirectory)
        ));
    }

    #[tokio::test]
    async fn listing_json_shape() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), b"abc").unwrap();
        let listing = list(&confined(tmp.path(), "")).await.unwrap();
        let v = serde_json::to_value(&listing).unwrap();
        assert!(v.get("displayPath").is_some());
        assert!(v.get("skipped").is_none());
        let e = &v["entries"][0];
        assert_eq!(e["name"], "a.txt");
        assert_eq!(e["isDir"], false);
        assert_eq!(e["relPath"], "a.txt");
        assert_eq!(e["size"], 3);
        assert!(e["modTime"].is_string());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn non_utf8_names_are_skipped() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("ok.txt"), b"x").unwrap();
        fs::write(tmp.path().join(OsStr::from_bytes(b"bad\xff.txt")), b"y").unwrap();

        let listing = list(&confined(tmp.path(), "")).await.unwrap();
        let names: Vec<&str> = listing.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["ok.txt"]);
        assert_eq!(listing.skipped.len(), 1);
        assert!(listing.skipped[0].starts_with("bad"));
    }

    #[tokio::test]
    async fn all_folders_walks_recursively() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        fs::create_dir_all(tmp.path().join("c")).unwrap();
        fs::write(tmp.path().join("a/file.txt"), b"x").unwrap();
        assert_eq!(all_folders(tmp.path()).await, vec!["a", "a/b", "c"]);
    }
}
