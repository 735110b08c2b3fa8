use axum::{
    body::Body,
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::Response,
};
use std::{
    fs::File,
    io::{self, Write},
    path::Path,
};
use tokio_util::io::{ReaderStream, SyncIoBridge};
use walkdir::WalkDir;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use super::attachment_disposition;
use crate::{
    error::AppError,
    listing::{DirParam, ensure_dir},
    paths::{self, ConfinedPath},
    state::AppState,
};

/// Pipe capacity between the archive writer and the response body.
const PIPE_CAPACITY: usize = 64 * 1024;

/// Archive name used when exporting the root itself.
const ROOT_ARCHIVE_NAME: &str = "root";

/// Entries at or above this size get zip64 headers. Kept a little under
/// `u32::MAX` so a file that grows while being read still fits.
const ZIP64_THRESHOLD: u64 = 0xFFF0_0000;

fn needs_zip64(len: u64) -> bool {
    len >= ZIP64_THRESHOLD
}

fn entry_options(len: u64) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(needs_zip64(len))
}

/// Stream every regular file below `src` into a zip written to `sink`,
/// returning the number of entries.
///
/// Unreadable walk entries and files that cannot be opened are skipped. A
/// failure while copying or writing stops the archive where it is; whatever
/// reached `sink` already stays there.
pub fn write_archive<W: Write>(src: &Path, sink: W) -> zip::result::ZipResult<usize> {
    let mut zip = ZipWriter::new_stream(sink);
    let mut count = 0;

    for entry in WalkDir::new(src).min_depth(1) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!("Zip walk skipped entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(rel) = entry.path().strip_prefix(src) else {
            continue;
        };
        let name = rel.to_string_lossy().replace('\\', "/");

        let mut file = match File::open(entry.path()) {
            Ok(f) => f,
            Err(e) => {
                tracing::debug!("Zip skipped {}: {}", entry.path().display(), e);
                continue;
            }
        };

        // Unknown length is treated as large.
        let len = file.metadata().map(|m| m.len()).unwrap_or(u64::MAX);
        zip.start_file(name, entry_options(len))?;
        io::copy(&mut file, &mut zip)?;
        count += 1;
    }

    zip.finish()?;
    Ok(count)
}

fn archive_name(dir: &ConfinedPath) -> String {
    let base = if dir.is_root() {
        None
    } else {
        dir.as_path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty() && n != ".")
    };
    format!("{}.zip", base.as_deref().unwrap_or(ROOT_ARCHIVE_NAME))
}

/// Start exporting `dir`; the returned body is produced while it is read.
pub async fn zip_export(dir: &ConfinedPath) -> Result<Body, AppError> {
    ensure_dir(dir.as_path()).await?;

    let (reader, writer) = tokio::io::duplex(PIPE_CAPACITY);
    let sink = SyncIoBridge::new(writer);
    let src = dir.as_path().to_path_buf();

    tokio::task::spawn_blocking(move || match write_archive(&src, sink) {
        Ok(count) => {
            tracing::debug!("Zip of {} finished: {} entries", src.display(), count);
        }
        // Usually the client went away; the response is already truncated.
        Err(e) => {
            tracing::warn!("Zip of {} stopped early: {}", src.display(), e);
        }
    });

    Ok(Body::from_stream(ReaderStream::new(reader)))
}

pub async fn get_download_zip(
    State(state): State<AppState>,
    query: Result<Query<DirParam>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = query?;
    let dir = paths::resolve(&state.root, &params.dir)?;
    let body = zip_export(&dir).await?;
    let name = archive_name(&dir);
    tracing::info!("Zip export {:?} as {}", dir.rel(), name);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(header::CONTENT_DISPOSITION, attachment_disposition(&name))
        .body(body)
        .map_err(|e| AppError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, io::{Cursor, Read}};
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn entry_names(bytes: Vec<u8>) -> Vec<String> {
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_owned).collect();
        names.sort();
        names
    }

    #[test]
    fn archives_files_with_slash_names() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("sub/empty")).unwrap();
        fs::write(tmp.path().join("a.txt"), b"a").unwrap();
        fs::write(tmp.path().join("sub/b.txt"), b"bee").unwrap();

        let mut out = Vec::new();
        let count = write_archive(tmp.path(), &mut out).unwrap();
        assert_eq!(count, 2);
        assert_eq!(entry_names(out), vec!["a.txt", "sub/b.txt"]);
    }

    #[test]
    fn archived_content_matches_source() {
        let tmp = TempDir::new().unwrap();
        let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(tmp.path().join("big.bin"), &payload).unwrap();

        let mut out = Vec::new();
        write_archive(tmp.path(), &mut out).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(out)).unwrap();
        let mut entry = archive.by_name("big.bin").unwrap();
        let mut back = Vec::new();
        entry.read_to_end(&mut back).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn empty_directory_gives_empty_archive() {
        let tmp = TempDir::new().unwrap();
        let mut out = Vec::new();
        assert_eq!(write_archive(tmp.path(), &mut out).unwrap(), 0);
        assert!(entry_names(out).is_empty());
    }

    #[test]
    fn failing_sink_stops_archive() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "client gone"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), b"a").unwrap();
        assert!(write_archive(tmp.path(), Broken).is_err());
    }

    #[test]
    fn large_entries_use_zip64() {
        assert!(!needs_zip64(0));
        assert!(!needs_zip64(1 << 30));
        assert!(needs_zip64(u64::from(u32::MAX)));
        assert!(needs_zip64(5 << 30));
        assert!(needs_zip64(u64::MAX));
        assert!(ZIP64_THRESHOLD < u64::from(u32::MAX));
    }

    // Writes a 4 GiB+ sparse file through deflate; slow, run with --ignored.
    #[test]
    #[ignore]
    fn archives_file_past_four_gib() {
        let tmp = TempDir::new().unwrap();
        let big = File::create(tmp.path().join("huge.bin")).unwrap();
        big.set_len((4 << 30) + 4096).unwrap();
        drop(big);

        let count = write_archive(tmp.path(), io::sink()).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn archive_names() {
        let tmp = TempDir::new().unwrap();
        let root = paths::resolve(tmp.path(), "").unwrap();
        assert_eq!(archive_name(&root), "root.zip");
        let photos = paths::resolve(tmp.path(), "trips/photos").unwrap();
        assert_eq!(archive_name(&photos), "photos.zip");
    }

    #[tokio::test]
    async fn export_refuses_non_directories() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("f.txt"), b"x").unwrap();
        for rel in ["f.txt", "missing"] {
            let target = paths::resolve(tmp.path(), rel).unwrap();
            assert!(matches!(zip_export(&target).await, Err(AppError::NotADirectory)));
        }
    }
}
