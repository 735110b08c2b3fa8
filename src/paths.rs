//! Confinement of client-supplied relative paths to the served root.
//!
//! Resolution is pure path arithmetic: nothing here touches the filesystem,
//! so existence and kind checks are left to the calling operation.

use std::path::{Component, Path, PathBuf};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PathError {
    #[error("path contains '..'")]
    ContainsParent,
    #[error("path escapes root")]
    EscapesRoot,
}

/// An absolute path proven to lie inside the root, together with the
/// slash-separated relative form it was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfinedPath {
    abs: PathBuf,
    rel: String,
}

impl ConfinedPath {
    pub fn as_path(&self) -> &Path {
        &self.abs
    }

    /// Normalized relative path; empty for the root itself.
    pub fn rel(&self) -> &str {
        &self.rel
    }

    pub fn is_root(&self) -> bool {
        self.rel.is_empty()
    }

    /// Relative path of a direct child named `name`.
    pub fn child_rel(&self, name: &str) -> String {
        if self.rel.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.rel, name)
        }
    }
}

/// Resolve `input` against `root`, which must already be absolute.
///
/// Any occurrence of `..` is rejected, including inside an ordinary file
/// name such as `report..final.txt`.
pub fn resolve(root: &Path, input: &str) -> Result<ConfinedPath, PathError> {
    let normalized = input.replace('\\', "/");
    let normalized = normalized.trim();

    if normalized.contains("..") {
        return Err(PathError::ContainsParent);
    }

    let mut abs = root.to_path_buf();
    let mut segments: Vec<&str> = Vec::new();

    for component in Path::new(normalized.trim_start_matches('/')).components() {
        match component {
            Component::Normal(seg) => {
                let seg = seg.to_str().ok_or(PathError::EscapesRoot)?;
                abs.push(seg);
                segments.push(seg);
            }
            Component::CurDir => {}
            // `..` was rejected above; a prefix or root here means the input
            // named an absolute location of its own.
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(PathError::EscapesRoot);
            }
        }
    }

    if !abs.starts_with(root) {
        return Err(PathError::EscapesRoot);
    }

    Ok(ConfinedPath {
        abs,
        rel: segments.join("/"),
    })
}
