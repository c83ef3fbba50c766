//! Maps request paths onto the served directory tree.
//!
//! Containment is checked only after percent-decoding and canonicalization, so
//! encoded separators and dot segments cannot slip past the check.

use crate::error::AppError;
use log::debug;
use percent_encoding::percent_decode_str;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// The canonical directory every resolved path must live under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRoot(PathBuf);

impl ServerRoot {
    /// Canonicalizes `dir` and checks that it is a directory.
    pub fn new(dir: &Path) -> Result<Self, AppError> {
        let canonical = dir
            .canonicalize()
            .map_err(|_| AppError::DirectoryNotFound(dir.to_string_lossy().into_owned()))?;
        if !canonical.is_dir() {
            return Err(AppError::DirectoryNotFound(
                dir.to_string_lossy().into_owned(),
            ));
        }
        Ok(ServerRoot(canonical))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// True when `path` is the root or lies beneath it. `path` should be canonical.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.0)
    }
}

/// Outcome of mapping a request path to the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedPath {
    /// A file and its size at resolution time. The size is used for the whole response.
    File { path: PathBuf, len: u64 },
    Directory { path: PathBuf },
    NotFound,
}

/// Resolves a request target (path, optionally with query and fragment) under `root`.
///
/// Returns `AppError::Forbidden` when the decoded, canonicalized path is not the
/// root or one of its descendants, and `AppError::InvalidPath` when the decoded
/// bytes are not UTF-8.
pub fn resolve(root: &ServerRoot, request_path: &str) -> Result<ResolvedPath, AppError> {
    let decoded = decode_request_path(request_path)?;
    let joined = root.path().join(decoded.trim_start_matches('/'));

    let canonical = match joined.canonicalize() {
        Ok(canonical) => canonical,
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
            // Nothing to canonicalize; still refuse names that point outside the root.
            if !root.contains(&normalize_lexically(&joined)) {
                debug!("Rejected non-existent path outside root: '{decoded}'");
                return Err(AppError::Forbidden);
            }
            return Ok(ResolvedPath::NotFound);
        }
        Err(e) if e.kind() == ErrorKind::InvalidInput => return Err(AppError::InvalidPath),
        Err(e) => return Err(AppError::Io(e)),
    };

    if !root.contains(&canonical) {
        debug!(
            "Rejected path '{}' resolving to '{}'",
            decoded,
            canonical.display()
        );
        return Err(AppError::Forbidden);
    }

    match fs::metadata(&canonical) {
        Ok(meta) if meta.is_dir() => Ok(ResolvedPath::Directory { path: canonical }),
        Ok(meta) => Ok(ResolvedPath::File {
            path: canonical,
            len: meta.len(),
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(ResolvedPath::NotFound),
        Err(e) => Err(AppError::Io(e)),
    }
}

/// Strips query and fragment, then percent-decodes the remaining path.
pub fn decode_request_path(request_path: &str) -> Result<String, AppError> {
    let path = request_path
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    percent_decode_str(path)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| AppError::InvalidPath)
}

// Resolves `.` and `..` without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
