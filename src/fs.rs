use crate::error::AppError;
use crate::resolver::ServerRoot;
use crate::templates::{ListingRow, TemplateEngine};
use crate::utils::query_flag;
use log::{debug, warn};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

// Entries at or above this size need ZIP64 headers.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Representation requested for a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryMode {
    Html,
    Json,
    Zip,
}

impl DirectoryMode {
    /// `zip=true` wins over `list=true`; neither means HTML.
    pub fn from_query(query: &str) -> Self {
        if query_flag(query, "zip") {
            DirectoryMode::Zip
        } else if query_flag(query, "list") {
            DirectoryMode::Json
        } else {
            DirectoryMode::Html
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    pub name: String,
    pub size: u64,
}

/// Immediate children of one directory. Both lists are sorted by byte order,
/// independent of locale and case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    pub directories: Vec<String>,
    pub files: Vec<ListedFile>,
}

#[derive(Serialize)]
struct JsonListing<'a> {
    files: Vec<&'a str>,
    directories: Vec<&'a str>,
}

impl DirectoryListing {
    /// Reads `path` non-recursively. Symlinks are classified by their target.
    pub fn read(path: &Path) -> Result<Self, AppError> {
        debug!("Reading directory: '{}'", path.display());

        let mut listing = DirectoryListing::default();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!("Skipping non-UTF-8 name {raw:?} in '{}'", path.display());
                    continue;
                }
            };
            // Broken symlinks have no target metadata; list them as empty files.
            let metadata = fs::metadata(entry.path()).or_else(|_| entry.metadata())?;

            if metadata.is_dir() {
                listing.directories.push(name);
            } else {
                listing.files.push(ListedFile {
                    name,
                    size: metadata.len(),
                });
            }
        }

        listing.directories.sort();
        listing.files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }

    /// HTML page: subdirectories first, then files with their size in MiB.
    pub fn to_html(&self, request_path: &str) -> Result<String, AppError> {
        let rows = self
            .directories
            .iter()
            .map(|name| ListingRow::Directory(name.as_str()))
            .chain(self.files.iter().map(|file| ListingRow::File {
                name: file.name.as_str(),
                size: file.size,
            }))
            .collect::<Vec<_>>();

        let display_path = if request_path.is_empty() {
            "/"
        } else {
            request_path
        };
        TemplateEngine::new().render_directory_listing(display_path, &rows)
    }

    /// `{"files": [...], "directories": [...]}` pretty-printed with a two-space indent.
    pub fn to_json(&self) -> Result<String, AppError> {
        let listing = JsonListing {
            files: self.files.iter().map(|file| file.name.as_str()).collect(),
            directories: self.directories.iter().map(String::as_str).collect(),
        };
        Ok(serde_json::to_string_pretty(&listing)?)
    }
}

/// Builds a deflate-compressed ZIP of every regular file under `dir` in memory.
///
/// Entry names are paths relative to `dir` joined with `/`, visited depth-first
/// with siblings sorted by name. Symlinked files are included only when their
/// target lies inside `root`; symlinked directories are not descended into.
pub fn build_zip_archive(root: &ServerRoot, dir: &Path) -> Result<Vec<u8>, AppError> {
    debug!("Creating ZIP for directory: '{}'", dir.display());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut entry_count = 0usize;

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let canonical = path.canonicalize()?;
        if !root.contains(&canonical) {
            warn!(
                "Leaving '{}' out of ZIP: it resolves outside the root to '{}'",
                path.display(),
                canonical.display()
            );
            continue;
        }

        let relative = path.strip_prefix(dir).map_err(|_| {
            AppError::InternalServerError(format!(
                "'{}' is outside '{}'",
                path.display(),
                dir.display()
            ))
        })?;
        let Some(archive_name) = relative
            .components()
            .map(|component| component.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.join("/"))
        else {
            warn!("Leaving non-UTF-8 path '{}' out of ZIP", path.display());
            continue;
        };

        let mut file = File::open(&canonical)?;
        let size = file.metadata()?.len();
        debug!("Adding to ZIP: {archive_name} ({size} bytes)");

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(size >= ZIP64_THRESHOLD);
        zip.start_file(archive_name, options)?;
        io::copy(&mut file, &mut zip)?;
        entry_count += 1;
    }

    let data = zip.finish()?.into_inner();
    debug!(
        "ZIP for '{}' holds {} entries, {} bytes",
        dir.display(),
        entry_count,
        data.len()
    );
    Ok(data)
}

/// Same as [`build_zip_archive`], but every failure is reported as a 500 with its message.
pub fn zip_directory(root: &ServerRoot, dir: &Path) -> Result<Vec<u8>, AppError> {
    build_zip_archive(root, dir).map_err(|e| {
        warn!("Failed to zip '{}': {e}", dir.display());
        match e {
            AppError::InternalServerError(_) => e,
            other => AppError::InternalServerError(other.to_string()),
        }
    })
}
