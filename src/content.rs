//! File responses: whole file, single range, or `multipart/byteranges`.

use crate::error::AppError;
use crate::range::{ByteRange, ResponseShape};
use crate::response::HttpResponse;
use log::{debug, error, info};
use rand::Rng;
use std::fs::File;
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

const BOUNDARY_LEN: usize = 32;

/// Media type inferred from the file extension.
pub fn get_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("tif") | Some("tiff") => "image/tiff",
        Some("html") | Some("htm") => "text/html",
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

/// Random alphanumeric multipart boundary.
pub fn generate_boundary() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(BOUNDARY_LEN)
        .map(char::from)
        .collect()
}

/// Per-process streaming settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOptions {
    pub chunk_size: usize,
    /// Drawn once at startup so `HEAD` and `GET` announce the same `Content-Type`.
    pub boundary: String,
}

impl StreamOptions {
    pub fn new(chunk_size: usize) -> Self {
        StreamOptions {
            chunk_size,
            boundary: generate_boundary(),
        }
    }
}

/// Body layout matching a [`ResponseShape`] that carries content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileBody {
    Whole { len: u64 },
    Single(ByteRange),
    /// Each part is its framing prefix followed by the range's bytes.
    Multi {
        parts: Vec<(String, ByteRange)>,
        trailer: String,
    },
}

impl FileBody {
    pub fn content_length(&self) -> u64 {
        match self {
            FileBody::Whole { len } => *len,
            FileBody::Single(range) => range.len(),
            FileBody::Multi { parts, trailer } => {
                parts
                    .iter()
                    .map(|(prefix, range)| prefix.len() as u64 + range.len())
                    .sum::<u64>()
                    + trailer.len() as u64
            }
        }
    }
}

/// Status line, headers and body layout for one file response, before any I/O.
pub struct FileResponse {
    pub response: HttpResponse,
    pub body: FileBody,
}

impl FileResponse {
    /// Builds the response for `shape`. An unsatisfiable shape becomes
    /// `AppError::RangeNotSatisfiable`; a range outside the file is an internal error.
    pub fn prepare(
        path: &Path,
        file_size: u64,
        shape: ResponseShape,
        boundary: &str,
    ) -> Result<Self, AppError> {
        let mime_type = get_mime_type(path);
        let (status_code, status_text) = shape.status();
        let response = HttpResponse::new(status_code, status_text);

        let (response, body) = match shape {
            ResponseShape::Unsatisfiable => return Err(AppError::RangeNotSatisfiable(file_size)),
            ResponseShape::Whole => (
                response.with_body(Vec::new(), mime_type),
                FileBody::Whole { len: file_size },
            ),
            ResponseShape::SinglePart(range) => {
                check_range(&range, file_size)?;
                (
                    response
                        .with_body(Vec::new(), mime_type)
                        .add_header("Content-Range", range.content_range(file_size)),
                    FileBody::Single(range),
                )
            }
            ResponseShape::MultiPart(ranges) => {
                let mut parts = Vec::with_capacity(ranges.len());
                for range in ranges.iter() {
                    check_range(range, file_size)?;
                    let prefix = format!(
                        "\r\n--{boundary}\r\nContent-Type: {mime_type}\r\nContent-Range: {}\r\n\r\n",
                        range.content_range(file_size)
                    );
                    parts.push((prefix, *range));
                }
                (
                    response.with_body(
                        Vec::new(),
                        &format!("multipart/byteranges; boundary={boundary}"),
                    ),
                    FileBody::Multi {
                        parts,
                        trailer: format!("\r\n--{boundary}--\r\n"),
                    },
                )
            }
        };

        Ok(FileResponse { response, body })
    }
}

fn check_range(range: &ByteRange, file_size: u64) -> Result<(), AppError> {
    if range.start > range.end || range.end >= file_size {
        error!(
            "Refusing range {}-{} for file of {} bytes",
            range.start, range.end, file_size
        );
        return Err(AppError::InternalServerError(format!(
            "invalid byte range {}-{} for {} byte file",
            range.start, range.end, file_size
        )));
    }
    Ok(())
}

/// Serves a file that resolved with `file_size` bytes.
///
/// Every failure before the headers are written is returned untouched so the
/// caller can answer with an error status. Once headers are out, an I/O error
/// only aborts the connection.
pub fn serve_file<W: Write>(
    stream: &mut W,
    path: &Path,
    file_size: u64,
    range_header: Option<&str>,
    head_only: bool,
    options: &StreamOptions,
    log_prefix: &str,
) -> Result<(), AppError> {
    info!("{} serve_file started for: '{}'", log_prefix, path.display());

    let shape = ResponseShape::plan(range_header, file_size);
    if let Some(header) = range_header {
        debug!("{log_prefix} Range header '{header}' planned as {shape:?}");
    }

    let FileResponse { response, body } =
        FileResponse::prepare(path, file_size, shape, &options.boundary)?;

    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(AppError::NotFound),
        Err(e) => return Err(AppError::Io(e)),
    };

    response.send_head(stream, body.content_length(), log_prefix)?;
    if !head_only {
        write_body(&mut file, stream, &body, options.chunk_size).map_err(|e| {
            error!("{log_prefix} Aborting response for '{}': {e}", path.display());
            AppError::ResponseAborted(e)
        })?;
    }
    stream.flush().map_err(AppError::ResponseAborted)?;

    info!("{} serve_file finished for: '{}'", log_prefix, path.display());
    Ok(())
}

/// Streams `body` from `file` in chunks of at most `chunk_size` bytes.
pub fn write_body<R: Read + Seek, W: Write>(
    file: &mut R,
    stream: &mut W,
    body: &FileBody,
    chunk_size: usize,
) -> io::Result<()> {
    let mut buffer = vec![0; chunk_size.max(1)];
    match body {
        FileBody::Whole { len } => copy_range(file, stream, 0, *len, &mut buffer),
        FileBody::Single(range) => copy_range(file, stream, range.start, range.len(), &mut buffer),
        FileBody::Multi { parts, trailer } => {
            for (prefix, range) in parts {
                stream.write_all(prefix.as_bytes())?;
                copy_range(file, stream, range.start, range.len(), &mut buffer)?;
            }
            stream.write_all(trailer.as_bytes())
        }
    }
}

fn copy_range<R: Read + Seek, W: Write>(
    file: &mut R,
    stream: &mut W,
    start: u64,
    len: u64,
    buffer: &mut [u8],
) -> io::Result<()> {
    file.seek(SeekFrom::Start(start))?;

    let mut bytes_remaining = len;
    while bytes_remaining > 0 {
        let to_read = std::cmp::min(bytes_remaining, buffer.len() as u64) as usize;
        let bytes_read = match file.read(&mut buffer[..to_read]) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if bytes_read == 0 {
            // The file shrank after its size was taken; the announced length can't be met.
            return Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("file ended with {bytes_remaining} bytes left to send"),
            ));
        }
        stream.write_all(&buffer[..bytes_read])?;
        bytes_remaining -= bytes_read as u64;
    }
    Ok(())
}
