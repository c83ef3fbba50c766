use crate::content::{serve_file, StreamOptions};
use crate::error::AppError;
use crate::fs::{zip_directory, DirectoryListing, DirectoryMode};
use crate::resolver::{decode_request_path, resolve, ResolvedPath, ServerRoot};
use crate::response::{create_error_response, preflight_response, HttpResponse};
use crate::utils::{archive_name, split_target};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::path::Path;

/// Immutable per-process state shared by every worker.
#[derive(Debug, Clone)]
pub struct ServerContext {
    pub root: ServerRoot,
    pub stream: StreamOptions,
}

/// A parsed request head. Header names are stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub target: String,
    pub headers: HashMap<String, String>,
}

impl Request {
    /// Reads the request line and headers. Returns `Ok(None)` when the peer
    /// closed the connection without sending anything.
    pub fn read_from<R: BufRead>(reader: R) -> Result<Option<Self>, AppError> {
        let mut lines_iter = reader.lines();

        let request_line = match lines_iter.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => return Err(AppError::Io(e)),
            None => return Ok(None),
        };

        let mut parts = request_line.split_whitespace();
        let (method, target) = match (parts.next(), parts.next(), parts.next()) {
            (Some(method), Some(target), Some(version)) if version.starts_with("HTTP/") => {
                (method.to_string(), target.to_string())
            }
            _ => return Err(AppError::BadRequest),
        };

        let mut headers = HashMap::new();
        for line in lines_iter {
            let line = line?;
            if line.is_empty() {
                break;
            }
            match line.split_once(':') {
                Some((key, value)) => {
                    headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
                }
                None => return Err(AppError::BadRequest),
            }
        }

        Ok(Some(Request {
            method,
            target,
            headers,
        }))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_head(&self) -> bool {
        self.method == "HEAD"
    }
}

/// Handles a single client connection: one request, one response.
pub fn handle_client(
    mut stream: TcpStream,
    ctx: &ServerContext,
    log_prefix: &str,
) -> Result<(), AppError> {
    let request = match Request::read_from(BufReader::new(&stream)) {
        Ok(Some(request)) => request,
        Ok(None) => {
            debug!("{log_prefix} Connection closed before a request arrived");
            return Ok(());
        }
        Err(e) => {
            warn!("{log_prefix} Malformed request: {e}");
            return create_error_response(&AppError::BadRequest).send(&mut stream, false, log_prefix);
        }
    };

    info!("{} {} {}", log_prefix, request.method, request.target);
    respond(&mut stream, &request, ctx, log_prefix)
}

/// Routes `request` and writes the response, turning errors raised before any
/// bytes were sent into error responses.
pub fn respond<W: Write>(
    stream: &mut W,
    request: &Request,
    ctx: &ServerContext,
    log_prefix: &str,
) -> Result<(), AppError> {
    match route(stream, request, ctx, log_prefix) {
        Ok(()) => Ok(()),
        Err(e) if e.is_response_aborted() => {
            error!("{log_prefix} {e}");
            Err(e)
        }
        Err(e) => {
            let (status_code, _) = e.status();
            if status_code >= 500 {
                error!("{log_prefix} {} {} failed: {e}", request.method, request.target);
            } else {
                debug!("{log_prefix} {} {} -> {status_code}: {e}", request.method, request.target);
            }
            create_error_response(&e).send(stream, request.is_head(), log_prefix)
        }
    }
}

fn route<W: Write>(
    stream: &mut W,
    request: &Request,
    ctx: &ServerContext,
    log_prefix: &str,
) -> Result<(), AppError> {
    match request.method.as_str() {
        "OPTIONS" => preflight_response().send(stream, false, log_prefix),
        "GET" | "HEAD" => serve_path(stream, request, ctx, log_prefix),
        _ => Err(AppError::MethodNotAllowed),
    }
}

fn serve_path<W: Write>(
    stream: &mut W,
    request: &Request,
    ctx: &ServerContext,
    log_prefix: &str,
) -> Result<(), AppError> {
    let (path, query) = split_target(&request.target);

    let resolved = resolve(&ctx.root, path).inspect_err(|e| {
        if matches!(e, AppError::Forbidden) {
            warn!(
                "{} Potential path traversal attempt: '{}'",
                log_prefix, request.target
            );
        }
    })?;

    match resolved {
        ResolvedPath::NotFound => Err(AppError::NotFound),
        ResolvedPath::File { path: file_path, len } => serve_file(
            stream,
            &file_path,
            len,
            request.header("range"),
            request.is_head(),
            &ctx.stream,
            log_prefix,
        ),
        ResolvedPath::Directory { path: dir_path } => {
            let display_path = decode_request_path(path)?;
            serve_directory(
                stream,
                &ctx.root,
                &dir_path,
                &display_path,
                DirectoryMode::from_query(query),
                request.is_head(),
                log_prefix,
            )
        }
    }
}

/// Serves a directory as an HTML page, a JSON listing or a ZIP archive.
fn serve_directory<W: Write>(
    stream: &mut W,
    root: &ServerRoot,
    dir_path: &Path,
    request_path: &str,
    mode: DirectoryMode,
    head_only: bool,
    log_prefix: &str,
) -> Result<(), AppError> {
    info!(
        "{} serve_directory ({:?}) started for: '{}'",
        log_prefix,
        mode,
        dir_path.display()
    );

    let response = match mode {
        DirectoryMode::Zip => {
            let data = zip_directory(root, dir_path)?;
            info!(
                "{} Sending ZIP of '{}', {} bytes",
                log_prefix,
                dir_path.display(),
                data.len()
            );
            HttpResponse::new(200, "OK")
                .with_body(data, "application/zip")
                .add_header(
                    "Content-Disposition",
                    format!(
                        "attachment; filename=\"{}.zip\"",
                        archive_name(root.path(), dir_path)
                    ),
                )
        }
        DirectoryMode::Json => {
            let json = DirectoryListing::read(dir_path)?.to_json()?;
            HttpResponse::new(200, "OK")
                .with_body(json.into_bytes(), "application/json; charset=utf-8")
        }
        DirectoryMode::Html => {
            let html = DirectoryListing::read(dir_path)?.to_html(request_path)?;
            HttpResponse::new(200, "OK").with_html_body(html)
        }
    };

    response.send(stream, head_only, log_prefix)?;
    info!(
        "{} serve_directory finished for: '{}'",
        log_prefix,
        dir_path.display()
    );
    Ok(())
}
