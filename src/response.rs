use crate::error::AppError;
use crate::templates::{get_error_description, TemplateEngine};
use log::{debug, error};
use std::io::Write;

/// Headers carried by every response, so any reply advertises CORS and range support.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, HEAD, OPTIONS"),
    ("Access-Control-Allow-Headers", "Range, Content-Type"),
];

pub const ALLOWED_METHODS: &str = "GET, HEAD, OPTIONS";

/// HTTP response builder. Small bodies are buffered; file bodies are streamed
/// by the caller after [`HttpResponse::send_head`].
pub struct HttpResponse {
    pub status_code: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status_code: u16, status_text: &str) -> Self {
        let mut headers = vec![
            (
                "Server".to_string(),
                concat!("range_sv/", env!("CARGO_PKG_VERSION")).to_string(),
            ),
            ("Connection".to_string(), "close".to_string()),
            ("Accept-Ranges".to_string(), "bytes".to_string()),
        ];
        headers.extend(
            CORS_HEADERS
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string())),
        );
        Self {
            status_code,
            status_text: status_text.to_string(),
            headers,
            body: Vec::new(),
        }
    }

    pub fn with_html_body(self, body: String) -> Self {
        self.with_body(body.into_bytes(), "text/html; charset=utf-8")
    }

    pub fn with_body(mut self, body: Vec<u8>, content_type: &str) -> Self {
        self.headers
            .push(("Content-Type".to_string(), content_type.to_string()));
        self.body = body;
        self
    }

    pub fn add_header(mut self, name: &str, value: String) -> Self {
        self.headers.push((name.to_string(), value));
        self
    }

    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn head(&self, content_length: u64) -> String {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status_code, self.status_text);
        head.push_str(&format!("Content-Length: {content_length}\r\n"));
        for (name, value) in &self.headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str("\r\n");
        head
    }

    /// Writes the status line and headers announcing `content_length` body bytes.
    pub fn send_head<W: Write>(
        &self,
        stream: &mut W,
        content_length: u64,
        log_prefix: &str,
    ) -> Result<(), AppError> {
        debug!(
            "{} Sending headers - Status: {}, Content-Length: {}",
            log_prefix, self.status_code, content_length
        );
        stream
            .write_all(self.head(content_length).as_bytes())
            .map_err(|e| {
                error!("{log_prefix} Failed to write response headers: {e}");
                AppError::ResponseAborted(e)
            })
    }

    /// Sends the buffered response. With `head_only` the body is withheld but
    /// `Content-Length` still reports its size.
    pub fn send<W: Write>(
        self,
        stream: &mut W,
        head_only: bool,
        log_prefix: &str,
    ) -> Result<(), AppError> {
        self.send_head(stream, self.body.len() as u64, log_prefix)?;

        if !head_only && !self.body.is_empty() {
            stream.write_all(&self.body).map_err(|e| {
                error!("{log_prefix} Failed to write response body: {e}");
                AppError::ResponseAborted(e)
            })?;
        }

        stream.flush().map_err(|e| {
            error!("{log_prefix} Failed to flush response: {e}");
            AppError::ResponseAborted(e)
        })?;

        Ok(())
    }
}

/// CORS preflight answer.
pub fn preflight_response() -> HttpResponse {
    HttpResponse::new(200, "OK").add_header("Access-Control-Max-Age", "86400".to_string())
}

/// Error response with an HTML error page
pub fn create_error_response(err: &AppError) -> HttpResponse {
    let (status_code, status_text) = err.status();
    let description = match err {
        AppError::InternalServerError(msg) => msg.as_str(),
        _ => get_error_description(status_code),
    };
    let engine = TemplateEngine::new();
    let page = engine
        .render_error_page(status_code, status_text, description)
        .unwrap_or_else(|_| format!("Error {status_code}: {status_text}"));

    let response = HttpResponse::new(status_code, status_text).with_html_body(page);

    match err {
        AppError::RangeNotSatisfiable(size) => {
            response.add_header("Content-Range", format!("bytes */{size}"))
        }
        AppError::MethodNotAllowed => response.add_header("Allow", ALLOWED_METHODS.to_string()),
        _ => response,
    }
}
