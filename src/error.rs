use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Zip(zip::result::ZipError),
    Json(serde_json::Error),
    Walk(walkdir::Error),
    InvalidPath,
    DirectoryNotFound(String),
    BadRequest,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    /// No requested range fits; carries the file size for `Content-Range: bytes */size`.
    RangeNotSatisfiable(u64),
    InternalServerError(String),
    /// Writing to the client failed after the response started; nothing more can be sent.
    ResponseAborted(std::io::Error),
}

impl AppError {
    /// HTTP status code and reason phrase reported to the client.
    pub fn status(&self) -> (u16, &'static str) {
        match self {
            AppError::BadRequest | AppError::InvalidPath => (400, "Bad Request"),
            AppError::Forbidden => (403, "Forbidden"),
            AppError::NotFound | AppError::DirectoryNotFound(_) => (404, "Not Found"),
            AppError::MethodNotAllowed => (405, "Method Not Allowed"),
            AppError::RangeNotSatisfiable(_) => (416, "Range Not Satisfiable"),
            AppError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => (404, "Not Found"),
            AppError::Io(_)
            | AppError::Zip(_)
            | AppError::Json(_)
            | AppError::Walk(_)
            | AppError::InternalServerError(_)
            | AppError::ResponseAborted(_) => (500, "Internal Server Error"),
        }
    }

    /// True once response bytes have gone out and no error page can follow.
    pub fn is_response_aborted(&self) -> bool {
        matches!(self, AppError::ResponseAborted(_))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "IO error: {err}"),
            AppError::Zip(err) => write!(f, "ZIP error: {err}"),
            AppError::Json(err) => write!(f, "JSON error: {err}"),
            AppError::Walk(err) => write!(f, "Directory walk error: {err}"),
            AppError::InvalidPath => write!(f, "Invalid path"),
            AppError::DirectoryNotFound(path) => write!(f, "Directory not found: {path}"),
            AppError::BadRequest => write!(f, "Bad request"),
            AppError::Forbidden => write!(f, "Forbidden"),
            AppError::NotFound => write!(f, "Not Found"),
            AppError::MethodNotAllowed => write!(f, "Method not allowed"),
            AppError::RangeNotSatisfiable(size) => {
                write!(f, "Range not satisfiable for resource of {size} bytes")
            }
            AppError::InternalServerError(msg) => write!(f, "Internal server error: {msg}"),
            AppError::ResponseAborted(err) => write!(f, "Response aborted: {err}"),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(err: zip::result::ZipError) -> Self {
        AppError::Zip(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Json(err)
    }
}

impl From<walkdir::Error> for AppError {
    fn from(err: walkdir::Error) -> Self {
        AppError::Walk(err)
    }
}

impl std::error::Error for AppError {}
