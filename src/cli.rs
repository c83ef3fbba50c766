use clap::Parser;
use std::path::PathBuf;

// Command-line configuration for the range server.
// Parsed once at startup; tests build this struct directly.
#[derive(Parser, Debug, Clone)]
#[command(
    version,
    long_about = "A local static-file server for very large binary images.\n It serves files from a single root directory with full HTTP Range support, including multi-range (multipart/byteranges) responses.\n Directories are listed as HTML, as JSON with ?list=true, or downloaded as a ZIP archive with ?zip=true.\n The server will respond with a 403 Forbidden error if the requested path escapes the root directory.\n The server will respond with a 404 Not Found error if the requested file or directory does not exist.\n The server will respond with a 416 Range Not Satisfiable error if no requested range fits the file.\n",
    about = "A read-only file server with HTTP Range support for large images."
)]
pub struct Cli {
    /// Directory path to serve. Every request resolves inside it.
    #[arg(short, long, default_value = ".")]
    pub directory: PathBuf,

    /// Host address to listen on (e.g., "127.0.0.1" for local, "0.0.0.0" for everyone on the network).
    #[arg(short, long, default_value = "127.0.0.1")]
    pub listen: String,

    /// Port number to listen on.
    #[arg(short, long, default_value_t = 8083)]
    pub port: u16,

    /// Number of worker threads handling connections.
    #[arg(short, long, default_value_t = 8)]
    pub threads: usize,

    /// Chunk size for streaming file bodies (in bytes).
    /// Bounds the memory used per connection regardless of file size.
    #[arg(short, long, default_value_t = 8192)]
    pub chunk_size: usize,

    /// Enable verbose logging for debugging (log level: debug).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Enable more detailed logging (log level: info).
    #[arg(long, default_value_t = false)]
    pub detailed_logging: bool,
}
