use crate::cli::Cli;
use crate::content::StreamOptions;
use crate::error::AppError;
use crate::http::{handle_client, ServerContext};
use crate::resolver::ServerRoot;
use log::{debug, error, info, warn};
use rand::Rng;
use std::net::{SocketAddr, TcpListener};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use threadpool::ThreadPool;

/// Binds the listener and serves connections until a shutdown signal arrives.
///
/// `addr_tx` receives the bound address once listening, which lets callers
/// bind port 0 and learn the real port.
pub fn run_server(
    cli: Cli,
    shutdown_rx: Option<mpsc::Receiver<()>>,
    addr_tx: Option<mpsc::Sender<SocketAddr>>,
) -> Result<(), AppError> {
    let root = ServerRoot::new(&cli.directory)?;

    if cli.chunk_size == 0 {
        return Err(AppError::InternalServerError(
            "chunk size must be greater than zero".to_string(),
        ));
    }
    if cli.threads == 0 {
        return Err(AppError::InternalServerError(
            "thread count must be greater than zero".to_string(),
        ));
    }

    let listener = TcpListener::bind((cli.listen.as_str(), cli.port))?;
    let local_addr = listener.local_addr()?;
    listener.set_nonblocking(true)?;

    if let Some(tx) = addr_tx {
        if tx.send(local_addr).is_err() {
            return Err(AppError::InternalServerError(
                "Failed to send server address to caller".to_string(),
            ));
        }
    }

    info!(
        "Range server listening on {} for directory '{}' ({} workers, {} byte chunks)",
        local_addr,
        root.path().display(),
        cli.threads,
        cli.chunk_size
    );

    let pool = ThreadPool::new(cli.threads);
    let ctx = Arc::new(ServerContext {
        root,
        stream: StreamOptions::new(cli.chunk_size),
    });

    'server_loop: loop {
        if let Some(ref rx) = shutdown_rx {
            if rx.try_recv().is_ok() {
                info!("Shutdown signal received. Shutting down gracefully.");
                break 'server_loop;
            }
        }

        match listener.accept() {
            Ok((stream, peer)) => {
                // Accepted sockets may inherit non-blocking mode from the listener.
                if let Err(e) = stream.set_nonblocking(false) {
                    warn!("Dropping connection from {peer}: {e}");
                    continue;
                }

                let ctx = Arc::clone(&ctx);
                let request_id = generate_request_id();
                let log_prefix = format!("[ReqID: {request_id}][Peer: {peer}]");

                pool.execute(move || {
                    debug!("{log_prefix} Handling client connection");
                    match handle_client(stream, &ctx, &log_prefix) {
                        Ok(()) => debug!("{log_prefix} Client handled successfully"),
                        Err(e) => debug!("{log_prefix} Connection ended with error: {e}"),
                    }
                });
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(e) => {
                error!("Error accepting connection: {e}");
            }
        }
    }

    info!("Server shutting down gracefully.");
    Ok(())
}

fn generate_request_id() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(8)
        .map(char::from)
        .collect()
}
