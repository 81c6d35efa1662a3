//! TCP accept loop, per-connection handling and shutdown
//!
//! Each accepted connection gets its own task which reads and decodes the
//! single request line. Valid requests are queued for the worker pool; parse
//! failures are answered directly from the connection task.

use matcher::{PlagiarismDetector, Response};
use metrics::counter;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::protocol::{discard_input, read_request, write_response, ProtocolError};
use crate::telemetry::{CONNECTIONS_TOTAL, PARSE_ERRORS_TOTAL, SEND_ERRORS_TOTAL};
use crate::worker::{Task, TaskQueue, WorkerPool};

/// Pause after a failed `accept` so descriptor exhaustion does not spin.
/// How much of an oversized request is swallowed after the error reply
const DISCARD_LIMIT: u64 = 64 * 1024 * 1024;
const DISCARD_TIMEOUT: Duration = Duration::from_secs(5);

const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// A bound detection server
pub struct Server {
    listener: TcpListener,
    config: Arc<ServerConfig>,
    detector: Arc<PlagiarismDetector>,
}

impl Server {
    /// Validate `config` and bind the listening socket
    pub async fn bind(config: ServerConfig, detector: PlagiarismDetector) -> ServerResult<Self> {
        Self::bind_shared(config, Arc::new(detector)).await
    }

    /// Like [`Server::bind`] for a detector that is already shared
    pub async fn bind_shared(
        config: ServerConfig,
        detector: Arc<PlagiarismDetector>,
    ) -> ServerResult<Self> {
        config.validate()?;
        let listener = TcpListener::bind((config.bind_addr.as_str(), config.port)).await?;
        Ok(Self {
            listener,
            config: Arc::new(config),
            detector,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` resolves, then drain
    ///
    /// After shutdown no new connections are accepted. Connections already
    /// accepted may still enqueue their request, and the workers answer
    /// everything queued. Whatever is unfinished after `drain_timeout_secs`
    /// is aborted. Returns once every worker has stopped.
    pub async fn serve<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Server {
            listener,
            config,
            detector,
        } = self;

        let (pool, queue) = WorkerPool::spawn(config.workers, detector);
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        counter!(CONNECTIONS_TOTAL).increment(1);
                        let conn_id = Uuid::new_v4();
                        let span = info_span!("connection", %conn_id, %peer);
                        connections.spawn(
                            handle_connection(stream, conn_id, queue.clone(), Arc::clone(&config))
                                .instrument(span),
                        );
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to accept connection");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
                Some(result) = connections.join_next(), if !connections.is_empty() => {
                    log_join_error(result);
                }
            }
        }

        drop(listener);
        drop(queue);
        drain(connections, pool, config.drain_timeout()).await;
        info!("server shutdown complete");
        Ok(())
    }
}

async fn drain(mut connections: JoinSet<()>, mut pool: WorkerPool, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    let started = Instant::now();

    // Connection tasks hold queue handles; the queue closes once they finish.
    let connections_done = tokio::time::timeout_at(deadline, async {
        while let Some(result) = connections.join_next().await {
            log_join_error(result);
        }
    })
    .await;
    if connections_done.is_err() {
        warn!(
            pending = connections.len(),
            "drain timeout reached, aborting connections"
        );
        connections.shutdown().await;
    }

    let workers = pool.len();
    if tokio::time::timeout_at(deadline, pool.join()).await.is_ok() {
        debug!(
            workers,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "workers drained"
        );
    } else {
        warn!(workers, "drain timeout reached, aborting workers");
        pool.abort().await;
    }
}

fn log_join_error(result: Result<(), tokio::task::JoinError>) {
    if let Err(err) = result {
        if err.is_panic() {
            error!(error = %err, "connection task panicked");
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    conn_id: Uuid,
    queue: TaskQueue,
    config: Arc<ServerConfig>,
) {
    let request = match read_request(
        &mut stream,
        config.max_request_bytes,
        config.read_timeout(),
    )
    .await
    {
        Ok(request) => request,
        Err(err) => {
            counter!(PARSE_ERRORS_TOTAL).increment(1);
            debug!(error = %err, "rejecting request");
            respond(&mut stream, &Response::error(None, err.to_string())).await;
            if matches!(err, ProtocolError::TooLarge(_)) {
                linger(&mut stream).await;
            }
            return;
        }
    };

    debug!(request_id = ?request.request_id, bytes = request.full_text.len(), "request queued");
    let task = Task {
        request,
        stream,
        conn_id,
        enqueued_at: Instant::now(),
    };
    if let Err(mut task) = queue.push(task) {
        warn!("worker pool unavailable, rejecting request");
        let response = Response::error(task.request.request_id.take(), "Server shutting down");
        respond(&mut task.stream, &response).await;
    }
}

/// Half-close and drain the rest of an oversized request. Dropping a socket
/// with unread input resets the connection, and the reset can discard the
/// reply before the client has read it.
async fn linger(stream: &mut TcpStream) {
    if let Err(err) = stream.shutdown().await {
        debug!(error = %err, "failed to half-close connection");
        return;
    }
    match discard_input(stream, DISCARD_LIMIT, DISCARD_TIMEOUT).await {
        Ok(bytes) => debug!(bytes, "discarded rest of oversized request"),
        Err(err) => debug!(error = %err, "stopped discarding oversized request"),
    }
}

async fn respond(stream: &mut TcpStream, response: &Response) {
    if let Err(err) = write_response(stream, response).await {
        counter!(SEND_ERRORS_TOTAL).increment(1);
        warn!(error = %err, "failed to send response");
    }
}

/// Build the detector from `config.corpus_dir` and serve until Ctrl+C or
/// SIGTERM
///
/// The corpus is loaded on the blocking pool before the listener is bound, so
/// no connection is accepted until the index is frozen.
pub async fn start_server(config: ServerConfig) -> ServerResult<()> {
    config.validate()?;

    let detector_cfg = config.detector.clone();
    let corpus_dir = config.corpus_dir.clone();
    let (detector, report) = tokio::task::spawn_blocking(move || {
        PlagiarismDetector::from_corpus_dir(detector_cfg, corpus_dir)
    })
    .await??;

    let stats = detector.index().stats();
    info!(
        corpus_dir = %config.corpus_dir.display(),
        indexed = report.indexed,
        skipped = report.skipped,
        buckets = stats.buckets,
        largest_bucket = stats.largest_bucket,
        "corpus indexed"
    );

    let server = Server::bind(config.clone(), detector).await?;
    info!(
        addr = %server.local_addr()?,
        requested = %config.listen_addr(),
        workers = config.workers,
        "simscan server listening"
    );
    server.serve(shutdown_signal()).await
}

/// Resolves on Ctrl+C, or SIGTERM on unix
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
