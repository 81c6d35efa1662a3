//! simscan Server - line-delimited JSON over TCP for plagiarism detection
//!
//! This crate serves a [`matcher::PlagiarismDetector`] over plain TCP. A
//! client opens a connection, writes one JSON request line, reads one JSON
//! response line, and the server closes the connection.
//!
//! # Architecture
//!
//! - **Accept loop**: one tokio task per accepted connection reads and decodes
//!   the request line, bounded by `max_request_bytes` and `read_timeout_secs`.
//! - **Work queue**: decoded requests are pushed on an unbounded FIFO queue.
//!   Malformed requests are answered immediately and never queued.
//! - **Worker pool**: `workers` tasks pull from the queue and run detection on
//!   the blocking thread pool, then write the response.
//! - **Shutdown**: the accept loop stops, queued work drains, and anything
//!   left after `drain_timeout_secs` is aborted.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::init_tracing(&config);
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Wire Format
//!
//! ```text
//! -> {"requestId":"42","fullText":"the quick brown fox jumps over the lazy dog"}
//! <- {"requestId":"42","status":"SUCCESS","matches":[{"fileName":"doc1.txt","similarity":1.0,"description":"Similarity: 100.00%"}]}
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod telemetry;
pub mod worker;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use protocol::{decode_request, encode_response, ProtocolError};
pub use server::{shutdown_signal, start_server, Server};
pub use telemetry::{init_tracing, install_metrics_exporter};
