//! simscan - plagiarism detection server
//!
//! Loads the corpus named by the configuration, then serves line-delimited
//! JSON requests over TCP until Ctrl+C or SIGTERM.
//!
//! Usage: `simscan [CONFIG_FILE]`. Without an argument, `simscan.{toml,yaml,json}`
//! in the working directory is used if present. `SIMSCAN__*` environment
//! variables (also read from `.env`) override file settings.

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = match std::env::args_os().nth(1) {
        Some(path) => ServerConfig::load_from(path)?,
        None => ServerConfig::load()?,
    };

    server::init_tracing(&config);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting simscan");

    if let Some(addr) = config.metrics_addr.as_deref() {
        server::install_metrics_exporter(addr)?;
    }

    server::start_server(config).await?;
    Ok(())
}
