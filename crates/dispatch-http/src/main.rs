//! Demo/reference binary for the request-dispatch core: wires an in-memory
//! [`dispatch_http::memory_repo::MemoryRepository`] into
//! [`dispatch_core::Dispatcher`] and serves it over `axum`.

use clap::Parser;
use dispatch_core::Dispatcher;
use dispatch_http::config::ServiceConfig;
use dispatch_http::memory_repo::MemoryRepository;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dispatch-http")]
#[command(about = "Request-dispatch core for a multi-tenant HTTP mocking and proxying service")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Address to bind the HTTP listener to, overriding config/default.
    #[arg(long, env = "DISPATCH_BIND")]
    bind: Option<SocketAddr>,

    /// Path to a TOML configuration file.
    #[arg(short, long, env = "DISPATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let mut service_config = match &cli.config {
        Some(path) => ServiceConfig::from_file(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(bind) = cli.bind {
        service_config.bind = bind;
    }

    let repository = Arc::new(MemoryRepository::new());
    let dispatcher = Arc::new(
        Dispatcher::new(repository)
            .map_err(anyhow::Error::from)?
            .with_envelope_texts(service_config.envelope_texts()),
    );

    let router = dispatch_http::build_router(dispatcher);

    let listener = tokio::net::TcpListener::bind(service_config.bind).await?;
    tracing::info!(addr = %service_config.bind, "dispatch-http listening");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_logging(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}
