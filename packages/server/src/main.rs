//! `apimount-demo`: serves the demo APIs over HTTP.
//!
//! # Quick start
//!
//! ```sh
//! # Open reads, token-protected writes on the default port:
//! APIMOUNT_TOKENS=s3cret apimount-demo
//!
//! # Every API endpoint behind a token, no route table:
//! APIMOUNT_REQUIRE_AUTH=true APIMOUNT_TOKENS=s3cret APIMOUNT_ROUTE_TABLE=false apimount-demo
//! ```
//!
//! # Environment variables
//!
//! See [`ServerConfig::from_env`] for the full list.

use std::process::ExitCode;

use apimount_server::{build_router, demo_host, ServerConfig, ServerError};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "apimount=info,apimount_server=info,tower_http=debug".into()
            }),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), ServerError> {
    let config = ServerConfig::from_env()?;
    tracing::info!(
        require_auth = config.require_auth,
        tokens = config.tokens.len(),
        route_table = config.route_table,
        "configuration loaded"
    );

    let host = demo_host(&config)?;
    let app = build_router(host.registry(), &config)?;

    tracing::info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
