use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use clap::Parser;
use mimalloc_rust::GlobalMiMalloc;
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod report;
pub mod server;
pub mod sql;

#[global_allocator]
static GLOBAL_MIMALLOC: GlobalMiMalloc = GlobalMiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = config::Cli::parse();
    let report = cli.report().context("load configuration")?;

    match cli.command {
        config::Command::Serve { port } => {
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("bind {addr}"))?;
            tracing::info!(queries = report.definitions.len(), "server listening on {addr}");

            axum::serve(listener, server::router(Arc::new(report)))
                .await
                .context("serve")?;
        }
        config::Command::Render { output } => {
            let page = report.render().await.context("render report")?;
            match output {
                Some(path) => {
                    std::fs::write(&path, page)
                        .with_context(|| format!("write {}", path.display()))?;
                    tracing::info!(path = %path.display(), "report written");
                }
                None => print!("{page}"),
            }
        }
    }

    Ok(())
}
