mod adapter;
mod app;
mod cli;
mod config;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::UploaderConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = UploaderConfig::load(cli.config.as_deref())?;
    tracing::debug!(path = %cfg.file_path().display(), base_url = %cfg.api_base_url, "configuration loaded");

    app::run(cli.command, cfg).await
}
