mod cli;
mod config;
mod controller;
mod descriptor;
mod error;
mod state_machine;
mod submitter;
#[cfg(test)]
mod testing;
mod tracker;
mod ui;
mod viewer;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use config::LoaderConfig;
use controller::QueueController;
use descriptor::DescriptorSource;
use ui::SummaryView;
use viewer::ViewerClient;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "viewer_load=debug"
    } else {
        "viewer_load=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match &cli.config {
        Some(path) => LoaderConfig::load_from(path),
        None => LoaderConfig::load(),
    }
    .context("failed to load configuration")?;
    config.apply_cli(&cli);
    config.validate()?;

    let input = cli.input_path();
    let mut source = DescriptorSource::open(input.as_deref(), cli.no_commits)
        .with_context(|| format!("failed to read export from {}", cli.input))?;

    let client = ViewerClient::new(
        &config.user_agent,
        config.connect_timeout(),
        config.request_timeout(),
    )
    .context("failed to build HTTP client")?;
    let controller = QueueController::from_config(Arc::new(client), &config)?;

    info!(
        base_url = %config.base_url,
        max_concurrent = config.max_concurrent,
        poll_interval_ms = config.poll_interval_ms,
        "loading workflows"
    );

    let mut stdout = std::io::stdout().lock();
    let mut summary = controller
        .run(source.by_ref(), &mut stdout)
        .await
        .context("import run aborted")?;
    summary.skipped_commits = source.skipped();
    if let Ok(json) = serde_json::to_string(&summary) {
        debug!(%json, "run summary");
    }

    SummaryView::default().print(&summary)?;
    Ok(())
}
