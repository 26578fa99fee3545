//! datadrop CLI - uploads files and directories as a dataset and follows
//! the server's processing until the dataset is ready.

mod cli;
mod config;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use datadrop_protocol::retention_time_label;
use datadrop_transfer::{SelectedFile, scan_directory, select_file};
use datadrop_upload::{
    DatasetMetadata, DatasetPipeline, HttpTransport, InhibitWakeLock, NoopWakeLock,
    ReadinessState, UploadPlan, UploadTransport, WakeLock, WakeLockGuard,
};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::{CliConfig, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,datadrop=debug")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => CliConfig::load_from(path)?,
        None => CliConfig::load()?,
    };
    let settings = Settings::resolve(&cli, config);

    let selection = collect_selection(&cli.paths)?;
    let metadata = DatasetMetadata {
        label: cli.label.clone(),
        retention_hours: settings.retention_hours,
        public: cli.public,
        hidden: cli.hidden,
    };

    let plan = UploadPlan::build(&selection, metadata.clone())?;
    if plan.exposes_publicly() {
        println!("Warning: this dataset will be listed and downloadable by anyone.");
    }
    let mut retention = format!("{} hours", settings.retention_hours);
    let label = retention_time_label(settings.retention_hours);
    if !label.is_empty() {
        retention = format!("{retention} {label}");
    }
    println!(
        "Uploading {} files ({} bytes), kept for {retention}",
        plan.files.len(),
        plan.total_bytes()
    );

    let transport = Arc::new(
        HttpTransport::new(settings.server_url.clone(), settings.request_timeout)
            .context("failed to build HTTP client")?,
    );
    let chunk_size = match settings.chunk_size_override {
        Some(size) => size,
        None => {
            transport
                .server_config()
                .await
                .context("failed to load server config")?
                .chunk_size
        }
    };
    tracing::debug!(chunk_size, server = %settings.server_url, "upload settings resolved");

    let provider: Arc<dyn WakeLock> = if cli.no_wake_lock {
        Arc::new(NoopWakeLock)
    } else {
        Arc::new(InhibitWakeLock::new())
    };
    let mut pipeline = DatasetPipeline::new(transport.clone(), WakeLockGuard::new(provider))
        .with_poll_interval(settings.poll_interval);

    let events = pipeline
        .take_events()
        .context("event receiver already taken")?;
    let renderer = tokio::spawn(render::render_events(events));

    let cancel = pipeline.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, stopping");
            cancel.cancel();
        }
    });

    let result = pipeline.run(&selection, metadata, chunk_size).await;
    drop(pipeline);
    renderer.await?;

    let outcome = result?;
    match outcome.readiness {
        Some(update) if update.state == ReadinessState::Available => {
            println!("Download: {}", transport.download_url(&outcome.dataset_id));
            Ok(())
        }
        Some(update) => bail!("dataset {} not available: {}", outcome.dataset_id, update.message),
        None => bail!("stopped before dataset {} was ready", outcome.dataset_id),
    }
}

/// Builds the upload selection from the command-line paths, keeping their
/// order. Directories contribute every file below them.
fn collect_selection(paths: &[PathBuf]) -> Result<Vec<SelectedFile>> {
    let mut selection = Vec::new();
    for path in paths {
        if path.is_dir() {
            let files = scan_directory(path)
                .with_context(|| format!("failed to scan {}", path.display()))?;
            selection.extend(files);
        } else {
            let file =
                select_file(path).with_context(|| format!("failed to read {}", path.display()))?;
            selection.push(file);
        }
    }
    Ok(selection)
}
