//! Subcommand implementations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use autoprint_core::{
    CommandDispatcher, DirectoryRegistry, ExclusionStore, FileLifecycleManager, PassReport,
    Scheduler, ServiceConfig, StartOutcome, WatchConfiguration,
};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

pub(crate) async fn add(
    config: &ServiceConfig,
    printer: String,
    dir: PathBuf,
    words: &str,
) -> Result<()> {
    let dir = std::path::absolute(&dir)
        .with_context(|| format!("failed to resolve {}", dir.display()))?;
    if !dir.is_dir() {
        warn!("{} is not a directory yet", dir.display());
    }

    let mut registry = load_registry(config).await?;
    let watch = WatchConfiguration::from_word_list(printer, dir, words);
    let id = watch.id;
    registry.add(watch).await?;

    println!("{id}");
    Ok(())
}

pub(crate) async fn list(config: &ServiceConfig) -> Result<()> {
    let registry = load_registry(config).await?;
    for watch in registry.list() {
        println!(
            "{}  active={}  printer={}  dir={}  words={:?}",
            watch.id,
            watch.active,
            watch.printer_id,
            watch.path.display(),
            watch.include_words
        );
    }
    Ok(())
}

pub(crate) async fn excluded(config: &ServiceConfig) -> Result<()> {
    let exclusions = ExclusionStore::load(&config.state_dir).await?;
    for name in exclusions.names() {
        println!("{name}");
    }
    Ok(())
}

pub(crate) async fn set_active(config: &ServiceConfig, id: Uuid, active: bool) -> Result<()> {
    let mut registry = load_registry(config).await?;
    let watch = registry.set_active(id, active).await?;
    info!(
        "{} is now {}",
        watch.path.display(),
        if active { "active" } else { "inactive" }
    );
    Ok(())
}

pub(crate) async fn scan(config: &ServiceConfig, id: Uuid) -> Result<()> {
    let registry = load_registry(config).await?;
    let watch = registry
        .get(id)
        .ok_or_else(|| anyhow!("no watched directory with id {id}"))?;

    let manager = lifecycle_manager(config).await?;
    let report = manager.run_pass(watch).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub(crate) async fn run(config: &ServiceConfig) -> Result<()> {
    let registry = load_registry(config).await?;
    let manager = Arc::new(lifecycle_manager(config).await?);
    let (scheduler, mut reports) = Scheduler::new(manager, config.scan_interval());

    for watch in registry.active() {
        if scheduler.start(watch.clone()).await == StartOutcome::Rejected {
            warn!("Could not schedule {}", watch.path.display());
        }
    }
    if scheduler.scheduled_count().await == 0 {
        warn!("No active directories; use `autoprint start <ID>` first");
    }

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                info!("Interrupted, finishing in-flight work");
                break;
            }
            Some(report) = reports.recv() => log_report(&report),
        }
    }

    scheduler.shutdown().await;
    Ok(())
}

async fn load_registry(config: &ServiceConfig) -> Result<DirectoryRegistry> {
    DirectoryRegistry::load(&config.state_dir)
        .await
        .with_context(|| format!("failed to load registry from {}", config.state_dir.display()))
}

async fn lifecycle_manager(config: &ServiceConfig) -> Result<FileLifecycleManager> {
    let exclusions = ExclusionStore::load(&config.state_dir)
        .await
        .with_context(|| {
            format!(
                "failed to load exclusions from {}",
                config.state_dir.display()
            )
        })?;
    let dispatcher = Arc::new(CommandDispatcher::from_config(config));

    Ok(FileLifecycleManager::from_config(
        config,
        Arc::new(Mutex::new(exclusions)),
        dispatcher,
    ))
}

fn log_report(report: &PassReport) {
    for outcome in report.outcomes.iter().filter(|o| !o.is_success()) {
        let steps: Vec<String> = outcome.failures.iter().map(|f| f.step.to_string()).collect();
        warn!(
            "{} finished with failed steps: {}",
            outcome.file_name,
            steps.join(", ")
        );
    }
}
