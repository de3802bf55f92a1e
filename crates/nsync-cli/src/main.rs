use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use nsync_channels::DiscordFeed;
use nsync_config::Config;
use nsync_core::{
    init_logging, PassOutcome, RawBatch, RecordSource, StaticRecords, SyncPass, TagSet,
    UpdateApplier,
};
use nsync_store::NotionStore;
use nsync_types::ExternalRecord;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "nsync", about = "Discord to Notion record sync", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a saved batch and print the planned updates
    Plan {
        /// JSON file holding the message batch
        #[arg(long)]
        input: PathBuf,
        /// JSON array of records to reconcile against instead of querying Notion
        #[arg(long)]
        records: Option<PathBuf>,
        /// Comma-separated tags, overrides FILTER_TAGS
        #[arg(long)]
        tags: Option<String>,
    },
    /// Fetch messages and records, reconcile, and optionally write the updates
    Sync {
        /// Read the batch from a file instead of the Discord channel
        #[arg(long)]
        input: Option<PathBuf>,
        /// Comma-separated tags, overrides FILTER_TAGS
        #[arg(long)]
        tags: Option<String>,
        /// Write the computed updates to Notion
        #[arg(long)]
        apply: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config.log_level, config.log_file.as_deref(), config.log_json)
        .context("Failed to initialize logging")?;

    match cli.command {
        Commands::Plan {
            input,
            records,
            tags,
        } => plan(&config, &input, records.as_deref(), tags).await,
        Commands::Sync { input, tags, apply } => {
            sync(&config, input.as_deref(), tags, apply).await
        }
    }
}

async fn plan(
    config: &Config,
    input: &Path,
    records: Option<&Path>,
    tags: Option<String>,
) -> anyhow::Result<()> {
    let pass = build_pass(config, tags);
    let batch = RawBatch::from_path(input).context("Failed to load input batch")?;

    let outcome = match records {
        Some(path) => {
            let source = StaticRecords::new(load_records(path)?);
            let source_id = config.notion_data_source_id.as_deref().unwrap_or("local");
            run_pass(&pass, &batch, source_id, &source).await?
        }
        None => {
            let store =
                NotionStore::from_config(config).context("Notion store is not configured")?;
            let (_, source_id) = config.require_store()?;
            run_pass(&pass, &batch, source_id, &store).await?
        }
    };

    print_outcome(&outcome)
}

async fn sync(
    config: &Config,
    input: Option<&Path>,
    tags: Option<String>,
    apply: bool,
) -> anyhow::Result<()> {
    let pass = build_pass(config, tags);
    let (_, source_id) = config.require_store()?;
    let store =
        Arc::new(NotionStore::from_config(config).context("Notion store is not configured")?);

    let batch = match input {
        Some(path) => RawBatch::from_path(path).context("Failed to load input batch")?,
        None => {
            let feed =
                DiscordFeed::from_config(config).context("Discord feed is not configured")?;
            let (_, channel_id) = config.require_feed()?;
            feed.fetch_batch(channel_id, config.discord_fetch_limit)
                .await
                .context("Failed to fetch Discord messages")?
        }
    };

    let outcome = run_pass(&pass, &batch, source_id, store.as_ref()).await?;
    print_outcome(&outcome)?;

    if !apply {
        info!(
            operations = outcome.operations().len(),
            "Dry run, pass --apply to write updates"
        );
        return Ok(());
    }

    let operations = outcome.into_operations();
    if operations.is_empty() {
        info!("Nothing to apply");
        return Ok(());
    }

    let applier = UpdateApplier::new(config.apply_max_concurrent);
    let summary = applier.apply_all(operations, store).await;
    info!(
        applied = summary.applied.len(),
        failed = summary.failed.len(),
        "Updates applied"
    );

    if !summary.is_success() {
        for (target_id, reason) in &summary.failed {
            error!(target_id = %target_id, reason = %reason, "Update not applied");
        }
        let total = summary.failed.len() + summary.applied.len();
        bail!("{} of {total} updates failed", summary.failed.len());
    }
    Ok(())
}

fn build_pass(config: &Config, tags: Option<String>) -> SyncPass {
    match tags {
        Some(raw) => SyncPass::new(
            TagSet::parse(&raw, config.empty_tag_policy),
            config.attachment_sync,
        ),
        None => SyncPass::from_config(config),
    }
}

async fn run_pass(
    pass: &SyncPass,
    batch: &RawBatch,
    source_id: &str,
    source: &dyn RecordSource,
) -> anyhow::Result<PassOutcome> {
    info!(items = batch.len(), source_id, "Starting reconciliation pass");
    pass.run(batch, source_id, source)
        .await
        .context("Reconciliation pass failed")
}

fn load_records(path: &Path) -> anyhow::Result<Vec<ExternalRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid records file {}", path.display()))
}

fn print_outcome(outcome: &PassOutcome) -> anyhow::Result<()> {
    let report = serde_json::to_string_pretty(outcome).context("Failed to serialize report")?;
    println!("{report}");
    Ok(())
}
