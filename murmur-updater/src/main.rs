//! murmur-updater - Status consistency enforcer
//!
//! Consumes the uploaded, transcribed and summarized topics and records
//! per-artifact progress in the metadata store under a monotonic-status
//! invariant. This service is the single source of truth for "how far along
//! is artifact X".

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use murmur_common::broker::Reader;
use murmur_common::records::{SummarizedRecord, TranscribedRecord, UploadedRecord};
use murmur_common::store::MetadataStore;
use murmur_updater::config::Config;
use murmur_updater::enforcer;

#[derive(Parser)]
#[command(name = "murmur-updater", version)]
struct Args {
    /// Path to the TOML config file
    #[arg(long, env = "CONFIG_PATH")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting murmur-updater v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let cfg: Config = murmur_common::config::load(&args.config)?;

    let store = Arc::new(MetadataStore::open(&cfg.storage.path).await?);

    let uploaded_reader =
        Reader::<UploadedRecord>::new(&cfg.kafka.reader_for(&cfg.kafka.topics.uploaded))?;
    let transcribed_reader =
        Reader::<TranscribedRecord>::new(&cfg.kafka.reader_for(&cfg.kafka.topics.transcribed))?;
    let summarized_reader =
        Reader::<SummarizedRecord>::new(&cfg.kafka.reader_for(&cfg.kafka.topics.summarized))?;

    // Fail fast if no broker responds
    uploaded_reader.check_alive()?;
    info!("Broker reachable, consuming three stage topics");

    let cancel = CancellationToken::new();
    let uploaded = uploaded_reader.messages(cancel.clone());
    let transcribed = transcribed_reader.messages(cancel.clone());
    let summarized = summarized_reader.messages(cancel.clone());

    let run = tokio::spawn({
        let store = Arc::clone(&store);
        let pool = cfg.pool.clone();
        let cancel = cancel.clone();
        async move { enforcer::run(store, uploaded, transcribed, summarized, &pool, cancel).await }
    });

    tokio::signal::ctrl_c().await?;
    info!("signal received, shutting down gracefully");
    cancel.cancel();
    run.await?;

    Ok(())
}
