//! murmur-asr - Transcription stage service
//!
//! Drains the `uploaded` topic through a bounded worker pool; each worker
//! calls the external speech-to-text service and writes the resulting
//! transcription record to the `transcribed` topic.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use murmur_asr::config::Config;
use murmur_asr::transcriber::WhisperTranscriber;
use murmur_common::broker::{Pipeline, Reader, Writer};
use murmur_common::records::{TranscribedRecord, UploadedRecord};
use murmur_common::stage::StageExecutor;

#[derive(Parser)]
#[command(name = "murmur-asr", version)]
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

    info!("Starting murmur-asr v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let cfg: Config = murmur_common::config::load(&args.config)?;

    let reader = Reader::<UploadedRecord>::new(&cfg.reader)?;
    let writer = Writer::<TranscribedRecord>::new(&cfg.writer)?;

    // Fail fast if no broker responds
    reader.check_alive()?;
    writer.check_alive()?;
    info!(
        input = %cfg.reader.topic,
        output = %cfg.writer.topic,
        workers = cfg.stage.workers,
        "broker reachable, starting transcription stage"
    );

    let transform = Arc::new(WhisperTranscriber::new(&cfg.whisper));
    let pipeline = Pipeline::new(reader, writer);

    let cancel = CancellationToken::new();
    let run = tokio::spawn({
        let stage = cfg.stage.clone();
        let cancel = cancel.clone();
        async move { StageExecutor::run_pipeline(stage, transform, pipeline, cancel).await }
    });

    tokio::signal::ctrl_c().await?;
    info!("signal received, shutting down gracefully");
    cancel.cancel();
    let metrics = run.await?;
    info!(
        dispatched = metrics.dispatched(),
        succeeded = metrics.succeeded(),
        failed = metrics.failed(),
        "transcription stage stopped"
    );

    Ok(())
}
