//! medrec CLI
//!
//! Upload photographed medical records to the OCR backend and follow the
//! extraction result from the terminal.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use medrec_ocr::config::AppConfig;
use medrec_ocr::models::record::RecordId;
use medrec_ocr::models::upload::ImageUpload;
use medrec_ocr::poller::{PollOutcome, Poller, ResultWatcher, Screen, ScreenOptions};
use medrec_ocr::services::records::RecordsClient;

#[derive(Parser)]
#[command(name = "medrec")]
#[command(about = "Medical record OCR client", long_about = None)]
struct Cli {
    /// OCR backend URL
    #[arg(long, env = "BACKEND_URL", default_value = "http://localhost:8000")]
    backend_url: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Contact shown when extraction fails
    #[arg(long, env = "ADMIN_CONTACT")]
    admin_contact: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a record image (JPG or PNG, up to 10 MB) and follow its result
    Upload {
        file: PathBuf,

        /// Print the record id and exit without polling
        #[arg(long)]
        no_watch: bool,
    },
    /// Follow the extraction result of an existing record
    Watch { record_id: String },
    /// List recent records
    List {
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Run OCR again for a record
    Reprocess {
        record_id: String,

        #[arg(long)]
        no_watch: bool,
    },
    /// Check backend health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let client = Arc::new(
        RecordsClient::new(&cli.backend_url, Duration::from_secs(cli.timeout_secs))
            .context("invalid backend URL")?,
    );
    let options = ScreenOptions {
        admin_contact: cli.admin_contact,
        ..ScreenOptions::default()
    };
    // Same POLL_* settings as the server.
    let config = AppConfig::from_env().context("invalid configuration")?;
    let poller = Poller::new(Arc::clone(&client), config.poll_schedule());

    match cli.command {
        Commands::Upload { file, no_watch } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let upload = ImageUpload::new(file_name, bytes);
            upload.check().map_err(|e| anyhow::anyhow!("{e}"))?;

            let response = client.upload(&upload).await.context("upload failed")?;
            println!("record_id: {}", response.record_id);
            if !no_watch {
                watch(&poller, response.record_id, &options).await?;
            }
        }
        Commands::Watch { record_id } => {
            watch(&poller, RecordId::from(record_id), &options).await?;
        }
        Commands::List { limit, offset } => {
            let records = client.list_records(limit, offset).await?;
            if records.is_empty() {
                println!("No records.");
            }
            for record in records {
                let uploaded = record
                    .uploaded_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<38} {:<11} {}",
                    record.id,
                    record.processing_status.to_string(),
                    uploaded
                );
            }
        }
        Commands::Reprocess { record_id, no_watch } => {
            let response = client.reprocess(&RecordId::from(record_id)).await?;
            println!(
                "record_id: {} ({})",
                response.record_id,
                response.status.as_deref().unwrap_or("pending")
            );
            if !no_watch {
                watch(&poller, response.record_id, &options).await?;
            }
        }
        Commands::Health => {
            let health = client.health().await?;
            println!("{} {}", health.status, health.timestamp.unwrap_or_default());
        }
    }

    Ok(())
}

/// Poll a record and print every distinct screen until polling stops.
async fn watch(
    poller: &Poller<RecordsClient>,
    record_id: RecordId,
    options: &ScreenOptions,
) -> Result<()> {
    let mut watcher = ResultWatcher::new(poller.clone());
    let mut updates = watcher.select(record_id);
    let mut shown: Option<Screen> = None;

    loop {
        let screen = updates.borrow_and_update().screen(options);
        if shown.as_ref() != Some(&screen) {
            println!("{screen}");
            shown = Some(screen);
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if let Some(handle) = watcher.current() {
                    handle.cancel();
                }
                break;
            }
        }
    }

    match watcher.finish().await {
        Some(PollOutcome::TransportFailed) => {
            bail!("could not fetch the result; run the command again to retry")
        }
        Some(PollOutcome::AttemptCapReached(status)) => {
            eprintln!("Stopped polling while the record was still {status}.");
            Ok(())
        }
        Some(PollOutcome::Finished(_)) | Some(PollOutcome::Cancelled) | None => Ok(()),
    }
}
