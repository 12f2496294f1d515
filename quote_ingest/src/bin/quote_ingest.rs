use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use quote_ingest::config::{IngestConfig, load_config_path};
use quote_ingest::credentials::{CredentialsProvider, EnvCredentials, StaticCredentials};
use quote_ingest::ingest::Ingestor;
use quote_ingest::sink::sqlite::SqliteConnector;

#[derive(Parser)]
#[command(version, about = "Weekly quote ingestion worker")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Process one batch event against the SQLite sink.
    Run {
        /// Worker config (TOML). Defaults apply when omitted.
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Batch event JSON; read from stdin when omitted.
        #[arg(long, value_name = "FILE")]
        event: Option<PathBuf>,
        /// Probe and plan only; roll every message back.
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Run {
            config,
            event,
            dry_run,
        } => {
            // 1) Config
            let mut cfg = match config {
                Some(path) => load_config_path(&path)?,
                None => IngestConfig::default(),
            };
            cfg.dry_run |= dry_run;

            // 2) Event
            let raw = match event {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("read event {}", path.display()))?,
                None => {
                    let mut s = String::new();
                    std::io::stdin().read_to_string(&mut s).context("read event from stdin")?;
                    s
                }
            };
            let event: serde_json::Value = serde_json::from_str(&raw).context("parse event JSON")?;

            // 3) Ingest
            let credentials: Box<dyn CredentialsProvider> = match cfg.static_parameters.clone() {
                Some(params) => Box::new(StaticCredentials::from(params)),
                None => Box::new(EnvCredentials),
            };
            let ingestor = Ingestor::new(credentials, SqliteConnector, cfg);
            let summary = ingestor.run(&event)?;

            println!("{}", serde_json::to_string(&summary.to_response())?);
        }
    }

    Ok(())
}
