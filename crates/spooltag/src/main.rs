//! Spooltag -- filament spool NFC tag reader/writer.
//!
//! Usage:
//!   spooltag read                       # Wait for a tag, print its spec
//!   spooltag dump                       # Wait for a tag, print the hex dump
//!   spooltag write --preset PLA         # Write a catalog preset
//!   spooltag write --spec spool.json    # Write a spec from a JSON file
//!   spooltag readers                    # List attached readers
//!
//! Ctrl-C while waiting for a tag cancels the wait.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;

use spooltag::config::{BackendKind, SpoolTagConfig};
use spooltag::{expand_tilde, open_backend, ReaderError, SpoolReader};
use spooltag_codec::{catalog, SpoolSpec};

#[derive(Parser)]
#[command(name = "spooltag", about = "Read and write filament spool NFC tags")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "~/.spooltag/config.toml")]
    config: String,

    /// Prefer the reader whose name contains this (case-insensitive)
    #[arg(long)]
    preferred_reader: Option<String>,

    /// Use an in-process simulated reader instead of PC/SC
    #[arg(long)]
    simulate: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List attached readers and the one that would be used
    Readers,
    /// List known filament types and their SKUs
    Types,
    /// Print the preset spec for a filament type
    Preset {
        /// Filament type, e.g. "PLA High Speed"
        material: String,
    },
    /// Wait for a tag and print its decoded spec as JSON
    Read,
    /// Wait for a tag and print its hex dump and interpretation
    Dump,
    /// Wait for a tag and write a spec to it
    Write {
        /// JSON file with the spec to write
        #[arg(long, conflicts_with = "preset", required_unless_present = "preset")]
        spec: Option<PathBuf>,
        /// Write the preset for this filament type
        #[arg(long)]
        preset: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spooltag=info,spooltag_transport=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let mut cfg = SpoolTagConfig::load_or_default(&config_path)?;
    if let Some(preferred) = cli.preferred_reader {
        tracing::info!(preferred = %preferred, "preferred reader set");
        cfg.reader.preferred = Some(preferred);
    }
    if cli.simulate {
        cfg.reader.backend = BackendKind::Simulated;
    }

    match cli.command {
        Commands::Types => {
            for t in catalog::CATALOG {
                println!("{:<16} {}", t.name, t.sku);
            }
        }
        Commands::Preset { material } => {
            let spec = catalog::preset(&material)
                .with_context(|| format!("no preset for filament type {material:?}"))?;
            println!("{}", spec.to_json_pretty()?);
        }
        command => run_with_reader(cfg, command).await?,
    }

    Ok(())
}

async fn run_with_reader(cfg: SpoolTagConfig, command: Commands) -> anyhow::Result<()> {
    let reader = SpoolReader::from_config(open_backend(&cfg), &cfg);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let locator = reader.spawn_locator(cfg.locator_interval(), shutdown_rx);

    let result = execute(&reader, command).await;

    let _ = shutdown_tx.send(());
    locator.await?;
    result
}

async fn execute(reader: &SpoolReader, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Readers => list_readers(reader)?,
        Commands::Read => {
            let spec = run_blocking(reader, |r| r.read_spool()).await?;
            println!("{}", spec.to_json_pretty()?);
        }
        Commands::Dump => {
            let dump = run_blocking(reader, |r| r.read_spool_raw()).await?;
            if let Some(uid) = &dump.uid {
                println!("UID: {uid}\n");
            }
            println!("{}", dump.text);
        }
        Commands::Write { spec, preset } => {
            let spec = load_spec(spec, preset)?;
            run_blocking(reader, move |r| r.write_spool(&spec)).await?;
            println!("Write success");
        }
        Commands::Types | Commands::Preset { .. } => {}
    }
    Ok(())
}

fn list_readers(reader: &SpoolReader) -> anyhow::Result<()> {
    let attached = reader.locator().attached_readers()?;
    if attached.is_empty() {
        println!("No readers attached");
    }
    for name in &attached {
        println!("{name}");
    }
    match reader.locator().current() {
        Some(selected) => println!("\nSelected: {selected}"),
        None => println!("\nNo supported reader found"),
    }
    Ok(())
}

fn load_spec(path: Option<PathBuf>, preset: Option<String>) -> anyhow::Result<SpoolSpec> {
    if let Some(material) = preset {
        return catalog::preset(&material)
            .with_context(|| format!("no preset for filament type {material:?}"));
    }
    let path = path.context("either --spec or --preset is required")?;
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(SpoolSpec::from_json(&json)?)
}

/// Run a blocking reader operation on a worker thread. Ctrl-C cancels the
/// tag wait and the operation then returns `Cancelled`.
async fn run_blocking<T, F>(reader: &SpoolReader, op: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce(&SpoolReader) -> Result<T, ReaderError> + Send + 'static,
{
    if !reader.get_connection_state() {
        eprintln!("No supported reader attached");
    } else {
        eprintln!("Present a tag to the reader (Ctrl-C to cancel)");
    }

    let worker = reader.clone();
    let mut task = tokio::task::spawn_blocking(move || op(&worker));
    let result = tokio::select! {
        res = &mut task => res?,
        _ = tokio::signal::ctrl_c() => {
            reader.cancel_wait_for_tag();
            task.await?
        }
    };
    Ok(result?)
}
