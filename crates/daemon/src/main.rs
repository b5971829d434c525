//! gitnotes daemon entry point.
//!
//! Loads configuration, opens the note store, runs the background flush loop
//! and feeds notes from stdin until end of input or a termination signal.

mod gateway;
mod logging;
mod signals;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use gitnotes_core::config::expand_tilde;
use gitnotes_core::models::FlushOutcome;
use gitnotes_core::{run_flush_loop, shutdown_channel, NoteSaver, NoteStore, NotesConfig};

use crate::gateway::run_gateway;

/// How long the flush loop gets to finish after shutdown is requested.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// Buffered note storage backed by a Git repository.
#[derive(Parser, Debug)]
#[command(name = "gitnotes", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "~/.config/gitnotes/config.toml")]
    config: PathBuf,

    /// Override the log level from the config file and RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the daemon: one note per non-empty stdin line, flushed in batches.
    Run,

    /// Save a single note and push it right away.
    Add {
        /// Note text; multiple words are joined with spaces.
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Open the store (cloning if needed) and report its state.
    Check,

    /// Print a config template to stdout.
    Init,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let Cli { config: config_arg, log_level, command } = Cli::parse();

    if let Commands::Init = command {
        print!("{}", NotesConfig::default_template());
        return Ok(());
    }

    let config_path = expand_tilde(&config_arg);
    let config = NotesConfig::load_and_resolve(&config_path)
        .with_context(|| format!("failed to load config: {}", config_path.display()))?;

    let _log_guard = logging::init(
        &config.environment,
        &config.logging.level,
        log_level.as_deref(),
        config.logging.dir.as_deref(),
    )?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let result = runtime.block_on(async {
        match command {
            Commands::Run => cmd_run(&config, &config_path).await,
            Commands::Add { text } => cmd_add(&config, &text.join(" ")).await,
            Commands::Check => cmd_check(&config),
            Commands::Init => Ok(()),
        }
    });

    // A pending stdin read would otherwise keep the runtime alive.
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

fn open_store(config: &NotesConfig) -> Result<NoteStore> {
    let store_config = config.store_config().context("invalid store settings")?;
    NoteStore::open(store_config).context("failed to initialize note store")
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

async fn cmd_run(config: &NotesConfig, config_path: &Path) -> Result<()> {
    info!("========================================");
    info!("  gitnotes v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    info!("Config file    : {}", config_path.display());
    info!("Repository     : {}", config.repository.url);
    info!("Working copy   : {}", config.repository.path.display());
    info!("Branch         : {}", config.repository.branch);
    info!("Buffer size    : {}", config.buffer.size);
    info!("Flush interval : {}s", config.buffer.flush_interval_secs);
    info!("========================================");

    let store = Arc::new(open_store(config)?);
    let (trigger, signal) = shutdown_channel();

    let flush_handle = tokio::spawn(run_flush_loop(store.clone(), trigger.subscribe()));

    let saver = NoteSaver::new(store.clone());
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());

    tokio::select! {
        res = signals::shutdown_on_signal(&trigger) => {
            if let Err(e) = res {
                error!(error = %e, "failed to listen for signals");
            }
        }
        res = run_gateway(stdin, &saver, signal) => {
            if let Err(e) = res {
                error!(error = %e, "failed to read notes from stdin");
            }
        }
    }
    trigger.trigger();

    match tokio::time::timeout(SHUTDOWN_GRACE, flush_handle).await {
        Ok(Ok(())) => info!("flush loop stopped gracefully"),
        Ok(Err(e)) => warn!("flush loop task error: {}", e),
        Err(_) => warn!(
            "flush loop did not stop within {}s, forcing shutdown",
            SHUTDOWN_GRACE.as_secs()
        ),
    }

    let stats = store.stats();
    info!(
        flushes = stats.flushes,
        notes_flushed = stats.notes_flushed,
        failures = stats.failures,
        pending = store.pending_count(),
        "gitnotes stopped"
    );
    Ok(())
}

async fn cmd_add(config: &NotesConfig, text: &str) -> Result<()> {
    let store = Arc::new(open_store(config)?);
    let saver = NoteSaver::new(store.clone());
    let path = saver.save(text).context("failed to save note")?;

    match store.flush().await {
        Ok(FlushOutcome::Flushed(report)) => {
            println!("{} ({})", path.display(), report.commit);
            Ok(())
        }
        Ok(FlushOutcome::NothingToDo) => bail!("note was written but nothing was flushed"),
        Err(e) => Err(e).context("note was written but could not be pushed"),
    }
}

fn cmd_check(config: &NotesConfig) -> Result<()> {
    let store = open_store(config)?;
    println!("Working copy : {}", store.workdir().display());
    println!("Branch       : {}", config.repository.branch);
    println!("Save to      : {}", config.repository.save_to.display());
    println!("State        : {}", store.state());
    println!("Pending      : {}", store.pending_count());
    Ok(())
}
