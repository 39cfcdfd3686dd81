//! Charter: constitutional amendment governance for a local repository.
//!
//! Proposals move through drafting, community review, weighted voting and
//! finalization. Review length, voting length, quorum and threshold all scale
//! with the proposal's impact class.
//!
//! # Lifecycle
//!
//! | impact   | review | voting | quorum | threshold |
//! |----------|--------|--------|--------|-----------|
//! | breaking | 21d    | 14d    | 10     | 75%       |
//! | major    | 14d    | 7d     | 7      | 66%       |
//! | minor    | 7d     | 5d     | 5      | 60%       |
//! | patch    | 3d     | 3d     | 3      | 50%       |
//!
//! Time gates are checked when an operation runs; nothing in Charter runs in
//! the background.
//!
//! # Storage
//!
//! All state lives under `<repo>/.charter/`:
//! - `charter.db`: proposals (one JSON document each, version-checked writes)
//!   and the append-only amendment history
//! - `broker.events.jsonl`: audit line for every store operation
//! - `amendment.events.jsonl`: lifecycle notifications
//! - `config.toml`: framework version, voter roles, eligibility policy
//!
//! # Examples
//!
//! ```bash
//! charter init
//! charter create --title "Require two reviewers" --proposer ada@example.org \
//!     --impact minor --proposed-text "..." --rationale "..." --description "..."
//! charter submit --id require-two-reviewers-1735689600000
//! charter --now 2025-01-09T00:00:00Z start-voting --id require-two-reviewers-1735689600000
//! charter vote --id require-two-reviewers-1735689600000 --voter ada@example.org --decision approve
//! charter tally --id require-two-reviewers-1735689600000 --format text
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: store handle, SQLite broker, config, clock, error taxonomy
//! - [`plugins`]: proposal model, voter registry, comments, tally, workflow

pub mod core;
pub mod plugins;

use crate::core::config::CharterConfig;
use crate::core::error::CharterError;
use crate::core::store::Store;
use crate::core::time::{self, Clock, FixedClock, SystemClock};
use crate::plugins::amendment::{self, AmendmentCommand, AmendmentWorkflow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[clap(
    name = "charter",
    version = env!("CARGO_PKG_VERSION"),
    about = "Constitutional amendment workflow: review, weighted voting, finalization"
)]
struct Cli {
    /// Evaluate time gates as of this RFC 3339 instant instead of the wall clock.
    #[clap(long, global = true)]
    now: Option<String>,
    /// Actor recorded in the audit log.
    #[clap(long, global = true, default_value = "cli")]
    actor: String,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create `.charter/` with a default config in the target directory.
    Init {
        /// Directory to initialize (defaults to current working directory).
        #[clap(short, long)]
        dir: Option<PathBuf>,
    },
    /// Print the command/storage schema as JSON.
    Schema,
    #[clap(flatten)]
    Amendment(AmendmentCommand),
}

fn build_clock(now: Option<&str>) -> Result<Arc<dyn Clock>, CharterError> {
    match now {
        Some(raw) => {
            let at = time::parse_iso(raw).ok_or_else(|| {
                CharterError::ValidationError(format!(
                    "--now expects an RFC 3339 timestamp, got '{}'",
                    raw
                ))
            })?;
            Ok(Arc::new(FixedClock::new(at)))
        }
        None => Ok(Arc::new(SystemClock)),
    }
}

fn init_store(dir: Option<PathBuf>) -> Result<(), CharterError> {
    let target_dir = match dir {
        Some(d) => d,
        None => std::env::current_dir()?,
    };
    let store = Store::init(&target_dir)?;
    crate::core::db::initialize_charter_db(&store.root)?;

    let config_path = store.config_path();
    if !config_path.exists() {
        std::fs::write(&config_path, CharterConfig::default().to_toml()?)?;
    }
    tracing::info!(root = %store.root.display(), "charter store initialized");
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "status": "ok",
            "root": store.root,
            "config": config_path,
        }))?
    );
    Ok(())
}

pub fn run() -> Result<(), CharterError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Init { dir } => init_store(dir),
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&amendment::schema())?);
            Ok(())
        }
        Command::Amendment(command) => {
            let store = Store::discover(&std::env::current_dir()?)?;
            let config = CharterConfig::load(&store.config_path())?;
            let clock = build_clock(cli.now.as_deref())?;
            let workflow = AmendmentWorkflow::open(&store, &config, clock, &cli.actor)?;
            amendment::run_amendment_cli(&workflow, command)
        }
    }
}
