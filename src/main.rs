//! prosa - terminal chat client with local history and a token-cost ledger.
//!
//! ## Usage
//!
//! ```bash
//! export OPEN_AI_API_ROUTE=https://api.openai.com/v1/chat/completions
//! export MODEL_SELECTED=gpt-4
//! export OPENAI_API_KEY=sk-...
//!
//! prosa
//!
//! # With verbose logging
//! prosa -v
//!
//! # With custom file locations
//! prosa --db ./chat_history.db --rates ./model_rates.csv --export ./usage_costs.csv
//! ```
//!
//! Inside the session: type a prompt, `history DD/MM/YYYY - DD/MM/YYYY` for
//! a range query, or `sair` to quit.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use anyhow::Context;

use prosa::api::ChatClient;
use prosa::backend::ChatBackend;
use prosa::config::ChatConfig;
use prosa::db::ChatDatabase;
use prosa::export::LedgerExporter;
use prosa::logging;
use prosa::rates::RateTable;
use prosa::repl::Repl;

/// Terminal chat client with local history and a token-cost ledger.
#[derive(Parser, Debug)]
#[command(name = "prosa")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory for log files (defaults to .prosa/logs/)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Path to the SQLite history database
    #[arg(long, default_value = "chat_history.db")]
    db: PathBuf,

    /// Path to the model rate table CSV
    #[arg(long, default_value = "model_rates.csv")]
    rates: PathBuf,

    /// Path to the usage cost ledger CSV
    #[arg(long, default_value = "usage_costs.csv")]
    export: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match logging::init_logging(cli.log_dir.clone(), cli.verbose > 0) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::from(1);
        }
    };

    match run(&cli).await {
        Ok(()) => {
            info!("prosa exited normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = ChatConfig::from_env()?;
    let rates = RateTable::load(&cli.rates)?;
    let db = Arc::new(
        ChatDatabase::open(&cli.db)
            .with_context(|| format!("cannot open database at {}", cli.db.display()))?,
    );
    let exporter = LedgerExporter::new(&cli.export);
    let client = ChatClient::from_config(&config)?;

    info!(
        model = %config.model,
        db = %cli.db.display(),
        export = %cli.export.display(),
        "Starting chat session"
    );

    let backend = ChatBackend::new(config, client, db, rates, exporter);
    Repl::new(backend).run().await?;
    Ok(())
}
