//! # prosa
//!
//! Interactive terminal chat client for OpenAI-compatible chat-completion
//! APIs with local persistence:
//!
//! - [`backend::ChatBackend`] - conversation orchestrator (persist, call,
//!   record, export)
//! - [`db::ChatDatabase`] - SQLite history store and usage ledger
//! - [`rates::RateTable`] - per-model pricing and cost computation
//! - [`export::LedgerExporter`] - append-only CSV cost ledger with running
//!   totals
//! - [`command`] - grammar for the interactive command surface
//! - [`repl::Repl`] - the blocking line-oriented command loop
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use prosa::{api::ChatClient, backend::ChatBackend, config::ChatConfig,
//!     db::ChatDatabase, export::LedgerExporter, rates::RateTable};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ChatConfig::from_env()?;
//!     let client = ChatClient::from_config(&config)?;
//!     let db = Arc::new(ChatDatabase::open("chat_history.db")?);
//!     let rates = RateTable::load("model_rates.csv")?;
//!     let exporter = LedgerExporter::new("usage_costs.csv");
//!
//!     let mut backend = ChatBackend::new(config, client, db, rates, exporter);
//!     let outcome = backend.send_prompt("hello").await?;
//!     println!("{}", outcome.reply);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod api_types;
pub mod backend;
pub mod command;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod rates;
pub mod repl;

pub use api::{ChatClient, Completion};
pub use backend::{ChatBackend, ChatOutcome};
pub use command::{Command, CommandError};
pub use config::ChatConfig;
pub use db::ChatDatabase;
pub use error::{ProsaError, Result};
pub use export::{LedgerExporter, LedgerRow};
pub use models::{HistoryTurn, Role, UsageRecord};
pub use rates::RateTable;
