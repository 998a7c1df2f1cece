//! Interactive command loop.
//!
//! One line in, one command out, strictly serialized: the next line is not
//! read until the current command's full chain of side effects (persistence,
//! export, printing) has completed.

use std::io::Write;

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

use crate::backend::{ChatBackend, ChatOutcome};
use crate::command::{self, Command, EXIT_KEYWORD};
use crate::error::Result;
use crate::models::HistoryTurn;

/// Interactive chat loop over stdin.
pub struct Repl {
    backend: ChatBackend,
}

impl Repl {
    /// Create a loop around an orchestrator.
    pub fn new(backend: ChatBackend) -> Self {
        Self { backend }
    }

    /// Run until the exit command or end of input.
    pub async fn run(&mut self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();

        loop {
            print_prompt()?;

            let Some(line) = lines.next_line().await? else {
                // EOF counts as a clean exit
                println!();
                break;
            };

            match command::parse(&line) {
                Ok(Command::Exit) => {
                    println!("Session closed.");
                    break;
                }
                Ok(Command::Empty) => {}
                Ok(Command::Prompt(prompt)) => self.handle_prompt(&prompt).await,
                Ok(Command::History { start, end }) => self.handle_history(start, end),
                Err(e) => println!("{}", e),
            }
        }

        Ok(())
    }

    async fn handle_prompt(&mut self, prompt: &str) {
        match self.backend.send_prompt(prompt).await {
            Ok(outcome) => print_outcome(&outcome),
            Err(e) => {
                error!(error = %e, "Prompt failed");
                println!("{}", format!("Request failed: {}", e).red());
            }
        }
    }

    fn handle_history(&self, start: chrono::NaiveDate, end: chrono::NaiveDate) {
        let turns = self.backend.history_between(start, end);
        if turns.is_empty() {
            println!("No history found for that period.");
            return;
        }

        println!("\nHistory from {} to {}:", start, end);
        for turn in &turns {
            println!("{}", format_turn(turn));
        }
        println!();
    }
}

fn print_prompt() -> Result<()> {
    let prompt = format!(
        "Ask something, or \"history DD/MM/YYYY - DD/MM/YYYY\", or \"{}\" to quit: ",
        EXIT_KEYWORD
    );
    print!("{}", prompt.green());
    std::io::stdout().flush()?;
    Ok(())
}

fn print_outcome(outcome: &ChatOutcome) {
    println!("\n{}\n", outcome.reply);
    println!(
        "{}",
        format!(
            "Tokens used: {}, cost: ${:.4}, total: ${:.4}",
            outcome.tokens_used, outcome.cost, outcome.total_cost
        )
        .bright_black()
    );
}

fn format_turn(turn: &HistoryTurn) -> String {
    format!("[{}] ({}): {}", turn.timestamp.to_rfc3339(), turn.role, turn.content)
}
