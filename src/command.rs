//! Command grammar for the interactive loop.
//!
//! Each input line parses to exactly one [`Command`]. Date parsing for the
//! history query is centralized here so it can be tested independently of
//! dispatch.

use chrono::NaiveDate;
use thiserror::Error;

/// Keyword that terminates the session.
pub const EXIT_KEYWORD: &str = "sair";

/// Prefix of the history range query.
const HISTORY_KEYWORD: &str = "history";

/// Date format accepted by the history command.
const DATE_FORMAT: &str = "%d/%m/%Y";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Free text forwarded to the remote API
    Prompt(String),

    /// History range query, dates in ascending order
    History {
        /// First day of the range (inclusive)
        start: NaiveDate,
        /// Last day of the range (inclusive)
        end: NaiveDate,
    },

    /// Terminate the session
    Exit,

    /// Blank line, no action
    Empty,
}

/// Input faults reported back to the user without touching the store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    /// The history command did not match the expected pattern
    #[error("invalid history command, expected: history DD/MM/YYYY - DD/MM/YYYY")]
    InvalidHistory,
}

/// Parse one input line into a command.
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let input = line.trim();

    if input.is_empty() {
        return Ok(Command::Empty);
    }

    if input.eq_ignore_ascii_case(EXIT_KEYWORD) {
        return Ok(Command::Exit);
    }

    // Checked slice: the prefix may land inside a multibyte character
    if let Some(prefix) = input.get(..HISTORY_KEYWORD.len())
        && prefix.eq_ignore_ascii_case(HISTORY_KEYWORD)
    {
        return parse_history(input[HISTORY_KEYWORD.len()..].trim());
    }

    Ok(Command::Prompt(input.to_string()))
}

/// Parse the `DD/MM/YYYY - DD/MM/YYYY` tail of a history command.
fn parse_history(range: &str) -> Result<Command, CommandError> {
    let (raw_start, raw_end) = range.split_once('-').ok_or(CommandError::InvalidHistory)?;

    let start = parse_date(raw_start.trim())?;
    let end = parse_date(raw_end.trim())?;

    // Always query in ascending order regardless of how the user typed it
    if start <= end {
        Ok(Command::History { start, end })
    } else {
        Ok(Command::History {
            start: end,
            end: start,
        })
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, CommandError> {
    // Strict: exactly DD/MM/YYYY, no shorthand
    if raw.len() != 10 {
        return Err(CommandError::InvalidHistory);
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| CommandError::InvalidHistory)
}
