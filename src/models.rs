//! Data models for conversation history and usage tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A prompt typed by the user
    User,
    /// A reply returned by the API
    Assistant,
}

impl Role {
    /// Wire/database representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Decode a stored role string.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded conversational message.
///
/// Turns are append-only and ordered by timestamp, with the auto-assigned
/// id breaking ties for turns recorded within the same instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryTurn {
    /// Auto-assigned monotonic identifier
    pub id: i64,

    /// Who produced this turn
    pub role: Role,

    /// Message text
    pub content: String,

    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,
}

/// One recorded billing event for a single API call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Auto-assigned monotonic identifier
    pub id: i64,

    /// When the call completed
    pub timestamp: DateTime<Utc>,

    /// Total tokens consumed by the call
    pub tokens_used: i64,

    /// Model name echoed by the API response
    pub model: String,

    /// Cost in USD computed against the rate table
    pub cost: f64,
}
