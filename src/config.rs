//! Runtime configuration for the chat client.

use crate::error::{ProsaError, Result};

/// Environment variable holding the chat completion endpoint URL.
pub const ENV_API_ROUTE: &str = "OPEN_AI_API_ROUTE";

/// Environment variable holding the model identifier.
pub const ENV_MODEL: &str = "MODEL_SELECTED";

/// Environment variable holding the bearer credential.
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";

/// Number of recent turns replayed to the API for conversational memory.
pub const DEFAULT_CONTEXT_TURNS: usize = 5;

/// Chat client configuration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Chat completion endpoint URL
    pub endpoint: String,

    /// Model identifier sent with each request
    pub model: String,

    /// Bearer credential for the Authorization header
    pub api_key: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Size of the recent-history context window
    pub context_turns: usize,
}

impl ChatConfig {
    /// Build the configuration from the environment.
    ///
    /// All three variables are required; a missing one is reported by name.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            endpoint: require_env(ENV_API_ROUTE)?,
            model: require_env(ENV_MODEL)?,
            api_key: require_env(ENV_API_KEY)?,
            timeout_secs: 60,
            context_turns: DEFAULT_CONTEXT_TURNS,
        })
    }

    /// Create a config with explicit values (for tests).
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
            timeout_secs: 60,
            context_turns: DEFAULT_CONTEXT_TURNS,
        }
    }

    /// Set a custom endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set a custom context window size.
    pub fn with_context_turns(mut self, turns: usize) -> Self {
        self.context_turns = turns;
        self
    }

    /// Set a custom request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| ProsaError::Config(format!("{} environment variable not set", name)))
}
