//! Conversation orchestrator.
//!
//! Ties the history store, the remote API, the rate table and the ledger
//! exporter together. The prompt path is strictly sequential: persist the
//! prompt, read the context window, call the API, record usage and the
//! reply, export the ledger row. The reply is only handed back once the
//! export completed.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use crate::api::ChatClient;
use crate::api_types::ChatMessage;
use crate::config::ChatConfig;
use crate::db::ChatDatabase;
use crate::error::Result;
use crate::export::{LedgerExporter, LedgerRow};
use crate::models::{HistoryTurn, Role};
use crate::rates::RateTable;

/// Result of one successful prompt round-trip.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    /// Assistant reply text
    pub reply: String,

    /// Model name echoed by the API
    pub model: String,

    /// Total tokens consumed by the call
    pub tokens_used: i64,

    /// Cost of this call in USD
    pub cost: f64,

    /// Running total across all recorded calls
    pub total_cost: f64,
}

/// Orchestrates a single conversation against the remote API.
pub struct ChatBackend {
    config: ChatConfig,
    client: ChatClient,
    db: Arc<ChatDatabase>,
    rates: RateTable,
    exporter: LedgerExporter,
}

impl ChatBackend {
    /// Create a backend from its collaborators.
    pub fn new(
        config: ChatConfig,
        client: ChatClient,
        db: Arc<ChatDatabase>,
        rates: RateTable,
        exporter: LedgerExporter,
    ) -> Self {
        Self {
            config,
            client,
            db,
            rates,
            exporter,
        }
    }

    /// Shared handle to the underlying store.
    pub fn database(&self) -> Arc<ChatDatabase> {
        Arc::clone(&self.db)
    }

    /// Send a prompt through the full pipeline.
    ///
    /// The user turn is persisted before the remote call, so a failed call
    /// never loses the prompt; it does leave a user turn with no matching
    /// assistant reply, which is accepted. On failure no usage record and
    /// no ledger row are written.
    pub async fn send_prompt(&mut self, prompt: &str) -> Result<ChatOutcome> {
        self.db.append_turn(Role::User, prompt)?;

        let messages = self.build_messages(prompt);
        let completion = self.client.complete(messages).await?;

        let cost = self.rates.cost(completion.total_tokens, &completion.model);
        self.db
            .append_usage(completion.total_tokens, &completion.model, cost)?;

        self.db.append_turn(Role::Assistant, &completion.text)?;

        // The ledger now includes this call, so the sum is the running total.
        // A read fault degrades to 0 rather than losing the reply.
        let total_cost = self.db.total_cost().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read running total, exporting 0");
            0.0
        });

        // The export must complete before the reply is acknowledged
        self.exporter.write_row(&LedgerRow {
            timestamp: Utc::now(),
            tokens_used: completion.total_tokens,
            model: completion.model.clone(),
            cost,
            total_cost,
        })?;

        info!(
            model = %completion.model,
            tokens_used = completion.total_tokens,
            cost,
            total_cost,
            "Recorded chat completion"
        );

        Ok(ChatOutcome {
            reply: completion.text,
            model: completion.model,
            tokens_used: completion.total_tokens,
            cost,
            total_cost,
        })
    }

    /// Assemble the outgoing message window for the current prompt.
    ///
    /// The recent-history window is read after the prompt was persisted, so
    /// it normally already ends with the prompt; it is appended explicitly
    /// only when a degraded (empty or stale) window lacks it, keeping the
    /// prompt in the request exactly once.
    fn build_messages(&self, prompt: &str) -> Vec<ChatMessage> {
        let window = self.db.recent_turns(self.config.context_turns).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read recent history, sending prompt without context");
            Vec::new()
        });

        let mut messages: Vec<ChatMessage> = window
            .iter()
            .map(|t| ChatMessage::new(t.role.as_str(), t.content.clone()))
            .collect();

        let ends_with_prompt = messages
            .last()
            .is_some_and(|m| m.role == "user" && m.content == prompt);
        if !ends_with_prompt {
            messages.push(ChatMessage::new("user", prompt));
        }

        messages
    }

    /// All turns recorded within the closed date range, oldest first.
    ///
    /// A read fault is reported as an empty result so the command loop can
    /// keep running.
    pub fn history_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<HistoryTurn> {
        self.db.turns_in_range(start, end).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to query history range");
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

    fn mock_backend(mock_server: &MockServer, dir: &std::path::Path) -> ChatBackend {
        let config = ChatConfig::new(mock_server.uri(), "gpt-4", "sk-test").with_timeout_secs(5);
        let client = ChatClient::from_config(&config).unwrap();
        let db = Arc::new(ChatDatabase::open_in_memory().unwrap());
        let mut rates = std::collections::HashMap::new();
        rates.insert("gpt-4".to_string(), 0.03);
        let exporter = LedgerExporter::new(dir.join("usage_costs.csv"));

        ChatBackend::new(config, client, db, RateTable::from_rates(rates), exporter)
    }

    fn success_body(tokens: i64, content: &str) -> serde_json::Value {
        serde_json::json!({
            "model": "gpt-4",
            "usage": { "total_tokens": tokens },
            "choices": [ { "message": { "role": "assistant", "content": content } } ]
        })
    }

    #[tokio::test]
    async fn test_send_prompt_records_both_turns() {
        let mock_server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body(1500, "reply")))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut backend = mock_backend(&mock_server, dir.path());

        let outcome = backend.send_prompt("hello").await.unwrap();
        assert_eq!(outcome.reply, "reply");
        assert!((outcome.cost - 0.045).abs() < 1e-12);
        assert!((outcome.total_cost - 0.045).abs() < 1e-12);

        let turns = backend.database().recent_turns(5).unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "hello");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].content, "reply");
    }

    #[tokio::test]
    async fn test_prompt_sent_once_in_window() {
        let mock_server = MockServer::start().await;

        // The persisted prompt is the last window entry; it must not be
        // duplicated in the outgoing message list.
        Mock::given(matchers::method("POST"))
            .and(matchers::body_partial_json(serde_json::json!({
                "messages": [ { "role": "user", "content": "only once" } ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body(10, "ok")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut backend = mock_backend(&mock_server, dir.path());
        backend.send_prompt("only once").await.unwrap();
    }

    #[tokio::test]
    async fn test_window_replays_recent_turns() {
        let mock_server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body(10, "ok")))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut backend = mock_backend(&mock_server, dir.path());

        backend.send_prompt("first").await.unwrap();
        backend.send_prompt("second").await.unwrap();

        // first user + first reply + second user + second reply
        let turns = backend.database().recent_turns(10).unwrap();
        assert_eq!(turns.len(), 4);

        let messages = backend.build_messages("third");
        // Window of 5: reply("ok"), user("second"), reply("ok") ... plus "third"
        assert_eq!(messages.last().unwrap().content, "third");
        assert_eq!(
            messages.iter().filter(|m| m.content == "third").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_failed_call_keeps_prompt_but_no_usage() {
        let mock_server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("server exploded"))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut backend = mock_backend(&mock_server, dir.path());

        let result = backend.send_prompt("doomed").await;
        assert!(result.is_err());

        let db = backend.database();
        let turns = db.recent_turns(5).unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "doomed");
        assert!(db.usage_records().unwrap().is_empty());
        assert!(!dir.path().join("usage_costs.csv").exists());
    }

    #[tokio::test]
    async fn test_export_failure_still_records_reply() {
        let mock_server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body(1000, "reply")))
            .mount(&mock_server)
            .await;

        let config = ChatConfig::new(mock_server.uri(), "gpt-4", "sk-test").with_timeout_secs(5);
        let client = ChatClient::from_config(&config).unwrap();
        let db = Arc::new(ChatDatabase::open_in_memory().unwrap());
        let exporter = LedgerExporter::new("/nonexistent/dir/usage_costs.csv");
        let mut backend =
            ChatBackend::new(config, client, db, RateTable::empty(), exporter);

        // The export blocks the acknowledgment, not reply persistence: the
        // paid-for call keeps both its turns and its usage record.
        let result = backend.send_prompt("hello").await;
        assert!(matches!(result, Err(crate::error::ProsaError::Export(_))));

        let db = backend.database();
        let turns = db.recent_turns(5).unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].content, "reply");
        assert_eq!(db.usage_records().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_running_total_accumulates() {
        let mock_server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body(1000, "ok")))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut backend = mock_backend(&mock_server, dir.path());

        let first = backend.send_prompt("one").await.unwrap();
        let second = backend.send_prompt("two").await.unwrap();

        assert!((first.total_cost - 0.03).abs() < 1e-12);
        assert!((second.total_cost - 0.06).abs() < 1e-12);

        let contents = std::fs::read_to_string(dir.path().join("usage_costs.csv")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert!(lines[1].ends_with("0.0300,0.0300"));
        assert!(lines[2].ends_with("0.0300,0.0600"));
    }

    #[tokio::test]
    async fn test_unknown_model_uses_default_rate() {
        let mock_server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "experimental-model",
                "usage": { "total_tokens": 1000 },
                "choices": [ { "message": { "role": "assistant", "content": "ok" } } ]
            })))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut backend = mock_backend(&mock_server, dir.path());

        let outcome = backend.send_prompt("hi").await.unwrap();
        assert!((outcome.cost - 0.002).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_history_between_returns_today() {
        let mock_server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body(10, "ok")))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut backend = mock_backend(&mock_server, dir.path());
        backend.send_prompt("hello").await.unwrap();

        let today = Utc::now().date_naive();
        let turns = backend.history_between(today, today);
        assert_eq!(turns.len(), 2);

        let empty = backend.history_between(
            today.pred_opt().unwrap(),
            today.pred_opt().unwrap(),
        );
        assert!(empty.is_empty());
    }
}
