//! Per-model pricing table and cost computation.
//!
//! The rate file is a small CSV with at least `model` and `rate-1k-tkns`
//! columns. It is read once at startup; a missing or malformed file is
//! fatal. Models absent from the table fall back to a default rate.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use crate::error::{ProsaError, Result};

/// Fallback price per 1000 tokens for models missing from the table.
pub const DEFAULT_RATE_PER_1K: f64 = 0.002;

/// Per-model price-per-1000-tokens lookup.
#[derive(Debug, Clone)]
pub struct RateTable {
    rates: HashMap<String, f64>,
    default_rate: f64,
}

impl RateTable {
    /// Load the rate table from a CSV file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ProsaError::RateTable(format!("cannot read {}: {}", path.display(), e))
        })?;

        let table = Self::parse(&contents)?;
        info!(
            path = %path.display(),
            models = table.rates.len(),
            "Loaded model rate table"
        );
        Ok(table)
    }

    /// Parse rate table CSV contents.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut lines = contents.lines().filter(|l| !l.trim().is_empty());

        let header = lines
            .next()
            .ok_or_else(|| ProsaError::RateTable("rate file is empty".to_string()))?;
        let columns: Vec<&str> = header.split(',').map(str::trim).collect();

        let model_col = column_index(&columns, "model")?;
        let rate_col = column_index(&columns, "rate-1k-tkns")?;

        let mut rates = HashMap::new();
        for (lineno, line) in lines.enumerate() {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let model = fields.get(model_col).copied().unwrap_or("");
            let raw_rate = fields.get(rate_col).copied().unwrap_or("");

            if model.is_empty() {
                return Err(ProsaError::RateTable(format!(
                    "row {}: missing model name",
                    lineno + 2
                )));
            }

            let rate: f64 = raw_rate.parse().map_err(|_| {
                ProsaError::RateTable(format!(
                    "row {}: invalid rate {:?} for model {}",
                    lineno + 2,
                    raw_rate,
                    model
                ))
            })?;

            rates.insert(model.to_string(), rate);
        }

        Ok(Self {
            rates,
            default_rate: DEFAULT_RATE_PER_1K,
        })
    }

    /// Build a table from explicit rates (for tests).
    pub fn from_rates(rates: HashMap<String, f64>) -> Self {
        Self {
            rates,
            default_rate: DEFAULT_RATE_PER_1K,
        }
    }

    /// Build an empty table that always returns the default rate.
    pub fn empty() -> Self {
        Self::from_rates(HashMap::new())
    }

    /// Override the fallback rate for unknown models.
    pub fn with_default_rate(mut self, rate: f64) -> Self {
        self.default_rate = rate;
        self
    }

    /// Price per 1000 tokens for a model, or the default rate when absent.
    pub fn rate_for(&self, model: &str) -> f64 {
        self.rates.get(model).copied().unwrap_or(self.default_rate)
    }

    /// Cost in USD of consuming `tokens` tokens with the given model.
    pub fn cost(&self, tokens: i64, model: &str) -> f64 {
        (tokens as f64 / 1000.0) * self.rate_for(model)
    }
}

fn column_index(columns: &[&str], name: &str) -> Result<usize> {
    columns
        .iter()
        .position(|c| *c == name)
        .ok_or_else(|| ProsaError::RateTable(format!("missing required column: {}", name)))
}
