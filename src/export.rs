//! Append-only CSV ledger of usage costs with a running total.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{ProsaError, Result};

/// Header written once when the ledger file is first created.
pub const LEDGER_HEADER: &str = "Timestamp, Tokens Used, Model, Cost (USD), Total Cost (USD)";

/// Denormalized export of one usage record plus the running total.
#[derive(Debug, Clone)]
pub struct LedgerRow {
    /// When the call completed
    pub timestamp: DateTime<Utc>,

    /// Total tokens consumed by the call
    pub tokens_used: i64,

    /// Model name echoed by the API
    pub model: String,

    /// Cost of this call in USD
    pub cost: f64,

    /// Sum of all recorded costs up to and including this row
    pub total_cost: f64,
}

impl LedgerRow {
    /// Format the row as a CSV line. Cost fields use fixed 4-decimal form.
    fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{:.4},{:.4}",
            self.timestamp.to_rfc3339(),
            self.tokens_used,
            self.model,
            self.cost,
            self.total_cost
        )
    }
}

/// Appends ledger rows to an external CSV artifact.
///
/// Whether a header is needed is decided once, from the file's existence at
/// construction time. The file is opened per write so a row either lands
/// fully or the write is reported as an error.
pub struct LedgerExporter {
    path: PathBuf,
    needs_header: bool,
}

impl LedgerExporter {
    /// Create an exporter targeting the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let needs_header = !path.exists();
        Self { path, needs_header }
    }

    /// Append one row, writing the header first if the file is new.
    pub fn write_row(&mut self, row: &LedgerRow) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                ProsaError::Export(format!("cannot open {}: {}", self.path.display(), e))
            })?;

        if self.needs_header {
            writeln!(file, "{}", LEDGER_HEADER)
                .map_err(|e| ProsaError::Export(format!("header write failed: {}", e)))?;
            self.needs_header = false;
        }

        writeln!(file, "{}", row.to_csv_line())
            .map_err(|e| ProsaError::Export(format!("row write failed: {}", e)))?;

        debug!(path = %self.path.display(), "Appended ledger row");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row(cost: f64, total: f64) -> LedgerRow {
        LedgerRow {
            timestamp: Utc::now(),
            tokens_used: 1500,
            model: "gpt-4".to_string(),
            cost,
            total_cost: total,
        }
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage_costs.csv");

        let mut exporter = LedgerExporter::new(&path);
        exporter.write_row(&sample_row(0.045, 0.045)).unwrap();
        exporter.write_row(&sample_row(0.015, 0.06)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], LEDGER_HEADER);
        assert!(lines[1].ends_with("0.0450,0.0450"));
        assert!(lines[2].ends_with("0.0150,0.0600"));
    }

    #[test]
    fn test_no_header_when_file_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage_costs.csv");
        std::fs::write(&path, format!("{}\nexisting,1,gpt-4,0.0010,0.0010\n", LEDGER_HEADER))
            .unwrap();

        let mut exporter = LedgerExporter::new(&path);
        exporter.write_row(&sample_row(0.045, 0.046)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches(LEDGER_HEADER).count(), 1);
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn test_row_format_four_decimals() {
        let row = LedgerRow {
            timestamp: Utc::now(),
            tokens_used: 1500,
            model: "gpt-4".to_string(),
            cost: 0.045,
            total_cost: 0.045,
        };

        let line = row.to_csv_line();
        assert!(line.contains(",1500,gpt-4,0.0450,0.0450"));
    }

    #[test]
    fn test_write_to_unwritable_path_fails() {
        let mut exporter = LedgerExporter::new("/nonexistent/dir/usage_costs.csv");
        let result = exporter.write_row(&sample_row(0.01, 0.01));
        assert!(matches!(result, Err(ProsaError::Export(_))));
    }
}
