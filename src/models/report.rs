//! Run-level reporting models.

use serde::{Deserialize, Serialize};

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
    /// Documentation-friendly Markdown format
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// Counters for the embedding side of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedStats {
    pub documents: u64,
    pub batches: u64,
    pub remote_calls: u64,
    pub processed: u64,
    pub failed: u64,
    pub skipped_empty: u64,
}

impl EmbedStats {
    pub fn merge(&mut self, other: &EmbedStats) {
        self.documents += other.documents;
        self.batches += other.batches;
        self.remote_calls += other.remote_calls;
        self.processed += other.processed;
        self.failed += other.failed;
        self.skipped_empty += other.skipped_empty;
    }
}

/// Counters for the persistence side of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkStats {
    pub persisted: u64,
    pub persist_failed: u64,
}

impl SinkStats {
    pub fn merge(&mut self, other: &SinkStats) {
        self.persisted += other.persisted;
        self.persist_failed += other.persist_failed;
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    #[serde(flatten)]
    pub embed: EmbedStats,
    #[serde(flatten)]
    pub sink: SinkStats,
    pub worker_setup_failures: u64,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl RunReport {
    /// True when every input document landed in exactly one outcome bucket.
    pub fn is_partition_complete(&self) -> bool {
        self.embed.processed + self.embed.failed + self.embed.skipped_empty == self.embed.documents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("MD".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_stats_merge() {
        let mut total = EmbedStats::default();
        total.merge(&EmbedStats {
            documents: 3,
            batches: 2,
            remote_calls: 2,
            processed: 2,
            failed: 0,
            skipped_empty: 1,
        });
        total.merge(&EmbedStats {
            documents: 2,
            batches: 1,
            remote_calls: 1,
            processed: 0,
            failed: 2,
            skipped_empty: 0,
        });
        assert_eq!(total.documents, 5);
        assert_eq!(total.remote_calls, 3);

        let report = RunReport {
            embed: total,
            ..Default::default()
        };
        assert!(report.is_partition_complete());
    }

    #[test]
    fn test_report_json_is_flat() {
        let report = RunReport::default();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("documents").is_some());
        assert!(json.get("persisted").is_some());
        assert!(json.get("embed").is_none());
    }
}
