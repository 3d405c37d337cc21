//! Observable sink for documents that could not be embedded.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::models::FailureRecord;

#[derive(Debug, Serialize)]
struct ReportLine<'a> {
    #[serde(flatten)]
    record: &'a FailureRecord,
    recorded_at: DateTime<Utc>,
}

/// Logs every failure and optionally appends it to a JSON Lines report.
pub struct FailureSink {
    report: Option<BufWriter<tokio::fs::File>>,
}

impl FailureSink {
    pub fn log_only() -> Self {
        Self { report: None }
    }

    pub async fn with_report(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self {
            report: Some(BufWriter::new(file)),
        })
    }

    pub async fn record(&mut self, failure: &FailureRecord) {
        error!(
            file = %failure.identifier,
            reason = %failure.reason,
            "embedding failed for file"
        );

        if let Some(writer) = self.report.as_mut() {
            let line = ReportLine {
                record: failure,
                recorded_at: Utc::now(),
            };
            let result = match serde_json::to_string(&line) {
                Ok(mut json) => {
                    json.push('\n');
                    writer.write_all(json.as_bytes()).await
                }
                Err(e) => Err(std::io::Error::other(e)),
            };
            if let Err(e) = result {
                warn!(error = %e, "could not append to failure report");
            }
        }
    }

    /// Drain the failure channel until every sender is gone.
    pub async fn run(mut self, mut failures: mpsc::Receiver<FailureRecord>) -> u64 {
        let mut count = 0;
        while let Some(failure) = failures.recv().await {
            self.record(&failure).await;
            count += 1;
        }

        if let Some(mut writer) = self.report.take()
            && let Err(e) = writer.flush().await
        {
            warn!(error = %e, "could not flush failure report");
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(id: &str) -> FailureRecord {
        FailureRecord {
            identifier: id.to_string(),
            reason: "embedding timeout".to_string(),
        }
    }

    #[tokio::test]
    async fn test_run_counts_failures() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(failure("a.txt")).await.unwrap();
        tx.send(failure("b.txt")).await.unwrap();
        drop(tx);

        assert_eq!(FailureSink::log_only().run(rx).await, 2);
    }

    #[tokio::test]
    async fn test_report_is_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failures.jsonl");

        let (tx, rx) = mpsc::channel(4);
        tx.send(failure("a.txt")).await.unwrap();
        tx.send(failure("b.txt")).await.unwrap();
        drop(tx);

        let sink = FailureSink::with_report(&path).await.unwrap();
        assert_eq!(sink.run(rx).await, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["identifier"], "a.txt");
        assert_eq!(lines[1]["reason"], "embedding timeout");
        assert!(lines[0]["recorded_at"].is_string());
    }
}
