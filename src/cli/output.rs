use std::fmt::Write as FmtWrite;

use crate::models::{OutputFormat, RunReport};

pub trait Formatter {
    fn format_run_report(&self, report: &RunReport) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub embedding_url: String,
    pub embedding_model: String,
    pub embedding_healthy: bool,
    pub embedding_error: Option<String>,
    pub store_table: String,
    pub store_connected: bool,
    pub store_rows: Option<u64>,
    pub store_error: Option<String>,
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_run_report(&self, report: &RunReport) -> String {
        let mut output = String::new();
        let title = if report.cancelled {
            "Run Cancelled"
        } else {
            "Run Complete"
        };
        writeln!(output, "{}", title).unwrap();
        writeln!(output, "{}", "-".repeat(title.len())).unwrap();
        writeln!(output, "Documents:      {}", report.embed.documents).unwrap();
        writeln!(output, "Batches:        {}", report.embed.batches).unwrap();
        writeln!(output, "Embedded:       {}", report.embed.processed).unwrap();
        writeln!(output, "Failed:         {}", report.embed.failed).unwrap();
        writeln!(output, "Skipped empty:  {}", report.embed.skipped_empty).unwrap();
        writeln!(output, "Persisted:      {}", report.sink.persisted).unwrap();
        if report.sink.persist_failed > 0 {
            writeln!(output, "Persist failed: {}", report.sink.persist_failed).unwrap();
        }
        if report.worker_setup_failures > 0 {
            writeln!(output, "Worker setup failures: {}", report.worker_setup_failures).unwrap();
        }
        writeln!(output, "Duration:       {}ms", report.duration_ms).unwrap();
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();

        let embedding = if status.embedding_healthy {
            "[HEALTHY]"
        } else {
            "[UNREACHABLE]"
        };
        writeln!(output, "Embedding:  {} {}", status.embedding_url, embedding).unwrap();
        writeln!(output, "  Model:    {}", status.embedding_model).unwrap();
        if let Some(ref e) = status.embedding_error {
            writeln!(output, "  Error:    {}", e).unwrap();
        }
        writeln!(output).unwrap();

        let store = if status.store_connected {
            "[CONNECTED]"
        } else {
            "[DISCONNECTED]"
        };
        writeln!(output, "Store:      {} {}", status.store_table, store).unwrap();
        if let Some(rows) = status.store_rows {
            writeln!(output, "  Rows:     {}", rows).unwrap();
        }
        if let Some(ref e) = status.store_error {
            writeln!(output, "  Error:    {}", e).unwrap();
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render(&self, value: &serde_json::Value) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e)) + "\n"
    }
}

impl Formatter for JsonFormatter {
    fn format_run_report(&self, report: &RunReport) -> String {
        match serde_json::to_value(report) {
            Ok(value) => self.render(&value),
            Err(e) => self.format_error(&e.to_string()),
        }
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        self.render(&serde_json::json!({
            "embedding": {
                "url": status.embedding_url,
                "model": status.embedding_model,
                "healthy": status.embedding_healthy,
                "error": status.embedding_error,
            },
            "store": {
                "table": status.store_table,
                "connected": status.store_connected,
                "rows": status.store_rows,
                "error": status.store_error,
            },
        }))
    }

    fn format_message(&self, message: &str) -> String {
        self.render(&serde_json::json!({"message": message}))
    }

    fn format_error(&self, error: &str) -> String {
        self.render(&serde_json::json!({"error": error}))
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_run_report(&self, report: &RunReport) -> String {
        let mut output = String::new();
        writeln!(output, "## Ingestion Run\n").unwrap();
        writeln!(output, "| Metric | Count |").unwrap();
        writeln!(output, "|--------|-------|").unwrap();
        let rows = [
            ("Documents", report.embed.documents),
            ("Batches", report.embed.batches),
            ("Embedded", report.embed.processed),
            ("Failed", report.embed.failed),
            ("Skipped empty", report.embed.skipped_empty),
            ("Persisted", report.sink.persisted),
            ("Persist failed", report.sink.persist_failed),
            ("Worker setup failures", report.worker_setup_failures),
            ("Duration (ms)", report.duration_ms),
        ];
        for (name, value) in rows {
            writeln!(output, "| {} | {} |", name, value).unwrap();
        }
        if report.cancelled {
            writeln!(output, "\n_Run was cancelled before the input was exhausted._").unwrap();
        }
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "## Status\n").unwrap();
        let embedding = if status.embedding_healthy { "✅" } else { "❌" };
        let store = if status.store_connected { "✅" } else { "❌" };
        writeln!(
            output,
            "- **Embedding**: {} `{}` ({})",
            embedding, status.embedding_url, status.embedding_model
        )
        .unwrap();
        writeln!(output, "- **Store**: {} `{}`", store, status.store_table).unwrap();
        if let Some(rows) = status.store_rows {
            writeln!(output, "  - Rows: {}", rows).unwrap();
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> **Error**: {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmbedStats, SinkStats};

    fn report() -> RunReport {
        RunReport {
            embed: EmbedStats {
                documents: 3,
                batches: 2,
                remote_calls: 2,
                processed: 2,
                failed: 0,
                skipped_empty: 1,
            },
            sink: SinkStats {
                persisted: 2,
                persist_failed: 0,
            },
            duration_ms: 42,
            ..Default::default()
        }
    }

    #[test]
    fn test_text_report() {
        let out = TextFormatter.format_run_report(&report());
        assert!(out.starts_with("Run Complete"));
        assert!(out.contains("Skipped empty:  1"));
        assert!(!out.contains("Persist failed"));
    }

    #[test]
    fn test_json_report_roundtrips() {
        let out = JsonFormatter::new(false).format_run_report(&report());
        let parsed: RunReport = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(parsed, report());
    }

    #[test]
    fn test_markdown_report_table() {
        let out = MarkdownFormatter.format_run_report(&report());
        assert!(out.contains("| Persisted | 2 |"));
    }
}
