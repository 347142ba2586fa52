//! Text summary builder for CLI output.
//!
//! Formats the settled upload set as human-readable lines for text mode.

use crate::engine::UploadSimulator;
use crate::model::UploadStatus;
use crate::views::{self, CategoryFilter, StatusCounts};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn status_marker(status: UploadStatus) -> &'static str {
    match status {
        UploadStatus::Uploading => "…",
        UploadStatus::Completed => "✓",
        UploadStatus::Error => "✗",
    }
}

/// Build a text summary of the simulator's active set.
pub(crate) fn build_text_summary(sim: &UploadSimulator) -> TextSummary {
    let mut lines = Vec::new();
    let records = sim.records();

    let tabs: Vec<String> = CategoryFilter::ALL
        .iter()
        .map(|f| {
            let count = match f.category() {
                Some(c) => sim.by_category(c).len(),
                None => records.len(),
            };
            views::tab_label(*f, count)
        })
        .collect();
    lines.push(tabs.join(" | "));

    for r in &records {
        lines.push(format!(
            "{} {:<9} {:<6} {:>10}  {:>3.0}%  {}",
            status_marker(r.status),
            r.id,
            r.category.label(),
            views::format_file_size(r.size_bytes),
            r.progress,
            r.name
        ));
    }

    let counts = StatusCounts::from_records(&records);
    lines.push(format!(
        "Completed: {} | Failed: {} | Uploading: {}",
        counts.completed, counts.error, counts.uploading
    ));

    let stages = views::pipeline_stages(sim.has_completed());
    if !stages.is_empty() {
        lines.push("Data Processing Pipeline:".to_string());
        for (name, state) in stages {
            lines.push(format!("  {name}: {}", state.label()));
        }
    }

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ScriptedOracle;
    use crate::model::FileDescriptor;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    const TICK: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn summary_lists_records_and_pipeline() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let oracle = Arc::new(ScriptedOracle::new(100.0));
        let sim = UploadSimulator::new(TICK, oracle.clone(), tx);
        let done = sim.submit(FileDescriptor::new("scan.png", 2048, "image/png"));
        let failed = sim.submit(FileDescriptor::new("sensor.csv", 0, "text/csv"));
        oracle.fail(&failed.id);
        sim.wait_settled().await;

        let summary = build_text_summary(&sim);
        assert_eq!(
            summary.lines[0],
            "All Files (2) | Images (1) | Sensor Data (1)"
        );
        assert!(summary.lines[1].starts_with(&format!("✓ {} Image", done.id)));
        assert!(summary.lines[1].ends_with("100%  scan.png"));
        assert!(summary.lines[2].starts_with("✗ "));
        assert!(summary.lines[2].contains("0 Bytes"));
        assert_eq!(summary.lines[3], "Completed: 1 | Failed: 1 | Uploading: 0");
        assert_eq!(summary.lines[4], "Data Processing Pipeline:");
        assert_eq!(summary.lines[5], "  Image Normalization: Active");
    }

    #[tokio::test(start_paused = true)]
    async fn no_pipeline_without_completions() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let sim = UploadSimulator::new(TICK, Arc::new(ScriptedOracle::new(10.0)), tx);
        let summary = build_text_summary(&sim);
        assert_eq!(summary.lines.len(), 2);
        assert_eq!(summary.lines[1], "Completed: 0 | Failed: 0 | Uploading: 0");

        sim.submit(FileDescriptor::new("scan.png", 1, "image/png"));
        let summary = build_text_summary(&sim);
        assert_eq!(summary.lines.len(), 3);
        assert_eq!(summary.lines[2], "Completed: 0 | Failed: 0 | Uploading: 1");
        sim.shutdown();
    }
}
