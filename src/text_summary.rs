//! Text summary builder for CLI output.
//!
//! Formats a headless restore report as human-readable lines for text mode.

use crate::model::RestoreReport;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn human_bytes(n: u64) -> String {
    if n >= 1024 * 1024 {
        format!("{:.1} MiB", n as f64 / (1024.0 * 1024.0))
    } else if n >= 1024 {
        format!("{:.1} KiB", n as f64 / 1024.0)
    } else {
        format!("{n} B")
    }
}

/// Build a text summary from a completed headless run.
pub(crate) fn build_text_summary(report: &RestoreReport) -> TextSummary {
    let mut lines = Vec::new();

    lines.push(format!(
        "Original: {} ({}x{})",
        report.file.display(),
        report.original_width,
        report.original_height
    ));
    let restored_dims = match (report.restored_width, report.restored_height) {
        (Some(w), Some(h)) => format!("{w}x{h}"),
        _ => "unknown size".to_string(),
    };
    lines.push(format!(
        "Restored: {}, {} in {}",
        restored_dims,
        human_bytes(report.restored_bytes),
        humantime::format_duration(std::time::Duration::from_millis(
            report.elapsed.as_millis() as u64
        ))
    ));
    if let Some(path) = report.saved_to.as_deref() {
        lines.push(format!("Saved: {}", path.display()));
    }

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn report() -> RestoreReport {
        RestoreReport {
            timestamp_utc: "2026-01-01T00:00:00Z".into(),
            endpoint: "http://127.0.0.1:5000/restore".into(),
            file: "cat.png".into(),
            original_width: 640,
            original_height: 480,
            restored_width: Some(128),
            restored_height: Some(128),
            restored_bytes: 2048,
            elapsed: Duration::from_millis(1500),
            saved_to: Some("out/cat_restored.jpg".into()),
        }
    }

    #[test]
    fn summary_lists_original_result_and_path() {
        let s = build_text_summary(&report());
        assert_eq!(s.lines[0], "Original: cat.png (640x480)");
        assert_eq!(s.lines[1], "Restored: 128x128, 2.0 KiB in 1s 500ms");
        assert_eq!(s.lines[2], "Saved: out/cat_restored.jpg");
    }

    #[test]
    fn summary_handles_unknown_dimensions() {
        let mut r = report();
        r.restored_width = None;
        r.saved_to = None;
        let s = build_text_summary(&r);
        assert!(s.lines[1].starts_with("Restored: unknown size"));
        assert_eq!(s.lines.len(), 2);
    }

    #[test]
    fn human_bytes_scales() {
        assert_eq!(human_bytes(12), "12 B");
        assert_eq!(human_bytes(3 * 1024 * 1024), "3.0 MiB");
    }
}
