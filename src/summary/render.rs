//! Plain-text rendering of a `SummaryReport`.

use std::fmt::Write;

use crate::summary::types::{HeaderRecord, ParseOutcome, SummaryReport};

/// Prefix for a reply that had no priority sections.
pub const DEGRADED_NOTE: &str = "[Note: AI response may not be properly formatted]";

/// Header of the list of records the model left out.
pub const UNCATEGORIZED_HEADER: &str = "Not categorized";

/// Render `report` for display and persistence.
///
/// Well-formed reports always show all three sections in fixed order. Records
/// no bullet refers to are listed after them so none is silently lost.
pub fn render(report: &SummaryReport, records: &[HeaderRecord]) -> String {
    let buckets = match report.outcome() {
        ParseOutcome::Degraded { raw_text } => {
            return format!("{DEGRADED_NOTE}\n\n{raw_text}");
        }
        ParseOutcome::WellFormed(buckets) => buckets,
    };

    let mut out = String::new();
    for (i, (priority, items)) in buckets.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{}:", priority.label());
        if items.is_empty() {
            out.push_str("\u{2022} None\n");
        }
        for item in items {
            let _ = writeln!(out, "\u{2022} {}", item.text);
        }
    }

    let missing = report.coverage(records).missing;
    if !missing.is_empty() {
        let _ = writeln!(out, "\n{UNCATEGORIZED_HEADER}:");
        for i in missing {
            let _ = writeln!(out, "\u{2022} {}", records[i].bullet_text());
        }
    }

    out.truncate(out.trim_end().len());
    out
}
