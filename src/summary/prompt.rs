//! Prompt construction for the summary call.
//!
//! Pure: the same records in the same order always give byte-identical text.

use std::fmt::Write;

use crate::summary::types::{HeaderRecord, Priority};

/// Build the categorization prompt for `records`.
pub fn build_prompt(records: &[HeaderRecord]) -> String {
    let mut prompt = String::with_capacity(1024 + records.len() * 96);

    let _ = writeln!(
        prompt,
        "You are an email assistant. Analyze these {} emails and categorize them by priority.",
        records.len()
    );
    prompt.push_str("\nEmails to analyze:\n");
    for (i, record) in records.iter().enumerate() {
        let _ = writeln!(
            prompt,
            "{}. Subject: {}\n   From: {}",
            i + 1,
            record.subject(),
            record.sender()
        );
    }

    prompt.push_str(
        "\nProvide a summary with exactly three sections:\n\
         - High Priority: Urgent or important emails requiring immediate attention\n\
         - Medium Priority: Emails of moderate importance that should be addressed soon\n\
         - Low Priority: Informational emails or low urgency items\n\n\
         Place every email in exactly one section. Do not skip or repeat emails.\n\
         Format each email as a bullet point with the subject and sender.\n\
         Use this exact format:\n",
    );
    for priority in Priority::ALL {
        let _ = write!(
            prompt,
            "\n{}:\n\u{2022} [Subject] - From: [Sender]\n",
            priority.label()
        );
    }
    prompt.push_str("\nIf a priority category has no emails, write \"None\" under that section.");

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<HeaderRecord> {
        vec![
            HeaderRecord::new("Server Down", "alerts@x.com"),
            HeaderRecord::new("Newsletter", "News <news@y.com>"),
        ]
    }

    #[test]
    fn prompt_lists_every_record() {
        let records = sample();
        let prompt = build_prompt(&records);
        for record in &records {
            assert!(prompt.contains(record.subject()));
            assert!(prompt.contains(record.sender()));
        }
        assert!(prompt.contains("1. Subject: Server Down\n   From: alerts@x.com"));
        assert!(prompt.contains("2. Subject: Newsletter"));
        assert!(prompt.contains("Analyze these 2 emails"));
    }

    #[test]
    fn prompt_names_all_three_sections() {
        let prompt = build_prompt(&sample());
        for priority in Priority::ALL {
            assert!(prompt.contains(&format!("{}:", priority.label())));
        }
        assert!(prompt.contains("write \"None\""));
    }

    #[test]
    fn prompt_is_deterministic() {
        let records = sample();
        assert_eq!(build_prompt(&records), build_prompt(&records.clone()));
    }

    #[test]
    fn prompt_depends_on_order() {
        let records = sample();
        let mut reversed = records.clone();
        reversed.reverse();
        assert_ne!(build_prompt(&records), build_prompt(&reversed));
    }
}
