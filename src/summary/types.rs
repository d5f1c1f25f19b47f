//! Shared types for the summary engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Substituted when a message has no (or an empty) Subject header.
pub const NO_SUBJECT: &str = "No Subject";

/// Substituted when a message has no (or an empty) From header.
pub const UNKNOWN_SENDER: &str = "Unknown Sender";

// ── Header record ───────────────────────────────────────────────────

/// Subject and sender of one message. Body and attachments are never carried.
///
/// Immutable once built; blank fields are replaced by the sentinels at
/// construction so neither field is ever absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeaderRecord {
    subject: String,
    sender: String,
}

impl HeaderRecord {
    pub fn new(subject: impl Into<String>, sender: impl Into<String>) -> Self {
        let subject: String = subject.into();
        let sender: String = sender.into();
        Self::from_headers(Some(&subject), Some(&sender))
    }

    /// Build from optional header values, applying the sentinels.
    pub fn from_headers(subject: Option<&str>, sender: Option<&str>) -> Self {
        let clean = |value: Option<&str>, fallback: &str| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };
        Self {
            subject: clean(subject, NO_SUBJECT),
            sender: clean(sender, UNKNOWN_SENDER),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Bare address out of `Name <addr>`, when the sender has that shape.
    pub fn sender_address(&self) -> Option<&str> {
        let start = self.sender.rfind('<')?;
        let end = self.sender[start..].find('>')? + start;
        let addr = self.sender[start + 1..end].trim();
        (!addr.is_empty()).then_some(addr)
    }

    /// Display name out of `Name <addr>`, without surrounding quotes.
    pub fn sender_name(&self) -> Option<&str> {
        let start = self.sender.rfind('<')?;
        let name = self.sender[..start].trim().trim_matches('"').trim();
        (!name.is_empty()).then_some(name)
    }

    /// Canonical bullet text; carries both fields verbatim.
    pub fn bullet_text(&self) -> String {
        format!("{} - From: {}", self.subject, self.sender)
    }
}

// ── Priority ────────────────────────────────────────────────────────

/// The three fixed priority buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Every bucket, in report order.
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "High Priority",
            Self::Medium => "Medium Priority",
            Self::Low => "Low Priority",
        }
    }

    /// Case-insensitive lookup of `high` / `medium` / `low`.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Bullets and buckets ─────────────────────────────────────────────

/// One rendered bullet line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletItem {
    /// Text shown in the summary.
    pub text: String,
    /// Index of the input record this bullet refers to, if confirmed.
    pub record: Option<usize>,
}

impl BulletItem {
    /// Bullet confirmed against an input record.
    pub fn verified(text: impl Into<String>, record: usize) -> Self {
        Self {
            text: text.into(),
            record: Some(record),
        }
    }

    /// Bullet kept as the model wrote it (possibly a paraphrase).
    pub fn unverified(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            record: None,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.record.is_some()
    }
}

/// Exactly three bucket sequences, one per `Priority`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buckets {
    high: Vec<BulletItem>,
    medium: Vec<BulletItem>,
    low: Vec<BulletItem>,
}

impl Buckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, priority: Priority) -> &[BulletItem] {
        match priority {
            Priority::High => &self.high,
            Priority::Medium => &self.medium,
            Priority::Low => &self.low,
        }
    }

    pub(crate) fn push(&mut self, priority: Priority, item: BulletItem) {
        match priority {
            Priority::High => self.high.push(item),
            Priority::Medium => self.medium.push(item),
            Priority::Low => self.low.push(item),
        }
    }

    /// All three buckets in report order, empty ones included.
    pub fn iter(&self) -> impl Iterator<Item = (Priority, &[BulletItem])> {
        Priority::ALL.into_iter().map(move |p| (p, self.get(p)))
    }

    /// Total bullets across buckets.
    pub fn len(&self) -> usize {
        self.high.len() + self.medium.len() + self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bucket holding `record`, if any bullet refers to it.
    pub fn priority_of(&self, record: usize) -> Option<Priority> {
        self.iter()
            .find(|(_, items)| items.iter().any(|b| b.record == Some(record)))
            .map(|(p, _)| p)
    }
}

// ── Parse outcome and report ────────────────────────────────────────

/// Result of interpreting a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// At least one bucket label was found.
    WellFormed(Buckets),
    /// No bucket labels; carry the raw text so nothing is lost.
    Degraded { raw_text: String },
}

/// Validated summary of one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryReport {
    outcome: ParseOutcome,
    record_count: usize,
}

/// How completely a report covers its input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    /// Input indices with no bullet referring to them.
    pub missing: Vec<usize>,
    /// Bullets that could not be traced to any input record.
    pub unverified: usize,
}

impl Coverage {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

impl SummaryReport {
    pub fn new(outcome: ParseOutcome, record_count: usize) -> Self {
        Self {
            outcome,
            record_count,
        }
    }

    /// Report for an empty batch: three empty buckets.
    pub fn empty() -> Self {
        Self::new(ParseOutcome::WellFormed(Buckets::new()), 0)
    }

    pub fn outcome(&self) -> &ParseOutcome {
        &self.outcome
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.outcome, ParseOutcome::Degraded { .. })
    }

    pub fn buckets(&self) -> Option<&Buckets> {
        match &self.outcome {
            ParseOutcome::WellFormed(buckets) => Some(buckets),
            ParseOutcome::Degraded { .. } => None,
        }
    }

    /// Bullets for one bucket; always empty for a degraded report.
    pub fn bucket(&self, priority: Priority) -> &[BulletItem] {
        self.buckets().map(|b| b.get(priority)).unwrap_or(&[])
    }

    pub fn degraded_text(&self) -> Option<&str> {
        match &self.outcome {
            ParseOutcome::Degraded { raw_text } => Some(raw_text),
            ParseOutcome::WellFormed(_) => None,
        }
    }

    /// Compare the report against the records it was built from.
    ///
    /// Degraded reports are checked by subject substring in the raw text.
    pub fn coverage(&self, records: &[HeaderRecord]) -> Coverage {
        match &self.outcome {
            ParseOutcome::WellFormed(buckets) => {
                let mut seen = vec![false; records.len()];
                let mut unverified = 0;
                for (_, items) in buckets.iter() {
                    for item in items {
                        match item.record {
                            Some(i) if i < seen.len() => seen[i] = true,
                            _ => unverified += 1,
                        }
                    }
                }
                Coverage {
                    missing: (0..records.len()).filter(|&i| !seen[i]).collect(),
                    unverified,
                }
            }
            ParseOutcome::Degraded { raw_text } => {
                let haystack = raw_text.to_lowercase();
                Coverage {
                    missing: records
                        .iter()
                        .enumerate()
                        .filter(|(_, r)| !haystack.contains(&r.subject().to_lowercase()))
                        .map(|(i, _)| i)
                        .collect(),
                    unverified: 0,
                }
            }
        }
    }
}
