//! Model reply parsing and repair.
//!
//! The reply is split into sections anchored on the three bucket labels.
//! Every candidate bullet is traced back to an input record where possible;
//! traced bullets are rewritten in canonical form, untraced ones are kept as
//! written. A reply with no labels at all degrades instead of failing.

use std::cmp::Reverse;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::summary::types::{BulletItem, Buckets, HeaderRecord, ParseOutcome, Priority};

/// Header used when the model returned nothing at all.
pub const FALLBACK_HEADER: &str = "Email Summary (AI processing unavailable)";

/// A label line: optional decoration, the keyword, optional "priority",
/// optional count, then end of line or a colon with optional inline content.
static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[^\p{L}\p{N}]*(high|medium|low)(?:[\s_-]+priority)?(?:\s+(?:emails?|items?))?(?:\s*\(\d+\))?[\s*_]*(?::[\s*_]*(.*?))?[\s*_]*$",
    )
    .expect("label regex is valid")
});

/// Leading bullet marker or list number.
static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[\u{2022}\u{2023}\u{2043}\u{2219}\u{25AA}\u{25CF}\u{25E6}\u{00B7}*+\-]|\d+[.)])\s*")
        .expect("bullet regex is valid")
});

/// A list marker followed by whitespace, as opposed to markdown emphasis.
static LIST_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[\u{2022}\u{2023}\u{2043}\u{2219}\u{25AA}\u{25CF}\u{25E6}\u{00B7}*+\-]|\d+[.)])\s+")
        .expect("list item regex is valid")
});

/// Placeholder written under an empty section.
static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[(\[]?\s*(?:none|n/?a|nothing|no emails?(?:\s+in\s+this\s+(?:category|section))?)\s*[)\]]?\.?$")
        .expect("placeholder regex is valid")
});

/// Interpret `raw` against the records that were sent in the prompt.
pub fn parse_reply(raw: &str, records: &[HeaderRecord]) -> ParseOutcome {
    if raw.trim().is_empty() {
        return ParseOutcome::Degraded {
            raw_text: fallback_listing(records),
        };
    }

    let Some(candidates) = split_sections(raw) else {
        return ParseOutcome::Degraded {
            raw_text: raw.trim().to_string(),
        };
    };

    let resolutions = resolve(&candidates, records);

    let mut buckets = Buckets::new();
    for ((priority, text), resolution) in candidates.into_iter().zip(resolutions) {
        match resolution {
            Resolution::Record(i) => {
                buckets.push(priority, BulletItem::verified(records[i].bullet_text(), i));
            }
            Resolution::Duplicate(i) => {
                debug!(
                    record = i,
                    bucket = %priority,
                    bullet = %text,
                    "Dropping bullet for a record already placed"
                );
            }
            Resolution::Unmatched => buckets.push(priority, BulletItem::unverified(text)),
        }
    }
    ParseOutcome::WellFormed(buckets)
}

/// Plain listing of every record, used when the reply was empty.
pub fn fallback_listing(records: &[HeaderRecord]) -> String {
    let mut text = format!("{FALLBACK_HEADER}\n\n");
    for record in records {
        text.push_str("\u{2022} ");
        text.push_str(&record.bullet_text());
        text.push('\n');
    }
    text
}

/// Candidate bullets in reply order, or `None` when no label was found.
fn split_sections(raw: &str) -> Option<Vec<(Priority, String)>> {
    let mut current: Option<Priority> = None;
    let mut found_label = false;
    let mut candidates = Vec::new();

    for line in raw.lines() {
        if let Some((priority, inline)) = label(line) {
            found_label = true;
            current = Some(priority);
            if let Some(text) = inline.and_then(clean_bullet) {
                candidates.push((priority, text));
            }
            continue;
        }

        // Anything before the first label is preamble.
        if let Some(priority) = current
            && let Some(text) = clean_bullet(line)
        {
            candidates.push((priority, text));
        }
    }

    found_label.then_some(candidates)
}

/// The bucket a label line opens, with any content written after its colon.
///
/// A list item carrying content after a keyword ("- Medium: weekly digest")
/// is a bullet, not a label.
fn label(line: &str) -> Option<(Priority, Option<&str>)> {
    let caps = LABEL_RE.captures(line)?;
    let priority = Priority::from_keyword(caps.get(1)?.as_str())?;
    let inline = caps
        .get(2)
        .map(|m| m.as_str())
        .filter(|text| !text.trim().is_empty());
    if inline.is_some() && LIST_ITEM_RE.is_match(line) {
        return None;
    }
    Some((priority, inline))
}

/// Strip bullet markers and emphasis; `None` for blank, rule or placeholder lines.
fn clean_bullet(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| matches!(c, '-' | '*' | '_' | '=')) {
        return None;
    }
    let text = BULLET_RE.replace(trimmed, "").replace("**", "");
    let text = text.trim();
    if text.is_empty() || PLACEHOLDER_RE.is_match(text) {
        return None;
    }
    Some(text.to_string())
}

// ── Record matching ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Record(usize),
    Duplicate(usize),
    Unmatched,
}

/// Score weight for a subject hit; a sender hit adds one.
const SUBJECT_WEIGHT: u8 = 2;

/// Assign candidates to records.
///
/// Subject-bearing bullets are placed first so a loose sender-only match can
/// never steal a record from the bullet that names it. Within each pass,
/// candidates are taken in bucket order (High before Medium before Low), so a
/// record listed twice stays in its highest bucket.
///
/// A subject-bearing bullet goes to the record with the longest matching
/// subject, so "Meeting notes" is not taken by a record titled "Meeting".
/// When that record is already placed, the next unused subject match is
/// tried before the bullet counts as a duplicate.
fn resolve(candidates: &[(Priority, String)], records: &[HeaderRecord]) -> Vec<Resolution> {
    let keys: Vec<RecordKey> = records.iter().map(RecordKey::new).collect();
    let scores: Vec<Vec<u8>> = candidates
        .iter()
        .map(|(_, text)| {
            let haystack = text.to_lowercase();
            keys.iter().map(|k| k.score(&haystack)).collect()
        })
        .collect();

    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by_key(|&c| candidates[c].0);

    let mut used = vec![false; records.len()];
    let mut resolutions = vec![Resolution::Unmatched; candidates.len()];

    for subject_pass in [true, false] {
        for &c in &order {
            let row = &scores[c];
            let best_any = row.iter().copied().max().unwrap_or(0);
            if best_any == 0 || (best_any >= SUBJECT_WEIGHT) != subject_pass {
                continue;
            }

            resolutions[c] = if subject_pass {
                let mut ranked: Vec<usize> =
                    (0..row.len()).filter(|&i| row[i] >= SUBJECT_WEIGHT).collect();
                ranked.sort_by_key(|&i| (Reverse(keys[i].subject.len()), Reverse(row[i]), i));
                match ranked.iter().copied().find(|&i| !used[i]) {
                    Some(i) => {
                        used[i] = true;
                        Resolution::Record(i)
                    }
                    None => ranked
                        .first()
                        .copied()
                        .map_or(Resolution::Unmatched, Resolution::Duplicate),
                }
            } else {
                let unused: Vec<usize> = (0..row.len())
                    .filter(|&i| !used[i] && row[i] == best_any)
                    .collect();
                match unused.as_slice() {
                    [i] => {
                        used[*i] = true;
                        Resolution::Record(*i)
                    }
                    // Sender-only hits are accepted only when unambiguous.
                    [_, _, ..] => Resolution::Unmatched,
                    [] => {
                        let taken = row.iter().position(|&s| s == best_any).unwrap_or(0);
                        Resolution::Duplicate(taken)
                    }
                }
            };
        }
    }

    resolutions
}

/// Lower-cased match terms for one record.
struct RecordKey {
    subject: String,
    senders: Vec<String>,
}

impl RecordKey {
    fn new(record: &HeaderRecord) -> Self {
        let mut senders = vec![record.sender().to_lowercase()];
        if let Some(addr) = record.sender_address() {
            senders.push(addr.to_lowercase());
        }
        if let Some(name) = record.sender_name()
            && name.chars().count() >= 3
        {
            senders.push(name.to_lowercase());
        }
        Self {
            subject: record.subject().to_lowercase(),
            senders,
        }
    }

    fn score(&self, haystack: &str) -> u8 {
        let mut score = 0;
        if contains_term(haystack, &self.subject) {
            score += SUBJECT_WEIGHT;
        }
        if self.senders.iter().any(|s| contains_term(haystack, s)) {
            score += 1;
        }
        score
    }
}

/// Substring match that refuses to split a word at either end.
fn contains_term(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before_ok = !needle.starts_with(char::is_alphanumeric)
            || !haystack[..start]
                .chars()
                .next_back()
                .is_some_and(char::is_alphanumeric);
        let after_ok = !needle.ends_with(char::is_alphanumeric)
            || !haystack[end..].chars().next().is_some_and(char::is_alphanumeric);
        before_ok && after_ok
    })
}
