//! Email address recognition in free text.
//!
//! Postings publish contact addresses in several surface forms: plain
//! `local@domain.tld`, spaced out around the separators, or obfuscated with
//! `AT`/`DOT` words or `[at]`/`[dot]` brackets. Every form is matched
//! independently and the results are unioned, normalized and filtered through
//! [`is_valid_email`], the same filter the contact consolidator applies.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

#[allow(clippy::expect_used)]
static STANDARD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
        .expect("standard email regex is valid") // Static pattern, safe to panic
});

/// Spaced-out form. Whitespace may follow the final dot only when it also
/// precedes it, so a sentence-ending period is never read as a separator.
#[allow(clippy::expect_used)]
static SPACED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z0-9._%+-]+)\s*@\s*([A-Za-z0-9.-]+)(?:\s+\.\s*|\.)([A-Za-z]{2,})\b")
        .expect("spaced email regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static WORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z0-9._%+-]+)\s+(?i:at)\s+([A-Za-z0-9.-]+)\s+(?i:dot)\s+([A-Za-z]{2,})\b")
        .expect("word-obfuscated email regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static BRACKET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b([A-Za-z0-9._%+-]+)\s*\[at\]\s*([A-Za-z0-9.-]+)\s*\[dot\]\s*([A-Za-z]{2,})\b",
    )
    .expect("bracket-obfuscated email regex is valid") // Static pattern, safe to panic
});

/// Accepted shape of a normalized address.
///
/// The local part starts with a word character so that an accepted address is
/// always found again, unchanged, by [`recognize_emails`].
#[allow(clippy::expect_used)]
static VALID_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9_][a-z0-9._%+-]*@[a-z0-9.-]+\.[a-z]{2,}$")
        .expect("email filter regex is valid") // Static pattern, safe to panic
});

/// Suffixes of asset file names that look like addresses (`logo@2x.png`).
const ASSET_SUFFIXES: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg"];

/// Recognizes every email address in `text`.
///
/// Pure: the same text always yields the same set. Empty text yields an empty
/// set.
#[must_use]
pub fn recognize_emails(text: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    if text.trim().is_empty() {
        return found;
    }

    for m in STANDARD_PATTERN.find_iter(text) {
        insert_candidate(&mut found, m.as_str());
    }
    for pattern in [&*SPACED_PATTERN, &*WORD_PATTERN, &*BRACKET_PATTERN] {
        for caps in pattern.captures_iter(text) {
            let candidate = format!("{}@{}.{}", &caps[1], &caps[2], &caps[3]);
            insert_candidate(&mut found, &candidate);
        }
    }

    trace!(count = found.len(), "recognized emails");
    found
}

/// Normalizes one address: trims, lower-cases and applies [`is_valid_email`].
#[must_use]
pub fn normalize_email(raw: &str) -> Option<String> {
    let normalized = raw.trim().to_lowercase();
    is_valid_email(&normalized).then_some(normalized)
}

/// Conservative syntactic filter for normalized addresses.
#[must_use]
pub fn is_valid_email(candidate: &str) -> bool {
    VALID_EMAIL.is_match(candidate) && !ASSET_SUFFIXES.iter().any(|s| candidate.ends_with(s))
}

fn insert_candidate(found: &mut BTreeSet<String>, candidate: &str) {
    let compact: String = candidate.chars().filter(|c| !c.is_whitespace()).collect();
    if let Some(email) = normalize_email(&compact) {
        found.insert(email);
    }
}
