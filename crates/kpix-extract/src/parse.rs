//! Parsing helpers for follower counts found in page markup.
//!
//! Platforms render counts in abbreviated form ("1.2K followers",
//! "3.4M subscribers") or with thousands separators ("45,231 Followers").
//! Both forms normalize to a plain integer.

use regex::Regex;
use std::sync::OnceLock;

/// Parses an abbreviated or separator-formatted count into an integer.
///
/// Accepted forms: `1234`, `45,231`, `1.2K`, `3.4M`, `1.1B` (case
/// insensitive, surrounding whitespace ignored). Returns `None` for anything
/// else.
#[must_use]
pub fn parse_abbreviated_count(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (digits, multiplier) = match trimmed.chars().last()? {
        'k' | 'K' => (&trimmed[..trimmed.len() - 1], 1_000.0),
        'm' | 'M' => (&trimmed[..trimmed.len() - 1], 1_000_000.0),
        'b' | 'B' => (&trimmed[..trimmed.len() - 1], 1_000_000_000.0),
        _ => (trimmed, 1.0),
    };

    let cleaned: String = digits
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '\u{a0}')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let value: f64 = cleaned.parse().ok()?;
    if value < 0.0 || !value.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some((value * multiplier).round() as u64)
}

fn count_near_keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // a number (possibly abbreviated) within a few words of a keyword,
        // in either order
        Regex::new(
            r"(?i)([\d][\d.,\u{a0}]*\s*[KMB]?)\s*(?:followers|follower|subscribers|subscriber|fans|likes)|(?:followers|subscribers|fans)\D{0,12}?([\d][\d.,\u{a0}]*\s*[KMB]?)",
        )
        .unwrap()
    })
}

/// Scans free-form markup text for a count adjacent to a follower-style
/// keyword. Returns the first plausible match.
#[must_use]
pub fn find_count_near_keyword(text: &str) -> Option<u64> {
    for capture in count_near_keyword_re().captures_iter(text) {
        let raw = capture.get(1).or_else(|| capture.get(2))?.as_str();
        if let Some(count) = parse_abbreviated_count(raw) {
            if count > 0 {
                return Some(count);
            }
        }
    }
    None
}
