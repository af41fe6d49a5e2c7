//! Marker canonicalization and completion detection
//!
//! `canonicalize` turns accumulated raw text into user-visible text.
//! `stable_prefix` is its streaming counterpart: the part of the canonical
//! form that no future input can change, used to emit deltas before the
//! stream ends.

use super::sentinels::{SentinelSet, default_sentinels};

/// Canonicalize `text` with the default sentinel table.
pub fn canonicalize(text: &str) -> String {
    default_sentinels().canonicalize(text)
}

/// Completion check with the default sentinel table.
pub fn has_complete_end_marker(text: &str) -> bool {
    default_sentinels().has_complete_end_marker(text)
}

/// Whether `text` ends with a `[` or `]`, ignoring trailing whitespace.
///
/// Treated as a truncated sentinel. Legitimate content ending in a bracket
/// is indistinguishable from that case and also counts as complete.
pub fn ends_with_orphan_bracket(text: &str) -> bool {
    text.trim_end().ends_with(['[', ']'])
}

fn is_trailing_noise(c: char) -> bool {
    c.is_whitespace() || c == '[' || c == ']'
}

impl SentinelSet {
    /// Remove sentinels until none is left.
    ///
    /// Removing one literal can join its neighbours into a new one
    /// (`<|im_<|im_end|>end|>`), so passes repeat until the text stops changing.
    pub fn strip_sentinels(&self, text: &str) -> String {
        let mut current = self.strip_once(text).into_owned();
        loop {
            let next = self.strip_once(&current);
            if next.len() == current.len() {
                return current;
            }
            current = next.into_owned();
        }
    }

    /// Sentinels removed, trailing orphan brackets stripped, whitespace trimmed.
    ///
    /// Mid-text brackets are kept. Idempotent.
    pub fn canonicalize(&self, text: &str) -> String {
        let stripped = self.strip_sentinels(text);
        stripped
            .trim_end_matches(is_trailing_noise)
            .trim_start()
            .to_string()
    }

    /// True if the text contains an end-marker literal or ends with an
    /// orphan bracket.
    pub fn has_complete_end_marker(&self, text: &str) -> bool {
        self.contains_end_marker(text) || ends_with_orphan_bracket(text)
    }

    /// Byte length of the longest prefix of `text` that does not end inside
    /// a possibly incomplete sentinel or `extra` delimiter.
    ///
    /// The cut repeats until the prefix itself has no partial suffix, so no
    /// match can straddle it.
    pub fn confirmed_len(&self, text: &str, extra: &[&str]) -> usize {
        let mut end = text.len();
        loop {
            let head = &text[..end];
            let cut = self
                .partial_suffix_start(head)
                .into_iter()
                .chain(extra.iter().filter_map(|needle| {
                    super::sentinels::partial_match_start(head, needle, false)
                }))
                .min();
            match cut {
                Some(cut) if cut < end => end = cut,
                _ => return end,
            }
        }
    }

    /// The prefix of `canonicalize(raw + future)` that is already fixed for
    /// any continuation `future`.
    ///
    /// Held back: a possibly partial sentinel (or `extra` delimiter) at the
    /// end of the raw text, a partial sentinel formed at the end of the
    /// stripped text, and trailing whitespace or brackets that may still turn
    /// out to be the end of the response.
    pub fn stable_prefix(&self, raw: &str, extra: &[&str]) -> String {
        let mut current = raw[..self.confirmed_len(raw, extra)].to_string();
        loop {
            let next = self.strip_once(&current);
            if next.len() == current.len() {
                break;
            }
            let mut next = next.into_owned();
            next.truncate(self.confirmed_len(&next, &[]));
            current = next;
        }
        current
            .trim_end_matches(is_trailing_noise)
            .trim_start()
            .to_string()
    }
}
