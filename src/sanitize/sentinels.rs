//! Sentinel vocabulary
//!
//! The fixed set of control substrings an upstream text-generation service may
//! leak into its output. The table is immutable once built and shared through
//! an `Arc`; the default table is built once per process.

use std::borrow::Cow;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ChatError, Result};

/// One sentinel literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentinel {
    /// Literal text, matched ASCII case-insensitively.
    pub literal: String,
    /// Whether seeing this literal means the logical response has ended.
    pub end_marker: bool,
}

impl Sentinel {
    /// A sentinel that is stripped and also signals completion.
    pub fn end_marker(literal: impl Into<String>) -> Self {
        Self {
            literal: literal.into(),
            end_marker: true,
        }
    }

    /// A sentinel that is stripped from visible output only.
    pub fn strip_only(literal: impl Into<String>) -> Self {
        Self {
            literal: literal.into(),
            end_marker: false,
        }
    }
}

/// Literals of the default vocabulary, paired with their end-marker flag.
///
/// `[/INST]` closes the prompt template and can be echoed back by the model
/// before the answer starts, so it is stripped without ending the stream.
pub const DEFAULT_SENTINELS: &[(&str, bool)] = &[
    ("end of text", true),
    ("[end of text]", true),
    ("<|im_end|>", true),
    ("</s>", true),
    ("[INST]", true),
    ("[/INST]", false),
    ("<<SYS>>", true),
    ("<|endoftext|>", true),
];

static DEFAULT_SET: Lazy<Arc<SentinelSet>> = Lazy::new(|| {
    let entries = DEFAULT_SENTINELS
        .iter()
        .map(|(literal, end)| Sentinel {
            literal: (*literal).to_string(),
            end_marker: *end,
        })
        .collect::<Vec<_>>();
    Arc::new(SentinelSet::build(entries).expect("default sentinel table compiles"))
});

/// The process-wide default sentinel table.
pub fn default_sentinels() -> Arc<SentinelSet> {
    DEFAULT_SET.clone()
}

/// Immutable, ordered sentinel table with precompiled matchers.
#[derive(Debug, Clone)]
pub struct SentinelSet {
    /// Entries sorted longest first, so an enclosing literal such as
    /// `[end of text]` wins over the `end of text` it contains.
    entries: Vec<Sentinel>,
    strip_pattern: Regex,
    end_pattern: Option<Regex>,
}

impl SentinelSet {
    /// Build a table from custom entries.
    ///
    /// Literals must be non-empty ASCII. Duplicates (ignoring ASCII case) are
    /// collapsed; a duplicate marked as end marker keeps that flag.
    pub fn new(entries: impl IntoIterator<Item = Sentinel>) -> Result<Self> {
        let mut collected: Vec<Sentinel> = Vec::new();
        for entry in entries {
            if entry.literal.is_empty() {
                return Err(ChatError::ConfigurationError(
                    "sentinel literal must not be empty".to_string(),
                ));
            }
            if !entry.literal.is_ascii() {
                return Err(ChatError::ConfigurationError(format!(
                    "sentinel literal must be ASCII: {:?}",
                    entry.literal
                )));
            }
            match collected
                .iter_mut()
                .find(|s| s.literal.eq_ignore_ascii_case(&entry.literal))
            {
                Some(existing) => existing.end_marker |= entry.end_marker,
                None => collected.push(entry),
            }
        }
        if collected.is_empty() {
            return Err(ChatError::ConfigurationError(
                "sentinel set must contain at least one literal".to_string(),
            ));
        }
        Self::build(collected)
    }

    fn build(mut entries: Vec<Sentinel>) -> Result<Self> {
        entries.sort_by_key(|s| std::cmp::Reverse(s.literal.len()));
        let strip_pattern = alternation(entries.iter().map(|s| s.literal.as_str()))?;
        let end_pattern = if entries.iter().any(|s| s.end_marker) {
            Some(alternation(
                entries
                    .iter()
                    .filter(|s| s.end_marker)
                    .map(|s| s.literal.as_str()),
            )?)
        } else {
            None
        };
        Ok(Self {
            entries,
            strip_pattern,
            end_pattern,
        })
    }

    /// Entries, longest literal first.
    pub fn iter(&self) -> impl Iterator<Item = &Sentinel> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Length in bytes of the longest literal.
    pub fn max_literal_len(&self) -> usize {
        self.entries.first().map(|s| s.literal.len()).unwrap_or(0)
    }

    /// Remove every sentinel occurrence in one left-to-right pass.
    pub fn strip_once<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.strip_pattern.replace_all(text, "")
    }

    /// Whether `text` contains any end-marker literal.
    pub fn contains_end_marker(&self, text: &str) -> bool {
        self.end_pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(text))
    }

    /// Earliest byte index `i` such that `text[i..]` is a non-empty proper
    /// prefix of some literal, i.e. a sentinel that may still be completed by
    /// text not yet received.
    pub fn partial_suffix_start(&self, text: &str) -> Option<usize> {
        self.entries
            .iter()
            .filter_map(|s| partial_match_start(text, &s.literal, true))
            .min()
    }
}

impl Default for SentinelSet {
    fn default() -> Self {
        DEFAULT_SET.as_ref().clone()
    }
}

fn alternation<'a>(literals: impl Iterator<Item = &'a str>) -> Result<Regex> {
    let body = literals.map(regex::escape).collect::<Vec<_>>().join("|");
    // ASCII-only case folding, same rule as `partial_match_start`.
    Regex::new(&format!("(?i-u){body}"))
        .map_err(|e| ChatError::ConfigurationError(format!("invalid sentinel table: {e}")))
}

/// Earliest start of a suffix of `text` that is a non-empty proper prefix of
/// the ASCII `needle`.
///
/// Only the last `needle.len() - 1` bytes can qualify. Because the needle is
/// ASCII, any matching suffix starts on a char boundary.
pub(crate) fn partial_match_start(text: &str, needle: &str, ignore_case: bool) -> Option<usize> {
    let hay = text.as_bytes();
    let pat = needle.as_bytes();
    if pat.len() < 2 || hay.is_empty() {
        return None;
    }
    let from = hay.len().saturating_sub(pat.len() - 1);
    (from..hay.len()).find(|&i| {
        let tail = &hay[i..];
        let head = &pat[..tail.len()];
        if ignore_case {
            head.eq_ignore_ascii_case(tail)
        } else {
            head == tail
        }
    })
}
