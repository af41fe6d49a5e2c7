//! Cases where the canonical text does not grow with the raw text
//!
//! Stripping is not monotonic: more raw text can give a shorter clean text.
//! A naive diff over successive full-text canonicalizations would then show
//! characters that later disappear. The decoder must hold them back.

use chat_sieve::sanitize::canonicalize;
use chat_sieve::streaming::{DecoderConfig, StreamDecoder, StreamEvent};

fn deltas(fragments: &[&str]) -> Vec<String> {
    let mut decoder = StreamDecoder::new(DecoderConfig::default());
    let mut out = Vec::new();
    for fragment in fragments {
        for event in decoder.push(fragment) {
            if let StreamEvent::ContentDelta { delta } = event {
                out.push(delta);
            }
        }
    }
    for event in decoder.finish() {
        if let StreamEvent::ContentDelta { delta } = event {
            out.push(delta);
        }
    }
    out
}

#[test]
fn completing_a_sentinel_shrinks_canonical_text() {
    assert_eq!(canonicalize("hi <|im_end"), "hi <|im_end");
    assert_eq!(canonicalize("hi <|im_end|>"), "hi");

    let out = deltas(&["hi <|im_end", "|>"]);
    assert_eq!(out.concat(), "hi");
    assert!(out.iter().all(|d| !d.contains('<')));
}

#[test]
fn trailing_bracket_shrinks_canonical_text() {
    // `x [` canonicalizes to `x`, then `x [y` keeps the bracket
    assert_eq!(canonicalize("x ["), "x");
    assert_eq!(canonicalize("x [y"), "x [y");
    assert_eq!(deltas(&["x [", "y"]).concat(), "x");
}

#[test]
fn stripping_can_join_a_new_sentinel() {
    assert_eq!(canonicalize("a [/[/INST]INST] b"), "a  b");
    let out = deltas(&["a [/", "[/INST]I", "NST] b"]);
    assert_eq!(out.concat(), "a  b");
    assert!(out.iter().all(|d| !d.contains('[')));
}

#[test]
fn case_variants_split_across_fragments() {
    let out = deltas(&["Merci. END OF ", "TEXT"]);
    assert_eq!(out.concat(), "Merci.");
}

#[test]
fn leading_whitespace_is_never_emitted() {
    let out = deltas(&["   ", "\n", "Bonjour"]);
    assert_eq!(out.concat(), "Bonjour");
    assert!(!out[0].starts_with(' '));
}
