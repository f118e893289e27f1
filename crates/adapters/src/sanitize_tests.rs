// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn leaves_plain_text_untouched() {
    assert_eq!(sanitize("hello world"), "hello world");
}

#[test]
fn pairs_a_valid_surrogate_pair() {
    let input = r"emoji: 😀 done";
    assert_eq!(sanitize(input), r"emoji: 😀 done");
}

#[test]
fn replaces_lone_high_surrogate() {
    let input = r"broken: \ud83d end";
    let out = sanitize(input);
    assert!(!out.contains(r"\ud83d"));
    assert!(out.contains('\u{FFFD}'));
}

#[test]
fn replaces_lone_low_surrogate() {
    let input = r"broken: \ude00 end";
    let out = sanitize(input);
    assert!(!out.contains(r"\ude00"));
    assert!(out.contains('\u{FFFD}'));
}

#[test]
fn is_idempotent() {
    let input = r"mixed 😀 and \ud83d alone";
    let once = sanitize(input);
    let twice = sanitize(&once);
    assert_eq!(once, twice);
}

#[test]
fn normalizes_escape_case_for_a_valid_pair() {
    let input = r"😀";
    assert_eq!(sanitize(input), r"😀");
}
