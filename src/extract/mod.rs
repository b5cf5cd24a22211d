//! Issue key extraction from free text.
//!
//! This module provides a pure scanner that finds tracker issue keys
//! (`<PROJECT-KEY>-<NUMBER>`, e.g. `JRA-123`) embedded in unstructured text
//! such as commit messages and branch names.
//!
//! # Matching Rules
//!
//! - A project key is two or more alphanumeric characters whose first character
//!   is a letter (any Unicode script); digits are allowed in non-leading
//!   positions (`J42-123`), leading digits are rejected (`2PAC-123`).
//! - The number part is one or more ASCII digits.
//! - Candidates must sit on non-alphanumeric boundaries on both sides; a key
//!   embedded in a longer kebab/path token (`feature/JRA-123`,
//!   `prefix-kebab-JRA-123`) is found, but a key glued to trailing letters
//!   (`JRA-123abc`) is not.
//! - Matches are uppercased with full Unicode case mapping and de-duplicated
//!   case-insensitively, preserving first-occurrence order.
//!
//! Extraction is total: any input yields a (possibly empty) list, never an
//! error.

use std::collections::HashSet;

use crate::types::IssueKey;

/// Extracts all distinct issue keys from `text`, in first-occurrence order.
///
/// # Examples
///
/// ```
/// use tracker_bridge::extract::extract_issue_keys;
/// use tracker_bridge::types::IssueKey;
///
/// let keys = extract_issue_keys("feature/jra-123 fixes JRA-123 and TBD-9");
/// assert_eq!(keys, vec![IssueKey::from("JRA-123"), IssueKey::from("TBD-9")]);
///
/// assert!(extract_issue_keys("no keys here").is_empty());
/// assert!(extract_issue_keys("").is_empty());
/// ```
pub fn extract_issue_keys(text: &str) -> Vec<IssueKey> {
    let mut keys = Vec::new();
    // Uppercased forms already emitted, for case-insensitive de-dup.
    let mut seen: HashSet<String> = HashSet::new();

    // Any character that is neither alphanumeric nor `-` is a hard boundary.
    // What remains are tokens of alphanumeric runs joined by hyphens, which is
    // exactly the shape issue keys live in.
    for token in text.split(|c: char| !c.is_alphanumeric() && c != '-') {
        if token.is_empty() {
            continue;
        }
        scan_token(token, &mut keys, &mut seen);
    }

    keys
}

/// Extracts distinct issue keys across several text fields (e.g. a branch
/// name plus every commit message of a push).
///
/// De-duplication and first-occurrence ordering span the whole field
/// sequence: a key seen in the branch name is not repeated when a commit
/// message mentions it again.
pub fn extract_from_fields<'a>(fields: impl IntoIterator<Item = &'a str>) -> Vec<IssueKey> {
    let mut keys = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for field in fields {
        for key in extract_issue_keys(field) {
            if seen.insert(key.as_str().to_string()) {
                keys.push(key);
            }
        }
    }

    keys
}

/// Scans one hyphen-joined token for `<key>-<digits>` segment pairs.
///
/// The token is split on `-` into alphanumeric segments; a valid project-key
/// segment immediately followed by an all-digit segment forms an issue key.
/// Both segments are consumed, so `Jra-456-jra-901` yields two keys rather
/// than treating `456-jra` as a candidate.
fn scan_token(token: &str, keys: &mut Vec<IssueKey>, seen: &mut HashSet<String>) {
    let segments: Vec<&str> = token.split('-').collect();

    let mut i = 0;
    while i + 1 < segments.len() {
        if is_project_key(segments[i]) && is_issue_number(segments[i + 1]) {
            let normalized = format!("{}-{}", segments[i], segments[i + 1]).to_uppercase();
            if seen.insert(normalized.clone()) {
                keys.push(IssueKey(normalized));
            }
            i += 2;
        } else {
            i += 1;
        }
    }
}

/// A project-key segment: two or more characters, first one a letter.
///
/// Segments arrive pre-filtered to alphanumerics (plus nothing else), so only
/// the length and leading-letter rules need checking here.
fn is_project_key(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() => chars.next().is_some(),
        _ => false,
    }
}

/// An issue-number segment: one or more ASCII digits.
fn is_issue_number(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Vec<String> {
        extract_issue_keys(text)
            .into_iter()
            .map(|k| k.as_str().to_string())
            .collect()
    }

    // ─── Basic matching ───

    #[test]
    fn empty_and_keyless_input_yield_empty() {
        assert!(extract("").is_empty());
        assert!(extract("   ").is_empty());
        assert!(extract("no keys in this sentence").is_empty());
        assert!(extract("1234 5678").is_empty());
    }

    #[test]
    fn extracts_key_regardless_of_casing() {
        for input in ["JRA-123", "jra-123", "jRa-123"] {
            assert_eq!(extract(input), vec!["JRA-123"], "input: {input}");
        }
    }

    #[test]
    fn rejects_leading_digit_project_keys() {
        assert!(extract("2PAC-123").is_empty());
        assert!(extract("42-123").is_empty());
    }

    #[test]
    fn allows_digits_in_non_leading_positions() {
        assert_eq!(extract("J42-123"), vec!["J42-123"]);
        assert_eq!(extract("b4l-123"), vec!["B4L-123"]);
        assert_eq!(extract("Ja9-123"), vec!["JA9-123"]);
    }

    #[test]
    fn rejects_single_character_project_keys() {
        assert!(extract("F-67-my-feature").is_empty());
    }

    #[test]
    fn extracts_alphanumeric_key_from_branch_name() {
        assert_eq!(extract("feature/J3-123-my-feature"), vec!["J3-123"]);
    }

    // ─── Boundaries ───

    #[test]
    fn extracts_key_from_longer_strings() {
        for input in [
            "feature-branch/JRA-123",
            "prefix-kebab-JRA-123",
            "JRA-123-suffix-kebab",
            "JRA-123 with suffix spaces",
            "prefix spaces with JRA-123",
        ] {
            assert_eq!(extract(input), vec!["JRA-123"], "input: {input}");
        }
    }

    #[test]
    fn does_not_extract_from_larger_alphanumeric_token() {
        // The leading `x` is part of the key segment, so the match is the
        // whole token, not an embedded JRA-123.
        assert_eq!(extract("xJRA-123"), vec!["XJRA-123"]);
        // Trailing letters invalidate the number segment entirely.
        assert!(extract("JRA-123abc").is_empty());
    }

    #[test]
    fn extracts_keys_wrapped_in_special_characters() {
        let special: Vec<char> = " !\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~\n\t".chars().collect();
        for &left in &special {
            for &right in &special {
                let input = format!("{left}JRA-123{right}");
                assert_eq!(extract(&input), vec!["JRA-123"], "input: {input:?}");
            }
        }
    }

    // ─── De-duplication and ordering ───

    #[test]
    fn deduplicates_preserving_first_occurrence_order() {
        assert_eq!(
            extract("JRA-123 with suffix spaces and JRA-123 TBD-123"),
            vec!["JRA-123", "TBD-123"]
        );
    }

    #[test]
    fn deduplication_is_case_insensitive() {
        assert_eq!(extract("jra-123 then JRA-123 then Jra-123"), vec!["JRA-123"]);
    }

    #[test]
    fn extracts_multiple_keys_from_one_string() {
        assert_eq!(
            extract("JRA-123 Jra-456-jra-901\n[bah-001]"),
            vec!["JRA-123", "JRA-456", "JRA-901", "BAH-001"]
        );
    }

    // ─── Unicode scripts ───

    #[test]
    fn folds_latin_accented_letters() {
        assert_eq!(extract("tête-123"), vec!["TÊTE-123"]);
    }

    #[test]
    fn folds_arabic_letters() {
        assert_eq!(extract("b\u{063A}\u{062E}-123"), vec!["B\u{063A}\u{062E}-123"]);
    }

    #[test]
    fn folds_hebrew_letters() {
        assert_eq!(extract("c\u{05E7}-123"), vec!["C\u{05E7}-123"]);
    }

    #[test]
    fn folds_thai_letters() {
        assert_eq!(extract("tกฒ-123"), vec!["Tกฒ-123"]);
    }

    #[test]
    fn folds_japanese_mixed_letters() {
        assert_eq!(extract("シtヌ-123"), vec!["シTヌ-123"]);
    }

    #[test]
    fn folds_chinese_mixed_letters() {
        assert_eq!(extract("r汉字-123"), vec!["R汉字-123"]);
    }

    #[test]
    fn folds_russian_letters() {
        assert_eq!(extract("шъ-123"), vec!["ШЪ-123"]);
    }

    // ─── Multi-field extraction ───

    #[test]
    fn fields_share_one_deduplication_scope() {
        let fields = ["feature/JRA-123", "JRA-123 fix widget", "TBD-9 cleanup"];
        let keys: Vec<String> = extract_from_fields(fields)
            .into_iter()
            .map(|k| k.as_str().to_string())
            .collect();
        assert_eq!(keys, vec!["JRA-123", "TBD-9"]);
    }

    #[test]
    fn field_order_drives_output_order() {
        let keys: Vec<String> = extract_from_fields(["bb-2 first", "aa-1 second"])
            .into_iter()
            .map(|k| k.as_str().to_string())
            .collect();
        assert_eq!(keys, vec!["BB-2", "AA-1"]);
    }

    // ─── Properties ───

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Extraction never panics, whatever the input.
            #[test]
            fn total_on_arbitrary_input(text: String) {
                let _ = extract_issue_keys(&text);
            }

            /// Every extracted key is already normalized: re-extracting it
            /// from its own text yields itself.
            #[test]
            fn output_is_normalized(text in "[a-zA-Z0-9 /_.,:-]{0,80}") {
                for key in extract_issue_keys(&text) {
                    prop_assert_eq!(
                        extract_issue_keys(key.as_str()),
                        vec![key.clone()]
                    );
                }
            }

            /// No duplicates in the output.
            #[test]
            fn output_has_no_duplicates(text: String) {
                let keys = extract_issue_keys(&text);
                let mut seen = std::collections::HashSet::new();
                for key in &keys {
                    prop_assert!(seen.insert(key.as_str().to_string()));
                }
            }

            /// A well-formed key surrounded by spaces is always found.
            #[test]
            fn finds_planted_key(
                prefix in "[a-z]{2,6}",
                number in 1u32..100_000,
                noise in "[a-z ]{0,20}",
            ) {
                let planted = format!("{prefix}-{number}");
                let text = format!("{noise} {planted} {noise}");
                let expected = planted.to_uppercase();
                prop_assert!(
                    extract_issue_keys(&text)
                        .iter()
                        .any(|k| k.as_str() == expected)
                );
            }
        }
    }
}
