//! Layout fingerprints derived from document text.

use std::collections::BTreeSet;

use crate::invoice::rules::patterns::{DIGIT_RUN, STRUCTURE_WORDS, WHITESPACE_RUN};

/// Token substituted for every run of digits.
const DIGIT_PLACEHOLDER: &str = "#";

/// Normalize text so that numbers and spacing do not affect the layout:
/// digit runs become `#`, whitespace runs become a single space.
pub fn normalize(text: &str) -> String {
    let without_digits = DIGIT_RUN.replace_all(text, DIGIT_PLACEHOLDER);
    WHITESPACE_RUN.replace_all(&without_digits, " ").into_owned()
}

/// Sorted, de-duplicated structural keywords present in `text`.
pub fn structural_keywords(text: &str) -> Vec<String> {
    let normalized = normalize(text).to_lowercase();
    let words: BTreeSet<&str> = STRUCTURE_WORDS
        .find_iter(&normalized)
        .map(|m| m.as_str())
        .collect();
    words.into_iter().map(str::to_string).collect()
}

/// Layout signature: hex MD5 of the space-joined keyword set.
///
/// Texts that differ only in numbers share a signature. Empty or
/// keyword-free text hashes the empty string.
pub fn fingerprint(text: &str) -> String {
    let structure = structural_keywords(text).join(" ");
    format!("{:x}", md5::compute(structure.as_bytes()))
}
