use std::ops::RangeInclusive;

use unicode_normalization::UnicodeNormalization;

/// The Combining Diacritical Marks block. Other combining marks are not
/// accents on Latin letters and become separators like any other symbol.
const COMBINING_DIACRITICS: RangeInclusive<char> = '\u{0300}'..='\u{036F}';

/// Normalize an optional payload. Absent input normalizes to the empty string.
pub fn normalize(raw: Option<&str>) -> String {
    raw.map(normalize_text).unwrap_or_default()
}

/// Normalize document text into lowercase ASCII alphanumeric words separated
/// by single spaces.
///
/// The steps run in a fixed order: lowercase, NFD decompose, drop
/// combining diacritics (U+0300..=U+036F), map everything outside `[a-z0-9]` to a separator, then
/// collapse separators. Marks are dropped *before* the separator mapping so
/// an accent inside a word never splits it.
///
/// ```
/// use canonical::normalize_text;
///
/// assert_eq!(normalize_text("  Crème Brûlée,  s'il vous plaît! "), "creme brulee s il vous plait");
/// ```
pub fn normalize_text(raw: &str) -> String {
    // Lowercasing can expand a single character (e.g. `İ` -> `i̇`), so it runs
    // on the whole string before decomposition.
    let lowered = raw.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_space = false;

    for ch in lowered.nfd() {
        if COMBINING_DIACRITICS.contains(&ch) {
            continue;
        }
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else {
            pending_space = true;
        }
    }
    out
}
