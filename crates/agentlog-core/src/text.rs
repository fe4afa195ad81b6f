//! UTF-8-safe truncation for rendered log content.
//!
//! Transcript text is truncated against the byte budgets in
//! [`crate::Limits`], and `&str[..n]` panics when `n` falls inside a
//! multi-byte character. These helpers snap to the nearest char boundary
//! so a budget can never split a code point.

/// Truncate a string to at most `max_bytes` bytes at a char boundary.
///
/// Returns the longest prefix of `s` whose byte length is within the
/// budget and that does not split a multi-byte character.
#[inline]
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    // `floor_char_boundary` is nightly-only, so walk back by hand.
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Truncate `s` and append `suffix` (e.g. `"..."`) if it was cut.
///
/// The result is at most `max_bytes` bytes including the suffix. A string
/// that already fits is returned unchanged.
pub fn truncate_with_suffix(s: &str, max_bytes: usize, suffix: &str) -> String {
    if s.len() <= max_bytes {
        return s.to_owned();
    }
    let body_budget = max_bytes.saturating_sub(suffix.len());
    let prefix = truncate_str(s, body_budget);
    format!("{prefix}{suffix}")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── truncate_str ─────────────────────────────────────────────────────

    #[test]
    fn shorter_than_budget() {
        assert_eq!(truncate_str("log line", 20), "log line");
    }

    #[test]
    fn exactly_at_budget() {
        assert_eq!(truncate_str("result", 6), "result");
    }

    #[test]
    fn ascii_cut() {
        assert_eq!(truncate_str("tool output here", 4), "tool");
    }

    #[test]
    fn empty_input() {
        assert_eq!(truncate_str("", 5), "");
    }

    #[test]
    fn zero_budget() {
        assert_eq!(truncate_str("anything", 0), "");
    }

    #[test]
    fn snaps_back_inside_three_byte_char() {
        // '→' (U+2192) occupies bytes 2..5
        let s = "ok→go";
        assert_eq!(truncate_str(s, 3), "ok");
        assert_eq!(truncate_str(s, 4), "ok");
        assert_eq!(truncate_str(s, 5), "ok→");
    }

    #[test]
    fn snaps_back_inside_four_byte_char() {
        // '🔒' (U+1F512) occupies bytes 1..5
        let s = "a🔒b";
        assert_eq!(truncate_str(s, 2), "a");
        assert_eq!(truncate_str(s, 4), "a");
        assert_eq!(truncate_str(s, 5), "a🔒");
    }

    #[test]
    fn two_byte_accent() {
        // 'é' occupies bytes 3..5
        let s = "café";
        assert_eq!(truncate_str(s, 4), "caf");
        assert_eq!(truncate_str(s, 5), "café");
    }

    #[test]
    fn entirely_multibyte() {
        let s = "日本語"; // 3 bytes per char
        assert_eq!(truncate_str(s, 2), "");
        assert_eq!(truncate_str(s, 3), "日");
        assert_eq!(truncate_str(s, 8), "日本");
        assert_eq!(truncate_str(s, 9), "日本語");
    }

    // ── truncate_with_suffix ─────────────────────────────────────────────

    #[test]
    fn suffix_not_added_when_it_fits() {
        assert_eq!(truncate_with_suffix("short", 10, "..."), "short");
    }

    #[test]
    fn suffix_counted_in_budget() {
        let out = truncate_with_suffix("a long tool result", 10, "...");
        assert_eq!(out, "a long ...");
        assert_eq!(out.len(), 10);
    }

    #[test]
    fn suffix_snaps_at_multibyte_boundary() {
        // 'ü' occupies bytes 2..4; budget 6 minus 3-byte suffix leaves 3,
        // which lands inside 'ü' and snaps back to 2.
        let s = "grünes Licht";
        assert_eq!(truncate_with_suffix(s, 6, "..."), "gr...");
    }

    #[test]
    fn suffix_budget_smaller_than_suffix() {
        assert_eq!(truncate_with_suffix("hello", 2, "..."), "...");
    }

    #[test]
    fn exact_fit_is_unchanged() {
        assert_eq!(truncate_with_suffix("abc", 3, "..."), "abc");
    }
}
