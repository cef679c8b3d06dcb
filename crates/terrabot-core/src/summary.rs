/// Bounded user-facing summary of a long matched text.
///
/// Splits on `.`, keeps the first two segments (each trimmed), rejoins them with `". "`,
/// trims, then cuts to at most `max_chars` characters. Abbreviations and decimals split too.
pub fn summarize(text: &str, max_chars: usize) -> String {
    let joined = text
        .split('.')
        .take(2)
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(". ");
    truncate_chars(joined.trim(), max_chars)
}

/// Hard cut at `max_chars` characters (never splits a code point).
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_two_sentences() {
        assert_eq!(summarize("A. B. C. D.", 1000), "A. B");
        assert_eq!(
            summarize("  Bring the deed. Pay the tax. Wait two weeks.  ", 1000),
            "Bring the deed. Pay the tax"
        );
    }

    #[test]
    fn text_without_periods_is_kept_whole() {
        assert_eq!(summarize("  no periods here ", 1000), "no periods here");
        assert_eq!(summarize("", 1000), "");
    }

    #[test]
    fn decimals_split_like_sentences() {
        assert_eq!(summarize("Rate is 1.5 percent. Due yearly.", 1000), "Rate is 1. 5 percent");
    }

    #[test]
    fn long_text_is_cut_to_exactly_the_limit() {
        let long = format!("{}. {}.", "x".repeat(900), "y".repeat(900));
        let out = summarize(&long, 1000);
        assert_eq!(out.chars().count(), 1000);
        assert!(out.starts_with(&"x".repeat(900)));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("pagpalambo sa yuta ñ", 19), "pagpalambo sa yuta ");
        assert_eq!(truncate_chars("ñañaña", 3), "ñañ");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
