//! Token text matching
//!
//! Inbox rows and recipient suggestions render query text interleaved
//! with other fragments (truncated addresses, reordered display
//! names), so matching requires every token to appear somewhere in
//! the candidate, in any order, rather than a contiguous substring.

use mailpilot_session::TextFilter;

/// Number of leading characters typed to narrow a suggestion list.
///
/// Typing the full value can overshoot past the rendered suggestion
/// text in fuzzy-matching pickers; a short prefix narrows reliably.
pub const FILTER_PREFIX_LEN: usize = 4;

/// Split a query into lowercase whitespace-delimited tokens.
pub fn tokens(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect()
}

/// True when every token of `query` appears somewhere in `candidate`,
/// case-insensitive, order-independent. An empty or whitespace-only
/// query matches nothing.
pub fn all_tokens_match(query: &str, candidate: &str) -> bool {
    let toks = tokens(query);
    if toks.is_empty() {
        return false;
    }
    let haystack = candidate.to_lowercase();
    toks.iter().all(|t| haystack.contains(t.as_str()))
}

/// Build the in-page filter with the same all-tokens semantics.
pub fn token_filter(query: &str) -> TextFilter {
    TextFilter::all_tokens(tokens(query))
}

/// The leading characters of `value` used as the suggestion filter.
pub fn filter_prefix(value: &str) -> String {
    value.trim().chars().take(FILTER_PREFIX_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_permuted_tokens() {
        assert!(all_tokens_match("Jane Doe", "Doe, Jane <jane.doe@example.com>"));
        assert!(all_tokens_match("project update", "Update on the Project — 10:15 AM"));
    }

    #[test]
    fn rejects_when_any_token_missing() {
        assert!(!all_tokens_match("Jane Doe", "Jane Smith"));
        assert!(!all_tokens_match("quarterly report final", "quarterly report draft"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(all_tokens_match("JANE", "jane doe"));
        assert!(all_tokens_match("jane", "JANE DOE"));
    }

    #[test]
    fn empty_query_matches_nothing() {
        assert!(!all_tokens_match("", "anything"));
        assert!(!all_tokens_match("   ", "anything"));
    }

    #[test]
    fn tokens_are_lowercased_and_split() {
        assert_eq!(tokens("  Jane   DOE "), vec!["jane", "doe"]);
        assert!(tokens("").is_empty());
    }

    #[test]
    fn prefix_takes_leading_trimmed_chars() {
        assert_eq!(filter_prefix("  alice@example.com"), "alic");
        assert_eq!(filter_prefix("Bob"), "Bob");
        assert_eq!(filter_prefix(""), "");
    }

    #[test]
    fn token_filter_mirrors_matcher() {
        let filter = token_filter("Jane Doe");
        assert!(filter.matches("Doe, Jane"));
        assert!(!filter.matches("Jane only"));
    }
}
