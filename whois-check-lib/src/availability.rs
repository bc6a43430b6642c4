//! Not-found evaluation over normalized WHOIS text.

use crate::directory::NotFoundRule;
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use std::borrow::Cow;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Decide whether `text` says `domain` is unregistered.
///
/// The domain is removed from the text before a [`NotFoundRule::MaxChars`]
/// length check. The domain is used as a case-sensitive regular expression
/// there, so its dots match any character. A [`NotFoundRule::Pattern`] is
/// matched case-insensitively against the text with whitespace runs folded
/// to single spaces.
pub fn evaluate(text: &str, domain: &str, rule: &NotFoundRule) -> bool {
    match rule {
        NotFoundRule::MaxChars(limit) => {
            let stripped = strip_domain(text, domain);
            stripped.len() <= *limit
        }
        NotFoundRule::Pattern(pattern) if pattern.is_empty() => true,
        NotFoundRule::Pattern(pattern) => {
            let collapsed = WHITESPACE.replace_all(text, " ");
            match RegexBuilder::new(pattern).case_insensitive(true).build() {
                Ok(re) => re.is_match(&collapsed),
                Err(e) => {
                    tracing::warn!(pattern = %pattern, error = %e, "Invalid not-found pattern");
                    false
                }
            }
        }
    }
}

fn strip_domain<'a>(text: &'a str, domain: &str) -> Cow<'a, str> {
    match Regex::new(domain) {
        Ok(re) => re.replace_all(text, ""),
        Err(e) => {
            tracing::debug!(domain = %domain, error = %e, "Domain is not a usable pattern");
            Cow::Borrowed(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(p: &str) -> NotFoundRule {
        NotFoundRule::Pattern(p.to_string())
    }

    #[test]
    fn test_pattern_match_is_case_insensitive() {
        let text = "No match for \"EXAMPLE.COM\".\r\n>>> Last update <<<";
        assert!(evaluate(text, "example.com", &pattern("no MATCH for")));
        assert!(!evaluate(text, "example.com", &pattern("Registrar:")));
    }

    #[test]
    fn test_pattern_sees_collapsed_whitespace() {
        let text = "Status:\n\n\t  AVAILABLE";
        assert!(evaluate(text, "example.it", &pattern("Status: AVAILABLE")));
    }

    #[test]
    fn test_empty_pattern_always_available() {
        assert!(evaluate("Domain Name: EXAMPLE.COM", "example.com", &pattern("")));
        assert!(evaluate("", "example.com", &pattern("")));
    }

    #[test]
    fn test_invalid_pattern_not_available() {
        assert!(!evaluate("anything", "example.com", &pattern("(unclosed")));
    }

    #[test]
    fn test_max_chars_strips_domain() {
        let text = "example.ex is free";
        // " is free" is 8 bytes once the domain is gone
        assert!(evaluate(text, "example.ex", &NotFoundRule::MaxChars(8)));
        assert!(!evaluate(text, "example.ex", &NotFoundRule::MaxChars(7)));
    }

    #[test]
    fn test_max_chars_domain_is_case_sensitive_pattern() {
        // Different case is not stripped
        assert!(!evaluate("EXAMPLE.EX", "example.ex", &NotFoundRule::MaxChars(0)));
        // The dot matches any character
        assert!(evaluate("exampleXex", "example.ex", &NotFoundRule::MaxChars(0)));
    }

    #[test]
    fn test_max_chars_counts_bytes() {
        assert!(!evaluate("ü", "example.ex", &NotFoundRule::MaxChars(1)));
        assert!(evaluate("ü", "example.ex", &NotFoundRule::MaxChars(2)));
    }
}
