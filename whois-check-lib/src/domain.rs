//! Domain name decomposition.
//!
//! A lookup starts by splitting the raw input into the first label
//! (`subdomain`) and everything after it (`tld_chain`), which may be a
//! multi-level chain such as `co.uk`. Casing is preserved.

use crate::error::WhoisError;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    /// `label.rest` with Unicode letters; `rest` is one or more letter/hyphen groups.
    static ref STANDARD_PATTERN: Regex =
        Regex::new(r"(?i)^([\p{L}\d\-]+)\.((?:[\p{L}\-]+\.?)+)$").unwrap();

    /// Punycode form, both halves `xn--` prefixed.
    static ref PUNYCODE_PATTERN: Regex =
        Regex::new(r"(?i)^(xn--[\p{L}\d\-]+)\.(xn--(?:[a-z\d\-]+\.?)+)$").unwrap();
}

/// A parsed domain name.
///
/// Invariant: `full == subdomain + "." + tld_chain`, both halves non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainName {
    full: String,
    subdomain: String,
    tld_chain: String,
}

impl DomainName {
    /// Parse a full domain name (without trailing dot).
    ///
    /// The standard pattern is tried first, then the punycode pattern.
    ///
    /// # Errors
    ///
    /// Returns [`WhoisError::InvalidDomainSyntax`] when neither matches.
    pub fn parse(domain: &str) -> Result<Self, WhoisError> {
        let captures = STANDARD_PATTERN
            .captures(domain)
            .or_else(|| PUNYCODE_PATTERN.captures(domain))
            .ok_or_else(|| WhoisError::invalid_syntax(domain))?;

        Ok(Self {
            full: domain.to_string(),
            subdomain: captures[1].to_string(),
            tld_chain: captures[2].to_string(),
        })
    }

    pub fn full(&self) -> &str {
        &self.full
    }

    /// The first label, e.g. `example` for `example.co.uk`.
    pub fn subdomain(&self) -> &str {
        &self.subdomain
    }

    /// Everything after the first label, e.g. `co.uk` for `example.co.uk`.
    pub fn tld_chain(&self) -> &str {
        &self.tld_chain
    }

    /// The query line sent to servers, without the line terminator.
    pub fn query(&self) -> String {
        format!("{}.{}", self.subdomain, self.tld_chain)
    }

    /// Whether the first label is something registries accept: at least three
    /// ASCII letters, digits or hyphens, not starting or ending with a hyphen.
    pub fn has_lookup_label(&self) -> bool {
        let label = self.subdomain.to_lowercase();

        label.chars().count() >= 3
            && label
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && !label.starts_with('-')
            && !label.ends_with('-')
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl FromStr for DomainName {
    type Err = WhoisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
