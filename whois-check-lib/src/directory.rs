//! Per-TLD WHOIS server routing.
//!
//! A lookup asks the directory for the route of its TLD chain (`com`,
//! `co.uk`, ...). A route names the server to query and the rule that tells
//! a "no such domain" answer apart from a registered one.
//!
//! The table format is a JSON object keyed by TLD chain:
//!
//! ```json
//! { "com": ["whois.verisign-grs.com", "No match for"],
//!   "example": ["https://whois.example/lookup?domain=", "MAXCHARS:80"] }
//! ```

use crate::error::WhoisError;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Prefix of the length-based not-found rule.
const MAXCHARS_PREFIX: &str = "MAXCHARS:";

/// Server names at or below this length are treated as unusable.
const MIN_SERVER_LEN: usize = 6;

// Bundled table, parsed on first use
lazy_static! {
    static ref BUNDLED: StaticDirectory =
        StaticDirectory::from_json_str(include_str!("../data/whois-servers.json"))
            .unwrap_or_default();
}

/// Read-only source of per-TLD routes.
///
/// Implementations must match `tld_chain` case-insensitively.
pub trait ServerDirectory: Send + Sync {
    fn route(&self, tld_chain: &str) -> Option<&RouteEntry>;
}

/// How to decide that a response means "not registered".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundRule {
    /// Available when the response, minus the domain itself, is at most this many bytes
    MaxChars(usize),

    /// Available when this case-insensitive pattern matches the response.
    /// An empty pattern matches everything.
    Pattern(String),
}

impl NotFoundRule {
    /// Parse a rule string as stored in the server table.
    ///
    /// # Errors
    ///
    /// A `MAXCHARS:` rule whose value is not a non-negative integer.
    pub fn parse(raw: &str) -> Result<Self, WhoisError> {
        match raw.strip_prefix(MAXCHARS_PREFIX) {
            Some(limit) => limit.trim().parse::<usize>().map(Self::MaxChars).map_err(|_| {
                WhoisError::config(format!(
                    "Invalid not-found rule '{}': expected {}<non-negative integer>",
                    raw, MAXCHARS_PREFIX
                ))
            }),
            None => Ok(Self::Pattern(raw.to_string())),
        }
    }
}

impl Default for NotFoundRule {
    fn default() -> Self {
        Self::Pattern(String::new())
    }
}

impl fmt::Display for NotFoundRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxChars(limit) => write!(f, "{}{}", MAXCHARS_PREFIX, limit),
            Self::Pattern(pattern) => f.write_str(pattern),
        }
    }
}

/// One row of the server table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteEntry {
    /// Hostname for port-43 servers, or a URL prefix for HTTP servers
    pub server: String,
    pub not_found: NotFoundRule,
}

impl RouteEntry {
    pub fn new<S: Into<String>>(server: S, not_found: NotFoundRule) -> Self {
        Self {
            server: server.into(),
            not_found,
        }
    }

    /// Build an entry from a table row of one or two strings.
    ///
    /// # Errors
    ///
    /// Rows with no elements or more than two, or an invalid rule.
    pub fn from_row(tld: &str, row: &[String]) -> Result<Self, WhoisError> {
        match row {
            [server] => Ok(Self::new(server.clone(), NotFoundRule::default())),
            [server, rule] => Ok(Self::new(server.clone(), NotFoundRule::parse(rule)?)),
            _ => Err(WhoisError::config(format!(
                "Server table entry for '{}' must have one or two elements, found {}",
                tld,
                row.len()
            ))),
        }
    }

    /// Whether the server is a URL prefix rather than a socket host.
    pub fn is_http(&self) -> bool {
        let lower = self.server.to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }

    /// Whether the server name is long enough to be a real server.
    pub fn is_configured(&self) -> bool {
        self.server.len() > MIN_SERVER_LEN
    }
}

/// In-memory server table.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    routes: HashMap<String, RouteEntry>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The server table compiled into the library.
    pub fn bundled() -> Self {
        BUNDLED.clone()
    }

    /// Parse a JSON server table.
    pub fn from_json_str(json: &str) -> Result<Self, WhoisError> {
        let raw: HashMap<String, Vec<String>> = serde_json::from_str(json)?;
        Self::from_rows(raw)
    }

    /// Read and parse a JSON server table from disk.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, WhoisError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| WhoisError::file_error(path.display().to_string(), e.to_string()))?;

        Self::from_json_str(&content).map_err(|e| match e {
            WhoisError::ConfigError { message } => {
                WhoisError::file_error(path.display().to_string(), message)
            }
            other => other,
        })
    }

    /// Build a table from `tld -> [server, rule?]` rows.
    pub fn from_rows<I>(rows: I) -> Result<Self, WhoisError>
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let mut directory = Self::new();
        for (tld, row) in rows {
            let entry = RouteEntry::from_row(&tld, &row)?;
            directory.insert(&tld, entry);
        }
        Ok(directory)
    }

    /// Add or replace the route for a TLD chain.
    pub fn insert(&mut self, tld_chain: &str, entry: RouteEntry) {
        self.routes.insert(tld_chain.to_lowercase(), entry);
    }

    /// Merge another table into this one; its routes win.
    pub fn extend(&mut self, other: StaticDirectory) {
        self.routes.extend(other.routes);
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// All known TLD chains, sorted.
    pub fn tlds(&self) -> Vec<String> {
        let mut tlds: Vec<String> = self.routes.keys().cloned().collect();
        tlds.sort();
        tlds
    }
}

impl ServerDirectory for StaticDirectory {
    fn route(&self, tld_chain: &str) -> Option<&RouteEntry> {
        self.routes.get(&tld_chain.to_lowercase())
    }
}
