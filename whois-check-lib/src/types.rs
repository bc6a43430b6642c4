//! Core data types for WHOIS lookups.
//!
//! This module defines the per-engine configuration, the creation-date age
//! result and the serializable report used by front ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default TCP port of the WHOIS protocol.
pub const DEFAULT_WHOIS_PORT: u16 = 43;

/// Default upper bound on a single response body.
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 1024 * 1024;

/// Configuration options for one lookup engine.
///
/// All network waits are bounded. Certificate verification for HTTP
/// servers stays on unless `accept_invalid_certs` is set explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Socket connect bound
    /// Default: 10 seconds
    #[serde(skip)]
    pub connect_timeout: Duration,

    /// Bound on each socket read
    /// Default: 30 seconds
    #[serde(skip)]
    pub read_timeout: Duration,

    /// Whole-request bound for HTTP servers
    /// Default: 60 seconds
    #[serde(skip)]
    pub http_timeout: Duration,

    /// TCP port used for the first query and the referral hop
    /// Default: 43
    pub whois_port: u16,

    /// Skip TLS certificate verification for HTTP servers
    /// Default: false
    pub accept_invalid_certs: bool,

    /// Largest response accepted before the transfer is aborted
    /// Default: 1 MiB
    pub max_response_size: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            http_timeout: Duration::from_secs(60),
            whois_port: DEFAULT_WHOIS_PORT,
            accept_invalid_certs: false,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }
}

impl LookupConfig {
    /// Set the socket connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the per-read socket timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the HTTP request timeout.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Apply one timeout to every network wait.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_connect_timeout(timeout)
            .with_read_timeout(timeout)
            .with_http_timeout(timeout)
    }

    /// Use a port other than 43 for socket servers.
    pub fn with_whois_port(mut self, port: u16) -> Self {
        self.whois_port = port;
        self
    }

    /// Accept invalid TLS certificates from HTTP servers.
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Cap the size of a single response. Zero is bumped to one byte.
    pub fn with_max_response_size(mut self, bytes: usize) -> Self {
        self.max_response_size = bytes.max(1);
        self
    }
}

/// Age of a registered domain, derived from its creation date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeResult {
    /// The creation date value exactly as found in the WHOIS text
    pub creation_date: String,

    /// The parsed creation instant
    pub created_at: DateTime<Utc>,

    pub years: u32,
    pub months: u32,
    pub days: u32,
}

impl fmt::Display for AgeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02} Year, {:02} Months, {} Days",
            self.years, self.months, self.days
        )
    }
}

/// Outcome of looking up one domain, as reported by front ends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupReport {
    /// The domain as given by the user
    pub domain: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tld: Option<String>,

    /// - `Some(true)`: no-match signature found
    /// - `Some(false)`: domain looks registered
    /// - `None`: not evaluated or lookup failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<AgeResult>,

    /// Normalized WHOIS text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// User-facing messages of every failure recorded for this domain
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl LookupReport {
    pub fn new<D: Into<String>>(domain: D) -> Self {
        Self {
            domain: domain.into(),
            ..Default::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}
