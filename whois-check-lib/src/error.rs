//! Error handling for WHOIS lookups.
//!
//! Every way a lookup can fail maps to one `WhoisError` variant. Besides the
//! detailed `Display` text, each lookup failure also carries the short
//! user-facing message that front ends print in place of WHOIS content.

use std::fmt;

/// Main error type for WHOIS lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhoisError {
    /// The input string is not a `label.tld` domain name
    InvalidDomainSyntax { domain: String },

    /// The domain parsed, but its TLD route or its label fails the lookup heuristic
    DomainNotValidForLookup { domain: String },

    /// The server table has no usable server for the TLD chain
    NoServerForTld { tld: String },

    /// Socket or HTTP transport failure, including the referral hop
    ConnectionError { server: String, message: String },

    /// No known creation-date label was found in the response
    DateFieldNotFound { domain: String },

    /// A creation-date label was found but its value is not a date
    InvalidCreationDate { raw: String },

    /// Invalid configuration value or server table entry
    ConfigError { message: String },

    /// Server table or configuration file could not be read
    FileError { path: String, message: String },
}

/// Field-less discriminant of [`WhoisError`], handy for matching on the
/// per-call error list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidDomainSyntax,
    DomainNotValidForLookup,
    NoServerForTld,
    ConnectionError,
    DateFieldNotFound,
    InvalidCreationDate,
    ConfigError,
    FileError,
}

impl WhoisError {
    /// Create a new invalid syntax error.
    pub fn invalid_syntax<D: Into<String>>(domain: D) -> Self {
        Self::InvalidDomainSyntax {
            domain: domain.into(),
        }
    }

    /// Create a new "not valid for lookup" error.
    pub fn not_valid_for_lookup<D: Into<String>>(domain: D) -> Self {
        Self::DomainNotValidForLookup {
            domain: domain.into(),
        }
    }

    /// Create a new missing-server error.
    pub fn no_server<T: Into<String>>(tld: T) -> Self {
        Self::NoServerForTld { tld: tld.into() }
    }

    /// Create a new connection error.
    pub fn connection<S: Into<String>, M: Into<String>>(server: S, message: M) -> Self {
        Self::ConnectionError {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Create a new missing creation date error.
    pub fn date_not_found<D: Into<String>>(domain: D) -> Self {
        Self::DateFieldNotFound {
            domain: domain.into(),
        }
    }

    /// Create a new unparseable creation date error.
    pub fn invalid_date<R: Into<String>>(raw: R) -> Self {
        Self::InvalidCreationDate { raw: raw.into() }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidDomainSyntax { .. } => ErrorKind::InvalidDomainSyntax,
            Self::DomainNotValidForLookup { .. } => ErrorKind::DomainNotValidForLookup,
            Self::NoServerForTld { .. } => ErrorKind::NoServerForTld,
            Self::ConnectionError { .. } => ErrorKind::ConnectionError,
            Self::DateFieldNotFound { .. } => ErrorKind::DateFieldNotFound,
            Self::InvalidCreationDate { .. } => ErrorKind::InvalidCreationDate,
            Self::ConfigError { .. } => ErrorKind::ConfigError,
            Self::FileError { .. } => ErrorKind::FileError,
        }
    }

    /// Whether this error is one of the per-call lookup failures that a
    /// lookup records instead of aborting the program.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            Self::DomainNotValidForLookup { .. }
                | Self::NoServerForTld { .. }
                | Self::ConnectionError { .. }
                | Self::DateFieldNotFound { .. }
                | Self::InvalidCreationDate { .. }
        )
    }

    /// Short message shown to end users in place of WHOIS content.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidDomainSyntax { domain } => format!("Invalid {} syntax", domain),
            Self::DomainNotValidForLookup { .. } => "Domain name isn't valid!".to_string(),
            Self::NoServerForTld { .. } => "No whois server for this tld in list!".to_string(),
            Self::ConnectionError { .. } => "Connection error!".to_string(),
            Self::DateFieldNotFound { .. } => "Domain creation date was not found!".to_string(),
            Self::InvalidCreationDate { .. } => {
                "Domain creation date could not be parsed!".to_string()
            }
            Self::ConfigError { message } => format!("Configuration error: {}", message),
            Self::FileError { path, message } => format!("File error at '{}': {}", path, message),
        }
    }
}

impl fmt::Display for WhoisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomainSyntax { domain } => {
                write!(f, "Invalid domain syntax: '{}'", domain)
            }
            Self::DomainNotValidForLookup { domain } => {
                write!(f, "Domain '{}' is not valid for a WHOIS lookup", domain)
            }
            Self::NoServerForTld { tld } => {
                write!(f, "No WHOIS server configured for TLD '{}'", tld)
            }
            Self::ConnectionError { server, message } => {
                write!(f, "Connection to '{}' failed: {}", server, message)
            }
            Self::DateFieldNotFound { domain } => {
                write!(f, "No creation date field found in WHOIS data for '{}'", domain)
            }
            Self::InvalidCreationDate { raw } => {
                write!(f, "Unrecognized creation date value '{}'", raw)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
        }
    }
}

impl std::error::Error for WhoisError {}

impl From<reqwest::Error> for WhoisError {
    fn from(err: reqwest::Error) -> Self {
        let server = err
            .url()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "http".to_string());

        if err.is_timeout() {
            Self::connection(server, "HTTP request timed out")
        } else if err.is_connect() {
            Self::connection(server, format!("Connection failed: {}", err))
        } else {
            Self::connection(server, format!("HTTP request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for WhoisError {
    fn from(err: serde_json::Error) -> Self {
        Self::config(format!("Invalid server table JSON: {}", err))
    }
}
