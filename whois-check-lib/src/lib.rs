//! # WHOIS Check Library
//!
//! A WHOIS lookup engine: per-TLD server routing, port-43 and HTTP
//! transports with `.com`/`.net` referral chasing, charset normalization,
//! and heuristics for domain availability and domain age.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use whois_check_lib::{StaticDirectory, WhoisLookup};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let directory = Arc::new(StaticDirectory::bundled());
//!     let mut lookup = WhoisLookup::new("example.com", directory)?;
//!
//!     println!("{}", lookup.info().await?);
//!     println!("Age: {}", lookup.check_age().await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Routing**: bundled JSON server table, overridable and injectable
//! - **Transports**: raw WHOIS over TCP and HTTP(S) pages, all bounded by timeouts
//! - **Referrals**: registrar server discovery for `.com` and `.net`
//! - **Heuristics**: pluggable not-found rules and creation-date labels

// Re-export main public API types and functions
// This makes them available as whois_check_lib::TypeName
pub use config::{
    load_env_config, parse_timeout, parse_timeout_string, ConfigManager, DefaultsConfig,
    EnvConfig, FileConfig, OutputConfig,
};
pub use directory::{NotFoundRule, RouteEntry, ServerDirectory, StaticDirectory};
pub use domain::DomainName;
pub use error::{ErrorKind, WhoisError};
pub use lookup::WhoisLookup;
pub use protocols::{Fetcher, WhoisTransport};
pub use types::{AgeResult, LookupConfig, LookupReport};

// Public modules with free functions
pub mod age;
pub mod availability;
pub mod normalize;
pub mod protocols;

// Internal modules - their types are re-exported above
mod config;
mod directory;
mod domain;
mod error;
mod lookup;
mod types;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, WhoisError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
