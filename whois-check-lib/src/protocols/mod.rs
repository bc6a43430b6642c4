//! Transports that fetch raw WHOIS answers.
//!
//! A route either names a port-43 host or an HTTP URL prefix. [`Fetcher`]
//! picks the matching transport; [`WhoisTransport`] is the seam lookups
//! depend on, so tests and embedders can supply their own.

/// HTTP(S) transport for URL-prefix servers
pub mod http;

/// Port-43 transport with registry referral chasing
pub mod whois;

pub use http::HttpClient;
pub use whois::{extract_referral, needs_referral, WhoisClient};

use crate::directory::RouteEntry;
use crate::domain::DomainName;
use crate::error::WhoisError;
use crate::types::LookupConfig;
use async_trait::async_trait;

/// Source of raw WHOIS bytes for a domain and its route.
#[async_trait]
pub trait WhoisTransport: Send + Sync {
    /// Fetch the final raw answer. No retries.
    async fn fetch(&self, domain: &DomainName, route: &RouteEntry) -> Result<Vec<u8>, WhoisError>;
}

/// Default transport: HTTP for URL-prefix servers, port 43 otherwise.
#[derive(Clone)]
pub struct Fetcher {
    whois: WhoisClient,
    http: HttpClient,
}

impl Fetcher {
    pub fn new(config: &LookupConfig) -> Result<Self, WhoisError> {
        Ok(Self {
            whois: WhoisClient::new(config),
            http: HttpClient::new(config)?,
        })
    }
}

#[async_trait]
impl WhoisTransport for Fetcher {
    async fn fetch(&self, domain: &DomainName, route: &RouteEntry) -> Result<Vec<u8>, WhoisError> {
        if route.server.is_empty() {
            return Err(WhoisError::no_server(domain.tld_chain()));
        }

        if route.is_http() {
            self.http.fetch(domain, &route.server).await
        } else {
            self.whois.lookup(domain, &route.server).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::NotFoundRule;

    #[tokio::test]
    async fn test_empty_server_makes_no_call() {
        let fetcher = Fetcher::new(&LookupConfig::default()).unwrap();
        let domain = DomainName::parse("example.za").unwrap();
        let route = RouteEntry::new("", NotFoundRule::default());

        let err = fetcher.fetch(&domain, &route).await.unwrap_err();
        assert_eq!(err, WhoisError::no_server("za"));
    }
}
