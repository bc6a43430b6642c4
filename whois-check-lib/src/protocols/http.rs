//! HTTP transport for registries that publish WHOIS data on a web page.
//!
//! The route's server is a URL prefix; the domain is appended and the page
//! body, minus markup, is the WHOIS text.

use crate::domain::DomainName;
use crate::error::WhoisError;
use crate::normalize::strip_markup;
use crate::types::LookupConfig;
use std::time::Duration;
use tracing::{debug, instrument};

/// HTTP client for URL-prefix servers.
#[derive(Clone)]
pub struct HttpClient {
    http_client: reqwest::Client,
    timeout: Duration,
    max_response_size: usize,
}

impl HttpClient {
    /// Create a client from the engine configuration.
    ///
    /// Redirects are never followed. Certificates are verified unless the
    /// configuration opts out.
    pub fn new(config: &LookupConfig) -> Result<Self, WhoisError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| {
                WhoisError::config(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            timeout: config.http_timeout,
            max_response_size: config.max_response_size,
        })
    }

    /// GET `server + label.tld` and strip markup from the body.
    ///
    /// Any status code is accepted; error pages often carry the answer.
    /// Bodies over `max_response_size` are a connection error.
    #[instrument(skip_all, fields(domain = %domain, server = %server))]
    pub async fn fetch(&self, domain: &DomainName, server: &str) -> Result<Vec<u8>, WhoisError> {
        let url = format!("{}{}", server, domain.query());
        debug!(url = %url, timeout = ?self.timeout, "Requesting WHOIS page");

        let mut response = self.http_client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = %status, "Non-success status, using body anyway");
        }

        let limit = self.max_response_size;
        let too_large =
            || WhoisError::connection(server, format!("Response exceeds {} bytes", limit));

        if let Some(length) = response.content_length() {
            if length > limit as u64 {
                return Err(too_large());
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(strip_markup(&body))
    }
}
