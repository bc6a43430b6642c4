//! WHOIS protocol transport.
//!
//! A query is one line `label.tld\r\n` written to TCP port 43, answered by
//! free-form text until the server closes the connection. Registry servers
//! for `com` and `net` only know which registrar holds a domain, so their
//! answer is used to find the registrar's own WHOIS server, which is then
//! asked the same question.

use crate::domain::DomainName;
use crate::error::WhoisError;
use crate::types::LookupConfig;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

/// TLD chains whose registry answers with a referral.
const REFERRAL_TLDS: [&str; 2] = ["com", "net"];

/// Field naming the referral host in a registry answer.
const REFERRAL_KEY: &str = "whois server";

const READ_CHUNK: usize = 4096;

/// Socket client for port-43 servers.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    connect_timeout: Duration,
    read_timeout: Duration,
    port: u16,
    max_response_size: usize,
}

impl Default for WhoisClient {
    fn default() -> Self {
        Self::new(&LookupConfig::default())
    }
}

impl WhoisClient {
    pub fn new(config: &LookupConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
            port: config.whois_port,
            max_response_size: config.max_response_size,
        }
    }

    /// Fetch the raw answer for `domain` from `server`, following the
    /// registry referral for `com` and `net`.
    #[instrument(skip_all, fields(domain = %domain, server = %server))]
    pub async fn lookup(&self, domain: &DomainName, server: &str) -> Result<Vec<u8>, WhoisError> {
        let query = domain.query();
        let first = self.query_server(server, &query).await?;

        if !needs_referral(domain.tld_chain()) {
            return Ok(first);
        }

        match extract_referral(&first) {
            Some(referral) => {
                debug!(referral = %referral, "Following registry referral");
                self.query_server(&referral, &query).await
            }
            None => {
                debug!("Registry answer names no referral, using it as is");
                Ok(first)
            }
        }
    }

    /// One connect, write, read-to-end cycle against `server`.
    pub async fn query_server(&self, server: &str, query: &str) -> Result<Vec<u8>, WhoisError> {
        let addr = format!("{}:{}", server, self.port);
        debug!(addr = %addr, "Connecting to WHOIS server");

        let mut stream = timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| {
                WhoisError::connection(
                    server,
                    format!("Connect timed out after {:?}", self.connect_timeout),
                )
            })?
            .map_err(|e| WhoisError::connection(server, format!("Failed to connect: {}", e)))?;

        let response = exchange(
            &mut stream,
            query,
            self.read_timeout,
            self.max_response_size,
        )
        .await
        .map_err(|e| match e {
            WhoisError::ConnectionError { message, .. } => WhoisError::connection(server, message),
            other => other,
        });

        // Best effort; the peer has usually closed already
        let _ = stream.shutdown().await;
        response
    }
}

/// Whether a TLD chain is answered by a referral-only registry.
pub fn needs_referral(tld_chain: &str) -> bool {
    REFERRAL_TLDS.contains(&tld_chain)
}

/// Write `query` followed by CRLF, then read until end of stream.
///
/// Each read is bounded by `read_timeout`; a stalled server with a partial
/// answer yields what arrived so far.
pub async fn exchange<S>(
    stream: &mut S,
    query: &str,
    read_timeout: Duration,
    max_size: usize,
) -> Result<Vec<u8>, WhoisError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let line = format!("{}\r\n", query);
    timeout(read_timeout, stream.write_all(line.as_bytes()))
        .await
        .map_err(|_| WhoisError::connection("socket", "Write timed out"))?
        .map_err(|e| WhoisError::connection("socket", format!("Failed to send query: {}", e)))?;

    let mut response = Vec::new();
    let mut buf = [0u8; READ_CHUNK];

    loop {
        match timeout(read_timeout, stream.read(&mut buf)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => {
                response.extend_from_slice(&buf[..n]);
                if response.len() > max_size {
                    return Err(WhoisError::connection(
                        "socket",
                        format!("Response exceeds {} bytes", max_size),
                    ));
                }
            }
            Ok(Err(e)) => {
                return Err(WhoisError::connection("socket", format!("Read error: {}", e)));
            }
            Err(_) if !response.is_empty() => {
                warn!(bytes = response.len(), "Read timed out, keeping partial response");
                break;
            }
            Err(_) => return Err(WhoisError::connection("socket", "Read timed out")),
        }
    }

    Ok(response)
}

/// Referral host named by a registry answer.
///
/// Every line is split on `:`; when the trimmed, lower-cased first part is
/// `whois server`, the trimmed second part is the host. The last such line
/// wins and empty values are skipped.
pub fn extract_referral(response: &[u8]) -> Option<String> {
    String::from_utf8_lossy(response)
        .lines()
        .filter_map(|line| {
            let mut parts = line.trim().split(':');
            let key = parts.next()?.trim().to_lowercase();
            let value = parts.next()?.trim();
            (key == REFERRAL_KEY && !value.is_empty()).then(|| value.to_string())
        })
        .last()
}
