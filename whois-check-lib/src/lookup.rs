//! Lookup orchestration for a single domain.
//!
//! [`WhoisLookup`] ties the pieces together: it routes the domain through a
//! [`ServerDirectory`], fetches through a [`WhoisTransport`], normalizes the
//! answer and runs the availability and creation-date heuristics over it.
//!
//! Every query returns a `Result`. The engine also keeps the failures of the
//! most recent query and the last successful text for callers that want to
//! inspect them afterwards.
//!
//! # Example
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
//!     if lookup.is_available().await? {
//!         println!("{} is available", lookup.domain());
//!     }
//!     Ok(())
//! }
//! ```

use crate::age;
use crate::availability;
use crate::directory::{RouteEntry, ServerDirectory};
use crate::domain::DomainName;
use crate::error::WhoisError;
use crate::normalize::{line_breaks_to_markup, normalize};
use crate::protocols::{Fetcher, WhoisTransport};
use crate::types::{AgeResult, LookupConfig};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, instrument};

/// WHOIS lookup engine for one domain.
///
/// Queries take `&mut self` because they overwrite the per-call state; use
/// one engine per domain when looking up several domains concurrently.
pub struct WhoisLookup {
    domain: DomainName,
    directory: Arc<dyn ServerDirectory>,
    transport: Arc<dyn WhoisTransport>,
    latest_result: Option<String>,
    errors: Vec<WhoisError>,
}

impl WhoisLookup {
    /// Create an engine with the default configuration.
    ///
    /// # Errors
    ///
    /// [`WhoisError::InvalidDomainSyntax`] when `domain` is not `label.tld`.
    pub fn new(domain: &str, directory: Arc<dyn ServerDirectory>) -> Result<Self, WhoisError> {
        Self::with_config(domain, directory, LookupConfig::default())
    }

    /// Create an engine with a custom configuration.
    pub fn with_config(
        domain: &str,
        directory: Arc<dyn ServerDirectory>,
        config: LookupConfig,
    ) -> Result<Self, WhoisError> {
        let domain = DomainName::parse(domain)?;
        let transport = Arc::new(Fetcher::new(&config)?);

        Ok(Self {
            domain,
            directory,
            transport,
            latest_result: None,
            errors: Vec::new(),
        })
    }

    /// Replace the transport.
    pub fn with_transport(mut self, transport: Arc<dyn WhoisTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Fetch and normalize the WHOIS text.
    ///
    /// Clears the errors of the previous query first. On failure the error
    /// is recorded once and returned.
    #[instrument(skip(self), fields(domain = %self.domain))]
    pub async fn info(&mut self) -> Result<String, WhoisError> {
        self.errors.clear();

        match self.fetch_normalized().await {
            Ok(text) => {
                debug!(bytes = text.len(), "Lookup succeeded");
                self.latest_result = Some(text.clone());
                Ok(text)
            }
            Err(e) => {
                debug!(error = %e, "Lookup failed");
                self.errors.push(e.clone());
                Err(e)
            }
        }
    }

    async fn fetch_normalized(&self) -> Result<String, WhoisError> {
        let route = match self.route() {
            Some(route) if !route.server.is_empty() => route.clone(),
            _ => return Err(WhoisError::no_server(self.domain.tld_chain())),
        };

        if !self.is_valid() {
            return Err(WhoisError::not_valid_for_lookup(self.domain.full()));
        }

        let raw = self.transport.fetch(&self.domain, &route).await?;
        Ok(normalize(&raw))
    }

    /// [`info`](Self::info), with failures replaced by their user-facing message.
    pub async fn info_text(&mut self) -> String {
        match self.info().await {
            Ok(text) => text,
            Err(e) => e.user_message(),
        }
    }

    /// [`info`](Self::info) with `<br />` before every line break.
    pub async fn html_info(&mut self) -> Result<String, WhoisError> {
        self.info().await.map(|text| line_breaks_to_markup(&text))
    }

    /// Whether a lookup would be attempted: the TLD has a configured server
    /// and the first label looks registrable.
    pub fn is_valid(&self) -> bool {
        self.route().is_some_and(RouteEntry::is_configured) && self.domain.has_lookup_label()
    }

    /// Fresh lookup, then the TLD's not-found rule.
    pub async fn is_available(&mut self) -> Result<bool, WhoisError> {
        let text = self.info().await?;
        Ok(self.availability_of(&text))
    }

    /// Fresh lookup, then the creation-date heuristic.
    ///
    /// A missing or unparseable creation date is recorded like any other
    /// failure of this call.
    pub async fn check_age(&mut self) -> Result<AgeResult, WhoisError> {
        let text = self.info().await?;
        self.age_of(&text).map_err(|e| {
            self.errors.push(e.clone());
            e
        })
    }

    /// Apply the not-found rule to text the caller already has.
    pub fn availability_of(&self, text: &str) -> bool {
        let rule = self
            .route()
            .map(|route| route.not_found.clone())
            .unwrap_or_default();
        availability::evaluate(text, self.domain.full(), &rule)
    }

    /// Run the creation-date heuristic on text the caller already has.
    pub fn age_of(&self, text: &str) -> Result<AgeResult, WhoisError> {
        age::creation_age(self.domain.full(), text, Utc::now())
    }

    /// The domain as given.
    pub fn domain(&self) -> &str {
        self.domain.full()
    }

    pub fn subdomain(&self) -> &str {
        self.domain.subdomain()
    }

    pub fn tld_chain(&self) -> &str {
        self.domain.tld_chain()
    }

    /// Text of the last successful lookup.
    pub fn latest_result(&self) -> Option<&str> {
        self.latest_result.as_deref()
    }

    /// Failures recorded by the most recent query.
    pub fn errors(&self) -> &[WhoisError] {
        &self.errors
    }

    /// The directory entry for this domain's TLD chain.
    pub fn route(&self) -> Option<&RouteEntry> {
        self.directory.route(self.domain.tld_chain())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StaticDirectory;
    use crate::error::ErrorKind;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays canned answers and counts calls.
    struct MockTransport {
        answers: Mutex<VecDeque<Result<Vec<u8>, WhoisError>>>,
        calls: AtomicUsize,
    }

    impl MockTransport {
        fn new(answers: Vec<Result<Vec<u8>, WhoisError>>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn answering(text: &str) -> Arc<Self> {
            Self::new(vec![Ok(text.as_bytes().to_vec()); 4])
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WhoisTransport for MockTransport {
        async fn fetch(&self, _: &DomainName, _: &RouteEntry) -> Result<Vec<u8>, WhoisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(WhoisError::connection("mock", "no more answers")))
        }
    }

    fn directory() -> Arc<StaticDirectory> {
        Arc::new(
            StaticDirectory::from_json_str(
                r#"{
                    "com": ["whois.verisign-grs.com", "No match for"],
                    "ex": ["whois.nic.ex", "MAXCHARS:50"],
                    "za": ["", ""],
                    "sh": ["abc", ""]
                }"#,
            )
            .unwrap(),
        )
    }

    fn lookup(domain: &str, transport: Arc<MockTransport>) -> WhoisLookup {
        WhoisLookup::new(domain, directory())
            .unwrap()
            .with_transport(transport)
    }

    #[test]
    fn test_invalid_syntax_is_fatal() {
        let err = WhoisLookup::new("not a domain", directory()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidDomainSyntax);
    }

    #[test]
    fn test_accessors() {
        let engine = lookup("Example.COM", MockTransport::answering(""));
        assert_eq!(engine.domain(), "Example.COM");
        assert_eq!(engine.subdomain(), "Example");
        assert_eq!(engine.tld_chain(), "COM");
        assert_eq!(engine.route().unwrap().server, "whois.verisign-grs.com");
        assert!(engine.latest_result().is_none());
        assert!(engine.errors().is_empty());
    }

    #[test]
    fn test_is_valid() {
        assert!(lookup("example.com", MockTransport::answering("")).is_valid());
        assert!(!lookup("ab.com", MockTransport::answering("")).is_valid());
        assert!(!lookup("-example.com", MockTransport::answering("")).is_valid());
        // Server name too short
        assert!(!lookup("example.sh", MockTransport::answering("")).is_valid());
        // Not in the directory
        assert!(!lookup("example.org", MockTransport::answering("")).is_valid());
    }

    #[tokio::test]
    async fn test_empty_server_records_one_error() {
        let transport = MockTransport::answering("unused");
        let mut engine = lookup("example.za", transport.clone());

        let err = engine.info().await.unwrap_err();
        assert_eq!(err, WhoisError::no_server("za"));
        assert_eq!(engine.errors().len(), 1);
        assert_eq!(transport.calls(), 0);

        assert_eq!(engine.info_text().await, "No whois server for this tld in list!");
        assert_eq!(engine.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tld_has_no_server() {
        let mut engine = lookup("example.org", MockTransport::answering(""));
        assert_eq!(engine.info().await.unwrap_err().kind(), ErrorKind::NoServerForTld);
    }

    #[tokio::test]
    async fn test_invalid_label_short_circuits() {
        let transport = MockTransport::answering("unused");
        let mut engine = lookup("ab.com", transport.clone());

        let err = engine.info().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DomainNotValidForLookup);
        assert_eq!(err.user_message(), "Domain name isn't valid!");
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_info_normalizes_and_stores() {
        let transport = MockTransport::new(vec![Ok(b"Owner: <M\xfcller & Co>".to_vec())]);
        let mut engine = lookup("example.com", transport);

        let text = engine.info().await.unwrap();
        assert_eq!(text, "Owner: &lt;Müller &amp; Co&gt;");
        assert_eq!(engine.latest_result(), Some(text.as_str()));
        assert!(engine.errors().is_empty());
    }

    #[tokio::test]
    async fn test_errors_reset_per_call() {
        let transport = MockTransport::new(vec![
            Err(WhoisError::connection("whois.verisign-grs.com", "refused")),
            Err(WhoisError::connection("whois.verisign-grs.com", "refused")),
            Ok(b"Domain Name: EXAMPLE.COM".to_vec()),
        ]);
        let mut engine = lookup("example.com", transport);

        assert!(engine.info().await.is_err());
        assert_eq!(engine.errors().len(), 1);
        assert_eq!(engine.info_text().await, "Connection error!");
        assert_eq!(engine.errors().len(), 1);

        assert!(engine.info().await.is_ok());
        assert!(engine.errors().is_empty());
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_result() {
        let transport = MockTransport::new(vec![
            Ok(b"first".to_vec()),
            Err(WhoisError::connection("whois.verisign-grs.com", "reset")),
        ]);
        let mut engine = lookup("example.com", transport);

        engine.info().await.unwrap();
        engine.info().await.unwrap_err();
        assert_eq!(engine.latest_result(), Some("first"));
    }

    #[tokio::test]
    async fn test_html_info() {
        let mut engine = lookup("example.com", MockTransport::answering("a\r\nb\n"));
        assert_eq!(engine.html_info().await.unwrap(), "a<br />\r\nb<br />\n");
    }

    #[tokio::test]
    async fn test_is_available_pattern() {
        let transport = MockTransport::new(vec![
            Ok(b"No match for \"EXAMPLE.COM\".\r\n".to_vec()),
            Ok(b"Domain Name: EXAMPLE.COM\r\nRegistrar: Example".to_vec()),
        ]);
        let mut engine = lookup("example.com", transport.clone());

        assert!(engine.is_available().await.unwrap());
        assert!(!engine.is_available().await.unwrap());
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_is_available_max_chars() {
        let short = format!("example.ex{}", "x".repeat(40));
        let long = format!("example.ex{}", "x".repeat(60));
        let transport = MockTransport::new(vec![Ok(short.into_bytes()), Ok(long.into_bytes())]);
        let mut engine = lookup("example.ex", transport);

        assert!(engine.is_available().await.unwrap());
        assert!(!engine.is_available().await.unwrap());
    }

    #[tokio::test]
    async fn test_is_available_propagates_failure() {
        let mut engine = lookup("example.za", MockTransport::answering(""));
        assert_eq!(
            engine.is_available().await.unwrap_err().kind(),
            ErrorKind::NoServerForTld
        );
    }

    #[tokio::test]
    async fn test_check_age() {
        let mut engine = lookup(
            "example.com",
            MockTransport::answering("Domain Name: EXAMPLE.COM\r\nCreation Date: 1998-08-15T04:00:00Z\r\n"),
        );

        let age = engine.check_age().await.unwrap();
        assert!(age.creation_date.contains("1998-08-15"));
        assert!(age.years >= 26);
        assert!(age.months < 12);
        assert!(engine.errors().is_empty());
    }

    #[tokio::test]
    async fn test_check_age_missing_label() {
        let mut engine = lookup("example.com", MockTransport::answering("Domain Name: EXAMPLE.COM"));

        let err = engine.check_age().await.unwrap_err();
        assert_eq!(err, WhoisError::date_not_found("example.com"));
        assert_eq!(engine.errors(), &[err]);
    }

    #[tokio::test]
    async fn test_check_age_after_failed_info() {
        let transport = MockTransport::new(vec![Err(WhoisError::connection("x", "down"))]);
        let mut engine = lookup("example.com", transport);

        let err = engine.check_age().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionError);
        assert_eq!(engine.errors().len(), 1);
    }

    #[test]
    fn test_derived_queries_on_held_text() {
        let engine = lookup("example.com", MockTransport::answering(""));
        assert!(engine.availability_of("No match for \"EXAMPLE.COM\"."));
        assert!(engine.age_of("Created: 2001-01-01").is_ok());
        assert_eq!(
            engine.age_of("nothing").unwrap_err().kind(),
            ErrorKind::DateFieldNotFound
        );
    }
}
