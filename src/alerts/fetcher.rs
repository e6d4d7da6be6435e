use super::classify::classify;
use super::decoder;
use super::filter::filter;
use super::locator::FeedLocator;
use super::parser::{self, MAX_ALERTS};
use super::relay::RelayScheme;
use super::types::{ClassifiedAlert, LocationContext, PipelineOutcome};
use crate::config::Config;
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors from a single retrieval attempt. Every one of them is a soft
/// failure until the last attempt in the plan has been tried.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Request timed out")]
    Timeout,
    #[error("Response too large")]
    ResponseTooLarge,
    /// A relay endpoint could not be turned into a request URL
    #[error("Invalid relay URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Fetches a URL and returns the raw body of a successful response.
///
/// This is the seam between the retrieval plan and the network; tests swap in
/// scripted transports.
pub trait FeedTransport {
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// `reqwest`-backed transport with an optional per-attempt timeout and a body size cap.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Option<Duration>,
    max_bytes: usize,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, timeout: Option<Duration>, max_bytes: usize) -> Self {
        Self {
            client,
            timeout,
            max_bytes,
        }
    }

    async fn fetch_body(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, self.max_bytes).await
    }
}

impl FeedTransport for HttpTransport {
    /// The timeout covers the whole attempt: headers and body together.
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.fetch_body(url))
                .await
                .map_err(|_| FetchError::Timeout)?,
            None => self.fetch_body(url).await,
        }
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

/// Where one retrieval attempt goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptSource {
    /// Index into the configured relay list
    Relay(usize),
    Direct,
}

/// One step of the retrieval plan: relays in order, then the feed itself.
#[derive(Debug)]
pub struct Attempt {
    pub source: AttemptSource,
    pub url: Result<String, url::ParseError>,
}

fn direct_attempt(feed_url: &str) -> Attempt {
    Attempt {
        source: AttemptSource::Direct,
        url: Ok(feed_url.to_string()),
    }
}

/// Runs the alert pipeline: locate, retrieve through relays, decode, parse,
/// classify, filter.
///
/// Runs are independent. Nothing is shared or cached between calls, and
/// overlapping calls are not coalesced.
#[derive(Debug, Clone)]
pub struct AlertFetcher<T = HttpTransport> {
    transport: T,
    locator: FeedLocator,
    relays: Vec<RelayScheme>,
    max_alerts: usize,
}

impl AlertFetcher<HttpTransport> {
    /// Builds an HTTP-backed fetcher from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Network`] if the HTTP client cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;
        let transport = HttpTransport::new(
            client,
            config.request_timeout(),
            config.max_response_bytes,
        );
        Ok(Self::with_transport(
            transport,
            FeedLocator::new(config.feed_base_url.as_str(), config.default_slug.as_str()),
            config.relays.clone(),
            config.max_alerts,
        ))
    }
}

impl<T: FeedTransport> AlertFetcher<T> {
    /// `max_alerts` is clamped to `1..=10`.
    pub fn with_transport(
        transport: T,
        locator: FeedLocator,
        relays: Vec<RelayScheme>,
        max_alerts: usize,
    ) -> Self {
        Self {
            transport,
            locator,
            relays,
            max_alerts: max_alerts.clamp(1, MAX_ALERTS),
        }
    }

    /// The ordered attempts made for `feed_url`: every relay, then a direct fetch.
    pub fn attempt_plan(&self, feed_url: &str) -> Vec<Attempt> {
        self.relay_attempts(feed_url)
            .chain(std::iter::once(direct_attempt(feed_url)))
            .collect()
    }

    fn relay_attempts<'a>(&'a self, feed_url: &'a str) -> impl Iterator<Item = Attempt> + 'a {
        self.relays
            .iter()
            .enumerate()
            .map(move |(index, relay)| Attempt {
                source: AttemptSource::Relay(index),
                url: relay.wrap(feed_url),
            })
    }

    async fn try_attempt(&self, attempt: &Attempt) -> Result<Vec<u8>, FetchError> {
        let result = match &attempt.url {
            Ok(url) => self.transport.get(url).await,
            Err(e) => Err(FetchError::InvalidUrl(*e)),
        };

        if let Err(e) = &result {
            tracing::warn!(
                source = ?attempt.source,
                url = attempt.url.as_deref().unwrap_or("<invalid>"),
                error = %e,
                "Alert feed attempt failed"
            );
        }
        result
    }

    /// Tries each relay in order, then the feed itself, and returns the first
    /// successful body.
    ///
    /// # Errors
    ///
    /// Returns the direct attempt's error when every attempt fails.
    async fn retrieve(&self, feed_url: &str) -> Result<(AttemptSource, Vec<u8>), FetchError> {
        for attempt in self.relay_attempts(feed_url) {
            if let Ok(body) = self.try_attempt(&attempt).await {
                return Ok((attempt.source, body));
            }
        }

        tracing::info!(feed = %feed_url, "All relays failed, trying direct fetch");
        let direct = direct_attempt(feed_url);
        let body = self.try_attempt(&direct).await?;
        Ok((direct.source, body))
    }

    /// Fetches, classifies and filters the active alerts for a country.
    ///
    /// Never fails: every error is logged and mapped to
    /// [`PipelineOutcome::TemporarilyUnavailable`], while a valid feed with no
    /// relevant alerts (or an empty body) maps to [`PipelineOutcome::NoAlerts`].
    pub async fn fetch_alerts(
        &self,
        country: &str,
        location: Option<&LocationContext>,
    ) -> PipelineOutcome {
        let outcome = self.run(country, location).await;
        tracing::info!(
            country = %country,
            outcome = outcome.label(),
            count = outcome.len(),
            "Alert pipeline finished"
        );
        outcome
    }

    async fn run(&self, country: &str, location: Option<&LocationContext>) -> PipelineOutcome {
        let feed = self.locator.locate(country);

        let (source, body) = match self.retrieve(&feed.feed_url).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(feed = %feed.feed_url, error = %e, "Alert feed unreachable");
                return PipelineOutcome::TemporarilyUnavailable;
            }
        };
        tracing::debug!(source = ?source, bytes = body.len(), "Retrieved alert feed");

        let doc = match decoder::decode(&body) {
            Ok(doc) => doc,
            Err(e) if e.is_empty() => {
                tracing::info!(source = ?source, "Alert feed body is empty");
                return PipelineOutcome::NoAlerts;
            }
            Err(e) => {
                tracing::warn!(source = ?source, error = %e, "Could not decode alert feed");
                return PipelineOutcome::TemporarilyUnavailable;
            }
        };

        let entries = match parser::parse(&doc, self.max_alerts) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(source = ?source, error = %e, "Could not parse alert feed");
                return PipelineOutcome::TemporarilyUnavailable;
            }
        };

        if entries.is_empty() {
            return PipelineOutcome::NoAlerts;
        }

        let classified: Vec<ClassifiedAlert> = entries.into_iter().map(classify).collect();
        PipelineOutcome::from_alerts(filter(classified, location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::types::{EventType, Severity};
    use base64::Engine;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const BASE: &str = "https://feeds.test";
    const GERMANY_FEED: &str = "https://feeds.test/meteoalarm-legacy-rss-germany";
    const FRANCE_FEED: &str = "https://feeds.test/meteoalarm-legacy-rss-france";

    /// Answers from a fixed url -> body table; other URLs fail with their
    /// scripted status, or 503.
    #[derive(Default)]
    struct ScriptedTransport {
        responses: HashMap<String, Vec<u8>>,
        statuses: HashMap<String, u16>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn respond(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
            self.responses.insert(url.to_string(), body.into());
            self
        }

        fn fail(mut self, url: &str, status: u16) -> Self {
            self.statuses.insert(url.to_string(), status);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl FeedTransport for ScriptedTransport {
        async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.responses.get(url) {
                Some(body) => Ok(body.clone()),
                None => Err(FetchError::HttpStatus(
                    self.statuses.get(url).copied().unwrap_or(503),
                )),
            }
        }
    }

    fn relays() -> Vec<RelayScheme> {
        vec![
            RelayScheme::Path {
                endpoint: "https://relay-one.test".to_string(),
            },
            RelayScheme::Path {
                endpoint: "https://relay-two.test".to_string(),
            },
            RelayScheme::Path {
                endpoint: "https://relay-three.test".to_string(),
            },
        ]
    }

    fn relay_url(n: &str, feed: &str) -> String {
        format!("https://relay-{n}.test/{feed}")
    }

    fn fetcher(transport: ScriptedTransport) -> AlertFetcher<ScriptedTransport> {
        AlertFetcher::with_transport(
            transport,
            FeedLocator::new(BASE, "meteoalarm-legacy-rss-europe"),
            relays(),
            MAX_ALERTS,
        )
    }

    fn rss(items: &str) -> String {
        format!("<rss version=\"2.0\"><channel><title>X</title>{items}</channel></rss>")
    }

    fn paris_feed() -> String {
        rss("<item><title>Red Wind Warning - Paris</title><guid>1</guid></item>\
             <item><title>Yellow Rain Warning - Lyon</title><guid>2</guid></item>\
             <item><title>Orange Snow Warning - Grenoble</title><guid>3</guid></item>")
    }

    #[tokio::test]
    async fn test_attempt_plan_order() {
        let f = fetcher(ScriptedTransport::default());
        let plan = f.attempt_plan(GERMANY_FEED);
        let sources: Vec<AttemptSource> = plan.iter().map(|a| a.source.clone()).collect();
        assert_eq!(
            sources,
            vec![
                AttemptSource::Relay(0),
                AttemptSource::Relay(1),
                AttemptSource::Relay(2),
                AttemptSource::Direct,
            ]
        );
        assert_eq!(plan[3].url.as_deref(), Ok(GERMANY_FEED));
    }

    #[tokio::test]
    async fn test_everything_fails_is_unavailable() {
        let f = fetcher(ScriptedTransport::default());
        assert_eq!(
            f.fetch_alerts("Germany", None).await,
            PipelineOutcome::TemporarilyUnavailable
        );
        assert_eq!(
            f.transport.calls(),
            vec![
                relay_url("one", GERMANY_FEED),
                relay_url("two", GERMANY_FEED),
                relay_url("three", GERMANY_FEED),
                GERMANY_FEED.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_retrieve_reports_direct_error() {
        let f = fetcher(
            ScriptedTransport::default()
                .fail(&relay_url("one", GERMANY_FEED), 502)
                .fail(GERMANY_FEED, 404),
        );
        let err = f.retrieve(GERMANY_FEED).await.unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus(404)));
    }

    #[tokio::test]
    async fn test_relay_envelope_with_blank_contents_is_unavailable() {
        let body = r#"{"contents":"","status":{"http_code":404}}"#;
        let f = fetcher(ScriptedTransport::default().respond(&relay_url("one", GERMANY_FEED), body));
        assert_eq!(
            f.fetch_alerts("Germany", None).await,
            PipelineOutcome::TemporarilyUnavailable
        );
        assert_eq!(f.transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_first_relay_envelope_with_empty_channel_is_no_alerts() {
        let body = serde_json::json!({ "contents": rss("") }).to_string();
        let f = fetcher(ScriptedTransport::default().respond(&relay_url("one", GERMANY_FEED), body));
        assert_eq!(f.fetch_alerts("Germany", None).await, PipelineOutcome::NoAlerts);
        assert_eq!(f.transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_stops_at_first_successful_relay() {
        let f = fetcher(
            ScriptedTransport::default()
                .respond(&relay_url("two", GERMANY_FEED), rss("<item><title>Red Wind</title></item>"))
                .respond(&relay_url("three", GERMANY_FEED), rss("")),
        );
        let outcome = f.fetch_alerts("Germany", None).await;
        assert_eq!(outcome.len(), 1);
        assert_eq!(f.transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_success_with_bad_body_does_not_try_next_relay() {
        let f = fetcher(
            ScriptedTransport::default()
                .respond(&relay_url("one", GERMANY_FEED), "Service error")
                .respond(&relay_url("two", GERMANY_FEED), rss("<item><title>Red Wind</title></item>")),
        );
        assert_eq!(
            f.fetch_alerts("Germany", None).await,
            PipelineOutcome::TemporarilyUnavailable
        );
        assert_eq!(f.transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_direct_fetch_fallback() {
        let f = fetcher(
            ScriptedTransport::default()
                .respond(GERMANY_FEED, rss("<item><title>Yellow Fog - Hamburg</title></item>")),
        );
        let outcome = f.fetch_alerts("Germany", None).await;
        let alerts = outcome.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Moderate);
        assert_eq!(alerts[0].event_type, EventType::Fog);
        assert_eq!(f.transport.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_location_filter_scenario() {
        let location = LocationContext::new("Paris", "Ile-de-France");
        let f = fetcher(ScriptedTransport::default().respond(&relay_url("one", FRANCE_FEED), paris_feed()));

        let outcome = f.fetch_alerts("France", Some(&location)).await;
        let alerts = outcome.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].entry.title, "Red Wind Warning - Paris");
        assert_eq!(alerts[0].severity, Severity::Extreme);
        assert_eq!(alerts[0].event_type, EventType::Wind);
    }

    #[tokio::test]
    async fn test_without_location_all_classified() {
        let f = fetcher(ScriptedTransport::default().respond(&relay_url("one", FRANCE_FEED), paris_feed()));
        let outcome = f.fetch_alerts("France", None).await;
        let severities: Vec<Severity> = outcome.alerts().iter().map(|a| a.severity).collect();
        assert_eq!(
            severities,
            vec![Severity::Extreme, Severity::Moderate, Severity::Severe]
        );
    }

    #[tokio::test]
    async fn test_everything_filtered_out_is_no_alerts() {
        let location = LocationContext::new("Brest", "Bretagne");
        let f = fetcher(ScriptedTransport::default().respond(&relay_url("one", FRANCE_FEED), paris_feed()));
        assert_eq!(
            f.fetch_alerts("France", Some(&location)).await,
            PipelineOutcome::NoAlerts
        );
    }

    #[tokio::test]
    async fn test_empty_body_is_no_alerts() {
        let f = fetcher(ScriptedTransport::default().respond(&relay_url("one", GERMANY_FEED), "  \n"));
        assert_eq!(f.fetch_alerts("Germany", None).await, PipelineOutcome::NoAlerts);
    }

    #[tokio::test]
    async fn test_malformed_xml_is_unavailable() {
        let f = fetcher(
            ScriptedTransport::default().respond(&relay_url("one", GERMANY_FEED), "<rss><channel></rss>"),
        );
        assert_eq!(
            f.fetch_alerts("Germany", None).await,
            PipelineOutcome::TemporarilyUnavailable
        );
    }

    #[tokio::test]
    async fn test_html_page_is_unavailable() {
        let f = fetcher(ScriptedTransport::default().respond(
            &relay_url("one", GERMANY_FEED),
            "<html><body>Too many requests</body></html>",
        ));
        assert_eq!(
            f.fetch_alerts("Germany", None).await,
            PipelineOutcome::TemporarilyUnavailable
        );
    }

    #[tokio::test]
    async fn test_base64_relay_body() {
        let body = base64::engine::general_purpose::STANDARD
            .encode(rss("<item><title>Orange Thunderstorm</title></item>"));
        let f = fetcher(ScriptedTransport::default().respond(&relay_url("one", GERMANY_FEED), body));
        let outcome = f.fetch_alerts("Germany", None).await;
        assert_eq!(outcome.alerts()[0].event_type, EventType::Thunderstorm);
    }

    #[tokio::test]
    async fn test_unknown_country_uses_default_feed() {
        let default_feed = format!("{BASE}/meteoalarm-legacy-rss-europe");
        let f = fetcher(ScriptedTransport::default().respond(&default_feed, rss("")));
        assert_eq!(f.fetch_alerts("Narnia", None).await, PipelineOutcome::NoAlerts);
        assert_eq!(f.transport.calls().last(), Some(&default_feed));
    }

    #[tokio::test]
    async fn test_invalid_relay_endpoint_is_skipped() {
        let transport = ScriptedTransport::default().respond(GERMANY_FEED, rss(""));
        let f = AlertFetcher::with_transport(
            transport,
            FeedLocator::new(BASE, "meteoalarm-legacy-rss-europe"),
            vec![RelayScheme::Path {
                endpoint: "::not a url::".to_string(),
            }],
            MAX_ALERTS,
        );
        assert_eq!(f.fetch_alerts("Germany", None).await, PipelineOutcome::NoAlerts);
        assert_eq!(f.transport.calls(), vec![GERMANY_FEED.to_string()]);
    }

    #[tokio::test]
    async fn test_max_alerts_clamped() {
        let items: String = (0..20)
            .map(|i| format!("<item><title>Yellow Rain {i}</title></item>"))
            .collect();
        let transport = ScriptedTransport::default().respond(GERMANY_FEED, rss(&items));
        let f = AlertFetcher::with_transport(
            transport,
            FeedLocator::new(BASE, "meteoalarm-legacy-rss-europe"),
            Vec::new(),
            500,
        );
        assert_eq!(f.fetch_alerts("Germany", None).await.len(), MAX_ALERTS);
    }
}
