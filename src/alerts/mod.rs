//! Weather alert acquisition and normalisation.
//!
//! One pipeline run turns a country name (and optionally the caller's place)
//! into a [`PipelineOutcome`]:
//!
//! - [`locator`] maps the country to a feed URL
//! - [`relay`] wraps that URL for each third-party relay
//! - [`fetcher`] tries the relays in order, then the feed directly
//! - [`decoder`] unwraps JSON envelopes, data URIs and base64 into XML
//! - [`parser`] extracts up to ten `<item>` entries
//! - [`classify`] infers severity and event type from each title
//! - [`filter`] keeps the alerts that mention the caller's place
//!
//! Every failure is absorbed into the outcome: `Alerts` (never empty),
//! `NoAlerts` (confirmed nothing to show) or `TemporarilyUnavailable`
//! (could not check).
//!
//! # Example
//!
//! ```ignore
//! use skywarn::alerts::{AlertFetcher, LocationContext};
//!
//! let fetcher = AlertFetcher::from_config(&config)?;
//! let here = LocationContext::new("Paris", "Ile-de-France");
//! let outcome = fetcher.fetch_alerts("France", Some(&here)).await;
//! ```

pub mod classify;
pub mod decoder;
pub mod fetcher;
pub mod filter;
pub mod locator;
pub mod parser;
pub mod relay;
mod types;

pub use classify::classify;
pub use decoder::{decode, DecodeError, DecodedDocument};
pub use fetcher::{AlertFetcher, FeedTransport, FetchError, HttpTransport};
pub use filter::filter;
pub use locator::{known_countries, locate, FeedLocator, DEFAULT_FEED_BASE, DEFAULT_FEED_SLUG};
pub use parser::{parse, ParseError, MAX_ALERTS};
pub use relay::{default_relays, RelayScheme};
pub use types::{
    ClassifiedAlert, EventType, FeedLocation, LocationContext, PipelineOutcome, RawAlertEntry,
    Severity,
};
