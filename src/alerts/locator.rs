use super::types::FeedLocation;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Base URL every feed slug is appended to.
pub const DEFAULT_FEED_BASE: &str = "https://feeds.meteoalarm.org/feeds";

/// Continental feed used when a country has no dedicated slug.
pub const DEFAULT_FEED_SLUG: &str = "meteoalarm-legacy-rss-europe";

/// Country names as reported by upstream weather lookups, mapped to feed slugs.
const COUNTRY_FEEDS: &[(&str, &str)] = &[
    ("Austria", "meteoalarm-legacy-rss-austria"),
    ("Belgium", "meteoalarm-legacy-rss-belgium"),
    ("Bosnia and Herzegovina", "meteoalarm-legacy-rss-bosnia-herzegovina"),
    ("Bulgaria", "meteoalarm-legacy-rss-bulgaria"),
    ("Croatia", "meteoalarm-legacy-rss-croatia"),
    ("Cyprus", "meteoalarm-legacy-rss-cyprus"),
    ("Czech Republic", "meteoalarm-legacy-rss-czechia"),
    ("Czechia", "meteoalarm-legacy-rss-czechia"),
    ("Denmark", "meteoalarm-legacy-rss-denmark"),
    ("Estonia", "meteoalarm-legacy-rss-estonia"),
    ("Finland", "meteoalarm-legacy-rss-finland"),
    ("France", "meteoalarm-legacy-rss-france"),
    ("Germany", "meteoalarm-legacy-rss-germany"),
    ("Greece", "meteoalarm-legacy-rss-greece"),
    ("Hungary", "meteoalarm-legacy-rss-hungary"),
    ("Iceland", "meteoalarm-legacy-rss-iceland"),
    ("Ireland", "meteoalarm-legacy-rss-ireland"),
    ("Israel", "meteoalarm-legacy-rss-israel"),
    ("Italy", "meteoalarm-legacy-rss-italy"),
    ("Latvia", "meteoalarm-legacy-rss-latvia"),
    ("Lithuania", "meteoalarm-legacy-rss-lithuania"),
    ("Luxembourg", "meteoalarm-legacy-rss-luxembourg"),
    ("Malta", "meteoalarm-legacy-rss-malta"),
    ("Moldova", "meteoalarm-legacy-rss-moldova"),
    ("Montenegro", "meteoalarm-legacy-rss-montenegro"),
    ("Netherlands", "meteoalarm-legacy-rss-netherlands"),
    ("North Macedonia", "meteoalarm-legacy-rss-republic-of-north-macedonia"),
    ("Norway", "meteoalarm-legacy-rss-norway"),
    ("Poland", "meteoalarm-legacy-rss-poland"),
    ("Portugal", "meteoalarm-legacy-rss-portugal"),
    ("Romania", "meteoalarm-legacy-rss-romania"),
    ("Serbia", "meteoalarm-legacy-rss-serbia"),
    ("Slovakia", "meteoalarm-legacy-rss-slovakia"),
    ("Slovenia", "meteoalarm-legacy-rss-slovenia"),
    ("Spain", "meteoalarm-legacy-rss-spain"),
    ("Sweden", "meteoalarm-legacy-rss-sweden"),
    ("Switzerland", "meteoalarm-legacy-rss-switzerland"),
    ("Ukraine", "meteoalarm-legacy-rss-ukraine"),
    ("United Kingdom", "meteoalarm-legacy-rss-united-kingdom"),
];

static COUNTRY_TABLE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

fn country_table() -> &'static HashMap<&'static str, &'static str> {
    COUNTRY_TABLE.get_or_init(|| COUNTRY_FEEDS.iter().copied().collect())
}

/// Looks up the feed slug for an exact country name.
pub fn slug_for(country: &str) -> Option<&'static str> {
    country_table().get(country).copied()
}

/// Every country name with a dedicated feed, in table order.
pub fn known_countries() -> impl Iterator<Item = &'static str> {
    COUNTRY_FEEDS.iter().map(|(country, _)| *country)
}

/// Resolves a country to its feed using the built-in base URL.
///
/// Never fails: unknown countries get the continental feed.
pub fn locate(country: &str) -> FeedLocation {
    FeedLocator::default().locate(country)
}

/// Maps country names to feed URLs under a configurable base.
#[derive(Debug, Clone)]
pub struct FeedLocator {
    base_url: String,
    default_slug: String,
}

impl Default for FeedLocator {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_BASE, DEFAULT_FEED_SLUG)
    }
}

impl FeedLocator {
    pub fn new(base_url: impl Into<String>, default_slug: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_slug: default_slug.into(),
        }
    }

    pub fn locate(&self, country: &str) -> FeedLocation {
        let slug = slug_for(country).unwrap_or(&self.default_slug);
        FeedLocation {
            country_key: country.to_string(),
            feed_url: format!("{}/{}", self.base_url, slug),
        }
    }
}
