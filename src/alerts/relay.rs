use serde::Deserialize;
use url::Url;

/// How a relay wraps the canonical feed URL into its own request URL.
///
/// Relays are tried in list order, so the order of [`default_relays`] is part
/// of the retrieval contract.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelayScheme {
    /// `endpoint?param=<encoded feed url>`
    Query { endpoint: String, param: String },
    /// `endpoint<encoded feed url>`, for relays whose endpoint already ends in `?` or `=`
    Prefix { endpoint: String },
    /// `endpoint/<feed url>`, the feed URL passed through verbatim as a path
    Path { endpoint: String },
}

impl RelayScheme {
    /// Builds the relay request URL for `feed_url`.
    ///
    /// # Errors
    ///
    /// Returns the parse error when the configured endpoint is not a valid URL.
    pub fn wrap(&self, feed_url: &str) -> Result<String, url::ParseError> {
        match self {
            RelayScheme::Query { endpoint, param } => {
                let url = Url::parse_with_params(endpoint, &[(param.as_str(), feed_url)])?;
                Ok(url.into())
            }
            RelayScheme::Prefix { endpoint } => {
                Url::parse(endpoint)?;
                let encoded: String =
                    url::form_urlencoded::byte_serialize(feed_url.as_bytes()).collect();
                Ok(format!("{endpoint}{encoded}"))
            }
            RelayScheme::Path { endpoint } => {
                Url::parse(endpoint)?;
                Ok(format!("{}/{}", endpoint.trim_end_matches('/'), feed_url))
            }
        }
    }
}

/// Built-in relay list, most reliable first.
pub fn default_relays() -> Vec<RelayScheme> {
    vec![
        RelayScheme::Query {
            endpoint: "https://api.allorigins.win/get".to_string(),
            param: "url".to_string(),
        },
        RelayScheme::Query {
            endpoint: "https://api.codetabs.com/v1/proxy".to_string(),
            param: "quest".to_string(),
        },
        RelayScheme::Prefix {
            endpoint: "https://corsproxy.io/?url=".to_string(),
        },
        RelayScheme::Path {
            endpoint: "https://thingproxy.freeboard.io/fetch".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = "https://feeds.meteoalarm.org/feeds/meteoalarm-legacy-rss-germany";

    #[test]
    fn test_query_scheme_encodes_feed_url() {
        let relay = RelayScheme::Query {
            endpoint: "https://api.allorigins.win/get".to_string(),
            param: "url".to_string(),
        };
        assert_eq!(
            relay.wrap(FEED).unwrap(),
            "https://api.allorigins.win/get?url=https%3A%2F%2Ffeeds.meteoalarm.org%2Ffeeds%2Fmeteoalarm-legacy-rss-germany"
        );
    }

    #[test]
    fn test_query_scheme_keeps_existing_params() {
        let relay = RelayScheme::Query {
            endpoint: "https://relay.example.com/get?charset=utf-8".to_string(),
            param: "url".to_string(),
        };
        let wrapped = relay.wrap(FEED).unwrap();
        assert!(wrapped.starts_with("https://relay.example.com/get?charset=utf-8&url="));
    }

    #[test]
    fn test_prefix_scheme_appends_encoded_url() {
        let relay = RelayScheme::Prefix {
            endpoint: "https://corsproxy.io/?url=".to_string(),
        };
        assert_eq!(
            relay.wrap("https://a.example/x?y=1").unwrap(),
            "https://corsproxy.io/?url=https%3A%2F%2Fa.example%2Fx%3Fy%3D1"
        );
    }

    #[test]
    fn test_path_scheme_passes_url_through() {
        let relay = RelayScheme::Path {
            endpoint: "https://thingproxy.freeboard.io/fetch/".to_string(),
        };
        assert_eq!(
            relay.wrap(FEED).unwrap(),
            format!("https://thingproxy.freeboard.io/fetch/{FEED}")
        );
    }

    #[test]
    fn test_invalid_endpoint_is_error() {
        let relay = RelayScheme::Path {
            endpoint: "not a url".to_string(),
        };
        assert!(relay.wrap(FEED).is_err());
    }

    #[test]
    fn test_default_relay_order() {
        let relays = default_relays();
        assert_eq!(relays.len(), 4);
        assert!(matches!(&relays[0], RelayScheme::Query { param, .. } if param == "url"));
        assert!(matches!(&relays[3], RelayScheme::Path { .. }));
    }

    #[test]
    fn test_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            relays: Vec<RelayScheme>,
        }
        let parsed: Wrapper = toml::from_str(
            r#"
[[relays]]
kind = "query"
endpoint = "https://r.example/get"
param = "u"

[[relays]]
kind = "path"
endpoint = "https://p.example/fetch"
"#,
        )
        .unwrap();
        assert_eq!(
            parsed.relays,
            vec![
                RelayScheme::Query {
                    endpoint: "https://r.example/get".to_string(),
                    param: "u".to_string(),
                },
                RelayScheme::Path {
                    endpoint: "https://p.example/fetch".to_string(),
                },
            ]
        );
    }
}
