use super::types::{ClassifiedAlert, LocationContext};
use crate::util::collapse_whitespace;

/// Administrative words removed to produce a bare place-name variant.
const ADMIN_TERMS: [&str; 7] = [
    "city", "county", "province", "region", "state", "district", "area",
];

/// Keywords this short are dropped; they match far too much text.
const MIN_KEYWORD_CHARS: usize = 3;

/// Individual words of a multi-word seed must be longer than this.
const MIN_WORD_CHARS: usize = 4;

fn is_admin_term(word: &str) -> bool {
    ADMIN_TERMS.contains(&word)
}

fn strip_admin_terms(seed: &str) -> String {
    let kept: Vec<&str> = seed
        .split_whitespace()
        .filter(|w| !is_admin_term(w))
        .collect();
    kept.join(" ")
}

fn push_unique(keywords: &mut Vec<String>, keyword: String) {
    if !keywords.contains(&keyword) {
        keywords.push(keyword);
    }
}

/// Derives the lower-cased keywords an alert must mention to be relevant.
///
/// Seeds are the location name and region. Each seed also contributes a
/// variant with administrative words ("county", "region", ...) removed, and,
/// when it has several words, each word of four or more characters. Keywords under three characters are discarded.
pub fn location_keywords(loc: &LocationContext) -> Vec<String> {
    let mut keywords = Vec::new();

    for seed in [&loc.name, &loc.region] {
        let seed = collapse_whitespace(&seed.to_lowercase());
        if seed.is_empty() {
            continue;
        }

        let stripped = strip_admin_terms(&seed);
        if seed.split_whitespace().count() > 1 {
            for word in seed.split_whitespace() {
                if word.chars().count() >= MIN_WORD_CHARS {
                    push_unique(&mut keywords, word.to_string());
                }
            }
        }
        if stripped != seed {
            push_unique(&mut keywords, stripped);
        }
        push_unique(&mut keywords, seed);
    }

    keywords.retain(|k| k.chars().count() >= MIN_KEYWORD_CHARS);
    keywords
}

fn is_relevant(alert: &ClassifiedAlert, keywords: &[String]) -> bool {
    let haystack = format!("{} {}", alert.entry.title, alert.entry.description).to_lowercase();
    keywords.iter().any(|k| haystack.contains(k.as_str()))
}

/// Keeps only alerts whose title or description mentions the location.
///
/// With no location, or no alerts, the input is returned unchanged. An empty
/// result is final: there is no fallback to the unfiltered list.
pub fn filter(alerts: Vec<ClassifiedAlert>, loc: Option<&LocationContext>) -> Vec<ClassifiedAlert> {
    let Some(loc) = loc else {
        return alerts;
    };
    if alerts.is_empty() {
        return alerts;
    }

    let keywords = location_keywords(loc);
    let before = alerts.len();
    let relevant: Vec<ClassifiedAlert> = alerts
        .into_iter()
        .filter(|a| is_relevant(a, &keywords))
        .collect();

    tracing::debug!(
        keywords = ?keywords,
        before = before,
        after = relevant.len(),
        "Filtered alerts by location"
    );

    relevant
}
