use super::types::{ClassifiedAlert, EventType, RawAlertEntry, Severity};

/// Severity keywords in priority order; the first group with a hit wins.
const SEVERITY_RULES: &[(&[&str], Severity)] = &[
    (&["red", "extreme"], Severity::Extreme),
    (&["orange", "severe"], Severity::Severe),
    (&["yellow", "moderate"], Severity::Moderate),
    (&["green", "minor"], Severity::Minor),
];

/// Event keywords in priority order; the first group with a hit wins.
const EVENT_RULES: &[(&[&str], EventType)] = &[
    (&["wind"], EventType::Wind),
    (&["rain", "precipitation"], EventType::Rain),
    (&["snow", "ice"], EventType::SnowIce),
    (&["thunder", "storm"], EventType::Thunderstorm),
    (&["fog"], EventType::Fog),
    (&["heat", "temperature"], EventType::Temperature),
    (&["flood"], EventType::Flood),
];

fn first_match<T: Copy>(haystack: &str, rules: &[(&[&str], T)]) -> Option<T> {
    rules
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(_, value)| *value)
}

/// Severity from a title, case-insensitive. Defaults to `Moderate`.
pub fn severity_of(title: &str) -> Severity {
    first_match(&title.to_lowercase(), SEVERITY_RULES).unwrap_or(Severity::Moderate)
}

/// Event type from a title, case-insensitive. Defaults to `General`.
pub fn event_type_of(title: &str) -> EventType {
    first_match(&title.to_lowercase(), EVENT_RULES).unwrap_or(EventType::General)
}

/// Derives severity and event type from the entry's title. Never fails.
pub fn classify(entry: RawAlertEntry) -> ClassifiedAlert {
    ClassifiedAlert {
        severity: severity_of(&entry.title),
        event_type: event_type_of(&entry.title),
        entry,
    }
}
