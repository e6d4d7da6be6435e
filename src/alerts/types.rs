use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::fmt;

// ============================================================================
// Feed Location
// ============================================================================

/// A resolved feed endpoint for one country lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedLocation {
    /// The country string exactly as it was looked up
    pub country_key: String,
    /// Canonical `{base}/{slug}` feed URL
    pub feed_url: String,
}

// ============================================================================
// Alert Records
// ============================================================================

/// One `<item>` element extracted from a feed document, in feed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawAlertEntry {
    pub title: String,
    pub description: String,
    /// `pubDate` text exactly as published; never normalised
    pub published_at: Option<String>,
    pub guid: String,
}

impl RawAlertEntry {
    /// Parses `published_at` as RFC 2822 (RSS) or RFC 3339 (Atom).
    ///
    /// Returns `None` when the date is missing or in neither format. The raw
    /// string stays available either way.
    pub fn published(&self) -> Option<DateTime<FixedOffset>> {
        let raw = self.published_at.as_deref()?.trim();
        DateTime::parse_from_rfc2822(raw)
            .or_else(|_| DateTime::parse_from_rfc3339(raw))
            .ok()
    }
}

/// Alert level inferred from title text. Ordered `Minor < Moderate < Severe < Extreme`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
    Extreme,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Minor => "MINOR",
            Severity::Moderate => "MODERATE",
            Severity::Severe => "SEVERE",
            Severity::Extreme => "EXTREME",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Coarse weather phenomenon inferred from title text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventType {
    Wind,
    Rain,
    SnowIce,
    Thunderstorm,
    Fog,
    Temperature,
    Flood,
    General,
}

impl EventType {
    pub fn label(self) -> &'static str {
        match self {
            EventType::Wind => "Wind",
            EventType::Rain => "Rain",
            EventType::SnowIce => "Snow/Ice",
            EventType::Thunderstorm => "Thunderstorm",
            EventType::Fog => "Fog",
            EventType::Temperature => "Temperature",
            EventType::Flood => "Flood",
            EventType::General => "General",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A [`RawAlertEntry`] with its derived severity and event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedAlert {
    #[serde(flatten)]
    pub entry: RawAlertEntry,
    pub severity: Severity,
    pub event_type: EventType,
}

// ============================================================================
// Location Context
// ============================================================================

/// The caller's place, used to narrow alerts to ones that mention it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocationContext {
    pub name: String,
    pub region: String,
}

impl LocationContext {
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
        }
    }
}

// ============================================================================
// Pipeline Outcome
// ============================================================================

/// Terminal result of one alert pipeline run.
///
/// `Alerts` always carries at least one alert. Build it through
/// [`PipelineOutcome::from_alerts`], which folds an empty list into `NoAlerts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "alerts", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Alerts(Vec<ClassifiedAlert>),
    NoAlerts,
    TemporarilyUnavailable,
}

impl PipelineOutcome {
    pub fn from_alerts(alerts: Vec<ClassifiedAlert>) -> Self {
        if alerts.is_empty() {
            PipelineOutcome::NoAlerts
        } else {
            PipelineOutcome::Alerts(alerts)
        }
    }

    pub fn alerts(&self) -> &[ClassifiedAlert] {
        match self {
            PipelineOutcome::Alerts(alerts) => alerts,
            PipelineOutcome::NoAlerts | PipelineOutcome::TemporarilyUnavailable => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.alerts().len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts().is_empty()
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.alerts().iter().map(|a| a.severity).max()
    }

    /// Short machine-friendly name used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineOutcome::Alerts(_) => "alerts",
            PipelineOutcome::NoAlerts => "no_alerts",
            PipelineOutcome::TemporarilyUnavailable => "temporarily_unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(title: &str, severity: Severity) -> ClassifiedAlert {
        ClassifiedAlert {
            entry: RawAlertEntry {
                title: title.to_string(),
                description: String::new(),
                published_at: None,
                guid: title.to_string(),
            },
            severity,
            event_type: EventType::General,
        }
    }

    #[test]
    fn test_from_alerts_empty_is_no_alerts() {
        assert_eq!(PipelineOutcome::from_alerts(Vec::new()), PipelineOutcome::NoAlerts);
    }

    #[test]
    fn test_from_alerts_keeps_list() {
        let outcome = PipelineOutcome::from_alerts(vec![alert("a", Severity::Minor)]);
        assert_eq!(outcome.len(), 1);
        assert_eq!(outcome.label(), "alerts");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Extreme > Severity::Severe);
        assert!(Severity::Severe > Severity::Moderate);
        assert!(Severity::Moderate > Severity::Minor);
    }

    #[test]
    fn test_highest_severity() {
        let outcome = PipelineOutcome::from_alerts(vec![
            alert("a", Severity::Minor),
            alert("b", Severity::Severe),
            alert("c", Severity::Moderate),
        ]);
        assert_eq!(outcome.highest_severity(), Some(Severity::Severe));
        assert_eq!(PipelineOutcome::NoAlerts.highest_severity(), None);
    }

    #[test]
    fn test_published_rfc2822() {
        let mut entry = alert("a", Severity::Minor).entry;
        entry.published_at = Some("Tue, 14 Oct 2025 06:00:00 +0200".to_string());
        let parsed = entry.published().unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-10-14T06:00:00+02:00");
    }

    #[test]
    fn test_published_rfc3339() {
        let mut entry = alert("a", Severity::Minor).entry;
        entry.published_at = Some("2025-10-14T06:00:00Z".to_string());
        assert!(entry.published().is_some());
    }

    #[test]
    fn test_published_garbage_is_none() {
        let mut entry = alert("a", Severity::Minor).entry;
        entry.published_at = Some("yesterday-ish".to_string());
        assert!(entry.published().is_none());
        assert_eq!(entry.published_at.as_deref(), Some("yesterday-ish"));
    }

    #[test]
    fn test_outcome_json_shape() {
        let json = serde_json::to_value(PipelineOutcome::NoAlerts).unwrap();
        assert_eq!(json["status"], "no_alerts");

        let json = serde_json::to_value(PipelineOutcome::from_alerts(vec![alert(
            "Red Wind",
            Severity::Extreme,
        )]))
        .unwrap();
        assert_eq!(json["status"], "alerts");
        assert_eq!(json["alerts"][0]["title"], "Red Wind");
        assert_eq!(json["alerts"][0]["severity"], "Extreme");
    }
}
