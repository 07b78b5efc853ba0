//! Data models for visitor statistics

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel country code used when geolocation could not be determined
pub const UNKNOWN_COUNTRY_CODE: &str = "XX";

/// Display name paired with the sentinel code
pub const UNKNOWN_COUNTRY_NAME: &str = "Unknown";

/// Placeholder flag for the sentinel code
pub const GLOBE_FLAG: &str = "\u{1F30D}";

/// Per-country slice of the aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryEntry {
    /// Country display name ("Unknown" permitted)
    pub name: String,

    /// Flag emoji or placeholder symbol
    pub flag: String,

    /// Number of visits recorded for this country
    pub count: u64,
}

/// The combined visitor count plus per-country breakdown.
///
/// This is the single durable record the whole service revolves around.
/// It is created lazily (a missing record reads as all zeros) and mutated
/// only through [`VisitorAggregate::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorAggregate {
    pub total_visitors: u64,
    pub countries: BTreeMap<String, CountryEntry>,
}

/// One recorded visit, as posted by the client. Every field is optional;
/// anything missing degrades to the unknown sentinel instead of being
/// rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisitEvent {
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub flag: Option<String>,
}

impl VisitEvent {
    /// Build an event from already-resolved country details.
    pub fn new(country: &str, country_code: &str, flag: &str) -> Self {
        Self {
            country: Some(country.to_string()),
            country_code: Some(country_code.to_string()),
            flag: Some(flag.to_string()),
        }
    }

    /// Normalized country code, falling back to the sentinel.
    pub fn code(&self) -> String {
        match self.country_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => UNKNOWN_COUNTRY_CODE.to_string(),
        }
    }

    fn name(&self) -> String {
        match self.country.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => UNKNOWN_COUNTRY_NAME.to_string(),
        }
    }

    fn flag_symbol(&self) -> String {
        match self.flag.as_deref().map(str::trim) {
            Some(flag) if !flag.is_empty() => flag.to_string(),
            _ => country_flag(&self.code()),
        }
    }
}

impl VisitorAggregate {
    /// Merge one visit into the aggregate.
    ///
    /// Increments the total, inserts a zeroed entry the first time a
    /// country code is seen (first-seen name and flag win; later events
    /// with a different name or flag for the same code only bump the
    /// count), then increments that country's count.
    pub fn apply(&mut self, event: &VisitEvent) {
        self.total_visitors += 1;

        let entry = self
            .countries
            .entry(event.code())
            .or_insert_with(|| CountryEntry {
                name: event.name(),
                flag: event.flag_symbol(),
                count: 0,
            });
        entry.count += 1;
    }

    /// Sum of the per-country counts.
    pub fn country_total(&self) -> u64 {
        self.countries.values().map(|c| c.count).sum()
    }

    /// Whether the total matches the per-country sum. The merge keeps the
    /// two aligned by construction; this exists so tests can assert it
    /// rather than assume it.
    pub fn is_consistent(&self) -> bool {
        self.total_visitors == self.country_total()
    }
}

/// Convert a two-letter country code into its flag emoji, i.e. the two
/// matching Unicode regional-indicator symbols. The sentinel code, or
/// anything that is not two ASCII letters, maps to the globe placeholder.
pub fn country_flag(country_code: &str) -> String {
    let code = country_code.trim().to_ascii_uppercase();
    if code == UNKNOWN_COUNTRY_CODE
        || code.len() != 2
        || !code.bytes().all(|b| b.is_ascii_uppercase())
    {
        return GLOBE_FLAG.to_string();
    }

    code.bytes()
        .filter_map(|b| char::from_u32(0x1F1E6 + (b - b'A') as u32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_for_us() {
        assert_eq!(country_flag("US"), "\u{1F1FA}\u{1F1F8}");
    }

    #[test]
    fn flag_is_case_insensitive() {
        assert_eq!(country_flag("de"), country_flag("DE"));
    }

    #[test]
    fn sentinel_and_garbage_map_to_globe() {
        assert_eq!(country_flag(UNKNOWN_COUNTRY_CODE), GLOBE_FLAG);
        assert_eq!(country_flag(""), GLOBE_FLAG);
        assert_eq!(country_flag("USA"), GLOBE_FLAG);
        assert_eq!(country_flag("1A"), GLOBE_FLAG);
    }

    #[test]
    fn apply_inserts_then_increments() {
        let mut stats = VisitorAggregate::default();
        stats.apply(&VisitEvent::new("Canada", "CA", "\u{1F1E8}\u{1F1E6}"));
        stats.apply(&VisitEvent::new("Canada", "CA", "\u{1F1E8}\u{1F1E6}"));

        assert_eq!(stats.total_visitors, 2);
        assert_eq!(stats.countries["CA"].count, 2);
        assert_eq!(stats.countries["CA"].name, "Canada");
        assert!(stats.is_consistent());
    }

    #[test]
    fn first_seen_name_and_flag_win() {
        let mut stats = VisitorAggregate::default();
        stats.apply(&VisitEvent::new("Germany", "DE", "\u{1F1E9}\u{1F1EA}"));
        stats.apply(&VisitEvent::new("Deutschland", "DE", "?"));

        assert_eq!(stats.countries["DE"].name, "Germany");
        assert_eq!(stats.countries["DE"].flag, "\u{1F1E9}\u{1F1EA}");
        assert_eq!(stats.countries["DE"].count, 2);
    }

    #[test]
    fn missing_fields_degrade_to_sentinel() {
        let mut stats = VisitorAggregate::default();
        stats.apply(&VisitEvent::default());

        let entry = &stats.countries[UNKNOWN_COUNTRY_CODE];
        assert_eq!(entry.name, UNKNOWN_COUNTRY_NAME);
        assert_eq!(entry.flag, GLOBE_FLAG);
        assert_eq!(entry.count, 1);
    }

    #[test]
    fn wire_shape_is_camel_case() {
        let mut stats = VisitorAggregate::default();
        stats.apply(&VisitEvent::new("Japan", "JP", "\u{1F1EF}\u{1F1F5}"));

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalVisitors"], 1);
        assert_eq!(json["countries"]["JP"]["name"], "Japan");
        assert_eq!(json["countries"]["JP"]["count"], 1);
    }

    #[test]
    fn event_parses_from_post_body() {
        let event: VisitEvent =
            serde_json::from_str(r#"{"country":"France","countryCode":"FR","flag":"x"}"#).unwrap();
        assert_eq!(event.code(), "FR");

        // unrecognized shape still parses field-wise
        let event: VisitEvent = serde_json::from_str("{}").unwrap();
        assert_eq!(event.code(), UNKNOWN_COUNTRY_CODE);
    }
}
