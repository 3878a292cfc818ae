use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ServiceError;

/// Source tag of events produced by the public holiday feed.
pub const PUBLIC_HOLIDAY_SOURCE: &str = "public_holidays";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Holiday,
    Festival,
    Sports,
    Academic,
    Examination,
    Meeting,
    Event,
    Deadline,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Holiday => "holiday",
            EventCategory::Festival => "festival",
            EventCategory::Sports => "sports",
            EventCategory::Academic => "academic",
            EventCategory::Examination => "examination",
            EventCategory::Meeting => "meeting",
            EventCategory::Event => "event",
            EventCategory::Deadline => "deadline",
        }
    }

    /// Category of a calendar-feed event, decided by keywords in its title.
    pub fn from_title(title: &str) -> Self {
        let title = title.to_lowercase();
        let has_any = |words: &[&str]| words.iter().any(|w| title.contains(w));
        if has_any(&["festival", "fiesta"]) {
            EventCategory::Festival
        } else if has_any(&["sports", "race", "regatta"]) {
            EventCategory::Sports
        } else {
            EventCategory::Holiday
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "holiday" => Ok(EventCategory::Holiday),
            "festival" => Ok(EventCategory::Festival),
            "sports" => Ok(EventCategory::Sports),
            "academic" => Ok(EventCategory::Academic),
            "examination" => Ok(EventCategory::Examination),
            "meeting" => Ok(EventCategory::Meeting),
            "event" => Ok(EventCategory::Event),
            "deadline" => Ok(EventCategory::Deadline),
            other => Err(ServiceError::InvalidInput(format!(
                "unknown event category: {other}"
            ))),
        }
    }
}

/// One normalized event from any feed. Read-only for the calendar UI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExternalEvent {
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub category: EventCategory,
    pub source: String,
    pub is_external: bool,
}

impl ExternalEvent {
    /// `(ISO start date, lowercase title with spaces as underscores)`.
    ///
    /// Exact match only: `Rizal Day` and `Rizal's Day` are different keys.
    pub fn dedup_key(&self) -> (String, String) {
        (
            self.start_date.format("%Y-%m-%d").to_string(),
            normalize_title(&self.title),
        )
    }
}

pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase().replace(' ', "_")
}

/// Entry of the public holiday feed, `GET {base}/{year}/{country}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayEntry {
    pub date: NaiveDate,
    pub name: String,
    #[serde(rename = "localName", default)]
    pub local_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(title: &str, date: &str) -> ExternalEvent {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        ExternalEvent {
            title: title.to_string(),
            description: String::new(),
            start_date: day,
            end_date: day,
            category: EventCategory::Holiday,
            source: PUBLIC_HOLIDAY_SOURCE.to_string(),
            is_external: true,
        }
    }

    #[test]
    fn dedup_key_lowercases_and_joins_words() {
        assert_eq!(
            event("New Year's Day", "2025-01-01").dedup_key(),
            ("2025-01-01".to_string(), "new_year's_day".to_string())
        );
        assert_ne!(
            event("Rizal Day", "2025-12-30").dedup_key(),
            event("Rizal's Day", "2025-12-30").dedup_key()
        );
    }

    #[test]
    fn category_from_title_keywords() {
        assert_eq!(EventCategory::from_title("Sinulog Festival"), EventCategory::Festival);
        assert_eq!(EventCategory::from_title("Town Fiesta"), EventCategory::Festival);
        assert_eq!(EventCategory::from_title("Dragon Boat Regatta"), EventCategory::Sports);
        assert_eq!(EventCategory::from_title("Founding Day"), EventCategory::Holiday);
    }

    #[test]
    fn category_parses_and_serializes_lowercase() {
        assert_eq!("Examination".parse::<EventCategory>().unwrap(), EventCategory::Examination);
        assert!("party".parse::<EventCategory>().is_err());
        assert_eq!(
            serde_json::to_string(&EventCategory::Deadline).unwrap(),
            "\"deadline\""
        );
    }

    #[test]
    fn holiday_entry_reads_local_name() {
        let entry: HolidayEntry = serde_json::from_str(
            r#"{"date":"2025-06-12","name":"Independence Day","localName":"Araw ng Kalayaan","global":true}"#,
        )
        .unwrap();
        assert_eq!(entry.local_name, "Araw ng Kalayaan");
        assert_eq!(entry.date, NaiveDate::from_ymd_opt(2025, 6, 12).unwrap());
    }
}
