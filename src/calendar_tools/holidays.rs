use tracing::debug;

use crate::calendar_tools::client::FeedClient;
use crate::calendar_tools::types::{EventCategory, ExternalEvent, HolidayEntry, PUBLIC_HOLIDAY_SOURCE};
use crate::error::{ServiceError, ServiceResult};

pub fn holiday_feed_url(base: &str, year: i32, country_code: &str) -> String {
    format!("{}/{}/{}", base.trim_end_matches('/'), year, country_code)
}

/// Turn a public holiday feed body into single-day holiday events.
pub fn parse_holiday_feed(body: &str) -> ServiceResult<Vec<ExternalEvent>> {
    let entries: Vec<HolidayEntry> = serde_json::from_str(body)
        .map_err(|e| ServiceError::ApiError(format!("malformed holiday feed: {e}")))?;
    Ok(entries.into_iter().map(holiday_event).collect())
}

fn holiday_event(entry: HolidayEntry) -> ExternalEvent {
    ExternalEvent {
        title: entry.name,
        description: entry.local_name,
        start_date: entry.date,
        end_date: entry.date,
        category: EventCategory::Holiday,
        source: PUBLIC_HOLIDAY_SOURCE.to_string(),
        is_external: true,
    }
}

/// Fetch one year of public holidays.
pub fn fetch_public_holidays<C: FeedClient + ?Sized>(
    client: &C,
    base: &str,
    year: i32,
    country_code: &str,
) -> ServiceResult<Vec<ExternalEvent>> {
    let url = holiday_feed_url(base, year, country_code);
    let events = parse_holiday_feed(&client.get_text(&url)?)?;
    debug!(%url, count = events.len(), "Fetched public holidays");
    Ok(events)
}
