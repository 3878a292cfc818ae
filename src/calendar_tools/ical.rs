//! iCalendar feeds of regional and cultural events.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use icalendar::{Calendar, CalendarComponent, Component, Event};
use tracing::debug;

use crate::calendar_tools::client::FeedClient;
use crate::calendar_tools::filter::HolidayFilter;
use crate::calendar_tools::types::{EventCategory, ExternalEvent};
use crate::error::{ServiceError, ServiceResult};

/// Date part of a `DTSTART`/`DTEND` value: `20250101`, `20250101T080000` or `20250101T080000Z`.
pub fn parse_ical_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.len() == 8 {
        return NaiveDate::parse_from_str(value, "%Y%m%d").ok();
    }
    let format = if value.ends_with('Z') {
        "%Y%m%dT%H%M%SZ"
    } else {
        "%Y%m%dT%H%M%S"
    };
    NaiveDateTime::parse_from_str(value, format)
        .ok()
        .map(|dt| dt.date())
}

/// Inclusive last day of an event. `DTEND` is exclusive, so a span longer than
/// one day ends the day before it; anything shorter ends on the start day.
pub fn inclusive_end(start: NaiveDate, end: Option<NaiveDate>) -> NaiveDate {
    match end {
        Some(end) if (end - start).num_days() > 1 => end - Duration::days(1),
        _ => start,
    }
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(escaped @ (',' | ';' | '\\')) => out.push(escaped),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out.trim().to_string()
}

fn date_property(event: &Event, key: &str) -> Option<NaiveDate> {
    event
        .properties()
        .get(key)
        .and_then(|p| parse_ical_date(p.value()))
}

/// Parse every `VEVENT` of `body` that starts in `year` or `year + 1` and is not
/// a common holiday according to `filter`.
pub fn parse_calendar_feed(
    body: &str,
    source: &str,
    year: i32,
    filter: &HolidayFilter,
) -> ServiceResult<Vec<ExternalEvent>> {
    let calendar: Calendar = body
        .parse()
        .map_err(|e| ServiceError::CalendarParse(format!("{source}: {e}")))?;

    let mut events = Vec::new();
    for component in &calendar.components {
        let CalendarComponent::Event(event) = component else {
            continue;
        };
        let Some(title) = event.get_summary().map(unescape).filter(|t| !t.is_empty()) else {
            continue;
        };
        let Some(start_date) = date_property(event, "DTSTART") else {
            debug!(%source, %title, "Skipping event without a readable DTSTART");
            continue;
        };
        if start_date.year() != year && Some(start_date.year()) != year.checked_add(1) {
            continue;
        }
        if filter.is_common_holiday(&title) {
            continue;
        }

        events.push(ExternalEvent {
            description: event.get_description().map(unescape).unwrap_or_default(),
            start_date,
            end_date: inclusive_end(start_date, date_property(event, "DTEND")),
            category: EventCategory::from_title(&title),
            source: source.to_string(),
            is_external: true,
            title,
        });
    }
    Ok(events)
}

pub fn fetch_calendar_feed<C: FeedClient + ?Sized>(
    client: &C,
    url: &str,
    source: &str,
    year: i32,
    filter: &HolidayFilter,
) -> ServiceResult<Vec<ExternalEvent>> {
    let events = parse_calendar_feed(&client.get_text(url)?, source, year, filter)?;
    debug!(%url, count = events.len(), "Fetched calendar feed");
    Ok(events)
}
