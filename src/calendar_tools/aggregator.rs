//! Merge the public holiday feed with any number of iCalendar feeds.
//!
//! Feeds are fetched concurrently, but results are merged in a fixed order
//! (primary feed for the target year, then for the following year, then each
//! calendar feed as configured) before deduplication and sorting, so the
//! output only depends on what the feeds returned.

use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::thread;

use tracing::{info, warn};

use crate::calendar_tools::client::FeedClient;
use crate::calendar_tools::filter::HolidayFilter;
use crate::calendar_tools::holidays::fetch_public_holidays;
use crate::calendar_tools::ical::fetch_calendar_feed;
use crate::calendar_tools::types::ExternalEvent;
use crate::error::{ServiceError, ServiceResult};

pub const DEFAULT_HOLIDAY_FEED: &str = "https://date.nager.at/api/v3/PublicHolidays";
/// Years accepted from callers; the following year must stay a four-digit year too.
pub const SUPPORTED_YEARS: RangeInclusive<i32> = 1900..=9998;

pub const DEFAULT_COUNTRY_CODE: &str = "PH";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalendarFeed {
    /// Source tag stamped on every event of this feed.
    pub name: String,
    pub url: String,
}

impl CalendarFeed {
    /// `name=url` or a bare URL, in which case the host becomes the name.
    pub fn parse(entry: &str) -> ServiceResult<Self> {
        let entry = entry.trim();
        let (name, url) = match entry.split_once('=') {
            Some((name, url)) if !name.contains("://") && !name.trim().is_empty() => {
                (name.trim().to_string(), url.trim().to_string())
            }
            _ => (feed_host(entry).to_string(), entry.to_string()),
        };
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ServiceError::InvalidInput(format!(
                "calendar feed must be an http(s) URL: {entry}"
            )));
        }
        Ok(Self { name, url })
    }
}

fn feed_host(url: &str) -> &str {
    let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    rest.split(['/', '?', ':']).next().unwrap_or(rest)
}

#[derive(Clone, Debug)]
pub struct FeedConfig {
    pub holiday_base: String,
    pub country_code: String,
    pub calendars: Vec<CalendarFeed>,
    pub filter: HolidayFilter,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            holiday_base: DEFAULT_HOLIDAY_FEED.to_string(),
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            calendars: Vec::new(),
            filter: HolidayFilter::default(),
        }
    }
}

pub struct EventAggregator<C: FeedClient> {
    client: C,
    config: FeedConfig,
}

impl<C: FeedClient> EventAggregator<C> {
    pub fn new(client: C, config: FeedConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// External events for `year` and `year + 1`, deduplicated and sorted by start date.
    /// At the top of the `i32` range only `year` itself is fetched.
    ///
    /// Never fails: a feed that cannot be fetched or parsed is logged and
    /// contributes nothing.
    pub fn collect(&self, year: i32) -> Vec<ExternalEvent> {
        let config = &self.config;
        let client = &self.client;

        let batches: Vec<Vec<ExternalEvent>> = thread::scope(|scope| {
            let mut handles = Vec::new();
            for target in std::iter::once(year).chain(year.checked_add(1)) {
                let label = format!("{} {}", config.country_code, target);
                handles.push((
                    label,
                    scope.spawn(move || {
                        fetch_public_holidays(
                            client,
                            &config.holiday_base,
                            target,
                            &config.country_code,
                        )
                    }),
                ));
            }
            for feed in &config.calendars {
                handles.push((
                    feed.url.clone(),
                    scope.spawn(move || {
                        fetch_calendar_feed(client, &feed.url, &feed.name, year, &config.filter)
                    }),
                ));
            }

            handles
                .into_iter()
                .map(|(label, handle)| match handle.join() {
                    Ok(Ok(events)) => events,
                    Ok(Err(e)) => {
                        warn!(feed = %label, error = %e, "Feed failed, skipping");
                        Vec::new()
                    }
                    Err(_) => {
                        warn!(feed = %label, "Feed worker panicked, skipping");
                        Vec::new()
                    }
                })
                .collect()
        });

        let fetched: usize = batches.iter().map(Vec::len).sum();
        let merged = merge_events(batches);
        info!(
            year,
            fetched,
            kept = merged.len(),
            duplicates = fetched - merged.len(),
            "Aggregated external events"
        );
        merged
    }
}

/// Dedup in processing order (first occurrence wins), then stable sort by start date.
pub fn merge_events(batches: Vec<Vec<ExternalEvent>>) -> Vec<ExternalEvent> {
    let mut seen = HashSet::new();
    let mut events: Vec<ExternalEvent> = batches
        .into_iter()
        .flatten()
        .filter(|event| seen.insert(event.dedup_key()))
        .collect();
    events.sort_by_key(|event| event.start_date);
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar_tools::types::{EventCategory, PUBLIC_HOLIDAY_SOURCE};
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned bodies by URL; unknown URLs fail like an unreachable host.
    #[derive(Default)]
    struct CannedFeeds {
        bodies: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
    }

    impl CannedFeeds {
        fn with(mut self, url: &str, body: &str) -> Self {
            self.bodies.insert(url.to_string(), body.to_string());
            self
        }
    }

    impl FeedClient for CannedFeeds {
        fn get_text(&self, url: &str) -> ServiceResult<String> {
            self.requested.lock().unwrap().push(url.to_string());
            self.bodies
                .get(url)
                .cloned()
                .ok_or_else(|| ServiceError::NetworkError(format!("no route to {url}")))
        }
    }

    const BASE: &str = "http://holidays.test";
    const ICS_URL: &str = "http://calendar.test/regional.ics";

    fn config() -> FeedConfig {
        FeedConfig {
            holiday_base: BASE.to_string(),
            country_code: "PH".to_string(),
            calendars: vec![CalendarFeed {
                name: "regional".to_string(),
                url: ICS_URL.to_string(),
            }],
            filter: HolidayFilter::default(),
        }
    }

    fn ics(events: &[(&str, &str)]) -> String {
        let mut body = String::from("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//test//EN\r\n");
        for (i, (title, date)) in events.iter().enumerate() {
            body.push_str(&format!(
                "BEGIN:VEVENT\r\nUID:{i}\r\nSUMMARY:{title}\r\nDTSTART;VALUE=DATE:{date}\r\nEND:VEVENT\r\n"
            ));
        }
        body.push_str("END:VCALENDAR\r\n");
        body
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn duplicate_key_keeps_the_primary_feed_event() {
        let feeds = CannedFeeds::default()
            .with(
                &format!("{BASE}/2025/PH"),
                r#"[{"date":"2025-08-21","name":"Town Day","localName":"Araw ng Bayan"}]"#,
            )
            .with(&format!("{BASE}/2026/PH"), "[]")
            .with(ICS_URL, &ics(&[("TOWN DAY", "20250821")]));

        let events = EventAggregator::new(feeds, config()).collect(2025);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, PUBLIC_HOLIDAY_SOURCE);
        assert_eq!(events[0].description, "Araw ng Bayan");
    }

    #[test]
    fn christmas_from_both_feeds_appears_once() {
        let feeds = CannedFeeds::default()
            .with(
                &format!("{BASE}/2025/PH"),
                r#"[{"date":"2025-12-25","name":"Christmas Day","localName":"Araw ng Pasko"}]"#,
            )
            .with(&format!("{BASE}/2026/PH"), "[]")
            .with(ICS_URL, &ics(&[("Christmas Day", "20251225")]));
        // no deny list, so the calendar's copy reaches the merge
        let config = FeedConfig {
            filter: HolidayFilter::new(Vec::<String>::new()),
            ..config()
        };

        let events = EventAggregator::new(feeds, config).collect(2025);
        let christmas: Vec<_> = events
            .iter()
            .filter(|e| e.dedup_key() == ("2025-12-25".to_string(), "christmas_day".to_string()))
            .collect();
        assert_eq!(christmas.len(), 1);
        assert_eq!(christmas[0].source, PUBLIC_HOLIDAY_SOURCE);
    }

    #[test]
    fn different_titles_on_the_same_day_are_both_kept() {
        let feeds = CannedFeeds::default()
            .with(
                &format!("{BASE}/2025/PH"),
                r#"[{"date":"2025-08-21","name":"Town Day","localName":""}]"#,
            )
            .with(&format!("{BASE}/2026/PH"), "[]")
            .with(ICS_URL, &ics(&[("Town Fiesta", "20250821")]));

        let events = EventAggregator::new(feeds, config()).collect(2025);
        let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Town Day", "Town Fiesta"]);
        assert_eq!(events[1].category, EventCategory::Festival);
    }

    #[test]
    fn failing_primary_feed_still_returns_calendar_events() {
        let feeds = CannedFeeds::default().with(
            ICS_URL,
            &ics(&[("Sinulog Festival", "20250119"), ("Kadayawan Festival", "20250815")]),
        );

        let events = EventAggregator::new(feeds, config()).collect(2025);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.source == "regional"));
    }

    #[test]
    fn last_representable_year_fetches_only_itself() {
        let feeds = CannedFeeds::default();
        let aggregator = EventAggregator::new(feeds, config());
        assert!(aggregator.collect(i32::MAX).is_empty());

        let requested = aggregator.client.requested.lock().unwrap();
        let holiday_urls: Vec<&String> = requested.iter().filter(|u| u.starts_with(BASE)).collect();
        assert_eq!(holiday_urls, vec![&format!("{BASE}/{}/PH", i32::MAX)]);
    }

    #[test]
    fn every_feed_failing_yields_an_empty_list() {
        let feeds = CannedFeeds::default()
            .with(&format!("{BASE}/2025/PH"), "not json")
            .with(ICS_URL, "not a calendar");
        assert!(EventAggregator::new(feeds, config()).collect(2025).is_empty());
    }

    #[test]
    fn fetches_both_years_and_sorts_by_start_date() {
        let feeds = CannedFeeds::default()
            .with(
                &format!("{BASE}/2025/PH"),
                r#"[{"date":"2025-12-30","name":"Rizal Day","localName":""}]"#,
            )
            .with(
                &format!("{BASE}/2026/PH"),
                r#"[{"date":"2026-01-01","name":"New Year's Day","localName":""}]"#,
            )
            .with(ICS_URL, &ics(&[("Panagbenga Festival", "20250201")]));
        let aggregator = EventAggregator::new(feeds, config());

        let events = aggregator.collect(2025);
        let dates: Vec<NaiveDate> = events.iter().map(|e| e.start_date).collect();
        assert_eq!(dates, vec![ymd(2025, 2, 1), ymd(2025, 12, 30), ymd(2026, 1, 1)]);

        let mut requested = aggregator.client.requested.lock().unwrap().clone();
        requested.sort();
        assert_eq!(
            requested,
            vec![
                ICS_URL.to_string(),
                format!("{BASE}/2025/PH"),
                format!("{BASE}/2026/PH"),
            ]
        );
    }

    #[test]
    fn equal_dates_keep_processing_order() {
        let day = ymd(2025, 5, 1);
        let event = |title: &str, source: &str| ExternalEvent {
            title: title.to_string(),
            description: String::new(),
            start_date: day,
            end_date: day,
            category: EventCategory::Holiday,
            source: source.to_string(),
            is_external: true,
        };
        let merged = merge_events(vec![
            vec![event("B", "primary"), event("A", "primary")],
            vec![event("a", "ics"), event("C", "ics")],
        ]);
        let titles: Vec<&str> = merged.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A", "C"]);
    }

    #[test]
    fn calendar_feed_entries_parse_with_or_without_name() {
        let named = CalendarFeed::parse("cebu=https://example.test/cebu.ics").unwrap();
        assert_eq!(named.name, "cebu");
        assert_eq!(named.url, "https://example.test/cebu.ics");

        let bare = CalendarFeed::parse("https://calendar.example.test/x.ics?a=b").unwrap();
        assert_eq!(bare.name, "calendar.example.test");
        assert_eq!(bare.url, "https://calendar.example.test/x.ics?a=b");

        assert!(CalendarFeed::parse("ftp://nope").is_err());
    }
}
