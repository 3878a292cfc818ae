pub mod aggregator;
pub mod client;
pub mod filter;
pub mod holidays;
pub mod ical;
pub mod types;

pub use aggregator::EventAggregator;
pub use client::{FeedClient, HttpFeedClient};
pub use types::ExternalEvent;
