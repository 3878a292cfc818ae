pub mod daily;
pub mod fragment;
pub mod markdown;
pub mod sections;
pub mod types;
pub mod weekly;

pub use daily::{parse_daily_plan, parse_daily_value};
pub use fragment::{fragment_flags, looks_like_fragment, FragmentRule, SuspiciousField};
pub use markdown::clean_markdown;
pub use types::*;
pub use weekly::{build_weekly_value, parse_weekly_plan};
