use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::ai::{GeminiClient, GeminiConfig, DEFAULT_AI_ENDPOINT, DEFAULT_AI_MODEL};
use crate::calendar_tools::aggregator::{
    CalendarFeed, FeedConfig, DEFAULT_COUNTRY_CODE, DEFAULT_HOLIDAY_FEED, SUPPORTED_YEARS,
};
use crate::calendar_tools::filter::HolidayFilter;
use crate::error::ServiceResult;
use crate::metadata::{PKG_DESCRIPTION, PKG_NAME, PKG_VERSION};

#[derive(Parser, Debug, Clone)]
#[command(name = PKG_NAME)]
#[command(version = PKG_VERSION)]
#[command(about = PKG_DESCRIPTION, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the MCP server
    Start(CommandArguments),
    /// Parse a lesson plan file and print the result as JSON
    Parse(ParseArguments),
    /// Print the cleaned form of a lesson plan file
    Clean {
        /// Lesson plan text file
        file: PathBuf,
    },
    /// Fetch and print the aggregated external events
    Holidays(HolidayArguments),
    /// Print version information
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct ParseArguments {
    /// Lesson plan text file
    pub file: PathBuf,

    /// Parse as a weekly plan instead of a daily one
    #[arg(long, default_value_t = false)]
    pub weekly: bool,
}

#[derive(Args, Debug, Clone)]
pub struct HolidayArguments {
    /// Target year; the following year is included too. Defaults to the current year.
    #[arg(long, value_parser = parse_year)]
    pub year: Option<i32>,

    #[command(flatten)]
    pub feeds: FeedArguments,
}

fn parse_year(value: &str) -> Result<i32, String> {
    let year: i32 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a year"))?;
    if !SUPPORTED_YEARS.contains(&year) {
        return Err(format!(
            "year must be between {} and {}",
            SUPPORTED_YEARS.start(),
            SUPPORTED_YEARS.end()
        ));
    }
    Ok(year)
}

#[derive(Args, Debug, Clone)]
pub struct FeedArguments {
    /// Public holiday feed base URL, queried as `{base}/{year}/{country}`
    #[arg(long, env = "LESSON_HOLIDAY_FEED", default_value = DEFAULT_HOLIDAY_FEED)]
    pub holiday_feed: String,

    /// Country code for the public holiday feed
    #[arg(long, env = "LESSON_COUNTRY_CODE", default_value = DEFAULT_COUNTRY_CODE)]
    pub country_code: String,

    /// iCalendar feeds, comma separated, each `name=url` or a bare URL
    #[arg(long, env = "LESSON_CALENDAR_FEEDS", value_delimiter = ',')]
    pub calendar_feeds: Vec<String>,

    /// Per-request feed timeout in seconds
    #[arg(long, env = "LESSON_FEED_TIMEOUT", default_value_t = 10)]
    pub feed_timeout: u64,

    /// Holiday keywords skipped in calendar feeds, comma separated (replaces the defaults)
    #[arg(long, env = "LESSON_SKIP_KEYWORDS")]
    pub skip_keywords: Option<String>,
}

impl FeedArguments {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout)
    }

    pub fn feed_config(&self) -> ServiceResult<FeedConfig> {
        let calendars = self
            .calendar_feeds
            .iter()
            .filter(|entry| !entry.trim().is_empty())
            .map(|entry| CalendarFeed::parse(entry))
            .collect::<ServiceResult<Vec<_>>>()?;
        let filter = self
            .skip_keywords
            .as_deref()
            .map(HolidayFilter::from_list)
            .unwrap_or_default();
        Ok(FeedConfig {
            holiday_base: self.holiday_feed.trim().to_string(),
            country_code: self.country_code.trim().to_uppercase(),
            calendars,
            filter,
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        let base = self.holiday_feed.trim();
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(format!(
                "Invalid LESSON_HOLIDAY_FEED '{}': expected an http(s) URL",
                self.holiday_feed
            ));
        }
        let code = self.country_code.trim();
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(format!(
                "Invalid LESSON_COUNTRY_CODE '{}': expected two letters",
                self.country_code
            ));
        }
        if self.feed_timeout == 0 {
            return Err("LESSON_FEED_TIMEOUT must be at least one second".to_string());
        }
        self.feed_config().map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct AiArguments {
    /// Base URL of the completion API
    #[arg(long, env = "LESSON_AI_ENDPOINT", default_value = DEFAULT_AI_ENDPOINT)]
    pub ai_endpoint: String,

    /// Completion model name
    #[arg(long, env = "LESSON_AI_MODEL", default_value = DEFAULT_AI_MODEL)]
    pub ai_model: String,

    /// Completion API key; generation is disabled without one
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub ai_api_key: Option<String>,
}

impl AiArguments {
    pub fn completion_client(&self) -> Option<GeminiClient> {
        let api_key = self.ai_api_key.as_deref()?.trim();
        if api_key.is_empty() {
            return None;
        }
        Some(GeminiClient::new(GeminiConfig {
            endpoint: self.ai_endpoint.clone(),
            model: self.ai_model.clone(),
            api_key: api_key.to_string(),
        }))
    }
}

#[derive(Args, Debug, Clone)]
pub struct CommandArguments {
    /// Server name (used in initialize)
    #[arg(skip = crate::metadata::PKG_NAME.to_string())]
    pub server_name: String,

    /// Server description/title (used in initialize)
    #[arg(skip = crate::metadata::PKG_DESCRIPTION.to_string())]
    pub server_description: String,

    /// Enable stdio transport
    #[arg(long, env = "MCP_ENABLE_STDIO", default_value_t = true, action = clap::ArgAction::Set)]
    pub enable_stdio: bool,

    /// Enable streamable HTTP transport
    #[arg(long, env = "MCP_ENABLE_HTTP", default_value_t = true, action = clap::ArgAction::Set)]
    pub enable_http: bool,

    /// HTTP bind address (streamable HTTP)
    #[arg(long, env = "MCP_HTTP_ADDR", default_value = "127.0.0.1:8080")]
    pub http_addr: String,

    /// Drafts file; defaults to ~/.lesson-planner/drafts.json
    #[arg(long, env = "LESSON_DRAFTS_PATH")]
    pub drafts_path: Option<PathBuf>,

    #[command(flatten)]
    pub feeds: FeedArguments,

    #[command(flatten)]
    pub ai: AiArguments,
}

impl CommandArguments {
    /// Validate CLI/environment-derived arguments.
    pub fn validate(&self) -> Result<(), String> {
        if !self.enable_stdio && !self.enable_http {
            return Err("Enable at least one transport (stdio or http)".to_string());
        }
        if self.enable_http {
            self.http_addr
                .parse::<SocketAddr>()
                .map_err(|e| format!("Invalid MCP_HTTP_ADDR '{}': {e}", self.http_addr))?;
        }
        self.feeds.validate()
    }
}
