mod ai;
mod calendar_tools;
mod cli;
mod error;
mod lesson_tools;
mod server;
mod storage;
mod types;

mod metadata {
    include!(concat!(env!("OUT_DIR"), "/pkg_info.rs"));
}

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{Datelike, Utc};
use clap::Parser;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder,
    service::TowerToHyperService,
};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use rmcp::{ServiceExt, transport::stdio};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::ai::CompletionClient;
use crate::calendar_tools::{EventAggregator, FeedClient, HttpFeedClient};
use crate::cli::{Cli, Command, CommandArguments, HolidayArguments, ParseArguments};
use crate::lesson_tools::{clean_markdown, parse_daily_plan, parse_weekly_plan};
use crate::server::{LessonPlanServer, ServerState, WeeklyPlanResult};
use crate::storage::DraftStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // stdout carries the stdio transport, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match Cli::parse().command {
        Command::Start(args) => start(args).await,
        Command::Parse(args) => parse(args),
        Command::Clean { file } => {
            let text = std::fs::read_to_string(&file)?;
            println!("{}", clean_markdown(&text));
            Ok(())
        }
        Command::Holidays(args) => holidays(args).await,
        Command::Version => {
            println!("{} {}", metadata::PKG_NAME, metadata::PKG_VERSION);
            Ok(())
        }
    }
}

fn parse(args: ParseArguments) -> Result<(), Box<dyn Error>> {
    let text = std::fs::read_to_string(&args.file)?;
    let output = if args.weekly {
        serde_json::to_string_pretty(&WeeklyPlanResult::from(parse_weekly_plan(&text)))?
    } else {
        serde_json::to_string_pretty(&parse_daily_plan(&text))?
    };
    println!("{output}");
    Ok(())
}

async fn holidays(args: HolidayArguments) -> Result<(), Box<dyn Error>> {
    args.feeds.validate()?;
    let aggregator = EventAggregator::new(
        HttpFeedClient::new(args.feeds.timeout()),
        args.feeds.feed_config()?,
    );
    let year = args.year.unwrap_or_else(|| Utc::now().year());
    let events = tokio::task::spawn_blocking(move || aggregator.collect(year)).await?;
    println!("{}", serde_json::to_string_pretty(&events)?);
    Ok(())
}

async fn start(args: CommandArguments) -> Result<(), Box<dyn Error>> {
    args.validate()?;

    tracing::info!(
        name = %args.server_name,
        version = metadata::PKG_VERSION,
        "Starting lesson plan MCP server"
    );

    let feed_client: Box<dyn FeedClient> = Box::new(HttpFeedClient::new(args.feeds.timeout()));
    let aggregator = EventAggregator::new(feed_client, args.feeds.feed_config()?);
    tracing::info!(
        country = %aggregator.config().country_code,
        calendars = aggregator.config().calendars.len(),
        "External event feeds configured"
    );
    let completion = args
        .ai
        .completion_client()
        .map(|client| Arc::new(client) as Arc<dyn CompletionClient>);
    if completion.is_none() {
        tracing::warn!("No completion API key configured, generate_weekly_plan is disabled");
    }

    let mut drafts = match &args.drafts_path {
        Some(path) => DraftStore::with_path(path),
        None => DraftStore::new(),
    };
    drafts.initialize()?;
    tracing::info!(path = %drafts.path().display(), "Draft store ready");

    let state = Arc::new(
        ServerState::new(aggregator, completion, drafts)
            .with_identity(&args.server_name, &args.server_description),
    );
    let mut tasks = Vec::new();

    if args.enable_stdio {
        let std_service = LessonPlanServer::new(state.clone()).serve(stdio()).await?;
        tasks.push(tokio::spawn(async move {
            let _ = std_service.waiting().await;
        }));
    }

    if args.enable_http {
        let http_state = state.clone();
        let http_service = TowerToHyperService::new(StreamableHttpService::new(
            move || Ok(LessonPlanServer::new(http_state.clone())),
            LocalSessionManager::default().into(),
            Default::default(),
        ));
        let addr: SocketAddr = args.http_addr.parse()?;
        let http_listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(addr = %http_listener.local_addr()?, "Streamable HTTP transport listening");
        tasks.push(tokio::spawn(async move {
            loop {
                let (stream, _) = match http_listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to accept HTTP connection");
                        continue;
                    }
                };
                let io = TokioIo::new(stream);
                let service = http_service.clone();
                tokio::spawn(async move {
                    let _ = Builder::new(TokioExecutor::default())
                        .serve_connection(io, service)
                        .await;
                });
            }
        }));
    }

    // Wait for the stdio or http tasks to finish
    for task in tasks {
        let _ = task.await;
    }

    Ok(())
}
