use std::sync::Arc;

use chrono::{Datelike, Utc};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::info;

use crate::ai::{generate_weekly_plan, CompletionClient};
use crate::calendar_tools::aggregator::SUPPORTED_YEARS;
use crate::calendar_tools::{EventAggregator, ExternalEvent, FeedClient};
use crate::error::{ServiceError, ServiceResult};
use crate::lesson_tools::{
    build_weekly_value, clean_markdown, fragment_flags, looks_like_fragment, parse_daily_value,
    DailyLessonPlan, FragmentRule, SuspiciousField, WeeklyPlanForm, WeeklyPlanRecord,
};
use crate::storage::DraftStore;
use crate::types::{DraftSummary, WeeklyDraft};

// Tool argument types

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct TextArgs {
    /// Raw lesson plan text as produced by the AI service
    pub text: Value,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct PlainTextArgs {
    pub text: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct WeeklyTextArgs {
    pub text: Value,
    /// Submitted form values used where extraction comes back empty
    #[serde(default)]
    pub form: Option<WeeklyPlanForm>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct CalendarArgs {
    /// Target year; events of the following year are included. Defaults to the current year.
    #[serde(default)]
    pub year: Option<i32>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct GenerateArgs {
    pub prompt: String,
    #[serde(default)]
    pub form: Option<WeeklyPlanForm>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct SaveDraftArgs {
    pub record: WeeklyPlanRecord,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct DraftIdArgs {
    pub id: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct EditDraftArgs {
    pub id: String,
    /// Field path such as `school`, `monday.objective` or `friday.step_j`
    pub field: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WeeklyPlanResult {
    pub record: WeeklyPlanRecord,
    pub suspicious_fields: Vec<SuspiciousField>,
}

impl From<WeeklyPlanRecord> for WeeklyPlanResult {
    fn from(record: WeeklyPlanRecord) -> Self {
        Self {
            suspicious_fields: record.suspicious_fields(),
            record,
        }
    }
}

/// Everything the tools share across sessions.
pub struct ServerState {
    name: String,
    description: String,
    aggregator: EventAggregator<Box<dyn FeedClient>>,
    completion: Option<Arc<dyn CompletionClient>>,
    drafts: Mutex<DraftStore>,
}

impl ServerState {
    pub fn new(
        aggregator: EventAggregator<Box<dyn FeedClient>>,
        completion: Option<Arc<dyn CompletionClient>>,
        drafts: DraftStore,
    ) -> Self {
        Self {
            name: crate::metadata::PKG_NAME.to_string(),
            description: crate::metadata::PKG_DESCRIPTION.to_string(),
            aggregator,
            completion,
            drafts: Mutex::new(drafts),
        }
    }

    /// Name and title reported to clients on initialize.
    pub fn with_identity(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.name = name.into();
        self.description = description.into();
        self
    }

    pub fn parse_daily(&self, text: &Value) -> ServiceResult<DailyLessonPlan> {
        parse_daily_value(text)
    }

    pub fn parse_weekly(
        &self,
        text: &Value,
        form: Option<&WeeklyPlanForm>,
    ) -> ServiceResult<WeeklyPlanResult> {
        let form = form.cloned().unwrap_or_default();
        Ok(build_weekly_value(text, &form)?.into())
    }

    pub async fn fetch_events(self: Arc<Self>, year: Option<i32>) -> ServiceResult<Vec<ExternalEvent>> {
        let year = year.unwrap_or_else(|| Utc::now().year());
        if !SUPPORTED_YEARS.contains(&year) {
            return Err(ServiceError::InvalidInput(format!(
                "year must be between {} and {}, got {year}",
                SUPPORTED_YEARS.start(),
                SUPPORTED_YEARS.end()
            )));
        }
        tokio::task::spawn_blocking(move || self.aggregator.collect(year))
            .await
            .map_err(|e| ServiceError::IoError(std::io::Error::other(e.to_string())))
    }

    pub async fn generate(
        self: Arc<Self>,
        prompt: String,
        form: Option<WeeklyPlanForm>,
    ) -> ServiceResult<WeeklyPlanResult> {
        let client = self.completion.clone().ok_or_else(|| {
            ServiceError::ApiError("no completion API key configured (GEMINI_API_KEY)".into())
        })?;
        let form = form.unwrap_or_default();
        let record = tokio::task::spawn_blocking(move || {
            generate_weekly_plan(client.as_ref(), &prompt, &form)
        })
        .await
        .map_err(|e| ServiceError::IoError(std::io::Error::other(e.to_string())))??;
        Ok(record.into())
    }

    pub async fn save_draft(&self, record: WeeklyPlanRecord) -> ServiceResult<WeeklyDraft> {
        let mut drafts = self.drafts.lock().await;
        let draft = drafts
            .commit(|store| Ok(store.create_draft(record)))
            .await?;
        info!(id = %draft.id, "Saved weekly draft");
        Ok(draft)
    }

    pub async fn get_draft(&self, id: &str) -> ServiceResult<WeeklyDraft> {
        self.drafts.lock().await.get_draft(id)
    }

    pub async fn list_drafts(&self) -> Vec<DraftSummary> {
        self.drafts.lock().await.list_drafts()
    }

    pub async fn edit_draft(&self, id: &str, field: &str, value: &str) -> ServiceResult<WeeklyDraft> {
        let mut drafts = self.drafts.lock().await;
        drafts
            .commit(|store| store.edit_draft(id, field, value))
            .await
    }

    pub async fn delete_draft(&self, id: &str) -> ServiceResult<WeeklyDraft> {
        let mut drafts = self.drafts.lock().await;
        let draft = drafts.commit(|store| store.delete_draft(id)).await?;
        info!(id = %draft.id, "Deleted weekly draft");
        Ok(draft)
    }
}

#[derive(Clone)]
pub struct LessonPlanServer {
    state: Arc<ServerState>,
    pub tool_router: ToolRouter<LessonPlanServer>,
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, ErrorData> {
    Ok(CallToolResult::success(vec![Content::json(value)?]))
}

#[tool_router]
impl LessonPlanServer {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Parse AI-generated daily lesson plan text into sections, metadata, lists and timed procedure steps")]
    async fn parse_daily_plan(
        &self,
        Parameters(args): Parameters<TextArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        json_result(&self.state.parse_daily(&args.text)?)
    }

    #[tool(description = "Parse AI-generated weekly lesson plan text into a weekly plan record, using the form as fallback")]
    async fn parse_weekly_plan(
        &self,
        Parameters(args): Parameters<WeeklyTextArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        json_result(&self.state.parse_weekly(&args.text, args.form.as_ref())?)
    }

    #[tool(description = "Remove bold markers, label annotations and step letters from lesson text")]
    async fn clean_markdown(
        &self,
        Parameters(args): Parameters<PlainTextArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text(clean_markdown(
            &args.text,
        ))]))
    }

    #[tool(description = "Check whether a value looks like a corrupted fragment and list the rules it trips")]
    async fn check_fragment(
        &self,
        Parameters(args): Parameters<PlainTextArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let rules: Vec<FragmentRule> = fragment_flags(&args.text);
        json_result(&json!({
            "looks_like_fragment": looks_like_fragment(&args.text),
            "rules": rules
        }))
    }

    #[tool(description = "Fetch public holidays and regional calendar events for a year and the next, deduplicated and sorted")]
    async fn fetch_calendar_events(
        &self,
        Parameters(args): Parameters<CalendarArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let events = self.state.clone().fetch_events(args.year).await?;
        json_result(&json!({ "count": events.len(), "events": events }))
    }

    #[tool(description = "Generate a weekly lesson plan from a prompt with the configured completion service")]
    async fn generate_weekly_plan(
        &self,
        Parameters(args): Parameters<GenerateArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        json_result(&self.state.clone().generate(args.prompt, args.form).await?)
    }

    #[tool(description = "Save a weekly plan record as a new draft")]
    async fn save_weekly_draft(
        &self,
        Parameters(args): Parameters<SaveDraftArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        json_result(&self.state.save_draft(args.record).await?)
    }

    #[tool(description = "Get a weekly plan draft by id")]
    async fn get_weekly_draft(
        &self,
        Parameters(args): Parameters<DraftIdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        json_result(&self.state.get_draft(&args.id).await?)
    }

    #[tool(description = "List saved weekly plan drafts, newest first")]
    async fn list_weekly_drafts(&self) -> Result<CallToolResult, ErrorData> {
        json_result(&json!({ "drafts": self.state.list_drafts().await }))
    }

    #[tool(description = "Edit one field of a weekly plan draft")]
    async fn edit_weekly_draft(
        &self,
        Parameters(args): Parameters<EditDraftArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        json_result(
            &self
                .state
                .edit_draft(&args.id, &args.field, &args.value)
                .await?,
        )
    }

    #[tool(description = "Delete a weekly plan draft")]
    async fn delete_weekly_draft(
        &self,
        Parameters(args): Parameters<DraftIdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let draft = self.state.delete_draft(&args.id).await?;
        json_result(&json!({ "deleted": draft.id }))
    }
}

#[tool_handler]
impl rmcp::ServerHandler for LessonPlanServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.state.name.clone(),
                title: Some(self.state.description.clone()),
                version: crate::metadata::PKG_VERSION.to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Lesson plan tools: parse and clean AI lesson text, manage weekly drafts, and fetch school holiday calendars".to_string(),
            ),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar_tools::aggregator::FeedConfig;
    use crate::lesson_tools::SchoolDay;
    use tempfile::TempDir;

    struct OneHoliday;

    impl FeedClient for OneHoliday {
        fn get_text(&self, url: &str) -> ServiceResult<String> {
            if url.ends_with("/2030/PH") {
                Ok(r#"[{"date":"2030-06-12","name":"Independence Day","localName":"Araw ng Kalayaan"}]"#.into())
            } else {
                Err(ServiceError::NetworkError("down".into()))
            }
        }
    }

    struct Echo;

    impl CompletionClient for Echo {
        fn complete(&self, prompt: &str) -> ServiceResult<String> {
            Ok(format!("## Tuesday\n### Content\n{prompt}\n"))
        }
    }

    fn state(dir: &TempDir, completion: Option<Arc<dyn CompletionClient>>) -> Arc<ServerState> {
        let aggregator = EventAggregator::new(
            Box::new(OneHoliday) as Box<dyn FeedClient>,
            FeedConfig {
                holiday_base: "http://feed.test".into(),
                ..FeedConfig::default()
            },
        );
        let drafts = DraftStore::with_path(dir.path().join("drafts.json"));
        Arc::new(ServerState::new(aggregator, completion, drafts))
    }

    #[test]
    fn parse_tools_reject_non_text() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, None);
        assert!(matches!(
            state.parse_daily(&json!(null)),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(state.parse_weekly(&json!(1), None).is_err());
        let result = state.parse_weekly(&json!("## Monday\n### Content\nReading/Writing"), None).unwrap();
        assert_eq!(result.suspicious_fields.len(), 1);
        assert_eq!(result.suspicious_fields[0].field, "monday.content");
    }

    #[tokio::test]
    async fn fetch_events_survives_failing_years() {
        let dir = TempDir::new().unwrap();
        let events = state(&dir, None).fetch_events(Some(2030)).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].description, "Araw ng Kalayaan");
    }

    #[tokio::test]
    async fn fetch_events_rejects_out_of_range_years() {
        let dir = TempDir::new().unwrap();
        for year in [i32::MAX, 9999, 1899, -1] {
            assert!(matches!(
                state(&dir, None).fetch_events(Some(year)).await,
                Err(ServiceError::InvalidInput(_))
            ));
        }
    }

    #[tokio::test]
    async fn generate_requires_a_completion_client() {
        let dir = TempDir::new().unwrap();
        assert!(state(&dir, None).generate("x".into(), None).await.is_err());

        let result = state(&dir, Some(Arc::new(Echo)))
            .generate("Verbs in context".into(), None)
            .await
            .unwrap();
        assert_eq!(result.record.day(SchoolDay::Tuesday).content, "Verbs in context");
    }

    #[tokio::test]
    async fn draft_lifecycle_is_persisted() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, None);

        let draft = state.save_draft(WeeklyPlanRecord::default()).await.unwrap();
        state.edit_draft(&draft.id, "school", "Central School").await.unwrap();
        assert_eq!(state.get_draft(&draft.id).await.unwrap().record.school, "Central School");
        assert_eq!(state.list_drafts().await.len(), 1);

        let on_disk = std::fs::read_to_string(dir.path().join("drafts.json")).unwrap();
        assert!(on_disk.contains("Central School"));

        state.delete_draft(&draft.id).await.unwrap();
        assert!(matches!(
            state.get_draft(&draft.id).await,
            Err(ServiceError::DraftNotFound(_))
        ));
        assert!(state.list_drafts().await.is_empty());
    }

    #[tokio::test]
    async fn failed_writes_do_not_leave_drafts_behind() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let aggregator = EventAggregator::new(
            Box::new(OneHoliday) as Box<dyn FeedClient>,
            FeedConfig::default(),
        );
        let state = ServerState::new(aggregator, None, DraftStore::with_path(blocker.join("drafts.json")));

        assert!(state.save_draft(WeeklyPlanRecord::default()).await.is_err());
        assert!(state.list_drafts().await.is_empty());
    }

    #[test]
    fn server_info_advertises_tools() {
        let dir = TempDir::new().unwrap();
        let server = LessonPlanServer::new(state(&dir, None));
        let info = rmcp::ServerHandler::get_info(&server);
        assert!(info.capabilities.tools.is_some());
        assert_eq!(info.server_info.name, crate::metadata::PKG_NAME);
        assert_eq!(
            info.server_info.title.as_deref(),
            Some(crate::metadata::PKG_DESCRIPTION)
        );
    }

    #[test]
    fn server_info_uses_configured_identity() {
        let dir = TempDir::new().unwrap();
        let state = Arc::try_unwrap(state(&dir, None))
            .ok()
            .unwrap()
            .with_identity("school-planner", "Rizal ES planner");
        let info = rmcp::ServerHandler::get_info(&LessonPlanServer::new(Arc::new(state)));
        assert_eq!(info.server_info.name, "school-planner");
        assert_eq!(info.server_info.title.as_deref(), Some("Rizal ES planner"));
    }
}
