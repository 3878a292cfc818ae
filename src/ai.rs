//! Text completion for lesson plan generation.

use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{ServiceError, ServiceResult};
use crate::lesson_tools::types::{WeeklyPlanForm, WeeklyPlanRecord};
use crate::lesson_tools::weekly::build_weekly_plan;

pub const DEFAULT_AI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_AI_MODEL: &str = "gemini-1.5-flash";
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);

/// One prompt in, one text blob out.
pub trait CompletionClient: Send + Sync {
    fn complete(&self, prompt: &str) -> ServiceResult<String>;
}

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
}

/// Client for a `generateContent` style completion API.
pub struct GeminiClient {
    config: GeminiConfig,
    agent: ureq::Agent,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(COMPLETION_TIMEOUT)
            .build();
        Self { config, agent }
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

impl CompletionClient for GeminiClient {
    fn complete(&self, prompt: &str) -> ServiceResult<String> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .agent
            .post(&self.url())
            .query("key", &self.config.api_key)
            .send_json(body)
            .map_err(|e| match e {
                ureq::Error::Status(status, _) => {
                    ServiceError::ApiError(format!("completion API returned HTTP {status}"))
                }
                other => ServiceError::NetworkError(format!("completion request failed: {other}")),
            })?;

        let payload: Value = response
            .into_json()
            .map_err(|e| ServiceError::ApiError(format!("unreadable completion response: {e}")))?;
        let text = completion_text(&payload)?;
        debug!(chars = text.len(), "Received completion");
        Ok(text)
    }
}

/// Concatenated `candidates[0].content.parts[*].text`.
pub fn completion_text(payload: &Value) -> ServiceResult<String> {
    let parts = payload
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| ServiceError::ApiError("completion response has no candidates".into()))?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        return Err(ServiceError::ApiError("completion response is empty".into()));
    }
    Ok(text)
}

/// One completion call, then weekly extraction with `form` as the fallback.
pub fn generate_weekly_plan(
    client: &dyn CompletionClient,
    prompt: &str,
    form: &WeeklyPlanForm,
) -> ServiceResult<WeeklyPlanRecord> {
    if prompt.trim().is_empty() {
        return Err(ServiceError::InvalidInput("prompt must not be empty".into()));
    }
    let text = client.complete(prompt)?;
    let record = build_weekly_plan(&text, form);
    info!(
        suspicious = record.suspicious_fields().len(),
        "Generated weekly plan"
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson_tools::types::SchoolDay;
    use mockito::{Matcher, Server};

    struct Canned(&'static str);

    impl CompletionClient for Canned {
        fn complete(&self, _prompt: &str) -> ServiceResult<String> {
            Ok(self.0.to_string())
        }
    }

    struct Unavailable;

    impl CompletionClient for Unavailable {
        fn complete(&self, _prompt: &str) -> ServiceResult<String> {
            Err(ServiceError::NetworkError("offline".into()))
        }
    }

    #[test]
    fn generation_parses_completion_and_applies_form() {
        let client = Canned("## Monday\n### Objective\nRead a short poem.\n### Procedure\nA. Listen\n");
        let form = WeeklyPlanForm {
            school: "Central School".into(),
            ..Default::default()
        };
        let record = generate_weekly_plan(&client, "Write a plan", &form).unwrap();
        assert_eq!(record.school, "Central School");
        assert_eq!(record.day(SchoolDay::Monday).objective, "Read a short poem.");
        assert_eq!(record.day(SchoolDay::Monday).steps[0], "Listen");
    }

    #[test]
    fn generation_propagates_client_errors_and_rejects_blank_prompt() {
        let form = WeeklyPlanForm::default();
        assert!(matches!(
            generate_weekly_plan(&Unavailable, "x", &form),
            Err(ServiceError::NetworkError(_))
        ));
        assert!(matches!(
            generate_weekly_plan(&Canned("x"), "  ", &form),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn completion_text_joins_parts() {
        let payload = json!({
            "candidates": [{ "content": { "parts": [{ "text": "## Mon" }, { "text": "day" }] } }]
        });
        assert_eq!(completion_text(&payload).unwrap(), "## Monday");
        assert!(completion_text(&json!({ "candidates": [] })).is_err());
    }

    #[test]
    fn gemini_client_posts_prompt_with_key() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/models/test-model:generateContent")
            .match_query(Matcher::UrlEncoded("key".into(), "secret".into()))
            .match_body(Matcher::PartialJson(json!({
                "contents": [{ "parts": [{ "text": "hello" }] }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"hi there"}]}}]}"#)
            .create();

        let client = GeminiClient::new(GeminiConfig {
            endpoint: server.url(),
            model: "test-model".into(),
            api_key: "secret".into(),
        });
        assert_eq!(client.complete("hello").unwrap(), "hi there");
        mock.assert();
    }

    #[test]
    fn gemini_client_maps_http_errors() {
        let mut server = Server::new();
        let _mock = server
            .mock("POST", "/models/m:generateContent")
            .match_query(Matcher::Any)
            .with_status(429)
            .create();

        let client = GeminiClient::new(GeminiConfig {
            endpoint: server.url(),
            model: "m".into(),
            api_key: "k".into(),
        });
        assert!(matches!(client.complete("x"), Err(ServiceError::ApiError(_))));
    }
}
