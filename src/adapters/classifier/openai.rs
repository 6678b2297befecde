//! OpenAI-compatible remote classifier.
//!
//! Sends the client's message plus the allowed intents to a chat-completions
//! endpoint and asks for a JSON verdict `{"intent": ..., "confidence": ...}`.
//! Works with any server speaking the same API (Azure, local gateways).
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenAiClassifierConfig::new(api_key)
//!     .with_model("gpt-4o-mini")
//!     .with_base_url("https://api.openai.com/v1");
//!
//! let classifier = OpenAiIntentClassifier::new(config)?;
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::domain::classification::{ClassificationResult, Intent, TierSource};
use crate::ports::{ClassificationError, ClassificationRequest, IntentClassifier};

/// Context keys forwarded to the model as background.
const CONTEXT_HINT_KEYS: &[&str] = &["client_name", "balance", "current_state"];

#[derive(Debug, Clone)]
pub struct OpenAiClassifierConfig {
    api_key: Secret<String>,
    pub model: String,
    pub base_url: String,
    /// Transport-level timeout. The cascade enforces its own, usually shorter, deadline.
    pub timeout: Duration,
}

impl OpenAiClassifierConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn from_secret(api_key: Secret<String>) -> Self {
        Self {
            api_key,
            ..Self::new(String::new())
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

pub struct OpenAiIntentClassifier {
    config: OpenAiClassifierConfig,
    client: Client,
}

impl OpenAiIntentClassifier {
    pub fn new(config: OpenAiClassifierConfig) -> Result<Self, ClassificationError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClassificationError::Unavailable(format!("HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn to_chat_request(&self, request: &ClassificationRequest) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt(request),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.text.clone(),
                },
            ],
            temperature: 0.0,
            max_tokens: 60,
            response_format: ResponseFormat {
                kind: "json_object".to_string(),
            },
        }
    }

    async fn handle_response_status(response: Response) -> Result<Response, ClassificationError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 | 403 => Err(ClassificationError::AuthenticationFailed),
            429 => Err(ClassificationError::RateLimited {
                retry_after_secs: parse_retry_after(&body),
            }),
            500..=599 => Err(ClassificationError::Unavailable(format!(
                "server error {}: {}",
                status, body
            ))),
            _ => Err(ClassificationError::network(format!(
                "unexpected status {}: {}",
                status, body
            ))),
        }
    }
}

#[async_trait]
impl IntentClassifier for OpenAiIntentClassifier {
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<Option<ClassificationResult>, ClassificationError> {
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(self.config.api_key())
            .timeout(request.deadline.min(self.config.timeout))
            .json(&self.to_chat_request(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassificationError::Timeout {
                        after_ms: request.deadline.as_millis() as u64,
                    }
                } else {
                    ClassificationError::network(e.to_string())
                }
            })?;

        let response = Self::handle_response_status(response).await?;
        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClassificationError::malformed(format!("response body: {}", e)))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ClassificationError::malformed("no choices in response"))?;

        debug!(model = %self.config.model, raw = %content, "Remote classifier replied");
        parse_verdict(&content, request)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

fn system_prompt(request: &ClassificationRequest) -> String {
    let allowed: Vec<&str> = request.expected.iter().map(Intent::as_str).collect();
    let mut prompt = String::from(
        "You classify short customer messages from a debt negotiation chat. \
         Reply with a JSON object {\"intent\": string, \"confidence\": number between 0 and 1}. ",
    );
    if allowed.is_empty() {
        prompt.push_str("Use an upper-case intent label. ");
    } else {
        prompt.push_str(&format!(
            "The intent must be one of: {}. Use \"NONE\" if none applies. ",
            allowed.join(", ")
        ));
    }

    let hints: Vec<String> = CONTEXT_HINT_KEYS
        .iter()
        .filter_map(|key| request.context.get(key).map(|v| format!("{}={}", key, v)))
        .collect();
    if !hints.is_empty() {
        prompt.push_str(&format!("Conversation context: {}.", hints.join(", ")));
    }
    prompt
}

#[derive(Debug, Deserialize)]
struct Verdict {
    intent: String,
    #[serde(default)]
    confidence: Option<f64>,
}

fn parse_verdict(
    content: &str,
    request: &ClassificationRequest,
) -> Result<Option<ClassificationResult>, ClassificationError> {
    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let verdict: Verdict = serde_json::from_str(trimmed)
        .map_err(|e| ClassificationError::malformed(format!("verdict '{}': {}", trimmed, e)))?;

    let intent = Intent::new(&verdict.intent);
    if intent.as_str() == "NONE" || intent.as_str().is_empty() || !request.accepts(&intent) {
        return Ok(None);
    }
    let confidence = verdict.confidence.unwrap_or(0.5);
    Ok(Some(ClassificationResult::new(intent, confidence, TierSource::Remote)))
}

fn parse_retry_after(body: &str) -> u32 {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error")?.get("message")?.as_str().map(str::to_string))
        .and_then(|message| {
            let rest = &message[message.find("try again in ")? + 13..];
            let end = rest.find(|c: char| !c.is_ascii_digit())?;
            rest[..end].parse().ok()
        })
        .unwrap_or(30)
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::classification::intents;
    use crate::domain::conversation::Context;

    fn request(expected: &[&str]) -> ClassificationRequest {
        ClassificationRequest::new(
            "claro que si",
            expected.iter().map(Intent::new).collect(),
            Duration::from_secs(5),
        )
    }

    mod verdicts {
        use super::*;

        #[test]
        fn parses_plain_json() {
            let result = parse_verdict(
                r#"{"intent": "confirmation", "confidence": 0.93}"#,
                &request(&[intents::CONFIRMATION, intents::REJECTION]),
            )
            .unwrap()
            .unwrap();
            assert!(result.is(intents::CONFIRMATION));
            assert_eq!(result.confidence, 0.93);
            assert_eq!(result.source, TierSource::Remote);
        }

        #[test]
        fn strips_code_fences() {
            let result = parse_verdict(
                "```json\n{\"intent\": \"REJECTION\", \"confidence\": 0.8}\n```",
                &request(&[]),
            )
            .unwrap();
            assert!(result.unwrap().is(intents::REJECTION));
        }

        #[test]
        fn unexpected_intent_is_no_match() {
            let result = parse_verdict(
                r#"{"intent": "DEBT_INQUIRY", "confidence": 0.9}"#,
                &request(&[intents::CONFIRMATION]),
            )
            .unwrap();
            assert!(result.is_none());
        }

        #[test]
        fn none_label_is_no_match() {
            let result = parse_verdict(r#"{"intent": "NONE"}"#, &request(&[])).unwrap();
            assert!(result.is_none());
        }

        #[test]
        fn garbage_is_malformed() {
            let err = parse_verdict("I think yes", &request(&[])).unwrap_err();
            assert!(matches!(err, ClassificationError::Malformed(_)));
        }
    }

    mod prompts {
        use super::*;

        #[test]
        fn prompt_lists_expected_intents_and_context() {
            let mut context = Context::new();
            context.insert("client_name", "Ana");
            let req = request(&[intents::CONFIRMATION, intents::REJECTION]).with_context(context);

            let prompt = system_prompt(&req);

            assert!(prompt.contains("CONFIRMATION, REJECTION"));
            assert!(prompt.contains("client_name=\"Ana\""));
        }

        #[test]
        fn chat_request_sends_text_as_user_message() {
            let classifier =
                OpenAiIntentClassifier::new(OpenAiClassifierConfig::new("sk-test")).unwrap();
            let chat = classifier.to_chat_request(&request(&[]));
            assert_eq!(chat.messages[1].role, "user");
            assert_eq!(chat.messages[1].content, "claro que si");
            assert_eq!(chat.response_format.kind, "json_object");
        }
    }

    #[test]
    fn retry_after_is_parsed_from_error_message() {
        let body = r#"{"error": {"message": "Rate limit reached. Please try again in 12s."}}"#;
        assert_eq!(parse_retry_after(body), 12);
        assert_eq!(parse_retry_after("not json"), 30);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = OpenAiClassifierConfig::new("k").with_base_url("http://localhost:8080/v1/");
        let classifier = OpenAiIntentClassifier::new(config).unwrap();
        assert_eq!(classifier.completions_url(), "http://localhost:8080/v1/chat/completions");
    }
}
