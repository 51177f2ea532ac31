use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::agent::{ChatModel, Completion, CompletionRequest};
use crate::errors::AppError;
use crate::models::Citation;

const PROVIDER: &str = "perplexity";

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f64,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    search_results: Vec<WireSearchResult>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireSearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
}

/// Client for Perplexity's OpenAI-compatible chat completions endpoint.
/// Search results returned alongside the answer become citations.
pub struct PerplexityClient {
    http: Option<HttpClient>,
    api_url: String,
    model: String,
}

impl PerplexityClient {
    /// Without an API key the client is built but every call reports the model as unavailable.
    pub fn new(api_key: Option<String>, api_url: &str, model: &str) -> Result<Self, AppError> {
        let http = match api_key {
            Some(key) => {
                let mut headers = HeaderMap::new();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {key}"))
                        .map_err(|e| AppError::Config(format!("Invalid PERPLEXITY_API_KEY: {e}")))?,
                );
                let client = HttpClient::builder()
                    .default_headers(headers)
                    .build()
                    .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {e}")))?;
                Some(client)
            }
            None => None,
        };

        Ok(Self { http, api_url: api_url.to_string(), model: model.to_string() })
    }

    fn messages(request: &CompletionRequest) -> Vec<WireMessage> {
        let mut messages = Vec::with_capacity(request.history.len() * 2 + 2);
        if let Some(system) = &request.system {
            messages.push(WireMessage { role: "system".into(), content: system.clone() });
        }
        for turn in &request.history {
            messages.push(WireMessage { role: "user".into(), content: turn.q.clone() });
            messages.push(WireMessage { role: "assistant".into(), content: turn.a.clone() });
        }
        messages.push(WireMessage { role: "user".into(), content: request.prompt.clone() });
        messages
    }
}

fn into_completion(body: WireResponse) -> Result<Completion, AppError> {
    let content = body
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| AppError::InferenceError { message: "Response contained no choices".into() })?;

    let citations = body
        .search_results
        .into_iter()
        .filter(|r| !r.title.is_empty() || !r.url.is_empty())
        .map(|r| Citation { title: r.title, url: r.url })
        .collect();

    Ok(Completion { content, citations })
}

#[async_trait]
impl ChatModel for PerplexityClient {
    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, AppError> {
        let http = self.http.as_ref().ok_or_else(|| AppError::ModelUnavailable {
            provider: PROVIDER.to_string(),
            reason: "PERPLEXITY_API_KEY is not configured".to_string(),
        })?;

        let payload = WireRequest {
            model: &self.model,
            messages: Self::messages(&request),
            temperature: request.temperature,
            stream: false,
        };

        let response = http.post(&self.api_url).json(&payload).send().await.map_err(|e| {
            error!("Perplexity request failed: {e}");
            AppError::ModelUnavailable { provider: PROVIDER.to_string(), reason: e.to_string() }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("Perplexity API error: {status} - {text}");
            return Err(AppError::InferenceError { message: format!("Perplexity returned {status}") });
        }

        let body: WireResponse = response.json().await.map_err(|e| AppError::InferenceError {
            message: format!("Unreadable Perplexity response: {e}"),
        })?;

        let completion = into_completion(body)?;
        debug!(
            chars = completion.content.len(),
            citations = completion.citations.len(),
            "Perplexity answered"
        );
        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConversationTurn;

    #[test]
    fn messages_replay_history_between_system_and_prompt() {
        let req = CompletionRequest::new("now?")
            .with_system("be brief")
            .with_history(&[ConversationTurn { q: "before?".into(), a: "yes".into() }]);
        let roles: Vec<String> =
            PerplexityClient::messages(&req).into_iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    }

    #[test]
    fn response_parsing_collects_citations() {
        let raw = r#"{
            "choices": [{"message": {"role": "assistant", "content": "42"}}],
            "search_results": [
                {"title": "Guide", "url": "https://example.com/guide"},
                {"title": "", "url": ""}
            ]
        }"#;
        let body: WireResponse = serde_json::from_str(raw).unwrap();
        let completion = into_completion(body).unwrap();
        assert_eq!(completion.content, "42");
        assert_eq!(
            completion.citations,
            vec![Citation { title: "Guide".into(), url: "https://example.com/guide".into() }]
        );
    }

    #[test]
    fn response_without_search_results_is_fine() {
        let raw = r#"{"choices": [{"message": {"role": "assistant", "content": "ok"}}]}"#;
        let body: WireResponse = serde_json::from_str(raw).unwrap();
        assert!(into_completion(body).unwrap().citations.is_empty());
    }

    #[tokio::test]
    async fn missing_key_reports_unavailable() {
        let client = PerplexityClient::new(None, "http://localhost:1", "sonar").unwrap();
        let err = client.complete(CompletionRequest::new("hi")).await.unwrap_err();
        assert!(err.is_model_unavailable());
    }
}
