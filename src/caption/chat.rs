use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::caption::TextGenerator;
use crate::config::CaptionConfig;
use crate::error::GenerationError;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completion endpoint (Groq by default).
#[derive(Clone)]
pub struct ChatCompletionClient {
    http_client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl ChatCompletionClient {
    pub fn new(http_client: Client, api_key: impl Into<String>, config: &CaptionConfig) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "system", content: system }, ChatMessage { role: "user", content: user }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self.http_client.post(&self.endpoint).bearer_auth(&self.api_key).timeout(self.timeout).json(&request).send().await?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(GenerationError::Status(status.as_u16()));
        }

        let body: ChatResponse = response.json().await?;
        extract_content(body)
    }
}

fn extract_content(body: ChatResponse) -> Result<String, GenerationError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(GenerationError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub_http::{Reply, StubServer};

    fn client_for(server: &StubServer) -> ChatCompletionClient {
        let config = CaptionConfig { endpoint: server.url("/openai/v1/chat/completions"), ..CaptionConfig::default() };
        let http = Client::builder().no_proxy().build().unwrap();
        ChatCompletionClient::new(http, "gsk_testkey", &config)
    }

    #[tokio::test]
    async fn non_200_status_is_reported() {
        let server = StubServer::bind().await;
        let client = client_for(&server);
        let log = server.serve(vec![Reply::json(429, r#"{"error": {"message": "rate limited"}}"#)]);

        let result = client.complete("sys", "hi").await;

        assert!(matches!(result, Err(GenerationError::Status(429))));
        assert_eq!(log.lock().unwrap().clone(), vec!["POST /openai/v1/chat/completions"]);
    }

    #[tokio::test]
    async fn successful_completion_returns_trimmed_content() {
        let server = StubServer::bind().await;
        let client = client_for(&server);
        server.serve(vec![Reply::json(200, r#"{"choices": [{"message": {"role": "assistant", "content": " Colors in motion #art "}}]}"#)]);

        assert_eq!(client.complete("sys", "hi").await.unwrap(), "Colors in motion #art");
    }

    #[test]
    fn extracts_first_choice_trimmed() {
        let body: ChatResponse = serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":"  Nice reel #art \n"}}]}"#).unwrap();
        assert_eq!(extract_content(body).unwrap(), "Nice reel #art");
    }

    #[test]
    fn empty_choices_are_an_error() {
        let body: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(extract_content(body), Err(GenerationError::EmptyResponse)));

        let body: ChatResponse = serde_json::from_str(r#"{"choices":[{"message":{"content":"   "}}]}"#).unwrap();
        assert!(matches!(extract_content(body), Err(GenerationError::EmptyResponse)));
    }

    #[test]
    fn request_serializes_role_tagged_messages() {
        let request = ChatRequest {
            model: "llama3-8b-8192",
            messages: vec![ChatMessage { role: "system", content: "sys" }, ChatMessage { role: "user", content: "hi" }],
            max_tokens: 200,
            temperature: 0.5,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["max_tokens"], 200);
    }
}
