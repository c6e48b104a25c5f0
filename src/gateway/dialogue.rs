//! Chat-completion dialogue generation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::DialogueConfig;
use crate::gateway::{DialogueModel, DialogueRequest};
use crate::{Error, Result};

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Generates tutor turns with the OpenAI chat completion API
///
/// Requests JSON-object output; the raw text still goes back to the caller
/// unparsed so turn handling can decide what counts as well-formed.
#[derive(Debug)]
pub struct ChatDialogue {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl ChatDialogue {
    /// Create a chat-completion dialogue provider
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, config: &DialogueConfig) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for dialogue generation".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Flatten a request into chat messages: system, prior pairs, new input
    fn messages(request: &DialogueRequest) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(request.context.len() * 2 + 2);
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: request.system_instruction.clone(),
        });
        for pair in &request.context {
            messages.push(ChatMessage {
                role: "user".to_string(),
                content: pair.user.clone(),
            });
            messages.push(ChatMessage {
                role: "assistant".to_string(),
                content: pair.reply.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.user_text.clone(),
        });
        messages
    }
}

#[async_trait]
impl DialogueModel for ChatDialogue {
    async fn generate(&self, request: &DialogueRequest) -> Result<String> {
        tracing::debug!(
            context_pairs = request.context.len(),
            "requesting chat completion"
        );

        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: Self::messages(request),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object".to_string(),
            },
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Dialogue(format!("chat completion request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat completion error");
            return Err(Error::Dialogue(format!(
                "chat completion error {status}: {body}"
            )));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Dialogue(format!("failed to parse chat completion: {e}")))?;

        result
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| Error::Dialogue("chat completion had no content".to_string()))
    }
}
