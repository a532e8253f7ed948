//! AI tutor: topic explanations and generated tests, one conversation per thread.

pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};
use ts_rs::TS;

pub use openai::OpenAiChat;

pub const DEFAULT_TEST_PROMPT: &str = "Yes, please create a test.";

const EXPLAIN_PROMPT: &str = r#"You are a patient university tutor.
Explain the topic the student gives you clearly and accurately, at the level of an undergraduate course.

Respond with valid JSON only, no markdown, in exactly this shape:
{
  "topic": "the topic as you understood it",
  "explanation": "a clear explanation in a few short paragraphs",
  "examples": ["one or more worked examples"],
  "understanding_check": "a question asking whether the student would like a short test on this topic"
}"#;

const TEST_PROMPT: &str = r#"You are an exam writer for a university course.
Using only the topics discussed earlier in this conversation, write a short test.

Respond with valid JSON only, no markdown, in exactly this shape:
{
  "title": "test title",
  "questions": [
    {
      "question": "question text",
      "options": ["A", "B", "C", "D"],
      "answer": "the correct option",
      "explanation": "why that option is correct"
    }
  ]
}
Write between 3 and 5 questions."#;

#[derive(Debug, thiserror::Error)]
pub enum TutorError {
    #[error("topic cannot be empty")]
    EmptyTopic,
    #[error("conversation thread {0} not found")]
    UnknownThread(String),
    #[error("tutor request failed")]
    Request(#[from] reqwest::Error),
    #[error("tutor model returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("tutor model returned no message")]
    EmptyResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_owned(),
            content: content.to_owned(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_owned(),
            content: content.to_owned(),
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: "assistant".to_owned(),
            content: content.to_owned(),
        }
    }
}

/// A chat model that completes a conversation with one reply.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, TutorError>;

    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct TutorReply {
    pub thread_id: String,
    /// The model's JSON, or an `error`/`raw_response` object when it was not JSON.
    #[ts(type = "Record<string, unknown>")]
    pub response: Value,
}

/// Strip markdown fences and surrounding prose from a model reply.
pub fn sanitize_json(raw: &str) -> &str {
    let trimmed = raw.trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        let body = match rest.rfind("```") {
            Some(end) => &rest[..end],
            None => rest,
        };
        return body.trim();
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// Parse a model reply, falling back to an error object that keeps the raw text.
pub fn parse_reply(raw: &str) -> Value {
    match serde_json::from_str::<Value>(sanitize_json(raw)) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, raw = %raw.chars().take(200).collect::<String>(), "tutor reply was not JSON");
            json!({
                "error": "Failed to parse agent's JSON response.",
                "raw_response": raw,
            })
        }
    }
}

pub struct Tutor {
    backend: Arc<dyn ChatBackend>,
    threads: DashMap<String, Vec<ChatMessage>>,
}

impl Tutor {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            threads: DashMap::new(),
        }
    }

    pub fn describe(&self) -> String {
        self.backend.describe()
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Explain `topic`, continuing `thread_id` when given or starting a new thread.
    #[instrument(skip_all, fields(thread_id = thread_id.as_deref().unwrap_or("new")))]
    pub async fn explain(&self, topic: &str, thread_id: Option<String>) -> Result<TutorReply, TutorError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(TutorError::EmptyTopic);
        }
        let thread_id = thread_id
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| ulid::Ulid::new().to_string());
        let history = self.history(&thread_id).unwrap_or_default();
        let reply = self.converse(&thread_id, EXPLAIN_PROMPT, history, topic).await?;
        info!(thread_id = %thread_id, "topic explained");
        Ok(reply)
    }

    /// Write a test on whatever the thread has covered so far.
    #[instrument(skip_all, fields(thread_id = %thread_id))]
    pub async fn create_test(&self, thread_id: &str, prompt: Option<&str>) -> Result<TutorReply, TutorError> {
        let history = self
            .history(thread_id)
            .ok_or_else(|| TutorError::UnknownThread(thread_id.to_owned()))?;
        let prompt = prompt
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_TEST_PROMPT);
        let reply = self.converse(thread_id, TEST_PROMPT, history, prompt).await?;
        info!(thread_id, "test created");
        Ok(reply)
    }

    fn history(&self, thread_id: &str) -> Option<Vec<ChatMessage>> {
        self.threads.get(thread_id).map(|h| h.value().clone())
    }

    async fn converse(
        &self,
        thread_id: &str,
        system: &str,
        history: Vec<ChatMessage>,
        message: &str,
    ) -> Result<TutorReply, TutorError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system));
        messages.extend(history);
        messages.push(ChatMessage::user(message));

        let raw = self.backend.complete(&messages).await?;

        let mut thread = self.threads.entry(thread_id.to_owned()).or_default();
        thread.push(ChatMessage::user(message));
        thread.push(ChatMessage::assistant(&raw));
        drop(thread);

        Ok(TutorReply {
            thread_id: thread_id.to_owned(),
            response: parse_reply(&raw),
        })
    }
}
