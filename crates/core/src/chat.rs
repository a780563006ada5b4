//! Conversation state and the send/answer cycle.
//!
//! A [`ChatSession`] owns the append-only message log and a small load-state
//! machine:
//!
//! ```text
//! Idle --begin_send--> Thinking --push_chunk--> Streaming
//!   ^                     |                        |
//!   +-------finish--------+----------finish--------+
//! ```
//!
//! Only one request is in flight at a time. Sending while busy is a no-op.

use crate::config::Config;
use crate::encode::EncodedImage;
use crate::error::{AppError, Result};
use crate::prompt::TutorRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use uuid::Uuid;

/// Shown in place of an answer when the request failed.
pub const APOLOGY: &str = "Sorry, something went wrong while working on your question. Please try again.";

/// Anything that can turn a [`TutorRequest`] into an answer.
pub trait TutorBackend {
    fn answer(&self, request: TutorRequest) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One entry of the conversation. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    pub image: Option<EncodedImage>,
    pub timestamp: DateTime<Utc>,
    pub is_error: bool,
}

impl Message {
    fn new(role: Role, text: String, image: Option<EncodedImage>, is_error: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text,
            image,
            timestamp: Utc::now(),
            is_error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    /// Request sent, nothing received yet.
    Thinking,
    /// Answer chunks are arriving.
    Streaming,
}

#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<Message>,
    state: LoadState,
    draft: String,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state != LoadState::Idle
    }

    /// Partial answer received so far while streaming.
    pub fn draft(&self) -> Option<&str> {
        (self.state == LoadState::Streaming).then_some(self.draft.as_str())
    }

    /// Records the user's message and returns the request to send.
    ///
    /// Returns `None` without touching the log when a request is already in
    /// flight or there is neither a question nor an image.
    pub fn begin_send(
        &mut self,
        config: &Config,
        question: &str,
        image: Option<EncodedImage>,
    ) -> Option<TutorRequest> {
        if self.is_busy() {
            log::debug!("send ignored, a request is already in flight");
            return None;
        }

        let request = TutorRequest::new(config, question, image.clone())?;
        self.messages
            .push(Message::new(Role::User, question.trim().to_string(), image, false));
        self.state = LoadState::Thinking;
        self.draft.clear();
        log::info!("sending question to {} (image: {})", request.model, request.image.is_some());
        Some(request)
    }

    /// Appends a streamed chunk to the in-progress answer.
    pub fn push_chunk(&mut self, chunk: &str) {
        match self.state {
            LoadState::Idle => log::warn!("dropping chunk received while idle"),
            LoadState::Thinking | LoadState::Streaming => {
                self.state = LoadState::Streaming;
                self.draft.push_str(chunk);
            }
        }
    }

    /// Ends the in-flight cycle and appends the model's message.
    ///
    /// `Ok(text)` becomes the answer. An empty `Ok` after streaming takes the
    /// accumulated draft instead. Any error, or an answer that is still empty,
    /// discards the draft and appends [`APOLOGY`] flagged as an error.
    pub fn finish(&mut self, outcome: Result<String>) -> Option<&Message> {
        if !self.is_busy() {
            log::warn!("finish called with no request in flight");
            return None;
        }

        let draft = std::mem::take(&mut self.draft);
        let outcome = outcome.and_then(|text| {
            let text = if text.is_empty() { draft } else { text };
            if text.trim().is_empty() {
                Err(AppError::gemini("Empty answer received"))
            } else {
                Ok(text)
            }
        });
        let message = match outcome {
            Ok(text) => Message::new(Role::Model, text, None, false),
            Err(e) => {
                log::error!("answer failed: {e}");
                Message::new(Role::Model, APOLOGY.to_string(), None, true)
            }
        };

        self.state = LoadState::Idle;
        self.messages.push(message);
        self.messages.last()
    }

    /// Runs one complete cycle against `backend`.
    ///
    /// Returns the appended model message, or `None` if the send was rejected.
    pub async fn ask<B: TutorBackend>(
        &mut self,
        backend: &B,
        config: &Config,
        question: &str,
        image: Option<EncodedImage>,
    ) -> Option<&Message> {
        let request = self.begin_send(config, question, image)?;
        let outcome = backend.answer(request).await;
        self.finish(outcome)
    }

    /// Drops the conversation. Ignored while a request is in flight.
    pub fn clear(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        self.messages.clear();
        true
    }

    /// Serializes the conversation for saving.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.messages)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode_bytes;
    use std::sync::Mutex;

    struct FakeBackend {
        reply: fn() -> Result<String>,
        seen: Mutex<Vec<TutorRequest>>,
    }

    impl FakeBackend {
        fn new(reply: fn() -> Result<String>) -> Self {
            Self { reply, seen: Mutex::new(Vec::new()) }
        }
    }

    impl TutorBackend for FakeBackend {
        fn answer(&self, request: TutorRequest) -> impl Future<Output = Result<String>> + Send {
            self.seen.lock().unwrap().push(request);
            let reply = (self.reply)();
            async move { reply }
        }
    }

    fn config() -> Config {
        Config::builder().with_api_key("key").build().unwrap()
    }

    #[tokio::test]
    async fn successful_cycle_appends_answer() {
        let _ = env_logger::builder().is_test(true).try_init();
        let backend = FakeBackend::new(|| Ok("**4**".to_string()));
        let mut session = ChatSession::new();

        let answer = session.ask(&backend, &config(), "2 + 2?", None).await.unwrap();
        assert_eq!(answer.role, Role::Model);
        assert_eq!(answer.text, "**4**");
        assert!(!answer.is_error);

        assert_eq!(session.state(), LoadState::Idle);
        let roles: Vec<_> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Model]);
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failure_appends_apology() {
        let backend = FakeBackend::new(|| Err(AppError::gemini("boom")));
        let mut session = ChatSession::new();

        let answer = session.ask(&backend, &config(), "help", None).await.unwrap();
        assert!(answer.is_error);
        assert_eq!(answer.text, APOLOGY);
        assert_eq!(session.state(), LoadState::Idle);
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn send_while_thinking_is_a_no_op() {
        let mut session = ChatSession::new();
        assert!(session.begin_send(&config(), "first", None).is_some());
        assert_eq!(session.state(), LoadState::Thinking);

        assert!(session.begin_send(&config(), "second", None).is_none());
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.state(), LoadState::Thinking);
    }

    #[test]
    fn empty_send_is_rejected() {
        let mut session = ChatSession::new();
        assert!(session.begin_send(&config(), "   ", None).is_none());
        assert!(session.messages().is_empty());
        assert_eq!(session.state(), LoadState::Idle);
    }

    #[test]
    fn image_travels_with_user_message() {
        let mut session = ChatSession::new();
        let image = encode_bytes(b"photo", "image/jpeg");
        let request = session.begin_send(&config(), "", Some(image.clone())).unwrap();
        assert_eq!(request.image.as_ref(), Some(&image));
        assert_eq!(session.messages()[0].image.as_ref(), Some(&image));
    }

    #[test]
    fn streaming_builds_a_draft_outside_the_log() {
        let mut session = ChatSession::new();
        session.begin_send(&config(), "explain", None).unwrap();
        assert_eq!(session.draft(), None);

        session.push_chunk("Step 1. ");
        session.push_chunk("Step 2.");
        assert_eq!(session.state(), LoadState::Streaming);
        assert_eq!(session.draft(), Some("Step 1. Step 2."));
        assert_eq!(session.messages().len(), 1);

        let answer = session.finish(Ok(String::new())).unwrap();
        assert_eq!(answer.text, "Step 1. Step 2.");
        assert_eq!(session.state(), LoadState::Idle);
        assert_eq!(session.draft(), None);
    }

    #[test]
    fn stream_error_discards_partial_answer() {
        let mut session = ChatSession::new();
        session.begin_send(&config(), "explain", None).unwrap();
        session.push_chunk("half an ans");
        let answer = session.finish(Err(AppError::gemini("reset"))).unwrap();
        assert!(answer.is_error);
        assert_eq!(answer.text, APOLOGY);
    }

    #[test]
    fn empty_answer_is_an_error() {
        let mut session = ChatSession::new();
        session.begin_send(&config(), "explain", None).unwrap();
        let answer = session.finish(Ok(String::new())).unwrap();
        assert!(answer.is_error);
    }

    #[test]
    fn finish_without_request_is_ignored() {
        let mut session = ChatSession::new();
        assert!(session.finish(Ok("stray".into())).is_none());
        session.push_chunk("stray");
        assert!(session.messages().is_empty());
    }

    #[test]
    fn clear_waits_for_idle() {
        let mut session = ChatSession::new();
        session.begin_send(&config(), "q", None).unwrap();
        assert!(!session.clear());
        session.finish(Ok("a".into()));
        assert!(session.clear());
        assert!(session.messages().is_empty());
    }

    #[test]
    fn transcript_serializes_roles() {
        let mut session = ChatSession::new();
        session.begin_send(&config(), "q", None).unwrap();
        session.finish(Ok("a".into()));
        let json = session.to_json().unwrap();
        assert!(json.contains("\"role\": \"user\""));
        assert!(json.contains("\"role\": \"model\""));
    }
}
