//! Conversation state and the lifecycle of one query.
//!
//! This module knows nothing about terminals or HTTP. The TUI and the
//! one-shot `ask` command both drive a [`Session`] through
//! [`Session::begin`] and [`Session::finish`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::client::QueryRequest;
use crate::error::QueryError;

pub const WELCOME_MESSAGE: &str =
    "👋 Welcome! I'm your Software Consulting AI assistant. How can I help you today?";

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    messages: Vec<ChatMessage>,
    pending: bool,
    error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::assistant(WELCOME_MESSAGE)],
            pending: false,
            error: None,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Accepts a submission and returns the request to dispatch.
    ///
    /// Returns `None` without touching any state when the trimmed input is
    /// empty or another request is still outstanding.
    pub fn begin(&mut self, input: &str, model: Option<&str>) -> Option<QueryRequest> {
        let query = input.trim();
        if query.is_empty() {
            return None;
        }
        if self.pending {
            debug!("submission rejected: request already pending");
            return None;
        }

        self.error = None;
        self.pending = true;
        self.messages.push(ChatMessage::user(query));

        info!(model = model.unwrap_or("-"), query_chars = query.chars().count(), "query submitted");

        Some(QueryRequest {
            query: query.to_string(),
            model: model.map(str::to_string),
        })
    }

    /// Resolves the outstanding request. Returns `false` if nothing was pending.
    pub fn finish(&mut self, outcome: Result<String, QueryError>) -> bool {
        if !self.pending {
            warn!("query result arrived with no request pending; dropped");
            return false;
        }

        match outcome {
            Ok(answer) => {
                info!(answer_chars = answer.chars().count(), "answer received");
                self.messages.push(ChatMessage::assistant(answer));
            }
            Err(e) => {
                warn!(error = %e, status = ?e.status(), "query failed");
                self.error = Some(e.user_message());
            }
        }

        self.pending = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FALLBACK_ERROR;
    use reqwest::StatusCode;

    fn backend_error(detail: Option<&str>) -> QueryError {
        QueryError::Backend {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.map(str::to_string),
        }
    }

    #[test]
    fn starts_with_welcome_only() {
        let session = Session::new();
        assert_eq!(session.messages(), &[ChatMessage::assistant(WELCOME_MESSAGE)]);
        assert!(!session.is_pending());
        assert_eq!(session.error(), None);
    }

    #[test]
    fn blank_input_is_a_no_op() {
        let mut session = Session::new();
        for input in ["", "   ", "\n\t "] {
            assert_eq!(session.begin(input, Some("sonar")), None);
        }
        assert_eq!(session.messages().len(), 1);
        assert!(!session.is_pending());
    }

    #[test]
    fn begin_appends_trimmed_user_message_and_builds_request() {
        let mut session = Session::new();
        let request = session.begin("  how do I scope an MVP?  ", Some("sonar-pro")).unwrap();

        assert_eq!(request.query, "how do I scope an MVP?");
        assert_eq!(request.model.as_deref(), Some("sonar-pro"));
        assert!(session.is_pending());
        assert_eq!(session.messages().len(), 2);
        assert_eq!(
            session.messages()[1],
            ChatMessage::user("how do I scope an MVP?")
        );
        assert_eq!(session.messages()[0].role, ChatRole::Assistant);
    }

    #[test]
    fn second_submission_rejected_while_pending() {
        let mut session = Session::new();
        assert!(session.begin("first", None).is_some());
        assert!(session.begin("second", None).is_none());
        assert_eq!(session.messages().len(), 2);
        assert!(session.is_pending());
    }

    #[test]
    fn success_appends_exactly_one_assistant_message() {
        let mut session = Session::new();
        session.begin("q", None).unwrap();
        assert!(session.finish(Ok("**bold**".to_string())));

        assert!(!session.is_pending());
        assert_eq!(session.error(), None);
        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.messages()[2], ChatMessage::assistant("**bold**"));
    }

    #[test]
    fn backend_failure_sets_error_without_assistant_message() {
        let mut session = Session::new();
        session.begin("q", None).unwrap();
        session.finish(Err(backend_error(Some("index unavailable"))));

        assert_eq!(session.error(), Some("index unavailable"));
        assert!(!session.is_pending());
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].role, ChatRole::User);
    }

    #[test]
    fn unreadable_failure_and_task_failure_look_the_same() {
        let mut a = Session::new();
        a.begin("q", None).unwrap();
        a.finish(Err(backend_error(None)));

        let mut b = Session::new();
        b.begin("q", None).unwrap();
        b.finish(Err(QueryError::TaskFailed("panicked".into())));

        assert_eq!(a.error(), Some(FALLBACK_ERROR));
        assert_eq!(a.error(), b.error());
        assert_eq!(a.messages(), b.messages());
    }

    #[test]
    fn next_submission_clears_previous_error() {
        let mut session = Session::new();
        session.begin("q", None).unwrap();
        session.finish(Err(backend_error(Some("boom"))));
        assert_eq!(session.error(), Some("boom"));

        // A blank retry is ignored and leaves the error visible.
        assert!(session.begin(" ", None).is_none());
        assert_eq!(session.error(), Some("boom"));

        session.begin("q again", None).unwrap();
        assert_eq!(session.error(), None);
    }

    #[test]
    fn finish_without_pending_is_ignored() {
        let mut session = Session::new();
        assert!(!session.finish(Ok("stray".into())));
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn model_only_affects_the_outgoing_request() {
        let mut session = Session::new();
        let first = session.begin("one", Some("sonar")).unwrap();
        session.finish(Ok("a1".into()));
        let before = session.messages().to_vec();

        let second = session.begin("two", Some("r1-1776")).unwrap();
        assert_eq!(first.model.as_deref(), Some("sonar"));
        assert_eq!(second.model.as_deref(), Some("r1-1776"));
        assert_eq!(&session.messages()[..before.len()], before.as_slice());
    }
}
