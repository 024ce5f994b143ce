//! One-shot flash messages stored in the session.
//!
//! Handlers push a message before redirecting; the next rendered page takes
//! every pending message and shows it once.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::models::session_keys;

/// Severity of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Success,
    Warning,
    Error,
}

impl Level {
    /// CSS modifier used by the base template.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self {
            Self::Success => "flash-success",
            Self::Warning => "flash-warning",
            Self::Error => "flash-error",
        }
    }
}

/// A message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: Level,
    pub text: String,
}

impl FlashMessage {
    #[must_use]
    pub fn new(level: Level, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self::new(Level::Success, text)
    }

    #[must_use]
    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(Level::Warning, text)
    }

    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Level::Error, text)
    }
}

/// Queue a message for the next rendered page.
pub async fn push(session: &Session, message: FlashMessage) {
    push_all(session, vec![message]).await;
}

/// Queue several messages at once, keeping their order.
///
/// Session failures are logged and the messages are dropped.
pub async fn push_all(session: &Session, messages: Vec<FlashMessage>) {
    let mut pending: Vec<FlashMessage> = match session.get(session_keys::FLASH).await {
        Ok(pending) => pending.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read flash messages");
            Vec::new()
        }
    };
    pending.extend(messages);

    if let Err(e) = session.insert(session_keys::FLASH, pending).await {
        tracing::warn!(error = %e, "Failed to store flash messages");
    }
}

/// Remove and return every pending message.
pub async fn take(session: &Session) -> Vec<FlashMessage> {
    match session.remove::<Vec<FlashMessage>>(session_keys::FLASH).await {
        Ok(pending) => pending.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to take flash messages");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_take_drains_in_order() {
        let session = session();
        push(&session, FlashMessage::success("first")).await;
        push(&session, FlashMessage::error("second")).await;

        let messages = take(&session).await;
        assert_eq!(
            messages,
            vec![FlashMessage::success("first"), FlashMessage::error("second")]
        );
        assert!(take(&session).await.is_empty());
    }

    #[tokio::test]
    async fn test_push_all_appends_after_pending() {
        let session = session();
        push(&session, FlashMessage::warning("first")).await;
        push_all(
            &session,
            vec![FlashMessage::error("second"), FlashMessage::error("third")],
        )
        .await;

        let texts: Vec<String> = take(&session).await.into_iter().map(|m| m.text).collect();
        assert_eq!(texts, ["first", "second", "third"]);
    }

    #[test]
    fn test_level_css_class() {
        assert_eq!(Level::Warning.css_class(), "flash-warning");
        assert_eq!(Level::Error.css_class(), "flash-error");
    }
}
