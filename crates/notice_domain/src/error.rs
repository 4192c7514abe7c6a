use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record::NoticeKind;

/// Failures raised while keeping a notice list in sync.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("connectivity failure: {0}")]
    Connectivity(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
    #[error("failed to release subscription: {0}")]
    Teardown(String),
}

/// The closed set of failure messages shown to users.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum UserMessage {
    Connectivity,
    AccessDenied,
    MalformedSnapshot,
}

impl UserMessage {
    pub fn render(self, kind: NoticeKind) -> String {
        let collection = kind.collection();
        match self {
            UserMessage::Connectivity => {
                format!("Failed to load {collection}. Please check your connection.")
            }
            UserMessage::AccessDenied => format!("You do not have access to {collection}."),
            UserMessage::MalformedSnapshot => {
                format!("Received {collection} data that could not be read.")
            }
        }
    }
}

/// A failure as the consumer sees it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorReport {
    pub message: UserMessage,
    pub text: String,
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Converts a sync failure into something presentable.
///
/// Teardown failures are not the consumer's concern and yield `None`; the
/// caller logs them instead.
pub fn report(error: &SyncError, kind: NoticeKind) -> Option<ErrorReport> {
    let message = match error {
        SyncError::Connectivity(_) => UserMessage::Connectivity,
        SyncError::AccessDenied(_) => UserMessage::AccessDenied,
        SyncError::MalformedSnapshot(_) => UserMessage::MalformedSnapshot,
        SyncError::Teardown(_) => return None,
    };
    Some(ErrorReport {
        message,
        text: message.render(kind),
    })
}
