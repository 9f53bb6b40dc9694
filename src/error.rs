//! Failure taxonomy for the restore workflow.
//!
//! Every anticipated failure is caught at the boundary of the action that produced it
//! and turned into a blocking [`Notice`].

use crate::model::{Notice, NoticeKind};
use std::path::PathBuf;
use thiserror::Error;

pub const SELECT_FIRST: &str = "Please select an image first!";
pub const CANNOT_CONNECT: &str =
    "Cannot connect to the restoration server, or an error occurred.";
pub const UNKNOWN_ERROR: &str = "unknown error";

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("no file selected")]
    NoFileSelected,

    #[error("could not connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("response has no restored image: {}", message.as_deref().unwrap_or(UNKNOWN_ERROR))]
    MissingPayload { message: Option<String> },

    #[error("response is not valid JSON: {0}")]
    InvalidResponse(#[source] serde_json::Error),

    #[error("restored image is not valid base64: {0}")]
    InvalidPayload(#[source] base64::DecodeError),

    #[error("cannot decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl RestoreError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        RestoreError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> NoticeKind {
        match self {
            RestoreError::NoFileSelected => NoticeKind::User,
            RestoreError::Connect { .. }
            | RestoreError::Timeout { .. }
            | RestoreError::Request(_)
            | RestoreError::Http { .. } => NoticeKind::Transport,
            RestoreError::MissingPayload { .. }
            | RestoreError::InvalidResponse(_)
            | RestoreError::InvalidPayload(_) => NoticeKind::Application,
            RestoreError::Decode { .. } => NoticeKind::Decode,
            RestoreError::Io { .. } => NoticeKind::Io,
        }
    }

    /// User-facing text for this failure.
    pub fn notice(&self) -> Notice {
        let text = match self {
            RestoreError::NoFileSelected => SELECT_FIRST.to_string(),
            RestoreError::Connect { .. }
            | RestoreError::Timeout { .. }
            | RestoreError::Request(_) => CANNOT_CONNECT.to_string(),
            RestoreError::Http { body, .. } => {
                if body.trim().is_empty() {
                    CANNOT_CONNECT.to_string()
                } else {
                    format!("Failed to process image: {}", body.trim())
                }
            }
            RestoreError::MissingPayload { message } => format!(
                "Failed to process image: {}",
                message.as_deref().unwrap_or(UNKNOWN_ERROR)
            ),
            RestoreError::InvalidResponse(_) | RestoreError::InvalidPayload(_) => {
                format!("Failed to process image: {}", self)
            }
            RestoreError::Decode { path, reason } => {
                format!("Cannot open {} as an image: {}", path.display(), reason)
            }
            RestoreError::Io { .. } => self.to_string(),
        };
        Notice {
            kind: self.kind(),
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_surfaces_body_verbatim() {
        let e = RestoreError::Http {
            status: 500,
            body: "model unavailable".into(),
        };
        let n = e.notice();
        assert_eq!(n.kind, NoticeKind::Transport);
        assert!(n.text.contains("model unavailable"));
    }

    #[test]
    fn http_error_with_empty_body_is_generic() {
        let e = RestoreError::Http {
            status: 502,
            body: "  ".into(),
        };
        assert_eq!(e.notice().text, CANNOT_CONNECT);
    }

    #[test]
    fn missing_payload_falls_back_to_unknown() {
        let e = RestoreError::MissingPayload { message: None };
        assert_eq!(e.notice().text, "Failed to process image: unknown error");
        assert_eq!(e.kind(), NoticeKind::Application);

        let e = RestoreError::MissingPayload {
            message: Some("Tidak ada file dikirim".into()),
        };
        assert!(e.notice().text.contains("Tidak ada file dikirim"));
    }

    #[test]
    fn no_file_is_a_user_error() {
        let n = RestoreError::NoFileSelected.notice();
        assert_eq!(n.kind, NoticeKind::User);
        assert_eq!(n.text, SELECT_FIRST);
    }
}
