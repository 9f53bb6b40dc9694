use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::session::UiState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreConfig {
    pub endpoint: String,
    pub field_name: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub output_dir: PathBuf,
    pub user_agent: String,
    pub probe: bool,
}

/// The image the user picked, held verbatim until reset or replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub mime: String,
    pub bytes: Bytes,
}

/// Downscaled RGB pixels used by the terminal renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl Thumbnail {
    pub fn pixel(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 3) as usize;
        Some((self.rgb[i], self.rgb[i + 1], self.rgb[i + 2]))
    }
}

/// Displayable form of the selected file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub file_name: String,
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
    pub thumbnail: Thumbnail,
}

/// Restored image returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restoration {
    /// Base64 payload as received, whitespace-stripped.
    pub payload: String,
    pub jpeg: Bytes,
    pub dimensions: Option<(u32, u32)>,
    pub thumbnail: Option<Thumbnail>,
}

impl Restoration {
    pub fn data_uri(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.payload)
    }
}

/// JSON body of `/restore`. Every field is optional; a missing
/// `restored_image` is an application-level failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestoreResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub restored_image: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RestoreResponse {
    /// Server-supplied reason for a response without a payload.
    pub fn failure_message(&self) -> Option<String> {
        if let Some(err) = self.error.as_deref().filter(|e| !e.trim().is_empty()) {
            return Some(err.to_string());
        }
        if self.status.as_deref() == Some("error") {
            return self
                .message
                .as_deref()
                .filter(|m| !m.trim().is_empty())
                .map(str::to_string);
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeKind {
    User,
    Transport,
    Application,
    Decode,
    Io,
}

/// A blocking message the user has to dismiss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

/// Events emitted by the controller and consumed by UI/CLI layers.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    StateChanged(Box<UiState>),
    Notice(Notice),
    Info(InfoEvent),
    Saved { path: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InfoEvent {
    Message(String),
    ServerReady { message: String },
    ServerUnreachable,
    Loading { file_name: String },
    Uploading { file_name: String, bytes: u64 },
    Cancelled,
}

impl InfoEvent {
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::ServerReady { message } => format!("Server: {}", message),
            InfoEvent::ServerUnreachable => "Server did not answer the probe".to_string(),
            InfoEvent::Loading { file_name } => format!("Loading {}…", file_name),
            InfoEvent::Uploading { file_name, bytes } => {
                format!("Uploading {} ({} bytes)…", file_name, bytes)
            }
            InfoEvent::Cancelled => "Previous request cancelled".to_string(),
        }
    }
}

/// Outcome of a headless run, printed by `--json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreReport {
    pub timestamp_utc: String,
    pub endpoint: String,
    pub file: PathBuf,
    pub original_width: u32,
    pub original_height: u32,
    #[serde(default)]
    pub restored_width: Option<u32>,
    #[serde(default)]
    pub restored_height: Option<u32>,
    pub restored_bytes: u64,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    #[serde(default)]
    pub saved_to: Option<PathBuf>,
}
