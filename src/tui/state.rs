use crate::model::{ControllerEvent, Notice, Restoration};
use crate::session::{project, UiState, Visibility};
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};
use std::path::PathBuf;

pub struct TuiState {
    pub tab: usize,
    /// Latest snapshot published by the controller.
    pub view: UiState,
    pub info: String,
    /// Blocking notice; every key press dismisses it first.
    pub notice: Option<Notice>,
    /// Path being typed into the open prompt.
    pub prompt: Option<String>,
    pub last_saved: Option<PathBuf>,
    pub server: Option<String>,
    pub endpoint: String,
    pub output_dir: PathBuf,
}

impl Default for TuiState {
    fn default() -> Self {
        Self {
            tab: 0,
            view: UiState::Idle,
            info: String::new(),
            notice: None,
            prompt: None,
            last_saved: None,
            server: None,
            endpoint: String::new(),
            output_dir: PathBuf::new(),
        }
    }
}

impl TuiState {
    pub fn visibility(&self) -> Visibility {
        project(&self.view)
    }

    /// The restored image as a `data:` URI, only while it can be downloaded.
    pub fn download_target(&self) -> Option<String> {
        self.view
            .restoration()
            .filter(|_| self.visibility().download_visible)
            .map(Restoration::data_uri)
    }

    /// Fold a controller event into the UI state.
    pub fn apply(&mut self, ev: ControllerEvent) {
        match ev {
            ControllerEvent::StateChanged(s) => {
                if matches!(*s, UiState::Idle) {
                    self.last_saved = None;
                }
                self.view = *s;
                self.info = match &self.view {
                    UiState::Idle => "Press o to open an image".into(),
                    UiState::Previewing { original } => format!("Loaded {}", original.file_name),
                    UiState::Restoring { .. } => "Restoring…".into(),
                    UiState::Restored { .. } => "Restored. Press d to download".into(),
                    UiState::Error { message, .. } => message.clone(),
                };
            }
            ControllerEvent::Notice(n) => {
                self.notice = Some(n);
            }
            ControllerEvent::Info(info) => {
                if let crate::model::InfoEvent::ServerReady { message } = &info {
                    self.server = Some(message.clone());
                }
                self.info = info.to_message();
            }
            ControllerEvent::Saved { path } => {
                self.info = format!("Saved: {}", path.display());
                self.last_saved = Some(path);
            }
        }
    }
}

pub fn push_wrapped_status_kv(
    out: &mut Vec<Line<'static>>,
    label: &str,
    value: &str,
    status_area_width: u16,
) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = status_area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let chars_to_take = (remaining.len() as u16).min(line_width) as usize;
        let (line_chars, rest) = remaining.split_at(chars_to_take);
        let line_text: String = line_chars.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::raw(line_text),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![Span::raw("  "), Span::raw(line_text)]));
        }

        remaining = rest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InfoEvent, NoticeKind};

    #[test]
    fn notice_is_held_until_dismissed() {
        let mut s = TuiState::default();
        s.apply(ControllerEvent::Notice(Notice {
            kind: NoticeKind::User,
            text: crate::error::SELECT_FIRST.into(),
        }));
        assert_eq!(s.notice.as_ref().map(|n| n.kind), Some(NoticeKind::User));
        s.apply(ControllerEvent::Info(InfoEvent::Message("x".into())));
        assert!(s.notice.is_some());
    }

    #[test]
    fn saved_then_reset_forgets_path() {
        let mut s = TuiState::default();
        s.apply(ControllerEvent::Saved {
            path: "/tmp/cat_restored.jpg".into(),
        });
        assert_eq!(s.info, "Saved: /tmp/cat_restored.jpg");
        assert!(s.last_saved.is_some());
        s.apply(ControllerEvent::StateChanged(Box::new(UiState::Idle)));
        assert!(s.last_saved.is_none());
        assert_eq!(s.visibility(), project(&UiState::Idle));
    }

    fn restored_view() -> UiState {
        let thumbnail = crate::model::Thumbnail {
            width: 1,
            height: 1,
            rgb: vec![0, 0, 0],
        };
        UiState::Restored {
            original: crate::model::Preview {
                file_name: "cat.png".into(),
                data_uri: "data:image/png;base64,".into(),
                width: 1,
                height: 1,
                thumbnail,
            },
            restored: Restoration {
                payload: "QUJD".into(),
                jpeg: bytes::Bytes::from_static(b"ABC"),
                dimensions: None,
                thumbnail: None,
            },
        }
    }

    #[test]
    fn download_target_follows_visibility() {
        let mut s = TuiState::default();
        assert_eq!(s.download_target(), None);
        s.apply(ControllerEvent::StateChanged(Box::new(restored_view())));
        assert_eq!(
            s.download_target().as_deref(),
            Some("data:image/jpeg;base64,QUJD")
        );
        s.apply(ControllerEvent::StateChanged(Box::new(UiState::Idle)));
        assert_eq!(s.download_target(), None);
    }

    #[test]
    fn server_banner_is_kept() {
        let mut s = TuiState::default();
        s.apply(ControllerEvent::Info(InfoEvent::ServerReady {
            message: "API ready".into(),
        }));
        assert_eq!(s.server.as_deref(), Some("API ready"));
    }

    #[test]
    fn wrapped_kv_splits_long_values() {
        let mut out = Vec::new();
        push_wrapped_status_kv(&mut out, "Saved", &"x".repeat(30), 20);
        assert!(out.len() > 1);
        let mut empty = Vec::new();
        push_wrapped_status_kv(&mut empty, "Saved", "   ", 20);
        assert!(empty.is_empty());
    }
}
