//! Session state machine.
//!
//! The whole interactive surface is derived from a single [`UiState`] through the pure
//! [`project`] function. [`Session`] owns the transitions and is driven by the controller.

use crate::error::RestoreError;
use crate::model::{Preview, Restoration, SelectedFile};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UiState {
    #[default]
    Idle,
    Previewing {
        original: Preview,
    },
    Restoring {
        original: Preview,
        // Result of an earlier round trip, still shown while the new one runs.
        previous: Option<Restoration>,
    },
    Restored {
        original: Preview,
        restored: Restoration,
    },
    Error {
        original: Preview,
        previous: Option<Restoration>,
        message: String,
    },
}

impl UiState {
    pub fn name(&self) -> &'static str {
        match self {
            UiState::Idle => "Idle",
            UiState::Previewing { .. } => "Previewing",
            UiState::Restoring { .. } => "Restoring",
            UiState::Restored { .. } => "Restored",
            UiState::Error { .. } => "Error",
        }
    }

    pub fn original(&self) -> Option<&Preview> {
        match self {
            UiState::Idle => None,
            UiState::Previewing { original }
            | UiState::Restoring { original, .. }
            | UiState::Restored { original, .. }
            | UiState::Error { original, .. } => Some(original),
        }
    }

    /// Image shown in the restored pane, if any.
    pub fn restored_pane(&self) -> Option<&Restoration> {
        match self {
            UiState::Idle | UiState::Previewing { .. } => None,
            UiState::Restored { restored, .. } => Some(restored),
            UiState::Restoring { previous, .. } | UiState::Error { previous, .. } => {
                previous.as_ref()
            }
        }
    }

    /// The committed result of the latest round trip.
    pub fn restoration(&self) -> Option<&Restoration> {
        match self {
            UiState::Restored { restored, .. } => Some(restored),
            _ => None,
        }
    }

    pub fn is_restoring(&self) -> bool {
        matches!(self, UiState::Restoring { .. })
    }
}

/// Visibility of every element of the interactive surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub original_image: bool,
    pub original_placeholder: bool,
    pub restored_image: bool,
    pub restored_placeholder: bool,
    pub restore_visible: bool,
    pub restore_enabled: bool,
    pub reset_visible: bool,
    pub reset_enabled: bool,
    pub download_visible: bool,
    pub loading: bool,
}

pub fn project(state: &UiState) -> Visibility {
    let original_image = state.original().is_some();
    let restored_image = state.restored_pane().is_some();
    let armed = !matches!(state, UiState::Idle);
    let restoring = state.is_restoring();
    Visibility {
        original_image,
        original_placeholder: !original_image,
        restored_image,
        restored_placeholder: !restored_image,
        restore_visible: armed,
        restore_enabled: armed && !restoring,
        reset_visible: armed,
        reset_enabled: armed && !restoring,
        download_visible: state.restoration().is_some(),
        loading: restoring,
    }
}

/// Result of asking the session to start a restore.
#[derive(Debug, PartialEq, Eq)]
pub enum RestoreStart {
    Started { id: u64, file: SelectedFile },
    /// A request is already in flight; the trigger is disabled.
    Busy,
}

#[derive(Debug, Default)]
pub struct Session {
    selected: Option<SelectedFile>,
    state: UiState,
    in_flight: Option<u64>,
    next_id: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn selected(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    /// Load a new file. Any previous result is dropped. Returns the id of an in-flight
    /// request that is now stale and should be cancelled.
    pub fn select(&mut self, file: SelectedFile, original: Preview) -> Option<u64> {
        self.selected = Some(file);
        self.state = UiState::Previewing { original };
        self.in_flight.take()
    }

    pub fn begin_restore(&mut self) -> Result<RestoreStart, RestoreError> {
        if self.in_flight.is_some() {
            return Ok(RestoreStart::Busy);
        }
        let file = self.selected.clone().ok_or(RestoreError::NoFileSelected)?;

        let state = std::mem::take(&mut self.state);
        let (original, previous) = match state {
            UiState::Previewing { original } => (original, None),
            UiState::Restored { original, restored } => (original, Some(restored)),
            UiState::Error {
                original, previous, ..
            } => (original, previous),
            other => {
                self.state = other;
                return Err(RestoreError::NoFileSelected);
            }
        };
        self.state = UiState::Restoring { original, previous };

        self.next_id += 1;
        let id = self.next_id;
        self.in_flight = Some(id);
        Ok(RestoreStart::Started { id, file })
    }

    /// Apply the outcome of request `id`. Returns `None` for a stale request; otherwise
    /// the failure to surface, if any. The UI is interactable again afterwards.
    pub fn finish_restore(
        &mut self,
        id: u64,
        outcome: Result<Restoration, RestoreError>,
    ) -> Option<Result<(), RestoreError>> {
        if self.in_flight != Some(id) {
            return None;
        }
        self.in_flight = None;

        let (original, previous) = match std::mem::take(&mut self.state) {
            UiState::Restoring { original, previous } => (original, previous),
            other => {
                self.state = other;
                return None;
            }
        };
        match outcome {
            Ok(restored) => {
                self.state = UiState::Restored { original, restored };
                Some(Ok(()))
            }
            Err(e) => {
                self.state = UiState::Error {
                    original,
                    previous,
                    message: e.notice().text,
                };
                Some(Err(e))
            }
        }
    }

    /// Return to the initial state. Ignored while a request is in flight, because the
    /// reset control is disabled then.
    pub fn reset(&mut self) -> bool {
        if self.in_flight.is_some() {
            return false;
        }
        self.selected = None;
        self.state = UiState::Idle;
        true
    }

    /// Drop the in-flight request without a result (quit).
    pub fn abandon(&mut self) -> Option<u64> {
        let id = self.in_flight.take()?;
        if let UiState::Restoring { original, previous } = std::mem::take(&mut self.state) {
            self.state = match previous {
                Some(restored) => UiState::Restored { original, restored },
                None => UiState::Previewing { original },
            };
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Thumbnail;
    use bytes::Bytes;

    fn vis(s: &Session) -> Visibility {
        project(s.state())
    }

    /// The download target: the restored payload as a data URI.
    fn target(s: &Session) -> Option<String> {
        s.state().restoration().map(Restoration::data_uri)
    }

    fn file(name: &str) -> SelectedFile {
        SelectedFile {
            path: name.into(),
            file_name: name.into(),
            mime: "image/png".into(),
            bytes: Bytes::from_static(b"png"),
        }
    }

    fn preview(name: &str) -> Preview {
        Preview {
            file_name: name.into(),
            data_uri: format!("data:image/png;base64,{name}"),
            width: 1,
            height: 1,
            thumbnail: Thumbnail {
                width: 1,
                height: 1,
                rgb: vec![0, 0, 0],
            },
        }
    }

    fn restoration(payload: &str) -> Restoration {
        Restoration {
            payload: payload.into(),
            jpeg: Bytes::from_static(b"jpg"),
            dimensions: None,
            thumbnail: None,
        }
    }

    fn started(s: &mut Session) -> u64 {
        match s.begin_restore().expect("restore starts") {
            RestoreStart::Started { id, .. } => id,
            RestoreStart::Busy => panic!("unexpected busy"),
        }
    }

    fn initial() -> Visibility {
        project(&UiState::Idle)
    }

    #[test]
    fn initial_state_hides_every_action() {
        let v = initial();
        assert!(v.original_placeholder && v.restored_placeholder);
        assert!(!v.original_image && !v.restored_image);
        assert!(!v.restore_visible && !v.reset_visible && !v.download_visible);
        assert!(!v.loading);
    }

    #[test]
    fn every_state_shows_exactly_one_of_image_or_placeholder() {
        let states = vec![
            UiState::Idle,
            UiState::Previewing {
                original: preview("a"),
            },
            UiState::Restoring {
                original: preview("a"),
                previous: None,
            },
            UiState::Restoring {
                original: preview("a"),
                previous: Some(restoration("p")),
            },
            UiState::Restored {
                original: preview("a"),
                restored: restoration("r"),
            },
            UiState::Error {
                original: preview("a"),
                previous: None,
                message: "x".into(),
            },
        ];
        for st in &states {
            let v = project(st);
            assert_ne!(v.original_image, v.original_placeholder, "{}", st.name());
            assert_ne!(v.restored_image, v.restored_placeholder, "{}", st.name());
            assert_eq!(
                v.download_visible,
                st.restoration().is_some(),
                "{}",
                st.name()
            );
            assert_eq!(v.loading, st.is_restoring());
        }
    }

    #[test]
    fn selecting_a_file_arms_the_workflow() {
        let mut s = Session::new();
        s.select(file("cat.png"), preview("cat.png"));
        let v = vis(&s);
        assert!(v.original_image && !v.original_placeholder);
        assert!(v.restored_placeholder && !v.restored_image);
        assert!(v.restore_visible && v.restore_enabled);
        assert!(v.reset_visible && v.reset_enabled);
        assert!(!v.download_visible);
    }

    #[test]
    fn restore_without_file_is_rejected() {
        let mut s = Session::new();
        let err = s.begin_restore().unwrap_err();
        assert!(matches!(err, RestoreError::NoFileSelected));
        assert_eq!(s.state(), &UiState::Idle);
        assert!(!vis(&s).loading);
        assert_eq!(s.in_flight, None);
    }

    #[test]
    fn restoring_disables_controls_and_hides_download() {
        let mut s = Session::new();
        s.select(file("cat.png"), preview("cat.png"));
        started(&mut s);
        let v = vis(&s);
        assert!(v.loading);
        assert!(v.restore_visible && !v.restore_enabled);
        assert!(v.reset_visible && !v.reset_enabled);
        assert!(!v.download_visible);
        assert_eq!(s.begin_restore().unwrap(), RestoreStart::Busy);
        assert!(!s.reset());
    }

    #[test]
    fn success_shows_result_and_binds_download() {
        let mut s = Session::new();
        s.select(file("cat.png"), preview("cat.png"));
        let id = started(&mut s);
        let res = s.finish_restore(id, Ok(restoration("QUJD")));
        assert!(matches!(res, Some(Ok(()))));

        let v = vis(&s);
        assert!(v.restored_image && !v.restored_placeholder);
        assert!(v.original_image);
        assert!(v.download_visible);
        assert!(!v.loading && v.restore_enabled && v.reset_enabled);
        assert_eq!(
            target(&s).as_deref(),
            Some("data:image/jpeg;base64,QUJD")
        );
    }

    #[test]
    fn missing_payload_keeps_panes() {
        let mut s = Session::new();
        s.select(file("cat.png"), preview("cat.png"));
        let before = vis(&s);
        let id = started(&mut s);
        let res = s.finish_restore(
            id,
            Err(RestoreError::MissingPayload {
                message: Some("bad".into()),
            }),
        );
        let err = res.expect("not stale").unwrap_err();
        assert!(err.notice().text.contains("bad"));

        let after = vis(&s);
        assert_eq!(before, after);
        assert_eq!(s.state().name(), "Error");
    }

    #[test]
    fn failure_after_success_keeps_previous_image_but_not_download() {
        let mut s = Session::new();
        s.select(file("cat.png"), preview("cat.png"));
        let id = started(&mut s);
        s.finish_restore(id, Ok(restoration("one")));
        let id = started(&mut s);
        s.finish_restore(
            id,
            Err(RestoreError::Http {
                status: 500,
                body: "model unavailable".into(),
            }),
        );
        let v = vis(&s);
        assert!(v.restored_image);
        assert!(!v.download_visible);
        assert_eq!(target(&s), None);
        assert!(v.restore_enabled && v.reset_enabled);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut s = Session::new();
        assert!(s.reset());
        assert_eq!(vis(&s), initial());
        assert!(s.reset());
        assert_eq!(vis(&s), initial());
        assert!(s.selected().is_none());
    }

    #[test]
    fn reset_then_new_file_has_no_residue() {
        let mut s = Session::new();
        s.select(file("a.png"), preview("a.png"));
        let id = started(&mut s);
        s.finish_restore(id, Ok(restoration("aaa")));
        assert!(s.reset());
        s.select(file("b.png"), preview("b.png"));

        assert_eq!(s.state().original().map(|p| p.file_name.as_str()), Some("b.png"));
        let v = vis(&s);
        assert!(v.restored_placeholder && !v.download_visible);
        assert_eq!(target(&s), None);
        assert_eq!(s.selected().map(|f| f.file_name.as_str()), Some("b.png"));
    }

    #[test]
    fn new_selection_supersedes_in_flight_request() {
        let mut s = Session::new();
        s.select(file("a.png"), preview("a.png"));
        let id = started(&mut s);
        let stale = s.select(file("b.png"), preview("b.png"));
        assert_eq!(stale, Some(id));
        assert!(s.finish_restore(id, Ok(restoration("aaa"))).is_none());
        assert_eq!(s.state().name(), "Previewing");
        assert!(!vis(&s).restored_image);
    }

    #[test]
    fn new_selection_clears_previous_result() {
        let mut s = Session::new();
        s.select(file("a.png"), preview("a.png"));
        let id = started(&mut s);
        s.finish_restore(id, Ok(restoration("aaa")));
        assert_eq!(s.select(file("b.png"), preview("b.png")), None);
        assert!(!vis(&s).download_visible);
        assert!(vis(&s).restored_placeholder);
    }

    #[test]
    fn abandon_restores_pre_request_state() {
        let mut s = Session::new();
        s.select(file("a.png"), preview("a.png"));
        let id = started(&mut s);
        assert_eq!(s.abandon(), Some(id));
        assert_eq!(s.state().name(), "Previewing");
        assert_eq!(s.abandon(), None);
    }
}
