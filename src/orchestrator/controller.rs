//! UI controller.
//!
//! Owns the session, runs file decodes and restoration requests, and emits events for
//! presentation layers. Commands are handled strictly in the order they arrive.

use crate::engine::{load_selection, CancelToken, RestoreClient};
use crate::error::RestoreError;
use crate::model::{ControllerEvent, InfoEvent, NoticeKind, Restoration, RestoreConfig};
use crate::session::{RestoreStart, Session};
use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    SelectFile(PathBuf),
    Restore,
    Reset,
    /// Save the current result; `None` uses the configured output directory.
    Download(Option<PathBuf>),
    Quit,
}

type RestoreOutcome = Option<Result<Restoration, RestoreError>>;

/// Internal handle for the in-flight restoration request.
struct RequestCtx {
    id: u64,
    cancel: CancelToken,
    handle: Option<tokio::task::JoinHandle<RestoreOutcome>>,
}

impl RequestCtx {
    fn cancel(mut self) {
        self.cancel.cancel();
        // The task ends on its own once it observes the token.
        self.handle.take();
    }
}

fn start_request(client: &RestoreClient, id: u64, file: crate::model::SelectedFile) -> RequestCtx {
    let cancel = CancelToken::new();
    let client = client.clone();
    let token = cancel.clone();
    let handle = tokio::spawn(async move { client.restore_cancellable(&file, &token).await });
    RequestCtx {
        id,
        cancel,
        handle: Some(handle),
    }
}

fn emit_state(event_tx: &UnboundedSender<ControllerEvent>, session: &Session) {
    let _ = event_tx.send(ControllerEvent::StateChanged(Box::new(
        session.state().clone(),
    )));
}

fn emit_error(event_tx: &UnboundedSender<ControllerEvent>, e: &RestoreError) {
    match e.kind() {
        NoticeKind::User => tracing::debug!("rejected: {e}"),
        _ => tracing::error!("{e:#}"),
    }
    let _ = event_tx.send(ControllerEvent::Notice(e.notice()));
}

/// Drive the session from UI commands until quit or until the command channel closes.
pub(crate) async fn run_controller(
    cfg: &RestoreConfig,
    event_tx: UnboundedSender<ControllerEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let client = RestoreClient::new(cfg)?;
    let mut session = Session::new();
    let mut request: Option<RequestCtx> = None;

    emit_state(&event_tx, &session);

    if cfg.probe {
        let probe_client = client.clone();
        let probe_tx = event_tx.clone();
        tokio::spawn(async move {
            let info = match probe_client.probe().await {
                Ok(message) => InfoEvent::ServerReady { message },
                Err(e) => {
                    tracing::warn!("server probe failed: {e:#}");
                    InfoEvent::ServerUnreachable
                }
            };
            let _ = probe_tx.send(ControllerEvent::Info(info));
        });
    }

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::SelectFile(path)) => {
                        if path.as_os_str().is_empty() {
                            continue;
                        }
                        let file_name = path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default();
                        let _ = event_tx.send(ControllerEvent::Info(InfoEvent::Loading { file_name }));
                        match load_selection(&path).await {
                            Ok((file, preview)) => {
                                tracing::info!(file = %path.display(), width = preview.width, height = preview.height, "image selected");
                                if let Some(stale) = session.select(file, preview) {
                                    if let Some(ctx) = request.take() {
                                        debug_assert_eq!(ctx.id, stale);
                                        ctx.cancel();
                                    }
                                    tracing::info!(request = stale, "cancelled stale restoration request");
                                    let _ = event_tx.send(ControllerEvent::Info(InfoEvent::Cancelled));
                                }
                                emit_state(&event_tx, &session);
                            }
                            Err(e) => emit_error(&event_tx, &e),
                        }
                    }
                    Some(UiCommand::Restore) => match session.begin_restore() {
                        Ok(RestoreStart::Started { id, file }) => {
                            let _ = event_tx.send(ControllerEvent::Info(InfoEvent::Uploading {
                                file_name: file.file_name.clone(),
                                bytes: file.bytes.len() as u64,
                            }));
                            request = Some(start_request(&client, id, file));
                            emit_state(&event_tx, &session);
                        }
                        Ok(RestoreStart::Busy) => {
                            tracing::debug!("restore ignored: request already in flight");
                        }
                        Err(e) => emit_error(&event_tx, &e),
                    },
                    Some(UiCommand::Reset) => {
                        if session.reset() {
                            emit_state(&event_tx, &session);
                        } else {
                            tracing::debug!("reset ignored: request in flight");
                        }
                    }
                    Some(UiCommand::Download(target)) => {
                        let Some(restored) = session.state().restoration().cloned() else {
                            tracing::debug!("download ignored: no restoration result");
                            continue;
                        };
                        let original = session
                            .selected()
                            .map(|f| f.file_name.clone())
                            .unwrap_or_default();
                        match super::download::save_restoration(
                            &restored,
                            target.as_deref(),
                            &cfg.output_dir,
                            &original,
                        )
                        .await
                        {
                            Ok(path) => {
                                let _ = event_tx.send(ControllerEvent::Saved { path });
                            }
                            Err(e) => emit_error(&event_tx, &e),
                        }
                    }
                    Some(UiCommand::Quit) | None => {
                        if let Some(ctx) = request.take() {
                            ctx.cancel();
                            session.abandon();
                        }
                        break Ok(());
                    }
                }
            }
            // Do not take the JoinHandle before this branch wins; otherwise it can be dropped
            // if another select branch is chosen, and we'll never observe completion.
            done = async {
                if let Some(ctx) = &mut request {
                    if let Some(h) = ctx.handle.as_mut() {
                        return (ctx.id, h.await);
                    }
                }
                futures::future::pending().await
            } => {
                let (id, joined) = done;
                request = None;
                let outcome = match joined {
                    Ok(Some(outcome)) => outcome,
                    Ok(None) => continue,
                    Err(e) => Err(RestoreError::io(
                        "restoration task failed",
                        std::io::Error::other(e),
                    )),
                };
                match session.finish_restore(id, outcome) {
                    Some(Ok(())) => {
                        tracing::info!(request = id, "restoration succeeded");
                        emit_state(&event_tx, &session);
                    }
                    Some(Err(e)) => {
                        emit_state(&event_tx, &session);
                        emit_error(&event_tx, &e);
                    }
                    None => tracing::debug!(request = id, "discarded stale restoration result"),
                }
            }
        }
    }
}
