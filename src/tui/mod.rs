mod export;
mod help;
mod preview;
mod state;

use crate::cli::{build_config, Cli};
use crate::model::{ControllerEvent, NoticeKind, RestoreConfig};
use crate::orchestrator::{self, UiCommand};
use crate::session::{UiState, Visibility};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Terminal,
};
use std::{io, path::PathBuf, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use export::{copy_to_clipboard, display_path};
use help::draw_help;
use state::{push_wrapped_status_kv, TuiState};

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    // Unbounded channels keep the UI thread from ever blocking on the controller.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<ControllerEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    if let Some(path) = args.file.clone() {
        let _ = cmd_tx.send(UiCommand::SelectFile(path));
    }

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_cfg = cfg.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_cfg, event_rx, cmd_tx));

    let res = orchestrator::run_controller(&cfg, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    cfg: RestoreConfig,
    mut event_rx: UnboundedReceiver<ControllerEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // TuiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = TuiState {
        endpoint: cfg.endpoint.clone(),
        output_dir: cfg.output_dir.clone(),
        info: "Press o to open an image".into(),
        ..Default::default()
    };

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now() - tick_rate;

    let res = loop {
        let mut controller_gone = false;
        loop {
            match event_rx.try_recv() {
                Ok(ev) => state.apply(ev),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    controller_gone = true;
                    break;
                }
            }
        }
        if controller_gone {
            break Ok(());
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key(&mut state, k.modifiers, k.code, &cmd_tx) {
                    break Ok(());
                }
                // Redraw right away so key feedback does not wait for the tick.
                last_tick = Instant::now() - tick_rate;
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

/// Expand a typed path: strip surrounding quotes and a leading `~/`.
fn expand_path(input: &str) -> PathBuf {
    let trimmed = input.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| {
            trimmed
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
        })
        .unwrap_or(trimmed);
    if let Some(rest) = unquoted.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(unquoted)
}

/// Apply one key press. Returns true when the UI should exit.
fn handle_key(
    state: &mut TuiState,
    modifiers: KeyModifiers,
    code: KeyCode,
    cmd_tx: &UnboundedSender<UiCommand>,
) -> bool {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        let _ = cmd_tx.send(UiCommand::Quit);
        return true;
    }

    // A notice blocks everything else until dismissed.
    if state.notice.take().is_some() {
        return false;
    }

    if state.prompt.is_some() {
        match code {
            KeyCode::Enter => {
                let typed = state.prompt.take().unwrap_or_default();
                let path = expand_path(&typed);
                if !path.as_os_str().is_empty() {
                    let _ = cmd_tx.send(UiCommand::SelectFile(path));
                }
            }
            KeyCode::Esc => state.prompt = None,
            KeyCode::Backspace => {
                if let Some(buf) = state.prompt.as_mut() {
                    buf.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(buf) = state.prompt.as_mut() {
                    buf.push(c);
                }
            }
            _ => {}
        }
        return false;
    }

    let vis = state.visibility();
    match code {
        KeyCode::Char('q') => {
            let _ = cmd_tx.send(UiCommand::Quit);
            return true;
        }
        KeyCode::Char('o') => {
            state.tab = 0;
            state.prompt = Some(String::new());
        }
        KeyCode::Char('r') => {
            if vis.loading {
                state.info = "Restore already in progress…".into();
            } else {
                let _ = cmd_tx.send(UiCommand::Restore);
            }
        }
        KeyCode::Char('x') => {
            if vis.loading {
                state.info = "Reset is disabled while restoring".into();
            } else {
                let _ = cmd_tx.send(UiCommand::Reset);
            }
        }
        KeyCode::Char('d') => {
            if vis.download_visible {
                let _ = cmd_tx.send(UiCommand::Download(None));
            } else {
                state.info = "Nothing to download yet".into();
            }
        }
        KeyCode::Char('y') => {
            if let Some(path) = state.last_saved.as_ref() {
                let path = path.display().to_string();
                match copy_to_clipboard(&path) {
                    Ok(()) => {
                        state.info = format!("✓ Copied to clipboard: {}", display_path(&path));
                    }
                    Err(e) => {
                        state.info = format!("Clipboard copy failed: {e:#}");
                    }
                }
            } else {
                state.info = "No downloaded file to copy. Download first (d)".into();
            }
        }
        KeyCode::Char('Y') => match state.download_target() {
            Some(uri) => match copy_to_clipboard(&uri) {
                Ok(()) => {
                    state.info = format!("✓ Copied restored image as data URI ({} bytes)", uri.len());
                }
                Err(e) => {
                    state.info = format!("Clipboard copy failed: {e:#}");
                }
            },
            None => state.info = "No restored image to copy yet".into(),
        },
        KeyCode::Tab => state.tab = (state.tab + 1) % 2,
        KeyCode::Char('?') => state.tab = 1,
        _ => {}
    }
    false
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &TuiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Restore"), Line::from("Help")])
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title("restore-cli"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_main(chunks[1], f, state),
        _ => draw_help(chunks[1], f),
    }

    if let Some(buf) = state.prompt.as_deref() {
        draw_prompt(area, f, buf);
    }
    if let Some(notice) = state.notice.as_ref() {
        draw_notice(area, f, notice.kind, &notice.text);
    }
}

fn dims_span(w: u32, h: u32) -> Span<'static> {
    Span::styled(format!(" {}x{}", w, h), Style::default().fg(Color::Gray))
}

fn draw_main(area: Rect, f: &mut ratatui::Frame, state: &TuiState) {
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(6),    // Original + Restored panes (side-by-side)
                Constraint::Length(3), // Actions row
                Constraint::Length(7), // Status
            ]
            .as_ref(),
        )
        .split(area);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(main[0]);

    let vis = state.visibility();

    // Original pane (left)
    let original = state.view.original().filter(|_| vis.original_image);
    let mut title = vec![Span::raw("Original")];
    if let Some(p) = original {
        title.push(Span::raw(format!(" · {}", p.file_name)));
        title.push(dims_span(p.width, p.height));
    }
    preview::draw_pane(
        f,
        panes[0],
        Line::from(title),
        original.map(|p| &p.thumbnail),
        "No image selected · press o to open one",
        Color::Green,
    );

    // Restored pane (right)
    let restored = state.view.restored_pane().filter(|_| vis.restored_image);
    let mut title = vec![Span::raw("Restored")];
    if let Some(r) = restored {
        if let Some((w, h)) = r.dimensions {
            title.push(dims_span(w, h));
        }
        if state.view.restoration().is_none() {
            title.push(Span::styled(" (previous)", Style::default().fg(Color::DarkGray)));
        }
    }
    let placeholder = if vis.loading {
        "Restoring…"
    } else if restored.is_some() {
        "Restored image cannot be previewed"
    } else {
        "The restored image will appear here"
    };
    preview::draw_pane(
        f,
        panes[1],
        Line::from(title),
        restored.and_then(|r| r.thumbnail.as_ref()),
        placeholder,
        Color::Cyan,
    );

    draw_actions(main[1], f, &vis);
    draw_status(main[2], f, state);
}

fn action_spans(key: &'static str, label: &'static str, enabled: bool) -> Vec<Span<'static>> {
    let (key_style, label_style) = if enabled {
        (
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
            Style::default(),
        )
    } else {
        (
            Style::default().fg(Color::DarkGray),
            Style::default().fg(Color::DarkGray),
        )
    };
    vec![
        Span::styled(format!("[{key}]"), key_style),
        Span::styled(format!(" {label}   "), label_style),
    ]
}

/// Buttons shown according to the projected visibility.
fn action_line(vis: &Visibility) -> Line<'static> {
    let mut spans = action_spans("o", "Open", true);
    if vis.restore_visible {
        spans.extend(action_spans("r", "Restore", vis.restore_enabled));
    }
    if vis.reset_visible {
        spans.extend(action_spans("x", "Reset", vis.reset_enabled));
    }
    if vis.download_visible {
        spans.extend(action_spans("d", "Download", true));
    }
    if vis.loading {
        spans.push(Span::styled(
            "⟳ Restoring…",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    }
    Line::from(spans)
}

fn draw_actions(area: Rect, f: &mut ratatui::Frame, vis: &Visibility) {
    let p = Paragraph::new(action_line(vis))
        .block(Block::default().borders(Borders::ALL).title("Actions"));
    f.render_widget(p, area);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &TuiState) {
    let state_color = match &state.view {
        UiState::Idle => Color::Gray,
        UiState::Previewing { .. } => Color::Green,
        UiState::Restoring { .. } => Color::Yellow,
        UiState::Restored { .. } => Color::Cyan,
        UiState::Error { .. } => Color::Red,
    };
    let mut status_lines = vec![Line::from(vec![
        Span::styled("State: ", Style::default().fg(Color::Gray)),
        Span::styled(state.view.name(), Style::default().fg(state_color)),
        Span::raw("   "),
        Span::styled("Server: ", Style::default().fg(Color::Gray)),
        Span::raw(state.server.clone().unwrap_or_else(|| "-".into())),
    ])];
    push_wrapped_status_kv(&mut status_lines, "Endpoint", &state.endpoint, area.width);
    push_wrapped_status_kv(
        &mut status_lines,
        "Output",
        &state.output_dir.display().to_string(),
        area.width,
    );
    if let Some(path) = state.last_saved.as_ref() {
        push_wrapped_status_kv(
            &mut status_lines,
            "Saved",
            &path.display().to_string(),
            area.width,
        );
    }
    status_lines.push(Line::from(vec![
        Span::styled("Info: ", Style::default().fg(Color::Gray)),
        Span::raw(state.info.clone()),
    ]));

    let status =
        Paragraph::new(status_lines).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, area);
}

/// A rectangle `percent_x` wide and `height` tall, centred in `area`.
fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let width = (area.width as u32 * percent_x as u32 / 100) as u16;
    let width = width.max(20).min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_prompt(area: Rect, f: &mut ratatui::Frame, buf: &str) {
    let popup = centered_rect(70, 5, area);
    f.render_widget(Clear, popup);
    let p = Paragraph::new(vec![
        Line::from(vec![
            Span::raw(buf.to_string()),
            Span::styled("█", Style::default().fg(Color::Gray)),
        ]),
        Line::from(Span::styled(
            "Enter to load · Esc to cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Open image")
            .border_style(Style::default().fg(Color::Magenta)),
    );
    f.render_widget(p, popup);
}

fn draw_notice(area: Rect, f: &mut ratatui::Frame, kind: NoticeKind, text: &str) {
    let color = match kind {
        NoticeKind::User => Color::Yellow,
        _ => Color::Red,
    };
    let popup = centered_rect(60, 7, area);
    f.render_widget(Clear, popup);
    let p = Paragraph::new(vec![
        Line::from(text.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to continue",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Notice")
            .border_style(Style::default().fg(color)),
    );
    f.render_widget(p, popup);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Notice;
    use crate::session::project;

    fn keys(state: &mut TuiState, codes: &[KeyCode]) -> Vec<UiCommand> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        for code in codes {
            handle_key(state, KeyModifiers::NONE, *code, &tx);
        }
        drop(tx);
        let mut out = Vec::new();
        while let Ok(cmd) = rx.try_recv() {
            out.push(cmd);
        }
        out
    }

    fn typed(s: &str) -> Vec<KeyCode> {
        s.chars().map(KeyCode::Char).collect()
    }

    #[test]
    fn open_prompt_sends_selected_path() {
        let mut state = TuiState::default();
        let mut codes = vec![KeyCode::Char('o')];
        codes.extend(typed("/tmp/cat.pngx"));
        codes.push(KeyCode::Backspace);
        codes.push(KeyCode::Enter);
        let cmds = keys(&mut state, &codes);
        assert!(matches!(
            cmds.as_slice(),
            [UiCommand::SelectFile(p)] if p == &PathBuf::from("/tmp/cat.png")
        ));
        assert!(state.prompt.is_none());
    }

    #[test]
    fn empty_prompt_is_a_no_op() {
        let mut state = TuiState::default();
        let cmds = keys(&mut state, &[KeyCode::Char('o'), KeyCode::Enter]);
        assert!(cmds.is_empty());
        let cmds = keys(&mut state, &[KeyCode::Char('o'), KeyCode::Char('a'), KeyCode::Esc]);
        assert!(cmds.is_empty());
    }

    #[test]
    fn restore_key_is_forwarded_even_without_file() {
        let mut state = TuiState::default();
        let cmds = keys(&mut state, &[KeyCode::Char('r')]);
        assert!(matches!(cmds.as_slice(), [UiCommand::Restore]));
    }

    #[test]
    fn notice_swallows_the_next_key() {
        let mut state = TuiState {
            notice: Some(Notice {
                kind: NoticeKind::Transport,
                text: "Failed to process image: model unavailable".into(),
            }),
            ..Default::default()
        };
        let cmds = keys(&mut state, &[KeyCode::Char('r')]);
        assert!(cmds.is_empty());
        assert!(state.notice.is_none());
        let cmds = keys(&mut state, &[KeyCode::Char('r')]);
        assert_eq!(cmds.len(), 1);
    }

    #[test]
    fn download_only_when_visible() {
        let mut state = TuiState::default();
        assert!(keys(&mut state, &[KeyCode::Char('d')]).is_empty());
        assert_eq!(state.info, "Nothing to download yet");
    }

    #[test]
    fn copy_data_uri_needs_a_result() {
        let mut state = TuiState::default();
        assert!(keys(&mut state, &[KeyCode::Char('Y')]).is_empty());
        assert_eq!(state.info, "No restored image to copy yet");
    }

    #[test]
    fn quit_keys_exit() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = TuiState::default();
        assert!(handle_key(&mut state, KeyModifiers::NONE, KeyCode::Char('q'), &tx));
        assert!(handle_key(
            &mut state,
            KeyModifiers::CONTROL,
            KeyCode::Char('c'),
            &tx
        ));
        assert!(matches!(rx.try_recv(), Ok(UiCommand::Quit)));
    }

    #[test]
    fn expand_path_strips_quotes() {
        assert_eq!(expand_path("  '/a b/c.png' "), PathBuf::from("/a b/c.png"));
        assert_eq!(expand_path("\"/x.png\""), PathBuf::from("/x.png"));
        assert_eq!(expand_path("rel.png"), PathBuf::from("rel.png"));
    }

    #[test]
    fn idle_actions_show_only_open() {
        let line = action_line(&project(&UiState::Idle));
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(text.contains("Open"));
        assert!(!text.contains("Restore"));
        assert!(!text.contains("Download"));
    }

    #[test]
    fn centered_rect_stays_inside() {
        let area = Rect::new(0, 0, 30, 4);
        let r = centered_rect(60, 7, area);
        assert!(r.width <= area.width && r.height <= area.height);
        assert!(r.x + r.width <= area.width);
    }
}
