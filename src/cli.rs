use crate::logging::{self, LogTarget};
use crate::model::{ControllerEvent, RestoreConfig, RestoreReport};
use crate::orchestrator::{run_controller, UiCommand};
use crate::session::UiState;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "restore-cli",
    version,
    about = "Image restoration client with optional TUI"
)]
pub struct Cli {
    /// Restoration endpoint (multipart POST)
    #[arg(long, default_value = "http://127.0.0.1:5000/restore")]
    pub endpoint: String,

    /// Image to load on launch (required for --text/--json)
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,

    /// Directory restored images are saved to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Exact path for the restored image (headless modes)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Request timeout
    #[arg(long, default_value = "60s")]
    pub timeout: humantime::Duration,

    /// Multipart field carrying the image
    #[arg(long, default_value = "file")]
    pub field_name: String,

    /// Restore --file, print a JSON report and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Restore --file, print a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Run silently: suppress all output except errors (for scripts)
    #[arg(long)]
    pub silent: bool,

    /// Skip the startup check of the service root
    #[arg(long = "no-probe", action = clap::ArgAction::SetFalse)]
    pub probe: bool,

    /// Log file for TUI mode (default: <cache dir>/restore-cli/restore-cli.log)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

pub async fn run(args: Cli) -> Result<()> {
    if args.silent && !args.json {
        return Err(anyhow::anyhow!(
            "--silent can only be used with --json. Use --silent --json together."
        ));
    }
    if (args.json || args.text) && args.file.is_none() {
        return Err(anyhow::anyhow!("--text and --json need an image: pass --file <path>"));
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            let log_path = args.log_file.clone().unwrap_or_else(logging::default_log_path);
            logging::init(LogTarget::File(log_path), "info")?;
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            if args.file.is_none() {
                return Err(anyhow::anyhow!("built without TUI support: pass --file <path>"));
            }
            logging::init(LogTarget::Stderr, "info")?;
            return run_text(args).await;
        }
    }

    logging::init(LogTarget::Stderr, if args.text { "info" } else { "warn" })?;
    if args.json {
        return run_json(args).await;
    }
    run_text(args).await
}

/// Build a `RestoreConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> RestoreConfig {
    let output_dir = args
        .output_dir
        .clone()
        .or_else(dirs::download_dir)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    RestoreConfig {
        endpoint: args.endpoint.clone(),
        field_name: args.field_name.clone(),
        timeout: Duration::from(args.timeout),
        output_dir,
        user_agent: format!("restore-cli/{}", env!("CARGO_PKG_VERSION")),
        probe: args.probe && !args.json,
    }
}

/// Wait for a state matching `want`. A notice while waiting fails the run.
async fn await_state(
    event_rx: &mut mpsc::UnboundedReceiver<ControllerEvent>,
    want: impl Fn(&UiState) -> bool,
) -> Result<UiState> {
    loop {
        match event_rx.recv().await {
            Some(ControllerEvent::StateChanged(s)) if want(s.as_ref()) => return Ok(*s),
            Some(ControllerEvent::StateChanged(_)) => {}
            Some(ControllerEvent::Notice(n)) => return Err(anyhow::anyhow!(n.text)),
            Some(ControllerEvent::Info(info)) => tracing::info!("{}", info.to_message()),
            Some(ControllerEvent::Saved { .. }) => {}
            None => return Err(anyhow::anyhow!("controller stopped unexpectedly")),
        }
    }
}

async fn await_saved(event_rx: &mut mpsc::UnboundedReceiver<ControllerEvent>) -> Result<PathBuf> {
    loop {
        match event_rx.recv().await {
            Some(ControllerEvent::Saved { path }) => return Ok(path),
            Some(ControllerEvent::Notice(n)) => return Err(anyhow::anyhow!(n.text)),
            Some(_) => {}
            None => return Err(anyhow::anyhow!("controller stopped unexpectedly")),
        }
    }
}

/// Drive select → restore → download through the controller, the same path the TUI takes.
async fn run_headless(args: &Cli) -> Result<RestoreReport> {
    let file = args.file.clone().context("no --file given")?;
    let cfg = build_config(args);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ControllerEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let ctrl_cfg = cfg.clone();
    let handle = tokio::spawn(async move { run_controller(&ctrl_cfg, event_tx, cmd_rx).await });

    let _ = cmd_tx.send(UiCommand::SelectFile(file.clone()));
    let previewing = await_state(&mut event_rx, |s| matches!(s, UiState::Previewing { .. }))
        .await
        .with_context(|| format!("failed to load {}", file.display()))?;
    let (original_width, original_height) = previewing
        .original()
        .map(|p| (p.width, p.height))
        .unwrap_or_default();

    let started = Instant::now();
    let _ = cmd_tx.send(UiCommand::Restore);
    let restored_state = await_state(&mut event_rx, |s| matches!(s, UiState::Restored { .. }))
        .await
        .context("restoration failed")?;
    let elapsed = started.elapsed();
    let restored = restored_state
        .restoration()
        .cloned()
        .context("restored state without result")?;

    let _ = cmd_tx.send(UiCommand::Download(args.output.clone()));
    let saved = await_saved(&mut event_rx)
        .await
        .context("failed to save restored image")?;

    let _ = cmd_tx.send(UiCommand::Quit);
    handle
        .await
        .context("controller task failed")?
        .context("controller failed")?;

    Ok(RestoreReport {
        timestamp_utc: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into()),
        endpoint: cfg.endpoint,
        file,
        original_width,
        original_height,
        restored_width: restored.dimensions.map(|(w, _)| w),
        restored_height: restored.dimensions.map(|(_, h)| h),
        restored_bytes: restored.jpeg.len() as u64,
        elapsed,
        saved_to: Some(saved),
    })
}

async fn run_json(args: Cli) -> Result<()> {
    let report = run_headless(&args).await?;
    if args.silent {
        return Ok(());
    }
    let (out_tx, out_handle) = spawn_output_writer();
    let out = serde_json::to_string_pretty(&report)?;
    let _ = out_tx.send(OutputLine::Stdout(out));
    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

async fn run_text(args: Cli) -> Result<()> {
    let (out_tx, out_handle) = spawn_output_writer();
    let _ = out_tx.send(OutputLine::Stderr(format!(
        "Restoring {} via {}",
        args.file
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        args.endpoint
    )));
    let report = run_headless(&args).await;
    let res = match report {
        Ok(report) => {
            for line in crate::text_summary::build_text_summary(&report).lines {
                let _ = out_tx.send(OutputLine::Stdout(line));
            }
            Ok(())
        }
        Err(e) => Err(e),
    };
    drop(out_tx);
    let _ = out_handle.await;
    res
}
