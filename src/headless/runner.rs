//! Headless mode runner - main event loop without a UI
//!
//! Line commands on stdin become coordinator messages; engine events are
//! printed to stdout as NDJSON. A simulated location source and a logging
//! notification presenter stand in for the platform.

use std::path::Path;

use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use whereabouts_app::signals::spawn_signal_handler;
use whereabouts_app::services::{LogNotificationPresenter, SimulatedLocationSource};
use whereabouts_app::{Engine, EngineEvent, Message};
use whereabouts_core::prelude::*;
use whereabouts_core::{LocationFix, NotificationAction};

use super::HeadlessEvent;

type HeadlessEngine = Engine<SimulatedLocationSource, LogNotificationPresenter>;

/// A parsed stdin command
#[derive(Debug, Clone)]
enum Command {
    /// Forward to the coordinator
    Send(Message),
    /// Print a status snapshot
    Status,
}

/// Outcome of one loop iteration
enum Step {
    Processed(bool),
    StatusRequested(bool),
}

/// Run in headless mode - output JSON events on stdout
pub async fn run_headless(data_dir: &Path) -> Result<()> {
    info!("═══════════════════════════════════════════════════════");
    info!("Whereabouts starting in HEADLESS mode");
    info!("Data dir: {}", data_dir.display());
    info!("═══════════════════════════════════════════════════════");

    let mut engine = Engine::from_data_dir(data_dir);
    let mut events = engine.subscribe();

    spawn_signal_handler(engine.msg_sender());

    let (status_tx, mut status_rx) = mpsc::channel::<()>(8);
    let stdin_tx = engine.msg_sender();
    std::thread::Builder::new()
        .name("whereabouts-stdin".to_string())
        .spawn(move || read_stdin_blocking(stdin_tx, status_tx))?;

    headless_event_loop(&mut engine, &mut events, &mut status_rx).await;

    engine.shutdown().await;
    emit_pending_events(&mut events);

    info!("Whereabouts headless mode exiting");
    Ok(())
}

/// Main headless event loop
async fn headless_event_loop(
    engine: &mut HeadlessEngine,
    events: &mut broadcast::Receiver<EngineEvent>,
    status_rx: &mut mpsc::Receiver<()>,
) {
    loop {
        if engine.should_quit() {
            info!("Quit requested");
            break;
        }

        let step = tokio::select! {
            more = engine.process_next() => Step::Processed(more),
            request = status_rx.recv() => Step::StatusRequested(request.is_some()),
        };

        emit_pending_events(events);

        match step {
            Step::Processed(true) => {}
            Step::Processed(false) => {
                info!("Message channel closed");
                break;
            }
            Step::StatusRequested(true) => HeadlessEvent::status(engine.status()).emit(),
            // Stdin reader is gone; keep serving the engine
            Step::StatusRequested(false) => {
                let pending = engine.process_next().await;
                emit_pending_events(events);
                if !pending {
                    break;
                }
            }
        }
    }
}

/// Print every event that is already buffered
fn emit_pending_events(events: &mut broadcast::Receiver<EngineEvent>) {
    loop {
        match events.try_recv() {
            Ok(event) => HeadlessEvent::from(event).emit(),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!("Headless event stream lagged by {} events", skipped);
                HeadlessEvent::error(format!("{} events dropped", skipped)).emit();
            }
            Err(_) => break,
        }
    }
}

/// Parse one stdin line. Empty lines yield `Ok(None)`.
fn parse_command(line: &str) -> std::result::Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };

    let command = match verb {
        "start" => Command::Send(Message::Subscribe),
        "stop" => Command::Send(Message::Unsubscribe),
        "toggle" | "t" => Command::Send(Message::ToggleTracking),
        "attach" => Command::Send(Message::ConsumerAttached),
        "detach" => Command::Send(Message::ConsumerDetached),
        "config-change" => Command::Send(Message::ConfigurationChanged),
        "status" | "s" => Command::Status,
        "q" | "quit" => Command::Send(Message::Quit),
        "fix" => {
            let latitude = parse_coordinate(words.next(), "latitude")?;
            let longitude = parse_coordinate(words.next(), "longitude")?;
            let fix = LocationFix::checked(latitude, longitude)
                .ok_or_else(|| format!("coordinates out of range: {} {}", latitude, longitude))?;
            Command::Send(Message::LocationFix(fix))
        }
        "notify" => match words.next() {
            Some("open") => Command::Send(Message::NotificationActionInvoked(
                NotificationAction::OpenApp,
            )),
            Some("stop") => Command::Send(Message::NotificationActionInvoked(
                NotificationAction::StopTracking,
            )),
            _ => return Err("usage: notify open|stop".to_string()),
        },
        other => return Err(format!("unknown command: {}", other)),
    };

    if let Some(extra) = words.next() {
        return Err(format!("unexpected argument: {}", extra));
    }
    Ok(Some(command))
}

fn parse_coordinate(word: Option<&str>, name: &str) -> std::result::Result<f64, String> {
    let word = word.ok_or_else(|| format!("usage: fix <lat> <lon> (missing {})", name))?;
    word.parse::<f64>()
        .map_err(|_| format!("invalid {}: {}", name, word))
}

/// Read stdin commands on a dedicated thread (blocking version).
///
/// End of input is treated like `quit`.
fn read_stdin_blocking(msg_tx: mpsc::Sender<Message>, status_tx: mpsc::Sender<()>) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    let reader = stdin.lock();

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };

        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(Command::Status)) => {
                let _ = status_tx.blocking_send(());
            }
            Ok(Some(Command::Send(message))) => {
                info!("Stdin: {:?}", message);
                let quit = matches!(message, Message::Quit);
                if msg_tx.blocking_send(message).is_err() || quit {
                    return;
                }
            }
            Err(reason) => {
                warn!("Bad stdin command {:?}: {}", line.trim(), reason);
                HeadlessEvent::error(reason).emit();
            }
        }
    }

    info!("Stdin closed, quitting");
    let _ = msg_tx.blocking_send(Message::Quit);
}
