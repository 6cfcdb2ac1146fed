//! Signal handling for the notification daemon.
//!
//! A dedicated thread turns Unix signals into [`SignalMessage`]s on an mpsc
//! channel the main loop blocks on. SIGUSR2 asks for a settings/config
//! reload; SIGTERM, SIGINT and SIGHUP shut the daemon down. The channel
//! sender is shared with the D-Bus sleep monitor, which injects `Resume`
//! messages alongside the real signals.

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR2},
    iterator::Signals,
};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

/// Unified message type for everything that interrupts the main loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalMessage {
    /// Configuration and settings reload (SIGUSR2)
    Reload,
    /// System resumed from sleep (from the D-Bus monitor)
    Resume,
    /// Shutdown (SIGTERM, SIGINT, SIGHUP)
    Shutdown,
}

/// Signal handling state shared between threads.
pub struct SignalState {
    /// Atomic flag indicating if the application should keep running
    pub running: Arc<AtomicBool>,
    /// Channel receiver for unified signal messages
    pub signal_receiver: std::sync::mpsc::Receiver<SignalMessage>,
    /// Channel sender for unified signal messages (for D-Bus integration)
    pub signal_sender: std::sync::mpsc::Sender<SignalMessage>,
}

/// Register the signal handler thread and return the shared state.
pub fn setup_signal_handler(debug_enabled: bool) -> Result<SignalState> {
    let running = Arc::new(AtomicBool::new(true));
    let (signal_sender, signal_receiver) = std::sync::mpsc::channel::<SignalMessage>();

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP, SIGUSR2])
        .context("failed to register signal handlers")?;

    let running_clone = running.clone();
    let signal_sender_clone = signal_sender.clone();

    thread::spawn(move || {
        for sig in signals.forever() {
            match sig {
                SIGUSR2 => {
                    if debug_enabled {
                        log_debug!("Received SIGUSR2, requesting reload");
                    }
                    if signal_sender_clone.send(SignalMessage::Reload).is_err() {
                        break; // main loop gone
                    }
                }
                SIGTERM | SIGINT | SIGHUP => {
                    running_clone.store(false, Ordering::SeqCst);
                    let _ = signal_sender_clone.send(SignalMessage::Shutdown);
                    break;
                }
                _ => {}
            }
        }
    });

    Ok(SignalState {
        running,
        signal_receiver,
        signal_sender,
    })
}
