//! D-Bus sleep/resume monitoring.
//!
//! A suspended machine wakes with stale registrations: the schedule may
//! belong to yesterday and triggers may have silently passed. This module
//! watches systemd-logind's PrepareForSleep signal with zbus's blocking API
//! in a dedicated thread and sends [`SignalMessage::Resume`] to the main
//! loop on wake so it can recompute the schedule and reinstall alarms.

use anyhow::{Context, Result};
use std::sync::mpsc::Sender;
use std::thread;

use crate::signals::SignalMessage;

/// D-Bus proxy trait for systemd-logind Manager interface.
#[zbus::proxy(
    interface = "org.freedesktop.login1.Manager",
    default_service = "org.freedesktop.login1",
    default_path = "/org/freedesktop/login1"
)]
trait LogindManager {
    /// PrepareForSleep signal emitted by systemd-logind.
    ///
    /// The `start` parameter indicates:
    /// - `true`: System is about to sleep/suspend
    /// - `false`: System is resuming from sleep/suspend
    #[zbus(signal)]
    fn prepare_for_sleep(&self, start: bool) -> zbus::Result<()>;
}

/// Start sleep/resume monitoring in a dedicated thread.
///
/// # Graceful Degradation
/// If the system bus or logind is unavailable the thread logs a warning and
/// exits; the daemon continues without resume detection. A lost connection
/// is retried a few times before giving up.
pub fn start_sleep_resume_monitor(
    signal_sender: Sender<SignalMessage>,
    debug_enabled: bool,
) -> Result<()> {
    spawn_monitor_thread(signal_sender, debug_enabled, 0);
    Ok(())
}

fn spawn_monitor_thread(
    signal_sender: Sender<SignalMessage>,
    debug_enabled: bool,
    restart_count: u8,
) {
    const MAX_THREAD_RESTARTS: u8 = 3;
    const RESTART_DELAY_MS: u64 = 2000;

    thread::spawn(move || {
        match monitor_sleep_signals(signal_sender.clone(), debug_enabled) {
            Ok(_) => {
                if debug_enabled {
                    log_pipe!();
                    log_debug!("Sleep monitor thread exiting normally");
                }
            }
            Err(e) => {
                log_pipe!();
                log_warning!("Sleep monitor error: {}", e);

                if restart_count < MAX_THREAD_RESTARTS {
                    log_indented!(
                        "Will restart D-Bus monitor (attempt {}/{})",
                        restart_count + 1,
                        MAX_THREAD_RESTARTS
                    );
                    thread::sleep(std::time::Duration::from_millis(RESTART_DELAY_MS));
                    spawn_monitor_thread(signal_sender, debug_enabled, restart_count + 1);
                } else {
                    log_indented!("Maximum restart attempts reached for sleep monitor");
                    log_indented!("Sleep/resume detection will not be available");
                }
            }
        }
    });
}

/// Monitor PrepareForSleep signals using D-Bus in a dedicated thread
fn monitor_sleep_signals(signal_sender: Sender<SignalMessage>, debug_enabled: bool) -> Result<()> {
    let connection =
        zbus::blocking::Connection::system().context("Failed to connect to system D-Bus")?;

    if debug_enabled {
        log_debug!("Connected to system D-Bus successfully");
    }

    let logind_proxy =
        LogindManagerProxyBlocking::new(&connection).context("Failed to create logind proxy")?;

    let mut sleep_signals = logind_proxy
        .receive_prepare_for_sleep()
        .context("Failed to subscribe to PrepareForSleep signals")?;

    if debug_enabled {
        log_debug!("Subscribed to systemd-logind PrepareForSleep signals");
    }

    loop {
        match sleep_signals.next() {
            Some(signal) => match signal.args() {
                Ok(args) => {
                    if args.start {
                        log_pipe!();
                        log_info!("System entering sleep/suspend mode");
                    } else {
                        log_pipe!();
                        log_info!("System resuming from sleep/suspend - refreshing schedule");

                        if signal_sender.send(SignalMessage::Resume).is_err() {
                            // Channel disconnected - main thread probably exiting
                            return Ok(());
                        }
                    }
                }
                Err(e) => {
                    log_pipe!();
                    log_warning!("Failed to parse PrepareForSleep signal args: {}", e);
                    log_indented!("Continuing to monitor for future signals...");
                }
            },
            None => {
                log_pipe!();
                return Err(anyhow::anyhow!(
                    "D-Bus connection lost - PrepareForSleep signal stream ended"
                ));
            }
        }
    }
}
