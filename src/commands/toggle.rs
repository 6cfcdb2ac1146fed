//! Implementation of the toggle command.
//!
//! Flips one prayer's notification setting, persists it, and signals a
//! running daemon (if any) to pick the change up.

use anyhow::Result;

use crate::config::Config;
use crate::prayer::PrayerName;
use crate::settings::NotificationSettings;

/// Handle the toggle command for one prayer.
pub fn handle_toggle_command(prayer: PrayerName, debug_enabled: bool) -> Result<()> {
    log_version!();

    if debug_enabled {
        match Config::load() {
            Ok(config) => config.log_config(None),
            Err(e) => {
                log_pipe!();
                log_debug!("Could not load configuration: {e}");
            }
        }
    }

    let dir = Config::config_dir()?;
    let mut settings = NotificationSettings::load(&dir);
    let enabled = settings.toggle(prayer);
    settings.save(&dir)?;

    log_block_start!(
        "{} notifications {}",
        prayer,
        if enabled { "enabled" } else { "disabled" }
    );
    for name in PrayerName::ALL {
        log_indented!(
            "{:<8} {}",
            name.slug(),
            if settings.is_enabled(name) { "on" } else { "off" }
        );
    }

    signal_running_daemon();
    log_end!();
    Ok(())
}

/// Send SIGUSR2 to a running daemon so it reloads the settings. A missing
/// or stale lock file just means no daemon is running.
fn signal_running_daemon() {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    let lock_path = format!("{runtime_dir}/athand.lock");

    let pid = std::fs::read_to_string(&lock_path)
        .ok()
        .and_then(|contents| contents.lines().next()?.trim().parse::<u32>().ok());

    if let Some(pid) = pid {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        match kill(Pid::from_raw(pid as i32), Signal::SIGUSR2) {
            Ok(_) => {
                log_indented!("Signaled running daemon to reload (PID: {pid})");
            }
            Err(nix::errno::Errno::ESRCH) => {
                // Stale lock, the daemon will reload settings on next start
            }
            Err(e) => {
                log_warning!("Failed to signal running daemon: {e}");
            }
        }
    }
}
