//! Command-line command handlers for athand.
//!
//! This module contains implementations for one-shot CLI commands like
//! `times`, `next` and `toggle`. Each command is implemented in its own
//! submodule to keep the code organized and maintainable.

pub mod next;
pub mod times;
pub mod toggle;

use anyhow::Result;
use chrono::{DateTime, Duration};
use chrono_tz::Tz;

use crate::config::Config;
use crate::location::{self, Fix};
use crate::prayer::DailySchedule;
use crate::settings::NotificationSettings;

/// Everything a one-shot command needs: validated config plus the
/// resolved location fix.
pub(crate) struct CommandContext {
    pub config: Config,
    pub fix: Fix,
}

/// Load config and location for a one-shot command. A missing location is
/// not fatal here (unlike the daemon): the command prints a placeholder
/// and exits cleanly, so `Ok(None)` means "already handled".
pub(crate) fn load_context() -> Result<Option<CommandContext>> {
    let config = Config::load()?;
    match location::resolve(&config) {
        Ok(fix) => Ok(Some(CommandContext { config, fix })),
        Err(e) => {
            log_pipe!();
            log_warning!("{e}");
            log_block_start!("Searching for nearest location...");
            log_indented!("Prayer times unavailable until coordinates are configured");
            log_end!();
            Ok(None)
        }
    }
}

/// Log one day's schedule as an indented block, marking muted prayers.
pub fn log_schedule(schedule: &DailySchedule, settings: &NotificationSettings) {
    log_block_start!("Prayer times for {}", schedule.date().format("%Y-%m-%d"));
    for pt in schedule.times() {
        let marker = if settings.is_enabled(pt.name) {
            ""
        } else {
            "  (muted)"
        };
        log_indented!("{:<8} {}{}", pt.at.format("%H:%M"), pt.name, marker);
    }
}

/// Render a duration until an instant as "Xh Ym" / "Ym".
pub fn format_countdown(from: DateTime<Tz>, to: DateTime<Tz>) -> String {
    let remaining = (to - from).max(Duration::zero());
    let hours = remaining.num_hours();
    let minutes = remaining.num_minutes() % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
