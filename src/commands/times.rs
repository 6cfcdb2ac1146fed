//! Implementation of the times command.
//!
//! Prints today's full prayer schedule for the configured location and
//! exits, without touching the running daemon.

use anyhow::Result;
use chrono::Utc;

use crate::settings::NotificationSettings;

/// Handle the times command: compute and print today's schedule.
pub fn handle_times_command(debug_enabled: bool) -> Result<()> {
    log_version!();

    let Some(ctx) = super::load_context()? else {
        return Ok(());
    };
    if debug_enabled {
        ctx.config.log_config(Some(&ctx.fix));
    }

    let now = Utc::now().with_timezone(&ctx.fix.timezone);
    let schedule = ctx.config.oracle().compute(
        ctx.fix.latitude,
        ctx.fix.longitude,
        ctx.fix.timezone,
        now.date_naive(),
    )?;

    let settings_dir = crate::config::Config::config_dir()?;
    let settings = NotificationSettings::load(&settings_dir);

    log_block_start!("Location: {}", ctx.fix.place);
    super::log_schedule(&schedule, &settings);
    log_end!();
    Ok(())
}
