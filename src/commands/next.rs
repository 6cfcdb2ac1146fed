//! Implementation of the next command.
//!
//! Prints the next upcoming prayer for the configured location and the
//! time remaining until it.

use anyhow::Result;
use chrono::{Duration, Utc};

use crate::prayer;

/// Handle the next command: resolve and print the next prayer.
pub fn handle_next_command(debug_enabled: bool) -> Result<()> {
    log_version!();

    let Some(ctx) = super::load_context()? else {
        return Ok(());
    };
    if debug_enabled {
        ctx.config.log_config(Some(&ctx.fix));
    }

    let oracle = ctx.config.oracle();
    let now = Utc::now().with_timezone(&ctx.fix.timezone);
    let today = oracle.compute(
        ctx.fix.latitude,
        ctx.fix.longitude,
        ctx.fix.timezone,
        now.date_naive(),
    )?;

    let next = prayer::resolve_next(&today, now, || {
        oracle
            .compute(
                ctx.fix.latitude,
                ctx.fix.longitude,
                ctx.fix.timezone,
                now.date_naive() + Duration::days(1),
            )
            .ok()
    });

    match next {
        Some(pt) => {
            log_block_start!(
                "Next prayer: {} at {} (in {})",
                pt.name,
                pt.at.format("%H:%M"),
                super::format_countdown(now, pt.at)
            );
        }
        None => {
            log_pipe!();
            log_warning!("Could not determine the next prayer");
            log_indented!("Tomorrow's schedule is unavailable for this location");
        }
    }
    log_end!();
    Ok(())
}
