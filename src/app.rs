//! Main application flow for the notification daemon.
//!
//! `Athand::run()` performs startup (lock file, signal handler, config,
//! location fix, first schedule) and then enters the monitoring loop. The
//! loop blocks on the signal channel with a timeout aimed at the next alarm
//! trigger or the next midnight, whichever comes first, so the process
//! spends nearly all of its life asleep.
//!
//! Loop wakeups:
//! - timeout: fire due alarms, refresh the displayed schedule on a date
//!   change (installed triggers keep their registered times)
//! - `Reload` (SIGUSR2 or `athand toggle`): re-read settings and config,
//!   rebuild the registrations
//! - `Resume` (D-Bus sleep monitor): recompute the schedule, the clock may
//!   have jumped days ahead
//! - `Shutdown`: clean up the lock file and exit

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::atomic::Ordering;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use crate::alarms::{AlarmRegistry, DesktopNotifier, build_alarms};
use crate::commands::log_schedule;
use crate::config::Config;
use crate::location::{self, Fix};
use crate::lock;
use crate::oracle::Oracle;
use crate::prayer::{self, DailySchedule};
use crate::settings::NotificationSettings;
use crate::signals::{SignalMessage, SignalState, setup_signal_handler};

// Wake slightly after the target instant so due triggers have passed
const WAKE_SLACK: Duration = Duration::from_secs(2);

/// Runner for the athand daemon.
pub struct Athand {
    debug_enabled: bool,
}

impl Athand {
    pub fn new(debug_enabled: bool) -> Self {
        Self { debug_enabled }
    }

    /// Execute the daemon: startup, monitoring loop, cleanup.
    pub fn run(self) -> Result<()> {
        log_version!();

        if self.debug_enabled {
            log_pipe!();
            log_debug!("Debug mode enabled - showing detailed daemon operations");
        }

        let signal_state = setup_signal_handler(self.debug_enabled)?;

        let config = Config::load()?;
        let fix = location::resolve(&config)?;

        let (lock_file, lock_path) = lock::acquire_lock()?;
        log_block_start!("Lock acquired, starting athand...");

        config.log_config(Some(&fix));

        if let Err(e) =
            crate::dbus::start_sleep_resume_monitor(signal_state.signal_sender.clone(), self.debug_enabled)
        {
            log_pipe!();
            log_warning!("Could not start sleep/resume monitor: {e}");
            log_indented!("Schedules will still refresh at midnight");
        }

        let result = run_daemon_loop(config, fix, &signal_state, self.debug_enabled);

        drop(lock_file);
        let _ = std::fs::remove_file(&lock_path);
        log_block_start!("Shutting down athand...");
        log_end!();

        result
    }
}

struct DaemonState {
    config: Config,
    fix: Fix,
    oracle: Oracle,
    settings: NotificationSettings,
    schedule: DailySchedule,
}

impl DaemonState {
    fn build(config: Config, fix: Fix, now: DateTime<Tz>) -> Result<Self> {
        let oracle = config.oracle();
        let schedule = oracle
            .compute(fix.latitude, fix.longitude, fix.timezone, now.date_naive())
            .context("failed to compute today's prayer schedule")?;
        let settings = NotificationSettings::load(&Config::config_dir()?);

        Ok(Self {
            config,
            fix,
            oracle,
            settings,
            schedule,
        })
    }

    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.fix.timezone)
    }

    /// Recompute the schedule for `date`, keeping config and settings.
    fn recompute(&mut self, date: chrono::NaiveDate) -> Result<()> {
        self.schedule = self
            .oracle
            .compute(self.fix.latitude, self.fix.longitude, self.fix.timezone, date)
            .context("failed to compute the prayer schedule")?;
        Ok(())
    }

    fn log_status(&self, now: DateTime<Tz>) {
        log_schedule(&self.schedule, &self.settings);

        let next = prayer::resolve_next(&self.schedule, now, || {
            self.oracle
                .compute(
                    self.fix.latitude,
                    self.fix.longitude,
                    self.fix.timezone,
                    self.schedule.date() + ChronoDuration::days(1),
                )
                .ok()
        });
        if let Some(pt) = next {
            log_block_start!(
                "Next prayer: {} at {} (in {})",
                pt.name,
                pt.at.format("%H:%M"),
                crate::commands::format_countdown(now, pt.at)
            );
        }
    }
}

fn run_daemon_loop(
    config: Config,
    fix: Fix,
    signal_state: &SignalState,
    debug_enabled: bool,
) -> Result<()> {
    let sink = DesktopNotifier;
    let mut registry = AlarmRegistry::new(fix.timezone);

    let startup_now = Utc::now().with_timezone(&fix.timezone);
    let mut state = DaemonState::build(config, fix, startup_now)?;
    let now = state.now();
    state.log_status(now);
    registry.install(build_alarms(&state.schedule, &state.settings), now);

    while signal_state.running.load(Ordering::SeqCst) {
        let now = state.now();

        // Day rolled over: the displayed schedule is stale
        if state.schedule.date() != now.date_naive() {
            refresh_daily_schedule(&mut state, now);
        }

        registry.fire_due(now, &sink);

        let sleep_duration = sleep_until_next_event(&registry, now, debug_enabled);

        match signal_state.signal_receiver.recv_timeout(sleep_duration) {
            Ok(SignalMessage::Shutdown) => break,
            Ok(SignalMessage::Reload) => {
                log_block_start!("Reloading configuration and settings...");
                reload_state(&mut state, &mut registry);
            }
            Ok(SignalMessage::Resume) => {
                let now = state.now();
                match state.recompute(now.date_naive()) {
                    Ok(()) => {
                        state.log_status(now);
                        registry.install(build_alarms(&state.schedule, &state.settings), now);
                    }
                    Err(e) => {
                        log_pipe!();
                        log_warning!("Schedule refresh after resume failed: {e}");
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                // Normal wakeup - loop back to fire due alarms
            }
            Err(RecvTimeoutError::Disconnected) => {
                if !signal_state.running.load(Ordering::SeqCst) {
                    break; // graceful shutdown
                }
                log_pipe!();
                log_warning!("Signal handler disconnected unexpectedly");
                log_indented!("Signals will no longer be processed");
                // Fall back to plain sleeping so the loop doesn't spin
                std::thread::sleep(sleep_duration);
            }
        }
    }

    Ok(())
}

/// Refresh the displayed schedule after a date rollover. Installed alarm
/// registrations keep the wall-clock triggers they were registered with;
/// only reloads, resume, and settings changes rebuild them.
fn refresh_daily_schedule(state: &mut DaemonState, now: DateTime<Tz>) {
    match state.recompute(now.date_naive()) {
        Ok(()) => state.log_status(now),
        Err(e) => {
            log_pipe!();
            log_warning!("Schedule refresh failed: {e}");
            log_indented!("Will retry at the next wakeup");
        }
    }
}

/// Re-read settings and config from disk, rebuilding everything that
/// depends on them. A config that fails to load keeps the previous one.
fn reload_state(state: &mut DaemonState, registry: &mut AlarmRegistry) {
    match Config::load() {
        Ok(config) => match location::resolve(&config) {
            Ok(fix) => {
                state.config = config;
                state.oracle = state.config.oracle();
                state.fix = fix;
            }
            Err(e) => {
                log_pipe!();
                log_warning!("Reload kept the previous location: {e}");
            }
        },
        Err(e) => {
            log_pipe!();
            log_warning!("Reload kept the previous configuration: {e}");
        }
    }

    match Config::config_dir() {
        Ok(dir) => state.settings = NotificationSettings::load(&dir),
        Err(e) => {
            log_pipe!();
            log_warning!("Reload kept the previous settings: {e}");
        }
    }

    // The schedule depends on config-derived inputs, so recompute it
    // unconditionally rather than diffing the old and new configs
    let now = state.now();
    if let Err(e) = state.recompute(now.date_naive()) {
        log_pipe!();
        log_warning!("Schedule recompute after reload failed: {e}");
    }
    state.log_status(now);

    // Rebuild the registry: the reload may have moved the timezone, and
    // install marks already-passed triggers as fired so nothing replays
    *registry = AlarmRegistry::new(state.fix.timezone);
    registry.install(build_alarms(&state.schedule, &state.settings), now);
}

/// Duration until the next alarm trigger or the next midnight, whichever
/// comes first, padded with a little slack.
fn sleep_until_next_event(registry: &AlarmRegistry, now: DateTime<Tz>, debug_enabled: bool) -> Duration {
    let midnight = next_midnight(now);
    let wake = match registry.next_trigger(now) {
        Some(trigger) => trigger.min(midnight),
        None => midnight,
    };

    let until = (wake - now).to_std().unwrap_or(Duration::ZERO) + WAKE_SLACK;
    if debug_enabled {
        log_debug!("Sleeping for {}s until the next event", until.as_secs());
    }
    until
}

fn next_midnight(now: DateTime<Tz>) -> DateTime<Tz> {
    let tomorrow = now.date_naive() + ChronoDuration::days(1);
    now.timezone()
        .from_local_datetime(&tomorrow.and_time(chrono::NaiveTime::MIN))
        .earliest()
        // a DST gap at midnight is resolved by waking an hour into the new day
        .unwrap_or(now + ChronoDuration::hours(25))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prayer::PrayerName;
    use chrono::NaiveDate;

    fn riyadh() -> Tz {
        "Asia/Riyadh".parse().unwrap()
    }

    fn state_for(date: NaiveDate) -> DaemonState {
        let mut config = Config::default();
        config.latitude = Some(24.71);
        config.longitude = Some(46.68);
        let fix = Fix {
            latitude: 24.71,
            longitude: 46.68,
            timezone: riyadh(),
            place: "Riyadh".to_string(),
        };
        let oracle = config.oracle();
        let schedule = oracle
            .compute(fix.latitude, fix.longitude, fix.timezone, date)
            .unwrap();
        DaemonState {
            config,
            fix,
            oracle,
            settings: NotificationSettings::default(),
            schedule,
        }
    }

    #[test]
    fn date_rollover_refreshes_schedule_but_keeps_installed_triggers() {
        let tz = riyadh();
        let day_one = NaiveDate::from_ymd_opt(2024, 7, 2).unwrap();
        let mut state = state_for(day_one);

        let mut registry = AlarmRegistry::new(tz);
        let installed_at = tz.with_ymd_and_hms(2024, 7, 2, 9, 0, 0).single().unwrap();
        registry.install(build_alarms(&state.schedule, &state.settings), installed_at);
        let registered: Vec<(PrayerName, u32, u32)> = registry
            .alarms()
            .iter()
            .map(|a| (a.id, a.hour, a.minute))
            .collect();

        // first wakeup after midnight on a later day, when the solar
        // times have moved by a few minutes
        let after_midnight = tz.with_ymd_and_hms(2024, 7, 20, 0, 0, 5).single().unwrap();
        crate::logger::Log::set_enabled(false);
        refresh_daily_schedule(&mut state, after_midnight);
        crate::logger::Log::set_enabled(true);

        assert_eq!(state.schedule.date(), after_midnight.date_naive());
        let still_registered: Vec<(PrayerName, u32, u32)> = registry
            .alarms()
            .iter()
            .map(|a| (a.id, a.hour, a.minute))
            .collect();
        assert_eq!(still_registered, registered);
    }

    #[test]
    fn failed_refresh_keeps_the_previous_schedule() {
        let day_one = NaiveDate::from_ymd_opt(2024, 7, 2).unwrap();
        let mut state = state_for(day_one);
        // move far enough north that the default angles never resolve
        state.fix.latitude = 78.0;

        let next_day = riyadh().with_ymd_and_hms(2024, 7, 3, 0, 0, 5).single().unwrap();
        crate::logger::Log::set_enabled(false);
        refresh_daily_schedule(&mut state, next_day);
        crate::logger::Log::set_enabled(true);

        assert_eq!(state.schedule.date(), day_one);
    }
}
