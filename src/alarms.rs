//! Recurring notification alarms keyed by prayer name.
//!
//! `build_alarms` is the pure half: it maps a day's schedule plus the
//! settings onto the set of registrations to install. `AlarmRegistry`
//! is the stateful half: it holds at most one registration per prayer
//! name (installing replaces any previous one with the same identifier),
//! computes the next wall-clock trigger, and fires due alarms through an
//! [`AlarmSink`].
//!
//! Triggers repeat daily at the (hour, minute) of the instant they were
//! built from. This is a known approximation carried over from the
//! original behavior: the true solar-based time shifts from day to day,
//! but registrations are only rebuilt on settings changes, reloads, and
//! resume, not every midnight.

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;

use crate::prayer::{DailySchedule, PrayerName};
use crate::settings::NotificationSettings;

/// A recurring local-alarm registration. Identifier = prayer name.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledAlarm {
    pub id: PrayerName,
    pub hour: u32,
    pub minute: u32,
    pub title: String,
    pub body: String,
}

impl ScheduledAlarm {
    fn trigger_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0)
            .unwrap_or_else(|| unreachable!("trigger taken from a valid instant"))
    }
}

/// Build the alarms for one day's schedule, skipping disabled prayers.
pub fn build_alarms(
    today: &DailySchedule,
    settings: &NotificationSettings,
) -> Vec<ScheduledAlarm> {
    today
        .times()
        .iter()
        .filter(|pt| settings.is_enabled(pt.name))
        .map(|pt| ScheduledAlarm {
            id: pt.name,
            hour: pt.at.hour(),
            minute: pt.at.minute(),
            title: pt.name.notification_title().to_string(),
            body: pt.name.notification_body(),
        })
        .collect()
}

/// Delivery seam for fired alarms.
pub trait AlarmSink {
    fn deliver(&self, alarm: &ScheduledAlarm) -> Result<()>;
}

/// Delivers alarms as desktop notifications.
pub struct DesktopNotifier;

impl AlarmSink for DesktopNotifier {
    fn deliver(&self, alarm: &ScheduledAlarm) -> Result<()> {
        notify_rust::Notification::new()
            .appname("athand")
            .summary(&alarm.title)
            .body(&alarm.body)
            .show()?;
        Ok(())
    }
}

struct Registration {
    alarm: ScheduledAlarm,
    /// Date this registration last fired, to prevent double delivery
    /// within one day. Set on install for triggers already passed, so a
    /// daemon started mid-afternoon does not replay the morning alarms.
    fired_on: Option<NaiveDate>,
}

/// Holds the installed registrations, at most one per prayer name.
pub struct AlarmRegistry {
    timezone: Tz,
    registrations: Vec<Registration>,
}

impl AlarmRegistry {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            registrations: Vec::new(),
        }
    }

    /// Install a batch of alarms, replacing the full previous set:
    /// each incoming alarm removes any existing registration with the
    /// same identifier first, and identifiers absent from the batch are
    /// dropped. Re-installing an identical batch is a no-op in effect.
    pub fn install(&mut self, alarms: Vec<ScheduledAlarm>, now: DateTime<Tz>) {
        let today = now.date_naive();

        self.registrations
            .retain(|reg| alarms.iter().any(|alarm| alarm.id == reg.alarm.id));

        for alarm in alarms {
            // remove any existing registration for the same prayer
            self.registrations.retain(|reg| reg.alarm.id != alarm.id);

            let already_passed = alarm.trigger_time() <= now.time();
            self.registrations.push(Registration {
                alarm,
                fired_on: already_passed.then_some(today),
            });
        }
    }

    /// The installed alarms, in schedule order.
    pub fn alarms(&self) -> Vec<&ScheduledAlarm> {
        let mut alarms: Vec<&ScheduledAlarm> = self
            .registrations
            .iter()
            .map(|reg| &reg.alarm)
            .collect();
        alarms.sort_by_key(|alarm| {
            PrayerName::ALL
                .iter()
                .position(|&name| name == alarm.id)
                .unwrap_or(usize::MAX)
        });
        alarms
    }

    /// Earliest upcoming trigger, or `None` when nothing is installed.
    /// A registration that is due but unfired counts as "now".
    pub fn next_trigger(&self, now: DateTime<Tz>) -> Option<DateTime<Tz>> {
        let today = now.date_naive();

        self.registrations
            .iter()
            .filter_map(|reg| {
                let time = reg.alarm.trigger_time();
                if reg.fired_on == Some(today) || time <= now.time() {
                    if reg.fired_on == Some(today) {
                        self.occurrence(today + Duration::days(1), time)
                    } else {
                        Some(now) // due, unfired
                    }
                } else {
                    self.occurrence(today, time)
                }
            })
            .min()
    }

    /// Fire every registration whose trigger has passed today and has not
    /// fired yet. A failed delivery is reported and the registration is
    /// still marked fired, so one bad alarm neither aborts its siblings
    /// nor retries in a loop. Returns the number delivered.
    pub fn fire_due(&mut self, now: DateTime<Tz>, sink: &dyn AlarmSink) -> usize {
        let today = now.date_naive();
        let mut delivered = 0;

        for reg in &mut self.registrations {
            if reg.fired_on == Some(today) || reg.alarm.trigger_time() > now.time() {
                continue;
            }

            reg.fired_on = Some(today);
            match sink.deliver(&reg.alarm) {
                Ok(()) => {
                    delivered += 1;
                    log_block_start!(
                        "{} ({:02}:{:02}) notification sent",
                        reg.alarm.id,
                        reg.alarm.hour,
                        reg.alarm.minute
                    );
                }
                Err(e) => {
                    log_pipe!();
                    log_error!("Failed to deliver {} notification: {}", reg.alarm.id, e);
                }
            }
        }

        delivered
    }

    fn occurrence(&self, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
        // earliest() picks the first occurrence on DST overlap; a DST gap
        // yields None and the registration is skipped for that day
        self.timezone
            .from_local_datetime(&date.and_time(time))
            .earliest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prayer::DailySchedule;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tz() -> Tz {
        "Asia/Riyadh".parse().unwrap()
    }

    fn schedule() -> DailySchedule {
        let date = NaiveDate::from_ymd_opt(2024, 7, 2).unwrap();
        let instants = [(5, 10), (6, 30), (12, 5), (15, 20), (18, 0), (19, 20)]
            .map(|(h, m)| tz().with_ymd_and_hms(2024, 7, 2, h, m, 0).single().unwrap());
        DailySchedule::new(date, instants).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Tz> {
        tz().with_ymd_and_hms(2024, 7, 2, h, m, 0).single().unwrap()
    }

    struct NullSink;
    impl AlarmSink for NullSink {
        fn deliver(&self, _alarm: &ScheduledAlarm) -> Result<()> {
            Ok(())
        }
    }

    struct FlakySink {
        fail_for: PrayerName,
        delivered: AtomicUsize,
    }
    impl AlarmSink for FlakySink {
        fn deliver(&self, alarm: &ScheduledAlarm) -> Result<()> {
            if alarm.id == self.fail_for {
                anyhow::bail!("bus unavailable");
            }
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn disabled_prayer_is_skipped_others_keep_triggers() {
        let all_on = build_alarms(&schedule(), &NotificationSettings::default());
        assert_eq!(all_on.len(), 6);

        let mut settings = NotificationSettings::default();
        settings.set(PrayerName::Sunrise, false);
        let five = build_alarms(&schedule(), &settings);

        assert_eq!(five.len(), 5);
        assert!(five.iter().all(|alarm| alarm.id != PrayerName::Sunrise));
        for alarm in &five {
            let original = all_on
                .iter()
                .find(|a| a.id == alarm.id)
                .expect("same prayer present in full set");
            assert_eq!((alarm.hour, alarm.minute), (original.hour, original.minute));
        }
    }

    #[test]
    fn reinstalling_identical_batch_is_idempotent() {
        let mut registry = AlarmRegistry::new(tz());
        let now = at(9, 0);

        registry.install(build_alarms(&schedule(), &NotificationSettings::default()), now);
        registry.install(build_alarms(&schedule(), &NotificationSettings::default()), now);

        let alarms = registry.alarms();
        assert_eq!(alarms.len(), 6);
        let ids: Vec<PrayerName> = alarms.iter().map(|a| a.id).collect();
        assert_eq!(ids, PrayerName::ALL.to_vec());
    }

    #[test]
    fn toggling_off_removes_exactly_that_registration() {
        let mut registry = AlarmRegistry::new(tz());
        let now = at(9, 0);
        registry.install(build_alarms(&schedule(), &NotificationSettings::default()), now);

        let mut settings = NotificationSettings::default();
        settings.set(PrayerName::Asr, false);
        registry.install(build_alarms(&schedule(), &settings), now);

        let alarms = registry.alarms();
        assert_eq!(alarms.len(), 5);
        assert!(alarms.iter().all(|a| a.id != PrayerName::Asr));
        assert_eq!((alarms[2].hour, alarms[2].minute), (12, 5)); // dhuhr untouched
    }

    #[test]
    fn past_triggers_do_not_replay_on_startup() {
        let mut registry = AlarmRegistry::new(tz());
        registry.install(
            build_alarms(&schedule(), &NotificationSettings::default()),
            at(17, 0),
        );

        // nothing between 12:05 (already passed) and 18:00 is due
        assert_eq!(registry.fire_due(at(17, 0), &NullSink), 0);

        let next = registry.next_trigger(at(17, 0)).unwrap();
        assert_eq!((next.hour(), next.minute()), (18, 0));
    }

    #[test]
    fn one_failed_delivery_does_not_abort_the_batch() {
        let mut registry = AlarmRegistry::new(tz());
        registry.install(
            build_alarms(&schedule(), &NotificationSettings::default()),
            at(4, 0),
        );

        let sink = FlakySink {
            fail_for: PrayerName::Dhuhr,
            delivered: AtomicUsize::new(0),
        };
        crate::logger::Log::set_enabled(false);
        let delivered = registry.fire_due(at(20, 0), &sink);
        crate::logger::Log::set_enabled(true);

        assert_eq!(delivered, 5);
        assert_eq!(sink.delivered.load(Ordering::SeqCst), 5);
        // the failed alarm is marked fired, not retried
        assert_eq!(registry.fire_due(at(20, 1), &NullSink), 0);
    }

    #[test]
    fn fired_alarm_recurs_the_next_day() {
        let mut registry = AlarmRegistry::new(tz());
        registry.install(
            build_alarms(&schedule(), &NotificationSettings::default()),
            at(4, 0),
        );

        crate::logger::Log::set_enabled(false);
        registry.fire_due(at(5, 10), &NullSink);
        crate::logger::Log::set_enabled(true);

        let next = registry.next_trigger(at(5, 11)).unwrap();
        assert_eq!((next.hour(), next.minute()), (6, 30));

        // after isha fires, the earliest trigger is tomorrow's fajr
        crate::logger::Log::set_enabled(false);
        registry.fire_due(at(19, 30), &NullSink);
        crate::logger::Log::set_enabled(true);
        let next = registry.next_trigger(at(19, 31)).unwrap();
        assert_eq!(next.date_naive(), NaiveDate::from_ymd_opt(2024, 7, 3).unwrap());
        assert_eq!((next.hour(), next.minute()), (5, 10));
    }
}
