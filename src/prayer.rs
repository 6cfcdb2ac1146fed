//! Prayer names, the daily schedule, and next-prayer resolution.
//!
//! A [`DailySchedule`] holds the six prayer instants for one calendar date
//! as `DateTime<Tz>` in the coordinate timezone. Storing full datetimes
//! instead of naive wall-clock times means comparisons handle day
//! boundaries automatically and "next prayer" is plain ordering.

use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;

/// The six daily prayers in their fixed chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrayerName {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl PrayerName {
    /// All six names in schedule order.
    pub const ALL: [PrayerName; 6] = [
        PrayerName::Fajr,
        PrayerName::Sunrise,
        PrayerName::Dhuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
    ];

    /// Arabic display label. Also the persisted settings key and the
    /// notification identifier, matching the app's external interfaces.
    pub fn arabic(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "الفجر",
            PrayerName::Sunrise => "الشروق",
            PrayerName::Dhuhr => "الظهر",
            PrayerName::Asr => "العصر",
            PrayerName::Maghrib => "المغرب",
            PrayerName::Isha => "العشاء",
        }
    }

    /// Lowercase transliterated name used on the command line.
    pub fn slug(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "fajr",
            PrayerName::Sunrise => "sunrise",
            PrayerName::Dhuhr => "dhuhr",
            PrayerName::Asr => "asr",
            PrayerName::Maghrib => "maghrib",
            PrayerName::Isha => "isha",
        }
    }

    /// Parse a CLI argument (transliterated or Arabic).
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|name| name.slug() == s || name.arabic() == s)
    }

    /// Fixed notification title shared by all six alarms.
    pub fn notification_title(&self) -> &'static str {
        "تطبيق الأذان"
    }

    /// Notification body. Fajr and Sunrise carry fixed doctrinal texts;
    /// the other four share a generic "prayer time has begun" body.
    pub fn notification_body(&self) -> String {
        match self {
            PrayerName::Fajr => {
                "دخل الآن وقت صلاة الفجر\n\
                 قال رسول الله ﷺ (من صلى الصبح فهو في ذمة الله) [رواه مسلم]"
                    .to_string()
            }
            PrayerName::Sunrise => "وقت الشروق\nخرج وقت صلاة الفجر".to_string(),
            other => format!("دخل الآن وقت صلاة {}", other.arabic()),
        }
    }
}

impl std::fmt::Display for PrayerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.arabic())
    }
}

/// A single (name, instant) pair within a daily schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct PrayerTime {
    pub name: PrayerName,
    pub at: DateTime<Tz>,
}

/// The six prayer instants for one calendar date.
///
/// Invariant: instants are strictly increasing in the fixed order
/// Fajr, Sunrise, Dhuhr, Asr, Maghrib, Isha. The constructor rejects
/// anything else, so holders of a `DailySchedule` can rely on ordering.
#[derive(Debug, Clone)]
pub struct DailySchedule {
    date: NaiveDate,
    times: [PrayerTime; 6],
}

impl DailySchedule {
    pub fn new(date: NaiveDate, instants: [DateTime<Tz>; 6]) -> Result<Self> {
        for pair in instants.windows(2) {
            if pair[1] <= pair[0] {
                bail!(
                    "prayer times for {} are not strictly increasing: {} does not follow {}",
                    date,
                    pair[1].format("%H:%M"),
                    pair[0].format("%H:%M")
                );
            }
        }

        let mut iter = PrayerName::ALL.into_iter().zip(instants);
        let times = std::array::from_fn(|_| {
            let (name, at) = iter.next().unwrap_or_else(|| unreachable!());
            PrayerTime { name, at }
        });

        Ok(Self { date, times })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// All six pairs in chronological order.
    pub fn times(&self) -> &[PrayerTime; 6] {
        &self.times
    }

    /// The earliest pair (Fajr, by construction).
    pub fn first(&self) -> &PrayerTime {
        &self.times[0]
    }

    pub fn time_of(&self, name: PrayerName) -> DateTime<Tz> {
        self.times
            .iter()
            .find(|pt| pt.name == name)
            .map(|pt| pt.at)
            .unwrap_or_else(|| unreachable!("all six names are always present"))
    }
}

/// Resolve the next upcoming prayer.
///
/// Scans today's pairs in order and returns the first one strictly after
/// `now` — equality counts as already passed, so a prayer never resolves
/// as "next" in the same second it occurs. When all six have passed, the
/// supplier is asked for tomorrow's schedule and its Fajr is returned.
/// `None` means "unknown next prayer" (e.g. no location fix); callers
/// render a placeholder rather than failing.
pub fn resolve_next<F>(today: &DailySchedule, now: DateTime<Tz>, tomorrow: F) -> Option<PrayerTime>
where
    F: FnOnce() -> Option<DailySchedule>,
{
    if let Some(upcoming) = today.times().iter().find(|pt| pt.at > now) {
        return Some(upcoming.clone());
    }

    tomorrow().map(|schedule| schedule.first().clone())
}
