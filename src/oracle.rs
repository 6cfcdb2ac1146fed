//! Astronomical prayer time computation.
//!
//! Implements the PrayTimes.org calculation: sun declination and the
//! equation of time from the Julian date, then each prayer as the instant
//! the sun reaches a method-specific depression angle. The oracle is a
//! pure function of (coordinates, date, configuration) and yields a
//! validated [`DailySchedule`] in the coordinate timezone.
//!
//! Results are rounded to the minute, matching the reference
//! implementation (half a minute is added before truncation).

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Datelike, NaiveDate, Offset, TimeZone};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::prayer::DailySchedule;

/// Named parameter sets governing the jurisprudential convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMethod {
    /// Muslim World League
    Mwl,
    /// Umm al-Qura, Makkah (the original app's method)
    #[default]
    Makkah,
    /// Egyptian General Authority of Survey
    Egypt,
    /// University of Islamic Sciences, Karachi
    Karachi,
    /// Islamic Society of North America
    Isna,
    /// Ithna Ashari
    Jafari,
}

impl CalculationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationMethod::Mwl => "mwl",
            CalculationMethod::Makkah => "makkah",
            CalculationMethod::Egypt => "egypt",
            CalculationMethod::Karachi => "karachi",
            CalculationMethod::Isna => "isna",
            CalculationMethod::Jafari => "jafari",
        }
    }

    fn params(&self) -> MethodParams {
        match self {
            CalculationMethod::Mwl => MethodParams {
                fajr_angle: 18.0,
                maghrib: TwilightOffset::Minutes(0.0),
                isha: TwilightOffset::Angle(17.0),
            },
            CalculationMethod::Makkah => MethodParams {
                fajr_angle: 19.0,
                maghrib: TwilightOffset::Minutes(0.0),
                isha: TwilightOffset::Minutes(90.0),
            },
            CalculationMethod::Egypt => MethodParams {
                fajr_angle: 19.5,
                maghrib: TwilightOffset::Minutes(0.0),
                isha: TwilightOffset::Angle(17.5),
            },
            CalculationMethod::Karachi => MethodParams {
                fajr_angle: 18.0,
                maghrib: TwilightOffset::Minutes(0.0),
                isha: TwilightOffset::Angle(18.0),
            },
            CalculationMethod::Isna => MethodParams {
                fajr_angle: 15.0,
                maghrib: TwilightOffset::Minutes(0.0),
                isha: TwilightOffset::Angle(15.0),
            },
            CalculationMethod::Jafari => MethodParams {
                fajr_angle: 16.0,
                maghrib: TwilightOffset::Angle(4.0),
                isha: TwilightOffset::Angle(14.0),
            },
        }
    }
}

/// Juristic method for the Asr shadow length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AsrMethod {
    #[default]
    Shafii,
    Hanafi,
}

impl AsrMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AsrMethod::Shafii => "shafii",
            AsrMethod::Hanafi => "hanafi",
        }
    }

    fn shadow_factor(&self) -> f64 {
        match self {
            AsrMethod::Shafii => 1.0,
            AsrMethod::Hanafi => 2.0,
        }
    }
}

/// Fallback rule for latitudes where the sun never reaches the fajr/isha
/// depression angles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HighLatitudeRule {
    None,
    #[default]
    Midnight,
    OneSeventh,
    AngleBased,
}

impl HighLatitudeRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            HighLatitudeRule::None => "none",
            HighLatitudeRule::Midnight => "midnight",
            HighLatitudeRule::OneSeventh => "one_seventh",
            HighLatitudeRule::AngleBased => "angle_based",
        }
    }

    /// Portion of the night allotted to twilight for a given angle.
    fn night_portion(&self, angle: f64) -> f64 {
        match self {
            HighLatitudeRule::AngleBased => angle / 60.0,
            HighLatitudeRule::Midnight => 1.0 / 2.0,
            HighLatitudeRule::OneSeventh => 1.0 / 7.0,
            HighLatitudeRule::None => unreachable!("no adjustment requested"),
        }
    }
}

/// Maghrib/Isha are defined either by a depression angle or as a fixed
/// offset in minutes after the previous event.
#[derive(Debug, Clone, Copy)]
enum TwilightOffset {
    Angle(f64),
    Minutes(f64),
}

struct MethodParams {
    fajr_angle: f64,
    maghrib: TwilightOffset,
    isha: TwilightOffset,
}

/// Deterministic prayer time calculator.
#[derive(Debug, Clone, Copy)]
pub struct Oracle {
    method: CalculationMethod,
    asr: AsrMethod,
    high_latitude: HighLatitudeRule,
}

impl Oracle {
    pub fn new(method: CalculationMethod, asr: AsrMethod, high_latitude: HighLatitudeRule) -> Self {
        Self {
            method,
            asr,
            high_latitude,
        }
    }

    pub fn method(&self) -> CalculationMethod {
        self.method
    }

    /// Compute the six prayer instants for `date` at the given coordinates,
    /// expressed in the coordinate timezone.
    pub fn compute(
        &self,
        latitude: f64,
        longitude: f64,
        tz: Tz,
        date: NaiveDate,
    ) -> Result<DailySchedule> {
        let day = SolarDay {
            latitude,
            julian: julian_date(date) - longitude / (15.0 * 24.0),
        };
        let params = self.method.params();

        // Raw float hours at the reference meridian; seeds are the
        // conventional day fractions, one refinement pass suffices.
        let mut fajr = day.time_at_angle(180.0 - params.fajr_angle, 5.0 / 24.0);
        let mut sunrise = day.time_at_angle(180.0 - 0.833, 6.0 / 24.0);
        let mut dhuhr = day.mid_day(12.0 / 24.0);
        let mut asr = day.asr_time(self.asr.shadow_factor(), 13.0 / 24.0);
        let mut sunset = day.time_at_angle(0.833, 18.0 / 24.0);
        let mut maghrib = match params.maghrib {
            TwilightOffset::Angle(angle) => day.time_at_angle(angle, 18.0 / 24.0),
            TwilightOffset::Minutes(_) => f64::NAN, // derived from sunset below
        };
        let mut isha = match params.isha {
            TwilightOffset::Angle(angle) => day.time_at_angle(angle, 18.0 / 24.0),
            TwilightOffset::Minutes(_) => f64::NAN, // derived from maghrib below
        };

        // Shift from the reference meridian to local civil time.
        let tz_hours = utc_offset_hours(tz, date);
        let shift = tz_hours - longitude / 15.0;
        for time in [
            &mut fajr,
            &mut sunrise,
            &mut dhuhr,
            &mut asr,
            &mut sunset,
            &mut maghrib,
            &mut isha,
        ] {
            *time += shift;
        }

        if let TwilightOffset::Minutes(minutes) = params.maghrib {
            maghrib = sunset + minutes / 60.0;
        }
        if let TwilightOffset::Minutes(minutes) = params.isha {
            isha = maghrib + minutes / 60.0;
        }

        if self.high_latitude != HighLatitudeRule::None {
            let night = fix_hour(sunrise - sunset);

            let fajr_span = self.high_latitude.night_portion(params.fajr_angle) * night;
            if fajr.is_nan() || fix_hour(sunrise - fajr) > fajr_span {
                fajr = sunrise - fajr_span;
            }

            let isha_angle = match params.isha {
                TwilightOffset::Angle(angle) => angle,
                TwilightOffset::Minutes(_) => 18.0,
            };
            let isha_span = self.high_latitude.night_portion(isha_angle) * night;
            if isha.is_nan() || fix_hour(isha - sunset) > isha_span {
                isha = sunset + isha_span;
            }

            let maghrib_angle = match params.maghrib {
                TwilightOffset::Angle(angle) => angle,
                TwilightOffset::Minutes(_) => 4.0,
            };
            let maghrib_span = self.high_latitude.night_portion(maghrib_angle) * night;
            if maghrib.is_nan() || fix_hour(maghrib - sunset) > maghrib_span {
                maghrib = sunset + maghrib_span;
            }
        }

        let hours = [fajr, sunrise, dhuhr, asr, maghrib, isha];
        if hours.iter().any(|h| h.is_nan()) {
            bail!(
                "no valid prayer schedule for lat={latitude:.4}, lon={longitude:.4} on {date} \
                 (sun never reaches the required angle; set a high_latitude_rule)"
            );
        }

        let mut instants = Vec::with_capacity(6);
        for &h in &hours {
            let (hour, minute) = round_to_minute(h);
            let naive = date
                .and_hms_opt(hour, minute, 0)
                .context("computed hour out of range")?;
            let instant = tz.from_local_datetime(&naive).single().with_context(|| {
                format!("ambiguous local time {hour:02}:{minute:02} in {tz}")
            })?;
            instants.push(instant);
        }
        let instants: [DateTime<Tz>; 6] = instants
            .try_into()
            .unwrap_or_else(|_| unreachable!("six hours map to six instants"));

        DailySchedule::new(date, instants)
    }
}

/// Per-day solar geometry shared by the individual time computations.
struct SolarDay {
    latitude: f64,
    julian: f64,
}

impl SolarDay {
    /// Instant (float hours) the sun reaches depression angle `g`, seeded
    /// with day fraction `t`. Angles above 90° select the morning branch.
    fn time_at_angle(&self, g: f64, t: f64) -> f64 {
        let d = sun_declination(self.julian + t);
        let z = self.mid_day(t);
        let v = 1.0 / 15.0
            * darccos(
                (-dsin(g) - dsin(d) * dsin(self.latitude)) / (dcos(d) * dcos(self.latitude)),
            );
        z + if g > 90.0 { -v } else { v }
    }

    /// Mid-day (Dhuhr, zawal) time.
    fn mid_day(&self, t: f64) -> f64 {
        let eq_t = equation_of_time(self.julian + t);
        fix_hour(12.0 - eq_t)
    }

    /// Asr: shadow factor 1 (Shafii) or 2 (Hanafi).
    fn asr_time(&self, shadow_factor: f64, t: f64) -> f64 {
        let d = sun_declination(self.julian + t);
        let g = -darccot(shadow_factor + dtan((self.latitude - d).abs()));
        self.time_at_angle(g, t)
    }
}

fn julian_date(date: NaiveDate) -> f64 {
    let (mut year, mut month) = (date.year() as f64, date.month() as f64);
    if month <= 2.0 {
        year -= 1.0;
        month += 12.0;
    }

    let a = (year / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();

    (365.25 * (year + 4716.0)).floor() + (30.6001 * (month + 1.0)).floor() + date.day() as f64 + b
        - 1524.5
}

/// UTC offset of `tz` in hours at local noon of `date`.
fn utc_offset_hours(tz: Tz, date: NaiveDate) -> f64 {
    let noon = date
        .and_hms_opt(12, 0, 0)
        .unwrap_or_else(|| unreachable!("noon is always a valid time"));
    tz.offset_from_utc_datetime(&noon).fix().local_minus_utc() as f64 / 3600.0
}

/// Declination angle of the sun and the equation of time.
fn sun_position(jd: f64) -> (f64, f64) {
    let d = jd - 2451545.0;
    let g = fix_angle(357.529 + 0.98560028 * d);
    let q = fix_angle(280.459 + 0.98564736 * d);
    let l = fix_angle(q + 1.915 * dsin(g) + 0.020 * dsin(2.0 * g));

    let e = 23.439 - 0.00000036 * d;

    let declination = darcsin(dsin(e) * dsin(l));
    let ra = fix_hour(darctan2(dcos(e) * dsin(l), dcos(l)) / 15.0);
    let eq_t = q / 15.0 - ra;

    (declination, eq_t)
}

fn sun_declination(jd: f64) -> f64 {
    sun_position(jd).0
}

fn equation_of_time(jd: f64) -> f64 {
    sun_position(jd).1
}

// Degree-based trigonometry, as in the reference formulas

fn dsin(d: f64) -> f64 {
    d.to_radians().sin()
}

fn dcos(d: f64) -> f64 {
    d.to_radians().cos()
}

fn dtan(d: f64) -> f64 {
    d.to_radians().tan()
}

fn darcsin(x: f64) -> f64 {
    x.asin().to_degrees()
}

fn darccos(x: f64) -> f64 {
    x.acos().to_degrees()
}

fn darctan2(y: f64, x: f64) -> f64 {
    y.atan2(x).to_degrees()
}

fn darccot(x: f64) -> f64 {
    (1.0 / x).atan().to_degrees()
}

/// Range-reduce an angle to [0, 360).
fn fix_angle(a: f64) -> f64 {
    let a = a - 360.0 * (a / 360.0).floor();
    if a < 0.0 { a + 360.0 } else { a }
}

/// Range-reduce hours to [0, 24).
fn fix_hour(a: f64) -> f64 {
    let a = a - 24.0 * (a / 24.0).floor();
    if a < 0.0 { a + 24.0 } else { a }
}

/// Round float hours to (hour, minute), adding half a minute first.
fn round_to_minute(time: f64) -> (u32, u32) {
    let time = fix_hour(time + 0.5 / 60.0);
    let hour = time.floor() as u32;
    let minute = ((time - hour as f64) * 60.0).floor() as u32;
    (hour, minute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prayer::PrayerName;
    use chrono::Timelike;

    fn riyadh() -> (f64, f64, Tz) {
        (24.7136, 46.6753, "Asia/Riyadh".parse().unwrap())
    }

    #[test]
    fn riyadh_schedule_is_plausible() {
        let (lat, lon, tz) = riyadh();
        let oracle = Oracle::new(
            CalculationMethod::Makkah,
            AsrMethod::Shafii,
            HighLatitudeRule::Midnight,
        );
        let date = NaiveDate::from_ymd_opt(2024, 7, 2).unwrap();
        let schedule = oracle.compute(lat, lon, tz, date).unwrap();

        let dhuhr = schedule.time_of(PrayerName::Dhuhr);
        assert!(
            (11..=12).contains(&dhuhr.hour()),
            "dhuhr at {dhuhr} is outside the midday band"
        );

        let fajr = schedule.time_of(PrayerName::Fajr);
        assert!((3..=5).contains(&fajr.hour()), "fajr at {fajr}");

        let isha = schedule.time_of(PrayerName::Isha);
        assert!((19..=21).contains(&isha.hour()), "isha at {isha}");
    }

    #[test]
    fn makkah_isha_is_ninety_minutes_after_maghrib() {
        let (lat, lon, tz) = riyadh();
        let oracle = Oracle::new(
            CalculationMethod::Makkah,
            AsrMethod::Shafii,
            HighLatitudeRule::Midnight,
        );
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let schedule = oracle.compute(lat, lon, tz, date).unwrap();

        let gap = schedule.time_of(PrayerName::Isha) - schedule.time_of(PrayerName::Maghrib);
        // rounding to the minute can move each endpoint by up to a minute
        assert!(
            (89..=91).contains(&gap.num_minutes()),
            "maghrib→isha gap was {} minutes",
            gap.num_minutes()
        );
    }

    #[test]
    fn hanafi_asr_is_later_than_shafii() {
        let (lat, lon, tz) = riyadh();
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();

        let shafii = Oracle::new(
            CalculationMethod::Makkah,
            AsrMethod::Shafii,
            HighLatitudeRule::Midnight,
        )
        .compute(lat, lon, tz, date)
        .unwrap();
        let hanafi = Oracle::new(
            CalculationMethod::Makkah,
            AsrMethod::Hanafi,
            HighLatitudeRule::Midnight,
        )
        .compute(lat, lon, tz, date)
        .unwrap();

        assert!(hanafi.time_of(PrayerName::Asr) > shafii.time_of(PrayerName::Asr));
    }

    #[test]
    fn white_nights_need_high_latitude_rule() {
        // Copenhagen at midsummer: the sun never reaches 18° below the
        // horizon, so angle-based fajr/isha are undefined without a rule.
        let tz: Tz = "Europe/Copenhagen".parse().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();

        let strict = Oracle::new(
            CalculationMethod::Mwl,
            AsrMethod::Shafii,
            HighLatitudeRule::None,
        );
        assert!(strict.compute(55.6761, 12.5683, tz, date).is_err());

        let adjusted = Oracle::new(
            CalculationMethod::Mwl,
            AsrMethod::Shafii,
            HighLatitudeRule::AngleBased,
        );
        let schedule = adjusted.compute(55.6761, 12.5683, tz, date).unwrap();
        assert!(schedule.time_of(PrayerName::Fajr) < schedule.time_of(PrayerName::Sunrise));
    }
}
