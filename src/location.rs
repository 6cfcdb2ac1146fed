//! Coordinate resolution and place labeling.
//!
//! The daemon has no platform location service; coordinates come from
//! configuration (`geo.toml` next to the main config, or the main config
//! itself). From the coordinates we derive the IANA timezone of the
//! location so the schedule is computed in the coordinates' own civil
//! time, and a human-readable place label for display.

use anyhow::{Context, Result, bail};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use tzf_rs::DefaultFinder;

use crate::config::Config;

// Building the finder parses the embedded timezone geometry; do it once.
static TZ_FINDER: Lazy<DefaultFinder> = Lazy::new(DefaultFinder::new);

/// A resolved location fix: coordinates plus derived timezone and label.
#[derive(Debug, Clone)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Tz,
    pub place: String,
}

/// Resolve the configured coordinates into a full location fix.
///
/// Fails when no coordinates are configured (location-acquisition
/// failure) or they are out of range. Timezone lookup failure degrades
/// to UTC with an "unknown location" label rather than failing, so a
/// schedule can still be produced.
pub fn resolve(config: &Config) -> Result<Fix> {
    let (latitude, longitude) = match (config.latitude, config.longitude) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => bail!(
            "no coordinates configured; set latitude/longitude in {} or geo.toml",
            Config::config_filename()
        ),
    };

    validate_coordinates(latitude, longitude)?;

    let tz_name = TZ_FINDER.get_tz_name(longitude, latitude);
    let (timezone, place) = if tz_name.is_empty() {
        log_pipe!();
        log_warning!(
            "No timezone found for {:.4}, {:.4} - falling back to UTC",
            latitude,
            longitude
        );
        (chrono_tz::UTC, String::from("Unknown location"))
    } else {
        let timezone: Tz = tz_name
            .parse()
            .with_context(|| format!("unrecognized timezone '{tz_name}'"))?;
        (timezone, place_from_zone(tz_name))
    };

    Ok(Fix {
        latitude,
        longitude,
        timezone,
        place,
    })
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) {
        bail!("latitude {latitude} is out of range (-90 to 90)");
    }
    if !(-180.0..=180.0).contains(&longitude) {
        bail!("longitude {longitude} is out of range (-180 to 180)");
    }
    Ok(())
}

/// Derive a display label from an IANA zone name:
/// "Asia/Riyadh" → "Riyadh", "America/Argentina/Buenos_Aires" → "Buenos Aires".
fn place_from_zone(tz_name: &str) -> String {
    tz_name
        .rsplit('/')
        .next()
        .unwrap_or(tz_name)
        .replace('_', " ")
}
