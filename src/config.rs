//! Configuration loading and validation.
//!
//! athand reads `athand.toml` from `$XDG_CONFIG_HOME/athand/` (or the
//! directory given with `--config`). Coordinates may live either in the
//! main file or in a separate `geo.toml` next to it, so the main settings
//! can be version controlled while the location stays private.
//!
//! ```toml
//! #[Location]
//! latitude = 24.7136        # Geographic latitude (-90 to 90)
//! longitude = 46.6753       # Geographic longitude (-180 to 180)
//!
//! #[Calculation]
//! method = "makkah"         # "mwl", "makkah", "egypt", "karachi", "isna", "jafari"
//! asr = "shafii"            # "shafii" or "hanafi"
//! high_latitude_rule = "midnight"  # "none", "midnight", "one_seventh", "angle_based"
//! ```
//!
//! A commented default file is generated on first run. Invalid values are
//! rejected at load time with messages naming the offending field.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::location::Fix;
use crate::oracle::{AsrMethod, CalculationMethod, HighLatitudeRule, Oracle};

const CONFIG_FILENAME: &str = "athand.toml";
const GEO_FILENAME: &str = "geo.toml";

// Custom config directory from --config, set once at startup
static CUSTOM_CONFIG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Override the configuration directory (from the `--config` flag).
pub fn set_config_dir(dir: &str) -> Result<()> {
    let path = PathBuf::from(dir);
    if !path.is_dir() {
        bail!("--config directory does not exist: {dir}");
    }
    CUSTOM_CONFIG_DIR
        .set(path)
        .map_err(|_| anyhow::anyhow!("config directory already set"))
}

/// Separate coordinates file (optional), kept out of the main config.
#[derive(Debug, Deserialize)]
struct GeoFile {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// Application settings loaded from `athand.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Config {
    /// Geographic latitude in degrees (-90 to 90).
    pub latitude: Option<f64>,
    /// Geographic longitude in degrees (-180 to 180).
    pub longitude: Option<f64>,
    /// Calculation method (jurisprudential parameter set).
    pub method: Option<CalculationMethod>,
    /// Asr juristic method.
    pub asr: Option<AsrMethod>,
    /// Fallback rule for latitudes where twilight angles are unreachable.
    pub high_latitude_rule: Option<HighLatitudeRule>,
}

impl Config {
    pub fn config_filename() -> &'static str {
        CONFIG_FILENAME
    }

    /// Resolve the configuration directory: `--config` override or
    /// `$XDG_CONFIG_HOME/athand`.
    pub fn config_dir() -> Result<PathBuf> {
        if let Some(custom) = CUSTOM_CONFIG_DIR.get() {
            return Ok(custom.clone());
        }
        dirs::config_dir()
            .map(|base| base.join("athand"))
            .context("could not determine the user configuration directory")
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILENAME))
    }

    /// Load the configuration, generating a commented default file on
    /// first run, merging `geo.toml` coordinates, and validating.
    pub fn load() -> Result<Self> {
        let dir = Self::config_dir()?;
        let path = dir.join(CONFIG_FILENAME);

        if !path.exists() {
            create_default_config(&path)?;
            log_block_start!("Created default configuration: {}", path.display());
        }

        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("invalid configuration in {}", path.display()))?;

        // geo.toml overrides only when the main config has no coordinates
        if config.latitude.is_none() || config.longitude.is_none() {
            if let Some(dir) = path.parent() {
                if let Some(geo) = load_geo_file(&dir.join(GEO_FILENAME))? {
                    config.latitude = config.latitude.or(geo.latitude);
                    config.longitude = config.longitude.or(geo.longitude);
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let (Some(lat), Some(lon)) = (self.latitude, self.longitude) {
            crate::location::validate_coordinates(lat, lon)?;
        }
        if self.latitude.is_some() != self.longitude.is_some() {
            bail!("latitude and longitude must be configured together");
        }
        Ok(())
    }

    pub fn method(&self) -> CalculationMethod {
        self.method.unwrap_or_default()
    }

    pub fn asr(&self) -> AsrMethod {
        self.asr.unwrap_or_default()
    }

    pub fn high_latitude_rule(&self) -> HighLatitudeRule {
        self.high_latitude_rule.unwrap_or_default()
    }

    /// Oracle configured from this config's calculation parameters.
    pub fn oracle(&self) -> Oracle {
        Oracle::new(self.method(), self.asr(), self.high_latitude_rule())
    }

    /// Log the loaded configuration as an indented block.
    pub fn log_config(&self, fix: Option<&Fix>) {
        log_block_start!("Loaded configuration");

        match fix {
            Some(fix) => {
                let lat_dir = if fix.latitude >= 0.0 { "N" } else { "S" };
                let lon_dir = if fix.longitude >= 0.0 { "E" } else { "W" };
                log_indented!(
                    "Location: {:.3}°{}, {:.3}°{} ({})",
                    fix.latitude.abs(),
                    lat_dir,
                    fix.longitude.abs(),
                    lon_dir,
                    fix.place
                );
                log_indented!("Timezone: {}", fix.timezone);
            }
            None => {
                log_indented!("Location: not configured");
            }
        }

        log_indented!("Method: {}", self.method().as_str());
        log_indented!("Asr: {}", self.asr().as_str());
        log_indented!("High latitude rule: {}", self.high_latitude_rule().as_str());
    }
}

fn load_geo_file(path: &Path) -> Result<Option<GeoFile>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let geo: GeoFile = toml::from_str(&contents)
        .with_context(|| format!("invalid coordinates in {}", path.display()))?;
    Ok(Some(geo))
}

/// Write a commented default configuration file.
fn create_default_config(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let contents = r#"#[Location]
# Coordinates may also live in a separate geo.toml next to this file.
#latitude = 24.7136       # Geographic latitude (-90 to 90)
#longitude = 46.6753      # Geographic longitude (-180 to 180)

#[Calculation]
method = "makkah"          # "mwl", "makkah", "egypt", "karachi", "isna", "jafari"
asr = "shafii"             # "shafii" or "hanafi"
high_latitude_rule = "midnight"  # "none", "midnight", "one_seventh", "angle_based"
"#;

    std::fs::write(path, contents)
        .with_context(|| format!("failed to write default configuration to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILENAME);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_a_complete_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "latitude = 24.7\nlongitude = 46.7\nmethod = \"egypt\"\nasr = \"hanafi\"\n",
        );

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.method(), CalculationMethod::Egypt);
        assert_eq!(config.asr(), AsrMethod::Hanafi);
        assert_eq!(config.high_latitude_rule(), HighLatitudeRule::Midnight);
        assert_eq!(config.latitude, Some(24.7));
    }

    #[test]
    fn defaults_apply_when_fields_are_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "");

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.method(), CalculationMethod::Makkah);
        assert_eq!(config.asr(), AsrMethod::Shafii);
        assert_eq!(config.latitude, None);
    }

    #[test]
    fn geo_file_supplies_missing_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "method = \"mwl\"\n");
        std::fs::write(
            dir.path().join(GEO_FILENAME),
            "latitude = 21.4225\nlongitude = 39.8262\n",
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.latitude, Some(21.4225));
        assert_eq!(config.longitude, Some(39.8262));
    }

    #[test]
    fn main_config_coordinates_win_over_geo_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "latitude = 1.0\nlongitude = 2.0\n");
        std::fs::write(
            dir.path().join(GEO_FILENAME),
            "latitude = 50.0\nlongitude = 60.0\n",
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!((config.latitude, config.longitude), (Some(1.0), Some(2.0)));
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "latitude = 95.0\nlongitude = 10.0\n");
        assert!(Config::load_from_path(&path).is_err());
    }

    #[test]
    fn rejects_lone_latitude() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "latitude = 24.7\n");
        assert!(Config::load_from_path(&path).is_err());
    }

    #[test]
    fn rejects_unknown_method() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "method = \"lunar\"\n");
        assert!(Config::load_from_path(&path).is_err());
    }

    #[test]
    fn generated_default_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        create_default_config(&path).unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.method(), CalculationMethod::Makkah);
        assert_eq!(config.latitude, None);
    }
}
