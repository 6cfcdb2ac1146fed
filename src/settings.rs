//! Per-prayer notification toggles, persisted across restarts.
//!
//! The on-disk record is a small TOML table mapping the six Arabic prayer
//! names to booleans, stored as `settings.toml` next to the main config.
//! All six keys are always present in memory; a missing file (or a missing
//! key) means "enabled". Every mutation is persisted synchronously with an
//! atomic rename.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::prayer::PrayerName;

pub const SETTINGS_FILENAME: &str = "settings.toml";

#[derive(Debug, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    notifications: BTreeMap<String, bool>,
}

/// Enabled/disabled map over the six prayers. Defaults to all-true.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationSettings {
    enabled: [bool; 6],
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self { enabled: [true; 6] }
    }
}

impl NotificationSettings {
    /// Load from `settings.toml` under `dir`, falling back to all-true
    /// defaults when the file is absent. A corrupt file is reported and
    /// treated as absent rather than aborting startup.
    pub fn load(dir: &Path) -> Self {
        let path = Self::path_in(dir);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(_) => return Self::default(),
        };

        match toml::from_str::<SettingsFile>(&contents) {
            Ok(file) => {
                let mut settings = Self::default();
                for name in PrayerName::ALL {
                    if let Some(&enabled) = file.notifications.get(name.arabic()) {
                        settings.set(name, enabled);
                    }
                }
                settings
            }
            Err(e) => {
                log_pipe!();
                log_warning!("Failed to parse {}: {}", path.display(), e);
                log_indented!("Using default notification settings (all enabled)");
                Self::default()
            }
        }
    }

    /// Persist to `settings.toml` under `dir` via an atomic rename.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let file = SettingsFile {
            notifications: PrayerName::ALL
                .into_iter()
                .map(|name| (name.arabic().to_string(), self.is_enabled(name)))
                .collect(),
        };
        let contents =
            toml::to_string_pretty(&file).context("failed to serialize notification settings")?;

        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .context("failed to create temporary settings file")?;
        tmp.write_all(contents.as_bytes())
            .context("failed to write notification settings")?;
        tmp.persist(Self::path_in(dir))
            .context("failed to persist notification settings")?;
        Ok(())
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(SETTINGS_FILENAME)
    }

    pub fn is_enabled(&self, name: PrayerName) -> bool {
        self.enabled[Self::index(name)]
    }

    pub fn set(&mut self, name: PrayerName, enabled: bool) {
        self.enabled[Self::index(name)] = enabled;
    }

    /// Flip one prayer's setting, returning the new value.
    pub fn toggle(&mut self, name: PrayerName) -> bool {
        let index = Self::index(name);
        self.enabled[index] = !self.enabled[index];
        self.enabled[index]
    }

    fn index(name: PrayerName) -> usize {
        PrayerName::ALL
            .iter()
            .position(|&n| n == name)
            .unwrap_or_else(|| unreachable!("ALL contains every variant"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_file_defaults_to_all_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let settings = NotificationSettings::load(dir.path());
        for name in PrayerName::ALL {
            assert!(settings.is_enabled(name));
        }
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();

        let mut settings = NotificationSettings::default();
        settings.set(PrayerName::Sunrise, false);
        settings.set(PrayerName::Isha, false);
        settings.save(dir.path()).unwrap();

        let reloaded = NotificationSettings::load(dir.path());
        assert_eq!(reloaded, settings);
        assert!(!reloaded.is_enabled(PrayerName::Sunrise));
        assert!(reloaded.is_enabled(PrayerName::Fajr));
    }

    #[test]
    fn keys_on_disk_are_arabic_labels() {
        let dir = tempfile::tempdir().unwrap();
        NotificationSettings::default().save(dir.path()).unwrap();

        let contents =
            std::fs::read_to_string(NotificationSettings::path_in(dir.path())).unwrap();
        assert!(contents.contains("الفجر"));
        assert!(contents.contains("العشاء"));
    }

    #[test]
    fn toggle_flips_and_reports() {
        let mut settings = NotificationSettings::default();
        assert!(!settings.toggle(PrayerName::Dhuhr));
        assert!(!settings.is_enabled(PrayerName::Dhuhr));
        assert!(settings.toggle(PrayerName::Dhuhr));
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(NotificationSettings::path_in(dir.path()), "not [ toml").unwrap();

        crate::logger::Log::set_enabled(false);
        let settings = NotificationSettings::load(dir.path());
        crate::logger::Log::set_enabled(true);
        assert_eq!(settings, NotificationSettings::default());
    }
}
