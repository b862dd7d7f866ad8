use crate::doc_types::{DocTypeCatalog, DocTypesFile};
use crate::feed::clamp_window;
use crate::reminders::DEFAULT_REMINDER_DAYS;
use crate::status::Thresholds;
use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const DASHBOARD_FILE: &str = "dashboard.toml";
pub const DOC_TYPES_FILE: &str = "doc_types.yaml";

/// Everything the dashboard core can be tuned with.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FleetConfig {
    pub thresholds: Thresholds,
    pub feed: FeedConfig,
    pub reminders: ReminderConfig,
    pub doc_types: DocTypeCatalog,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub window_days: i64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { window_days: 60 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub days: Vec<i64>,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            days: DEFAULT_REMINDER_DAYS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct DashboardFile {
    thresholds: Thresholds,
    feed: FeedConfig,
    reminders: ReminderConfig,
}

impl FleetConfig {
    /// Loads `dashboard.toml` and `doc_types.yaml` from `path`. A missing file
    /// keeps the built-in defaults for its section.
    pub fn load_from_dir(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(anyhow!("config directory not found: {}", path.display()));
        }

        let dashboard_path = path.join(DASHBOARD_FILE);
        let dashboard: DashboardFile = if dashboard_path.exists() {
            let raw = fs::read_to_string(&dashboard_path)
                .with_context(|| format!("reading {}", dashboard_path.display()))?;
            toml::from_str(&raw).with_context(|| format!("parsing {}", dashboard_path.display()))?
        } else {
            debug!("{} not found, using default thresholds", dashboard_path.display());
            DashboardFile::default()
        };

        let doc_types_path = path.join(DOC_TYPES_FILE);
        let doc_types: DocTypesFile = if doc_types_path.exists() {
            let raw = fs::read_to_string(&doc_types_path)
                .with_context(|| format!("reading {}", doc_types_path.display()))?;
            serde_yaml::from_str(&raw)
                .with_context(|| format!("parsing {}", doc_types_path.display()))?
        } else {
            debug!("{} not found, using built-in document types", doc_types_path.display());
            DocTypesFile::default()
        };

        let config = Self::from_parts(dashboard, doc_types)?;
        info!(
            critical_days = config.thresholds.critical_days,
            warning_days = config.thresholds.warning_days,
            window_days = config.feed.window_days,
            "loaded fleet config from {}",
            path.display()
        );
        Ok(config)
    }

    fn from_parts(dashboard: DashboardFile, doc_types: DocTypesFile) -> Result<Self> {
        dashboard.thresholds.validate()?;

        let mut reminder_days: Vec<i64> = dashboard
            .reminders
            .days
            .into_iter()
            .filter(|days| *days >= 0)
            .collect();
        reminder_days.sort_unstable_by(|a, b| b.cmp(a));
        reminder_days.dedup();

        Ok(Self {
            thresholds: dashboard.thresholds,
            feed: FeedConfig {
                window_days: clamp_window(dashboard.feed.window_days),
            },
            reminders: ReminderConfig {
                days: reminder_days,
            },
            doc_types: DocTypeCatalog::from_file(doc_types),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_dir_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = FleetConfig::load_from_dir(dir.path()).unwrap();
        assert_eq!(config, FleetConfig::default());
        assert_eq!(config.thresholds, Thresholds::default());
        assert_eq!(config.reminders.days, [30, 15, 10, 7, 1]);
    }

    #[test]
    fn files_override_sections() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(DASHBOARD_FILE),
            "[thresholds]\ncritical_days = 5\n\n[feed]\nwindow_days = 900\n\n[reminders]\ndays = [1, 400, 14, 14, -2]\n",
        )
        .unwrap();
        fs::write(
            dir.path().join(DOC_TYPES_FILE),
            "maintenance:\n  - service_oil\n  - tyre_change\n",
        )
        .unwrap();

        let config = FleetConfig::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.thresholds.critical_days, 5);
        assert_eq!(config.thresholds.warning_days, 30);
        assert_eq!(config.feed.window_days, 365);
        assert_eq!(config.reminders.days, [400, 14, 1]);
        assert!(config.doc_types.is_maintenance("tyre_change"));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(DASHBOARD_FILE),
            "[thresholds]\ncritical_days = 40\nwarning_days = 30\n",
        )
        .unwrap();
        assert!(FleetConfig::load_from_dir(dir.path()).is_err());
    }

    #[test]
    fn bundled_config_matches_defaults() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config");
        let config = FleetConfig::load_from_dir(&dir).unwrap();
        assert_eq!(config, FleetConfig::default());
    }

    #[test]
    fn missing_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FleetConfig::load_from_dir(&dir.path().join("nope")).is_err());
    }
}
