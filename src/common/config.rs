use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::DEFAULT_OVERLAY_HEIGHT;

pub fn config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tabstrip").join("config.toml"))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Height of the tab strip drawn above each group, in points.
    pub overlay_height: f64,
    /// Slack around an overlay that still counts as dropping onto it.
    pub drop_target_padding: f64,
    /// Animate overlay moves that are not part of a live drag.
    pub animate_overlay: bool,
    pub drag_tracker: DragTrackerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DragTrackerSettings {
    /// Display refresh rate the sampling cadence is derived from. Samples are
    /// taken at twice this rate.
    pub refresh_rate_hz: f64,
    /// Consecutive unchanged samples, with the button released, before the
    /// tracker goes idle.
    pub stationary_threshold: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            overlay_height: DEFAULT_OVERLAY_HEIGHT,
            drop_target_padding: 10.0,
            animate_overlay: false,
            drag_tracker: DragTrackerSettings::default(),
        }
    }
}

impl Default for DragTrackerSettings {
    fn default() -> Self {
        DragTrackerSettings {
            refresh_rate_hz: 60.0,
            stationary_threshold: 8,
        }
    }
}

/// Highest refresh rate accepted from a config file.
pub const MAX_REFRESH_RATE_HZ: f64 = 500.0;

const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(1);

impl DragTrackerSettings {
    /// Never shorter than one millisecond, even for rates that skipped
    /// validation.
    pub fn sample_interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / (2.0 * self.refresh_rate_hz))
            .map_or(MIN_SAMPLE_INTERVAL, |interval| interval.max(MIN_SAMPLE_INTERVAL))
    }
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config = Self::parse(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Reads `path`, or the default location when `path` is `None`. A missing
    /// file yields the default configuration.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match config_file() {
                Some(path) => path,
                None => return Ok(Config::default()),
            },
        };
        match fs::metadata(&path) {
            Ok(_) => Self::read(&path),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file; using defaults");
                Ok(Config::default())
            }
            Err(err) => {
                Err(err).with_context(|| format!("inspecting config file {}", path.display()))
            }
        }
    }

    pub fn parse(text: &str) -> anyhow::Result<Config> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> { Ok(toml::to_string(self)?) }

    pub fn validate(&self) -> anyhow::Result<()> {
        let settings = &self.settings;
        if !(settings.overlay_height.is_finite() && settings.overlay_height > 0.0) {
            bail!("settings.overlay_height must be positive, got {}", settings.overlay_height);
        }
        if !(settings.drop_target_padding.is_finite() && settings.drop_target_padding >= 0.0) {
            bail!(
                "settings.drop_target_padding must be a finite non-negative number, got {}",
                settings.drop_target_padding
            );
        }
        let rate = settings.drag_tracker.refresh_rate_hz;
        if !(rate > 0.0 && rate <= MAX_REFRESH_RATE_HZ) {
            bail!(
                "settings.drag_tracker.refresh_rate_hz must be in (0, {MAX_REFRESH_RATE_HZ}], got {rate}"
            );
        }
        if settings.drag_tracker.stationary_threshold == 0 {
            bail!("settings.drag_tracker.stationary_threshold must be at least 1");
        }
        Ok(())
    }
}
