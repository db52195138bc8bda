use crate::ai_driver::AiSettings;
use crate::track::{TrackError, TrackParams};
use crate::vehicle::VehicleParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("invalid track settings: {0}")]
    Track(#[from] TrackError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub race: RaceSettings,
    pub track: TrackParams,
    pub vehicle: VehicleParams,
    pub ai: AiSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceSettings {
    pub laps: u32,
    pub ai_count: usize,
    /// Track seed in `[0, 1)`; a random one is picked when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<f64>,
    pub tick_rate_hz: u32,
    pub countdown_ticks: u32,
    /// Hard stop, counted in racing ticks.
    pub max_ticks: u64,
    /// Ticks the field gets to finish after the player crosses the line.
    pub finish_grace_ticks: u64,
    pub grid_spacing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            laps: 3,
            ai_count: 3,
            seed: None,
            tick_rate_hz: 60,
            countdown_ticks: 180,
            max_ticks: 36_000,
            finish_grace_ticks: 600,
            grid_spacing: 30.0,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl RaceConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: RaceConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        Self::load(path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Failed to load config, using defaults");
            Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let race = &self.race;
        if race.laps == 0 {
            return Err(ConfigError::Invalid("race.laps must be at least 1".to_string()));
        }
        if race.tick_rate_hz == 0 {
            return Err(ConfigError::Invalid("race.tick_rate_hz must be positive".to_string()));
        }
        if let Some(seed) = race.seed {
            if !seed.is_finite() {
                return Err(ConfigError::Invalid(format!("race.seed must be finite, got {}", seed)));
            }
        }
        if !(race.grid_spacing >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "race.grid_spacing must not be negative, got {}",
                race.grid_spacing
            )));
        }

        self.track.validate()?;

        let vehicle = &self.vehicle;
        for (name, value) in [("friction", vehicle.friction), ("drift_factor", vehicle.drift_factor)] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ConfigError::Invalid(format!(
                    "vehicle.{} must be in (0, 1), got {}",
                    name, value
                )));
            }
        }
        if !(vehicle.max_speed > 0.0) || vehicle.max_reverse_speed < 0.0 {
            return Err(ConfigError::Invalid("vehicle speed limits must be positive".to_string()));
        }

        let ai = &self.ai;
        if ai.skill_min >= ai.skill_max {
            return Err(ConfigError::Invalid(format!(
                "ai.skill_min ({}) must be below ai.skill_max ({})",
                ai.skill_min, ai.skill_max
            )));
        }
        if ai.update_interval == 0 {
            return Err(ConfigError::Invalid("ai.update_interval must be at least 1".to_string()));
        }
        if !(ai.min_corner_factor <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "ai.min_corner_factor must be at most 1, got {}",
                ai.min_corner_factor
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = RaceConfig::default();
        assert_eq!(config.race.laps, 3);
        assert_eq!(config.race.ai_count, 3);
        assert_eq!(config.race.tick_rate_hz, 60);
        assert_eq!(config.track.resolution, 100);
        assert_eq!(config.vehicle.max_speed, 8.0);
        assert_eq!(config.ai.lookahead_distance, 15.0);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = RaceConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("tick_rate_hz"));
        assert!(toml_str.contains("track_width"));
        assert!(!toml_str.contains("seed"));

        let parsed: RaceConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_partial_file() {
        let file = write_config(
            r#"
[race]
laps = 5
seed = 0.25

[ai]
skill_min = 0.8
"#,
        );

        let config = RaceConfig::load(file.path()).unwrap();
        assert_eq!(config.race.laps, 5);
        assert_eq!(config.race.seed, Some(0.25));
        assert_eq!(config.race.ai_count, 3);
        assert_eq!(config.ai.skill_min, 0.8);
        assert_eq!(config.ai.skill_max, 1.0);
        assert_eq!(config.track, TrackParams::default());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let file = write_config("[race]\nlaps = 0\n");
        assert!(matches!(RaceConfig::load(file.path()), Err(ConfigError::Invalid(_))));

        let file = write_config("[track]\ncontrol_points = 2\n");
        assert!(matches!(
            RaceConfig::load(file.path()),
            Err(ConfigError::Track(TrackError::TooFewControlPoints(2)))
        ));

        let file = write_config("[vehicle]\nfriction = 1.2\n");
        assert!(matches!(RaceConfig::load(file.path()), Err(ConfigError::Invalid(_))));

        let file = write_config("[ai]\nskill_min = 0.9\nskill_max = 0.9\n");
        assert!(matches!(RaceConfig::load(file.path()), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_corner_factor_floor_can_be_disabled() {
        let file = write_config("[ai]\nmin_corner_factor = -10.0\n");
        let config = RaceConfig::load(file.path()).unwrap();
        assert_eq!(config.ai.min_corner_factor, -10.0);

        let file = write_config("[ai]\nmin_corner_factor = 1.5\n");
        assert!(matches!(RaceConfig::load(file.path()), Err(ConfigError::Invalid(_))));

        let mut config = RaceConfig::default();
        config.ai.min_corner_factor = f64::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let file = write_config("[race\nlaps = 3");
        assert!(matches!(RaceConfig::load(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/race.toml");
        assert_eq!(RaceConfig::load(path).unwrap(), RaceConfig::default());
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = RaceConfig::load_or_default(dir.path().join("missing.toml"));
        assert_eq!(config, RaceConfig::default());
    }
}
