//! Configuration loading for the engine.
//!
//! The vocabulary, text tokens, skip rules, game format and validation
//! tolerances are loaded from a TOML configuration file. Every section is
//! optional and falls back to its default.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::vocabulary::{SkipRule, TextTokens, Vocabulary};

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Type code and label mapping
    #[serde(default)]
    pub vocabulary: Vocabulary,
    /// Free-text tokens
    #[serde(default)]
    pub tokens: TextTokens,
    /// Game length settings
    #[serde(default)]
    pub format: GameFormat,
    /// Consistency check settings
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Batch processing settings
    #[serde(default)]
    pub batch: BatchConfig,
    /// Duplicate-encoding skip rules
    #[serde(default = "default_skip_rules")]
    pub skip_rules: Vec<SkipRule>,
}

fn default_skip_rules() -> Vec<SkipRule> {
    vec![SkipRule::offensive_foul_turnover()]
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vocabulary: Vocabulary::default(),
            tokens: TextTokens::default(),
            format: GameFormat::default(),
            validation: ValidationConfig::default(),
            batch: BatchConfig::default(),
            skip_rules: default_skip_rules(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::IoError)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::TomlError)
    }

    /// Serializes this configuration as a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeError)
    }
}

/// Game length settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameFormat {
    /// Regulation periods
    pub regulation_periods: u8,
    /// Minutes per regulation period
    pub period_minutes: f64,
    /// Minutes per overtime period
    pub overtime_minutes: f64,
}

impl Default for GameFormat {
    fn default() -> Self {
        Self {
            regulation_periods: 4,
            period_minutes: 12.0,
            overtime_minutes: 5.0,
        }
    }
}

impl GameFormat {
    /// Minutes played in a game that lasted `periods` periods.
    pub fn game_minutes(&self, periods: u8) -> f64 {
        let regulation = periods.min(self.regulation_periods);
        let overtime = periods.saturating_sub(self.regulation_periods);
        f64::from(regulation) * self.period_minutes + f64::from(overtime) * self.overtime_minutes
    }
}

/// Consistency check settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Absolute tolerance when comparing percentages with their formulas
    pub percentage_tolerance: f64,
    /// Relative drift between tracked and estimated possessions still
    /// considered unremarkable
    pub possession_drift_tolerance: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            percentage_tolerance: 1e-9,
            possession_drift_tolerance: 0.1,
        }
    }
}

/// Batch processing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker threads for parallel games; 0 uses the global pool
    pub threads: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { threads: 0 }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("IO error: {0}")]
    IoError(#[source] std::io::Error),
    /// Error parsing TOML config
    #[error("TOML parse error: {0}")]
    TomlError(#[source] toml::de::Error),
    /// Error writing TOML config
    #[error("TOML serialize error: {0}")]
    SerializeError(#[source] toml::ser::Error),
}

/// Generates a default configuration file content.
pub fn default_config_toml() -> String {
    r#"# Box Score Engine Configuration

[vocabulary]
name = "pbp_default"
version = 1

[vocabulary.codes]
shot = [92, 93, 94, 95, 96, 110, 111, 112, 113, 114, 115, 116, 117, 118, 119, 120]
free_throw = [97, 98, 99, 100, 101, 102, 103, 104, 105, 106, 107, 108]
offensive_rebound = [155]
defensive_rebound = [156]
rebound = [157]
turnover = [62, 63, 64, 65, 66, 67, 68, 69, 70, 71, 73, 74, 84, 85, 86, 90]
foul = [42, 43, 44, 45, 46, 47, 48, 49, 50]
offensive_foul = [37, 38]
technical_foul = [35, 36, 39]
substitution = [584]
timeout = [16, 17]
jump_ball = [615]
period_start = [412]
period_end = [402]
game_end = [403]
ejection = [213]
administrative = [214]

[vocabulary.labels]
"offensive rebound" = "offensive_rebound"
"defensive rebound" = "defensive_rebound"
"substitution" = "substitution"
"timeout" = "timeout"
"full timeout" = "timeout"
"jump ball" = "jump_ball"
"start period" = "period_start"
"end period" = "period_end"
"end game" = "game_end"
"steal" = "steal"
"technical foul" = "technical_foul"
"offensive foul" = "offensive_foul"
"offensive charge" = "offensive_foul"
"personal foul" = "foul"
"shooting foul" = "foul"
"jump shot" = "shot"

[tokens]
made = ["makes", "made"]
missed = ["misses", "missed"]
three_point = ["three point", "3-point"]
assist = ["assists"]
steal = ["steals"]
block = ["blocks"]
charge = ["charge"]
possession_retaining_free_throw = ["technical", "flagrant", "clear path"]
free_throw_sequence = '(?i)\b(\d+)\s+of\s+(\d+)\b'

[format]
regulation_periods = 4
period_minutes = 12.0
overtime_minutes = 5.0

[validation]
percentage_tolerance = 1e-9
possession_drift_tolerance = 0.1

[batch]
threads = 0

[[skip_rules]]
name = "offensive_foul_turnover"
codes = [86]
companions = ["offensive_foul"]
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();

        assert_eq!(config.vocabulary.name, "pbp_default");
        assert_eq!(config.format.regulation_periods, 4);
        assert_eq!(config.validation.percentage_tolerance, 1e-9);
        assert_eq!(config.skip_rules.len(), 1);
        assert_eq!(config.skip_rules[0].name, "offensive_foul_turnover");
    }

    #[test]
    fn test_default_toml_matches_default() {
        let config = EngineConfig::from_str(&default_config_toml()).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
            [format]
            regulation_periods = 2
            period_minutes = 20.0

            [vocabulary]
            name = "college"
        "#;

        let config = EngineConfig::from_str(toml).unwrap();

        assert_eq!(config.format.regulation_periods, 2);
        assert_eq!(config.format.period_minutes, 20.0);
        assert_eq!(config.format.overtime_minutes, 5.0);
        assert_eq!(config.vocabulary.name, "college");
        assert_eq!(config.vocabulary.version, 1);
        assert!(config.vocabulary.codes.contains_key("shot"));
        assert_eq!(config.tokens, TextTokens::default());
    }

    #[test]
    fn test_skip_rules_can_be_disabled() {
        let config = EngineConfig::from_str("skip_rules = []").unwrap();
        assert!(config.skip_rules.is_empty());
    }

    #[test]
    fn test_game_minutes() {
        let format = GameFormat::default();
        assert_eq!(format.game_minutes(4), 48.0);
        assert_eq!(format.game_minutes(2), 24.0);
        assert_eq!(format.game_minutes(6), 58.0);
        assert_eq!(format.game_minutes(0), 0.0);
    }

    #[test]
    fn test_to_toml_parses_back() {
        let config = EngineConfig::default();
        let toml = config.to_toml().unwrap();
        let parsed = EngineConfig::from_str(&toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_toml() {
        let result = EngineConfig::from_str("[format\nregulation_periods = ");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = EngineConfig::from_file(Path::new("/nonexistent/engine.toml"));
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }
}
