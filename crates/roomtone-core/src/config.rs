//! Engine-wide configuration.

use serde::{Deserialize, Serialize};

use roomtone_logic::constants::{audibility, obstruction};

/// Bounds of the randomized interval between path re-queries, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefreshInterval {
    pub min_seconds: f32,
    pub max_seconds: f32,
}

impl Default for RefreshInterval {
    fn default() -> Self {
        Self {
            min_seconds: 0.25,
            max_seconds: 1.0,
        }
    }
}

/// Tunables for a [`PropagationEngine`](crate::engine::PropagationEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Evaluate sources for secondary listeners too (only sources flagged
    /// audible to them).
    pub track_secondary_listeners: bool,
    pub path_refresh: RefreshInterval,
    /// Volume a source must exceed to count as heard.
    pub audibility_threshold: f32,
    /// Per-second approach rate of applied voice volume and low-pass.
    pub voice_smoothing_rate: f32,
    /// Per-second approach rate of perceived source positions.
    pub position_smoothing_rate: f32,
    /// Sideways jitter of obstruction rays, in world units.
    pub obstruction_jitter: f32,
    /// Seed for path refresh jitter. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            track_secondary_listeners: true,
            path_refresh: RefreshInterval::default(),
            audibility_threshold: audibility::THRESHOLD,
            voice_smoothing_rate: audibility::VOICE_SMOOTHING_RATE,
            position_smoothing_rate: audibility::POSITION_SMOOTHING_RATE,
            obstruction_jitter: obstruction::JITTER,
            seed: None,
        }
    }
}

/// A configuration value that had to be corrected.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigIssue {
    NegativeRefreshInterval { min: f32, max: f32 },
    RefreshIntervalInverted { min: f32, max: f32 },
    NegativeRate { field: &'static str, value: f32 },
    ThresholdOutOfRange(f32),
    NegativeJitter(f32),
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigIssue::NegativeRefreshInterval { min, max } => {
                write!(f, "path refresh interval {}..{} is negative", min, max)
            }
            ConfigIssue::RefreshIntervalInverted { min, max } => {
                write!(f, "path refresh min {} exceeds max {}", min, max)
            }
            ConfigIssue::NegativeRate { field, value } => {
                write!(f, "{} must be non-negative, got {}", field, value)
            }
            ConfigIssue::ThresholdOutOfRange(v) => {
                write!(f, "audibility threshold {} is outside [0, 1]", v)
            }
            ConfigIssue::NegativeJitter(v) => write!(f, "obstruction jitter {} is negative", v),
        }
    }
}

impl EngineConfig {
    /// List everything wrong with this configuration.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let RefreshInterval {
            min_seconds: min,
            max_seconds: max,
        } = self.path_refresh;

        if !(min >= 0.0 && max >= 0.0) {
            issues.push(ConfigIssue::NegativeRefreshInterval { min, max });
        } else if min > max {
            issues.push(ConfigIssue::RefreshIntervalInverted { min, max });
        }
        for (field, value) in [
            ("voice_smoothing_rate", self.voice_smoothing_rate),
            ("position_smoothing_rate", self.position_smoothing_rate),
        ] {
            if !(value >= 0.0) {
                issues.push(ConfigIssue::NegativeRate { field, value });
            }
        }
        if !(0.0..=1.0).contains(&self.audibility_threshold) {
            issues.push(ConfigIssue::ThresholdOutOfRange(self.audibility_threshold));
        }
        if !(self.obstruction_jitter >= 0.0) {
            issues.push(ConfigIssue::NegativeJitter(self.obstruction_jitter));
        }
        issues
    }

    /// Copy with every invalid field replaced by a usable value.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let mut config = self.clone();

        let non_negative = |v: f32, fallback: f32| if v >= 0.0 { v } else { fallback };
        let min = non_negative(config.path_refresh.min_seconds, defaults.path_refresh.min_seconds);
        let max = non_negative(config.path_refresh.max_seconds, defaults.path_refresh.max_seconds);
        config.path_refresh = RefreshInterval {
            min_seconds: min.min(max),
            max_seconds: min.max(max),
        };
        config.voice_smoothing_rate =
            non_negative(config.voice_smoothing_rate, defaults.voice_smoothing_rate);
        config.position_smoothing_rate =
            non_negative(config.position_smoothing_rate, defaults.position_smoothing_rate);
        config.audibility_threshold = if config.audibility_threshold.is_nan() {
            defaults.audibility_threshold
        } else {
            config.audibility_threshold.clamp(0.0, 1.0)
        };
        config.obstruction_jitter =
            non_negative(config.obstruction_jitter, defaults.obstruction_jitter);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_empty());
    }

    #[test]
    fn test_validate_reports_each_issue() {
        let config = EngineConfig {
            path_refresh: RefreshInterval {
                min_seconds: 2.0,
                max_seconds: 1.0,
            },
            voice_smoothing_rate: -1.0,
            audibility_threshold: 1.5,
            obstruction_jitter: f32::NAN,
            ..Default::default()
        };
        let issues = config.validate();
        assert_eq!(issues.len(), 4);
        assert!(issues.contains(&ConfigIssue::RefreshIntervalInverted { min: 2.0, max: 1.0 }));
    }

    #[test]
    fn test_sanitized_is_valid() {
        let config = EngineConfig {
            path_refresh: RefreshInterval {
                min_seconds: 2.0,
                max_seconds: -1.0,
            },
            position_smoothing_rate: f32::NAN,
            audibility_threshold: -0.5,
            ..Default::default()
        };
        let fixed = config.sanitized();
        assert!(fixed.validate().is_empty());
        assert_eq!(fixed.path_refresh.min_seconds, 1.0);
        assert_eq!(fixed.path_refresh.max_seconds, 2.0);
        assert_eq!(fixed.audibility_threshold, 0.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "track_secondary_listeners": false, "seed": 7 }"#).unwrap();
        assert!(!config.track_secondary_listeners);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.path_refresh, RefreshInterval::default());
    }
}
