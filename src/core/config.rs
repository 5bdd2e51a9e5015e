//! Configuration types for the scenesort engine.
//!
//! Every component takes an explicit typed configuration struct passed by
//! value; nothing reads ambient host state. The top-level [`ScenesortConfig`]
//! aggregates the per-component sections and can be round-tripped through
//! YAML so a host can persist a cleanup setup alongside its project files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, ScenesortError};
use crate::rules::engine::PatternRule;

/// Main configuration for the scenesort engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenesortConfig {
    /// Proximity clustering settings
    #[serde(default)]
    pub proximity: ProximityConfig,

    /// Geometry deduplication settings
    #[serde(default)]
    pub dedupe: DedupeConfig,

    /// Rule engine settings and the ordered rule list
    #[serde(default)]
    pub rules: RulesConfig,
}

impl ScenesortConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ScenesortError::io(format!("Failed to read config file: {}", path.display()), e)
        })?;

        serde_yaml::from_str(&content).map_err(Into::into)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&path, content).map_err(|e| {
            ScenesortError::io(
                format!("Failed to write config file: {}", path.display()),
                e,
            )
        })
    }

    /// Validate all configuration sections.
    pub fn validate(&self) -> Result<()> {
        self.proximity.validate()?;
        self.dedupe.validate()?;
        self.rules.validate()?;
        Ok(())
    }
}

/// Per-axis boolean mask applied before distance computation.
///
/// Masking an axis zeroes that component of the difference vector, so
/// entities differing only along a masked axis are arbitrarily close. The
/// flags are independent; masking all three makes every distance zero and
/// clusters the whole working set together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisMask {
    /// Consider the X axis
    pub x: bool,
    /// Consider the Y axis
    pub y: bool,
    /// Consider the Z axis
    pub z: bool,
}

impl Default for AxisMask {
    fn default() -> Self {
        Self {
            x: true,
            y: true,
            z: true,
        }
    }
}

impl AxisMask {
    /// Mask with every axis enabled.
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether at least one axis is enabled.
    pub fn any(&self) -> bool {
        self.x || self.y || self.z
    }
}

/// Proximity clustering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProximityConfig {
    /// Maximum pairwise distance for two entities to be connected
    pub threshold: f64,

    /// Axes considered in the distance computation
    #[serde(default)]
    pub axes: AxisMask,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            threshold: 1.5,
            axes: AxisMask::default(),
        }
    }
}

impl ProximityConfig {
    /// Set the distance threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the axis mask.
    pub fn with_axes(mut self, axes: AxisMask) -> Self {
        self.axes = axes;
        self
    }

    /// Validate proximity settings.
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(ScenesortError::config_field(
                format!("proximity threshold must be positive, got {}", self.threshold),
                "proximity.threshold",
            ));
        }
        Ok(())
    }
}

/// Fingerprint comparison mode for duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DedupeMode {
    /// Fingerprint from rounded bounding-box dimensions
    BoundingBox,
    /// Fingerprint from every rounded vertex coordinate
    FullTopology,
}

/// Geometry deduplication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupeConfig {
    /// Comparison mode
    pub mode: DedupeMode,

    /// Rounding precision in decimal places (1-7). Lower precision merges
    /// more aggressively at the cost of false positives; the tradeoff is the
    /// caller's to tune.
    pub precision: u32,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            mode: DedupeMode::FullTopology,
            precision: 6,
        }
    }
}

impl DedupeConfig {
    /// Set the comparison mode.
    pub fn with_mode(mut self, mode: DedupeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the rounding precision.
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    /// Validate dedup settings.
    pub fn validate(&self) -> Result<()> {
        if !(1..=7).contains(&self.precision) {
            return Err(ScenesortError::config_field(
                format!("rounding precision must be in 1..=7, got {}", self.precision),
                "dedupe.precision",
            ));
        }
        Ok(())
    }
}

/// Rule engine configuration: an optional run-wide main container and the
/// ordered rule list. Execution order matters; broader/shorter samples
/// should run before narrower/longer ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Container every created output container is grouped under when a rule
    /// names no explicit parent. Created lazily when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_container: Option<String>,

    /// Ordered pattern rules
    #[serde(default)]
    pub rules: Vec<PatternRule>,
}

impl RulesConfig {
    /// Set the run-wide main container name.
    pub fn with_main_container(mut self, name: impl Into<String>) -> Self {
        self.main_container = Some(name.into());
        self
    }

    /// Append a rule to the ordered list.
    pub fn with_rule(mut self, rule: PatternRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Validate rule settings.
    ///
    /// Empty and duplicate samples are runtime skips, not config errors, so
    /// the only hard requirement here is a usable main container name.
    pub fn validate(&self) -> Result<()> {
        if let Some(main) = &self.main_container {
            if main.trim().is_empty() {
                return Err(ScenesortError::config_field(
                    "main container name must not be blank",
                    "rules.main_container",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::engine::RuleAction;

    #[test]
    fn test_default_config_is_valid() {
        let config = ScenesortConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.proximity.threshold, 1.5);
        assert_eq!(config.dedupe.precision, 6);
        assert_eq!(config.dedupe.mode, DedupeMode::FullTopology);
    }

    #[test]
    fn test_nonpositive_threshold_rejected() {
        let config = ProximityConfig::default().with_threshold(0.0);
        assert!(config.validate().is_err());

        let config = ProximityConfig::default().with_threshold(-2.0);
        assert!(config.validate().is_err());

        let config = ProximityConfig::default().with_threshold(f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fully_masked_axes_are_valid() {
        // All-masked is a defined configuration: every distance is zero.
        let config = ProximityConfig::default().with_axes(AxisMask {
            x: false,
            y: false,
            z: false,
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_precision_bounds() {
        for precision in 1..=7 {
            assert!(DedupeConfig::default()
                .with_precision(precision)
                .validate()
                .is_ok());
        }
        assert!(DedupeConfig::default().with_precision(0).validate().is_err());
        assert!(DedupeConfig::default().with_precision(8).validate().is_err());
    }

    #[test]
    fn test_blank_main_container_rejected() {
        let config = RulesConfig::default().with_main_container("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cleanup.yml");

        let config = ScenesortConfig {
            proximity: ProximityConfig::default().with_threshold(2.5).with_axes(AxisMask {
                x: true,
                y: false,
                z: true,
            }),
            dedupe: DedupeConfig::default()
                .with_mode(DedupeMode::BoundingBox)
                .with_precision(3),
            rules: RulesConfig::default()
                .with_main_container("Import")
                .with_rule(PatternRule::new("Wall", RuleAction::Organize).with_output("Walls")),
        };

        config.to_yaml_file(&path).unwrap();
        let loaded = ScenesortConfig::from_yaml_file(&path).unwrap();

        assert_eq!(loaded.proximity.threshold, 2.5);
        assert!(!loaded.proximity.axes.y);
        assert_eq!(loaded.dedupe.mode, DedupeMode::BoundingBox);
        assert_eq!(loaded.dedupe.precision, 3);
        assert_eq!(loaded.rules.main_container.as_deref(), Some("Import"));
        assert_eq!(loaded.rules.rules.len(), 1);
        assert_eq!(loaded.rules.rules[0].sample, "Wall");
    }

    #[test]
    fn test_missing_config_file_is_io_error() {
        let err = ScenesortConfig::from_yaml_file("/nonexistent/cleanup.yml").unwrap_err();
        assert!(matches!(err, ScenesortError::Io { .. }));
    }
}
