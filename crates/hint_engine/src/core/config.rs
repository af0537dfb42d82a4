//! # Unified Configuration System
//!
//! All tunables of the hint engine in one serializable tree. Every section
//! has sensible defaults, so a configuration file only needs to mention
//! the values it overrides.
//!
//! ## Configuration Categories
//!
//! - **Surface**: extents of the text surface and its vertical reference
//! - **Schedule**: timing loop cadence, refresh limit and worker count
//! - **Placement**: search step and default boundaries for floating elements
//! - **Parser**: layout cache sizing
//! - **Compat**: toggles for the third-party text shim

use serde::{Serialize, Deserialize};
use std::time::Duration;

use crate::ui::elements::{Boundary, Margin};

// Re-export from the config module for convenience
pub use crate::config::{Config, ConfigError};

/// Longest duration any setting may express (one day)
pub const MAX_SECONDS: f32 = 86_400.0;

/// Reject NaN, infinities, negatives and values above [`MAX_SECONDS`]
fn check_seconds(value: f32, allow_zero: bool, what: &str) -> Result<(), ConfigError> {
    let above_zero = if allow_zero { value >= 0.0 } else { value > 0.0 };
    if value.is_finite() && above_zero && value <= MAX_SECONDS {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{} must be a finite number of seconds no greater than {}, got {}",
            what, MAX_SECONDS, value
        )))
    }
}

/// Seconds to a duration, clamped into `[0, MAX_SECONDS]`; NaN becomes zero
fn seconds(value: f32) -> Duration {
    Duration::try_from_secs_f32(value.clamp(0.0, MAX_SECONDS)).unwrap_or(Duration::ZERO)
}

/// # Surface Configuration
///
/// Geometry of the per-viewer text surface. X runs from `-half_width` to
/// `half_width`, Y from `0` (top) to `height` (bottom).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Half of the horizontal extent
    pub half_width: f32,
    /// Vertical extent
    pub height: f32,
    /// Y coordinate the renderer pins the payload's vertical centre to
    pub baseline: f32,
    /// Absolute vertical offset of the two invisible boundary markers
    pub marker_offset: f32,
    /// Font size used when a caller does not pick one
    pub default_font_size: i32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            half_width: 1200.0,
            height: 1080.0,
            baseline: 700.0,
            marker_offset: 3000.0,
            default_font_size: 20,
        }
    }
}

impl SurfaceConfig {
    /// Validate the surface geometry
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [self.half_width, self.height, self.baseline, self.marker_offset];
        if finite.iter().any(|value| !value.is_finite()) {
            return Err(ConfigError::Invalid("surface geometry must be finite".to_string()));
        }
        if self.half_width <= 0.0 || self.height <= 0.0 {
            return Err(ConfigError::Invalid("surface extents must be positive".to_string()));
        }
        if self.default_font_size <= 0 {
            return Err(ConfigError::Invalid("default font size must be positive".to_string()));
        }
        if self.marker_offset < self.height {
            return Err(ConfigError::Invalid(
                "marker offset must lie outside the surface height".to_string(),
            ));
        }
        Ok(())
    }

    /// Clamp a horizontal coordinate to the surface
    pub fn clamp_x(&self, x: f32) -> f32 {
        x.clamp(-self.half_width, self.half_width)
    }

    /// Clamp a vertical coordinate to the surface
    pub fn clamp_y(&self, y: f32) -> f32 {
        y.clamp(0.0, self.height)
    }
}

/// # Schedule Configuration
///
/// Cadence of the per-session timing loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Period of the staleness check tick, in seconds
    pub tick_interval_secs: f32,
    /// Longest time without an output before one is forced, in seconds
    pub staleness_secs: f32,
    /// Minimum spacing between two outputs to the same viewer, in seconds
    pub min_output_interval_secs: f32,
    /// How long a change waits for companions when no other update is
    /// predicted, in seconds; capped by the element's sync speed
    pub settle_secs: f32,
    /// Threads in the shared composition pool
    pub worker_threads: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 0.1,
            staleness_secs: 5.0,
            min_output_interval_secs: 0.5,
            settle_secs: 0.05,
            worker_threads: 2,
        }
    }
}

impl ScheduleConfig {
    /// Validate intervals and pool size
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_seconds(self.tick_interval_secs, false, "tick interval")?;
        check_seconds(self.staleness_secs, false, "staleness ceiling")?;
        check_seconds(self.min_output_interval_secs, true, "output interval")?;
        check_seconds(self.settle_secs, true, "settle window")?;
        if self.worker_threads == 0 {
            return Err(ConfigError::Invalid("at least one worker thread is required".to_string()));
        }
        Ok(())
    }

    /// Tick period as a duration
    pub fn tick_interval(&self) -> Duration {
        seconds(self.tick_interval_secs)
    }

    /// Staleness ceiling as a duration
    pub fn staleness(&self) -> Duration {
        seconds(self.staleness_secs)
    }

    /// Refresh limit as a duration
    pub fn min_output_interval(&self) -> Duration {
        seconds(self.min_output_interval_secs)
    }

    /// Settle window as a duration
    pub fn settle(&self) -> Duration {
        seconds(self.settle_secs)
    }
}

/// # Placement Configuration
///
/// Defaults for floating elements and the grid step of the search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Distance between neighbouring candidate positions
    pub step: f32,
    /// Default search region
    pub boundary: Boundary,
    /// Default collision padding
    pub margin: Margin,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            step: 20.0,
            boundary: Boundary::default(),
            margin: Margin::default(),
        }
    }
}

impl PlacementConfig {
    /// Validate the search grid and region
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(ConfigError::Invalid("placement step must be positive".to_string()));
        }
        let Boundary { top, bottom, left, right } = self.boundary;
        let Margin { top: m_top, bottom: m_bottom, left: m_left, right: m_right } = self.margin;
        if [top, bottom, left, right, m_top, m_bottom, m_left, m_right].iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::Invalid("placement boundary and margin must be finite".to_string()));
        }
        if self.boundary.left > self.boundary.right || self.boundary.top > self.boundary.bottom {
            return Err(ConfigError::Invalid("placement boundary is inverted".to_string()));
        }
        Ok(())
    }
}

/// # Parser Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Number of parsed texts kept in the layout cache
    pub cache_capacity: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self { cache_capacity: 1000 }
    }
}

/// # Compatibility Shim Configuration
///
/// Controls how plain third-party text is turned into elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatConfig {
    /// Master switch for the shim
    pub enabled: bool,
    /// Callers whose text is ignored
    pub disabled_callers: Vec<String>,
    /// Display duration when the caller does not give one, in seconds
    pub default_duration_secs: f32,
    /// How long a memoized layout stays reusable, in seconds
    pub cache_window_secs: f32,
    /// Number of memoized layouts
    pub cache_capacity: usize,
    /// Synthetic owner name the shim's elements are registered under
    pub owner: String,
}

impl Default for CompatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            disabled_callers: Vec::new(),
            default_duration_secs: 3.0,
            cache_window_secs: 10.0,
            cache_capacity: 64,
            owner: "compat".to_string(),
        }
    }
}

impl CompatConfig {
    /// Whether text coming from `caller` should be displayed
    pub fn allows(&self, caller: &str) -> bool {
        self.enabled && !self.disabled_callers.iter().any(|c| c == caller)
    }

    /// Default display duration
    pub fn default_duration(&self) -> Duration {
        seconds(self.default_duration_secs)
    }

    /// Memoization window
    pub fn cache_window(&self) -> Duration {
        seconds(self.cache_window_secs)
    }

    /// Validate durations and sizes
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_seconds(self.default_duration_secs, true, "compat display duration")?;
        check_seconds(self.cache_window_secs, true, "compat cache window")?;
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid("compat cache capacity must be at least 1".to_string()));
        }
        if self.owner.is_empty() {
            return Err(ConfigError::Invalid("compat owner name cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// # Complete Hint Configuration
///
/// Top-level configuration that encompasses all subsystems.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HintConfig {
    /// Surface geometry
    pub surface: SurfaceConfig,
    /// Timing loop settings
    pub schedule: ScheduleConfig,
    /// Floating element defaults
    pub placement: PlacementConfig,
    /// Layout cache settings
    pub parser: ParserConfig,
    /// Third-party text shim settings
    pub compat: CompatConfig,
}

impl HintConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.surface.validate()?;
        self.schedule.validate()?;
        self.placement.validate()?;
        self.compat.validate()?;
        if self.parser.cache_capacity == 0 {
            return Err(ConfigError::Invalid("parser cache capacity must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Load and validate a configuration file
    pub fn load_validated(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        if let Err(e) = config.validate() {
            log::warn!("Rejected hint configuration: {}", e);
            return Err(e);
        }
        Ok(config)
    }
}

impl Config for HintConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(HintConfig::default().validate().is_ok());
    }

    #[test]
    fn test_negative_interval_rejected() {
        let mut config = HintConfig::default();
        config.schedule.tick_interval_secs = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_non_finite_durations_rejected() {
        let mut config = HintConfig::default();
        config.schedule.staleness_secs = f32::INFINITY;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = HintConfig::default();
        config.schedule.tick_interval_secs = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = HintConfig::default();
        config.compat.cache_window_secs = f32::INFINITY;
        assert!(config.validate().is_err());

        let mut config = HintConfig::default();
        config.compat.default_duration_secs = 1.0e30;
        assert!(config.validate().is_err());

        let mut config = HintConfig::default();
        config.schedule.min_output_interval_secs = MAX_SECONDS + 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_accessors_never_panic() {
        let mut config = HintConfig::default();
        config.schedule.staleness_secs = f32::INFINITY;
        config.schedule.tick_interval_secs = f32::NAN;
        config.compat.default_duration_secs = -3.0;
        assert_eq!(config.schedule.staleness(), Duration::from_secs(86_400));
        assert_eq!(config.schedule.tick_interval(), Duration::ZERO);
        assert_eq!(config.compat.default_duration(), Duration::ZERO);
    }

    #[test]
    fn test_infinite_staleness_in_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hints.toml");
        std::fs::write(&path, "[schedule]\nstaleness_secs = inf\n").unwrap();

        assert!(HintConfig::load_from_file(&path).unwrap().schedule.staleness_secs.is_infinite());
        assert!(matches!(HintConfig::load_validated(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = HintConfig::default();
        config.schedule.worker_threads = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hints.toml");

        let mut config = HintConfig::default();
        config.compat.disabled_callers.push("noisy_plugin".to_string());
        config.schedule.staleness_secs = 2.5;
        config.save_to_file(&path).unwrap();

        let loaded = HintConfig::load_validated(&path).unwrap();
        assert_eq!(loaded.compat.disabled_callers, vec!["noisy_plugin".to_string()]);
        assert_eq!(loaded.schedule.staleness_secs, 2.5);
        assert!(!loaded.compat.allows("noisy_plugin"));
        assert!(loaded.compat.allows("other"));
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hints.ron");
        std::fs::write(&path, "(surface: (baseline: 640.0))").unwrap();

        let loaded = HintConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.surface.baseline, 640.0);
        assert_eq!(loaded.surface.half_width, 1200.0);
        assert_eq!(loaded.schedule.worker_threads, 2);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = HintConfig::load_from_file("hints.json");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
