//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level hexview configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Viewport optimizer settings.
    pub viewport: ViewportConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
    /// Settings for the synthetic demo session.
    pub demo: DemoConfig,
}

/// Viewport optimizer configuration.
///
/// Every field has a default, so a partial `config.ron` is always valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewportConfig {
    /// Filter cells by bounds, resolution, distance and area.
    /// When disabled the input is only truncated to the cell budget.
    pub enable_culling: bool,
    /// Select the LOD tier from zoom. When disabled the finest tier is used.
    pub enable_lod: bool,
    /// Nudge the LOD tier from the reported frame time.
    pub enable_adaptive_update: bool,
    /// Frame rate the adaptive LOD tries to hold.
    pub target_frame_rate: f64,
    /// Global ceiling on visible cells, applied on top of the tier budget.
    pub max_cells: usize,
    /// Memory limit in MB. Informational only.
    pub memory_limit_mb: f64,
    /// Minimum time between recomputations for sub-threshold view changes.
    pub update_interval_ms: f64,
    /// Multiplier on the visible span used to preload cells around the view.
    pub preload_radius: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            enable_culling: true,
            enable_lod: true,
            enable_adaptive_update: true,
            target_frame_rate: 60.0,
            max_cells: 50_000,
            memory_limit_mb: 512.0,
            update_interval_ms: 100.0,
            preload_radius: 1.5,
        }
    }
}

/// A partial update for [`ViewportConfig`]. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewportConfigUpdate {
    pub enable_culling: Option<bool>,
    pub enable_lod: Option<bool>,
    pub enable_adaptive_update: Option<bool>,
    pub target_frame_rate: Option<f64>,
    pub max_cells: Option<usize>,
    pub memory_limit_mb: Option<f64>,
    pub update_interval_ms: Option<f64>,
    pub preload_radius: Option<f64>,
}

impl ViewportConfigUpdate {
    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl ViewportConfig {
    /// Check the numeric options are usable by the optimizer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (
                "target_frame_rate",
                self.target_frame_rate,
                self.target_frame_rate > 0.0,
                "a positive frame rate",
            ),
            (
                "preload_radius",
                self.preload_radius,
                self.preload_radius > 0.0,
                "a positive multiplier",
            ),
            (
                "update_interval_ms",
                self.update_interval_ms,
                self.update_interval_ms >= 0.0,
                "zero or more milliseconds",
            ),
            (
                "memory_limit_mb",
                self.memory_limit_mb,
                self.memory_limit_mb >= 0.0,
                "zero or more megabytes",
            ),
        ];
        match checks
            .into_iter()
            .find(|(_, value, ok, _)| !ok || !value.is_finite())
        {
            Some((field, value, _, expected)) => Err(ConfigError::InvalidViewport {
                field,
                value,
                expected,
            }),
            None => Ok(()),
        }
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, update: &ViewportConfigUpdate) {
        if let Some(v) = update.enable_culling {
            self.enable_culling = v;
        }
        if let Some(v) = update.enable_lod {
            self.enable_lod = v;
        }
        if let Some(v) = update.enable_adaptive_update {
            self.enable_adaptive_update = v;
        }
        if let Some(v) = update.target_frame_rate {
            self.target_frame_rate = v;
        }
        if let Some(v) = update.max_cells {
            self.max_cells = v;
        }
        if let Some(v) = update.memory_limit_mb {
            self.memory_limit_mb = v;
        }
        if let Some(v) = update.update_interval_ms {
            self.update_interval_ms = v;
        }
        if let Some(v) = update.preload_radius {
            self.preload_radius = v;
        }
    }
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Start the HTTP debug API (debug builds only).
    pub debug_server: bool,
    /// Port for the HTTP debug API.
    pub debug_port: u16,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            debug_server: false,
            debug_port: 9310,
        }
    }
}

/// Synthetic demo session configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    /// Number of synthetic cells to generate.
    pub cell_count: usize,
    /// Number of simulated view-state changes.
    pub steps: u32,
    /// RNG seed for cell generation.
    pub seed: u64,
    /// Simulated draw cost per visible cell, in microseconds.
    pub draw_cost_us: f64,
    /// Simulated delay between view-state events, in milliseconds.
    pub step_interval_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            cell_count: 10_000,
            steps: 240,
            seed: 42,
            draw_cost_us: 4.0,
            step_interval_ms: 16,
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    fn read(config_path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            path: config_path.to_path_buf(),
            source,
        })?;
        let config: Config = ron::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })?;
        config.viewport.validate()?;
        Ok(config)
    }

    /// Default config directory (`$XDG_CONFIG_HOME/hexview` or platform equivalent).
    pub fn default_dir() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|dir| dir.join("hexview"))
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let config_path = config_dir.join("config.ron");
        let write_err = |source| ConfigError::Write {
            path: config_path.clone(),
            source,
        };
        std::fs::create_dir_all(config_dir).map_err(write_err)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&config_path, serialized).map_err(write_err)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join("config.ron"))?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_viewport_options() {
        let config = ViewportConfig::default();
        assert!(config.enable_culling);
        assert!(config.enable_lod);
        assert!(config.enable_adaptive_update);
        assert_eq!(config.target_frame_rate, 60.0);
        assert_eq!(config.max_cells, 50_000);
        assert_eq!(config.update_interval_ms, 100.0);
        assert_eq!(config.preload_radius, 1.5);
    }

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("max_cells: 50000"));
        assert!(ron_str.contains("debug_port: 9310"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.viewport.preload_radius = 2.25;
        config.demo.seed = 7;
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let config: Config = ron::from_str("(viewport: (max_cells: 1234))").unwrap();
        assert_eq!(config.viewport.max_cells, 1234);
        assert!(config.viewport.enable_culling);
        assert_eq!(config.debug, DebugConfig::default());
        assert_eq!(config.demo, DemoConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_update_only_touches_set_fields() {
        let mut config = ViewportConfig::default();
        let update = ViewportConfigUpdate {
            enable_culling: Some(false),
            max_cells: Some(10),
            ..Default::default()
        };
        config.apply(&update);
        assert!(!config.enable_culling);
        assert_eq!(config.max_cells, 10);
        assert!(config.enable_lod);
        assert_eq!(config.update_interval_ms, 100.0);
    }

    #[test]
    fn test_empty_update_is_noop() {
        let update = ViewportConfigUpdate::default();
        assert!(update.is_empty());
        let mut config = ViewportConfig::default();
        config.apply(&update);
        assert_eq!(config, ViewportConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.viewport.max_cells = 20_000;
        config.debug.log_level = "debug".to_string();

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.viewport.enable_lod = false;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(!result.unwrap().viewport.enable_lod);
    }

    #[test]
    fn test_validate_rejects_unusable_options() {
        assert!(ViewportConfig::default().validate().is_ok());

        let config = ViewportConfig {
            preload_radius: 0.0,
            ..ViewportConfig::default()
        };
        match config.validate() {
            Err(ConfigError::InvalidViewport { field, value, .. }) => {
                assert_eq!(field, "preload_radius");
                assert_eq!(value, 0.0);
            }
            other => panic!("expected InvalidViewport, got {other:?}"),
        }

        let config = ViewportConfig {
            target_frame_rate: f64::NAN,
            ..ViewportConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidViewport { field: "target_frame_rate", .. })
        ));
    }

    #[test]
    fn test_load_rejects_invalid_file_with_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.ron"),
            "(viewport: (target_frame_rate: -30.0))",
        )
        .unwrap();
        let err = Config::load_or_create(dir.path()).unwrap_err();
        assert!(err.to_string().contains("target_frame_rate"));

        std::fs::write(dir.path().join("config.ron"), "{{not valid}}").unwrap();
        let err = Config::load_or_create(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.ron"));
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_none());
    }
}
