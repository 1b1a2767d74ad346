use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_ENV_VAR: &str = "TILESYNC_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "client.json";

/// Every tunable used by prediction, interpolation, visibility and the camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    pub tile_size_px: f32,
    pub viewport_tiles_x: u32,
    pub viewport_tiles_y: u32,
    pub reconcile_timeout_ms: f64,
    pub teleport_snap_tiles: f32,
    pub arrive_snap_px: f32,
    pub moving_epsilon_px: f32,
    pub camera_lerp: f32,
    pub dead_opacity: f32,
    pub stealth_remote_opacity: f32,
    pub stealth_local_opacity: f32,
    pub hit_flash_opacity: f32,
    pub speaking_indicator_ms: f64,
    pub hit_flash_ms: f64,
    pub max_frame_delta_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tile_size_px: 32.0,
            viewport_tiles_x: 25,
            viewport_tiles_y: 19,
            reconcile_timeout_ms: 300.0,
            teleport_snap_tiles: 4.0,
            arrive_snap_px: 0.5,
            moving_epsilon_px: 1.0,
            camera_lerp: 0.15,
            dead_opacity: 0.3,
            stealth_remote_opacity: 0.15,
            stealth_local_opacity: 0.5,
            hit_flash_opacity: 0.5,
            speaking_indicator_ms: 300.0,
            hit_flash_ms: 80.0,
            max_frame_delta_ms: 250,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path} at {field_path}: {source}")]
    Parse {
        path: PathBuf,
        field_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("validation failed at {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl SyncConfig {
    pub fn teleport_snap_px(&self) -> f32 {
        self.teleport_snap_tiles * self.tile_size_px
    }

    pub fn from_json_str(raw: &str, source_path: &Path) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let config = serde_path_to_error::deserialize::<_, SyncConfig>(&mut deserializer)
            .map_err(|error| {
                let field_path = error.path().to_string();
                ConfigError::Parse {
                    path: source_path.to_path_buf(),
                    field_path,
                    source: error.into_inner(),
                }
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("tile_size_px", self.tile_size_px)?;
        if self.viewport_tiles_x == 0 {
            return Err(invalid("viewport_tiles_x", "> 0", self.viewport_tiles_x));
        }
        if self.viewport_tiles_y == 0 {
            return Err(invalid("viewport_tiles_y", "> 0", self.viewport_tiles_y));
        }
        require_non_negative("reconcile_timeout_ms", self.reconcile_timeout_ms)?;
        require_positive("teleport_snap_tiles", f64::from(self.teleport_snap_tiles))?;
        require_non_negative("arrive_snap_px", f64::from(self.arrive_snap_px))?;
        require_non_negative("moving_epsilon_px", f64::from(self.moving_epsilon_px))?;
        if !(self.camera_lerp > 0.0 && self.camera_lerp <= 1.0) {
            return Err(invalid("camera_lerp", "in (0, 1]", self.camera_lerp));
        }
        require_unit("dead_opacity", self.dead_opacity)?;
        require_unit("stealth_remote_opacity", self.stealth_remote_opacity)?;
        require_unit("stealth_local_opacity", self.stealth_local_opacity)?;
        require_unit("hit_flash_opacity", self.hit_flash_opacity)?;
        require_non_negative("speaking_indicator_ms", self.speaking_indicator_ms)?;
        require_non_negative("hit_flash_ms", self.hit_flash_ms)?;
        if self.max_frame_delta_ms == 0 {
            return Err(invalid("max_frame_delta_ms", "> 0", self.max_frame_delta_ms));
        }
        Ok(())
    }
}

/// Loads the config at `path`, or returns defaults when the file does not exist.
pub fn load_config(path: &Path) -> Result<SyncConfig, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == io::ErrorKind::NotFound => {
            return Ok(SyncConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    SyncConfig::from_json_str(&raw, path)
}

fn invalid(field: &'static str, expected: &str, actual: impl Display) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: format!("expected {expected}, got {actual}"),
    }
}

fn require_positive(field: &'static str, value: impl Into<f64>) -> Result<(), ConfigError> {
    let value = value.into();
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "finite value > 0", value))
    }
}

fn require_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "finite value >= 0", value))
    }
}

fn require_unit(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, "value in [0, 1]", value))
    }
}
