use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{EngineError, EngineResult};
use crate::overlay::DebugLevel;
use crate::pixel::Color;

/// Fewest sleep trials the guard calibration will run.
pub const MIN_CALIBRATION_TRIALS: u32 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_logical_width")]
    pub logical_width: u32,

    #[serde(default = "default_logical_height")]
    pub logical_height: u32,

    #[serde(default = "default_target_hz")]
    pub target_hz: f64,

    #[serde(default = "default_calibration_trials")]
    pub calibration_trials: u32,

    /// Letterbox color, 0xRRGGBB.
    #[serde(default)]
    pub background: u32,

    #[serde(default)]
    pub debug_overlay: DebugLevel,

    #[serde(default)]
    pub start_fullscreen: bool,

    /// Yield the thread on every busy-wait iteration.
    #[serde(default)]
    pub spin_yield: bool,

    #[serde(default = "default_log_fps")]
    pub log_fps: bool,

    #[serde(default = "default_fps_log_period_sec")]
    pub fps_log_period_sec: f32,
}

fn default_title() -> String {
    "pacer".to_string()
}
fn default_logical_width() -> u32 {
    320
}
fn default_logical_height() -> u32 {
    240
}
fn default_target_hz() -> f64 {
    60.0
}
fn default_calibration_trials() -> u32 {
    50
}
fn default_log_fps() -> bool {
    true
}
fn default_fps_log_period_sec() -> f32 {
    1.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            logical_width: default_logical_width(),
            logical_height: default_logical_height(),
            target_hz: default_target_hz(),
            calibration_trials: default_calibration_trials(),
            background: 0x000000,
            debug_overlay: DebugLevel::default(),
            start_fullscreen: false,
            spin_yield: false,
            log_fps: default_log_fps(),
            fps_log_period_sec: default_fps_log_period_sec(),
        }
    }
}

impl EngineConfig {
    /// Reads a TOML config; a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(s) => Self::from_toml(&s)
                .map_err(|e| EngineError::Config(format!("parse {}: {}", path.display(), e))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!(target: "runtime", "no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(EngineError::Config(format!("read {}: {}", path.display(), e))),
        }
    }

    pub fn from_toml(s: &str) -> EngineResult<Self> {
        toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Rejects settings no tick could run with.
    pub fn validate(&self) -> EngineResult<()> {
        if !self.target_hz.is_finite() || self.target_hz <= 0.0 {
            return Err(EngineError::InvalidRate(self.target_hz));
        }
        if self.logical_width == 0 || self.logical_height == 0 {
            return Err(EngineError::Config(format!(
                "logical resolution must be non-zero, got {}x{}",
                self.logical_width, self.logical_height
            )));
        }
        Ok(())
    }

    pub fn calibration_trials(&self) -> u32 {
        self.calibration_trials.max(MIN_CALIBRATION_TRIALS)
    }

    pub fn background_color(&self) -> Color {
        Color::opaque(self.background)
    }
}
