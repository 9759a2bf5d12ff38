use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub fn data_dir() -> PathBuf { dirs::home_dir().unwrap().join(".stagedock") }
pub fn layout_file() -> PathBuf { data_dir().join("layout.json") }
pub fn config_file() -> PathBuf {
    dirs::home_dir().unwrap().join(".config").join("stagedock").join("config.toml")
}

/// Tuning for the gesture navigation engine. Defaults match the shipped
/// interaction feel; hosts override individual fields from the config file.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct GestureSettings {
    /// Velocity (px/s) above which a gesture commits regardless of distance.
    #[serde(default = "default_flick_threshold")]
    pub flick_threshold: f64,
    /// Fraction of a host width the drag must cover to commit without a flick.
    #[serde(default = "default_drag_threshold")]
    pub drag_threshold: f64,
    #[serde(default = "default_rubber_band_coefficient")]
    pub rubber_band_coefficient: f64,
    #[serde(default = "default_rubber_band_dimension")]
    pub rubber_band_dimension: f64,
    #[serde(default = "default_spring_stiffness")]
    pub spring_stiffness: f64,
    #[serde(default = "default_spring_damping")]
    pub spring_damping: f64,
    #[serde(default = "default_spring_mass")]
    pub spring_mass: f64,
    /// Debug flag: slows the settling animation. Raw gesture input is never
    /// time-scaled, only the settle phase.
    #[serde(default = "no")]
    pub slow_motion: bool,
    #[serde(default = "default_slow_motion_scale")]
    pub slow_motion_scale: f64,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            flick_threshold: default_flick_threshold(),
            drag_threshold: default_drag_threshold(),
            rubber_band_coefficient: default_rubber_band_coefficient(),
            rubber_band_dimension: default_rubber_band_dimension(),
            spring_stiffness: default_spring_stiffness(),
            spring_damping: default_spring_damping(),
            spring_mass: default_spring_mass(),
            slow_motion: false,
            slow_motion_scale: default_slow_motion_scale(),
        }
    }
}

impl GestureSettings {
    pub fn time_scale(&self) -> f64 {
        if self.slow_motion { self.slow_motion_scale } else { 1.0 }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "yes")]
    pub restore_layout_on_launch: bool,
    /// Close a window automatically when its last tab is removed.
    #[serde(default = "yes")]
    pub close_empty_windows: bool,
    #[serde(default)]
    pub gestures: GestureSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            restore_layout_on_launch: true,
            close_empty_windows: true,
            gestures: GestureSettings::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let buf = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Config = toml::from_str(&buf)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        Ok(config)
    }

    pub fn load_or_default(path: &Path) -> Config {
        match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("using default config: {e:#}");
                Config::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let buf = toml::to_string(self)?;
        fs::write(path, buf)?;
        Ok(())
    }
}

fn yes() -> bool { true }
fn no() -> bool { false }
fn default_flick_threshold() -> f64 { 500.0 }
fn default_drag_threshold() -> f64 { 0.5 }
fn default_rubber_band_coefficient() -> f64 { 0.55 }
fn default_rubber_band_dimension() -> f64 { 1.0 }
fn default_spring_stiffness() -> f64 { 300.0 }
fn default_spring_damping() -> f64 { 25.0 }
fn default_spring_mass() -> f64 { 1.0 }
fn default_slow_motion_scale() -> f64 { 0.1 }
