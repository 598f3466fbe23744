//! `advent.toml` configuration. Every field has a default so a partial (or
//! missing) file is always usable.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::state::SortOrder;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdventConfig {
    pub content: ContentConfig,
    pub storage: StorageConfig,
    pub unlock: UnlockConfig,
    pub confetti: ConfettiPreset,
}

impl AdventConfig {
    /// Parses `raw`; out-of-range confetti values are replaced by their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(raw)?;
        config.confetti.sanitize();
        Ok(config)
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("config: {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub path: PathBuf,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("content.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("advent-state.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnlockConfig {
    /// Tick cadence while some card is still waiting for its unlock instant.
    pub reevaluate_interval_ms: u64,
    /// Tick cadence once nothing is pending; `0` stops the tick.
    pub idle_reevaluate_interval_ms: u64,
    pub sort_order: SortOrder,
}

impl UnlockConfig {
    pub fn reevaluate_interval(&self) -> Duration {
        Duration::from_millis(self.reevaluate_interval_ms.max(1))
    }

    pub fn idle_interval(&self) -> Option<Duration> {
        (self.idle_reevaluate_interval_ms > 0)
            .then(|| Duration::from_millis(self.idle_reevaluate_interval_ms))
    }
}

impl Default for UnlockConfig {
    fn default() -> Self {
        Self {
            reevaluate_interval_ms: 1000,
            idle_reevaluate_interval_ms: 5000,
            sort_order: SortOrder::Ascending,
        }
    }
}

/// Physics and look of a confetti burst. Distances are logical pixels,
/// times are seconds, angles are radians.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfettiPreset {
    /// Hard cap on live particles across all bursts.
    pub max_particles: u32,
    /// Hard cap on a single burst request.
    pub max_burst: u32,
    pub default_burst: u32,
    pub gravity: f32,
    /// Quadratic drag coefficient; terminal speed is `sqrt(gravity / drag)`.
    pub drag: f32,
    pub speed_range: [f32; 2],
    /// Half-angle of the launch cone around straight up.
    pub spread: f32,
    /// Full width/height of the box the origin is jittered within.
    pub origin_jitter: Vec2,
    pub lifetime_range: [f32; 2],
    /// Opacity ramps down over the last `fade_window` seconds of life.
    pub fade_window: f32,
    /// Distance past the surface edge at which particles are dropped.
    pub margin: f32,
    pub wind_strength: f32,
    pub wind_frequency: f32,
    pub wind_wavenumber: f32,
    pub spin_range: [f32; 2],
    pub flip_speed_range: [f32; 2],
    pub hue_range: [f32; 2],
    pub disc_weight: f32,
    pub streamer_weight: f32,
    pub max_frame_dt: f32,
    pub seed: Option<u64>,
}

impl Default for ConfettiPreset {
    fn default() -> Self {
        Self {
            max_particles: 600,
            max_burst: 200,
            default_burst: 42,
            gravity: 1200.0,
            drag: 0.0035,
            speed_range: [520.0, 980.0],
            spread: 1.0,
            origin_jitter: Vec2::new(180.0, 40.0),
            lifetime_range: [1.6, 2.6],
            fade_window: 0.6,
            margin: 120.0,
            wind_strength: 180.0,
            wind_frequency: 2.2,
            wind_wavenumber: 0.012,
            spin_range: [-9.0, 9.0],
            flip_speed_range: [6.0, 16.0],
            hue_range: [160.0, 320.0],
            disc_weight: 0.20,
            streamer_weight: 0.18,
            max_frame_dt: 0.05,
            seed: None,
        }
    }
}

/// Upper bound on a single particle's life, in seconds.
const LIFETIME_CAP: f32 = 60.0;

fn finite(value: f32) -> bool {
    value.is_finite()
}

fn non_negative(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}

fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

fn lifetime(value: f32) -> bool {
    positive(value) && value <= LIFETIME_CAP
}

impl ConfettiPreset {
    /// Longest possible particle life; the engine is idle at most this long after the last burst.
    pub fn max_lifetime(&self) -> f32 {
        self.lifetime_range[0].max(self.lifetime_range[1])
    }

    /// Resets every value the engine can't run with (NaN, infinities,
    /// negative magnitudes, a non-positive frame step, unbounded lifetimes)
    /// to its default. Returns the names of the fields that were reset.
    pub fn sanitize(&mut self) -> Vec<&'static str> {
        let defaults = Self::default();
        let mut reset = Vec::new();
        let mut check = |name: &'static str,
                         value: &mut f32,
                         fallback: f32,
                         valid: fn(f32) -> bool| {
            if !valid(*value) {
                if !reset.contains(&name) {
                    reset.push(name);
                }
                *value = fallback;
            }
        };

        check("gravity", &mut self.gravity, defaults.gravity, finite);
        check("drag", &mut self.drag, defaults.drag, non_negative);
        for i in 0..2 {
            check("speed_range", &mut self.speed_range[i], defaults.speed_range[i], non_negative);
            check(
                "lifetime_range",
                &mut self.lifetime_range[i],
                defaults.lifetime_range[i],
                lifetime,
            );
            check("spin_range", &mut self.spin_range[i], defaults.spin_range[i], finite);
            check(
                "flip_speed_range",
                &mut self.flip_speed_range[i],
                defaults.flip_speed_range[i],
                finite,
            );
            check("hue_range", &mut self.hue_range[i], defaults.hue_range[i], finite);
        }
        check("spread", &mut self.spread, defaults.spread, non_negative);
        check("origin_jitter", &mut self.origin_jitter.x, defaults.origin_jitter.x, non_negative);
        check("origin_jitter", &mut self.origin_jitter.y, defaults.origin_jitter.y, non_negative);
        check("fade_window", &mut self.fade_window, defaults.fade_window, non_negative);
        check("margin", &mut self.margin, defaults.margin, non_negative);
        check("wind_strength", &mut self.wind_strength, defaults.wind_strength, finite);
        check("wind_frequency", &mut self.wind_frequency, defaults.wind_frequency, finite);
        check("wind_wavenumber", &mut self.wind_wavenumber, defaults.wind_wavenumber, finite);
        check("disc_weight", &mut self.disc_weight, defaults.disc_weight, non_negative);
        check("streamer_weight", &mut self.streamer_weight, defaults.streamer_weight, non_negative);
        check("max_frame_dt", &mut self.max_frame_dt, defaults.max_frame_dt, positive);

        if !reset.is_empty() {
            warn!("config: invalid confetti values reset to defaults: {}", reset.join(", "));
        }
        reset
    }
}
