//! Confetti particles and the emitter that spawns them.

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::{Vec2, Vec4};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::ConfettiPreset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ShapeKind {
    /// Rounded paper square.
    Square = 0,
    Disc = 1,
    /// Long thin ribbon, the rarer kind.
    Streamer = 2,
}

impl ShapeKind {
    /// Weighted pick; `roll` is uniform in `[0, 1)`.
    pub fn pick(roll: f32, preset: &ConfettiPreset) -> Self {
        if roll < preset.streamer_weight {
            Self::Streamer
        } else if roll < preset.streamer_weight + preset.disc_weight {
            Self::Disc
        } else {
            Self::Square
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub acc: Vec2,
    pub shape: ShapeKind,
    /// Unfolded width and height.
    pub size: Vec2,
    pub rotation: f32,
    pub spin: f32,
    /// Tumble phase; only affects rendering.
    pub flip: f32,
    pub flip_speed: f32,
    /// Front and back face colours, linear RGBA.
    pub colors: [Vec4; 2],
    pub age: f32,
    pub lifetime: f32,
}

impl Particle {
    pub fn remaining(&self) -> f32 {
        (self.lifetime - self.age).max(0.0)
    }

    pub fn is_expired(&self) -> bool {
        self.age >= self.lifetime
    }
}

fn sample(rng: &mut impl Rng, range: [f32; 2]) -> f32 {
    let (lo, hi) = (range[0].min(range[1]), range[0].max(range[1]));
    if hi - lo <= f32::EPSILON {
        lo
    } else {
        rng.random_range(lo..hi)
    }
}

/// Spawns one particle around `origin`, launched into the upward cone.
pub fn spawn(rng: &mut impl Rng, origin: Vec2, preset: &ConfettiPreset) -> Particle {
    let jitter = Vec2::new(
        (rng.random::<f32>() - 0.5) * preset.origin_jitter.x,
        (rng.random::<f32>() - 0.5) * preset.origin_jitter.y,
    );

    // Screen y grows downwards, so straight up is -PI/2.
    let angle = -FRAC_PI_2 + sample(rng, [-preset.spread, preset.spread]);
    let speed = sample(rng, preset.speed_range);

    let shape = ShapeKind::pick(rng.random::<f32>(), preset);
    let size = match shape {
        ShapeKind::Square => Vec2::new(sample(rng, [6.0, 16.0]), sample(rng, [10.0, 24.0])),
        ShapeKind::Disc => Vec2::splat(sample(rng, [8.0, 13.0])),
        ShapeKind::Streamer => Vec2::new(sample(rng, [3.5, 6.0]), sample(rng, [22.0, 34.0])),
    };

    let hue = sample(rng, preset.hue_range);
    Particle {
        pos: origin + jitter,
        vel: Vec2::from_angle(angle) * speed,
        acc: Vec2::new(0.0, preset.gravity),
        shape,
        size,
        rotation: sample(rng, [0.0, TAU]),
        spin: sample(rng, preset.spin_range),
        flip: sample(rng, [0.0, TAU]),
        flip_speed: sample(rng, preset.flip_speed_range),
        colors: [hsla(hue, 0.9, 0.7, 0.95), hsla(hue, 0.9, 0.48, 0.95)],
        age: 0.0,
        lifetime: sample(rng, preset.lifetime_range),
    }
}

/// HSL (hue in degrees) to RGBA.
pub fn hsla(hue: f32, saturation: f32, lightness: f32, alpha: f32) -> Vec4 {
    let h = hue.rem_euclid(360.0) / 60.0;
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = lightness - c / 2.0;
    Vec4::new(r + m, g + m, b + m, alpha)
}
