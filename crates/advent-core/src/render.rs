//! Draw step: particles to instance data, instance data to surface polygons.

use std::f32::consts::TAU;

use advent_platform::{RenderSurface, Result};
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec4};

use crate::config::ConfettiPreset;
use crate::particle::{Particle, ShapeKind};

/// Below this the tumbling face would vanish entirely.
const MIN_THINNESS: f32 = 0.12;
const ALPHA_CUTOFF: f32 = 1.0 / 255.0;
const DISC_SEGMENTS: usize = 12;

/// Per-particle draw data, laid out for a GPU instance buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    pub center: [f32; 2],
    pub half_extent: [f32; 2],
    pub rotation: f32,
    pub shape: u32,
    pub color: [f32; 4],
}

/// Foreshortening of a flat piece tumbling around its long axis.
pub fn thinness(flip: f32) -> f32 {
    flip.sin().abs().max(MIN_THINNESS)
}

pub fn opacity(particle: &Particle, preset: &ConfettiPreset) -> f32 {
    let fade = if preset.fade_window > 0.0 {
        (particle.remaining() / preset.fade_window).clamp(0.0, 1.0)
    } else {
        1.0
    };
    fade * (0.35 + 0.65 * thinness(particle.flip))
}

pub fn instance(particle: &Particle, preset: &ConfettiPreset) -> Option<ParticleInstance> {
    let face = if particle.flip.cos() >= 0.0 {
        particle.colors[0]
    } else {
        particle.colors[1]
    };
    let alpha = face.w * opacity(particle, preset);
    if alpha < ALPHA_CUTOFF {
        return None;
    }
    let half = particle.size * 0.5 * Vec2::new(thinness(particle.flip), 1.0);
    Some(ParticleInstance {
        center: particle.pos.to_array(),
        half_extent: half.to_array(),
        rotation: particle.rotation,
        shape: particle.shape as u32,
        color: Vec4::new(face.x, face.y, face.z, alpha).to_array(),
    })
}

pub fn instances(particles: &[Particle], preset: &ConfettiPreset) -> Vec<ParticleInstance> {
    particles
        .iter()
        .filter_map(|particle| instance(particle, preset))
        .collect()
}

/// Raw bytes for uploading `instances` to a vertex buffer.
pub fn instance_bytes(instances: &[ParticleInstance]) -> &[u8] {
    bytemuck::cast_slice(instances)
}

/// Convex outline of an instance in logical coordinates.
pub fn outline(instance: &ParticleInstance) -> Vec<[f32; 2]> {
    let center = Vec2::from_array(instance.center);
    let half = Vec2::from_array(instance.half_extent);
    let rot = Vec2::from_angle(instance.rotation);
    let place = |local: Vec2| (center + rot.rotate(local)).to_array();

    if instance.shape == ShapeKind::Disc as u32 {
        (0..DISC_SEGMENTS)
            .map(|i| {
                let (sin, cos) = (i as f32 / DISC_SEGMENTS as f32 * TAU).sin_cos();
                place(Vec2::new(cos * half.x, sin * half.y))
            })
            .collect()
    } else if instance.shape == ShapeKind::Square as u32 {
        // Clip the corners a little so squares read as rounded paper.
        let cut = half.min_element() * 0.3;
        [
            Vec2::new(-half.x + cut, -half.y),
            Vec2::new(half.x - cut, -half.y),
            Vec2::new(half.x, -half.y + cut),
            Vec2::new(half.x, half.y - cut),
            Vec2::new(half.x - cut, half.y),
            Vec2::new(-half.x + cut, half.y),
            Vec2::new(-half.x, half.y - cut),
            Vec2::new(-half.x, -half.y + cut),
        ]
        .into_iter()
        .map(place)
        .collect()
    } else {
        [
            Vec2::new(-half.x, -half.y),
            Vec2::new(half.x, -half.y),
            Vec2::new(half.x, half.y),
            Vec2::new(-half.x, half.y),
        ]
        .into_iter()
        .map(place)
        .collect()
    }
}

/// Clears `surface` and draws every instance onto it.
pub fn paint(instances: &[ParticleInstance], surface: &mut dyn RenderSurface) -> Result<()> {
    surface.clear()?;
    for instance in instances {
        surface.fill_convex(&outline(instance), instance.color)?;
    }
    Ok(())
}
