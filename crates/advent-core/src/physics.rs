//! Pure particle integration; no surface or scheduler involved.

use advent_platform::SurfaceRect;
use glam::Vec2;

use crate::config::ConfettiPreset;
use crate::particle::Particle;

/// Lateral wind acceleration at `elapsed` seconds for a particle at height `y`.
///
/// Smooth in both arguments, so neighbouring particles drift together.
pub fn wind(preset: &ConfettiPreset, elapsed: f32, y: f32) -> f32 {
    preset.wind_strength * (elapsed * preset.wind_frequency + y * preset.wind_wavenumber).sin()
}

/// Advances one particle by `dt` seconds.
pub fn integrate(particle: &mut Particle, dt: f32, elapsed: f32, preset: &ConfettiPreset) {
    let acc = particle.acc + Vec2::new(wind(preset, elapsed, particle.pos.y), 0.0);
    particle.vel += acc * dt;
    // Quadratic drag, applied implicitly so large dt can't flip the velocity.
    let speed = particle.vel.length();
    particle.vel /= 1.0 + preset.drag * speed * dt;
    particle.pos += particle.vel * dt;
    particle.rotation += particle.spin * dt;
    particle.flip += particle.flip_speed * dt;
    particle.age += dt;
}

/// Integrates every particle and drops the expired or out-of-bounds ones.
/// Returns how many were removed.
pub fn step(
    particles: &mut Vec<Particle>,
    dt: f32,
    elapsed: f32,
    bounds: &SurfaceRect,
    preset: &ConfettiPreset,
) -> usize {
    let before = particles.len();
    particles.retain_mut(|particle| {
        integrate(particle, dt, elapsed, preset);
        !particle.is_expired()
            && bounds.contains_with_margin(particle.pos.x, particle.pos.y, preset.margin)
    });
    before - particles.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::spawn;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn still_preset() -> ConfettiPreset {
        ConfettiPreset {
            wind_strength: 0.0,
            ..ConfettiPreset::default()
        }
    }

    fn particle_at(pos: Vec2, vel: Vec2, preset: &ConfettiPreset) -> Particle {
        let mut rng = StdRng::seed_from_u64(3);
        Particle {
            pos,
            vel,
            lifetime: 10.0,
            ..spawn(&mut rng, pos, preset)
        }
    }

    #[test]
    fn falling_particle_settles_near_terminal_speed() {
        let preset = still_preset();
        let mut p = particle_at(Vec2::ZERO, Vec2::ZERO, &preset);
        for _ in 0..600 {
            integrate(&mut p, 1.0 / 60.0, 0.0, &preset);
        }
        let terminal = (preset.gravity / preset.drag).sqrt();
        assert!(p.vel.y > 0.0);
        assert!((p.vel.y - terminal).abs() / terminal < 0.05, "vy = {}", p.vel.y);
        assert!(p.vel.x.abs() < 1e-3);
    }

    #[test]
    fn upward_launch_peaks_then_falls() {
        let preset = still_preset();
        let mut p = particle_at(Vec2::new(0.0, 500.0), Vec2::new(0.0, -900.0), &preset);
        let mut peak = p.pos.y;
        let mut saw_fall = false;
        for _ in 0..120 {
            integrate(&mut p, 1.0 / 60.0, 0.0, &preset);
            if p.pos.y < peak {
                peak = p.pos.y;
            } else {
                saw_fall = true;
            }
        }
        assert!(peak < 500.0);
        assert!(saw_fall);
        assert!(p.vel.y > 0.0);
    }

    #[test]
    fn wind_is_coherent_for_nearby_particles() {
        let preset = ConfettiPreset::default();
        let a = wind(&preset, 1.3, 200.0);
        let b = wind(&preset, 1.3, 201.0);
        assert!((a - b).abs() < preset.wind_strength * 0.05);
        assert!(wind(&preset, 0.0, 0.0).abs() < 1e-6);
    }

    #[test]
    fn step_removes_expired_and_escaped_particles() {
        let preset = still_preset();
        let bounds = SurfaceRect::new(800.0, 600.0, 1.0);
        let mut expired = particle_at(Vec2::new(400.0, 300.0), Vec2::ZERO, &preset);
        expired.age = expired.lifetime;
        let escaped = particle_at(Vec2::new(-preset.margin - 50.0, 300.0), Vec2::ZERO, &preset);
        let alive = particle_at(Vec2::new(400.0, 300.0), Vec2::ZERO, &preset);
        let mut particles = vec![expired, escaped, alive];

        let removed = step(&mut particles, 1.0 / 60.0, 0.0, &bounds, &preset);
        assert_eq!(removed, 2);
        assert_eq!(particles.len(), 1);
        assert!(particles[0].age > 0.0);
    }

    #[test]
    fn rotation_and_flip_advance() {
        let preset = still_preset();
        let mut p = particle_at(Vec2::ZERO, Vec2::ZERO, &preset);
        let (rotation, flip) = (p.rotation, p.flip);
        integrate(&mut p, 0.1, 0.0, &preset);
        assert!((p.rotation - (rotation + p.spin * 0.1)).abs() < 1e-5);
        assert!((p.flip - (flip + p.flip_speed * 0.1)).abs() < 1e-5);
    }
}
