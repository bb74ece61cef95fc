// Particle target generation: every group gets two precomputed shapes — the
// conical tree and the spherical nebula — sampled once at startup and never
// mutated afterwards. Only the `current` and `scale` buffers change per frame.
//
// Groups live in the ECS world as one entity each, carrying their
// structure-of-arrays buffers as components; particle indices are stable for
// the life of the process.

use super::error::SceneError;
use bevy_ecs::prelude::*;
use glam::Vec3;
use rand::Rng;
use std::f32::consts::TAU;

pub const CANOPY_COUNT: usize = 10_000;
pub const GLINT_COUNT: usize = 1_200;
pub const ORBIT_COUNT: usize = 3_000;
pub const STAR_COUNT: usize = 600;

// Conical tree mapping parameters. The radius divisor stays at the canopy
// height for both groups so the glints hug the same silhouette.
const TREE_HEIGHT: f32 = 10.0;
const CANOPY_RADIUS: f32 = 4.0;
const CANOPY_SKEW: f32 = 0.6;
const GLINT_HEIGHT: f32 = 9.8;
const GLINT_RADIUS: f32 = 3.8;
const GLINT_SKEW: f32 = 0.35;

// Nebula shell radius bands, [inner, outer).
const NEBULA_SHELL: (f32, f32) = (18.0, 43.0);
const ORBIT_SHELL: (f32, f32) = (21.6, 51.6);
const BACKDROP_SHELL: (f32, f32) = (150.0, 200.0);

/// Which particle group an entity represents.
#[derive(Component, Clone, Copy, PartialEq, Eq, Debug)]
pub enum GroupKind {
    /// Dense foliage, the bulk of the tree.
    Canopy,
    /// Sparse bright sparkles that vanish while exploded.
    Glint,
    /// Spiral garland orbiting the trunk.
    Orbit,
    /// Fixed backdrop, never participates in mode blending.
    Backdrop,
}

/// Structure-of-arrays particle buffers. `tree` and `nebula` are immutable
/// after generation; `current` and `scale` are rewritten every frame. All
/// five arrays are indexed by the same stable particle index.
#[derive(Component)]
pub struct GroupBuffers {
    pub tree: Vec<Vec3>,
    pub nebula: Vec<Vec3>,
    pub current: Vec<Vec3>,
    /// Per-particle random attribute fixed at creation: size jitter for the
    /// canopy, sine phase offset for the other groups.
    pub seed: Vec<f32>,
    pub scale: Vec<f32>,
}

impl GroupBuffers {
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// Mismatched buffer lengths are a construction bug; refuse to animate.
    pub fn validate(&self, group: &'static str, expected: usize) -> Result<(), SceneError> {
        for actual in [
            self.tree.len(),
            self.nebula.len(),
            self.current.len(),
            self.seed.len(),
            self.scale.len(),
        ] {
            if actual != expected {
                return Err(SceneError::TargetMismatch { group, expected, actual });
            }
        }
        Ok(())
    }
}

/// Per-particle spiral parameters, fixed at creation. The orbit group's
/// tree-mode destination is a function of these and the elapsed time.
#[derive(Clone, Copy, Debug)]
pub struct OrbitSeed {
    /// Fractional index along the garland, [0, 1).
    pub t: f32,
    pub drift: f32,
    /// Radial gap pushing the garland outside the canopy silhouette.
    pub gap: f32,
    pub offset_y: f32,
    pub twinkle: f32,
}

#[derive(Component)]
pub struct OrbitSeeds(pub Vec<OrbitSeed>);

/// Base render color for a group. The canopy tracks the active theme; the
/// other groups keep their fixed color.
#[derive(Component)]
pub struct GroupStyle {
    pub color: Vec3,
    pub alpha: f32,
    pub themed: bool,
}

/// Conical tree sample: height uniform in [0, h_max), radius shrinking
/// linearly toward the tip with a power-law skew biasing particles outward
/// from the trunk, azimuth uniform.
pub fn conical_point<R: Rng>(rng: &mut R, h_max: f32, h_ref: f32, r_max: f32, skew: f32) -> Vec3 {
    let height = rng.gen_range(0.0..h_max);
    let radius = (1.0 - height / h_ref) * r_max * rng.gen_range(0.0f32..1.0).powf(skew);
    let angle = rng.gen_range(0.0..TAU);
    Vec3::new(angle.cos() * radius, height, angle.sin() * radius)
}

/// Uniform point in a spherical shell: azimuth uniform, polar angle via the
/// inverse CDF acos(2u - 1), radius uniform in [inner, outer).
pub fn shell_point<R: Rng>(rng: &mut R, inner: f32, outer: f32) -> Vec3 {
    let theta = rng.gen_range(0.0..TAU);
    let phi = (2.0 * rng.gen_range(0.0f32..1.0) - 1.0).acos();
    let r = rng.gen_range(inner..outer);
    Vec3::new(
        r * phi.sin() * theta.cos(),
        r * phi.sin() * theta.sin(),
        r * phi.cos(),
    )
}

/// Spiral garland position in tree mode at the given elapsed time: the angle
/// advances with time, producing a slowly rotating garland.
pub fn orbit_tree_position(seed: &OrbitSeed, time: f32) -> Vec3 {
    let h = seed.t * (TREE_HEIGHT + 0.5);
    let radius = (1.0 - h / TREE_HEIGHT) * CANOPY_RADIUS + seed.gap;
    let angle = seed.t * 3.0 * TAU + time * 0.5 + seed.drift;
    Vec3::new(
        angle.cos() * radius,
        h - 0.5 + seed.offset_y,
        angle.sin() * radius,
    )
}

fn shell_targets<R: Rng>(rng: &mut R, count: usize, band: (f32, f32)) -> Vec<Vec3> {
    (0..count).map(|_| shell_point(rng, band.0, band.1)).collect()
}

fn phases<R: Rng>(rng: &mut R, count: usize) -> Vec<f32> {
    (0..count).map(|_| rng.gen_range(0.0..TAU)).collect()
}

/// Generate every particle group and spawn them into the world. Fails fast
/// if any group's buffers come out inconsistent.
pub fn build_groups(world: &mut World) -> Result<(), SceneError> {
    let mut rng = rand::thread_rng();

    // Canopy: conical tree target, nebula shell, size-jitter seeds.
    let tree: Vec<Vec3> = (0..CANOPY_COUNT)
        .map(|_| conical_point(&mut rng, TREE_HEIGHT, TREE_HEIGHT, CANOPY_RADIUS, CANOPY_SKEW))
        .collect();
    let canopy = GroupBuffers {
        current: tree.clone(),
        nebula: shell_targets(&mut rng, CANOPY_COUNT, NEBULA_SHELL),
        seed: (0..CANOPY_COUNT).map(|_| rng.gen_range(0.0f32..1.0)).collect(),
        scale: vec![0.0; CANOPY_COUNT],
        tree,
    };
    canopy.validate("canopy", CANOPY_COUNT)?;
    world.spawn((
        GroupKind::Canopy,
        canopy,
        GroupStyle { color: super::state::ColorTheme::Pink.palette().main, alpha: 1.0, themed: true },
    ));

    // Glints: slightly tighter cone, strong outward skew.
    let tree: Vec<Vec3> = (0..GLINT_COUNT)
        .map(|_| conical_point(&mut rng, GLINT_HEIGHT, TREE_HEIGHT, GLINT_RADIUS, GLINT_SKEW))
        .collect();
    let glints = GroupBuffers {
        current: tree.clone(),
        nebula: shell_targets(&mut rng, GLINT_COUNT, NEBULA_SHELL),
        seed: phases(&mut rng, GLINT_COUNT),
        scale: vec![0.0; GLINT_COUNT],
        tree,
    };
    glints.validate("glints", GLINT_COUNT)?;
    world.spawn((
        GroupKind::Glint,
        glints,
        GroupStyle { color: Vec3::ONE, alpha: 1.0, themed: false },
    ));

    // Orbit garland: the tree array holds the time-zero spiral; the live
    // position is recomputed from the seeds every frame.
    let seeds: Vec<OrbitSeed> = (0..ORBIT_COUNT)
        .map(|i| OrbitSeed {
            t: i as f32 / ORBIT_COUNT as f32,
            drift: rng.gen_range(-0.125..0.125),
            gap: 1.8 + rng.gen_range(0.0..0.5),
            offset_y: rng.gen_range(-0.075..0.075),
            twinkle: rng.gen_range(0.0..TAU),
        })
        .collect();
    let tree: Vec<Vec3> = seeds.iter().map(|s| orbit_tree_position(s, 0.0)).collect();
    let orbit = GroupBuffers {
        current: tree.clone(),
        nebula: shell_targets(&mut rng, ORBIT_COUNT, ORBIT_SHELL),
        seed: seeds.iter().map(|s| s.twinkle).collect(),
        scale: vec![0.0; ORBIT_COUNT],
        tree,
    };
    orbit.validate("orbit", ORBIT_COUNT)?;
    world.spawn((
        GroupKind::Orbit,
        orbit,
        OrbitSeeds(seeds),
        GroupStyle { color: Vec3::ONE, alpha: 0.8, themed: false },
    ));

    // Backdrop stars: one static shell at a much larger radius, always
    // rendered regardless of mode.
    let fixed = shell_targets(&mut rng, STAR_COUNT, BACKDROP_SHELL);
    let backdrop = GroupBuffers {
        tree: fixed.clone(),
        nebula: fixed.clone(),
        current: fixed,
        seed: phases(&mut rng, STAR_COUNT),
        scale: vec![0.0; STAR_COUNT],
    };
    backdrop.validate("backdrop", STAR_COUNT)?;
    world.spawn((
        GroupKind::Backdrop,
        backdrop,
        GroupStyle { color: Vec3::ONE, alpha: 0.1, themed: false },
    ));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_buffer_lengths_match() {
        let mut world = World::new();
        build_groups(&mut world).unwrap();

        let mut query = world.query::<(&GroupKind, &GroupBuffers)>();
        let mut seen = 0;
        for (kind, buffers) in query.iter(&world) {
            let expected = match kind {
                GroupKind::Canopy => CANOPY_COUNT,
                GroupKind::Glint => GLINT_COUNT,
                GroupKind::Orbit => ORBIT_COUNT,
                GroupKind::Backdrop => STAR_COUNT,
            };
            assert_eq!(buffers.len(), expected);
            assert_eq!(buffers.tree.len(), buffers.nebula.len());
            assert_eq!(buffers.tree.len(), buffers.current.len());
            seen += 1;
        }
        assert_eq!(seen, 4);
    }

    #[test]
    fn conical_samples_stay_inside_the_cone() {
        let mut rng = rand::thread_rng();
        for _ in 0..2_000 {
            let p = conical_point(&mut rng, TREE_HEIGHT, TREE_HEIGHT, CANOPY_RADIUS, CANOPY_SKEW);
            assert!(p.y >= 0.0 && p.y < TREE_HEIGHT);
            let allowed = (1.0 - p.y / TREE_HEIGHT) * CANOPY_RADIUS;
            let horizontal = (p.x * p.x + p.z * p.z).sqrt();
            assert!(horizontal <= allowed + 1e-4, "r={horizontal} at h={}", p.y);
        }
    }

    #[test]
    fn shell_samples_stay_inside_the_band() {
        let mut rng = rand::thread_rng();
        for _ in 0..2_000 {
            let p = shell_point(&mut rng, 18.0, 43.0);
            let r = p.length();
            assert!(r >= 18.0 - 1e-3 && r < 43.0 + 1e-3, "r={r}");
        }
    }

    #[test]
    fn shell_covers_both_hemispheres() {
        // acos(2u-1) polar sampling must not pile everything on one pole.
        let mut rng = rand::thread_rng();
        let samples: Vec<Vec3> = (0..4_000).map(|_| shell_point(&mut rng, 1.0, 2.0)).collect();
        let above = samples.iter().filter(|p| p.z > 0.0).count();
        let ratio = above as f32 / samples.len() as f32;
        assert!(ratio > 0.4 && ratio < 0.6, "hemisphere ratio {ratio}");
    }

    #[test]
    fn orbit_garland_rotates_with_time() {
        let seed = OrbitSeed { t: 0.25, drift: 0.0, gap: 2.0, offset_y: 0.0, twinkle: 0.0 };
        let a = orbit_tree_position(&seed, 0.0);
        let b = orbit_tree_position(&seed, 1.0);
        assert_eq!(a.y, b.y);
        assert!((a - b).length() > 1e-3, "garland should advance with time");
        // Radius is preserved, only the angle changes.
        let ra = (a.x * a.x + a.z * a.z).sqrt();
        let rb = (b.x * b.x + b.z * b.z).sqrt();
        assert!((ra - rb).abs() < 1e-4);
    }

    #[test]
    fn validation_rejects_truncated_buffers() {
        let buffers = GroupBuffers {
            tree: vec![Vec3::ZERO; 10],
            nebula: vec![Vec3::ZERO; 9],
            current: vec![Vec3::ZERO; 10],
            seed: vec![0.0; 10],
            scale: vec![0.0; 10],
        };
        assert!(buffers.validate("canopy", 10).is_err());
    }
}
