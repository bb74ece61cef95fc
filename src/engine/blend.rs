// Per-frame particle choreography: blends every group's live positions
// toward the active mode's targets and writes the per-instance render scales.
//
// The lerp is exponential-decay style (`a += (b - a) * rate`), applied once
// per display frame and deliberately not normalized by elapsed time: the
// convergence feel is tied to frame cadence.

use super::state::{ColorTheme, GestureState, SceneMode};
use super::targets::{orbit_tree_position, GroupBuffers, GroupKind, GroupStyle, OrbitSeeds};
use bevy_ecs::prelude::*;
use glam::{Mat4, Vec3};
use std::f32::consts::PI;

/// Snappier return to the canonical tree shape...
pub const TREE_RATE: f32 = 0.08;
/// ...slower, more drifting dispersal into the nebula.
pub const EXPLODE_RATE: f32 = 0.04;

const COLOR_RATE: f32 = 0.05;
const ROTATION_RATE: f32 = 0.05;
const AUTO_SPIN_SPEED: f32 = 0.15;

/// Hand-size clamp while exploded with a tracked hand.
pub const SPREAD_MIN: f32 = 0.6;
pub const SPREAD_MAX: f32 = 2.0;

pub fn lerp(a: f32, b: f32, rate: f32) -> f32 {
    a + (b - a) * rate
}

pub fn lerp_vec(a: Vec3, b: Vec3, rate: f32) -> Vec3 {
    a + (b - a) * rate
}

/// Everything a display frame's update passes need, assembled once per frame.
pub struct FrameParams {
    pub mode: SceneMode,
    pub gesture: GestureState,
    /// Elapsed wall-clock seconds since scene start.
    pub time: f32,
    pub dt: f32,
}

/// Hand-size gesture only affects spread while exploded and a hand is
/// tracked; otherwise targets are used at their canonical scale.
pub fn spread_multiplier(mode: SceneMode, gesture: &GestureState) -> f32 {
    if mode.is_tree() || !gesture.active {
        1.0
    } else {
        gesture.hand_size.clamp(SPREAD_MIN, SPREAD_MAX)
    }
}

pub fn blend_rate(mode: SceneMode) -> f32 {
    if mode.is_tree() { TREE_RATE } else { EXPLODE_RATE }
}

/// One blend pass over every particle group.
pub fn update_particles(world: &mut World, params: &FrameParams, theme: ColorTheme) {
    let is_tree = params.mode.is_tree();
    let rate = blend_rate(params.mode);
    let multiplier = spread_multiplier(params.mode, &params.gesture);
    let time = params.time;

    let mut query =
        world.query::<(&GroupKind, &mut GroupBuffers, &mut GroupStyle, Option<&OrbitSeeds>)>();
    for (kind, mut buffers, mut style, orbit_seeds) in query.iter_mut(world) {
        if style.themed {
            style.color = lerp_vec(style.color, theme.palette().main, COLOR_RATE);
        }

        let buffers = &mut *buffers;
        match kind {
            GroupKind::Canopy => {
                let size_boost = if is_tree { 1.0 } else { 1.5 };
                for i in 0..buffers.current.len() {
                    let target = if is_tree { buffers.tree[i] } else { buffers.nebula[i] };
                    buffers.current[i] =
                        lerp_vec(buffers.current[i], target * multiplier, rate);
                    buffers.scale[i] = (0.008 + buffers.seed[i] * 0.01) * size_boost;
                }
            }
            GroupKind::Orbit => {
                // Half the canopy rate: the garland trails behind the canopy.
                let rate = rate * 0.5;
                let size_boost = if is_tree { 1.0 } else { 1.8 };
                let seeds = &orbit_seeds.expect("orbit group spawned without seeds").0;
                for i in 0..buffers.current.len() {
                    let target = if is_tree {
                        // Tree destination is a function of elapsed time:
                        // the garland keeps rotating while assembled.
                        orbit_tree_position(&seeds[i], time)
                    } else {
                        buffers.nebula[i]
                    };
                    buffers.current[i] =
                        lerp_vec(buffers.current[i], target * multiplier, rate);
                    buffers.scale[i] =
                        (0.012 + (time * 4.0 + seeds[i].twinkle).sin() * 0.005) * size_boost;
                }
            }
            GroupKind::Glint => {
                // Sparkles snap positionally and vanish while exploded
                // instead of flying outward.
                for i in 0..buffers.current.len() {
                    buffers.current[i] = if is_tree { buffers.tree[i] } else { buffers.nebula[i] };
                    buffers.scale[i] = if is_tree {
                        0.006 + (time * 5.0 + buffers.seed[i]).sin() * 0.006
                    } else {
                        0.0
                    };
                }
            }
            GroupKind::Backdrop => {
                // Never participates in mode blending; slow size pulse only.
                for i in 0..buffers.current.len() {
                    buffers.scale[i] = 0.04 + (time * 0.3 + buffers.seed[i]).sin() * 0.04;
                }
            }
        }
    }
}

// ============================================================================
// SCENE ROTATION
// ============================================================================

/// Whole-scene orientation. While exploded with a tracked hand, yaw and pitch
/// follow the hand position; otherwise the scene auto-spins slowly and the
/// pitch relaxes back to level.
pub struct SceneRotation {
    pub yaw: f32,
    pub pitch: f32,
}

impl SceneRotation {
    pub fn new() -> Self {
        Self { yaw: 0.0, pitch: 0.0 }
    }

    pub fn update(&mut self, params: &FrameParams) {
        if params.gesture.active && !params.mode.is_tree() {
            let target_yaw = ((1.0 - params.gesture.x) - 0.5) * PI * 3.0;
            let target_pitch = (params.gesture.y - 0.5) * 1.5;
            self.yaw = lerp(self.yaw, target_yaw, ROTATION_RATE);
            self.pitch = lerp(self.pitch, target_pitch, ROTATION_RATE);
        } else {
            self.yaw += params.dt * AUTO_SPIN_SPEED;
            self.pitch = lerp(self.pitch, 0.0, ROTATION_RATE);
        }
    }

    /// Model matrix for the rotating particle scene, pitched then yawed
    /// around the given pivot translation.
    pub fn model_matrix(&self, translation: Vec3) -> Mat4 {
        Mat4::from_translation(translation)
            * Mat4::from_rotation_x(self.pitch)
            * Mat4::from_rotation_y(self.yaw)
    }
}

// ============================================================================
// CENTERPIECE ORNAMENT
// ============================================================================

const STAR_TREE_HEIGHT: f32 = 10.7;
const STAR_EXPLODE_HEIGHT: f32 = 45.0;
const STAR_TREE_SCALE: f32 = 0.095;

/// The star atop the tree: visible and spinning in tree mode, scaled to zero
/// and flown far upward while exploded. Colors chase the active theme.
pub struct Centerpiece {
    pub height: f32,
    pub scale: f32,
    pub spin: f32,
    pub color: Vec3,
    pub emissive: Vec3,
}

/// The ornament keeps its own colors under the default theme: white body
/// with a light-pink glow (#FFB6C1), not the leaf palette's emissive. The
/// other themes reuse their palette pair.
fn star_palette(theme: ColorTheme) -> (Vec3, Vec3) {
    match theme {
        ColorTheme::Pink => (Vec3::ONE, Vec3::new(1.0, 182.0 / 255.0, 193.0 / 255.0)),
        other => {
            let palette = other.palette();
            (palette.main, palette.emissive)
        }
    }
}

impl Centerpiece {
    pub fn new() -> Self {
        let (color, emissive) = star_palette(ColorTheme::Pink);
        Self {
            height: STAR_TREE_HEIGHT,
            scale: STAR_TREE_SCALE,
            spin: 0.0,
            color,
            emissive,
        }
    }

    pub fn update(&mut self, mode: SceneMode, theme: ColorTheme, time: f32) {
        self.spin = time * 2.2;
        let (target_height, target_scale) = if mode.is_tree() {
            (STAR_TREE_HEIGHT, STAR_TREE_SCALE)
        } else {
            (STAR_EXPLODE_HEIGHT, 0.0)
        };
        self.height = lerp(self.height, target_height, 0.07);
        self.scale = lerp(self.scale, target_scale, 0.12);

        let (main, emissive) = star_palette(theme);
        self.color = lerp_vec(self.color, main, 0.08);
        self.emissive = lerp_vec(self.emissive, emissive, 0.08);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::targets::{build_groups, CANOPY_COUNT};

    fn params(mode: SceneMode, time: f32) -> FrameParams {
        FrameParams {
            mode,
            gesture: GestureState::neutral(),
            time,
            dt: 1.0 / 60.0,
        }
    }

    fn with_group<R>(world: &mut World, wanted: GroupKind, f: impl FnOnce(&GroupBuffers) -> R) -> R {
        let mut query = world.query::<(&GroupKind, &GroupBuffers)>();
        let (_, buffers) = query
            .iter(world)
            .find(|(kind, _)| **kind == wanted)
            .unwrap();
        f(buffers)
    }

    fn step_frames(world: &mut World, mode: SceneMode, frames: usize, start_time: f32) {
        for n in 0..frames {
            let time = start_time + n as f32 / 60.0;
            update_particles(world, &params(mode, time), ColorTheme::Pink);
        }
    }

    #[test]
    fn distance_to_target_strictly_decreases() {
        let mut world = World::new();
        build_groups(&mut world).unwrap();

        // Starting on the tree, the nebula target is far away; every step
        // must move particle 0 strictly closer until convergence.
        let nebula0 = with_group(&mut world, GroupKind::Canopy, |b| b.nebula[0]);
        let mut prev = with_group(&mut world, GroupKind::Canopy, |b| b.current[0]).distance(nebula0);
        for n in 0..120 {
            update_particles(&mut world, &params(SceneMode::Explode, n as f32 / 60.0), ColorTheme::Pink);
            let dist = with_group(&mut world, GroupKind::Canopy, |b| b.current[0]).distance(nebula0);
            if prev > 1e-4 {
                assert!(dist < prev, "frame {n}: {dist} >= {prev}");
            }
            prev = dist;
        }
    }

    #[test]
    fn mode_round_trip_returns_to_the_tree() {
        let mut world = World::new();
        build_groups(&mut world).unwrap();
        let original = with_group(&mut world, GroupKind::Canopy, |b| b.tree.clone());

        step_frames(&mut world, SceneMode::Explode, 150, 0.0);
        // Sanity: the canopy actually left the tree shape.
        let wandered = with_group(&mut world, GroupKind::Canopy, |b| b.current[0]).distance(original[0]);
        assert!(wandered > 1.0);

        step_frames(&mut world, SceneMode::Tree, 400, 2.5);
        let current = with_group(&mut world, GroupKind::Canopy, |b| b.current.clone());
        for i in (0..CANOPY_COUNT).step_by(997) {
            let err = current[i].distance(original[i]);
            assert!(err < 1e-2, "particle {i} off by {err}");
        }
    }

    #[test]
    fn spread_multiplier_clamps_hand_size() {
        let mut gesture = GestureState::neutral();
        gesture.active = true;

        gesture.hand_size = 5.0;
        assert_eq!(spread_multiplier(SceneMode::Explode, &gesture), SPREAD_MAX);
        gesture.hand_size = 0.1;
        assert_eq!(spread_multiplier(SceneMode::Explode, &gesture), SPREAD_MIN);
        gesture.hand_size = 1.3;
        assert_eq!(spread_multiplier(SceneMode::Explode, &gesture), 1.3);

        // Tree mode and inactive hands ignore hand size entirely.
        assert_eq!(spread_multiplier(SceneMode::Tree, &gesture), 1.0);
        gesture.active = false;
        assert_eq!(spread_multiplier(SceneMode::Explode, &gesture), 1.0);
    }

    #[test]
    fn tree_rate_doubles_explode_rate_and_orbit_halves_it() {
        assert_eq!(blend_rate(SceneMode::Tree), TREE_RATE);
        assert_eq!(blend_rate(SceneMode::Explode), EXPLODE_RATE);
        assert!((TREE_RATE - 2.0 * EXPLODE_RATE).abs() < f32::EPSILON);
    }

    #[test]
    fn glints_vanish_while_exploded() {
        let mut world = World::new();
        build_groups(&mut world).unwrap();

        update_particles(&mut world, &params(SceneMode::Explode, 0.3), ColorTheme::Pink);
        with_group(&mut world, GroupKind::Glint, |buffers| {
            assert!(buffers.scale.iter().all(|&s| s == 0.0));
            // Positionally snapped to the nebula even though invisible.
            assert_eq!(buffers.current[0], buffers.nebula[0]);
        });
    }

    #[test]
    fn backdrop_ignores_mode_changes() {
        let mut world = World::new();
        build_groups(&mut world).unwrap();

        let before = with_group(&mut world, GroupKind::Backdrop, |b| b.current.clone());

        step_frames(&mut world, SceneMode::Explode, 30, 0.0);
        step_frames(&mut world, SceneMode::Tree, 30, 0.5);

        with_group(&mut world, GroupKind::Backdrop, |buffers| {
            assert_eq!(buffers.current, before);
        });
    }

    #[test]
    fn rotation_follows_the_hand_only_while_exploded() {
        let mut rotation = SceneRotation::new();
        let mut gesture = GestureState::neutral();
        gesture.active = true;
        gesture.x = 0.0;
        gesture.y = 1.0;

        let frame = FrameParams {
            mode: SceneMode::Explode,
            gesture,
            time: 0.0,
            dt: 1.0 / 60.0,
        };
        for _ in 0..400 {
            rotation.update(&frame);
        }
        // Converges to the gesture-driven targets.
        assert!((rotation.yaw - 0.5 * PI * 3.0).abs() < 1e-3);
        assert!((rotation.pitch - 0.75).abs() < 1e-3);

        // Back in tree mode the pitch relaxes and the yaw auto-advances.
        let frame = FrameParams {
            mode: SceneMode::Tree,
            gesture,
            time: 0.0,
            dt: 1.0 / 60.0,
        };
        let yaw_before = rotation.yaw;
        for _ in 0..400 {
            rotation.update(&frame);
        }
        assert!(rotation.yaw > yaw_before);
        assert!(rotation.pitch.abs() < 1e-3);
    }

    #[test]
    fn star_pink_glow_differs_from_the_leaf_palette() {
        let mut star = Centerpiece::new();
        for n in 0..300 {
            star.update(SceneMode::Tree, ColorTheme::Pink, n as f32 / 60.0);
        }
        assert!((star.color - Vec3::ONE).length() < 1e-2);
        let expected = Vec3::new(1.0, 182.0 / 255.0, 193.0 / 255.0);
        assert!((star.emissive - expected).length() < 1e-2);
        // The ornament's glow is its own color, not the leaves' emissive.
        assert!((star.emissive - ColorTheme::Pink.palette().emissive).length() > 1e-3);
    }

    #[test]
    fn centerpiece_flies_away_and_returns() {
        let mut star = Centerpiece::new();
        for n in 0..300 {
            star.update(SceneMode::Explode, ColorTheme::Gold, n as f32 / 60.0);
        }
        assert!((star.height - STAR_EXPLODE_HEIGHT).abs() < 1e-2);
        assert!(star.scale < 1e-4);
        let gold = ColorTheme::Gold.palette();
        assert!((star.color - gold.main).length() < 1e-2);

        for n in 0..300 {
            star.update(SceneMode::Tree, ColorTheme::Pink, n as f32 / 60.0);
        }
        assert!((star.height - STAR_TREE_HEIGHT).abs() < 1e-2);
        assert!((star.scale - STAR_TREE_SCALE).abs() < 1e-3);
    }
}
