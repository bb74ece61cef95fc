// Session state: scene mode, color theme, and the per-frame gesture snapshot.
// Mode and theme are owned by the presentation shell and passed by reference
// into the update passes — no globals.

use glam::Vec3;

/// The two-state choreography target: canonical tree canopy vs dispersed nebula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneMode {
    Tree,
    Explode,
}

impl SceneMode {
    pub fn is_tree(self) -> bool {
        self == SceneMode::Tree
    }
}

/// Color theme selected by gesture finger-count/thumb signals.
/// Defaults to Pink whenever gesture mode is inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTheme {
    Pink,
    Gold,
    Blue,
    Purple,
}

/// Primary/emissive color pair for a theme, linear RGB.
pub struct Palette {
    pub main: Vec3,
    pub emissive: Vec3,
}

fn hex(rgb: u32) -> Vec3 {
    Vec3::new(
        ((rgb >> 16) & 0xFF) as f32 / 255.0,
        ((rgb >> 8) & 0xFF) as f32 / 255.0,
        (rgb & 0xFF) as f32 / 255.0,
    )
}

impl ColorTheme {
    pub fn palette(self) -> Palette {
        match self {
            ColorTheme::Pink => Palette { main: hex(0xFFD1DC), emissive: hex(0xFFB2D0) },
            ColorTheme::Gold => Palette { main: hex(0xFFD700), emissive: hex(0xFFA500) },
            ColorTheme::Blue => Palette { main: hex(0x00F0FF), emissive: hex(0x0066FF) },
            ColorTheme::Purple => Palette { main: hex(0xBD00FF), emissive: hex(0x6600FF) },
        }
    }
}

/// Per-frame summarized output of hand tracking, decoupled from raw landmarks.
/// Produced by the gesture tracker thread, consumed read-only by the shell and
/// the blend passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureState {
    pub active: bool,
    /// Smoothed cursor position in normalized image coordinates.
    pub x: f32,
    pub y: f32,
    pub pinching: bool,
    pub thumb_up: bool,
    /// Extended non-thumb fingers, 0..=4.
    pub finger_count: u8,
    /// Smoothed hand span, scales particle spread while exploded.
    pub hand_size: f32,
    pub hand_rotation: f32,
}

impl GestureState {
    /// Fixed neutral state emitted whenever no hand is detected.
    pub fn neutral() -> Self {
        Self {
            active: false,
            x: 0.5,
            y: 0.5,
            pinching: false,
            thumb_up: false,
            finger_count: 0,
            hand_size: 1.0,
            hand_rotation: 0.0,
        }
    }
}

impl Default for GestureState {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Top-level mode/theme state machine driven by clicks and gesture decisions.
pub struct SessionState {
    pub mode: SceneMode,
    pub theme: ColorTheme,
    /// One-time choice at session start; not changeable while running.
    pub gesture_mode: bool,
}

impl SessionState {
    pub fn new(gesture_mode: bool) -> Self {
        Self {
            mode: SceneMode::Tree,
            theme: ColorTheme::Pink,
            gesture_mode,
        }
    }

    /// Click/tap anywhere on the render surface alternates the scene mode.
    /// Works identically whether or not gesture mode is on.
    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            SceneMode::Tree => SceneMode::Explode,
            SceneMode::Explode => SceneMode::Tree,
        };
    }

    /// Evaluate the latest gesture snapshot: pinch selects the tree, an open
    /// hand the nebula, and finger count / thumb pick the theme. With gesture
    /// mode off the theme is pinned to Pink and the snapshot is ignored.
    pub fn evaluate_gesture(&mut self, gesture: &GestureState) {
        if !self.gesture_mode {
            self.theme = ColorTheme::Pink;
            return;
        }
        if !gesture.active {
            return;
        }

        self.mode = if gesture.pinching {
            SceneMode::Tree
        } else {
            SceneMode::Explode
        };

        self.theme = if gesture.finger_count == 1 {
            ColorTheme::Blue
        } else if gesture.finger_count >= 2 {
            ColorTheme::Gold
        } else if gesture.thumb_up {
            ColorTheme::Purple
        } else {
            ColorTheme::Pink
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_gesture() -> GestureState {
        GestureState {
            active: true,
            ..GestureState::neutral()
        }
    }

    #[test]
    fn click_toggle_alternates_regardless_of_stale_gesture() {
        let mut session = SessionState::new(false);
        assert_eq!(session.mode, SceneMode::Tree);
        session.toggle_mode();
        assert_eq!(session.mode, SceneMode::Explode);
        session.toggle_mode();
        assert_eq!(session.mode, SceneMode::Tree);

        // A stale gesture snapshot must not interfere when gesture mode is off.
        let stale = GestureState {
            active: true,
            pinching: true,
            ..GestureState::neutral()
        };
        session.evaluate_gesture(&stale);
        assert_eq!(session.mode, SceneMode::Tree);
        session.toggle_mode();
        assert_eq!(session.mode, SceneMode::Explode);
    }

    #[test]
    fn two_fingers_selects_gold() {
        let mut session = SessionState::new(true);
        let mut g = active_gesture();
        g.finger_count = 2;
        session.evaluate_gesture(&g);
        assert_eq!(session.theme, ColorTheme::Gold);
    }

    #[test]
    fn one_finger_selects_blue_and_thumb_selects_purple() {
        let mut session = SessionState::new(true);
        let mut g = active_gesture();
        g.finger_count = 1;
        session.evaluate_gesture(&g);
        assert_eq!(session.theme, ColorTheme::Blue);

        g.finger_count = 0;
        g.thumb_up = true;
        session.evaluate_gesture(&g);
        assert_eq!(session.theme, ColorTheme::Purple);
    }

    #[test]
    fn theme_resets_to_pink_without_gesture_mode() {
        let mut session = SessionState::new(false);
        session.theme = ColorTheme::Gold;
        session.evaluate_gesture(&GestureState::neutral());
        assert_eq!(session.theme, ColorTheme::Pink);
    }

    #[test]
    fn pinch_pulls_back_to_tree() {
        let mut session = SessionState::new(true);
        let mut g = active_gesture();
        session.evaluate_gesture(&g);
        assert_eq!(session.mode, SceneMode::Explode);
        g.pinching = true;
        session.evaluate_gesture(&g);
        assert_eq!(session.mode, SceneMode::Tree);
    }

    #[test]
    fn inactive_gesture_leaves_mode_untouched() {
        let mut session = SessionState::new(true);
        session.mode = SceneMode::Explode;
        session.evaluate_gesture(&GestureState::neutral());
        assert_eq!(session.mode, SceneMode::Explode);
    }
}
