// Input state tracking for keyboard and mouse
// Abstracts winit events into a queryable per-frame snapshot

use std::collections::HashSet;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

pub struct InputState {
    // Keyboard
    keys_held: HashSet<KeyCode>,
    // Keys that went down since the last end_frame() — edge-triggered.
    keys_pressed: HashSet<KeyCode>,

    // Mouse
    pub mouse_position: (f32, f32),
    // Left button went down since the last end_frame().
    clicked: bool,

    // Window dimensions (used to normalize the cursor position)
    pub window_size: (u32, u32),
}

impl InputState {
    pub fn new() -> Self {
        Self {
            keys_held: HashSet::new(),
            keys_pressed: HashSet::new(),
            mouse_position: (0.0, 0.0),
            clicked: false,
            window_size: (0, 0),
        }
    }

    /// Feed a winit WindowEvent into the input state.
    /// Call this once per event before the app's own event handling.
    pub fn process_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => {
                            if self.keys_held.insert(key) {
                                self.keys_pressed.insert(key);
                            }
                        }
                        ElementState::Released => {
                            self.keys_held.remove(&key);
                        }
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse_position = (position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                self.clicked = true;
            }
            WindowEvent::Resized(size) => {
                self.window_size = (size.width, size.height);
            }
            _ => {}
        }
    }

    /// Call once per frame after update() and render() have consumed input.
    /// Resets the edge-triggered accumulators.
    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
        self.clicked = false;
    }

    pub fn was_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn was_clicked(&self) -> bool {
        self.clicked
    }

    /// Cursor position normalized to [0, 1] over the window, or the center
    /// before the first resize event arrives.
    pub fn normalized_cursor(&self) -> (f32, f32) {
        let (w, h) = (self.window_size.0 as f32, self.window_size.1 as f32);
        if w > 0.0 && h > 0.0 {
            (
                (self.mouse_position.0 / w).clamp(0.0, 1.0),
                (self.mouse_position.1 / h).clamp(0.0, 1.0),
            )
        } else {
            (0.5, 0.5)
        }
    }
}
