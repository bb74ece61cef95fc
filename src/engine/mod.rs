// Engine modules: particle generation and blending, gesture processing,
// procedural meshes, and the presentation-side state machine.

pub mod blend;
pub mod camera;
pub mod error;
pub mod gesture;
pub mod input;
pub mod mesh;
pub mod overlay;
pub mod star;
pub mod state;
pub mod targets;
