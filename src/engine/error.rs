// Error types. Construction-time failures are fatal and surface as Results;
// transient detection misses are not errors (they map to the neutral gesture
// state instead).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("particle group '{group}' buffer length mismatch: expected {expected}, got {actual}")]
    TargetMismatch {
        group: &'static str,
        expected: usize,
        actual: usize,
    },
}

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("capture device lost: {0}")]
    DeviceLost(String),
}
