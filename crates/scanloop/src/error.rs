use std::path::PathBuf;

use crate::CaptureState;

/// Failures reported by a [`CameraProvider`](crate::CameraProvider).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera unavailable: {0}")]
    Unavailable(String),

    #[error("camera is busy")]
    Busy,

    #[error("camera lock poisoned by a panicking thread")]
    Poisoned,

    #[error("camera error: {0}")]
    Other(String),
}

/// Errors surfaced by the capture coordinator.
#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error(transparent)]
    CameraUnavailable(#[from] CameraError),

    #[error("`{operation}` is not valid in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: CaptureState,
    },

    #[error("failed to spawn decode worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while loading or validating a [`CaptureConfig`](crate::CaptureConfig).
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
