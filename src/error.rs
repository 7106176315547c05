use std::fmt;

use thiserror::Error;

use crate::gpu::ShaderStage;
use crate::lifecycle::Phase;

/// Everything that can go wrong between acquiring a context and the first frame.
///
/// Steady-state rendering and audio generation do not produce errors; once both
/// programs are linked the only failure left is an audible underrun, which is
/// not observable from here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to compile {stage} shader:\n{log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("failed to link {label} program:\n{log}")]
    Link { label: &'static str, log: String },
    #[error("vertex attribute `{0}` is not declared by the vertex shader")]
    MissingAttribute(&'static str),
    #[error("GPU context could not allocate {0}")]
    Allocation(&'static str),
    #[error("`{operation}` is not permitted while the player is {phase}")]
    Lifecycle {
        operation: &'static str,
        phase: Phase,
    },
    #[error("audio block size {0} must be a power of two between 256 and 16384")]
    InvalidBufferSize(u32),
    #[error("audio block size `{0}` is not a whole number of frames")]
    UnparsableBufferSize(String),
    #[error("platform error: {0}")]
    Platform(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn platform(value: impl fmt::Debug) -> Self {
        Self::Platform(format!("{value:?}"))
    }
}

impl From<wasm_bindgen::JsValue> for Error {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        match value.as_string() {
            Some(message) => Self::Platform(message),
            None => Self::platform(value),
        }
    }
}

impl From<Error> for wasm_bindgen::JsValue {
    fn from(err: Error) -> Self {
        wasm_bindgen::JsValue::from_str(&err.to_string())
    }
}
