//! Full-screen shader animation with GPU-synthesised sound.
//!
//! An image program is drawn on every display refresh while a sound program,
//! run as a vertex stage with transform feedback, fills each block the audio
//! engine asks for. Both are owned by a [`Coordinator`].

pub mod bridge;
pub mod compile;
pub mod config;
pub mod error;
pub mod gpu;
pub mod lifecycle;
pub mod render;
pub mod slots;
pub mod sound;

#[cfg(test)]
mod testing;

// Only compile browser bindings when targeting wasm32.
#[cfg(target_arch = "wasm32")]
mod wasm;

pub use error::{Error, Result};
pub use lifecycle::{AudioFormat, Contexts, Coordinator, Phase, Sources};
pub use render::RenderPipeline;
pub use sound::SoundPipeline;
