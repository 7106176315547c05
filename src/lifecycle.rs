//! Start/stop state machine owning both pipelines.
//!
//! The coordinator knows nothing about browsers: its owner hands it contexts
//! and a surface, forwards timestamps from the refresh scheduler, channel
//! buffers from the audio engine, and resize notifications. `render` and
//! `process_audio` report whether the caller should keep its callback armed.

use std::fmt;

use log::{debug, info, trace};

use crate::bridge::deliver;
use crate::error::{Error, Result};
use crate::gpu::{Gpu, Surface};
use crate::render::RenderPipeline;
use crate::sound::SoundPipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initialized,
    Running,
    Stopped,
}

impl Phase {
    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Shader text for both pipelines.
#[derive(Debug, Clone, Copy)]
pub struct Sources<'a> {
    /// Vertex stage of the image pipeline; declares `in vec3 position`.
    pub vertex: &'a str,
    /// Defines `void mainImage(out vec4, vec2)`.
    pub image: &'a str,
    /// Defines `vec2 mainSound(float)`.
    pub sound: &'a str,
}

/// Fixed by the audio engine when it is created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFormat {
    pub buffer_size: usize,
    pub sample_rate: f32,
}

/// Handles acquired by the host before initialisation.
pub struct Contexts<G, S> {
    pub render: G,
    pub sound: G,
    pub surface: S,
}

struct Session<G: Gpu, S: Surface> {
    render: RenderPipeline<G>,
    sound: SoundPipeline<G>,
    surface: S,
    viewport: (u32, u32),
    epoch_ms: f64,
}

impl<G: Gpu, S: Surface> Session<G, S> {
    fn resize(&mut self, width: u32, height: u32) {
        self.surface.set_size(width, height);
        self.render.set_viewport(width, height);
        self.viewport = (width, height);
    }
}

enum State<G: Gpu, S: Surface> {
    Uninitialized,
    Initialized(Session<G, S>),
    Running(Session<G, S>),
    Stopped,
}

pub struct Coordinator<G: Gpu, S: Surface> {
    state: State<G, S>,
}

impl<G: Gpu, S: Surface> Default for Coordinator<G, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Gpu, S: Surface> Coordinator<G, S> {
    pub fn new() -> Self {
        Self {
            state: State::Uninitialized,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Uninitialized => Phase::Uninitialized,
            State::Initialized(_) => Phase::Initialized,
            State::Running(_) => Phase::Running,
            State::Stopped => Phase::Stopped,
        }
    }

    fn reject(&self, operation: &'static str) -> Error {
        Error::Lifecycle {
            operation,
            phase: self.phase(),
        }
    }

    /// Builds both pipelines and sizes the surface to `size`.
    ///
    /// `now_ms` becomes time zero for the image pipeline. On failure the
    /// coordinator stays uninitialised and neither loop may start.
    pub fn initialize(
        &mut self,
        contexts: Contexts<G, S>,
        sources: Sources<'_>,
        format: AudioFormat,
        size: (u32, u32),
        now_ms: f64,
    ) -> Result<()> {
        if !matches!(self.state, State::Uninitialized) {
            return Err(self.reject("initialize"));
        }

        let render = RenderPipeline::new(contexts.render, sources.vertex, sources.image)?;
        let sound = SoundPipeline::new(
            contexts.sound,
            sources.sound,
            format.buffer_size,
            format.sample_rate,
        )?;
        let mut session = Session {
            render,
            sound,
            surface: contexts.surface,
            viewport: size,
            epoch_ms: now_ms,
        };
        session.resize(size.0, size.1);

        info!(
            "pipelines ready: {}x{} viewport, {} frames per block at {} Hz",
            size.0, size.1, format.buffer_size, format.sample_rate
        );
        self.state = State::Initialized(session);
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Uninitialized) {
            State::Initialized(session) => {
                self.state = State::Running(session);
                info!("player running");
                Ok(())
            }
            other => {
                self.state = other;
                Err(self.reject("start"))
            }
        }
    }

    /// Stops both loops for good. Idempotent, and a no-op before
    /// initialisation: a coordinator only reaches `Stopped` through
    /// `Initialized`.
    pub fn stop(&mut self) {
        match self.state {
            State::Uninitialized => debug!("stop ignored: nothing initialised"),
            State::Stopped => {}
            State::Initialized(_) | State::Running(_) => {
                info!("player stopped after {}", self.phase());
                self.state = State::Stopped;
            }
        }
    }

    fn session(&mut self, operation: &'static str) -> Result<Option<&mut Session<G, S>>> {
        match &mut self.state {
            State::Initialized(session) | State::Running(session) => Ok(Some(session)),
            State::Stopped => Ok(None),
            State::Uninitialized => Err(Error::Lifecycle {
                operation,
                phase: Phase::Uninitialized,
            }),
        }
    }

    /// Draws the frame for timestamp `now_ms`. Returns `false` once stopped.
    pub fn render(&mut self, now_ms: f64) -> Result<bool> {
        let Some(session) = self.session("render")? else {
            return Ok(false);
        };
        let elapsed = ((now_ms - session.epoch_ms) * 0.001).max(0.0) as f32;
        let (width, height) = session.viewport;
        session.render.render_frame(elapsed, width, height);
        trace!("frame at {elapsed:.3}s");
        Ok(true)
    }

    /// Fills both channel buffers with the next block. Returns `false`, leaving
    /// the buffers untouched, once stopped.
    pub fn process_audio(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<bool> {
        let Some(session) = self.session("process_audio")? else {
            return Ok(false);
        };
        let block = session.sound.generate_block();
        deliver(block, left, right);
        Ok(true)
    }

    /// Resizes the surface and viewport; the next frame uses the new size.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if let Some(session) = self.session("resize")? {
            session.resize(width, height);
        }
        Ok(())
    }

    pub fn viewport(&self) -> Option<(u32, u32)> {
        match &self.state {
            State::Initialized(session) | State::Running(session) => Some(session.viewport),
            _ => None,
        }
    }

    /// Blocks of audio generated so far.
    pub fn blocks_generated(&self) -> Option<u32> {
        match &self.state {
            State::Initialized(session) | State::Running(session) => Some(session.sound.phase()),
            _ => None,
        }
    }
}
