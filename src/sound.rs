//! GPU sound synthesis through transform feedback.
//!
//! The sound program is a vertex stage with nothing to rasterise: one draw of
//! `buffer_size` points evaluates `mainSound` once per output frame and the
//! `music` output of every invocation is captured into a float buffer. Two
//! such buffers rotate through a [`SlotPair`], and each block is read back
//! synchronously before the audio callback returns.
//!
//! A read-back that outlasts the audio engine's real-time budget is heard as
//! an underrun. Nothing here buffers ahead to hide that.

use log::{debug, trace};

use crate::compile::{build_program, wrap_sound, SOUND_OUTPUT, VOID_FRAGMENT};
use crate::error::{Error, Result};
use crate::gpu::{BufferTarget, Gpu};
use crate::slots::SlotPair;

/// Number of interleaved channels produced per frame.
pub const CHANNELS: usize = 2;

/// Absolute time in seconds of frame `index` of block `phase`.
pub fn sample_time(buffer_size: usize, sample_rate: f32, phase: u32, index: usize) -> f64 {
    (buffer_size as f64 * phase as f64 + index as f64) / sample_rate as f64
}

pub struct SoundPipeline<G: Gpu> {
    gpu: G,
    program: G::Program,
    phase_location: Option<G::UniformLocation>,
    buffers: SlotPair<G::Buffer>,
    buffer_size: usize,
    phase: u32,
    samples: Vec<f32>,
}

impl<G: Gpu> SoundPipeline<G> {
    /// Links the wrapped `sound_source` (defining `vec2 mainSound(float)`) and
    /// allocates both capture buffers at `buffer_size` stereo frames.
    pub fn new(gpu: G, sound_source: &str, buffer_size: usize, sample_rate: f32) -> Result<Self> {
        if buffer_size == 0 {
            return Err(Error::InvalidBufferSize(0));
        }
        let program = build_program(
            &gpu,
            "sound",
            &wrap_sound(sound_source),
            VOID_FRAGMENT,
            &[SOUND_OUTPUT],
        )?;

        gpu.use_program(Some(&program));
        let buffer_size_location = gpu.uniform_location(&program, "bufferSize");
        let sample_rate_location = gpu.uniform_location(&program, "sampleRate");
        let phase_location = gpu.uniform_location(&program, "phase");
        gpu.uniform1f(buffer_size_location.as_ref(), buffer_size as f32);
        gpu.uniform1f(sample_rate_location.as_ref(), sample_rate);

        let len = buffer_size * CHANNELS;
        let allocate = || -> Result<G::Buffer> {
            let buffer = gpu
                .create_buffer()
                .ok_or(Error::Allocation("feedback buffer"))?;
            gpu.bind_buffer(BufferTarget::Array, Some(&buffer));
            gpu.allocate_f32(BufferTarget::Array, len);
            Ok(buffer)
        };
        let buffers = SlotPair::new(allocate()?, allocate()?);
        gpu.bind_buffer(BufferTarget::Array, None);
        debug!("sound program linked ({buffer_size} frames at {sample_rate} Hz)");

        Ok(Self {
            gpu,
            program,
            phase_location,
            buffers,
            buffer_size,
            phase: 0,
            samples: vec![0.0; len],
        })
    }

    /// Synthesises the next block and returns it as interleaved stereo:
    /// `[2i]` is the left channel and `[2i + 1]` the right for frame `i`.
    ///
    /// Blocks until the GPU has written the block.
    pub fn generate_block(&mut self) -> &[f32] {
        let gpu = &self.gpu;
        gpu.use_program(Some(&self.program));
        gpu.uniform1f(self.phase_location.as_ref(), self.phase as f32);

        let (write, _) = self.buffers.split();
        gpu.bind_feedback_buffer(Some(&*write));
        gpu.set_rasterizer_discard(true);
        gpu.begin_feedback_points();
        gpu.draw_points(self.buffer_size as i32);
        gpu.end_feedback();
        gpu.set_rasterizer_discard(false);
        // A buffer may not stay bound for capture while it is read.
        gpu.bind_feedback_buffer(None);

        self.buffers.rotate();
        gpu.bind_buffer(BufferTarget::Array, Some(self.buffers.read_slot()));
        gpu.read_buffer_f32(BufferTarget::Array, &mut self.samples);
        gpu.bind_buffer(BufferTarget::Array, None);

        trace!("sound block {} generated", self.phase);
        self.phase = self.phase.wrapping_add(1);
        &self.samples
    }

    /// Number of blocks generated so far.
    pub fn phase(&self) -> u32 {
        self.phase
    }

    pub fn active_index(&self) -> usize {
        self.buffers.active_index()
    }
}

impl<G: Gpu> Drop for SoundPipeline<G> {
    fn drop(&mut self) {
        self.gpu.delete_program(&self.program);
    }
}
