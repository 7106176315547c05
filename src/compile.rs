use log::error;

use crate::error::{Error, Result};
use crate::gpu::{Gpu, ShaderStage};

/// Compiles `source` for `stage`, returning the driver's info log on failure.
pub fn compile_shader<G: Gpu>(gpu: &G, source: &str, stage: ShaderStage) -> Result<G::Shader> {
    let shader = gpu
        .create_shader(stage)
        .ok_or(Error::Allocation("shader object"))?;
    gpu.shader_source(&shader, source);
    gpu.compile_shader(&shader);
    if gpu.shader_compiled(&shader) {
        return Ok(shader);
    }

    let log = gpu.shader_info_log(&shader).unwrap_or_default();
    gpu.delete_shader(&shader);
    error!("{stage} shader failed to compile:\n{log}");
    Err(Error::Compile { stage, log })
}

/// Links a vertex and fragment stage into a program.
///
/// Each name in `feedback_outputs` is captured into its own buffer slot
/// instead of being rasterised. An empty list links a normal program.
pub fn link_program<G: Gpu>(
    gpu: &G,
    label: &'static str,
    vertex: &G::Shader,
    fragment: &G::Shader,
    feedback_outputs: &[&str],
) -> Result<G::Program> {
    let program = gpu
        .create_program()
        .ok_or(Error::Allocation("program object"))?;
    gpu.attach_shader(&program, vertex);
    gpu.attach_shader(&program, fragment);
    if !feedback_outputs.is_empty() {
        gpu.transform_feedback_varyings(&program, feedback_outputs);
    }
    gpu.link_program(&program);
    if gpu.program_linked(&program) {
        return Ok(program);
    }

    let log = gpu.program_info_log(&program).unwrap_or_default();
    gpu.delete_program(&program);
    error!("{label} program failed to link:\n{log}");
    Err(Error::Link { label, log })
}

/// Compiles both stages and links them. Shader objects are released once the
/// program owns them, or as soon as a step fails.
pub(crate) fn build_program<G: Gpu>(
    gpu: &G,
    label: &'static str,
    vertex_source: &str,
    fragment_source: &str,
    feedback_outputs: &[&str],
) -> Result<G::Program> {
    let vertex = compile_shader(gpu, vertex_source, ShaderStage::Vertex)?;
    let fragment = match compile_shader(gpu, fragment_source, ShaderStage::Fragment) {
        Ok(shader) => shader,
        Err(err) => {
            gpu.delete_shader(&vertex);
            return Err(err);
        }
    };
    let linked = link_program(gpu, label, &vertex, &fragment, feedback_outputs);
    gpu.delete_shader(&vertex);
    gpu.delete_shader(&fragment);
    linked
}

/// Name of the vertex output captured by the sound program.
pub const SOUND_OUTPUT: &str = "music";

/// Fragment stage paired with the sound program; rasterisation is discarded.
pub const VOID_FRAGMENT: &str = "#version 300 es
void main() {}
";

const IMAGE_HEADER: &str = "#version 300 es
precision highp float;
uniform float iTime;
uniform vec2  iResolution;
out vec4 fragColor;
";

const IMAGE_FOOTER: &str = "
void main( void ) {
  vec4 color = vec4(0.0, 0.0, 0.0, 1.0);
  mainImage( color, gl_FragCoord.xy );
  color.w = 1.0;
  fragColor = color;
}
";

const SOUND_HEADER: &str = "#version 300 es
uniform float phase;
uniform float bufferSize;
uniform float sampleRate;
out vec2 music;
";

const SOUND_FOOTER: &str = "
void main( void ) {
  float time = (bufferSize * phase + float(gl_VertexID)) / sampleRate;
  music = mainSound( time );
}
";

/// Wraps user code defining `mainImage(out vec4, vec2)` into a complete
/// fragment shader that writes an opaque colour per pixel.
pub fn wrap_image(source: &str) -> String {
    format!("{IMAGE_HEADER}{}{IMAGE_FOOTER}", strip_version(source))
}

/// Wraps user code defining `vec2 mainSound(float)` into a vertex shader whose
/// `music` output holds the stereo sample for vertex `gl_VertexID`.
pub fn wrap_sound(source: &str) -> String {
    format!("{SOUND_HEADER}{}{SOUND_FOOTER}", strip_version(source))
}

// The wrapper's directive must stay the first line of the shader.
fn strip_version(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut skipped = false;
    for line in source.lines() {
        if !skipped && line.trim_start().starts_with("#version") {
            skipped = true;
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}
