//! Full-screen image pipeline: one quad, one program, two uniforms.

use log::debug;

use crate::compile::{build_program, wrap_image};
use crate::error::{Error, Result};
use crate::gpu::{BufferTarget, Gpu};

/// Two triangles covering clip space, three floats per vertex.
pub const QUAD_POSITIONS: [f32; 12] = [
    -1.0, 1.0, 0.0, //
    1.0, 1.0, 0.0, //
    -1.0, -1.0, 0.0, //
    1.0, -1.0, 0.0,
];
pub const QUAD_INDICES: [u16; 6] = [0, 2, 1, 1, 2, 3];

const POSITION_ATTRIB: &str = "position";

pub struct RenderPipeline<G: Gpu> {
    gpu: G,
    program: G::Program,
    vao: G::VertexArray,
    // Buffers are owned by the vertex array; kept so they live as long as it does.
    _buffers: [G::Buffer; 2],
    i_time: Option<G::UniformLocation>,
    i_resolution: Option<G::UniformLocation>,
}

impl<G: Gpu> RenderPipeline<G> {
    /// Links `vertex_source` with the wrapped `image_source` and uploads the quad.
    ///
    /// `image_source` must define `mainImage(out vec4, vec2)`; `vertex_source`
    /// must declare an `in vec3 position` attribute.
    pub fn new(gpu: G, vertex_source: &str, image_source: &str) -> Result<Self> {
        let program = build_program(&gpu, "render", vertex_source, &wrap_image(image_source), &[])?;
        let position = gpu
            .attrib_location(&program, POSITION_ATTRIB)
            .ok_or(Error::MissingAttribute(POSITION_ATTRIB))?;
        let i_time = gpu.uniform_location(&program, "iTime");
        let i_resolution = gpu.uniform_location(&program, "iResolution");

        let vao = gpu
            .create_vertex_array()
            .ok_or(Error::Allocation("vertex array"))?;
        let vertices = gpu
            .create_buffer()
            .ok_or(Error::Allocation("vertex buffer"))?;
        let indices = gpu
            .create_buffer()
            .ok_or(Error::Allocation("index buffer"))?;

        gpu.bind_vertex_array(Some(&vao));
        gpu.bind_buffer(BufferTarget::Array, Some(&vertices));
        gpu.buffer_data_f32(BufferTarget::Array, &QUAD_POSITIONS);
        gpu.enable_vertex_attrib_array(position);
        gpu.vertex_attrib_pointer_f32(position, 3);
        gpu.bind_buffer(BufferTarget::ElementArray, Some(&indices));
        gpu.buffer_data_u16(BufferTarget::ElementArray, &QUAD_INDICES);
        gpu.bind_vertex_array(None);

        gpu.clear_color(0.0, 0.0, 0.0, 1.0);
        debug!("render program linked");

        Ok(Self {
            gpu,
            program,
            vao,
            _buffers: [vertices, indices],
            i_time,
            i_resolution,
        })
    }

    /// Draws one frame. All state is rebound since other code may share the context.
    pub fn render_frame(&self, elapsed_seconds: f32, width: u32, height: u32) {
        let gpu = &self.gpu;
        gpu.use_program(Some(&self.program));
        gpu.bind_vertex_array(Some(&self.vao));
        gpu.clear_color_buffer();
        gpu.uniform1f(self.i_time.as_ref(), elapsed_seconds);
        gpu.uniform2f(self.i_resolution.as_ref(), width as f32, height as f32);
        gpu.draw_triangles_u16(QUAD_INDICES.len() as i32);
        // The refresh scheduler drives this loop, so nothing else submits for us.
        gpu.flush();
    }

    pub fn set_viewport(&self, width: u32, height: u32) {
        self.gpu.viewport(0, 0, width as i32, height as i32);
    }
}

impl<G: Gpu> Drop for RenderPipeline<G> {
    fn drop(&mut self) {
        self.gpu.delete_program(&self.program);
    }
}
