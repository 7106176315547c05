//! The slice of a WebGL2-class context that the two pipelines depend on.
//!
//! Both pipelines talk to the GPU exclusively through [`Gpu`]. In the browser
//! it is implemented for `WebGl2RenderingContext` (see `wasm/context.rs`); host tests
//! use a recording double instead. Handles are opaque associated types, and
//! every method mirrors one GL entry point so that call order stays visible at
//! the call site.

use std::fmt;

/// Programmable stage a shader object is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

/// Generic buffer binding points used by the pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

pub trait Gpu {
    type Shader;
    type Program;
    type Buffer;
    type VertexArray;
    type UniformLocation;

    // Shader and program objects.
    fn create_shader(&self, stage: ShaderStage) -> Option<Self::Shader>;
    fn shader_source(&self, shader: &Self::Shader, source: &str);
    fn compile_shader(&self, shader: &Self::Shader);
    fn shader_compiled(&self, shader: &Self::Shader) -> bool;
    fn shader_info_log(&self, shader: &Self::Shader) -> Option<String>;
    fn delete_shader(&self, shader: &Self::Shader);

    fn create_program(&self) -> Option<Self::Program>;
    fn attach_shader(&self, program: &Self::Program, shader: &Self::Shader);
    /// Declares vertex outputs captured in separate buffer slots, in order.
    fn transform_feedback_varyings(&self, program: &Self::Program, names: &[&str]);
    fn link_program(&self, program: &Self::Program);
    fn program_linked(&self, program: &Self::Program) -> bool;
    fn program_info_log(&self, program: &Self::Program) -> Option<String>;
    fn delete_program(&self, program: &Self::Program);
    fn use_program(&self, program: Option<&Self::Program>);

    fn uniform_location(&self, program: &Self::Program, name: &str)
        -> Option<Self::UniformLocation>;
    fn attrib_location(&self, program: &Self::Program, name: &str) -> Option<u32>;
    fn uniform1f(&self, location: Option<&Self::UniformLocation>, x: f32);
    fn uniform2f(&self, location: Option<&Self::UniformLocation>, x: f32, y: f32);

    // Buffers and vertex state.
    fn create_buffer(&self) -> Option<Self::Buffer>;
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<&Self::Buffer>);
    fn buffer_data_f32(&self, target: BufferTarget, data: &[f32]);
    fn buffer_data_u16(&self, target: BufferTarget, data: &[u16]);
    /// Allocates `len` zeroed floats for the buffer bound at `target`.
    fn allocate_f32(&self, target: BufferTarget, len: usize);
    /// Copies the buffer bound at `target` into `out`, blocking until the GPU
    /// has finished writing it.
    fn read_buffer_f32(&self, target: BufferTarget, out: &mut [f32]);

    fn create_vertex_array(&self) -> Option<Self::VertexArray>;
    fn bind_vertex_array(&self, vao: Option<&Self::VertexArray>);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn vertex_attrib_pointer_f32(&self, index: u32, components: i32);

    // Rasterisation.
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear_color_buffer(&self);
    fn draw_triangles_u16(&self, count: i32);
    fn flush(&self);

    // Transform feedback.
    /// Binds `buffer` to capture slot 0, or clears the slot with `None`.
    fn bind_feedback_buffer(&self, buffer: Option<&Self::Buffer>);
    fn set_rasterizer_discard(&self, enabled: bool);
    fn begin_feedback_points(&self);
    fn end_feedback(&self);
    fn draw_points(&self, count: i32);
}

/// A drawable surface whose backing store can be resized.
pub trait Surface {
    fn size(&self) -> (u32, u32);
    fn set_size(&self, width: u32, height: u32);
}
