use js_sys::{Array, Float32Array, Uint16Array};
use wasm_bindgen::JsValue;
use web_sys::{
    HtmlCanvasElement, WebGl2RenderingContext as GL, WebGlBuffer, WebGlProgram, WebGlShader,
    WebGlUniformLocation, WebGlVertexArrayObject,
};

use crate::gpu::{BufferTarget, Gpu, ShaderStage, Surface};

fn target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Array => GL::ARRAY_BUFFER,
        BufferTarget::ElementArray => GL::ELEMENT_ARRAY_BUFFER,
    }
}

impl Gpu for GL {
    type Shader = WebGlShader;
    type Program = WebGlProgram;
    type Buffer = WebGlBuffer;
    type VertexArray = WebGlVertexArrayObject;
    type UniformLocation = WebGlUniformLocation;

    fn create_shader(&self, stage: ShaderStage) -> Option<WebGlShader> {
        let kind = match stage {
            ShaderStage::Vertex => GL::VERTEX_SHADER,
            ShaderStage::Fragment => GL::FRAGMENT_SHADER,
        };
        GL::create_shader(self, kind)
    }

    fn shader_source(&self, shader: &WebGlShader, source: &str) {
        GL::shader_source(self, shader, source);
    }

    fn compile_shader(&self, shader: &WebGlShader) {
        GL::compile_shader(self, shader);
    }

    fn shader_compiled(&self, shader: &WebGlShader) -> bool {
        self.get_shader_parameter(shader, GL::COMPILE_STATUS)
            .as_bool()
            .unwrap_or(false)
    }

    fn shader_info_log(&self, shader: &WebGlShader) -> Option<String> {
        self.get_shader_info_log(shader)
    }

    fn delete_shader(&self, shader: &WebGlShader) {
        GL::delete_shader(self, Some(shader));
    }

    fn create_program(&self) -> Option<WebGlProgram> {
        GL::create_program(self)
    }

    fn attach_shader(&self, program: &WebGlProgram, shader: &WebGlShader) {
        GL::attach_shader(self, program, shader);
    }

    fn transform_feedback_varyings(&self, program: &WebGlProgram, names: &[&str]) {
        let varyings: Array = names.iter().map(|name| JsValue::from_str(name)).collect();
        GL::transform_feedback_varyings(self, program, &varyings, GL::SEPARATE_ATTRIBS);
    }

    fn link_program(&self, program: &WebGlProgram) {
        GL::link_program(self, program);
    }

    fn program_linked(&self, program: &WebGlProgram) -> bool {
        self.get_program_parameter(program, GL::LINK_STATUS)
            .as_bool()
            .unwrap_or(false)
    }

    fn program_info_log(&self, program: &WebGlProgram) -> Option<String> {
        self.get_program_info_log(program)
    }

    fn delete_program(&self, program: &WebGlProgram) {
        GL::delete_program(self, Some(program));
    }

    fn use_program(&self, program: Option<&WebGlProgram>) {
        GL::use_program(self, program);
    }

    fn uniform_location(&self, program: &WebGlProgram, name: &str) -> Option<WebGlUniformLocation> {
        self.get_uniform_location(program, name)
    }

    fn attrib_location(&self, program: &WebGlProgram, name: &str) -> Option<u32> {
        u32::try_from(self.get_attrib_location(program, name)).ok()
    }

    fn uniform1f(&self, location: Option<&WebGlUniformLocation>, x: f32) {
        GL::uniform1f(self, location, x);
    }

    fn uniform2f(&self, location: Option<&WebGlUniformLocation>, x: f32, y: f32) {
        GL::uniform2f(self, location, x, y);
    }

    fn create_buffer(&self) -> Option<WebGlBuffer> {
        GL::create_buffer(self)
    }

    fn bind_buffer(&self, kind: BufferTarget, buffer: Option<&WebGlBuffer>) {
        GL::bind_buffer(self, target(kind), buffer);
    }

    fn buffer_data_f32(&self, kind: BufferTarget, data: &[f32]) {
        let array = Float32Array::from(data);
        self.buffer_data_with_array_buffer_view(target(kind), &array, GL::STATIC_DRAW);
    }

    fn buffer_data_u16(&self, kind: BufferTarget, data: &[u16]) {
        let array = Uint16Array::from(data);
        self.buffer_data_with_array_buffer_view(target(kind), &array, GL::STATIC_DRAW);
    }

    fn allocate_f32(&self, kind: BufferTarget, len: usize) {
        let bytes = (len * std::mem::size_of::<f32>()) as i32;
        self.buffer_data_with_i32(target(kind), bytes, GL::DYNAMIC_READ);
    }

    fn read_buffer_f32(&self, kind: BufferTarget, out: &mut [f32]) {
        let view = Float32Array::new_with_length(out.len() as u32);
        self.get_buffer_sub_data_with_i32_and_array_buffer_view(target(kind), 0, &view);
        view.copy_to(out);
    }

    fn create_vertex_array(&self) -> Option<WebGlVertexArrayObject> {
        GL::create_vertex_array(self)
    }

    fn bind_vertex_array(&self, vao: Option<&WebGlVertexArrayObject>) {
        GL::bind_vertex_array(self, vao);
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        GL::enable_vertex_attrib_array(self, index);
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, components: i32) {
        self.vertex_attrib_pointer_with_i32(index, components, GL::FLOAT, false, 0, 0);
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        GL::viewport(self, x, y, width, height);
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        GL::clear_color(self, r, g, b, a);
    }

    fn clear_color_buffer(&self) {
        self.clear(GL::COLOR_BUFFER_BIT);
    }

    fn draw_triangles_u16(&self, count: i32) {
        self.draw_elements_with_i32(GL::TRIANGLES, count, GL::UNSIGNED_SHORT, 0);
    }

    fn flush(&self) {
        GL::flush(self);
    }

    fn bind_feedback_buffer(&self, buffer: Option<&WebGlBuffer>) {
        self.bind_buffer_base(GL::TRANSFORM_FEEDBACK_BUFFER, 0, buffer);
    }

    fn set_rasterizer_discard(&self, enabled: bool) {
        if enabled {
            self.enable(GL::RASTERIZER_DISCARD);
        } else {
            self.disable(GL::RASTERIZER_DISCARD);
        }
    }

    fn begin_feedback_points(&self) {
        self.begin_transform_feedback(GL::POINTS);
    }

    fn end_feedback(&self) {
        self.end_transform_feedback();
    }

    fn draw_points(&self, count: i32) {
        self.draw_arrays(GL::POINTS, 0, count);
    }
}

impl Surface for HtmlCanvasElement {
    fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn set_size(&self, width: u32, height: u32) {
        self.set_width(width);
        self.set_height(height);
    }
}
