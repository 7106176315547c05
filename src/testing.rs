//! Recording GPU double for host tests.
//!
//! Emulates just enough of a WebGL2 context to exercise the pipelines: shader
//! compile status (a source containing `#error` fails), link status (every
//! feedback output must be declared `out` in the vertex stage), per-program
//! uniform storage, buffer storage, and transform-feedback capture. Captured
//! draws evaluate the sound wrapper's time formula and feed it through a Rust
//! closure standing in for `mainSound`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::gpu::{BufferTarget, Gpu, ShaderStage, Surface};

pub(crate) const VERTEX: &str = "#version 300 es
in vec3 position;
void main() { gl_Position = vec4(position, 1.0); }
";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    UseProgram(Option<u32>),
    BindVertexArray(Option<u32>),
    BindBuffer(BufferTarget, Option<u32>),
    BindFeedback(Option<u32>),
    UniformLocation(String),
    Uniform(String, Vec<f32>),
    Viewport(i32, i32, i32, i32),
    ClearColor([f32; 4]),
    Clear,
    DrawTriangles(i32),
    RasterizerDiscard(bool),
    BeginFeedback,
    EndFeedback,
    DrawPoints(i32),
    ReadBuffer(u32),
    Flush,
}

struct Shader {
    stage: ShaderStage,
    source: String,
    compiled: bool,
}

#[derive(Default)]
struct Program {
    attached: Vec<u32>,
    vertex_source: String,
    all_sources: String,
    varyings: Vec<String>,
    linked: bool,
    log: String,
}

enum BufferData {
    Floats(Vec<f32>),
    Indices(Vec<u16>),
}

#[derive(Default)]
struct State {
    next_id: u32,
    shaders: HashMap<u32, Shader>,
    programs: HashMap<u32, Program>,
    buffers: HashMap<u32, BufferData>,
    bindings: HashMap<BufferTarget, u32>,
    feedback: Option<u32>,
    current: Option<u32>,
    vao: Option<u32>,
    capturing: bool,
    uniforms: HashMap<(u32, String), Vec<f32>>,
    calls: Vec<Call>,
}

impl State {
    fn id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn bound(&self, target: BufferTarget) -> u32 {
        *self
            .bindings
            .get(&target)
            .unwrap_or_else(|| panic!("no buffer bound at {target:?}"))
    }

    fn set_uniform(&mut self, location: Option<&(u32, String)>, values: Vec<f32>) {
        let Some((program, name)) = location else {
            return;
        };
        assert_eq!(
            self.current,
            Some(*program),
            "uniform `{name}` set while its program is not bound"
        );
        self.calls.push(Call::Uniform(name.clone(), values.clone()));
        self.uniforms.insert((*program, name.clone()), values);
    }

    fn uniform_or(&self, program: u32, name: &str, default: f32) -> f32 {
        self.uniforms
            .get(&(program, name.to_string()))
            .map(|v| v[0])
            .unwrap_or(default)
    }
}

type SoundFn = dyn Fn(f32) -> [f32; 2];

#[derive(Clone)]
pub(crate) struct MockGpu {
    state: Rc<RefCell<State>>,
    sound: Rc<SoundFn>,
}

impl MockGpu {
    /// A context whose `mainSound(t)` returns `(t, -t)`.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(State::default())),
            sound: Rc::new(|t: f32| [t, -t]),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    /// Last value uploaded to `name` on any program, from the call log.
    pub fn last_uniform(&self, name: &str) -> Option<Vec<f32>> {
        self.state.borrow().calls.iter().rev().find_map(|call| match call {
            Call::Uniform(n, v) if n == name => Some(v.clone()),
            _ => None,
        })
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| pred(c)).count()
    }
}

fn declares(source: &str, qualifier: &str, name: &str) -> bool {
    source.lines().any(|line| {
        let line = line.trim();
        line.starts_with(qualifier)
            && line
                .trim_end_matches(';')
                .split_whitespace()
                .last()
                .is_some_and(|last| last == name)
    })
}

impl Gpu for MockGpu {
    type Shader = u32;
    type Program = u32;
    type Buffer = u32;
    type VertexArray = u32;
    type UniformLocation = (u32, String);

    fn create_shader(&self, stage: ShaderStage) -> Option<u32> {
        let mut state = self.state.borrow_mut();
        let id = state.id();
        state.shaders.insert(
            id,
            Shader {
                stage,
                source: String::new(),
                compiled: false,
            },
        );
        Some(id)
    }

    fn shader_source(&self, shader: &u32, source: &str) {
        if let Some(s) = self.state.borrow_mut().shaders.get_mut(shader) {
            s.source = source.to_string();
        }
    }

    fn compile_shader(&self, shader: &u32) {
        if let Some(s) = self.state.borrow_mut().shaders.get_mut(shader) {
            s.compiled = !s.source.contains("#error");
        }
    }

    fn shader_compiled(&self, shader: &u32) -> bool {
        self.state.borrow().shaders.get(shader).is_some_and(|s| s.compiled)
    }

    fn shader_info_log(&self, shader: &u32) -> Option<String> {
        let state = self.state.borrow();
        let s = state.shaders.get(shader)?;
        (!s.compiled).then(|| "ERROR: 0:1: '#error' : user-defined error".to_string())
    }

    fn delete_shader(&self, shader: &u32) {
        self.state.borrow_mut().shaders.remove(shader);
    }

    fn create_program(&self) -> Option<u32> {
        let mut state = self.state.borrow_mut();
        let id = state.id();
        state.programs.insert(id, Program::default());
        Some(id)
    }

    fn attach_shader(&self, program: &u32, shader: &u32) {
        if let Some(p) = self.state.borrow_mut().programs.get_mut(program) {
            p.attached.push(*shader);
        }
    }

    fn transform_feedback_varyings(&self, program: &u32, names: &[&str]) {
        if let Some(p) = self.state.borrow_mut().programs.get_mut(program) {
            p.varyings = names.iter().map(|n| n.to_string()).collect();
        }
    }

    fn link_program(&self, program: &u32) {
        let mut state = self.state.borrow_mut();
        let mut vertex_source = String::new();
        let mut all_sources = String::new();
        let mut all_compiled = true;
        let attached = state.programs[program].attached.clone();
        for id in &attached {
            match state.shaders.get(id) {
                Some(shader) => {
                    all_compiled &= shader.compiled;
                    if shader.stage == ShaderStage::Vertex {
                        vertex_source.push_str(&shader.source);
                    }
                    all_sources.push_str(&shader.source);
                }
                None => all_compiled = false,
            }
        }

        let p = state.programs.get_mut(program).expect("unknown program");
        let missing = p
            .varyings
            .iter()
            .find(|name| !declares(&vertex_source, "out ", name))
            .cloned();
        p.linked = all_compiled && missing.is_none();
        p.log = match missing {
            Some(name) => format!("Transform feedback varying {name} not found"),
            None if !all_compiled => "attached shader is not compiled".to_string(),
            None => String::new(),
        };
        p.vertex_source = vertex_source;
        p.all_sources = all_sources;
    }

    fn program_linked(&self, program: &u32) -> bool {
        self.state.borrow().programs.get(program).is_some_and(|p| p.linked)
    }

    fn program_info_log(&self, program: &u32) -> Option<String> {
        self.state.borrow().programs.get(program).map(|p| p.log.clone())
    }

    fn delete_program(&self, program: &u32) {
        self.state.borrow_mut().programs.remove(program);
    }

    fn use_program(&self, program: Option<&u32>) {
        let mut state = self.state.borrow_mut();
        state.current = program.copied();
        state.calls.push(Call::UseProgram(program.copied()));
    }

    fn uniform_location(&self, program: &u32, name: &str) -> Option<(u32, String)> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::UniformLocation(name.to_string()));
        let p = state.programs.get(program)?;
        declares(&p.all_sources, "uniform ", name).then(|| (*program, name.to_string()))
    }

    fn attrib_location(&self, program: &u32, name: &str) -> Option<u32> {
        let state = self.state.borrow();
        let p = state.programs.get(program)?;
        declares(&p.vertex_source, "in ", name).then_some(0)
    }

    fn uniform1f(&self, location: Option<&(u32, String)>, x: f32) {
        self.state.borrow_mut().set_uniform(location, vec![x]);
    }

    fn uniform2f(&self, location: Option<&(u32, String)>, x: f32, y: f32) {
        self.state.borrow_mut().set_uniform(location, vec![x, y]);
    }

    fn create_buffer(&self) -> Option<u32> {
        let mut state = self.state.borrow_mut();
        let id = state.id();
        state.buffers.insert(id, BufferData::Floats(Vec::new()));
        Some(id)
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<&u32>) {
        let mut state = self.state.borrow_mut();
        match buffer {
            Some(id) => state.bindings.insert(target, *id),
            None => state.bindings.remove(&target),
        };
        state.calls.push(Call::BindBuffer(target, buffer.copied()));
    }

    fn buffer_data_f32(&self, target: BufferTarget, data: &[f32]) {
        let mut state = self.state.borrow_mut();
        let id = state.bound(target);
        state.buffers.insert(id, BufferData::Floats(data.to_vec()));
    }

    fn buffer_data_u16(&self, target: BufferTarget, data: &[u16]) {
        let mut state = self.state.borrow_mut();
        let id = state.bound(target);
        state.buffers.insert(id, BufferData::Indices(data.to_vec()));
    }

    fn allocate_f32(&self, target: BufferTarget, len: usize) {
        self.buffer_data_f32(target, &vec![0.0; len]);
    }

    fn read_buffer_f32(&self, target: BufferTarget, out: &mut [f32]) {
        let mut state = self.state.borrow_mut();
        let id = state.bound(target);
        assert_ne!(
            state.feedback,
            Some(id),
            "buffer {id} is still bound for transform feedback"
        );
        match &state.buffers[&id] {
            BufferData::Floats(data) => out.copy_from_slice(&data[..out.len()]),
            BufferData::Indices(indices) => {
                panic!("read back an index buffer of {} entries", indices.len())
            }
        }
        state.calls.push(Call::ReadBuffer(id));
    }

    fn create_vertex_array(&self) -> Option<u32> {
        Some(self.state.borrow_mut().id())
    }

    fn bind_vertex_array(&self, vao: Option<&u32>) {
        let mut state = self.state.borrow_mut();
        state.vao = vao.copied();
        state.calls.push(Call::BindVertexArray(vao.copied()));
    }

    fn enable_vertex_attrib_array(&self, _index: u32) {}

    fn vertex_attrib_pointer_f32(&self, _index: u32, components: i32) {
        assert_eq!(components, 3);
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.state
            .borrow_mut()
            .calls
            .push(Call::Viewport(x, y, width, height));
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.state.borrow_mut().calls.push(Call::ClearColor([r, g, b, a]));
    }

    fn clear_color_buffer(&self) {
        self.state.borrow_mut().calls.push(Call::Clear);
    }

    fn draw_triangles_u16(&self, count: i32) {
        let mut state = self.state.borrow_mut();
        assert!(state.current.is_some(), "draw without a program");
        assert!(state.vao.is_some(), "draw without a vertex array");
        state.calls.push(Call::DrawTriangles(count));
    }

    fn flush(&self) {
        self.state.borrow_mut().calls.push(Call::Flush);
    }

    fn bind_feedback_buffer(&self, buffer: Option<&u32>) {
        let mut state = self.state.borrow_mut();
        state.feedback = buffer.copied();
        state.calls.push(Call::BindFeedback(buffer.copied()));
    }

    fn set_rasterizer_discard(&self, enabled: bool) {
        self.state
            .borrow_mut()
            .calls
            .push(Call::RasterizerDiscard(enabled));
    }

    fn begin_feedback_points(&self) {
        let mut state = self.state.borrow_mut();
        assert!(state.feedback.is_some(), "no capture buffer bound");
        state.capturing = true;
        state.calls.push(Call::BeginFeedback);
    }

    fn end_feedback(&self) {
        let mut state = self.state.borrow_mut();
        state.capturing = false;
        state.calls.push(Call::EndFeedback);
    }

    fn draw_points(&self, count: i32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::DrawPoints(count));
        if !state.capturing {
            return;
        }
        let program = state.current.expect("draw without a program");
        let target = state.feedback.expect("no capture buffer bound");
        let buffer_size = state.uniform_or(program, "bufferSize", 0.0);
        let sample_rate = state.uniform_or(program, "sampleRate", 1.0);
        let phase = state.uniform_or(program, "phase", 0.0);

        let mut captured = Vec::with_capacity(count as usize * 2);
        for vertex_id in 0..count {
            let time = (buffer_size * phase + vertex_id as f32) / sample_rate;
            captured.extend((self.sound)(time));
        }
        match state.buffers.get_mut(&target) {
            Some(BufferData::Floats(data)) => {
                assert!(data.len() >= captured.len(), "capture overflows buffer");
                data[..captured.len()].copy_from_slice(&captured);
            }
            _ => panic!("capture into a non-float buffer"),
        }
    }
}

#[derive(Clone, Default)]
pub(crate) struct MockSurface {
    size: Rc<Cell<(u32, u32)>>,
}

impl Surface for MockSurface {
    fn size(&self) -> (u32, u32) {
        self.size.get()
    }

    fn set_size(&self, width: u32, height: u32) {
        self.size.set((width, height));
    }
}
