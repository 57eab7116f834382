//! Test doubles: a GL implementation that records every emitted call into
//! a shared trace, and a platform context that does the same for window
//! system events. Buffer names are recycled like a real driver recycles
//! them, so stale-cache bugs surface in tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use jetx_backend_gl::gl::{ActiveVar, Gl};
use jetx_backend_gl::window::{CreationError, PlatformContext, Resolution, SurfaceContext};
use jetx_backend_gl::Device;
use raw_window_handle::{RawWindowHandle, WebWindowHandle};

#[derive(Clone, Default)]
pub struct Trace(Rc<RefCell<Vec<String>>>);

impl Trace {
    pub fn push(&self, entry: String) {
        self.0.borrow_mut().push(entry);
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.count(prefix) > 0
    }

    /// Entries matching the prefix, in emission order.
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }
}

/// Reflection data the fake reports for every linked program.
#[derive(Clone, Default)]
pub struct ProgramDef {
    pub attributes: Vec<ActiveVar>,
    pub uniforms: Vec<ActiveVar>,
}

pub fn var(name: &str, size: i32, ty: u32) -> ActiveVar {
    ActiveVar {
        name: name.to_string(),
        size,
        ty,
    }
}

pub struct FakeGl {
    pub trace: Trace,
    next_name: Cell<u32>,
    free_buffers: RefCell<Vec<u32>>,
    bound: RefCell<HashMap<u32, u32>>,
    store: RefCell<HashMap<u32, Box<[u8]>>>,
    def: Rc<RefCell<ProgramDef>>,
    pub compile_ok: Rc<Cell<bool>>,
    pub link_ok: Rc<Cell<bool>>,
}

impl FakeGl {
    pub fn new(trace: Trace, def: Rc<RefCell<ProgramDef>>) -> Self {
        FakeGl {
            trace,
            next_name: Cell::new(1),
            free_buffers: RefCell::new(Vec::new()),
            bound: RefCell::new(HashMap::new()),
            store: RefCell::new(HashMap::new()),
            def,
            compile_ok: Rc::new(Cell::new(true)),
            link_ok: Rc::new(Cell::new(true)),
        }
    }

    fn fresh_name(&self) -> u32 {
        let name = self.next_name.get();
        self.next_name.set(name + 1);
        name
    }

    fn bound_buffer(&self, target: u32) -> u32 {
        self.bound.borrow().get(&target).copied().unwrap_or(0)
    }
}

impl Gl for FakeGl {
    fn get_error(&self) -> u32 {
        glow::NO_ERROR
    }

    fn get_integer(&self, parameter: u32) -> i32 {
        match parameter {
            glow::MAX_DRAW_BUFFERS => 8,
            glow::MAX_COMBINED_TEXTURE_IMAGE_UNITS => 16,
            glow::MAX_VERTEX_ATTRIBS => 16,
            glow::MAX_ELEMENTS_VERTICES | glow::MAX_ELEMENTS_INDICES => 1 << 20,
            _ => 0,
        }
    }

    fn get_string(&self, parameter: u32) -> String {
        match parameter {
            glow::VERSION => "4.5.0 Fake".to_string(),
            glow::SHADING_LANGUAGE_VERSION => "4.50 Fake".to_string(),
            glow::VENDOR => "Fake Vendor".to_string(),
            glow::RENDERER => "Fake Renderer".to_string(),
            _ => String::new(),
        }
    }

    fn enable(&self, cap: u32) {
        self.trace.push(format!("enable {}", cap));
    }

    fn disable(&self, cap: u32) {
        self.trace.push(format!("disable {}", cap));
    }

    fn enable_indexed(&self, cap: u32, index: u32) {
        self.trace.push(format!("enable_i {} {}", cap, index));
    }

    fn disable_indexed(&self, cap: u32, index: u32) {
        self.trace.push(format!("disable_i {} {}", cap, index));
    }

    fn polygon_mode(&self, mode: u32) {
        self.trace.push(format!("polygon_mode {}", mode));
    }

    fn cull_face(&self, mode: u32) {
        self.trace.push(format!("cull_face {}", mode));
    }

    fn front_face(&self, mode: u32) {
        self.trace.push(format!("front_face {}", mode));
    }

    fn polygon_offset(&self, factor: f32, units: f32) {
        self.trace.push(format!("polygon_offset {} {}", factor, units));
    }

    fn depth_func(&self, func: u32) {
        self.trace.push(format!("depth_func {}", func));
    }

    fn depth_mask(&self, flag: bool) {
        self.trace.push(format!("depth_mask {}", flag));
    }

    fn stencil_func_separate(&self, face: u32, func: u32, reference: i32, mask: u32) {
        self.trace
            .push(format!("stencil_func {} {} {} {}", face, func, reference, mask));
    }

    fn stencil_op_separate(&self, face: u32, fail: u32, depth_fail: u32, pass: u32) {
        self.trace
            .push(format!("stencil_op {} {} {} {}", face, fail, depth_fail, pass));
    }

    fn stencil_mask(&self, mask: u32) {
        self.trace.push(format!("stencil_mask {}", mask));
    }

    fn blend_equation_separate_target(&self, target: u32, color: u32, alpha: u32) {
        self.trace
            .push(format!("blend_eq {} {} {}", target, color, alpha));
    }

    fn blend_func_separate_target(&self, target: u32, src: u32, dst: u32, src_alpha: u32, dst_alpha: u32) {
        self.trace.push(format!(
            "blend_func {} {} {} {} {}",
            target, src, dst, src_alpha, dst_alpha
        ));
    }

    fn color_mask_target(&self, target: u32, r: bool, g: bool, b: bool, a: bool) {
        self.trace
            .push(format!("color_mask_i {} {} {} {} {}", target, r, g, b, a));
    }

    fn color_mask(&self, r: bool, g: bool, b: bool, a: bool) {
        self.trace.push(format!("color_mask {} {} {} {}", r, g, b, a));
    }

    fn blend_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.trace.push(format!("blend_color {} {} {} {}", r, g, b, a));
    }

    fn viewport(&self, x: i32, y: i32, w: i32, h: i32) {
        self.trace.push(format!("viewport {} {} {} {}", x, y, w, h));
    }

    fn depth_range(&self, near: f32, far: f32) {
        self.trace.push(format!("depth_range {} {}", near, far));
    }

    fn scissor(&self, x: i32, y: i32, w: i32, h: i32) {
        self.trace.push(format!("scissor {} {} {} {}", x, y, w, h));
    }

    fn clear_color_target(&self, target: u32, color: [f32; 4]) {
        self.trace.push(format!(
            "clear_color {} {} {} {} {}",
            target, color[0], color[1], color[2], color[3]
        ));
    }

    fn clear_depth(&self, depth: f32) {
        self.trace.push(format!("clear_depth {}", depth));
    }

    fn clear_stencil(&self, stencil: i32) {
        self.trace.push(format!("clear_stencil {}", stencil));
    }

    fn gen_buffer(&self) -> u32 {
        let name = self
            .free_buffers
            .borrow_mut()
            .pop()
            .unwrap_or_else(|| self.fresh_name());
        self.trace.push(format!("gen_buffer {}", name));
        name
    }

    fn delete_buffer(&self, buffer: u32) {
        self.trace.push(format!("delete_buffer {}", buffer));
        self.store.borrow_mut().remove(&buffer);
        self.free_buffers.borrow_mut().push(buffer);
    }

    fn bind_buffer(&self, target: u32, buffer: u32) {
        self.trace.push(format!("bind_buffer {} {}", target, buffer));
        self.bound.borrow_mut().insert(target, buffer);
    }

    fn buffer_data(&self, target: u32, size: usize, data: Option<&[u8]>, usage: u32) {
        self.trace
            .push(format!("buffer_data {} {} {}", target, size, usage));
        let name = self.bound_buffer(target);
        let contents = match data {
            Some(bytes) => bytes.to_vec().into_boxed_slice(),
            None => vec![0; size].into_boxed_slice(),
        };
        self.store.borrow_mut().insert(name, contents);
    }

    fn buffer_sub_data(&self, target: u32, offset: usize, data: &[u8]) {
        self.trace
            .push(format!("buffer_sub_data {} {} {}", target, offset, data.len()));
        let name = self.bound_buffer(target);
        if let Some(contents) = self.store.borrow_mut().get_mut(&name) {
            contents[offset..offset + data.len()].copy_from_slice(data);
        }
    }

    fn map_buffer_range(&self, target: u32, offset: usize, length: usize, _access: u32) -> *mut u8 {
        self.trace
            .push(format!("map_buffer {} {} {}", target, offset, length));
        let name = self.bound_buffer(target);
        match self.store.borrow_mut().get_mut(&name) {
            // box contents have a stable address while stored
            Some(contents) if offset + length <= contents.len() => unsafe {
                contents.as_mut_ptr().add(offset)
            },
            _ => std::ptr::null_mut(),
        }
    }

    fn unmap_buffer(&self, target: u32) {
        self.trace.push(format!("unmap_buffer {}", target));
    }

    fn gen_vertex_array(&self) -> u32 {
        let name = self.fresh_name();
        self.trace.push(format!("gen_vao {}", name));
        name
    }

    fn delete_vertex_array(&self, array: u32) {
        self.trace.push(format!("delete_vao {}", array));
    }

    fn bind_vertex_array(&self, array: u32) {
        self.trace.push(format!("bind_vao {}", array));
    }

    fn vertex_attrib_pointer(&self, index: u32, size: i32, ty: u32, normalized: bool, stride: i32, offset: i32) {
        self.trace.push(format!(
            "attrib_pointer {} {} {} {} {} {}",
            index, size, ty, normalized, stride, offset
        ));
    }

    fn vertex_attrib_int_pointer(&self, index: u32, size: i32, ty: u32, stride: i32, offset: i32) {
        self.trace.push(format!(
            "attrib_int_pointer {} {} {} {} {}",
            index, size, ty, stride, offset
        ));
    }

    fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
        self.trace.push(format!("divisor {} {}", index, divisor));
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.trace.push(format!("enable_attrib {}", index));
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        self.trace.push(format!("disable_attrib {}", index));
    }

    fn gen_sampler(&self) -> u32 {
        let name = self.fresh_name();
        self.trace.push(format!("gen_sampler {}", name));
        name
    }

    fn delete_sampler(&self, sampler: u32) {
        self.trace.push(format!("delete_sampler {}", sampler));
    }

    fn bind_sampler(&self, unit: u32, sampler: u32) {
        self.trace.push(format!("bind_sampler {} {}", unit, sampler));
    }

    fn sampler_parameter_int(&self, sampler: u32, parameter: u32, value: i32) {
        self.trace
            .push(format!("sampler_i {} {} {}", sampler, parameter, value));
    }

    fn sampler_parameter_float(&self, sampler: u32, parameter: u32, value: f32) {
        self.trace
            .push(format!("sampler_f {} {} {}", sampler, parameter, value));
    }

    fn sampler_parameter_float4(&self, sampler: u32, parameter: u32, values: [f32; 4]) {
        self.trace
            .push(format!("sampler_fv {} {} {:?}", sampler, parameter, values));
    }

    fn create_shader(&self, ty: u32) -> u32 {
        let name = self.fresh_name();
        self.trace.push(format!("create_shader {} {}", ty, name));
        name
    }

    fn delete_shader(&self, shader: u32) {
        self.trace.push(format!("delete_shader {}", shader));
    }

    fn shader_source(&self, shader: u32, source: &str) {
        self.trace
            .push(format!("shader_source {} {}", shader, source.len()));
    }

    fn compile_shader(&self, shader: u32) {
        self.trace.push(format!("compile_shader {}", shader));
    }

    fn get_shader_compile_status(&self, _shader: u32) -> bool {
        self.compile_ok.get()
    }

    fn get_shader_info_log(&self, _shader: u32) -> String {
        if self.compile_ok.get() {
            String::new()
        } else {
            "fake compile error".to_string()
        }
    }

    fn create_program(&self) -> u32 {
        let name = self.fresh_name();
        self.trace.push(format!("create_program {}", name));
        name
    }

    fn delete_program(&self, program: u32) {
        self.trace.push(format!("delete_program {}", program));
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        self.trace.push(format!("attach {} {}", program, shader));
    }

    fn link_program(&self, program: u32) {
        self.trace.push(format!("link {}", program));
    }

    fn get_program_link_status(&self, _program: u32) -> bool {
        self.link_ok.get()
    }

    fn get_program_info_log(&self, _program: u32) -> String {
        if self.link_ok.get() {
            String::new()
        } else {
            "fake link error".to_string()
        }
    }

    fn use_program(&self, program: u32) {
        self.trace.push(format!("use_program {}", program));
    }

    fn get_active_attribute_count(&self, _program: u32) -> u32 {
        self.def.borrow().attributes.len() as u32
    }

    fn get_active_attribute(&self, _program: u32, index: u32) -> Option<ActiveVar> {
        self.def.borrow().attributes.get(index as usize).cloned()
    }

    fn get_attrib_location(&self, _program: u32, name: &str) -> i32 {
        self.def
            .borrow()
            .attributes
            .iter()
            .position(|a| a.name == name)
            .map(|i| i as i32)
            .unwrap_or(-1)
    }

    fn get_active_uniform_count(&self, _program: u32) -> u32 {
        self.def.borrow().uniforms.len() as u32
    }

    fn get_active_uniform(&self, _program: u32, index: u32) -> Option<ActiveVar> {
        self.def.borrow().uniforms.get(index as usize).cloned()
    }

    fn get_uniform_location(&self, _program: u32, name: &str) -> i32 {
        self.def
            .borrow()
            .uniforms
            .iter()
            .position(|u| u.name == name)
            .map(|i| i as i32)
            .unwrap_or(-1)
    }

    fn uniform_f32(&self, location: i32, components: u8, values: &[f32]) {
        self.trace.push(format!(
            "uniform_f {} {} {}",
            location,
            components,
            values.len()
        ));
    }

    fn uniform_i32(&self, location: i32, components: u8, values: &[i32]) {
        self.trace.push(format!(
            "uniform_i {} {} {}",
            location,
            components,
            values.len()
        ));
    }

    fn uniform_matrix_f32(&self, location: i32, dimension: u8, values: &[f32]) {
        self.trace.push(format!(
            "uniform_matrix {} {} {}",
            location,
            dimension,
            values.len()
        ));
    }

    fn draw_arrays_instanced(&self, mode: u32, first: i32, count: i32, instances: i32) {
        self.trace.push(format!(
            "draw_arrays {} {} {} {}",
            mode, first, count, instances
        ));
    }

    fn draw_elements_instanced(&self, mode: u32, count: i32, ty: u32, offset: i32, instances: i32) {
        self.trace.push(format!(
            "draw_elements {} {} {} {} {}",
            mode, count, ty, offset, instances
        ));
    }

    fn flush(&self) {
        self.trace.push("flush".to_string());
    }
}

pub struct FakeSurface {
    trace: Trace,
    id: usize,
}

impl SurfaceContext for FakeSurface {
    fn make_current(&self) {
        self.trace.push(format!("make_current {}", self.id));
    }

    fn swap_buffers(&self, vsync: bool) {
        self.trace.push(format!("swap {} {}", self.id, vsync));
    }

    fn resize(&self, width: u32, height: u32, fullscreen: bool, was_fullscreen: bool) {
        self.trace.push(format!(
            "resize {} {} {} {} {}",
            self.id, width, height, fullscreen, was_fullscreen
        ));
    }
}

impl Drop for FakeSurface {
    fn drop(&mut self) {
        self.trace.push(format!("surface_released {}", self.id));
    }
}

pub struct FakePlatform {
    pub trace: Trace,
    next_id: Cell<usize>,
    pub modes: Vec<Resolution>,
}

impl FakePlatform {
    pub fn new(trace: Trace) -> Self {
        FakePlatform {
            trace,
            next_id: Cell::new(1),
            modes: vec![
                Resolution { width: 1920, height: 1080, refresh_rate: 60 },
                Resolution { width: 1280, height: 720, refresh_rate: 60 },
                Resolution { width: 1280, height: 720, refresh_rate: 120 },
                Resolution { width: 640, height: 480, refresh_rate: 60 },
            ],
        }
    }
}

impl PlatformContext for FakePlatform {
    fn create_surface(&self, _window: RawWindowHandle) -> Result<Box<dyn SurfaceContext>, CreationError> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.trace.push(format!("create_surface {}", id));
        Ok(Box::new(FakeSurface {
            trace: self.trace.clone(),
            id,
        }))
    }

    fn restore_desktop_display_mode(&self) {
        self.trace.push("restore_desktop".to_string());
    }

    fn supported_resolution(&self, width: u32, height: u32) -> (u32, u32) {
        self.modes
            .iter()
            .filter(|m| m.width >= width && m.height >= height)
            .map(|m| (m.width, m.height))
            .min()
            .unwrap_or((1920, 1080))
    }

    fn available_resolutions(&self, ignore_refresh_rate: bool) -> Vec<Resolution> {
        let mut modes = self.modes.clone();
        if ignore_refresh_rate {
            for mode in modes.iter_mut() {
                mode.refresh_rate = 0;
            }
        }
        modes
    }
}

/// A device over the fakes, with the GL trace, the platform trace, and the
/// program reflection definition exposed. The GL trace starts cleared, so
/// device init calls do not leak into assertions.
pub struct TestBed {
    pub device: Device,
    pub gl: Trace,
    pub platform: Trace,
    pub programs: Rc<RefCell<ProgramDef>>,
    pub compile_ok: Rc<Cell<bool>>,
    pub link_ok: Rc<Cell<bool>>,
}

pub fn test_bed() -> TestBed {
    test_bed_with(ProgramDef::default())
}

pub fn test_bed_with(def: ProgramDef) -> TestBed {
    let _ = env_logger::builder().is_test(true).try_init();
    let gl = Trace::default();
    let platform = Trace::default();
    let programs = Rc::new(RefCell::new(def));
    let fake = FakeGl::new(gl.clone(), programs.clone());
    let compile_ok = fake.compile_ok.clone();
    let link_ok = fake.link_ok.clone();
    let device = Device::new(
        Box::new(fake),
        Box::new(FakePlatform::new(platform.clone())),
    );
    gl.clear();
    TestBed {
        device,
        gl,
        platform,
        programs,
        compile_ok,
        link_ok,
    }
}

pub fn window_handle() -> RawWindowHandle {
    RawWindowHandle::Web(WebWindowHandle::new(1))
}
