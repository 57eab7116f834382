//! The downward GL interface. Everything the crate emits to the driver goes
//! through the [`Gl`] trait, with raw `u32` object names on the boundary
//! (zero meaning "no object", as in GL itself). The shipped implementation
//! wraps a `glow::Context`; tests substitute a recording implementation.

use std::num::NonZeroU32;

use glow::HasContext;

/// Reflection record for one active attribute or uniform.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ActiveVar {
    pub name: String,
    pub size: i32,
    pub ty: u32,
}

pub trait Gl {
    // queries
    fn get_error(&self) -> u32;
    fn get_integer(&self, parameter: u32) -> i32;
    fn get_string(&self, parameter: u32) -> String;

    // global toggles
    fn enable(&self, cap: u32);
    fn disable(&self, cap: u32);
    fn enable_indexed(&self, cap: u32, index: u32);
    fn disable_indexed(&self, cap: u32, index: u32);

    // rasterizer
    fn polygon_mode(&self, mode: u32);
    fn cull_face(&self, mode: u32);
    fn front_face(&self, mode: u32);
    fn polygon_offset(&self, factor: f32, units: f32);

    // depth-stencil
    fn depth_func(&self, func: u32);
    fn depth_mask(&self, flag: bool);
    fn stencil_func_separate(&self, face: u32, func: u32, reference: i32, mask: u32);
    fn stencil_op_separate(&self, face: u32, fail: u32, depth_fail: u32, pass: u32);
    fn stencil_mask(&self, mask: u32);

    // blend
    fn blend_equation_separate_target(&self, target: u32, color: u32, alpha: u32);
    fn blend_func_separate_target(&self, target: u32, src: u32, dst: u32, src_alpha: u32, dst_alpha: u32);
    fn color_mask_target(&self, target: u32, r: bool, g: bool, b: bool, a: bool);
    fn color_mask(&self, r: bool, g: bool, b: bool, a: bool);
    fn blend_color(&self, r: f32, g: f32, b: f32, a: f32);

    // viewport and clears
    fn viewport(&self, x: i32, y: i32, w: i32, h: i32);
    fn depth_range(&self, near: f32, far: f32);
    fn scissor(&self, x: i32, y: i32, w: i32, h: i32);
    fn clear_color_target(&self, target: u32, color: [f32; 4]);
    fn clear_depth(&self, depth: f32);
    fn clear_stencil(&self, stencil: i32);

    // buffers
    fn gen_buffer(&self) -> u32;
    fn delete_buffer(&self, buffer: u32);
    fn bind_buffer(&self, target: u32, buffer: u32);
    fn buffer_data(&self, target: u32, size: usize, data: Option<&[u8]>, usage: u32);
    fn buffer_sub_data(&self, target: u32, offset: usize, data: &[u8]);
    fn map_buffer_range(&self, target: u32, offset: usize, length: usize, access: u32) -> *mut u8;
    fn unmap_buffer(&self, target: u32);

    // vertex arrays and attributes
    fn gen_vertex_array(&self) -> u32;
    fn delete_vertex_array(&self, array: u32);
    fn bind_vertex_array(&self, array: u32);
    fn vertex_attrib_pointer(&self, index: u32, size: i32, ty: u32, normalized: bool, stride: i32, offset: i32);
    fn vertex_attrib_int_pointer(&self, index: u32, size: i32, ty: u32, stride: i32, offset: i32);
    fn vertex_attrib_divisor(&self, index: u32, divisor: u32);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn disable_vertex_attrib_array(&self, index: u32);

    // samplers
    fn gen_sampler(&self) -> u32;
    fn delete_sampler(&self, sampler: u32);
    fn bind_sampler(&self, unit: u32, sampler: u32);
    fn sampler_parameter_int(&self, sampler: u32, parameter: u32, value: i32);
    fn sampler_parameter_float(&self, sampler: u32, parameter: u32, value: f32);
    fn sampler_parameter_float4(&self, sampler: u32, parameter: u32, values: [f32; 4]);

    // shaders and programs
    fn create_shader(&self, ty: u32) -> u32;
    fn delete_shader(&self, shader: u32);
    fn shader_source(&self, shader: u32, source: &str);
    fn compile_shader(&self, shader: u32);
    fn get_shader_compile_status(&self, shader: u32) -> bool;
    fn get_shader_info_log(&self, shader: u32) -> String;
    fn create_program(&self) -> u32;
    fn delete_program(&self, program: u32);
    fn attach_shader(&self, program: u32, shader: u32);
    fn link_program(&self, program: u32);
    fn get_program_link_status(&self, program: u32) -> bool;
    fn get_program_info_log(&self, program: u32) -> String;
    fn use_program(&self, program: u32);
    fn get_active_attribute_count(&self, program: u32) -> u32;
    fn get_active_attribute(&self, program: u32, index: u32) -> Option<ActiveVar>;
    fn get_attrib_location(&self, program: u32, name: &str) -> i32;
    fn get_active_uniform_count(&self, program: u32) -> u32;
    fn get_active_uniform(&self, program: u32, index: u32) -> Option<ActiveVar>;
    fn get_uniform_location(&self, program: u32, name: &str) -> i32;

    // uniform uploads; `location` is a resolved GL location, never negative
    fn uniform_f32(&self, location: i32, components: u8, values: &[f32]);
    fn uniform_i32(&self, location: i32, components: u8, values: &[i32]);
    fn uniform_matrix_f32(&self, location: i32, dimension: u8, values: &[f32]);

    // draws
    fn draw_arrays_instanced(&self, mode: u32, first: i32, count: i32, instances: i32);
    fn draw_elements_instanced(&self, mode: u32, count: i32, ty: u32, offset: i32, instances: i32);

    fn flush(&self);
}

/// [`Gl`] implemented over a real `glow::Context`.
pub struct GlowGl {
    raw: glow::Context,
}

impl GlowGl {
    pub fn new(context: glow::Context) -> Self {
        GlowGl { raw: context }
    }
}

fn buffer(name: u32) -> Option<glow::NativeBuffer> {
    NonZeroU32::new(name).map(glow::NativeBuffer)
}

fn vertex_array(name: u32) -> Option<glow::NativeVertexArray> {
    NonZeroU32::new(name).map(glow::NativeVertexArray)
}

fn sampler(name: u32) -> Option<glow::NativeSampler> {
    NonZeroU32::new(name).map(glow::NativeSampler)
}

fn shader(name: u32) -> Option<glow::NativeShader> {
    NonZeroU32::new(name).map(glow::NativeShader)
}

fn program(name: u32) -> Option<glow::NativeProgram> {
    NonZeroU32::new(name).map(glow::NativeProgram)
}

fn location(raw: i32) -> glow::NativeUniformLocation {
    debug_assert!(raw >= 0);
    glow::NativeUniformLocation(raw as u32)
}

impl Gl for GlowGl {
    fn get_error(&self) -> u32 {
        unsafe { self.raw.get_error() }
    }

    fn get_integer(&self, parameter: u32) -> i32 {
        unsafe { self.raw.get_parameter_i32(parameter) }
    }

    fn get_string(&self, parameter: u32) -> String {
        unsafe { self.raw.get_parameter_string(parameter) }
    }

    fn enable(&self, cap: u32) {
        unsafe { self.raw.enable(cap) }
    }

    fn disable(&self, cap: u32) {
        unsafe { self.raw.disable(cap) }
    }

    fn enable_indexed(&self, cap: u32, index: u32) {
        unsafe { self.raw.enable_draw_buffer(cap, index) }
    }

    fn disable_indexed(&self, cap: u32, index: u32) {
        unsafe { self.raw.disable_draw_buffer(cap, index) }
    }

    fn polygon_mode(&self, mode: u32) {
        unsafe { self.raw.polygon_mode(glow::FRONT_AND_BACK, mode) }
    }

    fn cull_face(&self, mode: u32) {
        unsafe { self.raw.cull_face(mode) }
    }

    fn front_face(&self, mode: u32) {
        unsafe { self.raw.front_face(mode) }
    }

    fn polygon_offset(&self, factor: f32, units: f32) {
        unsafe { self.raw.polygon_offset(factor, units) }
    }

    fn depth_func(&self, func: u32) {
        unsafe { self.raw.depth_func(func) }
    }

    fn depth_mask(&self, flag: bool) {
        unsafe { self.raw.depth_mask(flag) }
    }

    fn stencil_func_separate(&self, face: u32, func: u32, reference: i32, mask: u32) {
        unsafe { self.raw.stencil_func_separate(face, func, reference, mask) }
    }

    fn stencil_op_separate(&self, face: u32, fail: u32, depth_fail: u32, pass: u32) {
        unsafe { self.raw.stencil_op_separate(face, fail, depth_fail, pass) }
    }

    fn stencil_mask(&self, mask: u32) {
        unsafe { self.raw.stencil_mask(mask) }
    }

    fn blend_equation_separate_target(&self, target: u32, color: u32, alpha: u32) {
        unsafe { self.raw.blend_equation_separate_draw_buffer(target, color, alpha) }
    }

    fn blend_func_separate_target(&self, target: u32, src: u32, dst: u32, src_alpha: u32, dst_alpha: u32) {
        unsafe {
            self.raw
                .blend_func_separate_draw_buffer(target, src, dst, src_alpha, dst_alpha)
        }
    }

    fn color_mask_target(&self, target: u32, r: bool, g: bool, b: bool, a: bool) {
        unsafe { self.raw.color_mask_draw_buffer(target, r, g, b, a) }
    }

    fn color_mask(&self, r: bool, g: bool, b: bool, a: bool) {
        unsafe { self.raw.color_mask(r, g, b, a) }
    }

    fn blend_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { self.raw.blend_color(r, g, b, a) }
    }

    fn viewport(&self, x: i32, y: i32, w: i32, h: i32) {
        unsafe { self.raw.viewport(x, y, w, h) }
    }

    fn depth_range(&self, near: f32, far: f32) {
        unsafe { self.raw.depth_range_f32(near, far) }
    }

    fn scissor(&self, x: i32, y: i32, w: i32, h: i32) {
        unsafe { self.raw.scissor(x, y, w, h) }
    }

    fn clear_color_target(&self, target: u32, color: [f32; 4]) {
        unsafe { self.raw.clear_buffer_f32_slice(glow::COLOR, target, &color) }
    }

    fn clear_depth(&self, depth: f32) {
        unsafe { self.raw.clear_buffer_f32_slice(glow::DEPTH, 0, &[depth]) }
    }

    fn clear_stencil(&self, stencil: i32) {
        unsafe { self.raw.clear_buffer_i32_slice(glow::STENCIL, 0, &[stencil]) }
    }

    fn gen_buffer(&self) -> u32 {
        unsafe { self.raw.create_buffer().map(|b| b.0.get()).unwrap_or(0) }
    }

    fn delete_buffer(&self, name: u32) {
        if let Some(b) = buffer(name) {
            unsafe { self.raw.delete_buffer(b) }
        }
    }

    fn bind_buffer(&self, target: u32, name: u32) {
        unsafe { self.raw.bind_buffer(target, buffer(name)) }
    }

    fn buffer_data(&self, target: u32, size: usize, data: Option<&[u8]>, usage: u32) {
        unsafe {
            match data {
                Some(bytes) => self.raw.buffer_data_u8_slice(target, bytes, usage),
                None => self.raw.buffer_data_size(target, size as i32, usage),
            }
        }
    }

    fn buffer_sub_data(&self, target: u32, offset: usize, data: &[u8]) {
        unsafe { self.raw.buffer_sub_data_u8_slice(target, offset as i32, data) }
    }

    fn map_buffer_range(&self, target: u32, offset: usize, length: usize, access: u32) -> *mut u8 {
        unsafe {
            self.raw
                .map_buffer_range(target, offset as i32, length as i32, access)
        }
    }

    fn unmap_buffer(&self, target: u32) {
        unsafe { self.raw.unmap_buffer(target) }
    }

    fn gen_vertex_array(&self) -> u32 {
        unsafe {
            self.raw
                .create_vertex_array()
                .map(|v| v.0.get())
                .unwrap_or(0)
        }
    }

    fn delete_vertex_array(&self, name: u32) {
        if let Some(v) = vertex_array(name) {
            unsafe { self.raw.delete_vertex_array(v) }
        }
    }

    fn bind_vertex_array(&self, name: u32) {
        unsafe { self.raw.bind_vertex_array(vertex_array(name)) }
    }

    fn vertex_attrib_pointer(&self, index: u32, size: i32, ty: u32, normalized: bool, stride: i32, offset: i32) {
        unsafe {
            self.raw
                .vertex_attrib_pointer_f32(index, size, ty, normalized, stride, offset)
        }
    }

    fn vertex_attrib_int_pointer(&self, index: u32, size: i32, ty: u32, stride: i32, offset: i32) {
        unsafe { self.raw.vertex_attrib_pointer_i32(index, size, ty, stride, offset) }
    }

    fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
        unsafe { self.raw.vertex_attrib_divisor(index, divisor) }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.raw.enable_vertex_attrib_array(index) }
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.raw.disable_vertex_attrib_array(index) }
    }

    fn gen_sampler(&self) -> u32 {
        unsafe { self.raw.create_sampler().map(|s| s.0.get()).unwrap_or(0) }
    }

    fn delete_sampler(&self, name: u32) {
        if let Some(s) = sampler(name) {
            unsafe { self.raw.delete_sampler(s) }
        }
    }

    fn bind_sampler(&self, unit: u32, name: u32) {
        unsafe { self.raw.bind_sampler(unit, sampler(name)) }
    }

    fn sampler_parameter_int(&self, name: u32, parameter: u32, value: i32) {
        if let Some(s) = sampler(name) {
            unsafe { self.raw.sampler_parameter_i32(s, parameter, value) }
        }
    }

    fn sampler_parameter_float(&self, name: u32, parameter: u32, value: f32) {
        if let Some(s) = sampler(name) {
            unsafe { self.raw.sampler_parameter_f32(s, parameter, value) }
        }
    }

    fn sampler_parameter_float4(&self, name: u32, parameter: u32, values: [f32; 4]) {
        if let Some(s) = sampler(name) {
            unsafe { self.raw.sampler_parameter_f32_slice(s, parameter, &values) }
        }
    }

    fn create_shader(&self, ty: u32) -> u32 {
        unsafe { self.raw.create_shader(ty).map(|s| s.0.get()).unwrap_or(0) }
    }

    fn delete_shader(&self, name: u32) {
        if let Some(s) = shader(name) {
            unsafe { self.raw.delete_shader(s) }
        }
    }

    fn shader_source(&self, name: u32, source: &str) {
        if let Some(s) = shader(name) {
            unsafe { self.raw.shader_source(s, source) }
        }
    }

    fn compile_shader(&self, name: u32) {
        if let Some(s) = shader(name) {
            unsafe { self.raw.compile_shader(s) }
        }
    }

    fn get_shader_compile_status(&self, name: u32) -> bool {
        match shader(name) {
            Some(s) => unsafe { self.raw.get_shader_compile_status(s) },
            None => false,
        }
    }

    fn get_shader_info_log(&self, name: u32) -> String {
        match shader(name) {
            Some(s) => unsafe { self.raw.get_shader_info_log(s) },
            None => String::new(),
        }
    }

    fn create_program(&self) -> u32 {
        unsafe { self.raw.create_program().map(|p| p.0.get()).unwrap_or(0) }
    }

    fn delete_program(&self, name: u32) {
        if let Some(p) = program(name) {
            unsafe { self.raw.delete_program(p) }
        }
    }

    fn attach_shader(&self, prog: u32, sh: u32) {
        if let (Some(p), Some(s)) = (program(prog), shader(sh)) {
            unsafe { self.raw.attach_shader(p, s) }
        }
    }

    fn link_program(&self, name: u32) {
        if let Some(p) = program(name) {
            unsafe { self.raw.link_program(p) }
        }
    }

    fn get_program_link_status(&self, name: u32) -> bool {
        match program(name) {
            Some(p) => unsafe { self.raw.get_program_link_status(p) },
            None => false,
        }
    }

    fn get_program_info_log(&self, name: u32) -> String {
        match program(name) {
            Some(p) => unsafe { self.raw.get_program_info_log(p) },
            None => String::new(),
        }
    }

    fn use_program(&self, name: u32) {
        unsafe { self.raw.use_program(program(name)) }
    }

    fn get_active_attribute_count(&self, name: u32) -> u32 {
        match program(name) {
            Some(p) => unsafe { self.raw.get_active_attributes(p) },
            None => 0,
        }
    }

    fn get_active_attribute(&self, name: u32, index: u32) -> Option<ActiveVar> {
        let p = program(name)?;
        unsafe { self.raw.get_active_attribute(p, index) }.map(|a| ActiveVar {
            name: a.name,
            size: a.size,
            ty: a.atype,
        })
    }

    fn get_attrib_location(&self, name: u32, attr: &str) -> i32 {
        match program(name) {
            Some(p) => unsafe {
                self.raw
                    .get_attrib_location(p, attr)
                    .map(|loc| loc as i32)
                    .unwrap_or(-1)
            },
            None => -1,
        }
    }

    fn get_active_uniform_count(&self, name: u32) -> u32 {
        match program(name) {
            Some(p) => unsafe { self.raw.get_active_uniforms(p) },
            None => 0,
        }
    }

    fn get_active_uniform(&self, name: u32, index: u32) -> Option<ActiveVar> {
        let p = program(name)?;
        unsafe { self.raw.get_active_uniform(p, index) }.map(|u| ActiveVar {
            name: u.name,
            size: u.size,
            ty: u.utype,
        })
    }

    fn get_uniform_location(&self, name: u32, uniform: &str) -> i32 {
        match program(name) {
            Some(p) => unsafe {
                self.raw
                    .get_uniform_location(p, uniform)
                    .map(|loc| loc.0 as i32)
                    .unwrap_or(-1)
            },
            None => -1,
        }
    }

    fn uniform_f32(&self, loc: i32, components: u8, values: &[f32]) {
        let loc = location(loc);
        unsafe {
            match components {
                1 => self.raw.uniform_1_f32_slice(Some(&loc), values),
                2 => self.raw.uniform_2_f32_slice(Some(&loc), values),
                3 => self.raw.uniform_3_f32_slice(Some(&loc), values),
                _ => self.raw.uniform_4_f32_slice(Some(&loc), values),
            }
        }
    }

    fn uniform_i32(&self, loc: i32, components: u8, values: &[i32]) {
        let loc = location(loc);
        unsafe {
            match components {
                1 => self.raw.uniform_1_i32_slice(Some(&loc), values),
                2 => self.raw.uniform_2_i32_slice(Some(&loc), values),
                3 => self.raw.uniform_3_i32_slice(Some(&loc), values),
                _ => self.raw.uniform_4_i32_slice(Some(&loc), values),
            }
        }
    }

    fn uniform_matrix_f32(&self, loc: i32, dimension: u8, values: &[f32]) {
        let loc = location(loc);
        unsafe {
            match dimension {
                2 => self.raw.uniform_matrix_2_f32_slice(Some(&loc), false, values),
                3 => self.raw.uniform_matrix_3_f32_slice(Some(&loc), false, values),
                _ => self.raw.uniform_matrix_4_f32_slice(Some(&loc), false, values),
            }
        }
    }

    fn draw_arrays_instanced(&self, mode: u32, first: i32, count: i32, instances: i32) {
        unsafe { self.raw.draw_arrays_instanced(mode, first, count, instances) }
    }

    fn draw_elements_instanced(&self, mode: u32, count: i32, ty: u32, offset: i32, instances: i32) {
        unsafe {
            self.raw
                .draw_elements_instanced(mode, count, ty, offset, instances)
        }
    }

    fn flush(&self) {
        unsafe { self.raw.flush() }
    }
}
