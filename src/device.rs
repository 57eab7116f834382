//! The device: state-object caches, the pending/current state reconciler,
//! buffer management, and draw submission.
//!
//! State-set calls only record what the caller wants into the pending
//! snapshot. The actual GL calls happen at draw time in `flush_state`,
//! which diffs pending against current field by field and emits just the
//! deltas. If a pending slot holds the very object that is current, the
//! whole category is skipped without looking at the fields.

use std::collections::HashMap;
use std::rc::Rc;

use raw_window_handle::RawWindowHandle;

use crate::gl::Gl;
use crate::native::{
    BlendState, Buffer, DepthStencilState, RasterizerData, RasterizerState, SamplerState,
    TargetBlendData, VertexDeclaration,
};
use crate::native::{
    BlendStateRef, BufferRef, DepthStencilStateRef, ProgramRef, RasterizerStateRef,
    SamplerStateRef, VertexDeclarationRef,
};
use crate::shade::{self, CreateProgramError, CreateShaderError, Program, Shader, Stage};
use crate::state::{
    BlendDesc, BufferAccess, BufferUsage, ColorMask, DepthStencilDesc, LinearColor, LockMode,
    PrimitiveType, RasterizerDesc, Rect, SamplerDesc, VertexElement, ViewportBox,
};
use crate::window::{self, CreationError, Resolution, Viewport, ViewportRef};
use crate::{conv, info, native, Share};
use crate::{MAX_RENDER_TARGETS, MAX_TEXTURE_UNITS, MAX_VERTEX_ATTRIBUTES, MAX_VERTEX_STREAMS};

/// Buffer bind points with a remembered binding.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BindTarget {
    Array,
    CopyRead,
    CopyWrite,
    DrawIndirect,
    ElementArray,
    PixelPack,
    PixelUnpack,
    Texture,
    TransformFeedback,
    Uniform,
}

pub(crate) const NUM_BIND_TARGETS: usize = 10;

impl BindTarget {
    fn index(self) -> usize {
        match self {
            BindTarget::Array => 0,
            BindTarget::CopyRead => 1,
            BindTarget::CopyWrite => 2,
            BindTarget::DrawIndirect => 3,
            BindTarget::ElementArray => 4,
            BindTarget::PixelPack => 5,
            BindTarget::PixelUnpack => 6,
            BindTarget::Texture => 7,
            BindTarget::TransformFeedback => 8,
            BindTarget::Uniform => 9,
        }
    }

    pub fn gl_target(self) -> u32 {
        match self {
            BindTarget::Array => glow::ARRAY_BUFFER,
            BindTarget::CopyRead => glow::COPY_READ_BUFFER,
            BindTarget::CopyWrite => glow::COPY_WRITE_BUFFER,
            BindTarget::DrawIndirect => glow::DRAW_INDIRECT_BUFFER,
            BindTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
            BindTarget::PixelPack => glow::PIXEL_PACK_BUFFER,
            BindTarget::PixelUnpack => glow::PIXEL_UNPACK_BUFFER,
            BindTarget::Texture => glow::TEXTURE_BUFFER,
            BindTarget::TransformFeedback => glow::TRANSFORM_FEEDBACK_BUFFER,
            BindTarget::Uniform => glow::UNIFORM_BUFFER,
        }
    }
}

/// What a generic vertex attribute was last configured with.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) struct AttribCache {
    buffer: u32,
    ty: u32,
    count: i32,
    stride: i32,
    offset: u32,
    normalized: bool,
    integer: bool,
    divisor: u32,
    enabled: bool,
}

/// Remembered buffer bindings plus the per-attribute pointer records.
/// Lives in [`Share`] so that a buffer destructor can scrub it: a deleted
/// name may be recycled by the driver, and a stale entry would then make
/// the cache skip a bind that is actually needed.
#[derive(Default)]
pub struct BindCache {
    buffers: [u32; NUM_BIND_TARGETS],
    attribs: [AttribCache; MAX_VERTEX_ATTRIBUTES],
}

impl BindCache {
    /// Binds `name` to `target` unless it is already bound there.
    pub(crate) fn bind(&mut self, gl: &dyn Gl, target: BindTarget, name: u32) {
        let slot = &mut self.buffers[target.index()];
        if *slot != name {
            gl.bind_buffer(target.gl_target(), name);
            *slot = name;
        }
    }

    /// Forgets everything that referenced the deleted buffer.
    pub(crate) fn buffer_deleted(&mut self, name: u32) {
        for slot in self.buffers.iter_mut() {
            if *slot == name {
                *slot = 0;
            }
        }
        for attrib in self.attribs.iter_mut() {
            if attrib.buffer == name {
                // only the source goes stale; the context still has the
                // attribute enabled, and the disable pass relies on that
                attrib.buffer = 0;
            }
        }
    }
}

/// State requested by the caller since the last draw.
#[derive(Default)]
struct PendingState {
    rasterizer: Option<RasterizerStateRef>,
    depth_stencil: Option<DepthStencilStateRef>,
    stencil_ref: u32,
    blend: Option<BlendStateRef>,
    blend_color: LinearColor,
    samplers: [Option<SamplerStateRef>; MAX_TEXTURE_UNITS],
    streams: [Option<BufferRef>; MAX_VERTEX_STREAMS],
    layout: Option<VertexDeclarationRef>,
    program: Option<ProgramRef>,
}

/// What the GL context is known to hold right now.
struct CurrentState {
    rasterizer: Option<RasterizerStateRef>,
    depth_stencil: Option<DepthStencilStateRef>,
    stencil_ref: u32,
    blend: Option<BlendStateRef>,
    blend_color: LinearColor,
    /// Last values applied per render target, tracked past the life of the
    /// blend object that set them. A new state with more active targets
    /// than the current one diffs the extra targets against these.
    blend_targets: [TargetBlendData; MAX_RENDER_TARGETS],
    samplers: [Option<SamplerStateRef>; MAX_TEXTURE_UNITS],
    program: Option<ProgramRef>,
    viewport: ViewportBox,
    scissor: Option<Rect>,
}

impl Default for CurrentState {
    fn default() -> Self {
        CurrentState {
            rasterizer: None,
            depth_stencil: None,
            stencil_ref: 0,
            blend: None,
            blend_color: [0.0; 4],
            blend_targets: [TargetBlendData::default(); MAX_RENDER_TARGETS],
            samplers: Default::default(),
            program: None,
            viewport: ViewportBox::default(),
            scissor: None,
        }
    }
}

/// A mapped buffer range.
pub struct Mapping {
    pub pointer: *mut u8,
    pub size: usize,
}

pub struct Device {
    share: Rc<Share>,
    samplers: HashMap<SamplerDesc, SamplerStateRef>,
    rasterizers: HashMap<RasterizerDesc, RasterizerStateRef>,
    depth_stencils: HashMap<DepthStencilDesc, DepthStencilStateRef>,
    blends: HashMap<BlendDesc, BlendStateRef>,
    pending: PendingState,
    current: CurrentState,
    vao: u32,
    frame: u64,
}

impl Device {
    pub fn new(gl: Box<dyn Gl>, platform: Box<dyn window::PlatformContext>) -> Device {
        let info = info::query(gl.as_ref());
        info.dump();
        if (info.max_render_targets as usize) < MAX_RENDER_TARGETS {
            warn!(
                "Implementation reports only {} draw buffers",
                info.max_render_targets
            );
        }
        if (info.max_vertex_attributes as usize) < MAX_VERTEX_ATTRIBUTES {
            warn!(
                "Implementation reports only {} vertex attributes",
                info.max_vertex_attributes
            );
        }
        let share = Rc::new(Share {
            context: gl,
            platform,
            info,
            bind: Default::default(),
            viewports: Default::default(),
            next_viewport_serial: std::cell::Cell::new(1),
            active_surface: std::cell::Cell::new(0),
        });
        let mut device = Device {
            share,
            samplers: HashMap::new(),
            rasterizers: HashMap::new(),
            depth_stencils: HashMap::new(),
            blends: HashMap::new(),
            pending: PendingState::default(),
            current: CurrentState::default(),
            vao: 0,
            frame: 0,
        };
        device.init();
        device
    }

    /// Establishes the baseline GL state: a shared vertex array object,
    /// counter-clockwise front faces, and the default state objects applied
    /// unconditionally so current matches the context from the start.
    fn init(&mut self) {
        {
            let gl = self.share.context.as_ref();
            self.vao = gl.gen_vertex_array();
            gl.bind_vertex_array(self.vao);
            gl.front_face(glow::CCW);
            gl.disable(glow::SCISSOR_TEST);
        }

        let rasterizer = self.create_rasterizer_state(&RasterizerDesc::default());
        let depth_stencil = self.create_depth_stencil_state(&DepthStencilDesc::default());
        let blend = self.create_blend_state(&BlendDesc::default());
        self.set_rasterizer_state(&rasterizer);
        self.set_depth_stencil_state(&depth_stencil, 0);
        self.set_blend_state(&blend, [0.0; 4]);
        if let Some(sampler) = self.create_sampler_state(&SamplerDesc::default()) {
            for unit in 0..MAX_TEXTURE_UNITS {
                self.set_sampler_state(unit, &sampler);
            }
        }
        // nothing is current yet, so this applies every field
        self.flush_state();
        if let Err(e) = self.share.check() {
            error!("GL error {:?} during device init", e);
        }
    }

    pub fn info(&self) -> &info::Info {
        &self.share.info
    }

    pub fn dump_capabilities(&self) {
        self.share.info.dump();
    }

    // ------------------------------------------------------------------
    // state object caches

    /// Gets or creates the sampler state for `desc`. Equal descriptors
    /// always yield the same object.
    pub fn create_sampler_state(&mut self, desc: &SamplerDesc) -> Option<SamplerStateRef> {
        if let Some(state) = self.samplers.get(desc) {
            return Some(state.clone());
        }
        let state = Rc::new(SamplerState::new(self.share.clone(), desc)?);
        self.samplers.insert(*desc, state.clone());
        Some(state)
    }

    pub fn create_rasterizer_state(&mut self, desc: &RasterizerDesc) -> RasterizerStateRef {
        self.rasterizers
            .entry(*desc)
            .or_insert_with(|| {
                Rc::new(RasterizerState {
                    data: RasterizerData::new(desc),
                })
            })
            .clone()
    }

    pub fn create_depth_stencil_state(&mut self, desc: &DepthStencilDesc) -> DepthStencilStateRef {
        self.depth_stencils
            .entry(*desc)
            .or_insert_with(|| {
                Rc::new(DepthStencilState {
                    data: native::DepthStencilData::new(desc),
                })
            })
            .clone()
    }

    pub fn create_blend_state(&mut self, desc: &BlendDesc) -> BlendStateRef {
        self.blends
            .entry(*desc)
            .or_insert_with(|| {
                Rc::new(BlendState {
                    data: native::BlendData::new(desc),
                })
            })
            .clone()
    }

    // ------------------------------------------------------------------
    // pending state

    pub fn set_rasterizer_state(&mut self, state: &RasterizerStateRef) {
        self.pending.rasterizer = Some(state.clone());
    }

    pub fn set_depth_stencil_state(&mut self, state: &DepthStencilStateRef, stencil_ref: u32) {
        self.pending.depth_stencil = Some(state.clone());
        self.pending.stencil_ref = stencil_ref;
    }

    pub fn set_blend_state(&mut self, state: &BlendStateRef, blend_color: LinearColor) {
        self.pending.blend = Some(state.clone());
        self.pending.blend_color = blend_color;
    }

    pub fn set_sampler_state(&mut self, unit: usize, state: &SamplerStateRef) {
        if unit >= MAX_TEXTURE_UNITS {
            error!("Sampler set on out-of-range texture unit {}", unit);
            return;
        }
        self.pending.samplers[unit] = Some(state.clone());
    }

    pub fn set_vertex_stream(&mut self, slot: usize, buffer: &BufferRef) {
        if slot >= MAX_VERTEX_STREAMS {
            error!("Vertex stream slot {} out of range", slot);
            return;
        }
        self.pending.streams[slot] = Some(buffer.clone());
    }

    pub fn set_vertex_layout(&mut self, declaration: &VertexDeclarationRef) {
        self.pending.layout = Some(declaration.clone());
    }

    pub fn set_program(&mut self, program: &ProgramRef) {
        self.pending.program = Some(program.clone());
    }

    /// Applied immediately, guarded against the last applied box.
    pub fn set_viewport(&mut self, x: i32, y: i32, w: i32, h: i32, z_min: f32, z_max: f32) {
        let viewport = ViewportBox {
            x,
            y,
            w,
            h,
            z_min,
            z_max,
        };
        if viewport == self.current.viewport {
            return;
        }
        let gl = self.share.context.as_ref();
        let old = self.current.viewport;
        if (x, y, w, h) != (old.x, old.y, old.w, old.h) {
            gl.viewport(x, y, w, h);
        }
        if (z_min, z_max) != (old.z_min, old.z_max) {
            gl.depth_range(z_min, z_max);
        }
        self.current.viewport = viewport;
    }

    /// Applied immediately; `None` disables the scissor test.
    pub fn set_scissor(&mut self, rect: Option<Rect>) {
        if rect == self.current.scissor {
            return;
        }
        let gl = self.share.context.as_ref();
        match rect {
            Some(r) => {
                if self.current.scissor.is_none() {
                    gl.enable(glow::SCISSOR_TEST);
                }
                gl.scissor(r.x, r.y, r.w, r.h);
            }
            None => gl.disable(glow::SCISSOR_TEST),
        }
        self.current.scissor = rect;
    }

    // ------------------------------------------------------------------
    // reconciliation

    fn flush_state(&mut self) {
        self.flush_rasterizer();
        self.flush_depth_stencil();
        self.flush_blend();
        self.flush_samplers();
        self.flush_vertex_layout();
        self.flush_program();
    }

    fn flush_rasterizer(&mut self) {
        let pending = match &self.pending.rasterizer {
            Some(state) => state.clone(),
            None => return,
        };
        let old = match &self.current.rasterizer {
            Some(current) if Rc::ptr_eq(current, &pending) => return,
            Some(current) => Some(current.data),
            None => None,
        };
        let gl = self.share.context.as_ref();
        let new = &pending.data;

        if old.map(|o| o.fill_mode) != Some(new.fill_mode) {
            gl.polygon_mode(new.fill_mode);
        }
        if old.map(|o| o.cull) != Some(new.cull) {
            match new.cull {
                Some(face) => {
                    if old.map_or(true, |o| o.cull.is_none()) {
                        gl.enable(glow::CULL_FACE);
                    }
                    gl.cull_face(face);
                }
                None => gl.disable(glow::CULL_FACE),
            }
        }
        if old.map(|o| o.depth_offset) != Some(new.depth_offset) {
            match new.depth_offset {
                Some((factor, units)) => {
                    gl.enable(glow::POLYGON_OFFSET_FILL);
                    gl.polygon_offset(factor, units);
                }
                None => gl.disable(glow::POLYGON_OFFSET_FILL),
            }
        }
        if old.map(|o| o.msaa) != Some(new.msaa) {
            if new.msaa {
                gl.enable(glow::MULTISAMPLE);
            } else {
                gl.disable(glow::MULTISAMPLE);
            }
        }
        if old.map(|o| o.line_aa) != Some(new.line_aa) {
            if new.line_aa {
                gl.enable(glow::LINE_SMOOTH);
            } else {
                gl.disable(glow::LINE_SMOOTH);
            }
        }
        self.current.rasterizer = Some(pending);
    }

    fn flush_depth_stencil(&mut self) {
        let pending = match &self.pending.depth_stencil {
            Some(state) => state.clone(),
            None => return,
        };
        let stencil_ref = self.pending.stencil_ref;
        let gl = self.share.context.as_ref();

        let old = match &self.current.depth_stencil {
            Some(current) if Rc::ptr_eq(current, &pending) => {
                // same object; only the reference value may differ, and it
                // feeds exactly the two stencil func calls
                if self.current.stencil_ref != stencil_ref {
                    let d = &pending.data;
                    gl.stencil_func_separate(glow::FRONT, d.front.func, stencil_ref as i32, d.read_mask);
                    gl.stencil_func_separate(glow::BACK, d.back.func, stencil_ref as i32, d.read_mask);
                    self.current.stencil_ref = stencil_ref;
                }
                return;
            }
            Some(current) => Some(current.data),
            None => None,
        };
        let new = &pending.data;
        let ref_changed = old.is_none() || self.current.stencil_ref != stencil_ref;

        if old.map(|o| o.depth_test) != Some(new.depth_test) {
            if new.depth_test {
                gl.enable(glow::DEPTH_TEST);
            } else {
                gl.disable(glow::DEPTH_TEST);
            }
        }
        if old.map(|o| o.depth_func) != Some(new.depth_func) {
            gl.depth_func(new.depth_func);
        }
        if old.map(|o| o.depth_write) != Some(new.depth_write) {
            gl.depth_mask(new.depth_write);
        }
        if old.map(|o| o.stencil_test) != Some(new.stencil_test) {
            if new.stencil_test {
                gl.enable(glow::STENCIL_TEST);
            } else {
                gl.disable(glow::STENCIL_TEST);
            }
        }
        if ref_changed || old.map(|o| (o.front.func, o.read_mask)) != Some((new.front.func, new.read_mask)) {
            gl.stencil_func_separate(glow::FRONT, new.front.func, stencil_ref as i32, new.read_mask);
        }
        if ref_changed || old.map(|o| (o.back.func, o.read_mask)) != Some((new.back.func, new.read_mask)) {
            gl.stencil_func_separate(glow::BACK, new.back.func, stencil_ref as i32, new.read_mask);
        }
        if old.map(|o| o.front) != Some(new.front) {
            gl.stencil_op_separate(
                glow::FRONT,
                new.front.fail_op,
                new.front.depth_fail_op,
                new.front.pass_op,
            );
        }
        if old.map(|o| o.back) != Some(new.back) {
            gl.stencil_op_separate(
                glow::BACK,
                new.back.fail_op,
                new.back.depth_fail_op,
                new.back.pass_op,
            );
        }
        if old.map(|o| o.write_mask) != Some(new.write_mask) {
            gl.stencil_mask(new.write_mask);
        }
        self.current.depth_stencil = Some(pending);
        self.current.stencil_ref = stencil_ref;
    }

    fn flush_blend(&mut self) {
        if let Some(pending) = self.pending.blend.clone() {
            let same = match &self.current.blend {
                Some(current) => Rc::ptr_eq(current, &pending),
                None => false,
            };
            if !same {
                let force = self.current.blend.is_none();
                for index in 0..pending.data.target_count {
                    let new = pending.data.targets[index];
                    let old = if force {
                        None
                    } else {
                        Some(self.current.blend_targets[index])
                    };
                    self.apply_blend_target(index as u32, &new, old.as_ref());
                    self.current.blend_targets[index] = new;
                }
                self.current.blend = Some(pending);
            }
        }
        if self.current.blend.is_some() && self.pending.blend_color != self.current.blend_color {
            let c = self.pending.blend_color;
            self.share.context.blend_color(c[0], c[1], c[2], c[3]);
            self.current.blend_color = c;
        }
    }

    fn apply_blend_target(&self, target: u32, new: &TargetBlendData, old: Option<&TargetBlendData>) {
        let gl = self.share.context.as_ref();
        if old.map(|o| o.blend) != Some(new.blend) {
            if new.blend {
                gl.enable_indexed(glow::BLEND, target);
            } else {
                gl.disable_indexed(glow::BLEND, target);
            }
        }
        if old.map(|o| (o.color_op, o.alpha_op)) != Some((new.color_op, new.alpha_op)) {
            gl.blend_equation_separate_target(target, new.color_op, new.alpha_op);
        }
        let funcs = |t: &TargetBlendData| (t.color_src, t.color_dst, t.alpha_src, t.alpha_dst);
        if old.map(funcs) != Some(funcs(new)) {
            gl.blend_func_separate_target(
                target,
                new.color_src,
                new.color_dst,
                new.alpha_src,
                new.alpha_dst,
            );
        }
        if old.map(|o| o.mask) != Some(new.mask) {
            gl.color_mask_target(
                target,
                new.mask.contains(ColorMask::RED),
                new.mask.contains(ColorMask::GREEN),
                new.mask.contains(ColorMask::BLUE),
                new.mask.contains(ColorMask::ALPHA),
            );
        }
    }

    fn flush_samplers(&mut self) {
        for unit in 0..MAX_TEXTURE_UNITS {
            let pending = match &self.pending.samplers[unit] {
                Some(state) => state.clone(),
                None => continue,
            };
            let same = match &self.current.samplers[unit] {
                Some(current) => Rc::ptr_eq(current, &pending),
                None => false,
            };
            if !same {
                self.share.context.bind_sampler(unit as u32, pending.name);
                self.current.samplers[unit] = Some(pending);
            }
        }
    }

    fn flush_vertex_layout(&mut self) {
        let layout = match &self.pending.layout {
            Some(declaration) => declaration.clone(),
            None => return,
        };
        let gl = self.share.context.as_ref();
        let mut bind = self.share.bind.borrow_mut();
        let mut touched = [false; MAX_VERTEX_ATTRIBUTES];

        for element in &layout.elements {
            let buffer = match &self.pending.streams[element.stream] {
                Some(buffer) => buffer,
                None => {
                    error!(
                        "Vertex element reads stream {} with no buffer bound",
                        element.stream
                    );
                    continue;
                }
            };
            let attr = element.attribute;
            let cache = bind.attribs[attr];
            let fmt = element.format;
            let pointer_changed = cache.buffer != buffer.name
                || cache.ty != fmt.ty
                || cache.count != fmt.count
                || cache.stride != element.stride
                || cache.offset != element.offset
                || cache.normalized != fmt.normalized
                || cache.integer != fmt.integer;
            if pointer_changed {
                bind.bind(gl, BindTarget::Array, buffer.name);
                if fmt.integer {
                    gl.vertex_attrib_int_pointer(
                        attr as u32,
                        fmt.count,
                        fmt.ty,
                        element.stride,
                        element.offset as i32,
                    );
                } else {
                    gl.vertex_attrib_pointer(
                        attr as u32,
                        fmt.count,
                        fmt.ty,
                        fmt.normalized,
                        element.stride,
                        element.offset as i32,
                    );
                }
            }
            if cache.divisor != element.divisor {
                gl.vertex_attrib_divisor(attr as u32, element.divisor);
            }
            if !cache.enabled {
                gl.enable_vertex_attrib_array(attr as u32);
            }
            bind.attribs[attr] = AttribCache {
                buffer: buffer.name,
                ty: fmt.ty,
                count: fmt.count,
                stride: element.stride,
                offset: element.offset,
                normalized: fmt.normalized,
                integer: fmt.integer,
                divisor: element.divisor,
                enabled: true,
            };
            touched[attr] = true;
        }

        // attributes enabled by an earlier layout but absent from this one
        for (index, used) in touched.iter().enumerate() {
            let cache = &mut bind.attribs[index];
            if cache.enabled && !*used {
                gl.disable_vertex_attrib_array(index as u32);
                cache.enabled = false;
            }
        }
    }

    fn flush_program(&mut self) {
        let pending = match &self.pending.program {
            Some(program) => program.clone(),
            None => return,
        };
        let same = match &self.current.program {
            Some(current) => Rc::ptr_eq(current, &pending),
            None => false,
        };
        if !same {
            self.share.context.use_program(pending.name);
            self.current.program = Some(pending);
        }
    }

    // ------------------------------------------------------------------
    // draws

    pub fn draw_primitives(
        &mut self,
        primitive: PrimitiveType,
        start_vertex: u32,
        primitive_count: u32,
        num_instances: u32,
    ) {
        self.flush_state();
        self.update_program_uniforms();
        let gl = self.share.context.as_ref();
        gl.draw_arrays_instanced(
            conv::primitive(primitive),
            start_vertex as i32,
            primitive.element_count(primitive_count) as i32,
            num_instances.max(1) as i32,
        );
        if let Err(e) = self.share.check() {
            error!("GL error {:?} after draw", e);
        }
    }

    pub fn draw_indexed_primitives(
        &mut self,
        index_buffer: &BufferRef,
        primitive: PrimitiveType,
        start_index: u32,
        primitive_count: u32,
        num_instances: u32,
    ) {
        debug_assert!(index_buffer.stride == 2 || index_buffer.stride == 4);
        self.flush_state();
        self.update_program_uniforms();
        let gl = self.share.context.as_ref();
        self.share
            .bind
            .borrow_mut()
            .bind(gl, BindTarget::ElementArray, index_buffer.name);
        let index_type = if index_buffer.stride == 2 {
            glow::UNSIGNED_SHORT
        } else {
            glow::UNSIGNED_INT
        };
        gl.draw_elements_instanced(
            conv::primitive(primitive),
            primitive.element_count(primitive_count) as i32,
            index_type,
            (start_index as usize * index_buffer.stride) as i32,
            num_instances.max(1) as i32,
        );
        if let Err(e) = self.share.check() {
            error!("GL error {:?} after indexed draw", e);
        }
    }

    fn update_program_uniforms(&self) {
        if let Some(program) = &self.current.program {
            program.update_uniforms(self.share.context.as_ref());
        }
    }

    // ------------------------------------------------------------------
    // clears

    pub fn clear(
        &mut self,
        color: Option<LinearColor>,
        depth: Option<f32>,
        stencil: Option<u32>,
    ) {
        self.clear_mrt(&[color], depth, stencil);
    }

    /// Clears the given render targets. Write masks that would block the
    /// clear are lifted for the duration and restored afterwards.
    pub fn clear_mrt(
        &mut self,
        colors: &[Option<LinearColor>],
        depth: Option<f32>,
        stencil: Option<u32>,
    ) {
        let gl = self.share.context.as_ref();
        for (index, color) in colors.iter().enumerate().take(MAX_RENDER_TARGETS) {
            let color = match color {
                Some(color) => *color,
                None => continue,
            };
            let mask = self.current.blend_targets[index].mask;
            let lifted = mask != ColorMask::ALL;
            if lifted {
                gl.color_mask_target(index as u32, true, true, true, true);
            }
            gl.clear_color_target(index as u32, color);
            if lifted {
                gl.color_mask_target(
                    index as u32,
                    mask.contains(ColorMask::RED),
                    mask.contains(ColorMask::GREEN),
                    mask.contains(ColorMask::BLUE),
                    mask.contains(ColorMask::ALPHA),
                );
            }
        }
        if let Some(depth) = depth {
            let writes = self
                .current
                .depth_stencil
                .as_ref()
                .map_or(true, |s| s.data.depth_write);
            if !writes {
                gl.depth_mask(true);
            }
            gl.clear_depth(depth);
            if !writes {
                gl.depth_mask(false);
            }
        }
        if let Some(stencil) = stencil {
            let mask = self
                .current
                .depth_stencil
                .as_ref()
                .map_or(0xFF, |s| s.data.write_mask);
            let lifted = mask != 0xFF;
            if lifted {
                gl.stencil_mask(0xFF);
            }
            gl.clear_stencil(stencil as i32);
            if lifted {
                gl.stencil_mask(mask);
            }
        }
        if let Err(e) = self.share.check() {
            error!("GL error {:?} after clear", e);
        }
    }

    // ------------------------------------------------------------------
    // buffers

    pub fn create_vertex_buffer(
        &mut self,
        size: usize,
        access: BufferAccess,
        usage: BufferUsage,
        data: Option<&[u8]>,
    ) -> Option<BufferRef> {
        self.create_buffer_internal(BindTarget::Array, size, 0, access, usage, data)
    }

    /// `stride` is the size of one index, 2 or 4 bytes; it selects the
    /// index type at draw time.
    pub fn create_index_buffer(
        &mut self,
        stride: usize,
        size: usize,
        access: BufferAccess,
        usage: BufferUsage,
        data: Option<&[u8]>,
    ) -> Option<BufferRef> {
        debug_assert!(stride == 2 || stride == 4);
        self.create_buffer_internal(BindTarget::ElementArray, size, stride, access, usage, data)
    }

    fn create_buffer_internal(
        &mut self,
        target: BindTarget,
        size: usize,
        stride: usize,
        access: BufferAccess,
        usage: BufferUsage,
        data: Option<&[u8]>,
    ) -> Option<BufferRef> {
        if let Some(data) = data {
            debug_assert_eq!(data.len(), size);
        }
        let gl_usage = conv::buffer_usage(access, usage);
        let buffer = Buffer::new(self.share.clone(), target, size, stride, gl_usage)?;
        let gl = self.share.context.as_ref();
        self.share.bind.borrow_mut().bind(gl, target, buffer.name);
        gl.buffer_data(target.gl_target(), size, data, gl_usage);
        info!("\tCreated buffer {} ({} bytes)", buffer.name, size);
        if let Err(e) = self.share.check() {
            error!("GL error {:?} creating buffer", e);
            return None;
        }
        Some(Rc::new(buffer))
    }

    pub fn fill_buffer(&mut self, buffer: &BufferRef, offset: usize, data: &[u8]) -> bool {
        if offset + data.len() > buffer.size {
            error!(
                "Buffer {} update out of bounds: {}+{} > {}",
                buffer.name,
                offset,
                data.len(),
                buffer.size
            );
            return false;
        }
        let gl = self.share.context.as_ref();
        self.share
            .bind
            .borrow_mut()
            .bind(gl, buffer.target, buffer.name);
        gl.buffer_sub_data(buffer.target.gl_target(), offset, data);
        true
    }

    /// Maps a range of the buffer for CPU access. The buffer stays locked
    /// until [`unlock_buffer`](Self::unlock_buffer).
    pub fn lock_buffer(
        &mut self,
        buffer: &BufferRef,
        offset: usize,
        size: usize,
        mode: LockMode,
    ) -> Option<Mapping> {
        if buffer.locked.get() {
            error!("Buffer {} is already locked", buffer.name);
            return None;
        }
        if offset + size > buffer.size {
            error!("Buffer {} lock out of bounds", buffer.name);
            return None;
        }
        let gl = self.share.context.as_ref();
        self.share
            .bind
            .borrow_mut()
            .bind(gl, buffer.target, buffer.name);
        let pointer =
            gl.map_buffer_range(buffer.target.gl_target(), offset, size, conv::lock_access(mode));
        if pointer.is_null() {
            error!("Failed to map buffer {}", buffer.name);
            return None;
        }
        buffer.locked.set(true);
        Some(Mapping { pointer, size })
    }

    pub fn unlock_buffer(&mut self, buffer: &BufferRef) {
        if !buffer.locked.get() {
            error!("Buffer {} is not locked", buffer.name);
            return;
        }
        let gl = self.share.context.as_ref();
        self.share
            .bind
            .borrow_mut()
            .bind(gl, buffer.target, buffer.name);
        gl.unmap_buffer(buffer.target.gl_target());
        buffer.locked.set(false);
    }

    // ------------------------------------------------------------------
    // declarations, shaders and programs

    pub fn create_vertex_declaration(
        &mut self,
        elements: &[VertexElement],
    ) -> Option<VertexDeclarationRef> {
        VertexDeclaration::new(elements).map(Rc::new)
    }

    pub fn create_shader(&mut self, stage: Stage, source: &str) -> Result<Shader, CreateShaderError> {
        shade::create_shader(self.share.clone(), stage, source)
    }

    pub fn create_program(&mut self, shaders: &[&Shader]) -> Result<ProgramRef, CreateProgramError> {
        Program::build(self.share.clone(), shaders)
    }

    // ------------------------------------------------------------------
    // frames and viewports

    pub fn begin_frame(&mut self) {
        self.frame += 1;
        debug!("Frame {} begins", self.frame);
    }

    pub fn end_frame(&mut self) {
        if let Err(e) = self.share.check() {
            error!("GL error {:?} at end of frame {}", e, self.frame);
        }
    }

    pub fn create_viewport(
        &mut self,
        window: RawWindowHandle,
        width: u32,
        height: u32,
        fullscreen: bool,
    ) -> Result<ViewportRef, CreationError> {
        let viewport = Viewport::new(self.share.clone(), window, width, height, fullscreen)?;
        self.share.active_surface.set(viewport.serial());
        Ok(viewport)
    }

    pub fn begin_drawing_viewport(&mut self, viewport: &ViewportRef) {
        if self.share.active_surface.get() != viewport.serial() {
            viewport.make_current();
            self.share.active_surface.set(viewport.serial());
        }
    }

    pub fn end_drawing_viewport(&mut self, viewport: &ViewportRef, present: bool, vsync: bool) {
        debug_assert_eq!(self.share.active_surface.get(), viewport.serial());
        if let Err(e) = self.share.check() {
            error!("GL error {:?} before present", e);
        }
        self.share.context.flush();
        if present {
            viewport.swap_buffers(vsync);
        }
    }

    pub fn resize_viewport(&mut self, viewport: &ViewportRef, width: u32, height: u32, fullscreen: bool) {
        viewport.resize(width, height, fullscreen);
    }

    /// Display modes reported by the platform, sorted and deduplicated.
    pub fn available_resolutions(&self, ignore_refresh_rate: bool) -> Vec<Resolution> {
        let mut resolutions = self.share.platform.available_resolutions(ignore_refresh_rate);
        resolutions.sort();
        resolutions.dedup();
        resolutions
    }

    pub fn supported_resolution(&self, width: u32, height: u32) -> (u32, u32) {
        self.share.platform.supported_resolution(width, height)
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.share.context.delete_vertex_array(self.vao);
    }
}
