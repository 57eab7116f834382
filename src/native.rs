//! Native resource types. State objects carry their fully translated GL
//! payload so the reconciler never touches the API-level descriptors again.
//! Resources are shared via `Rc`; cleanup against the driver and the bind
//! caches happens in `Drop`, exactly once, when the last holder lets go.

use std::cell::Cell;
use std::rc::Rc;

use crate::state::{
    BlendDesc, ColorMask, Comparison, DepthStencilDesc, RasterizerDesc, SamplerDesc, VertexElement,
};
use crate::{conv, Share, MAX_RENDER_TARGETS, MAX_VERTEX_ATTRIBUTES, MAX_VERTEX_STREAMS};

pub type SamplerStateRef = Rc<SamplerState>;
pub type RasterizerStateRef = Rc<RasterizerState>;
pub type DepthStencilStateRef = Rc<DepthStencilState>;
pub type BlendStateRef = Rc<BlendState>;
pub type BufferRef = Rc<Buffer>;
pub type VertexDeclarationRef = Rc<VertexDeclaration>;
pub type ProgramRef = Rc<crate::shade::Program>;

/// Tag identifying what a resource is, mostly for diagnostics.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ResourceType {
    SamplerState,
    RasterizerState,
    DepthStencilState,
    BlendState,
    VertexBuffer,
    IndexBuffer,
    VertexDeclaration,
    Shader,
    Program,
    Viewport,
}

/// Translated rasterizer payload.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RasterizerData {
    pub fill_mode: u32,
    pub cull: Option<u32>,
    /// `Some` only when both factor and units are non-zero.
    pub depth_offset: Option<(f32, f32)>,
    pub msaa: bool,
    pub line_aa: bool,
}

impl RasterizerData {
    pub fn new(desc: &RasterizerDesc) -> Self {
        let enable_offset = desc.depth_offset_factor != 0.0 && desc.depth_offset_units != 0.0;
        RasterizerData {
            fill_mode: conv::fill_mode(desc.fill_mode),
            cull: conv::cull_face(desc.cull_mode),
            depth_offset: if enable_offset {
                Some((desc.depth_offset_factor, desc.depth_offset_units))
            } else {
                None
            },
            msaa: desc.allow_msaa,
            line_aa: desc.line_aa,
        }
    }
}

pub struct RasterizerState {
    pub data: RasterizerData,
}

impl RasterizerState {
    pub fn resource_type(&self) -> ResourceType {
        ResourceType::RasterizerState
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StencilSideData {
    pub func: u32,
    pub fail_op: u32,
    pub depth_fail_op: u32,
    pub pass_op: u32,
}

/// Translated depth-stencil payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DepthStencilData {
    /// Derived: testing is needed if the function can reject fragments or
    /// if depth writes are on (GL gates writes behind the test).
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_func: u32,
    pub stencil_test: bool,
    pub front: StencilSideData,
    pub back: StencilSideData,
    pub read_mask: u32,
    pub write_mask: u32,
}

impl DepthStencilData {
    pub fn new(desc: &DepthStencilDesc) -> Self {
        let side = |s: &crate::state::StencilSide| StencilSideData {
            func: conv::comparison(s.func),
            fail_op: conv::stencil_op(s.fail_op),
            depth_fail_op: conv::stencil_op(s.depth_fail_op),
            pass_op: conv::stencil_op(s.pass_op),
        };
        DepthStencilData {
            depth_test: desc.depth_func != Comparison::Always || desc.depth_write,
            depth_write: desc.depth_write,
            depth_func: conv::comparison(desc.depth_func),
            stencil_test: desc.stencil_enable,
            front: side(&desc.front),
            back: side(&desc.back),
            read_mask: desc.stencil_read_mask as u32,
            write_mask: desc.stencil_write_mask as u32,
        }
    }
}

pub struct DepthStencilState {
    pub data: DepthStencilData,
}

impl DepthStencilState {
    pub fn resource_type(&self) -> ResourceType {
        ResourceType::DepthStencilState
    }
}

/// Translated blend payload of a single render target.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TargetBlendData {
    pub blend: bool,
    pub color_op: u32,
    pub color_src: u32,
    pub color_dst: u32,
    pub alpha_op: u32,
    pub alpha_src: u32,
    pub alpha_dst: u32,
    pub mask: ColorMask,
}

impl TargetBlendData {
    pub fn new(desc: &crate::state::TargetBlendDesc) -> Self {
        TargetBlendData {
            blend: desc.blends(),
            color_op: conv::equation(desc.color_op),
            color_src: conv::factor(desc.color_src),
            color_dst: conv::factor(desc.color_dst),
            alpha_op: conv::equation(desc.alpha_op),
            alpha_src: conv::factor(desc.alpha_src),
            alpha_dst: conv::factor(desc.alpha_dst),
            mask: desc.write_mask,
        }
    }
}

impl Default for TargetBlendData {
    fn default() -> Self {
        TargetBlendData::new(&crate::state::TargetBlendDesc::default())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BlendData {
    pub targets: [TargetBlendData; MAX_RENDER_TARGETS],
    pub target_count: usize,
}

impl BlendData {
    pub fn new(desc: &BlendDesc) -> Self {
        let mut targets = [TargetBlendData::default(); MAX_RENDER_TARGETS];
        for (data, desc) in targets.iter_mut().zip(desc.targets.iter()) {
            *data = TargetBlendData::new(desc);
        }
        BlendData {
            targets,
            target_count: desc.target_count.min(MAX_RENDER_TARGETS),
        }
    }
}

pub struct BlendState {
    pub data: BlendData,
}

impl BlendState {
    pub fn resource_type(&self) -> ResourceType {
        ResourceType::BlendState
    }
}

/// A GL sampler object, configured once at creation.
pub struct SamplerState {
    share: Rc<Share>,
    pub name: u32,
}

impl SamplerState {
    pub fn new(share: Rc<Share>, desc: &SamplerDesc) -> Option<Self> {
        let gl = &share.context;
        let name = gl.gen_sampler();
        if name == 0 {
            error!("Failed to create a sampler object");
            return None;
        }
        let (min, mag) = conv::filter_method(desc.filter);
        gl.sampler_parameter_int(name, glow::TEXTURE_MIN_FILTER, min);
        gl.sampler_parameter_int(name, glow::TEXTURE_MAG_FILTER, mag);
        gl.sampler_parameter_int(name, glow::TEXTURE_WRAP_S, conv::wrap_mode(desc.wrap_s));
        gl.sampler_parameter_int(name, glow::TEXTURE_WRAP_T, conv::wrap_mode(desc.wrap_t));
        gl.sampler_parameter_int(name, glow::TEXTURE_WRAP_R, conv::wrap_mode(desc.wrap_r));
        gl.sampler_parameter_float(name, glow::TEXTURE_MIN_LOD, desc.lod_range.0);
        gl.sampler_parameter_float(name, glow::TEXTURE_MAX_LOD, desc.lod_range.1);
        gl.sampler_parameter_float(name, glow::TEXTURE_LOD_BIAS, desc.lod_bias);
        gl.sampler_parameter_float4(name, glow::TEXTURE_BORDER_COLOR, desc.border);
        info!("\tCreated sampler {}", name);
        Some(SamplerState { share, name })
    }

    pub fn resource_type(&self) -> ResourceType {
        ResourceType::SamplerState
    }
}

impl Drop for SamplerState {
    fn drop(&mut self) {
        self.share.context.delete_sampler(self.name);
    }
}

/// A GL buffer object. Dropping it deletes the native object and scrubs
/// the bind caches, so a recycled name can never alias a stale entry.
pub struct Buffer {
    share: Rc<Share>,
    pub name: u32,
    pub target: super::device::BindTarget,
    pub size: usize,
    /// Element stride; meaningful for index buffers (2 or 4).
    pub stride: usize,
    pub usage: u32,
    pub(crate) locked: Cell<bool>,
}

impl Buffer {
    pub(crate) fn new(
        share: Rc<Share>,
        target: super::device::BindTarget,
        size: usize,
        stride: usize,
        usage: u32,
    ) -> Option<Self> {
        let name = share.context.gen_buffer();
        if name == 0 {
            error!("Failed to create a buffer object");
            return None;
        }
        Some(Buffer {
            share,
            name,
            target,
            size,
            stride,
            usage,
            locked: Cell::new(false),
        })
    }

    pub fn resource_type(&self) -> ResourceType {
        match self.target {
            super::device::BindTarget::ElementArray => ResourceType::IndexBuffer,
            _ => ResourceType::VertexBuffer,
        }
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        debug_assert!(!self.locked.get(), "buffer {} dropped while locked", self.name);
        self.share.bind.borrow_mut().buffer_deleted(self.name);
        self.share.context.delete_buffer(self.name);
    }
}

/// A vertex element with its format already translated.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GlVertexElement {
    pub stream: usize,
    pub attribute: usize,
    pub offset: u32,
    pub stride: i32,
    pub divisor: u32,
    pub format: conv::FormatDesc,
}

/// An ordered set of vertex elements. Pure data; the attribute pointers
/// are established lazily by the state flush.
pub struct VertexDeclaration {
    pub elements: Vec<GlVertexElement>,
}

impl VertexDeclaration {
    pub fn new(elements: &[VertexElement]) -> Option<Self> {
        let mut translated = Vec::with_capacity(elements.len());
        for el in elements {
            if el.stream as usize >= MAX_VERTEX_STREAMS
                || el.attribute as usize >= MAX_VERTEX_ATTRIBUTES
            {
                error!(
                    "Vertex element out of range: stream {} attribute {}",
                    el.stream, el.attribute
                );
                return None;
            }
            translated.push(GlVertexElement {
                stream: el.stream as usize,
                attribute: el.attribute as usize,
                offset: el.offset,
                stride: el.stride as i32,
                divisor: el.divisor,
                format: conv::vertex_format(el.format),
            });
        }
        Some(VertexDeclaration {
            elements: translated,
        })
    }

    pub fn resource_type(&self) -> ResourceType {
        ResourceType::VertexDeclaration
    }
}
