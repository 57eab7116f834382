//! API-agnostic state descriptors. These are the value types that state
//! objects are deduplicated by, so equality and hashing must be exact;
//! float fields are compared and hashed by bit pattern.

use std::hash::{Hash, Hasher};

use crate::MAX_RENDER_TARGETS;

/// How polygons are rasterized.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum FillMode {
    Point,
    Wireframe,
    Solid,
}

/// Which winding, if any, gets culled. The front face is always
/// counter-clockwise.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum CullMode {
    None,
    Clockwise,
    CounterClockwise,
}

/// Depth and stencil comparison function.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Comparison {
    Never,
    Less,
    LessEqual,
    Equal,
    GreaterEqual,
    Greater,
    NotEqual,
    Always,
}

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    IncrementClamp,
    DecrementClamp,
    IncrementWrap,
    DecrementWrap,
    Invert,
}

/// Blend equation.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Equation {
    Add,
    Sub,
    RevSub,
    Min,
    Max,
}

/// Blend factor.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Factor {
    Zero,
    One,
    SourceColor,
    OneMinusSourceColor,
    SourceAlpha,
    OneMinusSourceAlpha,
    DestColor,
    OneMinusDestColor,
    DestAlpha,
    OneMinusDestAlpha,
    ConstantColor,
    OneMinusConstantColor,
}

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum WrapMode {
    Wrap,
    Clamp,
    Mirror,
    Border,
}

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum FilterMethod {
    Point,
    Bilinear,
    Trilinear,
}

bitflags! {
    /// Per-channel color write mask.
    pub struct ColorMask: u8 {
        const RED   = 0x1;
        const GREEN = 0x2;
        const BLUE  = 0x4;
        const ALPHA = 0x8;
        const ALL   = 0xF;
    }
}

/// RGBA color, unclamped.
pub type LinearColor = [f32; 4];

/// Integer rectangle used for scissoring.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// Viewport box with a depth range.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ViewportBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub z_min: f32,
    pub z_max: f32,
}

impl Default for ViewportBox {
    fn default() -> Self {
        ViewportBox {
            x: 0,
            y: 0,
            w: 0,
            h: 0,
            z_min: 0.0,
            z_max: 1.0,
        }
    }
}

/// Sampler state initializer.
#[derive(Copy, Clone, Debug)]
pub struct SamplerDesc {
    pub filter: FilterMethod,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub wrap_r: WrapMode,
    pub lod_range: (f32, f32),
    pub lod_bias: f32,
    pub border: LinearColor,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        SamplerDesc {
            filter: FilterMethod::Bilinear,
            wrap_s: WrapMode::Wrap,
            wrap_t: WrapMode::Wrap,
            wrap_r: WrapMode::Wrap,
            lod_range: (-1000.0, 1000.0),
            lod_bias: 0.0,
            border: [0.0; 4],
        }
    }
}

impl PartialEq for SamplerDesc {
    fn eq(&self, other: &Self) -> bool {
        self.filter == other.filter
            && self.wrap_s == other.wrap_s
            && self.wrap_t == other.wrap_t
            && self.wrap_r == other.wrap_r
            && bits2(self.lod_range) == bits2(other.lod_range)
            && self.lod_bias.to_bits() == other.lod_bias.to_bits()
            && bits4(self.border) == bits4(other.border)
    }
}

impl Eq for SamplerDesc {}

impl Hash for SamplerDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.filter.hash(state);
        self.wrap_s.hash(state);
        self.wrap_t.hash(state);
        self.wrap_r.hash(state);
        bits2(self.lod_range).hash(state);
        self.lod_bias.to_bits().hash(state);
        bits4(self.border).hash(state);
    }
}

/// Rasterizer state initializer.
#[derive(Copy, Clone, Debug)]
pub struct RasterizerDesc {
    pub fill_mode: FillMode,
    pub cull_mode: CullMode,
    pub depth_offset_factor: f32,
    pub depth_offset_units: f32,
    pub allow_msaa: bool,
    pub line_aa: bool,
}

impl Default for RasterizerDesc {
    fn default() -> Self {
        RasterizerDesc {
            fill_mode: FillMode::Solid,
            cull_mode: CullMode::None,
            depth_offset_factor: 0.0,
            depth_offset_units: 0.0,
            allow_msaa: true,
            line_aa: false,
        }
    }
}

impl PartialEq for RasterizerDesc {
    fn eq(&self, other: &Self) -> bool {
        self.fill_mode == other.fill_mode
            && self.cull_mode == other.cull_mode
            && self.depth_offset_factor.to_bits() == other.depth_offset_factor.to_bits()
            && self.depth_offset_units.to_bits() == other.depth_offset_units.to_bits()
            && self.allow_msaa == other.allow_msaa
            && self.line_aa == other.line_aa
    }
}

impl Eq for RasterizerDesc {}

impl Hash for RasterizerDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fill_mode.hash(state);
        self.cull_mode.hash(state);
        self.depth_offset_factor.to_bits().hash(state);
        self.depth_offset_units.to_bits().hash(state);
        self.allow_msaa.hash(state);
        self.line_aa.hash(state);
    }
}

/// One face of the stencil configuration.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct StencilSide {
    pub func: Comparison,
    pub fail_op: StencilOp,
    pub depth_fail_op: StencilOp,
    pub pass_op: StencilOp,
}

impl Default for StencilSide {
    fn default() -> Self {
        StencilSide {
            func: Comparison::Always,
            fail_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
            pass_op: StencilOp::Keep,
        }
    }
}

/// Depth-stencil state initializer. The stencil reference value is not
/// part of the initializer; it rides along the state-set call.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct DepthStencilDesc {
    pub depth_write: bool,
    pub depth_func: Comparison,
    pub stencil_enable: bool,
    pub front: StencilSide,
    pub back: StencilSide,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,
}

impl Default for DepthStencilDesc {
    fn default() -> Self {
        DepthStencilDesc {
            depth_write: true,
            depth_func: Comparison::LessEqual,
            stencil_enable: false,
            front: StencilSide::default(),
            back: StencilSide::default(),
            stencil_read_mask: 0xFF,
            stencil_write_mask: 0xFF,
        }
    }
}

/// Blend configuration of a single render target.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct TargetBlendDesc {
    pub color_op: Equation,
    pub color_src: Factor,
    pub color_dst: Factor,
    pub alpha_op: Equation,
    pub alpha_src: Factor,
    pub alpha_dst: Factor,
    pub write_mask: ColorMask,
}

impl Default for TargetBlendDesc {
    fn default() -> Self {
        TargetBlendDesc {
            color_op: Equation::Add,
            color_src: Factor::One,
            color_dst: Factor::Zero,
            alpha_op: Equation::Add,
            alpha_src: Factor::One,
            alpha_dst: Factor::Zero,
            write_mask: ColorMask::ALL,
        }
    }
}

impl TargetBlendDesc {
    /// Whether this target actually blends, as opposed to plain overwrite.
    pub fn blends(&self) -> bool {
        self.color_op != Equation::Add
            || self.color_src != Factor::One
            || self.color_dst != Factor::Zero
            || self.alpha_op != Equation::Add
            || self.alpha_src != Factor::One
            || self.alpha_dst != Factor::Zero
    }
}

/// Blend state initializer: one descriptor per active render target.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct BlendDesc {
    pub targets: [TargetBlendDesc; MAX_RENDER_TARGETS],
    pub target_count: usize,
}

impl Default for BlendDesc {
    fn default() -> Self {
        BlendDesc {
            targets: [TargetBlendDesc::default(); MAX_RENDER_TARGETS],
            target_count: 1,
        }
    }
}

/// Data layout of a single vertex element.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Format {
    Float1,
    Float2,
    Float3,
    Float4,
    PackedNormal,
    UByte4,
    UByte4Norm,
    Color,
    Short2,
    Short4,
    Short2Norm,
    Short4Norm,
    Half2,
    Half4,
    UShort2,
    UShort4,
    UShort2Norm,
    UShort4Norm,
    URgb10A2Norm,
}

/// One element of a vertex declaration.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct VertexElement {
    /// Index of the stream the data is fetched from.
    pub stream: u8,
    /// Generic vertex attribute index fed by this element.
    pub attribute: u8,
    pub offset: u32,
    pub stride: u32,
    /// Zero for per-vertex data, otherwise the instancing rate.
    pub divisor: u32,
    pub format: Format,
}

/// Primitive topology of a draw call.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum PrimitiveType {
    PointList,
    LineList,
    TriangleList,
    TriangleStrip,
}

impl PrimitiveType {
    /// Number of vertices (or indices) consumed by `count` primitives.
    pub fn element_count(&self, count: u32) -> u32 {
        match *self {
            PrimitiveType::PointList => count,
            PrimitiveType::LineList => count * 2,
            PrimitiveType::TriangleList => count * 3,
            PrimitiveType::TriangleStrip => count + 2,
        }
    }
}

/// How buffer contents change over their lifetime.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum BufferAccess {
    Static,
    Dynamic,
    Stream,
}

/// What the CPU does with a buffer.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum BufferUsage {
    Draw,
    Read,
    Copy,
}

/// CPU access requested when locking a buffer.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum LockMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
    WriteNoOverwrite,
}

fn bits2(v: (f32, f32)) -> (u32, u32) {
    (v.0.to_bits(), v.1.to_bits())
}

fn bits4(v: [f32; 4]) -> [u32; 4] {
    [v[0].to_bits(), v[1].to_bits(), v[2].to_bits(), v[3].to_bits()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of<T: std::hash::Hash>(v: &T) -> u64 {
        let mut h = DefaultHasher::new();
        v.hash(&mut h);
        h.finish()
    }

    #[test]
    fn sampler_desc_float_identity() {
        let a = SamplerDesc::default();
        let mut b = SamplerDesc::default();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        b.lod_bias = 0.5;
        assert_ne!(a, b);
    }

    #[test]
    fn negative_zero_offset_is_distinct() {
        let a = RasterizerDesc { depth_offset_factor: 0.0, ..Default::default() };
        let b = RasterizerDesc { depth_offset_factor: -0.0, ..Default::default() };
        assert_ne!(a, b);
    }

    #[test]
    fn default_target_does_not_blend() {
        assert!(!TargetBlendDesc::default().blends());
        let add = TargetBlendDesc {
            color_src: Factor::SourceAlpha,
            color_dst: Factor::OneMinusSourceAlpha,
            ..Default::default()
        };
        assert!(add.blends());
    }

    #[test]
    fn primitive_element_counts() {
        assert_eq!(PrimitiveType::TriangleList.element_count(5), 15);
        assert_eq!(PrimitiveType::TriangleStrip.element_count(5), 7);
        assert_eq!(PrimitiveType::LineList.element_count(5), 10);
        assert_eq!(PrimitiveType::PointList.element_count(5), 5);
    }
}
