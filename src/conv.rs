//! Translation of the API-agnostic descriptors into native GL values.
//! Everything here is a pure table; state objects are translated once at
//! creation and the reconciler only ever compares the translated data.

use crate::state::*;

pub fn fill_mode(mode: FillMode) -> u32 {
    match mode {
        FillMode::Point => glow::POINT,
        FillMode::Wireframe => glow::LINE,
        FillMode::Solid => glow::FILL,
    }
}

/// The front face is fixed as counter-clockwise at device init, so culling
/// clockwise polygons means culling the back face.
pub fn cull_face(mode: CullMode) -> Option<u32> {
    match mode {
        CullMode::None => None,
        CullMode::Clockwise => Some(glow::BACK),
        CullMode::CounterClockwise => Some(glow::FRONT),
    }
}

pub fn comparison(cmp: Comparison) -> u32 {
    match cmp {
        Comparison::Never => glow::NEVER,
        Comparison::Less => glow::LESS,
        Comparison::LessEqual => glow::LEQUAL,
        Comparison::Equal => glow::EQUAL,
        Comparison::GreaterEqual => glow::GEQUAL,
        Comparison::Greater => glow::GREATER,
        Comparison::NotEqual => glow::NOTEQUAL,
        Comparison::Always => glow::ALWAYS,
    }
}

pub fn stencil_op(op: StencilOp) -> u32 {
    match op {
        StencilOp::Keep => glow::KEEP,
        StencilOp::Zero => glow::ZERO,
        StencilOp::Replace => glow::REPLACE,
        StencilOp::IncrementClamp => glow::INCR,
        StencilOp::DecrementClamp => glow::DECR,
        StencilOp::IncrementWrap => glow::INCR_WRAP,
        StencilOp::DecrementWrap => glow::DECR_WRAP,
        StencilOp::Invert => glow::INVERT,
    }
}

pub fn equation(eq: Equation) -> u32 {
    match eq {
        Equation::Add => glow::FUNC_ADD,
        Equation::Sub => glow::FUNC_SUBTRACT,
        Equation::RevSub => glow::FUNC_REVERSE_SUBTRACT,
        Equation::Min => glow::MIN,
        Equation::Max => glow::MAX,
    }
}

pub fn factor(f: Factor) -> u32 {
    match f {
        Factor::Zero => glow::ZERO,
        Factor::One => glow::ONE,
        Factor::SourceColor => glow::SRC_COLOR,
        Factor::OneMinusSourceColor => glow::ONE_MINUS_SRC_COLOR,
        Factor::SourceAlpha => glow::SRC_ALPHA,
        Factor::OneMinusSourceAlpha => glow::ONE_MINUS_SRC_ALPHA,
        Factor::DestColor => glow::DST_COLOR,
        Factor::OneMinusDestColor => glow::ONE_MINUS_DST_COLOR,
        Factor::DestAlpha => glow::DST_ALPHA,
        Factor::OneMinusDestAlpha => glow::ONE_MINUS_DST_ALPHA,
        Factor::ConstantColor => glow::CONSTANT_COLOR,
        Factor::OneMinusConstantColor => glow::ONE_MINUS_CONSTANT_COLOR,
    }
}

pub fn wrap_mode(wrap: WrapMode) -> i32 {
    (match wrap {
        WrapMode::Wrap => glow::REPEAT,
        WrapMode::Clamp => glow::CLAMP_TO_EDGE,
        WrapMode::Mirror => glow::MIRRORED_REPEAT,
        WrapMode::Border => glow::CLAMP_TO_BORDER,
    }) as i32
}

/// Returns the (min, mag) filter pair.
pub fn filter_method(filter: FilterMethod) -> (i32, i32) {
    let (min, mag) = match filter {
        FilterMethod::Point => (glow::NEAREST_MIPMAP_NEAREST, glow::NEAREST),
        FilterMethod::Bilinear => (glow::LINEAR_MIPMAP_NEAREST, glow::LINEAR),
        FilterMethod::Trilinear => (glow::LINEAR_MIPMAP_LINEAR, glow::LINEAR),
    };
    (min as i32, mag as i32)
}

pub fn buffer_usage(access: BufferAccess, usage: BufferUsage) -> u32 {
    match (access, usage) {
        (BufferAccess::Static, BufferUsage::Draw) => glow::STATIC_DRAW,
        (BufferAccess::Static, BufferUsage::Read) => glow::STATIC_READ,
        (BufferAccess::Static, BufferUsage::Copy) => glow::STATIC_COPY,
        (BufferAccess::Dynamic, BufferUsage::Draw) => glow::DYNAMIC_DRAW,
        (BufferAccess::Dynamic, BufferUsage::Read) => glow::DYNAMIC_READ,
        (BufferAccess::Dynamic, BufferUsage::Copy) => glow::DYNAMIC_COPY,
        (BufferAccess::Stream, BufferUsage::Draw) => glow::STREAM_DRAW,
        (BufferAccess::Stream, BufferUsage::Read) => glow::STREAM_READ,
        (BufferAccess::Stream, BufferUsage::Copy) => glow::STREAM_COPY,
    }
}

pub fn lock_access(mode: LockMode) -> u32 {
    match mode {
        LockMode::ReadOnly => glow::MAP_READ_BIT,
        LockMode::WriteOnly => glow::MAP_WRITE_BIT | glow::MAP_INVALIDATE_RANGE_BIT,
        LockMode::ReadWrite => glow::MAP_READ_BIT | glow::MAP_WRITE_BIT,
        LockMode::WriteNoOverwrite => glow::MAP_WRITE_BIT | glow::MAP_UNSYNCHRONIZED_BIT,
    }
}

pub fn primitive(prim: PrimitiveType) -> u32 {
    match prim {
        PrimitiveType::PointList => glow::POINTS,
        PrimitiveType::LineList => glow::LINES,
        PrimitiveType::TriangleList => glow::TRIANGLES,
        PrimitiveType::TriangleStrip => glow::TRIANGLE_STRIP,
    }
}

/// Native layout of a vertex element: GL component type, component count,
/// normalization, and whether the attribute stays integer in the shader.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct FormatDesc {
    pub ty: u32,
    pub count: i32,
    pub normalized: bool,
    pub integer: bool,
}

pub fn vertex_format(format: Format) -> FormatDesc {
    let (ty, count, normalized, integer) = match format {
        Format::Float1 => (glow::FLOAT, 1, false, false),
        Format::Float2 => (glow::FLOAT, 2, false, false),
        Format::Float3 => (glow::FLOAT, 3, false, false),
        Format::Float4 => (glow::FLOAT, 4, false, false),
        Format::PackedNormal => (glow::UNSIGNED_BYTE, 4, true, false),
        Format::UByte4 => (glow::UNSIGNED_BYTE, 4, false, true),
        Format::UByte4Norm => (glow::UNSIGNED_BYTE, 4, true, false),
        Format::Color => (glow::UNSIGNED_BYTE, 4, true, false),
        Format::Short2 => (glow::SHORT, 2, false, true),
        Format::Short4 => (glow::SHORT, 4, false, true),
        Format::Short2Norm => (glow::SHORT, 2, true, false),
        Format::Short4Norm => (glow::SHORT, 4, true, false),
        Format::Half2 => (glow::HALF_FLOAT, 2, false, false),
        Format::Half4 => (glow::HALF_FLOAT, 4, false, false),
        Format::UShort2 => (glow::UNSIGNED_SHORT, 2, false, true),
        Format::UShort4 => (glow::UNSIGNED_SHORT, 4, false, true),
        Format::UShort2Norm => (glow::UNSIGNED_SHORT, 2, true, false),
        Format::UShort4Norm => (glow::UNSIGNED_SHORT, 4, true, false),
        Format::URgb10A2Norm => (glow::UNSIGNED_INT_2_10_10_10_REV, 4, true, false),
    };
    FormatDesc {
        ty,
        count,
        normalized,
        integer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cull_translation() {
        assert_eq!(cull_face(CullMode::None), None);
        assert_eq!(cull_face(CullMode::Clockwise), Some(glow::BACK));
        assert_eq!(cull_face(CullMode::CounterClockwise), Some(glow::FRONT));
    }

    #[test]
    fn usage_translation() {
        assert_eq!(
            buffer_usage(BufferAccess::Static, BufferUsage::Draw),
            glow::STATIC_DRAW
        );
        assert_eq!(
            buffer_usage(BufferAccess::Stream, BufferUsage::Copy),
            glow::STREAM_COPY
        );
    }

    #[test]
    fn color_format_is_normalized_bytes() {
        let desc = vertex_format(Format::Color);
        assert_eq!(desc.ty, glow::UNSIGNED_BYTE);
        assert_eq!(desc.count, 4);
        assert!(desc.normalized);
        assert!(!desc.integer);
    }

    #[test]
    fn ubyte4_takes_integer_path() {
        let desc = vertex_format(Format::UByte4);
        assert!(desc.integer);
        assert!(!desc.normalized);
    }

    #[test]
    fn packed_normal_is_normalized_bytes() {
        let desc = vertex_format(Format::PackedNormal);
        assert_eq!(desc.ty, glow::UNSIGNED_BYTE);
        assert_eq!(desc.count, 4);
        assert!(desc.normalized);
        assert!(!desc.integer);
    }

    #[test]
    fn plain_shorts_stay_integer() {
        let desc = vertex_format(Format::Short2);
        assert_eq!(desc.ty, glow::SHORT);
        assert!(desc.integer);
        assert!(!desc.normalized);
        assert!(vertex_format(Format::Short4).integer);
        // the normalized variants convert to float instead
        assert!(!vertex_format(Format::Short2Norm).integer);
    }

    #[test]
    fn point_filter_keeps_nearest_mipmaps() {
        let (min, mag) = filter_method(FilterMethod::Point);
        assert_eq!(min, glow::NEAREST_MIPMAP_NEAREST as i32);
        assert_eq!(mag, glow::NEAREST as i32);
    }

    #[test]
    fn half_formats_convert_to_float() {
        let desc = vertex_format(Format::Half2);
        assert_eq!(desc.ty, glow::HALF_FLOAT);
        assert_eq!(desc.count, 2);
        assert!(!desc.integer);
    }
}
