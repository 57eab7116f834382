//! OpenGL rendering hardware interface with redundant-state elimination.
//!
//! The central object is [`Device`]: state-set calls record intent into a
//! pending snapshot, and the actual GL state is reconciled lazily at draw
//! time, so redundant driver traffic is dropped on the floor. State objects
//! (rasterizer, depth-stencil, blend, sampler) are immutable, deduplicated
//! by their initializer value and shared via `Rc`.
//!
//! Window system integration and GL context creation stay outside; the
//! crate talks to them through the [`window::PlatformContext`] and
//! [`window::SurfaceContext`] traits, and to the driver through [`gl::Gl`].

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate log;

use std::cell::{Cell, RefCell};

pub use self::device::{Device, Mapping};
pub use self::info::{Info, Version};
pub use self::native::{
    BlendStateRef, BufferRef, DepthStencilStateRef, ProgramRef, RasterizerStateRef, SamplerStateRef,
    VertexDeclarationRef,
};
pub use self::shade::UniformHandle;
pub use self::window::{PlatformContext, Resolution, SurfaceContext, Viewport, ViewportRef};

pub mod conv;
pub mod device;
pub mod gl;
pub mod info;
pub mod native;
pub mod shade;
pub mod state;
pub mod window;

/// Number of simultaneously bound render targets.
pub const MAX_RENDER_TARGETS: usize = 8;
/// Number of texture units with an assignable sampler state.
pub const MAX_TEXTURE_UNITS: usize = 8;
/// Number of vertex streams addressable by a declaration.
pub const MAX_VERTEX_STREAMS: usize = 16;
/// Number of generic vertex attributes.
pub const MAX_VERTEX_ATTRIBUTES: usize = 16;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Error {
    NoError,
    InvalidEnum,
    InvalidValue,
    InvalidOperation,
    InvalidFramebufferOperation,
    OutOfMemory,
    UnknownError,
}

impl Error {
    pub fn from_error_code(error_code: u32) -> Error {
        match error_code {
            glow::NO_ERROR => Error::NoError,
            glow::INVALID_ENUM => Error::InvalidEnum,
            glow::INVALID_VALUE => Error::InvalidValue,
            glow::INVALID_OPERATION => Error::InvalidOperation,
            glow::INVALID_FRAMEBUFFER_OPERATION => Error::InvalidFramebufferOperation,
            glow::OUT_OF_MEMORY => Error::OutOfMemory,
            _ => Error::UnknownError,
        }
    }
}

/// Internal struct of data shared between the device and the resources it
/// creates. Resources keep it alive through an `Rc`, which lets buffer
/// destructors reach the bind caches and viewport destructors reach the
/// platform context without a back pointer to the device itself.
pub struct Share {
    pub(crate) context: Box<dyn gl::Gl>,
    pub(crate) platform: Box<dyn window::PlatformContext>,
    pub(crate) info: Info,
    pub(crate) bind: RefCell<device::BindCache>,
    pub(crate) viewports: RefCell<Vec<usize>>,
    pub(crate) next_viewport_serial: Cell<usize>,
    /// Serial of the viewport whose surface is current, zero for none.
    pub(crate) active_surface: Cell<usize>,
}

impl Share {
    /// Fails during a debug build if the implementation's error flag was set.
    pub(crate) fn check(&self) -> Result<(), Error> {
        if cfg!(debug_assertions) {
            let err = Error::from_error_code(self.context.get_error());
            if err != Error::NoError {
                return Err(err);
            }
        }
        Ok(())
    }
}
