//! Viewport management. Actual window creation and GL context plumbing are
//! the embedder's business; they reach the device only through the two
//! traits below, keyed by a raw window handle.

use std::cell::Cell;
use std::rc::Rc;

use raw_window_handle::RawWindowHandle;

use crate::native::ResourceType;
use crate::Share;

pub type ViewportRef = Rc<Viewport>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CreationError {
    SurfaceUnsupported,
    Platform(String),
}

/// A display mode. Orders lexicographically by width, height, then
/// refresh rate.
#[derive(Copy, Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
    pub refresh_rate: u32,
}

/// One presentable GL surface, created by the platform for a window.
pub trait SurfaceContext {
    fn make_current(&self);
    fn swap_buffers(&self, vsync: bool);
    fn resize(&self, width: u32, height: u32, fullscreen: bool, was_fullscreen: bool);
}

/// The platform half of window system integration.
pub trait PlatformContext {
    fn create_surface(
        &self,
        window: RawWindowHandle,
    ) -> Result<Box<dyn SurfaceContext>, CreationError>;
    /// Undoes any display mode change made for a fullscreen surface.
    fn restore_desktop_display_mode(&self);
    /// Closest supported display mode to the requested extent.
    fn supported_resolution(&self, width: u32, height: u32) -> (u32, u32);
    fn available_resolutions(&self, ignore_refresh_rate: bool) -> Vec<Resolution>;
}

/// A swap chain bound to one window. Registered with the device for its
/// lifetime; dropping the last reference releases the surface.
pub struct Viewport {
    share: Rc<Share>,
    serial: usize,
    surface: Box<dyn SurfaceContext>,
    size: Cell<(u32, u32)>,
    fullscreen: Cell<bool>,
}

impl Viewport {
    pub(crate) fn new(
        share: Rc<Share>,
        window: RawWindowHandle,
        width: u32,
        height: u32,
        fullscreen: bool,
    ) -> Result<ViewportRef, CreationError> {
        let surface = share.platform.create_surface(window)?;
        surface.make_current();
        let serial = share.next_viewport_serial.get();
        share.next_viewport_serial.set(serial + 1);
        share.viewports.borrow_mut().push(serial);
        info!(
            "Created viewport {}: {}x{}{}",
            serial,
            width,
            height,
            if fullscreen { " fullscreen" } else { "" }
        );
        Ok(Rc::new(Viewport {
            share,
            serial,
            surface,
            size: Cell::new((width, height)),
            fullscreen: Cell::new(fullscreen),
        }))
    }

    pub fn serial(&self) -> usize {
        self.serial
    }

    pub fn size(&self) -> (u32, u32) {
        self.size.get()
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen.get()
    }

    pub fn resource_type(&self) -> ResourceType {
        ResourceType::Viewport
    }

    pub(crate) fn make_current(&self) {
        self.surface.make_current();
    }

    pub(crate) fn swap_buffers(&self, vsync: bool) {
        self.surface.swap_buffers(vsync);
    }

    /// Resizes the surface. A request matching the current extent and
    /// fullscreen flag exactly is a no-op.
    pub fn resize(&self, width: u32, height: u32, fullscreen: bool) {
        if self.size.get() == (width, height) && self.fullscreen.get() == fullscreen {
            return;
        }
        self.surface
            .resize(width, height, fullscreen, self.fullscreen.get());
        self.size.set((width, height));
        self.fullscreen.set(fullscreen);
    }
}

impl Drop for Viewport {
    fn drop(&mut self) {
        // leave fullscreen before the surface goes away; the surface box
        // itself drops after this body runs
        if self.fullscreen.get() {
            self.share.platform.restore_desktop_display_mode();
        }
        if self.share.active_surface.get() == self.serial {
            self.share.active_surface.set(0);
        }
        self.share.viewports.borrow_mut().retain(|&s| s != self.serial);
    }
}
