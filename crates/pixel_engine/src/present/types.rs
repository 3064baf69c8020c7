//! Plain value types shared by the presentation engine and its backends

use serde::{Deserialize, Serialize};
use std::fmt;

slotmap::new_key_type! {
    /// Identity of a presentable surface (one per window)
    pub struct SurfaceId;
}

/// Pixel dimensions of a surface or buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SurfaceSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl SurfaceSize {
    /// Create a new size
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either side is zero (minimised window, not yet laid out)
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Fixed 32-bit pixel format used by every buffer of an engine
///
/// With `Bgra8Unorm` a little-endian `u32` of `0x00RRGGBB` lands in memory as
/// `BB GG RR 00`, so colors written as hex literals come out as expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Blue, green, red, alpha; one byte each
    #[default]
    Bgra8Unorm,
    /// Red, green, blue, alpha; one byte each
    Rgba8Unorm,
}

impl PixelFormat {
    /// Size of one pixel in bytes
    pub const fn bytes_per_pixel(self) -> usize {
        4
    }
}

/// Lifecycle state of a [`PresentationEngine`](super::PresentationEngine)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// Constructed but no usable device; every operation is a no-op
    Uninitialized,
    /// Device, swap chain and staging buffers exist; one buffer is mapped
    DeviceReady,
    /// Transient while buffers are rebuilt for a new surface size
    Resizing,
    /// Torn down; terminal
    Destroyed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::DeviceReady => "device ready",
            Self::Resizing => "resizing",
            Self::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// A window surface as seen by the engine: an identity and a pixel size
///
/// The engine only reads from it. It is passed in at construction and on
/// every resize rather than stored, so the window can own the engine.
pub trait Surface {
    /// Identity of the surface
    fn id(&self) -> SurfaceId;

    /// Current drawable size in pixels
    fn pixel_size(&self) -> SurfaceSize;
}

impl<T: Surface + ?Sized> Surface for &T {
    fn id(&self) -> SurfaceId {
        (**self).id()
    }

    fn pixel_size(&self) -> SurfaceSize {
        (**self).pixel_size()
    }
}
