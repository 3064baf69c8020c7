//! Backend seam between the presentation engine and a graphics API
//!
//! The engine owns everything a backend hands out (swap chain, staging
//! buffers) and drives them through this trait; the backend owns only the
//! device-level objects. Two implementations ship with the crate: the Vulkan
//! backend and the in-memory loopback backend used by tests.

use std::ptr::NonNull;
use thiserror::Error;

use super::types::{PixelFormat, SurfaceSize};

/// Backend-agnostic device failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The surface was resized or reconfigured behind the swap chain's back
    #[error("Swap chain out of date")]
    OutOfDate,

    /// The window surface no longer exists
    #[error("Surface lost")]
    SurfaceLost,

    /// The device was lost (driver reset, GPU removed)
    #[error("Device lost")]
    DeviceLost,

    /// Host or device memory exhausted
    #[error("Out of memory")]
    OutOfMemory,

    /// Capability the surface or device does not offer
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Any other backend failure
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

/// CPU-addressable memory of a mapped staging buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedRegion {
    ptr: NonNull<u8>,
    len: usize,
    stride: usize,
}

impl MappedRegion {
    /// Describe a mapped region
    ///
    /// # Safety
    /// `ptr` must be valid for reads and writes of `len` bytes, aligned to 4
    /// bytes, and not aliased by anything else until the buffer it belongs to
    /// is unmapped or dropped. `stride` must be a multiple of 4.
    pub unsafe fn new(ptr: NonNull<u8>, len: usize, stride: usize) -> Self {
        debug_assert_eq!(ptr.as_ptr() as usize % 4, 0);
        debug_assert_eq!(stride % 4, 0);
        Self { ptr, len, stride }
    }

    /// Base address of the first row
    pub const fn ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Size of the region in bytes
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-length region
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes between the starts of consecutive rows
    pub const fn stride(&self) -> usize {
        self.stride
    }
}

/// Graphics device operations needed to run a CPU-written swap chain
///
/// Indices passed to [`copy_to_swap_image`](Self::copy_to_swap_image) and
/// [`present`](Self::present) are the engine's buffer indices in `0..K`.
/// Backends whose presentation API decides image order itself (Vulkan
/// acquire) use the index to pick per-slot synchronisation objects.
pub trait PresentDevice {
    /// The presentable images, owned by the engine
    type SwapChain;
    /// One CPU-writable buffer, owned by the engine
    type StagingBuffer;

    /// Longest swap chain the platform accepts
    fn max_swap_chain_length(&self) -> u32;

    /// Create a swap chain of `image_count` images at `size`
    fn create_swap_chain(
        &mut self,
        size: SurfaceSize,
        image_count: u32,
        format: PixelFormat,
    ) -> DeviceResult<Self::SwapChain>;

    /// Resize the images of an existing swap chain in place
    fn resize_swap_chain(
        &mut self,
        swap_chain: &mut Self::SwapChain,
        size: SurfaceSize,
    ) -> DeviceResult<()>;

    /// Allocate a staging buffer covering `size` pixels
    fn create_staging_buffer(
        &mut self,
        size: SurfaceSize,
        format: PixelFormat,
    ) -> DeviceResult<Self::StagingBuffer>;

    /// Make a staging buffer CPU-writable
    fn map_staging_buffer(
        &mut self,
        buffer: &mut Self::StagingBuffer,
    ) -> DeviceResult<MappedRegion>;

    /// Release CPU access so the buffer contents become visible to copies
    fn unmap_staging_buffer(&mut self, buffer: &mut Self::StagingBuffer);

    /// Copy the full staging buffer into swap image `image_index`
    fn copy_to_swap_image(
        &mut self,
        swap_chain: &mut Self::SwapChain,
        image_index: usize,
        buffer: &Self::StagingBuffer,
    ) -> DeviceResult<()>;

    /// Display swap image `image_index`
    fn present(&mut self, swap_chain: &mut Self::SwapChain, image_index: usize) -> DeviceResult<()>;
}
