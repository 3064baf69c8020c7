//! In-memory presentation backend
//!
//! Implements [`PresentDevice`] without a GPU: staging buffers and swap images
//! are plain host allocations and "displaying" an image copies it into a
//! shared [`LoopbackProbe`] that can be read back. Used by the test suite and
//! for headless runs. Staging rows are padded to [`LoopbackConfig::row_alignment`]
//! so callers that assume `stride == width * 4` break here the same way they
//! would on real hardware.

use std::cell::{Cell, RefCell};
use std::ptr::NonNull;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::device::{DeviceError, DeviceResult, MappedRegion, PresentDevice};
use super::types::{PixelFormat, Surface, SurfaceId, SurfaceSize};

/// DXGI's limit, used as the loopback platform maximum
pub const DEFAULT_MAX_SWAP_CHAIN_LENGTH: u32 = 16;

/// Loopback device settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopbackConfig {
    /// Longest swap chain accepted; longer requests get clamped by the engine
    pub max_swap_chain_length: u32,
    /// Staging row pitch alignment in bytes (rounded up to a multiple of 4)
    pub row_alignment: usize,
    /// Make `open` fail with this error
    pub fail_open: Option<DeviceError>,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            max_swap_chain_length: DEFAULT_MAX_SWAP_CHAIN_LENGTH,
            row_alignment: 256,
            fail_open: None,
        }
    }
}

/// Something the loopback device did, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopbackEvent {
    /// Staging buffer `id` created
    StagingCreated(usize),
    /// Staging buffer `id` mapped
    Mapped(usize),
    /// Staging buffer `id` unmapped
    Unmapped(usize),
    /// Staging buffer `id` copied into swap image `index`
    Copied {
        /// Staging buffer id
        buffer: usize,
        /// Swap image index
        index: usize,
    },
    /// Swap image `index` displayed
    Presented(usize),
    /// Swap chain resized
    SwapChainResized(SurfaceSize),
    /// Staging buffer `id` released
    StagingDropped(usize),
    /// Swap chain released
    SwapChainDropped,
    /// Device released
    DeviceDropped,
}

/// An image as it reached the display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedFrame {
    /// Swap image index it came from
    pub index: usize,
    /// Dimensions
    pub size: SurfaceSize,
    /// Tightly packed pixels, `size.width` per row
    pub pixels: Vec<u32>,
}

impl PresentedFrame {
    /// Pixel at `(x, y)`, if inside the frame
    pub fn pixel_at(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        self.pixels.get(y as usize * self.size.width as usize + x as usize).copied()
    }
}

#[derive(Debug, Default)]
struct ProbeState {
    events: Vec<LoopbackEvent>,
    last_frame: Option<PresentedFrame>,
    presented: usize,
    next_buffer_id: usize,
    staging_live: usize,
    staging_created: usize,
    swap_chain_resizes: usize,
    pending_present_failures: usize,
    fail_maps: bool,
    fail_next_resize: bool,
    fail_staging_allocations: bool,
}

/// Shared handle for reading back what the loopback device displayed and for
/// injecting failures
#[derive(Debug, Clone, Default)]
pub struct LoopbackProbe {
    state: Rc<RefCell<ProbeState>>,
}

impl LoopbackProbe {
    /// Fresh probe with no history
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, event: LoopbackEvent) {
        self.state.borrow_mut().events.push(event);
    }

    /// Number of successful presents
    pub fn presented_count(&self) -> usize {
        self.state.borrow().presented
    }

    /// The most recently displayed frame
    pub fn last_frame(&self) -> Option<PresentedFrame> {
        self.state.borrow().last_frame.clone()
    }

    /// Pixel of the most recently displayed frame
    pub fn pixel_at(&self, x: u32, y: u32) -> Option<u32> {
        self.state.borrow().last_frame.as_ref()?.pixel_at(x, y)
    }

    /// Everything recorded so far
    pub fn events(&self) -> Vec<LoopbackEvent> {
        self.state.borrow().events.clone()
    }

    /// Forget recorded events
    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    /// Staging buffers currently allocated
    pub fn staging_live(&self) -> usize {
        self.state.borrow().staging_live
    }

    /// Staging buffers allocated over the probe's lifetime
    pub fn staging_created(&self) -> usize {
        self.state.borrow().staging_created
    }

    /// Swap chain resizes performed
    pub fn swap_chain_resizes(&self) -> usize {
        self.state.borrow().swap_chain_resizes
    }

    /// Make the next `count` presents fail with [`DeviceError::SurfaceLost`]
    pub fn fail_next_presents(&self, count: usize) {
        self.state.borrow_mut().pending_present_failures = count;
    }

    /// Make every map fail with [`DeviceError::OutOfMemory`] while set
    pub fn fail_maps(&self, fail: bool) {
        self.state.borrow_mut().fail_maps = fail;
    }

    /// Make the next swap chain resize fail with [`DeviceError::OutOfDate`]
    pub fn fail_next_resize(&self) {
        self.state.borrow_mut().fail_next_resize = true;
    }

    /// Make staging allocations fail with [`DeviceError::OutOfMemory`] while set
    pub fn fail_staging_allocations(&self, fail: bool) {
        self.state.borrow_mut().fail_staging_allocations = fail;
    }
}

/// Host-memory swap chain
pub struct LoopbackSwapChain {
    size: SurfaceSize,
    images: Vec<Vec<u32>>,
    probe: LoopbackProbe,
}

impl LoopbackSwapChain {
    /// Number of images
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Image dimensions
    pub const fn size(&self) -> SurfaceSize {
        self.size
    }
}

impl Drop for LoopbackSwapChain {
    fn drop(&mut self) {
        self.probe.record(LoopbackEvent::SwapChainDropped);
    }
}

/// Host-memory staging buffer with padded rows
pub struct LoopbackStagingBuffer {
    id: usize,
    size: SurfaceSize,
    stride: usize,
    // u32 storage keeps the mapping 4-byte aligned
    words: Vec<u32>,
    mapped: bool,
    probe: LoopbackProbe,
}

impl LoopbackStagingBuffer {
    /// Identifier used in [`LoopbackEvent`]s
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Row pitch in bytes
    pub const fn stride(&self) -> usize {
        self.stride
    }
}

impl Drop for LoopbackStagingBuffer {
    fn drop(&mut self) {
        let mut state = self.probe.state.borrow_mut();
        state.staging_live -= 1;
        state.events.push(LoopbackEvent::StagingDropped(self.id));
    }
}

/// In-memory [`PresentDevice`]
pub struct LoopbackDevice {
    config: LoopbackConfig,
    probe: LoopbackProbe,
}

impl LoopbackDevice {
    /// Open a device reporting to `probe`
    pub fn open(config: LoopbackConfig, probe: &LoopbackProbe) -> DeviceResult<Self> {
        if let Some(err) = config.fail_open.clone() {
            return Err(err);
        }
        Ok(Self {
            config,
            probe: probe.clone(),
        })
    }

    /// The probe this device reports to
    pub const fn probe(&self) -> &LoopbackProbe {
        &self.probe
    }

    fn stride_for(&self, width: u32) -> usize {
        let alignment = self.config.row_alignment.max(1).next_multiple_of(4);
        (width as usize * 4).next_multiple_of(alignment)
    }
}

impl Drop for LoopbackDevice {
    fn drop(&mut self) {
        self.probe.record(LoopbackEvent::DeviceDropped);
    }
}

impl PresentDevice for LoopbackDevice {
    type SwapChain = LoopbackSwapChain;
    type StagingBuffer = LoopbackStagingBuffer;

    fn max_swap_chain_length(&self) -> u32 {
        self.config.max_swap_chain_length
    }

    fn create_swap_chain(
        &mut self,
        size: SurfaceSize,
        image_count: u32,
        _format: PixelFormat,
    ) -> DeviceResult<Self::SwapChain> {
        if image_count > self.config.max_swap_chain_length {
            return Err(DeviceError::Unsupported(format!(
                "{image_count} swap chain images (max {})",
                self.config.max_swap_chain_length
            )));
        }
        Ok(LoopbackSwapChain {
            size,
            images: vec![vec![0; size.pixel_count()]; image_count as usize],
            probe: self.probe.clone(),
        })
    }

    fn resize_swap_chain(&mut self, swap_chain: &mut Self::SwapChain, size: SurfaceSize) -> DeviceResult<()> {
        {
            let mut state = self.probe.state.borrow_mut();
            if std::mem::take(&mut state.fail_next_resize) {
                return Err(DeviceError::OutOfDate);
            }
            state.swap_chain_resizes += 1;
            state.events.push(LoopbackEvent::SwapChainResized(size));
        }
        swap_chain.size = size;
        for image in &mut swap_chain.images {
            *image = vec![0; size.pixel_count()];
        }
        Ok(())
    }

    fn create_staging_buffer(&mut self, size: SurfaceSize, _format: PixelFormat) -> DeviceResult<Self::StagingBuffer> {
        let stride = self.stride_for(size.width);
        let id = {
            let mut state = self.probe.state.borrow_mut();
            if state.fail_staging_allocations {
                return Err(DeviceError::OutOfMemory);
            }
            let id = state.next_buffer_id;
            state.next_buffer_id += 1;
            state.staging_live += 1;
            state.staging_created += 1;
            state.events.push(LoopbackEvent::StagingCreated(id));
            id
        };

        Ok(LoopbackStagingBuffer {
            id,
            size,
            stride,
            words: vec![0; stride / 4 * size.height as usize],
            mapped: false,
            probe: self.probe.clone(),
        })
    }

    fn map_staging_buffer(&mut self, buffer: &mut Self::StagingBuffer) -> DeviceResult<MappedRegion> {
        if self.probe.state.borrow().fail_maps {
            return Err(DeviceError::OutOfMemory);
        }
        if buffer.mapped {
            return Err(DeviceError::Backend(format!("staging buffer {} already mapped", buffer.id)));
        }

        let len = buffer.words.len() * 4;
        let ptr = NonNull::new(buffer.words.as_mut_ptr().cast::<u8>())
            .ok_or_else(|| DeviceError::Backend("empty staging buffer".to_string()))?;
        buffer.mapped = true;
        self.probe.record(LoopbackEvent::Mapped(buffer.id));

        // SAFETY: `words` is never reallocated after creation, is u32-aligned
        // and is only touched through this region until it is unmapped.
        Ok(unsafe { MappedRegion::new(ptr, len, buffer.stride) })
    }

    fn unmap_staging_buffer(&mut self, buffer: &mut Self::StagingBuffer) {
        if std::mem::take(&mut buffer.mapped) {
            self.probe.record(LoopbackEvent::Unmapped(buffer.id));
        }
    }

    fn copy_to_swap_image(
        &mut self,
        swap_chain: &mut Self::SwapChain,
        image_index: usize,
        buffer: &Self::StagingBuffer,
    ) -> DeviceResult<()> {
        if buffer.mapped {
            return Err(DeviceError::Backend(format!("staging buffer {} copied while mapped", buffer.id)));
        }
        if buffer.size != swap_chain.size {
            return Err(DeviceError::Backend(format!(
                "staging buffer {} is {}, swap chain is {}",
                buffer.id, buffer.size, swap_chain.size
            )));
        }

        let width = swap_chain.size.width as usize;
        let row_words = buffer.stride / 4;
        let image = swap_chain
            .images
            .get_mut(image_index)
            .ok_or_else(|| DeviceError::Backend(format!("no swap image {image_index}")))?;
        for (dst, src) in image.chunks_exact_mut(width).zip(buffer.words.chunks(row_words)) {
            dst.copy_from_slice(&src[..width]);
        }

        self.probe.record(LoopbackEvent::Copied {
            buffer: buffer.id,
            index: image_index,
        });
        Ok(())
    }

    fn present(&mut self, swap_chain: &mut Self::SwapChain, image_index: usize) -> DeviceResult<()> {
        let mut state = self.probe.state.borrow_mut();
        if state.pending_present_failures > 0 {
            state.pending_present_failures -= 1;
            return Err(DeviceError::SurfaceLost);
        }

        let pixels = swap_chain
            .images
            .get(image_index)
            .ok_or_else(|| DeviceError::Backend(format!("no swap image {image_index}")))?
            .clone();
        state.last_frame = Some(PresentedFrame {
            index: image_index,
            size: swap_chain.size,
            pixels,
        });
        state.presented += 1;
        state.events.push(LoopbackEvent::Presented(image_index));
        Ok(())
    }
}

static NEXT_SURFACE: AtomicU64 = AtomicU64::new(1);

/// Window-less surface with a settable size
#[derive(Debug)]
pub struct LoopbackSurface {
    id: SurfaceId,
    size: Cell<SurfaceSize>,
}

impl LoopbackSurface {
    /// New surface of `width x height` pixels with a unique id
    pub fn new(width: u32, height: u32) -> Self {
        let raw = NEXT_SURFACE.fetch_add(1, Ordering::Relaxed);
        Self {
            id: slotmap::KeyData::from_ffi(raw).into(),
            size: Cell::new(SurfaceSize::new(width, height)),
        }
    }

    /// Change the reported size, as a window resize would
    pub fn set_size(&self, width: u32, height: u32) {
        self.size.set(SurfaceSize::new(width, height));
    }
}

impl Surface for LoopbackSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn pixel_size(&self) -> SurfaceSize {
        self.size.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> (LoopbackDevice, LoopbackProbe) {
        let probe = LoopbackProbe::new();
        let device = LoopbackDevice::open(LoopbackConfig::default(), &probe).expect("loopback opens");
        (device, probe)
    }

    #[test]
    fn test_stride_is_padded() {
        let (mut device, _probe) = device();
        let buffer = device
            .create_staging_buffer(SurfaceSize::new(400, 4), PixelFormat::default())
            .expect("allocation");
        // 1600 bytes rounded up to 256
        assert_eq!(buffer.stride(), 1792);
    }

    #[test]
    fn test_copy_strips_row_padding() {
        let (mut device, probe) = device();
        let size = SurfaceSize::new(3, 2);
        let mut swap_chain = device.create_swap_chain(size, 2, PixelFormat::default()).expect("swap chain");
        let mut buffer = device.create_staging_buffer(size, PixelFormat::default()).expect("staging");

        let region = device.map_staging_buffer(&mut buffer).expect("map");
        assert_eq!(region.stride(), 256);
        device.unmap_staging_buffer(&mut buffer);
        buffer.words[64 + 2] = 0xAB;

        device.copy_to_swap_image(&mut swap_chain, 1, &buffer).expect("copy");
        device.present(&mut swap_chain, 1).expect("present");

        let frame = probe.last_frame().expect("a frame was displayed");
        assert_eq!(frame.index, 1);
        assert_eq!(frame.pixels, vec![0, 0, 0, 0, 0, 0xAB]);
        assert_eq!(probe.pixel_at(2, 1), Some(0xAB));
        assert_eq!(probe.pixel_at(3, 1), None);
    }

    #[test]
    fn test_copy_while_mapped_is_rejected() {
        let (mut device, _probe) = device();
        let size = SurfaceSize::new(2, 2);
        let mut swap_chain = device.create_swap_chain(size, 2, PixelFormat::default()).expect("swap chain");
        let mut buffer = device.create_staging_buffer(size, PixelFormat::default()).expect("staging");
        device.map_staging_buffer(&mut buffer).expect("map");

        assert!(device.copy_to_swap_image(&mut swap_chain, 0, &buffer).is_err());
    }

    #[test]
    fn test_open_failure_injection() {
        let probe = LoopbackProbe::new();
        let config = LoopbackConfig {
            fail_open: Some(DeviceError::DeviceLost),
            ..LoopbackConfig::default()
        };
        assert_eq!(LoopbackDevice::open(config, &probe).err(), Some(DeviceError::DeviceLost));
    }

    #[test]
    fn test_drop_is_recorded() {
        let (mut device, probe) = device();
        let buffer = device
            .create_staging_buffer(SurfaceSize::new(1, 1), PixelFormat::default())
            .expect("staging");
        assert_eq!(probe.staging_live(), 1);
        drop(buffer);
        drop(device);
        assert_eq!(probe.staging_live(), 0);
        assert_eq!(
            probe.events(),
            vec![
                LoopbackEvent::StagingCreated(0),
                LoopbackEvent::StagingDropped(0),
                LoopbackEvent::DeviceDropped,
            ]
        );
    }

    #[test]
    fn test_surfaces_get_distinct_ids() {
        let a = LoopbackSurface::new(1, 1);
        let b = LoopbackSurface::new(1, 1);
        assert_ne!(a.id(), b.id());
        b.set_size(5, 6);
        assert_eq!(b.pixel_size(), SurfaceSize::new(5, 6));
    }
}
