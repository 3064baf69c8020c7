//! Double-buffered presentation engine
//!
//! Owns a swap chain of K presentable images and K CPU-writable staging
//! buffers, index-aligned. Exactly one staging buffer, the one at the current
//! index, is mapped at any time. `present()` unmaps it, copies it into the
//! matching swap image, displays that image, rotates the index and maps the
//! next buffer, so the caller always writes into memory the display is not
//! showing.
//!
//! ```text
//! Uninitialized ──new()──▶ DeviceReady ──resize()──▶ Resizing ──▶ DeviceReady
//!       ▲                       │                        │
//!       └────── resize failure ─┼────────────────────────┘
//!                               └──destroy()/drop──▶ Destroyed
//! ```

use log::{debug, error, info, warn};

use super::device::{DeviceError, DeviceResult, MappedRegion, PresentDevice};
use super::error::{ConstructionError, PresentError};
use super::frame::FrameBufferView;
use super::types::{EngineState, PixelFormat, Surface, SurfaceId, SurfaceSize};
use crate::core::config::PresenterConfig;

/// CPU framebuffer presenter for one surface
pub struct PresentationEngine<D: PresentDevice> {
    state: EngineState,
    surface_id: Option<SurfaceId>,
    format: PixelFormat,
    requested_buffer_count: u32,
    buffer_count: usize,
    size: SurfaceSize,
    current_index: usize,
    mapped: Option<MappedRegion>,
    frame_count: u64,
    construction_error: Option<ConstructionError>,
    // Release order matters: staging buffers, then swap chain, then device.
    staging_buffers: Vec<D::StagingBuffer>,
    swap_chain: Option<D::SwapChain>,
    device: Option<D>,
}

impl<D: PresentDevice> PresentationEngine<D> {
    /// Create an engine for `surface`, opening its device with `open_device`
    ///
    /// Never fails outright. A missing surface, an empty surface or any
    /// device/buffer creation failure is logged and leaves the engine
    /// [`EngineState::Uninitialized`], where every operation reports failure;
    /// the cause is kept in [`construction_error`](Self::construction_error).
    pub fn new<S, F>(surface: Option<&S>, config: &PresenterConfig, open_device: F) -> Self
    where
        S: Surface + ?Sized,
        F: FnOnce(&S) -> DeviceResult<D>,
    {
        let mut engine = Self {
            state: EngineState::Uninitialized,
            surface_id: surface.map(|s| s.id()),
            format: config.pixel_format,
            requested_buffer_count: config.buffer_count,
            buffer_count: 0,
            size: SurfaceSize::default(),
            current_index: 0,
            mapped: None,
            frame_count: 0,
            construction_error: None,
            staging_buffers: Vec::new(),
            swap_chain: None,
            device: None,
        };

        match engine.initialize(surface, open_device) {
            Ok(()) => info!(
                "Presentation engine ready: {} buffers at {} ({:?})",
                engine.buffer_count, engine.size, engine.format
            ),
            Err(err) => {
                error!("Presentation engine construction failed: {err}");
                engine.construction_error = Some(err);
            }
        }

        engine
    }

    fn initialize<S, F>(&mut self, surface: Option<&S>, open_device: F) -> Result<(), ConstructionError>
    where
        S: Surface + ?Sized,
        F: FnOnce(&S) -> DeviceResult<D>,
    {
        let surface = surface.ok_or(ConstructionError::NullSurface)?;

        let size = surface.pixel_size();
        if size.is_empty() {
            return Err(ConstructionError::EmptySurface {
                width: size.width,
                height: size.height,
            });
        }

        // Locals drop in reverse order on every early return below, so a
        // failure releases buffers before the swap chain and the device.
        let mut device = open_device(surface)?;

        let max_length = device.max_swap_chain_length().max(1);
        let buffer_count = self.requested_buffer_count.clamp(1, max_length);
        if buffer_count != self.requested_buffer_count {
            debug!(
                "Requested {} swap chain buffers, clamped to {}",
                self.requested_buffer_count, buffer_count
            );
        }

        let swap_chain = device.create_swap_chain(size, buffer_count, self.format)?;
        let staging_buffers = Self::create_staging_buffers(&mut device, size, self.format, buffer_count as usize)?;

        self.device = Some(device);
        self.swap_chain = Some(swap_chain);
        self.staging_buffers = staging_buffers;
        self.buffer_count = buffer_count as usize;
        self.size = size;
        self.current_index = 0;
        self.state = EngineState::DeviceReady;

        // a failed first map is retried by the next present
        let _ = self.map_current();
        Ok(())
    }

    fn create_staging_buffers(
        device: &mut D,
        size: SurfaceSize,
        format: PixelFormat,
        count: usize,
    ) -> DeviceResult<Vec<D::StagingBuffer>> {
        (0..count)
            .map(|_| device.create_staging_buffer(size, format))
            .collect()
    }

    /// Display the current frame and advance to the next buffer
    ///
    /// The index advances and the next buffer is mapped whether or not the
    /// display step succeeded; a failed present costs one visible frame and
    /// is returned as [`PresentError::Present`] for the caller to act on.
    /// If the frame was displayed but the next buffer could not be mapped,
    /// the result is [`PresentError::Map`] and [`frame_buffer`](Self::frame_buffer)
    /// stays `None` until the following present.
    ///
    /// An engine whose construction failed reports
    /// [`PresentError::Construction`] with the original cause.
    pub fn present(&mut self) -> Result<(), PresentError> {
        self.ensure_ready()?;
        self.unmap_current();

        let index = self.current_index;
        let result = match (self.device.as_mut(), self.swap_chain.as_mut()) {
            (Some(device), Some(swap_chain)) => device
                .copy_to_swap_image(swap_chain, index, &self.staging_buffers[index])
                .and_then(|()| device.present(swap_chain, index)),
            _ => Err(DeviceError::DeviceLost),
        };

        self.frame_count += 1;
        self.current_index = (index + 1) % self.buffer_count;
        let mapped = self.map_current();

        result.map_err(|err| {
            warn!("Present of buffer {index} failed, frame dropped: {err}");
            PresentError::Present(err)
        })?;
        mapped.map_err(PresentError::Map)
    }

    /// View of the buffer to draw the next frame into
    ///
    /// `None` unless the engine is ready and the current buffer is mapped.
    /// Has no side effects; calling it repeatedly returns the same memory.
    pub fn frame_buffer(&mut self) -> Option<FrameBufferView<'_>> {
        if self.state != EngineState::DeviceReady {
            return None;
        }
        let region = self.mapped?;

        // SAFETY: the region stays mapped until `unmap_current`, which needs
        // `&mut self`; the returned view holds that borrow.
        unsafe { FrameBufferView::from_region(&region, self.size) }
    }

    /// Rebuild the buffers if the surface size changed
    ///
    /// Returns `Ok(false)` when nothing had to be done: the size is unchanged,
    /// or the surface is empty (minimised), in which case the resize waits for
    /// a later call. On failure every buffer has been released and the engine
    /// is back to [`EngineState::Uninitialized`], except for
    /// [`PresentError::Map`]: the buffers were rebuilt but the first one could
    /// not be mapped, and the engine stays ready.
    pub fn resize<S: Surface + ?Sized>(&mut self, surface: &S) -> Result<bool, PresentError> {
        self.ensure_ready()?;
        debug_assert_eq!(Some(surface.id()), self.surface_id, "resize with a foreign surface");

        let new_size = surface.pixel_size();
        if new_size == self.size {
            return Ok(false);
        }
        if new_size.is_empty() {
            debug!("Surface is {new_size}, keeping {} buffers until it has an area", self.size);
            return Ok(false);
        }

        debug!("Resizing presentation buffers {} -> {new_size}", self.size);
        self.state = EngineState::Resizing;
        self.unmap_current();
        self.staging_buffers.clear();

        match self.rebuild(new_size) {
            Ok(()) => {
                self.state = EngineState::DeviceReady;
                self.map_current().map_err(PresentError::Map)?;
                Ok(true)
            }
            Err(err) => {
                error!("Resize to {new_size} failed, presentation disabled: {err}");
                self.release_resources();
                self.state = EngineState::Uninitialized;
                Err(PresentError::Resize(err))
            }
        }
    }

    fn rebuild(&mut self, size: SurfaceSize) -> DeviceResult<()> {
        let (Some(device), Some(swap_chain)) = (self.device.as_mut(), self.swap_chain.as_mut()) else {
            return Err(DeviceError::DeviceLost);
        };

        device.resize_swap_chain(swap_chain, size)?;
        self.size = size;
        self.staging_buffers = Self::create_staging_buffers(device, size, self.format, self.buffer_count)?;
        Ok(())
    }

    /// Tear down all resources; the engine is unusable afterwards
    pub fn destroy(&mut self) {
        if self.state == EngineState::Destroyed {
            return;
        }
        self.release_resources();
        self.state = EngineState::Destroyed;
        info!("Presentation engine destroyed after {} frames", self.frame_count);
    }

    fn release_resources(&mut self) {
        self.unmap_current();
        self.staging_buffers.clear();
        self.swap_chain = None;
        self.device = None;
    }

    fn ensure_ready(&self) -> Result<(), PresentError> {
        match (self.state, &self.construction_error) {
            (EngineState::DeviceReady, _) => Ok(()),
            (EngineState::Uninitialized, Some(err)) => Err(PresentError::Construction(err.clone())),
            (state, _) => Err(PresentError::NotReady { state }),
        }
    }

    fn map_current(&mut self) -> DeviceResult<()> {
        debug_assert!(self.mapped.is_none());
        let index = self.current_index;
        let (Some(device), Some(buffer)) = (self.device.as_mut(), self.staging_buffers.get_mut(index)) else {
            return Err(DeviceError::DeviceLost);
        };

        match device.map_staging_buffer(buffer) {
            Ok(region) => {
                self.mapped = Some(region);
                Ok(())
            }
            Err(err) => {
                warn!("Mapping staging buffer {index} failed, no frame buffer this frame: {err}");
                Err(err)
            }
        }
    }

    fn unmap_current(&mut self) {
        if self.mapped.take().is_none() {
            return;
        }
        if let (Some(device), Some(buffer)) = (self.device.as_mut(), self.staging_buffers.get_mut(self.current_index)) {
            device.unmap_staging_buffer(buffer);
        }
    }

    /// Current lifecycle state
    pub const fn state(&self) -> EngineState {
        self.state
    }

    /// True when frames can be presented
    pub fn is_ready(&self) -> bool {
        self.state == EngineState::DeviceReady
    }

    /// Why construction failed, if it did
    pub const fn construction_error(&self) -> Option<&ConstructionError> {
        self.construction_error.as_ref()
    }

    /// Index of the staging buffer exposed for writing
    pub const fn current_index(&self) -> usize {
        self.current_index
    }

    /// Number of buffers K after clamping; 0 if never initialized
    pub const fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    /// True when a staging buffer is currently mapped
    pub const fn is_mapped(&self) -> bool {
        self.mapped.is_some()
    }

    /// Cached surface size the buffers were built for
    pub const fn size(&self) -> SurfaceSize {
        self.size
    }

    /// Pixel format of every buffer
    pub const fn format(&self) -> PixelFormat {
        self.format
    }

    /// Surface this engine presents to
    pub const fn surface_id(&self) -> Option<SurfaceId> {
        self.surface_id
    }

    /// Number of `present()` calls that reached the device
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// The device, while one is open
    pub const fn device(&self) -> Option<&D> {
        self.device.as_ref()
    }
}

impl<D: PresentDevice> Drop for PresentationEngine<D> {
    fn drop(&mut self) {
        self.destroy();
    }
}
