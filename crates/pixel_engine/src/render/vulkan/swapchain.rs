//! Vulkan swapchain whose images are written by transfer copies
//!
//! Handles swapchain creation and recreation following RAII principles. The
//! images are never rendered to; they are created with `TRANSFER_DST` usage
//! and filled from staging buffers.

use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::{vk, Device};

use super::context::{LogicalDevice, VulkanError, VulkanResult};
use super::surface::WindowSurface;
use super::sync::SlotSync;
use crate::present::{PixelFormat, SurfaceSize};

/// What the engine asked for; reused on every recreation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainRequest {
    /// Desired size, used when the surface leaves the extent to the swapchain
    pub size: SurfaceSize,
    /// Number of engine buffer slots K
    pub slot_count: u32,
    /// Pixel format of the staging buffers
    pub format: PixelFormat,
    /// FIFO when set, otherwise the lowest-latency mode available
    pub vsync: bool,
}

/// Vulkan format matching a pixel format byte for byte
pub fn vk_format(format: PixelFormat) -> vk::Format {
    match format {
        PixelFormat::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
        PixelFormat::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
    }
}

/// Swapchain management wrapper with RAII cleanup
pub struct Swapchain {
    device: Device,
    swapchain_loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    request: SwapchainRequest,
    slots: Vec<SlotSync>,
    needs_rebuild: bool,
}

impl Swapchain {
    /// Create a swapchain with one synchronization slot per engine buffer
    pub fn new(
        device: &LogicalDevice,
        surface: &WindowSurface,
        physical_device: vk::PhysicalDevice,
        request: SwapchainRequest,
    ) -> VulkanResult<Self> {
        let (swapchain, images, format, extent) =
            Self::build(device, surface, physical_device, &request, vk::SwapchainKHR::null())?;

        let slots = (0..request.slot_count)
            .map(|_| SlotSync::new(&device.device))
            .collect::<VulkanResult<Vec<_>>>();
        let slots = match slots {
            Ok(slots) => slots,
            Err(err) => {
                unsafe { device.swapchain_loader.destroy_swapchain(swapchain, None) };
                return Err(err);
            }
        };

        log::debug!(
            "Swapchain created: {} images at {}x{}, {:?}",
            images.len(),
            extent.width,
            extent.height,
            format.format
        );

        Ok(Self {
            device: device.device.clone(),
            swapchain_loader: device.swapchain_loader.clone(),
            swapchain,
            images,
            format,
            extent,
            request,
            slots,
            needs_rebuild: false,
        })
    }

    /// Recreate at `size`, handing the old swapchain to the driver
    ///
    /// Waits for the device to go idle first.
    pub fn recreate(
        &mut self,
        device: &LogicalDevice,
        surface: &WindowSurface,
        physical_device: vk::PhysicalDevice,
        size: SurfaceSize,
    ) -> VulkanResult<()> {
        device.wait_idle()?;

        let request = SwapchainRequest { size, ..self.request };
        let (swapchain, images, format, extent) =
            Self::build(device, surface, physical_device, &request, self.swapchain)?;

        unsafe { self.swapchain_loader.destroy_swapchain(self.swapchain, None) };
        self.swapchain = swapchain;
        self.images = images;
        self.format = format;
        self.extent = extent;
        self.request = request;
        self.needs_rebuild = false;

        // any acquire that was never presented left its semaphore signalled
        for slot in &mut self.slots {
            slot.renew(&device.device)?;
        }

        log::debug!("Swapchain recreated at {}x{}", extent.width, extent.height);
        Ok(())
    }

    fn build(
        device: &LogicalDevice,
        surface: &WindowSurface,
        physical_device: vk::PhysicalDevice,
        request: &SwapchainRequest,
        old_swapchain: vk::SwapchainKHR,
    ) -> VulkanResult<(vk::SwapchainKHR, Vec<vk::Image>, vk::SurfaceFormatKHR, vk::Extent2D)> {
        let surface_caps = surface.capabilities(physical_device)?;
        if !surface_caps
            .supported_usage_flags
            .contains(vk::ImageUsageFlags::TRANSFER_DST)
        {
            return Err(VulkanError::Unsupported(
                "surface images cannot be transfer destinations".to_string(),
            ));
        }

        let wanted = vk_format(request.format);
        let surface_formats = surface.formats(physical_device)?;
        let format = match surface_formats.as_slice() {
            [only] if only.format == vk::Format::UNDEFINED => vk::SurfaceFormatKHR {
                format: wanted,
                color_space: only.color_space,
            },
            formats => formats
                .iter()
                .find(|sf| sf.format == wanted)
                .copied()
                .ok_or_else(|| VulkanError::Unsupported(format!("surface format {wanted:?}")))?,
        };

        let present_modes = surface.present_modes(physical_device)?;
        let present_mode = choose_present_mode(&present_modes, request.vsync);

        let extent = if surface_caps.current_extent.width == u32::MAX {
            vk::Extent2D {
                width: request
                    .size
                    .width
                    .clamp(surface_caps.min_image_extent.width, surface_caps.max_image_extent.width),
                height: request
                    .size
                    .height
                    .clamp(surface_caps.min_image_extent.height, surface_caps.max_image_extent.height),
            }
        } else {
            surface_caps.current_extent
        };

        let image_count = choose_image_count(&surface_caps, request.slot_count);

        let swapchain_create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface.handle())
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::TRANSFER_DST)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(surface_caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe {
            device
                .swapchain_loader
                .create_swapchain(&swapchain_create_info, None)
                .map_err(VulkanError::Api)?
        };

        let images = match unsafe { device.swapchain_loader.get_swapchain_images(swapchain) } {
            Ok(images) => images,
            Err(err) => {
                unsafe { device.swapchain_loader.destroy_swapchain(swapchain, None) };
                return Err(VulkanError::Api(err));
            }
        };

        Ok((swapchain, images, format, extent))
    }

    /// Acquire the next image for slot `slot`, signalling its
    /// `image_available` semaphore
    ///
    /// A swapchain reported out of date is rebuilt at the same size and the
    /// acquire retried once.
    pub fn acquire(
        &mut self,
        device: &LogicalDevice,
        surface: &WindowSurface,
        physical_device: vk::PhysicalDevice,
        slot: usize,
    ) -> VulkanResult<u32> {
        if self.needs_rebuild {
            self.recreate(device, surface, physical_device, self.request.size)?;
        }

        match self.acquire_once(slot) {
            Err(VulkanError::Api(vk::Result::ERROR_OUT_OF_DATE_KHR)) => {
                log::debug!("Swapchain out of date on acquire, rebuilding");
                self.recreate(device, surface, physical_device, self.request.size)?;
                self.acquire_once(slot)
            }
            result => result,
        }
    }

    fn acquire_once(&mut self, slot: usize) -> VulkanResult<u32> {
        let sync = self.slot(slot)?;
        let (image_index, suboptimal) = unsafe {
            self.swapchain_loader
                .acquire_next_image(self.swapchain, u64::MAX, sync.image_available.handle(), vk::Fence::null())
                .map_err(VulkanError::Api)?
        };
        if suboptimal {
            self.needs_rebuild = true;
        }
        if let Some(sync) = self.slots.get_mut(slot) {
            sync.acquired = Some(image_index);
        }
        Ok(image_index)
    }

    /// Present the image acquired for `slot` on `queue`
    pub fn present(&mut self, queue: vk::Queue, slot: usize) -> VulkanResult<()> {
        let sync = self.slots.get_mut(slot).ok_or_else(|| VulkanError::InvalidOperation {
            reason: format!("No swapchain slot {slot}"),
        })?;
        let image_index = sync.acquired.take().ok_or_else(|| VulkanError::InvalidOperation {
            reason: format!("Nothing acquired for slot {slot}"),
        })?;

        let wait_semaphores = [sync.copy_finished.handle()];
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { self.swapchain_loader.queue_present(queue, &present_info) } {
            Ok(false) => Ok(()),
            Ok(true) => {
                self.needs_rebuild = true;
                Ok(())
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.needs_rebuild = true;
                Err(VulkanError::Api(vk::Result::ERROR_OUT_OF_DATE_KHR))
            }
            Err(err) => Err(VulkanError::Api(err)),
        }
    }

    /// Synchronization objects of slot `slot`
    pub fn slot(&self, slot: usize) -> VulkanResult<&SlotSync> {
        self.slots.get(slot).ok_or_else(|| VulkanError::InvalidOperation {
            reason: format!("No swapchain slot {slot}"),
        })
    }

    /// Swapchain image `index`
    pub fn image(&self, index: u32) -> VulkanResult<vk::Image> {
        self.images
            .get(index as usize)
            .copied()
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("No swapchain image {index}"),
            })
    }

    /// Forget the acquisition of `slot` after a failed copy
    ///
    /// Its semaphore may be left signalled, so the swapchain is rebuilt
    /// before the next acquire.
    pub fn abandon(&mut self, slot: usize) {
        if let Some(sync) = self.slots.get_mut(slot) {
            if sync.acquired.take().is_some() {
                self.needs_rebuild = true;
            }
        }
    }

    /// Get swapchain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Get surface format
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    /// Get swapchain handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Number of `VkImage`s the driver created (may exceed the slot count)
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            // the slot semaphores may still be waited on by a pending present
            let _ = self.device.device_wait_idle();
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

fn choose_present_mode(available: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if vsync {
        return vk::PresentModeKHR::FIFO;
    }
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
        .into_iter()
        .find(|mode| available.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR, slot_count: u32) -> u32 {
    let count = slot_count.max(caps.min_image_count);
    if caps.max_image_count > 0 {
        count.min(caps.max_image_count)
    } else {
        count
    }
}
