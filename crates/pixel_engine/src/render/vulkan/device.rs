//! [`PresentDevice`] implementation on Vulkan
//!
//! Per frame: the staging buffer is unmapped, a swapchain image is acquired,
//! a command buffer moves it to `TRANSFER_DST_OPTIMAL`, copies the staging
//! rows in (`buffer_row_length` is the padded stride in texels) and moves it
//! to `PRESENT_SRC_KHR`, then the image is queued for presentation. The copy
//! signals the staging buffer's fence, and mapping that buffer again waits on
//! it, so the CPU never writes memory the GPU is still reading. A fence whose
//! submit was rejected is replaced on the next map rather than waited on.

use ash::vk;

use super::buffer::StagingBuffer;
use super::commands::{CommandPool, CommandRecorder};
use super::context::{LogicalDevice, PhysicalDeviceInfo, VulkanError, VulkanInstance, VulkanResult};
use super::surface::WindowSurface;
use super::swapchain::{Swapchain, SwapchainRequest};
use crate::core::config::PresenterConfig;
use crate::present::{DeviceError, DeviceResult, MappedRegion, PixelFormat, PresentDevice, SurfaceSize};

/// Platform limit used when the surface does not bound the image count
pub const UNBOUNDED_MAX_SWAP_CHAIN_LENGTH: u32 = 16;

/// Vulkan device presenting CPU frames to one window surface
pub struct VulkanDevice {
    // Field order is drop order: pool, device, surface, instance.
    command_pool: CommandPool,
    device: LogicalDevice,
    physical_device: PhysicalDeviceInfo,
    surface: WindowSurface,
    instance: VulkanInstance,
    vsync: bool,
    max_swap_chain_length: u32,
}

impl VulkanDevice {
    /// Open a device able to present to `window`
    pub fn open(glfw: &glfw::Glfw, window: &glfw::Window, config: &PresenterConfig) -> DeviceResult<Self> {
        Ok(Self::create(glfw, window, config)?)
    }

    fn create(glfw: &glfw::Glfw, window: &glfw::Window, config: &PresenterConfig) -> VulkanResult<Self> {
        let instance = VulkanInstance::new(glfw, "pixel_engine", config.validation_enabled())?;
        let surface = WindowSurface::new(&instance, window)?;
        let physical_device = PhysicalDeviceInfo::select_suitable_device(&instance.instance, &surface)?;
        let device = LogicalDevice::new(&instance.instance, &physical_device)?;
        let command_pool = CommandPool::new(device.device.clone(), device.graphics_family)?;

        let caps = surface.capabilities(physical_device.device)?;
        let max_swap_chain_length = match caps.max_image_count {
            0 => UNBOUNDED_MAX_SWAP_CHAIN_LENGTH,
            max => max,
        };

        log::info!(
            "Vulkan presentation device ready on {} (max {} swap chain images)",
            physical_device.name(),
            max_swap_chain_length
        );

        Ok(Self {
            command_pool,
            device,
            physical_device,
            surface,
            instance,
            vsync: config.vsync,
            max_swap_chain_length,
        })
    }

    /// Name of the GPU in use
    pub fn adapter_name(&self) -> String {
        self.physical_device.name()
    }

    fn record_and_submit(
        &mut self,
        swap_chain: &mut Swapchain,
        slot: usize,
        buffer: &StagingBuffer,
    ) -> VulkanResult<()> {
        let image_index = swap_chain.acquire(&self.device, &self.surface, self.physical_device.device, slot)?;
        let image = swap_chain.image(image_index)?;
        let extent = swap_chain.extent();
        let copy_extent = vk::Extent2D {
            width: extent.width.min(buffer.size().width),
            height: extent.height.min(buffer.size().height),
        };

        let device = &self.device.device;
        let mut recorder = CommandRecorder::begin(device, buffer.command_buffer())?;
        recorder.image_layout_barrier(
            image,
            (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL),
            (vk::AccessFlags::empty(), vk::AccessFlags::TRANSFER_WRITE),
            (vk::PipelineStageFlags::TOP_OF_PIPE, vk::PipelineStageFlags::TRANSFER),
        );
        recorder.copy_buffer_to_image(buffer.handle(), image, (buffer.stride() / 4) as u32, copy_extent);
        recorder.image_layout_barrier(
            image,
            (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::PRESENT_SRC_KHR),
            (vk::AccessFlags::TRANSFER_WRITE, vk::AccessFlags::empty()),
            (vk::PipelineStageFlags::TRANSFER, vk::PipelineStageFlags::BOTTOM_OF_PIPE),
        );
        let command_buffer = recorder.end()?;

        let sync = swap_chain.slot(slot)?;
        let wait_semaphores = [sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::TRANSFER];
        let signal_semaphores = [sync.copy_finished.handle()];
        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        // a rejected submit leaves the fence orphaned; the next map replaces it
        let fence = buffer.arm_fence()?;
        unsafe {
            device
                .queue_submit(self.device.graphics_queue, &[submit_info], fence)
                .map_err(VulkanError::Api)?;
        }
        buffer.copy_submitted();
        Ok(())
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        if let Err(err) = self.device.wait_idle() {
            log::warn!("Device did not go idle before release: {err}");
        }
        log::debug!("Vulkan presentation device released");
    }
}

impl PresentDevice for VulkanDevice {
    type SwapChain = Swapchain;
    type StagingBuffer = StagingBuffer;

    fn max_swap_chain_length(&self) -> u32 {
        self.max_swap_chain_length
    }

    fn create_swap_chain(
        &mut self,
        size: SurfaceSize,
        image_count: u32,
        format: PixelFormat,
    ) -> DeviceResult<Self::SwapChain> {
        let request = SwapchainRequest {
            size,
            slot_count: image_count,
            format,
            vsync: self.vsync,
        };
        Ok(Swapchain::new(&self.device, &self.surface, self.physical_device.device, request)?)
    }

    fn resize_swap_chain(&mut self, swap_chain: &mut Self::SwapChain, size: SurfaceSize) -> DeviceResult<()> {
        Ok(swap_chain.recreate(&self.device, &self.surface, self.physical_device.device, size)?)
    }

    fn create_staging_buffer(&mut self, size: SurfaceSize, _format: PixelFormat) -> DeviceResult<Self::StagingBuffer> {
        Ok(StagingBuffer::new(
            self.device.device.clone(),
            &self.instance.instance,
            self.physical_device.device,
            &self.command_pool,
            size,
            self.physical_device.optimal_row_pitch_alignment(),
        )?)
    }

    fn map_staging_buffer(&mut self, buffer: &mut Self::StagingBuffer) -> DeviceResult<MappedRegion> {
        let (ptr, len) = buffer.map()?;
        // SAFETY: the mapping stays valid until `unmap` or drop, both of which
        // need the buffer mutably; vkMapMemory results are aligned to at
        // least minMemoryMapAlignment (>= 64) and the stride is whole pixels.
        Ok(unsafe { MappedRegion::new(ptr, len, buffer.stride()) })
    }

    fn unmap_staging_buffer(&mut self, buffer: &mut Self::StagingBuffer) {
        buffer.unmap();
    }

    fn copy_to_swap_image(
        &mut self,
        swap_chain: &mut Self::SwapChain,
        image_index: usize,
        buffer: &Self::StagingBuffer,
    ) -> DeviceResult<()> {
        if buffer.is_mapped() {
            return Err(DeviceError::Backend("staging buffer copied while mapped".to_string()));
        }
        self.record_and_submit(swap_chain, image_index, buffer).map_err(|err| {
            swap_chain.abandon(image_index);
            DeviceError::from(err)
        })
    }

    fn present(&mut self, swap_chain: &mut Self::SwapChain, image_index: usize) -> DeviceResult<()> {
        Ok(swap_chain.present(self.device.present_queue, image_index)?)
    }
}
