//! Vulkan synchronization primitives
//!
//! RAII wrappers for semaphores and fences. Semaphores order the GPU side of
//! a present (acquire, copy, present); fences let the CPU wait until a
//! staging buffer's copy has finished before writing into it again.

use ash::{vk, Device};

use super::context::{VulkanError, VulkanResult};

/// GPU-GPU synchronization primitive
pub struct Semaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Create a new semaphore
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();

        let semaphore = unsafe {
            device
                .create_semaphore(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, semaphore })
    }

    /// Get the semaphore handle
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Fence wrapper with RAII cleanup
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    /// Create a new fence
    pub fn new(device: Device, signaled: bool) -> VulkanResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::builder().flags(flags);

        let fence = unsafe { device.create_fence(&create_info, None).map_err(VulkanError::Api)? };

        Ok(Self { device, fence })
    }

    /// Wait for fence
    pub fn wait(&self, timeout: u64) -> VulkanResult<()> {
        unsafe {
            self.device
                .wait_for_fences(&[self.fence], true, timeout)
                .map_err(VulkanError::Api)
        }
    }

    /// Reset fence
    pub fn reset(&self) -> VulkanResult<()> {
        unsafe { self.device.reset_fences(&[self.fence]).map_err(VulkanError::Api) }
    }

    /// Get the fence handle
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

/// Semaphores for one buffer slot of the swap chain
///
/// `image_available` is signalled by the acquire and waited on by the copy;
/// `copy_finished` is signalled by the copy and waited on by the present.
/// `acquired` holds the swapchain image taken for the slot between the copy
/// and the present.
pub struct SlotSync {
    /// Signalled when the acquired image may be written
    pub image_available: Semaphore,
    /// Signalled when the staging copy has landed in the image
    pub copy_finished: Semaphore,
    /// Swapchain image index acquired and not yet presented
    pub acquired: Option<u32>,
}

impl SlotSync {
    /// Create the semaphores for one slot
    pub fn new(device: &Device) -> VulkanResult<Self> {
        Ok(Self {
            image_available: Semaphore::new(device.clone())?,
            copy_finished: Semaphore::new(device.clone())?,
            acquired: None,
        })
    }

    /// Replace both semaphores, dropping any pending signal
    ///
    /// The device must be idle.
    pub fn renew(&mut self, device: &Device) -> VulkanResult<()> {
        *self = Self::new(device)?;
        Ok(())
    }
}
