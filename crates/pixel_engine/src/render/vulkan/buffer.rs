//! Host-visible buffers the CPU draws into
//!
//! Memory management following RAII patterns with proper allocation and cleanup

use ash::{vk, Device, Instance};
use std::cell::Cell;
use std::ptr::NonNull;

use super::commands::CommandPool;
use super::context::{VulkanError, VulkanResult};
use super::sync::Fence;
use crate::present::SurfaceSize;

/// Buffer wrapper with memory management
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl Buffer {
    /// Create a new buffer with memory allocation
    pub fn new(
        device: Device,
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.create_buffer(&buffer_info, None).map_err(VulkanError::Api)? };

        let mem_requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory = find_memory_type(instance, physical_device, mem_requirements.memory_type_bits, properties)
            .and_then(|memory_type_index| {
                let alloc_info = vk::MemoryAllocateInfo::builder()
                    .allocation_size(mem_requirements.size)
                    .memory_type_index(memory_type_index);
                unsafe { device.allocate_memory(&alloc_info, None).map_err(VulkanError::Api) }
            });
        let memory = match memory {
            Ok(memory) => memory,
            Err(err) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(err);
            }
        };

        // from here on Drop cleans up
        let buffer = Self {
            device,
            buffer,
            memory,
            size,
        };
        unsafe {
            buffer
                .device
                .bind_buffer_memory(buffer.buffer, buffer.memory, 0)
                .map_err(VulkanError::Api)?;
        }

        Ok(buffer)
    }

    /// Map memory for writing
    pub fn map_memory(&self) -> VulkanResult<*mut std::ffi::c_void> {
        unsafe {
            self.device
                .map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)
        }
    }

    /// Unmap memory
    pub fn unmap_memory(&self) {
        unsafe {
            self.device.unmap_memory(self.memory);
        }
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Get size
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// Bytes per row for a `width`-pixel staging buffer
///
/// `width * 4` rounded up to the device's copy row pitch alignment, itself
/// rounded up to whole pixels.
pub fn staging_stride(width: u32, row_pitch_alignment: usize) -> usize {
    let alignment = row_pitch_alignment.max(4).next_multiple_of(4);
    (width as usize * 4).next_multiple_of(alignment)
}

/// Tracks whether a staging buffer's fence still has a submit behind it
///
/// The fence is reset right before the copy is submitted. If that submit
/// never reaches the queue, nothing will ever signal the fence and waiting
/// on it would block forever.
#[derive(Debug, Default)]
pub struct CopyTracker {
    orphaned: Cell<bool>,
}

impl CopyTracker {
    /// The fence was reset and is waiting for a submit
    pub fn fence_reset(&self) {
        self.orphaned.set(true);
    }

    /// A submit that signals the fence was queued
    pub fn submitted(&self) {
        self.orphaned.set(false);
    }

    /// The fence was swapped for a fresh signalled one
    pub fn fence_replaced(&self) {
        self.orphaned.set(false);
    }

    /// True when the fence was reset and no submit followed
    pub fn is_orphaned(&self) -> bool {
        self.orphaned.get()
    }
}

/// One CPU-writable frame plus what its copy to the swapchain needs
///
/// The fence is signalled once the last copy out of this buffer finished;
/// it is created signalled so the first map does not wait.
pub struct StagingBuffer {
    device: Device,
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    fence: Fence,
    copy: CopyTracker,
    buffer: Buffer,
    size: SurfaceSize,
    stride: usize,
    mapped: bool,
}

impl StagingBuffer {
    /// Allocate a host-visible, host-coherent buffer of `stride * height` bytes
    pub fn new(
        device: Device,
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        command_pool: &CommandPool,
        size: SurfaceSize,
        row_pitch_alignment: usize,
    ) -> VulkanResult<Self> {
        let stride = staging_stride(size.width, row_pitch_alignment);
        let byte_size = (stride * size.height as usize) as vk::DeviceSize;

        let buffer = Buffer::new(
            device.clone(),
            instance,
            physical_device,
            byte_size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        let fence = Fence::new(device.clone(), true)?;
        let command_buffer = command_pool.allocate_command_buffer()?;

        Ok(Self {
            device,
            command_pool: command_pool.handle(),
            command_buffer,
            fence,
            copy: CopyTracker::default(),
            buffer,
            size,
            stride,
            mapped: false,
        })
    }

    /// Wait for the previous copy, then map the whole buffer
    pub fn map(&mut self) -> VulkanResult<(NonNull<u8>, usize)> {
        if self.mapped {
            return Err(VulkanError::InvalidOperation {
                reason: "Staging buffer already mapped".to_string(),
            });
        }
        self.wait_for_copy()?;

        let ptr = self.buffer.map_memory()?;
        let ptr = NonNull::new(ptr.cast::<u8>()).ok_or_else(|| VulkanError::InvalidOperation {
            reason: "vkMapMemory returned null".to_string(),
        })?;
        self.mapped = true;
        Ok((ptr, self.buffer.size() as usize))
    }

    fn wait_for_copy(&mut self) -> VulkanResult<()> {
        if self.copy.is_orphaned() {
            log::debug!("Staging fence has no submit behind it, replacing it");
            self.fence = Fence::new(self.device.clone(), true)?;
            self.copy.fence_replaced();
            return Ok(());
        }
        self.fence.wait(u64::MAX)
    }

    /// Reset the fence for the next copy submit and return its handle
    ///
    /// Call [`copy_submitted`](Self::copy_submitted) once the submit was
    /// accepted; until then mapping replaces the fence instead of waiting.
    pub fn arm_fence(&self) -> VulkanResult<vk::Fence> {
        self.fence.reset()?;
        self.copy.fence_reset();
        Ok(self.fence.handle())
    }

    /// The copy signalling the armed fence is on the queue
    pub fn copy_submitted(&self) {
        self.copy.submitted();
    }

    /// Unmap if mapped
    pub fn unmap(&mut self) {
        if std::mem::take(&mut self.mapped) {
            self.buffer.unmap_memory();
        }
    }

    /// Whether the CPU currently has the buffer mapped
    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    /// Pixel dimensions
    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    /// Bytes per row
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Vulkan buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    /// Command buffer the copy out of this buffer is recorded into
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

}

impl Drop for StagingBuffer {
    fn drop(&mut self) {
        self.unmap();
        if !self.copy.is_orphaned() {
            if let Err(err) = self.fence.wait(u64::MAX) {
                log::warn!("Waiting for staging copy before release failed: {err}");
            }
        }
        unsafe {
            self.device.free_command_buffers(self.command_pool, &[self.command_buffer]);
        }
    }
}

/// Find memory type with required properties
fn find_memory_type(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> VulkanResult<u32> {
    let mem_properties = unsafe { instance.get_physical_device_memory_properties(physical_device) };

    (0..mem_properties.memory_type_count)
        .find(|&i| {
            type_filter & (1 << i) != 0
                && mem_properties.memory_types[i as usize].property_flags.contains(properties)
        })
        .ok_or(VulkanError::NoSuitableMemoryType)
}
