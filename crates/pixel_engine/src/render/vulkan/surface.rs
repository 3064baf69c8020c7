//! Vulkan surface for a GLFW window

use ash::{extensions::khr, vk};

use super::context::{VulkanError, VulkanInstance, VulkanResult};

/// `VkSurfaceKHR` wrapper, destroyed on drop
///
/// Must be dropped before the instance it was created from and after every
/// swapchain built on it.
pub struct WindowSurface {
    surface_loader: khr::Surface,
    surface: vk::SurfaceKHR,
}

impl WindowSurface {
    /// Create a surface for `window` using GLFW's built-in support
    pub fn new(instance: &VulkanInstance, window: &glfw::Window) -> VulkanResult<Self> {
        let surface_loader = khr::Surface::new(&instance.entry, &instance.instance);

        let mut surface = vk::SurfaceKHR::null();
        let result = window.create_window_surface(instance.instance.handle(), std::ptr::null(), &mut surface);
        if result != vk::Result::SUCCESS {
            return Err(VulkanError::InitializationFailed(format!(
                "Failed to create window surface: {result}"
            )));
        }

        Ok(Self {
            surface_loader,
            surface,
        })
    }

    /// Get the underlying surface handle
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Surface capabilities for a physical device
    pub fn capabilities(&self, physical_device: vk::PhysicalDevice) -> VulkanResult<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(physical_device, self.surface)
                .map_err(VulkanError::Api)
        }
    }

    /// Surface formats for a physical device
    pub fn formats(&self, physical_device: vk::PhysicalDevice) -> VulkanResult<Vec<vk::SurfaceFormatKHR>> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_formats(physical_device, self.surface)
                .map_err(VulkanError::Api)
        }
    }

    /// Surface present modes for a physical device
    pub fn present_modes(&self, physical_device: vk::PhysicalDevice) -> VulkanResult<Vec<vk::PresentModeKHR>> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_present_modes(physical_device, self.surface)
                .map_err(VulkanError::Api)
        }
    }

    /// Check if a queue family supports presentation to this surface
    pub fn supports_present(&self, physical_device: vk::PhysicalDevice, queue_family_index: u32) -> VulkanResult<bool> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_support(physical_device, queue_family_index, self.surface)
                .map_err(VulkanError::Api)
        }
    }
}

impl Drop for WindowSurface {
    fn drop(&mut self) {
        unsafe {
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
