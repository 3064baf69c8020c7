//! Vulkan presentation backend
//!
//! Low-level Vulkan wrappers behind [`VulkanDevice`], the
//! [`PresentDevice`](crate::present::PresentDevice) used by real windows.
//! Every wrapper owns its handles and releases them on drop.

pub mod buffer;
pub mod commands;
pub mod context;
pub mod device;
pub mod surface;
pub mod swapchain;
pub mod sync;

pub use buffer::{staging_stride, Buffer, CopyTracker, StagingBuffer};
pub use commands::{CommandPool, CommandRecorder};
pub use context::{LogicalDevice, PhysicalDeviceInfo, VulkanError, VulkanInstance, VulkanResult};
pub use device::{VulkanDevice, UNBOUNDED_MAX_SWAP_CHAIN_LENGTH};
pub use surface::WindowSurface;
pub use swapchain::{Swapchain, SwapchainRequest};
pub use sync::{Fence, Semaphore, SlotSync};
