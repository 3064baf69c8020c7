//! # Rendering backends
//!
//! Graphics API implementations of [`PresentDevice`](crate::present::PresentDevice).
//! Only Vulkan exists today.

pub mod vulkan;

pub use vulkan::{VulkanDevice, VulkanError};
