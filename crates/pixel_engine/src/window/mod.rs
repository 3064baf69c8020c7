//! Native windows and keyboard input
//!
//! Each [`Window`] owns a [`PresentationEngine`](crate::present::PresentationEngine)
//! on the Vulkan backend. The [`WindowManager`] owns every window together
//! with the GLFW session and turns GLFW events into per-window
//! [`KeyEvent`]s and resizes.

pub mod keys;
pub mod manager;
pub mod native;
pub mod registry;

pub use keys::{translate_key, translate_modifiers, KeyEvent, KeyId, KeyModifiers};
pub use manager::WindowManager;
pub use native::{GlfwSurface, KeyCallback, Window, WindowError, WindowResult};
pub use registry::Registry;
