//! # Pixel Engine
//!
//! Draw pixels into plain CPU memory and put them on screen.
//!
//! ## Features
//!
//! - **Double buffering**: K staging buffers in rotation; one is always mapped for drawing
//! - **Vulkan presentation**: staging buffers are copied straight into swapchain images
//! - **Resizing**: buffers follow the window size, zero-size windows are waited out
//! - **Headless backend**: the loopback device presents into memory for tests
//! - **Rasterizer**: rectangles and filled circles straight into a frame buffer
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pixel_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     logging::init();
//!
//!     let mut windows = WindowManager::new();
//!     let id = windows.create_window(&WindowConfig::new("Wnd1"), &PresenterConfig::default())?;
//!
//!     while windows.has_open_windows() {
//!         windows.pump_events();
//!         let Some(window) = windows.get_mut(id) else { break };
//!         if let Some(mut frame) = window.frame_buffer() {
//!             raster::fill_circle_simple(&mut frame, 200, 200, 100, 0x00FF_5733);
//!         }
//!         let _ = window.present();
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;
pub mod present;
pub mod raster;

// Supporting modules
pub mod config;
pub mod foundation;
pub mod render;
pub mod window;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{ApplicationConfig, Config, ConfigError, PresenterConfig, WindowConfig},
        foundation::logging,
        present::{
            EngineState, FrameBufferView, PixelFormat, PresentError, PresentationEngine, Surface, SurfaceId,
            SurfaceSize,
        },
        raster,
        window::{KeyEvent, KeyId, KeyModifiers, Window, WindowError, WindowManager},
    };
}
