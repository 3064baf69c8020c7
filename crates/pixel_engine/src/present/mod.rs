//! CPU framebuffer presentation
//!
//! A [`PresentationEngine`] gives the caller a plain block of memory to draw
//! pixels into and puts it on screen with [`present`](PresentationEngine::present).
//! The graphics API behind it is a [`PresentDevice`]: the Vulkan backend for
//! real windows, [`LoopbackDevice`] for tests and headless use.
//!
//! ```no_run
//! use pixel_engine::core::config::PresenterConfig;
//! use pixel_engine::present::{LoopbackConfig, LoopbackDevice, LoopbackProbe, LoopbackSurface, PresentationEngine};
//! use pixel_engine::raster;
//!
//! let surface = LoopbackSurface::new(400, 400);
//! let probe = LoopbackProbe::new();
//! let mut engine = PresentationEngine::new(Some(&surface), &PresenterConfig::default(), |_| {
//!     LoopbackDevice::open(LoopbackConfig::default(), &probe)
//! });
//!
//! loop {
//!     if let Some(mut frame) = engine.frame_buffer() {
//!         raster::fill_circle_simple(&mut frame, 200, 200, 100, 0x00FF_5733);
//!     }
//!     if engine.present().is_err() {
//!         break;
//!     }
//! }
//! ```

pub mod device;
pub mod engine;
pub mod error;
pub mod frame;
pub mod loopback;
pub mod types;

#[cfg(test)]
mod engine_tests;

pub use device::{DeviceError, DeviceResult, MappedRegion, PresentDevice};
pub use engine::PresentationEngine;
pub use error::{ConstructionError, PresentError};
pub use frame::FrameBufferView;
pub use loopback::{
    LoopbackConfig, LoopbackDevice, LoopbackEvent, LoopbackProbe, LoopbackStagingBuffer, LoopbackSurface,
    LoopbackSwapChain, PresentedFrame,
};
pub use types::{EngineState, PixelFormat, Surface, SurfaceId, SurfaceSize};
