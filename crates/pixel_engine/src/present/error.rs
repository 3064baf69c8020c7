//! Presentation engine error types

use thiserror::Error;

use super::device::DeviceError;
use super::types::EngineState;

/// Why an engine could not reach the device-ready state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// No surface handle was supplied
    #[error("No surface was specified")]
    NullSurface,

    /// The surface has no drawable area
    #[error("Surface has zero size ({width}x{height})")]
    EmptySurface {
        /// Reported width
        width: u32,
        /// Reported height
        height: u32,
    },

    /// Device, swap chain or staging buffer creation failed
    #[error("Device creation failed: {0}")]
    Device(#[from] DeviceError),
}

/// Errors reported by [`PresentationEngine`](super::PresentationEngine) operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PresentError {
    /// Construction failed; the engine stays uninitialized for good
    #[error("Construction failed: {0}")]
    Construction(#[from] ConstructionError),

    /// The operation needs a device-ready engine
    #[error("Engine is not ready (state: {state})")]
    NotReady {
        /// State the engine was in
        state: EngineState,
    },

    /// Copying or displaying the frame failed; the frame was dropped
    #[error("Present failed: {0}")]
    Present(#[source] DeviceError),

    /// A staging buffer could not be made CPU-writable
    #[error("Staging buffer map failed: {0}")]
    Map(#[source] DeviceError),

    /// Rebuilding the swap chain or staging buffers failed
    #[error("Resize failed: {0}")]
    Resize(#[source] DeviceError),
}

impl PresentError {
    /// True for failures after which the engine can keep presenting
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Present(_) | Self::Map(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(PresentError::Present(DeviceError::SurfaceLost).is_recoverable());
        assert!(PresentError::Map(DeviceError::OutOfMemory).is_recoverable());
        assert!(!PresentError::Resize(DeviceError::OutOfDate).is_recoverable());
        assert!(!PresentError::from(ConstructionError::NullSurface).is_recoverable());
        assert!(!PresentError::NotReady { state: EngineState::Destroyed }.is_recoverable());
    }

    #[test]
    fn test_messages_name_the_cause() {
        let err = PresentError::from(ConstructionError::from(DeviceError::DeviceLost));
        assert_eq!(err.to_string(), "Construction failed: Device creation failed: Device lost");

        let err = PresentError::NotReady { state: EngineState::Uninitialized };
        assert_eq!(err.to_string(), "Engine is not ready (state: uninitialized)");
    }
}
