//! # Configuration
//!
//! Settings for the presentation engine, the windows it draws into and the
//! application as a whole. Every struct has usable defaults, builder-style
//! `with_*` setters and a `validate()` check, and [`ApplicationConfig`] can be
//! read from a `.toml` or `.ron` file through the [`Config`] trait.
//!
//! ```toml
//! log_level = "debug"
//!
//! [window]
//! title = "Wnd1"
//! width = 400
//! height = 400
//!
//! [presenter]
//! buffer_count = 3
//! vsync = false
//! ```

use log::LevelFilter;
use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};
use crate::present::PixelFormat;

/// Presentation engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenterConfig {
    /// Requested swap chain length K; clamped to `1..=platform max`
    pub buffer_count: u32,
    /// Format of every swap image and staging buffer
    pub pixel_format: PixelFormat,
    /// Wait for vertical blank when presenting
    pub vsync: bool,
    /// Whether to enable Vulkan validation layers
    pub enable_validation: Option<bool>,
}

impl PresenterConfig {
    /// Double buffering, default format, vsync on
    pub fn new() -> Self {
        Self {
            buffer_count: 2,
            pixel_format: PixelFormat::default(),
            vsync: true,
            enable_validation: None, // decided by build type
        }
    }

    /// Set the requested number of buffers
    pub fn with_buffer_count(mut self, count: u32) -> Self {
        self.buffer_count = count;
        self
    }

    /// Set the pixel format
    pub fn with_pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = format;
        self
    }

    /// Enable or disable vsync
    pub fn with_vsync(mut self, enabled: bool) -> Self {
        self.vsync = enabled;
        self
    }

    /// Enable or disable validation layers
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = Some(enabled);
        self
    }

    /// Validation setting with the build-type fallback applied
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.buffer_count == 0 {
            return Err("Buffer count must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Window creation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Title bar text
    pub title: String,
    /// Client area width in pixels
    pub width: u32,
    /// Client area height in pixels
    pub height: u32,
    /// Whether the user can resize the window
    pub resizable: bool,
}

impl WindowConfig {
    /// A 400x400 resizable window
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            width: 400,
            height: 400,
            resizable: true,
        }
    }

    /// Set the client area size
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Allow or forbid resizing
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!("Window size must be non-zero, got {}x{}", self.width, self.height));
        }
        Ok(())
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new("Wnd1")
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration the demo reads from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Log level name (`error`, `warn`, `info`, `debug`, `trace`, `off`)
    pub log_level: String,
    /// Main window settings
    pub window: WindowConfig,
    /// Presentation engine settings
    pub presenter: PresenterConfig,
}

impl ApplicationConfig {
    /// Create a new application configuration with defaults
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            window: WindowConfig::default(),
            presenter: PresenterConfig::default(),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set window settings
    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    /// Set presenter settings
    pub fn with_presenter(mut self, presenter: PresenterConfig) -> Self {
        self.presenter = presenter;
        self
    }

    /// The log level as a filter
    pub fn level_filter(&self) -> Result<LevelFilter, String> {
        self.log_level
            .parse()
            .map_err(|_| format!("Unknown log level: {}", self.log_level))
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.level_filter()
            .map(|_| ())
            .and_then(|()| self.window.validate())
            .and_then(|()| self.presenter.validate())
            .map_err(ConfigError::Invalid)
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for ApplicationConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pixel_engine_{}_{name}", std::process::id()))
    }

    #[test]
    fn test_defaults_match_reference_scene() {
        let config = ApplicationConfig::default();
        assert_eq!(config.window.title, "Wnd1");
        assert_eq!((config.window.width, config.window.height), (400, 400));
        assert_eq!(config.presenter.buffer_count, 2);
        assert_eq!(config.presenter.pixel_format, PixelFormat::Bgra8Unorm);
        assert!(config.presenter.vsync);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let presenter = PresenterConfig::new()
            .with_buffer_count(3)
            .with_pixel_format(PixelFormat::Rgba8Unorm)
            .with_vsync(false)
            .with_validation(true);
        assert_eq!(presenter.buffer_count, 3);
        assert!(!presenter.vsync);
        assert!(presenter.validation_enabled());

        let window = WindowConfig::new("Wnd2").with_size(640, 480).with_resizable(false);
        assert_eq!(window.title, "Wnd2");
        assert_eq!((window.width, window.height), (640, 480));
        assert!(!window.resizable);
    }

    #[test]
    fn test_validation_errors() {
        assert!(PresenterConfig::new().with_buffer_count(0).validate().is_err());
        assert!(PresenterConfig::new().with_buffer_count(64).validate().is_ok());
        assert!(WindowConfig::default().with_size(0, 10).validate().is_err());
        assert!(matches!(
            ApplicationConfig::new().with_log_level("loud").validate(),
            Err(ConfigError::Invalid(message)) if message.contains("loud")
        ));
        assert!(matches!(
            ApplicationConfig::new()
                .with_presenter(PresenterConfig::new().with_buffer_count(0))
                .validate(),
            Err(ConfigError::Invalid(_))
        ));
        assert_eq!(
            ApplicationConfig::new().with_log_level("debug").level_filter(),
            Ok(LevelFilter::Debug)
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ApplicationConfig = toml::from_str(
            r#"
            log_level = "warn"

            [presenter]
            buffer_count = 3
            pixel_format = "Rgba8Unorm"
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.log_level, "warn");
        assert_eq!(config.presenter.buffer_count, 3);
        assert_eq!(config.presenter.pixel_format, PixelFormat::Rgba8Unorm);
        assert!(config.presenter.vsync);
        assert_eq!(config.window, WindowConfig::default());
    }

    #[test]
    fn test_toml_file_round_trip() {
        let path = scratch_path("round_trip.toml");
        let config = ApplicationConfig::new()
            .with_log_level("debug")
            .with_window(WindowConfig::new("Scene").with_size(800, 600))
            .with_presenter(PresenterConfig::new().with_buffer_count(3).with_validation(false));

        config.save_to_file(&path).expect("save toml");
        let loaded = ApplicationConfig::load_from_file(&path).expect("load toml");
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_ron_file_round_trip() {
        let path = scratch_path("round_trip.ron");
        let config = ApplicationConfig::new().with_presenter(PresenterConfig::new().with_vsync(false));

        config.save_to_file(&path).expect("save ron");
        let loaded = ApplicationConfig::load_from_file(&path).expect("load ron");
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unsupported_and_missing_files() {
        let config = ApplicationConfig::default();
        assert!(matches!(
            config.save_to_file(scratch_path("config.yaml")),
            Err(ConfigError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            ApplicationConfig::load_from_file(scratch_path("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
