//! # Core Engine Module
//!
//! Shared configuration used by the presentation engine, the window layer and
//! applications.

pub mod config;

pub use config::{ApplicationConfig, Config, ConfigError, PresenterConfig, WindowConfig};
