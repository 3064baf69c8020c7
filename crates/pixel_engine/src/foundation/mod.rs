//! Foundation module - low-level utilities used throughout the engine

pub mod logging;
