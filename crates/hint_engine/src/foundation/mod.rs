//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Geometry types for placement and composition
//! - Logging utilities

pub mod math;
pub mod logging;
