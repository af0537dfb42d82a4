//! # Core Module
//!
//! Shared settings consumed by the parser, scheduler, placement search and
//! compatibility shim.
//!
//! ## Organization
//!
//! - **Config**: Unified configuration for all subsystems

pub mod config;

// Re-export commonly used config types
pub use config::{
    HintConfig,
    SurfaceConfig,
    ScheduleConfig,
    PlacementConfig,
    ParserConfig,
    CompatConfig,
    Config,
    ConfigError,
};
