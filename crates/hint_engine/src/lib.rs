//! # Hint Engine
//!
//! Composes many independently owned, frequently changing pieces of text
//! into one markup payload per viewer, for surfaces that accept a single
//! string at a limited refresh rate.
//!
//! ## Features
//!
//! - **Markup Layout**: per-character metrics for a rich-text tag dialect
//! - **Floating Placement**: collision-free positions found by grid search
//! - **Update Coalescing**: changes merged into as few refreshes as possible
//! - **Adaptive Sync**: elements wait briefly for predicted updates of others
//! - **Non-blocking Producers**: mutations only post messages to a session
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hint_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Registry::new(HintConfig::default())?;
//!     let session = registry.create_session("player-1", LogSink::default())?;
//!
//!     let health = ElementState::static_text("<b>100</b> HP")
//!         .with_position(-900.0, 1000.0)
//!         .with_align(HorizontalAlign::Left)
//!         .build();
//!     session.add("status", health.clone())?;
//!
//!     health.set_text("<b>75</b> HP");
//!     Ok(())
//! }
//! ```

#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core configuration
pub mod core;

pub mod foundation;
pub mod config;
pub mod cache;
pub mod text;
pub mod schedule;
pub mod ui;
pub mod session;
pub mod compat;

#[cfg(test)]
mod tests;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        compat::CompatShim,
        core::{Config, HintConfig},
        session::{ChannelSink, Delivery, LogSink, OutputSink, Registry, Session, SessionError, SinkError},
        text::MarkupParser,
        ui::{
            Boundary, ContentContext, ContentError, Element, ElementKind, ElementState, HorizontalAlign,
            Margin, OverflowStrategy, Priority, SyncSpeed, VerticalAnchor,
        },
    };
}
