//! Shared test utilities for the Outfitter workspace.
//!
//! This crate provides standardised fixtures so crate test suites do not each
//! grow their own. It is a dev-dependency only and never published.
//!
//! # Modules
//!
//! - [`actions`]: counting and failing actions for dispatch tests
//! - [`logger`]: a [`Logger`](outfitter_contracts::Logger) that records events
//! - [`workspace`]: [`TestWorkspace`](workspace::TestWorkspace) temp directories
//! - [`env`]: environment snapshot helpers

pub mod actions;
pub mod env;
pub mod logger;
pub mod workspace;

pub use actions::{CallCounter, counting_add_action, failing_action};
pub use env::env_from;
pub use logger::RecordingLogger;
pub use workspace::TestWorkspace;
