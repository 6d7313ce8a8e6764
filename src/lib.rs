//! stagecraft - two-stage container image builder
//!
//! Builds a slim runtime image for an interpreted service with native
//! extensions: a builder stage compiles and installs the dependency
//! closure, and only the declared install artifacts reach the runtime
//! stage.

pub mod build;
pub mod build_log;
pub mod cli;
pub mod config;
pub mod error;
pub mod orchestration;
pub mod plan;
pub mod ui;

pub use error::{StagecraftError, StagecraftResult};
