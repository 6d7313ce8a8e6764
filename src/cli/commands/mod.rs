//! CLI command implementations

pub mod build;
pub mod completions;
pub mod config;
pub mod init;
pub mod plan;
pub mod render;
pub mod status;

pub use build::execute as build;
pub use completions::execute as completions;
pub use config::execute as config;
pub use init::execute as init;
pub use plan::execute as plan;
pub use render::execute as render;
pub use status::execute as status;
