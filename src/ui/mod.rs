//! UI module for consistent CLI output
//!
//! Uses `cliclack` for spinners and log lines, with automatic fallback to
//! plain output in CI/non-interactive environments.
//!
//! # Example
//!
//! ```rust,ignore
//! use stagecraft::ui::{self, BuildProgress, UiContext};
//!
//! let ctx = UiContext::detect();
//!
//! ui::intro(&ctx, "stagecraft build");
//!
//! let progress = BuildProgress::new(&ctx, "stagecraft-app");
//! // ... feed engine output into progress.on_line ...
//! progress.finish();
//!
//! ui::step_ok_detail(&ctx, "Image built", "stagecraft-app:a1b2c3d4e5f6");
//! ui::outro_success(&ctx, "Done");
//! ```

mod context;
mod output;
mod progress;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, key_value, key_value_status, outro_error, outro_success, remark, section,
    step_error_detail, step_info, step_ok, step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::{BuildProgress, TaskSpinner};
pub use theme::{init_theme, StagecraftTheme};
