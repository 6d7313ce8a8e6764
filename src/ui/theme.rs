//! Custom theme for cliclack prompts

use cliclack::ThemeState;
use console::Style;

/// Blue while the engine works, green once an image exists, bold red when a
/// stage fails. An interrupted build shows yellow.
#[derive(Debug, Clone, Default)]
pub struct StagecraftTheme;

impl StagecraftTheme {
    fn state_style(state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().blue(),
            ThemeState::Error(_) => Style::new().red().bold(),
            ThemeState::Cancel => Style::new().yellow(),
            ThemeState::Submit => Style::new().green(),
        }
    }
}

impl cliclack::Theme for StagecraftTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        match state {
            // Finished steps fade so the running one stands out
            ThemeState::Submit => Style::new().green().dim(),
            _ => Self::state_style(state),
        }
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        Self::state_style(state)
    }
}

/// Initialize the global theme
pub fn init_theme() {
    cliclack::set_theme(StagecraftTheme);
}
