use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Styles for CLI status lines and record tables
#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub info: Style,
    pub dim: Style,
    /// Diagnostic flag set
    pub flag_on: Style,
    /// Diagnostic flag clear
    pub flag_off: Style,
}

impl Theme {
    /// Colored only when stdout is a terminal and `NO_COLOR`/`CLICOLOR=0` are not set.
    /// Piped `query --format text` output stays free of escape codes.
    pub fn detect() -> Self {
        if console::Term::stdout().is_term() && console::colors_enabled() {
            Self::colored()
        } else {
            Self::uniform(Style::new())
        }
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            warn: Style::new().yellow().bold(),
            info: Style::new().magenta(),
            dim: Style::new().white().dimmed(),
            flag_on: Style::new().green(),
            flag_off: Style::new().bright_black(),
        }
    }

    /// Same style for every role
    pub fn uniform(style: Style) -> Self {
        Self {
            header: style.clone(),
            success: style.clone(),
            error: style.clone(),
            warn: style.clone(),
            info: style.clone(),
            dim: style.clone(),
            flag_on: style.clone(),
            flag_off: style,
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use owo_colors::OwoColorize;

    #[test]
    fn test_uniform_plain_has_no_escapes() {
        let theme = Theme::uniform(Style::new());
        assert_eq!("yes".style(theme.flag_on.clone()).to_string(), "yes");
        assert_eq!("Stats".style(theme.header.clone()).to_string(), "Stats");
    }

    #[test]
    fn test_colored_emits_escapes() {
        let theme = Theme::colored();
        assert!("yes".style(theme.flag_on.clone()).to_string().contains('\u{1b}'));
    }
}
