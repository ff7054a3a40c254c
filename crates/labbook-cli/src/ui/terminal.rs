//! Output mode and color detection.

use std::io::IsTerminal;

/// How results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// `--json`: a single JSON document and nothing else
    Json,
    /// `key=value` lines and tab-separated tables
    #[default]
    Plain,
    /// Badges, colors and bordered tables
    Pretty,
}

impl OutputMode {
    /// `--json` always wins. Pretty output needs a real terminal on stdout.
    pub fn select(json: bool, terminal: &Terminal) -> Self {
        match (json, terminal.stdout_tty && !terminal.dumb) {
            (true, _) => Self::Json,
            (false, true) => Self::Pretty,
            (false, false) => Self::Plain,
        }
    }

    pub fn is_json(&self) -> bool {
        *self == Self::Json
    }

    pub fn is_pretty(&self) -> bool {
        *self == Self::Pretty
    }
}

/// What the process can observe about where its output goes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Terminal {
    pub stdout_tty: bool,

    /// `TERM=dumb`
    pub dumb: bool,

    /// `NO_COLOR` is set (any value)
    pub no_color_env: bool,
}

impl Terminal {
    pub fn detect() -> Self {
        Self {
            stdout_tty: std::io::stdout().is_terminal(),
            dumb: std::env::var("TERM").is_ok_and(|term| term == "dumb"),
            no_color_env: std::env::var_os("NO_COLOR").is_some(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiContext {
    pub color: bool,
    pub mode: OutputMode,
}

impl UiContext {
    pub fn new(json: bool, no_color: bool, terminal: &Terminal) -> Self {
        let mode = OutputMode::select(json, terminal);
        Self {
            color: mode.is_pretty() && !no_color && !terminal.no_color_env,
            mode,
        }
    }

    pub fn from_env(json: bool, no_color: bool) -> Self {
        Self::new(json, no_color, &Terminal::detect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tty() -> Terminal {
        Terminal {
            stdout_tty: true,
            ..Terminal::default()
        }
    }

    #[test]
    fn test_json_flag_wins_on_any_terminal() {
        assert_eq!(OutputMode::select(true, &tty()), OutputMode::Json);
        assert_eq!(OutputMode::select(true, &Terminal::default()), OutputMode::Json);
    }

    #[test]
    fn test_pipes_and_dumb_terminals_get_plain() {
        assert_eq!(OutputMode::select(false, &Terminal::default()), OutputMode::Plain);
        let dumb = Terminal {
            dumb: true,
            ..tty()
        };
        assert_eq!(OutputMode::select(false, &dumb), OutputMode::Plain);
        assert_eq!(OutputMode::select(false, &tty()), OutputMode::Pretty);
    }

    #[test]
    fn test_color_needs_pretty_mode_and_no_opt_out() {
        assert!(UiContext::new(false, false, &tty()).color);
        assert!(!UiContext::new(false, true, &tty()).color);
        assert!(!UiContext::new(true, false, &tty()).color);

        let no_color = Terminal {
            no_color_env: true,
            ..tty()
        };
        assert!(!UiContext::new(false, false, &no_color).color);
    }
}
