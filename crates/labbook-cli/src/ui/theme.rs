//! Badges and text styling.

use owo_colors::OwoColorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Ok,
    Err,
}

impl Badge {
    pub fn text(self) -> &'static str {
        match self {
            Badge::Ok => "[OK]",
            Badge::Err => "[ERR]",
        }
    }

    pub fn paint(self, color: bool) -> String {
        match (self, color) {
            (_, false) => self.text().to_string(),
            (Badge::Ok, true) => self.text().green().bold().to_string(),
            (Badge::Err, true) => self.text().red().bold().to_string(),
        }
    }
}

pub(super) fn dim(text: &str, color: bool) -> String {
    if color {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

pub(super) fn bold(text: &str, color: bool) -> String {
    if color {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}
