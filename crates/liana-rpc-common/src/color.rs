//! ANSI styling for diagnostics.
//!
//! Styling is decided once by [`init`]: it is off when asked for, when
//! `NO_COLOR` is set, or when stderr is not a terminal.

use std::fmt::Display;
use std::io::IsTerminal;
use std::sync::OnceLock;

static DISABLED: OnceLock<bool> = OnceLock::new();

pub fn init(no_color_flag: bool) {
    let disabled = no_color_flag
        || std::env::var_os("NO_COLOR").is_some()
        || !std::io::stderr().is_terminal();
    let _ = DISABLED.set(disabled);
}

pub fn is_disabled() -> bool {
    DISABLED.get().copied().unwrap_or(false)
}

#[derive(Debug, Clone, Copy)]
enum Style {
    Red,
    Yellow,
    Grey,
}

impl Style {
    fn sgr(self) -> &'static str {
        match self {
            Style::Red => "31",
            Style::Yellow => "33",
            Style::Grey => "90",
        }
    }

    fn apply(self, text: impl Display) -> String {
        if is_disabled() {
            text.to_string()
        } else {
            format!("\x1b[{}m{}\x1b[0m", self.sgr(), text)
        }
    }
}

pub struct Colors;

impl Colors {
    pub fn error(text: impl Display) -> String {
        Style::Red.apply(text)
    }

    pub fn warning(text: impl Display) -> String {
        Style::Yellow.apply(text)
    }

    pub fn dim(text: impl Display) -> String {
        Style::Grey.apply(text)
    }
}
