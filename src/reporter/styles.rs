use std::io::IsTerminal;

pub use console::{Style, Term};

use crate::invoker::Outcome;

pub struct Styles {
    pub style_heading: Style,
    pub style_allowed: Style,
    pub style_denied: Style,
    pub style_errored: Style,
    pub style_skipped: Style,
}

impl Styles {
    pub fn new(use_color: bool) -> Self {
        let stdout_is_tty = std::io::stdout().is_terminal();
        let is_term = Term::stdout().is_term();

        // Enable color only when explicitly requested and stdout is a terminal.
        let styles_enabled = use_color && stdout_is_tty && is_term;
        Self {
            style_heading: Style::new().bold().force_styling(styles_enabled),
            style_allowed: Style::new().green().force_styling(styles_enabled),
            style_denied: Style::new().red().force_styling(styles_enabled),
            style_errored: Style::new().yellow().force_styling(styles_enabled),
            style_skipped: Style::new().dim().force_styling(styles_enabled),
        }
    }

    pub fn for_outcome(&self, outcome: Outcome) -> &Style {
        match outcome {
            Outcome::Allowed => &self.style_allowed,
            Outcome::Denied => &self.style_denied,
            Outcome::Errored => &self.style_errored,
            Outcome::Skipped => &self.style_skipped,
        }
    }
}
