use crate::ast_printer::Notation;

/// Settings for one [`Lox`](crate::lox::Lox) session, built once by the caller
/// and handed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// Log each parsed program and raise the default log level to `debug`.
    pub verbose: bool,
    /// Interactive input: trailing `;` optional, bare expressions echoed.
    pub repl: bool,
    pub notation: Notation,
}

impl Config {
    pub fn repl() -> Self {
        Self {
            repl: true,
            ..Self::default()
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_notation(mut self, notation: Notation) -> Self {
        self.notation = notation;
        self
    }

    /// Filter directive used when `RUST_LOG` is not set.
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}
