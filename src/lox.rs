use std::{cell::RefCell, rc::Rc};

use crate::{
    ast_printer::print_program,
    config::Config,
    parser::{self, ParseErrors},
    tokenizer::{self, TokenizeErrors},
    tree_walk_interpreter::{ExecutionError, Interpreter},
};

/// Exit code for a source that does not tokenize or parse.
pub const EXIT_DATA_ERROR: i32 = 65;
/// Exit code for a program that fails while running.
pub const EXIT_SOFTWARE_ERROR: i32 = 70;

#[derive(Debug, thiserror::Error)]
pub enum LoxError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeErrors),
    #[error(transparent)]
    Parse(#[from] ParseErrors),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl LoxError {
    pub fn exit_code(&self) -> i32 {
        match self {
            LoxError::Tokenize(_) | LoxError::Parse(_) => EXIT_DATA_ERROR,
            LoxError::Execution(_) => EXIT_SOFTWARE_ERROR,
        }
    }
}

/// Runs program text through tokenizer, parser and interpreter.
///
/// The interpreter lives as long as the `Lox`, so variables defined by one
/// [`Lox::run`] call are visible to the next. A failed call leaves no state
/// behind that would affect later calls.
#[derive(Debug)]
pub struct Lox {
    config: Config,
    interpreter: Interpreter,
}

impl Lox {
    pub fn new(config: Config) -> Self {
        Self::with_output(config, Rc::new(RefCell::new(std::io::stdout())))
    }

    pub fn with_output(config: Config, stdout: Rc<RefCell<dyn std::io::Write>>) -> Self {
        let interpreter = Interpreter::new(stdout).with_echo(config.repl);
        Self {
            config,
            interpreter,
        }
    }

    pub fn run(&mut self, source: &str) -> Result<(), LoxError> {
        tracing::debug!(bytes = source.len(), "tokenizing");
        let tokens = tokenizer::tokens(source)?;

        tracing::debug!(tokens = tokens.len(), "parsing");
        let program = parser::program(&tokens, self.config.repl)?;
        if self.config.verbose {
            tracing::debug!("syntax tree:\n{}", print_program(&program, self.config.notation));
        }

        tracing::debug!(statements = program.0.len(), "interpreting");
        self.interpreter.interpret(&program)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn session(config: Config) -> (Lox, Rc<RefCell<Vec<u8>>>) {
        let output = Rc::new(RefCell::new(Vec::new()));
        (Lox::with_output(config, output.clone()), output)
    }

    fn take(output: &Rc<RefCell<Vec<u8>>>) -> String {
        String::from_utf8(output.take()).expect("Output should be valid UTF-8")
    }

    #[test]
    fn test_exit_codes() {
        let (mut lox, _) = session(Config::default());
        assert_eq!(lox.run("print @;").unwrap_err().exit_code(), 65);
        assert_eq!(lox.run("print ;").unwrap_err().exit_code(), 65);
        assert_eq!(lox.run("1/0;").unwrap_err().exit_code(), 70);
        assert!(lox.run("print 1;").is_ok());
    }

    #[test]
    fn test_parse_error_skips_whole_batch() {
        let (mut lox, output) = session(Config::default());
        let err = lox.run("print 1;\nprint 2").unwrap_err();
        assert!(matches!(err, LoxError::Parse(_)));
        assert_eq!(err.to_string(), "[line 2] Error at end: Expect ';' after value.");
        assert_eq!(take(&output), "");
    }

    #[test]
    fn test_tokenize_error_reports_every_line() {
        let (mut lox, _) = session(Config::default());
        let err = lox.run("var a = 1;\n$\nvar b = \"open").unwrap_err();
        assert_eq!(
            err.to_string(),
            "[line 2] Error: Unexpected character: $\n[line 3] Error: Unterminated string."
        );
    }

    #[test]
    fn test_runtime_error_message() {
        let (mut lox, output) = session(Config::default());
        let err = lox.run("print \"before\";\n1/0;\nprint \"after\";").unwrap_err();
        assert_eq!(err.to_string(), "[line 2] Division by Zero is not allowed");
        assert_eq!(take(&output), "'before'\n");
    }

    #[test]
    fn test_repl_session_keeps_bindings() {
        let (mut lox, output) = session(Config::repl());
        lox.run("var a = 1;").unwrap();
        assert!(lox.run("a = ;").is_err());
        assert!(lox.run("a + nil").is_err());
        lox.run("a = a + 1;").unwrap();
        lox.run("a").unwrap();
        assert_eq!(take(&output), "2\n2\n");
    }

    #[test]
    fn test_file_mode_requires_semicolon_and_does_not_echo() {
        let (mut lox, output) = session(Config::default());
        assert!(lox.run("1 + 2").is_err());
        lox.run("1 + 2;").unwrap();
        assert_eq!(take(&output), "");
    }

    #[test]
    fn test_output_failure_exit_code() {
        struct Closed;
        impl std::io::Write for Closed {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::ErrorKind::BrokenPipe.into())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut lox = Lox::with_output(Config::default(), Rc::new(RefCell::new(Closed)));
        let err = lox.run("print 1;").unwrap_err();
        assert!(matches!(err, LoxError::Execution(ExecutionError::Output(_))));
        assert_eq!(err.exit_code(), 70);
    }
}
