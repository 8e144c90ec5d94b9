use std::io::Write;

use clap::{Args, Parser, Subcommand};
use treelox::{ast_printer::Notation, config::Config, lox::Lox};

/// Exit code for a bad invocation, e.g. a source file that cannot be read.
const EXIT_USAGE: i32 = 64;

#[derive(Debug, Parser)]
#[command(version, about = "A tree-walking interpreter for Lox")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Log every stage of the pipeline, including the parsed syntax tree
    #[arg(long, global = true)]
    verbose: bool,

    /// Log syntax trees in reverse Polish notation
    #[arg(long, global = true)]
    rpolish: bool,
}

impl Cli {
    pub fn command(&self) -> &Command {
        self.command.as_ref().unwrap_or(&Command::Repl)
    }

    fn config(&self) -> Config {
        let config = match self.command() {
            Command::Repl => Config::repl(),
            Command::Run(_) => Config::default(),
        };
        let notation = if self.rpolish {
            Notation::ReversePolish
        } else {
            Notation::Parenthesized
        };
        config.with_verbose(self.verbose).with_notation(notation)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a source file
    Run(RunArgs),
    /// Start an interactive prompt
    Repl,
}

#[derive(Debug, Args)]
struct RunArgs {
    file: String,
}

fn main() {
    let args = Cli::parse();
    let config = args.config();
    init_logging(&config);

    match args.command() {
        Command::Repl => {
            repl_command(config);
        }
        Command::Run(run_args) => {
            run_command(config, run_args);
        }
    }
}

fn init_logging(config: &Config) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_log_filter()));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn repl_command(config: Config) {
    println!("Lox {} | Tree-walking interpreter", env!("CARGO_PKG_VERSION"));
    println!("EOF to exit. (Ctrl+D on *nix, Ctrl+Z on Windows)");

    let mut lox = Lox::new(config);
    let mut input = String::new();

    loop {
        print!("> ");
        if let Err(e) = std::io::stdout().flush() {
            tracing::error!("failed to flush stdout: {e}");
            break;
        }

        input.clear();
        match std::io::stdin().read_line(&mut input) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::error!("failed to read from stdin: {e}");
                break;
            }
        }

        if let Err(e) = lox.run(input.trim()) {
            eprintln!("{e}");
        }
    }
}

fn run_command(config: Config, args: &RunArgs) {
    let source = match std::fs::read_to_string(&args.file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Could not read '{}': {e}", args.file);
            std::process::exit(EXIT_USAGE);
        }
    };

    let mut lox = Lox::new(config);
    if let Err(e) = lox.run(&source) {
        eprintln!("{e}");
        std::process::exit(e.exit_code());
    }
}
