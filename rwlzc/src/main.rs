//! RWLZ Compiler CLI
//!
//! The main entry point for the RWLZ compiler.
//!
//! # Usage
//!
//! ```text
//! rwlzc [OPTIONS] <COMMAND>
//!
//! Commands:
//!   lex      Tokenize source and display token stream
//!   parse    Parse source and display AST
//!   check    Analyze source file
//!   symbols  Analyze source file and display the symbol table
//!   ir       Generate LLVM IR
//!   build    Compile to executable
//!
//! Options:
//!   -v, --verbose        Increase verbosity (can be repeated)
//!   -q, --quiet          Only log errors
//!       --color <WHEN>   Control color output [default: auto]
//!       --config <PATH>  Configuration file (defaults to rwlz.toml beside the source)
//! ```

use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use rwlzc::config::{CompilerConfig, DiagnosticFormat};
use rwlzc::diagnostics::DiagnosticEmitter;
use rwlzc::toolchain::{SystemToolchain, Toolchain};
use rwlzc::{Compilation, Diagnostic, Lexer};

/// The RWLZ ("Lizard") compiler
#[derive(Parser)]
#[command(name = "rwlzc")]
#[command(version)]
#[command(about = "Compiler for the RWLZ creature-behavior language", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase verbosity (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Control when to use colored output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,

    /// Configuration file
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Tokenize source file and display token stream
    ///
    /// Prints each token as `line:col kind 'text'`, followed by any
    /// lexical errors.
    Lex(FileArgs),

    /// Parse source file and display AST
    ///
    /// Prints the complete Abstract Syntax Tree in Rust debug format.
    Parse(FileArgs),

    /// Analyze source file
    ///
    /// Parses and analyzes the input file, then prints every diagnostic and
    /// a summary line.
    Check(FileArgs),

    /// Analyze source file and display the symbol table
    Symbols(FileArgs),

    /// Generate LLVM IR
    Ir(OutputArgs),

    /// Compile source file to executable
    ///
    /// Generates IR and hands it to the configured C compiler driver.
    Build(OutputArgs),
}

#[derive(Args)]
struct FileArgs {
    /// Source file to process
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

#[derive(Args)]
struct OutputArgs {
    #[command(flatten)]
    input: FileArgs,

    /// Output path
    #[arg(short, long, value_name = "OUT")]
    output: Option<PathBuf>,
}

/// When to use colored output
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Use colors when stderr is a terminal
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    fn enabled(self) -> bool {
        match self {
            ColorChoice::Auto => std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }
}

/// Settings shared by every command.
struct Session {
    config_path: Option<PathBuf>,
    color: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let session = Session {
        config_path: cli.config,
        color: cli.color.enabled(),
    };

    let result = match cli.command {
        Commands::Lex(args) => cmd_lex(&args, &session),
        Commands::Parse(args) => cmd_parse(&args, &session),
        Commands::Check(args) => cmd_check(&args, &session),
        Commands::Symbols(args) => cmd_symbols(&args, &session),
        Commands::Ir(args) => cmd_ir(&args, &session),
        Commands::Build(args) => cmd_build(&args, &session),
    };
    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::from(1)
        }
    }
}

/// `RUST_LOG` wins; otherwise the level follows `-v`/`-q`.
fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Source text and configuration for one input file.
struct Input {
    path: PathBuf,
    source: String,
    config: CompilerConfig,
}

impl Input {
    fn load(file: &Path, session: &Session) -> Result<Self, String> {
        let source = fs::read_to_string(file)
            .map_err(|e| format!("cannot read '{}': {e}", file.display()))?;
        let config = CompilerConfig::discover(session.config_path.as_deref(), file)
            .map_err(|e| e.to_string())?;
        Ok(Self {
            path: file.to_path_buf(),
            source,
            config,
        })
    }

    fn filename(&self) -> String {
        self.path.display().to_string()
    }

    fn report(&self, diagnostics: &[Diagnostic], session: &Session) -> Result<(), String> {
        match self.config.diagnostics.format {
            DiagnosticFormat::Human => {
                let filename = self.filename();
                DiagnosticEmitter::new(&filename, &self.source)
                    .with_color(session.color)
                    .emit_all(diagnostics);
            }
            DiagnosticFormat::Json => {
                let json = DiagnosticEmitter::render_json(diagnostics).map_err(|e| e.to_string())?;
                eprintln!("{json}");
            }
        }
        Ok(())
    }

    /// Print diagnostics and the summary line of a compilation.
    fn report_compilation(&self, compilation: &Compilation, session: &Session) -> Result<(), String> {
        self.report(compilation.diagnostics.as_slice(), session)?;
        if let Some(error) = &compilation.codegen_error {
            eprintln!("internal compiler error: {error}");
        }
        eprintln!(
            "{}: {} error(s), {} warning(s)",
            self.filename(),
            compilation.error_count(),
            compilation.warning_count()
        );
        Ok(())
    }
}

fn cmd_lex(args: &FileArgs, session: &Session) -> Result<bool, String> {
    let input = Input::load(&args.file, session)?;
    let mut lexer = Lexer::new(&input.source);

    let mut count = 0usize;
    while let Some(token) = lexer.next() {
        count += 1;
        let text = if token.kind.has_text() {
            format!(" '{}'", lexer.slice(&token.span))
        } else {
            String::new()
        };
        println!(
            "{}:{} {:?}{text}",
            token.span.start_line, token.span.start_col, token.kind
        );
    }

    let diagnostics = lexer.take_diagnostics();
    tracing::info!(tokens = count, errors = diagnostics.len(), "lexed");
    input.report(&diagnostics, session)?;
    Ok(diagnostics.is_empty())
}

fn cmd_parse(args: &FileArgs, session: &Session) -> Result<bool, String> {
    let input = Input::load(&args.file, session)?;
    match rwlzc::Parser::new(&input.source).parse_program() {
        Ok(program) => {
            println!("{program:#?}");
            Ok(true)
        }
        Err(errors) => {
            input.report(&errors, session)?;
            Ok(false)
        }
    }
}

fn cmd_check(args: &FileArgs, session: &Session) -> Result<bool, String> {
    let input = Input::load(&args.file, session)?;
    let compilation = rwlzc::analyze(&input.source, &input.config);
    input.report_compilation(&compilation, session)?;
    Ok(compilation.succeeded())
}

fn cmd_symbols(args: &FileArgs, session: &Session) -> Result<bool, String> {
    let input = Input::load(&args.file, session)?;
    let compilation = rwlzc::analyze(&input.source, &input.config);
    if let Some(symbols) = &compilation.symbols {
        print!("{}", symbols.dump());
    }
    input.report_compilation(&compilation, session)?;
    Ok(compilation.succeeded())
}

/// Compile to IR text, reporting diagnostics on failure.
fn generate(input: &Input, session: &Session) -> Result<Option<String>, String> {
    let compilation = rwlzc::compile(&input.source, &input.config);
    if !compilation.succeeded() || compilation.warning_count() > 0 {
        input.report_compilation(&compilation, session)?;
    }
    Ok(compilation.module.map(|module| module.to_string()))
}

fn cmd_ir(args: &OutputArgs, session: &Session) -> Result<bool, String> {
    let input = Input::load(&args.input.file, session)?;
    let Some(ir) = generate(&input, session)? else {
        return Ok(false);
    };

    match &args.output {
        Some(path) => {
            fs::write(path, ir).map_err(|e| format!("cannot write '{}': {e}", path.display()))?;
            tracing::info!(output = %path.display(), "wrote IR");
        }
        None => print!("{ir}"),
    }
    Ok(true)
}

fn cmd_build(args: &OutputArgs, session: &Session) -> Result<bool, String> {
    let input = Input::load(&args.input.file, session)?;
    let Some(ir) = generate(&input, session)? else {
        return Ok(false);
    };

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| input.path.with_extension(""));
    let toolchain = SystemToolchain::new(&input.config.toolchain);
    let executable = toolchain.link(&ir, &output).map_err(|e| e.to_string())?;
    println!("Build successful: {}", executable.display());
    Ok(true)
}
