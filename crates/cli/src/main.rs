mod commands;

use std::ffi::OsString;
use std::io::IsTerminal;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::process;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use codecraft_core::canon::CANON_PATH_ENV;
use codecraft_core::{Reconstruction, RitualError};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// How block bodies are rebuilt from tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReconstructMode {
    /// Slice lines from the original source
    Source,
    /// Join token texts (lossy)
    Tokens,
}

impl From<ReconstructMode> for Reconstruction {
    fn from(mode: ReconstructMode) -> Self {
        match mode {
            ReconstructMode::Source => Reconstruction::Source,
            ReconstructMode::Tokens => Reconstruction::Tokens,
        }
    }
}

/// CodeCraft ritual compiler.
#[derive(Parser)]
#[command(
    name = "codecraft",
    version,
    about = "CodeCraft ritual compiler",
    override_usage = "codecraft [OPTIONS] <RITUAL>\n       codecraft [OPTIONS] <COMMAND>"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to the canon rule file
    #[arg(long, global = true, env = CANON_PATH_ENV)]
    canon: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a ritual to soul schema JSON (the default for a bare path)
    Compile {
        /// Path to the .ccraft ritual to compile
        ritual: PathBuf,

        /// Dump the token stream to stderr before compiling
        #[arg(long)]
        debug_tokens: bool,

        /// Block body reconstruction strategy
        #[arg(long, default_value = "source", value_enum)]
        reconstruct: ReconstructMode,
    },

    /// Print the token stream of a ritual
    Tokens {
        /// Path to the .ccraft ritual
        ritual: PathBuf,
    },

    /// Summarize the loaded canon rules
    Canon,
}

/// `codecraft [OPTIONS] <RITUAL>` is shorthand for `codecraft compile ...`.
/// Insert `compile` unless the first positional argument already names a
/// subcommand.
fn with_default_subcommand(mut args: Vec<OsString>) -> Vec<OsString> {
    let cmd = Cli::command();
    let compile = cmd.find_subcommand("compile");
    let takes_value = |long: &str| {
        cmd.get_arguments()
            .chain(compile.into_iter().flat_map(|c| c.get_arguments()))
            .any(|a| a.get_long() == Some(long) && a.get_action().takes_values())
    };

    let mut needs_compile = false;
    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        let text = arg.to_string_lossy();
        if text == "--" {
            needs_compile = rest.next().is_some();
            break;
        }
        if let Some(long) = text.strip_prefix("--") {
            if !long.contains('=') && takes_value(long) {
                rest.next();
            }
            continue;
        }
        if text.starts_with('-') && text.len() > 1 {
            continue;
        }
        needs_compile = text != "help" && cmd.find_subcommand(&*text).is_none();
        break;
    }

    if needs_compile {
        args.insert(1, OsString::from("compile"));
    }
    args
}

fn main() {
    let cli = Cli::parse_from(with_default_subcommand(std::env::args_os().collect()));
    init_tracing(cli.quiet);

    let output = cli.output;
    let quiet = cli.quiet;

    // Internal faults surface as a message and backtrace, never a bare abort.
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| run(cli)));
    match outcome {
        Ok(code) => process::exit(code),
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_owned());
            report_error(&format!("INTERNAL ERROR: {}", msg), output, false);
            if !quiet {
                eprintln!("{}", std::backtrace::Backtrace::force_capture());
            }
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> i32 {
    match cli.command {
        Some(Commands::Compile {
            ritual,
            debug_tokens,
            reconstruct,
        }) => commands::compile::cmd_compile(
            &ritual,
            &commands::compile::CompileArgs {
                canon: cli.canon,
                debug_tokens,
                reconstruction: reconstruct.into(),
            },
            cli.output,
        ),
        Some(Commands::Tokens { ritual }) => commands::tokens::cmd_tokens(&ritual, cli.output),
        Some(Commands::Canon) => {
            commands::canon::cmd_canon(cli.canon.as_deref(), cli.output, cli.quiet)
        }
        None => {
            eprintln!("{}", Cli::command().render_usage());
            1
        }
    }
}

/// Logs go to stderr so stdout only ever carries command output.
fn init_tracing(quiet: bool) {
    let default = if quiet { "error" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

/// Print `value` as pretty JSON on stdout and return the exit code. A value
/// that cannot be serialized is reported on stderr instead.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(pretty) => {
            println!("{}", pretty);
            0
        }
        Err(e) => {
            eprintln!("ERROR: serialization error: {}", e);
            1
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Text => {
            if !quiet {
                eprintln!("{}", msg);
            }
        }
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}

/// Render a pipeline error with its CLI prefix: `ERROR:` for file
/// problems, `PARSE ERROR:` for everything else.
pub(crate) fn report_ritual_error(e: &RitualError, output: OutputFormat) {
    match output {
        OutputFormat::Json => {
            let err_json = serde_json::to_string_pretty(&e.to_json_value())
                .unwrap_or_else(|_| format!("{{\"error\": \"{:?}\"}}", e));
            eprintln!("{}", err_json);
        }
        OutputFormat::Text => {
            let prefix = if e.is_file_error() {
                "ERROR"
            } else {
                "PARSE ERROR"
            };
            eprintln!("{}: {}", prefix, e);
        }
    }
}
