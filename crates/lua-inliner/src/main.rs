//! lua-inliner - Lua function inliner
//!
//! CLI driver for expanding calls to functions marked `--!!INLINE_FUNCTION`.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

/// Lua function inliner
#[derive(Parser, Debug)]
#[command(name = "lua-inliner")]
#[command(author, version, about = "Inline Lua functions marked with --!!INLINE_FUNCTION")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inline marked functions in Lua file(s)
    Inline(commands::inline::InlineArgs),

    /// Report what would be inlined without writing anything
    Check(commands::check::CheckArgs),

    /// Explain a diagnostic code
    Explain(commands::explain::ExplainArgs),
}

/// Check if the first non-flag argument looks like a Lua file
fn is_legacy_invocation(args: &[String]) -> bool {
    for arg in args.iter().skip(1) {
        // Skip flags
        if arg.starts_with('-') {
            continue;
        }
        if arg.ends_with(".lua") {
            return true;
        }
        if matches!(arg.as_str(), "inline" | "check" | "explain" | "help") {
            return false;
        }
        // First non-flag, non-subcommand arg
        break;
    }
    false
}

/// Transform legacy args (lua-inliner file.lua -o out.lua) to subcommand form
fn transform_legacy_args(args: Vec<String>) -> Vec<String> {
    let mut new_args = vec![args[0].clone(), "inline".to_string()];
    new_args.extend(args.into_iter().skip(1));
    new_args
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    // Handle legacy invocation (lua-inliner file.lua -o out.lua)
    let args: Vec<String> = std::env::args().collect();
    let effective_args = if is_legacy_invocation(&args) {
        transform_legacy_args(args)
    } else {
        args
    };

    let cli = Cli::parse_from(effective_args);
    init_logging(cli.verbose, cli.quiet);

    // Colours are allowed; each command checks the stream it writes to
    let color = !cli.no_color && !cli.quiet;

    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Inline(args) => commands::inline::run(args, cli.format, color, cli.quiet),
        Commands::Check(args) => commands::check::run(args, cli.format, color, cli.quiet),
        Commands::Explain(args) => commands::explain::run(args, cli.format, color),
    }
}
