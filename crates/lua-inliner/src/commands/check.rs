//! Check command - report what would be inlined without writing

use anyhow::{bail, Context, Result};
use clap::Args;
use lua_inliner_diagnostics::{Diagnostics, Severity, SourceCache};
use lua_inliner_transform::{inline, InlineStats};
use std::fs;
use std::path::PathBuf;

use super::{collect_lua_files, emitter, resolve_options, use_color_on};
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Input Lua file or directory
    #[arg(default_value = ".")]
    pub input: PathBuf,

    /// Lowest severity that fails a file (hint, warning, error)
    #[arg(long)]
    pub error_on: Option<Severity>,

    /// Treat warnings as errors
    #[arg(long, conflicts_with = "error_on")]
    pub strict: bool,

    /// One line per diagnostic
    #[arg(long)]
    pub short: bool,

    /// Configuration file (defaults to ./lua-inliner.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

struct FileReport {
    file: String,
    stats: Option<InlineStats>,
}

pub fn run(args: CheckArgs, format: OutputFormat, color: bool, quiet: bool) -> Result<()> {
    let use_color = use_color_on(color, atty::Stream::Stdout);
    let error_on = if args.strict {
        Some(Severity::Warning)
    } else {
        args.error_on
    };
    let (options, _) = resolve_options(args.config.as_deref(), error_on)?;
    let files = collect_lua_files(&args.input)?;

    if files.is_empty() {
        match format {
            OutputFormat::Text => println!("No Lua files found."),
            OutputFormat::Json => println!(
                "{}",
                serde_json::json!({
                    "success": true,
                    "files": 0,
                    "errors": 0,
                    "warnings": 0,
                })
            ),
        }
        return Ok(());
    }

    if matches!(format, OutputFormat::Text) && !quiet {
        println!("Checking {} file(s)...", files.len());
    }

    let mut source_cache = SourceCache::new();
    let mut all_diagnostics = Diagnostics::new();
    let mut reports = Vec::with_capacity(files.len());

    for file in &files {
        let source = fs::read_to_string(file)
            .with_context(|| format!("could not read {}", file.display()))?;
        let filename = file.display().to_string();

        let (stats, diagnostics) = match inline(&source, &filename, &mut source_cache, &options) {
            Ok(output) => (Some(output.stats), output.diagnostics),
            Err(diagnostics) => (None, diagnostics),
        };
        log::debug!("{filename}: {} diagnostic(s)", diagnostics.len());

        all_diagnostics.extend(diagnostics);
        reports.push(FileReport {
            file: filename,
            stats,
        });
    }

    let mut out = emitter(format, use_color, args.short, std::io::stdout());
    out.emit_all(&all_diagnostics, &source_cache)?;

    let failed = reports.iter().filter(|r| r.stats.is_none()).count();

    match format {
        OutputFormat::Text => {
            if !quiet {
                for report in &reports {
                    print_report(report, use_color);
                }
            }
            out.emit_summary(&all_diagnostics)?;
            if failed == 0 && !quiet {
                let message = format!("{} file(s) can be inlined", reports.len());
                if use_color {
                    println!("{}", console::style(message).green());
                } else {
                    println!("{message}");
                }
            }
        }
        OutputFormat::Json => {
            for report in &reports {
                let json = match &report.stats {
                    Some(stats) => serde_json::json!({
                        "type": "file",
                        "file": report.file,
                        "ok": true,
                        "functions": stats.functions,
                        "call_sites": stats.call_sites,
                        "inlined": stats.inlined,
                    }),
                    None => serde_json::json!({
                        "type": "file",
                        "file": report.file,
                        "ok": false,
                    }),
                };
                println!("{json}");
            }
            out.emit_summary(&all_diagnostics)?;
        }
    }

    if failed > 0 {
        bail!("{failed} of {} file(s) cannot be inlined", reports.len());
    }
    Ok(())
}

fn print_report(report: &FileReport, use_color: bool) {
    let Some(stats) = &report.stats else {
        if use_color {
            println!("  {} {}", console::style("failed").red().bold(), report.file);
        } else {
            println!("  failed {}", report.file);
        }
        return;
    };

    let counts = format!(
        "{} inline function(s), {} of {} call site(s) inlined",
        stats.functions, stats.inlined, stats.call_sites
    );
    if use_color {
        println!(
            "  {} {}: {}",
            console::style("ok").green().bold(),
            report.file,
            console::style(counts).dim()
        );
    } else {
        println!("  ok {}: {counts}", report.file);
    }
}
