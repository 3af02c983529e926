//! Inline command - rewrite Lua files

use anyhow::{bail, Context, Result};
use clap::Args;
use lua_inliner_diagnostics::{Severity, SourceCache};
use lua_inliner_transform::inline;
use similar::TextDiff;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{collect_lua_files, emitter, resolve_options, use_color_on};
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct InlineArgs {
    /// Input Lua file or directory
    pub input: PathBuf,

    /// Output file, or output directory when the input is a directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Overwrite the input file(s)
    #[arg(long, conflicts_with = "output")]
    pub in_place: bool,

    /// Print a unified diff instead of writing anything
    #[arg(long, conflicts_with_all = ["output", "in_place"])]
    pub diff: bool,

    /// Lowest severity that fails a file (hint, warning, error)
    #[arg(long)]
    pub error_on: Option<Severity>,

    /// Configuration file (defaults to ./lua-inliner.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Where the rewritten source of one file goes.
enum Destination {
    Stdout,
    Diff,
    File(PathBuf),
}

impl InlineArgs {
    fn destination(&self, file: &Path) -> Result<Destination> {
        if self.diff {
            return Ok(Destination::Diff);
        }
        if self.in_place {
            return Ok(Destination::File(file.to_path_buf()));
        }
        let Some(output) = &self.output else {
            return Ok(Destination::Stdout);
        };

        if self.input.is_file() {
            if output.is_dir() {
                let name = file.file_name().context("input has no file name")?;
                return Ok(Destination::File(output.join(name)));
            }
            return Ok(Destination::File(output.clone()));
        }

        let relative = file.strip_prefix(&self.input).with_context(|| {
            format!("{} is not under {}", file.display(), self.input.display())
        })?;
        Ok(Destination::File(output.join(relative)))
    }
}

pub fn run(args: InlineArgs, format: OutputFormat, color: bool, quiet: bool) -> Result<()> {
    if args.input.is_dir() && args.output.is_none() && !args.in_place && !args.diff {
        bail!(
            "{} is a directory; use --output <dir>, --in-place or --diff",
            args.input.display()
        );
    }

    let (options, print_options) = resolve_options(args.config.as_deref(), args.error_on)?;
    let files = collect_lua_files(&args.input)?;

    if files.is_empty() {
        if !quiet {
            eprintln!("No Lua files found.");
        }
        return Ok(());
    }

    let mut source_cache = SourceCache::new();
    // Diagnostics go to stderr, the rewritten source may go to stdout.
    let use_color = use_color_on(color, atty::Stream::Stderr);
    let mut diagnostics_out = emitter(format, use_color, false, std::io::stderr());
    let mut stdout = std::io::stdout().lock();

    let mut failed = 0usize;
    let mut rewritten = 0usize;
    let mut inlined = 0usize;

    for file in &files {
        let source = fs::read_to_string(file)
            .with_context(|| format!("could not read {}", file.display()))?;
        let filename = file.display().to_string();

        let output = match inline(&source, &filename, &mut source_cache, &options) {
            Ok(output) => output,
            Err(diagnostics) => {
                diagnostics_out.emit_all(&diagnostics, &source_cache)?;
                log::info!("{filename}: not rewritten");
                failed += 1;
                continue;
            }
        };

        if !quiet {
            diagnostics_out.emit_all(&output.diagnostics, &source_cache)?;
        }

        let rendered = output.render_with(&print_options);
        log::info!(
            "{filename}: inlined {} of {} call sites",
            output.stats.inlined,
            output.stats.call_sites
        );
        inlined += output.stats.inlined;

        match args.destination(file)? {
            Destination::Stdout => stdout.write_all(rendered.as_bytes())?,
            Destination::Diff => {
                if rendered != source {
                    let diff = TextDiff::from_lines(&source, &rendered);
                    let unified = diff
                        .unified_diff()
                        .header(&format!("a/{filename}"), &format!("b/{filename}"))
                        .to_string();
                    stdout.write_all(unified.as_bytes())?;
                }
            }
            Destination::File(path) => {
                if path == *file && rendered == source {
                    continue;
                }
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("could not create {}", parent.display()))?;
                }
                fs::write(&path, &rendered)
                    .with_context(|| format!("could not write {}", path.display()))?;
                log::info!("wrote {}", path.display());
                rewritten += 1;
            }
        }
    }

    let writes_files = args.in_place || args.output.is_some();
    if writes_files && !quiet {
        match format {
            OutputFormat::Text => writeln!(
                stdout,
                "Inlined {inlined} call site(s), wrote {rewritten} of {} file(s)",
                files.len()
            )?,
            OutputFormat::Json => writeln!(
                stdout,
                "{}",
                serde_json::json!({
                    "success": failed == 0,
                    "files": files.len(),
                    "written": rewritten,
                    "failed": failed,
                    "inlined": inlined,
                })
            )?,
        }
    }

    if failed > 0 {
        bail!("{failed} file(s) could not be inlined");
    }
    Ok(())
}
