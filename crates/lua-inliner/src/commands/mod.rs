//! CLI command implementations

pub mod check;
pub mod explain;
pub mod inline;

use anyhow::{bail, Result};
use lua_inliner_diagnostics::{
    DiagnosticEmitter, JsonEmitter, Severity, SimpleEmitter, TerminalEmitter,
};
use lua_inliner_parser::PrintOptions;
use lua_inliner_transform::InlineOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::OutputFormat;

/// Collect all Lua files under `path`, sorted for stable output.
pub(crate) fn collect_lua_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        bail!("path not found: {}", path.display());
    }

    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "lua") {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

/// Resolve the pipeline and printer settings from the config file and flags.
pub(crate) fn resolve_options(
    config_path: Option<&Path>,
    error_on: Option<Severity>,
) -> Result<(InlineOptions, PrintOptions)> {
    let config = Config::load(config_path)?;
    let mut options = config.inline_options()?;
    if let Some(severity) = error_on {
        options.error_on = severity;
    }
    Ok((options, config.print_options()?))
}

/// Whether to colour output written to `stream`: colours are allowed by the
/// flags and the stream is a terminal.
pub(crate) fn use_color_on(color: bool, stream: atty::Stream) -> bool {
    color && atty::is(stream)
}

/// Pick the emitter for the requested format.
pub(crate) fn emitter<'a, W: Write + 'a>(
    format: OutputFormat,
    use_color: bool,
    short: bool,
    writer: W,
) -> Box<dyn DiagnosticEmitter + 'a> {
    match format {
        OutputFormat::Json => Box::new(JsonEmitter::new(writer)),
        OutputFormat::Text if short => Box::new(SimpleEmitter::new(writer)),
        OutputFormat::Text => Box::new(TerminalEmitter::new(writer, use_color)),
    }
}
