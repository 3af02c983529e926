//! `lua-inliner.toml` loading
//!
//! ```toml
//! [inline]
//! error_on = "warning"
//!
//! [inline.severity]
//! recursive-call = "warning"
//!
//! [output]
//! indent = 2
//! ```

use lua_inliner_diagnostics::{DiagnosticCode, Severity};
use lua_inliner_parser::PrintOptions;
use lua_inliner_transform::InlineOptions;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = "lua-inliner.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("unknown diagnostic '{0}' in [inline.severity]")]
    UnknownCode(String),

    #[error("indent must be between 1 and 16, got {0}")]
    InvalidIndent(usize),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub inline: InlineSection,
    pub output: OutputSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InlineSection {
    /// Lowest severity that fails a file.
    pub error_on: Option<Severity>,
    /// Per-code severities, keyed by code (`INL004`) or name (`conditional-call`).
    pub severity: BTreeMap<String, Severity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub indent: Option<usize>,
}

impl Config {
    /// Load `explicit` if given, otherwise `lua-inliner.toml` from the
    /// current directory when it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = Path::new(CONFIG_FILE);
                if path.is_file() {
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn inline_options(&self) -> Result<InlineOptions, ConfigError> {
        let mut options = InlineOptions::default();
        if let Some(error_on) = self.inline.error_on {
            options.error_on = error_on;
        }
        for (key, &severity) in &self.inline.severity {
            let code =
                DiagnosticCode::lookup(key).ok_or_else(|| ConfigError::UnknownCode(key.clone()))?;
            options = options.with_override(code, severity);
        }
        Ok(options)
    }

    pub fn print_options(&self) -> Result<PrintOptions, ConfigError> {
        let mut options = PrintOptions::default();
        if let Some(indent) = self.output.indent {
            if !(1..=16).contains(&indent) {
                return Err(ConfigError::InvalidIndent(indent));
            }
            options.indent = indent;
        }
        Ok(options)
    }
}
