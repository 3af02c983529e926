//! Diagnostic infrastructure for the Lua inliner.
//!
//! This crate provides structured error reporting with:
//! - Source location tracking (file, line, column)
//! - Diagnostic codes with a default severity per code
//! - Multiple output formats (terminal, JSON, simple text)
//!
//! # Example
//!
//! ```
//! use lua_inliner_diagnostics::{
//!     Diagnostic, DiagnosticCode, DiagnosticEmitter, SimpleEmitter, SourceCache, Span,
//! };
//!
//! let mut cache = SourceCache::new();
//! let file_id = cache.add_file("main.lua", "local function f(...)\nend\n".to_string());
//!
//! let diag = Diagnostic::new(
//!     DiagnosticCode::VariadicFunction,
//!     "cannot inline functions with variadic parameters",
//! )
//! .with_span(Span::new(file_id, 17, 20))
//! .build();
//!
//! let mut out = Vec::new();
//! SimpleEmitter::new(&mut out).emit(&diag, &cache).unwrap();
//! assert!(String::from_utf8(out).unwrap().starts_with("main.lua:1:18: error:"));
//! ```

pub mod diagnostic;
pub mod emitter;
pub mod source_cache;
pub mod span;

pub use diagnostic::{Diagnostic, DiagnosticBuilder, DiagnosticCode, Diagnostics, Severity};
pub use emitter::{DiagnosticEmitter, JsonEmitter, SimpleEmitter, TerminalEmitter};
pub use source_cache::{SourceCache, SourceFile};
pub use span::{FileId, Label, Location, Span};
