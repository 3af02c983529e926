//! Lua front-end for the inliner.
//!
//! This crate turns Lua source into a syntax tree that keeps comments and
//! blank lines, answers scope and binding queries over that tree, and
//! prints a (possibly rewritten) tree back to Lua.

pub mod ast;
mod error;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod scope;
pub mod visit;

pub use ast::{Chunk, NodeId, NodeIdGen};
pub use error::ParseError;
pub use printer::{print_chunk, print_chunk_with, PrintOptions};
pub use scope::{DeclarationKind, ScopeId, ScopeTree, Variable, VariableId, VariableKind};

use lua_inliner_diagnostics::{Diagnostics, FileId, SourceCache};

/// Result of parsing a Lua file.
#[derive(Debug)]
pub struct ParseResult {
    /// The parsed chunk
    pub chunk: Chunk,
    /// The file ID in the source cache
    pub file_id: FileId,
}

/// Parse Lua source code with diagnostic support.
///
/// The source is registered in `cache` under `filename` so that spans in
/// the returned tree, and in any parse diagnostic, resolve to locations.
pub fn parse_lua_with_cache(
    source: &str,
    filename: &str,
    cache: &mut SourceCache,
) -> Result<ParseResult, Diagnostics> {
    let file_id = cache.add_file(filename, source.to_string());

    match parser::parse(source, file_id) {
        Ok(chunk) => {
            log::debug!(
                "parsed {filename}: {} top-level statements, {} comments",
                chunk.block.stmts.len(),
                chunk.comments.len()
            );
            Ok(ParseResult { chunk, file_id })
        }
        Err(error) => {
            log::debug!("failed to parse {filename}: {error}");
            Err(Diagnostics::from(vec![error.to_diagnostic()]))
        }
    }
}

/// Parse Lua source code without a source cache.
pub fn parse_lua(source: &str) -> Result<Chunk, ParseError> {
    parser::parse(source, FileId(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lua_inliner_diagnostics::{DiagnosticCode, Severity};

    #[test]
    fn test_parse_with_cache() {
        let source = "local x = 42";
        let mut cache = SourceCache::new();

        let result = parse_lua_with_cache(source, "test.lua", &mut cache).unwrap();

        assert_eq!(result.chunk.block.stmts.len(), 1);
        assert_ne!(result.file_id, FileId::DUMMY);
        assert!(cache.get_file(result.file_id).is_some());
    }

    #[test]
    fn test_parse_error_with_cache() {
        let source = "local x = ";
        let mut cache = SourceCache::new();

        let diagnostics = parse_lua_with_cache(source, "test.lua", &mut cache).unwrap_err();

        let error = diagnostics.iter().next().unwrap();
        assert_eq!(error.code, DiagnosticCode::ParseError);
        assert_eq!(error.severity, Severity::Error);
        assert_eq!(error.message, "unexpected symbol near '<eof>'");
        assert_eq!(cache.location(error.span).unwrap().to_string(), "test.lua:1:11");
    }
}
