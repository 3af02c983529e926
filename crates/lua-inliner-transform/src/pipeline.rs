//! parse → collect functions → collect calls → rewrite.
//!
//! Every stage adds its diagnostics to one list. After each stage the list
//! is checked against [`InlineOptions::error_on`]; reaching it stops the
//! pipeline and returns everything collected so far.

use crate::calls::collect_inline_calls;
use crate::collect::collect_inline_functions;
use crate::rewrite::rewrite;
use lua_inliner_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, Severity, SourceCache};
use lua_inliner_parser::{
    parse_lua_with_cache, print_chunk_with, Chunk, PrintOptions, ScopeTree,
};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct InlineOptions {
    /// Lowest severity that makes the pipeline fail.
    pub error_on: Severity,
    /// Severities to use instead of the codes' defaults.
    pub severity_overrides: HashMap<DiagnosticCode, Severity>,
}

impl Default for InlineOptions {
    fn default() -> Self {
        Self {
            error_on: Severity::Error,
            severity_overrides: HashMap::new(),
        }
    }
}

impl InlineOptions {
    pub fn with_error_on(mut self, severity: Severity) -> Self {
        self.error_on = severity;
        self
    }

    pub fn with_override(mut self, code: DiagnosticCode, severity: Severity) -> Self {
        self.severity_overrides.insert(code, severity);
        self
    }

    fn apply_overrides(&self, diagnostics: &mut Diagnostics) {
        for diagnostic in diagnostics.iter_mut() {
            if let Some(&severity) = self.severity_overrides.get(&diagnostic.code) {
                diagnostic.severity = severity;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InlineStats {
    /// Functions marked and accepted for inlining.
    pub functions: usize,
    /// Calls selected for inlining.
    pub call_sites: usize,
    /// Calls actually replaced.
    pub inlined: usize,
}

/// A successfully rewritten file.
#[derive(Debug)]
pub struct InlineOutput {
    pub chunk: Chunk,
    /// Diagnostics below the failure threshold.
    pub diagnostics: Diagnostics,
    pub stats: InlineStats,
}

impl InlineOutput {
    pub fn render(&self) -> String {
        self.render_with(&PrintOptions::default())
    }

    pub fn render_with(&self, options: &PrintOptions) -> String {
        print_chunk_with(&self.chunk, options)
    }
}

/// Inline every call to a marked function in `source`.
///
/// `filename` is registered in `cache` so that the spans of the returned
/// diagnostics can be resolved to locations.
pub fn inline(
    source: &str,
    filename: &str,
    cache: &mut SourceCache,
    options: &InlineOptions,
) -> Result<InlineOutput, Diagnostics> {
    let mut diagnostics = Diagnostics::new();

    let mut chunk = match parse_lua_with_cache(source, filename, cache) {
        Ok(parsed) => parsed.chunk,
        Err(errors) => {
            // There is no tree to continue with, whatever the severity.
            finish_stage(&mut diagnostics, errors, options)?;
            return Err(diagnostics);
        }
    };

    let collected = collect_inline_functions(&chunk);
    finish_stage(&mut diagnostics, collected.diagnostics, options)?;
    let mut functions = collected.functions;

    let scopes = ScopeTree::build(&chunk);
    let collected = collect_inline_calls(&chunk, &functions, &scopes);
    finish_stage(&mut diagnostics, collected.diagnostics, options)?;
    let calls = collected.calls;

    let inlined = rewrite(&mut chunk, &scopes, &mut functions, &calls);

    let mut unused = Diagnostics::new();
    for (function, count) in functions.iter().zip(&inlined) {
        if *count == 0 {
            unused.push(
                Diagnostic::new(
                    DiagnosticCode::UnusedInlineFunction,
                    format!("inline function '{}' is never inlined", function.name),
                )
                .with_span(function.name_span)
                .with_help("call it from a position that can be inlined, or drop the directive")
                .build(),
            );
        }
    }
    finish_stage(&mut diagnostics, unused, options)?;

    let stats = InlineStats {
        functions: functions.len(),
        call_sites: calls.len(),
        inlined: inlined.iter().sum(),
    };
    log::debug!(
        "{filename}: {} inline functions, {} of {} call sites inlined",
        stats.functions,
        stats.inlined,
        stats.call_sites
    );

    Ok(InlineOutput {
        chunk,
        diagnostics,
        stats,
    })
}

/// [`inline`] for a string, rendered with default print options.
pub fn inline_source(source: &str, options: &InlineOptions) -> Result<String, Diagnostics> {
    let mut cache = SourceCache::new();
    inline(source, "<input>", &mut cache, options).map(|output| output.render())
}

fn finish_stage(
    all: &mut Diagnostics,
    mut stage: Diagnostics,
    options: &InlineOptions,
) -> Result<(), Diagnostics> {
    options.apply_overrides(&mut stage);
    all.extend(stage);

    if all.any_at_or_above(options.error_on) {
        log::debug!("stopping with {} diagnostics", all.len());
        return Err(std::mem::take(all));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADD: &str = "local function add(a, b)\n    --!!INLINE_FUNCTION\n    return a + b\nend\n";

    #[test]
    fn test_stats_are_reported() {
        let mut cache = SourceCache::new();
        let output = inline(
            &format!("{ADD}local x = add(1, 2)\nlocal y = add(x, 3)"),
            "stats.lua",
            &mut cache,
            &InlineOptions::default(),
        )
        .unwrap();
        assert_eq!(
            output.stats,
            InlineStats {
                functions: 1,
                call_sites: 2,
                inlined: 2,
            }
        );
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_parse_error_always_fails() {
        let options =
            InlineOptions::default().with_override(DiagnosticCode::ParseError, Severity::Hint);
        let diagnostics = inline_source("local = 1", &options).unwrap_err();
        assert_eq!(diagnostics.count_of(DiagnosticCode::ParseError), 1);
    }

    #[test]
    fn test_collection_errors_stop_before_rewriting() {
        let source = "local function v(...)\n    --!!INLINE_FUNCTION\n    return ...\nend\nlocal function f()\n    --!!INLINE_FUNCTION\n    return f()\nend";
        let diagnostics = inline_source(source, &InlineOptions::default()).unwrap_err();
        // The recursive call is never looked at.
        assert_eq!(diagnostics.count_of(DiagnosticCode::VariadicFunction), 1);
        assert_eq!(diagnostics.count_of(DiagnosticCode::InvalidDirective), 1);
        assert_eq!(diagnostics.count_of(DiagnosticCode::RecursiveCall), 0);
    }

    #[test]
    fn test_threshold_and_overrides() {
        let source = format!("{ADD}local x = ok and add(1, 2)");

        // A warning and a hint: both below the default threshold.
        let mut cache = SourceCache::new();
        let output = inline(&source, "a.lua", &mut cache, &InlineOptions::default()).unwrap();
        assert_eq!(output.diagnostics.warning_count(), 1);
        assert_eq!(output.diagnostics.hint_count(), 1);
        assert_eq!(output.stats.inlined, 0);

        let strict = InlineOptions::default().with_error_on(Severity::Warning);
        assert!(inline_source(&source, &strict).is_err());

        let relaxed = strict.with_override(DiagnosticCode::ConditionalCall, Severity::Hint);
        assert!(inline_source(&source, &relaxed).is_ok());

        let pedantic = InlineOptions::default().with_error_on(Severity::Hint);
        let diagnostics = inline_source(&source, &pedantic).unwrap_err();
        // Stopped after call collection, before the unused-function hint.
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_recursion_can_be_downgraded() {
        let source = "local function f(n)\n    --!!INLINE_FUNCTION\n    return f(n)\nend\nlocal r = f(1)";
        assert!(inline_source(source, &InlineOptions::default()).is_err());

        let options =
            InlineOptions::default().with_override(DiagnosticCode::RecursiveCall, Severity::Warning);
        let output = inline_source(source, &options).unwrap();
        assert!(output.ends_with("local r = __inline_return__0\n"));
    }
}
