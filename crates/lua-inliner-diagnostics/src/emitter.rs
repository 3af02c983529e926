//! Diagnostic emitters for different output formats.

use crate::diagnostic::{Diagnostic, Diagnostics, Severity};
use crate::source_cache::SourceCache;
use std::io::Write;

/// Writes diagnostics in some output format.
pub trait DiagnosticEmitter {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()>;

    fn emit_all(&mut self, diagnostics: &Diagnostics, cache: &SourceCache) -> std::io::Result<()> {
        for diagnostic in diagnostics {
            self.emit(diagnostic, cache)?;
        }
        Ok(())
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()>;
}

/// ANSI escape sequences, or empty strings when colour is disabled.
struct Palette {
    colored: bool,
}

impl Palette {
    fn pick(&self, code: &'static str) -> &'static str {
        if self.colored {
            code
        } else {
            ""
        }
    }

    fn severity(&self, severity: Severity) -> &'static str {
        match severity {
            Severity::Error => self.pick("\x1b[31m"),
            Severity::Warning => self.pick("\x1b[33m"),
            Severity::Hint => self.pick("\x1b[34m"),
        }
    }

    fn bold(&self) -> &'static str {
        self.pick("\x1b[1m")
    }

    fn gutter(&self) -> &'static str {
        self.pick("\x1b[36m")
    }

    fn reset(&self) -> &'static str {
        self.pick("\x1b[0m")
    }
}

/// rustc-style output with a source snippet under each diagnostic.
pub struct TerminalEmitter<W: Write> {
    writer: W,
    palette: Palette,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn new(writer: W, colored: bool) -> Self {
        Self {
            writer,
            palette: Palette { colored },
        }
    }

    fn snippet(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        let Some(file) = cache.get_file(diagnostic.span.file_id) else {
            return Ok(());
        };
        let (line, column) = file.line_column(diagnostic.span.start);
        let Some(text) = file.line_text(line) else {
            return Ok(());
        };

        let number = line.to_string();
        let pad = " ".repeat(number.len());
        let (gutter, reset) = (self.palette.gutter(), self.palette.reset());
        let color = self.palette.severity(diagnostic.severity);

        let start = (column - 1) as usize;
        let width = (diagnostic.span.len().max(1) as usize)
            .min(text.len().saturating_sub(start))
            .max(1);

        writeln!(self.writer, "{pad} {gutter}|{reset}")?;
        writeln!(self.writer, "{gutter}{number} |{reset} {text}")?;
        writeln!(
            self.writer,
            "{pad} {gutter}|{reset} {}{color}{}{reset}",
            " ".repeat(start),
            "^".repeat(width)
        )
    }
}

impl<W: Write> DiagnosticEmitter for TerminalEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        let color = self.palette.severity(diagnostic.severity);
        let (bold, gutter, reset) = (
            self.palette.bold(),
            self.palette.gutter(),
            self.palette.reset(),
        );

        writeln!(
            self.writer,
            "{bold}{color}{}[{}]{reset}: {}",
            diagnostic.severity, diagnostic.code, diagnostic.message
        )?;

        if let Some(location) = cache.location(diagnostic.span) {
            writeln!(self.writer, "  {gutter}-->{reset} {location}")?;
            self.snippet(diagnostic, cache)?;
        }

        for label in &diagnostic.labels {
            if let Some(location) = cache.location(label.span) {
                writeln!(
                    self.writer,
                    "  {gutter}note{reset}: {} ({location})",
                    label.message
                )?;
            }
        }

        if let Some(help) = &diagnostic.help {
            writeln!(self.writer, "  {gutter}= help:{reset} {help}")?;
        }

        writeln!(self.writer)
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        let errors = diagnostics.error_count();
        let warnings = diagnostics.warning_count();
        if errors == 0 && warnings == 0 {
            return Ok(());
        }

        let color = if errors > 0 {
            self.palette.severity(Severity::Error)
        } else {
            self.palette.severity(Severity::Warning)
        };
        let plural = |n: usize| if n == 1 { "" } else { "s" };

        let mut parts = Vec::new();
        if errors > 0 {
            parts.push(format!("{errors} error{}", plural(errors)));
        }
        if warnings > 0 {
            parts.push(format!("{warnings} warning{}", plural(warnings)));
        }
        writeln!(
            self.writer,
            "{color}{} emitted{}",
            parts.join(" and "),
            self.palette.reset()
        )
    }
}

/// One JSON object per line, for editor and CI integration.
pub struct JsonEmitter<W: Write> {
    writer: W,
}

impl<W: Write> JsonEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> DiagnosticEmitter for JsonEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        let location = |span| {
            cache.location(span).map(|l| {
                serde_json::json!({
                    "file": l.file,
                    "line": l.line,
                    "column": l.column,
                })
            })
        };

        let json = serde_json::json!({
            "code": diagnostic.code.as_str(),
            "kind": diagnostic.code.name(),
            "severity": diagnostic.severity.as_str(),
            "message": diagnostic.message,
            "location": location(diagnostic.span),
            "span": if diagnostic.span.is_dummy() {
                serde_json::Value::Null
            } else {
                serde_json::json!({ "start": diagnostic.span.start, "end": diagnostic.span.end })
            },
            "labels": diagnostic.labels.iter().map(|label| serde_json::json!({
                "message": label.message,
                "location": location(label.span),
            })).collect::<Vec<_>>(),
            "help": diagnostic.help,
        });

        serde_json::to_writer(&mut self.writer, &json)?;
        writeln!(self.writer)
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        let summary = serde_json::json!({
            "type": "summary",
            "errors": diagnostics.error_count(),
            "warnings": diagnostics.warning_count(),
            "hints": diagnostics.hint_count(),
            "total": diagnostics.len(),
        });
        serde_json::to_writer(&mut self.writer, &summary)?;
        writeln!(self.writer)
    }
}

/// `file:line:col: severity: message [code]`, one line per diagnostic.
pub struct SimpleEmitter<W: Write> {
    writer: W,
}

impl<W: Write> SimpleEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> DiagnosticEmitter for SimpleEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        if let Some(location) = cache.location(diagnostic.span) {
            write!(self.writer, "{location}: ")?;
        }
        writeln!(
            self.writer,
            "{}: {} [{}]",
            diagnostic.severity, diagnostic.message, diagnostic.code
        )
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        writeln!(
            self.writer,
            "{} error(s), {} warning(s)",
            diagnostics.error_count(),
            diagnostics.warning_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticCode;
    use crate::span::Span;

    fn recursive_call(cache: &mut SourceCache) -> Diagnostic {
        let id = cache.add_file(
            "rec.lua",
            "local function f(n)\n    return f(n - 1)\nend\n".to_string(),
        );
        Diagnostic::new(DiagnosticCode::RecursiveCall, "cannot inline recursive call to 'f'")
            .with_span(Span::new(id, 31, 39))
            .with_label(Span::new(id, 0, 19), "'f' is declared here")
            .build()
    }

    #[test]
    fn test_terminal_output_has_snippet_and_note() {
        let mut cache = SourceCache::new();
        let diagnostic = recursive_call(&mut cache);

        let mut out = Vec::new();
        TerminalEmitter::new(&mut out, false)
            .emit(&diagnostic, &cache)
            .unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("error[INL003]: cannot inline recursive call to 'f'"));
        assert!(text.contains("--> rec.lua:2:12"));
        assert!(text.contains("2 |     return f(n - 1)"));
        assert!(text.contains("^^^^^^^^"));
        assert!(text.contains("note: 'f' is declared here (rec.lua:1:1)"));
    }

    #[test]
    fn test_json_output_is_one_object_per_line() {
        let mut cache = SourceCache::new();
        let diagnostic = recursive_call(&mut cache);

        let mut out = Vec::new();
        let mut emitter = JsonEmitter::new(&mut out);
        emitter.emit(&diagnostic, &cache).unwrap();
        emitter
            .emit_summary(&Diagnostics::from(vec![diagnostic]))
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines[0]["code"], "INL003");
        assert_eq!(lines[0]["kind"], "recursive-call");
        assert_eq!(lines[0]["location"]["line"], 2);
        assert_eq!(lines[1]["errors"], 1);
    }

    #[test]
    fn test_summary_pluralizes() {
        let mut out = Vec::new();
        let diagnostics = Diagnostics::from(vec![
            Diagnostic::error(DiagnosticCode::ParseError, "a").build(),
            Diagnostic::error(DiagnosticCode::ParseError, "b").build(),
            Diagnostic::warning(DiagnosticCode::ConditionalCall, "c").build(),
        ]);
        TerminalEmitter::new(&mut out, false)
            .emit_summary(&diagnostics)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "2 errors and 1 warning emitted\n"
        );
    }
}
