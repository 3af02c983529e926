//! Diagnostic codes, severities and the diagnostic collection.

use crate::span::{Label, Span};
use serde::{Deserialize, Serialize};

/// Severity level of a diagnostic, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational note; never blocks a rewrite on its own.
    Hint,
    /// Something was left untouched that the user probably wanted inlined.
    Warning,
    /// The input cannot be inlined as written.
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Hint => "hint",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hint" => Ok(Severity::Hint),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// Every kind of diagnostic the inliner produces.
///
/// The serde names double as the keys accepted in the configuration file's
/// `[inline.severity]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    /// The source could not be lexed or parsed.
    ParseError,
    /// An inline directive appears somewhere other than the first trivia of
    /// an inlinable local function body.
    InvalidDirective,
    /// A function marked inline declares `...`.
    VariadicFunction,
    /// An inline function is called from inside its own declaration.
    RecursiveCall,
    /// A call to an inline function sits where it is evaluated conditionally
    /// or repeatedly, so it cannot be hoisted before its statement.
    ConditionalCall,
    /// A function marked inline has no call sites that were inlined.
    UnusedInlineFunction,
    /// A variable the inline body reads from outside is shadowed by another
    /// local at the call site.
    ShadowedCapture,
}

impl DiagnosticCode {
    pub const ALL: [DiagnosticCode; 7] = [
        DiagnosticCode::ParseError,
        DiagnosticCode::InvalidDirective,
        DiagnosticCode::VariadicFunction,
        DiagnosticCode::RecursiveCall,
        DiagnosticCode::ConditionalCall,
        DiagnosticCode::UnusedInlineFunction,
        DiagnosticCode::ShadowedCapture,
    ];

    /// Short code printed in brackets, e.g. `INL002`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseError => "P001",
            Self::InvalidDirective => "INL001",
            Self::VariadicFunction => "INL002",
            Self::RecursiveCall => "INL003",
            Self::ConditionalCall => "INL004",
            Self::UnusedInlineFunction => "INL005",
            Self::ShadowedCapture => "INL006",
        }
    }

    /// Human readable kebab-case name, as used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ParseError => "parse-error",
            Self::InvalidDirective => "invalid-directive",
            Self::VariadicFunction => "variadic-function",
            Self::RecursiveCall => "recursive-call",
            Self::ConditionalCall => "conditional-call",
            Self::UnusedInlineFunction => "unused-inline-function",
            Self::ShadowedCapture => "shadowed-capture",
        }
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            Self::ParseError
            | Self::InvalidDirective
            | Self::VariadicFunction
            | Self::RecursiveCall => Severity::Error,
            Self::ConditionalCall | Self::ShadowedCapture => Severity::Warning,
            Self::UnusedInlineFunction => Severity::Hint,
        }
    }

    /// Look a code up by either its short code (`INL003`) or its name
    /// (`recursive-call`).
    pub fn lookup(text: &str) -> Option<DiagnosticCode> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_str().eq_ignore_ascii_case(text) || code.name() == text)
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single structured diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,
    /// Longer help text, printed after the snippet.
    pub help: Option<String>,
    pub span: Span,
    /// Related locations.
    pub labels: Vec<Label>,
}

impl Diagnostic {
    /// Start a diagnostic with the code's default severity.
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, code.default_severity(), message)
    }

    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Error, message)
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Warning, message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    pub fn is_hint(&self) -> bool {
        self.severity == Severity::Hint
    }
}

/// Fluent builder for [`Diagnostic`].
pub struct DiagnosticBuilder {
    inner: Diagnostic,
}

impl DiagnosticBuilder {
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            inner: Diagnostic {
                code,
                severity,
                message: message.into(),
                help: None,
                span: Span::DUMMY,
                labels: Vec::new(),
            },
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.inner.span = span;
        self
    }

    /// Add a label pointing at a related location.
    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.inner.labels.push(Label::new(span, message));
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.inner.help = Some(help.into());
        self
    }

    pub fn build(self) -> Diagnostic {
        self.inner
    }
}

/// Ordered collection of diagnostics gathered across pipeline stages.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    /// Whether any diagnostic is at least as severe as `threshold`.
    pub fn any_at_or_above(&self, threshold: Severity) -> bool {
        self.items.iter().any(|d| d.severity >= threshold)
    }

    pub fn has_errors(&self) -> bool {
        self.any_at_or_above(Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_warning()).count()
    }

    pub fn hint_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_hint()).count()
    }

    /// Number of diagnostics carrying `code`.
    pub fn count_of(&self, code: DiagnosticCode) -> usize {
        self.items.iter().filter(|d| d.code == code).count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Diagnostic> {
        self.items.iter_mut()
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(items: Vec<Diagnostic>) -> Self {
        Self { items }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
