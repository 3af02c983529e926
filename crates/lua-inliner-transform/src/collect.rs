//! Discovery of functions marked for inlining.
//!
//! A `local function` is inlinable when the first comment of its body is
//! the line comment [`INLINE_DIRECTIVE`]:
//!
//! ```lua
//! local function add(a, b)
//!     --!!INLINE_FUNCTION
//!     return a + b
//! end
//! ```
//!
//! Directive comments anywhere else are reported as invalid.

use lua_inliner_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, Span};
use lua_inliner_parser::ast::*;
use lua_inliner_parser::visit::{walk_expr, walk_stmt, Visit};
use std::collections::HashSet;

pub const INLINE_DIRECTIVE: &str = "--!!INLINE_FUNCTION";

/// A validated inline function.
#[derive(Debug, Clone)]
pub struct InlineFunction {
    /// Id of the `local function` statement.
    pub declaration: NodeId,
    pub name: String,
    pub name_span: Span,
    pub params: Vec<Name>,
    /// The function body without the directive comment.
    pub body: Block,
    /// Largest number of values in any of the function's own `return`
    /// statements.
    pub max_return_count: usize,
    /// Number of `return` statements belonging to the function itself.
    pub return_sites: usize,
    /// Whether some `return` sits inside a loop of the body, where a
    /// `break` would only leave that loop.
    pub returns_in_loop: bool,
    /// Every identifier the function mentions: parameters, locals, globals,
    /// fields and labels.
    pub identifiers: HashSet<String>,
}

impl InlineFunction {
    fn new(declaration: NodeId, name: &Name, func: &FuncBody) -> Self {
        let mut function = Self {
            declaration,
            name: name.name.clone(),
            name_span: name.span,
            params: func.params.clone(),
            body: Block::default(),
            max_return_count: 0,
            return_sites: 0,
            returns_in_loop: false,
            identifiers: HashSet::new(),
        };
        function.refresh(&func.body);
        function
    }

    /// Take `body` as the function's body and recompute everything derived
    /// from it.
    pub(crate) fn refresh(&mut self, body: &Block) {
        let mut body = body.clone();
        strip_directive(&mut body);

        let mut returns = ReturnCounter::default();
        returns.visit_block(&body);

        let mut identifiers = IdentifierCollector::default();
        for param in &self.params {
            identifiers.names.insert(param.name.clone());
        }
        identifiers.visit_block(&body);

        self.max_return_count = returns.max;
        self.return_sites = returns.sites;
        self.returns_in_loop = returns.in_loop;
        self.identifiers = identifiers.names;
        self.body = body;
    }
}

/// Output of [`collect_inline_functions`].
#[derive(Debug, Default)]
pub struct CollectedFunctions {
    /// Inline functions in source order.
    pub functions: Vec<InlineFunction>,
    pub diagnostics: Diagnostics,
}

pub fn collect_inline_functions(chunk: &Chunk) -> CollectedFunctions {
    let mut collector = FunctionCollector::default();
    collector.visit_block(&chunk.block);

    let FunctionCollector {
        functions,
        mut diagnostics,
        validated,
    } = collector;

    for comment in &chunk.comments {
        if is_directive(comment) && !validated.contains(&comment.span) {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::InvalidDirective,
                    "invalid usage of inline directive",
                )
                .with_span(comment.span)
                .with_help(
                    "the directive must be the first line of the body of a \
                     non-variadic local function",
                )
                .build(),
            );
        }
    }

    log::debug!(
        "collected {} inline functions ({} diagnostics)",
        functions.len(),
        diagnostics.len()
    );
    CollectedFunctions {
        functions,
        diagnostics,
    }
}

pub fn is_directive(comment: &Comment) -> bool {
    comment.kind == CommentKind::Line && comment.text.trim_end() == INLINE_DIRECTIVE
}

/// Trivia a directive has to lead: that of the first statement, or of the
/// closing `end` when the body is empty.
fn body_trivia(block: &Block) -> &[Trivia] {
    match block.stmts.first() {
        Some(stmt) => &stmt.leading,
        None => &block.trailing,
    }
}

fn find_directive(block: &Block) -> Option<&Comment> {
    body_trivia(block)
        .iter()
        .find(|trivia| !matches!(trivia, Trivia::BlankLine))
        .and_then(Trivia::as_comment)
        .filter(|comment| is_directive(comment))
}

/// Remove the directive comment leading `block`, if there is one.
pub fn strip_directive(block: &mut Block) {
    let trivia = match block.stmts.first_mut() {
        Some(stmt) => &mut stmt.leading,
        None => &mut block.trailing,
    };
    let position = trivia
        .iter()
        .position(|trivia| !matches!(trivia, Trivia::BlankLine));
    if let Some(index) = position {
        if trivia[index].as_comment().is_some_and(is_directive) {
            trivia.remove(index);
        }
    }
}

#[derive(Default)]
struct FunctionCollector {
    functions: Vec<InlineFunction>,
    diagnostics: Diagnostics,
    /// Spans of directives that marked a function successfully.
    validated: HashSet<Span>,
}

impl Visit for FunctionCollector {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let StmtKind::LocalFunction { name, func } = &stmt.kind {
            if let Some(directive) = find_directive(&func.body) {
                if func.is_variadic {
                    log::debug!("rejecting variadic inline function '{}'", name.name);
                    self.diagnostics.push(
                        Diagnostic::new(
                            DiagnosticCode::VariadicFunction,
                            format!("cannot inline '{}': it has variadic parameters", name.name),
                        )
                        .with_span(name.span)
                        .with_help("remove `...` from the parameter list or drop the directive")
                        .build(),
                    );
                } else {
                    self.validated.insert(directive.span);
                    let function = InlineFunction::new(stmt.id, name, func);
                    log::debug!(
                        "inline function '{}': {} parameters, returns up to {} values",
                        function.name,
                        function.params.len(),
                        function.max_return_count
                    );
                    self.functions.push(function);
                }
            }
        }
        walk_stmt(self, stmt);
    }
}

/// Counts the `return` statements of one function, skipping nested ones.
#[derive(Default)]
struct ReturnCounter {
    sites: usize,
    max: usize,
    /// Loops enclosing the statement being walked.
    loops: usize,
    in_loop: bool,
}

impl Visit for ReturnCounter {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let StmtKind::Return { values } = &stmt.kind {
            self.sites += 1;
            self.max = self.max.max(values.len());
            self.in_loop |= self.loops > 0;
        }
        let is_loop = stmt.kind.is_loop();
        self.loops += usize::from(is_loop);
        walk_stmt(self, stmt);
        self.loops -= usize::from(is_loop);
    }

    fn visit_func_body(&mut self, _func: &FuncBody) {}
}

#[derive(Default)]
struct IdentifierCollector {
    names: HashSet<String>,
}

impl Visit for IdentifierCollector {
    fn visit_expr(&mut self, expr: &Expr) {
        if let ExprKind::Name(name) = &expr.kind {
            self.names.insert(name.clone());
        }
        walk_expr(self, expr);
    }

    fn visit_name(&mut self, name: &Name) {
        self.names.insert(name.name.clone());
    }
}
