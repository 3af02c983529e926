//! Discovery of call sites bound to inline functions.

use crate::collect::InlineFunction;
use lua_inliner_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, Span};
use lua_inliner_parser::ast::*;
use lua_inliner_parser::visit::{walk_expr, walk_func_body, walk_stmt, Visit};
use lua_inliner_parser::{ScopeId, ScopeTree, VariableId, VariableKind};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A call that will be replaced by an expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineCall {
    /// Id of the call expression.
    pub call: NodeId,
    /// Declaration of the called inline function.
    pub function: NodeId,
    pub span: Span,
}

#[derive(Debug, Default)]
pub struct CollectedCalls {
    /// Calls in source order.
    pub calls: Vec<InlineCall>,
    pub diagnostics: Diagnostics,
}

/// Find every call whose callee resolves to one of `functions`.
///
/// Calls from inside the called function's own declaration are reported
/// as recursive. Calls that would only run conditionally or repeatedly
/// if hoisted in front of their statement (right operand of `and`/`or`,
/// loop conditions, `elseif` conditions) are left alone with a warning, as
/// are calls where a variable the body uses from outside is shadowed.
pub fn collect_inline_calls(
    chunk: &Chunk,
    functions: &[InlineFunction],
    scopes: &ScopeTree,
) -> CollectedCalls {
    let by_declaration: HashMap<NodeId, &InlineFunction> =
        functions.iter().map(|f| (f.declaration, f)).collect();
    let mut captures = HashMap::new();
    // Source order: a function only calls inline functions declared before it.
    for function in functions {
        let captured = captured_variables(function, &by_declaration, &captures, scopes);
        captures.insert(function.declaration, captured);
    }

    let mut collector = CallCollector {
        functions: by_declaration,
        captures,
        scopes,
        enclosing: Vec::new(),
        conditional: false,
        calls: Vec::new(),
        diagnostics: Diagnostics::new(),
    };
    collector.visit_block(&chunk.block);

    log::debug!(
        "collected {} inline call sites ({} diagnostics)",
        collector.calls.len(),
        collector.diagnostics.len()
    );
    CollectedCalls {
        calls: collector.calls,
        diagnostics: collector.diagnostics,
    }
}

struct CallCollector<'a> {
    functions: HashMap<NodeId, &'a InlineFunction>,
    /// Variables each inline function reads from outside its body.
    captures: HashMap<NodeId, BTreeMap<String, VariableId>>,
    scopes: &'a ScopeTree,
    /// `local function` statements currently being walked.
    enclosing: Vec<NodeId>,
    /// Whether the expression being walked is evaluated conditionally.
    conditional: bool,
    calls: Vec<InlineCall>,
    diagnostics: Diagnostics,
}

impl CallCollector<'_> {
    fn conditionally(&mut self, expr: &Expr) {
        let outer = std::mem::replace(&mut self.conditional, true);
        self.visit_expr(expr);
        self.conditional = outer;
    }

    fn check_call(&mut self, call: &Expr, callee: &Expr) {
        if !matches!(callee.kind, ExprKind::Name(_)) {
            return;
        }
        let Some(variable) = self.scopes.variable(callee.id) else {
            return;
        };
        // Globals, parameters and plain locals holding functions are
        // ordinary calls.
        if variable.kind != VariableKind::Local || !variable.is_local_function() {
            return;
        }
        let Some(function) = variable.node.and_then(|node| self.functions.get(&node)) else {
            return;
        };

        if self.enclosing.contains(&function.declaration) {
            log::debug!("recursive call to '{}' is not inlined", function.name);
            self.diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::RecursiveCall,
                    format!("cannot inline recursive call to '{}'", function.name),
                )
                .with_span(call.span)
                .with_label(
                    function.name_span,
                    format!("'{}' is declared here", function.name),
                )
                .build(),
            );
            return;
        }

        if self.conditional {
            log::debug!("conditional call to '{}' is not inlined", function.name);
            self.diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::ConditionalCall,
                    format!(
                        "call to inline function '{}' is evaluated conditionally and was not inlined",
                        function.name
                    ),
                )
                .with_span(call.span)
                .with_help("move the call into a statement of its own to have it inlined")
                .build(),
            );
            return;
        }

        if let Some(name) = self.shadowed_capture(call.id, function.declaration) {
            log::debug!(
                "'{}' is shadowed at a call to '{}', not inlined",
                name,
                function.name
            );
            self.diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::ShadowedCapture,
                    format!(
                        "cannot inline '{}' here: '{}' refers to a different variable at this call",
                        function.name, name
                    ),
                )
                .with_span(call.span)
                .with_label(
                    function.name_span,
                    format!("'{}' is declared here", function.name),
                )
                .with_help(format!("rename the local '{name}' that is visible at the call"))
                .build(),
            );
            return;
        }

        self.calls.push(InlineCall {
            call: call.id,
            function: function.declaration,
            span: call.span,
        });
    }

    /// A name the function's body reads from outside that resolves to a
    /// different variable at `call`.
    fn shadowed_capture(&self, call: NodeId, function: NodeId) -> Option<String> {
        self.captures
            .get(&function)?
            .iter()
            .find(|(name, variable)| self.scopes.resolve_at(name, call) != Some(**variable))
            .map(|(name, _)| name.clone())
    }
}

/// Variables `function` reads from enclosing scopes, including those of
/// inline functions it calls, since their bodies end up in its own.
fn captured_variables(
    function: &InlineFunction,
    functions: &HashMap<NodeId, &InlineFunction>,
    captures: &HashMap<NodeId, BTreeMap<String, VariableId>>,
    scopes: &ScopeTree,
) -> BTreeMap<String, VariableId> {
    let outer: HashSet<ScopeId> = scopes
        .scope_of(function.declaration)
        .map(|scope| scopes.ancestors(scope).collect())
        .unwrap_or_default();
    let mut collector = CaptureCollector {
        scopes,
        outer,
        captured: BTreeMap::new(),
    };
    collector.visit_block(&function.body);

    let mut captured = collector.captured;
    let callees: Vec<NodeId> = captured
        .values()
        .filter_map(|id| scopes.variable_by_id(*id).node)
        .filter(|node| functions.contains_key(node))
        .collect();
    for callee in callees {
        if let Some(inner) = captures.get(&callee) {
            for (name, id) in inner {
                captured.entry(name.clone()).or_insert(*id);
            }
        }
    }
    captured
}

struct CaptureCollector<'a> {
    scopes: &'a ScopeTree,
    /// Scopes enclosing the function declaration.
    outer: HashSet<ScopeId>,
    captured: BTreeMap<String, VariableId>,
}

impl CaptureCollector<'_> {
    fn reference(&mut self, node: NodeId) {
        let Some(id) = self.scopes.variable_id(node) else {
            return;
        };
        let variable = self.scopes.variable_by_id(id);
        if self.outer.contains(&variable.scope) {
            self.captured.insert(variable.name.clone(), id);
        }
    }
}

impl Visit for CaptureCollector<'_> {
    fn visit_expr(&mut self, expr: &Expr) {
        if let ExprKind::Name(_) = expr.kind {
            self.reference(expr.id);
        }
        walk_expr(self, expr);
    }

    fn visit_name(&mut self, name: &Name) {
        // Heads of `function a.b()` names.
        self.reference(name.id);
    }
}

impl Visit for CallCollector<'_> {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::LocalFunction { .. } => {
                self.enclosing.push(stmt.id);
                walk_stmt(self, stmt);
                self.enclosing.pop();
            }
            StmtKind::While { cond, body } => {
                self.conditionally(cond);
                self.visit_block(body);
            }
            StmtKind::Repeat { body, cond } => {
                self.visit_block(body);
                self.conditionally(cond);
            }
            StmtKind::If { clauses, else_body } => {
                for (i, clause) in clauses.iter().enumerate() {
                    if i == 0 {
                        self.visit_expr(&clause.cond);
                    } else {
                        self.conditionally(&clause.cond);
                    }
                    self.visit_block(&clause.body);
                }
                if let Some(body) = else_body {
                    self.visit_block(body);
                }
            }
            _ => walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Call { callee, .. } => {
                self.check_call(expr, callee);
                walk_expr(self, expr);
            }
            ExprKind::Binary { op, lhs, rhs } if op.is_short_circuit() => {
                self.visit_expr(lhs);
                self.conditionally(rhs);
            }
            _ => walk_expr(self, expr),
        }
    }

    fn visit_func_body(&mut self, func: &FuncBody) {
        // Statements of a nested function hoist within that function.
        let outer = std::mem::replace(&mut self.conditional, false);
        walk_func_body(self, func);
        self.conditional = outer;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::collect_inline_functions;
    use lua_inliner_parser::parse_lua;

    const ADD: &str = "local function add(a, b)\n    --!!INLINE_FUNCTION\n    return a + b\nend\n";

    fn collect(source: &str) -> CollectedCalls {
        let chunk = parse_lua(source).unwrap();
        let functions = collect_inline_functions(&chunk).functions;
        let scopes = ScopeTree::build(&chunk);
        collect_inline_calls(&chunk, &functions, &scopes)
    }

    #[test]
    fn test_calls_bound_to_inline_function_are_collected() {
        let collected = collect(&format!(
            "{ADD}local x = add(1, 2)\nprint(add(x, add(3, 4)))\nlocal t = {{ add(5, 6) }}"
        ));
        assert!(collected.diagnostics.is_empty());
        assert_eq!(collected.calls.len(), 4);
    }

    #[test]
    fn test_shadowed_and_global_calls_are_ordinary() {
        let collected = collect(&format!(
            "{ADD}do\n    local add = function(a, b) return a - b end\n    print(add(1, 2))\nend\nlocal function g(add)\n    return add(1, 2)\nend\nsub(1, 2)\nadd2 = add\nadd2(1, 2)"
        ));
        assert!(collected.calls.is_empty());
        assert!(collected.diagnostics.is_empty());
    }

    #[test]
    fn test_calls_from_closures_are_collected() {
        let collected = collect(&format!(
            "{ADD}local function twice(x)\n    return add(x, x)\nend\nlocal h = function() return add(1, 1) end"
        ));
        assert_eq!(collected.calls.len(), 2);
    }

    #[test]
    fn test_recursive_call_is_rejected() {
        let collected = collect(
            "local function fact(n)\n    --!!INLINE_FUNCTION\n    if n <= 1 then\n        return 1\n    end\n    return n * fact(n - 1)\nend\nprint(fact(5))",
        );
        assert_eq!(collected.diagnostics.count_of(DiagnosticCode::RecursiveCall), 1);
        let diagnostic = collected.diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.labels.len(), 1);
        // The outer call is still inlinable.
        assert_eq!(collected.calls.len(), 1);
    }

    #[test]
    fn test_recursion_through_closure_is_rejected() {
        let collected = collect(
            "local function walk(t)\n    --!!INLINE_FUNCTION\n    local visit = function(c) return walk(c) end\n    return visit\nend",
        );
        assert_eq!(collected.diagnostics.count_of(DiagnosticCode::RecursiveCall), 1);
        assert!(collected.calls.is_empty());
    }

    #[test]
    fn test_ordinary_recursion_is_not_reported() {
        let collected = collect("local function loop(n)\n    return loop(n)\nend");
        assert!(collected.diagnostics.is_empty());
    }

    #[test]
    fn test_conditional_positions_are_skipped() {
        let collected = collect(&format!(
            "{ADD}local a = x and add(1, 2)\nlocal b = add(1, 2) or y\nwhile add(1, 2) do end\nrepeat until add(1, 2)\nif add(1, 2) then\nelseif add(3, 4) then\nend"
        ));
        assert_eq!(collected.diagnostics.count_of(DiagnosticCode::ConditionalCall), 4);
        // `add(1, 2) or y` and the first `if` condition.
        assert_eq!(collected.calls.len(), 2);
    }

    const BUMP: &str = "local n = 0\nlocal function bump()\n    --!!INLINE_FUNCTION\n    n = n + 1\nend\n";

    #[test]
    fn test_shadowed_captures_are_skipped() {
        let collected = collect(&format!(
            "{BUMP}do\n    local n = 10\n    bump()\nend\nlocal function g(n)\n    bump()\nend"
        ));
        assert!(collected.calls.is_empty());
        assert_eq!(collected.diagnostics.count_of(DiagnosticCode::ShadowedCapture), 2);
        let diagnostic = collected.diagnostics.iter().next().unwrap();
        assert!(diagnostic.message.contains("'n'"));
    }

    #[test]
    fn test_later_locals_do_not_shadow() {
        let collected = collect(&format!(
            "{BUMP}do\n    bump()\n    local n = 10\nend\nlocal n = bump()"
        ));
        assert!(collected.diagnostics.is_empty());
        assert_eq!(collected.calls.len(), 2);
    }

    #[test]
    fn test_captures_of_called_inline_functions_count() {
        let collected = collect(&format!(
            "{BUMP}local function twice()\n    --!!INLINE_FUNCTION\n    bump()\n    bump()\nend\ndo\n    local n = 1\n    twice()\nend"
        ));
        // Both calls inside `twice` are fine; the call of `twice` is not.
        assert_eq!(collected.calls.len(), 2);
        assert_eq!(collected.diagnostics.count_of(DiagnosticCode::ShadowedCapture), 1);
    }

    #[test]
    fn test_shadowed_global_is_skipped() {
        let collected = collect(
            "local function say(x)\n    --!!INLINE_FUNCTION\n    print(x)\nend\nlocal print = error\nsay(1)",
        );
        assert_eq!(collected.diagnostics.count_of(DiagnosticCode::ShadowedCapture), 1);
    }

    #[test]
    fn test_function_bodies_reset_the_conditional_state() {
        let collected = collect(&format!(
            "{ADD}local f = ok or function() return add(1, 2) end"
        ));
        assert!(collected.diagnostics.is_empty());
        assert_eq!(collected.calls.len(), 1);
    }
}
