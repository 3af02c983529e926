//! The inline rewriter.
//!
//! One post-order walk over the chunk replaces every collected call. The
//! expansion of a call cannot be placed where the call is, so it is queued
//! against the innermost enclosing statement and spliced in front of that
//! statement once the statement has been walked. The call expression itself
//! becomes
//!
//! * nothing, when it is a call statement (the statement is dropped and
//!   the expansion declares no return placeholders),
//! * `nil`, when the function never returns a value,
//! * every return placeholder, when it is the last element of a value list
//!   (the list owner splices them in after walking its elements),
//! * the first return placeholder otherwise.
//!
//! Edits are keyed by [`NodeId`], which the walk never changes.

use crate::calls::InlineCall;
use crate::collect::InlineFunction;
use crate::expand::{self, ExpansionNames};
use crate::naming::{NameGenerator, DISCARD_PREFIX, EXIT_PREFIX, RETURN_PREFIX};
use lua_inliner_parser::ast::*;
use lua_inliner_parser::visit::{walk_expr_mut, walk_stmt, walk_stmt_mut, Visit, VisitMut};
use lua_inliner_parser::{ScopeId, ScopeTree};
use std::collections::{HashMap, HashSet};

/// Statements to insert before a statement, and whether to drop it.
#[derive(Debug, Default)]
struct InlineEdit {
    insertions: Vec<Stmt>,
    remove: bool,
}

/// Where an expression sits relative to the value list around it.
#[derive(Debug, Clone, Copy)]
enum Position {
    /// The expression of a call statement.
    Discarded,
    /// Last element of the value list owned by the node with this id.
    Tail(NodeId),
    /// Any place that keeps exactly one value.
    Single,
}

/// Inline every call in `calls`.
///
/// Each function's body is refreshed once its declaration has been walked,
/// so an inline function that calls other inline functions expands with
/// those calls already inlined. Returns the number of inlined calls per
/// function, in the order of `functions`.
pub fn rewrite(
    chunk: &mut Chunk,
    scopes: &ScopeTree,
    functions: &mut [InlineFunction],
    calls: &[InlineCall],
) -> Vec<usize> {
    let by_declaration: HashMap<NodeId, usize> = functions
        .iter()
        .enumerate()
        .map(|(index, function)| (function.declaration, index))
        .collect();
    let calls: HashMap<NodeId, usize> = calls
        .iter()
        .filter_map(|call| Some((call.call, *by_declaration.get(&call.function)?)))
        .collect();

    let mut labels = LabelCollector::default();
    labels.visit_block(&chunk.block);

    let Chunk { block, ids, .. } = chunk;
    let mut rewriter = InlineRewriter {
        labels: labels.names,
        inlined: vec![0; functions.len()],
        functions,
        by_declaration,
        calls,
        scopes,
        ids,
        names: NameGenerator::new(),
        statements: Vec::new(),
        edits: HashMap::new(),
        splices: HashMap::new(),
    };
    rewriter.visit_block_mut(block);

    debug_assert!(rewriter.edits.is_empty(), "unapplied statement edits");
    debug_assert!(rewriter.splices.is_empty(), "unapplied value splices");
    log::debug!("inlined {} calls", rewriter.inlined.iter().sum::<usize>());
    rewriter.inlined
}

struct InlineRewriter<'a> {
    functions: &'a mut [InlineFunction],
    by_declaration: HashMap<NodeId, usize>,
    /// Call expression id to index into `functions`.
    calls: HashMap<NodeId, usize>,
    scopes: &'a ScopeTree,
    ids: &'a mut NodeIdGen,
    names: NameGenerator,
    /// Every label of the chunk; exit labels must not reuse one.
    labels: HashSet<String>,
    inlined: Vec<usize>,
    /// Ids of the statements enclosing the node being walked.
    statements: Vec<NodeId>,
    /// Keyed by statement id.
    edits: HashMap<NodeId, InlineEdit>,
    /// Return placeholders to substitute for the last element of a value
    /// list, keyed by the id of the node owning the list.
    splices: HashMap<NodeId, Vec<String>>,
}

impl InlineRewriter<'_> {
    fn rewrite_expr(&mut self, expr: &mut Expr, position: Position) {
        if let Some(&index) = self.calls.get(&expr.id) {
            if let Some(site) = self.call_site(expr.id) {
                self.inline_call(expr, index, site, position);
                return;
            }
            log::warn!("no enclosing statement for inline call {:?}", expr.id);
        }

        let id = expr.id;
        match &mut expr.kind {
            ExprKind::Call { callee, args } => {
                self.visit_expr_mut(callee);
                self.rewrite_args(args, id);
            }
            ExprKind::MethodCall { object, args, .. } => {
                self.visit_expr_mut(object);
                self.rewrite_args(args, id);
            }
            _ => walk_expr_mut(self, expr),
        }
    }

    fn rewrite_args(&mut self, args: &mut CallArgs, owner: NodeId) {
        match args {
            CallArgs::Parens(values) => self.rewrite_list(values, owner),
            CallArgs::Table(table) => self.visit_table_mut(table),
            CallArgs::Str(_) => {}
        }
    }

    /// Walk a value list whose last element keeps all of its values, then
    /// apply a splice registered for `owner`.
    fn rewrite_list(&mut self, values: &mut Vec<Expr>, owner: NodeId) {
        let last = values.len().saturating_sub(1);
        for (i, value) in values.iter_mut().enumerate() {
            let position = if i == last {
                Position::Tail(owner)
            } else {
                Position::Single
            };
            self.rewrite_expr(value, position);
        }

        if let Some(placeholders) = self.splices.remove(&owner) {
            values.pop();
            for name in placeholders {
                values.push(Expr::name(self.ids, name));
            }
        }
    }

    fn call_site(&self, call: NodeId) -> Option<(NodeId, ScopeId)> {
        let statement = *self.statements.last()?;
        let scope = self.scopes.scope_of(call)?;
        Some((statement, scope))
    }

    fn inline_call(
        &mut self,
        expr: &mut Expr,
        index: usize,
        (statement, scope): (NodeId, ScopeId),
        position: Position,
    ) {
        let id = expr.id;
        let ExprKind::Call { args, .. } = &mut expr.kind else {
            return;
        };

        // Inner inline calls expand first; their results are our arguments.
        self.rewrite_args(args, id);
        let arguments = take_arguments(args, self.ids);

        let function = &self.functions[index];
        let mut taken: HashSet<String> =
            self.scopes.visible_names(scope).map(str::to_string).collect();
        taken.extend(function.identifiers.iter().cloned());

        // Nobody reads the results of a call statement.
        let discarded = matches!(position, Position::Discarded);
        let return_count = if discarded { 0 } else { function.max_return_count };
        let placeholders = self
            .names
            .generate_many(RETURN_PREFIX, return_count, &taken);
        let impure_arguments = function.params.is_empty()
            && arguments.iter().any(|arg| !self.scopes.is_pure(arg));
        let discard = (impure_arguments || (discarded && function.return_sites > 0))
            .then(|| self.names.generate(DISCARD_PREFIX, &taken));
        let exit = function.returns_in_loop.then(|| {
            taken.extend(self.labels.iter().cloned());
            self.names.generate(EXIT_PREFIX, &taken)
        });

        log::debug!(
            "inlining call to '{}' with {} placeholders",
            function.name,
            placeholders.len()
        );
        let names = ExpansionNames {
            placeholders,
            discard,
            exit,
        };
        let expansion = expand::build(function, arguments, &names, self.scopes, self.ids);
        let placeholders = names.placeholders;
        self.inlined[index] += 1;

        let edit = self.edits.entry(statement).or_default();
        edit.insertions.extend(expansion);

        match position {
            Position::Discarded => edit.remove = true,
            _ if placeholders.is_empty() => expr.kind = ExprKind::Nil,
            Position::Tail(owner) => {
                // The call stays until the owner replaces it.
                self.splices.insert(owner, placeholders);
            }
            Position::Single => {
                if let Some(first) = placeholders.into_iter().next() {
                    expr.kind = ExprKind::Name(first);
                }
            }
        }
    }

    /// Refresh an inline function from its now rewritten declaration.
    fn refresh_function(&mut self, stmt: &Stmt) {
        let Some(&index) = self.by_declaration.get(&stmt.id) else {
            return;
        };
        if let StmtKind::LocalFunction { func, .. } = &stmt.kind {
            self.functions[index].refresh(&func.body);
        }
    }
}

/// Collects label names.
#[derive(Default)]
struct LabelCollector {
    names: HashSet<String>,
}

impl Visit for LabelCollector {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let StmtKind::Label(label) = &stmt.kind {
            self.names.insert(label.name.clone());
        }
        walk_stmt(self, stmt);
    }
}

/// Call arguments as a plain list.
fn take_arguments(args: &mut CallArgs, ids: &mut NodeIdGen) -> Vec<Expr> {
    match std::mem::replace(args, CallArgs::Parens(Vec::new())) {
        CallArgs::Parens(values) => values,
        CallArgs::Table(table) => vec![Expr::synthetic(ids, ExprKind::Table(table))],
        CallArgs::Str(text) => vec![Expr::synthetic(ids, ExprKind::String(text))],
    }
}

impl VisitMut for InlineRewriter<'_> {
    fn visit_block_mut(&mut self, block: &mut Block) {
        let stmts = std::mem::take(&mut block.stmts);
        for mut stmt in stmts {
            self.visit_stmt_mut(&mut stmt);

            let Some(edit) = self.edits.remove(&stmt.id) else {
                block.stmts.push(stmt);
                continue;
            };
            let mut insertions = edit.insertions;
            // Comments above the statement stay above the whole group.
            if let Some(first) = insertions.first_mut() {
                let mut leading = std::mem::take(&mut stmt.leading);
                leading.append(&mut first.leading);
                first.leading = leading;
            }
            block.stmts.append(&mut insertions);

            if edit.remove {
                if let Some(last) = block.stmts.last_mut() {
                    if last.trailing.is_none() {
                        last.trailing = stmt.trailing.take();
                    }
                }
            } else {
                block.stmts.push(stmt);
            }
        }
    }

    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        let id = stmt.id;
        self.statements.push(id);

        match &mut stmt.kind {
            StmtKind::Call(call) => self.rewrite_expr(call, Position::Discarded),
            StmtKind::Local { values, .. } => self.rewrite_list(values, id),
            StmtKind::Assign { targets, values } => {
                for target in targets.iter_mut() {
                    self.visit_expr_mut(target);
                }
                self.rewrite_list(values, id);
            }
            StmtKind::Return { values } => self.rewrite_list(values, id),
            StmtKind::GenericFor { exprs, body, .. } => {
                self.rewrite_list(exprs, id);
                self.visit_block_mut(body);
            }
            _ => walk_stmt_mut(self, stmt),
        }

        self.statements.pop();
        self.refresh_function(stmt);
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        self.rewrite_expr(expr, Position::Single);
    }

    fn visit_table_mut(&mut self, table: &mut TableCtor) {
        let owner = table.id;
        let last = table.fields.len().saturating_sub(1);
        for (i, field) in table.fields.iter_mut().enumerate() {
            match field {
                TableField::Positional(value) if i == last => {
                    self.rewrite_expr(value, Position::Tail(owner))
                }
                TableField::Positional(value) | TableField::Named { value, .. } => {
                    self.visit_expr_mut(value)
                }
                TableField::Keyed { key, value } => {
                    self.visit_expr_mut(key);
                    self.visit_expr_mut(value);
                }
            }
        }

        if let Some(placeholders) = self.splices.remove(&owner) {
            table.fields.pop();
            for name in placeholders {
                table
                    .fields
                    .push(TableField::Positional(Expr::name(self.ids, name)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::collect_inline_calls;
    use crate::collect::collect_inline_functions;
    use lua_inliner_parser::{parse_lua, print_chunk};

    const PAIR: &str = "local function pair(a, b)\n    --!!INLINE_FUNCTION\n    return a, b\nend\n";

    fn inline(source: &str) -> (String, Vec<usize>) {
        let mut chunk = parse_lua(source).unwrap();
        let mut functions = collect_inline_functions(&chunk).functions;
        let scopes = ScopeTree::build(&chunk);
        let calls = collect_inline_calls(&chunk, &functions, &scopes).calls;
        let inlined = rewrite(&mut chunk, &scopes, &mut functions, &calls);
        (print_chunk(&chunk), inlined)
    }

    /// The rewritten program after the declaration of `pair`.
    fn after_pair(source: &str) -> String {
        let (printed, _) = inline(&format!("{PAIR}{source}"));
        printed
            .split_once("end\n")
            .map(|(_, rest)| rest.to_string())
            .unwrap()
    }

    const EXPANSION: &str = "local __inline_return__0, __inline_return__1 = nil, nil\nrepeat\n    local a, b = 1, 2\n    __inline_return__0, __inline_return__1 = a, b\n    break\nuntil true\n";

    #[test]
    fn test_single_value_positions_take_first_placeholder() {
        assert_eq!(
            after_pair("local x = pair(1, 2) + 1"),
            format!("{EXPANSION}local x = __inline_return__0 + 1\n")
        );
        assert_eq!(
            after_pair("local x, y = pair(1, 2), 3"),
            format!("{EXPANSION}local x, y = __inline_return__0, 3\n")
        );
        assert_eq!(
            after_pair("print((pair(1, 2)))"),
            format!("{EXPANSION}print((__inline_return__0))\n")
        );
    }

    #[test]
    fn test_tail_positions_take_every_placeholder() {
        let all = "__inline_return__0, __inline_return__1";
        assert_eq!(
            after_pair("local x, y = pair(1, 2)"),
            format!("{EXPANSION}local x, y = {all}\n")
        );
        assert_eq!(
            after_pair("x, y = pair(1, 2)"),
            format!("{EXPANSION}x, y = {all}\n")
        );
        assert_eq!(
            after_pair("print(0, pair(1, 2))"),
            format!("{EXPANSION}print(0, {all})\n")
        );
        assert_eq!(
            after_pair("t:m(pair(1, 2))"),
            format!("{EXPANSION}t:m({all})\n")
        );
        assert_eq!(
            after_pair("local t = { n = 1, pair(1, 2) }"),
            format!("{EXPANSION}local t = {{ n = 1, {all} }}\n")
        );
        assert_eq!(
            after_pair("for k, v in pair(1, 2) do end"),
            format!("{EXPANSION}for k, v in {all} do\nend\n")
        );
    }

    #[test]
    fn test_return_position_keeps_every_value() {
        let (printed, inlined) = inline(&format!(
            "{PAIR}local function both()\n    return pair(1, 2)\nend"
        ));
        assert_eq!(inlined, vec![1]);
        assert!(printed.ends_with(
            "local function both()\n    local __inline_return__0, __inline_return__1 = nil, nil\n    repeat\n        local a, b = 1, 2\n        __inline_return__0, __inline_return__1 = a, b\n        break\n    until true\n    return __inline_return__0, __inline_return__1\nend\n"
        ));
    }

    #[test]
    fn test_call_statement_is_removed() {
        let (printed, _) = inline(
            "local function log(msg)\n    --!!INLINE_FUNCTION\n    print(msg)\nend\n-- say hello\nlog(\"hello\") -- greet",
        );
        assert!(printed.ends_with(
            "end\n-- say hello\nrepeat\n    local msg = \"hello\"\n    print(msg)\nuntil true -- greet\n"
        ));
    }

    #[test]
    fn test_call_statement_declares_no_placeholders() {
        assert_eq!(
            after_pair("pair(1, 2)"),
            "repeat\n    local a, b = 1, 2\n    break\nuntil true\n"
        );
    }

    #[test]
    fn test_function_without_returns_yields_nil() {
        let (printed, _) = inline(
            "local function noop()\n    --!!INLINE_FUNCTION\nend\nlocal x = noop()",
        );
        assert!(printed.ends_with("end\nrepeat\nuntil true\nlocal x = nil\n"));
    }

    #[test]
    fn test_nested_calls_expand_inside_out() {
        let printed = after_pair("print(pair(pair(1, 2)))");
        assert_eq!(
            printed,
            "local __inline_return__0, __inline_return__1 = nil, nil\n\
             repeat\n    local a, b = 1, 2\n    __inline_return__0, __inline_return__1 = a, b\n    break\nuntil true\n\
             local __inline_return__2, __inline_return__3 = nil, nil\n\
             repeat\n    local a, b = __inline_return__0, __inline_return__1\n    __inline_return__2, __inline_return__3 = a, b\n    break\nuntil true\n\
             print(__inline_return__2, __inline_return__3)\n"
        );
    }

    #[test]
    fn test_placeholders_avoid_visible_names() {
        let printed = after_pair("local __inline_return__0 = 5\nlocal x = pair(1, 2) + __inline_return__0");
        assert!(printed.contains("local __inline_return__1, __inline_return__2 = nil, nil\n"));
        assert!(printed.ends_with("local x = __inline_return__1 + __inline_return__0\n"));
    }

    #[test]
    fn test_calls_inside_nested_blocks_stay_in_their_block() {
        let printed = after_pair("if ok then\n    local x = pair(1, 2)\nend");
        assert!(printed.starts_with("if ok then\n    local __inline_return__0"));
        assert!(printed.ends_with("    until true\n    local x = __inline_return__0, __inline_return__1\nend\n"));
    }

    #[test]
    fn test_inline_functions_calling_inline_functions_expand_fully() {
        let (printed, inlined) = inline(&format!(
            "{PAIR}local function swap(a, b)\n    --!!INLINE_FUNCTION\n    local y, x = pair(a, b)\n    return x, y\nend\nlocal p, q = swap(1, 2)"
        ));
        // `pair` was inlined once, into the declaration of `swap`.
        assert_eq!(inlined, vec![1, 1]);
        let tail = printed.rsplit_once("end\n").map(|(_, rest)| rest).unwrap();
        assert!(!tail.contains("pair("));
        assert!(tail.ends_with("local p, q = __inline_return__2, __inline_return__3\n"));
    }

    const FIND: &str = "local function find(t, v)\n    --!!INLINE_FUNCTION\n    for i = 1, #t do\n        if t[i] == v then\n            return i\n        end\n    end\n    return nil\nend\n";

    #[test]
    fn test_returns_inside_loops_jump_to_fresh_labels() {
        let (printed, inlined) = inline(&format!(
            "{FIND}::__inline_exit__1::\nlocal a = find(t, 1)\nlocal b = find(t, 2)"
        ));
        assert_eq!(inlined, vec![2]);
        assert!(printed.contains("            __inline_return__0 = i\n            goto __inline_exit__2\n"));
        assert!(printed.contains("until true\n::__inline_exit__2::\nlocal a = __inline_return__0\n"));
        assert!(printed.contains("            goto __inline_exit__4\n"));
        assert!(printed.ends_with("until true\n::__inline_exit__4::\nlocal b = __inline_return__3\n"));
    }

    #[test]
    fn test_loop_return_in_call_statement() {
        let (printed, _) = inline(&format!("{FIND}find(t, 1)"));
        let tail = printed.rsplit_once("\nend\n").map(|(_, rest)| rest).unwrap();
        assert_eq!(
            tail,
            "repeat\n    local t, v = t, 1\n    for i = 1, #t do\n        if t[i] == v then\n            goto __inline_exit__1\n        end\n    end\n    break\nuntil true\n::__inline_exit__1::\n"
        );
    }

    #[test]
    fn test_table_and_string_arguments() {
        let (printed, _) = inline(
            "local function id(v)\n    --!!INLINE_FUNCTION\n    return v\nend\nlocal t = id { 1 }\nlocal s = id \"s\"",
        );
        assert!(printed.contains("local v = { 1 }\n"));
        assert!(printed.contains("local v = \"s\"\n"));
        assert!(printed.ends_with("local s = __inline_return__1\n"));
    }
}
