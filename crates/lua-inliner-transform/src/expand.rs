//! Construction of the statements that replace one inline call.
//!
//! For `local function f(a, b) return a + b end` called as `f(1, 2)` with
//! the placeholder `r` the expansion is
//!
//! ```lua
//! local r = nil
//! repeat
//!     local a, b = 1, 2
//!     r = a + b
//!     break
//! until true
//! ```
//!
//! The single-iteration loop lets `break` stand in for `return`. A `return`
//! inside a loop of the body would only leave that loop, so those jump to
//! a label right after the expansion instead:
//!
//! ```lua
//! repeat
//!     for i = 1, #t do
//!         if t[i] == v then
//!             r = i
//!             goto __inline_exit__1
//!         end
//!     end
//!     r = nil
//!     break
//! until true
//! ::__inline_exit__1::
//! ```

use crate::collect::InlineFunction;
use lua_inliner_parser::ast::*;
use lua_inliner_parser::visit::{
    walk_expr_mut, walk_func_body_mut, walk_stmt_mut, walk_table_mut, VisitMut,
};
use lua_inliner_parser::ScopeTree;

/// Hygienic names one expansion declares.
#[derive(Debug, Default)]
pub struct ExpansionNames {
    /// `max_return_count` return placeholders, or none when the result of
    /// the call is unused.
    pub placeholders: Vec<String>,
    /// Local receiving side-effecting arguments passed to a function
    /// without parameters, and side-effecting return values nobody reads.
    pub discard: Option<String>,
    /// Label placed after the expansion, for returns inside loops.
    pub exit: Option<String>,
}

/// Build the expansion of a call to `function`.
///
/// `arguments` are the call's (already rewritten) arguments. `scopes`
/// tells locals from globals when deciding which values may be dropped.
pub fn build(
    function: &InlineFunction,
    arguments: Vec<Expr>,
    names: &ExpansionNames,
    scopes: &ScopeTree,
    ids: &mut NodeIdGen,
) -> Vec<Stmt> {
    let mut body = function.body.clone();
    // Lowered before renumbering, while names still resolve in `scopes`.
    ReturnRewriter {
        names,
        scopes,
        loops: 0,
        ids: &mut *ids,
    }
    .visit_block_mut(&mut body);
    Renumber { ids: &mut *ids }.visit_block_mut(&mut body);

    if let Some(binding) = bind_arguments(function, arguments, names.discard.as_deref(), scopes, ids)
    {
        body.stmts.insert(0, binding);
    }

    let mut expansion = Vec::with_capacity(3);
    if !names.placeholders.is_empty() {
        let locals = names
            .placeholders
            .iter()
            .map(|name| LocalName {
                name: Name::synthetic(ids, name.clone()),
                attrib: None,
            })
            .collect();
        let values = names.placeholders.iter().map(|_| Expr::nil(ids)).collect();
        expansion.push(Stmt::synthetic(
            ids,
            StmtKind::Local {
                names: locals,
                values,
            },
        ));
    }

    let cond = Expr::synthetic(ids, ExprKind::True);
    expansion.push(Stmt::synthetic(ids, StmtKind::Repeat { body, cond }));

    if let Some(exit) = &names.exit {
        let label = Name::synthetic(ids, exit.clone());
        expansion.push(Stmt::synthetic(ids, StmtKind::Label(label)));
    }
    expansion
}

/// `local <params> = <arguments>`, normalized to the parameter list.
fn bind_arguments(
    function: &InlineFunction,
    mut arguments: Vec<Expr>,
    discard: Option<&str>,
    scopes: &ScopeTree,
    ids: &mut NodeIdGen,
) -> Option<Stmt> {
    let arity = function.params.len();

    if arguments.len() > arity {
        // Surplus arguments stay in the list up to the last one that may
        // have side effects; Lua evaluates and drops them.
        let keep = arguments
            .iter()
            .rposition(|argument| !scopes.is_pure(argument))
            .map_or(arity, |last| arity.max(last + 1));
        arguments.truncate(keep);
    } else if arguments.len() < arity && !arguments.last().is_some_and(Expr::is_multi_value) {
        arguments.resize_with(arity, || Expr::nil(ids));
    }

    let names = if arity == 0 {
        if arguments.is_empty() {
            return None;
        }
        vec![LocalName {
            name: Name::synthetic(ids, discard?),
            attrib: None,
        }]
    } else {
        function
            .params
            .iter()
            .map(|param| LocalName {
                name: Name::synthetic(ids, param.name.clone()),
                attrib: None,
            })
            .collect()
    };

    Some(Stmt::synthetic(
        ids,
        StmtKind::Local {
            names,
            values: arguments,
        },
    ))
}

/// Gives every node of a copied subtree a fresh id.
struct Renumber<'a> {
    ids: &'a mut NodeIdGen,
}

impl VisitMut for Renumber<'_> {
    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        stmt.id = self.ids.next();
        walk_stmt_mut(self, stmt);
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        expr.id = self.ids.next();
        walk_expr_mut(self, expr);
    }

    fn visit_func_body_mut(&mut self, func: &mut FuncBody) {
        func.id = self.ids.next();
        walk_func_body_mut(self, func);
    }

    fn visit_table_mut(&mut self, table: &mut TableCtor) {
        table.id = self.ids.next();
        walk_table_mut(self, table);
    }

    fn visit_name_mut(&mut self, name: &mut Name) {
        name.id = self.ids.next();
    }
}

/// Turns `return a, b` into `r0, r1 = a, b` followed by `break`, or by
/// `goto <exit>` inside a loop.
///
/// Without placeholders the values are dropped, or kept in a `local` of the
/// discard name when evaluating them may have side effects. Returns inside
/// nested functions belong to those functions and are left alone.
struct ReturnRewriter<'a> {
    names: &'a ExpansionNames,
    scopes: &'a ScopeTree,
    /// Loops of the body enclosing the statement being walked.
    loops: usize,
    ids: &'a mut NodeIdGen,
}

impl ReturnRewriter<'_> {
    fn exit(&mut self) -> Stmt {
        let kind = match &self.names.exit {
            Some(exit) if self.loops > 0 => StmtKind::Goto(Name::synthetic(self.ids, exit.clone())),
            _ => StmtKind::Break,
        };
        Stmt::synthetic(self.ids, kind)
    }

    fn lower(&mut self, stmt: Stmt, values: Vec<Expr>) -> Vec<Stmt> {
        let placeholders = &self.names.placeholders;
        let count = match values.last() {
            None => 0,
            // A trailing call fills every remaining placeholder.
            Some(last) if last.is_multi_value() => placeholders.len(),
            Some(_) => values.len(),
        };
        let targets: Vec<Expr> = placeholders
            .iter()
            .take(count)
            .map(|name| Expr::name(self.ids, name.clone()))
            .collect();

        let mut exit = self.exit();
        if !targets.is_empty() {
            let assign = Stmt {
                kind: StmtKind::Assign { targets, values },
                ..stmt
            };
            return vec![assign, exit];
        }

        let scopes = self.scopes;
        match &self.names.discard {
            Some(discard) if !values.iter().all(|value| scopes.is_pure(value)) => {
                let names = vec![LocalName {
                    name: Name::synthetic(self.ids, discard.clone()),
                    attrib: None,
                }];
                let local = Stmt {
                    kind: StmtKind::Local { names, values },
                    ..stmt
                };
                vec![local, exit]
            }
            _ => {
                exit.leading = stmt.leading;
                exit.trailing = stmt.trailing;
                vec![exit]
            }
        }
    }
}

impl VisitMut for ReturnRewriter<'_> {
    fn visit_block_mut(&mut self, block: &mut Block) {
        let stmts = std::mem::take(&mut block.stmts);
        for mut stmt in stmts {
            if let StmtKind::Return { values } = &mut stmt.kind {
                let values = std::mem::take(values);
                block.stmts.extend(self.lower(stmt, values));
                continue;
            }
            self.visit_stmt_mut(&mut stmt);
            block.stmts.push(stmt);
        }
    }

    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        let is_loop = stmt.kind.is_loop();
        self.loops += usize::from(is_loop);
        walk_stmt_mut(self, stmt);
        self.loops -= usize::from(is_loop);
    }

    fn visit_func_body_mut(&mut self, _func: &mut FuncBody) {}
}
