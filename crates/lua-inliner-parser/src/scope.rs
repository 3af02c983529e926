//! Lexical scopes and name resolution.
//!
//! [`ScopeTree::build`] walks a chunk once and records, for every variable
//! reference, the variable it resolves to, and for every statement and call
//! the scope it executes in. Globals are created in the root scope on first
//! use, so enumerating a scope chain also yields every global the file
//! touches.

use crate::ast::*;
use crate::visit::{walk_expr, walk_stmt, Visit};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    File,
    Function,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Local,
    Parameter,
    /// Control variable of a `for` loop.
    Iteration,
    Global,
}

/// The syntactic form that introduced a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    LocalStatement,
    LocalFunction,
    Parameter,
    ForLoop,
    Global,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub variables: Vec<VariableId>,
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
    pub declaration: DeclarationKind,
    /// The declaring statement, or the function body for parameters.
    /// `None` for globals.
    pub node: Option<NodeId>,
    pub scope: ScopeId,
}

impl Variable {
    pub fn is_local_function(&self) -> bool {
        self.declaration == DeclarationKind::LocalFunction
    }
}

#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    variables: Vec<Variable>,
    references: HashMap<NodeId, VariableId>,
    node_scopes: HashMap<NodeId, ScopeId>,
    /// Number of variables declared when each call was reached.
    call_marks: HashMap<NodeId, u32>,
}

impl ScopeTree {
    pub fn build(chunk: &Chunk) -> ScopeTree {
        let mut resolver = Resolver {
            tree: ScopeTree {
                scopes: Vec::new(),
                variables: Vec::new(),
                references: HashMap::new(),
                node_scopes: HashMap::new(),
                call_marks: HashMap::new(),
            },
            current: ScopeId(0),
            bindings: Vec::new(),
            marks: Vec::new(),
            globals: HashMap::new(),
        };
        resolver.tree.scopes.push(Scope {
            kind: ScopeKind::Global,
            parent: None,
            variables: Vec::new(),
        });
        resolver.enter(ScopeKind::File);
        resolver.visit_block(&chunk.block);
        resolver.exit();

        log::debug!(
            "resolved {} references across {} scopes",
            resolver.tree.references.len(),
            resolver.tree.scopes.len()
        );
        resolver.tree
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// The variable a `Name` expression (or a function name path head)
    /// refers to.
    pub fn variable(&self, reference: NodeId) -> Option<&Variable> {
        self.references
            .get(&reference)
            .map(|id| &self.variables[id.0 as usize])
    }

    pub fn variable_by_id(&self, id: VariableId) -> &Variable {
        &self.variables[id.0 as usize]
    }

    pub fn variable_id(&self, reference: NodeId) -> Option<VariableId> {
        self.references.get(&reference).copied()
    }

    /// The variable `name` would resolve to if it were referenced where the
    /// call expression `call` is.
    ///
    /// Locals declared later in the same scope chain are not visible yet.
    /// `None` means an unused global.
    pub fn resolve_at(&self, name: &str, call: NodeId) -> Option<VariableId> {
        let scope = self.scope_of(call)?;
        let mark = *self.call_marks.get(&call)?;
        self.ancestors(scope).find_map(|scope| {
            self.scope(scope).variables.iter().rev().copied().find(|id| {
                let variable = self.variable_by_id(*id);
                variable.name == name && (id.0 < mark || variable.kind == VariableKind::Global)
            })
        })
    }

    /// [`Expr::is_pure_with`] where reading a local is pure and reading a
    /// global is not. Names the tree has not seen (synthesized
    /// placeholders) count as locals.
    pub fn is_pure(&self, expr: &Expr) -> bool {
        expr.is_pure_with(&|name| {
            !matches!(
                self.variable(name.id),
                Some(variable) if variable.kind == VariableKind::Global
            )
        })
    }

    /// Scope a statement or call expression executes in.
    pub fn scope_of(&self, node: NodeId) -> Option<ScopeId> {
        self.node_scopes.get(&node).copied()
    }

    /// `scope` followed by each enclosing scope up to the root.
    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), move |id| self.scope(*id).parent)
    }

    /// Names of every variable declared along the scope chain, globals
    /// included.
    pub fn visible_names(&self, scope: ScopeId) -> impl Iterator<Item = &str> + '_ {
        self.ancestors(scope).flat_map(move |id| {
            self.scope(id)
                .variables
                .iter()
                .map(move |var| self.variables[var.0 as usize].name.as_str())
        })
    }
}

struct Resolver {
    tree: ScopeTree,
    current: ScopeId,
    /// Locals in declaration order; lookups scan from the end so later
    /// declarations shadow earlier ones.
    bindings: Vec<(String, VariableId)>,
    /// Length of `bindings` when each open scope was entered.
    marks: Vec<usize>,
    globals: HashMap<String, VariableId>,
}

impl Resolver {
    fn enter(&mut self, kind: ScopeKind) {
        let id = ScopeId(self.tree.scopes.len() as u32);
        self.tree.scopes.push(Scope {
            kind,
            parent: Some(self.current),
            variables: Vec::new(),
        });
        self.current = id;
        self.marks.push(self.bindings.len());
    }

    fn exit(&mut self) {
        if let Some(mark) = self.marks.pop() {
            self.bindings.truncate(mark);
        }
        if let Some(parent) = self.tree.scope(self.current).parent {
            self.current = parent;
        }
    }

    fn declare(
        &mut self,
        name: &Name,
        kind: VariableKind,
        declaration: DeclarationKind,
        node: NodeId,
    ) {
        let id = self.add_variable(Variable {
            name: name.name.clone(),
            kind,
            declaration,
            node: Some(node),
            scope: self.current,
        });
        self.bindings.push((name.name.clone(), id));
    }

    fn add_variable(&mut self, variable: Variable) -> VariableId {
        let id = VariableId(self.tree.variables.len() as u32);
        let scope = variable.scope;
        self.tree.variables.push(variable);
        self.tree.scopes[scope.0 as usize].variables.push(id);
        id
    }

    fn reference(&mut self, node: NodeId, name: &str) {
        let bound = self
            .bindings
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, id)| *id)
            .or_else(|| self.globals.get(name).copied());
        let id = match bound {
            Some(id) => id,
            None => {
                let root = self.tree.root();
                let id = self.add_variable(Variable {
                    name: name.to_string(),
                    kind: VariableKind::Global,
                    declaration: DeclarationKind::Global,
                    node: None,
                    scope: root,
                });
                self.globals.insert(name.to_string(), id);
                id
            }
        };
        self.tree.references.insert(node, id);
    }

    fn scoped_block(&mut self, block: &Block) {
        self.enter(ScopeKind::Block);
        self.visit_block(block);
        self.exit();
    }

    fn function(&mut self, func: &FuncBody, implicit_self: bool) {
        self.enter(ScopeKind::Function);
        if implicit_self {
            let this = Name {
                id: func.id,
                name: "self".to_string(),
                span: func.span,
            };
            self.declare(&this, VariableKind::Parameter, DeclarationKind::Parameter, func.id);
        }
        for param in &func.params {
            self.declare(param, VariableKind::Parameter, DeclarationKind::Parameter, func.id);
        }
        // Parameters and body locals share the function scope.
        self.visit_block(&func.body);
        self.exit();
    }
}

impl Visit for Resolver {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        self.tree.node_scopes.insert(stmt.id, self.current);

        match &stmt.kind {
            StmtKind::Local { names, values } => {
                for value in values {
                    self.visit_expr(value);
                }
                for local in names {
                    self.declare(
                        &local.name,
                        VariableKind::Local,
                        DeclarationKind::LocalStatement,
                        stmt.id,
                    );
                }
            }
            StmtKind::LocalFunction { name, func } => {
                self.declare(name, VariableKind::Local, DeclarationKind::LocalFunction, stmt.id);
                self.function(func, false);
            }
            StmtKind::Function { name, func } => {
                if let Some(head) = name.path.first() {
                    self.reference(head.id, &head.name);
                }
                self.function(func, name.method.is_some());
            }
            StmtKind::Do(body) => self.scoped_block(body),
            StmtKind::While { cond, body } => {
                self.visit_expr(cond);
                self.scoped_block(body);
            }
            StmtKind::Repeat { body, cond } => {
                // The condition sees the body's locals.
                self.enter(ScopeKind::Block);
                self.visit_block(body);
                self.visit_expr(cond);
                self.exit();
            }
            StmtKind::If { clauses, else_body } => {
                for clause in clauses {
                    self.visit_expr(&clause.cond);
                    self.scoped_block(&clause.body);
                }
                if let Some(body) = else_body {
                    self.scoped_block(body);
                }
            }
            StmtKind::NumericFor {
                var,
                start,
                limit,
                step,
                body,
            } => {
                self.visit_expr(start);
                self.visit_expr(limit);
                if let Some(step) = step {
                    self.visit_expr(step);
                }
                self.enter(ScopeKind::Block);
                self.declare(var, VariableKind::Iteration, DeclarationKind::ForLoop, stmt.id);
                self.visit_block(body);
                self.exit();
            }
            StmtKind::GenericFor { vars, exprs, body } => {
                for expr in exprs {
                    self.visit_expr(expr);
                }
                self.enter(ScopeKind::Block);
                for var in vars {
                    self.declare(var, VariableKind::Iteration, DeclarationKind::ForLoop, stmt.id);
                }
                self.visit_block(body);
                self.exit();
            }
            StmtKind::Assign { .. }
            | StmtKind::Call(_)
            | StmtKind::Return { .. }
            | StmtKind::Break
            | StmtKind::Goto(_)
            | StmtKind::Label(_) => walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Name(name) => self.reference(expr.id, name),
            ExprKind::Call { .. } | ExprKind::MethodCall { .. } => {
                self.tree.node_scopes.insert(expr.id, self.current);
                let mark = self.tree.variables.len() as u32;
                self.tree.call_marks.insert(expr.id, mark);
                walk_expr(self, expr);
            }
            _ => walk_expr(self, expr),
        }
    }

    fn visit_func_body(&mut self, func: &FuncBody) {
        self.function(func, false);
    }
}
