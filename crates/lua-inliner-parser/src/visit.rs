//! Tree walkers.
//!
//! Override a `visit_*` method to intercept a node kind and call the
//! matching `walk_*` function to continue into its children. Returning
//! from `visit_func_body` without walking stops the descent at function
//! boundaries.

use crate::ast::*;

pub trait Visit {
    fn visit_block(&mut self, block: &Block) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_func_body(&mut self, func: &FuncBody) {
        walk_func_body(self, func);
    }

    fn visit_table(&mut self, table: &TableCtor) {
        walk_table(self, table);
    }

    /// Declared names, field names and labels.
    fn visit_name(&mut self, _name: &Name) {}
}

pub fn walk_block<V: Visit + ?Sized>(v: &mut V, block: &Block) {
    for stmt in &block.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visit + ?Sized>(v: &mut V, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Local { names, values } => {
            for value in values {
                v.visit_expr(value);
            }
            for local in names {
                v.visit_name(&local.name);
            }
        }
        StmtKind::Assign { targets, values } => {
            for target in targets {
                v.visit_expr(target);
            }
            for value in values {
                v.visit_expr(value);
            }
        }
        StmtKind::Call(call) => v.visit_expr(call),
        StmtKind::Do(body) => v.visit_block(body),
        StmtKind::While { cond, body } => {
            v.visit_expr(cond);
            v.visit_block(body);
        }
        StmtKind::Repeat { body, cond } => {
            v.visit_block(body);
            v.visit_expr(cond);
        }
        StmtKind::If { clauses, else_body } => {
            for clause in clauses {
                v.visit_expr(&clause.cond);
                v.visit_block(&clause.body);
            }
            if let Some(body) = else_body {
                v.visit_block(body);
            }
        }
        StmtKind::NumericFor {
            var,
            start,
            limit,
            step,
            body,
        } => {
            v.visit_expr(start);
            v.visit_expr(limit);
            if let Some(step) = step {
                v.visit_expr(step);
            }
            v.visit_name(var);
            v.visit_block(body);
        }
        StmtKind::GenericFor { vars, exprs, body } => {
            for expr in exprs {
                v.visit_expr(expr);
            }
            for var in vars {
                v.visit_name(var);
            }
            v.visit_block(body);
        }
        StmtKind::Function { name, func } => {
            for part in &name.path {
                v.visit_name(part);
            }
            if let Some(method) = &name.method {
                v.visit_name(method);
            }
            v.visit_func_body(func);
        }
        StmtKind::LocalFunction { name, func } => {
            v.visit_name(name);
            v.visit_func_body(func);
        }
        StmtKind::Return { values } => {
            for value in values {
                v.visit_expr(value);
            }
        }
        StmtKind::Goto(label) | StmtKind::Label(label) => v.visit_name(label),
        StmtKind::Break => {}
    }
}

pub fn walk_func_body<V: Visit + ?Sized>(v: &mut V, func: &FuncBody) {
    for param in &func.params {
        v.visit_name(param);
    }
    v.visit_block(&func.body);
}

pub fn walk_table<V: Visit + ?Sized>(v: &mut V, table: &TableCtor) {
    for field in &table.fields {
        match field {
            TableField::Positional(value) => v.visit_expr(value),
            TableField::Named { name, value } => {
                v.visit_name(name);
                v.visit_expr(value);
            }
            TableField::Keyed { key, value } => {
                v.visit_expr(key);
                v.visit_expr(value);
            }
        }
    }
}

pub fn walk_call_args<V: Visit + ?Sized>(v: &mut V, args: &CallArgs) {
    match args {
        CallArgs::Parens(args) => {
            for arg in args {
                v.visit_expr(arg);
            }
        }
        CallArgs::Table(table) => v.visit_table(table),
        CallArgs::Str(_) => {}
    }
}

pub fn walk_expr<V: Visit + ?Sized>(v: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Nil
        | ExprKind::True
        | ExprKind::False
        | ExprKind::Vararg
        | ExprKind::Number(_)
        | ExprKind::String(_)
        | ExprKind::Name(_) => {}
        ExprKind::Function(func) => v.visit_func_body(func),
        ExprKind::Table(table) => v.visit_table(table),
        ExprKind::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        ExprKind::Unary { operand, .. } => v.visit_expr(operand),
        ExprKind::Index { object, key } => {
            v.visit_expr(object);
            v.visit_expr(key);
        }
        ExprKind::Field { object, field } => {
            v.visit_expr(object);
            v.visit_name(field);
        }
        ExprKind::Call { callee, args } => {
            v.visit_expr(callee);
            walk_call_args(v, args);
        }
        ExprKind::MethodCall {
            object,
            method,
            args,
        } => {
            v.visit_expr(object);
            v.visit_name(method);
            walk_call_args(v, args);
        }
        ExprKind::Paren(inner) => v.visit_expr(inner),
    }
}

/// Mutable counterpart of [`Visit`].
pub trait VisitMut {
    fn visit_block_mut(&mut self, block: &mut Block) {
        walk_block_mut(self, block);
    }

    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        walk_stmt_mut(self, stmt);
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
    }

    fn visit_func_body_mut(&mut self, func: &mut FuncBody) {
        walk_func_body_mut(self, func);
    }

    fn visit_table_mut(&mut self, table: &mut TableCtor) {
        walk_table_mut(self, table);
    }

    fn visit_name_mut(&mut self, _name: &mut Name) {}
}

pub fn walk_block_mut<V: VisitMut + ?Sized>(v: &mut V, block: &mut Block) {
    for stmt in &mut block.stmts {
        v.visit_stmt_mut(stmt);
    }
}

pub fn walk_stmt_mut<V: VisitMut + ?Sized>(v: &mut V, stmt: &mut Stmt) {
    match &mut stmt.kind {
        StmtKind::Local { names, values } => {
            for value in values {
                v.visit_expr_mut(value);
            }
            for local in names {
                v.visit_name_mut(&mut local.name);
            }
        }
        StmtKind::Assign { targets, values } => {
            for target in targets {
                v.visit_expr_mut(target);
            }
            for value in values {
                v.visit_expr_mut(value);
            }
        }
        StmtKind::Call(call) => v.visit_expr_mut(call),
        StmtKind::Do(body) => v.visit_block_mut(body),
        StmtKind::While { cond, body } => {
            v.visit_expr_mut(cond);
            v.visit_block_mut(body);
        }
        StmtKind::Repeat { body, cond } => {
            v.visit_block_mut(body);
            v.visit_expr_mut(cond);
        }
        StmtKind::If { clauses, else_body } => {
            for clause in clauses {
                v.visit_expr_mut(&mut clause.cond);
                v.visit_block_mut(&mut clause.body);
            }
            if let Some(body) = else_body {
                v.visit_block_mut(body);
            }
        }
        StmtKind::NumericFor {
            var,
            start,
            limit,
            step,
            body,
        } => {
            v.visit_expr_mut(start);
            v.visit_expr_mut(limit);
            if let Some(step) = step {
                v.visit_expr_mut(step);
            }
            v.visit_name_mut(var);
            v.visit_block_mut(body);
        }
        StmtKind::GenericFor { vars, exprs, body } => {
            for expr in exprs {
                v.visit_expr_mut(expr);
            }
            for var in vars {
                v.visit_name_mut(var);
            }
            v.visit_block_mut(body);
        }
        StmtKind::Function { name, func } => {
            for part in &mut name.path {
                v.visit_name_mut(part);
            }
            if let Some(method) = &mut name.method {
                v.visit_name_mut(method);
            }
            v.visit_func_body_mut(func);
        }
        StmtKind::LocalFunction { name, func } => {
            v.visit_name_mut(name);
            v.visit_func_body_mut(func);
        }
        StmtKind::Return { values } => {
            for value in values {
                v.visit_expr_mut(value);
            }
        }
        StmtKind::Goto(label) | StmtKind::Label(label) => v.visit_name_mut(label),
        StmtKind::Break => {}
    }
}

pub fn walk_func_body_mut<V: VisitMut + ?Sized>(v: &mut V, func: &mut FuncBody) {
    for param in &mut func.params {
        v.visit_name_mut(param);
    }
    v.visit_block_mut(&mut func.body);
}

pub fn walk_table_mut<V: VisitMut + ?Sized>(v: &mut V, table: &mut TableCtor) {
    for field in &mut table.fields {
        match field {
            TableField::Positional(value) => v.visit_expr_mut(value),
            TableField::Named { name, value } => {
                v.visit_name_mut(name);
                v.visit_expr_mut(value);
            }
            TableField::Keyed { key, value } => {
                v.visit_expr_mut(key);
                v.visit_expr_mut(value);
            }
        }
    }
}

pub fn walk_call_args_mut<V: VisitMut + ?Sized>(v: &mut V, args: &mut CallArgs) {
    match args {
        CallArgs::Parens(args) => {
            for arg in args {
                v.visit_expr_mut(arg);
            }
        }
        CallArgs::Table(table) => v.visit_table_mut(table),
        CallArgs::Str(_) => {}
    }
}

pub fn walk_expr_mut<V: VisitMut + ?Sized>(v: &mut V, expr: &mut Expr) {
    match &mut expr.kind {
        ExprKind::Nil
        | ExprKind::True
        | ExprKind::False
        | ExprKind::Vararg
        | ExprKind::Number(_)
        | ExprKind::String(_)
        | ExprKind::Name(_) => {}
        ExprKind::Function(func) => v.visit_func_body_mut(func),
        ExprKind::Table(table) => v.visit_table_mut(table),
        ExprKind::Binary { lhs, rhs, .. } => {
            v.visit_expr_mut(lhs);
            v.visit_expr_mut(rhs);
        }
        ExprKind::Unary { operand, .. } => v.visit_expr_mut(operand),
        ExprKind::Index { object, key } => {
            v.visit_expr_mut(object);
            v.visit_expr_mut(key);
        }
        ExprKind::Field { object, field } => {
            v.visit_expr_mut(object);
            v.visit_name_mut(field);
        }
        ExprKind::Call { callee, args } => {
            v.visit_expr_mut(callee);
            walk_call_args_mut(v, args);
        }
        ExprKind::MethodCall {
            object,
            method,
            args,
        } => {
            v.visit_expr_mut(object);
            v.visit_name_mut(method);
            walk_call_args_mut(v, args);
        }
        ExprKind::Paren(inner) => v.visit_expr_mut(inner),
    }
}
