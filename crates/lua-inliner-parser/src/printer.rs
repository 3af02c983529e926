//! Render a tree back to Lua source.
//!
//! Statement-level trivia (leading comments, blank lines, trailing comments
//! and the trivia before a block's closing keyword) is reproduced. Comments
//! inside expressions are not. Literals are printed exactly as parsed.

use crate::ast::*;

#[derive(Debug, Clone)]
pub struct PrintOptions {
    /// Spaces per nesting level.
    pub indent: usize,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self { indent: 4 }
    }
}

pub fn print_chunk(chunk: &Chunk) -> String {
    print_chunk_with(chunk, &PrintOptions::default())
}

pub fn print_chunk_with(chunk: &Chunk, options: &PrintOptions) -> String {
    let mut printer = Printer::new(options);
    printer.block(&chunk.block);
    printer.out
}

/// Render a statement list at nesting level zero.
pub fn print_block(block: &Block) -> String {
    let mut printer = Printer::new(&PrintOptions::default());
    printer.block(block);
    printer.out
}

/// Render a single expression.
pub fn print_expr(expr: &Expr) -> String {
    let mut printer = Printer::new(&PrintOptions::default());
    printer.expr(expr);
    printer.out
}

struct Printer {
    out: String,
    indent: String,
    level: usize,
}

impl Printer {
    fn new(options: &PrintOptions) -> Self {
        Self {
            out: String::new(),
            indent: " ".repeat(options.indent),
            level: 0,
        }
    }

    fn write_indent(&mut self) {
        for _ in 0..self.level {
            self.out.push_str(&self.indent);
        }
    }

    fn trivia(&mut self, trivia: &[Trivia]) {
        for item in trivia {
            match item {
                Trivia::BlankLine => self.out.push('\n'),
                Trivia::Comment(comment) => {
                    if comment.kind != CommentKind::Shebang {
                        self.write_indent();
                    }
                    self.out.push_str(&comment.text);
                    self.out.push('\n');
                }
            }
        }
    }

    fn block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.stmt(stmt);
        }
        self.trivia(&block.trailing);
    }

    /// Body of a construct, one level deeper.
    fn nested(&mut self, block: &Block) {
        self.level += 1;
        self.block(block);
        self.level -= 1;
    }

    fn closing(&mut self, keyword: &str) {
        self.write_indent();
        self.out.push_str(keyword);
    }

    fn stmt(&mut self, stmt: &Stmt) {
        self.trivia(&stmt.leading);
        self.write_indent();

        let start = self.out.len();
        self.stmt_kind(&stmt.kind);
        // `(f or g)()` after a statement would otherwise read as a call of
        // the previous line's last expression.
        if self.out[start..].starts_with('(') {
            self.out.insert(start, ';');
        }

        if let Some(comment) = &stmt.trailing {
            self.out.push(' ');
            self.out.push_str(&comment.text);
        }
        self.out.push('\n');
    }

    fn stmt_kind(&mut self, kind: &StmtKind) {
        match kind {
            StmtKind::Local { names, values } => {
                self.out.push_str("local ");
                for (i, local) in names.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(&local.name.name);
                    if let Some(attrib) = &local.attrib {
                        self.out.push_str(" <");
                        self.out.push_str(attrib);
                        self.out.push('>');
                    }
                }
                if !values.is_empty() {
                    self.out.push_str(" = ");
                    self.expr_list(values);
                }
            }
            StmtKind::Assign { targets, values } => {
                self.expr_list(targets);
                self.out.push_str(" = ");
                self.expr_list(values);
            }
            StmtKind::Call(call) => self.expr(call),
            StmtKind::Do(body) => {
                self.out.push_str("do\n");
                self.nested(body);
                self.closing("end");
            }
            StmtKind::While { cond, body } => {
                self.out.push_str("while ");
                self.expr(cond);
                self.out.push_str(" do\n");
                self.nested(body);
                self.closing("end");
            }
            StmtKind::Repeat { body, cond } => {
                self.out.push_str("repeat\n");
                self.nested(body);
                self.closing("until ");
                self.expr(cond);
            }
            StmtKind::If { clauses, else_body } => {
                for (i, clause) in clauses.iter().enumerate() {
                    if i == 0 {
                        self.out.push_str("if ");
                    } else {
                        self.closing("elseif ");
                    }
                    self.expr(&clause.cond);
                    self.out.push_str(" then\n");
                    self.nested(&clause.body);
                }
                if let Some(body) = else_body {
                    self.closing("else\n");
                    self.nested(body);
                }
                self.closing("end");
            }
            StmtKind::NumericFor {
                var,
                start,
                limit,
                step,
                body,
            } => {
                self.out.push_str("for ");
                self.out.push_str(&var.name);
                self.out.push_str(" = ");
                self.expr(start);
                self.out.push_str(", ");
                self.expr(limit);
                if let Some(step) = step {
                    self.out.push_str(", ");
                    self.expr(step);
                }
                self.out.push_str(" do\n");
                self.nested(body);
                self.closing("end");
            }
            StmtKind::GenericFor { vars, exprs, body } => {
                self.out.push_str("for ");
                self.names(vars);
                self.out.push_str(" in ");
                self.expr_list(exprs);
                self.out.push_str(" do\n");
                self.nested(body);
                self.closing("end");
            }
            StmtKind::Function { name, func } => {
                self.out.push_str("function ");
                for (i, part) in name.path.iter().enumerate() {
                    if i > 0 {
                        self.out.push('.');
                    }
                    self.out.push_str(&part.name);
                }
                if let Some(method) = &name.method {
                    self.out.push(':');
                    self.out.push_str(&method.name);
                }
                self.func_body(func);
            }
            StmtKind::LocalFunction { name, func } => {
                self.out.push_str("local function ");
                self.out.push_str(&name.name);
                self.func_body(func);
            }
            StmtKind::Return { values } => {
                self.out.push_str("return");
                if !values.is_empty() {
                    self.out.push(' ');
                    self.expr_list(values);
                }
            }
            StmtKind::Break => self.out.push_str("break"),
            StmtKind::Goto(label) => {
                self.out.push_str("goto ");
                self.out.push_str(&label.name);
            }
            StmtKind::Label(label) => {
                self.out.push_str("::");
                self.out.push_str(&label.name);
                self.out.push_str("::");
            }
        }
    }

    fn names(&mut self, names: &[Name]) {
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(&name.name);
        }
    }

    /// `(params)` newline, body, `end`.
    fn func_body(&mut self, func: &FuncBody) {
        self.out.push('(');
        self.names(&func.params);
        if func.is_variadic {
            if !func.params.is_empty() {
                self.out.push_str(", ");
            }
            self.out.push_str("...");
        }
        self.out.push_str(")\n");
        self.nested(&func.body);
        self.closing("end");
    }

    fn expr_list(&mut self, exprs: &[Expr]) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.expr(expr);
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Nil => self.out.push_str("nil"),
            ExprKind::True => self.out.push_str("true"),
            ExprKind::False => self.out.push_str("false"),
            ExprKind::Vararg => self.out.push_str("..."),
            ExprKind::Number(text) | ExprKind::String(text) | ExprKind::Name(text) => {
                self.out.push_str(text)
            }
            ExprKind::Function(func) => {
                self.out.push_str("function");
                self.func_body(func);
            }
            ExprKind::Table(table) => self.table(table),
            ExprKind::Binary { op, lhs, rhs } => {
                self.expr(lhs);
                self.out.push(' ');
                self.out.push_str(op.as_str());
                self.out.push(' ');
                self.expr(rhs);
            }
            ExprKind::Unary { op, operand } => {
                self.out.push_str(op.as_str());
                let start = self.out.len();
                self.expr(operand);
                // `- -x` must not become the comment `--x`.
                if *op == UnOp::Neg && self.out[start..].starts_with('-') {
                    self.out.insert(start, ' ');
                }
            }
            ExprKind::Index { object, key } => {
                self.expr(object);
                self.out.push('[');
                self.expr(key);
                self.out.push(']');
            }
            ExprKind::Field { object, field } => {
                self.expr(object);
                self.out.push('.');
                self.out.push_str(&field.name);
            }
            ExprKind::Call { callee, args } => {
                self.expr(callee);
                self.call_args(args);
            }
            ExprKind::MethodCall {
                object,
                method,
                args,
            } => {
                self.expr(object);
                self.out.push(':');
                self.out.push_str(&method.name);
                self.call_args(args);
            }
            ExprKind::Paren(inner) => {
                self.out.push('(');
                self.expr(inner);
                self.out.push(')');
            }
        }
    }

    fn call_args(&mut self, args: &CallArgs) {
        match args {
            CallArgs::Parens(args) => {
                self.out.push('(');
                self.expr_list(args);
                self.out.push(')');
            }
            CallArgs::Table(table) => {
                self.out.push(' ');
                self.table(table);
            }
            CallArgs::Str(text) => {
                self.out.push(' ');
                self.out.push_str(text);
            }
        }
    }

    fn table(&mut self, table: &TableCtor) {
        if table.fields.is_empty() {
            self.out.push_str("{}");
            return;
        }
        self.out.push_str("{ ");
        for (i, field) in table.fields.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            match field {
                TableField::Positional(value) => self.expr(value),
                TableField::Named { name, value } => {
                    self.out.push_str(&name.name);
                    self.out.push_str(" = ");
                    self.expr(value);
                }
                TableField::Keyed { key, value } => {
                    self.out.push('[');
                    self.expr(key);
                    self.out.push_str("] = ");
                    self.expr(value);
                }
            }
        }
        self.out.push_str(" }");
    }
}
