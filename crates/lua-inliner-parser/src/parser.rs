//! Recursive-descent parser producing the tree in [`crate::ast`].

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{tokenize, Token, TokenKind};
use lua_inliner_diagnostics::{FileId, Span};

/// Parse a whole source file.
pub fn parse(source: &str, file_id: FileId) -> Result<Chunk, ParseError> {
    let lexed = tokenize(source, file_id)?;
    log::trace!("lexed {} tokens", lexed.tokens.len());

    let mut parser = Parser {
        tokens: lexed.tokens,
        pos: 0,
        ids: NodeIdGen::new(),
        file_id,
        vararg: vec![true],
    };
    let block = parser.block()?;
    parser.expect(TokenKind::Eof, "<eof>")?;

    Ok(Chunk {
        block,
        comments: lexed.comments,
        file_id,
        ids: parser.ids,
    })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    ids: NodeIdGen,
    file_id: FileId,
    /// Whether `...` is allowed, per enclosing function.
    vararg: Vec<bool>,
}

impl Parser {
    // ----- token access -----

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_nth(&self, n: usize) -> &TokenKind {
        let index = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    /// Span of the most recently consumed token.
    fn prev_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .map_or(Span::new(self.file_id, 0, 0), |i| self.tokens[i].span)
    }

    fn span_from(&self, start: Span) -> Span {
        start.to(self.prev_span())
    }

    fn bump(&mut self) -> TokenKind {
        let kind = self.tokens[self.pos].kind.clone();
        if kind != TokenKind::Eof {
            self.pos += 1;
        }
        kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn take_leading(&mut self) -> Vec<Trivia> {
        std::mem::take(&mut self.tokens[self.pos].leading)
    }

    fn take_prev_trailing(&mut self) -> Option<Comment> {
        let index = self.pos.checked_sub(1)?;
        self.tokens[index].trailing.take()
    }

    fn expected(&self, what: &str) -> ParseError {
        ParseError::Expected {
            expected: what.to_string(),
            found: self.peek().to_string(),
            span: self.current_span(),
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), ParseError> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(self.expected(&format!("'{what}'")))
        }
    }

    fn name(&mut self) -> Result<Name, ParseError> {
        match self.peek() {
            TokenKind::Name(name) => {
                let name = name.clone();
                let span = self.current_span();
                self.bump();
                Ok(Name {
                    id: self.ids.next(),
                    name,
                    span,
                })
            }
            _ => Err(self.expected("<name>")),
        }
    }

    fn expr(&mut self, span: Span, kind: ExprKind) -> Expr {
        Expr {
            id: self.ids.next(),
            span,
            kind,
        }
    }

    // ----- blocks and statements -----

    fn block_follows(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Eof | TokenKind::End | TokenKind::Else | TokenKind::Elseif | TokenKind::Until
        )
    }

    /// Statements up to (not including) the closing keyword, whose leading
    /// trivia becomes the block's trailing trivia.
    fn block(&mut self) -> Result<Block, ParseError> {
        let mut stmts: Vec<Stmt> = Vec::new();
        let mut carried: Vec<Trivia> = Vec::new();

        while !self.block_follows() {
            if self.check(&TokenKind::Semicolon) {
                carried.extend(self.take_leading());
                self.bump();
                if let Some(comment) = self.take_prev_trailing() {
                    match stmts.last_mut() {
                        Some(last) if last.trailing.is_none() => last.trailing = Some(comment),
                        _ => carried.push(Trivia::Comment(comment)),
                    }
                }
                continue;
            }

            let is_return = self.check(&TokenKind::Return);
            let mut leading = std::mem::take(&mut carried);
            leading.extend(self.take_leading());
            let stmt = self.statement(leading)?;
            stmts.push(stmt);

            if is_return && !self.block_follows() {
                return Err(self.expected("'<eof>'"));
            }
        }

        carried.extend(self.take_leading());
        Ok(Block {
            stmts,
            trailing: carried,
        })
    }

    fn statement(&mut self, leading: Vec<Trivia>) -> Result<Stmt, ParseError> {
        let start = self.current_span();
        let kind = match self.peek() {
            TokenKind::If => self.if_stmt()?,
            TokenKind::While => {
                self.bump();
                let cond = self.expression()?;
                self.expect(TokenKind::Do, "do")?;
                let body = self.block()?;
                self.expect(TokenKind::End, "end")?;
                StmtKind::While { cond, body }
            }
            TokenKind::Do => {
                self.bump();
                let body = self.block()?;
                self.expect(TokenKind::End, "end")?;
                StmtKind::Do(body)
            }
            TokenKind::For => self.for_stmt()?,
            TokenKind::Repeat => {
                self.bump();
                let body = self.block()?;
                self.expect(TokenKind::Until, "until")?;
                let cond = self.expression()?;
                StmtKind::Repeat { body, cond }
            }
            TokenKind::Function => self.function_stmt()?,
            TokenKind::Local => {
                self.bump();
                if self.eat(&TokenKind::Function) {
                    let name = self.name()?;
                    let func = self.func_body(start)?;
                    StmtKind::LocalFunction { name, func }
                } else {
                    self.local_stmt()?
                }
            }
            TokenKind::DoubleColon => {
                self.bump();
                let name = self.name()?;
                self.expect(TokenKind::DoubleColon, "::")?;
                StmtKind::Label(name)
            }
            TokenKind::Return => {
                self.bump();
                let values = if self.block_follows() || self.check(&TokenKind::Semicolon) {
                    Vec::new()
                } else {
                    self.expr_list()?
                };
                self.eat(&TokenKind::Semicolon);
                StmtKind::Return { values }
            }
            TokenKind::Break => {
                self.bump();
                StmtKind::Break
            }
            TokenKind::Goto => {
                self.bump();
                StmtKind::Goto(self.name()?)
            }
            _ => self.expr_stmt()?,
        };

        Ok(Stmt {
            id: self.ids.next(),
            span: self.span_from(start),
            leading,
            trailing: self.take_prev_trailing(),
            kind,
        })
    }

    fn if_stmt(&mut self) -> Result<StmtKind, ParseError> {
        let mut clauses = Vec::new();
        let mut else_body = None;

        // `if` first, then any number of `elseif`.
        loop {
            self.bump();
            let cond = self.expression()?;
            self.expect(TokenKind::Then, "then")?;
            let body = self.block()?;
            clauses.push(IfClause { cond, body });
            if !self.check(&TokenKind::Elseif) {
                break;
            }
        }

        if self.eat(&TokenKind::Else) {
            else_body = Some(self.block()?);
        }
        self.expect(TokenKind::End, "end")?;
        Ok(StmtKind::If { clauses, else_body })
    }

    fn for_stmt(&mut self) -> Result<StmtKind, ParseError> {
        self.bump();
        let first = self.name()?;

        if self.eat(&TokenKind::Assign) {
            let start = self.expression()?;
            self.expect(TokenKind::Comma, ",")?;
            let limit = self.expression()?;
            let step = if self.eat(&TokenKind::Comma) {
                Some(self.expression()?)
            } else {
                None
            };
            self.expect(TokenKind::Do, "do")?;
            let body = self.block()?;
            self.expect(TokenKind::End, "end")?;
            return Ok(StmtKind::NumericFor {
                var: first,
                start,
                limit,
                step,
                body,
            });
        }

        let mut vars = vec![first];
        while self.eat(&TokenKind::Comma) {
            vars.push(self.name()?);
        }
        if !self.eat(&TokenKind::In) {
            return Err(self.expected("'=' or 'in'"));
        }
        let exprs = self.expr_list()?;
        self.expect(TokenKind::Do, "do")?;
        let body = self.block()?;
        self.expect(TokenKind::End, "end")?;
        Ok(StmtKind::GenericFor { vars, exprs, body })
    }

    fn function_stmt(&mut self) -> Result<StmtKind, ParseError> {
        let start = self.current_span();
        self.bump();

        let mut path = vec![self.name()?];
        while self.eat(&TokenKind::Dot) {
            path.push(self.name()?);
        }
        let method = if self.eat(&TokenKind::Colon) {
            Some(self.name()?)
        } else {
            None
        };

        let func = self.func_body(start)?;
        Ok(StmtKind::Function {
            name: FuncName { path, method },
            func,
        })
    }

    fn local_stmt(&mut self) -> Result<StmtKind, ParseError> {
        let mut names = Vec::new();
        loop {
            let name = self.name()?;
            let attrib = if self.eat(&TokenKind::Less) {
                let attrib = self.name()?;
                if attrib.name != "const" && attrib.name != "close" {
                    return Err(ParseError::SyntaxError {
                        found: attrib.name,
                        span: attrib.span,
                    });
                }
                self.expect(TokenKind::Greater, ">")?;
                Some(attrib.name)
            } else {
                None
            };
            names.push(LocalName { name, attrib });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        let values = if self.eat(&TokenKind::Assign) {
            self.expr_list()?
        } else {
            Vec::new()
        };
        Ok(StmtKind::Local { names, values })
    }

    fn expr_stmt(&mut self) -> Result<StmtKind, ParseError> {
        let first = self.suffixed_expression()?;

        if self.check(&TokenKind::Assign) || self.check(&TokenKind::Comma) {
            let mut targets = vec![first];
            while self.eat(&TokenKind::Comma) {
                targets.push(self.suffixed_expression()?);
            }
            for target in &targets {
                if !matches!(
                    target.kind,
                    ExprKind::Name(_) | ExprKind::Index { .. } | ExprKind::Field { .. }
                ) {
                    return Err(self.syntax_error());
                }
            }
            self.expect(TokenKind::Assign, "=")?;
            let values = self.expr_list()?;
            return Ok(StmtKind::Assign { targets, values });
        }

        if first.is_call() {
            Ok(StmtKind::Call(first))
        } else {
            Err(self.syntax_error())
        }
    }

    fn syntax_error(&self) -> ParseError {
        ParseError::SyntaxError {
            found: self.peek().to_string(),
            span: self.current_span(),
        }
    }

    // ----- functions -----

    /// Parameter list and body, starting at `(`. `start` is the span of the
    /// first token of the construct the body belongs to.
    fn func_body(&mut self, start: Span) -> Result<FuncBody, ParseError> {
        let id = self.ids.next();
        self.expect(TokenKind::LParen, "(")?;

        let mut params = Vec::new();
        let mut is_variadic = false;
        if !self.check(&TokenKind::RParen) {
            loop {
                if self.eat(&TokenKind::DotDotDot) {
                    is_variadic = true;
                    break;
                }
                params.push(self.name()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, ")")?;

        self.vararg.push(is_variadic);
        let body = self.block();
        self.vararg.pop();
        let body = body?;
        self.expect(TokenKind::End, "end")?;

        Ok(FuncBody {
            id,
            params,
            is_variadic,
            body,
            span: self.span_from(start),
        })
    }

    // ----- expressions -----

    fn expr_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut exprs = vec![self.expression()?];
        while self.eat(&TokenKind::Comma) {
            exprs.push(self.expression()?);
        }
        Ok(exprs)
    }

    pub(crate) fn expression(&mut self) -> Result<Expr, ParseError> {
        self.sub_expression(0)
    }

    /// Precedence climbing; operators binding no tighter than `limit` are
    /// left for the caller.
    fn sub_expression(&mut self, limit: u8) -> Result<Expr, ParseError> {
        let start = self.current_span();
        let mut lhs = if let Some(op) = unary_op(self.peek()) {
            self.bump();
            let operand = self.sub_expression(UNARY_PRIORITY)?;
            let span = self.span_from(start);
            self.expr(
                span,
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
            )
        } else {
            self.simple_expression()?
        };

        while let Some(op) = binary_op(self.peek()) {
            let (left, right) = op.priority();
            if left <= limit {
                break;
            }
            self.bump();
            let rhs = self.sub_expression(right)?;
            let span = self.span_from(start);
            lhs = self.expr(
                span,
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            );
        }
        Ok(lhs)
    }

    fn simple_expression(&mut self) -> Result<Expr, ParseError> {
        let span = self.current_span();
        let kind = match self.peek() {
            TokenKind::Number(text) => ExprKind::Number(text.clone()),
            TokenKind::String(text) => ExprKind::String(text.clone()),
            TokenKind::Nil => ExprKind::Nil,
            TokenKind::True => ExprKind::True,
            TokenKind::False => ExprKind::False,
            TokenKind::DotDotDot => {
                if !self.vararg.last().copied().unwrap_or(false) {
                    return Err(ParseError::VarargOutsideFunction { span });
                }
                ExprKind::Vararg
            }
            TokenKind::LBrace => {
                let table = self.table_constructor()?;
                return Ok(self.expr(self.span_from(span), ExprKind::Table(table)));
            }
            TokenKind::Function => {
                self.bump();
                let func = self.func_body(span)?;
                return Ok(self.expr(self.span_from(span), ExprKind::Function(func)));
            }
            _ => return self.suffixed_expression(),
        };
        self.bump();
        Ok(self.expr(span, kind))
    }

    fn primary_expression(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_span();
        match self.peek() {
            TokenKind::Name(_) => {
                let name = self.name()?;
                Ok(Expr {
                    id: name.id,
                    span: name.span,
                    kind: ExprKind::Name(name.name),
                })
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.expression()?;
                self.expect(TokenKind::RParen, ")")?;
                Ok(self.expr(self.span_from(start), ExprKind::Paren(Box::new(inner))))
            }
            _ => Err(ParseError::UnexpectedSymbol {
                found: self.peek().to_string(),
                span: start,
            }),
        }
    }

    /// Primary expression followed by `.name`, `[key]`, `:m(args)` and call
    /// suffixes.
    fn suffixed_expression(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_span();
        let mut expr = self.primary_expression()?;
        loop {
            let kind = match self.peek() {
                TokenKind::Dot => {
                    self.bump();
                    let field = self.name()?;
                    ExprKind::Field {
                        object: Box::new(expr),
                        field,
                    }
                }
                TokenKind::LBracket => {
                    self.bump();
                    let key = self.expression()?;
                    self.expect(TokenKind::RBracket, "]")?;
                    ExprKind::Index {
                        object: Box::new(expr),
                        key: Box::new(key),
                    }
                }
                TokenKind::Colon => {
                    self.bump();
                    let method = self.name()?;
                    let args = self.call_args()?;
                    ExprKind::MethodCall {
                        object: Box::new(expr),
                        method,
                        args,
                    }
                }
                TokenKind::LParen | TokenKind::String(_) | TokenKind::LBrace => {
                    let args = self.call_args()?;
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    }
                }
                _ => return Ok(expr),
            };
            expr = self.expr(self.span_from(start), kind);
        }
    }

    fn call_args(&mut self) -> Result<CallArgs, ParseError> {
        match self.peek() {
            TokenKind::String(text) => {
                let text = text.clone();
                self.bump();
                Ok(CallArgs::Str(text))
            }
            TokenKind::LBrace => Ok(CallArgs::Table(self.table_constructor()?)),
            TokenKind::LParen => {
                self.bump();
                let args = if self.check(&TokenKind::RParen) {
                    Vec::new()
                } else {
                    self.expr_list()?
                };
                self.expect(TokenKind::RParen, ")")?;
                Ok(CallArgs::Parens(args))
            }
            _ => Err(self.expected("function arguments")),
        }
    }

    fn table_constructor(&mut self) -> Result<TableCtor, ParseError> {
        let id = self.ids.next();
        self.expect(TokenKind::LBrace, "{")?;

        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let field = match self.peek() {
                TokenKind::LBracket => {
                    self.bump();
                    let key = self.expression()?;
                    self.expect(TokenKind::RBracket, "]")?;
                    self.expect(TokenKind::Assign, "=")?;
                    let value = self.expression()?;
                    TableField::Keyed { key, value }
                }
                TokenKind::Name(_) if self.peek_nth(1) == &TokenKind::Assign => {
                    let name = self.name()?;
                    self.bump();
                    let value = self.expression()?;
                    TableField::Named { name, value }
                }
                _ => TableField::Positional(self.expression()?),
            };
            fields.push(field);

            if !self.eat(&TokenKind::Comma) && !self.eat(&TokenKind::Semicolon) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "}")?;
        Ok(TableCtor { id, fields })
    }
}

fn unary_op(kind: &TokenKind) -> Option<UnOp> {
    Some(match kind {
        TokenKind::Minus => UnOp::Neg,
        TokenKind::Not => UnOp::Not,
        TokenKind::Hash => UnOp::Len,
        TokenKind::Tilde => UnOp::BNot,
        _ => return None,
    })
}

fn binary_op(kind: &TokenKind) -> Option<BinOp> {
    Some(match kind {
        TokenKind::Plus => BinOp::Add,
        TokenKind::Minus => BinOp::Sub,
        TokenKind::Star => BinOp::Mul,
        TokenKind::Slash => BinOp::Div,
        TokenKind::DoubleSlash => BinOp::IDiv,
        TokenKind::Percent => BinOp::Mod,
        TokenKind::Caret => BinOp::Pow,
        TokenKind::DotDot => BinOp::Concat,
        TokenKind::ShiftLeft => BinOp::Shl,
        TokenKind::ShiftRight => BinOp::Shr,
        TokenKind::Ampersand => BinOp::BAnd,
        TokenKind::Pipe => BinOp::BOr,
        TokenKind::Tilde => BinOp::BXor,
        TokenKind::Eq => BinOp::Eq,
        TokenKind::NotEq => BinOp::Ne,
        TokenKind::Less => BinOp::Lt,
        TokenKind::LessEq => BinOp::Le,
        TokenKind::Greater => BinOp::Gt,
        TokenKind::GreaterEq => BinOp::Ge,
        TokenKind::And => BinOp::And,
        TokenKind::Or => BinOp::Or,
        _ => return None,
    })
}
