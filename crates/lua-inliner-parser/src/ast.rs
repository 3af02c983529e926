//! Lua syntax tree.
//!
//! Every statement, expression, name, function body and table constructor
//! carries a [`NodeId`]. Ids are assigned by the parser from the chunk's
//! [`NodeIdGen`]; nodes synthesized later draw from the same generator, so
//! an id identifies exactly one node even after the tree has been rewritten.

use lua_inliner_diagnostics::{FileId, Span};

/// Stable identity of a syntax node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

/// Hands out [`NodeId`]s in increasing order.
#[derive(Debug, Clone, Default)]
pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn count(&self) -> u32 {
        self.next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    /// `-- text` up to the end of the line.
    Line,
    /// `--[[ text ]]`, possibly spanning lines.
    Block,
    /// `#!` on the first line of the file.
    Shebang,
}

/// A comment exactly as written, including its `--` or `#!` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub text: String,
    pub kind: CommentKind,
    pub span: Span,
}

impl Comment {
    /// Text of a line comment after the `--`.
    pub fn body(&self) -> &str {
        match self.kind {
            CommentKind::Line => self.text.strip_prefix("--").unwrap_or(&self.text),
            _ => &self.text,
        }
    }
}

/// Non-code material attached before a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trivia {
    Comment(Comment),
    /// One or more consecutive empty lines.
    BlankLine,
}

impl Trivia {
    pub fn as_comment(&self) -> Option<&Comment> {
        match self {
            Trivia::Comment(comment) => Some(comment),
            Trivia::BlankLine => None,
        }
    }
}

/// A parsed source file.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub block: Block,
    /// Every comment in the source, in order, regardless of where the tree
    /// attached it.
    pub comments: Vec<Comment>,
    pub file_id: FileId,
    pub ids: NodeIdGen,
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    /// Trivia in front of the keyword that closes the block (`end`, `else`,
    /// `elseif`, `until`) or in front of the end of the file.
    pub trailing: Vec<Trivia>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self {
            stmts,
            trailing: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
}

/// An identifier occurrence: a declaration, a field name or a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub id: NodeId,
    pub name: String,
    pub span: Span,
}

impl Name {
    pub fn synthetic(ids: &mut NodeIdGen, name: impl Into<String>) -> Self {
        Self {
            id: ids.next(),
            name: name.into(),
            span: Span::DUMMY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub span: Span,
    pub leading: Vec<Trivia>,
    /// Comment on the same line after the statement's last token.
    pub trailing: Option<Comment>,
    pub kind: StmtKind,
}

impl Stmt {
    /// A statement created by a transformation rather than parsed.
    pub fn synthetic(ids: &mut NodeIdGen, kind: StmtKind) -> Self {
        Self {
            id: ids.next(),
            span: Span::DUMMY,
            leading: Vec::new(),
            trailing: None,
            kind,
        }
    }

    /// The body of a function declaration statement.
    pub fn func_body(&self) -> Option<&FuncBody> {
        match &self.kind {
            StmtKind::Function { func, .. } | StmtKind::LocalFunction { func, .. } => Some(func),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Local {
        names: Vec<LocalName>,
        values: Vec<Expr>,
    },
    Assign {
        targets: Vec<Expr>,
        values: Vec<Expr>,
    },
    /// A function or method call evaluated for its side effects.
    Call(Expr),
    Do(Block),
    While {
        cond: Expr,
        body: Block,
    },
    Repeat {
        body: Block,
        cond: Expr,
    },
    If {
        clauses: Vec<IfClause>,
        else_body: Option<Block>,
    },
    NumericFor {
        var: Name,
        start: Expr,
        limit: Expr,
        step: Option<Expr>,
        body: Block,
    },
    GenericFor {
        vars: Vec<Name>,
        exprs: Vec<Expr>,
        body: Block,
    },
    Function {
        name: FuncName,
        func: FuncBody,
    },
    LocalFunction {
        name: Name,
        func: FuncBody,
    },
    Return {
        values: Vec<Expr>,
    },
    Break,
    Goto(Name),
    Label(Name),
}

impl StmtKind {
    /// Whether a `break` in the statement's body leaves the statement.
    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            StmtKind::While { .. }
                | StmtKind::Repeat { .. }
                | StmtKind::NumericFor { .. }
                | StmtKind::GenericFor { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct LocalName {
    pub name: Name,
    /// `const` or `close`.
    pub attrib: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IfClause {
    pub cond: Expr,
    pub body: Block,
}

/// `a.b.c` or `a.b:c` in `function a.b:c() end`.
#[derive(Debug, Clone)]
pub struct FuncName {
    /// The first element is a variable reference, the rest are fields.
    pub path: Vec<Name>,
    pub method: Option<Name>,
}

#[derive(Debug, Clone)]
pub struct FuncBody {
    pub id: NodeId,
    pub params: Vec<Name>,
    pub is_variadic: bool,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExprKind,
}

impl Expr {
    pub fn synthetic(ids: &mut NodeIdGen, kind: ExprKind) -> Self {
        Self {
            id: ids.next(),
            span: Span::DUMMY,
            kind,
        }
    }

    pub fn nil(ids: &mut NodeIdGen) -> Self {
        Self::synthetic(ids, ExprKind::Nil)
    }

    pub fn name(ids: &mut NodeIdGen, name: impl Into<String>) -> Self {
        Self::synthetic(ids, ExprKind::Name(name.into()))
    }

    pub fn is_call(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Call { .. } | ExprKind::MethodCall { .. }
        )
    }

    /// Whether the expression may produce more than one value when it is
    /// the last element of an expression list.
    pub fn is_multi_value(&self) -> bool {
        self.is_call() || matches!(self.kind, ExprKind::Vararg)
    }

    /// Conservative purity check: `true` when evaluating the expression
    /// cannot call a function, raise an error or touch a metatable.
    ///
    /// Reading a name is pure only when `pure_name` says so: a local is a
    /// plain register read, but a global goes through `_ENV` and may hit an
    /// `__index` metamethod.
    pub fn is_pure_with(&self, pure_name: &dyn Fn(&Expr) -> bool) -> bool {
        match &self.kind {
            ExprKind::Nil
            | ExprKind::True
            | ExprKind::False
            | ExprKind::Vararg
            | ExprKind::Number(_)
            | ExprKind::String(_)
            | ExprKind::Function(_) => true,
            ExprKind::Name(_) => pure_name(self),
            ExprKind::Paren(inner) => inner.is_pure_with(pure_name),
            ExprKind::Table(table) => table.fields.iter().all(|field| match field {
                TableField::Positional(value) | TableField::Named { value, .. } => {
                    value.is_pure_with(pure_name)
                }
                TableField::Keyed { key, value } => {
                    key.is_pure_with(pure_name) && value.is_pure_with(pure_name)
                }
            }),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Nil,
    True,
    False,
    Vararg,
    /// Numeral exactly as written.
    Number(String),
    /// String literal exactly as written, quotes or long brackets included.
    String(String),
    Function(FuncBody),
    Table(TableCtor),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    /// A variable reference.
    Name(String),
    Index {
        object: Box<Expr>,
        key: Box<Expr>,
    },
    Field {
        object: Box<Expr>,
        field: Name,
    },
    Call {
        callee: Box<Expr>,
        args: CallArgs,
    },
    MethodCall {
        object: Box<Expr>,
        method: Name,
        args: CallArgs,
    },
    Paren(Box<Expr>),
}

#[derive(Debug, Clone)]
pub enum CallArgs {
    Parens(Vec<Expr>),
    /// `f { ... }`
    Table(TableCtor),
    /// `f "..."`, literal as written.
    Str(String),
}

#[derive(Debug, Clone)]
pub struct TableCtor {
    pub id: NodeId,
    pub fields: Vec<TableField>,
}

#[derive(Debug, Clone)]
pub enum TableField {
    /// `value`
    Positional(Expr),
    /// `name = value`
    Named { name: Name, value: Expr },
    /// `[key] = value`
    Keyed { key: Expr, value: Expr },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Lt,
    Gt,
    Le,
    Ge,
    Ne,
    Eq,
    BOr,
    BXor,
    BAnd,
    Shl,
    Shr,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    IDiv,
    Mod,
    Pow,
}

/// Priority of unary operators; binds tighter than everything but `^`.
pub const UNARY_PRIORITY: u8 = 12;

impl BinOp {
    /// Left and right binding priorities, as in the reference Lua parser.
    pub fn priority(self) -> (u8, u8) {
        match self {
            BinOp::Or => (1, 1),
            BinOp::And => (2, 2),
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge | BinOp::Ne | BinOp::Eq => (3, 3),
            BinOp::BOr => (4, 4),
            BinOp::BXor => (5, 5),
            BinOp::BAnd => (6, 6),
            BinOp::Shl | BinOp::Shr => (7, 7),
            BinOp::Concat => (9, 8),
            BinOp::Add | BinOp::Sub => (10, 10),
            BinOp::Mul | BinOp::Div | BinOp::IDiv | BinOp::Mod => (11, 11),
            BinOp::Pow => (14, 13),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Or => "or",
            BinOp::And => "and",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::Ne => "~=",
            BinOp::Eq => "==",
            BinOp::BOr => "|",
            BinOp::BXor => "~",
            BinOp::BAnd => "&",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Concat => "..",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::IDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "^",
        }
    }

    /// `and` / `or`: the right operand is only evaluated sometimes.
    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    Len,
    BNot,
}

impl UnOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnOp::Neg => "-",
            UnOp::Not => "not ",
            UnOp::Len => "#",
            UnOp::BNot => "~",
        }
    }
}

/// Reserved words of Lua 5.4.
pub const KEYWORDS: [&str; 22] = [
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}
