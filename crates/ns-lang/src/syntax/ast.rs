/// Source location attached to every node for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Identity of a node inside one parsed program. The analyzer keys scopes,
/// resolutions and types by it; the parser hands them out in source order.
pub type NodeId = u32;

// ─── Top level ───────────────────────────────────────────────────────────────

/// The root node. Owns the root scope; its body owns the top-level block scope.
#[derive(Debug, Clone)]
pub struct Program {
    pub id: NodeId,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub id: NodeId,
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Ident {
    pub id: NodeId,
    pub name: String,
    pub span: Span,
}

// ─── Statements ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Stmt {
    /// Any expression in statement position; its value can become the block result.
    Expr(Expr),
    /// `x = e`, `final x = e`, `a[i] = e`
    Assign(Assign),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    FnDef(FnDef),
    Return(ReturnStmt),
}

#[derive(Debug, Clone)]
pub struct Assign {
    pub id: NodeId,
    pub target: Target,
    pub value: Expr,
    pub is_final: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Target {
    Name(Ident),
    /// `base[index] = value`; `id` names the indexing node for typing.
    Index { id: NodeId, base: Box<Expr>, index: Box<Expr>, span: Span },
}

/// `if c: ... elsif c: ... else: ... end`
#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_block: Block,
    pub branches: Vec<ElseBranch>,
    pub span: Span,
}

/// One `elsif` (condition present) or `else` (condition absent) clause.
#[derive(Debug, Clone)]
pub struct ElseBranch {
    pub condition: Option<Expr>,
    pub block: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Block,
    pub span: Span,
}

/// `for x in iterable: ... end`; owns the scope that declares `x`.
#[derive(Debug, Clone)]
pub struct ForStmt {
    pub id: NodeId,
    pub var: Ident,
    pub iterable: Expr,
    pub body: Block,
    pub span: Span,
}

/// `def name(params): ... end`; owns the scope that declares the params.
#[derive(Debug, Clone)]
pub struct FnDef {
    pub id: NodeId,
    pub name: Ident,
    pub params: Vec<Ident>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

// ─── Expressions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Int(i64),
    Bool(bool),
    Str(String),
    None,
    Ident(String),
    Binary { op: BinOp, left: Box<Expr>, right: Box<Expr> },
    Unary { op: UnOp, operand: Box<Expr> },
    Index { base: Box<Expr>, index: Box<Expr> },
    /// `[a, b, c]`
    Array(Vec<Expr>),
    /// `[:n]`, n slots of `None`
    SizedArray(Box<Expr>),
    /// `{k: v, ...}`
    Map(Vec<(Expr, Expr)>),
    /// `[element for var in iterable if filter]`; the expression id owns the
    /// scope that declares `var`.
    Comprehension(Box<Comprehension>),
    Call { callee: Ident, args: Vec<Expr> },
}

#[derive(Debug, Clone)]
pub struct Comprehension {
    pub element: Expr,
    pub var: Ident,
    pub iterable: Expr,
    pub filter: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add, Sub, Mul, Div, Mod,
    And, Or,
    Eq, NotEq,
    Lt, LtEq, Gt, GtEq,
}

impl BinOp {
    pub fn is_arithmetic(&self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod)
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, Self::Eq | Self::NotEq)
    }

    pub fn is_ordering(&self) -> bool {
        matches!(self, Self::Lt | Self::LtEq | Self::Gt | Self::GtEq)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::And => "and",
            Self::Or => "or",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Expr(e) => e.span,
            Stmt::Assign(a) => a.span,
            Stmt::If(i) => i.span,
            Stmt::While(w) => w.span,
            Stmt::For(f) => f.span,
            Stmt::FnDef(f) => f.span,
            Stmt::Return(r) => r.span,
        }
    }
}
