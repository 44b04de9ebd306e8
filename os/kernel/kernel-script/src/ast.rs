use crate::source::{Source, Span};
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;

pub type Ident = Rc<str>;

#[derive(Debug)]
pub struct Program {
    pub body: Vec<Stmt>,
    pub source: Rc<Source>,
}

#[derive(Debug)]
pub struct FunctionDecl {
    pub name: Option<Ident>,
    pub params: Vec<Ident>,
    pub body: Vec<Stmt>,
    pub span: Span,
    pub source: Rc<Source>,
}

#[derive(Debug)]
pub enum Stmt {
    Var(Vec<(Ident, Option<Expr>)>, Span),
    Function(Rc<FunctionDecl>),
    Expr(Expr),
    If {
        test: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
        span: Span,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    For {
        init: Option<Box<Stmt>>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
        span: Span,
    },
    Block(Vec<Stmt>, Span),
    Return(Option<Expr>, Span),
    Break(Span),
    Continue(Span),
    Throw(Expr, Span),
    Empty(Span),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Self::Var(_, span)
            | Self::If { span, .. }
            | Self::While { span, .. }
            | Self::For { span, .. }
            | Self::Block(_, span)
            | Self::Return(_, span)
            | Self::Break(span)
            | Self::Continue(span)
            | Self::Throw(_, span)
            | Self::Empty(span) => *span,
            Self::Function(decl) => decl.span,
            Self::Expr(e) => e.span,
        }
    }
}

#[derive(Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug)]
pub enum ExprKind {
    Number(f64),
    Str(Rc<str>),
    Bool(bool),
    Null,
    Undefined,
    Ident(Ident),
    Array(Vec<Expr>),
    Object(Vec<(Ident, Expr)>),
    Function(Rc<FunctionDecl>),
    Unary(UnaryOp, Box<Expr>),
    Update {
        increment: bool,
        prefix: bool,
        target: Box<Expr>,
    },
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    /// `None` is plain `=`, otherwise a compound assignment.
    Assign(Option<BinaryOp>, Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Member(Box<Expr>, Ident),
    Index(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    Typeof,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LogicalOp {
    And,
    Or,
}
