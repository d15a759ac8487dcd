// AST node types for OpenACC-annotated C sources.
//
// Covers the C subset accepted by the parser plus OpenACC constructs, which
// hold a directive (kind + clauses) and their associated statement.
// Every node carries a `SimpleSpan` for error reporting in downstream phases.
//
// Preconditions: produced by the parser from a valid or partially-valid token stream.
// Postconditions: each node's span covers the source range of the construct.
// Failure modes: none (data-only module).
// Side effects: none.

use chumsky::span::SimpleSpan;

use crate::clause::{Clause, DirectiveKind};

/// Byte-offset span (alias for chumsky's `SimpleSpan`).
pub type Span = SimpleSpan;

/// An identifier occurrence with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

// ── Root ──

/// A complete source file: a sequence of top-level items.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationUnit {
    pub items: Vec<Item>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Function(FunctionDef),
    Decl(Declaration),
    Record(RecordDef),
    /// Preprocessor line kept verbatim (`#include <stdio.h>`).
    Preprocessor(String, Span),
}

/// `struct NAME { fields };`
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDef {
    pub name: Ident,
    pub fields: Vec<Declaration>,
    pub span: Span,
}

/// A function definition or prototype (`body` is `None` for prototypes).
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub ret: TypeSpec,
    pub ret_pointers: u32,
    pub name: Ident,
    pub params: Vec<Param>,
    /// `f(void)` as opposed to `f()`.
    pub void_params: bool,
    pub body: Option<Block>,
    /// `#pragma acc routine` line preceding the function.
    pub routine: Option<AccDirective>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub spec: TypeSpec,
    pub declarator: Declarator,
}

// ── Types and declarations ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Static,
    Extern,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseType {
    Void,
    Char,
    Short,
    Int,
    Long,
    LongLong,
    Float,
    Double,
    Struct(String),
}

/// Declaration specifiers: `static const unsigned int`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub storage: Option<StorageClass>,
    pub is_const: bool,
    /// `Some(true)` for `unsigned`, `Some(false)` for explicit `signed`.
    pub unsigned: Option<bool>,
    pub base: BaseType,
    pub span: Span,
}

/// One declarator: `*p`, `a[10][n]`, `x = 5`.
#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub name: Ident,
    pub pointers: u32,
    /// Array dimensions, outermost first; `None` for `[]`.
    pub dims: Vec<Option<Expr>>,
    pub init: Option<Initializer>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Initializer {
    Expr(Expr),
    List(Vec<Initializer>, Span),
}

/// `spec declarator, declarator, ...;`
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub spec: TypeSpec,
    pub declarators: Vec<Declarator>,
    pub span: Span,
}

// ── Statements ──

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Block(Block),
    Decl(Declaration),
    Expr(Expr),
    If {
        cond: Expr,
        then: Box<Stmt>,
        els: Option<Box<Stmt>>,
    },
    For(ForStmt),
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    Switch {
        cond: Expr,
        body: Box<Stmt>,
    },
    /// `case VALUE:` label; the labeled statement follows in the block.
    Case(Expr),
    /// `default:` label.
    Default,
    Break,
    Continue,
    Return(Option<Expr>),
    Empty,
    Acc(AccConstruct),
    /// Standalone directive: `update`, `enter data`, `exit data`.
    AccExec(AccDirective),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Decl(Declaration),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub init: Option<ForInit>,
    pub cond: Option<Expr>,
    pub step: Option<Expr>,
    pub body: Box<Stmt>,
}

// ── OpenACC ──

/// `#pragma acc KIND clauses` line.
#[derive(Debug, Clone, PartialEq)]
pub struct AccDirective {
    pub kind: DirectiveKind,
    pub clauses: Vec<Clause>,
    pub span: Span,
}

/// A directive together with its associated statement.
#[derive(Debug, Clone, PartialEq)]
pub struct AccConstruct {
    pub directive: AccDirective,
    pub body: Box<Stmt>,
}

// ── Expressions ──

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    Deref,
    AddrOf,
    PreInc,
    PreDec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Inc,
    Dec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Ident(Ident),
    Int(u64),
    /// Floating literal, kept as written.
    Float(String),
    Str(String),
    Char(String),
    Paren(Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Postfix(PostfixOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Assign(AssignOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Index(Box<Expr>, Box<Expr>),
    Member {
        base: Box<Expr>,
        field: Ident,
        arrow: bool,
    },
    /// Subarray `base[start:len]`; only produced inside clause variable lists.
    Section {
        base: Box<Expr>,
        start: Option<Box<Expr>>,
        len: Option<Box<Expr>>,
    },
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::Deref => "*",
            UnaryOp::AddrOf => "&",
            UnaryOp::PreInc => "++",
            UnaryOp::PreDec => "--",
        }
    }
}

impl PostfixOp {
    pub fn as_str(self) -> &'static str {
        match self {
            PostfixOp::Inc => "++",
            PostfixOp::Dec => "--",
        }
    }
}

impl BinOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::BitAnd => "&",
            BinOp::BitXor => "^",
            BinOp::BitOr => "|",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Rem => "%=",
            AssignOp::BitAnd => "&=",
            AssignOp::BitOr => "|=",
            AssignOp::BitXor => "^=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
        }
    }
}

impl Expr {
    /// Strip any number of enclosing parentheses.
    pub fn ignore_parens(&self) -> &Expr {
        let mut e = self;
        while let ExprKind::Paren(inner) = &e.kind {
            e = inner;
        }
        e
    }

    /// Value of an integer constant expression built from literals and
    /// arithmetic, or `None` when the expression is not constant.
    pub fn const_int(&self) -> Option<i64> {
        match &self.kind {
            ExprKind::Int(v) => i64::try_from(*v).ok(),
            ExprKind::Paren(e) => e.const_int(),
            ExprKind::Unary(UnaryOp::Neg, e) => e.const_int()?.checked_neg(),
            ExprKind::Unary(UnaryOp::Plus, e) => e.const_int(),
            ExprKind::Binary(op, l, r) => {
                let (l, r) = (l.const_int()?, r.const_int()?);
                match op {
                    BinOp::Add => l.checked_add(r),
                    BinOp::Sub => l.checked_sub(r),
                    BinOp::Mul => l.checked_mul(r),
                    BinOp::Div => l.checked_div(r),
                    BinOp::Rem => l.checked_rem(r),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl Stmt {
    /// The statement as a `for` loop. A braced `{ for ... }` is not one.
    pub fn as_for(&self) -> Option<&ForStmt> {
        match &self.kind {
            StmtKind::For(f) => Some(f),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chumsky::span::Span as _;

    fn sp() -> Span {
        Span::new((), 0..1)
    }

    fn int(v: u64) -> Expr {
        Expr {
            kind: ExprKind::Int(v),
            span: sp(),
        }
    }

    #[test]
    fn const_int_folds_arithmetic() {
        let e = Expr {
            kind: ExprKind::Binary(BinOp::Mul, Box::new(int(3)), Box::new(int(4))),
            span: sp(),
        };
        assert_eq!(e.const_int(), Some(12));
    }

    #[test]
    fn const_int_rejects_identifiers() {
        let e = Expr {
            kind: ExprKind::Ident(Ident {
                name: "n".into(),
                span: sp(),
            }),
            span: sp(),
        };
        assert_eq!(e.const_int(), None);
    }

    #[test]
    fn negative_constant() {
        let e = Expr {
            kind: ExprKind::Unary(UnaryOp::Neg, Box::new(int(2))),
            span: sp(),
        };
        assert_eq!(e.const_int(), Some(-2));
    }
}
