// visit.rs: Read-only AST traversal
//
// Each `visit_*` method defaults to the matching `walk_*` function, which
// visits the node's children in source order. Passes override the methods
// for the nodes they care about and call `walk_*` to keep descending.
//
// Preconditions: none.
// Postconditions: children are visited left to right, clauses of an OpenACC
//   construct before its associated statement.
// Failure modes: none.
// Side effects: none.

use crate::ast::*;
use crate::clause::{Clause, ClauseKind, GangStatic, TileSize};

pub trait Visitor<'ast>: Sized {
    fn visit_item(&mut self, item: &'ast Item) {
        walk_item(self, item)
    }

    fn visit_function(&mut self, func: &'ast FunctionDef) {
        walk_function(self, func)
    }

    fn visit_declaration(&mut self, decl: &'ast Declaration) {
        walk_declaration(self, decl)
    }

    fn visit_declarator(&mut self, spec: &'ast TypeSpec, decl: &'ast Declarator) {
        let _ = spec;
        walk_declarator(self, decl)
    }

    fn visit_block(&mut self, block: &'ast Block) {
        walk_block(self, block)
    }

    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        walk_stmt(self, stmt)
    }

    fn visit_acc(&mut self, construct: &'ast AccConstruct) {
        walk_acc(self, construct)
    }

    /// A directive without an associated statement: `update`, `enter data`,
    /// `exit data`, or a function's `routine`.
    fn visit_standalone(&mut self, directive: &'ast AccDirective) {
        walk_standalone(self, directive)
    }

    fn visit_clause(&mut self, clause: &'ast Clause) {
        walk_clause(self, clause)
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        walk_expr(self, expr)
    }

    fn visit_ident(&mut self, ident: &'ast Ident) {
        let _ = ident;
    }
}

pub fn walk_unit<'a, V: Visitor<'a>>(v: &mut V, unit: &'a TranslationUnit) {
    for item in &unit.items {
        v.visit_item(item);
    }
}

pub fn walk_item<'a, V: Visitor<'a>>(v: &mut V, item: &'a Item) {
    match item {
        Item::Function(f) => v.visit_function(f),
        Item::Decl(d) => v.visit_declaration(d),
        Item::Record(r) => {
            for field in &r.fields {
                v.visit_declaration(field);
            }
        }
        Item::Preprocessor(..) => {}
    }
}

pub fn walk_function<'a, V: Visitor<'a>>(v: &mut V, func: &'a FunctionDef) {
    if let Some(routine) = &func.routine {
        v.visit_standalone(routine);
    }
    for p in &func.params {
        v.visit_declarator(&p.spec, &p.declarator);
    }
    if let Some(body) = &func.body {
        v.visit_block(body);
    }
}

pub fn walk_declaration<'a, V: Visitor<'a>>(v: &mut V, decl: &'a Declaration) {
    for d in &decl.declarators {
        v.visit_declarator(&decl.spec, d);
    }
}

pub fn walk_declarator<'a, V: Visitor<'a>>(v: &mut V, decl: &'a Declarator) {
    for dim in decl.dims.iter().flatten() {
        v.visit_expr(dim);
    }
    if let Some(init) = &decl.init {
        walk_initializer(v, init);
    }
}

pub fn walk_initializer<'a, V: Visitor<'a>>(v: &mut V, init: &'a Initializer) {
    match init {
        Initializer::Expr(e) => v.visit_expr(e),
        Initializer::List(items, _) => {
            for i in items {
                walk_initializer(v, i);
            }
        }
    }
}

pub fn walk_block<'a, V: Visitor<'a>>(v: &mut V, block: &'a Block) {
    for s in &block.stmts {
        v.visit_stmt(s);
    }
}

pub fn walk_stmt<'a, V: Visitor<'a>>(v: &mut V, stmt: &'a Stmt) {
    match &stmt.kind {
        StmtKind::Block(b) => v.visit_block(b),
        StmtKind::Decl(d) => v.visit_declaration(d),
        StmtKind::Expr(e) | StmtKind::Case(e) => v.visit_expr(e),
        StmtKind::If { cond, then, els } => {
            v.visit_expr(cond);
            v.visit_stmt(then);
            if let Some(els) = els {
                v.visit_stmt(els);
            }
        }
        StmtKind::For(f) => {
            match &f.init {
                Some(ForInit::Decl(d)) => v.visit_declaration(d),
                Some(ForInit::Expr(e)) => v.visit_expr(e),
                None => {}
            }
            if let Some(c) = &f.cond {
                v.visit_expr(c);
            }
            if let Some(s) = &f.step {
                v.visit_expr(s);
            }
            v.visit_stmt(&f.body);
        }
        StmtKind::While { cond, body } | StmtKind::Switch { cond, body } => {
            v.visit_expr(cond);
            v.visit_stmt(body);
        }
        StmtKind::Return(Some(e)) => v.visit_expr(e),
        StmtKind::Return(None)
        | StmtKind::Default
        | StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Empty => {}
        StmtKind::Acc(c) => v.visit_acc(c),
        StmtKind::AccExec(d) => v.visit_standalone(d),
    }
}

pub fn walk_standalone<'a, V: Visitor<'a>>(v: &mut V, directive: &'a AccDirective) {
    for c in &directive.clauses {
        v.visit_clause(c);
    }
}

pub fn walk_acc<'a, V: Visitor<'a>>(v: &mut V, construct: &'a AccConstruct) {
    for c in &construct.directive.clauses {
        v.visit_clause(c);
    }
    v.visit_stmt(&construct.body);
}

pub fn walk_clause<'a, V: Visitor<'a>>(v: &mut V, clause: &'a Clause) {
    match &clause.kind {
        ClauseKind::Data(_, vars)
        | ClauseKind::Private(vars)
        | ClauseKind::Firstprivate(vars)
        | ClauseKind::Reduction(_, vars)
        | ClauseKind::Motion(_, vars) => {
            for e in vars {
                v.visit_expr(e);
            }
        }
        ClauseKind::If(e)
        | ClauseKind::NumGangs(e)
        | ClauseKind::NumWorkers(e)
        | ClauseKind::VectorLength(e)
        | ClauseKind::Collapse(e)
        | ClauseKind::Gang(Some(GangStatic::Expr(e))) => v.visit_expr(e),
        ClauseKind::Tile(sizes) => {
            for s in sizes {
                if let TileSize::Expr(e) = s {
                    v.visit_expr(e);
                }
            }
        }
        ClauseKind::Gang(_)
        | ClauseKind::Worker
        | ClauseKind::Vector
        | ClauseKind::Seq
        | ClauseKind::Auto
        | ClauseKind::Independent
        | ClauseKind::IfPresent => {}
    }
}

pub fn walk_expr<'a, V: Visitor<'a>>(v: &mut V, expr: &'a Expr) {
    match &expr.kind {
        ExprKind::Ident(id) => v.visit_ident(id),
        ExprKind::Int(_) | ExprKind::Float(_) | ExprKind::Str(_) | ExprKind::Char(_) => {}
        ExprKind::Paren(e) | ExprKind::Unary(_, e) | ExprKind::Postfix(_, e) => v.visit_expr(e),
        ExprKind::Binary(_, l, r) | ExprKind::Assign(_, l, r) | ExprKind::Index(l, r) => {
            v.visit_expr(l);
            v.visit_expr(r);
        }
        ExprKind::Ternary(c, a, b) => {
            v.visit_expr(c);
            v.visit_expr(a);
            v.visit_expr(b);
        }
        ExprKind::Call(callee, args) => {
            v.visit_expr(callee);
            for a in args {
                v.visit_expr(a);
            }
        }
        // The field name is not a variable reference.
        ExprKind::Member { base, .. } => v.visit_expr(base),
        ExprKind::Section { base, start, len } => {
            v.visit_expr(base);
            if let Some(s) = start {
                v.visit_expr(s);
            }
            if let Some(l) = len {
                v.visit_expr(l);
            }
        }
    }
}
