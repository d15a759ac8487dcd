// dump.rs: Indented AST dump
//
// One node per line, children indented by two spaces. OpenACC directive
// nodes list their written clauses, then the implicit clauses computed by
// the analyses (`<implicit>`), then an `impl:` subtree holding the OpenMP
// translation and the associated statement.
//
// Preconditions: the analyses in `DumpInputs` come from the same unit as
//   `resolved`. Any of them may be absent; the matching nodes are omitted.
// Postconditions: output is newline-terminated.
// Failure modes: none.
// Side effects: none.

use std::fmt::Write as _;

use crate::ast::*;
use crate::clause::{ClauseKind, GangStatic, TileSize};
use crate::data_attr::{DataAttrInfo, ImplicitKind};
use crate::id::DirId;
use crate::lower::{DirLowering, LoweredUnit, Prelude};
use crate::omp::{OmpClauseKind, OmpDirective, OmpItem, OmpTile};
use crate::partition::PartitionInfo;
use crate::resolve::{ResolvedUnit, Type};

/// Analysis results shown in the dump.
#[derive(Debug, Clone, Copy, Default)]
pub struct DumpInputs<'a> {
    pub partition: Option<&'a PartitionInfo>,
    pub data: Option<&'a DataAttrInfo>,
    pub lowered: Option<&'a LoweredUnit>,
}

pub fn dump_unit(unit: &TranslationUnit, resolved: &ResolvedUnit, inputs: DumpInputs<'_>) -> String {
    let mut d = Dumper {
        resolved,
        inputs,
        out: String::new(),
        depth: 0,
        prefix: None,
    };
    d.node("TranslationUnit");
    d.nested(|d| {
        for item in &unit.items {
            d.item(item);
        }
    });
    d.out
}

struct Dumper<'a> {
    resolved: &'a ResolvedUnit,
    inputs: DumpInputs<'a>,
    out: String,
    depth: usize,
    /// Label prefix for the next node (`impl: `, `effect: `).
    prefix: Option<&'static str>,
}

fn type_name(ty: &Type) -> String {
    format!("'{ty}'")
}

impl<'a> Dumper<'a> {
    fn node(&mut self, label: &str) {
        let prefix = self.prefix.take().unwrap_or("");
        let _ = writeln!(self.out, "{}{prefix}{label}", "  ".repeat(self.depth));
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self)) {
        self.depth += 1;
        f(self);
        self.depth -= 1;
    }

    fn item(&mut self, item: &Item) {
        match item {
            // Not part of the syntax tree proper.
            Item::Preprocessor(..) => {}
            Item::Decl(decl) => self.declaration(decl, "VarDecl"),
            Item::Record(rec) => {
                self.node(&format!("RecordDecl struct {}", rec.name.name));
                self.nested(|d| {
                    for field in &rec.fields {
                        d.declaration(field, "FieldDecl");
                    }
                });
            }
            Item::Function(f) => {
                self.node(&format!("FunctionDecl {}", f.name.name));
                self.nested(|d| {
                    if let Some(routine) = &f.routine {
                        d.standalone(routine);
                    }
                    for p in &f.params {
                        d.declarator(&p.spec, &p.declarator, "ParmVarDecl");
                    }
                    if let Some(body) = &f.body {
                        d.block(body);
                    }
                });
            }
        }
    }

    fn declaration(&mut self, decl: &Declaration, label: &str) {
        for declarator in &decl.declarators {
            self.declarator(&decl.spec, declarator, label);
        }
    }

    fn declarator(&mut self, spec: &TypeSpec, decl: &Declarator, label: &str) {
        let ty = Type::from_decl(spec, decl.pointers, &decl.dims);
        self.node(&format!("{label} {} {}", decl.name.name, type_name(&ty)));
        if let Some(init) = &decl.init {
            self.nested(|d| d.initializer(init));
        }
    }

    fn initializer(&mut self, init: &Initializer) {
        match init {
            Initializer::Expr(e) => self.expr(e),
            Initializer::List(items, _) => {
                self.node("InitListExpr");
                self.nested(|d| {
                    for i in items {
                        d.initializer(i);
                    }
                });
            }
        }
    }

    fn block(&mut self, b: &Block) {
        self.node("CompoundStmt");
        self.nested(|d| {
            for s in &b.stmts {
                d.stmt(s);
            }
        });
    }

    fn opt_expr(&mut self, e: Option<&Expr>) {
        match e {
            Some(e) => self.expr(e),
            None => self.node("<<<NULL>>>"),
        }
    }

    fn stmt(&mut self, s: &Stmt) {
        match &s.kind {
            StmtKind::Block(b) => self.block(b),
            StmtKind::Decl(decl) => {
                self.node("DeclStmt");
                self.nested(|d| d.declaration(decl, "VarDecl"));
            }
            StmtKind::Expr(e) => self.expr(e),
            StmtKind::If { cond, then, els } => {
                self.node("IfStmt");
                self.nested(|d| {
                    d.expr(cond);
                    d.stmt(then);
                    if let Some(els) = els {
                        d.stmt(els);
                    }
                });
            }
            StmtKind::For(f) => {
                self.node("ForStmt");
                self.nested(|d| {
                    match &f.init {
                        Some(ForInit::Decl(decl)) => {
                            d.node("DeclStmt");
                            d.nested(|d| d.declaration(decl, "VarDecl"));
                        }
                        Some(ForInit::Expr(e)) => d.expr(e),
                        None => d.node("<<<NULL>>>"),
                    }
                    d.opt_expr(f.cond.as_ref());
                    d.opt_expr(f.step.as_ref());
                    d.stmt(&f.body);
                });
            }
            StmtKind::While { cond, body } => {
                self.node("WhileStmt");
                self.nested(|d| {
                    d.expr(cond);
                    d.stmt(body);
                });
            }
            StmtKind::Switch { cond, body } => {
                self.node("SwitchStmt");
                self.nested(|d| {
                    d.expr(cond);
                    d.stmt(body);
                });
            }
            StmtKind::Case(v) => {
                self.node("CaseStmt");
                self.nested(|d| d.expr(v));
            }
            StmtKind::Default => self.node("DefaultStmt"),
            StmtKind::Break => self.node("BreakStmt"),
            StmtKind::Continue => self.node("ContinueStmt"),
            StmtKind::Return(e) => {
                self.node("ReturnStmt");
                if let Some(e) = e {
                    self.nested(|d| d.expr(e));
                }
            }
            StmtKind::Empty => self.node("NullStmt"),
            StmtKind::Acc(c) => self.construct(c),
            StmtKind::AccExec(dir) => self.standalone(dir),
        }
    }

    fn expr(&mut self, e: &Expr) {
        match &e.kind {
            ExprKind::Ident(id) => match self.resolved.uses.get(&id.span) {
                Some(&v) => {
                    let ty = type_name(&self.resolved.var(v).ty);
                    self.node(&format!("DeclRefExpr '{}' {ty}", id.name));
                }
                None => self.node(&format!("DeclRefExpr '{}'", id.name)),
            },
            ExprKind::Int(v) => self.node(&format!("IntegerLiteral 'int' {v}")),
            ExprKind::Float(text) => self.node(&format!("FloatingLiteral 'double' {text}")),
            ExprKind::Str(text) => self.node(&format!("StringLiteral \"{text}\"")),
            ExprKind::Char(text) => self.node(&format!("CharacterLiteral '{text}'")),
            ExprKind::Paren(inner) => {
                self.node("ParenExpr");
                self.nested(|d| d.expr(inner));
            }
            ExprKind::Unary(op, x) => {
                self.node(&format!("UnaryOperator prefix '{}'", op.as_str()));
                self.nested(|d| d.expr(x));
            }
            ExprKind::Postfix(op, x) => {
                self.node(&format!("UnaryOperator postfix '{}'", op.as_str()));
                self.nested(|d| d.expr(x));
            }
            ExprKind::Binary(op, l, r) => {
                self.node(&format!("BinaryOperator '{}'", op.as_str()));
                self.nested(|d| {
                    d.expr(l);
                    d.expr(r);
                });
            }
            ExprKind::Assign(op, l, r) => {
                let label = if *op == AssignOp::Assign {
                    "BinaryOperator"
                } else {
                    "CompoundAssignOperator"
                };
                self.node(&format!("{label} '{}'", op.as_str()));
                self.nested(|d| {
                    d.expr(l);
                    d.expr(r);
                });
            }
            ExprKind::Ternary(c, t, f) => {
                self.node("ConditionalOperator");
                self.nested(|d| {
                    d.expr(c);
                    d.expr(t);
                    d.expr(f);
                });
            }
            ExprKind::Call(callee, args) => {
                self.node("CallExpr");
                self.nested(|d| {
                    d.expr(callee);
                    for a in args {
                        d.expr(a);
                    }
                });
            }
            ExprKind::Index(base, idx) => {
                self.node("ArraySubscriptExpr");
                self.nested(|d| {
                    d.expr(base);
                    d.expr(idx);
                });
            }
            ExprKind::Member { base, field, arrow } => {
                let sep = if *arrow { "->" } else { "." };
                self.node(&format!("MemberExpr {sep}{}", field.name));
                self.nested(|d| d.expr(base));
            }
            ExprKind::Section { base, start, len } => {
                self.node("ArraySectionExpr");
                self.nested(|d| {
                    d.expr(base);
                    d.opt_expr(start.as_deref());
                    d.opt_expr(len.as_deref());
                });
            }
        }
    }

    fn var_ref(&mut self, v: crate::id::VarId) {
        let var = self.resolved.var(v);
        self.node(&format!("DeclRefExpr '{}' {}", var.name, type_name(&var.ty)));
    }

    // ── OpenACC ──

    fn construct(&mut self, c: &AccConstruct) {
        let dirs = self.resolved.dirs_for(c.directive.span);
        self.node(&format!("ACC{}Directive", camel(c.directive.kind.as_str())));
        self.nested(|d| {
            for clause in &c.directive.clauses {
                d.acc_clause(&clause.kind);
            }
            match dirs.as_slice() {
                [] => d.stmt(&c.body),
                [only] => d.effective(*only, &c.body, true),
                [outer, inner] => {
                    d.prefix = Some("effect: ");
                    d.node(&format!(
                        "ACC{}Directive",
                        camel(d.resolved.dir(*outer).kind.as_str())
                    ));
                    d.nested(|d| {
                        d.effective(*outer, &c.body, false);
                        d.node(&format!(
                            "ACC{}Directive",
                            camel(d.resolved.dir(*inner).kind.as_str())
                        ));
                        d.nested(|d| d.effective(*inner, &c.body, true));
                    });
                }
                _ => d.stmt(&c.body),
            }
        });
    }

    fn standalone(&mut self, dir: &AccDirective) {
        let lowering = self
            .resolved
            .dir_by_span
            .get(&dir.span)
            .and_then(|&id| self.inputs.lowered?.get(id));
        self.node(&format!("ACC{}Directive", camel(dir.kind.as_str())));
        self.nested(|d| {
            for clause in &dir.clauses {
                d.acc_clause(&clause.kind);
            }
            if let Some(l) = lowering {
                d.lowering(l, None);
            }
        });
    }

    /// Clauses, implicit clauses and translation of one effective
    /// directive. The associated statement goes under the innermost one.
    fn effective(&mut self, dir: DirId, body: &Stmt, innermost: bool) {
        let node = self.resolved.dir(dir);
        let combined = node.is_combined();
        if combined {
            for clause in &node.clauses {
                self.acc_clause(&clause.kind);
            }
        }
        self.implicit_clauses(dir);
        let lowering = self.inputs.lowered.and_then(|l| l.get(dir));
        match (lowering, innermost) {
            (Some(l), true) => self.lowering(l, Some(body)),
            (Some(l), false) => self.lowering(l, None),
            (None, true) => self.stmt(body),
            (None, false) => {}
        }
    }

    fn implicit_clauses(&mut self, dir: DirId) {
        if let Some(info) = self.inputs.partition.and_then(|p| p.get(dir)) {
            if info.implicit_independent {
                self.node("ACCIndependentClause <implicit>");
            }
            for level in info.implicit.iter() {
                self.node(&format!("ACC{}Clause <implicit>", camel(level.as_str())));
            }
        }
        let Some(data) = self.inputs.data else {
            return;
        };
        for clause in data.implicit(dir) {
            let marker = if clause.predetermined {
                "<predetermined>"
            } else {
                "<implicit>"
            };
            let name = match clause.kind {
                ImplicitKind::Reduction(op) => format!("ACCReductionClause '{}'", op.as_str()),
                other => format!("ACC{}Clause", camel(other.as_str())),
            };
            self.node(&format!("{name} {marker}"));
            self.nested(|d| {
                for &v in &clause.vars {
                    d.var_ref(v);
                }
            });
        }
    }

    fn acc_clause(&mut self, kind: &ClauseKind) {
        let name = camel(kind.name().as_str());
        match kind {
            ClauseKind::Reduction(op, vars) => {
                self.node(&format!("ACCReductionClause '{}'", op.as_str()));
                self.nested(|d| vars.iter().for_each(|v| d.expr(v)));
            }
            ClauseKind::Data(_, vars)
            | ClauseKind::Motion(_, vars)
            | ClauseKind::Private(vars)
            | ClauseKind::Firstprivate(vars) => {
                self.node(&format!("ACC{name}Clause"));
                self.nested(|d| vars.iter().for_each(|v| d.expr(v)));
            }
            ClauseKind::If(e)
            | ClauseKind::NumGangs(e)
            | ClauseKind::NumWorkers(e)
            | ClauseKind::VectorLength(e)
            | ClauseKind::Collapse(e) => {
                self.node(&format!("ACC{name}Clause"));
                self.nested(|d| d.expr(e));
            }
            ClauseKind::Gang(Some(arg)) => {
                self.node("ACCGangClause static");
                self.nested(|d| match arg {
                    GangStatic::Expr(e) => d.expr(e),
                    GangStatic::Star(_) => d.node("<star>"),
                });
            }
            ClauseKind::Tile(sizes) => {
                self.node("ACCTileClause");
                self.nested(|d| {
                    for s in sizes {
                        match s {
                            TileSize::Expr(e) => d.expr(e),
                            TileSize::Star(_) => d.node("<star>"),
                        }
                    }
                });
            }
            _ => self.node(&format!("ACC{name}Clause")),
        }
    }

    // ── OpenMP ──

    fn lowering(&mut self, l: &DirLowering, body: Option<&Stmt>) {
        self.prefix = Some("impl: ");
        if !l.prelude.is_empty() {
            self.node("CompoundStmt");
            self.nested(|d| {
                for p in &l.prelude {
                    d.prelude(p);
                }
                d.translated(l, body);
            });
        } else {
            self.translated(l, body);
        }
    }

    fn translated(&mut self, l: &DirLowering, body: Option<&Stmt>) {
        match (&l.omp, &l.tile) {
            (Some(dir), tile) => {
                self.omp_directive(dir);
                self.nested(|d| match tile {
                    Some(t) => d.tile(t, body),
                    None => {
                        if let Some(b) = body {
                            d.stmt(b);
                        }
                    }
                });
            }
            (None, Some(t)) => self.tile(t, body),
            (None, None) => match body {
                Some(b) => self.stmt(b),
                None => {
                    self.prefix = None;
                }
            },
        }
    }

    fn prelude(&mut self, p: &Prelude) {
        match p {
            Prelude::Decl(v) => {
                let var = self.resolved.var(*v);
                let label = format!("VarDecl {} {}", var.name, type_name(&var.ty));
                self.node("DeclStmt");
                self.nested(|d| d.node(&label));
            }
            Prelude::Discard(e) => {
                self.node("CStyleCastExpr 'void'");
                self.nested(|d| {
                    d.node("ParenExpr");
                    d.nested(|d| d.expr(e));
                });
            }
        }
    }

    fn tile(&mut self, t: &OmpTile, body: Option<&Stmt>) {
        self.node("OMPTileDirective");
        self.nested(|d| {
            d.node("OMPSizesClause");
            d.nested(|d| {
                for s in &t.sizes {
                    match s {
                        Some(e) => d.expr(e),
                        None => d.node("IntegerLiteral 'int' 1"),
                    }
                }
            });
            if let Some(b) = body {
                d.stmt(b);
            }
        });
    }

    fn omp_directive(&mut self, dir: &OmpDirective) {
        self.node(dir.kind.dump_name());
        self.nested(|d| {
            for c in &dir.clauses {
                let mut label = c.kind.dump_name();
                match &c.kind {
                    OmpClauseKind::Map(ty, _) => {
                        let _ = write!(label, " '{}'", ty.as_str());
                    }
                    OmpClauseKind::Reduction(op, _) => {
                        let _ = write!(label, " '{}'", op.as_str());
                    }
                    _ => {}
                }
                if c.implicit {
                    label.push_str(" <implicit>");
                }
                d.node(&label);
                d.nested(|d| d.omp_clause_children(&c.kind));
            }
        });
    }

    fn omp_clause_children(&mut self, kind: &OmpClauseKind) {
        match kind {
            OmpClauseKind::NumTeams(e) | OmpClauseKind::ThreadLimit(e) | OmpClauseKind::If(e) => {
                self.expr(e)
            }
            OmpClauseKind::DistSchedule(Some(e)) => self.expr(e),
            OmpClauseKind::NumThreads(n) | OmpClauseKind::Simdlen(n) | OmpClauseKind::Collapse(n) => {
                self.node(&format!("IntegerLiteral 'int' {n}"))
            }
            _ => {
                for item in kind.items() {
                    match item {
                        OmpItem::Expr(e) => self.expr(e),
                        OmpItem::Var(v) => self.var_ref(*v),
                        OmpItem::ZeroSection(v) => {
                            self.node("ArraySectionExpr");
                            self.nested(|d| {
                                d.var_ref(*v);
                                d.node("IntegerLiteral 'int' 0");
                                d.node("IntegerLiteral 'int' 0");
                            });
                        }
                    }
                }
            }
        }
    }
}

/// `parallel loop` → `ParallelLoop`, `no_create` → `NoCreate`.
fn camel(name: &str) -> String {
    name.split([' ', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
