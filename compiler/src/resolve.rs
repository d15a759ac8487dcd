// resolve.rs: Name resolution and directive tree construction
//
// Walks the parsed AST with a scoped symbol table, assigns a `VarId` to every
// declaration and a `DirId` to every effective OpenACC directive, and records
// which variables each directive's construct references.
//
// Preconditions: `unit` is a well-formed AST from the parser.
// Postconditions: every identifier use that names a variable is in `uses`;
//                 every directive span is in `dir_by_span`.
// Failure modes: undeclared identifiers produce `Diagnostic` entries.
//                Resolution continues past errors.
// Side effects: none.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::ast::*;
use crate::clause::{split_target, Clause, DirectiveKind, EffectiveKind, RoutineLevel};
use crate::diag::{codes, Diagnostic};
use crate::id::{DirId, IdAllocator, VarId};
use crate::visit::{self, Visitor};

// ── Public types ────────────────────────────────────────────────────────────

/// Result of name resolution.
#[derive(Debug)]
pub struct ResolveResult {
    pub resolved: ResolvedUnit,
    pub diagnostics: Vec<Diagnostic>,
}

/// C type of a declared variable, as far as the analyses need it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Void,
    Char,
    Short,
    Int,
    Long,
    LongLong,
    Float,
    Double,
    Struct(String),
    Pointer(Box<Type>),
    Array(Box<Type>, Option<u64>),
}

impl Type {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Type::Char | Type::Short | Type::Int | Type::Long | Type::LongLong
        )
    }

    pub fn is_real(&self) -> bool {
        matches!(self, Type::Float | Type::Double)
    }

    pub fn is_arithmetic(&self) -> bool {
        self.is_integer() || self.is_real()
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    /// Arithmetic and pointer types. Structs and arrays are aggregates.
    pub fn is_scalar(&self) -> bool {
        self.is_arithmetic() || self.is_pointer()
    }

    pub fn from_decl(spec: &TypeSpec, pointers: u32, dims: &[Option<Expr>]) -> Type {
        let mut ty = match &spec.base {
            BaseType::Void => Type::Void,
            BaseType::Char => Type::Char,
            BaseType::Short => Type::Short,
            BaseType::Int => Type::Int,
            BaseType::Long => Type::Long,
            BaseType::LongLong => Type::LongLong,
            BaseType::Float => Type::Float,
            BaseType::Double => Type::Double,
            BaseType::Struct(name) => Type::Struct(name.clone()),
        };
        for _ in 0..pointers {
            ty = Type::Pointer(Box::new(ty));
        }
        for dim in dims.iter().rev() {
            let len = dim
                .as_ref()
                .and_then(Expr::const_int)
                .and_then(|v| u64::try_from(v).ok());
            ty = Type::Array(Box::new(ty), len);
        }
        ty
    }
}

impl fmt::Display for Type {
    /// C spelling as used in dumps: `int`, `int *`, `int[10]`, `struct S`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Char => write!(f, "char"),
            Type::Short => write!(f, "short"),
            Type::Int => write!(f, "int"),
            Type::Long => write!(f, "long"),
            Type::LongLong => write!(f, "long long"),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::Struct(name) => write!(f, "struct {name}"),
            Type::Pointer(inner) if inner.is_pointer() => write!(f, "{inner}*"),
            Type::Pointer(inner) => write!(f, "{inner} *"),
            Type::Array(inner, len) => {
                let mut base: &Type = inner;
                let mut dims = vec![*len];
                while let Type::Array(i, l) = base {
                    dims.push(*l);
                    base = i;
                }
                write!(f, "{base}")?;
                for d in dims {
                    match d {
                        Some(n) => write!(f, "[{n}]")?,
                        None => write!(f, "[]")?,
                    }
                }
                Ok(())
            }
        }
    }
}

/// Storage classification of a root variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// File scope, including file-scope `static`.
    Global,
    StaticLocal,
    /// Block-scope `extern` declaration.
    ExternLocal,
    Parameter,
    /// Automatic block-scope variable.
    BlockLocal,
}

impl Storage {
    /// Whether every gang gets its own copy when the variable is declared
    /// inside (or passed to) the code a gang executes.
    pub fn is_automatic(self) -> bool {
        matches!(self, Storage::Parameter | Storage::BlockLocal)
    }
}

#[derive(Debug, Clone)]
pub struct VarInfo {
    pub id: VarId,
    pub name: String,
    pub ty: Type,
    pub storage: Storage,
    pub is_const: bool,
    /// Span of the declarator name.
    pub decl_span: Span,
    /// Innermost effective directive whose construct contains the declaration.
    pub dir: Option<DirId>,
}

/// One reference to a variable inside a construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarRef {
    pub var: VarId,
    pub span: Span,
    /// Reached through `.` or `->`, so only the root can be attributed.
    pub via_member: bool,
}

/// An effective OpenACC directive.
#[derive(Debug, Clone)]
pub struct DirNode {
    pub id: DirId,
    pub kind: EffectiveKind,
    /// The directive as written. Both halves of a combined directive report
    /// `ParallelLoop`.
    pub written: DirectiveKind,
    pub parent: Option<DirId>,
    /// The other half of a combined directive.
    pub partner: Option<DirId>,
    pub span: Span,
    pub stmt_span: Span,
    /// Clauses that belong to this effective directive, in source order.
    pub clauses: Vec<Clause>,
    /// Variable references within the construct, in source order: its
    /// associated statement and the clauses of nested directives.
    pub refs: Vec<VarRef>,
    /// `routine` directive in effect for the enclosing function.
    pub routine: Option<DirId>,
}

impl DirNode {
    /// Name for diagnostics: `'#pragma acc parallel loop'` for either half
    /// of a combined directive.
    pub fn display_name(&self) -> String {
        format!("{}", self.written)
    }

    pub fn is_combined(&self) -> bool {
        self.partner.is_some()
    }

    /// Level named by a `routine` directive.
    pub fn routine_level(&self) -> Option<RoutineLevel> {
        RoutineLevel::of(&self.clauses)
    }
}

/// Resolution tables produced by name resolution.
/// Downstream passes use these alongside the original AST.
#[derive(Debug, Default)]
pub struct ResolvedUnit {
    pub vars: Vec<VarInfo>,
    pub dirs: Vec<DirNode>,
    /// Identifier span → variable.
    pub uses: HashMap<Span, VarId>,
    /// Directive span → outermost effective directive.
    pub dir_by_span: HashMap<Span, DirId>,
    /// Object-like macro names from `#define` lines.
    pub macros: HashSet<String>,
}

impl ResolvedUnit {
    pub fn var(&self, id: VarId) -> &VarInfo {
        &self.vars[id.index()]
    }

    pub fn dir(&self, id: DirId) -> &DirNode {
        &self.dirs[id.index()]
    }

    /// Effective directives for a written directive, outermost first.
    pub fn dirs_for(&self, span: Span) -> Vec<DirId> {
        let Some(&outer) = self.dir_by_span.get(&span) else {
            return Vec::new();
        };
        let mut out = vec![outer];
        if let Some(inner) = self.dir(outer).partner {
            out.push(inner);
        }
        out
    }

    /// Effective loop directive for a written directive, if it has one.
    pub fn loop_for(&self, span: Span) -> Option<DirId> {
        self.dirs_for(span)
            .into_iter()
            .find(|&d| self.dir(d).kind == EffectiveKind::Loop)
    }

    /// Strictly enclosing directives, innermost first.
    pub fn ancestors(&self, id: DirId) -> impl Iterator<Item = DirId> + '_ {
        std::iter::successors(self.dir(id).parent, move |&d| self.dir(d).parent)
    }

    /// Nearest enclosing `parallel` (the directive itself included).
    pub fn compute_construct(&self, id: DirId) -> Option<DirId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&d| self.dir(d).kind == EffectiveKind::Parallel)
    }

    /// Whether `var` is declared inside the construct of `dir`.
    pub fn declared_within(&self, var: VarId, dir: DirId) -> bool {
        let Some(decl_dir) = self.var(var).dir else {
            return false;
        };
        decl_dir == dir || self.ancestors(decl_dir).any(|d| d == dir)
    }

    /// Root variable of a clause variable reference.
    pub fn root_var(&self, expr: &Expr) -> Option<VarId> {
        root_ident(expr).and_then(|id| self.uses.get(&id.span).copied())
    }
}

/// The outermost named storage of a reference: `a` in `a`, `a[i]`,
/// `a[1:n]`, `a.b`, `p->b`.
pub fn root_ident(expr: &Expr) -> Option<&Ident> {
    match &expr.kind {
        ExprKind::Ident(id) => Some(id),
        ExprKind::Paren(e) => root_ident(e),
        ExprKind::Index(base, _)
        | ExprKind::Member { base, .. }
        | ExprKind::Section { base, .. } => root_ident(base),
        _ => None,
    }
}

// ── Entry point ─────────────────────────────────────────────────────────────

pub fn resolve(unit: &TranslationUnit) -> ResolveResult {
    let mut ctx = ResolveCtx::new();
    ctx.collect_macros(unit);
    visit::walk_unit(&mut ctx, unit);
    log::debug!(
        "resolve: {} variables, {} effective directives, {} diagnostics",
        ctx.resolved.vars.len(),
        ctx.resolved.dirs.len(),
        ctx.diagnostics.len()
    );
    ResolveResult {
        resolved: ctx.resolved,
        diagnostics: ctx.diagnostics,
    }
}

// ── Resolution context ──────────────────────────────────────────────────────

struct ResolveCtx {
    resolved: ResolvedUnit,
    diagnostics: Vec<Diagnostic>,
    ids: IdAllocator,
    /// Innermost scope last.
    scopes: Vec<HashMap<String, VarId>>,
    functions: HashSet<String>,
    /// Enclosing effective directives, innermost last.
    dir_stack: Vec<DirId>,
    /// Function name → latest `routine` directive naming it.
    routines: HashMap<String, DirId>,
    current_routine: Option<DirId>,
    in_function: bool,
    in_param_list: bool,
    member_depth: u32,
}

impl ResolveCtx {
    fn new() -> Self {
        ResolveCtx {
            resolved: ResolvedUnit::default(),
            diagnostics: Vec::new(),
            ids: IdAllocator::new(),
            scopes: vec![HashMap::new()],
            functions: HashSet::new(),
            dir_stack: Vec::new(),
            routines: HashMap::new(),
            current_routine: None,
            in_function: false,
            in_param_list: false,
            member_depth: 0,
        }
    }

    fn collect_macros(&mut self, unit: &TranslationUnit) {
        for name in ["NULL", "true", "false"] {
            self.resolved.macros.insert(name.to_string());
        }
        for item in &unit.items {
            if let Item::Preprocessor(text, _) = item {
                let rest = text.trim_start_matches('#').trim_start();
                if let Some(def) = rest.strip_prefix("define") {
                    let name: String = def
                        .trim_start()
                        .chars()
                        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                        .collect();
                    if !name.is_empty() {
                        self.resolved.macros.insert(name);
                    }
                }
            }
        }
    }

    fn declare(&mut self, spec: &TypeSpec, decl: &Declarator) {
        let storage = if self.in_param_list {
            Storage::Parameter
        } else if !self.in_function {
            Storage::Global
        } else {
            match spec.storage {
                Some(StorageClass::Static) => Storage::StaticLocal,
                Some(StorageClass::Extern) => Storage::ExternLocal,
                None => Storage::BlockLocal,
            }
        };
        let id = self.ids.alloc_var();
        self.resolved.vars.push(VarInfo {
            id,
            name: decl.name.name.clone(),
            ty: Type::from_decl(spec, decl.pointers, &decl.dims),
            storage,
            is_const: spec.is_const,
            decl_span: decl.name.span,
            dir: self.dir_stack.last().copied(),
        });
        self.resolved.uses.insert(decl.name.span, id);
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(decl.name.name.clone(), id);
        }
    }

    fn lookup(&self, name: &str) -> Option<VarId> {
        self.scopes.iter().rev().find_map(|s| s.get(name).copied())
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn record_ref(&mut self, var: VarId, span: Span) {
        let r = VarRef {
            var,
            span,
            via_member: self.member_depth > 0,
        };
        for &d in &self.dir_stack {
            self.resolved.dirs[d.index()].refs.push(r);
        }
    }

    fn new_dir(
        &mut self,
        kind: EffectiveKind,
        directive: &AccDirective,
        stmt_span: Span,
        clauses: Vec<Clause>,
    ) -> DirId {
        let id = self.ids.alloc_dir();
        self.resolved.dirs.push(DirNode {
            id,
            kind,
            written: directive.kind,
            parent: self.dir_stack.last().copied(),
            partner: None,
            span: directive.span,
            stmt_span,
            clauses,
            refs: Vec::new(),
            routine: self.current_routine,
        });
        id
    }
}

impl<'ast> Visitor<'ast> for ResolveCtx {
    fn visit_item(&mut self, item: &'ast Item) {
        // Struct fields live in their own namespace.
        if !matches!(item, Item::Record(_)) {
            visit::walk_item(self, item);
        }
    }

    fn visit_function(&mut self, func: &'ast FunctionDef) {
        self.functions.insert(func.name.name.clone());
        if let Some(routine) = &func.routine {
            let id = self.new_dir(EffectiveKind::Routine, routine, func.span, routine.clauses.clone());
            self.resolved.dir_by_span.insert(routine.span, id);
            self.routines.insert(func.name.name.clone(), id);
        }
        let Some(body) = &func.body else {
            return;
        };
        self.current_routine = self.routines.get(&func.name.name).copied();
        self.push_scope();
        self.in_param_list = true;
        for p in &func.params {
            self.visit_declarator(&p.spec, &p.declarator);
        }
        self.in_param_list = false;
        self.in_function = true;
        self.visit_block(body);
        self.in_function = false;
        self.current_routine = None;
        self.pop_scope();
    }

    fn visit_standalone(&mut self, directive: &'ast AccDirective) {
        // A `routine` inside a function body is only diagnosed.
        if directive.kind == DirectiveKind::Routine {
            return;
        }
        let kind = directive.kind.effective()[0];
        let id = self.new_dir(kind, directive, directive.span, directive.clauses.clone());
        self.resolved.dir_by_span.insert(directive.span, id);
        visit::walk_standalone(self, directive);
    }

    fn visit_declarator(&mut self, spec: &'ast TypeSpec, decl: &'ast Declarator) {
        // Dimensions and initializer see the enclosing declarations; C puts
        // the name in scope before its initializer but no test relies on it.
        visit::walk_declarator(self, decl);
        self.declare(spec, decl);
    }

    fn visit_block(&mut self, block: &'ast Block) {
        self.push_scope();
        visit::walk_block(self, block);
        self.pop_scope();
    }

    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        if let StmtKind::For(_) = &stmt.kind {
            self.push_scope();
            visit::walk_stmt(self, stmt);
            self.pop_scope();
        } else {
            visit::walk_stmt(self, stmt);
        }
    }

    fn visit_acc(&mut self, construct: &'ast AccConstruct) {
        let written = construct.directive.kind;
        let parts = written.effective();
        let mut per_part: Vec<Vec<Clause>> = vec![Vec::new(); parts.len()];
        for c in &construct.directive.clauses {
            // Invalid clauses stay on the outermost part; check reports them.
            let idx = split_target(written, c.name())
                .and_then(|t| parts.iter().position(|&p| p == t))
                .unwrap_or(0);
            per_part[idx].push(c.clone());
        }

        let depth = self.dir_stack.len();
        let mut ids = Vec::new();
        for (&kind, clauses) in parts.iter().zip(per_part) {
            let id = self.new_dir(kind, &construct.directive, construct.body.span, clauses);
            if ids.is_empty() {
                self.resolved.dir_by_span.insert(construct.directive.span, id);
            }
            // Resolve this part's clauses before it joins the stack, so its
            // own clause references are not implicit references.
            for c in construct
                .directive
                .clauses
                .iter()
                .filter(|c| {
                    split_target(written, c.name())
                        .and_then(|t| parts.iter().position(|&p| p == t))
                        .unwrap_or(0)
                        == ids.len()
                })
            {
                self.visit_clause(c);
            }
            ids.push(id);
            self.dir_stack.push(id);
        }
        if let [outer, inner] = ids[..] {
            self.resolved.dirs[outer.index()].partner = Some(inner);
            self.resolved.dirs[inner.index()].partner = Some(outer);
        }

        self.visit_stmt(&construct.body);
        self.dir_stack.truncate(depth);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        match &expr.kind {
            ExprKind::Call(callee, args) => {
                // Function names are not variables; undeclared functions are
                // implicitly declared.
                if !matches!(callee.ignore_parens().kind, ExprKind::Ident(_)) {
                    self.visit_expr(callee);
                }
                for a in args {
                    self.visit_expr(a);
                }
            }
            ExprKind::Member { base, .. } => {
                self.member_depth += 1;
                self.visit_expr(base);
                self.member_depth -= 1;
            }
            ExprKind::Index(base, index) | ExprKind::Section { base, start: Some(index), .. }
                if self.member_depth > 0 =>
            {
                // `s[i].x`: the index is an ordinary reference.
                self.visit_expr(base);
                let saved = std::mem::take(&mut self.member_depth);
                self.visit_expr(index);
                if let ExprKind::Section { len: Some(len), .. } = &expr.kind {
                    self.visit_expr(len);
                }
                self.member_depth = saved;
            }
            _ => visit::walk_expr(self, expr),
        }
    }

    fn visit_ident(&mut self, ident: &'ast Ident) {
        match self.lookup(&ident.name) {
            Some(var) => {
                self.resolved.uses.insert(ident.span, var);
                self.record_ref(var, ident.span);
            }
            None => {
                if self.resolved.macros.contains(&ident.name)
                    || self.functions.contains(&ident.name)
                {
                    return;
                }
                self.diagnostics.push(
                    Diagnostic::error(
                        ident.span,
                        format!("use of undeclared identifier '{}'", ident.name),
                    )
                    .with_code(codes::E0101),
                );
            }
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_source(source: &str) -> ResolveResult {
        let parsed = crate::parser::parse(source);
        assert!(parsed.errors.is_empty(), "parse errors: {:?}", parsed.errors);
        resolve(&parsed.unit.expect("parse failed"))
    }

    fn resolve_ok(source: &str) -> ResolvedUnit {
        let result = resolve_source(source);
        assert!(
            result.diagnostics.is_empty(),
            "unexpected diagnostics: {:?}",
            result.diagnostics
        );
        result.resolved
    }

    fn var_named<'a>(r: &'a ResolvedUnit, name: &str) -> &'a VarInfo {
        r.vars.iter().find(|v| v.name == name).expect("no such var")
    }

    #[test]
    fn storage_classification() {
        let r = resolve_ok(
            "int g;\nstatic int fs;\nvoid f(int p) {\n  int l;\n  static int s;\n  extern int e;\n}\n",
        );
        assert_eq!(var_named(&r, "g").storage, Storage::Global);
        assert_eq!(var_named(&r, "fs").storage, Storage::Global);
        assert_eq!(var_named(&r, "p").storage, Storage::Parameter);
        assert_eq!(var_named(&r, "l").storage, Storage::BlockLocal);
        assert_eq!(var_named(&r, "s").storage, Storage::StaticLocal);
        assert_eq!(var_named(&r, "e").storage, Storage::ExternLocal);
    }

    #[test]
    fn types_from_declarators() {
        let r = resolve_ok("struct S { int i; };\nint *p; int a[2][3]; struct S s; double d;");
        assert_eq!(var_named(&r, "p").ty.to_string(), "int *");
        assert_eq!(var_named(&r, "a").ty.to_string(), "int[2][3]");
        assert_eq!(var_named(&r, "s").ty, Type::Struct("S".into()));
        assert!(var_named(&r, "d").ty.is_real());
        assert!(!var_named(&r, "a").ty.is_scalar());
        assert!(var_named(&r, "p").ty.is_scalar());
    }

    #[test]
    fn undeclared_identifier() {
        let result = resolve_source("void f() {\n  x = 1;\n}\n");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(
            result.diagnostics[0].message,
            "use of undeclared identifier 'x'"
        );
    }

    #[test]
    fn calls_and_macros_are_not_undeclared() {
        resolve_ok("#define N 10\nvoid f() {\n  int a[N];\n  printf(\"%d\", a[0]);\n}\n");
    }

    #[test]
    fn shadowing_resolves_to_innermost() {
        let r = resolve_ok("void f() {\n  int x;\n  {\n    int x;\n    x = 1;\n  }\n  x = 2;\n}\n");
        let mut uses: Vec<_> = r.uses.iter().collect();
        uses.sort_by_key(|(s, _)| s.start);
        let n = uses.len();
        assert_eq!(*uses[n - 2].1, VarId(1));
        assert_eq!(*uses[n - 1].1, VarId(0));
    }

    #[test]
    fn combined_directive_splits_clauses() {
        let r = resolve_ok(
            "void f() {\n  int a, b;\n#pragma acc parallel loop num_gangs(2) gang copy(a) private(b)\n  for (int i = 0; i < 2; ++i) a = b;\n}\n",
        );
        assert_eq!(r.dirs.len(), 2);
        let par = &r.dirs[0];
        let lp = &r.dirs[1];
        assert_eq!(par.kind, EffectiveKind::Parallel);
        assert_eq!(lp.kind, EffectiveKind::Loop);
        assert_eq!(par.partner, Some(lp.id));
        assert_eq!(lp.parent, Some(par.id));
        let par_names: Vec<_> = par.clauses.iter().map(|c| c.name().as_str()).collect();
        let loop_names: Vec<_> = lp.clauses.iter().map(|c| c.name().as_str()).collect();
        assert_eq!(par_names, vec!["num_gangs", "copy"]);
        assert_eq!(loop_names, vec!["gang", "private"]);
        // The loop's private(b) is a reference inside the parallel.
        assert!(par.refs.iter().any(|r| r.var == VarId(1)));
        assert!(!lp.refs.iter().any(|r| r.span.start < lp.stmt_span.start));
    }

    #[test]
    fn refs_mark_member_access() {
        let r = resolve_ok(
            "struct S { int i; };\nvoid f() {\n  struct S s;\n  int k;\n#pragma acc parallel\n  s.i = k;\n}\n",
        );
        let refs = &r.dirs[0].refs;
        assert_eq!(refs.len(), 2);
        assert!(refs[0].via_member);
        assert!(!refs[1].via_member);
    }

    #[test]
    fn declarations_record_enclosing_directive() {
        let r = resolve_ok(
            "void f() {\n  int outer;\n#pragma acc parallel\n  {\n    int inner;\n    inner = outer;\n  }\n}\n",
        );
        let inner = var_named(&r, "inner").id;
        let outer = var_named(&r, "outer").id;
        assert!(r.declared_within(inner, DirId(0)));
        assert!(!r.declared_within(outer, DirId(0)));
    }

    #[test]
    fn root_of_clause_references() {
        let r = resolve_ok(
            "struct S { int *p; };\nvoid f() {\n  struct S s;\n  int a[4];\n#pragma acc data copy(s.p, a[1:2])\n  ;\n}\n",
        );
        let data = &r.dirs[0];
        let vars = data.clauses[0].kind.vars();
        assert_eq!(r.var(r.root_var(&vars[0]).unwrap()).name, "s");
        assert_eq!(r.var(r.root_var(&vars[1]).unwrap()).name, "a");
    }

    #[test]
    fn routine_applies_to_later_definition() {
        let r = resolve_ok(
            "#pragma acc routine vector\nvoid g(int n);\nvoid g(int n) {\n#pragma acc loop\n  for (int i = 0; i < n; ++i) ;\n}\n",
        );
        assert_eq!(r.dirs.len(), 2);
        let routine = &r.dirs[0];
        assert_eq!(routine.kind, EffectiveKind::Routine);
        assert_eq!(routine.routine_level(), Some(RoutineLevel::Level(crate::clause::Level::Vector)));
        let lp = &r.dirs[1];
        assert_eq!(lp.routine, Some(routine.id));
        assert_eq!(lp.parent, None);
    }

    #[test]
    fn executable_directive_refs_belong_to_enclosing_region() {
        let r = resolve_ok(
            "void f(int *a, int n) {\n#pragma acc data copy(a[0:n])\n  {\n#pragma acc update self(a[0:n])\n    n = 0;\n  }\n}\n",
        );
        let data = &r.dirs[0];
        let update = &r.dirs[1];
        assert_eq!(update.kind, EffectiveKind::Update);
        assert_eq!(update.parent, Some(data.id));
        assert!(update.refs.is_empty());
        assert_eq!(data.refs.len(), 3);
        assert_eq!(update.routine, None);
    }
}
