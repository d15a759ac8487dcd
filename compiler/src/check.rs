// check.rs: Directive and clause legality checks
//
// Validates each OpenACC directive as written: clause validity per
// directive, exclusive and repeated clauses, constant arguments, clause
// variable shapes, conflicting data attributes on one directive, and
// directive nesting. Also reports `break` statements with no enclosing loop
// or switch, misplaced executable directives, and what a function attributed
// with `#pragma acc routine` may not contain.
//
// Preconditions: `resolved` was produced from `unit` by `resolve`.
// Postconditions: none (diagnostics only).
// Failure modes: every violation becomes a `Diagnostic`; checking continues
//                with the next clause or variable.
// Side effects: none.

use std::collections::HashMap;

use crate::ast::*;
use crate::clause::{
    ref_shape, Clause, ClauseKind, ClauseName, DataClause, DirectiveKind, RoutineLevel, TileSize,
};
use crate::diag::{codes, Diagnostic};
use crate::id::VarId;
use crate::resolve::ResolvedUnit;
use crate::visit::{self, Visitor};

pub fn check(unit: &TranslationUnit, resolved: &ResolvedUnit) -> Vec<Diagnostic> {
    let mut ctx = CheckCtx {
        resolved,
        diagnostics: Vec::new(),
        dir_stack: Vec::new(),
        breakable: 0,
        function: None,
        routines: HashMap::new(),
    };
    visit::walk_unit(&mut ctx, unit);
    log::debug!("check: {} diagnostics", ctx.diagnostics.len());
    ctx.diagnostics
}

struct CheckCtx<'r> {
    resolved: &'r ResolvedUnit,
    diagnostics: Vec<Diagnostic>,
    /// Enclosing written directives, innermost last.
    dir_stack: Vec<DirectiveKind>,
    /// Enclosing loops and switches in the current function.
    breakable: u32,
    /// Function whose body is being checked.
    function: Option<FnCtx>,
    /// Function name → first `routine` directive seen for it.
    routines: HashMap<String, (Option<RoutineLevel>, Span)>,
}

struct FnCtx {
    name: String,
    /// Span of the `routine` directive in effect.
    routine: Option<Span>,
}

/// Data attribute kinds tracked for per-directive conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrKind {
    Dma(DataClause),
    Private,
    Firstprivate,
    Reduction,
}

impl AttrKind {
    fn as_str(self) -> &'static str {
        match self {
            AttrKind::Dma(d) => d.as_str(),
            AttrKind::Private => "private",
            AttrKind::Firstprivate => "firstprivate",
            AttrKind::Reduction => "reduction",
        }
    }

    fn of(clause: &ClauseKind) -> Option<AttrKind> {
        match clause {
            ClauseKind::Data(d, _) => Some(AttrKind::Dma(*d)),
            ClauseKind::Private(_) => Some(AttrKind::Private),
            ClauseKind::Firstprivate(_) => Some(AttrKind::Firstprivate),
            ClauseKind::Reduction(..) => Some(AttrKind::Reduction),
            _ => None,
        }
    }

    /// Whether two attributes on one directive conflict. Reduction
    /// duplicates are left to the reduction pass.
    fn conflicts(self, other: AttrKind) -> bool {
        use AttrKind::*;
        match (self, other) {
            (Reduction, Reduction) => false,
            (Dma(_), Reduction) | (Reduction, Dma(_)) => false,
            _ => true,
        }
    }
}

impl CheckCtx<'_> {
    fn error(&mut self, span: Span, code: crate::diag::DiagCode, msg: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::error(span, msg).with_code(code));
    }

    fn check_clause_validity(&mut self, directive: &AccDirective) {
        let kind = directive.kind;
        let mut seen: Vec<(ClauseName, Span)> = Vec::new();
        for c in &directive.clauses {
            let name = c.name();
            if !name.allowed_on_directive(kind) {
                self.error(
                    c.span,
                    codes::E0102,
                    format!(
                        "unexpected OpenACC clause '{}' in directive {}",
                        name, kind
                    ),
                );
                continue;
            }
            if matches!(name, ClauseName::Collapse | ClauseName::Tile | ClauseName::If)
                && seen.iter().any(|(n, _)| *n == name)
            {
                self.error(
                    c.span,
                    codes::E0104,
                    format!(
                        "directive {} cannot contain more than one '{}' clause",
                        kind, name
                    ),
                );
                continue;
            }
            let earlier = seen.iter().find(|(n, _)| {
                (*n == name && name.is_unique()) || name.exclusive_with(kind).contains(n)
            });
            if let Some((prev, _)) = earlier {
                self.error(
                    c.span,
                    codes::E0103,
                    format!(
                        "unexpected OpenACC clause '{}', '{}' is specified already",
                        name, prev
                    ),
                );
                continue;
            }
            seen.push((name, c.span));
        }

        let has = |pred: fn(&ClauseKind) -> bool| {
            directive
                .clauses
                .iter()
                .any(|c| pred(&c.kind) && c.name().allowed_on_directive(kind))
        };
        match kind {
            DirectiveKind::Data | DirectiveKind::EnterData | DirectiveKind::ExitData
                if !has(|c| matches!(c, ClauseKind::Data(..))) =>
            {
                self.error(
                    directive.span,
                    codes::E0105,
                    format!("expected at least one data clause for {kind}"),
                );
            }
            DirectiveKind::Update if !has(|c| matches!(c, ClauseKind::Motion(..))) => {
                self.error(
                    directive.span,
                    codes::E0111,
                    "expected at least one 'self', 'host', or 'device' clause for '#pragma acc update'",
                );
            }
            DirectiveKind::Routine if RoutineLevel::of(&directive.clauses).is_none() => {
                self.error(
                    directive.span,
                    codes::E0111,
                    "expected 'gang', 'worker', 'vector', or 'seq' clause for '#pragma acc routine'",
                );
            }
            _ => {}
        }
    }

    fn check_positive(&mut self, clause: &Clause) {
        let name = clause.name();
        let positive_msg =
            format!("argument to '{name}' clause must be a strictly positive integer value");
        match &clause.kind {
            ClauseKind::Collapse(e) => match e.const_int() {
                None => self.error(
                    e.span,
                    codes::E0107,
                    "argument to 'collapse' clause must be an integer constant expression",
                ),
                Some(v) if v <= 0 => self.error(e.span, codes::E0106, positive_msg),
                Some(_) => {}
            },
            ClauseKind::NumGangs(e) | ClauseKind::NumWorkers(e) | ClauseKind::VectorLength(e) => {
                if matches!(e.const_int(), Some(v) if v <= 0) {
                    self.error(e.span, codes::E0106, positive_msg);
                }
            }
            ClauseKind::Tile(sizes) => {
                for s in sizes {
                    if let TileSize::Expr(e) = s {
                        if matches!(e.const_int(), Some(v) if v <= 0) {
                            self.error(e.span, codes::E0106, positive_msg.clone());
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn check_var_shapes(&mut self, kind: DirectiveKind, clause: &Clause) {
        let dsa = clause.kind.is_dsa();
        let prefix = format!("in '{}' clause on {}", clause.name(), kind);
        for var in clause.kind.vars() {
            let shape = ref_shape(var);
            if shape.members > 1 {
                self.error(
                    var.span,
                    codes::E0110,
                    format!("{prefix}, nested member expression is not supported"),
                );
                continue;
            }
            // Data clauses accept a member or a subarray, not both.
            if let (true, Some(span)) = (shape.rejects_subarray(dsa), shape.subarray) {
                self.error(
                    span,
                    codes::E0109,
                    format!("{prefix}, subarray is not supported"),
                );
            }
            if let (true, Some(span)) = (shape.rejects_member(dsa), shape.first_member) {
                self.error(
                    span,
                    codes::E0108,
                    format!("{prefix}, member expression is not supported"),
                );
            }
        }
    }

    /// Conflicting data attributes for one root variable on one directive.
    fn check_attr_conflicts(&mut self, directive: &AccDirective) {
        let mut first: HashMap<VarId, (AttrKind, Span)> = HashMap::new();
        for c in &directive.clauses {
            let Some(kind) = AttrKind::of(&c.kind) else {
                continue;
            };
            if !c.name().allowed_on_directive(directive.kind) {
                continue;
            }
            for var in c.kind.supported_vars() {
                let Some(id) = self.resolved.root_var(var) else {
                    continue;
                };
                self.check_const(kind, id, var.span);
                match first.get(&id) {
                    None => {
                        first.insert(id, (kind, var.span));
                    }
                    Some(&(prev, prev_span)) if prev.conflicts(kind) => {
                        let (code, msg) = if prev == kind {
                            (
                                codes::E0502,
                                format!(
                                    "{} variable defined again as {} variable",
                                    kind.as_str(),
                                    kind.as_str()
                                ),
                            )
                        } else {
                            (
                                codes::E0501,
                                format!(
                                    "{} variable cannot be {} variable",
                                    prev.as_str(),
                                    kind.as_str()
                                ),
                            )
                        };
                        self.diagnostics.push(
                            Diagnostic::error(var.span, msg)
                                .with_code(code)
                                .with_related(
                                    prev_span,
                                    format!(
                                        "previously defined as {} variable here",
                                        prev.as_str()
                                    ),
                                ),
                        );
                    }
                    Some(_) => {}
                }
            }
        }
    }

    /// Each root variable at most once across the motion clauses of one
    /// `update`, and never a const one.
    fn check_motion(&mut self, directive: &AccDirective) {
        let mut first: HashMap<VarId, Span> = HashMap::new();
        for c in &directive.clauses {
            let ClauseKind::Motion(motion, _) = &c.kind else {
                continue;
            };
            for var in c.kind.supported_vars() {
                let Some(id) = self.resolved.root_var(var) else {
                    continue;
                };
                let info = self.resolved.var(id);
                if info.is_const && !info.ty.is_pointer() {
                    self.error(
                        var.span,
                        codes::E0506,
                        format!(
                            "const variable cannot be written by '{}' clause",
                            motion.as_str()
                        ),
                    );
                }
                match first.get(&id) {
                    None => {
                        first.insert(id, var.span);
                    }
                    Some(&prev) => {
                        let msg = format!(
                            "variable '{}' appears in multiple self, host, or device clauses of the same '#pragma acc update' directive",
                            info.name
                        );
                        self.diagnostics.push(
                            Diagnostic::error(var.span, msg)
                                .with_code(codes::E0505)
                                .with_related(prev, "previously appeared here"),
                        );
                    }
                }
            }
        }
    }

    fn check_const(&mut self, kind: AttrKind, var: VarId, span: Span) {
        let info = self.resolved.var(var);
        if !info.is_const || info.ty.is_pointer() {
            return;
        }
        match kind {
            AttrKind::Private => self.error(
                span,
                codes::E0503,
                "const variable cannot be private because initialization is impossible",
            ),
            AttrKind::Reduction => {
                self.error(span, codes::E0504, "reduction variable cannot be const")
            }
            _ => {}
        }
    }

    fn check_nesting(&mut self, directive: &AccDirective) {
        let kind = directive.kind;
        let enclosing_compute = self
            .dir_stack
            .iter()
            .rev()
            .find(|k| **k != DirectiveKind::Data)
            .copied();
        let violation = match kind {
            DirectiveKind::Loop => match self.dir_stack.last() {
                Some(DirectiveKind::Data) => Some(DirectiveKind::Data),
                _ => None,
            },
            DirectiveKind::Routine => None,
            _ => enclosing_compute,
        };
        if let Some(outer) = violation {
            self.error(
                directive.span,
                codes::E0201,
                format!("{} cannot be nested within {}", kind, outer),
            );
        }
        self.check_in_routine(directive);
    }

    /// Only `loop` may appear in a function attributed with `routine`.
    fn check_in_routine(&mut self, directive: &AccDirective) {
        let Some(FnCtx {
            name,
            routine: Some(routine),
        }) = &self.function
        else {
            return;
        };
        if matches!(directive.kind, DirectiveKind::Loop | DirectiveKind::Routine) {
            return;
        }
        let diag = Diagnostic::error(
            directive.span,
            format!(
                "{} is not permitted within function '{name}' because the latter is attributed with '#pragma acc routine'",
                directive.kind
            ),
        )
        .with_code(codes::E0205)
        .with_related(
            *routine,
            format!("function '{name}' attributed with '#pragma acc routine' here"),
        );
        self.diagnostics.push(diag);
    }

    /// An executable directive has no statement of its own, so it cannot
    /// stand as the body of a statement or construct.
    fn check_substatement(&mut self, stmt: &Stmt) {
        if let StmtKind::AccExec(d) = &stmt.kind {
            if d.kind.is_executable() {
                self.error(
                    d.span,
                    codes::E0204,
                    format!("{} cannot be an immediate substatement", d.kind),
                );
            }
        }
    }

    /// File-scope `routine`: one level, agreeing with earlier directives
    /// for the same function.
    fn check_routine(&mut self, func: &FunctionDef, routine: &AccDirective) {
        self.check_clause_validity(routine);
        let level = RoutineLevel::of(&routine.clauses);
        let name = &func.name.name;
        match self.routines.get(name) {
            None => {
                self.routines.insert(name.clone(), (level, routine.span));
            }
            Some(&(Some(prev), prev_span)) => {
                let Some(level) = level.filter(|&l| l != prev) else {
                    return;
                };
                let diag = Diagnostic::error(
                    routine.span,
                    format!(
                        "for function '{name}', '#pragma acc routine {}' conflicts with previous '#pragma acc routine {}'",
                        level.as_str(),
                        prev.as_str()
                    ),
                )
                .with_code(codes::E0207)
                .with_related(prev_span, "previous '#pragma acc routine' here");
                self.diagnostics.push(diag);
            }
            Some(_) => {}
        }
    }
}

impl<'ast> Visitor<'ast> for CheckCtx<'_> {
    fn visit_function(&mut self, func: &'ast FunctionDef) {
        if let Some(routine) = &func.routine {
            self.check_routine(func, routine);
        }
        let Some(body) = &func.body else {
            return;
        };
        let routine = self.routines.get(&func.name.name).map(|&(_, span)| span);
        self.function = Some(FnCtx {
            name: func.name.name.clone(),
            routine,
        });
        let saved = std::mem::take(&mut self.breakable);
        self.visit_block(body);
        self.breakable = saved;
        self.function = None;
    }

    fn visit_declaration(&mut self, decl: &'ast Declaration) {
        if let Some(FnCtx {
            name,
            routine: Some(routine),
        }) = &self.function
        {
            if decl.spec.storage == Some(StorageClass::Static) {
                for d in &decl.declarators {
                    let diag = Diagnostic::error(
                        d.name.span,
                        format!(
                            "static local variable '{}' is not permitted within function '{name}' because the latter is attributed with '#pragma acc routine'",
                            d.name.name
                        ),
                    )
                    .with_code(codes::E0206)
                    .with_related(
                        *routine,
                        format!("function '{name}' attributed with '#pragma acc routine' here"),
                    );
                    self.diagnostics.push(diag);
                }
            }
        }
        visit::walk_declaration(self, decl);
    }

    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        match &stmt.kind {
            StmtKind::If { then, els, .. } => {
                self.check_substatement(then);
                if let Some(els) = els {
                    self.check_substatement(els);
                }
                visit::walk_stmt(self, stmt);
            }
            StmtKind::For(ForStmt { body, .. })
            | StmtKind::While { body, .. }
            | StmtKind::Switch { body, .. } => {
                self.check_substatement(body);
                self.breakable += 1;
                visit::walk_stmt(self, stmt);
                self.breakable -= 1;
            }
            StmtKind::Break if self.breakable == 0 => self.error(
                stmt.span,
                codes::E0203,
                "'break' statement not in loop or switch statement",
            ),
            _ => visit::walk_stmt(self, stmt),
        }
    }

    fn visit_acc(&mut self, construct: &'ast AccConstruct) {
        let directive = &construct.directive;
        log::trace!("check: {} at {:?}", directive.kind, directive.span);
        self.check_nesting(directive);
        self.check_clause_validity(directive);
        for c in &directive.clauses {
            self.check_positive(c);
            self.check_var_shapes(directive.kind, c);
        }
        self.check_attr_conflicts(directive);
        self.check_substatement(&construct.body);

        self.dir_stack.push(directive.kind);
        self.visit_stmt(&construct.body);
        self.dir_stack.pop();
    }

    fn visit_standalone(&mut self, directive: &'ast AccDirective) {
        if directive.kind == DirectiveKind::Routine {
            self.error(
                directive.span,
                codes::E0208,
                "unexpected OpenACC directive '#pragma acc routine'",
            );
            return;
        }
        log::trace!("check: {} at {:?}", directive.kind, directive.span);
        self.check_nesting(directive);
        self.check_clause_validity(directive);
        for c in &directive.clauses {
            self.check_var_shapes(directive.kind, c);
        }
        self.check_attr_conflicts(directive);
        self.check_motion(directive);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(source: &str) -> Vec<String> {
        let parsed = crate::parser::parse(source);
        assert!(parsed.errors.is_empty(), "parse errors: {:?}", parsed.errors);
        let unit = parsed.unit.unwrap();
        let resolved = crate::resolve::resolve(&unit);
        assert!(resolved.diagnostics.is_empty());
        let mut diags = check(&unit, &resolved.resolved);
        crate::diag::sort_by_location(&mut diags);
        diags.into_iter().map(|d| d.message).collect()
    }

    fn in_main(body: &str) -> String {
        format!("struct S {{ int i; int *p; struct S *n; }};\nvoid f() {{\n  int i, j, a[8];\n  struct S s, t, u;\n{body}\n}}\n")
    }

    #[test]
    fn clean_directives_pass() {
        let src = in_main(
            "#pragma acc data copy(a) present(s)\n#pragma acc parallel num_gangs(2) firstprivate(j)\n#pragma acc loop gang collapse(1)\n  for (i = 0; i < 8; ++i) a[i] = j;",
        );
        assert!(messages(&src).is_empty());
    }

    #[test]
    fn clause_not_allowed() {
        let src = in_main("#pragma acc data copy(a) private(i)\n  ;");
        assert_eq!(
            messages(&src),
            vec!["unexpected OpenACC clause 'private' in directive '#pragma acc data'"]
        );
    }

    #[test]
    fn exclusive_and_repeated_clauses() {
        let src = in_main(
            "#pragma acc parallel\n#pragma acc loop seq gang worker worker collapse(1) collapse(1)\n  for (i = 0; i < 8; ++i) ;",
        );
        assert_eq!(
            messages(&src),
            vec![
                "unexpected OpenACC clause 'gang', 'seq' is specified already",
                "unexpected OpenACC clause 'worker', 'seq' is specified already",
                "unexpected OpenACC clause 'worker', 'seq' is specified already",
                "directive '#pragma acc loop' cannot contain more than one 'collapse' clause",
            ]
        );
    }

    #[test]
    fn data_needs_data_clause() {
        let src = in_main("#pragma acc data if(1)\n  ;");
        assert_eq!(
            messages(&src),
            vec!["expected at least one data clause for '#pragma acc data'"]
        );
    }

    #[test]
    fn non_positive_and_non_constant_arguments() {
        let src = in_main(
            "#pragma acc parallel num_gangs(0)\n#pragma acc loop collapse(j) tile(-1)\n  for (i = 0; i < 8; ++i) ;",
        );
        assert_eq!(
            messages(&src),
            vec![
                "argument to 'num_gangs' clause must be a strictly positive integer value",
                "argument to 'collapse' clause must be an integer constant expression",
                "argument to 'tile' clause must be a strictly positive integer value",
            ]
        );
    }

    #[test]
    fn member_and_subarray_shapes() {
        let src = in_main(
            "#pragma acc parallel loop private(s.i) copy(t.n->i, a[0:2]) copyin(u.p[0:1])\n  for (i = 0; i < 8; ++i) ;",
        );
        assert_eq!(
            messages(&src),
            vec![
                "in 'private' clause on '#pragma acc parallel loop', member expression is not supported",
                "in 'copy' clause on '#pragma acc parallel loop', nested member expression is not supported",
                "in 'copyin' clause on '#pragma acc parallel loop', subarray is not supported",
                "in 'copyin' clause on '#pragma acc parallel loop', member expression is not supported",
            ]
        );
    }

    #[test]
    fn rejected_references_take_no_attribute() {
        let src = in_main(
            "#pragma acc parallel private(s.n->i) copy(s.p[0:1]) reduction(+:s.i) copy(s)\n  ;",
        );
        assert_eq!(
            messages(&src),
            vec![
                "in 'private' clause on '#pragma acc parallel', nested member expression is not supported",
                "in 'copy' clause on '#pragma acc parallel', subarray is not supported",
                "in 'copy' clause on '#pragma acc parallel', member expression is not supported",
                "in 'reduction' clause on '#pragma acc parallel', member expression is not supported",
            ]
        );
    }

    #[test]
    fn conflicting_attributes_on_one_directive() {
        let src = in_main(
            "#pragma acc parallel copy(i) firstprivate(i) copy(j) copy(j) reduction(+:a) copy(a)\n  ;",
        );
        assert_eq!(
            messages(&src),
            vec![
                "copy variable cannot be firstprivate variable",
                "copy variable defined again as copy variable",
            ]
        );
    }

    #[test]
    fn directive_nesting() {
        let src = in_main(
            "#pragma acc parallel\n  {\n#pragma acc data copy(a)\n    ;\n  }\n#pragma acc data copy(a)\n#pragma acc loop\n  for (i = 0; i < 8; ++i) ;",
        );
        assert_eq!(
            messages(&src),
            vec![
                "'#pragma acc data' cannot be nested within '#pragma acc parallel'",
                "'#pragma acc loop' cannot be nested within '#pragma acc data'",
            ]
        );
    }

    #[test]
    fn break_needs_loop_or_switch() {
        let src = in_main(
            "  switch (i) {\n  case 0:\n    break;\n  }\n#pragma acc parallel\n  {\n    break;\n  }",
        );
        assert_eq!(
            messages(&src),
            vec!["'break' statement not in loop or switch statement"]
        );
    }

    #[test]
    fn executable_directive_clauses() {
        let src = in_main(
            "#pragma acc update if(i) if(j)\n\
             #pragma acc enter data copyout(a) create(j)\n\
             #pragma acc exit data create(a)\n\
             #pragma acc update self(a, i) host(a[0:2]) device(s.p[0:1])",
        );
        assert_eq!(
            messages(&src),
            vec![
                "expected at least one 'self', 'host', or 'device' clause for '#pragma acc update'",
                "directive '#pragma acc update' cannot contain more than one 'if' clause",
                "unexpected OpenACC clause 'copyout' in directive '#pragma acc enter data'",
                "expected at least one data clause for '#pragma acc exit data'",
                "unexpected OpenACC clause 'create' in directive '#pragma acc exit data'",
                "variable 'a' appears in multiple self, host, or device clauses of the same '#pragma acc update' directive",
                "in 'device' clause on '#pragma acc update', subarray is not supported",
                "in 'device' clause on '#pragma acc update', member expression is not supported",
            ]
        );
    }

    #[test]
    fn enter_data_attribute_conflicts() {
        let src = in_main("#pragma acc enter data copyin(i) create(i) copyin(j) pcopyin(j)");
        assert_eq!(
            messages(&src),
            vec![
                "copyin variable cannot be create variable",
                "copyin variable defined again as copyin variable",
            ]
        );
    }

    #[test]
    fn executable_directive_placement() {
        let src = in_main(
            "  if (i)\n#pragma acc update self(a)\n\
             #pragma acc parallel\n  {\n#pragma acc exit data delete(a)\n  }",
        );
        assert_eq!(
            messages(&src),
            vec![
                "'#pragma acc update' cannot be an immediate substatement",
                "'#pragma acc exit data' cannot be nested within '#pragma acc parallel'",
            ]
        );
    }

    #[test]
    fn const_update_target() {
        let src = "void f() {\n  const int c = 1;\n#pragma acc update device(c)\n}\n";
        assert_eq!(
            messages(src),
            vec!["const variable cannot be written by 'device' clause"]
        );
    }

    #[test]
    fn routine_clauses_and_conflicts() {
        let src = "#pragma acc routine gang worker\nvoid g(void);\n\
                   #pragma acc routine\nvoid h(void);\n\
                   #pragma acc routine seq\nvoid g(void);\n";
        assert_eq!(
            messages(src),
            vec![
                "unexpected OpenACC clause 'worker', 'gang' is specified already",
                "expected 'gang', 'worker', 'vector', or 'seq' clause for '#pragma acc routine'",
                "for function 'g', '#pragma acc routine seq' conflicts with previous '#pragma acc routine gang'",
            ]
        );
    }

    #[test]
    fn routine_function_body_restrictions() {
        let src = "#pragma acc routine worker\nvoid g(int *a);\n\
                   void g(int *a) {\n  static int s;\n\
                   #pragma acc parallel\n  ;\n\
                   #pragma acc loop worker\n  for (int i = 0; i < 4; ++i) a[i] = s;\n\
                   #pragma acc routine seq\n}\n";
        assert_eq!(
            messages(src),
            vec![
                "static local variable 's' is not permitted within function 'g' because the latter is attributed with '#pragma acc routine'",
                "'#pragma acc parallel' is not permitted within function 'g' because the latter is attributed with '#pragma acc routine'",
                "unexpected OpenACC directive '#pragma acc routine'",
            ]
        );
    }

    #[test]
    fn const_privatization() {
        let src = "void f() {\n  const int c = 1;\n#pragma acc parallel private(c)\n  ;\n}\n";
        assert_eq!(
            messages(src),
            vec!["const variable cannot be private because initialization is impossible"]
        );
    }
}
