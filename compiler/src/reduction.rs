// reduction.rs: Reduction conflict resolution
//
// Checks every reduction clause: operator against variable type, repeated
// variables on one directive, operators of nested reductions on the same
// storage within a gang-reduction scope, data clauses required at the
// parent compute construct, and gang-privacy of orphaned loop reductions.
//
// Preconditions: `partition` and `data` were computed from `resolved`.
// Postconditions: none (diagnostics only). Lowering keeps the first
//                 operator recorded for a variable.
// Failure modes: each offending variable occurrence is its own diagnostic;
//                other variables of the same clause are still checked.
// Side effects: none.

use std::collections::HashSet;

use crate::ast::Span;
use crate::clause::{ClauseKind, EffectiveKind, ReductionOp};
use crate::config::LowerOptions;
use crate::data_attr::{
    has_clause_var, privatizes, reaching_reductions, DataAttrInfo, ImplicitKind,
};
use crate::diag::{codes, Diagnostic};
use crate::id::{DirId, VarId};
use crate::partition::PartitionInfo;
use crate::resolve::{ResolvedUnit, Type};

pub fn check_reductions(
    resolved: &ResolvedUnit,
    partition: &PartitionInfo,
    data: &DataAttrInfo,
    opts: &LowerOptions,
) -> Vec<Diagnostic> {
    let mut ctx = ReductionCtx {
        resolved,
        partition,
        data,
        opts,
        diagnostics: Vec::new(),
    };
    for node in &resolved.dirs {
        ctx.check_directive(node.id);
    }
    for node in resolved.dirs.iter().filter(|d| d.kind == EffectiveKind::Parallel) {
        ctx.check_visible_data(node.id);
    }
    log::debug!("reduction: {} diagnostics", ctx.diagnostics.len());
    ctx.diagnostics
}

/// One variable of a reduction clause.
#[derive(Debug, Clone, Copy)]
struct Occurrence {
    var: VarId,
    op: ReductionOp,
    span: Span,
}

struct ReductionCtx<'a> {
    resolved: &'a ResolvedUnit,
    partition: &'a PartitionInfo,
    data: &'a DataAttrInfo,
    opts: &'a LowerOptions,
    diagnostics: Vec<Diagnostic>,
}

/// Type class an operator accepts, for the diagnostic.
fn accepted_types(op: ReductionOp) -> &'static str {
    match op {
        ReductionOp::Max | ReductionOp::Min => "real or pointer",
        ReductionOp::BitAnd | ReductionOp::BitOr | ReductionOp::BitXor => "integer",
        ReductionOp::Add | ReductionOp::Mul | ReductionOp::And | ReductionOp::Or => "arithmetic",
    }
}

fn accepts(op: ReductionOp, ty: &Type) -> bool {
    match op {
        // Real in the C sense: integers included.
        ReductionOp::Max | ReductionOp::Min => ty.is_arithmetic() || ty.is_pointer(),
        ReductionOp::BitAnd | ReductionOp::BitOr | ReductionOp::BitXor => ty.is_integer(),
        ReductionOp::Add | ReductionOp::Mul | ReductionOp::And | ReductionOp::Or => ty.is_arithmetic(),
    }
}

/// First occurrence of `var` in the reduction clauses of `dir`.
fn reduction_on(resolved: &ResolvedUnit, dir: DirId, var: VarId) -> Option<Occurrence> {
    resolved.dir(dir).clauses.iter().find_map(|c| {
        let ClauseKind::Reduction(op, _) = &c.kind else {
            return None;
        };
        c.kind
            .supported_vars()
            .find(|v| resolved.root_var(v) == Some(var))
            .map(|v| Occurrence { var, op: *op, span: v.span })
    })
}

impl ReductionCtx<'_> {
    fn name(&self, var: VarId) -> &str {
        &self.resolved.var(var).name
    }

    fn check_directive(&mut self, dir: DirId) {
        let resolved = self.resolved;
        let node = resolved.dir(dir);
        let orphaned = self.partition.get(dir).is_some_and(|l| l.orphaned);
        let mut seen: Vec<Occurrence> = Vec::new();
        for c in &node.clauses {
            let ClauseKind::Reduction(op, _) = &c.kind else {
                continue;
            };
            for v in c.kind.supported_vars() {
                let Some(var) = resolved.root_var(v) else {
                    continue;
                };
                let occ = Occurrence { var, op: *op, span: v.span };
                if let Some(prev) = seen.iter().find(|p| p.var == var).copied() {
                    self.repeated(occ, prev);
                    continue;
                }
                seen.push(occ);
                if !self.check_type(occ) {
                    continue;
                }
                if orphaned
                    && !resolved.var(var).storage.is_automatic()
                    && !self.private_to_enclosing_loop(dir, var)
                {
                    self.diagnostics.push(
                        Diagnostic::error(
                            occ.span,
                            format!("orphaned loop reduction variable '{}' is not gang-private", resolved.var(var).name),
                        )
                        .with_code(codes::E0604),
                    );
                }
                if node.kind == EffectiveKind::Loop {
                    self.check_enclosing(dir, occ);
                }
            }
        }
    }

    /// Whether an enclosing orphaned loop in the same function already
    /// gives each gang its own `var`: a `private` or `reduction` clause, or
    /// `var` is one of its loop control variables.
    fn private_to_enclosing_loop(&self, dir: DirId, var: VarId) -> bool {
        let resolved = self.resolved;
        resolved.ancestors(dir).any(|anc| {
            has_clause_var(resolved, resolved.dir(anc), var, |k| {
                matches!(k, ClauseKind::Private(_) | ClauseKind::Reduction(..))
            }) || self.partition.get(anc).is_some_and(|l| l.is_lcv(var))
        })
    }

    fn check_type(&mut self, occ: Occurrence) -> bool {
        let ty = &self.resolved.var(occ.var).ty;
        if accepts(occ.op, ty) {
            return true;
        }
        log::trace!("reduction: '{}' has type {ty}", self.name(occ.var));
        self.diagnostics.push(
            Diagnostic::error(
                occ.span,
                format!(
                    "OpenACC reduction operator '{}' argument must be of {} type",
                    occ.op.as_str(),
                    accepted_types(occ.op)
                ),
            )
            .with_code(codes::E0602),
        );
        false
    }

    /// The same variable twice on one directive.
    fn repeated(&mut self, occ: Occurrence, prev: Occurrence) {
        let name = self.name(occ.var).to_string();
        let label = format!("previous '{}' reduction here", prev.op.as_str());
        if occ.op != prev.op {
            self.diagnostics.push(
                Diagnostic::error(
                    occ.span,
                    format!("conflicting '{}' reduction for variable '{name}'", occ.op.as_str()),
                )
                .with_code(codes::E0601)
                .with_related(prev.span, label),
            );
        } else if self.opts.warn_redundant_reduction {
            self.diagnostics.push(
                Diagnostic::warning(
                    occ.span,
                    format!("redundant '{}' reduction for variable '{name}'", occ.op.as_str()),
                )
                .with_code(codes::W0601)
                .with_related(prev.span, label),
            );
        }
    }

    /// Compares a loop reduction with the nearest enclosing reduction on the
    /// same storage. A privatizing directive in between ends the search.
    fn check_enclosing(&mut self, loop_dir: DirId, occ: Occurrence) {
        let resolved = self.resolved;
        for anc in resolved.ancestors(loop_dir) {
            let kind = resolved.dir(anc).kind;
            if kind == EffectiveKind::Data {
                continue;
            }
            if let Some(outer) = reduction_on(resolved, anc, occ.var) {
                self.nested(occ, outer);
                return;
            }
            if privatizes(resolved, self.partition, anc, occ.var) {
                return;
            }
            if kind == EffectiveKind::Parallel {
                self.check_implied(anc, loop_dir, occ);
                return;
            }
        }
    }

    fn nested(&mut self, occ: Occurrence, outer: Occurrence) {
        let name = self.name(occ.var).to_string();
        let label = format!("enclosing '{}' reduction here", outer.op.as_str());
        if occ.op != outer.op {
            self.diagnostics.push(
                Diagnostic::error(
                    occ.span,
                    format!("conflicting '{}' reduction for variable '{name}'", occ.op.as_str()),
                )
                .with_code(codes::E0601)
                .with_related(outer.span, label),
            );
        } else if self.opts.warn_redundant_nested_reduction {
            self.diagnostics.push(
                Diagnostic::warning(
                    occ.span,
                    format!("redundant '{}' reduction for variable '{name}'", occ.op.as_str()),
                )
                .with_code(codes::W0602)
                .with_related(outer.span, label),
            );
        }
    }

    /// Compares a loop reduction with the gang reduction implied at
    /// `parallel` by the first loop reduction of the same variable.
    fn check_implied(&mut self, parallel: DirId, loop_dir: DirId, occ: Occurrence) {
        let implied = self
            .data
            .find(parallel, occ.var, |k| matches!(k, ImplicitKind::Reduction(_)));
        let Some(ImplicitKind::Reduction(op)) = implied else {
            return;
        };
        if op == occ.op {
            return;
        }
        let Some(first) = reaching_reductions(self.resolved, self.partition, parallel)
            .into_iter()
            .find(|r| r.var == occ.var)
        else {
            return;
        };
        if first.loop_dir == loop_dir {
            return;
        }
        let name = self.name(occ.var).to_string();
        self.diagnostics.push(
            Diagnostic::error(
                occ.span,
                format!("conflicting '{}' reduction for variable '{name}'", occ.op.as_str()),
            )
            .with_code(codes::E0601)
            .with_related(first.span, format!("enclosing '{}' reduction here", op.as_str()))
            .with_related(self.resolved.dir(parallel).span, "implied as gang reduction here"),
        );
    }

    /// Scalar loop reductions whose variable is only implicitly
    /// firstprivate at the compute construct.
    fn check_visible_data(&mut self, parallel: DirId) {
        let resolved = self.resolved;
        let reductions = reaching_reductions(resolved, self.partition, parallel);
        let node = resolved.dir(parallel);
        let mut reported: HashSet<(DirId, VarId)> = HashSet::new();
        for r in &reductions {
            if !self.data.has(parallel, r.var, ImplicitKind::Firstprivate)
                || has_clause_var(resolved, node, r.var, |k| matches!(k, ClauseKind::Firstprivate(_)))
                || !reported.insert((r.loop_dir, r.var))
            {
                continue;
            }
            let name = self.name(r.var).to_string();
            let parent = node.display_name();
            let gang = reductions.iter().find(|g| {
                g.var == r.var && self.partition.get(g.loop_dir).is_some_and(|l| l.is_gang())
            });
            let mut diag = Diagnostic::error(
                r.span,
                format!("scalar loop reduction variable '{name}' requires data clause visible at parent {parent}"),
            )
            .with_code(codes::E0603)
            .with_related(node.span, format!("parent {parent} appears here"));
            diag = match gang {
                Some(g) => diag.with_related(
                    g.span,
                    format!("suggest 'copy({name})' because '{name}' has gang reduction, specified here"),
                ),
                None => diag.with_related(
                    node.span,
                    format!(
                        "suggest 'firstprivate({name})' because '{name}' has no gang reduction in parent {parent} construct"
                    ),
                ),
            };
            self.diagnostics.push(diag);
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn run_with(source: &str, opts: &LowerOptions) -> Vec<Diagnostic> {
        let parsed = crate::parser::parse(source);
        assert!(parsed.errors.is_empty(), "parse errors: {:?}", parsed.errors);
        let unit = parsed.unit.unwrap();
        let resolved = crate::resolve::resolve(&unit).resolved;
        let partition = crate::partition::partition(&unit, &resolved, opts).info;
        let data = crate::data_attr::data_attrs(&resolved, &partition);
        check_reductions(&resolved, &partition, &data, opts)
    }

    fn run(source: &str) -> Vec<Diagnostic> {
        run_with(source, &LowerOptions::default())
    }

    fn messages(diags: &[Diagnostic]) -> Vec<String> {
        diags.iter().map(|d| d.message.clone()).collect()
    }

    fn notes(d: &Diagnostic) -> Vec<&str> {
        d.related_spans.iter().map(|r| r.label.as_str()).collect()
    }

    #[test]
    fn operator_type_checks() {
        let d = run(
            "struct T { int i; };\nvoid f() {\n  struct T pr;\n  int i, *p, a[2];\n  float x;\n#pragma acc parallel reduction(max: pr,p,i) reduction(&: x) reduction(+: a)\n  ;\n}\n",
        );
        assert_eq!(
            messages(&d),
            vec![
                "OpenACC reduction operator 'max' argument must be of real or pointer type",
                "OpenACC reduction operator '&' argument must be of integer type",
                "OpenACC reduction operator '+' argument must be of arithmetic type",
            ]
        );
        assert!(d.iter().all(|d| d.code == Some(codes::E0602)));
    }

    #[test]
    fn repeated_on_one_directive() {
        let d = run(
            "void f() {\n  int i, jk, d;\n#pragma acc parallel copy(i,jk,d)\n#pragma acc loop gang reduction(max:i,i,jk,d) worker reduction(max:jk) reduction(*:d)\n  for (int k = 0; k < 5; ++k) ;\n}\n",
        );
        assert_eq!(
            messages(&d),
            vec![
                "redundant 'max' reduction for variable 'i'",
                "redundant 'max' reduction for variable 'jk'",
                "conflicting '*' reduction for variable 'd'",
            ]
        );
        assert_eq!(d[0].code, Some(codes::W0601));
        assert!(!d[0].is_error());
        assert_eq!(d[2].code, Some(codes::E0601));
        assert_eq!(notes(&d[2]), vec!["previous 'max' reduction here"]);
    }

    #[test]
    fn redundant_warning_can_be_disabled() {
        let opts = LowerOptions {
            warn_redundant_reduction: false,
            ..LowerOptions::default()
        };
        let d = run_with(
            "void f() {\n  int s;\n#pragma acc parallel copy(s)\n#pragma acc loop reduction(+:s,s)\n  for (int k = 0; k < 5; ++k) ;\n}\n",
            &opts,
        );
        assert!(d.is_empty());
    }

    #[test]
    fn conflicts_with_explicit_parallel_reduction() {
        let d = run(
            "void f() {\n  int f1, d;\n#pragma acc parallel reduction(+:f1,d) copy(d)\n  {\n#pragma acc loop worker reduction(max:f1,d)\n    for (int j = 0; j < 5; ++j) ;\n#pragma acc loop seq reduction(+:d)\n    for (int j = 0; j < 5; ++j) ;\n  }\n}\n",
        );
        assert_eq!(
            messages(&d),
            vec![
                "conflicting 'max' reduction for variable 'f1'",
                "conflicting 'max' reduction for variable 'd'",
                "redundant '+' reduction for variable 'd'",
            ]
        );
        assert_eq!(notes(&d[0]), vec!["enclosing '+' reduction here"]);
        assert_eq!(d[2].code, Some(codes::W0602));
    }

    #[test]
    fn nearest_enclosing_loop_reduction_is_compared() {
        let d = run(
            "void f() {\n  int v;\n#pragma acc parallel copy(v)\n#pragma acc loop gang reduction(||:v)\n  for (int i = 0; i < 5; ++i) {\n#pragma acc loop worker reduction(&&:v)\n    for (int j = 0; j < 5; ++j) {\n#pragma acc loop vector reduction(*:v)\n      for (int k = 0; k < 5; ++k) ;\n    }\n  }\n}\n",
        );
        assert_eq!(d.len(), 2);
        assert_eq!(notes(&d[0]), vec!["enclosing '||' reduction here"]);
        assert_eq!(d[1].message, "conflicting '*' reduction for variable 'v'");
        assert_eq!(notes(&d[1]), vec!["enclosing '&&' reduction here"]);
    }

    #[test]
    fn private_clause_resets_tracking() {
        let d = run(
            "void f() {\n  int v;\n#pragma acc parallel copy(v)\n#pragma acc loop gang reduction(+:v)\n  for (int i = 0; i < 5; ++i) {\n#pragma acc loop worker private(v)\n    for (int j = 0; j < 5; ++j) {\n#pragma acc loop vector reduction(max:v)\n      for (int k = 0; k < 5; ++k) ;\n    }\n  }\n}\n",
        );
        assert!(d.is_empty(), "{:?}", messages(&d));
    }

    #[test]
    fn local_declaration_resets_tracking() {
        let d = run(
            "void f() {\n  int v;\n#pragma acc parallel copy(v)\n#pragma acc loop gang reduction(+:v)\n  for (int i = 0; i < 5; ++i) {\n    int v;\n#pragma acc loop worker reduction(max:v)\n    for (int j = 0; j < 5; ++j) ;\n  }\n}\n",
        );
        assert!(d.is_empty(), "{:?}", messages(&d));
    }

    #[test]
    fn sibling_conflict_against_implied_gang_reduction() {
        let d = run(
            "void f() {\n  int a, b;\n#pragma acc parallel copy(a,b)\n  {\n#pragma acc loop reduction(+:a,b)\n    for (int i = 0; i < 5; ++i) ;\n#pragma acc loop reduction(*:b,a)\n    for (int i = 0; i < 5; ++i) ;\n  }\n}\n",
        );
        assert_eq!(
            messages(&d),
            vec![
                "conflicting '*' reduction for variable 'b'",
                "conflicting '*' reduction for variable 'a'",
            ]
        );
        assert_eq!(
            notes(&d[0]),
            vec!["enclosing '+' reduction here", "implied as gang reduction here"]
        );
    }

    #[test]
    fn missing_data_clause_suggests_copy_for_gang() {
        let d = run(
            "void f() {\n  int jk = 0;\n#pragma acc parallel\n  {\n#pragma acc loop gang reduction(+:jk)\n    for (int i = 0; i < 5; ++i)\n      jk += i;\n  }\n}\n",
        );
        assert_eq!(
            messages(&d),
            vec!["scalar loop reduction variable 'jk' requires data clause visible at parent '#pragma acc parallel'"]
        );
        assert_eq!(
            notes(&d[0]),
            vec![
                "parent '#pragma acc parallel' appears here",
                "suggest 'copy(jk)' because 'jk' has gang reduction, specified here",
            ]
        );
    }

    #[test]
    fn missing_data_clause_suggests_firstprivate_without_gang() {
        let d = run(
            "void f() {\n  int jk = 0;\n#pragma acc parallel\n  {\n#pragma acc loop seq reduction(+:jk)\n    for (int i = 0; i < 5; ++i) jk += i;\n#pragma acc loop auto reduction(+:jk)\n    for (int i = 0; i < 5; ++i) jk += i;\n  }\n}\n",
        );
        assert_eq!(d.len(), 2);
        for diag in &d {
            assert_eq!(diag.code, Some(codes::E0603));
            assert_eq!(
                notes(diag)[1],
                "suggest 'firstprivate(jk)' because 'jk' has no gang reduction in parent '#pragma acc parallel' construct"
            );
        }
    }

    #[test]
    fn combined_reduction_needs_no_data_clause() {
        let d = run(
            "void f() {\n  int jk = 0;\n#pragma acc parallel loop gang reduction(+:jk)\n  for (int i = 0; i < 5; ++i) jk += i;\n}\n",
        );
        assert!(d.is_empty(), "{:?}", messages(&d));
    }

    #[test]
    fn orphaned_reductions_must_be_gang_private() {
        let d = run(
            "int global;\nvoid fn(int param) {\n  int l;\n  extern int e;\n#pragma acc loop gang reduction(+:param,l,global,e)\n  for (int i = 0; i < 5; ++i) ;\n}\n",
        );
        assert_eq!(
            messages(&d),
            vec![
                "orphaned loop reduction variable 'global' is not gang-private",
                "orphaned loop reduction variable 'e' is not gang-private",
            ]
        );
    }

    #[test]
    fn enclosing_orphaned_loop_can_privatize() {
        let opts = LowerOptions {
            warn_redundant_nested_reduction: false,
            ..LowerOptions::default()
        };
        let d = run_with(
            "int g, h, k;\nvoid fn() {\n#pragma acc loop gang private(g) reduction(+:h)\n  for (k = 0; k < 4; ++k) {\n#pragma acc loop worker reduction(+:g,h,k)\n    for (int j = 0; j < 4; ++j) ;\n  }\n#pragma acc loop worker reduction(+:g)\n  for (int j = 0; j < 4; ++j) ;\n}\n",
            &opts,
        );
        assert_eq!(
            messages(&d),
            vec![
                "orphaned loop reduction variable 'h' is not gang-private",
                "orphaned loop reduction variable 'g' is not gang-private",
            ]
        );
        assert!(d.iter().all(|d| d.code == Some(codes::E0604)));
    }
}
