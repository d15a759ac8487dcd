// loop_count.rs: Associated loop counting for collapse and tile
//
// A loop directive is associated with one `for` loop, or with as many
// directly nested `for` loops as its `collapse` argument or `tile` size
// count asks for. A nested loop that carries its own loop directive still
// counts.
//
// Preconditions: `resolved` was produced from `unit` by `resolve`.
// Postconditions: none (diagnostics only).
// Failure modes: a missing `for` at any required depth is one diagnostic,
//                with a note at the clause that set the count.
// Side effects: none.

use crate::ast::*;
use crate::clause::{Clause, ClauseKind, ClauseName};
use crate::diag::{codes, Diagnostic};
use crate::visit::{self, Visitor};

/// Number of associated loops a loop directive asks for, and the clause
/// that asked (if any). `tile` wins over `collapse` when both appear.
pub fn required_count(clauses: &[Clause]) -> (usize, Option<(ClauseName, Span)>) {
    let mut out = (1, None);
    for c in clauses {
        match &c.kind {
            ClauseKind::Tile(sizes) => return (sizes.len().max(1), Some((ClauseName::Tile, c.span))),
            ClauseKind::Collapse(e) => {
                let n = e
                    .const_int()
                    .and_then(|v| usize::try_from(v).ok())
                    .filter(|&v| v > 0)
                    .unwrap_or(1);
                out = (n, Some((ClauseName::Collapse, c.span)));
            }
            _ => {}
        }
    }
    out
}

/// The `for` loop a statement is, looking through a nested loop directive.
pub fn next_for(stmt: &Stmt) -> Option<&ForStmt> {
    match &stmt.kind {
        StmtKind::For(f) => Some(f),
        StmtKind::Acc(c) if c.directive.kind.has_loop() => next_for(&c.body),
        _ => None,
    }
}

/// Up to `count` perfectly nested loops starting at `stmt`, outermost first.
pub fn associated_loops(stmt: &Stmt, count: usize) -> Vec<&ForStmt> {
    let mut loops = Vec::new();
    let mut cur = stmt;
    while loops.len() < count {
        let Some(f) = next_for(cur) else {
            break;
        };
        loops.push(f);
        cur = &f.body;
    }
    loops
}

pub fn check_loop_counts(unit: &TranslationUnit) -> Vec<Diagnostic> {
    let mut ctx = LoopCountCtx {
        diagnostics: Vec::new(),
    };
    visit::walk_unit(&mut ctx, unit);
    log::debug!("loop_count: {} diagnostics", ctx.diagnostics.len());
    ctx.diagnostics
}

struct LoopCountCtx {
    diagnostics: Vec<Diagnostic>,
}

impl LoopCountCtx {
    fn check_construct(&mut self, construct: &AccConstruct) {
        let directive = &construct.directive;
        let (count, source) = required_count(&directive.clauses);
        let mut stmt: &Stmt = &construct.body;
        for depth in 0..count {
            let Some(f) = next_for(stmt) else {
                let message = format!("statement after {} must be a for loop", directive.kind);
                let diag = match source {
                    Some((name, span)) => Diagnostic::error(stmt.span, message)
                        .with_code(codes::E0401)
                        .with_related(span, format!("as specified in '{name}' clause")),
                    None => Diagnostic::error(stmt.span, message).with_code(codes::E0202),
                };
                log::trace!("loop_count: found {depth} of {count} loops");
                self.diagnostics.push(diag);
                return;
            };
            stmt = &f.body;
        }
    }
}

impl<'ast> Visitor<'ast> for LoopCountCtx {
    fn visit_acc(&mut self, construct: &'ast AccConstruct) {
        if construct.directive.kind.has_loop() {
            self.check_construct(construct);
        }
        visit::walk_acc(self, construct);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diags(body: &str) -> Vec<Diagnostic> {
        let src = format!("void f() {{\n  int i, j, k;\n#pragma acc parallel\n  {{\n{body}\n  }}\n}}\n");
        let parsed = crate::parser::parse(&src);
        assert!(parsed.errors.is_empty(), "parse errors: {:?}", parsed.errors);
        check_loop_counts(&parsed.unit.unwrap())
    }

    #[test]
    fn perfectly_nested_loops_satisfy_collapse() {
        let d = diags(
            "#pragma acc loop collapse(3)\n  for (i = 0; i < 2; ++i)\n    for (j = 0; j < 2; ++j)\n      for (k = 0; k < 2; ++k) ;",
        );
        assert!(d.is_empty());
    }

    #[test]
    fn nested_directive_still_counts() {
        let d = diags(
            "#pragma acc loop tile(2,2)\n  for (i = 0; i < 2; ++i)\n#pragma acc loop seq\n    for (j = 0; j < 2; ++j) ;",
        );
        assert!(d.is_empty());
    }

    #[test]
    fn one_too_few_cites_clause() {
        let d = diags(
            "#pragma acc loop collapse(2)\n  for (i = 0; i < 2; ++i) {\n    for (j = 0; j < 2; ++j) ;\n  }",
        );
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].message, "statement after '#pragma acc loop' must be a for loop");
        assert_eq!(d[0].code, Some(codes::E0401));
        assert_eq!(d[0].related_spans.len(), 1);
        assert_eq!(d[0].related_spans[0].label, "as specified in 'collapse' clause");
    }

    #[test]
    fn missing_for_without_count_clause() {
        let d = diags("#pragma acc loop\n  while (i) ;");
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].code, Some(codes::E0202));
        assert!(d[0].related_spans.is_empty());
    }

    #[test]
    fn deep_chains_are_counted() {
        let mut body = String::from("#pragma acc loop collapse(16)\n");
        for _ in 0..16 {
            body.push_str("for (i = 0; i < 2; ++i)\n");
        }
        body.push_str(";");
        assert!(diags(&body).is_empty());
    }

    #[test]
    fn huge_collapse_is_one_diagnostic() {
        let d = diags("#pragma acc loop collapse(4000000000)\n  for (i = 0; i < 2; ++i) ;");
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].code, Some(codes::E0401));
    }

    #[test]
    fn tile_count_beats_collapse() {
        let parsed = crate::parser::parse(
            "void f() {\n  int i;\n#pragma acc loop collapse(1) tile(2,*,4)\n  for (i = 0; i < 2; ++i) ;\n}\n",
        );
        let unit = parsed.unit.unwrap();
        let Item::Function(f) = &unit.items[0] else { panic!() };
        let body = f.body.as_ref().unwrap();
        let StmtKind::Acc(c) = &body.stmts[1].kind else { panic!() };
        let (n, source) = required_count(&c.directive.clauses);
        assert_eq!(n, 3);
        assert_eq!(source.map(|s| s.0), Some(ClauseName::Tile));
    }
}
