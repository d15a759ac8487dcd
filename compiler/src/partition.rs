// partition.rs: Loop partitioning classification and nesting validation
//
// Classifies every effective loop directive (explicit gang/worker/vector
// levels, seq, auto, independent), finds its loop control variables, adds
// implicit partitioning levels within each compute construct, and checks
// partition nesting (including orphaned loops against the level of their
// function's `routine`), `break` in partitioned loops, and loop control
// variable restrictions.
//
// Preconditions: `resolved` was produced from `unit` by `resolve`.
// Postconditions: every effective loop directive has a `LoopInfo`.
// Failure modes: violations become diagnostics; classification still
//                completes for every loop.
// Side effects: none.

use std::collections::HashMap;

use crate::ast::*;
use crate::clause::{ClauseKind, EffectiveKind, Level, Levels, RoutineLevel};
use crate::config::LowerOptions;
use crate::diag::{codes, Diagnostic};
use crate::id::{DirId, VarId};
use crate::loop_count::{associated_loops, required_count};
use crate::resolve::ResolvedUnit;
use crate::visit::{self, Visitor};

// ── Public types ────────────────────────────────────────────────────────────

/// A loop control variable: assigned, not declared, in a `for` init.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lcv {
    pub var: VarId,
    /// The identifier in the `for` init.
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct LoopInfo {
    pub dir: DirId,
    pub explicit: Levels,
    pub implicit: Levels,
    pub seq: bool,
    pub auto: bool,
    /// Explicit `independent`.
    pub independent: bool,
    /// No `seq`, `auto` or `independent` clause was written.
    pub implicit_independent: bool,
    /// No enclosing compute construct in the function.
    pub orphaned: bool,
    pub lcvs: Vec<Lcv>,
    /// Associated `for` loops (collapse or tile count).
    pub assoc_count: usize,
}

impl LoopInfo {
    pub fn levels(&self) -> Levels {
        self.explicit.union(self.implicit)
    }

    /// Iterations may run out of order.
    pub fn is_partitionable(&self) -> bool {
        !self.seq && !self.auto
    }

    /// Whether every gang runs its own copy of the loop: partitioned across
    /// gangs, explicitly or implicitly.
    pub fn is_gang(&self) -> bool {
        self.is_partitionable() && self.levels().has(Level::Gang)
    }

    pub fn is_lcv(&self, var: VarId) -> bool {
        self.lcvs.iter().any(|l| l.var == var)
    }
}

#[derive(Debug, Default)]
pub struct PartitionInfo {
    pub loops: HashMap<DirId, LoopInfo>,
}

impl PartitionInfo {
    pub fn get(&self, dir: DirId) -> Option<&LoopInfo> {
        self.loops.get(&dir)
    }
}

#[derive(Debug)]
pub struct PartitionResult {
    pub info: PartitionInfo,
    pub diagnostics: Vec<Diagnostic>,
}

// ── Entry point ─────────────────────────────────────────────────────────────

pub fn partition(
    unit: &TranslationUnit,
    resolved: &ResolvedUnit,
    opts: &LowerOptions,
) -> PartitionResult {
    let mut ctx = PartitionCtx {
        resolved,
        opts,
        info: PartitionInfo::default(),
        diagnostics: Vec::new(),
        routine_fns: HashMap::new(),
    };
    visit::walk_unit(&mut ctx, unit);
    ctx.check_nesting();
    ctx.add_implicit_levels();
    log::debug!(
        "partition: {} loops, {} diagnostics",
        ctx.info.loops.len(),
        ctx.diagnostics.len()
    );
    PartitionResult {
        info: ctx.info,
        diagnostics: ctx.diagnostics,
    }
}

struct PartitionCtx<'a> {
    resolved: &'a ResolvedUnit,
    opts: &'a LowerOptions,
    info: PartitionInfo,
    diagnostics: Vec<Diagnostic>,
    /// `routine` directive → name of the function it attributes.
    routine_fns: HashMap<DirId, String>,
}

// ── Per-loop facts from the AST ─────────────────────────────────────────────

impl PartitionCtx<'_> {
    fn classify(&mut self, construct: &AccConstruct, dir: DirId) {
        let node = self.resolved.dir(dir);
        let mut explicit = Levels::NONE;
        let (mut seq, mut auto, mut independent) = (false, false, false);
        for c in &node.clauses {
            match c.kind {
                ClauseKind::Gang(_) => explicit.insert(Level::Gang),
                ClauseKind::Worker => explicit.insert(Level::Worker),
                ClauseKind::Vector => explicit.insert(Level::Vector),
                ClauseKind::Seq => seq = true,
                ClauseKind::Auto => auto = true,
                ClauseKind::Independent => independent = true,
                _ => {}
            }
        }
        let (assoc_count, _) = required_count(&construct.directive.clauses);
        let lcvs = self.collect_lcvs(&construct.body, assoc_count);
        let orphaned = self.resolved.compute_construct(dir).is_none();

        let info = LoopInfo {
            dir,
            explicit,
            implicit: Levels::NONE,
            seq,
            auto,
            independent,
            implicit_independent: !seq && !auto && !independent,
            orphaned,
            lcvs,
            assoc_count,
        };
        log::trace!(
            "partition: loop {:?} explicit={} seq={} auto={} orphaned={}",
            dir,
            info.explicit,
            seq,
            auto,
            orphaned
        );

        self.check_lcv_reductions(dir, &info);
        if info.is_partitionable() {
            if let Some(f) = construct.body.as_for() {
                if let Some(span) = first_break(&f.body) {
                    self.diagnostics.push(
                        Diagnostic::error(
                            span,
                            "'break' statement cannot be used in partitionable OpenACC for loop",
                        )
                        .with_code(codes::E0302),
                    );
                }
            }
        }
        self.info.loops.insert(dir, info);
    }

    fn collect_lcvs(&mut self, body: &Stmt, count: usize) -> Vec<Lcv> {
        let mut lcvs = Vec::new();
        for f in associated_loops(body, count) {
            let Some(ForInit::Expr(init)) = &f.init else {
                continue;
            };
            let ExprKind::Assign(_, lhs, _) = &init.ignore_parens().kind else {
                continue;
            };
            let lhs = lhs.ignore_parens();
            match &lhs.kind {
                ExprKind::Ident(id) => {
                    if let Some(&var) = self.resolved.uses.get(&id.span) {
                        lcvs.push(Lcv { var, span: id.span });
                    }
                }
                ExprKind::Member { .. } => self.diagnostics.push(
                    Diagnostic::error(
                        lhs.span,
                        "as OpenACC loop control variable, member expression is not supported",
                    )
                    .with_code(codes::E0303),
                ),
                // Other forms are left to the canonical loop checker.
                _ => {}
            }
        }
        lcvs
    }

    fn check_lcv_reductions(&mut self, dir: DirId, info: &LoopInfo) {
        let node = self.resolved.dir(dir);
        for c in &node.clauses {
            if !matches!(c.kind, ClauseKind::Reduction(..)) {
                continue;
            }
            for v in c.kind.supported_vars() {
                let Some(var) = self.resolved.root_var(v) else {
                    continue;
                };
                if let Some(lcv) = info.lcvs.iter().find(|l| l.var == var) {
                    let name = &self.resolved.var(var).name;
                    self.diagnostics.push(
                        Diagnostic::error(
                            v.span,
                            format!("OpenACC loop control variable '{name}' cannot have reduction"),
                        )
                        .with_code(codes::E0304)
                        .with_related(
                            lcv.span,
                            format!("'{name}' is an OpenACC loop control variable here"),
                        ),
                    );
                }
            }
        }
    }
}

/// First `break` that would leave the loop whose body is `stmt`.
fn first_break(stmt: &Stmt) -> Option<Span> {
    match &stmt.kind {
        StmtKind::Break => Some(stmt.span),
        StmtKind::Block(b) => b.stmts.iter().find_map(first_break),
        StmtKind::If { then, els, .. } => {
            first_break(then).or_else(|| els.as_deref().and_then(first_break))
        }
        StmtKind::Acc(c) => first_break(&c.body),
        _ => None,
    }
}

impl<'ast> Visitor<'ast> for PartitionCtx<'_> {
    fn visit_function(&mut self, func: &'ast FunctionDef) {
        if let Some(routine) = &func.routine {
            if let Some(&dir) = self.resolved.dir_by_span.get(&routine.span) {
                self.routine_fns.insert(dir, func.name.name.clone());
            }
        }
        visit::walk_function(self, func);
    }

    fn visit_acc(&mut self, construct: &'ast AccConstruct) {
        if let Some(dir) = self.resolved.loop_for(construct.directive.span) {
            self.classify(construct, dir);
        }
        visit::walk_acc(self, construct);
    }
}

// ── Nesting and implicit levels over the directive tree ────────────────────

impl PartitionCtx<'_> {
    /// Nearest enclosing loop in the same compute region that has explicit
    /// levels. Loops without explicit levels are transparent.
    fn enclosing_partitioned(&self, dir: DirId) -> Option<DirId> {
        for a in self.resolved.ancestors(dir) {
            match self.resolved.dir(a).kind {
                EffectiveKind::Loop => {
                    if self.info.get(a).is_some_and(|i| !i.explicit.is_empty()) {
                        return Some(a);
                    }
                }
                _ => return None,
            }
        }
        None
    }

    fn check_nesting(&mut self) {
        let mut loops: Vec<DirId> = self.info.loops.keys().copied().collect();
        loops.sort();
        for dir in loops {
            let Some(inner) = self.info.get(dir).and_then(|i| i.explicit.coarsest()) else {
                continue;
            };
            let Some(outer_dir) = self.enclosing_partitioned(dir) else {
                self.check_routine_level(dir, inner);
                continue;
            };
            let Some(outer) = self.info.get(outer_dir).and_then(|i| i.explicit.finest()) else {
                continue;
            };
            if inner < outer {
                continue;
            }
            let node = self.resolved.dir(dir);
            let outer_node = self.resolved.dir(outer_dir);
            self.diagnostics.push(
                Diagnostic::error(
                    node.span,
                    format!(
                        "'#pragma acc loop {}' cannot be nested within '#pragma acc {} {}'",
                        inner.as_str(),
                        outer_node.written.as_str(),
                        outer.as_str()
                    ),
                )
                .with_code(codes::E0301)
                .with_related(
                    outer_node.span,
                    format!("enclosing {} here", outer_node.display_name()),
                ),
            );
        }
    }

    /// An outermost orphaned loop may not use a level coarser than its
    /// function's `routine`.
    fn check_routine_level(&mut self, dir: DirId, level: Level) {
        let node = self.resolved.dir(dir);
        if self.info.get(dir).is_some_and(|i| !i.orphaned) {
            return;
        }
        let Some(routine) = node.routine else {
            return;
        };
        let routine_node = self.resolved.dir(routine);
        let Some(allowed) = routine_node.routine_level() else {
            return;
        };
        if RoutineLevel::Level(level) <= allowed {
            return;
        }
        let name = self
            .routine_fns
            .get(&routine)
            .map(String::as_str)
            .unwrap_or_default();
        self.diagnostics.push(
            Diagnostic::error(
                node.span,
                format!(
                    "function '{name}' has '#pragma acc routine {}' but contains '#pragma acc loop {}'",
                    allowed.as_str(),
                    level.as_str()
                ),
            )
            .with_code(codes::E0305)
            .with_related(
                routine_node.span,
                format!("'#pragma acc routine' for function '{name}' appears here"),
            ),
        );
    }

    fn children(&self) -> Vec<Vec<DirId>> {
        let mut children = vec![Vec::new(); self.resolved.dirs.len()];
        for d in &self.resolved.dirs {
            if let Some(p) = d.parent {
                children[p.index()].push(d.id);
            }
        }
        children
    }

    fn explicit_within(&self, children: &[Vec<DirId>], dir: DirId) -> Levels {
        children[dir.index()].iter().fold(Levels::NONE, |acc, &c| {
            let own = self.info.get(c).map_or(Levels::NONE, |i| i.explicit);
            acc.union(own).union(self.explicit_within(children, c))
        })
    }

    fn add_implicit_levels(&mut self) {
        let children = self.children();
        let all = Levels::of(&[Level::Gang, Level::Worker, Level::Vector]);
        let roots: Vec<DirId> = self
            .resolved
            .dirs
            .iter()
            .filter(|d| d.kind == EffectiveKind::Parallel)
            .map(|d| d.id)
            .collect();
        for root in roots {
            self.add_below(&children, root, all);
        }
    }

    fn add_below(&mut self, children: &[Vec<DirId>], dir: DirId, allowed: Levels) {
        for &child in &children[dir.index()] {
            let body_allowed = match self.info.get(child) {
                Some(info) if info.is_partitionable() => {
                    let nested = info.explicit.union(self.explicit_within(children, child));
                    let candidates = match nested.coarsest() {
                        Some(cutoff) => allowed.intersect(Levels::coarser_than(cutoff)),
                        None => allowed,
                    };
                    let add = self.pick_levels(info.explicit, candidates);
                    let levels = info.explicit.union(add);
                    if let Some(info) = self.info.loops.get_mut(&child) {
                        info.implicit = add;
                    }
                    log::trace!("partition: loop {child:?} implicit={add}");
                    match levels.finest() {
                        Some(f) => allowed.intersect(Levels::finer_than(f)),
                        None => allowed,
                    }
                }
                _ => allowed,
            };
            if !body_allowed.is_empty() {
                self.add_below(children, child, body_allowed);
            }
        }
    }

    fn pick_levels(&self, explicit: Levels, candidates: Levels) -> Levels {
        let mut add = Levels::NONE;
        if candidates.has(Level::Gang) {
            add.insert(Level::Gang);
        }
        if candidates.has(Level::Vector) && self.opts.implicit_vector.on_outer() {
            add.insert(Level::Vector);
        }
        let has_vector = explicit.union(add).has(Level::Vector);
        let worker = self.opts.implicit_worker.on_outer()
            || (self.opts.implicit_worker.on_vector() && has_vector);
        if candidates.has(Level::Worker) && worker {
            add.insert(Level::Worker);
        }
        add
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
