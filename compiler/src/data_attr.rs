// data_attr.rs: Implicit data attributes
//
// Computes the implicit data-sharing and data-mapping clauses of every
// `parallel` and `loop` effective directive: `nomap`, `copy`, `shared`,
// `firstprivate`, predetermined `private` for loop control variables, and
// gang reductions implied on a `parallel` by reductions of its loops.
//
// Preconditions: `resolved` and `partition` come from the same unit.
// Postconditions: each directive's implicit clauses are ordered nomap, copy,
//                 shared, firstprivate, private, reduction (predetermined
//                 clauses first), variables in first-reference order.
// Failure modes: none. Explicit clause conflicts are reported by `check`.
// Side effects: none.

use std::collections::HashMap;

use crate::ast::{ExprKind, Span};
use crate::clause::{ClauseKind, DataClause, EffectiveKind, ReductionOp};
use crate::id::{DirId, VarId};
use crate::partition::PartitionInfo;
use crate::resolve::{DirNode, ResolvedUnit};

// ── Public types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImplicitKind {
    Nomap,
    Copy,
    Shared,
    Firstprivate,
    Private,
    Reduction(ReductionOp),
}

impl ImplicitKind {
    fn rank(self) -> u8 {
        match self {
            ImplicitKind::Nomap => 0,
            ImplicitKind::Copy => 1,
            ImplicitKind::Shared => 2,
            ImplicitKind::Firstprivate => 3,
            ImplicitKind::Private => 4,
            ImplicitKind::Reduction(_) => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImplicitKind::Nomap => "nomap",
            ImplicitKind::Copy => "copy",
            ImplicitKind::Shared => "shared",
            ImplicitKind::Firstprivate => "firstprivate",
            ImplicitKind::Private => "private",
            ImplicitKind::Reduction(_) => "reduction",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitClause {
    pub kind: ImplicitKind,
    pub vars: Vec<VarId>,
    /// Loop control variable privatization rather than an ordinary
    /// implicit attribute.
    pub predetermined: bool,
}

/// The data mapping clause that applies to a variable at some directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleDma {
    pub dir: DirId,
    pub clause: DataClause,
    /// The clause named part of the variable (a subarray or member).
    pub partial: bool,
    pub span: Span,
}

/// A loop reduction whose variable is the same storage at the enclosing
/// compute construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReachingReduction {
    pub var: VarId,
    pub op: ReductionOp,
    pub loop_dir: DirId,
    pub span: Span,
}

#[derive(Debug, Default)]
pub struct DataAttrInfo {
    implicit: HashMap<DirId, Vec<ImplicitClause>>,
}

impl DataAttrInfo {
    pub fn implicit(&self, dir: DirId) -> &[ImplicitClause] {
        self.implicit.get(&dir).map_or(&[], Vec::as_slice)
    }

    /// Implicit attribute of `var` at `dir` that satisfies `pred`.
    pub fn find(&self, dir: DirId, var: VarId, pred: impl Fn(ImplicitKind) -> bool) -> Option<ImplicitKind> {
        self.implicit(dir)
            .iter()
            .find(|c| pred(c.kind) && c.vars.contains(&var))
            .map(|c| c.kind)
    }

    pub fn has(&self, dir: DirId, var: VarId, kind: ImplicitKind) -> bool {
        self.find(dir, var, |k| k == kind).is_some()
    }
}

// ── Clause queries shared with later passes ────────────────────────────────

/// Root variables named by clauses of `node` that satisfy `pred`, in order.
pub fn clause_vars(
    resolved: &ResolvedUnit,
    node: &DirNode,
    pred: impl Fn(&ClauseKind) -> bool,
) -> Vec<VarId> {
    let mut out = Vec::new();
    for c in node.clauses.iter().filter(|c| pred(&c.kind)) {
        for v in c.kind.supported_vars() {
            if let Some(var) = resolved.root_var(v) {
                if !out.contains(&var) {
                    out.push(var);
                }
            }
        }
    }
    out
}

pub fn has_clause_var(
    resolved: &ResolvedUnit,
    node: &DirNode,
    var: VarId,
    pred: impl Fn(&ClauseKind) -> bool,
) -> bool {
    node.clauses
        .iter()
        .filter(|c| pred(&c.kind))
        .flat_map(|c| c.kind.supported_vars())
        .any(|v| resolved.root_var(v) == Some(var))
}

pub fn is_private(kind: &ClauseKind) -> bool {
    matches!(kind, ClauseKind::Private(_))
}

pub fn is_firstprivate(kind: &ClauseKind) -> bool {
    matches!(kind, ClauseKind::Firstprivate(_))
}

pub fn is_reduction(kind: &ClauseKind) -> bool {
    matches!(kind, ClauseKind::Reduction(..))
}

/// Explicit data mapping clause for `var` on `dir`.
pub fn dma_on(resolved: &ResolvedUnit, dir: DirId, var: VarId) -> Option<VisibleDma> {
    let node = resolved.dir(dir);
    for c in &node.clauses {
        let ClauseKind::Data(clause, _) = &c.kind else {
            continue;
        };
        for v in c.kind.supported_vars() {
            if resolved.root_var(v) == Some(var) {
                return Some(VisibleDma {
                    dir,
                    clause: *clause,
                    partial: !matches!(v.ignore_parens().kind, ExprKind::Ident(_)),
                    span: v.span,
                });
            }
        }
    }
    None
}

/// Innermost data mapping clause for `var` on `dir` or an enclosing
/// directive.
pub fn visible_dma(resolved: &ResolvedUnit, dir: DirId, var: VarId) -> Option<VisibleDma> {
    std::iter::once(dir)
        .chain(resolved.ancestors(dir))
        .find_map(|d| dma_on(resolved, d, var))
}

/// Whether `dir` gives each iteration or gang its own copy of `var`.
pub fn privatizes(
    resolved: &ResolvedUnit,
    partition: &PartitionInfo,
    dir: DirId,
    var: VarId,
) -> bool {
    let node = resolved.dir(dir);
    match node.kind {
        EffectiveKind::Loop => {
            has_clause_var(resolved, node, var, is_private)
                || partition
                    .get(dir)
                    .is_some_and(|l| l.is_partitionable() && l.is_lcv(var))
        }
        EffectiveKind::Parallel => {
            has_clause_var(resolved, node, var, |k| is_private(k) || is_firstprivate(k))
        }
        _ => false,
    }
}

/// Whether a directive strictly between `inner` and `outer` privatizes
/// `var`. `outer` must enclose `inner`.
pub fn privatized_between(
    resolved: &ResolvedUnit,
    partition: &PartitionInfo,
    inner: DirId,
    outer: DirId,
    var: VarId,
) -> bool {
    resolved
        .ancestors(inner)
        .take_while(|&d| d != outer)
        .any(|d| privatizes(resolved, partition, d, var))
}

/// Innermost directive within `root` (inclusive) whose directive line or
/// associated statement contains `span`.
pub fn innermost_containing(resolved: &ResolvedUnit, root: DirId, span: Span) -> DirId {
    resolved
        .dirs
        .iter()
        .filter(|d| d.span.start <= span.start && span.end <= d.stmt_span.end)
        .filter(|d| d.id == root || resolved.ancestors(d.id).any(|a| a == root))
        .max_by_key(|d| (d.span.start, d.id))
        .map_or(root, |d| d.id)
}

/// Whether the reference at `span` inside `dir` is to storage privatized by
/// a directive nested in `dir`.
fn ref_privatized_below(
    resolved: &ResolvedUnit,
    partition: &PartitionInfo,
    dir: DirId,
    var: VarId,
    span: Span,
) -> bool {
    let inner = innermost_containing(resolved, dir, span);
    if inner == dir {
        return false;
    }
    privatizes(resolved, partition, inner, var) || privatized_between(resolved, partition, inner, dir, var)
}

/// Loop reductions within compute construct `parallel` whose variables are
/// the construct's own storage, in source order.
pub fn reaching_reductions(
    resolved: &ResolvedUnit,
    partition: &PartitionInfo,
    parallel: DirId,
) -> Vec<ReachingReduction> {
    let mut out = Vec::new();
    for node in &resolved.dirs {
        if node.kind != EffectiveKind::Loop || resolved.compute_construct(node.id) != Some(parallel) {
            continue;
        }
        for c in &node.clauses {
            let ClauseKind::Reduction(op, _) = &c.kind else {
                continue;
            };
            for v in c.kind.supported_vars() {
                let Some(var) = resolved.root_var(v) else {
                    continue;
                };
                if resolved.declared_within(var, parallel)
                    || privatized_between(resolved, partition, node.id, parallel, var)
                {
                    continue;
                }
                out.push(ReachingReduction {
                    var,
                    op: *op,
                    loop_dir: node.id,
                    span: v.span,
                });
            }
        }
    }
    out
}

// ── Entry point ─────────────────────────────────────────────────────────────

pub fn data_attrs(resolved: &ResolvedUnit, partition: &PartitionInfo) -> DataAttrInfo {
    let mut info = DataAttrInfo::default();
    for node in &resolved.dirs {
        let clauses = match node.kind {
            EffectiveKind::Parallel => parallel_attrs(resolved, partition, node),
            EffectiveKind::Loop => loop_attrs(resolved, partition, node),
            _ => continue,
        };
        if !clauses.is_empty() {
            log::trace!("data_attr: {:?} has {} implicit clauses", node.id, clauses.len());
            info.implicit.insert(node.id, clauses);
        }
    }
    log::debug!("data_attr: {} directives with implicit clauses", info.implicit.len());
    info
}

#[derive(Default)]
struct Builder {
    clauses: Vec<ImplicitClause>,
}

impl Builder {
    fn add(&mut self, kind: ImplicitKind, var: VarId, predetermined: bool) {
        let shared_clause = !matches!(kind, ImplicitKind::Reduction(_));
        if shared_clause {
            if let Some(c) = self
                .clauses
                .iter_mut()
                .find(|c| c.kind == kind && c.predetermined == predetermined)
            {
                if !c.vars.contains(&var) {
                    c.vars.push(var);
                }
                return;
            }
        }
        self.clauses.push(ImplicitClause {
            kind,
            vars: vec![var],
            predetermined,
        });
    }

    fn finish(mut self) -> Vec<ImplicitClause> {
        // Stable, so reductions keep first-reference order.
        self.clauses
            .sort_by_key(|c| (!c.predetermined, c.kind.rank()));
        self.clauses
    }
}

/// Variables referenced in `node`'s construct that belong to it, deduplicated
/// in first-reference order.
fn owned_refs(resolved: &ResolvedUnit, partition: &PartitionInfo, node: &DirNode) -> Vec<(VarId, bool)> {
    let mut out: Vec<(VarId, bool)> = Vec::new();
    for r in &node.refs {
        if resolved.declared_within(r.var, node.id)
            || ref_privatized_below(resolved, partition, node.id, r.var, r.span)
        {
            continue;
        }
        match out.iter_mut().find(|(v, _)| *v == r.var) {
            Some(entry) => entry.1 |= r.via_member,
            None => out.push((r.var, r.via_member)),
        }
    }
    out
}

fn parallel_attrs(resolved: &ResolvedUnit, partition: &PartitionInfo, node: &DirNode) -> Vec<ImplicitClause> {
    let mut candidates = owned_refs(resolved, partition, node);
    let combined_reductions = node
        .partner
        .map(|l| clause_vars(resolved, resolved.dir(l), is_reduction))
        .unwrap_or_default();
    for var in clause_vars(resolved, node, is_reduction)
        .into_iter()
        .chain(combined_reductions.iter().copied())
    {
        if !candidates.iter().any(|(v, _)| *v == var) && !resolved.declared_within(var, node.id) {
            candidates.push((var, false));
        }
    }

    let mut gang_ops: Vec<(VarId, ReductionOp)> = Vec::new();
    for r in reaching_reductions(resolved, partition, node.id) {
        if !gang_ops.iter().any(|(v, _)| *v == r.var) {
            gang_ops.push((r.var, r.op));
        }
    }
    let gang_op = |var: VarId| gang_ops.iter().find(|(v, _)| *v == var).map(|(_, op)| *op);
    let shared_or_reduction = |b: &mut Builder, var: VarId| match gang_op(var) {
        Some(op) => b.add(ImplicitKind::Reduction(op), var, false),
        None => b.add(ImplicitKind::Shared, var, false),
    };

    let mut b = Builder::default();
    for (var, via_member) in candidates {
        let explicit_dsa = has_clause_var(resolved, node, var, |k| is_private(k) || is_firstprivate(k));
        let explicit_reduction = has_clause_var(resolved, node, var, is_reduction);
        let own_dma = dma_on(resolved, node.id, var).is_some();
        let enclosing_dma = node
            .parent
            .and_then(|p| visible_dma(resolved, p, var))
            .is_some();
        let info = resolved.var(var);

        if explicit_dsa {
            b.add(ImplicitKind::Nomap, var, false);
        } else if explicit_reduction {
            if own_dma {
                continue;
            }
            if enclosing_dma {
                b.add(ImplicitKind::Nomap, var, false);
            } else {
                b.add(ImplicitKind::Copy, var, false);
            }
        } else if own_dma {
            shared_or_reduction(&mut b, var);
        } else if enclosing_dma {
            b.add(ImplicitKind::Nomap, var, false);
            shared_or_reduction(&mut b, var);
        } else if combined_reductions.contains(&var) || via_member || !info.ty.is_scalar() {
            b.add(ImplicitKind::Copy, var, false);
            shared_or_reduction(&mut b, var);
        } else {
            b.add(ImplicitKind::Nomap, var, false);
            b.add(ImplicitKind::Firstprivate, var, false);
        }
    }
    b.finish()
}

fn loop_attrs(resolved: &ResolvedUnit, partition: &PartitionInfo, node: &DirNode) -> Vec<ImplicitClause> {
    let Some(info) = partition.get(node.id) else {
        return Vec::new();
    };
    let mut b = Builder::default();
    for (var, _) in owned_refs(resolved, partition, node) {
        if has_clause_var(resolved, node, var, |k| is_private(k) || is_reduction(k)) {
            continue;
        }
        if info.is_lcv(var) && info.is_partitionable() {
            b.add(ImplicitKind::Private, var, true);
        } else {
            b.add(ImplicitKind::Shared, var, false);
        }
    }
    b.finish()
}

// ── Tests ───────────────────────────────────────────────────────────────────
