// lower.rs: OpenMP synthesis
//
// Translates every effective OpenACC directive into its OpenMP form: data
// becomes `target data`, parallel becomes `target teams`, and a loop becomes
// the worksharing directive for its partitioning levels, or nothing when it
// runs sequentially. `update`, `enter data` and `exit data` become their
// `target` counterparts and `routine` becomes `declare target`. Explicit
// clauses are translated in the order written, then the implicit attributes
// computed by `data_attr`.
//
// Preconditions: `resolved`, `partition` and `data` come from the same unit
//   and the unit produced no error diagnostics.
// Postconditions: every effective directive has a `DirLowering`; `Cert`
//   records the obligations checked on the result.
// Failure modes: none; obligation failures show up in `Cert`.
// Side effects: warnings for clauses the translation ignores.

use std::collections::{HashMap, HashSet};

use crate::ast::{Expr, ExprKind, UnaryOp};
use crate::clause::{
    Clause, ClauseKind, DataClause, EffectiveKind, GangStatic, Level, Levels, TileSize,
};
use crate::config::{LowerOptions, NoCreateOmp, UpdatePresentOmp};
use crate::data_attr::{visible_dma, DataAttrInfo, ImplicitClause, ImplicitKind};
use crate::diag::{codes, DiagLevel, Diagnostic};
use crate::id::{DirId, VarId};
use crate::omp::{MapType, OmpClause, OmpClauseKind, OmpDirective, OmpItem, OmpKind, OmpTile};
use crate::partition::{LoopInfo, PartitionInfo};
use crate::resolve::{DirNode, ResolvedUnit};

// ── Output types ────────────────────────────────────────────────────────────

/// Result of OpenMP synthesis.
pub struct LowerResult {
    pub lowered: LoweredUnit,
    pub cert: Cert,
    pub diagnostics: Vec<Diagnostic>,
}

impl LowerResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.level == DiagLevel::Error)
    }
}

/// A statement placed before the translated directive, in a new `{ }`
/// scope enclosing both.
#[derive(Debug, Clone, PartialEq)]
pub enum Prelude {
    /// Uninitialized declaration shadowing a privatized variable.
    Decl(VarId),
    /// `(void)(expr);` for a dropped clause argument with side effects.
    Discard(Expr),
}

/// The translation of one effective directive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirLowering {
    pub omp: Option<OmpDirective>,
    /// `#pragma omp tile` placed between the directive and its loop.
    pub tile: Option<OmpTile>,
    pub prelude: Vec<Prelude>,
}

impl DirLowering {
    /// No OpenMP directive line at all.
    pub fn is_discarded(&self) -> bool {
        self.omp.is_none() && self.tile.is_none()
    }

    /// The translation adds statements, not just directive lines.
    pub fn changes_structure(&self) -> bool {
        !self.prelude.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct LoweredUnit {
    dirs: HashMap<DirId, DirLowering>,
}

impl LoweredUnit {
    pub fn get(&self, dir: DirId) -> Option<&DirLowering> {
        self.dirs.get(&dir)
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

/// Evidence for the obligations of the translated unit.
#[derive(Debug, Clone)]
pub struct Cert {
    /// Every effective directive has a translation.
    pub complete: bool,
    /// No variable is both redeclared in a prelude and listed in `private`.
    pub single_privatization: bool,
    /// No `reduction` on a plain `distribute`.
    pub distribute_without_reduction: bool,
    /// Shared non-pointer scalars on `target teams` are mapped or covered by
    /// `defaultmap(tofrom: scalar)`.
    pub scalars_stay_shared: bool,
}

impl Cert {
    pub fn all_pass(&self) -> bool {
        self.complete
            && self.single_privatization
            && self.distribute_without_reduction
            && self.scalars_stay_shared
    }
}

// ── Public entry point ──────────────────────────────────────────────────────

pub fn lower(
    resolved: &ResolvedUnit,
    partition: &PartitionInfo,
    data: &DataAttrInfo,
    opts: &LowerOptions,
) -> LowerResult {
    let mut ctx = LowerCtx {
        resolved,
        partition,
        data,
        opts,
        lowered: HashMap::new(),
        diagnostics: Vec::new(),
    };
    for node in &resolved.dirs {
        let lowering = match node.kind {
            EffectiveKind::Data => ctx.lower_data(node),
            EffectiveKind::Parallel => ctx.lower_parallel(node),
            EffectiveKind::Loop => ctx.lower_loop(node),
            EffectiveKind::Update => ctx.lower_update(node),
            EffectiveKind::EnterData => ctx.lower_standalone_data(node, OmpKind::TargetEnterData),
            EffectiveKind::ExitData => ctx.lower_standalone_data(node, OmpKind::TargetExitData),
            EffectiveKind::Routine => DirLowering {
                omp: Some(OmpDirective {
                    kind: OmpKind::DeclareTarget,
                    clauses: Vec::new(),
                }),
                ..DirLowering::default()
            },
        };
        log::trace!(
            "lower: {:?} {} -> {}",
            node.id,
            node.kind.as_str(),
            lowering.omp.as_ref().map_or("discarded", |d| d.kind.as_str())
        );
        ctx.lowered.insert(node.id, lowering);
    }
    let lowered = LoweredUnit { dirs: ctx.lowered };
    let cert = verify(resolved, &lowered);
    log::debug!(
        "lower: {} directives, obligations {}",
        lowered.len(),
        if cert.all_pass() { "hold" } else { "violated" }
    );
    LowerResult {
        lowered,
        cert,
        diagnostics: ctx.diagnostics,
    }
}

/// Levels a loop keeps in OpenMP. `auto` runs sequentially; with `tile`
/// the element-loop levels are dropped.
pub fn lowered_levels(info: &LoopInfo, tiled: bool) -> Levels {
    if !info.is_partitionable() {
        return Levels::NONE;
    }
    let mut levels = info.levels();
    if tiled {
        if !levels.has(Level::Vector) {
            levels.remove(Level::Worker);
        }
        levels.remove(Level::Vector);
    }
    levels
}

fn tile_clause(clauses: &[Clause]) -> Option<&[TileSize]> {
    clauses.iter().find_map(|c| match &c.kind {
        ClauseKind::Tile(sizes) => Some(sizes.as_slice()),
        _ => None,
    })
}

fn has_side_effects(e: &Expr) -> bool {
    match &e.kind {
        ExprKind::Call(..) | ExprKind::Assign(..) | ExprKind::Postfix(..) => true,
        ExprKind::Unary(UnaryOp::PreInc | UnaryOp::PreDec, _) => true,
        ExprKind::Paren(x) | ExprKind::Unary(_, x) => has_side_effects(x),
        ExprKind::Binary(_, l, r) | ExprKind::Index(l, r) => has_side_effects(l) || has_side_effects(r),
        ExprKind::Ternary(c, t, f) => has_side_effects(c) || has_side_effects(t) || has_side_effects(f),
        ExprKind::Member { base, .. } => has_side_effects(base),
        _ => false,
    }
}

fn exprs(vars: &[Expr]) -> Vec<OmpItem> {
    vars.iter().cloned().map(OmpItem::Expr).collect()
}

fn var_items(vars: &[VarId]) -> Vec<OmpItem> {
    vars.iter().copied().map(OmpItem::Var).collect()
}

// ── Lowering context ────────────────────────────────────────────────────────

struct LowerCtx<'a> {
    resolved: &'a ResolvedUnit,
    partition: &'a PartitionInfo,
    data: &'a DataAttrInfo,
    opts: &'a LowerOptions,
    lowered: HashMap<DirId, DirLowering>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> LowerCtx<'a> {
    fn map_type(&self, clause: DataClause) -> MapType {
        match clause {
            DataClause::Present => MapType::Present,
            DataClause::Copy => MapType::Tofrom,
            DataClause::Copyin => MapType::To,
            DataClause::Copyout => MapType::From,
            DataClause::Create => MapType::Create,
            DataClause::NoCreate => match self.opts.no_create_omp {
                NoCreateOmp::NoAlloc => MapType::NoCreate,
                NoCreateOmp::Alloc => MapType::Create,
            },
            DataClause::Delete => MapType::Release,
        }
    }

    // ── standalone data directives ──

    /// `enter data` and `exit data`: maps without the `hold` modifier, since
    /// the data outlives the directive.
    fn lower_standalone_data(&mut self, node: &DirNode, kind: OmpKind) -> DirLowering {
        let mut clauses = Vec::new();
        for c in &node.clauses {
            let clause = match &c.kind {
                ClauseKind::Data(dc, vars) => {
                    let ty = match dc {
                        DataClause::Copyin => MapType::EnterTo,
                        DataClause::Create => MapType::Alloc,
                        DataClause::Copyout => MapType::ExitFrom,
                        other => self.map_type(*other),
                    };
                    OmpClauseKind::Map(ty, exprs(vars))
                }
                ClauseKind::If(e) => OmpClauseKind::If(e.clone()),
                _ => continue,
            };
            clauses.push(OmpClause::explicit(clause));
        }
        DirLowering {
            omp: Some(OmpDirective { kind, clauses }),
            ..DirLowering::default()
        }
    }

    fn lower_update(&mut self, node: &DirNode) -> DirLowering {
        let if_present = node
            .clauses
            .iter()
            .any(|c| matches!(c.kind, ClauseKind::IfPresent));
        let present = !if_present && self.opts.update_present_omp == UpdatePresentOmp::Present;
        let mut clauses = Vec::new();
        for c in &node.clauses {
            let kind = match &c.kind {
                ClauseKind::Motion(motion, vars) => {
                    if present {
                        self.diagnostics.push(
                            Diagnostic::warning(
                                c.span,
                                format!(
                                    "the OpenACC '{}' clause translation uses the 'present' motion modifier",
                                    motion.as_str()
                                ),
                            )
                            .with_code(codes::W0702)
                            .with_related(
                                c.span,
                                "an alternative OpenMP translation can be specified with, for example, '--update-present-omp=no-present'",
                            ),
                        );
                    }
                    OmpClauseKind::Motion {
                        to_device: !motion.to_host(),
                        present,
                        items: exprs(vars),
                    }
                }
                ClauseKind::If(e) => OmpClauseKind::If(e.clone()),
                _ => continue,
            };
            clauses.push(OmpClause::explicit(kind));
        }
        DirLowering {
            omp: Some(OmpDirective {
                kind: OmpKind::TargetUpdate,
                clauses,
            }),
            ..DirLowering::default()
        }
    }

    fn lower_data(&mut self, node: &DirNode) -> DirLowering {
        let mut clauses = Vec::new();
        for c in &node.clauses {
            match &c.kind {
                ClauseKind::Data(dc, vars) => {
                    clauses.push(OmpClause::explicit(OmpClauseKind::Map(self.map_type(*dc), exprs(vars))))
                }
                ClauseKind::If(e) => clauses.push(OmpClause::explicit(OmpClauseKind::If(e.clone()))),
                _ => {}
            }
        }
        DirLowering {
            omp: Some(OmpDirective {
                kind: OmpKind::TargetData,
                clauses,
            }),
            ..DirLowering::default()
        }
    }

    // ── target teams ──

    /// Loops of compute construct `parallel` that keep an explicit worker
    /// level.
    fn explicit_worker_loops(&self, parallel: DirId) -> Vec<DirId> {
        let resolved = self.resolved;
        resolved
            .dirs
            .iter()
            .filter(|d| d.kind == EffectiveKind::Loop && resolved.compute_construct(d.id) == Some(parallel))
            .filter_map(|d| {
                let info = self.partition.get(d.id)?;
                let levels = lowered_levels(info, tile_clause(&d.clauses).is_some());
                (levels.has(Level::Worker) && info.explicit.has(Level::Worker)).then_some(d.id)
            })
            .collect()
    }

    fn lower_parallel(&mut self, node: &DirNode) -> DirLowering {
        let mut clauses = Vec::new();
        let mut prelude = Vec::new();
        for c in &node.clauses {
            let kind = match &c.kind {
                ClauseKind::Data(dc, vars) => OmpClauseKind::Map(self.map_type(*dc), exprs(vars)),
                ClauseKind::Private(vars) => OmpClauseKind::Private(exprs(vars)),
                ClauseKind::Firstprivate(vars) => OmpClauseKind::Firstprivate(exprs(vars)),
                ClauseKind::Reduction(op, vars) => OmpClauseKind::Reduction(*op, exprs(vars)),
                ClauseKind::If(e) => OmpClauseKind::If(e.clone()),
                ClauseKind::NumGangs(e) => OmpClauseKind::NumTeams(e.clone()),
                ClauseKind::NumWorkers(e) => {
                    if e.const_int().is_some() && !self.explicit_worker_loops(node.id).is_empty() {
                        log::trace!("lower: num_workers moves to worker loops of {:?}", node.id);
                        continue;
                    }
                    OmpClauseKind::ThreadLimit(e.clone())
                }
                ClauseKind::VectorLength(e) => {
                    if e.const_int().is_none() {
                        self.diagnostics.push(
                            Diagnostic::warning(
                                e.span,
                                "'vector_length' clause ignored in OpenMP translation because its argument is not an integer constant",
                            )
                            .with_code(codes::W0701),
                        );
                        if has_side_effects(e) {
                            prelude.push(Prelude::Discard(e.clone()));
                        }
                    }
                    continue;
                }
                _ => continue,
            };
            clauses.push(OmpClause::explicit(kind));
        }
        for ic in self.data.implicit(node.id) {
            if let Some(c) = self.parallel_implicit(node, ic) {
                clauses.push(c);
            }
        }
        if self.needs_defaultmap(node.id, &clauses) {
            clauses.push(OmpClause::explicit(OmpClauseKind::DefaultmapTofromScalar));
        }
        DirLowering {
            omp: Some(OmpDirective {
                kind: OmpKind::TargetTeams,
                clauses,
            }),
            tile: None,
            prelude,
        }
    }

    fn parallel_implicit(&self, node: &DirNode, ic: &ImplicitClause) -> Option<OmpClause> {
        let kind = match ic.kind {
            ImplicitKind::Nomap => return self.nomap(node, &ic.vars),
            ImplicitKind::Copy => OmpClauseKind::Map(MapType::Tofrom, var_items(&ic.vars)),
            ImplicitKind::Shared => return Some(OmpClause::implicit(OmpClauseKind::Shared(var_items(&ic.vars)))),
            ImplicitKind::Firstprivate => OmpClauseKind::Firstprivate(var_items(&ic.vars)),
            ImplicitKind::Private => OmpClauseKind::Private(var_items(&ic.vars)),
            ImplicitKind::Reduction(op) => OmpClauseKind::Reduction(op, var_items(&ic.vars)),
        };
        Some(OmpClause::explicit(kind))
    }

    /// Map for variables whose data is mapped by an enclosing directive.
    /// Only a visible `no_create` needs one: the data may be absent.
    fn nomap(&self, node: &DirNode, vars: &[VarId]) -> Option<OmpClause> {
        let parent = node.parent?;
        let resolved = self.resolved;
        let mut items = Vec::new();
        for &var in vars {
            if !self.data.has(node.id, var, ImplicitKind::Shared) {
                continue;
            }
            let Some(dma) = visible_dma(resolved, parent, var) else {
                continue;
            };
            if dma.clause != DataClause::NoCreate {
                continue;
            }
            match self.opts.no_create_omp {
                NoCreateOmp::NoAlloc => items.push(if dma.partial {
                    OmpItem::ZeroSection(var)
                } else {
                    OmpItem::Var(var)
                }),
                NoCreateOmp::Alloc => {
                    if !dma.partial && resolved.var(var).ty.is_pointer() {
                        items.push(OmpItem::Var(var));
                    }
                }
            }
        }
        if items.is_empty() {
            return None;
        }
        let ty = match self.opts.no_create_omp {
            NoCreateOmp::NoAlloc => MapType::NoAlloc,
            NoCreateOmp::Alloc => MapType::Alloc,
        };
        Some(OmpClause::explicit(OmpClauseKind::Map(ty, items)))
    }

    fn needs_defaultmap(&self, dir: DirId, clauses: &[OmpClause]) -> bool {
        let resolved = self.resolved;
        let mapped: HashSet<VarId> = clauses
            .iter()
            .filter(|c| matches!(c.kind, OmpClauseKind::Map(..)))
            .flat_map(|c| c.kind.items())
            .filter_map(|item| match item {
                OmpItem::Expr(e) => resolved.root_var(e),
                OmpItem::Var(v) | OmpItem::ZeroSection(v) => Some(*v),
            })
            .collect();
        self.data.implicit(dir).iter().any(|ic| {
            ic.kind == ImplicitKind::Shared
                && ic.vars.iter().any(|&v| {
                    let ty = &resolved.var(v).ty;
                    ty.is_scalar() && !ty.is_pointer() && !mapped.contains(&v)
                })
        })
    }

    // ── loops ──

    fn lower_loop(&mut self, node: &DirNode) -> DirLowering {
        let Some(info) = self.partition.get(node.id) else {
            return DirLowering::default();
        };
        let tile = tile_clause(&node.clauses).map(|sizes| OmpTile {
            sizes: sizes
                .iter()
                .map(|s| match s {
                    TileSize::Expr(e) if e.const_int().is_some() => Some(e.clone()),
                    _ => None,
                })
                .collect(),
        });
        let levels = lowered_levels(info, tile.is_some());
        let kind = OmpKind::for_levels(levels);

        let privates = self.private_vars(node);
        let hoisted: Vec<VarId> = match kind {
            None => privates,
            Some(k) if k.has_simd() => privates.into_iter().filter(|&v| info.is_lcv(v)).collect(),
            Some(_) => Vec::new(),
        };
        let prelude = hoisted.iter().copied().map(Prelude::Decl).collect();

        let Some(kind) = kind else {
            return DirLowering {
                omp: None,
                tile,
                prelude,
            };
        };

        let mut clauses = Vec::new();
        let compute = self.resolved.compute_construct(node.id).map(|p| self.resolved.dir(p));
        if let Some(parallel) = compute {
            if levels.has(Level::Worker) && info.explicit.has(Level::Worker) {
                if let Some(n) = parallel.clauses.iter().find_map(|c| match &c.kind {
                    ClauseKind::NumWorkers(e) => e.const_int(),
                    _ => None,
                }) {
                    clauses.push(OmpClause::explicit(OmpClauseKind::NumThreads(n)));
                }
            }
            if kind.has_simd() {
                if let Some(n) = parallel.clauses.iter().find_map(|c| match &c.kind {
                    ClauseKind::VectorLength(e) => e.const_int(),
                    _ => None,
                }) {
                    clauses.push(OmpClause::explicit(OmpClauseKind::Simdlen(n)));
                }
            }
        }

        let keep = |items: Vec<OmpItem>| -> Vec<OmpItem> {
            items
                .into_iter()
                .filter(|item| match item {
                    OmpItem::Expr(e) => self.resolved.root_var(e).map_or(true, |v| !hoisted.contains(&v)),
                    OmpItem::Var(v) | OmpItem::ZeroSection(v) => !hoisted.contains(v),
                })
                .collect()
        };
        let reduction_allowed = kind != OmpKind::Distribute;

        for c in &node.clauses {
            let kind = match &c.kind {
                ClauseKind::Collapse(e) => OmpClauseKind::Collapse(e.const_int().unwrap_or(1)),
                ClauseKind::Tile(sizes) if sizes.len() > 1 => {
                    OmpClauseKind::Collapse(i64::try_from(sizes.len()).unwrap_or(i64::MAX))
                }
                ClauseKind::Private(vars) => {
                    let items = keep(exprs(vars));
                    if items.is_empty() {
                        continue;
                    }
                    OmpClauseKind::Private(items)
                }
                ClauseKind::Reduction(op, vars) if reduction_allowed => OmpClauseKind::Reduction(*op, exprs(vars)),
                ClauseKind::Gang(Some(arg)) if kind.has_distribute() => OmpClauseKind::DistSchedule(match arg {
                    GangStatic::Expr(e) => Some(e.clone()),
                    GangStatic::Star(_) => None,
                }),
                _ => continue,
            };
            clauses.push(OmpClause::explicit(kind));
        }
        for ic in self.data.implicit(node.id) {
            let clause = match ic.kind {
                ImplicitKind::Private => {
                    let items = keep(var_items(&ic.vars));
                    if items.is_empty() {
                        continue;
                    }
                    OmpClause::explicit(OmpClauseKind::Private(items))
                }
                ImplicitKind::Shared => OmpClause::implicit(OmpClauseKind::Shared(var_items(&ic.vars))),
                ImplicitKind::Reduction(op) if reduction_allowed => {
                    OmpClause::explicit(OmpClauseKind::Reduction(op, var_items(&ic.vars)))
                }
                _ => continue,
            };
            clauses.push(clause);
        }

        DirLowering {
            omp: Some(OmpDirective { kind, clauses }),
            tile,
            prelude,
        }
    }

    /// Variables of the explicit and predetermined `private` clauses of a
    /// loop, deduplicated in clause order.
    fn private_vars(&self, node: &DirNode) -> Vec<VarId> {
        let mut out = Vec::new();
        for c in &node.clauses {
            if let ClauseKind::Private(vars) = &c.kind {
                out.extend(vars.iter().filter_map(|v| self.resolved.root_var(v)));
            }
        }
        for ic in self.data.implicit(node.id) {
            if ic.kind == ImplicitKind::Private {
                out.extend(ic.vars.iter().copied());
            }
        }
        let mut seen = HashSet::new();
        out.retain(|v| seen.insert(*v));
        out
    }
}

// ── Obligations ─────────────────────────────────────────────────────────────

fn verify(resolved: &ResolvedUnit, lowered: &LoweredUnit) -> Cert {
    let mut cert = Cert {
        complete: resolved.dirs.iter().all(|d| lowered.get(d.id).is_some()),
        single_privatization: true,
        distribute_without_reduction: true,
        scalars_stay_shared: true,
    };
    for l in lowered.dirs.values() {
        let Some(omp) = &l.omp else {
            continue;
        };
        for c in &omp.clauses {
            match &c.kind {
                OmpClauseKind::Private(items) => {
                    let redeclared = items.iter().any(|item| {
                        let var = match item {
                            OmpItem::Expr(e) => resolved.root_var(e),
                            OmpItem::Var(v) | OmpItem::ZeroSection(v) => Some(*v),
                        };
                        var.is_some_and(|v| l.prelude.contains(&Prelude::Decl(v)))
                    });
                    cert.single_privatization &= !redeclared;
                }
                OmpClauseKind::Reduction(..) => {
                    cert.distribute_without_reduction &= omp.kind != OmpKind::Distribute;
                }
                _ => {}
            }
        }
        if omp.kind == OmpKind::TargetTeams {
            let has_defaultmap = omp
                .clauses
                .iter()
                .any(|c| c.kind == OmpClauseKind::DefaultmapTofromScalar);
            let unmapped_scalar = omp
                .clauses
                .iter()
                .filter_map(|c| match &c.kind {
                    OmpClauseKind::Shared(items) => Some(items),
                    _ => None,
                })
                .flatten()
                .filter_map(|item| match item {
                    OmpItem::Var(v) => Some(*v),
                    _ => None,
                })
                .any(|v| {
                    let ty = &resolved.var(v).ty;
                    ty.is_scalar()
                        && !ty.is_pointer()
                        && !omp.clauses.iter().any(|c| {
                            matches!(c.kind, OmpClauseKind::Map(..))
                                && c.kind.items().iter().any(|i| match i {
                                    OmpItem::Expr(e) => resolved.root_var(e) == Some(v),
                                    OmpItem::Var(x) | OmpItem::ZeroSection(x) => *x == v,
                                })
                        })
                });
            cert.scalars_stay_shared &= !unmapped_scalar || has_defaultmap;
        }
    }
    cert
}

// ── Tests ───────────────────────────────────────────────────────────────────
