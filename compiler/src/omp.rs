// omp.rs: OpenMP directive model produced by lowering
//
// The translated form of one effective OpenACC directive: an OpenMP
// directive kind and its clauses, in emission order. Variables are kept as
// the clause expressions they came from when explicit, or as variable ids
// when they come from implicit attributes.
//
// Preconditions: none (data-only module).
// Postconditions: `render` output is one `#pragma omp` line with clauses
//                 separated by single spaces.
// Failure modes: none.
// Side effects: none.

use std::fmt;

use crate::ast::Expr;
use crate::clause::{Level, Levels, ReductionOp};
use crate::id::VarId;
use crate::resolve::ResolvedUnit;

// ── Directive kinds ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OmpKind {
    TargetData,
    TargetTeams,
    Distribute,
    DistributeSimd,
    DistributeParallelFor,
    DistributeParallelForSimd,
    ParallelFor,
    ParallelForSimd,
    Simd,
    TargetUpdate,
    TargetEnterData,
    TargetExitData,
    /// Wraps a function; closed by `end declare target`.
    DeclareTarget,
}

impl OmpKind {
    /// Loop directive for a set of partitioning levels, `None` when the loop
    /// runs sequentially.
    pub fn for_levels(levels: Levels) -> Option<OmpKind> {
        let g = levels.has(Level::Gang);
        let w = levels.has(Level::Worker);
        let v = levels.has(Level::Vector);
        Some(match (g, w, v) {
            (false, false, false) => return None,
            (false, false, true) => OmpKind::Simd,
            (false, true, false) => OmpKind::ParallelFor,
            (false, true, true) => OmpKind::ParallelForSimd,
            (true, false, false) => OmpKind::Distribute,
            (true, false, true) => OmpKind::DistributeSimd,
            (true, true, false) => OmpKind::DistributeParallelFor,
            (true, true, true) => OmpKind::DistributeParallelForSimd,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OmpKind::TargetData => "target data",
            OmpKind::TargetTeams => "target teams",
            OmpKind::Distribute => "distribute",
            OmpKind::DistributeSimd => "distribute simd",
            OmpKind::DistributeParallelFor => "distribute parallel for",
            OmpKind::DistributeParallelForSimd => "distribute parallel for simd",
            OmpKind::ParallelFor => "parallel for",
            OmpKind::ParallelForSimd => "parallel for simd",
            OmpKind::Simd => "simd",
            OmpKind::TargetUpdate => "target update",
            OmpKind::TargetEnterData => "target enter data",
            OmpKind::TargetExitData => "target exit data",
            OmpKind::DeclareTarget => "declare target",
        }
    }

    /// Line closing the region this directive opens, if any.
    pub fn end_line(self) -> Option<&'static str> {
        match self {
            OmpKind::DeclareTarget => Some("#pragma omp end declare target"),
            _ => None,
        }
    }

    /// Node name in the AST dump.
    pub fn dump_name(self) -> &'static str {
        match self {
            OmpKind::TargetData => "OMPTargetDataDirective",
            OmpKind::TargetTeams => "OMPTargetTeamsDirective",
            OmpKind::Distribute => "OMPDistributeDirective",
            OmpKind::DistributeSimd => "OMPDistributeSimdDirective",
            OmpKind::DistributeParallelFor => "OMPDistributeParallelForDirective",
            OmpKind::DistributeParallelForSimd => "OMPDistributeParallelForSimdDirective",
            OmpKind::ParallelFor => "OMPParallelForDirective",
            OmpKind::ParallelForSimd => "OMPParallelForSimdDirective",
            OmpKind::Simd => "OMPSimdDirective",
            OmpKind::TargetUpdate => "OMPTargetUpdateDirective",
            OmpKind::TargetEnterData => "OMPTargetEnterDataDirective",
            OmpKind::TargetExitData => "OMPTargetExitDataDirective",
            OmpKind::DeclareTarget => "OMPDeclareTargetDeclAttr",
        }
    }

    pub fn has_parallel(self) -> bool {
        matches!(
            self,
            OmpKind::DistributeParallelFor
                | OmpKind::DistributeParallelForSimd
                | OmpKind::ParallelFor
                | OmpKind::ParallelForSimd
        )
    }

    pub fn has_simd(self) -> bool {
        matches!(
            self,
            OmpKind::DistributeSimd
                | OmpKind::DistributeParallelForSimd
                | OmpKind::ParallelForSimd
                | OmpKind::Simd
        )
    }

    pub fn has_distribute(self) -> bool {
        matches!(
            self,
            OmpKind::Distribute
                | OmpKind::DistributeSimd
                | OmpKind::DistributeParallelFor
                | OmpKind::DistributeParallelForSimd
        )
    }
}

impl fmt::Display for OmpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#pragma omp {}", self.as_str())
    }
}

// ── Map types ───────────────────────────────────────────────────────────────

/// Modifiers and map type of a `map` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapType {
    /// From `present`.
    Present,
    /// From `copy`, and implicit `copy`.
    Tofrom,
    /// From `copyin`.
    To,
    /// From `copyout`.
    From,
    /// From `create`.
    Create,
    /// From `no_create`.
    NoCreate,
    /// A `nomap` variable whose visible data clause is `no_create`.
    NoAlloc,
    /// A `nomap` pointer, `no_create_omp = alloc`; `create` on `enter data`.
    Alloc,
    /// `copyin` on `enter data`.
    EnterTo,
    /// `copyout` on `exit data`.
    ExitFrom,
    /// `delete` on `exit data`.
    Release,
}

impl MapType {
    pub fn as_str(self) -> &'static str {
        match self {
            MapType::Present => "present,hold,alloc",
            MapType::Tofrom => "hold,tofrom",
            MapType::To => "hold,to",
            MapType::From => "hold,from",
            MapType::Create => "hold,alloc",
            MapType::NoCreate => "no_alloc,hold,alloc",
            MapType::NoAlloc => "no_alloc,alloc",
            MapType::Alloc => "alloc",
            MapType::EnterTo => "to",
            MapType::ExitFrom => "from",
            MapType::Release => "release",
        }
    }
}

// ── Clauses ─────────────────────────────────────────────────────────────────

/// One variable list entry.
#[derive(Debug, Clone, PartialEq)]
pub enum OmpItem {
    /// Copied from an explicit OpenACC clause.
    Expr(Expr),
    Var(VarId),
    /// `x[0:0]`: presence check of a variable mapped as a subarray.
    ZeroSection(VarId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum OmpClauseKind {
    NumTeams(Expr),
    ThreadLimit(Expr),
    NumThreads(i64),
    Simdlen(i64),
    If(Expr),
    Collapse(i64),
    /// `dist_schedule(static[, chunk])`.
    DistSchedule(Option<Expr>),
    Map(MapType, Vec<OmpItem>),
    Shared(Vec<OmpItem>),
    Private(Vec<OmpItem>),
    Firstprivate(Vec<OmpItem>),
    Reduction(ReductionOp, Vec<OmpItem>),
    /// `defaultmap(tofrom: scalar)`.
    DefaultmapTofromScalar,
    /// `to(...)` or `from(...)` on `target update`.
    Motion {
        to_device: bool,
        present: bool,
        items: Vec<OmpItem>,
    },
}

impl OmpClauseKind {
    pub fn name(&self) -> &'static str {
        match self {
            OmpClauseKind::NumTeams(_) => "num_teams",
            OmpClauseKind::ThreadLimit(_) => "thread_limit",
            OmpClauseKind::NumThreads(_) => "num_threads",
            OmpClauseKind::Simdlen(_) => "simdlen",
            OmpClauseKind::If(_) => "if",
            OmpClauseKind::Collapse(_) => "collapse",
            OmpClauseKind::DistSchedule(_) => "dist_schedule",
            OmpClauseKind::Map(..) => "map",
            OmpClauseKind::Shared(_) => "shared",
            OmpClauseKind::Private(_) => "private",
            OmpClauseKind::Firstprivate(_) => "firstprivate",
            OmpClauseKind::Reduction(..) => "reduction",
            OmpClauseKind::DefaultmapTofromScalar => "defaultmap",
            OmpClauseKind::Motion { to_device: true, .. } => "to",
            OmpClauseKind::Motion { to_device: false, .. } => "from",
        }
    }

    /// Node name in the AST dump: `OMPNum_teamsClause`.
    pub fn dump_name(&self) -> String {
        let name = self.name();
        let mut chars = name.chars();
        let first = chars.next().map(|c| c.to_ascii_uppercase()).unwrap_or_default();
        format!("OMP{first}{}Clause", chars.as_str())
    }

    pub fn items(&self) -> &[OmpItem] {
        match self {
            OmpClauseKind::Map(_, items)
            | OmpClauseKind::Shared(items)
            | OmpClauseKind::Private(items)
            | OmpClauseKind::Firstprivate(items)
            | OmpClauseKind::Reduction(_, items)
            | OmpClauseKind::Motion { items, .. } => items,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OmpClause {
    pub kind: OmpClauseKind,
    /// Left for the OpenMP compiler to infer; shown in the dump only unless
    /// the directive needs it spelled out.
    pub implicit: bool,
}

impl OmpClause {
    pub fn explicit(kind: OmpClauseKind) -> OmpClause {
        OmpClause {
            kind,
            implicit: false,
        }
    }

    pub fn implicit(kind: OmpClauseKind) -> OmpClause {
        OmpClause {
            kind,
            implicit: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OmpDirective {
    pub kind: OmpKind,
    pub clauses: Vec<OmpClause>,
}

impl OmpDirective {
    /// Clauses that appear in printed source. Implicit `shared` is spelled
    /// out on `target teams` and on directives containing `parallel`.
    pub fn printed_clauses(&self) -> impl Iterator<Item = &OmpClause> {
        let spell_shared = self.kind == OmpKind::TargetTeams || self.kind.has_parallel();
        self.clauses.iter().filter(move |c| {
            !c.implicit || (spell_shared && matches!(c.kind, OmpClauseKind::Shared(_)))
        })
    }
}

/// `#pragma omp tile sizes(...)`; `None` sizes print as `1`.
#[derive(Debug, Clone, PartialEq)]
pub struct OmpTile {
    pub sizes: Vec<Option<Expr>>,
}

// ── Rendering ───────────────────────────────────────────────────────────────

fn item_text(resolved: &ResolvedUnit, item: &OmpItem) -> String {
    match item {
        OmpItem::Expr(e) => crate::pprint::expr_text(e),
        OmpItem::Var(v) => resolved.var(*v).name.clone(),
        OmpItem::ZeroSection(v) => format!("{}[0:0]", resolved.var(*v).name),
    }
}

fn items_text(resolved: &ResolvedUnit, items: &[OmpItem]) -> String {
    items
        .iter()
        .map(|i| item_text(resolved, i))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn clause_text(resolved: &ResolvedUnit, kind: &OmpClauseKind) -> String {
    use crate::pprint::expr_text;
    match kind {
        OmpClauseKind::NumTeams(e) => format!("num_teams({})", expr_text(e)),
        OmpClauseKind::ThreadLimit(e) => format!("thread_limit({})", expr_text(e)),
        OmpClauseKind::NumThreads(n) => format!("num_threads({n})"),
        OmpClauseKind::Simdlen(n) => format!("simdlen({n})"),
        OmpClauseKind::If(e) => format!("if({})", expr_text(e)),
        OmpClauseKind::Collapse(n) => format!("collapse({n})"),
        OmpClauseKind::DistSchedule(None) => "dist_schedule(static)".to_string(),
        OmpClauseKind::DistSchedule(Some(e)) => format!("dist_schedule(static, {})", expr_text(e)),
        OmpClauseKind::Map(ty, items) => format!("map({}: {})", ty.as_str(), items_text(resolved, items)),
        OmpClauseKind::Shared(items) => format!("shared({})", items_text(resolved, items)),
        OmpClauseKind::Private(items) => format!("private({})", items_text(resolved, items)),
        OmpClauseKind::Firstprivate(items) => format!("firstprivate({})", items_text(resolved, items)),
        OmpClauseKind::Reduction(op, items) => {
            format!("reduction({}: {})", op.as_str(), items_text(resolved, items))
        }
        OmpClauseKind::DefaultmapTofromScalar => "defaultmap(tofrom: scalar)".to_string(),
        OmpClauseKind::Motion { present, items, .. } => {
            let modifier = if *present { "present: " } else { "" };
            format!("{}({modifier}{})", kind.name(), items_text(resolved, items))
        }
    }
}

/// The printed `#pragma omp` line.
pub fn render(resolved: &ResolvedUnit, dir: &OmpDirective) -> String {
    let mut out = dir.kind.to_string();
    for c in dir.printed_clauses() {
        out.push(' ');
        out.push_str(&clause_text(resolved, &c.kind));
    }
    out
}

pub fn render_tile(tile: &OmpTile) -> String {
    let sizes: Vec<String> = tile
        .sizes
        .iter()
        .map(|s| s.as_ref().map_or_else(|| "1".to_string(), crate::pprint::expr_text))
        .collect();
    format!("#pragma omp tile sizes({})", sizes.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_levels() {
        use Level::*;
        let cases: [(&[Level], Option<OmpKind>); 8] = [
            (&[], None),
            (&[Gang], Some(OmpKind::Distribute)),
            (&[Worker], Some(OmpKind::ParallelFor)),
            (&[Vector], Some(OmpKind::Simd)),
            (&[Gang, Worker], Some(OmpKind::DistributeParallelFor)),
            (&[Gang, Vector], Some(OmpKind::DistributeSimd)),
            (&[Worker, Vector], Some(OmpKind::ParallelForSimd)),
            (&[Gang, Worker, Vector], Some(OmpKind::DistributeParallelForSimd)),
        ];
        for (levels, kind) in cases {
            assert_eq!(OmpKind::for_levels(Levels::of(levels)), kind, "{levels:?}");
        }
    }

    #[test]
    fn dump_names() {
        assert_eq!(OmpClauseKind::NumTeams(dummy()).dump_name(), "OMPNum_teamsClause");
        assert_eq!(OmpClauseKind::DefaultmapTofromScalar.dump_name(), "OMPDefaultmapClause");
        assert_eq!(OmpKind::ParallelForSimd.dump_name(), "OMPParallelForSimdDirective");
        let from = OmpClauseKind::Motion {
            to_device: false,
            present: true,
            items: Vec::new(),
        };
        assert_eq!(from.dump_name(), "OMPFromClause");
    }

    #[test]
    fn motion_clause_text() {
        let resolved = ResolvedUnit::default();
        let to = OmpClauseKind::Motion {
            to_device: true,
            present: false,
            items: vec![OmpItem::Expr(dummy())],
        };
        assert_eq!(clause_text(&resolved, &to), "to(1)");
        let from = OmpClauseKind::Motion {
            to_device: false,
            present: true,
            items: vec![OmpItem::Expr(dummy())],
        };
        assert_eq!(clause_text(&resolved, &from), "from(present: 1)");
        assert_eq!(OmpKind::DeclareTarget.end_line(), Some("#pragma omp end declare target"));
        assert_eq!(OmpKind::TargetData.end_line(), None);
    }

    #[test]
    fn implicit_shared_printed_only_where_needed() {
        let shared = OmpClause::implicit(OmpClauseKind::Shared(Vec::new()));
        let private = OmpClause::explicit(OmpClauseKind::Private(Vec::new()));
        let on = |kind| OmpDirective {
            kind,
            clauses: vec![private.clone(), shared.clone()],
        };
        assert_eq!(on(OmpKind::Distribute).printed_clauses().count(), 1);
        assert_eq!(on(OmpKind::ParallelFor).printed_clauses().count(), 2);
        assert_eq!(on(OmpKind::TargetTeams).printed_clauses().count(), 2);
    }

    fn dummy() -> Expr {
        use chumsky::span::Span as _;
        Expr {
            kind: crate::ast::ExprKind::Int(1),
            span: crate::ast::Span::new((), 0..1),
        }
    }
}
