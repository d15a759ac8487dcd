// clause.rs: OpenACC clause model and directive/clause validity table
//
// Typed representation of each OpenACC clause as written in the source, the
// directive kinds that carry them, and the rules for splitting a combined
// `parallel loop` into its effective directives.
//
// Preconditions: none (types and pure functions only).
// Postconditions: none.
// Failure modes: none.
// Side effects: none.

use std::fmt;

use crate::ast::{Expr, ExprKind, Span};

// ── Directive kinds ──────────────────────────────────────────────────────

/// Directive kind as written in `#pragma acc KIND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Data,
    Parallel,
    Loop,
    ParallelLoop,
    Update,
    EnterData,
    ExitData,
    Routine,
}

/// A directive after combined constructs are split: `parallel loop` yields a
/// `Parallel` with a nested `Loop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectiveKind {
    Data,
    Parallel,
    Loop,
    Update,
    EnterData,
    ExitData,
    Routine,
}

impl DirectiveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DirectiveKind::Data => "data",
            DirectiveKind::Parallel => "parallel",
            DirectiveKind::Loop => "loop",
            DirectiveKind::ParallelLoop => "parallel loop",
            DirectiveKind::Update => "update",
            DirectiveKind::EnterData => "enter data",
            DirectiveKind::ExitData => "exit data",
            DirectiveKind::Routine => "routine",
        }
    }

    /// The effective directives, outermost first.
    pub fn effective(self) -> &'static [EffectiveKind] {
        match self {
            DirectiveKind::Data => &[EffectiveKind::Data],
            DirectiveKind::Parallel => &[EffectiveKind::Parallel],
            DirectiveKind::Loop => &[EffectiveKind::Loop],
            DirectiveKind::ParallelLoop => &[EffectiveKind::Parallel, EffectiveKind::Loop],
            DirectiveKind::Update => &[EffectiveKind::Update],
            DirectiveKind::EnterData => &[EffectiveKind::EnterData],
            DirectiveKind::ExitData => &[EffectiveKind::ExitData],
            DirectiveKind::Routine => &[EffectiveKind::Routine],
        }
    }

    /// Standalone directives with no associated statement.
    pub fn is_executable(self) -> bool {
        matches!(
            self,
            DirectiveKind::Update | DirectiveKind::EnterData | DirectiveKind::ExitData
        )
    }

    /// Directives that precede a statement.
    pub fn is_construct(self) -> bool {
        matches!(
            self,
            DirectiveKind::Data
                | DirectiveKind::Parallel
                | DirectiveKind::Loop
                | DirectiveKind::ParallelLoop
        )
    }

    pub fn is_combined(self) -> bool {
        matches!(self, DirectiveKind::ParallelLoop)
    }

    pub fn has_loop(self) -> bool {
        matches!(self, DirectiveKind::Loop | DirectiveKind::ParallelLoop)
    }
}

impl EffectiveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EffectiveKind::Data => "data",
            EffectiveKind::Parallel => "parallel",
            EffectiveKind::Loop => "loop",
            EffectiveKind::Update => "update",
            EffectiveKind::EnterData => "enter data",
            EffectiveKind::ExitData => "exit data",
            EffectiveKind::Routine => "routine",
        }
    }

    pub fn directive(self) -> DirectiveKind {
        match self {
            EffectiveKind::Data => DirectiveKind::Data,
            EffectiveKind::Parallel => DirectiveKind::Parallel,
            EffectiveKind::Loop => DirectiveKind::Loop,
            EffectiveKind::Update => DirectiveKind::Update,
            EffectiveKind::EnterData => DirectiveKind::EnterData,
            EffectiveKind::ExitData => DirectiveKind::ExitData,
            EffectiveKind::Routine => DirectiveKind::Routine,
        }
    }
}

impl fmt::Display for DirectiveKind {
    /// Quoted form used in diagnostics: `'#pragma acc loop'`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'#pragma acc {}'", self.as_str())
    }
}

// ── Clause payloads ──────────────────────────────────────────────────────

/// Data mapping clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataClause {
    Present,
    Copy,
    Copyin,
    Copyout,
    Create,
    NoCreate,
    /// Only on `exit data`.
    Delete,
}

impl DataClause {
    pub const ALL: [DataClause; 7] = [
        DataClause::Present,
        DataClause::Copy,
        DataClause::Copyin,
        DataClause::Copyout,
        DataClause::Create,
        DataClause::NoCreate,
        DataClause::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DataClause::Present => "present",
            DataClause::Copy => "copy",
            DataClause::Copyin => "copyin",
            DataClause::Copyout => "copyout",
            DataClause::Create => "create",
            DataClause::NoCreate => "no_create",
            DataClause::Delete => "delete",
        }
    }

    /// Canonical clause for a spelling, including the `p*` and
    /// `present_or_*` aliases.
    pub fn from_name(name: &str) -> Option<DataClause> {
        Some(match name {
            "present" => DataClause::Present,
            "copy" | "pcopy" | "present_or_copy" => DataClause::Copy,
            "copyin" | "pcopyin" | "present_or_copyin" => DataClause::Copyin,
            "copyout" | "pcopyout" | "present_or_copyout" => DataClause::Copyout,
            "create" | "pcreate" | "present_or_create" => DataClause::Create,
            "no_create" => DataClause::NoCreate,
            "delete" => DataClause::Delete,
            _ => return None,
        })
    }
}

/// Data motion clauses of `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionClause {
    Self_,
    Host,
    Device,
}

impl MotionClause {
    pub fn as_str(self) -> &'static str {
        match self {
            MotionClause::Self_ => "self",
            MotionClause::Host => "host",
            MotionClause::Device => "device",
        }
    }

    /// Whether data moves from the device to the host.
    pub fn to_host(self) -> bool {
        !matches!(self, MotionClause::Device)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReductionOp {
    Add,
    Mul,
    Max,
    Min,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
}

impl ReductionOp {
    pub const ALL: [ReductionOp; 9] = [
        ReductionOp::Add,
        ReductionOp::Mul,
        ReductionOp::Max,
        ReductionOp::Min,
        ReductionOp::BitAnd,
        ReductionOp::BitOr,
        ReductionOp::BitXor,
        ReductionOp::And,
        ReductionOp::Or,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReductionOp::Add => "+",
            ReductionOp::Mul => "*",
            ReductionOp::Max => "max",
            ReductionOp::Min => "min",
            ReductionOp::BitAnd => "&",
            ReductionOp::BitOr => "|",
            ReductionOp::BitXor => "^",
            ReductionOp::And => "&&",
            ReductionOp::Or => "||",
        }
    }
}

/// Argument of `gang(static: ...)`.
#[derive(Debug, Clone, PartialEq)]
pub enum GangStatic {
    Expr(Expr),
    Star(Span),
}

/// One size in `tile(...)`.
#[derive(Debug, Clone, PartialEq)]
pub enum TileSize {
    Expr(Expr),
    Star(Span),
}

// ── Clause ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ClauseKind {
    Data(DataClause, Vec<Expr>),
    Private(Vec<Expr>),
    Firstprivate(Vec<Expr>),
    Reduction(ReductionOp, Vec<Expr>),
    If(Expr),
    NumGangs(Expr),
    NumWorkers(Expr),
    VectorLength(Expr),
    Gang(Option<GangStatic>),
    Worker,
    Vector,
    Seq,
    Auto,
    Independent,
    Collapse(Expr),
    Tile(Vec<TileSize>),
    Motion(MotionClause, Vec<Expr>),
    IfPresent,
}

/// A clause as written, with the span of its whole text.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub kind: ClauseKind,
    pub span: Span,
}

/// Fieldless clause identity for table lookups and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseName {
    Data(DataClause),
    Private,
    Firstprivate,
    Reduction,
    If,
    NumGangs,
    NumWorkers,
    VectorLength,
    Gang,
    Worker,
    Vector,
    Seq,
    Auto,
    Independent,
    Collapse,
    Tile,
    Motion(MotionClause),
    IfPresent,
}

impl ClauseName {
    pub fn as_str(self) -> &'static str {
        match self {
            ClauseName::Data(d) => d.as_str(),
            ClauseName::Private => "private",
            ClauseName::Firstprivate => "firstprivate",
            ClauseName::Reduction => "reduction",
            ClauseName::If => "if",
            ClauseName::NumGangs => "num_gangs",
            ClauseName::NumWorkers => "num_workers",
            ClauseName::VectorLength => "vector_length",
            ClauseName::Gang => "gang",
            ClauseName::Worker => "worker",
            ClauseName::Vector => "vector",
            ClauseName::Seq => "seq",
            ClauseName::Auto => "auto",
            ClauseName::Independent => "independent",
            ClauseName::Collapse => "collapse",
            ClauseName::Tile => "tile",
            ClauseName::Motion(m) => m.as_str(),
            ClauseName::IfPresent => "if_present",
        }
    }

    /// Whether this clause may appear on the effective directive `kind`.
    pub fn allowed_on(self, kind: EffectiveKind) -> bool {
        use ClauseName::*;
        match kind {
            EffectiveKind::Data => {
                matches!(self, If) || matches!(self, Data(d) if d != DataClause::Delete)
            }
            EffectiveKind::Parallel => {
                matches!(
                    self,
                    If | NumGangs | NumWorkers | VectorLength | Reduction | Private | Firstprivate
                ) || matches!(self, Data(d) if d != DataClause::Delete)
            }
            EffectiveKind::Loop => matches!(
                self,
                Collapse | Gang | Worker | Vector | Seq | Auto | Independent | Tile | Private
                    | Reduction
            ),
            EffectiveKind::Update => matches!(self, If | IfPresent | Motion(_)),
            EffectiveKind::EnterData => {
                matches!(self, If | Data(DataClause::Copyin) | Data(DataClause::Create))
            }
            EffectiveKind::ExitData => {
                matches!(self, If | Data(DataClause::Copyout) | Data(DataClause::Delete))
            }
            EffectiveKind::Routine => matches!(self, Gang | Worker | Vector | Seq),
        }
    }

    /// Whether this clause may appear on the directive `kind` as written.
    pub fn allowed_on_directive(self, kind: DirectiveKind) -> bool {
        kind.effective().iter().any(|&e| self.allowed_on(e))
    }

    /// Clauses that may appear at most once per directive.
    pub fn is_unique(self) -> bool {
        use ClauseName::*;
        matches!(
            self,
            If | NumGangs
                | NumWorkers
                | VectorLength
                | Gang
                | Worker
                | Vector
                | Seq
                | Auto
                | Independent
                | Collapse
                | Tile
                | IfPresent
        )
    }

    /// Clauses that cannot appear together with `self` on a directive of
    /// `kind`. A routine takes exactly one level.
    pub fn exclusive_with(self, kind: DirectiveKind) -> &'static [ClauseName] {
        use ClauseName::*;
        if kind == DirectiveKind::Routine {
            return match self {
                Gang => &[Worker, Vector, Seq],
                Worker => &[Gang, Vector, Seq],
                Vector => &[Gang, Worker, Seq],
                Seq => &[Gang, Worker, Vector],
                _ => &[],
            };
        }
        match self {
            Seq => &[Gang, Worker, Vector, Auto, Independent],
            Auto => &[Seq, Independent],
            Independent => &[Seq, Auto],
            Gang | Worker | Vector => &[Seq],
            _ => &[],
        }
    }
}

impl fmt::Display for ClauseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ClauseKind {
    pub fn name(&self) -> ClauseName {
        match self {
            ClauseKind::Data(d, _) => ClauseName::Data(*d),
            ClauseKind::Private(_) => ClauseName::Private,
            ClauseKind::Firstprivate(_) => ClauseName::Firstprivate,
            ClauseKind::Reduction(..) => ClauseName::Reduction,
            ClauseKind::If(_) => ClauseName::If,
            ClauseKind::NumGangs(_) => ClauseName::NumGangs,
            ClauseKind::NumWorkers(_) => ClauseName::NumWorkers,
            ClauseKind::VectorLength(_) => ClauseName::VectorLength,
            ClauseKind::Gang(_) => ClauseName::Gang,
            ClauseKind::Worker => ClauseName::Worker,
            ClauseKind::Vector => ClauseName::Vector,
            ClauseKind::Seq => ClauseName::Seq,
            ClauseKind::Auto => ClauseName::Auto,
            ClauseKind::Independent => ClauseName::Independent,
            ClauseKind::Collapse(_) => ClauseName::Collapse,
            ClauseKind::Tile(_) => ClauseName::Tile,
            ClauseKind::Motion(m, _) => ClauseName::Motion(*m),
            ClauseKind::IfPresent => ClauseName::IfPresent,
        }
    }

    /// Variable references carried by the clause, if it is a var-list clause.
    pub fn vars(&self) -> &[Expr] {
        match self {
            ClauseKind::Data(_, v)
            | ClauseKind::Private(v)
            | ClauseKind::Firstprivate(v)
            | ClauseKind::Reduction(_, v)
            | ClauseKind::Motion(_, v) => v,
            _ => &[],
        }
    }

    /// `private`, `firstprivate` and `reduction` take whole variables only.
    pub fn is_dsa(&self) -> bool {
        matches!(
            self,
            ClauseKind::Private(_) | ClauseKind::Firstprivate(_) | ClauseKind::Reduction(..)
        )
    }

    /// Variable references whose shape the clause accepts. Rejected
    /// references are reported once by the clause checker and take no part
    /// in later analyses.
    pub fn supported_vars(&self) -> impl Iterator<Item = &Expr> {
        let dsa = self.is_dsa();
        self.vars()
            .iter()
            .filter(move |v| ref_shape(v).is_supported(dsa))
    }
}

// ── Variable reference shapes ────────────────────────────────────────────

/// Shape of a clause variable reference.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefShape {
    pub members: u32,
    pub subarray: Option<Span>,
    pub first_member: Option<Span>,
}

impl RefShape {
    /// Subarray rejected on a DSA clause or combined with a member.
    pub fn rejects_subarray(&self, dsa: bool) -> bool {
        self.subarray.is_some() && (dsa || self.members == 1)
    }

    /// Member rejected on a DSA clause or combined with a subarray.
    pub fn rejects_member(&self, dsa: bool) -> bool {
        self.members == 1 && (dsa || self.subarray.is_some())
    }

    pub fn is_supported(&self, dsa: bool) -> bool {
        self.members <= 1 && !self.rejects_subarray(dsa) && !self.rejects_member(dsa)
    }
}

pub fn ref_shape(expr: &Expr) -> RefShape {
    let mut shape = RefShape::default();
    let mut e = expr;
    loop {
        match &e.kind {
            ExprKind::Paren(inner) => e = inner,
            ExprKind::Member { base, .. } => {
                shape.members += 1;
                shape.first_member = Some(e.span);
                e = base;
            }
            ExprKind::Section { base, .. } => {
                shape.subarray.get_or_insert(e.span);
                e = base;
            }
            ExprKind::Index(base, _) => e = base,
            _ => return shape,
        }
    }
}

impl Clause {
    pub fn name(&self) -> ClauseName {
        self.kind.name()
    }
}

/// Which effective directive of `kind` receives `clause`. For a combined
/// directive, clauses valid on `loop` go to the loop and the rest to the
/// parallel. Returns `None` for clauses invalid on every part.
pub fn split_target(kind: DirectiveKind, clause: ClauseName) -> Option<EffectiveKind> {
    match kind {
        DirectiveKind::ParallelLoop => {
            if clause.allowed_on(EffectiveKind::Loop) {
                Some(EffectiveKind::Loop)
            } else if clause.allowed_on(EffectiveKind::Parallel) {
                Some(EffectiveKind::Parallel)
            } else {
                None
            }
        }
        _ => {
            let eff = kind.effective()[0];
            clause.allowed_on(eff).then_some(eff)
        }
    }
}

// ── Routine levels ───────────────────────────────────────────────────────

/// Level named on `#pragma acc routine`. `Seq` is finer than every
/// partitioning level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoutineLevel {
    Seq,
    Level(Level),
}

impl RoutineLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RoutineLevel::Seq => "seq",
            RoutineLevel::Level(l) => l.as_str(),
        }
    }

    /// First level clause in `clauses`.
    pub fn of(clauses: &[Clause]) -> Option<RoutineLevel> {
        clauses.iter().find_map(|c| match c.kind {
            ClauseKind::Gang(_) => Some(RoutineLevel::Level(Level::Gang)),
            ClauseKind::Worker => Some(RoutineLevel::Level(Level::Worker)),
            ClauseKind::Vector => Some(RoutineLevel::Level(Level::Vector)),
            ClauseKind::Seq => Some(RoutineLevel::Seq),
            _ => None,
        })
    }
}

// ── Partitioning levels ──────────────────────────────────────────────────

/// Level of parallelism; compares finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Vector = 1,
    Worker = 2,
    Gang = 3,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Gang => "gang",
            Level::Worker => "worker",
            Level::Vector => "vector",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Level::Gang => 0b100,
            Level::Worker => 0b010,
            Level::Vector => 0b001,
        }
    }
}

/// A set of partitioning levels, e.g. `gang+vector`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Levels(u8);

impl Levels {
    pub const NONE: Levels = Levels(0);

    pub fn of(levels: &[Level]) -> Levels {
        let mut s = Levels::NONE;
        for &l in levels {
            s.insert(l);
        }
        s
    }

    pub fn insert(&mut self, level: Level) {
        self.0 |= level.bit();
    }

    pub fn remove(&mut self, level: Level) {
        self.0 &= !level.bit();
    }

    pub fn has(self, level: Level) -> bool {
        self.0 & level.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn union(self, other: Levels) -> Levels {
        Levels(self.0 | other.0)
    }

    pub fn intersect(self, other: Levels) -> Levels {
        Levels(self.0 & other.0)
    }

    /// Every level strictly finer than `level`.
    pub fn finer_than(level: Level) -> Levels {
        Levels(level.bit() - 1)
    }

    /// Every level strictly coarser than `level`.
    pub fn coarser_than(level: Level) -> Levels {
        Levels(!(level.bit() | (level.bit() - 1)) & 0b111)
    }

    /// Coarsest level present.
    pub fn coarsest(self) -> Option<Level> {
        [Level::Gang, Level::Worker, Level::Vector]
            .into_iter()
            .find(|&l| self.has(l))
    }

    /// Finest level present.
    pub fn finest(self) -> Option<Level> {
        [Level::Vector, Level::Worker, Level::Gang]
            .into_iter()
            .find(|&l| self.has(l))
    }

    pub fn iter(self) -> impl Iterator<Item = Level> {
        [Level::Gang, Level::Worker, Level::Vector]
            .into_iter()
            .filter(move |&l| self.has(l))
    }
}

impl fmt::Display for Levels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let names: Vec<_> = self.iter().map(Level::as_str).collect();
        write!(f, "{}", names.join("+"))
    }
}
