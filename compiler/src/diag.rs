// diag.rs: Unified diagnostics model
//
// Provides the shared diagnostic types used across all analysis passes,
// the stable code table, and clang-style `file:line:col:` rendering.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use crate::ast::Span;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0101`, `W0601`).
///
/// Codes are `&'static str` constants defined in the `codes` module.
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    // E01xx: syntax, name resolution and clause shape
    pub const E0100: DiagCode = DiagCode("E0100"); // syntax error
    pub const E0101: DiagCode = DiagCode("E0101"); // undeclared identifier
    pub const E0102: DiagCode = DiagCode("E0102"); // clause not allowed on directive
    pub const E0103: DiagCode = DiagCode("E0103"); // clause excluded by earlier clause
    pub const E0104: DiagCode = DiagCode("E0104"); // repeated collapse/tile/if
    pub const E0105: DiagCode = DiagCode("E0105"); // data directive without data clause
    pub const E0106: DiagCode = DiagCode("E0106"); // non-positive clause argument
    pub const E0107: DiagCode = DiagCode("E0107"); // non-constant collapse argument
    pub const E0108: DiagCode = DiagCode("E0108"); // member expression not supported
    pub const E0109: DiagCode = DiagCode("E0109"); // subarray not supported
    pub const E0110: DiagCode = DiagCode("E0110"); // nested member expression
    pub const E0111: DiagCode = DiagCode("E0111"); // update/routine without required clause

    // E02xx: directive placement
    pub const E0201: DiagCode = DiagCode("E0201"); // illegal directive nesting
    pub const E0202: DiagCode = DiagCode("E0202"); // loop directive without for loop
    pub const E0203: DiagCode = DiagCode("E0203"); // break outside loop or switch
    pub const E0204: DiagCode = DiagCode("E0204"); // executable directive as immediate substatement
    pub const E0205: DiagCode = DiagCode("E0205"); // directive inside a routine function
    pub const E0206: DiagCode = DiagCode("E0206"); // static local inside a routine function
    pub const E0207: DiagCode = DiagCode("E0207"); // conflicting routine levels
    pub const E0208: DiagCode = DiagCode("E0208"); // routine inside a function body

    // E03xx: loop partitioning
    pub const E0301: DiagCode = DiagCode("E0301"); // partition level nesting
    pub const E0302: DiagCode = DiagCode("E0302"); // break in partitioned loop
    pub const E0303: DiagCode = DiagCode("E0303"); // member expression as loop control variable
    pub const E0304: DiagCode = DiagCode("E0304"); // reduction on loop control variable
    pub const E0305: DiagCode = DiagCode("E0305"); // orphaned loop coarser than its routine

    // E04xx: loop counts
    pub const E0401: DiagCode = DiagCode("E0401"); // too few loops for collapse/tile

    // E05xx: data attributes
    pub const E0501: DiagCode = DiagCode("E0501"); // conflicting data attributes
    pub const E0502: DiagCode = DiagCode("E0502"); // data attribute repeated
    pub const E0503: DiagCode = DiagCode("E0503"); // const variable privatized
    pub const E0504: DiagCode = DiagCode("E0504"); // const reduction variable
    pub const E0505: DiagCode = DiagCode("E0505"); // variable repeated in update motion clauses
    pub const E0506: DiagCode = DiagCode("E0506"); // const variable written by update

    // E06xx / W06xx: reductions
    pub const E0601: DiagCode = DiagCode("E0601"); // conflicting reduction operators
    pub const E0602: DiagCode = DiagCode("E0602"); // operator/type mismatch
    pub const E0603: DiagCode = DiagCode("E0603"); // loop reduction needs visible data clause
    pub const E0604: DiagCode = DiagCode("E0604"); // orphaned reduction not gang-private
    pub const W0601: DiagCode = DiagCode("W0601"); // redundant reduction on one directive
    pub const W0602: DiagCode = DiagCode("W0602"); // redundant nested reduction

    // W07xx: translation
    pub const W0701: DiagCode = DiagCode("W0701"); // non-constant vector_length ignored
    pub const W0702: DiagCode = DiagCode("W0702"); // update translated with present modifier
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warning,
}

impl DiagLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        }
    }
}

// ── Related span ─────────────────────────────────────────────────────────

/// A secondary source location providing context for a diagnostic,
/// rendered as a `note:` line.
#[derive(Debug, Clone)]
pub struct RelatedSpan {
    pub span: Span,
    pub label: String,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A diagnostic emitted by any pass.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    pub span: Span,
    pub message: String,
    pub related_spans: Vec<RelatedSpan>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code and no related spans.
    pub fn new(level: DiagLevel, span: Span, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            span,
            message: message.into(),
            related_spans: Vec::new(),
        }
    }

    pub fn error(span: Span, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Error, span, message)
    }

    pub fn warning(span: Span, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Warning, span, message)
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach a related span (a note).
    pub fn with_related(mut self, span: Span, label: impl Into<String>) -> Self {
        self.related_spans.push(RelatedSpan {
            span,
            label: label.into(),
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagLevel::Error
    }

    /// Render as clang-style text: the primary line followed by one line per
    /// note, each prefixed with `file:line:col:`.
    pub fn render(&self, file: &str, lines: &LineIndex) -> String {
        let (line, col) = lines.line_col(self.span.start);
        let mut out = format!(
            "{file}:{line}:{col}: {}: {}",
            self.level.as_str(),
            self.message
        );
        for rel in &self.related_spans {
            let (line, col) = lines.line_col(rel.span.start);
            out.push_str(&format!("\n{file}:{line}:{col}: note: {}", rel.label));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}[{}]: {}", self.level.as_str(), code, self.message),
            None => write!(f, "{}: {}", self.level.as_str(), self.message),
        }
    }
}

/// Deliver diagnostics in source order. Stable, so diagnostics reported at
/// the same location keep their emission order.
pub fn sort_by_location(diags: &mut [Diagnostic]) {
    diags.sort_by_key(|d| d.span.start);
}

// ── Line index ───────────────────────────────────────────────────────────

/// Byte offset to 1-based line/column lookup.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        LineIndex { starts }
    }

    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        (line + 1, offset - self.starts[line] + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_span() -> Span {
        use chumsky::span::Span as _;
        Span::new((), 0..1)
    }

    #[test]
    fn display_without_code() {
        let d = Diagnostic::new(DiagLevel::Error, dummy_span(), "something failed");
        assert_eq!(format!("{d}"), "error: something failed");
    }

    #[test]
    fn display_with_code() {
        let d = Diagnostic::new(DiagLevel::Warning, dummy_span(), "redundant '+' reduction")
            .with_code(codes::W0601);
        assert_eq!(format!("{d}"), "warning[W0601]: redundant '+' reduction");
    }

    #[test]
    fn builder_chain() {
        let d = Diagnostic::error(dummy_span(), "conflicting '+' reduction for variable 'x'")
            .with_code(codes::E0601)
            .with_related(dummy_span(), "enclosing '*' reduction here")
            .with_related(dummy_span(), "implied as gang reduction here");

        assert_eq!(d.code, Some(codes::E0601));
        assert!(d.is_error());
        assert_eq!(d.related_spans.len(), 2);
        assert_eq!(d.related_spans[1].label, "implied as gang reduction here");
    }

    #[test]
    fn line_index_maps_offsets() {
        let idx = LineIndex::new("ab\ncd\n\nx");
        assert_eq!(idx.line_col(0), (1, 1));
        assert_eq!(idx.line_col(1), (1, 2));
        assert_eq!(idx.line_col(3), (2, 1));
        assert_eq!(idx.line_col(6), (3, 1));
        assert_eq!(idx.line_col(7), (4, 1));
    }

    #[test]
    fn render_with_notes() {
        let src = "int x;\nint y;\n";
        let idx = LineIndex::new(src);
        let d = Diagnostic::error((7..8).into(), "bad")
            .with_related((4..5).into(), "declared here");
        assert_eq!(
            d.render("t.c", &idx),
            "t.c:2:1: error: bad\nt.c:1:5: note: declared here"
        );
    }

    #[test]
    fn sort_is_stable() {
        let mut ds = vec![
            Diagnostic::error((5..6).into(), "b"),
            Diagnostic::error((1..2).into(), "a"),
            Diagnostic::error((5..6).into(), "c"),
        ];
        sort_by_location(&mut ds);
        let msgs: Vec<_> = ds.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(msgs, vec!["a", "b", "c"]);
    }
}
