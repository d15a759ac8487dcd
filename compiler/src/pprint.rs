// pprint.rs: Source printer for OpenACC, OpenMP and mixed output
//
// Prints the translation unit back as C source. Each OpenACC construct is
// printed as written (`acc`), as its OpenMP translation (`omp`), or with both
// where the second dialect is commented out (`acc-omp`, `omp-acc`). When the
// translation adds statements, the two renditions are printed one after the
// other between banner lines.
//
// Preconditions: `resolved` and `lowered` come from the same unit. Without a
//   lowering only `acc` output is possible and other modes fall back to it.
// Postconditions: output is newline-terminated, two-space indented.
// Failure modes: none.
// Side effects: none.

use std::fmt::{self, Write as _};

use crate::ast::*;
use crate::clause::{ClauseKind, GangStatic, TileSize};
use crate::lower::{DirLowering, LoweredUnit, Prelude};
use crate::omp;
use crate::resolve::{ResolvedUnit, Type};

const DISCARDED: &str = " // discarded in OpenMP translation";

// ── Modes ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PrintMode {
    Acc,
    Omp,
    /// OpenACC, with the OpenMP translation in comments.
    AccOmp,
    /// OpenMP, with the original OpenACC in comments.
    OmpAcc,
}

impl PrintMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PrintMode::Acc => "acc",
            PrintMode::Omp => "omp",
            PrintMode::AccOmp => "acc-omp",
            PrintMode::OmpAcc => "omp-acc",
        }
    }

    pub fn needs_lowering(self) -> bool {
        self != PrintMode::Acc
    }
}

impl fmt::Display for PrintMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Public entry point ──────────────────────────────────────────────────────

pub fn print_unit(
    unit: &TranslationUnit,
    resolved: &ResolvedUnit,
    lowered: Option<&LoweredUnit>,
    mode: PrintMode,
) -> String {
    let mode = if lowered.is_none() { PrintMode::Acc } else { mode };
    let mut p = Printer {
        resolved,
        lowered,
        mode,
        out: String::new(),
        indent: 0,
        comment_at: None,
    };
    for item in &unit.items {
        p.item(item);
    }
    p.out
}

// ── Expressions ─────────────────────────────────────────────────────────────

/// Expressions print as parsed; parentheses are kept as `Paren` nodes, so no
/// precedence handling is needed.
pub fn expr_text(e: &Expr) -> String {
    let mut s = String::new();
    write_expr(&mut s, e);
    s
}

fn write_expr(s: &mut String, e: &Expr) {
    match &e.kind {
        ExprKind::Ident(id) => s.push_str(&id.name),
        ExprKind::Int(v) => {
            let _ = write!(s, "{v}");
        }
        ExprKind::Float(text) => s.push_str(text),
        ExprKind::Str(text) => {
            let _ = write!(s, "\"{text}\"");
        }
        ExprKind::Char(text) => {
            let _ = write!(s, "'{text}'");
        }
        ExprKind::Paren(inner) => {
            s.push('(');
            write_expr(s, inner);
            s.push(')');
        }
        ExprKind::Unary(op, operand) => {
            s.push_str(op.as_str());
            write_expr(s, operand);
        }
        ExprKind::Postfix(op, operand) => {
            write_expr(s, operand);
            s.push_str(op.as_str());
        }
        ExprKind::Binary(op, l, r) => {
            write_expr(s, l);
            let _ = write!(s, " {} ", op.as_str());
            write_expr(s, r);
        }
        ExprKind::Assign(op, l, r) => {
            write_expr(s, l);
            let _ = write!(s, " {} ", op.as_str());
            write_expr(s, r);
        }
        ExprKind::Ternary(c, t, f) => {
            write_expr(s, c);
            s.push_str(" ? ");
            write_expr(s, t);
            s.push_str(" : ");
            write_expr(s, f);
        }
        ExprKind::Call(callee, args) => {
            write_expr(s, callee);
            s.push('(');
            for (i, a) in args.iter().enumerate() {
                if i > 0 {
                    s.push_str(", ");
                }
                write_expr(s, a);
            }
            s.push(')');
        }
        ExprKind::Index(base, idx) => {
            write_expr(s, base);
            s.push('[');
            write_expr(s, idx);
            s.push(']');
        }
        ExprKind::Member { base, field, arrow } => {
            write_expr(s, base);
            s.push_str(if *arrow { "->" } else { "." });
            s.push_str(&field.name);
        }
        ExprKind::Section { base, start, len } => {
            write_expr(s, base);
            s.push('[');
            if let Some(start) = start {
                write_expr(s, start);
            }
            s.push(':');
            if let Some(len) = len {
                write_expr(s, len);
            }
            s.push(']');
        }
    }
}

fn expr_list(exprs: &[Expr]) -> String {
    exprs.iter().map(expr_text).collect::<Vec<_>>().join(",")
}

// ── Declarations ────────────────────────────────────────────────────────────

fn spec_text(spec: &TypeSpec) -> String {
    let mut s = String::new();
    match spec.storage {
        Some(StorageClass::Static) => s.push_str("static "),
        Some(StorageClass::Extern) => s.push_str("extern "),
        None => {}
    }
    if spec.is_const {
        s.push_str("const ");
    }
    match spec.unsigned {
        Some(true) => s.push_str("unsigned "),
        Some(false) => s.push_str("signed "),
        None => {}
    }
    let base = match &spec.base {
        BaseType::Void => "void",
        BaseType::Char => "char",
        BaseType::Short => "short",
        BaseType::Int => "int",
        BaseType::Long => "long",
        BaseType::LongLong => "long long",
        BaseType::Float => "float",
        BaseType::Double => "double",
        BaseType::Struct(name) => {
            s.push_str("struct ");
            name.as_str()
        }
    };
    s.push_str(base);
    s
}

fn initializer_text(init: &Initializer) -> String {
    match init {
        Initializer::Expr(e) => expr_text(e),
        Initializer::List(items, _) => {
            let items: Vec<String> = items.iter().map(initializer_text).collect();
            format!("{{{}}}", items.join(", "))
        }
    }
}

fn declarator_text(d: &Declarator) -> String {
    let mut s = "*".repeat(d.pointers as usize);
    s.push_str(&d.name.name);
    for dim in &d.dims {
        s.push('[');
        if let Some(e) = dim {
            write_expr(&mut s, e);
        }
        s.push(']');
    }
    if let Some(init) = &d.init {
        let _ = write!(s, " = {}", initializer_text(init));
    }
    s
}

/// A declaration without its trailing `;`.
fn declaration_text(decl: &Declaration) -> String {
    let declarators: Vec<String> = decl.declarators.iter().map(declarator_text).collect();
    format!("{} {}", spec_text(&decl.spec), declarators.join(", "))
}

/// Declaration of `name` with type `ty`: `int *p`, `double a[10][4]`.
pub fn decl_text(name: &str, ty: &Type) -> String {
    fn go(ty: &Type, inner: String) -> String {
        match ty {
            Type::Pointer(to) => {
                let starred = format!("*{inner}");
                if matches!(**to, Type::Array(..)) {
                    go(to, format!("({starred})"))
                } else {
                    go(to, starred)
                }
            }
            Type::Array(of, len) => match len {
                Some(n) => go(of, format!("{inner}[{n}]")),
                None => go(of, format!("{inner}[]")),
            },
            base => format!("{base} {inner}"),
        }
    }
    go(ty, name.to_string())
}

// ── OpenACC directive text ──────────────────────────────────────────────────

pub fn acc_clause_text(kind: &ClauseKind) -> String {
    match kind {
        ClauseKind::Data(d, vars) => format!("{}({})", d.as_str(), expr_list(vars)),
        ClauseKind::Private(vars) => format!("private({})", expr_list(vars)),
        ClauseKind::Firstprivate(vars) => format!("firstprivate({})", expr_list(vars)),
        ClauseKind::Motion(m, vars) => format!("{}({})", m.as_str(), expr_list(vars)),
        ClauseKind::Reduction(op, vars) => format!("reduction({}: {})", op.as_str(), expr_list(vars)),
        ClauseKind::If(e) => format!("if({})", expr_text(e)),
        ClauseKind::NumGangs(e) => format!("num_gangs({})", expr_text(e)),
        ClauseKind::NumWorkers(e) => format!("num_workers({})", expr_text(e)),
        ClauseKind::VectorLength(e) => format!("vector_length({})", expr_text(e)),
        ClauseKind::Gang(None) => "gang".to_string(),
        ClauseKind::Gang(Some(GangStatic::Expr(e))) => format!("gang(static: {})", expr_text(e)),
        ClauseKind::Gang(Some(GangStatic::Star(_))) => "gang(static: *)".to_string(),
        ClauseKind::Collapse(e) => format!("collapse({})", expr_text(e)),
        ClauseKind::Tile(sizes) => {
            let sizes: Vec<String> = sizes
                .iter()
                .map(|s| match s {
                    TileSize::Expr(e) => expr_text(e),
                    TileSize::Star(_) => "*".to_string(),
                })
                .collect();
            format!("tile({})", sizes.join(", "))
        }
        other => other.name().as_str().to_string(),
    }
}

pub fn acc_directive_text(dir: &AccDirective) -> String {
    let mut s = format!("#pragma acc {}", dir.kind.as_str());
    for c in &dir.clauses {
        s.push(' ');
        s.push_str(&acc_clause_text(&c.kind));
    }
    s
}

// ── Printer ─────────────────────────────────────────────────────────────────

struct Printer<'a> {
    resolved: &'a ResolvedUnit,
    lowered: Option<&'a LoweredUnit>,
    mode: PrintMode,
    out: String,
    indent: usize,
    /// Indent level at which `// ` is inserted inside a commented region.
    comment_at: Option<usize>,
}

impl<'a> Printer<'a> {
    fn line(&mut self, text: &str) {
        match self.comment_at {
            Some(base) => {
                let _ = writeln!(
                    self.out,
                    "{}// {}{}",
                    "  ".repeat(base),
                    "  ".repeat(self.indent.saturating_sub(base)),
                    text
                );
            }
            None => {
                let _ = writeln!(self.out, "{}{}", "  ".repeat(self.indent), text);
            }
        }
    }

    fn item(&mut self, item: &Item) {
        match item {
            Item::Preprocessor(text, _) => self.line(text),
            Item::Decl(decl) => self.line(&format!("{};", declaration_text(decl))),
            Item::Record(rec) => {
                self.line(&format!("struct {} {{", rec.name.name));
                self.indent += 1;
                for field in &rec.fields {
                    self.line(&format!("{};", declaration_text(field)));
                }
                self.indent -= 1;
                self.line("};");
            }
            Item::Function(f) => self.function(f),
        }
    }

    fn function(&mut self, f: &FunctionDef) {
        let params = if f.void_params {
            "void".to_string()
        } else {
            f.params
                .iter()
                .map(|p| format!("{} {}", spec_text(&p.spec), declarator_text(&p.declarator)))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let head = format!(
            "{} {}{}({})",
            spec_text(&f.ret),
            "*".repeat(f.ret_pointers as usize),
            f.name.name,
            params
        );
        let end = f.routine.as_ref().and_then(|r| self.standalone(r));
        match &f.body {
            None => self.line(&format!("{head};")),
            Some(body) => {
                self.line(&format!("{head} {{"));
                self.block_items(body);
                self.line("}");
            }
        }
        match (end, self.mode) {
            (Some(end), PrintMode::Omp | PrintMode::OmpAcc) => self.line(end),
            (Some(end), PrintMode::AccOmp) => self.line(&format!("// {end}")),
            _ => {}
        }
    }

    fn block_items(&mut self, block: &Block) {
        self.indent += 1;
        for s in &block.stmts {
            self.stmt(s);
        }
        self.indent -= 1;
    }

    /// `head` then `body`: a block opens on the same line and is left open
    /// (returns `true`), anything else goes one level deeper on its own line.
    fn headed(&mut self, head: &str, body: &Stmt) -> bool {
        match &body.kind {
            StmtKind::Block(b) => {
                self.line(&format!("{head} {{"));
                self.block_items(b);
                true
            }
            _ => {
                self.line(head);
                self.indent += 1;
                self.stmt(body);
                self.indent -= 1;
                false
            }
        }
    }

    fn closed(&mut self, head: &str, body: &Stmt) {
        if self.headed(head, body) {
            self.line("}");
        }
    }

    fn if_chain(&mut self, prefix: &str, cond: &Expr, then: &Stmt, els: Option<&Stmt>) {
        let open = self.headed(&format!("{prefix}if ({})", expr_text(cond)), then);
        let Some(els) = els else {
            if open {
                self.line("}");
            }
            return;
        };
        let prefix = if open { "} else " } else { "else " };
        match &els.kind {
            StmtKind::If { cond, then, els } => self.if_chain(prefix, cond, then, els.as_deref()),
            _ => self.closed(prefix.trim_end(), els),
        }
    }

    fn stmt(&mut self, s: &Stmt) {
        match &s.kind {
            StmtKind::Block(b) => {
                self.line("{");
                self.block_items(b);
                self.line("}");
            }
            StmtKind::Decl(d) => self.line(&format!("{};", declaration_text(d))),
            StmtKind::Expr(e) => self.line(&format!("{};", expr_text(e))),
            StmtKind::If { cond, then, els } => self.if_chain("", cond, then, els.as_deref()),
            StmtKind::For(f) => self.closed(&for_head(f), &f.body),
            StmtKind::While { cond, body } => {
                self.closed(&format!("while ({})", expr_text(cond)), body)
            }
            StmtKind::Switch { cond, body } => {
                self.closed(&format!("switch ({})", expr_text(cond)), body)
            }
            StmtKind::Case(v) => self.line(&format!("case {}:", expr_text(v))),
            StmtKind::Default => self.line("default:"),
            StmtKind::Break => self.line("break;"),
            StmtKind::Continue => self.line("continue;"),
            StmtKind::Return(None) => self.line("return;"),
            StmtKind::Return(Some(e)) => self.line(&format!("return {};", expr_text(e))),
            StmtKind::Empty => self.line(";"),
            StmtKind::Acc(c) => self.construct(c),
            StmtKind::AccExec(d) => {
                self.standalone(d);
            }
        }
    }

    // ── Constructs ──

    /// Translations of the construct's effective directives, outermost first.
    fn lowerings(&self, directive: Span) -> Vec<&'a DirLowering> {
        let Some(lowered) = self.lowered else {
            return Vec::new();
        };
        self.resolved
            .dirs_for(directive)
            .into_iter()
            .filter_map(|d| lowered.get(d))
            .collect()
    }

    fn construct(&mut self, c: &AccConstruct) {
        let parts = self.lowerings(c.directive.span);
        if parts.is_empty() || self.mode == PrintMode::Acc {
            self.line(&acc_directive_text(&c.directive));
            self.stmt(&c.body);
            return;
        }
        if self.mode == PrintMode::Omp {
            self.omp_region(&parts, &c.body);
            return;
        }
        let mode = self.mode;
        let discarded = parts.iter().all(|l| l.is_discarded());
        let acc_line = if discarded {
            format!("{}{DISCARDED}", acc_directive_text(&c.directive))
        } else {
            acc_directive_text(&c.directive)
        };

        if parts.iter().any(|l| l.changes_structure()) {
            self.banner(mode, &acc_line, &parts, &c.body);
            return;
        }

        let omp_lines = self.omp_lines(&parts);
        if mode == PrintMode::AccOmp {
            self.line(&acc_line);
            for l in &omp_lines {
                self.line(&format!("// {l}"));
            }
        } else {
            for l in &omp_lines {
                self.line(l);
            }
            self.line(&format!("// {acc_line}"));
        }
        self.stmt(&c.body);
    }

    /// A directive without a body. Returns the closing line of its
    /// translation, if the translation needs one.
    fn standalone(&mut self, d: &AccDirective) -> Option<&'static str> {
        let parts = self.lowerings(d.span);
        let acc_line = acc_directive_text(d);
        if parts.is_empty() || self.mode == PrintMode::Acc {
            self.line(&acc_line);
            return None;
        }
        let omp_lines = self.omp_lines(&parts);
        match self.mode {
            PrintMode::AccOmp => {
                self.line(&acc_line);
                for l in &omp_lines {
                    self.line(&format!("// {l}"));
                }
            }
            PrintMode::OmpAcc => {
                for l in &omp_lines {
                    self.line(l);
                }
                self.line(&format!("// {acc_line}"));
            }
            _ => {
                for l in &omp_lines {
                    self.line(l);
                }
            }
        }
        parts.iter().find_map(|l| l.omp.as_ref()?.kind.end_line())
    }

    /// Directive lines of a translation that adds no statements.
    fn omp_lines(&self, parts: &[&DirLowering]) -> Vec<String> {
        let mut lines = Vec::new();
        for l in parts {
            if let Some(d) = &l.omp {
                lines.push(omp::render(self.resolved, d));
            }
            if let Some(t) = &l.tile {
                lines.push(omp::render_tile(t));
            }
        }
        lines
    }

    fn banner(&mut self, mode: PrintMode, acc_line: &str, parts: &[&DirLowering], body: &Stmt) {
        let here = self.indent;
        if mode == PrintMode::AccOmp {
            self.line("// v----------ACC----------v");
            self.with_mode(PrintMode::Acc, |p| {
                p.line(acc_line);
                p.stmt(body);
            });
            self.line("// ---------ACC->OMP--------");
            self.comment_at = Some(here);
            self.with_mode(PrintMode::Omp, |p| p.omp_region(parts, body));
            self.comment_at = None;
            self.line("// ^----------OMP----------^");
        } else {
            self.line("// v----------OMP----------v");
            self.with_mode(PrintMode::Omp, |p| p.omp_region(parts, body));
            self.line("// ---------OMP<-ACC--------");
            self.comment_at = Some(here);
            self.with_mode(PrintMode::Acc, |p| {
                p.line(acc_line);
                p.stmt(body);
            });
            self.comment_at = None;
            self.line("// ^----------ACC----------^");
        }
    }

    fn with_mode(&mut self, mode: PrintMode, f: impl FnOnce(&mut Self)) {
        let saved = std::mem::replace(&mut self.mode, mode);
        f(self);
        self.mode = saved;
    }

    /// OpenMP rendition: each part's prelude opens a scope that encloses its
    /// directive and everything nested in it.
    fn omp_region(&mut self, parts: &[&DirLowering], body: &Stmt) {
        let Some((first, rest)) = parts.split_first() else {
            self.stmt(body);
            return;
        };
        let scoped = !first.prelude.is_empty();
        if scoped {
            self.line("{");
            self.indent += 1;
            for p in &first.prelude {
                self.prelude(p);
            }
        }
        if let Some(d) = &first.omp {
            let text = omp::render(self.resolved, d);
            self.line(&text);
        }
        if let Some(t) = &first.tile {
            self.line(&omp::render_tile(t));
        }
        self.omp_region(rest, body);
        if scoped {
            self.indent -= 1;
            self.line("}");
        }
    }

    fn prelude(&mut self, p: &Prelude) {
        match p {
            Prelude::Decl(v) => {
                let var = self.resolved.var(*v);
                let text = decl_text(&var.name, &var.ty);
                self.line(&format!("{text};"));
            }
            Prelude::Discard(e) => self.line(&format!("(void)({});", expr_text(e))),
        }
    }
}

fn for_head(f: &ForStmt) -> String {
    let init = match &f.init {
        Some(ForInit::Decl(d)) => declaration_text(d),
        Some(ForInit::Expr(e)) => expr_text(e),
        None => String::new(),
    };
    let mut head = format!("for ({init};");
    if let Some(c) = &f.cond {
        let _ = write!(head, " {}", expr_text(c));
    }
    head.push(';');
    if let Some(s) = &f.step {
        let _ = write!(head, " {}", expr_text(s));
    }
    head.push(')');
    head
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LowerOptions;

    fn print(src: &str, mode: PrintMode) -> String {
        let parsed = crate::parser::parse(src);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let unit = parsed.unit.expect("unit");
        let resolved = crate::resolve::resolve(&unit).resolved;
        let opts = LowerOptions::default();
        let partition = crate::partition::partition(&unit, &resolved, &opts).info;
        let data = crate::data_attr::data_attrs(&resolved, &partition);
        let lowered = crate::lower::lower(&resolved, &partition, &data, &opts).lowered;
        print_unit(&unit, &resolved, Some(&lowered), mode)
    }

    #[test]
    fn acc_mode_reprints_source() {
        let src = "\
#include <stdio.h>
int main() {
  int a[10];
  #pragma acc parallel loop pcopy(a) num_gangs(2)
  for (int i = 0; i < 10; ++i)
    a[i] = i;
  if (a[0] > 1) {
    printf(\"%d\\n\", a[0]);
  } else if (a[1])
    return 1;
  else {
    return 2;
  }
  return 0;
}
";
        let expected = "\
#include <stdio.h>
int main() {
  int a[10];
  #pragma acc parallel loop copy(a) num_gangs(2)
  for (int i = 0; i < 10; ++i)
    a[i] = i;
  if (a[0] > 1) {
    printf(\"%d\\n\", a[0]);
  } else if (a[1])
    return 1;
  else {
    return 2;
  }
  return 0;
}
";
        assert_eq!(print(src, PrintMode::Acc), expected);
    }

    #[test]
    fn sections_and_members_print_as_written() {
        let parsed = crate::parser::parse(
            "void f(int *p, int n) {\n#pragma acc data copy(p[1:n], p[:n], p[2:])\n;\n}",
        );
        let unit = parsed.unit.expect("unit");
        let Item::Function(f) = &unit.items[0] else {
            panic!("expected function");
        };
        let body = f.body.as_ref().expect("body");
        let StmtKind::Acc(c) = &body.stmts[0].kind else {
            panic!("expected construct");
        };
        assert_eq!(
            acc_directive_text(&c.directive),
            "#pragma acc data copy(p[1:n],p[:n],p[2:])"
        );
    }

    #[test]
    fn omp_and_acc_omp_lines() {
        let src = "\
void f() {
  int a[4];
  #pragma acc parallel num_gangs(4)
  {
    #pragma acc loop gang
    for (int i = 0; i < 4; ++i)
      a[i] = 0;
  }
}
";
        let omp = print(src, PrintMode::Omp);
        assert!(omp.contains(
            "  #pragma omp target teams num_teams(4) map(hold,tofrom: a) shared(a)\n  {\n"
        ));
        assert!(omp.contains("    #pragma omp distribute\n    for (int i = 0; i < 4; ++i)\n"));

        let acc_omp = print(src, PrintMode::AccOmp);
        assert!(acc_omp.contains(
            "  #pragma acc parallel num_gangs(4)\n  // #pragma omp target teams num_teams(4) map(hold,tofrom: a) shared(a)\n"
        ));
        let omp_acc = print(src, PrintMode::OmpAcc);
        assert!(omp_acc.contains("    #pragma omp distribute\n    // #pragma acc loop gang\n"));
    }

    #[test]
    fn discarded_loop_is_marked() {
        let src = "\
void f() {
  #pragma acc parallel
  #pragma acc loop seq
  for (int i = 0; i < 4; ++i)
    ;
}
";
        let out = print(src, PrintMode::AccOmp);
        assert!(out.contains("  #pragma acc loop seq // discarded in OpenMP translation\n"));
        assert!(!print(src, PrintMode::Omp).contains("loop"));
    }

    #[test]
    fn hoisted_private_uses_banner() {
        let src = "\
void f() {
  int i;
  #pragma acc parallel loop num_gangs(2) seq private(i)
  for (int j = 0; j < 2; ++j) {
    i = j;
  }
}
";
        let expected = "\
void f() {
  int i;
  // v----------ACC----------v
  #pragma acc parallel loop num_gangs(2) seq private(i)
  for (int j = 0; j < 2; ++j) {
    i = j;
  }
  // ---------ACC->OMP--------
  // #pragma omp target teams num_teams(2)
  // {
  //   int i;
  //   for (int j = 0; j < 2; ++j) {
  //     i = j;
  //   }
  // }
  // ^----------OMP----------^
}
";
        assert_eq!(print(src, PrintMode::AccOmp), expected);

        let omp = print(src, PrintMode::OmpAcc);
        assert!(omp.starts_with("void f() {\n  int i;\n  // v----------OMP----------v\n"));
        assert!(omp.contains("  // ---------OMP<-ACC--------\n  // #pragma acc parallel loop"));
        assert!(omp.ends_with("  // ^----------ACC----------^\n}\n"));
    }

    #[test]
    fn executable_directives_print_in_place() {
        let src = "\
void f(int *a, int n) {
  #pragma acc enter data copyin(a[0:n])
  #pragma acc update self(a[0:n]) if_present
  #pragma acc exit data delete(a[0:n])
}
";
        let acc = print(src, PrintMode::Acc);
        assert!(acc.contains("  #pragma acc update self(a[0:n]) if_present\n"));

        let omp = print(src, PrintMode::Omp);
        assert!(omp.contains("  #pragma omp target enter data map(to: a[0:n])\n"));
        assert!(omp.contains("  #pragma omp target update from(a[0:n])\n"));
        assert!(omp.contains("  #pragma omp target exit data map(release: a[0:n])\n"));
        assert!(!omp.contains("acc"));

        let omp_acc = print(src, PrintMode::OmpAcc);
        assert!(omp_acc.contains(
            "  #pragma omp target update from(a[0:n])\n  // #pragma acc update self(a[0:n]) if_present\n"
        ));
    }

    #[test]
    fn routine_wraps_function_in_declare_target() {
        let src = "\
#pragma acc routine seq
int sq(int x) {
  return x * x;
}
";
        let omp = print(src, PrintMode::Omp);
        assert_eq!(
            omp,
            "#pragma omp declare target\nint sq(int x) {\n  return x * x;\n}\n#pragma omp end declare target\n"
        );
        let acc_omp = print(src, PrintMode::AccOmp);
        assert!(acc_omp.starts_with("#pragma acc routine seq\n// #pragma omp declare target\nint sq"));
        assert!(acc_omp.ends_with("}\n// #pragma omp end declare target\n"));
        assert_eq!(
            print(src, PrintMode::Acc),
            "#pragma acc routine seq\nint sq(int x) {\n  return x * x;\n}\n"
        );
    }

    #[test]
    fn without_lowering_only_acc_is_printed() {
        let parsed = crate::parser::parse("void f() {\n#pragma acc parallel\n;\n}");
        let unit = parsed.unit.expect("unit");
        let resolved = crate::resolve::resolve(&unit).resolved;
        let out = print_unit(&unit, &resolved, None, PrintMode::Omp);
        assert_eq!(out, "void f() {\n  #pragma acc parallel\n  ;\n}\n");
    }

    #[test]
    fn declarations_from_types() {
        assert_eq!(decl_text("i", &Type::Int), "int i");
        assert_eq!(decl_text("p", &Type::Pointer(Box::new(Type::Double))), "double *p");
        let arr = Type::Array(Box::new(Type::Array(Box::new(Type::Int), Some(4))), Some(10));
        assert_eq!(decl_text("a", &arr), "int a[10][4]");
    }

    #[test]
    fn mode_names_match_cli_values() {
        use clap::ValueEnum;
        for m in PrintMode::value_variants() {
            assert_eq!(PrintMode::from_str(m.as_str(), false), Ok(*m));
        }
        assert!(PrintMode::from_str("c", false).is_err());
    }
}
