// pipeline.rs: Compilation state and pass orchestration
//
// Holds all pass artifacts and runs the passes for a requested output. Every
// analysis pass runs even after another reported errors, so one invocation
// reports every problem; lowering runs only on an error-free unit.
//
// Preconditions: `state.unit` is a parsed translation unit.
// Postconditions: artifacts of every pass that ran are populated; diagnostics
//                 are in source order.
// Failure modes: a pass scheduled before its input (an ordering bug) stops
//                the run with `PipelineError`.
// Side effects: calls `on_pass_complete` after each pass; logs timing.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::ast::TranslationUnit;
use crate::config::LowerOptions;
use crate::data_attr::DataAttrInfo;
use crate::diag::{codes, sort_by_location, Diagnostic};
use crate::lower::{Cert, LoweredUnit};
use crate::partition::PartitionInfo;
use crate::pass::{analysis_passes, descriptor, required_passes, PassId};
use crate::resolve::ResolvedUnit;

// ── Artifact storage ───────────────────────────────────────────────────────

/// Holds all compilation artifacts and accumulated diagnostics.
pub struct CompilationState {
    pub unit: TranslationUnit,
    pub options: LowerOptions,
    pub resolved: Option<ResolvedUnit>,
    pub partition: Option<PartitionInfo>,
    pub data: Option<DataAttrInfo>,
    pub lowered: Option<LoweredUnit>,
    pub cert: Option<Cert>,
    pub diagnostics: Vec<Diagnostic>,
    pub has_error: bool,
}

impl CompilationState {
    pub fn new(unit: TranslationUnit, options: LowerOptions) -> Self {
        Self {
            unit,
            options,
            resolved: None,
            partition: None,
            data: None,
            lowered: None,
            cert: None,
            diagnostics: Vec::new(),
            has_error: false,
        }
    }
}

// ── Error type ─────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pass '{pass}' needs the output of '{input}', which has not run")]
    MissingInput {
        pass: &'static str,
        input: &'static str,
    },
}

fn need<'s, T>(artifact: &'s Option<T>, pass: PassId, input: PassId) -> Result<&'s T, PipelineError> {
    artifact.as_ref().ok_or(PipelineError::MissingInput {
        pass: descriptor(pass).name,
        input: descriptor(input).name,
    })
}

// ── Parsing ────────────────────────────────────────────────────────────────

/// Parse `source`, converting syntax errors into diagnostics.
pub fn parse_source(source: &str) -> Result<TranslationUnit, Vec<Diagnostic>> {
    let result = crate::parser::parse(source);
    let mut diags: Vec<Diagnostic> = result
        .errors
        .iter()
        .map(|e| Diagnostic::error(*e.span(), e.to_string()).with_code(codes::E0100))
        .collect();
    match result.unit {
        Some(unit) if diags.is_empty() => Ok(unit),
        Some(_) => {
            sort_by_location(&mut diags);
            Err(diags)
        }
        None => {
            if diags.is_empty() {
                let end = source.len();
                diags.push(
                    Diagnostic::error((end..end).into(), "parse failed with no output")
                        .with_code(codes::E0100),
                );
            }
            sort_by_location(&mut diags);
            Err(diags)
        }
    }
}

// ── Pipeline runner ────────────────────────────────────────────────────────

fn finish_pass(
    state: &mut CompilationState,
    pass_id: PassId,
    diags: Vec<Diagnostic>,
    elapsed: Duration,
    on_pass_complete: &mut impl FnMut(PassId, &[Diagnostic]),
) {
    on_pass_complete(pass_id, &diags);
    if diags.iter().any(Diagnostic::is_error) {
        state.has_error = true;
    }
    log::debug!(
        "{} complete, {} diagnostics, {:.1}ms",
        descriptor(pass_id).name,
        diags.len(),
        elapsed.as_secs_f64() * 1000.0
    );
    state.diagnostics.extend(diags);
}

/// Run the analysis passes and, when `lower` is set and no pass reported an
/// error, the OpenMP lowering.
///
/// Postconditions: `state.lowered` is `Some` iff lowering ran.
pub fn run_pipeline(
    state: &mut CompilationState,
    lower: bool,
    mut on_pass_complete: impl FnMut(PassId, &[Diagnostic]),
) -> Result<(), PipelineError> {
    let passes = if lower {
        required_passes(PassId::Lower)
    } else {
        analysis_passes()
    };

    for &pass_id in &passes {
        let t = Instant::now();
        match pass_id {
            PassId::Resolve => {
                let result = crate::resolve::resolve(&state.unit);
                state.resolved = Some(result.resolved);
                finish_pass(state, pass_id, result.diagnostics, t.elapsed(), &mut on_pass_complete);
            }
            PassId::Check => {
                let resolved = need(&state.resolved, pass_id, PassId::Resolve)?;
                let diags = crate::check::check(&state.unit, resolved);
                finish_pass(state, pass_id, diags, t.elapsed(), &mut on_pass_complete);
            }
            PassId::Partition => {
                let resolved = need(&state.resolved, pass_id, PassId::Resolve)?;
                let result = crate::partition::partition(&state.unit, resolved, &state.options);
                state.partition = Some(result.info);
                finish_pass(state, pass_id, result.diagnostics, t.elapsed(), &mut on_pass_complete);
            }
            PassId::LoopCount => {
                let diags = crate::loop_count::check_loop_counts(&state.unit);
                finish_pass(state, pass_id, diags, t.elapsed(), &mut on_pass_complete);
            }
            PassId::DataAttr => {
                let resolved = need(&state.resolved, pass_id, PassId::Resolve)?;
                let partition = need(&state.partition, pass_id, PassId::Partition)?;
                state.data = Some(crate::data_attr::data_attrs(resolved, partition));
                finish_pass(state, pass_id, Vec::new(), t.elapsed(), &mut on_pass_complete);
            }
            PassId::Reduction => {
                let resolved = need(&state.resolved, pass_id, PassId::Resolve)?;
                let partition = need(&state.partition, pass_id, PassId::Partition)?;
                let data = need(&state.data, pass_id, PassId::DataAttr)?;
                let diags =
                    crate::reduction::check_reductions(resolved, partition, data, &state.options);
                finish_pass(state, pass_id, diags, t.elapsed(), &mut on_pass_complete);
            }
            PassId::Lower => {
                if state.has_error {
                    log::info!("lower skipped: the unit has errors");
                    continue;
                }
                let resolved = need(&state.resolved, pass_id, PassId::Resolve)?;
                let partition = need(&state.partition, pass_id, PassId::Partition)?;
                let data = need(&state.data, pass_id, PassId::DataAttr)?;
                let result = crate::lower::lower(resolved, partition, data, &state.options);
                if !result.cert.all_pass() {
                    log::warn!("lowering obligations not met: {:?}", result.cert);
                }
                state.cert = Some(result.cert);
                state.lowered = Some(result.lowered);
                finish_pass(state, pass_id, result.diagnostics, t.elapsed(), &mut on_pass_complete);
            }
        }
    }

    sort_by_location(&mut state.diagnostics);
    log::info!(
        "pipeline: {} passes, {} diagnostics{}",
        passes.len(),
        state.diagnostics.len(),
        if state.has_error { ", has errors" } else { "" }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str, lower: bool) -> (CompilationState, Vec<PassId>) {
        let unit = parse_source(src).expect("parses");
        let mut state = CompilationState::new(unit, LowerOptions::default());
        let mut seen = Vec::new();
        run_pipeline(&mut state, lower, |p, _| seen.push(p)).expect("pipeline");
        (state, seen)
    }

    #[test]
    fn clean_unit_is_lowered() {
        let (state, seen) = run(
            "void f() {\n#pragma acc parallel loop\nfor (int i = 0; i < 4; ++i)\n;\n}\n",
            true,
        );
        assert!(!state.has_error);
        assert!(state.lowered.is_some());
        assert!(state.cert.as_ref().is_some_and(Cert::all_pass));
        assert_eq!(seen.last(), Some(&PassId::Lower));
    }

    #[test]
    fn analyses_only_without_lower() {
        let (state, seen) = run("void f() {\n#pragma acc parallel\n;\n}\n", false);
        assert!(state.lowered.is_none());
        assert!(!seen.contains(&PassId::Lower));
        assert!(state.data.is_some());
    }

    #[test]
    fn errors_skip_lowering_but_every_analysis_runs() {
        let src = "\
void f() {
  #pragma acc parallel
  {
    #pragma acc parallel
    ;
  }
  #pragma acc loop collapse(2)
  for (int i = 0; i < 4; ++i)
    ;
}
";
        let (state, seen) = run(src, true);
        assert!(state.has_error);
        assert!(state.lowered.is_none());
        assert!(seen.contains(&PassId::LoopCount));
        assert!(seen.contains(&PassId::Reduction));
        // Nesting error, then the collapse count error, in source order.
        let starts: Vec<usize> = state.diagnostics.iter().map(|d| d.span.start).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
        assert!(state.diagnostics.len() >= 2);
    }

    #[test]
    fn syntax_errors_become_diagnostics() {
        let diags = parse_source("int main() { return 0 }").expect_err("syntax error");
        assert!(!diags.is_empty());
        assert!(diags.iter().all(|d| d.code == Some(codes::E0100)));
    }
}
