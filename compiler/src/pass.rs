// pass.rs: Pass descriptor module: metadata, dependency resolution, artifact IDs
//
// Declares the translator's semantic passes (parse is outside the runner),
// their dependency edges, and the artifacts they produce. Used by the
// pipeline runner to compute the pass list for a requested output.

use std::collections::HashSet;

// ── Pass and Artifact identifiers ──────────────────────────────────────────

/// Identifies each pass (parse excluded, handled before the runner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    Resolve,
    Check,
    Partition,
    LoopCount,
    DataAttr,
    Reduction,
    Lower,
}

/// Machine-readable artifact identifiers. Each maps to a concrete type
/// in the compilation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactId {
    Resolved,        // ResolvedUnit
    CheckReport,     // diagnostics only
    Partition,       // PartitionInfo
    LoopCountReport, // diagnostics only
    DataAttrs,       // DataAttrInfo
    ReductionReport, // diagnostics only
    Lowered,         // LoweredUnit
    Cert,            // Cert
}

// ── Pass descriptor ────────────────────────────────────────────────────────

/// Static metadata about a pass.
pub struct PassDescriptor {
    /// Name for log output.
    pub name: &'static str,
    /// Passes whose outputs this pass consumes.
    pub inputs: &'static [PassId],
    pub outputs: &'static [ArtifactId],
    /// What invalidates this pass's output.
    pub invalidation_key: &'static str,
    /// Pre/post conditions (documentation only).
    pub invariants: &'static str,
}

pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::Resolve => PassDescriptor {
            name: "resolve",
            inputs: &[],
            outputs: &[ArtifactId::Resolved],
            invalidation_key: "source",
            invariants: "every variable use bound, every effective directive has a DirId",
        },
        PassId::Check => PassDescriptor {
            name: "check",
            inputs: &[PassId::Resolve],
            outputs: &[ArtifactId::CheckReport],
            invalidation_key: "source + resolved",
            invariants: "clause placement, uniqueness, shapes and DA conflicts diagnosed",
        },
        PassId::Partition => PassDescriptor {
            name: "partition",
            inputs: &[PassId::Resolve],
            outputs: &[ArtifactId::Partition],
            invalidation_key: "source + resolved + options",
            invariants: "every loop has explicit and implicit levels, LCVs collected",
        },
        PassId::LoopCount => PassDescriptor {
            name: "loop_count",
            inputs: &[],
            outputs: &[ArtifactId::LoopCountReport],
            invalidation_key: "source",
            invariants: "collapse/tile counts matched by tightly nested for loops",
        },
        PassId::DataAttr => PassDescriptor {
            name: "data_attr",
            inputs: &[PassId::Partition],
            outputs: &[ArtifactId::DataAttrs],
            invalidation_key: "resolved + partition",
            invariants: "one implicit DA per referenced variable, clauses in canonical order",
        },
        PassId::Reduction => PassDescriptor {
            name: "reduction",
            inputs: &[PassId::DataAttr],
            outputs: &[ArtifactId::ReductionReport],
            invalidation_key: "resolved + partition + data_attrs + options",
            invariants: "one operator per reduced storage within a gang-reduction scope",
        },
        PassId::Lower => PassDescriptor {
            name: "lower",
            inputs: &[
                PassId::Check,
                PassId::LoopCount,
                PassId::DataAttr,
                PassId::Reduction,
            ],
            outputs: &[ArtifactId::Lowered, ArtifactId::Cert],
            invalidation_key: "resolved + partition + data_attrs + options",
            invariants: "every effective directive translated; runs only on error-free units",
        },
    }
}

// ── Dependency resolution ──────────────────────────────────────────────────

/// All pass IDs in declaration order.
pub const ALL_PASSES: [PassId; 7] = [
    PassId::Resolve,
    PassId::Check,
    PassId::Partition,
    PassId::LoopCount,
    PassId::DataAttr,
    PassId::Reduction,
    PassId::Lower,
];

/// Compute the minimal ordered set of passes needed to produce `terminal`.
/// Returns passes in topological (execution) order.
pub fn required_passes(terminal: PassId) -> Vec<PassId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    visit(terminal, &mut visited, &mut order);
    order
}

/// Every diagnosing pass, without lowering.
pub fn analysis_passes() -> Vec<PassId> {
    required_passes(PassId::Lower)
        .into_iter()
        .filter(|&p| p != PassId::Lower)
        .collect()
}

fn visit(id: PassId, visited: &mut HashSet<PassId>, order: &mut Vec<PassId>) {
    if !visited.insert(id) {
        return;
    }
    for &dep in descriptor(id).inputs {
        visit(dep, visited, order);
    }
    order.push(id);
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_passes_lower_includes_all() {
        let passes = required_passes(PassId::Lower);
        assert_eq!(passes.len(), 7);
        assert_eq!(
            passes,
            vec![
                PassId::Resolve,
                PassId::Check,
                PassId::LoopCount,
                PassId::Partition,
                PassId::DataAttr,
                PassId::Reduction,
                PassId::Lower,
            ]
        );
    }

    #[test]
    fn required_passes_data_attr_skips_checks() {
        let passes = required_passes(PassId::DataAttr);
        assert_eq!(
            passes,
            vec![PassId::Resolve, PassId::Partition, PassId::DataAttr]
        );
        assert!(!passes.contains(&PassId::Check));
        assert!(!passes.contains(&PassId::LoopCount));
    }

    #[test]
    fn required_passes_loop_count_is_minimal() {
        assert_eq!(required_passes(PassId::LoopCount), vec![PassId::LoopCount]);
    }

    #[test]
    fn analysis_passes_exclude_lower() {
        let passes = analysis_passes();
        assert_eq!(passes.len(), 6);
        assert!(!passes.contains(&PassId::Lower));
    }

    #[test]
    fn no_parse_in_pass_id() {
        for pass in &ALL_PASSES {
            assert_ne!(descriptor(*pass).name, "parse");
        }
    }

    #[test]
    fn all_descriptors_have_outputs() {
        for pass in &ALL_PASSES {
            let desc = descriptor(*pass);
            assert!(
                !desc.outputs.is_empty(),
                "pass {:?} has no outputs declared",
                pass
            );
        }
    }

    #[test]
    fn dependency_edges_are_consistent() {
        for pass in &ALL_PASSES {
            let desc = descriptor(*pass);
            let order = required_passes(*pass);
            for dep in desc.inputs {
                let dep_pos = order.iter().position(|p| p == dep);
                let self_pos = order.iter().position(|p| p == pass);
                assert!(
                    dep_pos.unwrap() < self_pos.unwrap(),
                    "{:?} depends on {:?} but it comes later in topological order",
                    pass,
                    dep
                );
            }
        }
    }
}
