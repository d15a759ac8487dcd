// config.rs: Lowering options
//
// Options that steer implicit partitioning, `no_create` and `update`
// translation, and optional reduction warnings. Loaded from a JSON file and
// overridable from the command line.
//
// Preconditions: none.
// Postconditions: `LowerOptions::default()` reproduces the stock behavior.
// Failure modes: I/O and JSON errors surface as `ConfigError`.
// Side effects: `load` reads one file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How an OpenACC `no_create` reaches OpenMP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum NoCreateOmp {
    /// `map(no_alloc,hold,alloc: x)` for the clause itself and
    /// `map(no_alloc,alloc: x)` where it is inherited.
    #[default]
    NoAlloc,
    /// `map(hold,alloc: x)`; inherited pointers get `map(alloc: p)`.
    Alloc,
}

/// Motion modifier on the `to`/`from` clauses of a translated `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum UpdatePresentOmp {
    /// `from(present: x)`, unless the directive has `if_present`.
    #[default]
    Present,
    /// `from(x)`.
    NoPresent,
}

/// When a loop without explicit `worker` gets an implicit one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ImplicitWorker {
    #[default]
    None,
    /// On loops that already carry `vector`.
    Vector,
    /// On outer loops, like implicit gang.
    Outer,
    VectorOuter,
}

impl ImplicitWorker {
    pub fn on_vector(self) -> bool {
        matches!(self, ImplicitWorker::Vector | ImplicitWorker::VectorOuter)
    }

    pub fn on_outer(self) -> bool {
        matches!(self, ImplicitWorker::Outer | ImplicitWorker::VectorOuter)
    }
}

/// When a loop without explicit `vector` gets an implicit one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ImplicitVector {
    #[default]
    None,
    Outer,
}

impl ImplicitVector {
    pub fn on_outer(self) -> bool {
        self == ImplicitVector::Outer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LowerOptions {
    pub no_create_omp: NoCreateOmp,
    pub update_present_omp: UpdatePresentOmp,
    pub implicit_worker: ImplicitWorker,
    pub implicit_vector: ImplicitVector,
    /// Warn when a loop repeats the reduction of an enclosing loop or of an
    /// explicit `parallel` reduction with the same operator.
    pub warn_redundant_nested_reduction: bool,
    /// Warn when one directive lists the same reduction variable twice.
    pub warn_redundant_reduction: bool,
}

impl Default for LowerOptions {
    fn default() -> Self {
        LowerOptions {
            no_create_omp: NoCreateOmp::default(),
            update_present_omp: UpdatePresentOmp::default(),
            implicit_worker: ImplicitWorker::default(),
            implicit_vector: ImplicitVector::default(),
            warn_redundant_nested_reduction: true,
            warn_redundant_reduction: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read options file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid options file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl LowerOptions {
    pub fn from_json(text: &str) -> Result<LowerOptions, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn load(path: &Path) -> Result<LowerOptions, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let opts = LowerOptions::from_json("{}").unwrap();
        assert_eq!(opts, LowerOptions::default());
        assert!(opts.warn_redundant_reduction);
    }

    #[test]
    fn kebab_case_fields_and_values() {
        let opts = LowerOptions::from_json(
            r#"{"no-create-omp": "alloc", "implicit-worker": "vector-outer",
                "implicit-vector": "outer", "warn-redundant-nested-reduction": false,
                "update-present-omp": "no-present"}"#,
        )
        .unwrap();
        assert_eq!(opts.no_create_omp, NoCreateOmp::Alloc);
        assert_eq!(opts.update_present_omp, UpdatePresentOmp::NoPresent);
        assert!(opts.implicit_worker.on_vector());
        assert!(opts.implicit_worker.on_outer());
        assert!(opts.implicit_vector.on_outer());
        assert!(!opts.warn_redundant_nested_reduction);
    }

    #[test]
    fn unknown_value_is_error() {
        assert!(LowerOptions::from_json(r#"{"implicit-vector": "inner"}"#).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = LowerOptions::load(Path::new("/nonexistent/acc2omp.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().starts_with("cannot read options file"));
    }
}
