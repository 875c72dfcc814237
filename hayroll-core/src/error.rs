//! Error types for the Hayroll preprocessor-aware transpilation core.
//!
//! One variant per row of the error taxonomy: unresolved includes, unbalanced
//! or recursive macro invocations, unsatisfiable units, external tool
//! failures, and configurations the transpiler can't handle. Seeding
//! warnings are non-fatal and are collected into a report instead of this
//! enum (see [`crate::seeder::SeedingReport`]).

use std::path::PathBuf;

/// Result type alias for Hayroll operations.
pub type Result<T> = std::result::Result<T, HayrollError>;

/// Main error type for the Hayroll core pipeline.
#[derive(Debug, thiserror::Error)]
pub enum HayrollError {
    /// A `#include` spelling could not be resolved against the search path.
    #[error("unresolved include {spelling:?} from {including}")]
    UnresolvedInclude {
        spelling: String,
        including: PathBuf,
    },

    /// A function-like macro invocation's argument list never closed.
    #[error("unbalanced invocation of macro {0}")]
    UnbalancedInvocation(String),

    /// A macro expanded into itself (directly or through the undef stack).
    #[error("recursive expansion of macro {0}")]
    RecursiveExpansion(String),

    /// No feasible symbolic-execution path reached the end of the unit.
    #[error("translation unit {0} has no satisfiable end state")]
    UnsatisfiableUnit(PathBuf),

    /// An external collaborator (preprocessor, macro analyzer, transpiler,
    /// or post-processor) exited non-zero.
    #[error("external tool {tool} failed (exit {exit_code:?}): {stderr_tail}")]
    ExternalToolFailure {
        tool: String,
        exit_code: Option<i32>,
        stderr_tail: String,
    },

    /// The Splitter found a configuration the transpiler rejects.
    #[error("configuration not transpilable: {0}")]
    NotTranspilable(String),

    /// A malformed `defined defined X` or similar preprocessor-grammar error.
    #[error("malformed preprocessor expression: {0}")]
    MalformedExpression(String),

    /// Wrapped I/O errors from reading sources or writing intermediates.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped JSON errors from compile_commands.json or tag/manifest I/O.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for programmer-error assertions outside debug builds.
    #[error("internal error: {0}")]
    Internal(String),
}
