//! Process-wide configuration, threaded explicitly rather than read from
//! globals: log verbosity is the only setting that leaks out as ambient
//! state (via the `tracing` subscriber); everything else is a value passed
//! into the driver.

use std::path::PathBuf;

/// Configuration for one end-to-end run of the pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root; compile-command paths outside includes are resolved
    /// relative to this when not absolute. Defaults to the parent of
    /// `compile_commands.json`.
    pub project_dir: PathBuf,

    /// Worker thread count. `0` means auto-detect (`min(num_cpus, 16)`,
    /// further clamped to the number of translation units).
    pub jobs: usize,

    /// Macro names eligible for symbolic execution; macros outside this set
    /// (when present) are still looked up and expanded normally but are
    /// never forked on, so every run treats them concretely at whatever
    /// value the compile command's `-D` options give them. `None` means
    /// every macro encountered in a `#if`/`#ifdef` condition is eligible.
    pub whitelist: Option<Vec<String>>,

    /// Enable inline macro expansion in the final target text (passed
    /// through to the external transpiler / inliner post-processor).
    pub inline: bool,

    /// Emit a binary target entry keyed by this translation unit's basename.
    pub binary: Option<String>,

    /// Log verbosity: 0 = info, 1 = debug, 2 = trace.
    pub verbosity: u8,
}

impl Config {
    pub fn worker_count(&self, num_tasks: usize) -> usize {
        let base = if self.jobs == 0 {
            num_cpus::get().min(16)
        } else {
            self.jobs
        };
        base.min(num_tasks.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            jobs: 0,
            whitelist: None,
            inline: false,
            binary: None,
            verbosity: 0,
        }
    }
}
