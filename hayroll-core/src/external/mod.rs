//! Wrappers around every collaborator the pipeline shells out to: the
//! rewriting preprocessor pass, the macro analyzer, the transpiler, and the
//! four post-processors. None of these tools is reimplemented here; each
//! wrapper only builds the right argv, runs the process in a scratch
//! directory, and loads back whatever file the tool is documented to
//! produce.

mod macro_analyzer;
mod post_processor;
mod rewrite_includes;
mod temp_dir;
mod transpiler;

pub use macro_analyzer::run_macro_analysis;
pub use post_processor::{cleaner, inliner, merger, reaper, PostProcessor};
pub use rewrite_includes::rewrite_includes;
pub use temp_dir::TempDir;
pub use transpiler::transpile;

use std::path::Path;
use std::process::{Command, Output};

use crate::error::{HayrollError, Result};

/// One external executable this pipeline shells out to: just a name (for
/// error messages) and a resolved path/command name.
#[derive(Debug, Clone)]
pub struct ExternalTool {
    pub name: String,
    pub executable: String,
}

impl ExternalTool {
    pub fn new(name: impl Into<String>, executable: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
        }
    }

    /// Runs the tool with `args` from `cwd`, failing loudly (with a stderr
    /// tail) on a non-zero exit or spawn failure.
    pub fn run(&self, args: &[String], cwd: &Path) -> Result<Output> {
        let output = Command::new(&self.executable)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|e| HayrollError::ExternalToolFailure {
                tool: self.name.clone(),
                exit_code: None,
                stderr_tail: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr.chars().rev().take(2000).collect::<String>().chars().rev().collect();
            return Err(HayrollError::ExternalToolFailure {
                tool: self.name.clone(),
                exit_code: output.status.code(),
                stderr_tail: tail,
            });
        }
        Ok(output)
    }
}
