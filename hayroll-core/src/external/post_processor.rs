//! The four post-processors (reaper, merger, cleaner, inliner) differ only
//! in executable and name, so they're modeled as one type parameterized by
//! both rather than as four near-identical wrapper types.

use std::path::Path;

use crate::error::Result;
use crate::external::ExternalTool;

/// One post-processing pass: given a directory containing `src/main.<ext>`
/// and a minimal build manifest, rewrites the main file in place.
pub struct PostProcessor {
    tool: ExternalTool,
}

impl PostProcessor {
    pub fn new(name: impl Into<String>, executable: impl Into<String>) -> Self {
        Self {
            tool: ExternalTool::new(name, executable),
        }
    }

    pub fn run(&self, dir: &Path, manifest_path: &Path) -> Result<()> {
        let args = vec![
            dir.display().to_string(),
            manifest_path.display().to_string(),
        ];
        self.tool.run(&args, dir)?;
        Ok(())
    }
}

pub fn reaper(executable: impl Into<String>) -> PostProcessor {
    PostProcessor::new("reaper", executable)
}

pub fn merger(executable: impl Into<String>) -> PostProcessor {
    PostProcessor::new("merger", executable)
}

pub fn cleaner(executable: impl Into<String>) -> PostProcessor {
    PostProcessor::new("cleaner", executable)
}

pub fn inliner(executable: impl Into<String>) -> PostProcessor {
    PostProcessor::new("inliner", executable)
}
