//! Drives the external macro analyzer, which inspects a project's
//! `compile_commands.json` and emits one line per macro invocation or
//! region of interest, prefixed `Invocation`/`Range` followed by a JSON
//! object. Stages a scratch `compile_commands.json` pointing at exactly
//! the one project directory the analyzer was invoked for.

use std::path::Path;

use crate::compile_command::CompileCommand;
use crate::error::Result;
use crate::external::{ExternalTool, TempDir};

pub fn run_macro_analysis(
    tool: &ExternalTool,
    compile_commands: &[CompileCommand],
    proj_dir: &Path,
    num_threads: usize,
) -> Result<String> {
    let commands_dir = TempDir::new()?;
    let commands_path = commands_dir.path().join("compile_commands.json");
    std::fs::write(
        &commands_path,
        serde_json::to_string_pretty(&CompileCommand::to_compile_commands_json(compile_commands))?,
    )?;

    let output_dir = TempDir::new()?;

    let args = vec![
        commands_path.display().to_string(),
        proj_dir.display().to_string(),
        output_dir.path().display().to_string(),
        num_threads.to_string(),
    ];
    tool.run(&args, proj_dir)?;

    let mut combined = String::new();
    for entry in std::fs::read_dir(output_dir.path())? {
        let entry = entry?;
        if entry.path().extension().and_then(|e| e.to_str()) == Some("cpp2c") {
            combined.push_str(&std::fs::read_to_string(entry.path())?);
        }
    }
    Ok(combined)
}
