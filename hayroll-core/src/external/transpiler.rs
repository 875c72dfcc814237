//! Drives the external transpiler on one seeded compilation unit: stage
//! the seeded text (with linemarkers erased, since the transpiler's own
//! front end can't parse them) and a scratch `compile_commands.json`
//! pointing at it, run the tool, and read back the emitted
//! target-language file plus its build manifest.

use crate::compile_command::CompileCommand;
use crate::error::{HayrollError, Result};
use crate::external::{ExternalTool, TempDir};
use crate::line_mapper::erase_linemarkers;

/// Transpiles `seeded_cu` under `compile_command`, returning the target
/// source text and its build manifest (e.g. a `Cargo.toml`).
pub fn transpile(
    tool: &ExternalTool,
    seeded_cu: &str,
    compile_command: &CompileCommand,
) -> Result<(String, String)> {
    let input_dir = TempDir::new()?;
    let input_path = input_dir.path().join("input.seeded.cu.c");
    std::fs::write(&input_path, erase_linemarkers(seeded_cu))?;

    let updated_command = compile_command.with_updated_file(&input_path);

    let commands_dir = TempDir::new()?;
    let commands_path = commands_dir.path().join("compile_commands.json");
    std::fs::write(
        &commands_path,
        serde_json::to_string_pretty(&CompileCommand::to_compile_commands_json(&[updated_command]))?,
    )?;

    let output_dir = TempDir::new()?;
    let args = vec![
        "transpile".to_string(),
        "--reorganize-definitions".to_string(),
        "--emit-build-files".to_string(),
        commands_path.display().to_string(),
        "--output-dir".to_string(),
        output_dir.path().display().to_string(),
    ];
    tool.run(&args, input_dir.path())?;

    let src_dir = output_dir.path().join("src");
    let main_entry = std::fs::read_dir(&src_dir)
        .map_err(|_| missing_output(&tool.name, "src/*.rs"))?
        .filter_map(|e| e.ok())
        .find(|e| e.path().extension().and_then(|x| x.to_str()) == Some("rs"))
        .ok_or_else(|| missing_output(&tool.name, "src/*.rs"))?;

    let rust_source = std::fs::read_to_string(main_entry.path())?;
    let manifest_path = output_dir.path().join("Cargo.toml");
    let manifest = std::fs::read_to_string(&manifest_path).map_err(|_| missing_output(&tool.name, "Cargo.toml"))?;

    Ok((rust_source, manifest))
}

fn missing_output(tool: &str, expected: &str) -> HayrollError {
    HayrollError::ExternalToolFailure {
        tool: tool.to_string(),
        exit_code: Some(0),
        stderr_tail: format!("expected output {expected} was not produced"),
    }
}
