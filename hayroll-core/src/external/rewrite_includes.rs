//! Runs the external preprocessor with `-frewrite-includes`, which inlines
//! every `#include` actually reached but expands no macros, leaving GNU
//! linemarkers behind for [`crate::line_mapper`] to read.

use crate::compile_command::CompileCommand;
use crate::error::Result;
use crate::external::{ExternalTool, TempDir};

pub fn rewrite_includes(tool: &ExternalTool, compile_command: &CompileCommand) -> Result<String> {
    let scratch = TempDir::new()?;
    let output_path = scratch.path().join("rewrite_includes.cu.c");

    let mut args = vec!["-E".to_string(), "-frewrite-includes".to_string()];
    args.extend(
        compile_command
            .arguments
            .iter()
            .filter(|arg| arg.starts_with("-D") || arg.starts_with("-I"))
            .cloned(),
    );
    args.push("-o".to_string());
    args.push(output_path.display().to_string());
    args.push(compile_command.file.display().to_string());

    tool.run(&args, &compile_command.directory)?;
    Ok(std::fs::read_to_string(&output_path)?)
}
