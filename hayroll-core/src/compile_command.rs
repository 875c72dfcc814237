//! One entry of a `compile_commands.json` database: the arguments, working
//! directory, source file, and object output of a single compiler
//! invocation that the driver turns into one translation unit to process.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileCommand {
    pub arguments: Vec<String>,
    pub directory: PathBuf,
    pub file: PathBuf,
    pub output: PathBuf,
}

impl CompileCommand {
    /// `-I` arguments resolved to absolute paths against `directory`, with
    /// `directory` itself prepended (matching the compiler's own implicit
    /// search of the current working directory).
    pub fn include_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.directory.clone()];
        for arg in &self.arguments {
            let Some(rest) = arg.strip_prefix("-I") else {
                continue;
            };
            let path = Path::new(rest);
            let absolute = if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.directory.join(path)
            };
            paths.push(absolute);
        }
        paths
    }

    /// Returns a copy pointed at a different input file, e.g. swapping the
    /// original source for a seeded or preprocessed variant of it. Never
    /// mutates `self`.
    pub fn with_updated_file(&self, file: impl Into<PathBuf>) -> CompileCommand {
        CompileCommand {
            file: file.into(),
            ..self.clone()
        }
    }

    pub fn with_updated_directory(&self, directory: impl Into<PathBuf>) -> CompileCommand {
        CompileCommand {
            directory: directory.into(),
            ..self.clone()
        }
    }

    pub fn with_updated_output(&self, output: impl Into<PathBuf>) -> CompileCommand {
        CompileCommand {
            output: output.into(),
            ..self.clone()
        }
    }

    /// Returns a copy whose arguments carry one `-D` flag per entry of
    /// `define_set`, appended after the original arguments so they win any
    /// conflicting prior definition.
    pub fn with_updated_define_set(&self, define_set: &crate::define_set::DefineSet) -> CompileCommand {
        let mut arguments = self.arguments.clone();
        arguments.extend(define_set.to_options());
        CompileCommand {
            arguments,
            ..self.clone()
        }
    }

    pub fn file_relative_to_directory(&self) -> PathBuf {
        if self.file.is_absolute() {
            pathdiff(&self.file, &self.directory).unwrap_or_else(|| self.file.clone())
        } else {
            self.file.clone()
        }
    }

    pub fn from_compile_commands_json(json: &serde_json::Value) -> Result<Vec<CompileCommand>> {
        let array = json.as_array().ok_or_else(|| {
            crate::error::HayrollError::Internal(format!(
                "expected an array in compile_commands.json, got: {json}"
            ))
        })?;

        let mut commands = Vec::with_capacity(array.len());
        for item in array {
            let mut command: CompileCommand = serde_json::from_value(item.clone())?;
            command.directory = command.directory.canonicalize()?;
            command.file = command.file.canonicalize()?;
            if command.output.exists() {
                command.output = command.output.canonicalize()?;
            }
            commands.push(command);
        }
        Ok(commands)
    }

    pub fn to_compile_commands_json(commands: &[CompileCommand]) -> serde_json::Value {
        serde_json::to_value(commands).expect("CompileCommand serializes infallibly")
    }
}

/// A small relative-path diff, since `std::path` has no built-in one and
/// pulling in a crate just for this single call isn't worth it.
fn pathdiff(path: &Path, base: &Path) -> Option<PathBuf> {
    let mut path_components = path.components();
    let mut base_components = base.components();
    loop {
        match (path_components.clone().next(), base_components.clone().next()) {
            (Some(p), Some(b)) if p == b => {
                path_components.next();
                base_components.next();
            }
            _ => break,
        }
    }
    let mut result = PathBuf::new();
    for _ in base_components {
        result.push("..");
    }
    for component in path_components {
        result.push(component);
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_set::DefineSet;
    use std::collections::HashMap;

    #[test]
    fn derivations_never_mutate_the_original() {
        let original = CompileCommand {
            arguments: vec!["-Wall".to_string()],
            directory: PathBuf::from("/proj/build"),
            file: PathBuf::from("/proj/src/a.c"),
            output: PathBuf::from("/proj/build/a.o"),
        };

        let mut defines = HashMap::new();
        defines.insert("A".to_string(), None);
        let updated = original
            .with_updated_file("/proj/src/a.seeded.c")
            .with_updated_define_set(&DefineSet::from_model(defines));

        assert_eq!(original.file, PathBuf::from("/proj/src/a.c"));
        assert_eq!(original.arguments, vec!["-Wall".to_string()]);
        assert_eq!(updated.file, PathBuf::from("/proj/src/a.seeded.c"));
        assert_eq!(updated.arguments, vec!["-Wall".to_string(), "-DA".to_string()]);
    }

    #[test]
    fn include_paths_prepends_directory_and_resolves_relative_i_flags() {
        let command = CompileCommand {
            arguments: vec!["-Iinclude".to_string(), "-I/usr/local/include".to_string()],
            directory: PathBuf::from("/proj/build"),
            file: PathBuf::from("/proj/src/a.c"),
            output: PathBuf::from("/proj/build/a.o"),
        };
        assert_eq!(
            command.include_paths(),
            vec![
                PathBuf::from("/proj/build"),
                PathBuf::from("/proj/build/include"),
                PathBuf::from("/usr/local/include"),
            ]
        );
    }
}
