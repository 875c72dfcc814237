//! Resolves `#include` spellings to canonical filesystem paths by driving
//! `cc -H -fsyntax-only` as an oracle rather than re-implementing a
//! search-path algorithm. This is the one place `hayroll-core` shells out
//! to a real C compiler instead of treating the external preprocessor as
//! an opaque per-configuration collaborator -- resolving an include is
//! needed up front, during symbolic execution, before any configuration
//! has been chosen.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{HayrollError, Result};

/// Drives a host C compiler to resolve `#include` spellings and to dump
/// its built-in predefined macros.
pub struct IncludeResolver {
    cc_exe: String,
    include_paths: Vec<PathBuf>,
}

impl IncludeResolver {
    pub fn new(cc_exe: impl Into<String>, include_paths: Vec<PathBuf>) -> Self {
        Self {
            cc_exe: cc_exe.into(),
            include_paths,
        }
    }

    /// Resolves one `#include` spelling. `parent_paths` are ancestor
    /// directories of the including file, leaf (own directory) first, used
    /// only for user (`"..."`) includes.
    pub fn resolve(
        &self,
        is_system: bool,
        include_name: &str,
        parent_paths: &[PathBuf],
    ) -> Result<PathBuf> {
        // Pseudo-files synthesized by the compiler itself, e.g. `<built-in>`
        // or `<command-line>`, have no real path to resolve.
        if include_name.starts_with('<') {
            return Ok(PathBuf::from(include_name));
        }
        let spelled = Path::new(include_name);
        if spelled.is_absolute() {
            return spelled
                .canonicalize()
                .map_err(|_| self.unresolved(include_name));
        }

        let dir = tempfile::tempdir()?;
        let stub_path = dir.path().join("stub.c");
        {
            let mut stub = std::fs::File::create(&stub_path)?;
            if is_system {
                writeln!(stub, "#include <{include_name}>")?;
            } else {
                writeln!(stub, "#include \"{include_name}\"")?;
            }
        }

        let mut cmd = Command::new(&self.cc_exe);
        cmd.arg("-H").arg("-fsyntax-only");
        if !is_system {
            for parent in parent_paths {
                cmd.arg(format!("-I{}", parent.display()));
            }
        }
        for include_path in &self.include_paths {
            cmd.arg(format!("-I{}", include_path.display()));
        }
        cmd.arg(&stub_path);

        let output = cmd.output().map_err(|e| HayrollError::ExternalToolFailure {
            tool: self.cc_exe.clone(),
            exit_code: None,
            stderr_tail: e.to_string(),
        })?;
        let hierarchy = String::from_utf8_lossy(&output.stderr);
        tracing::trace!(%hierarchy, "include hierarchy");

        let resolved = parse_stub_include_path(&hierarchy).ok_or_else(|| self.unresolved(include_name))?;
        Path::new(&resolved)
            .canonicalize()
            .map_err(|_| self.unresolved(include_name))
    }

    pub fn resolve_system(&self, include_name: &str) -> Result<PathBuf> {
        self.resolve(true, include_name, &[])
    }

    pub fn resolve_user(&self, include_name: &str, parent_paths: &[PathBuf]) -> Result<PathBuf> {
        self.resolve(false, include_name, parent_paths)
    }

    /// The textual `#define` dump the host compiler emits before processing
    /// any real source (`cc -dM -E - < /dev/null`), used to prime the
    /// symbol table with predefined macros (`__STDC__`, etc.) before
    /// running the symbolic executor on the real translation unit.
    pub fn builtin_macros(&self) -> Result<String> {
        let output = Command::new(&self.cc_exe)
            .arg("-dM")
            .arg("-E")
            .arg("-")
            .stdin(std::process::Stdio::null())
            .output()
            .map_err(|e| HayrollError::ExternalToolFailure {
                tool: self.cc_exe.clone(),
                exit_code: None,
                stderr_tail: e.to_string(),
            })?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn unresolved(&self, spelling: &str) -> HayrollError {
        HayrollError::UnresolvedInclude {
            spelling: spelling.to_string(),
            including: PathBuf::new(),
        }
    }
}

/// Parses the first "top-level" line (prefixed with exactly one `. `) out
/// of a `cc -H` hierarchy dump -- that's always the direct include the stub
/// file performed.
fn parse_stub_include_path(hierarchy: &str) -> Option<String> {
    for line in hierarchy.lines() {
        if let Some(rest) = line.strip_prefix(". ") {
            return Some(rest.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_top_level_hierarchy_line() {
        let hierarchy = "\
. /usr/include/stdio.h
.. /usr/include/bits/types.h
... /usr/include/bits/wordsize.h
";
        assert_eq!(
            parse_stub_include_path(hierarchy),
            Some("/usr/include/stdio.h".to_string())
        );
    }

    #[test]
    fn angle_bracketed_pseudo_path_passes_through() {
        let resolver = IncludeResolver::new("cc", vec![]);
        let resolved = resolver.resolve(true, "<built-in>", &[]).unwrap();
        assert_eq!(resolved, PathBuf::from("<built-in>"));
    }
}
