//! Data-driven fixture tests: one `tests/fixtures/*.c` plus a sibling
//! `.expected` file holding the DefineSet count the splitter should produce
//! for it, discovered and run through `libtest-mimic`. Exercises
//! `hayroll-core` directly rather than spawning the built CLI binary: the
//! CLI's own `transpile` form needs an external preprocessor, macro
//! analyzer, and transpiler on `PATH`, none of which this workspace can
//! assume are installed, while the DefineSet split is the one pipeline
//! stage that's entirely internal.

use std::path::{Path, PathBuf};

use anyhow::Context;
use libtest_mimic::{Arguments, Failed, Trial};
use z3::Context as Z3Context;

use hayroll_core::splitter::split;
use hayroll_core::symbolic_executor::SymbolicExecutor;

fn main() -> anyhow::Result<()> {
    let args = Arguments::from_args();
    let fixtures_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");

    let trials = discover(&fixtures_dir).context("failed to discover fixtures")?;
    libtest_mimic::run(&args, trials).exit()
}

fn discover(fixtures_dir: &Path) -> anyhow::Result<Vec<Trial>> {
    let mut trials = Vec::new();
    for entry in std::fs::read_dir(fixtures_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("c") {
            continue;
        }
        let name = path.file_stem().unwrap().to_str().unwrap().to_string();
        let expected_path = path.with_extension("expected");
        let expected: usize = std::fs::read_to_string(&expected_path)
            .with_context(|| format!("reading {}", expected_path.display()))?
            .trim()
            .parse()
            .with_context(|| format!("parsing expected count in {}", expected_path.display()))?;

        trials.push(Trial::test(name, move || run_fixture(&path, expected)));
    }
    trials.sort_by(|a, b| a.name().cmp(b.name()));
    Ok(trials)
}

fn run_fixture(path: &PathBuf, expected_define_sets: usize) -> Result<(), Failed> {
    let cc = std::env::var("CC").unwrap_or_else(|_| "cc".to_string());

    let mut executor = SymbolicExecutor::new(cc, path.clone(), Vec::new())
        .map_err(|e| Failed::from(format!("constructing symbolic executor: {e}")))?;
    executor
        .run()
        .map_err(|e| Failed::from(format!("symbolic execution: {e}")))?;
    let mut tree = executor
        .take_premise_tree()
        .ok_or_else(|| Failed::from("no premise tree produced"))?;

    let ctx = Z3Context::new(&z3::Config::new());
    tree.refine(&ctx);

    let define_sets = split(&tree, &ctx, |_candidate| Ok(())).map_err(|e| Failed::from(format!("splitting: {e}")))?;

    if define_sets.len() != expected_define_sets {
        return Err(Failed::from(format!(
            "expected {expected_define_sets} define sets, got {} ({})",
            define_sets.len(),
            define_sets
                .iter()
                .map(|s| s.to_display_string())
                .collect::<Vec<_>>()
                .join(" | ")
        )));
    }

    Ok(())
}
