//! Runs every translation unit of a `compile_commands.json` through the
//! full pipeline -- symbolic execution, premise refinement, splitting, and
//! per-configuration preprocessing/analysis/seeding/transpilation -- on a
//! bounded worker pool, then folds the per-unit build manifests and feature
//! atoms into the output project's root-level build files.
//!
//! Every worker shares one `AtomicUsize` task counter and fetch-adds the
//! next index until the work list is exhausted; a per-unit failure is
//! recorded into that unit's outcome slot rather than aborting the run, and
//! an end-of-run aggregation step folds every surviving unit's manifest and
//! feature atoms into the output project's build files.
//! `SymbolicExecutor`'s `z3::Context` and `Rc<SymbolTable>` aren't `Send`,
//! so each worker builds and owns its unit's entire pipeline state locally
//! rather than receiving jobs over a channel from a shared pool.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::Deserialize;
use z3::Context;

use crate::ast_bank::AstBank;
use crate::compile_command::CompileCommand;
use crate::config::Config;
use crate::define_set::DefineSet;
use crate::error::{HayrollError, Result};
use crate::expr::BoolExpr;
use crate::external::{self, rewrite_includes, run_macro_analysis, transpile, ExternalTool, PostProcessor};
use crate::include_tree::IncludeForest;
use crate::line_mapper::{build_line_map, LineMap};
use crate::premise_tree::PremiseTree;
use crate::program_point::ProgramPoint;
use crate::seeder::{seed, seeded_macro_names, CuLocation, MacroInvocationSummary, RegionSummary, SeedingReport};
use crate::source_position::Span;
use crate::splitter::split;
use crate::symbolic_executor::SymbolicExecutor;

/// Executables of every collaborator process the driver shells out to. The
/// original links each of these in as its own compiled wrapper class
/// (`RewriteIncludesWrapper`, `MakiWrapper`, `C2RustWrapper`,
/// `ReaperWrapper`, `MergerWrapper`, `CleanerWrapper`); here they're plain
/// configuration, resolved once per run by the CLI layer.
#[derive(Debug, Clone)]
pub struct ExternalTools {
    pub cc: String,
    pub macro_analyzer: String,
    pub transpiler: String,
    pub reaper: String,
    pub merger: String,
    pub cleaner: String,
}

impl Default for ExternalTools {
    fn default() -> Self {
        Self {
            cc: "cc".to_string(),
            macro_analyzer: "maki".to_string(),
            transpiler: "c2rust".to_string(),
            reaper: "hayroll-reaper".to_string(),
            merger: "hayroll-merger".to_string(),
            cleaner: "hayroll-cleaner".to_string(),
        }
    }
}

const TARGET_EXT: &str = "rs";

/// What one translation unit produced: every configuration split out of it,
/// plus the seeding reports and Cargo-manifest fragments the end-of-run
/// aggregation folds together.
pub struct UnitArtifacts {
    pub define_sets: Vec<DefineSet>,
    pub seeding_reports: Vec<SeedingReport>,
    pub manifests: Vec<String>,
    pub feature_atoms: BTreeSet<String>,
}

/// One unit's outcome, success or failure; a failure doesn't abort the run.
pub struct UnitOutcome {
    pub file: PathBuf,
    pub result: Result<UnitArtifacts>,
}

/// Runs every compile command's unit through the pipeline on a bounded
/// worker pool, writing per-unit intermediates under `output_dir/src`, then
/// folds the aggregated manifest/feature-atom/library-entry build files at
/// `output_dir`'s root. Returns the per-unit outcomes in task order; it's
/// up to the caller to turn a partial failure into a process exit code.
pub fn run(commands: &[CompileCommand], config: &Config, tools: &ExternalTools, output_dir: &Path) -> Result<Vec<UnitOutcome>> {
    std::fs::create_dir_all(output_dir.join("src"))?;
    let num_tasks = commands.len();
    let worker_count = config.worker_count(num_tasks);
    tracing::info!(num_tasks, worker_count, "starting pipeline run");

    let next_idx = AtomicUsize::new(0);
    let slots: Mutex<Vec<Option<UnitOutcome>>> = Mutex::new((0..num_tasks).map(|_| None).collect());

    std::thread::scope(|scope| {
        for worker in 0..worker_count {
            scope.spawn(move || loop {
                let idx = next_idx.fetch_add(1, Ordering::Relaxed);
                if idx >= num_tasks {
                    break;
                }
                let command = &commands[idx];
                let span = tracing::info_span!("unit", worker, file = %command.file.display());
                let _enter = span.enter();
                tracing::debug!("processing");
                let result = process_unit(command, config, tools, output_dir);
                if let Err(err) = &result {
                    tracing::error!(%err, "unit failed");
                }
                slots.lock()[idx] = Some(UnitOutcome {
                    file: command.file.clone(),
                    result,
                });
            });
        }
    });

    let outcomes: Vec<UnitOutcome> = slots
        .into_inner()
        .into_iter()
        .map(|slot| slot.expect("every task index is visited exactly once"))
        .collect();

    write_project_build_files(output_dir, &outcomes)?;
    Ok(outcomes)
}

/// Runs one translation unit's entire pipeline: symbolic execution,
/// refinement, splitting, and per-configuration rewrite/analyze/seed/
/// transpile/reap, folding the per-configuration outputs with the external
/// merger and finishing with the cleaner. Every intermediate artifact is
/// written under `output_dir/src` as it's produced.
pub fn process_unit(
    command: &CompileCommand,
    config: &Config,
    tools: &ExternalTools,
    output_dir: &Path,
) -> Result<UnitArtifacts> {
    let stem = unit_stem(command);
    let src_ext = command.file.extension().and_then(|e| e.to_str()).unwrap_or("c").to_string();

    let source_text = std::fs::read_to_string(&command.file)?;
    write_artifact(output_dir, &stem, &src_ext, &source_text)?;

    let mut executor = SymbolicExecutor::new(tools.cc.clone(), command.file.clone(), command.include_paths())?;
    let end_states = executor.run()?;
    if end_states.is_empty() {
        return Err(HayrollError::UnsatisfiableUnit(command.file.clone()));
    }
    let mut tree = executor
        .take_premise_tree()
        .ok_or_else(|| HayrollError::Internal("symbolic execution produced no premise tree".to_string()))?;
    write_artifact(output_dir, &stem, "premise_tree.raw.txt", &tree.dump(tree.root(), executor.forest(), 0))?;

    let ctx = Context::new(&z3::Config::new());
    tree.refine(&ctx);
    write_artifact(output_dir, &stem, "premise_tree.txt", &tree.dump(tree.root(), executor.forest(), 0))?;

    let define_sets = split(&tree, &ctx, |_candidate| Ok(()))?;
    write_artifact(output_dir, &stem, "defset.txt", &DefineSet::sets_to_string(&define_sets))?;

    let rewrite_tool = ExternalTool::new("preprocessor", tools.cc.clone());
    let analyzer_tool = ExternalTool::new("macro-analyzer", tools.macro_analyzer.clone());
    let transpiler_tool = ExternalTool::new("transpiler", tools.transpiler.clone());
    let reaper_tool = external::reaper(tools.reaper.clone());
    let merger_tool = external::merger(tools.merger.clone());
    let cleaner_tool = external::cleaner(tools.cleaner.clone());

    let include_node = executor
        .root()
        .ok_or_else(|| HayrollError::Internal("symbolic execution never recorded the unit's include root".to_string()))?;

    let mut feature_atoms = BTreeSet::new();
    let mut seeding_reports = Vec::with_capacity(define_sets.len());
    let mut manifests = Vec::with_capacity(define_sets.len());
    let mut reaped_texts: Vec<String> = Vec::with_capacity(define_sets.len());

    for (i, define_set) in define_sets.iter().enumerate() {
        feature_atoms.extend(define_set.defines.keys().cloned());
        let command_with_defines = command.with_updated_define_set(define_set);

        let cu_text = rewrite_includes(&rewrite_tool, &command_with_defines)?;
        write_artifact(output_dir, &stem, &format!("{i}.cu.{src_ext}"), &cu_text)?;

        let line_map = build_line_map(&cu_text, executor.forest(), executor.include_resolver(), include_node);

        let raw_analysis = run_macro_analysis(&analyzer_tool, &[command_with_defines.clone()], &config.project_dir, 1)?;
        write_artifact(output_dir, &stem, &format!("{i}.cpp2c"), &raw_analysis)?;

        let (invocations, raw_regions) = parse_macro_analysis_output(&raw_analysis)?;
        let regions = attach_premises(&raw_regions, &tree, executor.forest(), executor.ast_bank(), &line_map);
        write_artifact(
            output_dir,
            &stem,
            &format!("{i}.cpp2c.ranges.json"),
            &serde_json::to_string_pretty(&regions)?,
        )?;

        let (seeded_cu, report) = seed(&cu_text, &invocations, &regions, &line_map, executor.forest());
        feature_atoms.extend(seeded_macro_names(&invocations, &report));
        write_artifact(output_dir, &stem, &format!("{i}.seeded.cu.{src_ext}"), &seeded_cu)?;

        let (raw_rust, manifest) = transpile(&transpiler_tool, &seeded_cu, &command_with_defines)?;
        write_artifact(output_dir, &stem, &format!("{i}.{TARGET_EXT}"), &raw_rust)?;

        let reaped_text = run_single_input_post_processor(&reaper_tool, &raw_rust, &manifest)?;
        write_artifact(output_dir, &stem, &format!("{i}.reaped.{TARGET_EXT}"), &reaped_text)?;

        manifests.push(manifest);
        reaped_texts.push(reaped_text);
        seeding_reports.push(report);
    }

    let mut merged = reaped_texts.first().cloned().unwrap_or_default();
    for (i, next) in reaped_texts.iter().enumerate().skip(1) {
        merged = run_merger(&merger_tool, &merged, next)?;
        write_artifact(output_dir, &stem, &format!("{i}.merged.{TARGET_EXT}"), &merged)?;
    }

    let fallback_manifest = manifests.last().cloned().unwrap_or_else(scratch_manifest);
    let cleaned = run_single_input_post_processor(&cleaner_tool, &merged, &fallback_manifest)?;
    write_artifact(output_dir, &stem, TARGET_EXT, &cleaned)?;

    Ok(UnitArtifacts {
        define_sets,
        seeding_reports,
        manifests,
        feature_atoms,
    })
}

/// One macro analyzer "Range" line, before its symbolic premise has been
/// reattached; the analyzer has no notion of Hayroll's premises, only the
/// concrete CU text it was run against.
#[derive(Deserialize)]
struct AnalyzerRegion {
    ast_kind: String,
    loc_begin: CuLocation,
    loc_end: CuLocation,
}

/// Splits the macro analyzer's combined output into invocation and region
/// lines -- one line per finding, prefixed `Invocation`/`Range`, followed by
/// a JSON object -- deserializing each directly.
fn parse_macro_analysis_output(raw: &str) -> Result<(Vec<MacroInvocationSummary>, Vec<AnalyzerRegion>)> {
    let mut invocations = Vec::new();
    let mut regions = Vec::new();
    for line in raw.lines() {
        if let Some(json) = line.strip_prefix("Invocation ") {
            invocations.push(serde_json::from_str(json)?);
        } else if let Some(json) = line.strip_prefix("Range ") {
            regions.push(serde_json::from_str(json)?);
        }
    }
    Ok((invocations, regions))
}

/// Reattaches each analyzer-discovered region to the symbolic premise that
/// covers it: maps the region's CU-text line back to a source line via
/// `line_map`, re-resolves the enclosing tree-sitter node at that line, and
/// looks that node's span up in the (already-split, so already-concrete)
/// premise tree. Falls back to the tree's root premise if the line can't be
/// mapped back (concretely-executed text outside any tracked include).
fn attach_premises(
    raw_regions: &[AnalyzerRegion],
    tree: &PremiseTree,
    forest: &IncludeForest,
    ast_bank: &AstBank,
    line_map: &LineMap,
) -> Vec<RegionSummary> {
    raw_regions
        .iter()
        .map(|region| {
            let premise = region_premise(tree, forest, ast_bank, line_map, region.loc_begin.line)
                .unwrap_or_else(|| tree.complete_premise(tree.root()));
            RegionSummary {
                ast_kind: region.ast_kind.clone(),
                loc_begin: region.loc_begin,
                loc_end: region.loc_end,
                premise,
            }
        })
        .collect()
}

fn region_premise(
    tree: &PremiseTree,
    forest: &IncludeForest,
    ast_bank: &AstBank,
    line_map: &LineMap,
    cu_line: u32,
) -> Option<BoolExpr> {
    let (include_node, src_line) = line_map.cu_to_src(cu_line)?;
    let row = src_line.checked_sub(1)?;
    let source_tree = ast_bank.find(forest.path(include_node))?;
    let point = tree_sitter::Point {
        row: row as usize,
        column: 0,
    };
    let node = source_tree.root_node().descendant_for_point_range(point, point)?;
    let target = ProgramPoint::new(include_node, Span::from_node(&node));
    let node_id = tree.find_enclosing_node(tree.root(), &target, forest);
    Some(tree.complete_premise(node_id))
}

/// Runs a single-input post-processor (reaper, cleaner, inliner): stages
/// `text` as `src/main.rs` alongside `manifest`, runs the tool, and reads
/// the rewritten file back.
fn run_single_input_post_processor(tool: &PostProcessor, text: &str, manifest: &str) -> Result<String> {
    let dir = external::TempDir::new()?;
    let src_dir = dir.path().join("src");
    std::fs::create_dir_all(&src_dir)?;
    std::fs::write(src_dir.join("main.rs"), text)?;
    let manifest_path = dir.path().join("Cargo.toml");
    std::fs::write(&manifest_path, manifest)?;
    tool.run(dir.path(), &manifest_path)?;
    Ok(std::fs::read_to_string(src_dir.join("main.rs"))?)
}

/// Runs the merger, which folds a new configuration's reaped output into
/// the accumulation so far. `base` is staged as `src/main.rs` (rewritten in
/// place, like every other post-processor) and `next` alongside it at the
/// fixed path `src/incoming.rs` the merger is expected to read and fold in.
fn run_merger(tool: &PostProcessor, base: &str, next: &str) -> Result<String> {
    let dir = external::TempDir::new()?;
    let src_dir = dir.path().join("src");
    std::fs::create_dir_all(&src_dir)?;
    std::fs::write(src_dir.join("main.rs"), base)?;
    std::fs::write(src_dir.join("incoming.rs"), next)?;
    let manifest_path = dir.path().join("Cargo.toml");
    std::fs::write(&manifest_path, scratch_manifest())?;
    tool.run(dir.path(), &manifest_path)?;
    Ok(std::fs::read_to_string(src_dir.join("main.rs"))?)
}

fn scratch_manifest() -> String {
    "[package]\nname = \"scratch\"\nversion = \"0.0.0\"\nedition = \"2021\"\n".to_string()
}

/// The translation unit's artifact basename: its file stem, flattened (no
/// directory components), since every unit's output lands directly under
/// `output_dir/src` as one file per unit.
fn unit_stem(command: &CompileCommand) -> PathBuf {
    let stem = command
        .file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "unit".to_string());
    PathBuf::from(stem)
}

fn write_artifact(output_dir: &Path, stem: &Path, suffix: &str, content: &str) -> Result<()> {
    let path = output_dir.join("src").join(format!("{}.{suffix}", stem.display()));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, content)?;
    Ok(())
}

/// End-of-run aggregation, matching `Pipeline::run`'s trailing sequence of
/// `genBuildRs`/`mergeCargoTomls`/`addFeaturesToCargoToml`/`genLibRs`/
/// `genRustToolchainToml`: folds every successful unit's manifest fragment
/// and feature atoms into one root-level `Cargo.toml`, declares each unit as
/// a module of `src/lib.rs`, and writes a fixed `build.rs`/`rust-toolchain.toml`.
fn write_project_build_files(output_dir: &Path, outcomes: &[UnitOutcome]) -> Result<()> {
    let mut feature_atoms = BTreeSet::new();
    let mut manifests = Vec::new();
    let mut modules = Vec::new();

    for outcome in outcomes {
        if let Ok(artifacts) = &outcome.result {
            feature_atoms.extend(artifacts.feature_atoms.iter().cloned());
            manifests.extend(artifacts.manifests.iter().cloned());
            if let Some(name) = outcome.file.file_stem().and_then(|s| s.to_str()) {
                modules.push(sanitize_module_name(name));
            }
        }
    }

    std::fs::write(output_dir.join("Cargo.toml"), merge_manifests(&manifests, &feature_atoms))?;
    std::fs::write(output_dir.join("src").join("lib.rs"), gen_lib_rs(&modules))?;
    std::fs::write(output_dir.join(format!("build.{TARGET_EXT}")), "fn main() {}\n")?;
    std::fs::write(
        output_dir.join("rust-toolchain.toml"),
        "[toolchain]\nchannel = \"stable\"\n",
    )?;

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        tracing::warn!(failed, total = outcomes.len(), "some units failed");
    }
    Ok(())
}

fn sanitize_module_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn gen_lib_rs(modules: &[String]) -> String {
    let mut out = String::from("#![allow(non_snake_case, non_camel_case_types, dead_code)]\n\n");
    for module in modules {
        out.push_str(&format!("pub mod {module};\n"));
    }
    out
}

/// Unions every per-unit manifest's `[dependencies]` table (deduplicated,
/// sorted for determinism) and adds one no-op feature per discovered
/// configuration atom, the way `addFeaturesToCargoToml` turns each `-D`able
/// macro name into a selectable Cargo feature.
fn merge_manifests(manifests: &[String], feature_atoms: &BTreeSet<String>) -> String {
    let mut dependency_lines: BTreeSet<String> = BTreeSet::new();
    for manifest in manifests {
        let mut in_dependencies = false;
        for line in manifest.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with('[') {
                in_dependencies = trimmed == "[dependencies]";
                continue;
            }
            if in_dependencies && !trimmed.is_empty() {
                dependency_lines.insert(trimmed.to_string());
            }
        }
    }

    let mut out = String::from("[package]\nname = \"hayroll-output\"\nversion = \"0.1.0\"\nedition = \"2021\"\n\n[dependencies]\n");
    for line in &dependency_lines {
        out.push_str(line);
        out.push('\n');
    }
    if !feature_atoms.is_empty() {
        out.push_str("\n[features]\n");
        for atom in feature_atoms {
            out.push_str(&format!("{atom} = []\n"));
        }
    }
    out
}
