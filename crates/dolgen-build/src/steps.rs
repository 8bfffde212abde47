//! Build step synthesis
//!
//! Turns an expanded [`Project`] into the ordered list of [`BuildStep`]s the
//! graph file describes: tool acquisition, archive extraction, per-object
//! post-processing and compilation, the `all_source` target, diff metadata,
//! progress and reconfiguration.

use crate::error::{BuildError, BuildResult};
use crate::model::{Object, Project};
use crate::source::SourceIndex;
use crate::tools::{ToolKind, ToolPaths, ToolSource};
use dolgen_config::ProjectConfig;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the phony target over every compiled object
pub const ALL_SOURCE: &str = "all_source";

/// Compile one unit for one profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileStep {
    /// `<unit>: <library> (<profile>)`, emitted as a comment
    pub label: String,
    pub source: PathBuf,
    pub output: PathBuf,
    pub mw_version: String,
    pub cflags: Vec<String>,
    /// Use the charset-transcoding wrapper rule
    pub shift_jis: bool,
    pub implicit: Vec<PathBuf>,
}

impl CompileStep {
    /// Directory the compiler writes into
    pub fn basedir(&self) -> &Path {
        self.output.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Output path without extension; the dep file is `<basefile>.d`
    pub fn basefile(&self) -> PathBuf {
        self.output.with_extension("")
    }
}

/// One node of the build graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStep {
    /// Fetch a pinned tool release
    DownloadTool {
        kind: ToolKind,
        tag: String,
        output: PathBuf,
    },
    /// Build a tool from a cargo checkout
    BuildTool {
        manifest: PathBuf,
        lockfile: PathBuf,
        bin: String,
        target_dir: PathBuf,
        output: PathBuf,
    },
    /// Extract a reference archive
    Extract {
        archive: PathBuf,
        destination: PathBuf,
        outputs: Vec<PathBuf>,
        implicit: Vec<PathBuf>,
    },
    /// Disassemble a reference object
    Disassemble {
        input: PathBuf,
        output: PathBuf,
        implicit: Vec<PathBuf>,
    },
    /// Dump a reference object's DWARF info
    DwarfDump {
        input: PathBuf,
        output: PathBuf,
        implicit: Vec<PathBuf>,
    },
    Compile(CompileStep),
    /// Phony target over compiled objects
    AllSource { inputs: Vec<PathBuf> },
    /// Regenerate the diff metadata file
    DiffConfig {
        output: PathBuf,
        implicit: Vec<PathBuf>,
    },
    /// Aggregate execution results into the progress report
    Progress { input: PathBuf, output: PathBuf },
    /// Regenerate the graph file itself
    Reconfigure {
        output: PathBuf,
        implicit: Vec<PathBuf>,
    },
}

/// Where the generator writes its own outputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// Build graph, `build.ninja`
    pub graph: PathBuf,
    /// Diff metadata, `objdiff.json`
    pub diff_config: PathBuf,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            graph: PathBuf::from("build.ninja"),
            diff_config: PathBuf::from("objdiff.json"),
        }
    }
}

/// Synthesized steps plus what was learned on the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    pub steps: Vec<BuildStep>,
    /// Default target, when any object is compiled
    pub default: Option<String>,
    /// Sources of units that were skipped
    pub missing_sources: Vec<PathBuf>,
    /// Every compiler identity used by a compile step
    pub compilers_used: BTreeSet<String>,
}

impl BuildPlan {
    /// Number of compile steps
    pub fn compile_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, BuildStep::Compile(_)))
            .count()
    }

    /// Fail when a locally supplied compiler collection lacks a used compiler
    ///
    /// Downloaded compilers are not checked since they don't exist yet.
    pub fn check_compilers(&self, tools: &ToolPaths, exists: impl Fn(&Path) -> bool) -> BuildResult<()> {
        if tools.compilers.source != ToolSource::Local {
            return Ok(());
        }
        for mw_version in &self.compilers_used {
            let path = tools.compiler(mw_version);
            if !exists(&path) {
                return Err(BuildError::MissingCompiler { path });
            }
        }
        Ok(())
    }
}

/// Synthesize every build step for a project
#[tracing::instrument(level = "debug", skip_all, fields(objects = project.objects().len()))]
pub fn synthesize(
    config: &ProjectConfig,
    project: &Project,
    tools: &ToolPaths,
    sources: &SourceIndex,
    outputs: &OutputPaths,
) -> BuildPlan {
    let mut steps = Vec::new();
    let mut missing_sources = Vec::new();
    let mut compilers_used = BTreeSet::new();
    let mut all_source = Vec::new();

    for tool in tools.produced() {
        match tool.source {
            ToolSource::Local => {}
            ToolSource::Download { kind, ref tag } => steps.push(BuildStep::DownloadTool {
                kind,
                tag: tag.clone(),
                output: tool.path.clone(),
            }),
            ToolSource::Cargo {
                ref manifest,
                ref target_dir,
                ref bin,
            } => steps.push(BuildStep::BuildTool {
                manifest: manifest.clone(),
                lockfile: manifest.with_file_name("Cargo.lock"),
                bin: bin.clone(),
                target_dir: target_dir.clone(),
                output: tool.path.clone(),
            }),
        }
    }

    let dtk_implicit = vec![tools.dtk.path.clone()];
    let compile_implicit = |object: &Object| -> Vec<PathBuf> {
        let mut implicit = vec![tools
            .compilers
            .produced_path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| tools.compiler(&object.mw_version))];
        if let Some(wrapper) = tools.wrapper.as_ref().and_then(|w| w.produced_path()) {
            implicit.push(wrapper.to_path_buf());
        }
        if object.shift_jis {
            implicit.push(tools.sjiswrap.path.clone());
        }
        implicit
    };

    for archive in project.archives() {
        steps.push(BuildStep::Extract {
            archive: archive.source.clone(),
            destination: archive.destination.clone(),
            outputs: archive.outputs(),
            implicit: dtk_implicit.clone(),
        });

        for object in project.archive_objects(archive) {
            steps.push(BuildStep::Disassemble {
                input: object.paths.reference.clone(),
                output: object.paths.asm.clone(),
                implicit: dtk_implicit.clone(),
            });
            steps.push(BuildStep::DwarfDump {
                input: object.paths.reference.clone(),
                output: object.paths.dwarf.clone(),
                implicit: dtk_implicit.clone(),
            });

            if !sources.contains(&object.paths.source) {
                if object.complete || config.warn_missing_source {
                    warn!(path = %object.paths.source.display(), "Missing source file");
                }
                missing_sources.push(object.paths.source.clone());
                continue;
            }

            compilers_used.insert(object.mw_version.clone());
            if object.add_to_all {
                all_source.push(object.paths.compiled.clone());
            }
            steps.push(BuildStep::Compile(CompileStep {
                label: format!("{}: {} ({})", object.unit, object.library, object.profile),
                source: object.paths.source.clone(),
                output: object.paths.compiled.clone(),
                mw_version: object.mw_version.clone(),
                cflags: object.flags.clone(),
                shift_jis: object.shift_jis,
                implicit: compile_implicit(object),
            }));
        }
    }

    let default = if all_source.is_empty() {
        None
    } else {
        steps.push(BuildStep::AllSource { inputs: all_source });
        Some(ALL_SOURCE.to_string())
    };

    steps.push(BuildStep::DiffConfig {
        output: outputs.diff_config.clone(),
        implicit: config.config_inputs(),
    });
    steps.push(BuildStep::Progress {
        input: project.layout().results_path(),
        output: project.layout().progress_path(),
    });
    steps.push(BuildStep::Reconfigure {
        output: outputs.graph.clone(),
        implicit: config.config_inputs(),
    });

    debug!(
        steps = steps.len(),
        missing = missing_sources.len(),
        "synthesized build steps"
    );

    BuildPlan {
        steps,
        default,
        missing_sources,
        compilers_used,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{scenario_config, scenario_sources};
    use crate::tools::{HostOs, HostPlatform};
    use dolgen_config::ToolSpec;

    fn plan_for(config: &ProjectConfig, sources: &SourceIndex) -> (BuildPlan, ToolPaths) {
        let project = Project::expand(config).unwrap();
        let tools = ToolPaths::resolve(config, &HostPlatform::new(HostOs::Linux, "x86_64")).unwrap();
        let plan = synthesize(config, &project, &tools, sources, &OutputPaths::default());
        (plan, tools)
    }

    #[test]
    fn test_step_order() {
        let config = scenario_config();
        let (plan, _) = plan_for(&config, &scenario_sources(&config));

        let kinds: Vec<&str> = plan
            .steps
            .iter()
            .map(|s| match s {
                BuildStep::DownloadTool { .. } => "download",
                BuildStep::BuildTool { .. } => "cargo",
                BuildStep::Extract { .. } => "extract",
                BuildStep::Disassemble { .. } => "disasm",
                BuildStep::DwarfDump { .. } => "dwarf",
                BuildStep::Compile(_) => "compile",
                BuildStep::AllSource { .. } => "all",
                BuildStep::DiffConfig { .. } => "diff",
                BuildStep::Progress { .. } => "progress",
                BuildStep::Reconfigure { .. } => "configure",
            })
            .collect();

        let per_profile = [
            "extract", "disasm", "dwarf", "compile", "disasm", "dwarf", "compile",
        ];
        let mut expected = vec!["download"; 4];
        expected.extend(per_profile);
        expected.extend(per_profile);
        expected.extend(["all", "diff", "progress", "configure"]);
        assert_eq!(kinds, expected);
        assert_eq!(plan.default.as_deref(), Some(ALL_SOURCE));
    }

    #[test]
    fn test_missing_source_skips_compile() {
        let config = scenario_config();
        let (plan, _) = plan_for(&config, &SourceIndex::default());

        assert_eq!(plan.compile_count(), 0);
        assert_eq!(plan.default, None);
        assert_eq!(
            plan.missing_sources,
            vec![
                PathBuf::from("src/os/OSAlloc.c"),
                PathBuf::from("src/os/OSReboot.c"),
                PathBuf::from("src/os/OSAlloc.c"),
                PathBuf::from("src/os/OSReboot.c"),
            ]
        );
        assert!(plan
            .steps
            .iter()
            .any(|s| matches!(s, BuildStep::Extract { outputs, .. } if outputs.len() == 2)));
    }

    #[test]
    fn test_compile_implicit_dependencies() {
        let config = scenario_config();
        let (plan, _) = plan_for(&config, &scenario_sources(&config));

        let compile = plan
            .steps
            .iter()
            .find_map(|s| match s {
                BuildStep::Compile(c) => Some(c),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            compile.implicit,
            vec![
                PathBuf::from("build/compilers"),
                PathBuf::from("build/tools/wibo"),
                PathBuf::from("build/tools/sjiswrap.exe"),
            ]
        );
        assert_eq!(compile.basedir(), Path::new("build/DOLSDK-2001-05-22/release/os/src"));
        assert_eq!(
            compile.basefile(),
            PathBuf::from("build/DOLSDK-2001-05-22/release/os/src/OSAlloc")
        );
    }

    #[test]
    fn test_local_compilers_are_checked() {
        let mut config = scenario_config();
        config.tools.compilers = ToolSpec::local("/opt/compilers");
        let (plan, tools) = plan_for(&config, &scenario_sources(&config));

        assert!(plan.check_compilers(&tools, |_| true).is_ok());
        match plan.check_compilers(&tools, |_| false) {
            Err(BuildError::MissingCompiler { path }) => {
                assert_eq!(path, PathBuf::from("/opt/compilers/GC/1.2.5/mwcceppc.exe"))
            }
            other => panic!("expected missing compiler, got {:?}", other),
        }
    }

    #[test]
    fn test_downloaded_compilers_are_not_checked() {
        let config = scenario_config();
        let (plan, tools) = plan_for(&config, &scenario_sources(&config));
        assert!(plan.check_compilers(&tools, |_| false).is_ok());
    }
}
