//! Generator orchestration
//!
//! Runs the whole pipeline for one mode: resolve tools, expand the project,
//! synthesize steps, render outputs. Nothing is written until every stage has
//! succeeded, so a failing run leaves previous outputs untouched.

use crate::error::{BuildError, BuildResult};
use crate::layout::Layout;
use crate::model::Project;
use crate::ninja::{render, Invocation};
use crate::objdiff::DiffConfig;
use crate::output::write_atomic;
use crate::progress::ProgressReport;
use crate::results::ExecutionResults;
use crate::source::SourceIndex;
use crate::state::{fingerprint, GeneratorState, StateStatus};
use crate::steps::{synthesize, BuildPlan, OutputPaths};
use crate::tools::{HostPlatform, ToolPaths};
use dolgen_config::ProjectConfig;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Everything rendered for one run, not yet written
#[derive(Debug)]
pub struct Rendered {
    pub project: Project,
    pub tools: ToolPaths,
    pub plan: BuildPlan,
    /// `build.ninja` text
    pub graph: String,
    /// `objdiff.json` text
    pub diff_config: String,
}

impl Rendered {
    /// Fingerprint recorded in the state file
    pub fn fingerprint(&self) -> String {
        fingerprint([self.graph.as_str(), self.diff_config.as_str()])
    }
}

/// Freshness of the outputs on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    /// Never generated
    Missing,
    /// Generated by an incompatible version
    Stale { found: String },
    /// Generated, but the configuration changed since
    Outdated,
    Current,
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "not generated"),
            Self::Stale { found } => write!(f, "written by incompatible dolgen {}", found),
            Self::Outdated => write!(f, "out of date"),
            Self::Current => write!(f, "up to date"),
        }
    }
}

/// Result of `check`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSummary {
    pub name: String,
    pub version: String,
    pub objects: usize,
    pub archives: usize,
    pub compiled: usize,
    pub missing_sources: usize,
    /// Tools the graph downloads or builds
    pub provisioned_tools: usize,
    pub freshness: Freshness,
}

impl fmt::Display for CheckSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.name, self.version)?;
        writeln!(f, "  {} objects in {} archives", self.objects, self.archives)?;
        writeln!(
            f,
            "  {} compile steps, {} missing sources",
            self.compiled, self.missing_sources
        )?;
        writeln!(f, "  {} tools provisioned by the build", self.provisioned_tools)?;
        writeln!(f, "  Build graph: {}", self.freshness)
    }
}

/// Build file generator for one project configuration
pub struct Generator {
    config: ProjectConfig,
    invocation: Invocation,
    host: HostPlatform,
    outputs: OutputPaths,
    sources: Option<SourceIndex>,
}

impl Generator {
    /// Create a generator for the current host
    pub fn new(config: ProjectConfig, invocation: Invocation) -> Self {
        Self {
            config,
            invocation,
            host: HostPlatform::current(),
            outputs: OutputPaths::default(),
            sources: None,
        }
    }

    /// Generate for another host
    pub fn with_host(mut self, host: HostPlatform) -> Self {
        self.host = host;
        self
    }

    /// Write outputs somewhere other than the working directory
    pub fn with_outputs(mut self, outputs: OutputPaths) -> Self {
        self.outputs = outputs;
        self
    }

    /// Use a known set of sources instead of scanning
    pub fn with_sources(mut self, sources: SourceIndex) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn outputs(&self) -> &OutputPaths {
        &self.outputs
    }

    fn state_path(&self) -> PathBuf {
        GeneratorState::path(&self.config.build_dir)
    }

    /// Run every stage and render outputs in memory
    pub fn render(&self) -> BuildResult<Rendered> {
        let config = &self.config;
        let tools = ToolPaths::resolve(config, &self.host)?;
        let project = Project::expand(config)?;
        let sources = match self.sources {
            Some(ref sources) => sources.clone(),
            None => SourceIndex::scan(config),
        };

        let plan = synthesize(config, &project, &tools, &sources, &self.outputs);
        plan.check_compilers(&tools, Path::exists)?;

        let results = ExecutionResults::load_optional(&project.layout().results_path())?;
        let diff_config = DiffConfig::build(config, &project, &sources, results.as_ref()).to_json()?;
        let graph = render(&plan, &tools, &self.host, &self.invocation);

        info!(
            version = %config.version,
            objects = project.objects().len(),
            compiled = plan.compile_count(),
            missing = plan.missing_sources.len(),
            "rendered build"
        );

        Ok(Rendered {
            project,
            tools,
            plan,
            graph,
            diff_config,
        })
    }

    /// Write `build.ninja`, `objdiff.json` and the state file
    pub fn configure(&self) -> BuildResult<Rendered> {
        let rendered = self.render()?;
        self.discard_stale_state()?;

        write_atomic(&self.outputs.graph, &rendered.graph)?;
        write_atomic(&self.outputs.diff_config, &rendered.diff_config)?;
        self.write_state(
            &rendered,
            vec![self.outputs.graph.clone(), self.outputs.diff_config.clone()],
        )?;
        Ok(rendered)
    }

    /// Write only `objdiff.json` and the state file
    pub fn diff_config(&self) -> BuildResult<Rendered> {
        let rendered = self.render()?;
        self.discard_stale_state()?;

        write_atomic(&self.outputs.diff_config, &rendered.diff_config)?;
        self.write_state(&rendered, vec![self.outputs.diff_config.clone()])?;
        Ok(rendered)
    }

    /// Aggregate `<out>/config.json` into `<out>/progress.json`
    pub fn progress(&self) -> BuildResult<ProgressReport> {
        let layout = Layout::new(self.config.out_path());
        let results = ExecutionResults::load(&layout.results_path())?;
        let report = ProgressReport::aggregate(&self.config, &results, &self.config.progress);
        write_atomic(&layout.progress_path(), &report.to_json()?)?;
        Ok(report)
    }

    /// Validate everything and report without writing
    pub fn check(&self) -> BuildResult<CheckSummary> {
        let rendered = self.render()?;
        let freshness = match StateStatus::inspect(&self.state_path())? {
            StateStatus::Absent => Freshness::Missing,
            StateStatus::Stale(BuildError::StaleArtifact { found, .. }) => Freshness::Stale { found },
            StateStatus::Stale(_) => Freshness::Stale {
                found: "unknown".to_string(),
            },
            StateStatus::Current(state) => {
                if state.fingerprint == rendered.fingerprint() && self.outputs.graph.exists() {
                    Freshness::Current
                } else {
                    Freshness::Outdated
                }
            }
        };

        Ok(CheckSummary {
            name: self.config.name.clone(),
            version: self.config.version.clone(),
            objects: rendered.project.objects().len(),
            archives: rendered.project.archives().len(),
            compiled: rendered.plan.compile_count(),
            missing_sources: rendered.plan.missing_sources.len(),
            provisioned_tools: rendered.tools.produced().count(),
            freshness,
        })
    }

    fn discard_stale_state(&self) -> BuildResult<()> {
        if let StateStatus::Stale(error) = StateStatus::inspect(&self.state_path())? {
            warn!(%error, "discarding stale generator state");
        }
        Ok(())
    }

    fn write_state(&self, rendered: &Rendered, outputs: Vec<PathBuf>) -> BuildResult<()> {
        let state = GeneratorState::new(rendered.fingerprint(), outputs);
        write_atomic(&self.state_path(), &state.to_json()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{scenario_config, scenario_sources};
    use crate::tools::HostOs;
    use tempfile::TempDir;

    fn generator(dir: &TempDir) -> Generator {
        let mut config = scenario_config();
        config.build_dir = dir.path().join("build");
        let sources = scenario_sources(&config);
        Generator::new(
            config,
            Invocation::new("dolgen", "dolgen-tool", Vec::new()),
        )
        .with_host(HostPlatform::new(HostOs::Linux, "x86_64"))
        .with_sources(sources)
        .with_outputs(OutputPaths {
            graph: dir.path().join("build.ninja"),
            diff_config: dir.path().join("objdiff.json"),
        })
    }

    #[test]
    fn test_render_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let gen = generator(&dir);
        let first = gen.render().unwrap();
        let second = gen.render().unwrap();
        assert_eq!(first.graph, second.graph);
        assert_eq!(first.diff_config, second.diff_config);
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn test_check_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let summary = generator(&dir).check().unwrap();
        assert_eq!(summary.objects, 4);
        assert_eq!(summary.archives, 2);
        assert_eq!(summary.compiled, 4);
        assert_eq!(summary.freshness, Freshness::Missing);
        assert!(!dir.path().join("build.ninja").exists());
        assert!(!dir.path().join("build").exists());
    }

    #[test]
    fn test_freshness_follows_configure() {
        let dir = TempDir::new().unwrap();
        let gen = generator(&dir);
        gen.configure().unwrap();
        assert_eq!(gen.check().unwrap().freshness, Freshness::Current);

        let mut config = gen.config().clone();
        config.debug = true;
        let changed = Generator { config, ..gen };
        assert_eq!(changed.check().unwrap().freshness, Freshness::Outdated);
    }

    #[test]
    fn test_summary_text() {
        let summary = CheckSummary {
            name: "dolsdk".to_string(),
            version: "DOLSDK-2001-05-22".to_string(),
            objects: 4,
            archives: 2,
            compiled: 3,
            missing_sources: 1,
            provisioned_tools: 4,
            freshness: Freshness::Outdated,
        };
        assert_eq!(
            summary.to_string(),
            "dolsdk (DOLSDK-2001-05-22)\n  4 objects in 2 archives\n  3 compile steps, 1 missing sources\n  4 tools provisioned by the build\n  Build graph: out of date\n"
        );
    }
}
