//! Ninja build file emission
//!
//! [`Writer`] produces ninja syntax with the usual 78 column wrapping and
//! `$` escaping. [`render`] turns a [`BuildPlan`] into a complete build file;
//! every [`BuildStep`] variant is handled in one `match`.

use crate::steps::{BuildPlan, BuildStep, CompileStep};
use crate::tools::{HostPlatform, ToolPaths};
use std::path::{Path, PathBuf};

const DEFAULT_WIDTH: usize = 78;

/// Escape a path for use in a build statement
pub fn escape_path(word: &str) -> String {
    word.replace("$ ", "$$ ").replace(' ', "$ ").replace(':', "$:")
}

/// Native string form of a path
pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Variables of a `rule` block
#[derive(Debug, Default, Clone)]
pub struct RuleSpec<'a> {
    pub command: String,
    pub description: Option<&'a str>,
    pub depfile: Option<&'a str>,
    pub deps: Option<&'a str>,
    pub generator: bool,
}

/// A `build` statement
#[derive(Debug, Default, Clone)]
pub struct Edge<'a> {
    pub outputs: Vec<String>,
    pub rule: &'a str,
    pub inputs: Vec<String>,
    pub implicit: Vec<String>,
    pub order_only: Vec<String>,
    pub variables: Vec<(&'a str, String)>,
}

/// Ninja syntax writer
#[derive(Debug)]
pub struct Writer {
    out: String,
    width: usize,
}

impl Writer {
    pub fn new() -> Self {
        Self::with_width(DEFAULT_WIDTH)
    }

    pub fn with_width(width: usize) -> Self {
        Self {
            out: String::new(),
            width,
        }
    }

    pub fn newline(&mut self) {
        self.out.push('\n');
    }

    /// Word-wrapped `#` comment
    pub fn comment(&mut self, text: &str) {
        let limit = self.width.saturating_sub(2);
        let mut line = String::new();
        for word in text.split_whitespace() {
            if !line.is_empty() && line.len() + 1 + word.len() > limit {
                self.out.push_str("# ");
                self.out.push_str(&line);
                self.out.push('\n');
                line.clear();
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        if !line.is_empty() {
            self.out.push_str("# ");
            self.out.push_str(&line);
            self.out.push('\n');
        }
    }

    pub fn variable(&mut self, key: &str, value: &str, indent: usize) {
        self.line(&format!("{} = {}", key, value), indent);
    }

    pub fn rule(&mut self, name: &str, spec: &RuleSpec<'_>) {
        self.line(&format!("rule {}", name), 0);
        self.variable("command", &spec.command, 1);
        if let Some(description) = spec.description {
            self.variable("description", description, 1);
        }
        if let Some(depfile) = spec.depfile {
            self.variable("depfile", depfile, 1);
        }
        if spec.generator {
            self.variable("generator", "1", 1);
        }
        if let Some(deps) = spec.deps {
            self.variable("deps", deps, 1);
        }
    }

    pub fn build(&mut self, edge: &Edge<'_>) {
        let outputs: Vec<String> = edge.outputs.iter().map(|o| escape_path(o)).collect();
        let mut inputs: Vec<String> = edge.inputs.iter().map(|i| escape_path(i)).collect();
        if !edge.implicit.is_empty() {
            inputs.push("|".to_string());
            inputs.extend(edge.implicit.iter().map(|i| escape_path(i)));
        }
        if !edge.order_only.is_empty() {
            inputs.push("||".to_string());
            inputs.extend(edge.order_only.iter().map(|i| escape_path(i)));
        }

        let mut text = format!("build {}: {}", outputs.join(" "), edge.rule);
        for input in &inputs {
            text.push(' ');
            text.push_str(input);
        }
        self.line(&text, 0);

        for (key, value) in &edge.variables {
            self.variable(key, value, 1);
        }
    }

    pub fn default(&mut self, targets: &[String]) {
        self.line(&format!("default {}", targets.join(" ")), 0);
    }

    pub fn finish(self) -> String {
        self.out
    }

    /// Write a line, wrapping at unescaped spaces with ` $` continuations
    fn line(&mut self, text: &str, indent: usize) {
        let mut text = text;
        let mut leading = "  ".repeat(indent);

        while leading.len() + text.len() > self.width {
            let bytes = text.as_bytes();
            let available = self.width.saturating_sub(leading.len() + 2);

            // Last unescaped space that fits
            let mut end = available.min(bytes.len());
            let mut space = loop {
                match bytes[..end].iter().rposition(|&b| b == b' ') {
                    Some(i) if dollars_before(bytes, i) % 2 == 1 => end = i,
                    other => break other,
                }
            };

            // Otherwise the first unescaped space after it
            if space.is_none() {
                let mut start = available;
                space = loop {
                    let found = bytes
                        .get(start..)
                        .and_then(|rest| rest.iter().position(|&b| b == b' '))
                        .map(|i| i + start);
                    match found {
                        Some(i) if dollars_before(bytes, i) % 2 == 1 => start = i + 1,
                        other => break other,
                    }
                };
            }

            let Some(space) = space else {
                break;
            };
            self.out.push_str(&leading);
            self.out.push_str(&text[..space]);
            self.out.push_str(" $\n");
            text = &text[space + 1..];
            leading = "  ".repeat(indent + 2);
        }

        self.out.push_str(&leading);
        self.out.push_str(text);
        self.out.push('\n');
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

fn dollars_before(bytes: &[u8], index: usize) -> usize {
    let mut count = 0;
    let mut i = index;
    while i > 1 && bytes[i - 1] == b'$' {
        count += 1;
        i -= 1;
    }
    count
}

/// How the generated graph invokes the generator and its helper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Command that reruns the generator
    pub generator: PathBuf,
    /// Helper binary for downloads and dep-file rewriting
    pub tool_helper: PathBuf,
    /// Flags replayed on every rerun, without the mode
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(generator: impl Into<PathBuf>, tool_helper: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            generator: generator.into(),
            tool_helper: tool_helper.into(),
            args,
        }
    }
}

/// Rules a step can use
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rule {
    DownloadTool,
    Cargo,
    Mwcc,
    MwccSjis,
    ArExtract,
    ElfDisasm,
    DwarfDump,
    DiffConfig,
    Progress,
    Configure,
    Phony,
}

impl Rule {
    fn name(self) -> &'static str {
        match self {
            Self::DownloadTool => "download_tool",
            Self::Cargo => "cargo",
            Self::Mwcc => "mwcc",
            Self::MwccSjis => "mwcc_sjis",
            Self::ArExtract => "ar_extract",
            Self::ElfDisasm => "elf_disasm",
            Self::DwarfDump => "dwarf_dump",
            Self::DiffConfig => "diff_config",
            Self::Progress => "progress",
            Self::Configure => "configure",
            Self::Phony => "phony",
        }
    }
}

struct Emitter<'a> {
    tools: &'a ToolPaths,
    host: &'a HostPlatform,
    /// Runs downloads and dep-file rewriting, so edges using it depend on it
    tool_helper: &'a Path,
}

impl Emitter<'_> {
    fn chain(&self, commands: &[String]) -> String {
        if commands.len() > 1 {
            format!("{}{}", self.host.chain_prefix(), commands.join(" && "))
        } else {
            commands.concat()
        }
    }

    fn mwcc_command(&self, sjis: bool) -> String {
        let mut command = String::new();
        if let Some(ref wrapper) = self.tools.wrapper {
            command.push_str(&path_str(&wrapper.path));
            command.push(' ');
        }
        if sjis {
            command.push_str(&path_str(&self.tools.sjiswrap.path));
            command.push(' ');
        }
        let mwcc = self.tools.compilers.path.join("$mw_version").join("mwcceppc.exe");
        command.push_str(&format!("{} $cflags -MMD -c $in -o $basedir", path_str(&mwcc)));

        let mut commands = vec![command];
        if !self.host.is_windows() {
            commands.push("$dolgen_tool transform-dep $basefile.d $basefile.d".to_string());
        }
        self.chain(&commands)
    }

    fn declare(&self, w: &mut Writer, rule: Rule) {
        let dtk = path_str(&self.tools.dtk.path);
        let (comment, spec) = match rule {
            Rule::DownloadTool => (
                "Download tools",
                RuleSpec {
                    command: "$dolgen_tool download $tool $out --tag $tag".to_string(),
                    description: Some("TOOL $out"),
                    ..RuleSpec::default()
                },
            ),
            Rule::Cargo => (
                "Build tools from source",
                RuleSpec {
                    command: "cargo build --release --manifest-path $in --bin $bin --target-dir $target"
                        .to_string(),
                    description: Some("CARGO $bin"),
                    depfile: Some("$target/release/$bin.d"),
                    deps: Some("gcc"),
                    ..RuleSpec::default()
                },
            ),
            Rule::Mwcc => (
                "MWCC build",
                RuleSpec {
                    command: self.mwcc_command(false),
                    description: Some("MWCC $out"),
                    depfile: Some("$basefile.d"),
                    deps: Some("gcc"),
                    ..RuleSpec::default()
                },
            ),
            Rule::MwccSjis => (
                "MWCC build (with UTF-8 to Shift JIS wrapper)",
                RuleSpec {
                    command: self.mwcc_command(true),
                    description: Some("MWCC $out"),
                    depfile: Some("$basefile.d"),
                    deps: Some("gcc"),
                    ..RuleSpec::default()
                },
            ),
            Rule::ArExtract => (
                "Extract library archives",
                RuleSpec {
                    command: format!("{} ar extract $in -o $basedir", dtk),
                    description: Some("EXTRACT $in"),
                    ..RuleSpec::default()
                },
            ),
            Rule::ElfDisasm => (
                "Disassemble object",
                RuleSpec {
                    command: format!("{} elf disasm $in $out", dtk),
                    description: Some("DISASM $out"),
                    ..RuleSpec::default()
                },
            ),
            Rule::DwarfDump => (
                "Dump DWARF info",
                RuleSpec {
                    command: format!("{} dwarf dump $in -o $out", dtk),
                    description: Some("DWARF $out"),
                    ..RuleSpec::default()
                },
            ),
            Rule::DiffConfig => (
                "Generate diff metadata",
                RuleSpec {
                    command: "$dolgen $configure_args diff-config".to_string(),
                    description: Some("OBJDIFF $out"),
                    ..RuleSpec::default()
                },
            ),
            Rule::Progress => (
                "Calculate progress",
                RuleSpec {
                    command: "$dolgen $configure_args progress".to_string(),
                    description: Some("PROGRESS"),
                    ..RuleSpec::default()
                },
            ),
            Rule::Configure => (
                "Reconfigure on change",
                RuleSpec {
                    command: "$dolgen $configure_args".to_string(),
                    description: Some("RUN dolgen"),
                    generator: true,
                    ..RuleSpec::default()
                },
            ),
            Rule::Phony => return,
        };

        w.comment(comment);
        w.rule(rule.name(), &spec);
        w.newline();
    }

    /// Rule used by a step
    fn rule_of(step: &BuildStep) -> Rule {
        match step {
            BuildStep::DownloadTool { .. } => Rule::DownloadTool,
            BuildStep::BuildTool { .. } => Rule::Cargo,
            BuildStep::Extract { .. } => Rule::ArExtract,
            BuildStep::Disassemble { .. } => Rule::ElfDisasm,
            BuildStep::DwarfDump { .. } => Rule::DwarfDump,
            BuildStep::Compile(c) if c.shift_jis => Rule::MwccSjis,
            BuildStep::Compile(_) => Rule::Mwcc,
            BuildStep::AllSource { .. } => Rule::Phony,
            BuildStep::DiffConfig { .. } => Rule::DiffConfig,
            BuildStep::Progress { .. } => Rule::Progress,
            BuildStep::Reconfigure { .. } => Rule::Configure,
        }
    }

    fn step(&self, w: &mut Writer, step: &BuildStep) {
        let rule = Self::rule_of(step).name();
        match step {
            BuildStep::DownloadTool { kind, tag, output } => {
                w.build(&Edge {
                    outputs: vec![path_str(output)],
                    rule,
                    implicit: vec![path_str(self.tool_helper)],
                    variables: vec![("tool", kind.to_string()), ("tag", tag.clone())],
                    ..Edge::default()
                });
            }
            BuildStep::BuildTool {
                manifest,
                lockfile,
                bin,
                target_dir,
                output,
            } => {
                w.build(&Edge {
                    outputs: vec![path_str(output)],
                    rule,
                    inputs: vec![path_str(manifest)],
                    implicit: vec![path_str(lockfile)],
                    variables: vec![("bin", bin.clone()), ("target", path_str(target_dir))],
                    ..Edge::default()
                });
            }
            BuildStep::Extract {
                archive,
                destination,
                outputs,
                implicit,
            } => {
                w.comment(&format!("Extract {}", path_str(archive)));
                w.build(&Edge {
                    outputs: paths(outputs),
                    rule,
                    inputs: vec![path_str(archive)],
                    implicit: paths(implicit),
                    variables: vec![("basedir", path_str(destination))],
                    ..Edge::default()
                });
                w.newline();
            }
            BuildStep::Disassemble {
                input,
                output,
                implicit,
            }
            | BuildStep::DwarfDump {
                input,
                output,
                implicit,
            } => {
                w.build(&Edge {
                    outputs: vec![path_str(output)],
                    rule,
                    inputs: vec![path_str(input)],
                    implicit: paths(implicit),
                    ..Edge::default()
                });
            }
            BuildStep::Compile(compile) => self.compile(w, rule, compile),
            BuildStep::AllSource { inputs } => {
                w.comment("Build all source files");
                w.build(&Edge {
                    outputs: vec![crate::steps::ALL_SOURCE.to_string()],
                    rule,
                    inputs: paths(inputs),
                    ..Edge::default()
                });
                w.newline();
            }
            BuildStep::DiffConfig { output, implicit } | BuildStep::Reconfigure { output, implicit } => {
                w.build(&Edge {
                    outputs: vec![path_str(output)],
                    rule,
                    implicit: paths(implicit),
                    ..Edge::default()
                });
                w.newline();
            }
            BuildStep::Progress { input, output } => {
                w.build(&Edge {
                    outputs: vec![path_str(output)],
                    rule,
                    inputs: vec![path_str(input)],
                    ..Edge::default()
                });
                w.newline();
            }
        }
    }

    fn compile(&self, w: &mut Writer, rule: &str, compile: &CompileStep) {
        let mut implicit = paths(&compile.implicit);
        if !self.host.is_windows() {
            implicit.push(path_str(self.tool_helper));
        }

        w.comment(&compile.label);
        w.build(&Edge {
            outputs: vec![path_str(&compile.output)],
            rule,
            inputs: vec![path_str(&compile.source)],
            implicit,
            variables: vec![
                ("mw_version", compile.mw_version.clone()),
                ("cflags", compile.cflags.join(" ")),
                ("basedir", path_str(compile.basedir())),
                ("basefile", path_str(&compile.basefile())),
            ],
            ..Edge::default()
        });
        w.newline();
    }
}

fn paths(list: &[PathBuf]) -> Vec<String> {
    list.iter().map(|p| path_str(p)).collect()
}

/// Render a complete build file
#[tracing::instrument(level = "debug", skip_all, fields(steps = plan.steps.len()))]
pub fn render(plan: &BuildPlan, tools: &ToolPaths, host: &HostPlatform, invocation: &Invocation) -> String {
    let emitter = Emitter {
        tools,
        host,
        tool_helper: &invocation.tool_helper,
    };
    let mut w = Writer::new();

    w.variable("ninja_required_version", "1.3", 0);
    w.newline();

    w.comment("The arguments passed to dolgen, for rerunning it.");
    w.variable("configure_args", &invocation.args.join(" "), 0);
    w.variable("dolgen", &path_str(&invocation.generator), 0);
    w.variable("dolgen_tool", &path_str(&invocation.tool_helper), 0);
    w.newline();

    let mut rules: Vec<Rule> = plan.steps.iter().map(Emitter::rule_of).collect();
    rules.sort();
    rules.dedup();
    for rule in rules {
        emitter.declare(&mut w, rule);
    }

    let mut in_tools = false;
    for step in &plan.steps {
        let is_tool = matches!(step, BuildStep::DownloadTool { .. } | BuildStep::BuildTool { .. });
        if is_tool && !in_tools {
            w.comment("Tooling");
        } else if !is_tool && in_tools {
            w.newline();
        }
        in_tools = is_tool;
        emitter.step(&mut w, step);
    }

    if let Some(ref default) = plan.default {
        w.comment("Default rule");
        w.default(std::slice::from_ref(default));
    }

    w.finish()
}
