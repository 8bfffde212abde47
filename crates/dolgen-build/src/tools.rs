//! External tool resolution
//!
//! Each tool is either used from a local path or acquired by a build step.
//! Resolution happens before any step is synthesized so a missing tool
//! specification never produces a partial graph.

use crate::error::{BuildError, BuildResult};
use dolgen_config::ProjectConfig;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Host operating system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Linux,
    MacOs,
    Windows,
    Other,
}

/// Host the generated graph runs on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
    pub os: HostOs,
    /// CPU architecture as reported by `std::env::consts::ARCH`
    pub arch: String,
}

impl HostPlatform {
    pub fn new(os: HostOs, arch: impl Into<String>) -> Self {
        Self {
            os,
            arch: arch.into(),
        }
    }

    /// Detect the running host
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "linux" => HostOs::Linux,
            "macos" => HostOs::MacOs,
            "windows" => HostOs::Windows,
            _ => HostOs::Other,
        };
        Self::new(os, std::env::consts::ARCH)
    }

    pub fn is_windows(&self) -> bool {
        self.os == HostOs::Windows
    }

    /// Native executable suffix
    pub fn exe_suffix(&self) -> &'static str {
        if self.is_windows() {
            ".exe"
        } else {
            ""
        }
    }

    /// Prefix that lets a command chain with `&&`
    pub fn chain_prefix(&self) -> &'static str {
        if self.is_windows() {
            "cmd /c "
        } else {
            ""
        }
    }

    /// Whether prebuilt wibo binaries run here
    fn supports_wibo(&self) -> bool {
        self.os == HostOs::Linux && matches!(self.arch.as_str(), "x86" | "x86_64" | "i386" | "i686")
    }
}

/// Tools the helper knows how to download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolKind {
    Dtk,
    Sjiswrap,
    Wibo,
    Compilers,
    ObjdiffCli,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dtk => "dtk",
            Self::Sjiswrap => "sjiswrap",
            Self::Wibo => "wibo",
            Self::Compilers => "compilers",
            Self::ObjdiffCli => "objdiff-cli",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dtk" => Ok(Self::Dtk),
            "sjiswrap" => Ok(Self::Sjiswrap),
            "wibo" => Ok(Self::Wibo),
            "compilers" => Ok(Self::Compilers),
            "objdiff-cli" => Ok(Self::ObjdiffCli),
            other => Err(format!(
                "unknown tool '{}', expected dtk, sjiswrap, wibo, compilers or objdiff-cli",
                other
            )),
        }
    }
}

/// How a resolved tool comes into existence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolSource {
    /// Used as-is from the filesystem
    Local,
    /// Fetched by a download step
    Download { kind: ToolKind, tag: String },
    /// Built with cargo from a source checkout
    Cargo {
        manifest: PathBuf,
        target_dir: PathBuf,
        bin: String,
    },
}

/// One resolved tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTool {
    pub path: PathBuf,
    pub source: ToolSource,
}

impl ResolvedTool {
    fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            source: ToolSource::Local,
        }
    }

    fn download(path: PathBuf, kind: ToolKind, tag: &str) -> Self {
        Self {
            path,
            source: ToolSource::Download {
                kind,
                tag: tag.to_string(),
            },
        }
    }

    /// Path steps must depend on, when a step produces this tool
    pub fn produced_path(&self) -> Option<&Path> {
        match self.source {
            ToolSource::Local => None,
            ToolSource::Download { .. } | ToolSource::Cargo { .. } => Some(self.path.as_path()),
        }
    }
}

/// Every tool the generated graph invokes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    /// Directory of `<mw_version>/mwcceppc.exe`
    pub compilers: ResolvedTool,
    pub dtk: ResolvedTool,
    pub sjiswrap: ResolvedTool,
    /// Windows emulation layer; `None` on Windows hosts
    pub wrapper: Option<ResolvedTool>,
}

impl ToolPaths {
    /// Resolve every tool for `host`
    ///
    /// Tools with neither a local path nor a download tag are fatal.
    pub fn resolve(config: &ProjectConfig, host: &HostPlatform) -> BuildResult<Self> {
        let tools_dir = config.build_dir.join("tools");
        let spec = &config.tools;

        let compilers = match (&spec.compilers.path, &spec.compilers.tag) {
            (Some(path), _) => ResolvedTool::local(path),
            (None, Some(tag)) => {
                ResolvedTool::download(config.build_dir.join("compilers"), ToolKind::Compilers, tag)
            }
            (None, None) => {
                return Err(BuildError::MissingTool {
                    tool: "compilers",
                    field: "tools.compilers_tag",
                    flag: "compilers",
                })
            }
        };

        let dtk_file = format!("dtk{}", host.exe_suffix());
        let dtk = if let Some(ref path) = spec.dtk.path {
            ResolvedTool::local(path)
        } else if let Some(ref source) = spec.dtk_source {
            ResolvedTool {
                path: tools_dir.join("release").join(&dtk_file),
                source: ToolSource::Cargo {
                    manifest: source.join("Cargo.toml"),
                    target_dir: tools_dir.clone(),
                    bin: "dtk".to_string(),
                },
            }
        } else if let Some(ref tag) = spec.dtk.tag {
            ResolvedTool::download(tools_dir.join(&dtk_file), ToolKind::Dtk, tag)
        } else {
            return Err(BuildError::MissingTool {
                tool: "dtk",
                field: "tools.dtk_tag",
                flag: "build-toolchain-source",
            });
        };

        let sjiswrap = match (&spec.sjiswrap.path, &spec.sjiswrap.tag) {
            (Some(path), _) => ResolvedTool::local(path),
            (None, Some(tag)) => {
                ResolvedTool::download(tools_dir.join("sjiswrap.exe"), ToolKind::Sjiswrap, tag)
            }
            (None, None) => {
                return Err(BuildError::MissingTool {
                    tool: "sjiswrap",
                    field: "tools.sjiswrap_tag",
                    flag: "charset-wrapper",
                })
            }
        };

        let wrapper = if host.is_windows() {
            None
        } else if let Some(ref path) = spec.wrapper.path {
            Some(ResolvedTool::local(path))
        } else {
            match spec.wrapper.tag {
                Some(ref tag) if host.supports_wibo() => {
                    Some(ResolvedTool::download(tools_dir.join("wibo"), ToolKind::Wibo, tag))
                }
                _ => Some(ResolvedTool::local("wine")),
            }
        };

        let paths = Self {
            compilers,
            dtk,
            sjiswrap,
            wrapper,
        };
        debug!(
            dtk = %paths.dtk.path.display(),
            compilers = %paths.compilers.path.display(),
            wrapper = ?paths.wrapper.as_ref().map(|w| w.path.display().to_string()),
            "resolved tools"
        );
        Ok(paths)
    }

    /// `<compilers>/<mw_version>/mwcceppc.exe`
    pub fn compiler(&self, mw_version: &str) -> PathBuf {
        self.compilers.path.join(mw_version).join("mwcceppc.exe")
    }

    /// Every tool acquired by a build step, in a fixed order
    pub fn produced(&self) -> impl Iterator<Item = &ResolvedTool> {
        [
            Some(&self.dtk),
            Some(&self.sjiswrap),
            self.wrapper.as_ref(),
            Some(&self.compilers),
        ]
        .into_iter()
        .flatten()
        .filter(|tool| tool.produced_path().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::scenario_config;
    use dolgen_config::ToolSpec;
    use rstest::rstest;

    fn linux() -> HostPlatform {
        HostPlatform::new(HostOs::Linux, "x86_64")
    }

    #[test]
    fn test_downloads_when_tagged() {
        let config = scenario_config();
        let tools = ToolPaths::resolve(&config, &linux()).unwrap();

        assert_eq!(tools.dtk.path, PathBuf::from("build/tools/dtk"));
        assert_eq!(tools.sjiswrap.path, PathBuf::from("build/tools/sjiswrap.exe"));
        assert_eq!(tools.compilers.path, PathBuf::from("build/compilers"));
        assert_eq!(
            tools.wrapper.as_ref().map(|w| w.path.clone()),
            Some(PathBuf::from("build/tools/wibo"))
        );
        assert_eq!(tools.produced().count(), 4);
    }

    #[test]
    fn test_local_paths_take_precedence() {
        let mut config = scenario_config();
        config.tools.compilers = ToolSpec {
            path: Some(PathBuf::from("/opt/compilers")),
            tag: Some("20231018".to_string()),
        };
        config.tools.wrapper.path = Some(PathBuf::from("/usr/bin/wine64"));
        let tools = ToolPaths::resolve(&config, &linux()).unwrap();

        assert_eq!(tools.compilers.source, ToolSource::Local);
        assert_eq!(
            tools.compiler("GC/1.2.5"),
            PathBuf::from("/opt/compilers/GC/1.2.5/mwcceppc.exe")
        );
        assert_eq!(tools.wrapper.map(|w| w.path), Some(PathBuf::from("/usr/bin/wine64")));
    }

    #[test]
    fn test_dtk_built_from_source() {
        let mut config = scenario_config();
        config.tools.dtk_source = Some(PathBuf::from("../decomp-toolkit"));
        let tools = ToolPaths::resolve(&config, &HostPlatform::new(HostOs::Windows, "x86_64")).unwrap();

        assert_eq!(tools.dtk.path, PathBuf::from("build/tools/release/dtk.exe"));
        assert_eq!(
            tools.dtk.source,
            ToolSource::Cargo {
                manifest: PathBuf::from("../decomp-toolkit/Cargo.toml"),
                target_dir: PathBuf::from("build/tools"),
                bin: "dtk".to_string(),
            }
        );
        assert!(tools.wrapper.is_none());
    }

    #[rstest]
    #[case(HostOs::Linux, "aarch64")]
    #[case(HostOs::MacOs, "x86_64")]
    fn test_wine_fallback(#[case] os: HostOs, #[case] arch: &str) {
        let config = scenario_config();
        let tools = ToolPaths::resolve(&config, &HostPlatform::new(os, arch)).unwrap();
        let wrapper = tools.wrapper.unwrap();
        assert_eq!(wrapper.path, PathBuf::from("wine"));
        assert_eq!(wrapper.source, ToolSource::Local);
    }

    #[test]
    fn test_missing_compilers_is_fatal() {
        let mut config = scenario_config();
        config.tools.compilers = ToolSpec::default();
        let err = ToolPaths::resolve(&config, &linux()).unwrap_err();
        assert!(matches!(err, BuildError::MissingTool { tool: "compilers", .. }));
        assert!(err.to_string().contains("compilers"));
    }

    #[test]
    fn test_tool_kind_round_trip_names() {
        for kind in [
            ToolKind::Dtk,
            ToolKind::Sjiswrap,
            ToolKind::Wibo,
            ToolKind::Compilers,
            ToolKind::ObjdiffCli,
        ] {
            assert_eq!(kind.as_str().parse::<ToolKind>(), Ok(kind));
        }
        assert!("ninja".parse::<ToolKind>().is_err());
    }
}
