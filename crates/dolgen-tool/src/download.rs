//! Pinned tool releases
//!
//! Every tool the build graph downloads is addressed by its kind and a
//! version tag. Single binaries are written in place and marked executable;
//! zip payloads (the compiler collection) are unpacked into the output
//! directory.

use anyhow::{bail, Context, Result};
use dolgen_build::{HostOs, HostPlatform, ToolKind};
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use zip::ZipArchive;

/// Release hosting rejects requests without a browser-like agent
const USER_AGENT: &str = "Mozilla/5.0";

/// Compiler collections are large; allow slow mirrors
const TIMEOUT_SECS: u64 = 600;

/// `<os>-<arch>` as used in release asset names
fn release_platform(host: &HostPlatform) -> Result<String> {
    let os = match host.os {
        HostOs::Linux => "linux",
        HostOs::MacOs => "macos",
        HostOs::Windows => "windows",
        HostOs::Other => bail!("No prebuilt releases for this operating system"),
    };
    let arch = match (host.os, host.arch.as_str()) {
        (HostOs::MacOs, "aarch64") => "arm64",
        (_, "amd64") => "x86_64",
        (_, arch) => arch,
    };
    Ok(format!("{}-{}", os, arch))
}

fn github_release(repo: &str, bin: &str, tag: &str, host: &HostPlatform) -> Result<String> {
    Ok(format!(
        "https://github.com/{}/releases/download/{}/{}-{}{}",
        repo,
        tag,
        bin,
        release_platform(host)?,
        host.exe_suffix()
    ))
}

/// Download location of `tool` at `tag` for `host`
pub fn release_url(tool: ToolKind, tag: &str, host: &HostPlatform) -> Result<String> {
    match tool {
        ToolKind::Dtk => github_release("encounter/decomp-toolkit", "dtk", tag, host),
        ToolKind::ObjdiffCli => github_release("ribbanya/objdiff", "objdiff-cli", tag, host),
        // Windows-only executable, run through the compiler wrapper elsewhere
        ToolKind::Sjiswrap => Ok(format!(
            "https://github.com/encounter/sjiswrap/releases/download/{}/sjiswrap-windows-x86.exe",
            tag
        )),
        ToolKind::Wibo => Ok(format!(
            "https://github.com/decompals/wibo/releases/download/{}/wibo",
            tag
        )),
        ToolKind::Compilers => Ok(format!("https://files.decomp.dev/compilers_{}.zip", tag)),
    }
}

fn fetch(url: &str) -> Result<Vec<u8>> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to create HTTP client")?;

    let response = client
        .get(url)
        .send()
        .with_context(|| format!("Failed to fetch {}", url))?
        .error_for_status()
        .with_context(|| format!("Failed to fetch {}", url))?;

    let bytes = response
        .bytes()
        .with_context(|| format!("Failed to read response from {}", url))?;
    Ok(bytes.to_vec())
}

/// Fetch `tool` at `tag` into `output`
pub fn download(tool: ToolKind, tag: &str, output: &Path, host: &HostPlatform) -> Result<()> {
    let url = release_url(tool, tag, host)?;
    info!("Downloading {} to {}", url, output.display());
    let payload = fetch(&url)?;

    if url.ends_with(".zip") {
        let extracted = extract_zip(Cursor::new(payload), output)?;
        debug!(files = extracted.len(), "extracted {}", tool);
    } else {
        install_binary(&payload, output)?;
    }
    Ok(())
}

/// Join an archive entry name onto `root`, refusing anything that escapes it
fn safe_output_path(root: &Path, name: &str) -> Result<PathBuf> {
    let mut path = root.to_path_buf();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            _ => bail!("Path traversal detected: {}", name),
        }
    }
    Ok(path)
}

/// Unpack every entry of a zip archive under `output_dir`
pub fn extract_zip<R: Read + Seek>(reader: R, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut archive = ZipArchive::new(reader).context("Failed to read zip archive")?;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut extracted = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read zip entry {}", i))?;
        let name = entry.name().to_owned();
        let out_path = safe_output_path(output_dir, &name)?;

        if entry.is_dir() {
            fs::create_dir_all(&out_path)
                .with_context(|| format!("Failed to create {}", out_path.display()))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let mut out_file = File::create(&out_path)
            .with_context(|| format!("Failed to create {}", out_path.display()))?;
        io::copy(&mut entry, &mut out_file).with_context(|| format!("Failed to extract {}", name))?;
        extracted.push(out_path);
    }
    Ok(extracted)
}

/// Write a single executable
pub fn install_binary(payload: &[u8], output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(output, payload).with_context(|| format!("Failed to write {}", output.display()))?;
    mark_executable(output)
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(path, permissions)
        .with_context(|| format!("Failed to mark {} executable", path.display()))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> Result<()> {
    Ok(())
}
