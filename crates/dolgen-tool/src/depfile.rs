//! Dep-file rewriting for compilers run under a Windows emulation layer
//!
//! The compiler records dependencies as Windows paths (`Z:\home\...`,
//! `C:\sdk\include\os.h`). Ninja needs host paths, so every dependency is
//! mapped back through the wine drive table.

use std::fs;
use std::path::PathBuf;

/// Maps Windows drive paths onto the host filesystem
#[derive(Debug, Clone, Default)]
pub struct DriveMap {
    dosdevices: Option<PathBuf>,
}

impl DriveMap {
    /// Drive table of the wine prefix at `prefix`
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            dosdevices: Some(prefix.into().join("dosdevices")),
        }
    }

    /// `$WINEPREFIX`, falling back to `~/.wine`
    pub fn from_env() -> Self {
        match std::env::var_os("WINEPREFIX") {
            Some(prefix) => Self::new(prefix),
            None => dirs::home_dir()
                .map(|home| Self::new(home.join(".wine")))
                .unwrap_or_default(),
        }
    }

    /// Host form of a single dependency path
    pub fn resolve(&self, path: &str) -> String {
        let path = path.replace('\\', "/");
        let bytes = path.as_bytes();
        if bytes.len() < 2 || bytes[1] != b':' || !bytes[0].is_ascii_alphabetic() {
            return path;
        }

        let drive = bytes[0].to_ascii_lowercase() as char;
        let rest = &path[2..];
        // Z: is the host root in every default prefix
        if drive == 'z' {
            return rest.to_string();
        }
        match &self.dosdevices {
            Some(dosdevices) => {
                let joined = dosdevices
                    .join(format!("{}:", drive))
                    .join(rest.trim_start_matches('/'));
                fs::canonicalize(&joined)
                    .unwrap_or(joined)
                    .display()
                    .to_string()
            }
            None => path,
        }
    }
}

/// Rewrite a Makefile-style dep file
///
/// The first line carries the target, which is only normalized; every
/// dependency is resolved through `drives`. Line continuations are kept.
pub fn transform(text: &str, drives: &DriveMap) -> String {
    let mut out = String::with_capacity(text.len());
    for (index, line) in text.lines().enumerate() {
        let line = line.trim_end();
        let (body, continued) = match line.strip_suffix('\\') {
            Some(body) => (body.trim(), true),
            None => (line.trim(), false),
        };
        if body.is_empty() && !continued {
            continue;
        }

        if index == 0 {
            match body.split_once(": ") {
                Some((target, dep)) => {
                    out.push_str(&target.replace('\\', "/"));
                    out.push_str(": ");
                    out.push_str(&drives.resolve(dep.trim()));
                }
                None => out.push_str(&body.replace('\\', "/")),
            }
        } else {
            out.push('\t');
            out.push_str(&drives.resolve(body));
        }

        if continued {
            out.push_str(" \\");
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_host_root_drive() {
        let drives = DriveMap::default();
        assert_eq!(
            drives.resolve(r"Z:\home\dev\sdk\src\os\OSAlloc.c"),
            "/home/dev/sdk/src/os/OSAlloc.c"
        );
        assert_eq!(drives.resolve(r"z:\tmp\a.h"), "/tmp/a.h");
    }

    #[test]
    fn test_relative_paths_only_change_separators() {
        let drives = DriveMap::default();
        assert_eq!(drives.resolve(r"include\dolphin\os.h"), "include/dolphin/os.h");
        assert_eq!(drives.resolve("src/os/OSAlloc.c"), "src/os/OSAlloc.c");
    }

    #[test]
    fn test_other_drive_uses_dosdevices() {
        let temp = TempDir::new().unwrap();
        let include = temp.path().join("dosdevices/c:/sdk/include");
        fs::create_dir_all(&include).unwrap();
        fs::write(include.join("os.h"), "").unwrap();

        let drives = DriveMap::new(temp.path());
        let expected = fs::canonicalize(include.join("os.h")).unwrap();
        assert_eq!(
            drives.resolve(r"C:\sdk\include\os.h"),
            expected.display().to_string()
        );
    }

    #[test]
    fn test_unresolvable_drive_keeps_joined_path() {
        let temp = TempDir::new().unwrap();
        let drives = DriveMap::new(temp.path());
        let expected = temp.path().join("dosdevices/d:/missing.h");
        assert_eq!(drives.resolve(r"D:\missing.h"), expected.display().to_string());
    }

    #[test]
    fn test_transform_dep_file() {
        let input = concat!(
            "build\\DOLSDK\\release\\os\\src\\OSAlloc.o: \\\r\n",
            "\tZ:\\work\\sdk\\src\\os\\OSAlloc.c \\\r\n",
            "\tZ:\\work\\sdk\\include\\dolphin\\os.h\r\n",
        );
        let expected = concat!(
            "build/DOLSDK/release/os/src/OSAlloc.o: \\\n",
            "\t/work/sdk/src/os/OSAlloc.c \\\n",
            "\t/work/sdk/include/dolphin/os.h\n",
        );
        assert_eq!(transform(input, &DriveMap::default()), expected);
    }

    #[test]
    fn test_transform_dependency_on_target_line() {
        let input = "build/os/OSAlloc.o: Z:\\work\\OSAlloc.c\n";
        assert_eq!(
            transform(input, &DriveMap::default()),
            "build/os/OSAlloc.o: /work/OSAlloc.c\n"
        );
    }

    #[test]
    fn test_transform_is_idempotent() {
        let input = "build/os/OSAlloc.o: \\\n\tZ:\\work\\OSAlloc.c\n";
        let once = transform(input, &DriveMap::default());
        assert_eq!(transform(&once, &DriveMap::default()), once);
    }
}
