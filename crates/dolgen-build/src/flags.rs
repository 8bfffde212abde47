//! Compiler flag resolution
//!
//! A unit's flags are its base flags (the unit's own `cflags`, else the
//! library's), then the profile flags, then the unit-specific flags. A base or
//! profile flag is dropped when a unit-specific flag has the same key, so the
//! unit-specific value is the only one the compiler sees.

use dolgen_config::{CompilerProfile, Library, TranslationUnit};
use std::collections::HashSet;

/// Flags that may legitimately appear several times
const REPEATABLE: &[&str] = &["-pragma", "-i", "-I", "-ir", "-include", "-prefix"];

const DEBUG_FLAG: &str = "-sym on";

/// Key of a flag: everything before the first space ("-inline auto" → "-inline")
///
/// Optimization flags carry their level inline ("-O4,p", "-O0") and all share
/// the key "-O".
pub fn flag_key(flag: &str) -> &str {
    let key = flag.split_once(' ').map_or(flag, |(key, _)| key);
    if key.starts_with("-O") {
        "-O"
    } else {
        key
    }
}

fn is_repeatable(key: &str) -> bool {
    REPEATABLE.contains(&key) || key.starts_with("-D") || key.starts_with("-U")
}

/// Resolve the full flag list for one object
pub fn resolve_flags(
    library: &Library,
    unit: &TranslationUnit,
    profile: &CompilerProfile,
    debug: bool,
) -> Vec<String> {
    let base = unit.options.cflags.as_ref().unwrap_or(&library.cflags);

    let mut specific = Vec::with_capacity(unit.options.extra_cflags.len() + 2);
    specific.push(unit.char_flag().to_string());
    specific.extend(unit.options.extra_cflags.iter().cloned());
    if debug {
        specific.push(DEBUG_FLAG.to_string());
    }

    let overridden: HashSet<&str> = specific
        .iter()
        .map(|f| flag_key(f))
        .filter(|key| !is_repeatable(key))
        .collect();

    let mut flags: Vec<String> = base
        .iter()
        .chain(profile.flags.iter())
        .filter(|f| !overridden.contains(flag_key(f)))
        .cloned()
        .collect();
    flags.extend(specific);
    flags
}

/// Whether the compiler emits functions in reverse order
///
/// True when the last `-inline` value is `deferred`; `nodeferred` turns it
/// back off.
pub fn reverse_fn_order(flags: &[String]) -> bool {
    let mut reverse = false;
    for flag in flags {
        let Some(values) = flag.strip_prefix("-inline ") else {
            continue;
        };
        for value in values.split(',').map(str::trim) {
            match value {
                "deferred" => reverse = true,
                "nodeferred" => reverse = false,
                _ => {}
            }
        }
    }
    reverse
}
