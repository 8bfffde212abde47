//! Compiler flag presets
//!
//! Presets are named flag lists declared under `[flags]`. A list entry of the
//! form `@name` splices another preset in place, and `{revision}` anywhere in
//! a flag is replaced with the selected revision number.

use crate::project::FlagSpec;
use crate::{ConfigError, ConfigResult};
use std::collections::BTreeMap;

const REVISION_TOKEN: &str = "{revision}";

/// Expands [`FlagSpec`]s against the declared presets
pub struct FlagPresets<'a> {
    presets: &'a BTreeMap<String, Vec<String>>,
    revision: u32,
}

impl<'a> FlagPresets<'a> {
    /// Create an expander for the given presets and revision
    pub fn new(presets: &'a BTreeMap<String, Vec<String>>, revision: u32) -> Self {
        Self { presets, revision }
    }

    /// Expand a flag spec into a flat list of flags
    ///
    /// `owner` names the declaration using the spec, for error messages.
    pub fn expand(&self, spec: &FlagSpec, owner: &str) -> ConfigResult<Vec<String>> {
        let mut out = Vec::new();
        let mut stack = Vec::new();
        match spec {
            FlagSpec::Preset(name) => self.splice(name, owner, &mut stack, &mut out)?,
            FlagSpec::List(flags) => self.expand_list(flags, owner, &mut stack, &mut out)?,
        }
        Ok(out)
    }

    fn expand_list(
        &self,
        flags: &[String],
        owner: &str,
        stack: &mut Vec<String>,
        out: &mut Vec<String>,
    ) -> ConfigResult<()> {
        for flag in flags {
            match flag.strip_prefix('@') {
                Some(name) => self.splice(name, owner, stack, out)?,
                None => out.push(flag.replace(REVISION_TOKEN, &self.revision.to_string())),
            }
        }
        Ok(())
    }

    fn splice(
        &self,
        name: &str,
        owner: &str,
        stack: &mut Vec<String>,
        out: &mut Vec<String>,
    ) -> ConfigResult<()> {
        if stack.iter().any(|s| s == name) {
            stack.push(name.to_string());
            return Err(ConfigError::PresetCycle(stack.join(" -> ")));
        }

        let flags = self
            .presets
            .get(name)
            .ok_or_else(|| ConfigError::UnknownPreset {
                name: name.to_string(),
                referenced_by: owner.to_string(),
            })?;

        stack.push(name.to_string());
        self.expand_list(flags, owner, stack, out)?;
        stack.pop();
        Ok(())
    }
}
