//! Progress aggregation
//!
//! Folds execution results into per-category byte and object counts. Bytes
//! are added once per occurrence in a category; objects are counted once per
//! category however often they appear.

use crate::error::BuildResult;
use crate::objdiff::to_pretty_json;
use crate::results::{ExecutionResults, ResultUnit};
use dolgen_config::{ProgressOptions, ProjectConfig};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashSet;
use std::fmt::{self, Write as _};
use tracing::debug;

/// Accumulated progress of one category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressUnit {
    pub name: String,
    pub code_total: u64,
    pub code_progress: u64,
    pub data_total: u64,
    pub data_progress: u64,
    pub objects_total: u64,
    pub objects_progress: u64,
    seen: HashSet<String>,
}

impl ProgressUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add one result record
    ///
    /// `complete` says whether the record matches a declared, complete unit.
    pub fn add(&mut self, unit: &ResultUnit, complete: bool) {
        self.code_total += unit.code_size;
        self.data_total += unit.data_size;

        let first_sighting = self.seen.insert(unit.name.clone());
        if first_sighting {
            self.objects_total += 1;
        }

        if unit.autogenerated || !complete {
            return;
        }

        self.code_progress += unit.code_size;
        self.data_progress += unit.data_size;
        if first_sighting {
            self.objects_progress += 1;
        }
    }

    /// Matched code fraction, 0 for an empty category
    pub fn code_frac(&self) -> f64 {
        fraction(self.code_progress, self.code_total)
    }

    /// Matched data fraction, 0 for an empty category
    pub fn data_frac(&self) -> f64 {
        fraction(self.data_progress, self.data_total)
    }
}

fn fraction(progress: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        progress as f64 / total as f64
    }
}

/// One category of the report with its `progress.json` key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub key: String,
    pub unit: ProgressUnit,
}

/// Aggregated progress, in report order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressReport {
    pub categories: Vec<Category>,
    options: ProgressOptions,
}

impl ProgressReport {
    /// Aggregate execution results
    ///
    /// Categories: "All" (optional), "DOL", then when modules exist "Modules"
    /// (optional) and one per module (optional, always listed when verbose).
    #[tracing::instrument(level = "debug", skip_all, fields(units = results.units.len(), modules = results.modules.len()))]
    pub fn aggregate(config: &ProjectConfig, results: &ExecutionResults, options: &ProgressOptions) -> Self {
        let is_complete = |unit: &ResultUnit| {
            config
                .find_unit(&unit.name)
                .is_some_and(|(_, declared)| declared.complete)
        };

        let mut all = ProgressUnit::new("All");
        let mut dol = ProgressUnit::new("DOL");
        for unit in &results.units {
            let complete = is_complete(unit);
            all.add(unit, complete);
            dol.add(unit, complete);
        }

        let mut combined = ProgressUnit::new("Modules");
        let mut modules = Vec::with_capacity(results.modules.len());
        for module in &results.modules {
            let mut progress = ProgressUnit::new(&module.name);
            for unit in &module.units {
                let complete = is_complete(unit);
                all.add(unit, complete);
                combined.add(unit, complete);
                progress.add(unit, complete);
            }
            modules.push(progress);
        }

        let mut categories = Vec::new();
        if options.all {
            categories.push(Category {
                key: "all".to_string(),
                unit: all,
            });
        }
        categories.push(Category {
            key: "dol".to_string(),
            unit: dol,
        });
        if !results.modules.is_empty() {
            if options.modules {
                categories.push(Category {
                    key: "modules".to_string(),
                    unit: combined,
                });
            }
            if options.each_module || config.verbose {
                categories.extend(modules.into_iter().map(|unit| Category {
                    key: unit.name.clone(),
                    unit,
                }));
            }
        }

        for category in &categories {
            if category.unit.code_total == 0 && category.unit.data_total == 0 {
                debug!(category = %category.unit.name, "empty progress category");
            }
        }

        Self {
            categories,
            options: options.clone(),
        }
    }

    /// Look up a category by its `progress.json` key
    pub fn category(&self, key: &str) -> Option<&ProgressUnit> {
        self.categories.iter().find(|c| c.key == key).map(|c| &c.unit)
    }

    /// `progress.json` contents
    pub fn to_json(&self) -> BuildResult<String> {
        to_pretty_json(self)
    }
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::from("Progress:\n");
        for category in &self.categories {
            let unit = &category.unit;
            let code_frac = unit.code_frac();
            let data_frac = unit.data_frac();
            writeln!(
                out,
                "  {}: {:.2}% code, {:.2}% data ({} / {} files)",
                unit.name,
                code_frac * 100.0,
                data_frac * 100.0,
                unit.objects_progress,
                unit.objects_total
            )?;
            writeln!(out, "    Code: {} / {} bytes", unit.code_progress, unit.code_total)?;
            writeln!(out, "    Data: {} / {} bytes", unit.data_progress, unit.data_total)?;
            if self.options.use_fancy() {
                writeln!(
                    out,
                    "\nYou have {} out of {} {} and collected {} out of {} {}.",
                    (code_frac * f64::from(self.options.code_fancy_frac)).floor(),
                    self.options.code_fancy_frac,
                    self.options.code_fancy_item,
                    (data_frac * f64::from(self.options.data_fancy_frac)).floor(),
                    self.options.data_fancy_frac,
                    self.options.data_fancy_item
                )?;
            }
        }
        f.write_str(&out)
    }
}

/// Serialized as `{ "<key>": { "code", "code/total", "data", "data/total" } }`
impl Serialize for ProgressReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for category in &self.categories {
            map.serialize_entry(&category.key, &Entry::from(&category.unit))?;
        }
        map.end()
    }
}

#[derive(serde::Serialize)]
struct Entry {
    code: u64,
    #[serde(rename = "code/total")]
    code_total: u64,
    data: u64,
    #[serde(rename = "data/total")]
    data_total: u64,
}

impl From<&ProgressUnit> for Entry {
    fn from(unit: &ProgressUnit) -> Self {
        Self {
            code: unit.code_progress,
            code_total: unit.code_total,
            data: unit.data_progress,
            data_total: unit.data_total,
        }
    }
}
