//! Record groups loaded from JSON data files

use crate::config::ValuesConfig;
use anyhow::{bail, Context};
use formfill_core::{Record, RecordGroup};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

type RawRecord = BTreeMap<String, String>;

/// `*.json` files in `dir`, sorted by file name.
pub fn data_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Data directory '{}' cannot be found", dir.display());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    if files.is_empty() {
        bail!("No .json data files found in '{}'", dir.display());
    }
    files.sort();
    Ok(files)
}

/// Parse a JSON array of flat objects, stringifying scalar values.
pub fn parse_records(json: &str) -> anyhow::Result<Vec<RawRecord>> {
    let rows: Vec<serde_json::Map<String, Value>> =
        serde_json::from_str(json).context("Expected a JSON array of objects")?;
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            row.into_iter()
                .map(|(key, value)| {
                    let text = match value {
                        Value::Null => String::new(),
                        Value::String(s) => s,
                        Value::Bool(b) => b.to_string(),
                        Value::Number(n) => n.to_string(),
                        Value::Array(_) | Value::Object(_) => {
                            bail!("Record {}: value of {:?} is not a scalar", index, key)
                        }
                    };
                    Ok((key, text))
                })
                .collect::<anyhow::Result<RawRecord>>()
        })
        .collect()
}

impl ValuesConfig {
    /// Warn about blanks, then apply overrides and constant defaults.
    pub fn apply(&self, source: &Path, records: &mut [RawRecord]) {
        for field in &self.warn_blank {
            let blanks = records
                .iter()
                .filter(|r| r.get(field).map_or(true, |v| v.trim().is_empty()))
                .count();
            if blanks > 0 {
                warn!(
                    field = %field,
                    file = %source.display(),
                    count = blanks,
                    "Blank values found"
                );
            }
        }

        for record in records.iter_mut() {
            for (field, table) in &self.overrides {
                let current = record.get(field).map(String::as_str).unwrap_or("");
                let replacement = table
                    .iter()
                    .find(|(from, _)| from.to_lowercase() == current.to_lowercase())
                    .map(|(_, to)| to.clone());
                if let Some(to) = replacement {
                    debug!(field = %field, from = %current, to = %to, "Override");
                    record.insert(field.clone(), to);
                }
            }
            for (field, value) in &self.defaults {
                record.insert(field.clone(), value.clone());
            }
        }
    }
}

/// Load one group per data file.
///
/// The group key is `group_key_field` from the first record when present and
/// non-blank, otherwise the file stem. Keys name the output documents, so two
/// files resolving to the same key are rejected.
pub fn load_groups(
    dir: &Path,
    values: &ValuesConfig,
    group_key_field: Option<&str>,
) -> anyhow::Result<Vec<RecordGroup>> {
    let mut groups = Vec::new();
    let mut sources: BTreeMap<String, PathBuf> = BTreeMap::new();
    for path in data_files(dir)? {
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut raw = parse_records(&json).with_context(|| format!("In {}", path.display()))?;
        values.apply(&path, &mut raw);

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let key = group_key_field
            .and_then(|field| raw.first().and_then(|r| r.get(field)))
            .filter(|key| !key.trim().is_empty())
            .cloned()
            .unwrap_or(stem);
        if let Some(first) = sources.get(&key) {
            bail!(
                "Group key {:?} of {} is already used by {}",
                key,
                path.display(),
                first.display()
            );
        }
        sources.insert(key.clone(), path.clone());

        let records = raw
            .into_iter()
            .map(Record::from_map)
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("In {}", path.display()))?;
        groups.push(
            RecordGroup::new(key, records).with_context(|| format!("In {}", path.display()))?,
        );
    }
    Ok(groups)
}
