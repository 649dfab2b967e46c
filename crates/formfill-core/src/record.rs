//! Record data supplied for each generated page

use crate::error::FormFillError;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Key holding a record's unique id.
pub const ID_KEY: &str = "id";

/// Unique record id.
///
/// The raw text is used verbatim in field suffixes and file names; the parsed
/// number decides merge order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId {
    raw: String,
    number: i64,
}

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn number(&self) -> i64 {
        self.number
    }
}

impl FromStr for RecordId {
    type Err = FormFillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let number = raw
            .parse::<i64>()
            .map_err(|_| FormFillError::DataShape(format!("Record id {:?} is not numeric", s)))?;
        Ok(Self {
            raw: raw.to_string(),
            number,
        })
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number
            .cmp(&other.number)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One person's field values plus their id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    id: RecordId,
    values: BTreeMap<String, String>,
}

impl Record {
    /// Build a record from a field → value map that includes [`ID_KEY`].
    pub fn from_map(values: BTreeMap<String, String>) -> Result<Self, FormFillError> {
        let id = values
            .get(ID_KEY)
            .ok_or_else(|| FormFillError::DataShape(format!("Record has no {:?} value", ID_KEY)))?
            .parse()?;
        Ok(Self { id, values })
    }

    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, FormFillError> {
        Self::from_map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Field values, without the id entry.
    pub fn field_values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .filter(|(k, _)| k.as_str() != ID_KEY)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Records merged into one output document.
#[derive(Debug, Clone)]
pub struct RecordGroup {
    key: String,
    records: Vec<Record>,
}

impl RecordGroup {
    /// Fails if the group is empty or two records share an id.
    pub fn new(key: impl Into<String>, records: Vec<Record>) -> Result<Self, FormFillError> {
        let key = key.into();
        if records.is_empty() {
            return Err(FormFillError::DataShape(format!("Group {:?} has no records", key)));
        }
        let mut seen = BTreeSet::new();
        for record in &records {
            if !seen.insert(record.id().number()) {
                return Err(FormFillError::DataShape(format!(
                    "Duplicate record id {} in group {:?}",
                    record.id(),
                    key
                )));
            }
        }
        Ok(Self { key, records })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

/// Path of the single-record document for `id`: `<stem>_<id>.pdf` next to
/// `base`.
pub fn record_output_path(base: &Path, id: &RecordId) -> std::path::PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    base.with_file_name(format!("{}_{}.pdf", stem, id))
}

/// Record id embedded in a single-record file name (`..._<id>.pdf`).
pub fn record_id_from_path(path: &Path) -> Result<RecordId, FormFillError> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let id = stem.rsplit('_').next().unwrap_or_default();
    id.parse().map_err(|_| {
        FormFillError::DataShape(format!(
            "File {} does not end in a numeric record id",
            path.display()
        ))
    })
}
