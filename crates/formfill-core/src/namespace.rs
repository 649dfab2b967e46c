//! Field namespacing
//!
//! Viewers treat same-named fields as one logical field across a document, so
//! every field on a record page gets a record-unique suffix before pages from
//! different records are merged together.

use crate::document::{dictionary, dictionary_mut, encode_text};
use crate::error::FormFillError;
use crate::field::{field_name, page_widgets, FieldKind};
use crate::record::Record;
use lopdf::{Document, ObjectId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Namespaced field names on a page, partitioned by type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSets {
    pub text: BTreeSet<String>,
    pub buttons: BTreeSet<String>,
    pub dropdowns: BTreeSet<String>,
}

impl FieldSets {
    pub fn len(&self) -> usize {
        self.text.len() + self.buttons.len() + self.dropdowns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split a record's values into per-type maps keyed by namespaced name.
    pub fn partition(&self, record: &Record, suffix: &str) -> RecordPartition {
        let mut partition = RecordPartition::default();
        for (name, value) in record.field_values() {
            let key = format!("{}{}", name, suffix);
            let target = if self.text.contains(&key) {
                &mut partition.text
            } else if self.buttons.contains(&key) {
                &mut partition.buttons
            } else if self.dropdowns.contains(&key) {
                &mut partition.dropdowns
            } else {
                debug!(field = %name, record = %record.id(), "Record value has no form field");
                continue;
            };
            target.insert(key, value.to_string());
        }
        partition
    }
}

/// A record's values routed to the update that handles each field type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPartition {
    pub text: BTreeMap<String, String>,
    pub buttons: BTreeMap<String, String>,
    pub dropdowns: BTreeMap<String, String>,
}

/// Append `suffix` to the name of every field on a page.
///
/// A radio group is renamed once through its parent; kids reached later find
/// the suffix already present and are skipped. Fields outside the
/// text/button/choice taxonomy are renamed but not classified.
pub fn namespace_fields(
    doc: &mut Document,
    page_id: ObjectId,
    suffix: &str,
) -> Result<FieldSets, FormFillError> {
    let mut sets = FieldSets::default();

    for widget in page_widgets(doc, page_id)? {
        let field = dictionary(doc, widget.target)?;
        let Some(name) = field_name(field) else {
            continue;
        };
        if name.ends_with(suffix) {
            continue;
        }
        let kind = FieldKind::of(doc, field);

        let namespaced = format!("{}{}", name, suffix);
        dictionary_mut(doc, widget.target)?.set("T", encode_text(&namespaced));

        match kind {
            Some(FieldKind::Text) => {
                sets.text.insert(namespaced);
            }
            Some(FieldKind::Button { .. }) => {
                sets.buttons.insert(namespaced);
            }
            Some(kind) if kind.is_dropdown() => {
                sets.dropdowns.insert(namespaced);
            }
            _ => debug!(field = %namespaced, "Field type not handled"),
        }
    }

    Ok(sets)
}
