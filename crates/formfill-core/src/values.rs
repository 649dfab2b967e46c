//! Field value updates
//!
//! Writes caller values onto the fields of one page. Values are keyed by the
//! field's current name; names with no matching field, and fields with no
//! value, are left alone.

use crate::config::ButtonStates;
use crate::document::{dictionary, dictionary_mut, encode_text};
use crate::error::FormFillError;
use crate::field::{field_name, page_widgets, FieldKind};
use lopdf::{Document, Object, ObjectId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Set checkbox and radio-group values on a page.
///
/// A radio group's value and appearance state are written to the parent
/// field, never to a kid widget. Returns the number of fields updated.
pub fn apply_button_values(
    doc: &mut Document,
    page_id: ObjectId,
    values: &BTreeMap<String, String>,
    states: &ButtonStates,
) -> Result<usize, FormFillError> {
    let mut updated = BTreeSet::new();

    for widget in page_widgets(doc, page_id)? {
        let field = dictionary(doc, widget.target)?;
        let Some(name) = field_name(field) else {
            continue;
        };
        let Some(value) = values.get(&name) else {
            continue;
        };

        let state = match FieldKind::of(doc, field) {
            Some(FieldKind::Button { grouped: true }) => states.radio_state(value),
            Some(FieldKind::Button { grouped: false }) => states.checkbox_state(value),
            other => {
                debug!(field = %name, kind = ?other, "Skipping non-button field");
                continue;
            }
        };

        let field = dictionary_mut(doc, widget.target)?;
        field.set("V", Object::Name(state.clone()));
        field.set("AS", Object::Name(state.clone()));
        debug!(
            field = %name,
            state = %String::from_utf8_lossy(&state),
            "Set button state"
        );
        updated.insert(widget.target);
    }

    report_unmatched(values, doc, page_id)?;
    Ok(updated.len())
}

/// Set text values on a page. Returns the number of fields updated.
pub fn set_text_values(
    doc: &mut Document,
    page_id: ObjectId,
    values: &BTreeMap<String, String>,
) -> Result<usize, FormFillError> {
    let mut updated = BTreeSet::new();

    for widget in page_widgets(doc, page_id)? {
        let field = dictionary(doc, widget.target)?;
        let Some(name) = field_name(field) else {
            continue;
        };
        let Some(value) = values.get(&name) else {
            continue;
        };
        if FieldKind::of(doc, field) != Some(FieldKind::Text) {
            debug!(field = %name, "Skipping non-text field");
            continue;
        }

        dictionary_mut(doc, widget.target)?.set("V", encode_text(value));
        debug!(field = %name, "Set text value");
        updated.insert(widget.target);
    }

    report_unmatched(values, doc, page_id)?;
    Ok(updated.len())
}

fn report_unmatched(
    values: &BTreeMap<String, String>,
    doc: &Document,
    page_id: ObjectId,
) -> Result<(), FormFillError> {
    let mut present = BTreeSet::new();
    for widget in page_widgets(doc, page_id)? {
        if let Some(name) = field_name(dictionary(doc, widget.target)?) {
            present.insert(name);
        }
    }
    for name in values.keys().filter(|name| !present.contains(*name)) {
        debug!(field = %name, "No form field for value");
    }
    Ok(())
}
