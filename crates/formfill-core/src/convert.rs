//! Choice-to-text conversion
//!
//! Dropdowns are rendered as plain text in generated documents. Conversion
//! drops the option list, so the former choices cannot be recovered from
//! the output.

use crate::document::{dictionary, dictionary_mut};
use crate::error::FormFillError;
use crate::field::{field_name, page_widgets};
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeSet;
use tracing::debug;

/// Keys that only mean something on a choice field.
const CHOICE_KEYS: [&[u8]; 3] = [b"Opt", b"TI", b"I"];

/// Retype the named fields on a page as text fields.
///
/// Converting an already converted field is a no-op. Returns the number of
/// fields whose type changed.
pub fn convert_choice_fields_to_text(
    doc: &mut Document,
    page_id: ObjectId,
    names: &BTreeSet<String>,
) -> Result<usize, FormFillError> {
    let mut converted = BTreeSet::new();

    for widget in page_widgets(doc, page_id)? {
        let Some(name) = field_name(dictionary(doc, widget.target)?) else {
            continue;
        };
        if !names.contains(&name) {
            continue;
        }

        let field = dictionary_mut(doc, widget.target)?;
        let already_text = matches!(field.get(b"FT"), Ok(Object::Name(ft)) if ft == b"Tx");
        field.set("FT", Object::Name(b"Tx".to_vec()));
        for key in CHOICE_KEYS {
            field.remove(key);
        }
        if !already_text {
            debug!(field = %name, "Converted choice field to text");
            converted.insert(widget.target);
        }
    }

    Ok(converted.len())
}
