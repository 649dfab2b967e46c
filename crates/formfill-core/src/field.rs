//! Form field model
//!
//! Widgets on a page are resolved to the field object that owns their value.
//! Object ids from the document's object table serve as stable indices, so a
//! kid widget records its parent's id rather than holding the parent itself.

use crate::document::{decode_text, dictionary, page_annotations, resolve};
use crate::error::FormFillError;
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Field types handled by the fill pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Checkbox (`grouped == false`) or radio group with kid widgets.
    Button { grouped: bool },
    Choice { options: Vec<String> },
}

impl FieldKind {
    /// Classify a field dictionary; `None` for types outside the taxonomy
    /// (signatures, untyped widgets).
    pub fn of(doc: &Document, field: &Dictionary) -> Option<Self> {
        match field.get(b"FT") {
            Ok(Object::Name(ft)) => match ft.as_slice() {
                b"Tx" => Some(FieldKind::Text),
                b"Btn" => Some(FieldKind::Button {
                    grouped: field.has(b"Kids"),
                }),
                b"Ch" => Some(FieldKind::Choice {
                    options: choice_options(doc, field),
                }),
                _ => None,
            },
            _ => None,
        }
    }

    /// A choice field that still carries its option list.
    pub fn is_dropdown(&self) -> bool {
        matches!(self, FieldKind::Choice { options } if !options.is_empty())
    }
}

/// One widget annotation and the field object its value lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Widget {
    pub annotation: ObjectId,
    /// The annotation itself, or its `/Parent` when it is a group kid.
    pub target: ObjectId,
}

impl Widget {
    pub fn is_kid(&self) -> bool {
        self.annotation != self.target
    }
}

/// Widgets on a page in annotation order. Markup annotations (notes,
/// highlights, popups) are skipped.
pub fn page_widgets(doc: &Document, page_id: ObjectId) -> Result<Vec<Widget>, FormFillError> {
    let mut widgets = Vec::new();
    for annotation in page_annotations(doc, page_id)? {
        let dict = dictionary(doc, annotation)?;
        if !is_field_widget(doc, dict) {
            continue;
        }
        let target = match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => *parent,
            _ => annotation,
        };
        widgets.push(Widget { annotation, target });
    }
    Ok(widgets)
}

/// Whether an annotation belongs to the form.
///
/// Markup annotations also carry `/T` (the author) and popups carry a
/// `/Parent`, so neither key alone identifies a field.
pub(crate) fn is_field_widget(doc: &Document, annotation: &Dictionary) -> bool {
    match annotation.get(b"Subtype") {
        Ok(Object::Name(subtype)) => return subtype == b"Widget",
        Ok(_) => return false,
        Err(_) => {}
    }
    if annotation.has(b"FT") {
        return true;
    }
    annotation
        .get(b"Parent")
        .and_then(Object::as_reference)
        .and_then(|parent| doc.get_dictionary(parent))
        .is_ok_and(|parent| parent.has(b"FT"))
}

/// The field's partial name (`/T`), decoded.
pub fn field_name(field: &Dictionary) -> Option<String> {
    match field.get(b"T") {
        Ok(Object::String(bytes, _)) => Some(decode_text(bytes)),
        _ => None,
    }
}

fn choice_options(doc: &Document, field: &Dictionary) -> Vec<String> {
    let opt = match field.get(b"Opt").ok().and_then(|opt| resolve(doc, opt)) {
        Some(Object::Array(items)) => items,
        _ => return Vec::new(),
    };
    opt.iter()
        .filter_map(|item| match resolve(doc, item)? {
            Object::String(bytes, _) => Some(decode_text(bytes)),
            // [export value, display text]
            Object::Array(pair) => match pair.last() {
                Some(Object::String(bytes, _)) => Some(decode_text(bytes)),
                _ => None,
            },
            _ => None,
        })
        .collect()
}
