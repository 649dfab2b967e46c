//! Single-record document assembly
//!
//! Copies the template's form page into a new one-page document, namespaces
//! its fields for the record, applies the record's values and writes the
//! result next to the group's other record files.

use crate::builder::OutputBuilder;
use crate::config::FillOptions;
use crate::convert::convert_choice_fields_to_text;
use crate::document::{save_document, FormDocument};
use crate::error::FormFillError;
use crate::namespace::{namespace_fields, FieldSets};
use crate::record::{record_output_path, Record};
use crate::values::{apply_button_values, set_text_values};
use lopdf::{Document, ObjectId};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What filling one record changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Namespaced fields found on the page.
    pub fields: FieldSets,
    pub converted: usize,
    pub text_updated: usize,
    pub buttons_updated: usize,
}

/// Namespace and fill the fields of one page in place.
///
/// Dropdowns receiving a value are retyped to text before any value is set,
/// so the text update accepts them.
pub fn fill_record_page(
    doc: &mut Document,
    page_id: ObjectId,
    record: &Record,
    options: &FillOptions,
) -> Result<FillReport, FormFillError> {
    let suffix = options.suffix_for(record.id().as_str());
    let fields = namespace_fields(doc, page_id, &suffix)?;
    if fields.is_empty() {
        warn!(record = %record.id(), "Form page has no fillable fields");
    }

    let partition = fields.partition(record, &suffix);
    let dropdowns: BTreeSet<String> = partition.dropdowns.keys().cloned().collect();
    let converted = convert_choice_fields_to_text(doc, page_id, &dropdowns)?;

    let mut text = partition.text;
    text.extend(partition.dropdowns);
    let text_updated = set_text_values(doc, page_id, &text)?;
    let buttons_updated =
        apply_button_values(doc, page_id, &partition.buttons, &options.button_states)?;

    Ok(FillReport {
        fields,
        converted,
        text_updated,
        buttons_updated,
    })
}

/// Build the one-page document for a record from an opened template.
///
/// The template itself is not modified.
pub fn build_record_document(
    template: &FormDocument,
    record: &Record,
    options: &FillOptions,
) -> Result<(Document, FillReport), FormFillError> {
    let source_page = template.page_id(options.form_page)?;

    let mut builder = OutputBuilder::new();
    let page_id = {
        let mut import = builder.import(template.objects());
        import.form_dictionary()?;
        import.page(source_page)?
    };

    let report = fill_record_page(builder.document_mut(), page_id, record, options)?;
    Ok((builder.finish()?, report))
}

/// Open the template afresh, fill it for `record`, and write
/// `<base stem>_<id>.pdf` beside `base_path`.
pub fn assemble_record_document(
    template_path: &Path,
    record: &Record,
    options: &FillOptions,
    base_path: &Path,
) -> Result<PathBuf, FormFillError> {
    let template = FormDocument::open(template_path)?;
    let (mut doc, report) = build_record_document(&template, record, options)?;

    let path = record_output_path(base_path, record.id());
    save_document(&mut doc, &path)?;
    info!(
        record = %record.id(),
        path = %path.display(),
        fields = report.fields.len(),
        text = report.text_updated,
        buttons = report.buttons_updated,
        "Wrote record document"
    );
    Ok(path)
}
