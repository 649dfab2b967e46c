//! Group merge
//!
//! Combines the template's header pages with every single-record document
//! of a group. Record pages follow the header pages in ascending numeric
//! record-id order, whatever order the files were listed in.

use crate::builder::OutputBuilder;
use crate::document::{save_document, FormDocument};
use crate::error::FormFillError;
use crate::record::{record_id_from_path, RecordId};
use lopdf::Document;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Pair each record file with the id in its name, sorted by id.
pub fn sort_record_files(paths: &[PathBuf]) -> Result<Vec<(RecordId, PathBuf)>, FormFillError> {
    let mut sorted = paths
        .iter()
        .map(|path| Ok((record_id_from_path(path)?, path.clone())))
        .collect::<Result<Vec<_>, FormFillError>>()?;
    sorted.sort();
    Ok(sorted)
}

/// Merge header pages and already-ordered record documents.
///
/// The output inherits the template's form dictionary; its `/Fields` lists
/// the fields of every merged page.
pub fn merge_documents(
    template: &FormDocument,
    header_pages: usize,
    records: &[FormDocument],
) -> Result<Document, FormFillError> {
    if header_pages > template.page_count() {
        return Err(FormFillError::Configuration(format!(
            "Template has {} pages, cannot take {} header pages",
            template.page_count(),
            header_pages
        )));
    }

    let mut builder = OutputBuilder::new();
    {
        let mut import = builder.import(template.objects());
        import.form_dictionary()?;
        for index in 0..header_pages {
            import.page(template.page_id(index)?)?;
        }
    }

    for record in records {
        let pages = builder.import(record.objects()).all_pages()?;
        if pages.len() != 1 {
            warn!(
                path = %record.path().display(),
                pages = pages.len(),
                "Record document is not a single page"
            );
        }
    }

    builder.finish()
}

/// Merge the template's first `header_pages` pages and the given record files
/// into `output`. Returns the merged page count.
pub fn merge(
    template: &FormDocument,
    header_pages: usize,
    record_files: &[PathBuf],
    output: &Path,
) -> Result<usize, FormFillError> {
    let records = sort_record_files(record_files)?
        .into_iter()
        .map(|(_, path)| FormDocument::open(path))
        .collect::<Result<Vec<_>, _>>()?;

    let mut doc = merge_documents(template, header_pages, &records)?;
    let page_count = doc.get_pages().len();
    save_document(&mut doc, output)?;

    info!(
        path = %output.display(),
        records = records.len(),
        pages = page_count,
        "Wrote merged document"
    );
    Ok(page_count)
}
