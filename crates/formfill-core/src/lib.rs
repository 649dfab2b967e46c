//! PDF form filling and record merging
//!
//! This crate turns a template PDF with an interactive form page into one
//! document per group of records using lopdf:
//! - each record gets a single-page copy of the form page, with every field
//!   renamed `<name>###<id>` and filled from the record's values
//! - the group's record pages are merged after the template's header pages,
//!   ordered by numeric record id
//!
//! [`FormFiller`] drives a whole group; the lower-level steps are exported
//! for callers that need them individually.

pub mod assemble;
pub mod builder;
pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod field;
pub mod merge;
pub mod namespace;
pub mod pipeline;
pub mod record;
pub mod values;

#[cfg(test)]
mod test_support;

pub use assemble::{assemble_record_document, build_record_document, fill_record_page, FillReport};
pub use builder::OutputBuilder;
pub use config::{ButtonStates, FillOptions};
pub use convert::convert_choice_fields_to_text;
pub use document::FormDocument;
pub use error::FormFillError;
pub use field::{page_widgets, FieldKind, Widget};
pub use merge::{merge, merge_documents, sort_record_files};
pub use namespace::{namespace_fields, FieldSets, RecordPartition};
pub use pipeline::{discover_template, FormFiller};
pub use record::{record_id_from_path, record_output_path, Record, RecordGroup, RecordId, ID_KEY};
pub use values::{apply_button_values, set_text_values};
