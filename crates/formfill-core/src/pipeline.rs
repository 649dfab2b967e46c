//! Group pipeline
//!
//! Drives one template through every group of records: one temporary
//! single-record document per record, then one merged document per group.

use crate::assemble::assemble_record_document;
use crate::config::FillOptions;
use crate::document::FormDocument;
use crate::error::FormFillError;
use crate::merge::merge;
use crate::record::{Record, RecordGroup};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Locate the single template PDF inside `dir`.
///
/// The directory must exist and contain exactly one entry, a `.pdf` file.
pub fn discover_template(dir: &Path) -> Result<PathBuf, FormFillError> {
    if !dir.is_dir() {
        return Err(FormFillError::Configuration(format!(
            "Template directory '{}' cannot be found",
            dir.display()
        )));
    }

    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;

    match entries.len() {
        0 => Err(FormFillError::Configuration(format!(
            "No template found in '{}'",
            dir.display()
        ))),
        1 => {
            let path = entries.remove(0);
            let is_pdf = path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
            if is_pdf {
                Ok(path)
            } else {
                Err(FormFillError::Configuration(format!(
                    "Template {} must be a .pdf file",
                    path.display()
                )))
            }
        }
        n => Err(FormFillError::Configuration(format!(
            "There should only be one template in '{}', found {}",
            dir.display(),
            n
        ))),
    }
}

/// `.pdf` files directly inside `dir`.
fn pdf_files_in(dir: &Path) -> Result<Vec<PathBuf>, FormFillError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "pdf") {
            files.push(path);
        }
    }
    Ok(files)
}

/// Group keys become file names; path separators would escape the output
/// directory.
fn file_name_safe(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect()
}

/// Fills and merges record groups against one template.
#[derive(Debug)]
pub struct FormFiller {
    template_path: PathBuf,
    template: FormDocument,
    options: FillOptions,
}

impl FormFiller {
    /// Open the template and check that it has the configured form page.
    pub fn new(template_path: impl Into<PathBuf>, options: FillOptions) -> Result<Self, FormFillError> {
        let template_path = template_path.into();
        let template = FormDocument::open(&template_path)?;
        template.page_id(options.form_page)?;
        Ok(Self {
            template_path,
            template,
            options,
        })
    }

    /// Write the single-record document for `record` beside `base_path`.
    ///
    /// The template is reopened so no edit made for one record can reach the
    /// next.
    pub fn fill_record(&self, record: &Record, base_path: &Path) -> Result<PathBuf, FormFillError> {
        assemble_record_document(&self.template_path, record, &self.options, base_path)
    }

    /// Merge record files after the template's header pages.
    pub fn merge_records(&self, files: &[PathBuf], output: &Path) -> Result<usize, FormFillError> {
        merge(&self.template, self.options.form_page, files, output)
    }

    /// Produce `<out_dir>/<prefix><key>.pdf` for a group.
    ///
    /// Record documents are written to `<prefix><key>_temp/`, which is
    /// removed once the merge succeeds. On failure it is left in place.
    pub fn run_group(
        &self,
        group: &RecordGroup,
        prefix: &str,
        out_dir: &Path,
    ) -> Result<PathBuf, FormFillError> {
        let base_name = format!("{}{}", prefix, file_name_safe(group.key()));
        let output = out_dir.join(format!("{}.pdf", base_name));
        let temp_dir = out_dir.join(format!("{}_temp", base_name));

        // Leftovers from an aborted run would be merged as records.
        if temp_dir.exists() {
            debug!(path = %temp_dir.display(), "Removing stale record directory");
            fs::remove_dir_all(&temp_dir)?;
        }
        fs::create_dir_all(&temp_dir)?;

        info!(group = %group.key(), records = group.records().len(), "Filling group");
        let base_path = temp_dir.join(format!("{}.pdf", base_name));
        for record in group.records() {
            self.fill_record(record, &base_path)?;
        }

        let files = pdf_files_in(&temp_dir)?;
        self.merge_records(&files, &output)?;
        fs::remove_dir_all(&temp_dir)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{field, name_of, page_labels, FormFixture, FIXTURE_FORM_PAGE};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_discover_missing_directory() {
        let err = discover_template(Path::new("/no/such/template/dir")).unwrap_err();
        assert!(err.to_string().contains("cannot be found"));
    }

    #[test]
    fn test_discover_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_template(dir.path()).unwrap_err();
        assert!(err.to_string().contains("No template"));
    }

    #[test]
    fn test_discover_rejects_multiple_files() {
        let dir = tempfile::tempdir().unwrap();
        FormFixture::plain(1).write_to(&dir.path().join("a.pdf"));
        FormFixture::plain(1).write_to(&dir.path().join("b.pdf"));
        let err = discover_template(dir.path()).unwrap_err();
        assert!(err.to_string().contains("only be one"));
    }

    #[test]
    fn test_discover_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("template.docx"), b"x").unwrap();
        assert!(matches!(
            discover_template(dir.path()),
            Err(FormFillError::Configuration(_))
        ));
    }

    #[test]
    fn test_discover_single_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Template.PDF");
        FormFixture::plain(1).write_to(&path);
        assert_eq!(discover_template(dir.path()).unwrap(), path);
    }

    #[test]
    fn test_file_name_safe() {
        assert_eq!(file_name_safe("EUR/ACE"), "EUR_ACE");
        assert_eq!(file_name_safe("Plain Key"), "Plain Key");
    }

    #[test]
    fn test_filler_rejects_missing_form_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.pdf");
        FormFixture::plain(1).write_to(&path);
        let options = FillOptions {
            form_page: 4,
            ..FillOptions::default()
        };
        assert!(matches!(
            FormFiller::new(&path, options),
            Err(FormFillError::Configuration(_))
        ));
    }

    #[test]
    fn test_run_group_merges_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("template.pdf");
        FormFixture::standard().write_to(&template_path);
        let filler = FormFiller::new(
            &template_path,
            FillOptions {
                form_page: FIXTURE_FORM_PAGE,
                ..FillOptions::default()
            },
        )
        .unwrap();

        let records = ["20", "3", "11"]
            .iter()
            .map(|id| Record::from_pairs([("id", *id), ("Agree", "Yes")]).unwrap())
            .collect();
        let group = RecordGroup::new("EUR/ACE", records).unwrap();

        let output = filler.run_group(&group, "CRM_", dir.path()).unwrap();
        assert_eq!(output, dir.path().join("CRM_EUR_ACE.pdf"));
        assert!(!dir.path().join("CRM_EUR_ACE_temp").exists());

        let merged = FormDocument::open(&output).unwrap();
        assert_eq!(
            page_labels(merged.objects()),
            vec!["Header-1", "Header-2", "Form", "Form", "Form"]
        );
        for id in ["3", "11", "20"] {
            let agree = field(merged.objects(), &format!("Agree###{}", id)).unwrap();
            assert_eq!(name_of(agree, b"AS"), Some(&b"Yes"[..]));
        }
    }

    #[test]
    fn test_run_group_ignores_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("template.pdf");
        FormFixture::standard().write_to(&template_path);
        let filler = FormFiller::new(
            &template_path,
            FillOptions {
                form_page: FIXTURE_FORM_PAGE,
                ..FillOptions::default()
            },
        )
        .unwrap();

        let stale = dir.path().join("G_temp");
        fs::create_dir_all(&stale).unwrap();
        FormFixture::plain(1).write_to(&stale.join("G_99.pdf"));

        let group =
            RecordGroup::new("G", vec![Record::from_pairs([("id", "1")]).unwrap()]).unwrap();
        let output = filler.run_group(&group, "", dir.path()).unwrap();
        let merged = FormDocument::open(&output).unwrap();
        assert_eq!(merged.page_count(), FIXTURE_FORM_PAGE + 1);
    }
}
