//! Document model access
//!
//! Opens template and record PDFs and exposes the pieces the fill pipeline
//! touches: the page list, each page's annotations, the interactive form
//! dictionary, and the object table that backs them.

use crate::error::FormFillError;
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A PDF opened for reading and in-place mutation.
#[derive(Debug, Clone)]
pub struct FormDocument {
    path: PathBuf,
    inner: Document,
}

impl FormDocument {
    /// Open a PDF from disk.
    ///
    /// If the document has an interactive form, its `NeedAppearances` flag is
    /// set so that anything copied out of it asks viewers to redraw fields.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FormFillError> {
        let path = path.as_ref();
        let inner = Document::load(path).map_err(|e| FormFillError::open(path, e))?;
        Self::from_document(inner, path)
    }

    /// Parse a PDF held in memory.
    pub fn load_mem(bytes: &[u8]) -> Result<Self, FormFillError> {
        let inner = Document::load_mem(bytes).map_err(|e| FormFillError::open("<memory>", e))?;
        Self::from_document(inner, Path::new("<memory>"))
    }

    fn from_document(mut inner: Document, path: &Path) -> Result<Self, FormFillError> {
        catalog_id(&inner).map_err(|e| FormFillError::open(path, e))?;
        if set_need_appearances(&mut inner)? {
            debug!(path = %path.display(), "Marked form for appearance regeneration");
        }
        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Page object ids in document order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.inner.get_pages().values().copied().collect()
    }

    /// Object id of the page at a 0-based index.
    pub fn page_id(&self, index: usize) -> Result<ObjectId, FormFillError> {
        self.page_ids().get(index).copied().ok_or_else(|| {
            FormFillError::Configuration(format!(
                "Page index {} is outside {} ({} pages)",
                index,
                self.path.display(),
                self.page_count()
            ))
        })
    }

    /// The interactive form (`/AcroForm`) dictionary, if the document has one.
    pub fn form_dictionary(&self) -> Option<&Dictionary> {
        form_dictionary(&self.inner)
    }

    /// Whether the form dictionary asks viewers to regenerate appearances.
    pub fn need_appearances(&self) -> bool {
        matches!(
            self.form_dictionary()
                .and_then(|form| form.get(b"NeedAppearances").ok()),
            Some(Object::Boolean(true))
        )
    }

    /// The full object table.
    pub fn objects(&self) -> &Document {
        &self.inner
    }

    pub fn into_inner(self) -> Document {
        self.inner
    }
}

/// Object id of the document catalog.
pub(crate) fn catalog_id(doc: &Document) -> Result<ObjectId, FormFillError> {
    doc.trailer
        .get(b"Root")
        .map_err(|_| FormFillError::OperationError("No Root in trailer".into()))?
        .as_reference()
        .map_err(|_| FormFillError::OperationError("Root is not a reference".into()))
}

pub(crate) fn dictionary(doc: &Document, id: ObjectId) -> Result<&Dictionary, FormFillError> {
    doc.get_dictionary(id)
        .map_err(|e| FormFillError::OperationError(format!("Object {:?}: {}", id, e)))
}

pub(crate) fn dictionary_mut(
    doc: &mut Document,
    id: ObjectId,
) -> Result<&mut Dictionary, FormFillError> {
    doc.get_dictionary_mut(id)
        .map_err(|e| FormFillError::OperationError(format!("Object {:?}: {}", id, e)))
}

/// Follow a single indirect reference.
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

pub(crate) fn form_dictionary(doc: &Document) -> Option<&Dictionary> {
    let catalog = dictionary(doc, catalog_id(doc).ok()?).ok()?;
    match resolve(doc, catalog.get(b"AcroForm").ok()?)? {
        Object::Dictionary(form) => Some(form),
        _ => None,
    }
}

/// Set `NeedAppearances true` on the document's form dictionary.
///
/// Returns `false` when the document has no form dictionary.
pub(crate) fn set_need_appearances(doc: &mut Document) -> Result<bool, FormFillError> {
    let catalog_id = catalog_id(doc)?;
    let acroform = match dictionary(doc, catalog_id)?.get(b"AcroForm") {
        Ok(Object::Reference(id)) => Some(*id),
        Ok(Object::Dictionary(_)) => None,
        _ => return Ok(false),
    };

    let form = match acroform {
        Some(id) => dictionary_mut(doc, id)?,
        None => match dictionary_mut(doc, catalog_id)?.get_mut(b"AcroForm") {
            Ok(Object::Dictionary(form)) => form,
            _ => return Ok(false),
        },
    };
    form.set("NeedAppearances", Object::Boolean(true));
    Ok(true)
}

/// Annotation references listed by a page.
///
/// A page without `/Annots` has no annotations; inline annotation
/// dictionaries cannot carry form fields and are skipped.
pub(crate) fn page_annotations(
    doc: &Document,
    page_id: ObjectId,
) -> Result<Vec<ObjectId>, FormFillError> {
    let page = dictionary(doc, page_id)?;
    let annots = match page.get(b"Annots") {
        Ok(annots) => annots,
        Err(_) => return Ok(Vec::new()),
    };
    match resolve(doc, annots) {
        Some(Object::Array(items)) => Ok(items
            .iter()
            .filter_map(|item| item.as_reference().ok())
            .collect()),
        _ => Err(FormFillError::OperationError(format!(
            "Annots of page {:?} is not an array",
            page_id
        ))),
    }
}

/// Write a document to disk.
pub(crate) fn save_document(doc: &mut Document, path: &Path) -> Result<(), FormFillError> {
    doc.save(path).map_err(|e| {
        FormFillError::OperationError(format!("Failed to save {}: {}", path.display(), e))
    })?;
    Ok(())
}

/// PDFDocEncoding code points that differ from Latin-1. Bytes `0x9F` and
/// `0xAD` are undefined and decode as themselves.
const PDF_DOC_DIFFERENCES: [(u8, char); 40] = [
    (0x18, '\u{02D8}'),
    (0x19, '\u{02C7}'),
    (0x1A, '\u{02C6}'),
    (0x1B, '\u{02D9}'),
    (0x1C, '\u{02DD}'),
    (0x1D, '\u{02DB}'),
    (0x1E, '\u{02DA}'),
    (0x1F, '\u{02DC}'),
    (0x80, '\u{2022}'),
    (0x81, '\u{2020}'),
    (0x82, '\u{2021}'),
    (0x83, '\u{2026}'),
    (0x84, '\u{2014}'),
    (0x85, '\u{2013}'),
    (0x86, '\u{0192}'),
    (0x87, '\u{2044}'),
    (0x88, '\u{2039}'),
    (0x89, '\u{203A}'),
    (0x8A, '\u{2212}'),
    (0x8B, '\u{2030}'),
    (0x8C, '\u{201E}'),
    (0x8D, '\u{201C}'),
    (0x8E, '\u{201D}'),
    (0x8F, '\u{2018}'),
    (0x90, '\u{2019}'),
    (0x91, '\u{201A}'),
    (0x92, '\u{2122}'),
    (0x93, '\u{FB01}'),
    (0x94, '\u{FB02}'),
    (0x95, '\u{0141}'),
    (0x96, '\u{0152}'),
    (0x97, '\u{0160}'),
    (0x98, '\u{0178}'),
    (0x99, '\u{017D}'),
    (0x9A, '\u{0131}'),
    (0x9B, '\u{0142}'),
    (0x9C, '\u{0153}'),
    (0x9D, '\u{0161}'),
    (0x9E, '\u{017E}'),
    (0xA0, '\u{20AC}'),
];

fn pdf_doc_char(byte: u8) -> char {
    PDF_DOC_DIFFERENCES
        .iter()
        .find(|(b, _)| *b == byte)
        .map_or(byte as char, |(_, c)| *c)
}

fn pdf_doc_byte(c: char) -> Option<u8> {
    if let Some((byte, _)) = PDF_DOC_DIFFERENCES.iter().find(|(_, d)| *d == c) {
        return Some(*byte);
    }
    let byte = u8::try_from(u32::from(c)).ok()?;
    (pdf_doc_char(byte) == c).then_some(byte)
}

/// Decode a PDF text string: UTF-16BE or UTF-8 when a byte order mark is
/// present, otherwise PDFDocEncoding.
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        String::from_utf8_lossy(rest).into_owned()
    } else {
        bytes.iter().map(|&b| pdf_doc_char(b)).collect()
    }
}

/// Encode a PDF text string in PDFDocEncoding, falling back to UTF-16BE when
/// some character has no single-byte code.
pub(crate) fn encode_text(text: &str) -> Object {
    let bytes = match text.chars().map(pdf_doc_byte).collect::<Option<Vec<u8>>>() {
        Some(bytes) => bytes,
        None => {
            let mut bytes = vec![0xFE, 0xFF];
            for unit in text.encode_utf16() {
                bytes.extend_from_slice(&unit.to_be_bytes());
            }
            bytes
        }
    };
    Object::String(bytes, StringFormat::Literal)
}
