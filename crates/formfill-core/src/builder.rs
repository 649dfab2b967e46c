//! Output document construction
//!
//! Pages are copied into a fresh document by whitelist: only objects reachable
//! from the copied pages (and the inherited form dictionary) are imported,
//! each under a new object id. Every output document carries an interactive
//! form dictionary with `NeedAppearances true`.

use crate::document::{dictionary, dictionary_mut, form_dictionary, page_annotations};
use crate::field::is_field_widget;
use crate::error::FormFillError;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::collections::{HashMap, HashSet};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Form dictionary entries that are rebuilt rather than copied.
const REBUILT_FORM_KEYS: [&[u8]; 3] = [b"Fields", b"NeedAppearances", b"XFA"];

/// Limit on `/Parent` chains, which malformed files can make cyclic.
const MAX_TREE_DEPTH: usize = 64;

/// A document under construction.
#[derive(Debug)]
pub struct OutputBuilder {
    doc: Document,
    pages_id: ObjectId,
    pages: Vec<ObjectId>,
    form: Dictionary,
    need_appearances: bool,
}

impl Default for OutputBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let mut builder = Self {
            doc,
            pages_id,
            pages: Vec::new(),
            form: Dictionary::new(),
            need_appearances: true,
        };
        builder.assert_need_appearances();
        builder
    }

    fn assert_need_appearances(&mut self) {
        self.form
            .set("NeedAppearances", Object::Boolean(self.need_appearances));
    }

    /// Start copying objects out of `source`.
    ///
    /// Objects shared between several copied pages of the same import are
    /// copied once.
    pub fn import<'a>(&'a mut self, source: &'a Document) -> Import<'a> {
        Import {
            builder: self,
            source,
            mapped: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// The document being built, for editing copied pages in place.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Write the page tree, form dictionary and catalog.
    pub fn finish(mut self) -> Result<Document, FormFillError> {
        let fields = self.root_fields()?;
        self.form.set(
            "Fields",
            fields.into_iter().map(Object::Reference).collect::<Vec<_>>(),
        );
        self.assert_need_appearances();

        let OutputBuilder {
            mut doc,
            pages_id,
            pages,
            form,
            ..
        } = self;

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => pages.len() as i64,
                "Kids" => pages.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
            }),
        );
        let form_id = doc.add_object(form);
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
            "AcroForm" => Object::Reference(form_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        doc.prune_objects();
        doc.compress();
        Ok(doc)
    }

    /// Top-level fields owning the widgets on the output pages.
    fn root_fields(&self) -> Result<Vec<ObjectId>, FormFillError> {
        let mut seen = HashSet::new();
        let mut roots = Vec::new();
        for page in &self.pages {
            for annotation in page_annotations(&self.doc, *page)? {
                if !is_field_widget(&self.doc, dictionary(&self.doc, annotation)?) {
                    continue;
                }
                let mut current = annotation;
                for _ in 0..MAX_TREE_DEPTH {
                    match dictionary(&self.doc, current)?.get(b"Parent") {
                        Ok(Object::Reference(parent)) => current = *parent,
                        _ => break,
                    }
                }
                let root = dictionary(&self.doc, current)?;
                let is_field = root.has(b"FT") || root.has(b"Kids");
                if is_field && seen.insert(current) {
                    roots.push(current);
                }
            }
        }
        Ok(roots)
    }
}

/// Copies objects from one source document into an [`OutputBuilder`].
pub struct Import<'a> {
    builder: &'a mut OutputBuilder,
    source: &'a Document,
    mapped: HashMap<ObjectId, ObjectId>,
    pending: Vec<ObjectId>,
}

impl Import<'_> {
    /// Inherit the source's form dictionary (default appearance, resources
    /// and flags). `/Fields` is rebuilt from the output pages on finish.
    ///
    /// Returns `false` if the source has no form dictionary.
    pub fn form_dictionary(&mut self) -> Result<bool, FormFillError> {
        let source = self.source;
        let Some(form) = form_dictionary(source) else {
            return Ok(false);
        };

        let mut copied = Dictionary::new();
        for (key, value) in form.iter() {
            if REBUILT_FORM_KEYS.iter().any(|k| *k == key.as_slice()) {
                continue;
            }
            copied.set(key.clone(), self.remap(value));
        }
        self.drain();

        self.builder.form = copied;
        self.builder.assert_need_appearances();
        Ok(true)
    }

    /// Append a source page to the output. Returns its id in the output.
    pub fn page(&mut self, source_page: ObjectId) -> Result<ObjectId, FormFillError> {
        let source = self.source;
        let inherited = inherited_attributes(source, source_page)?;

        let page_id = self.map_id(source_page);
        if self.builder.pages.contains(&page_id) {
            return Err(FormFillError::OperationError(format!(
                "Page {:?} imported twice",
                source_page
            )));
        }
        self.drain();
        let inherited: Vec<_> = inherited
            .into_iter()
            .map(|(key, value)| (key, self.remap(&value)))
            .collect();
        self.drain();

        let pages_id = self.builder.pages_id;
        let page = dictionary_mut(&mut self.builder.doc, page_id)?;
        for (key, value) in inherited {
            page.set(key, value);
        }
        page.set("Parent", Object::Reference(pages_id));

        self.builder.pages.push(page_id);
        self.builder.assert_need_appearances();
        Ok(page_id)
    }

    /// Append every page of the source, in order.
    pub fn all_pages(&mut self) -> Result<Vec<ObjectId>, FormFillError> {
        let page_ids: Vec<ObjectId> = self.source.get_pages().values().copied().collect();
        page_ids.into_iter().map(|id| self.page(id)).collect()
    }

    fn map_id(&mut self, old: ObjectId) -> ObjectId {
        if let Some(new) = self.mapped.get(&old) {
            return *new;
        }
        let new = self.builder.doc.new_object_id();
        self.mapped.insert(old, new);
        self.pending.push(old);
        new
    }

    /// Copy every object queued by [`Self::map_id`].
    fn drain(&mut self) {
        let source = self.source;
        while let Some(old) = self.pending.pop() {
            let new = self.mapped[&old];
            let copied = match source.get_object(old) {
                Ok(object) => self.remap(object),
                Err(_) => Object::Null,
            };
            self.builder.doc.objects.insert(new, copied);
        }
    }

    fn remap(&mut self, object: &Object) -> Object {
        match object {
            Object::Reference(id) => Object::Reference(self.map_id(*id)),
            Object::Array(items) => Object::Array(items.iter().map(|o| self.remap(o)).collect()),
            Object::Dictionary(dict) => Object::Dictionary(self.remap_dict(dict)),
            Object::Stream(stream) => {
                let mut stream = stream.clone();
                stream.dict = self.remap_dict(&stream.dict);
                Object::Stream(stream)
            }
            other => other.clone(),
        }
    }

    /// Pages lose their `/Parent` so the source page tree is never pulled in.
    fn remap_dict(&mut self, dict: &Dictionary) -> Dictionary {
        let is_page = matches!(dict.get(b"Type"), Ok(Object::Name(t)) if t == b"Page");
        let mut copied = Dictionary::new();
        for (key, value) in dict.iter() {
            if is_page && key == b"Parent" {
                continue;
            }
            copied.set(key.clone(), self.remap(value));
        }
        copied
    }
}

/// Attributes a page inherits from its ancestors but does not set itself.
fn inherited_attributes(
    doc: &Document,
    page_id: ObjectId,
) -> Result<Vec<(&'static [u8], Object)>, FormFillError> {
    let page = dictionary(doc, page_id)?;
    let mut missing: Vec<&'static [u8]> = INHERITABLE
        .iter()
        .copied()
        .filter(|key| !page.has(key))
        .collect();
    let mut found = Vec::new();

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let Some(node_id) = parent else {
            break;
        };
        let node = dictionary(doc, node_id)?;
        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                found.push((*key, value.clone()));
                false
            }
            Err(_) => true,
        });
        if missing.is_empty() {
            break;
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FormDocument;
    use crate::test_support::{page_labels, FormFixture, FIXTURE_FORM_PAGE};
    use pretty_assertions::assert_eq;

    fn reload(doc: Document) -> FormDocument {
        let mut doc = doc;
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        FormDocument::load_mem(&buffer).unwrap()
    }

    #[test]
    fn test_empty_builder_has_form_flag() {
        let doc = reload(OutputBuilder::new().finish().unwrap());
        assert_eq!(doc.page_count(), 0);
        assert!(doc.form_dictionary().is_some());
        assert!(doc.need_appearances());
    }

    #[test]
    fn test_copy_single_page_keeps_only_its_objects() {
        let source = FormDocument::load_mem(&FormFixture::standard().to_bytes()).unwrap();
        let mut builder = OutputBuilder::new();
        {
            let mut import = builder.import(source.objects());
            assert!(import.form_dictionary().unwrap());
            import.page(source.page_id(0).unwrap()).unwrap();
        }
        let doc = reload(builder.finish().unwrap());

        assert_eq!(page_labels(doc.objects()), vec!["Header-1"]);
        // Header pages carry no fields.
        let fields = doc.form_dictionary().unwrap().get(b"Fields").unwrap();
        assert!(fields.as_array().unwrap().is_empty());
        assert!(doc.need_appearances());
    }

    #[test]
    fn test_inherited_attributes_are_materialised() {
        let source = FormDocument::load_mem(&FormFixture::standard().to_bytes()).unwrap();
        let mut builder = OutputBuilder::new();
        builder
            .import(source.objects())
            .page(source.page_id(1).unwrap())
            .unwrap();
        let doc = reload(builder.finish().unwrap());

        let page = doc.objects().get_dictionary(doc.page_id(0).unwrap()).unwrap();
        assert!(page.has(b"MediaBox"));
        assert!(page.has(b"Resources"));
    }

    #[test]
    fn test_form_page_fields_are_registered() {
        let source = FormDocument::load_mem(&FormFixture::standard().to_bytes()).unwrap();
        let mut builder = OutputBuilder::new();
        {
            let mut import = builder.import(source.objects());
            import.form_dictionary().unwrap();
            import.page(source.page_id(FIXTURE_FORM_PAGE).unwrap()).unwrap();
        }
        let doc = reload(builder.finish().unwrap());

        let form = doc.form_dictionary().unwrap();
        // Name, Notes, Country, Agree and the Choice radio parent.
        assert_eq!(form.get(b"Fields").unwrap().as_array().unwrap().len(), 5);
        assert!(form.has(b"DA"));
    }

    #[test]
    fn test_review_notes_stay_out_of_fields() {
        let source = FormFixture::standard().with_review_note().to_bytes();
        let source = FormDocument::load_mem(&source).unwrap();
        let mut builder = OutputBuilder::new();
        {
            let mut import = builder.import(source.objects());
            import.form_dictionary().unwrap();
            import.page(source.page_id(FIXTURE_FORM_PAGE).unwrap()).unwrap();
        }
        let doc = reload(builder.finish().unwrap());

        let fields = doc.form_dictionary().unwrap().get(b"Fields").unwrap();
        assert_eq!(fields.as_array().unwrap().len(), 5);
        // The note itself still travels with the page.
        let page = doc.page_id(0).unwrap();
        assert_eq!(page_annotations(doc.objects(), page).unwrap().len(), 8);
    }

    #[test]
    fn test_page_imported_twice_fails() {
        let source = FormDocument::load_mem(&FormFixture::plain(1).to_bytes()).unwrap();
        let mut builder = OutputBuilder::new();
        let mut import = builder.import(source.objects());
        let page = source.page_id(0).unwrap();
        import.page(page).unwrap();
        assert!(import.page(page).is_err());
    }

    #[test]
    fn test_separate_imports_of_same_source_are_independent() {
        let source = FormDocument::load_mem(&FormFixture::plain(1).to_bytes()).unwrap();
        let page = source.page_id(0).unwrap();
        let mut builder = OutputBuilder::new();
        builder.import(source.objects()).page(page).unwrap();
        builder.import(source.objects()).page(page).unwrap();
        let doc = reload(builder.finish().unwrap());
        assert_eq!(page_labels(doc.objects()), vec!["Header-1", "Header-1"]);
    }
}
