//! Fixture PDFs shared by unit and integration tests

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::path::Path;

/// Index of the fillable page in [`FormFixture::standard`].
pub(crate) const FIXTURE_FORM_PAGE: usize = 2;

/// Builds a small template: header pages followed by one form page holding
///
/// - `Name` text field
/// - `Notes` text field with a template default value
/// - `Country` dropdown with two options
/// - `Agree` checkbox
/// - `Choice` radio group with two kid widgets (options `0` and `1`)
#[derive(Debug, Clone)]
pub(crate) struct FormFixture {
    header_pages: usize,
    form: bool,
    inline_acroform: bool,
    review_note: bool,
}

impl FormFixture {
    pub(crate) fn standard() -> Self {
        Self {
            header_pages: FIXTURE_FORM_PAGE,
            form: true,
            inline_acroform: false,
            review_note: false,
        }
    }

    /// A document with `pages` labelled pages and no form.
    pub(crate) fn plain(pages: usize) -> Self {
        Self {
            header_pages: pages,
            form: false,
            inline_acroform: false,
            review_note: false,
        }
    }

    pub(crate) fn inline_acroform(mut self) -> Self {
        self.inline_acroform = true;
        self
    }

    /// Add a sticky note by `Reviewer` (with its popup) to the form page.
    pub(crate) fn with_review_note(mut self) -> Self {
        self.review_note = true;
        self
    }

    pub(crate) fn build(&self) -> Document {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        let mut fields = Vec::new();

        for i in 0..self.header_pages {
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "FixtureLabel" => text(&format!("Header-{}", i + 1)),
            });
            kids.push(Object::Reference(page_id));
        }

        if self.form {
            let page_id = doc.new_object_id();
            let appearance = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
            let mut annots = Vec::new();

            let name = doc.add_object(widget(page_id, dictionary! {
                "FT" => "Tx",
                "T" => text("Name"),
            }));
            let notes = doc.add_object(widget(page_id, dictionary! {
                "FT" => "Tx",
                "T" => text("Notes"),
                "V" => text("Template note"),
            }));
            let country = doc.add_object(widget(page_id, dictionary! {
                "FT" => "Ch",
                "T" => text("Country"),
                "Ff" => 1i64 << 17,
                "Opt" => vec![text("US"), text("CA")],
            }));
            let agree = doc.add_object(widget(page_id, dictionary! {
                "FT" => "Btn",
                "T" => text("Agree"),
                "V" => "Off",
                "AS" => "Off",
                "AP" => dictionary! {
                    "N" => dictionary! {
                        "Yes" => Object::Reference(appearance),
                        "Off" => Object::Reference(appearance),
                    },
                },
            }));

            let choice = doc.new_object_id();
            let mut choice_kids = Vec::new();
            for option in ["0", "1"] {
                let kid = doc.add_object(widget(page_id, dictionary! {
                    "Parent" => Object::Reference(choice),
                    "AS" => "Off",
                    "AP" => dictionary! {
                        "N" => dictionary! {
                            option => Object::Reference(appearance),
                            "Off" => Object::Reference(appearance),
                        },
                    },
                }));
                choice_kids.push(Object::Reference(kid));
                annots.push(Object::Reference(kid));
            }
            doc.objects.insert(
                choice,
                Object::Dictionary(dictionary! {
                    "FT" => "Btn",
                    "T" => text("Choice"),
                    "Ff" => 1i64 << 15,
                    "V" => "Off",
                    "Kids" => choice_kids,
                }),
            );

            let mut ordered = vec![
                Object::Reference(name),
                Object::Reference(notes),
                Object::Reference(country),
                Object::Reference(agree),
            ];
            ordered.append(&mut annots);
            if self.review_note {
                let note = doc.new_object_id();
                let popup = doc.add_object(dictionary! {
                    "Type" => "Annot",
                    "Subtype" => "Popup",
                    "Parent" => Object::Reference(note),
                    "Rect" => vec![20.into(), 20.into(), 120.into(), 80.into()],
                });
                doc.objects.insert(
                    note,
                    Object::Dictionary(dictionary! {
                        "Type" => "Annot",
                        "Subtype" => "Text",
                        "T" => text("Reviewer"),
                        "Contents" => text("Check the spelling"),
                        "P" => Object::Reference(page_id),
                        "Popup" => Object::Reference(popup),
                        "Rect" => vec![0.into(), 0.into(), 20.into(), 20.into()],
                    }),
                );
                ordered.push(Object::Reference(note));
                ordered.push(Object::Reference(popup));
            }
            doc.objects.insert(
                page_id,
                Object::Dictionary(dictionary! {
                    "Type" => "Page",
                    "Parent" => Object::Reference(pages_id),
                    "FixtureLabel" => text("Form"),
                    "Annots" => ordered,
                }),
            );
            kids.push(Object::Reference(page_id));
            fields = vec![name, notes, country, agree, choice];
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => Dictionary::new(),
            }),
        );

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        };
        if self.form {
            let form = dictionary! {
                "Fields" => fields.into_iter().map(Object::Reference).collect::<Vec<_>>(),
                "DA" => text("/Helv 0 Tf 0 g"),
            };
            if self.inline_acroform {
                catalog.set("AcroForm", form);
            } else {
                catalog.set("AcroForm", Object::Reference(doc.add_object(form)));
            }
        }
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        self.build().save_to(&mut buffer).unwrap();
        buffer
    }

    pub(crate) fn write_to(&self, path: &Path) {
        std::fs::write(path, self.to_bytes()).unwrap();
    }
}

fn text(value: &str) -> Object {
    Object::String(value.as_bytes().to_vec(), StringFormat::Literal)
}

fn widget(page_id: ObjectId, extra: Dictionary) -> Dictionary {
    let mut dict = dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "P" => Object::Reference(page_id),
        "Rect" => vec![0.into(), 0.into(), 10.into(), 10.into()],
    };
    for (key, value) in extra.iter() {
        dict.set(key.clone(), value.clone());
    }
    dict
}

/// Find the field dictionary whose `/T` equals `name`.
pub(crate) fn field<'a>(doc: &'a Document, name: &str) -> Option<&'a Dictionary> {
    doc.objects.values().find_map(|object| match object {
        Object::Dictionary(dict) => match dict.get(b"T") {
            Ok(Object::String(t, _)) if t.as_slice() == name.as_bytes() => Some(dict),
            _ => None,
        },
        _ => None,
    })
}

pub(crate) fn name_of<'a>(dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
    match dict.get(key) {
        Ok(Object::Name(name)) => Some(name.as_slice()),
        _ => None,
    }
}

pub(crate) fn string_of(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key) {
        Ok(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// `FixtureLabel` of every page, in page order.
pub(crate) fn page_labels(doc: &Document) -> Vec<String> {
    doc.get_pages()
        .values()
        .filter_map(|id| doc.get_dictionary(*id).ok())
        .filter_map(|page| string_of(page, b"FixtureLabel"))
        .collect()
}
