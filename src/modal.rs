//! The single exclusive editing dialog.
//!
//! A modal is either closed or holds exactly one form: the entry editor
//! or one of the add-relation forms. Opening any form tears down the one
//! before it.

use crate::dom::{Document, NodeId};
use crate::models::{
    split_tags, Category, Entry, EntryId, EntryUpdate, ExampleRequest, TranslationRequest,
};

pub const MODAL_CLASS: &str = "admin-modal";
pub const FORM_ID: &str = "admin-entry-form";
/// Marker read by the overlay's click dispatch.
pub const ACTION_ATTR: &str = "data-admin-action";

pub const DEFAULT_TRANSLATION_LANGUAGE: &str = "en";
pub const DEFAULT_EXAMPLE_LANGUAGE: &str = "es-AR";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalKind {
    EditEntry,
    AddTranslation,
    AddExample,
}

/// A validated form, ready to hand to the entry client.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Edit(EntryUpdate),
    Translation(TranslationRequest),
    Example(ExampleRequest),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("no modal is open")]
    NotOpen,
    #[error("required field {0} is empty")]
    MissingField(&'static str),
}

#[derive(Debug)]
struct OpenModal {
    node: NodeId,
    form: NodeId,
    kind: ModalKind,
    entry: EntryId,
}

#[derive(Debug, Default)]
pub struct ModalController {
    open: Option<OpenModal>,
}

impl ModalController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn kind(&self) -> Option<ModalKind> {
        self.open.as_ref().map(|m| m.kind)
    }

    pub fn entry_id(&self) -> Option<&EntryId> {
        self.open.as_ref().map(|m| &m.entry)
    }

    pub fn node(&self) -> Option<NodeId> {
        self.open.as_ref().map(|m| m.node)
    }

    pub fn form(&self) -> Option<NodeId> {
        self.open.as_ref().map(|m| m.form)
    }

    /// Removes the modal node. Safe to call when nothing is open.
    pub fn close(&mut self, doc: &mut Document) {
        if let Some(open) = self.open.take() {
            doc.remove(open.node);
            tracing::debug!(entry = %open.entry, kind = ?open.kind, "modal closed");
        }
    }

    /// Opens the editor pre-filled from freshly fetched entry data.
    pub fn open_edit(&mut self, doc: &mut Document, entry: &Entry) -> NodeId {
        let title = format!("Edit Entry: {}", entry.term);
        let (modal, form) = self.open_shell(doc, &title, ModalKind::EditEntry, &entry.id);

        let term = doc.element(
            "input",
            &[
                ("type", "text"),
                ("name", "term"),
                ("value", entry.term.as_str()),
                ("required", ""),
            ],
        );
        form_group(doc, form, "Term:", term);

        let select = doc.element("select", &[("name", "category")]);
        for category in Category::ALL {
            let option = doc.element("option", &[("value", category.as_str())]);
            if category == entry.category {
                doc.set_attribute(option, "selected", "");
            }
            let label = doc.create_text(category.label());
            doc.append_child(option, label);
            doc.append_child(select, option);
        }
        form_group(doc, form, "Category:", select);

        let pos = doc.element(
            "input",
            &[
                ("type", "text"),
                ("name", "part_of_speech"),
                ("value", entry.part_of_speech.as_deref().unwrap_or("")),
            ],
        );
        form_group(doc, form, "Part of Speech:", pos);

        let notes = doc.element("textarea", &[("name", "notes")]);
        doc.set_text(notes, entry.notes.as_deref().unwrap_or(""));
        form_group(doc, form, "Notes:", notes);

        let tags_text = entry.tags_text();
        let tags = doc.element(
            "input",
            &[("type", "text"), ("name", "tags"), ("value", tags_text.as_str())],
        );
        form_group(doc, form, "Tags (comma-separated):", tags);

        form_actions(doc, form, "Save Changes");
        self.mount(doc, modal)
    }

    pub fn open_translation(&mut self, doc: &mut Document, entry: &EntryId) -> NodeId {
        let title = format!("Add Translation to Entry #{}", entry);
        let (modal, form) = self.open_shell(doc, &title, ModalKind::AddTranslation, entry);
        text_field(doc, form, "Translation:", "translation", "", true);
        text_field(
            doc,
            form,
            "Target language code (e.g., en, es):",
            "target_language_code",
            DEFAULT_TRANSLATION_LANGUAGE,
            true,
        );
        text_field(doc, form, "Literal translation:", "literal_translation", "", false);
        form_actions(doc, form, "Add Translation");
        self.mount(doc, modal)
    }

    pub fn open_example(&mut self, doc: &mut Document, entry: &EntryId) -> NodeId {
        let title = format!("Add Example to Entry #{}", entry);
        let (modal, form) = self.open_shell(doc, &title, ModalKind::AddExample, entry);
        text_field(doc, form, "Example sentence:", "sentence", "", true);
        text_field(
            doc,
            form,
            "Language code (e.g., es-AR):",
            "language_code",
            DEFAULT_EXAMPLE_LANGUAGE,
            true,
        );
        text_field(doc, form, "Translation:", "translation", "", false);
        form_actions(doc, form, "Add Example");
        self.mount(doc, modal)
    }

    /// Reads and validates the open form the way the browser would
    /// serialize it on submit.
    pub fn submission(&self, doc: &Document) -> Result<Submission, FormError> {
        let open = self.open.as_ref().ok_or(FormError::NotOpen)?;
        let field = |name: &'static str| -> String {
            doc.named_control(open.form, name)
                .and_then(|c| doc.control_value(c))
                .unwrap_or_default()
        };
        let required = |name: &'static str| -> Result<String, FormError> {
            let value = field(name);
            if value.trim().is_empty() {
                Err(FormError::MissingField(name))
            } else {
                Ok(value)
            }
        };

        match open.kind {
            ModalKind::EditEntry => {
                let term = required("term")?;
                Ok(Submission::Edit(EntryUpdate {
                    term,
                    category: field("category").parse().unwrap_or_default(),
                    notes: field("notes"),
                    part_of_speech: field("part_of_speech").trim().to_string(),
                    tags: split_tags(&field("tags")),
                }))
            }
            ModalKind::AddTranslation => Ok(Submission::Translation(TranslationRequest {
                translation: required("translation")?.trim().to_string(),
                target_language_code: required("target_language_code")?.trim().to_string(),
                literal_translation: field("literal_translation").trim().to_string(),
            })),
            ModalKind::AddExample => Ok(Submission::Example(ExampleRequest {
                sentence: required("sentence")?.trim().to_string(),
                language_code: required("language_code")?.trim().to_string(),
                translation: field("translation").trim().to_string(),
            })),
        }
    }

    fn open_shell(
        &mut self,
        doc: &mut Document,
        title: &str,
        kind: ModalKind,
        entry: &EntryId,
    ) -> (NodeId, NodeId) {
        self.close(doc);

        let modal = doc.element("div", &[("class", "admin-modal show")]);
        let content = doc.element("div", &[("class", "admin-modal-content")]);
        let heading = doc.create_element("h3");
        doc.set_text(heading, title);
        let form = doc.element("form", &[("id", FORM_ID)]);
        doc.append_child(content, heading);
        doc.append_child(content, form);
        doc.append_child(modal, content);

        self.open = Some(OpenModal {
            node: modal,
            form,
            kind,
            entry: entry.clone(),
        });
        (modal, form)
    }

    fn mount(&mut self, doc: &mut Document, modal: NodeId) -> NodeId {
        let body = doc.body();
        doc.append_child(body, modal);
        if let Some(open) = &self.open {
            tracing::debug!(entry = %open.entry, kind = ?open.kind, "modal opened");
        }
        modal
    }
}

fn form_group(doc: &mut Document, form: NodeId, label: &str, control: NodeId) {
    let group = doc.element("div", &[("class", "admin-form-group")]);
    let label_node = doc.create_element("label");
    doc.set_text(label_node, label);
    doc.append_child(group, label_node);
    doc.append_child(group, control);
    doc.append_child(form, group);
}

fn text_field(
    doc: &mut Document,
    form: NodeId,
    label: &str,
    name: &str,
    value: &str,
    required: bool,
) {
    let input = doc.element("input", &[("type", "text"), ("name", name), ("value", value)]);
    if required {
        doc.set_attribute(input, "required", "");
    }
    form_group(doc, form, label, input);
}

fn form_actions(doc: &mut Document, form: NodeId, submit_label: &str) {
    let actions = doc.element("div", &[("class", "admin-form-actions")]);
    let cancel = doc.element(
        "button",
        &[("type", "button"), ("class", "admin-btn-secondary"), (ACTION_ATTR, "cancel")],
    );
    doc.set_text(cancel, "Cancel");
    let submit = doc.element(
        "button",
        &[("type", "submit"), ("class", "admin-btn-primary"), (ACTION_ATTR, "submit")],
    );
    doc.set_text(submit, submit_label);
    doc.append_child(actions, cancel);
    doc.append_child(actions, submit);
    doc.append_child(form, actions);
}
