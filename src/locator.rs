//! Discovery of entry nodes in the live page.
//!
//! Entries are never registered with the overlay; they are found by
//! matching a fixed selector list against whatever the site rendered,
//! and an id is resolved for each one on every pass.

use crate::dom::{Document, NodeId, Selector};
use crate::models::EntryId;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Selectors that mark an entry, tried in this order.
pub const ENTRY_SELECTORS: &[&str] = &[
    "[data-entry-id]",
    ".entry-detail",
    ".entry-item",
    ".word-entry",
    "article[id*=\"entry\"]",
    ".entry-container",
];

/// Containers that stand in for an untagged single-entry detail page.
pub const MAIN_CONTENT_SELECTOR: &str = "main, .content, .entry-content, .container";

pub const ENTRY_ID_ATTR: &str = "data-entry-id";

static ENTRY_SELECTOR_SET: Lazy<Vec<Selector>> = Lazy::new(|| {
    ENTRY_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
});

static MAIN_CONTENT: Lazy<Option<Selector>> =
    Lazy::new(|| Selector::parse(MAIN_CONTENT_SELECTOR).ok());

static PATH_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d+)/").expect("valid path id pattern"));
static NODE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"entry.*?(\d+)").expect("valid node id pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedEntry {
    pub node: NodeId,
    pub id: EntryId,
}

/// Finds every entry node in document order, each exactly once.
///
/// When nothing matches and the path carries a numeric segment, the
/// first main-content container is tagged with that id and returned as
/// the only entry.
pub fn locate_entries(doc: &mut Document) -> Vec<LocatedEntry> {
    let candidates = matching_nodes(doc);

    if candidates.is_empty() {
        return fallback_entry(doc).into_iter().collect();
    }

    candidates
        .into_iter()
        .filter_map(|node| resolve_entry_id(doc, node).map(|id| LocatedEntry { node, id }))
        .collect()
}

fn matching_nodes(doc: &Document) -> Vec<NodeId> {
    let mut matched = HashSet::new();
    for selector in ENTRY_SELECTOR_SET.iter() {
        matched.extend(doc.query_selector_all(selector));
    }
    if matched.is_empty() {
        return Vec::new();
    }
    doc.descendants(doc.root())
        .into_iter()
        .filter(|n| matched.contains(n))
        .collect()
}

fn fallback_entry(doc: &mut Document) -> Option<LocatedEntry> {
    let id = path_entry_id(doc.path())?;
    let main = doc.query_selector(MAIN_CONTENT.as_ref()?)?;
    doc.set_attribute(main, ENTRY_ID_ATTR, id.as_str());
    tracing::debug!(entry = %id, "treating main content as the page entry");
    Some(LocatedEntry { node: main, id })
}

/// Numeric `/123/` segment of a page path.
pub fn path_entry_id(path: &str) -> Option<EntryId> {
    PATH_ID
        .captures(path)
        .and_then(|c| c.get(1))
        .map(|m| EntryId::new(m.as_str()))
}

/// Resolves the id of an entry node: explicit attribute, then the page
/// path, then a number embedded in the node's own `id`.
pub fn resolve_entry_id(doc: &Document, node: NodeId) -> Option<EntryId> {
    if let Some(explicit) = doc.attribute(node, ENTRY_ID_ATTR).filter(|v| !v.is_empty()) {
        return Some(EntryId::new(explicit));
    }
    if let Some(id) = path_entry_id(doc.path()) {
        return Some(id);
    }
    doc.attribute(node, "id")
        .and_then(|id| NODE_ID.captures(id))
        .and_then(|c| c.get(1))
        .map(|m| EntryId::new(m.as_str()))
}
