//! Arena-backed page model.
//!
//! The overlay never owns the page; it borrows this document, reads the
//! entries rendered into it and injects its own nodes. Child-list
//! changes inside observed subtrees are queued as [`MutationRecord`]s
//! and handed out in batches, the way a browser delivers observer
//! callbacks after the current task.

use std::fmt;
use url::Url;

// ============================================================================
// Nodes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// One batch entry: children added to or removed from `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

#[derive(Debug)]
struct Registration {
    root: NodeId,
    paused: u32,
    pending: Vec<MutationRecord>,
    connected: bool,
}

// ============================================================================
// Document
// ============================================================================

pub struct Document {
    nodes: Vec<NodeData>,
    html: NodeId,
    head: NodeId,
    body: NodeId,
    location: Url,
    cookie: String,
    observers: Vec<Registration>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("location", &self.location.as_str())
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

impl Document {
    /// An empty `<html><head></head><body></body></html>` page at `location`.
    pub fn new(location: Url) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            html: NodeId(0),
            head: NodeId(0),
            body: NodeId(0),
            location,
            cookie: String::new(),
            observers: Vec::new(),
        };
        doc.html = doc.create_element("html");
        doc.head = doc.create_element("head");
        doc.body = doc.create_element("body");
        doc.nodes[doc.head.0].parent = Some(doc.html);
        doc.nodes[doc.body.0].parent = Some(doc.html);
        doc.nodes[doc.html.0].children = vec![doc.head, doc.body];
        doc
    }

    /// Parses `location` and builds an empty page there.
    pub fn at(location: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(location)?))
    }

    pub fn root(&self) -> NodeId {
        self.html
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn path(&self) -> &str {
        self.location.path()
    }

    pub fn set_location(&mut self, location: Url) {
        self.location = location;
    }

    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    pub fn set_cookie(&mut self, cookie: impl Into<String>) {
        self.cookie = cookie.into();
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Text(text.to_string()))
    }

    /// Creates an element with the given attributes in one step.
    pub fn element(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.create_element(tag);
        for (name, value) in attrs {
            self.set_attribute(id, name, value);
        }
        id
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    // ------------------------------------------------------------------------
    // Tree Structure
    // ------------------------------------------------------------------------

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.children(node).first().copied()
    }

    /// Whether `node` is reachable from the document root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.ancestors_or_self(node).any(|n| n == self.html)
    }

    /// True when `ancestor` is `node` or one of its ancestors.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors_or_self(node).any(|n| n == ancestor)
    }

    /// Nearest element at or above `node` that carries attribute `name`.
    pub fn closest_with_attribute(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.ancestors_or_self(node)
            .find(|n| self.attribute(*n, name).is_some())
    }

    fn ancestors_or_self(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(node), move |n| self.parent(*n))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        let first = self.first_child(parent);
        self.insert_before(parent, child, first);
    }

    /// Inserts `child` under `parent` before `reference`, or last when the
    /// reference is `None` or not a child of `parent`. A child that is
    /// already attached elsewhere is moved.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if child == parent || self.contains(child, parent) {
            return;
        }
        if self.parent(child).is_some() {
            self.remove(child);
        }
        let siblings = &mut self.nodes[parent.0].children;
        let index = reference
            .and_then(|r| siblings.iter().position(|c| *c == r))
            .unwrap_or(siblings.len());
        siblings.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
        self.record(MutationRecord {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
    }

    /// Detaches `node` from its parent. Removing a detached node is a no-op.
    pub fn remove(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        self.nodes[parent.0].children.retain(|c| *c != node);
        self.nodes[node.0].parent = None;
        self.record(MutationRecord {
            target: parent,
            added: Vec::new(),
            removed: vec![node],
        });
    }

    /// Pre-order traversal of the subtree below `root`, excluding `root`.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        out
    }

    // ------------------------------------------------------------------------
    // Elements and Attributes
    // ------------------------------------------------------------------------

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.tag(node).is_some()
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(NodeKind::Element { attrs, .. }) = self.nodes.get_mut(node.0).map(|n| &mut n.kind)
        {
            match attrs.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(NodeKind::Element { attrs, .. }) = self.nodes.get_mut(node.0).map(|n| &mut n.kind)
        {
            attrs.retain(|(k, _)| k != name);
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        let classes = match self.attribute(node, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attribute(node, "class", &classes);
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        let Some(existing) = self.attribute(node, "class") else {
            return;
        };
        let remaining = existing
            .split_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(node, "class", &remaining);
    }

    /// Sets one inline style property, keeping the others.
    pub fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        let mut decls: Vec<(String, String)> = self
            .attribute(node, "style")
            .unwrap_or("")
            .split(';')
            .filter_map(|d| {
                let (k, v) = d.split_once(':')?;
                Some((k.trim().to_string(), v.trim().to_string()))
            })
            .filter(|(k, _)| !k.is_empty() && k != property)
            .collect();
        decls.push((property.to_string(), value.to_string()));
        let style = decls
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("; ");
        self.set_attribute(node, "style", &style);
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.attribute(node, "style")?.split(';').find_map(|d| {
            let (k, v) = d.split_once(':')?;
            (k.trim() == property).then(|| v.trim().to_string())
        })
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        std::iter::once(self.html)
            .chain(self.descendants(self.html))
            .find(|n| self.attribute(*n, "id") == Some(id))
    }

    /// Connected elements whose `name` attribute equals `value`, in document order.
    pub fn find_by_attribute(&self, name: &str, value: &str) -> Vec<NodeId> {
        self.descendants(self.html)
            .into_iter()
            .filter(|n| self.attribute(*n, name) == Some(value))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------------

    pub fn text_content(&self, node: NodeId) -> String {
        match self.nodes.get(node.0).map(|n| &n.kind) {
            Some(NodeKind::Text(t)) => t.clone(),
            Some(NodeKind::Element { .. }) => self
                .descendants(node)
                .into_iter()
                .filter_map(|n| match &self.nodes[n.0].kind {
                    NodeKind::Text(t) => Some(t.as_str()),
                    NodeKind::Element { .. } => None,
                })
                .collect(),
            None => String::new(),
        }
    }

    /// Replaces all children of `node` with a single text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        for child in self.children(node).to_vec() {
            self.remove(child);
        }
        if !text.is_empty() {
            let t = self.create_text(text);
            self.append_child(node, t);
        }
    }

    // ------------------------------------------------------------------------
    // Form Controls
    // ------------------------------------------------------------------------

    /// Current value of a form control, following `FormData` rules for
    /// input, textarea and select elements.
    pub fn control_value(&self, control: NodeId) -> Option<String> {
        match self.tag(control)? {
            "input" => Some(self.attribute(control, "value").unwrap_or("").to_string()),
            "textarea" => Some(self.text_content(control)),
            "select" => {
                let options: Vec<NodeId> = self
                    .descendants(control)
                    .into_iter()
                    .filter(|n| self.tag(*n) == Some("option"))
                    .collect();
                let chosen = options
                    .iter()
                    .find(|o| self.attribute(**o, "selected").is_some())
                    .or_else(|| options.first())?;
                Some(
                    self.attribute(*chosen, "value")
                        .map(str::to_string)
                        .unwrap_or_else(|| self.text_content(*chosen)),
                )
            }
            _ => None,
        }
    }

    /// Sets a control's value as a user typing or choosing would.
    pub fn set_control_value(&mut self, control: NodeId, value: &str) {
        match self.tag(control) {
            Some("input") => self.set_attribute(control, "value", value),
            Some("textarea") => self.set_text(control, value),
            Some("select") => {
                for option in self.descendants(control) {
                    if self.tag(option) != Some("option") {
                        continue;
                    }
                    if self.attribute(option, "value") == Some(value) {
                        self.set_attribute(option, "selected", "");
                    } else {
                        self.remove_attribute(option, "selected");
                    }
                }
            }
            _ => {}
        }
    }

    /// The first control named `name` inside `form`.
    pub fn named_control(&self, form: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(form)
            .into_iter()
            .find(|n| self.attribute(*n, "name") == Some(name))
    }

    // ------------------------------------------------------------------------
    // Selectors
    // ------------------------------------------------------------------------

    /// Connected elements matching `selector`, in document order.
    pub fn query_selector_all(&self, selector: &Selector) -> Vec<NodeId> {
        self.descendants(self.html)
            .into_iter()
            .filter(|n| selector.matches(self, *n))
            .collect()
    }

    pub fn query_selector(&self, selector: &Selector) -> Option<NodeId> {
        self.descendants(self.html)
            .into_iter()
            .find(|n| selector.matches(self, *n))
    }

    /// Convenience for call sites with a literal selector.
    pub fn select(&self, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        Ok(self.query_selector_all(&Selector::parse(selector)?))
    }

    // ------------------------------------------------------------------------
    // Mutation Observation
    // ------------------------------------------------------------------------

    /// Starts observing child-list changes in the subtree rooted at `root`.
    pub fn observe(&mut self, root: NodeId) -> ObserverId {
        self.observers.push(Registration {
            root,
            paused: 0,
            pending: Vec::new(),
            connected: true,
        });
        ObserverId(self.observers.len() - 1)
    }

    pub fn disconnect(&mut self, observer: ObserverId) {
        if let Some(reg) = self.observers.get_mut(observer.0) {
            reg.connected = false;
            reg.pending.clear();
        }
    }

    /// Suppresses recording for `observer` until the matching [`Document::resume`].
    pub fn pause(&mut self, observer: ObserverId) {
        if let Some(reg) = self.observers.get_mut(observer.0) {
            reg.paused += 1;
        }
    }

    pub fn resume(&mut self, observer: ObserverId) {
        if let Some(reg) = self.observers.get_mut(observer.0) {
            reg.paused = reg.paused.saturating_sub(1);
        }
    }

    pub fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        self.observers
            .get_mut(observer.0)
            .map(|reg| std::mem::take(&mut reg.pending))
            .unwrap_or_default()
    }

    /// Number of connected observers.
    pub fn observer_count(&self) -> usize {
        self.observers.iter().filter(|r| r.connected).count()
    }

    fn record(&mut self, record: MutationRecord) {
        let recipients: Vec<usize> = self
            .observers
            .iter()
            .enumerate()
            .filter(|(_, r)| r.connected && r.paused == 0 && self.contains(r.root, record.target))
            .map(|(i, _)| i)
            .collect();
        for i in recipients {
            self.observers[i].pending.push(record.clone());
        }
    }

    // ------------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------------

    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].kind {
            NodeKind::Text(t) => out.push_str(&html_escape(t)),
            NodeKind::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    if value.is_empty() && is_boolean_attribute(name) {
                        out.push_str(&format!(" {}", name));
                    } else {
                        out.push_str(&format!(" {}=\"{}\"", name, html_escape(value)));
                    }
                }
                out.push('>');
                if is_void_element(tag) {
                    return;
                }
                for child in &self.nodes[node.0].children {
                    self.write_html(*child, out);
                }
                out.push_str(&format!("</{}>", tag));
            }
        }
    }
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn is_void_element(tag: &str) -> bool {
    matches!(tag, "input" | "br" | "hr" | "img" | "meta" | "link")
}

fn is_boolean_attribute(name: &str) -> bool {
    matches!(name, "selected" | "required" | "disabled" | "checked")
}

// ============================================================================
// Selector Subset
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected character {0:?} in selector {1:?}")]
    Unexpected(char, String),
    #[error("unterminated attribute selector in {0:?}")]
    Unterminated(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Contains(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, AttrOp)>,
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag(node) else {
            return false;
        };
        if self.tag.as_deref().is_some_and(|t| t != tag) {
            return false;
        }
        if self
            .id
            .as_deref()
            .is_some_and(|id| doc.attribute(node, "id") != Some(id))
        {
            return false;
        }
        if !self.classes.iter().all(|c| doc.has_class(node, c)) {
            return false;
        }
        self.attrs.iter().all(|(name, op)| {
            let value = doc.attribute(node, name);
            match op {
                AttrOp::Exists => value.is_some(),
                AttrOp::Equals(v) => value == Some(v.as_str()),
                AttrOp::Contains(v) => value.is_some_and(|actual| !v.is_empty() && actual.contains(v.as_str())),
            }
        })
    }
}

/// A comma-separated list of compound selectors (no combinators).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Compound>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let alternatives = input
            .split(',')
            .map(|part| parse_compound(part.trim(), input))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { alternatives })
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.alternatives.iter().any(|c| c.matches(doc, node))
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn parse_compound(part: &str, whole: &str) -> Result<Compound, SelectorError> {
    if part.is_empty() {
        return Err(SelectorError::Empty);
    }
    let mut compound = Compound::default();
    let mut chars = part.chars().peekable();

    while let Some(c) = chars.peek().copied() {
        match c {
            '.' | '#' => {
                chars.next();
                let ident = take_ident(&mut chars);
                if ident.is_empty() {
                    return Err(SelectorError::Unexpected(c, whole.to_string()));
                }
                if c == '.' {
                    compound.classes.push(ident);
                } else {
                    compound.id = Some(ident);
                }
            }
            '[' => {
                chars.next();
                let mut body = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(ch) => body.push(ch),
                        None => return Err(SelectorError::Unterminated(whole.to_string())),
                    }
                }
                compound.attrs.push(parse_attribute(&body, whole)?);
            }
            c if is_ident_char(c) && compound.tag.is_none() && compound.classes.is_empty() => {
                compound.tag = Some(take_ident(&mut chars).to_ascii_lowercase());
            }
            other => return Err(SelectorError::Unexpected(other, whole.to_string())),
        }
    }
    Ok(compound)
}

fn take_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut ident = String::new();
    while let Some(c) = chars.peek().copied().filter(|c| is_ident_char(*c)) {
        ident.push(c);
        chars.next();
    }
    ident
}

fn parse_attribute(body: &str, whole: &str) -> Result<(String, AttrOp), SelectorError> {
    let unquote = |v: &str| v.trim().trim_matches(|c| c == '"' || c == '\'').to_string();
    if let Some((name, value)) = body.split_once("*=") {
        return Ok((name.trim().to_string(), AttrOp::Contains(unquote(value))));
    }
    if let Some((name, value)) = body.split_once('=') {
        return Ok((name.trim().to_string(), AttrOp::Equals(unquote(value))));
    }
    let name = body.trim();
    if name.is_empty() || !name.chars().all(is_ident_char) {
        return Err(SelectorError::Unterminated(whole.to_string()));
    }
    Ok((name.to_string(), AttrOp::Exists))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::at("https://example.test/countries/").unwrap()
    }

    #[test]
    fn selector_subset_matches() {
        let mut d = doc();
        let body = d.body();
        let article = d.element("article", &[("id", "entry-12"), ("class", "card big")]);
        d.append_child(body, article);
        let div = d.element("div", &[("data-entry-id", "9")]);
        d.append_child(body, div);

        assert_eq!(d.select("article[id*=\"entry\"]").unwrap(), vec![article]);
        assert_eq!(d.select(".card.big").unwrap(), vec![article]);
        assert_eq!(d.select("[data-entry-id]").unwrap(), vec![div]);
        assert_eq!(d.select("[data-entry-id=\"9\"]").unwrap(), vec![div]);
        assert_eq!(d.select("#entry-12, div").unwrap(), vec![article, div]);
        assert!(d.select("section").unwrap().is_empty());
    }

    #[test]
    fn malformed_selectors_are_rejected() {
        assert_eq!(Selector::parse(""), Err(SelectorError::Empty));
        assert!(matches!(
            Selector::parse("[data-x"),
            Err(SelectorError::Unterminated(_))
        ));
        assert!(matches!(
            Selector::parse("div > p"),
            Err(SelectorError::Unexpected(' ', _))
        ));
    }

    #[test]
    fn insert_remove_and_connectivity() {
        let mut d = doc();
        let body = d.body();
        let a = d.create_element("p");
        let b = d.create_element("p");
        d.append_child(body, a);
        d.prepend_child(body, b);
        assert_eq!(d.children(body), &[b, a]);
        assert!(d.is_connected(a));

        d.remove(a);
        assert!(!d.is_connected(a));
        assert_eq!(d.children(body), &[b]);
        d.remove(a);
        assert_eq!(d.children(body), &[b]);
    }

    #[test]
    fn observer_records_only_observed_subtree() {
        let mut d = doc();
        let body = d.body();
        let head = d.head();
        let obs = d.observe(body);

        let p = d.create_element("p");
        d.append_child(body, p);
        let style = d.create_element("style");
        d.append_child(head, style);

        let records = d.take_records(obs);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target, body);
        assert_eq!(records[0].added, vec![p]);
        assert!(d.take_records(obs).is_empty());
    }

    #[test]
    fn paused_observer_ignores_writes_until_resumed() {
        let mut d = doc();
        let body = d.body();
        let obs = d.observe(body);

        d.pause(obs);
        d.pause(obs);
        let p = d.create_element("p");
        d.append_child(body, p);
        d.resume(obs);
        d.remove(p);
        d.resume(obs);
        assert!(d.take_records(obs).is_empty());

        d.append_child(body, p);
        assert_eq!(d.take_records(obs).len(), 1);

        d.disconnect(obs);
        assert_eq!(d.observer_count(), 0);
        d.remove(p);
        assert!(d.take_records(obs).is_empty());
    }

    #[test]
    fn form_control_values() {
        let mut d = doc();
        let form = d.create_element("form");
        let input = d.element("input", &[("name", "term"), ("value", "dale")]);
        let area = d.element("textarea", &[("name", "notes")]);
        let select = d.element("select", &[("name", "category")]);
        for value in ["word", "phrase"] {
            let opt = d.element("option", &[("value", value)]);
            d.append_child(select, opt);
        }
        for n in [input, area, select] {
            d.append_child(form, n);
        }

        assert_eq!(d.control_value(input).as_deref(), Some("dale"));
        assert_eq!(d.control_value(area).as_deref(), Some(""));
        assert_eq!(d.control_value(select).as_deref(), Some("word"));

        d.set_control_value(area, "informal");
        d.set_control_value(select, "phrase");
        assert_eq!(d.control_value(area).as_deref(), Some("informal"));
        assert_eq!(d.control_value(select).as_deref(), Some("phrase"));
        assert_eq!(d.named_control(form, "notes"), Some(area));
    }

    #[test]
    fn outer_html_escapes_text_and_attributes() {
        let mut d = doc();
        let div = d.element("div", &[("title", "a\"b")]);
        let input = d.element("input", &[("value", "<x>"), ("required", "")]);
        let text = d.create_text("Tom & <Jerry>");
        d.append_child(div, text);
        d.append_child(div, input);
        assert_eq!(
            d.outer_html(div),
            "<div title=\"a&quot;b\">Tom &amp; &lt;Jerry&gt;<input value=\"&lt;x&gt;\" required></div>"
        );
    }

    #[test]
    fn styles_and_classes() {
        let mut d = doc();
        let div = d.element("div", &[("class", "a")]);
        d.add_class(div, "b");
        d.add_class(div, "b");
        assert_eq!(d.attribute(div, "class"), Some("a b"));
        d.remove_class(div, "a");
        assert_eq!(d.attribute(div, "class"), Some("b"));

        d.set_style(div, "opacity", "1");
        d.set_style(div, "transition", "opacity 0.3s ease");
        d.set_style(div, "opacity", "0");
        assert_eq!(d.style(div, "opacity").as_deref(), Some("0"));
        assert_eq!(
            d.style(div, "transition").as_deref(),
            Some("opacity 0.3s ease")
        );
    }
}
