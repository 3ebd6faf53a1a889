//! Timed success/error feedback.
//!
//! Notifications stack inside one fixed container appended to the body.
//! Every call produces a new node; nothing here can fail, a missing
//! container only means the message goes to the log instead.

use crate::dom::{Document, NodeId};
use crate::modal::ACTION_ATTR;
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

pub const CONTAINER_ID: &str = "admin-notifications";
pub const CONTAINER_CLASS: &str = "admin-notification";
/// Class that makes the container visible.
pub const VISIBLE_CLASS: &str = "show";
pub const DISMISS_ACTION: &str = "dismiss";
/// Carries the notification id on its close button.
pub const NOTIFICATION_ATTR: &str = "data-admin-notification";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

impl NotificationKind {
    fn css_class(&self) -> &'static str {
        match self {
            NotificationKind::Success => "alert alert-success",
            NotificationKind::Error => "alert alert-error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationId(u64);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NotificationId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(NotificationId)
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
    node: NodeId,
}

#[derive(Debug)]
pub struct NotificationQueue {
    container: Option<NodeId>,
    live: VecDeque<Notification>,
    display_for: Duration,
    next_id: u64,
}

impl NotificationQueue {
    pub fn new(display_for: Duration) -> Self {
        Self {
            container: None,
            live: VecDeque::new(),
            display_for,
            next_id: 0,
        }
    }

    /// Appends the (hidden) container to the body. Mounting twice is a no-op.
    pub fn mount(&mut self, doc: &mut Document) -> NodeId {
        if let Some(container) = self.container {
            return container;
        }
        let container = doc.element("div", &[("id", CONTAINER_ID), ("class", CONTAINER_CLASS)]);
        let body = doc.body();
        doc.append_child(body, container);
        self.container = Some(container);
        container
    }

    pub fn container(&self) -> Option<NodeId> {
        self.container
    }

    pub fn notify(
        &mut self,
        doc: &mut Document,
        message: &str,
        kind: NotificationKind,
    ) -> Option<NotificationId> {
        self.notify_at(doc, message, kind, Utc::now())
    }

    pub fn notify_at(
        &mut self,
        doc: &mut Document,
        message: &str,
        kind: NotificationKind,
        now: DateTime<Utc>,
    ) -> Option<NotificationId> {
        match kind {
            NotificationKind::Success => tracing::info!(%message, "notification"),
            NotificationKind::Error => tracing::warn!(%message, "notification"),
        }
        let container = self.container?;

        let id = NotificationId(self.next_id);
        self.next_id += 1;

        let node = doc.element("div", &[("class", kind.css_class())]);
        let text = doc.element("span", &[("class", "admin-notification-text")]);
        doc.set_text(text, message);
        let id_text = id.to_string();
        let close = doc.element(
            "button",
            &[
                ("type", "button"),
                ("class", "admin-notification-close"),
                ("title", "Dismiss"),
                (ACTION_ATTR, DISMISS_ACTION),
                (NOTIFICATION_ATTR, id_text.as_str()),
            ],
        );
        doc.set_text(close, "\u{00d7}");
        doc.append_child(node, text);
        doc.append_child(node, close);
        doc.append_child(container, node);
        doc.add_class(container, VISIBLE_CLASS);

        self.live.push_back(Notification {
            id,
            message: message.to_string(),
            kind,
            created_at: now,
            node,
        });
        Some(id)
    }

    /// Removes one notification immediately.
    pub fn dismiss(&mut self, doc: &mut Document, id: NotificationId) {
        if let Some(pos) = self.live.iter().position(|n| n.id == id) {
            if let Some(n) = self.live.remove(pos) {
                doc.remove(n.node);
            }
            self.hide_if_empty(doc);
        }
    }

    /// Drops every notification that has been shown for the full
    /// duration. Returns how many were removed.
    pub fn expire(&mut self, doc: &mut Document, now: DateTime<Utc>) -> usize {
        let before = self.live.len();
        let display_for = self.display_for;
        let (expired, kept): (Vec<_>, Vec<_>) = self
            .live
            .drain(..)
            .partition(|n| now - n.created_at >= display_for);
        self.live = kept.into();
        for n in &expired {
            doc.remove(n.node);
        }
        if !expired.is_empty() {
            self.hide_if_empty(doc);
        }
        before - self.live.len()
    }

    /// Earliest instant at which [`NotificationQueue::expire`] has work to do.
    pub fn next_expiry(&self) -> Option<DateTime<Utc>> {
        self.live.iter().map(|n| n.created_at + self.display_for).min()
    }

    fn hide_if_empty(&self, doc: &mut Document) {
        if let Some(container) = self.container {
            if doc.children(container).is_empty() {
                doc.remove_class(container, VISIBLE_CLASS);
            }
        }
    }

    pub fn live(&self) -> impl Iterator<Item = &Notification> {
        self.live.iter()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn is_visible(&self, doc: &Document) -> bool {
        self.container
            .map(|c| doc.has_class(c, VISIBLE_CLASS))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Document, NotificationQueue) {
        let mut doc = Document::at("https://lingo.test/").unwrap();
        let mut queue = NotificationQueue::new(Duration::seconds(5));
        queue.mount(&mut doc);
        (doc, queue)
    }

    #[test]
    fn stacks_in_call_order_without_dedup() {
        let (mut doc, mut q) = setup();
        let now = Utc::now();
        q.notify_at(&mut doc, "saved", NotificationKind::Success, now);
        q.notify_at(&mut doc, "saved", NotificationKind::Success, now);
        q.notify_at(&mut doc, "nope", NotificationKind::Error, now);

        let container = q.container().unwrap();
        let texts: Vec<_> = doc
            .children(container)
            .iter()
            .map(|n| doc.text_content(doc.children(*n)[0]))
            .collect();
        assert_eq!(texts, vec!["saved", "saved", "nope"]);
        assert!(q.is_visible(&doc));
        assert!(doc.has_class(doc.children(container)[2], "alert-error"));
    }

    #[test]
    fn removed_no_earlier_than_duration_then_hidden() {
        let (mut doc, mut q) = setup();
        let t0 = Utc::now();
        q.notify_at(&mut doc, "first", NotificationKind::Success, t0);
        q.notify_at(&mut doc, "second", NotificationKind::Success, t0 + Duration::seconds(2));

        assert_eq!(q.expire(&mut doc, t0 + Duration::milliseconds(4999)), 0);
        assert_eq!(q.len(), 2);

        assert_eq!(q.expire(&mut doc, t0 + Duration::seconds(5)), 1);
        assert!(q.is_visible(&doc));
        assert_eq!(q.next_expiry(), Some(t0 + Duration::seconds(7)));

        assert_eq!(q.expire(&mut doc, t0 + Duration::seconds(7)), 1);
        assert!(q.is_empty());
        assert!(!q.is_visible(&doc));
        assert!(doc.children(q.container().unwrap()).is_empty());
    }

    #[test]
    fn dismiss_removes_immediately() {
        let (mut doc, mut q) = setup();
        let id = q.notify(&mut doc, "bye", NotificationKind::Success).unwrap();
        let close = doc.find_by_attribute(NOTIFICATION_ATTR, &id.to_string())[0];
        assert_eq!(doc.attribute(close, ACTION_ATTR), Some(DISMISS_ACTION));
        assert_eq!(doc.attribute(close, NOTIFICATION_ATTR).unwrap().parse::<NotificationId>(), Ok(id));
        q.dismiss(&mut doc, id);
        assert!(q.is_empty());
        assert!(!q.is_visible(&doc));
        q.dismiss(&mut doc, id);
    }

    #[test]
    fn unmounted_queue_never_fails() {
        let mut doc = Document::at("https://lingo.test/").unwrap();
        let mut q = NotificationQueue::new(Duration::seconds(5));
        assert_eq!(q.notify(&mut doc, "lost", NotificationKind::Error), None);
        assert_eq!(q.expire(&mut doc, Utc::now()), 0);
        assert!(!q.is_visible(&doc));
    }
}
