//! The admin overlay: one context object owning the page, the window, the
//! entry client and every piece of injected UI.
//!
//! All handlers take `&mut self`, so operations run one at a time the way
//! browser callbacks do. Every write the overlay makes to the page goes
//! through [`Overlay::quietly`], which pauses the mutation observer so the
//! overlay never reacts to its own DOM changes.

use crate::client::{ClientError, EntryClient};
use crate::config::{OverlayConfig, RefreshStrategy};
use crate::dom::{Document, NodeId, ObserverId};
use crate::locator::{locate_entries, LocatedEntry, ENTRY_ID_ATTR};
use crate::modal::{ModalController, Submission, ACTION_ATTR};
use crate::models::{
    AdminIdentity, BulkAction, BulkActionRequest, Entry, EntryId, EntryUpdate, Envelope,
    ExampleRequest, TranslationRequest,
};
use crate::notifications::{
    NotificationId, NotificationKind, NotificationQueue, DISMISS_ACTION, NOTIFICATION_ATTR,
};
use crate::styles;
use crate::url_validator::validate_api_base;
use crate::window::Window;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const TOGGLE_CONTAINER_ID: &str = "admin-editing-toggle";
pub const TOGGLE_BUTTON_ID: &str = "admin-toggle-btn";
pub const CONTROLS_CLASS: &str = "admin-edit-controls";
/// Marks control blocks and their buttons with the entry they act on.
pub const ENTRY_MARKER_ATTR: &str = "data-admin-entry";

pub const ENABLED_MESSAGE: &str = "Admin editing mode enabled";
pub const DISABLED_MESSAGE: &str = "Admin editing mode disabled";
pub const DELETE_CONFIRMATION: &str =
    "Are you sure you want to delete this entry? This action cannot be undone.";
pub const EMPTY_PAGE_MESSAGE: &str = "No entries found on this page";
pub const MISSING_TAG_MESSAGE: &str = "Tag name required for remove_tag action";

/// Longest [`Overlay::run`] sleeps when no notification or timer is due.
pub const IDLE_WAIT: Duration = Duration::from_secs(1);

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayState {
    pub enabled: bool,
    pub current_user: Option<AdminIdentity>,
}

/// Outcome of [`Overlay::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Active,
    NotAdmin,
    CheckFailed,
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activation::Active => write!(f, "active"),
            Activation::NotAdmin => write!(f, "not an admin"),
            Activation::CheckFailed => write!(f, "admin check failed"),
        }
    }
}

/// The per-entry actions offered in a control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Edit,
    Flag,
    Translate,
    Example,
    Delete,
}

impl ControlAction {
    pub const ALL: [ControlAction; 5] = [
        ControlAction::Edit,
        ControlAction::Flag,
        ControlAction::Translate,
        ControlAction::Example,
        ControlAction::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ControlAction::Edit => "edit",
            ControlAction::Flag => "flag",
            ControlAction::Translate => "translate",
            ControlAction::Example => "example",
            ControlAction::Delete => "delete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == value)
    }

    fn label(&self) -> &'static str {
        match self {
            ControlAction::Edit => "Edit",
            ControlAction::Flag => "Flag",
            ControlAction::Translate => "Add Translation",
            ControlAction::Example => "Add Example",
            ControlAction::Delete => "Delete",
        }
    }

    fn css_class(&self) -> &'static str {
        match self {
            ControlAction::Flag => "admin-edit-btn warning",
            ControlAction::Delete => "admin-edit-btn danger",
            _ => "admin-edit-btn",
        }
    }
}

/// Input for [`Overlay::run`].
pub enum UiEvent {
    Click(NodeId),
    Submit,
    Toggle,
    /// A change made by the host page rather than the overlay.
    Page(Box<dyn FnOnce(&mut Document) + Send>),
    Shutdown,
}

impl fmt::Debug for UiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiEvent::Click(node) => f.debug_tuple("Click").field(node).finish(),
            UiEvent::Submit => write!(f, "Submit"),
            UiEvent::Toggle => write!(f, "Toggle"),
            UiEvent::Page(_) => write!(f, "Page(..)"),
            UiEvent::Shutdown => write!(f, "Shutdown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Deferred {
    Remove(NodeId),
    Navigate(String),
}

#[derive(Debug)]
struct Timer {
    due: DateTime<Utc>,
    action: Deferred,
}

// ============================================================================
// Overlay
// ============================================================================

#[derive(Debug)]
pub struct Overlay<W: Window> {
    document: Document,
    window: W,
    config: OverlayConfig,
    state: OverlayState,
    client: Option<EntryClient>,
    notifications: NotificationQueue,
    modal: ModalController,
    toggle_button: Option<NodeId>,
    observer: Option<ObserverId>,
    attached: Vec<LocatedEntry>,
    timers: Vec<Timer>,
    observer_callbacks: usize,
}

impl<W: Window> Overlay<W> {
    pub fn new(document: Document, window: W, config: OverlayConfig) -> Self {
        let notifications = NotificationQueue::new(config.notification_duration);
        Self {
            document,
            window,
            config,
            state: OverlayState::default(),
            client: None,
            notifications,
            modal: ModalController::new(),
            toggle_button: None,
            observer: None,
            attached: Vec::new(),
            timers: Vec::new(),
            observer_callbacks: 0,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Direct access for changes made by the host page. These are observed.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    /// True once the boundary check has passed and the UI is mounted.
    pub fn is_active(&self) -> bool {
        self.toggle_button.is_some()
    }

    pub fn toggle_button(&self) -> Option<NodeId> {
        self.toggle_button
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn modal(&self) -> &ModalController {
        &self.modal
    }

    pub fn attached_entries(&self) -> &[LocatedEntry] {
        &self.attached
    }

    /// Number of mutation batches the watcher has handled.
    pub fn observer_callbacks(&self) -> usize {
        self.observer_callbacks
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Control blocks currently in the page, in document order.
    pub fn control_blocks(&self) -> Vec<NodeId> {
        let body = self.document.body();
        self.document
            .descendants(body)
            .into_iter()
            .filter(|n| self.document.has_class(*n, CONTROLS_CLASS))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Runs the boundary check and, for admins only, mounts the overlay.
    pub async fn initialize(&mut self) -> Activation {
        if self.is_active() {
            return Activation::Active;
        }

        let client = match self.build_client() {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "admin overlay disabled: client setup failed");
                return Activation::CheckFailed;
            }
        };

        let identity = match client.admin_check().await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "admin check failed");
                return Activation::CheckFailed;
            }
        };

        if !identity.is_admin {
            debug!(user = ?identity.username, "not an admin, overlay stays dormant");
            return Activation::NotAdmin;
        }

        info!(user = ?identity.username, "admin overlay initialized");
        self.state.current_user = Some(identity);
        self.client = Some(client);
        self.mount();
        Activation::Active
    }

    fn build_client(&self) -> Result<EntryClient, ClientError> {
        let base = validate_api_base(&self.config.api_base, self.document.location())?;
        let client = EntryClient::new(
            base,
            self.config.request_timeout,
            self.config.session_cookie.as_deref(),
        )?;
        Ok(client.with_csrf_token(self.config.csrf.resolve(&self.document)))
    }

    fn mount(&mut self) {
        styles::install(&mut self.document);

        let container = self.document.element("div", &[("id", TOGGLE_CONTAINER_ID)]);
        let button = self.document.element(
            "button",
            &[
                ("id", TOGGLE_BUTTON_ID),
                ("class", "admin-toggle-btn"),
                ("title", "Toggle admin editing mode"),
                (ACTION_ATTR, "toggle"),
            ],
        );
        let label = self.document.create_text("Admin Edit");
        self.document.append_child(button, label);
        self.document.append_child(container, button);
        let body = self.document.body();
        self.document.append_child(body, container);
        self.toggle_button = Some(button);

        self.notifications.mount(&mut self.document);

        // Registered last so the injection above is not observed.
        self.observer = Some(self.document.observe(body));
    }

    /// Flips editing mode. Returns the new mode; inactive overlays ignore it.
    pub fn toggle(&mut self) -> bool {
        let Some(button) = self.toggle_button else {
            debug!("toggle ignored: overlay inactive");
            return false;
        };

        self.state.enabled = !self.state.enabled;
        let enabled = self.state.enabled;
        self.quietly(|this| {
            if enabled {
                this.document.add_class(button, "active");
                this.attach_controls();
            } else {
                this.document.remove_class(button, "active");
                this.detach_controls();
            }
        });
        info!(enabled, "admin editing toggled");
        self.notify(
            if enabled { ENABLED_MESSAGE } else { DISABLED_MESSAGE },
            NotificationKind::Success,
        );
        enabled
    }

    // ------------------------------------------------------------------------
    // Controls
    // ------------------------------------------------------------------------

    fn quietly<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        if let Some(observer) = self.observer {
            self.document.pause(observer);
        }
        let out = f(self);
        if let Some(observer) = self.observer {
            self.document.resume(observer);
        }
        out
    }

    fn attach_controls(&mut self) {
        self.detach_controls();
        let entries = locate_entries(&mut self.document);
        for entry in &entries {
            let block = self.control_block(&entry.id);
            self.document.prepend_child(entry.node, block);
        }
        debug!(count = entries.len(), "controls attached");
        self.attached = entries;
    }

    fn detach_controls(&mut self) {
        for block in self.control_blocks() {
            self.document.remove(block);
        }
        self.attached.clear();
    }

    fn control_block(&mut self, id: &EntryId) -> NodeId {
        let doc = &mut self.document;
        let block = doc.element(
            "div",
            &[
                ("class", "admin-edit-controls active"),
                (ENTRY_MARKER_ATTR, id.as_str()),
            ],
        );
        let label = doc.element("div", &[("class", "admin-controls-label")]);
        doc.set_text(label, &format!("Admin Controls for Entry #{}", id));
        doc.append_child(block, label);

        for action in ControlAction::ALL {
            let button = doc.element(
                "button",
                &[
                    ("type", "button"),
                    ("class", action.css_class()),
                    (ACTION_ATTR, action.as_str()),
                    (ENTRY_MARKER_ATTR, id.as_str()),
                ],
            );
            doc.set_text(button, action.label());
            doc.append_child(block, button);
        }
        block
    }

    fn controls_intact(&self) -> bool {
        self.control_blocks().len() == self.attached.len()
            && self.attached.iter().all(|entry| {
                self.document.first_child(entry.node).is_some_and(|first| {
                    self.document.has_class(first, CONTROLS_CLASS)
                        && self.document.attribute(first, ENTRY_MARKER_ATTR)
                            == Some(entry.id.as_str())
                })
            })
    }

    /// Delivers queued mutation records to the watcher. Returns how many
    /// records the batch held.
    pub fn flush_mutations(&mut self) -> usize {
        let Some(observer) = self.observer else {
            return 0;
        };
        let records = self.document.take_records(observer);
        if records.is_empty() {
            return 0;
        }

        self.observer_callbacks += 1;
        debug!(records = records.len(), "page mutated");
        if self.state.enabled {
            self.resync_controls();
        }
        records.len()
    }

    fn resync_controls(&mut self) {
        let fresh = self.quietly(|this| locate_entries(&mut this.document));
        if fresh == self.attached && self.controls_intact() {
            debug!("entries unchanged, controls left in place");
            return;
        }
        self.quietly(|this| this.attach_controls());
    }

    // ------------------------------------------------------------------------
    // Click dispatch
    // ------------------------------------------------------------------------

    /// Routes a click on any node to the action marked on it or its nearest
    /// marked ancestor.
    pub async fn dispatch_click(&mut self, target: NodeId) {
        let Some(node) = self.document.closest_with_attribute(target, ACTION_ATTR) else {
            return;
        };
        let action = self
            .document
            .attribute(node, ACTION_ATTR)
            .unwrap_or_default()
            .to_string();

        match action.as_str() {
            "toggle" => {
                self.toggle();
            }
            "cancel" => self.close_modal(),
            DISMISS_ACTION => {
                match self
                    .document
                    .attribute(node, NOTIFICATION_ATTR)
                    .and_then(|id| id.parse::<NotificationId>().ok())
                {
                    Some(id) => self.dismiss_notification(id),
                    None => debug!("dismiss click without a notification id"),
                }
            }
            "submit" => self.submit_modal().await,
            other => {
                let entry = self
                    .document
                    .attribute(node, ENTRY_MARKER_ATTR)
                    .map(EntryId::from);
                match (ControlAction::parse(other), entry) {
                    (Some(action), Some(id)) => self.run_control(action, &id).await,
                    _ => debug!(action = other, "unhandled click"),
                }
            }
        }
    }

    pub async fn run_control(&mut self, action: ControlAction, id: &EntryId) {
        debug!(action = action.as_str(), entry = %id, "control action");
        match action {
            ControlAction::Edit => self.edit_entry(id).await,
            ControlAction::Flag => self.flag_entry(id).await,
            ControlAction::Translate => self.open_translation_form(id),
            ControlAction::Example => self.open_example_form(id),
            ControlAction::Delete => self.delete_entry(id).await,
        }
    }

    // ------------------------------------------------------------------------
    // Entry operations
    // ------------------------------------------------------------------------

    /// Fetches fresh entry data and opens the edit form with it.
    pub async fn edit_entry(&mut self, id: &EntryId) {
        let Some(client) = self.client.clone() else {
            return;
        };
        let outcome = client.get_entry(id).await;
        let Some(envelope) = self.settle(outcome, "Error loading entry data") else {
            return;
        };
        match envelope.entry {
            Some(entry) => {
                self.quietly(|this| this.modal.open_edit(&mut this.document, &entry));
            }
            None => self.notify(
                "Error loading entry data: response carried no entry",
                NotificationKind::Error,
            ),
        }
    }

    /// Validates and sends whichever form is open. The modal is closed once
    /// the request completes, whatever its outcome; a form that fails
    /// validation stays open and nothing is sent.
    pub async fn submit_modal(&mut self) {
        let Some(id) = self.modal.entry_id().cloned() else {
            return;
        };
        let submission = match self.modal.submission(&self.document) {
            Ok(submission) => submission,
            Err(e) => {
                debug!(error = %e, "submission aborted");
                return;
            }
        };

        match submission {
            Submission::Edit(update) => self.save(&id, &update).await,
            Submission::Translation(request) => self.add_translation(&id, &request).await,
            Submission::Example(request) => self.add_example(&id, &request).await,
        }
        self.close_modal();
    }

    pub fn close_modal(&mut self) {
        self.quietly(|this| this.modal.close(&mut this.document));
    }

    pub async fn save(&mut self, id: &EntryId, update: &EntryUpdate) {
        let Some(client) = self.client.clone() else {
            return;
        };
        let outcome = client.quick_edit(id, update).await;
        let Some(envelope) = self.settle(outcome, "Error saving changes") else {
            return;
        };
        info!(entry = %id, "entry saved");
        self.notify(
            &success_message(&envelope, "Entry updated successfully"),
            NotificationKind::Success,
        );
        self.refresh(id).await;
    }

    pub async fn flag_entry(&mut self, id: &EntryId) {
        let Some(client) = self.client.clone() else {
            return;
        };
        let outcome = client.flag(id, &self.config.flag_type).await;
        let Some(envelope) = self.settle(outcome, "Error flagging entry") else {
            return;
        };
        info!(entry = %id, flag = %self.config.flag_type, "entry flagged");
        self.notify(
            &success_message(&envelope, "Entry flagged for review"),
            NotificationKind::Success,
        );
    }

    /// Deletes after confirmation. A declined confirmation does nothing.
    pub async fn delete_entry(&mut self, id: &EntryId) {
        let Some(client) = self.client.clone() else {
            return;
        };
        if !self.window.confirm(DELETE_CONFIRMATION) {
            debug!(entry = %id, "delete declined");
            return;
        }

        let outcome = client.delete(id).await;
        let Some(envelope) = self.settle(outcome, "Error deleting entry") else {
            return;
        };
        info!(entry = %id, "entry deleted");
        self.notify(
            &success_message(&envelope, "Entry deleted successfully"),
            NotificationKind::Success,
        );

        let now = Utc::now();
        match self.entry_node(id) {
            Some(node) => {
                self.quietly(|this| {
                    this.document.set_style(node, "transition", "opacity 0.3s ease");
                    this.document.set_style(node, "opacity", "0");
                });
                self.schedule(now + self.config.delete_fade, Deferred::Remove(node));
            }
            None => {
                let target = self.config.delete_redirect.clone();
                self.schedule(now + self.config.delete_redirect_delay, Deferred::Navigate(target));
            }
        }
    }

    fn entry_node(&self, id: &EntryId) -> Option<NodeId> {
        self.document
            .find_by_attribute(ENTRY_ID_ATTR, id.as_str())
            .into_iter()
            .next()
            .or_else(|| {
                self.attached
                    .iter()
                    .find(|e| &e.id == id && self.document.is_connected(e.node))
                    .map(|e| e.node)
            })
    }

    pub fn open_translation_form(&mut self, id: &EntryId) {
        self.quietly(|this| this.modal.open_translation(&mut this.document, id));
    }

    pub fn open_example_form(&mut self, id: &EntryId) {
        self.quietly(|this| this.modal.open_example(&mut this.document, id));
    }

    pub async fn add_translation(&mut self, id: &EntryId, request: &TranslationRequest) {
        let Some(client) = self.client.clone() else {
            return;
        };
        let outcome = client.add_translation(id, request).await;
        let Some(envelope) = self.settle(outcome, "Error adding translation") else {
            return;
        };
        info!(entry = %id, language = %request.target_language_code, "translation added");
        self.notify(
            &success_message(&envelope, "Translation added successfully"),
            NotificationKind::Success,
        );
        self.refresh(id).await;
    }

    pub async fn add_example(&mut self, id: &EntryId, request: &ExampleRequest) {
        let Some(client) = self.client.clone() else {
            return;
        };
        let outcome = client.add_example(id, request).await;
        let Some(envelope) = self.settle(outcome, "Error adding example") else {
            return;
        };
        info!(entry = %id, language = %request.language_code, "example added");
        self.notify(
            &success_message(&envelope, "Example added successfully"),
            NotificationKind::Success,
        );
        self.refresh(id).await;
    }

    /// Applies `action` to every entry currently on the page.
    pub async fn bulk_action(&mut self, action: BulkAction, tag_name: Option<String>) {
        let Some(client) = self.client.clone() else {
            return;
        };

        let mut entry_ids: Vec<EntryId> = Vec::new();
        for entry in self.quietly(|this| locate_entries(&mut this.document)) {
            if !entry_ids.contains(&entry.id) {
                entry_ids.push(entry.id);
            }
        }
        if entry_ids.is_empty() {
            self.notify(EMPTY_PAGE_MESSAGE, NotificationKind::Error);
            return;
        }

        let tag_name = tag_name.filter(|t| !t.trim().is_empty());
        if action == BulkAction::RemoveTag && tag_name.is_none() {
            self.notify(MISSING_TAG_MESSAGE, NotificationKind::Error);
            return;
        }

        let requested = entry_ids.len();
        let request = BulkActionRequest {
            entry_ids,
            action,
            tag_name,
        };
        let outcome = client.bulk_action(&request).await;
        let Some(envelope) = self.settle(outcome, "Error performing bulk action") else {
            return;
        };
        let updated = envelope.count.unwrap_or(requested as u64);
        info!(?action, requested, updated, "bulk action applied");
        self.notify(
            &success_message(&envelope, &format!("Bulk action applied to {} entries", updated)),
            NotificationKind::Success,
        );
    }

    // ------------------------------------------------------------------------
    // Outcome handling
    // ------------------------------------------------------------------------

    /// Passes a successful envelope through; anything else becomes an error
    /// notification.
    fn settle(
        &mut self,
        outcome: Result<Envelope, ClientError>,
        failure: &str,
    ) -> Option<Envelope> {
        match outcome {
            Ok(envelope) if envelope.is_success() => Some(envelope),
            Ok(envelope) => {
                let message = if envelope.message.trim().is_empty() {
                    format!("{}: request rejected", failure)
                } else {
                    envelope.message
                };
                warn!(%message, "request rejected");
                self.notify(&message, NotificationKind::Error);
                None
            }
            Err(e) => {
                warn!(error = %e, "{}", failure);
                self.notify(&format!("{}: {}", failure, e), NotificationKind::Error);
                None
            }
        }
    }

    pub fn dismiss_notification(&mut self, id: NotificationId) {
        self.quietly(|this| this.notifications.dismiss(&mut this.document, id));
    }

    fn notify(&mut self, message: &str, kind: NotificationKind) {
        self.quietly(|this| {
            this.notifications.notify(&mut this.document, message, kind);
        });
    }

    async fn refresh(&mut self, id: &EntryId) {
        match self.config.refresh {
            RefreshStrategy::Reload => self.window.reload(),
            RefreshStrategy::Refetch => {
                let Some(client) = self.client.clone() else {
                    return;
                };
                let outcome = client.get_entry(id).await;
                let Some(envelope) = self.settle(outcome, "Error refreshing entry") else {
                    return;
                };
                if let Some(entry) = envelope.entry {
                    self.quietly(|this| this.patch_entry(&entry));
                }
            }
        }
    }

    fn patch_entry(&mut self, entry: &Entry) {
        let mut nodes = self.document.find_by_attribute(ENTRY_ID_ATTR, entry.id.as_str());
        for located in &self.attached {
            if located.id == entry.id && !nodes.contains(&located.node) {
                nodes.push(located.node);
            }
        }

        let notes = entry.notes.clone().unwrap_or_default();
        for node in nodes {
            for child in self.document.descendants(node) {
                if self.document.has_class(child, "entry-term") {
                    self.document.set_text(child, &entry.term);
                } else if self.document.has_class(child, "entry-notes") {
                    self.document.set_text(child, &notes);
                } else if self.document.has_class(child, "entry-category") {
                    self.document.set_text(child, entry.category.label());
                }
            }
        }
        debug!(entry = %entry.id, "entry refreshed in place");
    }

    // ------------------------------------------------------------------------
    // Timers and the event loop
    // ------------------------------------------------------------------------

    fn schedule(&mut self, due: DateTime<Utc>, action: Deferred) {
        self.timers.push(Timer { due, action });
    }

    /// Earliest instant at which [`Overlay::advance`] has work to do.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        let timers = self.timers.iter().map(|t| t.due).min();
        match (self.notifications.next_expiry(), timers) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Stops watching the page. Records already queued are dropped.
    pub fn stop_watching(&mut self) {
        if let Some(observer) = self.observer.take() {
            self.document.disconnect(observer);
            debug!("mutation watcher disconnected");
        }
    }

    /// Expires notifications and fires every timer due at `now`.
    pub fn advance(&mut self, now: DateTime<Utc>) {
        self.quietly(|this| {
            this.notifications.expire(&mut this.document, now);
        });

        let (mut due, pending): (Vec<Timer>, Vec<Timer>) =
            self.timers.drain(..).partition(|t| t.due <= now);
        self.timers = pending;
        due.sort_by_key(|t| t.due);

        for timer in due {
            match timer.action {
                Deferred::Remove(node) => {
                    self.quietly(|this| this.document.remove(node));
                }
                Deferred::Navigate(href) => self.window.assign(&href),
            }
        }
    }

    async fn handle(&mut self, event: UiEvent) {
        match event {
            UiEvent::Click(node) => self.dispatch_click(node).await,
            UiEvent::Submit => self.submit_modal().await,
            UiEvent::Toggle => {
                self.toggle();
            }
            UiEvent::Page(change) => change(&mut self.document),
            UiEvent::Shutdown => {}
        }
    }

    /// Handles events until the channel closes or `Shutdown` arrives,
    /// waking for the next notification expiry or timer in between.
    /// Mutation records are delivered after every event and wake-up; the
    /// watcher is disconnected when the loop ends.
    pub async fn run(&mut self, mut events: mpsc::UnboundedReceiver<UiEvent>) {
        loop {
            let wait = self
                .next_deadline()
                .map(|due| (due - Utc::now()).to_std().unwrap_or(Duration::ZERO))
                .map_or(IDLE_WAIT, |wait| wait.min(IDLE_WAIT));

            tokio::select! {
                event = events.recv() => match event {
                    None | Some(UiEvent::Shutdown) => break,
                    Some(event) => self.handle(event).await,
                },
                _ = tokio::time::sleep(wait) => self.advance(Utc::now()),
            }
            self.flush_mutations();
        }

        self.flush_mutations();
        self.stop_watching();
        debug!("event loop stopped");
    }
}

fn success_message(envelope: &Envelope, fallback: &str) -> String {
    if envelope.message.trim().is_empty() {
        fallback.to_string()
    } else {
        envelope.message.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::HeadlessWindow;

    fn page() -> Document {
        let mut doc = Document::at("https://lingo.test/entries/").unwrap();
        let body = doc.body();
        for id in ["1", "2"] {
            let item = doc.element("div", &[("class", "entry-item"), (ENTRY_ID_ATTR, id)]);
            let term = doc.element("span", &[("class", "entry-term")]);
            doc.set_text(term, "che");
            doc.append_child(item, term);
            doc.append_child(body, item);
        }
        doc
    }

    /// Mounts without the boundary call.
    fn mounted() -> Overlay<HeadlessWindow> {
        let mut overlay = Overlay::new(page(), HeadlessWindow::default(), OverlayConfig::default());
        overlay.mount();
        overlay
    }

    #[test]
    fn control_actions_parse_from_markers() {
        for action in ControlAction::ALL {
            assert_eq!(ControlAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(ControlAction::parse("publish"), None);
    }

    #[test]
    fn toggle_is_ignored_before_mount() {
        let mut overlay = Overlay::new(page(), HeadlessWindow::default(), OverlayConfig::default());
        assert!(!overlay.toggle());
        assert!(overlay.control_blocks().is_empty());
        assert!(overlay.notifications().is_empty());
    }

    #[test]
    fn toggle_attaches_one_block_per_entry_as_first_child() {
        let mut overlay = mounted();
        assert!(overlay.toggle());

        let blocks = overlay.control_blocks();
        assert_eq!(blocks.len(), 2);
        for entry in overlay.attached_entries() {
            let first = overlay.document().first_child(entry.node).unwrap();
            assert!(blocks.contains(&first));
            assert_eq!(
                overlay.document().attribute(first, ENTRY_MARKER_ATTR),
                Some(entry.id.as_str())
            );
            assert_eq!(overlay.document().children(first).len(), 1 + ControlAction::ALL.len());
        }
        assert!(overlay
            .document()
            .has_class(overlay.toggle_button().unwrap(), "active"));
    }

    #[test]
    fn own_writes_are_not_observed() {
        let mut overlay = mounted();
        overlay.toggle();
        overlay.toggle();
        overlay.toggle();
        assert_eq!(overlay.flush_mutations(), 0);
        assert_eq!(overlay.observer_callbacks(), 0);
    }

    #[test]
    fn page_changes_resync_controls() {
        let mut overlay = mounted();
        overlay.toggle();

        let doc = overlay.document_mut();
        let body = doc.body();
        let item = doc.element("div", &[("class", "entry-item"), (ENTRY_ID_ATTR, "3")]);
        doc.append_child(body, item);

        assert!(overlay.flush_mutations() > 0);
        assert_eq!(overlay.observer_callbacks(), 1);
        assert_eq!(overlay.control_blocks().len(), 3);
        assert_eq!(overlay.flush_mutations(), 0);
        assert_eq!(overlay.observer_callbacks(), 1);
    }

    #[test]
    fn unrelated_changes_leave_controls_in_place() {
        let mut overlay = mounted();
        overlay.toggle();
        let before = overlay.control_blocks();

        let doc = overlay.document_mut();
        let body = doc.body();
        let footer = doc.element("footer", &[]);
        doc.append_child(body, footer);
        overlay.flush_mutations();

        assert_eq!(overlay.control_blocks(), before);
    }

    #[test]
    fn mutations_while_disabled_are_counted_but_ignored() {
        let mut overlay = mounted();
        let doc = overlay.document_mut();
        let body = doc.body();
        let item = doc.element("div", &[("class", "entry-item"), (ENTRY_ID_ATTR, "9")]);
        doc.append_child(body, item);

        overlay.flush_mutations();
        assert_eq!(overlay.observer_callbacks(), 1);
        assert!(overlay.control_blocks().is_empty());
    }

    #[test]
    fn next_deadline_is_the_earliest_pending_work() {
        let mut overlay = mounted();
        assert_eq!(overlay.next_deadline(), None);

        overlay.notify("saved", NotificationKind::Success);
        let expiry = overlay.notifications().next_expiry().unwrap();
        assert_eq!(overlay.next_deadline(), Some(expiry));

        let sooner = Utc::now() + chrono::Duration::milliseconds(300);
        overlay.schedule(sooner, Deferred::Navigate("/countries/".into()));
        assert_eq!(overlay.next_deadline(), Some(sooner.min(expiry)));
    }

    #[test]
    fn stopped_watcher_ignores_page_changes() {
        let mut overlay = mounted();
        overlay.toggle();
        overlay.stop_watching();
        assert_eq!(overlay.document().observer_count(), 0);

        let doc = overlay.document_mut();
        let body = doc.body();
        let item = doc.element("div", &[("class", "entry-item"), (ENTRY_ID_ATTR, "3")]);
        doc.append_child(body, item);

        assert_eq!(overlay.flush_mutations(), 0);
        assert_eq!(overlay.observer_callbacks(), 0);
        assert_eq!(overlay.control_blocks().len(), 2);
    }

    #[test]
    fn timers_fire_only_when_due() {
        let mut overlay = mounted();
        let target = overlay.document().find_by_attribute(ENTRY_ID_ATTR, "1")[0];
        let now = Utc::now();
        overlay.schedule(now + chrono::Duration::milliseconds(300), Deferred::Remove(target));
        overlay.schedule(now + chrono::Duration::seconds(2), Deferred::Navigate("/countries/".into()));

        overlay.advance(now);
        assert!(overlay.document().is_connected(target));
        assert_eq!(overlay.pending_timers(), 2);

        overlay.advance(now + chrono::Duration::milliseconds(300));
        assert!(!overlay.document().is_connected(target));
        assert!(overlay.window().navigations.is_empty());

        overlay.advance(now + chrono::Duration::seconds(2));
        assert_eq!(overlay.window().navigations, vec!["/countries/".to_string()]);
        assert_eq!(overlay.pending_timers(), 0);
        assert_eq!(overlay.flush_mutations(), 0);
    }
}
