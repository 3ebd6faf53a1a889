//! Lingo overlay library - the admin editing layer for the lingo site.
//!
//! The page is modelled as an owned [`dom::Document`]; the overlay finds
//! entries in it, injects controls, and talks to the admin entry API.
//!
//! - `models`: entries, categories, envelopes and request payloads
//! - `dom`: arena document, selectors and mutation observation
//! - `locator`: discovery of entry nodes and their ids
//! - `notifications`: timed success/error messages
//! - `modal`: the single edit/translation/example form
//! - `client`: HTTP client for the admin endpoints
//! - `overlay`: the controller tying it all together

pub mod client;
pub mod config;
pub mod csrf;
pub mod dom;
pub mod locator;
pub mod modal;
pub mod models;
pub mod notifications;
pub mod overlay;
pub mod styles;
pub mod url_validator;
pub mod window;

pub use client::{ClientError, EntryClient};
pub use config::{OverlayConfig, RefreshStrategy};
pub use dom::{Document, NodeId};
pub use models::{Category, Entry, EntryId};
pub use overlay::{Activation, Overlay, UiEvent};
pub use window::{HeadlessWindow, Window};
