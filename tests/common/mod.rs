//! In-process admin backend for the overlay tests.
//!
//! Every request is recorded. Responses are canned per path; anything not
//! configured answers `{"status": "success"}`, and the admin check answers
//! as an admin unless told otherwise.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::{Json, Router};
use lingo_overlay::dom::Document;
use lingo_overlay::locator::ENTRY_ID_ATTR;
use lingo_overlay::{HeadlessWindow, NodeId, Overlay, OverlayConfig};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

pub const ADMIN_CHECK: &str = "/admin/entries/admin-check/";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub body: Value,
    pub csrf: Option<String>,
    pub cookie: Option<String>,
}

#[derive(Clone, Default)]
pub struct Backend {
    requests: Arc<Mutex<Vec<Recorded>>>,
    responses: Arc<Mutex<HashMap<String, (StatusCode, Value)>>>,
}

impl Backend {
    pub fn respond(&self, path: &str, status: StatusCode, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body));
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests other than the admin check.
    pub fn operations(&self) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path != ADMIN_CHECK)
            .collect()
    }
}

async fn handle(
    State(backend): State<Backend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let path = uri.path().to_string();
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    backend.requests.lock().unwrap().push(Recorded {
        method,
        path: path.clone(),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
        csrf: header("x-csrftoken"),
        cookie: header("cookie"),
    });

    if let Some((status, body)) = backend.responses.lock().unwrap().get(&path).cloned() {
        return (status, Json(body));
    }
    if path == ADMIN_CHECK {
        return (
            StatusCode::OK,
            Json(json!({"is_admin": true, "is_superuser": false, "username": "editor"})),
        );
    }
    (StatusCode::OK, Json(json!({"status": "success", "message": ""})))
}

/// Starts the backend on an ephemeral loopback port.
pub async fn spawn_backend() -> (Backend, SocketAddr) {
    let backend = Backend::default();
    let app = Router::new().fallback(handle).with_state(backend.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (backend, addr)
}

/// A listing page with one `.entry-item` per id, each rendering its term.
pub fn listing_page(addr: SocketAddr, path: &str, entries: &[(&str, &str)]) -> Document {
    let mut doc = Document::at(&format!("http://{}{}", addr, path)).unwrap();
    let body = doc.body();
    let main = doc.element("main", &[]);
    doc.append_child(body, main);
    for &(id, term) in entries {
        let item = doc.element("div", &[("class", "entry-item"), (ENTRY_ID_ATTR, id)]);
        let term_node = doc.element("h2", &[("class", "entry-term")]);
        doc.set_text(term_node, term);
        let notes = doc.element("p", &[("class", "entry-notes")]);
        doc.append_child(item, term_node);
        doc.append_child(item, notes);
        doc.append_child(main, item);
    }
    doc
}

pub async fn active_overlay(
    doc: Document,
    window: HeadlessWindow,
    config: OverlayConfig,
) -> Overlay<HeadlessWindow> {
    let mut overlay = Overlay::new(doc, window, config);
    assert_eq!(
        overlay.initialize().await,
        lingo_overlay::Activation::Active
    );
    overlay
}

/// The control-block button for `action` on entry `id`.
pub fn control_button(overlay: &Overlay<HeadlessWindow>, id: &str, action: &str) -> NodeId {
    let doc = overlay.document();
    doc.select(&format!(
        "button[data-admin-action=\"{}\"][data-admin-entry=\"{}\"]",
        action, id
    ))
    .unwrap()
    .into_iter()
    .next()
    .expect("control button present")
}

pub fn field(overlay: &Overlay<HeadlessWindow>, name: &str) -> NodeId {
    let form = overlay.modal().form().expect("modal open");
    overlay
        .document()
        .named_control(form, name)
        .expect("form field present")
}

pub fn field_value(overlay: &Overlay<HeadlessWindow>, name: &str) -> String {
    let control = field(overlay, name);
    overlay.document().control_value(control).unwrap_or_default()
}
