//! Command-line check for the admin overlay.
//!
//! Runs the boundary check for a page URL against the live backend and,
//! given an entry id, renders the edit form the overlay would open.
//!
//! Usage: `lingo-overlay <page-url> [entry-id]`

use lingo_overlay::{Activation, Document, EntryId, HeadlessWindow, Overlay, OverlayConfig};
use std::env;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lingo_overlay=info")),
        )
        .init();

    let mut args = env::args().skip(1);
    let Some(page_url) = args.next() else {
        eprintln!("usage: lingo-overlay <page-url> [entry-id]");
        return ExitCode::FAILURE;
    };
    let entry = args.next().map(EntryId::new);

    let config = match OverlayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let document = match Document::at(&page_url) {
        Ok(document) => document,
        Err(e) => {
            eprintln!("invalid page url {}: {}", page_url, e);
            return ExitCode::FAILURE;
        }
    };

    let mut overlay = Overlay::new(document, HeadlessWindow::default(), config);
    let activation = overlay.initialize().await;
    println!("Admin overlay: {}", activation);
    if let Some(user) = overlay.state().current_user.as_ref().and_then(|u| u.username.as_deref()) {
        println!("Signed in as: {}", user);
    }

    let Some(id) = entry else {
        return ExitCode::SUCCESS;
    };
    if activation != Activation::Active {
        return ExitCode::FAILURE;
    }

    overlay.edit_entry(&id).await;
    match overlay.modal().node() {
        Some(modal) => {
            println!("{}", overlay.document().outer_html(modal));
            ExitCode::SUCCESS
        }
        None => {
            for notification in overlay.notifications().live() {
                println!("{}", notification.message);
            }
            ExitCode::FAILURE
        }
    }
}
