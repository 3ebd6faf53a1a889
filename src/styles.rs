//! Self-contained stylesheet for the injected overlay.
//!
//! Every rule is scoped to an `admin-` class or id so the host page's own
//! stylesheet is never touched.

use crate::dom::{Document, NodeId};

pub const STYLE_ELEMENT_ID: &str = "admin-overlay-styles";

// ============================================================================
// CSS
// ============================================================================

pub const OVERLAY_STYLE: &str = r#"
#admin-editing-toggle { position: fixed; top: 20px; right: 20px; z-index: 10000; }
.admin-toggle-btn { background: #007bff; color: white; border: none; padding: 8px 12px; border-radius: 5px; cursor: pointer; font-size: 12px; }
.admin-toggle-btn:hover { background: #0056b3; }
.admin-toggle-btn.active { background: #28a745; }

/* Per-entry control blocks */
.admin-edit-controls { background: rgba(0, 0, 0, 0.9); color: white; padding: 10px; border-radius: 5px; margin: 10px 0; display: none; position: relative; z-index: 1000; }
.admin-edit-controls.active { display: block; }
.admin-edit-controls .admin-controls-label { font-size: 11px; margin-bottom: 5px; opacity: 0.8; }
.admin-edit-btn { background: #17a2b8; color: white; border: none; padding: 5px 10px; margin: 2px; border-radius: 3px; cursor: pointer; font-size: 11px; }
.admin-edit-btn:hover { background: #138496; }
.admin-edit-btn.warning { background: #ffc107; color: #000; }
.admin-edit-btn.danger { background: #dc3545; margin-left: 10px; }

/* Notifications */
.admin-notification { position: fixed; top: 80px; right: 20px; max-width: 300px; z-index: 10001; opacity: 0; transform: translateX(100%); transition: all 0.3s ease; }
.admin-notification.show { opacity: 1; transform: translateX(0); }
.admin-notification .alert { padding: 10px 15px; border-radius: 5px; margin-bottom: 10px; border: 1px solid; }
.admin-notification .alert-success { background: #d4edda; border-color: #c3e6cb; color: #155724; }
.admin-notification .alert-error { background: #f8d7da; border-color: #f5c6cb; color: #721c24; }
.admin-notification .admin-notification-close { float: right; background: none; border: none; font-size: 16px; line-height: 1; cursor: pointer; color: inherit; margin-left: 10px; }

/* Modal */
.admin-modal { position: fixed; top: 0; left: 0; width: 100%; height: 100%; background: rgba(0, 0, 0, 0.7); z-index: 10002; display: none; align-items: center; justify-content: center; }
.admin-modal.show { display: flex; }
.admin-modal-content { background: white; padding: 20px; border-radius: 8px; max-width: 500px; width: 90%; max-height: 80%; overflow-y: auto; }
.admin-form-group { margin-bottom: 15px; }
.admin-form-group label { display: block; margin-bottom: 5px; font-weight: bold; }
.admin-form-group input, .admin-form-group textarea, .admin-form-group select { width: 100%; padding: 8px; border: 1px solid #ddd; border-radius: 4px; box-sizing: border-box; }
.admin-form-group textarea { height: 100px; resize: vertical; }
.admin-form-actions { text-align: right; margin-top: 20px; }
.admin-form-actions button { margin-left: 10px; padding: 8px 16px; border: none; border-radius: 4px; cursor: pointer; }
.admin-btn-primary { background: #007bff; color: white; }
.admin-btn-secondary { background: #6c757d; color: white; }
"#;

/// Appends the stylesheet to `<head>` once.
pub fn install(doc: &mut Document) -> NodeId {
    if let Some(existing) = doc.get_element_by_id(STYLE_ELEMENT_ID) {
        return existing;
    }
    let style = doc.element("style", &[("id", STYLE_ELEMENT_ID)]);
    doc.set_text(style, OVERLAY_STYLE);
    let head = doc.head();
    doc.append_child(head, style);
    style
}
