//! CSRF token discovery for mutating requests.
//!
//! The primary deployment runs the admin endpoints CSRF-exempt; sites that
//! enforce the check expose the token either as a hidden form field or as
//! the `csrftoken` cookie, and expect it back in the `X-CSRFToken` header.

use crate::dom::Document;

/// Header the backend reads the token from.
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Cookie holding the token.
pub const CSRF_COOKIE: &str = "csrftoken";

/// Hidden input rendered into server-side forms.
pub const CSRF_FIELD: &str = "csrfmiddlewaretoken";

// ============================================================================
// Policy
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CsrfPolicy {
    /// Send no token.
    #[default]
    Disabled,
    /// Read the token from the page when the overlay starts.
    FromPage,
    /// Always send this token.
    Fixed(String),
}

impl CsrfPolicy {
    /// Parses the `OVERLAY_CSRF` setting: `off`, `page`, or a literal token.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "off" | "none" => CsrfPolicy::Disabled,
            "page" => CsrfPolicy::FromPage,
            token => CsrfPolicy::Fixed(token.to_string()),
        }
    }

    /// The token to attach, if any.
    pub fn resolve(&self, doc: &Document) -> Option<String> {
        match self {
            CsrfPolicy::Disabled => None,
            CsrfPolicy::FromPage => token_from_document(doc),
            CsrfPolicy::Fixed(token) => Some(token.clone()),
        }
    }
}

// ============================================================================
// Token Lookup
// ============================================================================

/// Hidden form field first, then the cookie.
pub fn token_from_document(doc: &Document) -> Option<String> {
    let field = doc
        .find_by_attribute("name", CSRF_FIELD)
        .into_iter()
        .find_map(|n| doc.attribute(n, "value"))
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    field.or_else(|| token_from_cookie(doc.cookie()))
}

/// Extracts `csrftoken` from a `document.cookie` style string.
pub fn token_from_cookie(cookie: &str) -> Option<String> {
    cookie
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == CSRF_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_parsing() {
        assert_eq!(
            token_from_cookie("sessionid=abc; csrftoken=tok123; theme=dark").as_deref(),
            Some("tok123")
        );
        assert_eq!(token_from_cookie("xcsrftoken=nope"), None);
        assert_eq!(token_from_cookie("csrftoken="), None);
        assert_eq!(token_from_cookie(""), None);
    }

    #[test]
    fn hidden_field_wins_over_cookie() {
        let mut doc = Document::at("https://lingo.test/").unwrap();
        doc.set_cookie("csrftoken=from-cookie");
        assert_eq!(token_from_document(&doc).as_deref(), Some("from-cookie"));

        let input = doc.element(
            "input",
            &[("type", "hidden"), ("name", CSRF_FIELD), ("value", "from-field")],
        );
        let body = doc.body();
        doc.append_child(body, input);
        assert_eq!(token_from_document(&doc).as_deref(), Some("from-field"));
    }

    #[test]
    fn policy_parsing_and_resolution() {
        let doc = Document::at("https://lingo.test/").unwrap();
        assert_eq!(CsrfPolicy::parse("off"), CsrfPolicy::Disabled);
        assert_eq!(CsrfPolicy::parse("page"), CsrfPolicy::FromPage);
        assert_eq!(CsrfPolicy::parse("abc"), CsrfPolicy::Fixed("abc".into()));
        assert_eq!(CsrfPolicy::FromPage.resolve(&doc), None);
        assert_eq!(CsrfPolicy::Fixed("abc".into()).resolve(&doc).as_deref(), Some("abc"));
    }
}
