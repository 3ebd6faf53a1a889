//! Validation of the admin API base URL.
//!
//! Admin requests are credentialed, so they must only ever go back to the
//! page's own origin:
//! - http or https only
//! - same scheme, host and port as the page
//! - no credentials, query or fragment in the base
//!
//! Relative bases are resolved against the page URL.

use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    /// Base is malformed or cannot be resolved
    #[error("Invalid API base: {0}")]
    InvalidUrl(String),
    /// Base uses a scheme other than http(s)
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),
    /// Base points at another origin than the page
    #[error("API base {api} is not same-origin with page {page}")]
    CrossOrigin { api: String, page: String },
    /// Base carries userinfo, a query or a fragment
    #[error("API base must be a plain path: {0}")]
    NotAPlainBase(String),
}

/// Resolves `base` against `page` and checks it is a same-origin,
/// directory-style URL (always ending in `/` so endpoint paths join below it).
pub fn validate_api_base(base: &str, page: &Url) -> Result<Url, EndpointError> {
    let mut resolved = page
        .join(base)
        .map_err(|e| EndpointError::InvalidUrl(e.to_string()))?;

    if !matches!(resolved.scheme(), "http" | "https") {
        return Err(EndpointError::UnsupportedScheme(resolved.scheme().to_string()));
    }

    if resolved.origin() != page.origin() {
        return Err(EndpointError::CrossOrigin {
            api: resolved.origin().ascii_serialization(),
            page: page.origin().ascii_serialization(),
        });
    }

    if !resolved.username().is_empty()
        || resolved.password().is_some()
        || resolved.query().is_some()
        || resolved.fragment().is_some()
    {
        return Err(EndpointError::NotAPlainBase(resolved.to_string()));
    }

    if !resolved.path().ends_with('/') {
        let path = format!("{}/", resolved.path());
        resolved.set_path(&path);
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://lingo.test/entries/482/").unwrap()
    }

    #[test]
    fn relative_base_resolves_against_page() {
        let base = validate_api_base("/admin/entries/", &page()).unwrap();
        assert_eq!(base.as_str(), "https://lingo.test/admin/entries/");
    }

    #[test]
    fn trailing_slash_is_added() {
        let base = validate_api_base("/admin/entries", &page()).unwrap();
        assert_eq!(base.path(), "/admin/entries/");
        assert_eq!(
            base.join("get-entry/7/").unwrap().as_str(),
            "https://lingo.test/admin/entries/get-entry/7/"
        );
    }

    #[test]
    fn absolute_same_origin_is_accepted() {
        assert!(validate_api_base("https://lingo.test/api/", &page()).is_ok());
    }

    #[test]
    fn rejects_other_origins() {
        let result = validate_api_base("https://evil.test/admin/entries/", &page());
        assert!(matches!(result, Err(EndpointError::CrossOrigin { .. })));

        let result = validate_api_base("http://lingo.test/admin/entries/", &page());
        assert!(matches!(result, Err(EndpointError::CrossOrigin { .. })));
    }

    #[test]
    fn rejects_non_http_and_decorated_bases() {
        let ftp = Url::parse("ftp://lingo.test/").unwrap();
        assert!(matches!(
            validate_api_base("/admin/", &ftp),
            Err(EndpointError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            validate_api_base("/admin/?debug=1", &page()),
            Err(EndpointError::NotAPlainBase(_))
        ));
    }
}
