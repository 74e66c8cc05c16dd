//! Navigation target resolution.

use url::Url;

/// Resolve a navigation target against the last successfully loaded page.
///
/// Pure function, no I/O. Absolute targets are accepted only for the `http`
/// and `https` schemes, which keeps `javascript:`, `file:`, and custom
/// protocol handlers out of the fetch pipeline. Relative targets require a
/// prior source URL and must also resolve to a web scheme.
#[must_use]
pub fn resolve_target(candidate: &str, last_source: Option<&Url>) -> Option<Url> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return None;
    }

    match Url::parse(trimmed) {
        Ok(url) => is_web_scheme(&url).then_some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = last_source?;
            let resolved = base.join(trimmed).ok()?;
            is_web_scheme(&resolved).then_some(resolved)
        }
        Err(_) => None,
    }
}

fn is_web_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://a.example/base").unwrap()
    }

    #[test]
    fn test_accepts_absolute_https_without_base() {
        let resolved = resolve_target("https://a.example/x", None).unwrap();
        assert_eq!(resolved.as_str(), "https://a.example/x");
    }

    #[test]
    fn test_accepts_absolute_http() {
        assert!(resolve_target("http://a.example/", None).is_some());
    }

    #[test]
    fn test_rejects_javascript_scheme() {
        assert!(resolve_target("javascript:alert(1)", Some(&base())).is_none());
    }

    #[test]
    fn test_rejects_file_scheme() {
        assert!(resolve_target("file:///etc/passwd", Some(&base())).is_none());
    }

    #[test]
    fn test_rejects_empty_candidate() {
        assert!(resolve_target("", Some(&base())).is_none());
        assert!(resolve_target("   ", Some(&base())).is_none());
    }

    #[test]
    fn test_rejects_relative_without_base() {
        assert!(resolve_target("/y", None).is_none());
        assert!(resolve_target("page.html", None).is_none());
    }

    #[test]
    fn test_resolves_relative_against_base() {
        let resolved = resolve_target("/y", Some(&base())).unwrap();
        assert_eq!(resolved.as_str(), "https://a.example/y");
    }

    #[test]
    fn test_resolves_sibling_path_against_base() {
        let base = Url::parse("https://a.example/docs/intro").unwrap();
        let resolved = resolve_target("guide", Some(&base)).unwrap();
        assert_eq!(resolved.as_str(), "https://a.example/docs/guide");
    }

    #[test]
    fn test_trims_candidate_before_resolving() {
        let resolved = resolve_target("  /y  ", Some(&base())).unwrap();
        assert_eq!(resolved.as_str(), "https://a.example/y");
    }
}
