use crate::UrlError;
use url::Url;

/// Normalizes a URL into the frontier's deduplication key
///
/// Two URLs that fetch the identical resource normalize to the same value.
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything but http and https
/// 3. Scheme and host are lowercased, default ports and dot segments are
///    dropped (the `url` parser already does this)
/// 4. Collapse repeated slashes and remove the trailing slash (except root)
/// 5. Remove the fragment
/// 6. Remove an empty query string (trailing `?`)
///
/// # Examples
///
/// ```
/// use sumi_search::url::normalize_url;
///
/// let url = normalize_url("HTTP://EXAMPLE.COM:80/page/#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingDomain),
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

/// Collapses empty segments and strips the trailing slash
fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}
