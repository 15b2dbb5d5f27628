//! Extracts the registered domain from a request URL - the key buckets and
//! breakers are keyed by (§9).

/// Best-effort registered domain: the URL's host, lowercased. Falls back to
/// the raw string if the URL doesn't parse, so a malformed URL still gets
/// *some* bucket rather than panicking the crawler.
pub fn registered_domain(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed
            .host_str()
            .map(|h| h.to_lowercase())
            .unwrap_or_else(|| url.to_lowercase()),
        Err(_) => url.to_lowercase(),
    }
}
