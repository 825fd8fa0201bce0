// Domain extraction shared by the interceptor and the collector

use crate::errors::{Result, TrafficError};
use url::Url;

/// Domain assigned to requests whose URL has no parseable host
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// Extract the lowercase hostname from a URL
///
/// # Errors
/// Returns `TrafficError::UnparseableUrl` when the URL does not parse or has
/// no host (`data:`, `about:blank`, ...).
pub fn extract_domain(url: &str) -> Result<String> {
    let parsed =
        Url::parse(url).map_err(|e| TrafficError::UnparseableUrl(format!("{}: {}", url, e)))?;

    parsed
        .host_str()
        .map(|host| host.trim_end_matches('.').to_ascii_lowercase())
        .filter(|host| !host.is_empty())
        .ok_or_else(|| TrafficError::UnparseableUrl(format!("{}: missing host", url)))
}

/// Extract the hostname, falling back to [`UNKNOWN_DOMAIN`]
pub fn domain_or_unknown(url: &str) -> String {
    extract_domain(url).unwrap_or_else(|_| UNKNOWN_DOMAIN.to_string())
}

/// Host matches base if host == base OR host ends with ".{base}" (case-insensitive).
///
/// The dot boundary keeps "evilshop.com" from matching "shop.com".
pub fn host_matches_suffix(host: &str, base: &str) -> bool {
    let host = host.trim_end_matches('.');
    let base = base.trim_end_matches('.');

    if base.is_empty() {
        return false;
    }

    if host.eq_ignore_ascii_case(base) {
        return true;
    }

    if host.len() <= base.len() {
        return false;
    }

    let dot_pos = host.len() - base.len() - 1;
    host.as_bytes().get(dot_pos) == Some(&b'.')
        && host.as_bytes()[dot_pos + 1..].eq_ignore_ascii_case(base.as_bytes())
}
