//! Return-location hardening for post-sign-in redirects.

use url::Url;

pub const APPLICATION_ROOT: &str = "/";

// Sentinel origin used only to check that a candidate stays on-site once resolved.
const SENTINEL_ORIGIN: &str = "http://credence.invalid/";

/// Pick the redirect target after sign-in: `candidate` if it is a same-origin
/// relative path, otherwise the application root.
#[must_use]
pub fn safe_return_url(candidate: Option<&str>) -> String {
    candidate
        .filter(|candidate| is_local_path(candidate))
        .map_or_else(|| APPLICATION_ROOT.to_string(), ToString::to_string)
}

fn is_local_path(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    if bytes.first() != Some(&b'/') {
        return false;
    }
    // "//host" and "/\host" are protocol-relative in browsers.
    if matches!(bytes.get(1), Some(b'/' | b'\\')) {
        return false;
    }
    // Only visible ASCII survives as a Location header value.
    if candidate.contains('\\') || !bytes.iter().all(u8::is_ascii_graphic) {
        return false;
    }

    let Ok(base) = Url::parse(SENTINEL_ORIGIN) else {
        return false;
    };
    base.join(candidate)
        .is_ok_and(|resolved| resolved.origin() == base.origin())
}
