//! Fast URL helpers for the hot path
//!
//! These functions avoid allocations and work directly on string slices.

use std::borrow::Cow;

/// Get the position after "://".
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();

    // Find ':'
    let colon_pos = bytes.iter().position(|&b| b == b':')?;

    // Check for "://"
    if bytes.len() > colon_pos + 2
        && bytes[colon_pos + 1] == b'/'
        && bytes[colon_pos + 2] == b'/'
    {
        return Some(colon_pos + 3);
    }

    None
}

// =============================================================================
// Host Extraction
// =============================================================================

/// Fast host extraction without allocations.
/// Returns a slice into the original URL.
#[inline]
pub fn extract_host(url: &str) -> Option<&str> {
    let (host_start, host_end) = get_host_position(url)?;
    if host_start == host_end {
        return None;
    }
    Some(&url[host_start..host_end])
}

/// Get the start and end positions of the hostname in a URL.
///
/// Scheme-relative URLs (`//host/path`) are accepted.
#[inline]
pub fn get_host_position(url: &str) -> Option<(usize, usize)> {
    let scheme_end = if url.starts_with("//") {
        2
    } else {
        get_scheme_end(url)?
    };
    let bytes = url.as_bytes();

    // Skip userinfo
    let mut host_start = scheme_end;
    for i in scheme_end..bytes.len() {
        if bytes[i] == b'@' {
            host_start = i + 1;
            break;
        }
        if bytes[i] == b'/' || bytes[i] == b'?' || bytes[i] == b'#' {
            break;
        }
    }

    // Find host end
    let mut host_end = bytes.len();
    for i in host_start..bytes.len() {
        let b = bytes[i];
        if b == b'/' || b == b'?' || b == b'#' || b == b':' {
            host_end = i;
            break;
        }
    }

    Some((host_start, host_end))
}

/// Lowercase a host and strip a trailing dot.
///
/// Borrows when the host is already normalized.
pub fn normalize_host(host: &str) -> Cow<'_, str> {
    let host = host.trim().trim_end_matches('.');
    if host.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(host.to_ascii_lowercase())
    } else {
        Cow::Borrowed(host)
    }
}

// =============================================================================
// Separator Check
// =============================================================================

/// Check if a byte is a separator for the `^` placeholder.
/// A separator is anything but a letter, a digit, or one of `_ - . %`.
#[inline]
pub fn is_separator(c: u8) -> bool {
    !(c.is_ascii_alphanumeric() || matches!(c, b'_' | b'-' | b'.' | b'%'))
}
