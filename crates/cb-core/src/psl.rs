//! Public Suffix List (PSL) utilities for eTLD+1 extraction
//!
//! A full list can be installed at runtime with [`load_psl_from_file`] or
//! [`load_psl_from_str`]; until then a small heuristic covering common
//! two-part suffixes is used. IP literals are always their own site.
//!
//! # Examples
//!
//! ```
//! use cb_core::psl::get_etld1;
//!
//! assert_eq!(get_etld1("sub.example.com"), "example.com");
//! assert_eq!(get_etld1("sub.example.co.uk"), "example.co.uk");
//! ```

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use publicsuffix::{List, Psl};

/// Error type for PSL loading.
#[derive(Debug, thiserror::Error)]
pub enum PslError {
    #[error("Failed to read public suffix list {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid public suffix list: {0}")]
    Invalid(String),
}

// =============================================================================
// Global PSL State
// =============================================================================

static PSL_LIST: RwLock<Option<List>> = RwLock::new(None);

/// Install a parsed list.
pub fn init_psl(list: List) {
    if let Ok(mut guard) = PSL_LIST.write() {
        *guard = Some(list);
    }
}

/// Parse and install a list in the `public_suffix_list.dat` text format.
pub fn load_psl_from_str(text: &str) -> Result<(), PslError> {
    let list: List = text
        .parse()
        .map_err(|e: publicsuffix::Error| PslError::Invalid(e.to_string()))?;
    init_psl(list);
    log::info!("Loaded public suffix list ({} bytes)", text.len());
    Ok(())
}

/// Read and install a `public_suffix_list.dat` file.
pub fn load_psl_from_file(path: impl AsRef<Path>) -> Result<(), PslError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| PslError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_psl_from_str(&text)
}

/// Check if PSL is initialized.
pub fn is_psl_initialized() -> bool {
    PSL_LIST.read().map(|guard| guard.is_some()).unwrap_or(false)
}

// =============================================================================
// eTLD+1 Extraction
// =============================================================================

/// Common two-part TLDs for fallback.
const COMMON_TWO_PART_TLDS: &[&str] = &[
    "co.uk", "co.jp", "co.nz", "co.za", "co.in", "co.kr",
    "com.au", "com.br", "com.cn", "com.mx", "com.tw", "com.hk",
    "net.au", "net.nz",
    "org.uk", "org.au",
    "gov.uk", "gov.au",
    "ac.uk", "ac.jp",
    "ne.jp", "or.jp",
];

/// Get the eTLD+1 (registrable domain) for a hostname.
///
/// If PSL is not loaded, falls back to simple heuristic.
pub fn get_etld1(host: &str) -> String {
    let host = host.to_ascii_lowercase();
    let host = host.trim_end_matches('.');

    if is_ip_literal(host) {
        return host.to_string();
    }

    if let Ok(guard) = PSL_LIST.read() {
        if let Some(list) = guard.as_ref() {
            if let Some(domain) = list.domain(host.as_bytes()) {
                if let Ok(domain) = std::str::from_utf8(domain.as_bytes()) {
                    return domain.to_string();
                }
            }
        }
    }

    let labels: Vec<&str> = host.split('.').collect();
    fallback_etld1(&labels)
}

fn is_ip_literal(host: &str) -> bool {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .is_ok()
}

/// Fallback eTLD+1 heuristic.
fn fallback_etld1(labels: &[&str]) -> String {
    let n = labels.len();
    if n <= 2 {
        return labels.join(".");
    }

    // Check for common two-part TLDs
    let last_two = format!("{}.{}", labels[n - 2], labels[n - 1]);
    if COMMON_TWO_PART_TLDS.contains(&last_two.as_str()) {
        return labels[n - 3..].join(".");
    }

    // Default: last 2 labels
    labels[n - 2..].join(".")
}

/// Check if two hosts share the same eTLD+1.
pub fn is_same_site(host1: &str, host2: &str) -> bool {
    get_etld1(host1) == get_etld1(host2)
}

/// Check if a request is third-party.
pub fn is_third_party(site_host: &str, req_host: &str) -> bool {
    !is_same_site(site_host, req_host)
}

/// Get the parent domain (strip leftmost label).
pub fn get_parent_domain(host: &str) -> Option<&str> {
    match host.find('.') {
        Some(idx) if idx < host.len() - 1 => Some(&host[idx + 1..]),
        _ => None,
    }
}

/// Iterator over a host and all of its parent domains.
pub struct HostSuffixIter<'a> {
    current: Option<&'a str>,
}

impl<'a> Iterator for HostSuffixIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.current?;
        self.current = get_parent_domain(result);
        Some(result)
    }
}

/// Walk host suffixes from most specific to least specific
/// (`a.b.com`, `b.com`, `com`).
pub fn walk_host_suffixes(host: &str) -> HostSuffixIter<'_> {
    HostSuffixIter {
        current: (!host.is_empty()).then_some(host),
    }
}
