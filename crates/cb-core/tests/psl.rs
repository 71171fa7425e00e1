//! Third-party detection with an installed public suffix list.
//!
//! The list is process-global, so everything that depends on it lives in
//! this one test binary.

use cb_core::psl::{get_etld1, is_psl_initialized, is_third_party, load_psl_from_file};
use cb_core::types::{RequestContext, ResourceType};

const SUFFIX_LIST: &str = "\
// ===BEGIN ICANN DOMAINS===
com
io
org
uk
co.uk
// ===END ICANN DOMAINS===
// ===BEGIN PRIVATE DOMAINS===
github.io
// ===END PRIVATE DOMAINS===
";

#[test]
fn installed_list_separates_private_suffix_sites() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("public_suffix_list.dat");
    std::fs::write(&path, SUFFIX_LIST).unwrap();

    load_psl_from_file(&path).unwrap();
    assert!(is_psl_initialized());

    assert_eq!(get_etld1("victim.github.io"), "victim.github.io");
    assert_eq!(get_etld1("www.example.co.uk"), "example.co.uk");
    assert!(is_third_party("victim.github.io", "tracker.github.io"));
    assert!(!is_third_party("www.victim.github.io", "victim.github.io"));

    let ctx = RequestContext::new(
        "https://victim.github.io/",
        "https://tracker.github.io/t.js",
        ResourceType::Script,
    );
    assert!(ctx.is_third_party);

    // IP literals bypass the list
    assert!(is_third_party("192.168.1.1", "10.0.1.1"));
}
