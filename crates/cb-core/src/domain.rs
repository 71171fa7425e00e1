//! Domain exception resolution for `domain=` restrictions and cosmetic
//! directive scoping.
//!
//! Matching respects label boundaries: `mail.example.com` is inside
//! `example.com`, `example.com.evil.com` is not.

use crate::url::normalize_host;

/// Check whether `host` equals `domain` or is one of its subdomains.
pub fn matches_domain(host: &str, domain: &str) -> bool {
    let host = normalize_host(host);
    let domain = normalize_host(domain);
    if host.is_empty() || domain.is_empty() {
        return false;
    }

    match host.strip_suffix(domain.as_ref()) {
        Some("") => true,
        Some(prefix) => prefix.ends_with('.'),
        None => false,
    }
}

/// Check whether `host` matches any entry of `domains`.
pub fn matches_domain_list<S: AsRef<str>>(host: &str, domains: &[S]) -> bool {
    domains.iter().any(|domain| matches_domain(host, domain.as_ref()))
}

/// Decide whether a rule restricted by domain lists applies on `host`.
///
/// A match in `allowed` always wins; otherwise a non-empty `blocked` list
/// must contain the host.
pub fn resolve_domain_exceptions<S: AsRef<str>>(host: &str, blocked: &[S], allowed: &[S]) -> bool {
    if !allowed.is_empty() && matches_domain_list(host, allowed) {
        return false;
    }
    blocked.is_empty() || matches_domain_list(host, blocked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdomain_matches() {
        assert!(matches_domain_list("mail.example.com", &["example.com"]));
        assert!(matches_domain_list("example.com", &["example.com"]));
        assert!(matches_domain_list("a.b.example.com", &["other.org", "example.com"]));
    }

    #[test]
    fn test_label_boundary() {
        assert!(!matches_domain_list("example.com.evil.com", &["example.com"]));
        assert!(!matches_domain_list("notexample.com", &["example.com"]));
        assert!(!matches_domain_list("com", &["example.com"]));
    }

    #[test]
    fn test_case_and_trailing_dot() {
        assert!(matches_domain_list("Mail.Example.COM.", &["example.com"]));
        assert!(matches_domain_list("mail.example.com", &["EXAMPLE.com."]));
    }

    #[test]
    fn test_empty_inputs() {
        let empty: [&str; 0] = [];
        assert!(!matches_domain_list("example.com", &empty));
        assert!(!matches_domain_list("", &["example.com"]));
    }

    #[test]
    fn test_allowed_domains_short_circuit() {
        let blocked = ["example.com"];
        let allowed = ["safe.example.com"];
        assert!(resolve_domain_exceptions("www.example.com", &blocked, &allowed));
        assert!(!resolve_domain_exceptions("safe.example.com", &blocked, &allowed));
        assert!(!resolve_domain_exceptions("other.org", &blocked, &allowed));

        let none: [&str; 0] = [];
        assert!(resolve_domain_exceptions("other.org", &none, &allowed));
        assert!(!resolve_domain_exceptions("x.safe.example.com", &none, &allowed));
    }
}
