//! Cosmetic selector registry.
//!
//! Holds the selectors of element-hiding directives: a global list (`##sel`),
//! a per-domain blacklist (`example.com##sel`) and a per-domain whitelist
//! (`example.com#@#sel`). The two list getters expose raw registrations;
//! whitelist suppression is applied only by [`StyleSheetRegistry::hidden_selectors`].
//!
//! A list entry may carry excluded domains (`~shop.example.com`); it is then
//! skipped on those domains and their subdomains without affecting any other
//! entry for the same selector.

use std::collections::{HashMap, HashSet};

use crate::domain::matches_domain_list;
use crate::psl::walk_host_suffixes;
use crate::url::normalize_host;

#[derive(Debug, Clone, Default)]
pub struct StyleSheetRegistry {
    global: Vec<String>,
    black_list: HashMap<String, Vec<Entry>>,
    white_list: HashMap<String, Vec<Entry>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    selector: String,
    excluded: Vec<String>,
}

impl StyleSheetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_global(&mut self, selector: &str) {
        self.global.push(selector.to_string());
    }

    /// Register a blacklist selector. An empty domain registers a domain-less entry.
    pub fn add_black_list(&mut self, domain: &str, selector: &str) {
        insert::<&str>(&mut self.black_list, domain, selector, &[]);
    }

    /// Register a blacklist selector that does not apply on `excluded` domains.
    pub fn add_black_list_except<S: AsRef<str>>(&mut self, domain: &str, selector: &str, excluded: &[S]) {
        insert(&mut self.black_list, domain, selector, excluded);
    }

    /// Register a whitelist selector. An empty domain registers a domain-less entry.
    pub fn add_white_list(&mut self, domain: &str, selector: &str) {
        insert::<&str>(&mut self.white_list, domain, selector, &[]);
    }

    /// Register a whitelist selector that does not apply on `excluded` domains.
    pub fn add_white_list_except<S: AsRef<str>>(&mut self, domain: &str, selector: &str, excluded: &[S]) {
        insert(&mut self.white_list, domain, selector, excluded);
    }

    /// Global selectors in list order.
    pub fn style_sheet(&self) -> &[String] {
        &self.global
    }

    /// Selectors to hide on `domain` (or any parent domain), plus domain-less entries.
    pub fn style_sheet_black_list(&self, domain: &str) -> Vec<&str> {
        lookup(&self.black_list, domain)
    }

    /// Selectors never hidden on `domain` (or any parent domain), plus domain-less entries.
    pub fn style_sheet_white_list(&self, domain: &str) -> Vec<&str> {
        lookup(&self.white_list, domain)
    }

    /// Global and blacklisted selectors for `domain` minus its whitelist.
    pub fn hidden_selectors(&self, domain: &str) -> Vec<&str> {
        let white_list: HashSet<&str> = self.style_sheet_white_list(domain).into_iter().collect();
        let mut seen = HashSet::new();

        self.global
            .iter()
            .map(String::as_str)
            .chain(self.style_sheet_black_list(domain))
            .filter(|selector| !white_list.contains(selector) && seen.insert(*selector))
            .collect()
    }

    /// Total number of registered selectors.
    pub fn len(&self) -> usize {
        self.global.len()
            + self.black_list.values().map(Vec::len).sum::<usize>()
            + self.white_list.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn insert<S: AsRef<str>>(list: &mut HashMap<String, Vec<Entry>>, domain: &str, selector: &str, excluded: &[S]) {
    list.entry(normalize_host(domain).into_owned()).or_default().push(Entry {
        selector: selector.to_string(),
        excluded: excluded
            .iter()
            .map(|domain| normalize_host(domain.as_ref()).into_owned())
            .collect(),
    });
}

fn lookup<'a>(list: &'a HashMap<String, Vec<Entry>>, domain: &str) -> Vec<&'a str> {
    let domain = normalize_host(domain);
    let mut seen = HashSet::new();

    walk_host_suffixes(&domain)
        .chain(std::iter::once(""))
        .filter_map(|key| list.get(key))
        .flatten()
        .filter(|entry| !matches_domain_list(&domain, &entry.excluded))
        .map(|entry| entry.selector.as_str())
        .filter(|selector| seen.insert(*selector))
        .collect()
}
