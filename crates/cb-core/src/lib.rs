//! Content Blocker Core Library
//!
//! This crate provides the core matching engine for the content blocker.
//!
//! # Architecture
//!
//! Filter lists are compiled (by `cb-compiler`) into an immutable [`Snapshot`]:
//! an arena of rules, a byte-keyed trie over the rules' literal patterns, and
//! the cosmetic style-sheet registry. A snapshot is never mutated after it is
//! built, so it can be shared across threads and swapped atomically when a list
//! is reloaded. The hot path walks the trie once per URL offset and does not
//! touch any I/O.
//!
//! # Modules
//!
//! - `domain`: domain-list resolution for `domain=` restrictions
//! - `index`: arena trie over rule patterns
//! - `matcher`: core request matching engine
//! - `psl`: Public Suffix List helpers for eTLD+1 extraction
//! - `snapshot`: immutable compiled rule set
//! - `stylesheet`: cosmetic selector registry
//! - `types`: shared type definitions
//! - `url`: fast URL helpers without allocations

pub mod domain;
pub mod index;
pub mod matcher;
pub mod psl;
pub mod snapshot;
pub mod stylesheet;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use domain::{matches_domain_list, resolve_domain_exceptions};
pub use index::{NodeId, RuleIndex};
pub use matcher::Matcher;
pub use psl::{get_etld1, is_third_party};
pub use snapshot::Snapshot;
pub use stylesheet::StyleSheetRegistry;
pub use types::{
    CheckResult, MatchResult, RequestContext, ResourceType, Rule, RuleAnchors, RuleId, RuleOptions,
};
