//! Filter List Compiler
//!
//! This crate turns Adblock Plus filter list text into an immutable
//! [`Snapshot`](cb_core::Snapshot) that the matching engine reads.

pub mod builder;
pub mod header;
pub mod optimizer;
pub mod parser;

pub use builder::{build_snapshot, compile_filter_list, CompileStats, CompiledList};
pub use header::{parse_list_header, ListHeader, DEFAULT_EXPIRES};
pub use optimizer::{optimize_rules, OptimizeStats};
pub use parser::{
    parse_filter_list, parse_rule_line, CompiledRule, CosmeticDirective, CosmeticKind, ParseOptions,
    ParseStats, ParsedLine, ParsedList,
};
