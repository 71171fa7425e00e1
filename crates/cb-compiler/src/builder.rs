use std::collections::HashSet;

use cb_core::index::RuleIndex;
use cb_core::snapshot::Snapshot;
use cb_core::stylesheet::StyleSheetRegistry;
use cb_core::types::{Rule, RuleId};

use crate::header::{parse_list_header, ListHeader};
use crate::optimizer::{optimize_rules, OptimizeStats};
use crate::parser::{parse_filter_list, CosmeticDirective, CosmeticKind, ParseOptions, ParseStats, ParsedList};

/// Statistics from one compilation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileStats {
    pub parse: ParseStats,
    pub optimize: OptimizeStats,
    pub rules: usize,
    pub exceptions: usize,
    pub selectors: usize,
    pub trie_nodes: usize,
}

/// Output of [`compile_filter_list`].
#[derive(Debug, Clone)]
pub struct CompiledList {
    pub snapshot: Snapshot,
    pub header: ListHeader,
    pub stats: CompileStats,
}

/// Parse, deduplicate and index a whole filter list.
pub fn compile_filter_list(text: &str, options: &ParseOptions) -> CompiledList {
    let header = parse_list_header(text);
    let mut list = parse_filter_list(text, options);
    let optimize = optimize_rules(&mut list.rules, &mut list.cosmetics);
    let snapshot = build_snapshot(&list);

    let stats = CompileStats {
        parse: list.stats,
        optimize,
        rules: snapshot.rule_count(),
        exceptions: snapshot.rules().iter().filter(|rule| rule.is_exception).count(),
        selectors: snapshot.style_sheets().len(),
        trie_nodes: snapshot.index().node_count(),
    };

    log::debug!(
        "Compiled {} lines: {} rules ({} exceptions), {} selectors, {} dropped, {} duplicates",
        stats.parse.lines,
        stats.rules,
        stats.exceptions,
        stats.selectors,
        stats.parse.dropped,
        stats.optimize.deduped + stats.optimize.cosmetic_deduped,
    );

    CompiledList {
        snapshot,
        header,
        stats,
    }
}

/// Build an immutable snapshot from parsed rules and directives.
pub fn build_snapshot(list: &ParsedList) -> Snapshot {
    let mut index = RuleIndex::new();
    let mut rules: Vec<Rule> = Vec::with_capacity(list.rules.len());

    for compiled in &list.rules {
        let (pattern, rule) = compiled.clone().into_rule();
        let id = RuleId(rules.len() as u32);
        index.add_rule(id, &pattern);
        rules.push(rule);
    }

    let mut style_sheets = StyleSheetRegistry::new();
    let mut globals = HashSet::new();
    for directive in &list.cosmetics {
        register_directive(&mut style_sheets, &mut globals, directive);
    }

    Snapshot::from_parts(rules, index, style_sheets)
}

fn register_directive<'a>(
    style_sheets: &mut StyleSheetRegistry,
    globals: &mut HashSet<&'a str>,
    directive: &'a CosmeticDirective,
) {
    let selector = directive.selector.as_str();
    let excluded = &directive.excluded_domains;

    match directive.kind {
        CosmeticKind::BlackList => {
            if directive.domains.is_empty() {
                if !excluded.is_empty() {
                    style_sheets.add_black_list_except("", selector, excluded);
                } else if globals.insert(selector) {
                    style_sheets.add_global(selector);
                }
            }
            for domain in &directive.domains {
                style_sheets.add_black_list_except(domain, selector, excluded);
            }
        }
        CosmeticKind::WhiteList => {
            if directive.domains.is_empty() {
                style_sheets.add_white_list_except("", selector, excluded);
            }
            for domain in &directive.domains {
                style_sheets.add_white_list_except(domain, selector, excluded);
            }
        }
    }
}
