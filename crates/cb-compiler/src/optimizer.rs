use std::collections::HashSet;

use cb_core::types::{RuleAnchors, RuleOptions};

use crate::parser::{CompiledRule, CosmeticDirective};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizeStats {
    pub before: usize,
    pub after: usize,
    pub deduped: usize,
    pub cosmetic_deduped: usize,
}

/// Drop rules and directives that are equivalent to an earlier one.
///
/// The first occurrence is kept so the reported filter text stays stable.
pub fn optimize_rules(rules: &mut Vec<CompiledRule>, cosmetics: &mut Vec<CosmeticDirective>) -> OptimizeStats {
    let before = rules.len();

    let mut seen: HashSet<RuleKey> = HashSet::new();
    let mut deduped = 0usize;
    rules.retain(|rule| {
        if seen.insert(RuleKey::from(rule)) {
            true
        } else {
            deduped += 1;
            false
        }
    });

    let mut seen_cosmetic: HashSet<CosmeticKey> = HashSet::new();
    let mut cosmetic_deduped = 0usize;
    cosmetics.retain(|directive| {
        if seen_cosmetic.insert(CosmeticKey::from(directive)) {
            true
        } else {
            cosmetic_deduped += 1;
            false
        }
    });

    OptimizeStats {
        before,
        after: rules.len(),
        deduped,
        cosmetic_deduped,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RuleKey {
    pattern: String,
    anchors: RuleAnchors,
    rule_options: RuleOptions,
    exception_rule_options: RuleOptions,
    blocked_domains: Vec<String>,
    allowed_domains: Vec<String>,
    is_exception: bool,
}

impl From<&CompiledRule> for RuleKey {
    fn from(rule: &CompiledRule) -> Self {
        Self {
            pattern: rule.pattern.clone(),
            anchors: rule.anchors,
            rule_options: rule.rule_options,
            exception_rule_options: rule.exception_rule_options,
            blocked_domains: sorted(&rule.blocked_domains),
            allowed_domains: sorted(&rule.allowed_domains),
            is_exception: rule.is_exception,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CosmeticKey {
    directive: CosmeticDirective,
}

impl From<&CosmeticDirective> for CosmeticKey {
    fn from(directive: &CosmeticDirective) -> Self {
        Self {
            directive: CosmeticDirective {
                kind: directive.kind,
                domains: sorted(&directive.domains),
                excluded_domains: sorted(&directive.excluded_domains),
                selector: directive.selector.clone(),
            },
        }
    }
}

fn sorted(domains: &[String]) -> Vec<String> {
    let mut domains = domains.to_vec();
    domains.sort();
    domains.dedup();
    domains
}
