//! Immutable compiled rule set.
//!
//! A snapshot owns the rule arena, the trie that indexes it and the cosmetic
//! registry. It is built once by the compiler and only read afterwards, so a
//! reload publishes a whole new snapshot instead of mutating this one.

use crate::index::RuleIndex;
use crate::stylesheet::StyleSheetRegistry;
use crate::types::{Rule, RuleId};

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    rules: Vec<Rule>,
    index: RuleIndex,
    style_sheets: StyleSheetRegistry,
    has_exceptions: bool,
}

impl Snapshot {
    /// A snapshot that matches nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Assemble a snapshot from its parts.
    ///
    /// Every [`RuleId`] referenced by `index` must point into `rules`.
    pub fn from_parts(rules: Vec<Rule>, index: RuleIndex, style_sheets: StyleSheetRegistry) -> Self {
        debug_assert_eq!(rules.len(), index.rule_count());
        let has_exceptions = rules.iter().any(|rule| rule.is_exception);
        Self {
            rules,
            index,
            style_sheets,
            has_exceptions,
        }
    }

    #[inline]
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.index()]
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[inline]
    pub fn index(&self) -> &RuleIndex {
        &self.index
    }

    pub fn style_sheets(&self) -> &StyleSheetRegistry {
        &self.style_sheets
    }

    /// Whether any `@@` rule is present.
    #[inline]
    pub fn has_exceptions(&self) -> bool {
        self.has_exceptions
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// True when the snapshot holds neither network rules nor selectors.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.style_sheets.is_empty()
    }
}
