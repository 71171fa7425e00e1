//! Core Matching Engine
//!
//! This is the hot path - every request goes through here.
//! The matcher only reads the snapshot; it never allocates per trie step and
//! never performs I/O. Wildcard expansion is bounded: for one start offset a
//! `*` node is entered at most once per URL position.

use std::collections::HashMap;

use crate::domain::resolve_domain_exceptions;
use crate::index::{NodeId, RuleIndex, SEPARATOR, WILDCARD};
use crate::snapshot::Snapshot;
use crate::types::{
    CheckResult, MatchResult, RequestContext, ResourceType, Rule, RuleAnchors, RuleId, RuleOptions,
};
use crate::url::is_separator;

// =============================================================================
// Matcher
// =============================================================================

/// The core matching engine.
pub struct Matcher<'a> {
    snapshot: &'a Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Per-request scan state.
struct Scan<'s> {
    ctx: &'s RequestContext,
    bytes: &'s [u8],
    blocked: Option<RuleId>,
    allowed: Option<RuleId>,
    /// Lowest URL position each `*` node was expanded from for the current start
    wildcard_floor: HashMap<NodeId, usize>,
}

impl<'a> Matcher<'a> {
    /// Create a new matcher with the given snapshot.
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self { snapshot }
    }

    /// Verdict for a request issued by the page at `base_url`.
    pub fn check_url(&self, base_url: &str, request_url: &str, resource_type: ResourceType) -> CheckResult {
        let ctx = RequestContext::new(base_url, request_url, resource_type);
        self.match_request(&ctx).result
    }

    /// Match a request and return the decision with the deciding rule.
    ///
    /// Every offset of the URL is scanned; an exception rule ends the scan
    /// immediately because it overrides any block.
    pub fn match_request(&self, ctx: &RequestContext) -> MatchResult {
        if self.snapshot.index().is_empty() {
            return MatchResult::default();
        }

        let mut scan = Scan {
            ctx,
            bytes: ctx.url.as_bytes(),
            blocked: None,
            allowed: None,
            wildcard_floor: HashMap::new(),
        };

        for start in 0..scan.bytes.len() {
            scan.wildcard_floor.clear();
            if self.check_url_substring(RuleIndex::ROOT, start, start, &mut scan) == Flow::Stop {
                break;
            }
        }

        match (scan.allowed, scan.blocked) {
            (Some(rule_id), _) => MatchResult {
                result: CheckResult::Allow,
                rule_id: Some(rule_id),
            },
            (None, Some(rule_id)) => MatchResult {
                result: CheckResult::Block,
                rule_id: Some(rule_id),
            },
            (None, None) => MatchResult::default(),
        }
    }

    /// Like [`Matcher::check_url`], plus the raw text of the deciding rule.
    pub fn explain_url(
        &self,
        base_url: &str,
        request_url: &str,
        resource_type: ResourceType,
    ) -> (CheckResult, Option<&'a str>) {
        let ctx = RequestContext::new(base_url, request_url, resource_type);
        let result = self.match_request(&ctx);
        (result.result, self.rule_filter(&result))
    }

    /// Original filter text of the rule behind a result.
    pub fn rule_filter(&self, result: &MatchResult) -> Option<&'a str> {
        result.rule_id.map(|id| self.snapshot.rule(id).filter.as_str())
    }

    /// Walk the children of `node` against the URL starting at `pos`.
    fn check_url_substring(&self, node: NodeId, start: usize, pos: usize, scan: &mut Scan<'_>) -> Flow {
        let index = self.snapshot.index();
        let len = scan.bytes.len();

        for &(character, child) in index.node(node).children() {
            let flow = match character {
                WILDCARD => self.expand_wildcard(child, start, pos, scan),
                SEPARATOR if pos == len => self.enter_node(child, start, pos, scan),
                SEPARATOR if is_separator(scan.bytes[pos]) => self.enter_node(child, start, pos + 1, scan),
                _ if pos < len && scan.bytes[pos] == character => {
                    self.enter_node(child, start, pos + 1, scan)
                }
                _ => Flow::Continue,
            };

            if flow == Flow::Stop {
                return Flow::Stop;
            }
        }

        Flow::Continue
    }

    /// Enter a `*` node for every end in `pos..=len` not already covered.
    fn expand_wildcard(&self, node: NodeId, start: usize, pos: usize, scan: &mut Scan<'_>) -> Flow {
        let floor = scan
            .wildcard_floor
            .get(&node)
            .copied()
            .unwrap_or(scan.bytes.len() + 1);
        if pos >= floor {
            return Flow::Continue;
        }
        scan.wildcard_floor.insert(node, pos);

        for end in pos..floor {
            if self.enter_node(node, start, end, scan) == Flow::Stop {
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    /// Evaluate the rules ending at `node` for the span `start..end`, then descend.
    fn enter_node(&self, node: NodeId, start: usize, end: usize, scan: &mut Scan<'_>) -> Flow {
        for &rule_id in self.snapshot.index().node(node).rules() {
            let rule = self.snapshot.rule(rule_id);

            // Once blocked, only exceptions can change the verdict
            if !rule.is_exception && scan.blocked.is_some() {
                continue;
            }

            if !self.check_rule_match(rule, start, end, scan.ctx) {
                continue;
            }

            if rule.is_exception {
                scan.allowed = Some(rule_id);
                return Flow::Stop;
            }

            scan.blocked = Some(rule_id);
            if !self.snapshot.has_exceptions() {
                return Flow::Stop;
            }
        }

        self.check_url_substring(node, start, end, scan)
    }

    /// Check whether a rule whose pattern matched `ctx.url[start..end]` applies.
    pub fn check_rule_match(&self, rule: &Rule, start: usize, end: usize, ctx: &RequestContext) -> bool {
        self.check_anchors(rule, start, end, ctx)
            && self.check_rule_options(rule, ctx)
            && (!rule.needs_domain_check
                || resolve_domain_exceptions(&ctx.base_host, &rule.blocked_domains, &rule.allowed_domains))
    }

    fn check_anchors(&self, rule: &Rule, start: usize, end: usize, ctx: &RequestContext) -> bool {
        if rule.anchors.contains(RuleAnchors::LEFT) && start != 0 {
            return false;
        }

        if rule.anchors.contains(RuleAnchors::RIGHT) && end != ctx.url.len() {
            return false;
        }

        if rule.anchors.contains(RuleAnchors::HOSTNAME) {
            let (host_start, host_end) = match ctx.host_range {
                Some(range) => range,
                None => return false,
            };
            if start < host_start || start >= host_end {
                return false;
            }
            // Must begin at a label boundary
            if start > host_start && ctx.url.as_bytes()[start - 1] != b'.' {
                return false;
            }
        }

        true
    }

    /// Check if a rule's options match the request context.
    fn check_rule_options(&self, rule: &Rule, ctx: &RequestContext) -> bool {
        let request_type = ctx.resource_type.rule_option();

        // Type mask
        let types = rule.rule_options.resource_types();
        if !types.is_empty() && !types.intersects(request_type) {
            return false;
        }
        if rule.exception_rule_options.resource_types().intersects(request_type) {
            return false;
        }

        // Party
        if rule.rule_options.contains(RuleOptions::THIRD_PARTY) && !ctx.is_third_party {
            return false;
        }
        if rule.exception_rule_options.contains(RuleOptions::THIRD_PARTY) && ctx.is_third_party {
            return false;
        }

        true
    }
}
