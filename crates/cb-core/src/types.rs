//! Core type definitions for the content blocker
//!
//! These types are shared by the compiler, which produces them, and the
//! matching engine, which reads them from a [`Snapshot`](crate::Snapshot).

use crate::psl;
use crate::url::{extract_host, get_host_position, normalize_host};

// =============================================================================
// Rule Options (bit flags parsed from the `$` option list)
// =============================================================================

bitflags::bitflags! {
    /// Resource-type and context flags a rule targets.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RuleOptions: u16 {
        const THIRD_PARTY = 1 << 0;
        const STYLESHEET = 1 << 1;
        const SCRIPT = 1 << 2;
        const IMAGE = 1 << 3;
        const OBJECT = 1 << 4;
        const OBJECT_SUBREQUEST = 1 << 5;
        const SUBDOCUMENT = 1 << 6;
        const XMLHTTPREQUEST = 1 << 7;

        /// Every resource-type flag (everything except the party flag)
        const RESOURCE_TYPES = Self::STYLESHEET.bits()
            | Self::SCRIPT.bits()
            | Self::IMAGE.bits()
            | Self::OBJECT.bits()
            | Self::OBJECT_SUBREQUEST.bits()
            | Self::SUBDOCUMENT.bits()
            | Self::XMLHTTPREQUEST.bits();
    }
}

impl RuleOptions {
    /// Parse a single option keyword (without `~`).
    pub fn from_keyword(name: &str) -> Option<Self> {
        match name {
            "third-party" | "thirdparty" | "3p" => Some(Self::THIRD_PARTY),
            "stylesheet" | "css" => Some(Self::STYLESHEET),
            "script" => Some(Self::SCRIPT),
            "image" => Some(Self::IMAGE),
            "object" => Some(Self::OBJECT),
            "object-subrequest" => Some(Self::OBJECT_SUBREQUEST),
            "subdocument" | "frame" => Some(Self::SUBDOCUMENT),
            "xmlhttprequest" | "xhr" => Some(Self::XMLHTTPREQUEST),
            _ => None,
        }
    }

    /// Resource-type flags only.
    #[inline]
    pub fn resource_types(self) -> Self {
        self & Self::RESOURCE_TYPES
    }
}

// =============================================================================
// Pattern Anchors
// =============================================================================

bitflags::bitflags! {
    /// Anchors stripped from a pattern at parse time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RuleAnchors: u8 {
        /// `||` - match starts at a hostname label boundary
        const HOSTNAME = 1 << 0;
        /// `|` at the start - match starts at the beginning of the URL
        const LEFT = 1 << 1;
        /// `|` at the end - match ends at the end of the URL
        const RIGHT = 1 << 2;
    }
}

// =============================================================================
// Resource Types
// =============================================================================

/// Semantic category of a request, supplied by the network layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceType {
    #[default]
    Other,
    MainFrame,
    SubFrame,
    StyleSheet,
    Script,
    Image,
    Object,
    ObjectSubRequest,
    XmlHttpRequest,
}

impl ResourceType {
    /// Parse from a browser request type string.
    pub fn from_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "main_frame" | "document" => Self::MainFrame,
            "sub_frame" | "subdocument" => Self::SubFrame,
            "stylesheet" => Self::StyleSheet,
            "script" => Self::Script,
            "image" => Self::Image,
            "object" => Self::Object,
            "object_subrequest" | "object-subrequest" => Self::ObjectSubRequest,
            "xmlhttprequest" | "xhr" => Self::XmlHttpRequest,
            _ => Self::Other,
        }
    }

    /// The rule option flag that targets this resource type.
    ///
    /// `Other` and `MainFrame` have no flag: they only match rules without
    /// resource-type options.
    pub fn rule_option(self) -> RuleOptions {
        match self {
            Self::Other | Self::MainFrame => RuleOptions::empty(),
            Self::SubFrame => RuleOptions::SUBDOCUMENT,
            Self::StyleSheet => RuleOptions::STYLESHEET,
            Self::Script => RuleOptions::SCRIPT,
            Self::Image => RuleOptions::IMAGE,
            Self::Object => RuleOptions::OBJECT,
            Self::ObjectSubRequest => RuleOptions::OBJECT_SUBREQUEST,
            Self::XmlHttpRequest => RuleOptions::XMLHTTPREQUEST,
        }
    }
}

// =============================================================================
// Rules
// =============================================================================

/// Index of a rule inside a snapshot's rule arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub u32);

impl RuleId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A compiled network rule.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rule {
    /// Domains the rule is restricted to (empty = everywhere)
    pub blocked_domains: Vec<String>,
    /// Domains excluded from the rule's effect
    pub allowed_domains: Vec<String>,
    pub rule_options: RuleOptions,
    /// Negated (`~`) options
    pub exception_rule_options: RuleOptions,
    pub anchors: RuleAnchors,
    /// `@@` rule
    pub is_exception: bool,
    /// True when either domain list is non-empty
    pub needs_domain_check: bool,
    /// Original filter text, kept for diagnostics
    pub filter: String,
}

// =============================================================================
// Request Context
// =============================================================================

/// Context for a request being matched.
///
/// Hosts and the third-party flag are computed once per request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Lowercased request URL
    pub url: String,
    /// Byte range of the host inside `url`
    pub host_range: Option<(usize, usize)>,
    /// Request hostname
    pub request_host: String,
    /// Page (base URL) hostname, empty for top-level navigations
    pub base_host: String,
    /// Is this a third-party request?
    pub is_third_party: bool,
    pub resource_type: ResourceType,
}

impl RequestContext {
    pub fn new(base_url: &str, request_url: &str, resource_type: ResourceType) -> Self {
        let url = request_url.trim().to_ascii_lowercase();
        let host_range = get_host_position(&url).filter(|(start, end)| start < end);
        let request_host = host_range
            .map(|(start, end)| normalize_host(&url[start..end]).into_owned())
            .unwrap_or_default();
        let base_host = extract_host(base_url)
            .map(|host| normalize_host(host).into_owned())
            .unwrap_or_default();

        // Without a page context the request is treated as first-party
        let is_third_party = !base_host.is_empty()
            && !request_host.is_empty()
            && psl::is_third_party(&base_host, &request_host);

        Self {
            url,
            host_range,
            request_host,
            base_host,
            is_third_party,
            resource_type,
        }
    }
}

// =============================================================================
// Match Result
// =============================================================================

/// Final verdict for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckResult {
    /// A blocking rule matched and no exception did
    Block,
    /// An exception rule matched
    Allow,
    /// No rule matched; the request proceeds
    NoMatch,
}

impl CheckResult {
    #[inline]
    pub fn is_blocked(self) -> bool {
        self == Self::Block
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Allow => "allow",
            Self::NoMatch => "no-match",
        }
    }
}

/// Result of matching a request, with the deciding rule for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub result: CheckResult,
    pub rule_id: Option<RuleId>,
}

impl Default for MatchResult {
    fn default() -> Self {
        Self {
            result: CheckResult::NoMatch,
            rule_id: None,
        }
    }
}
