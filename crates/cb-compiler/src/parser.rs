use cb_core::types::{Rule, RuleAnchors, RuleOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Keep rules with an interior `*`; when false they are dropped.
    pub enable_wildcards: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            enable_wildcards: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompiledRule {
    /// Lowercased literal pattern with anchors stripped; may contain `*` and `^`
    pub pattern: String,
    pub anchors: RuleAnchors,
    pub rule_options: RuleOptions,
    pub exception_rule_options: RuleOptions,
    pub blocked_domains: Vec<String>,
    pub allowed_domains: Vec<String>,
    pub is_exception: bool,
    pub filter: String,
}

impl CompiledRule {
    pub fn into_rule(self) -> (String, Rule) {
        let needs_domain_check = !self.blocked_domains.is_empty() || !self.allowed_domains.is_empty();
        let rule = Rule {
            blocked_domains: self.blocked_domains,
            allowed_domains: self.allowed_domains,
            rule_options: self.rule_options,
            exception_rule_options: self.exception_rule_options,
            anchors: self.anchors,
            is_exception: self.is_exception,
            needs_domain_check,
            filter: self.filter,
        };
        (self.pattern, rule)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CosmeticKind {
    /// `##` - hide
    BlackList,
    /// `#@#` - never hide
    WhiteList,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CosmeticDirective {
    pub kind: CosmeticKind,
    /// Domains the directive applies to; empty = every domain
    pub domains: Vec<String>,
    /// `~domain` entries; the directive does not apply there
    pub excluded_domains: Vec<String>,
    pub selector: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Network(CompiledRule),
    Cosmetic(CosmeticDirective),
    Ignored,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub lines: usize,
    pub comments: usize,
    pub network: usize,
    pub cosmetic: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedList {
    pub rules: Vec<CompiledRule>,
    pub cosmetics: Vec<CosmeticDirective>,
    pub stats: ParseStats,
}

pub fn parse_filter_list(text: &str, options: &ParseOptions) -> ParsedList {
    let mut list = ParsedList::default();

    for raw_line in text.lines() {
        list.stats.lines += 1;
        let line = raw_line.trim();
        if line.is_empty() || is_comment_line(line) {
            list.stats.comments += 1;
            continue;
        }

        match parse_rule_line(line, options) {
            ParsedLine::Network(rule) => {
                list.stats.network += 1;
                list.rules.push(rule);
            }
            ParsedLine::Cosmetic(directive) => {
                list.stats.cosmetic += 1;
                list.cosmetics.push(directive);
            }
            ParsedLine::Ignored => {
                log::debug!("Dropping filter line {:?}", line);
                list.stats.dropped += 1;
            }
        }
    }

    list
}

pub fn parse_rule_line(line: &str, options: &ParseOptions) -> ParsedLine {
    let line = line.trim();
    if line.is_empty() || is_comment_line(line) {
        return ParsedLine::Ignored;
    }

    if is_extended_cosmetic(line) {
        return ParsedLine::Ignored;
    }

    if let Some((domains, selector)) = line.split_once("#@#") {
        return parse_cosmetic(CosmeticKind::WhiteList, domains, selector);
    }

    if let Some((domains, selector)) = line.split_once("##") {
        return parse_cosmetic(CosmeticKind::BlackList, domains, selector);
    }

    match parse_network_rule(line, options) {
        Some(rule) => ParsedLine::Network(rule),
        None => ParsedLine::Ignored,
    }
}

fn is_comment_line(line: &str) -> bool {
    line.starts_with('!') || line.starts_with('[')
}

fn is_extended_cosmetic(line: &str) -> bool {
    ["#?#", "#$#", "#%#", "#@?#", "#@$#", "#@%#"]
        .iter()
        .any(|marker| line.contains(marker))
}

fn parse_cosmetic(kind: CosmeticKind, domains_text: &str, selector: &str) -> ParsedLine {
    let selector = selector.trim();
    if selector.is_empty() {
        return ParsedLine::Ignored;
    }

    let mut domains = Vec::new();
    let mut excluded_domains = Vec::new();

    for raw in domains_text.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let (is_exclude, domain_raw) = match raw.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let domain = match normalize_domain(domain_raw) {
            Some(domain) => domain,
            None => return ParsedLine::Ignored,
        };

        if is_exclude {
            excluded_domains.push(domain);
        } else {
            domains.push(domain);
        }
    }

    ParsedLine::Cosmetic(CosmeticDirective {
        kind,
        domains,
        excluded_domains,
        selector: selector.to_string(),
    })
}

#[derive(Clone, Default)]
struct ParsedOptions {
    rule_options: RuleOptions,
    exception_rule_options: RuleOptions,
    blocked_domains: Vec<String>,
    allowed_domains: Vec<String>,
}

fn parse_network_rule(line: &str, options: &ParseOptions) -> Option<CompiledRule> {
    let (is_exception, body) = match line.strip_prefix("@@") {
        Some(rest) => (true, rest.trim_start()),
        None => (false, line),
    };

    let (pattern_part, options_text) = split_rule_options(body);
    let parsed = match options_text {
        Some(options_text) => parse_options(options_text)?,
        None => ParsedOptions::default(),
    };

    let (pattern, anchors) = parse_pattern(pattern_part, options)?;

    Some(CompiledRule {
        pattern,
        anchors,
        rule_options: parsed.rule_options,
        exception_rule_options: parsed.exception_rule_options,
        blocked_domains: parsed.blocked_domains,
        allowed_domains: parsed.allowed_domains,
        is_exception,
        filter: line.to_string(),
    })
}

fn split_rule_options(line: &str) -> (&str, Option<&str>) {
    // Regex rules may legitimately contain `$`
    if is_regex_pattern(line) {
        return (line, None);
    }
    match line.rfind('$') {
        Some(pos) => (&line[..pos], Some(&line[pos + 1..])),
        None => (line, None),
    }
}

fn parse_options(text: &str) -> Option<ParsedOptions> {
    let mut parsed = ParsedOptions::default();

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    for raw in trimmed.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let raw_lower = raw.to_ascii_lowercase();
        let raw_lower = raw_lower.as_str();

        if let Some(domain_value) = raw_lower.strip_prefix("domain=") {
            parse_domain_option(domain_value, &mut parsed)?;
            continue;
        }

        let (negated, name) = match raw_lower.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, raw_lower),
        };

        // Presentation-only option
        if name == "collapse" {
            continue;
        }

        // `first-party` is the negation of `third-party`
        let (negated, name) = match name {
            "first-party" | "firstparty" | "1p" => (!negated, "third-party"),
            _ => (negated, name),
        };

        let option = RuleOptions::from_keyword(name)?;
        if negated {
            parsed.exception_rule_options |= option;
        } else {
            parsed.rule_options |= option;
        }
    }

    Some(parsed)
}

fn parse_domain_option(value: &str, parsed: &mut ParsedOptions) -> Option<()> {
    let mut found = false;

    for raw in value.split('|') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let (is_exclude, domain_raw) = match raw.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let domain = normalize_domain(domain_raw)?;
        if is_exclude {
            parsed.allowed_domains.push(domain);
        } else {
            parsed.blocked_domains.push(domain);
        }
        found = true;
    }

    found.then_some(())
}

fn normalize_domain(host: &str) -> Option<String> {
    let trimmed = host.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return None;
    }

    if trimmed
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '/' | '*' | '|' | '^' | '$' | ','))
    {
        return None;
    }

    Some(trimmed.to_ascii_lowercase())
}

/// `/.../` with regex syntax inside. A plain path such as `/ads/` is a literal.
fn is_regex_pattern(pattern: &str) -> bool {
    pattern.len() > 2
        && pattern.starts_with('/')
        && pattern.ends_with('/')
        && pattern[1..pattern.len() - 1]
            .contains(['\\', '(', ')', '[', ']', '{', '}', '+', '?', '$', '|'])
}

fn parse_pattern(pattern: &str, options: &ParseOptions) -> Option<(String, RuleAnchors)> {
    let mut rest = pattern.trim();
    if rest.is_empty() {
        return None;
    }

    // Regex rules are not supported
    if is_regex_pattern(rest) {
        return None;
    }

    let mut anchors = RuleAnchors::empty();
    if let Some(stripped) = rest.strip_prefix("||") {
        anchors |= RuleAnchors::HOSTNAME;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('|') {
        anchors |= RuleAnchors::LEFT;
        rest = stripped;
    }

    if let Some(stripped) = rest.strip_suffix('|') {
        anchors |= RuleAnchors::RIGHT;
        rest = stripped;
    }

    // A leading or trailing `*` only widens the match
    if rest.starts_with('*') {
        anchors.remove(RuleAnchors::HOSTNAME | RuleAnchors::LEFT);
        rest = rest.trim_start_matches('*');
    }
    if rest.ends_with('*') {
        anchors.remove(RuleAnchors::RIGHT);
        rest = rest.trim_end_matches('*');
    }

    if rest.is_empty() {
        return None;
    }

    if rest.contains('*') && !options.enable_wildcards {
        return None;
    }

    // URLs are lowercased the same way before matching
    let mut pattern = rest.to_ascii_lowercase();
    while pattern.contains("**") {
        pattern = pattern.replace("**", "*");
    }

    Some((pattern, anchors))
}
