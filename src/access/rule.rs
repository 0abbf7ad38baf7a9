//! Access rule parsing and pattern compilation
//!
//! Rules are written as `[!]<service>:<route>`, e.g. `user-service:get-*`,
//! `!payment-service:refund`, `*:*`. A leading `!` marks a deny rule. Each
//! side of the `:` is matched independently: `*` alone matches anything,
//! an embedded `*` is an anchored glob, anything else is exact equality.
//!
//! Patterns are compiled once at parse time; request-path matching only runs
//! precompiled matchers.

use regex::Regex;
use std::fmt;
use tracing::debug;

/// One field of a rule: the service or the route side of `service:route`.
#[derive(Debug, Clone)]
pub enum FieldPattern {
    /// `*` alone, matches any value
    Any,
    /// No wildcard, exact case-sensitive equality
    Exact(String),
    /// Embedded `*`, anchored glob where `*` matches zero or more characters
    Glob { source: String, regex: Regex },
}

impl FieldPattern {
    /// Compile a field pattern from its text form.
    pub fn compile(pattern: &str) -> Option<FieldPattern> {
        if pattern == "*" {
            return Some(FieldPattern::Any);
        }
        if !pattern.contains('*') {
            return Some(FieldPattern::Exact(pattern.to_string()));
        }

        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push('^');
        for (i, literal) in pattern.split('*').enumerate() {
            if i > 0 {
                expr.push_str(".*");
            }
            expr.push_str(&regex::escape(literal));
        }
        expr.push('$');

        match Regex::new(&expr) {
            Ok(regex) => Some(FieldPattern::Glob {
                source: pattern.to_string(),
                regex,
            }),
            Err(e) => {
                debug!(pattern, error = %e, "Unusable field pattern");
                None
            }
        }
    }

    /// Check whether a concrete field value matches this pattern.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            FieldPattern::Any => true,
            FieldPattern::Exact(expected) => expected == value,
            FieldPattern::Glob { regex, .. } => regex.is_match(value),
        }
    }

    /// The pattern as originally written.
    pub fn source(&self) -> &str {
        match self {
            FieldPattern::Any => "*",
            FieldPattern::Exact(s) => s,
            FieldPattern::Glob { source, .. } => source,
        }
    }
}

/// One parsed allow/deny statement.
///
/// Immutable once parsed. A refresh builds new rules and swaps the owning
/// policy; rules are never edited in place.
#[derive(Debug, Clone)]
pub struct Rule {
    service: FieldPattern,
    route: FieldPattern,
    deny: bool,
    text: String,
}

impl Rule {
    /// Parse a single rule from its text form.
    ///
    /// Whitespace around the whole string and around the `:` separator is
    /// trimmed. Text without a `:` is not a rule and yields `None`; parsing
    /// is best-effort by contract and callers skip invalid entries.
    pub fn parse(text: &str) -> Option<Rule> {
        let trimmed = text.trim();
        let (deny, body) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (service, route) = body.split_once(':')?;
        let service = FieldPattern::compile(service.trim())?;
        let route = FieldPattern::compile(route.trim())?;

        Some(Rule {
            service,
            route,
            deny,
            text: trimmed.to_string(),
        })
    }

    /// Whether this is a deny rule (`!` prefix).
    pub fn is_deny(&self) -> bool {
        self.deny
    }

    /// Check whether the rule matches a concrete (service, route) pair.
    pub fn matches(&self, service: &str, route: &str) -> bool {
        self.service.matches(service) && self.route.matches(route)
    }

    /// The rule as originally written (trimmed), kept for audit output.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The service-side pattern as written.
    pub fn service_pattern(&self) -> &str {
        self.service.source()
    }

    /// The route-side pattern as written.
    pub fn route_pattern(&self) -> &str {
        self.route.source()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Parse a list of rule texts, skipping entries that do not parse.
pub fn parse_all<I, S>(texts: I) -> Vec<Rule>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    texts
        .into_iter()
        .filter_map(|text| {
            let text = text.as_ref();
            let rule = Rule::parse(text);
            if rule.is_none() {
                debug!(text, "Skipping unparsable access rule");
            }
            rule
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_allow_rule() {
        let rule = Rule::parse("user-service:get-profile").unwrap();
        assert!(!rule.is_deny());
        assert_eq!(rule.service_pattern(), "user-service");
        assert_eq!(rule.route_pattern(), "get-profile");
    }

    #[test]
    fn test_parse_deny_rule() {
        let rule = Rule::parse("!payment-service:refund").unwrap();
        assert!(rule.is_deny());
        assert_eq!(rule.service_pattern(), "payment-service");
        assert_eq!(rule.route_pattern(), "refund");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let rule = Rule::parse("  user-service : get-*  ").unwrap();
        assert_eq!(rule.service_pattern(), "user-service");
        assert_eq!(rule.route_pattern(), "get-*");
    }

    #[test]
    fn test_parse_without_separator_is_invalid() {
        assert!(Rule::parse("no-colon-here").is_none());
        assert!(Rule::parse("").is_none());
        assert!(Rule::parse("   ").is_none());
        assert!(Rule::parse("!").is_none());
    }

    #[test]
    fn test_parse_splits_on_first_colon() {
        let rule = Rule::parse("svc:get:extra").unwrap();
        assert_eq!(rule.service_pattern(), "svc");
        assert_eq!(rule.route_pattern(), "get:extra");
    }

    #[test]
    fn test_wildcard_matches_anything() {
        let pattern = FieldPattern::compile("*").unwrap();
        assert!(pattern.matches("anything"));
        assert!(pattern.matches(""));
    }

    #[test]
    fn test_prefix_glob() {
        let pattern = FieldPattern::compile("get-*").unwrap();
        assert!(pattern.matches("get-profile"));
        assert!(pattern.matches("get-"));
        assert!(!pattern.matches("delete-profile"));
    }

    #[test]
    fn test_suffix_glob() {
        let pattern = FieldPattern::compile("*-service").unwrap();
        assert!(pattern.matches("user-service"));
        assert!(!pattern.matches("user-services"));
    }

    #[test]
    fn test_exact_match() {
        let pattern = FieldPattern::compile("refund").unwrap();
        assert!(pattern.matches("refund"));
        assert!(!pattern.matches("refunds"));
        assert!(!pattern.matches("Refund"));
    }

    #[test]
    fn test_glob_escapes_regex_metacharacters() {
        let pattern = FieldPattern::compile("v1.api-*").unwrap();
        assert!(pattern.matches("v1.api-users"));
        assert!(!pattern.matches("v1xapi-users"));
    }

    #[test]
    fn test_rule_matches_both_fields() {
        let rule = Rule::parse("user-service:get-*").unwrap();
        assert!(rule.matches("user-service", "get-profile"));
        assert!(!rule.matches("user-service", "delete-profile"));
        assert!(!rule.matches("order-service", "get-profile"));
    }

    #[test]
    fn test_parse_all_skips_invalid_entries() {
        let rules = parse_all(["user-service:get-*", "garbage", "!*:delete-*"]);
        assert_eq!(rules.len(), 2);
        assert!(!rules[0].is_deny());
        assert!(rules[1].is_deny());
    }

    #[test]
    fn test_display_preserves_original_text() {
        let rule = Rule::parse("!payment-service:refund").unwrap();
        assert_eq!(rule.to_string(), "!payment-service:refund");
    }
}
