//! Allow/deny evaluation for a client's rule set
//!
//! Evaluation is order-independent: a matching deny rule wins over any number
//! of matching allow rules regardless of declaration order, and the absence
//! of any matching rule denies (deny-by-default).

use tracing::trace;

use crate::access::rule::Rule;

/// Result of an access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Access is allowed
    Allowed,
    /// Access is denied with a reason
    Denied(String),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allowed)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, AccessDecision::Denied(_))
    }
}

/// Evaluate a rule set against a (service, route) pair.
///
/// Every rule is considered; any matching deny rule ends the check with a
/// denial that names the rule.
pub fn evaluate(rules: &[Rule], service: &str, route: &str) -> AccessDecision {
    let mut allowed_by: Option<&Rule> = None;

    for rule in rules {
        if !rule.matches(service, route) {
            continue;
        }
        if rule.is_deny() {
            trace!(rule = rule.text(), service, route, "Matched deny rule");
            return AccessDecision::Denied(format!("denied by rule '{}'", rule.text()));
        }
        allowed_by.get_or_insert(rule);
    }

    match allowed_by {
        Some(rule) => {
            trace!(rule = rule.text(), service, route, "Matched allow rule");
            AccessDecision::Allowed
        }
        None => AccessDecision::Denied("no matching rule".to_string()),
    }
}

/// Check whether a rule set permits a (service, route) pair.
///
/// An empty rule set denies everything.
pub fn is_allowed(rules: &[Rule], service: &str, route: &str) -> bool {
    evaluate(rules, service, route).is_allowed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::rule::parse_all;

    #[test]
    fn test_empty_rules_deny_by_default() {
        assert!(!is_allowed(&[], "user-service", "get-profile"));
    }

    #[test]
    fn test_no_matching_rule_denies() {
        let rules = parse_all(["user-service:get-*"]);
        assert!(!is_allowed(&rules, "order-service", "get-order"));
        assert!(!is_allowed(&rules, "user-service", "delete-profile"));
    }

    #[test]
    fn test_matching_allow_rule() {
        let rules = parse_all(["user-service:get-*"]);
        assert!(is_allowed(&rules, "user-service", "get-profile"));
    }

    #[test]
    fn test_deny_wins_regardless_of_order() {
        let forward = parse_all(["*:*", "!*:delete-*"]);
        let reversed = parse_all(["!*:delete-*", "*:*"]);

        for rules in [&forward, &reversed] {
            assert!(is_allowed(rules, "any-service", "get-profile"));
            assert!(!is_allowed(rules, "any-service", "delete-profile"));
        }
    }

    #[test]
    fn test_deny_wins_over_many_allows() {
        let rules = parse_all([
            "payment-service:*",
            "*:refund",
            "!payment-service:refund",
            "payment-service:refund",
        ]);
        assert!(!is_allowed(&rules, "payment-service", "refund"));
        assert!(is_allowed(&rules, "payment-service", "charge"));
    }

    #[test]
    fn test_non_matching_deny_does_not_block() {
        let rules = parse_all(["user-service:*", "!user-service:admin-*"]);
        assert!(is_allowed(&rules, "user-service", "get-profile"));
        assert!(!is_allowed(&rules, "user-service", "admin-reset"));
    }

    #[test]
    fn test_denied_decision_names_the_rule() {
        let rules = parse_all(["*:*", "!payment-service:refund"]);
        match evaluate(&rules, "payment-service", "refund") {
            AccessDecision::Denied(reason) => {
                assert!(reason.contains("!payment-service:refund"));
            }
            AccessDecision::Allowed => panic!("expected denial"),
        }
    }
}
