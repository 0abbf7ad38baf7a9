//! Access rule engine
//!
//! Parses allow/deny rules of the form `[!]<service>:<route>` and evaluates
//! them against concrete (service, route) pairs.
//!
//! ## Matching model
//!
//! - `*` in a field matches anything in that field
//! - an embedded `*` is an anchored glob (`get-*` matches `get-profile`)
//! - anything else is exact, case-sensitive equality
//! - a matching deny rule always wins over matching allow rules
//! - no matching rule at all means deny (deny-by-default)
//!
//! The outcome never depends on rule declaration order; order is preserved
//! on policies only for audit output.

pub mod matcher;
pub mod rule;

pub use matcher::{AccessDecision, evaluate, is_allowed};
pub use rule::{FieldPattern, Rule, parse_all};
