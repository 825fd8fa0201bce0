//! Request interception and domain rule evaluation
//!
//! Turns a handful of per-domain switches plus a first-party allow-set into a
//! compiled [`RuleTable`], and exposes the [`Interceptor`] that consults it
//! for every outgoing request.
//!
//! ## Decision order
//!
//! 1. Domains outside the first-party set are denied, whatever the rules say.
//! 2. Exact rules, then wildcard rules in declaration order. First match wins.
//! 3. No matching rule allows silently.
//!
//! # Example
//!
//! ```
//! use rule_engine::{build_rules, DomainFlag, RuleFlags};
//!
//! let flags = RuleFlags::new(vec!["shop.example.com".to_string()])
//!     .with_flag(DomainFlag::new("*.tracking.shop.example.com", false));
//! let table = build_rules(&flags).unwrap();
//!
//! assert!(table.decide("www.shop.example.com").allowed);
//! assert!(!table.decide("px.tracking.shop.example.com").allowed);
//! assert!(!table.decide("doubleclick.net").allowed);
//! ```

pub mod interceptor;
pub mod pattern;
pub mod rules;

pub use interceptor::{
    InterceptDecision, InterceptedRequest, Interceptor, SyntheticResponse, TRANSPARENT_PNG,
};
pub use pattern::DomainPattern;
pub use rules::{build_rules, DomainFlag, Rule, RuleDecision, RuleFlags, RuleTable};
