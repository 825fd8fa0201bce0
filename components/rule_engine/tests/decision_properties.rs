//! Decision properties of the rule table and interceptor

use pretty_assertions::assert_eq;
use rule_engine::*;
use std::sync::Arc;
use traffic_types::{DecisionOutcome, ResourceType};

const FIRST_PARTY: &str = "shop.example.com";

const FLAG_PATTERNS: [&str; 4] = [
    "images.shop.example.com",
    "*.static.shop.example.com",
    "*.tracking.shop.example.com",
    "recs.shop.example.com",
];

/// Every on/off combination of the four switches
fn all_flag_combinations() -> Vec<RuleFlags> {
    (0..16u8)
        .map(|mask| {
            FLAG_PATTERNS
                .iter()
                .enumerate()
                .fold(
                    RuleFlags::new(vec![FIRST_PARTY.to_string()]),
                    |flags, (bit, pattern)| {
                        flags.with_flag(DomainFlag::new(*pattern, mask & (1 << bit) != 0))
                    },
                )
        })
        .collect()
}

#[test]
fn test_third_party_always_denied() {
    let third_party = [
        "doubleclick.net",
        "ad.doubleclick.net",
        "example.com",
        "evilshop.example.com",
        "shop.example.com.evil.net",
    ];

    for flags in all_flag_combinations() {
        let table = build_rules(&flags).unwrap();
        for domain in third_party {
            assert!(!table.decide(domain).allowed, "{} allowed", domain);
        }
    }
}

#[test]
fn test_doubleclick_blocked_for_every_resource_type() {
    for flags in all_flag_combinations() {
        let interceptor = Interceptor::new(Arc::new(build_rules(&flags).unwrap()));
        for resource_type in ResourceType::ALL {
            let request = InterceptedRequest::new(
                "1",
                "https://doubleclick.net/pixel",
                "GET",
                resource_type,
            );
            let decision = interceptor.on_request(&request);
            assert_ne!(decision, InterceptDecision::Continue);
        }
        assert_eq!(interceptor.allowed_count(), 0);
        assert_eq!(interceptor.blocked_count(), ResourceType::ALL.len() as u64);
    }
}

#[test]
fn test_switches_control_first_party_hosts() {
    for (mask, flags) in all_flag_combinations().into_iter().enumerate() {
        let table = build_rules(&flags).unwrap();
        let expect = |bit: usize| mask & (1 << bit) != 0;

        assert_eq!(table.decide("images.shop.example.com").allowed, expect(0));
        assert_eq!(table.decide("a.static.shop.example.com").allowed, expect(1));
        assert_eq!(table.decide("px.tracking.shop.example.com").allowed, expect(2));
        assert_eq!(table.decide("recs.shop.example.com").allowed, expect(3));

        // hosts without a rule pass silently
        let other = table.decide("www.shop.example.com");
        assert!(other.allowed);
        assert!(other.matched_silently);
    }
}

#[test]
fn test_exact_rule_beats_any_wildcard() {
    let wildcards = ["*.cdn.shop.example.com", "img*.shop.example.com", "*example.com"];

    for exact_allowed in [true, false] {
        for wildcard in wildcards {
            // wildcard declared both before and after the exact rule
            let before = RuleFlags::new(vec![FIRST_PARTY.to_string()])
                .with_flag(DomainFlag::new(wildcard, !exact_allowed))
                .with_flag(DomainFlag::new("img.cdn.shop.example.com", exact_allowed));
            let after = RuleFlags::new(vec![FIRST_PARTY.to_string()])
                .with_flag(DomainFlag::new("img.cdn.shop.example.com", exact_allowed))
                .with_flag(DomainFlag::new(wildcard, !exact_allowed));

            for flags in [before, after] {
                let table = build_rules(&flags).unwrap();
                let decision = table.decide("img.cdn.shop.example.com");
                assert_eq!(decision.allowed, exact_allowed, "{}", wildcard);
                assert!(!decision.matched_silently);
            }
        }
    }
}

#[test]
fn test_first_declared_wildcard_wins() {
    let flags = RuleFlags::new(vec![FIRST_PARTY.to_string()])
        .with_flag(DomainFlag::new("*.shop.example.com", false))
        .with_flag(DomainFlag::new("*.cdn.shop.example.com", true));
    let table = build_rules(&flags).unwrap();

    assert!(!table.decide("img.cdn.shop.example.com").allowed);
}

#[test]
fn test_blocked_substitutes() {
    let flags = RuleFlags::new(vec![FIRST_PARTY.to_string()])
        .with_flag(DomainFlag::new("*.tracking.shop.example.com", false));
    let interceptor = Interceptor::new(Arc::new(build_rules(&flags).unwrap()));
    let url = "https://px.tracking.shop.example.com/t";

    let outcomes: Vec<DecisionOutcome> = [
        ResourceType::Image,
        ResourceType::Script,
        ResourceType::Stylesheet,
        ResourceType::Xhr,
        ResourceType::Document,
    ]
    .into_iter()
    .map(|rt| interceptor.on_request(&InterceptedRequest::new("1", url, "GET", rt)).outcome())
    .collect();

    assert_eq!(
        outcomes,
        vec![
            DecisionOutcome::Fulfilled,
            DecisionOutcome::Fulfilled,
            DecisionOutcome::Fulfilled,
            DecisionOutcome::Aborted,
            DecisionOutcome::Aborted,
        ]
    );
}
