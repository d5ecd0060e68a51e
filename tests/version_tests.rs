use ksym_locator::error::BackportError;
use ksym_locator::kernel::backport::{resolve_backport, BACKPORT_RULES};
use ksym_locator::kernel::version::KernelVersion;
use proptest::prelude::*;

fn version_from(parts: &[u32]) -> KernelVersion {
    let text = parts
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(".");
    KernelVersion::parse(&text).unwrap()
}

/// Index of the selected rule, `None` when no backport applies
fn bracket(version: &KernelVersion) -> Option<usize> {
    match resolve_backport(version) {
        Ok(plan) => BACKPORT_RULES
            .iter()
            .position(|rule| rule.backport_tag == plan.backport_tag()),
        Err(BackportError::NoBackportAvailable { .. }) => None,
        Err(e) => panic!("unexpected error: {}", e),
    }
}

fn release() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..20, 2..=4).prop_map(|mut parts| {
        parts[0] = parts[0] % 6 + 1;
        parts
    })
}

proptest! {
    #[test]
    fn newer_versions_never_select_older_brackets(a in release(), b in release()) {
        let (a, b) = (version_from(&a), version_from(&b));
        let (low, high) = if a <= b { (a, b) } else { (b, a) };

        match (bracket(&low), bracket(&high)) {
            (Some(low_idx), Some(high_idx)) => prop_assert!(high_idx <= low_idx),
            (Some(_), None) => prop_assert!(false, "{} has a backport but {} has none", low, high),
            _ => {}
        }
    }

    #[test]
    fn ordering_is_total_and_consistent(a in release(), b in release()) {
        let (a, b) = (version_from(&a), version_from(&b));
        prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        prop_assert_eq!(a == b, a.cmp(&b) == std::cmp::Ordering::Equal);
    }

    #[test]
    fn display_round_trips_raw_text(a in release()) {
        let text = a.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(".");
        prop_assert_eq!(KernelVersion::parse(&text).unwrap().to_string(), text);
    }
}

#[test]
fn test_documented_brackets() {
    let cases = [
        ("6.1.80", Some("v5.15.162-1")),
        ("4.4", Some("v5.15.162-1")),
        ("4.3.9", Some("v5.10.168-1")),
        ("3.10.108", Some("v5.10.168-1")),
        ("3.2.102", Some("v4.14-rc2-1")),
        ("3.0", Some("v4.14-rc2-1")),
        ("2.6.32.68", Some("v3.14-1")),
        ("2.6.25", Some("v3.14-1")),
        ("2.6.20", None),
    ];
    for (text, expected) in cases {
        let version = KernelVersion::parse(text).unwrap();
        let tag = resolve_backport(&version).ok().map(|plan| plan.backport_tag().to_string());
        assert_eq!(tag.as_deref(), expected, "{}", text);
    }
}

#[test]
fn test_legacy_fixup_needed_only_before_three() {
    let old = resolve_backport(&KernelVersion::parse("2.6.32.68").unwrap()).unwrap();
    let new = resolve_backport(&KernelVersion::parse("3.2").unwrap()).unwrap();
    assert!(old.needs_legacy_tool_fixup);
    assert!(!new.needs_legacy_tool_fixup);
}
