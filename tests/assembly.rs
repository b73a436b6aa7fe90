mod common;

use capability_sandbox::{Assembler, CapabilityRegistry, Sandbox, SandboxError, Selector, assemble};
use std::cell::Cell;
use std::sync::atomic::Ordering;

#[test]
fn test_selected_capability_only() {
    let registry = common::dom_event_registry();

    let checked = assemble(&registry, ["event"], |sandbox| {
        assert!(sandbox.has("attachEvent"));
        assert!(!sandbox.has("getElement"));
        true
    })
    .unwrap();

    assert!(checked);
}

#[test]
fn test_members_match_selected_installers_exactly() {
    let mut registry = CapabilityRegistry::new();
    common::register_counted(&mut registry, "a", &["a1", "a2"]);
    common::register_counted(&mut registry, "b", &["b1"]);
    common::register_counted(&mut registry, "c", &["c1", "c2", "c3"]);

    let members = assemble(&registry, vec!["c", "a"], |sandbox| {
        sandbox
            .member_names()
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
    })
    .unwrap();

    assert_eq!(members, ["a1", "a2", "c1", "c2", "c3"]);
}

#[test]
fn test_wildcard_and_omitted_selector_install_everything() {
    for (first, second) in [("a", "b"), ("b", "a")] {
        let mut registry = CapabilityRegistry::new();
        common::register_counted(&mut registry, first, &[&format!("{first}_member")]);
        common::register_counted(&mut registry, second, &[&format!("{second}_member")]);

        for selector in [Selector::All, Selector::from("*"), Selector::from(None::<String>)] {
            assemble(&registry, selector, |sandbox| {
                assert!(sandbox.has("a_member"));
                assert!(sandbox.has("b_member"));
                assert_eq!(sandbox.capabilities(), [first, second]);
            })
            .unwrap();
        }
    }
}

#[test]
fn test_reregistration_replaces_installer() {
    let mut registry = CapabilityRegistry::new();
    let first = common::register_counted(&mut registry, "x", &["from_f1"]);
    let second = common::register_counted(&mut registry, "x", &["from_f2"]);

    assemble(&registry, "x", |sandbox| {
        assert!(sandbox.has("from_f2"));
        assert!(!sandbox.has("from_f1"));
    })
    .unwrap();

    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unknown_capability_runs_nothing() {
    let mut registry = CapabilityRegistry::new();
    let calls = common::register_counted(&mut registry, "dom", &["getElement"]);
    let continued = Cell::new(false);

    let result = assemble(&registry, ["dom", "storage"], |_| continued.set(true));

    assert!(matches!(
        result,
        Err(SandboxError::UnknownCapability { ref name }) if name == "storage"
    ));
    assert!(!continued.get());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_assemblies_produce_distinct_instances() {
    let registry = common::dom_event_registry();

    let mut first: Sandbox = assemble(&registry, "dom", |sandbox| sandbox).unwrap();
    let second: Sandbox = assemble(&registry, "dom", |sandbox| sandbox).unwrap();

    first.attach("extra", 1u32).unwrap();
    assert!(first.has("extra"));
    assert!(!second.has("extra"));
}

#[test]
fn test_continuation_runs_once_after_full_assembly() {
    let registry = common::dom_event_registry();
    let runs = Cell::new(0);

    assemble(&registry, Selector::All, |sandbox| {
        runs.set(runs.get() + 1);
        assert_eq!(sandbox.capabilities(), ["dom", "event"]);
        assert_eq!(sandbox.member_names(), ["attachEvent", "getElement"]);
    })
    .unwrap();

    assert_eq!(runs.get(), 1);
}

#[test]
fn test_installer_error_stops_assembly() {
    let mut registry = common::dom_event_registry();
    registry
        .register("broken", |_| Err(anyhow::anyhow!("device unavailable")))
        .unwrap();
    let continued = Cell::new(false);

    let result = Assembler::new(&registry)
        .select(["dom", "broken", "event"])
        .run(|_| continued.set(true));

    match result {
        Err(SandboxError::Installer { capability, .. }) => assert_eq!(capability, "broken"),
        other => panic!("expected installer error, got {other:?}"),
    }
    assert!(!continued.get());
}

#[test]
fn test_duplicate_names_install_once() {
    let mut registry = CapabilityRegistry::new();
    let calls = common::register_counted(&mut registry, "dom", &["getElement"]);

    assemble(&registry, ["dom", "dom"], |sandbox| {
        assert_eq!(sandbox.capabilities(), ["dom"]);
    })
    .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_callable_members() {
    let registry = common::dom_event_registry();

    let element = assemble(&registry, "dom", |sandbox| {
        sandbox.call("getElement", &["nav".to_string()])
    })
    .unwrap()
    .unwrap();

    assert_eq!(element, "element:nav");
}
