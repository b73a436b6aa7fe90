#![allow(dead_code)]

use capability_sandbox::{CapabilityRegistry, DefinitionSet, load_definitions};
use std::io::Write;
use std::ops::Deref;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::{Builder, NamedTempFile};

pub struct TestFile(NamedTempFile);

impl Deref for TestFile {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        self.0.path()
    }
}

pub fn create_toml_test_file(content: &str) -> TestFile {
    create_test_file(content, ".toml")
}

pub fn create_test_file(content: &str, suffix: &str) -> TestFile {
    let mut temp_file = Builder::new().suffix(suffix).tempfile().unwrap();
    write!(temp_file, "{}", content).unwrap();
    TestFile(temp_file)
}

/// Registry with `dom` and `event` capabilities
pub fn dom_event_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry
        .register("dom", |sandbox| {
            sandbox.attach_fn("getElement", |args| Ok(format!("element:{}", args.join(""))))?;
            Ok(())
        })
        .unwrap();
    registry
        .register("event", |sandbox| {
            sandbox.attach_fn("attachEvent", |_| Ok("attached".to_string()))?;
            Ok(())
        })
        .unwrap();
    registry
}

/// Register `name` with an installer that attaches `members` and counts its runs
pub fn register_counted(
    registry: &mut CapabilityRegistry,
    name: &str,
    members: &[&str],
) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let members: Vec<String> = members.iter().map(|m| m.to_string()).collect();
    registry
        .register(name, move |sandbox| {
            counter.fetch_add(1, Ordering::SeqCst);
            for member in &members {
                sandbox.attach(member.clone(), ())?;
            }
            Ok(())
        })
        .unwrap();
    calls
}

pub fn load_definitions_and_assert_ok(paths: &[PathBuf]) -> DefinitionSet {
    let definitions_result = load_definitions(paths);
    assert!(
        definitions_result.is_ok(),
        "load_definitions failed with: {:?}",
        definitions_result.err()
    );
    definitions_result.unwrap()
}
