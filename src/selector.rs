//! Capability selectors and their resolution against a registry.

use serde::Deserialize;
use std::collections::HashSet;

use crate::registry::CapabilityRegistry;

/// Wildcard accepted anywhere a capability name is.
pub const WILDCARD: &str = "*";

/// Which capabilities an assembly should install.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "RawSelector")]
pub enum Selector {
    /// Every capability registered at resolution time
    #[default]
    All,
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSelector {
    Name(String),
    Names(Vec<String>),
}

impl From<RawSelector> for Selector {
    fn from(raw: RawSelector) -> Self {
        match raw {
            RawSelector::Name(name) => name.into(),
            RawSelector::Names(names) => names.into(),
        }
    }
}

impl Selector {
    /// Resolve to a deduplicated list of names, keeping first occurrences.
    ///
    /// Membership is not checked here; a wildcard expands to a snapshot of
    /// the registry's names in registration order.
    pub fn resolve(&self, registry: &CapabilityRegistry) -> Vec<String> {
        let requested: Vec<&str> = match self {
            Selector::All => vec![WILDCARD],
            Selector::One(name) => vec![name.as_str()],
            Selector::Many(names) => names.iter().map(String::as_str).collect(),
        };

        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for name in requested {
            if name == WILDCARD {
                for registered in registry.names() {
                    if seen.insert(registered.to_string()) {
                        resolved.push(registered.to_string());
                    }
                }
            } else if seen.insert(name.to_string()) {
                resolved.push(name.to_string());
            }
        }
        resolved
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selector::All)
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::All => f.write_str(WILDCARD),
            Selector::One(name) => f.write_str(name),
            Selector::Many(names) => write!(f, "[{}]", names.join(", ")),
        }
    }
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        if name == WILDCARD {
            Selector::All
        } else {
            Selector::One(name.to_string())
        }
    }
}

impl From<String> for Selector {
    fn from(name: String) -> Self {
        if name == WILDCARD {
            Selector::All
        } else {
            Selector::One(name)
        }
    }
}

impl From<Vec<String>> for Selector {
    fn from(names: Vec<String>) -> Self {
        Selector::Many(names)
    }
}

impl From<Vec<&str>> for Selector {
    fn from(names: Vec<&str>) -> Self {
        Selector::Many(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Selector {
    fn from(names: &[&str]) -> Self {
        Selector::Many(names.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Selector {
    fn from(names: [&str; N]) -> Self {
        Selector::Many(names.iter().map(|s| s.to_string()).collect())
    }
}

impl<T: Into<Selector>> From<Option<T>> for Selector {
    fn from(selector: Option<T>) -> Self {
        selector.map(Into::into).unwrap_or_default()
    }
}
