use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{SandboxError, SandboxResult};
use crate::selector::WILDCARD;
use crate::types::Sandbox;

/// Installer attaching a capability's members to a sandbox
pub type Installer = Arc<dyn Fn(&mut Sandbox) -> Result<()> + Send + Sync>;

#[derive(Clone)]
pub struct Capability {
    pub name: String,
    pub description: Option<String>,
    pub installer: Installer,
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("installer", &"<function>")
            .finish()
    }
}

/// Mapping from capability name to installer.
///
/// Names keep the position of their first registration, so wildcard
/// selection installs capabilities in a stable order.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Capability>,
    order: Vec<String>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an installer, replacing any previous one for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, installer: F) -> SandboxResult<()>
    where
        F: Fn(&mut Sandbox) -> Result<()> + Send + Sync + 'static,
    {
        self.insert(name.into(), None, Arc::new(installer))
    }

    /// Register an installer with a one-line description.
    pub fn register_described<F>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        installer: F,
    ) -> SandboxResult<()>
    where
        F: Fn(&mut Sandbox) -> Result<()> + Send + Sync + 'static,
    {
        self.insert(name.into(), Some(description.into()), Arc::new(installer))
    }

    /// Register an installer, rejecting names that are already taken.
    pub fn register_unique<F>(&mut self, name: impl Into<String>, installer: F) -> SandboxResult<()>
    where
        F: Fn(&mut Sandbox) -> Result<()> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.contains(&name) {
            return Err(SandboxError::InvalidRegistration {
                name,
                reason: "already registered".to_string(),
            });
        }
        self.insert(name, None, Arc::new(installer))
    }

    fn insert(
        &mut self,
        name: String,
        description: Option<String>,
        installer: Installer,
    ) -> SandboxResult<()> {
        validate_capability_name(&name)?;

        let capability = Capability {
            name: name.clone(),
            description,
            installer,
        };
        if self.capabilities.insert(name.clone(), capability).is_some() {
            tracing::warn!("Replaced installer for capability '{}'", name);
        } else {
            tracing::debug!("Registered capability '{}'", name);
            self.order.push(name);
        }
        Ok(())
    }

    pub fn get_capability(&self, name: &str) -> Option<&Capability> {
        self.capabilities.get(name)
    }

    pub fn get_installer(&self, name: &str) -> Option<&Installer> {
        self.capabilities.get(name).map(|c| &c.installer)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    /// Registered names in first-registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn get_capabilities(&self) -> impl Iterator<Item = &Capability> {
        self.order.iter().filter_map(|name| self.capabilities.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn validate_capability_name(name: &str) -> SandboxResult<()> {
    let reason = if name.is_empty() {
        "name must not be empty"
    } else if name == WILDCARD {
        "'*' is reserved for selecting every capability"
    } else if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        "name may only contain ASCII letters, digits, '_', '-' and '.'"
    } else {
        return Ok(());
    };

    Err(SandboxError::InvalidRegistration {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}
