//! Core type definitions shared across the crate.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{SandboxError, SandboxResult};
use crate::selector::Selector;

/// What to do when two capabilities attach the same member name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    #[default]
    Reject,
    Overwrite,
}

/// Definition body as written in TOML
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DefinitionBase {
    #[serde(default)]
    pub uses: Selector,
    #[serde(default)]
    pub collisions: CollisionPolicy,
}

/// Named sandbox definition, keyed by its TOML table name
#[derive(Clone, PartialEq)]
pub struct SandboxDefinition {
    pub name: String,
    pub base: DefinitionBase,
}

impl std::ops::Deref for SandboxDefinition {
    type Target = DefinitionBase;
    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl std::fmt::Debug for SandboxDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxDefinition")
            .field("name", &self.name)
            .field("uses", &self.uses)
            .field("collisions", &self.collisions)
            .finish()
    }
}

/// Callable member taking string arguments.
pub type Member = Arc<dyn Fn(&[String]) -> anyhow::Result<String> + Send + Sync>;

struct Slot {
    owner: String,
    value: Box<dyn Any + Send>,
}

/// Instance produced by assembly and populated by capability installers.
pub struct Sandbox {
    members: HashMap<String, Slot>,
    capabilities: Vec<String>,
    installing: Option<String>,
    collisions: CollisionPolicy,
}

impl Sandbox {
    pub(crate) fn new(collisions: CollisionPolicy) -> Self {
        Self {
            members: HashMap::new(),
            capabilities: Vec::new(),
            installing: None,
            collisions,
        }
    }

    pub(crate) fn begin_install(&mut self, capability: &str) {
        self.installing = Some(capability.to_string());
    }

    pub(crate) fn finish_install(&mut self) {
        if let Some(capability) = self.installing.take() {
            self.capabilities.push(capability);
        }
    }

    /// Attach a member value under the given name.
    ///
    /// Fails with [`SandboxError::MemberCollision`] if `name` is already
    /// attached and the policy is `Reject`. An installer attaching the same
    /// name twice collides with itself, so `existing` and `incoming` are equal.
    pub fn attach<T: Any + Send>(
        &mut self,
        name: impl Into<String>,
        value: T,
    ) -> SandboxResult<()> {
        let name = name.into();
        let owner = self
            .installing
            .clone()
            .unwrap_or_else(|| "<direct>".to_string());

        if let Some(existing) = self.members.get(&name) {
            match self.collisions {
                CollisionPolicy::Reject => {
                    return Err(SandboxError::MemberCollision {
                        member: name,
                        existing: existing.owner.clone(),
                        incoming: owner,
                    });
                }
                CollisionPolicy::Overwrite => {
                    tracing::warn!(
                        "Member '{}' from '{}' overwritten by '{}'",
                        name,
                        existing.owner,
                        owner
                    );
                }
            }
        }

        self.members.insert(
            name,
            Slot {
                owner,
                value: Box::new(value),
            },
        );
        Ok(())
    }

    /// Attach a callable member.
    pub fn attach_fn<F>(&mut self, name: impl Into<String>, f: F) -> SandboxResult<()>
    where
        F: Fn(&[String]) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        let member: Member = Arc::new(f);
        self.attach(name, member)
    }

    /// Get a reference to a member by name and type.
    pub fn get<T: Any + Send>(&self, name: &str) -> Option<&T> {
        self.members
            .get(name)
            .and_then(|slot| slot.value.downcast_ref())
    }

    /// Get a mutable reference to a member by name and type.
    pub fn get_mut<T: Any + Send>(&mut self, name: &str) -> Option<&mut T> {
        self.members
            .get_mut(name)
            .and_then(|slot| slot.value.downcast_mut())
    }

    pub fn has(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    /// Capability that attached the member, if any.
    pub fn owner_of(&self, name: &str) -> Option<&str> {
        self.members.get(name).map(|slot| slot.owner.as_str())
    }

    /// Member names in sorted order
    pub fn member_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.members.keys().map(String::as_str).collect();
        names.sort();
        names
    }

    /// Capabilities installed, in installation order
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// Invoke a callable member attached with [`Sandbox::attach_fn`].
    pub fn call(&self, name: &str, args: &[String]) -> anyhow::Result<String> {
        let member = self
            .get::<Member>(name)
            .ok_or_else(|| SandboxError::MissingMember {
                member: name.to_string(),
            })?;
        member(args)
    }
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox")
            .field("capabilities", &self.capabilities)
            .field("members", &self.member_names())
            .field("collisions", &self.collisions)
            .finish()
    }
}
