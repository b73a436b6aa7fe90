use serde::Serialize;

use crate::error::{SandboxError, SandboxResult};
use crate::registry::CapabilityRegistry;
use crate::selector::Selector;
use crate::types::{CollisionPolicy, Sandbox, SandboxDefinition};

/// Boxed continuation accepted by [`Assembler::run_boxed`]
pub type Continuation<'c, R> = Box<dyn FnOnce(Sandbox) -> R + 'c>;

/// Resolved, validated list of capabilities an assembly will install
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssemblyPlan {
    pub capabilities: Vec<String>,
    pub collisions: CollisionPolicy,
}

/// Assemble a sandbox from `registry` and hand it to `continuation`.
///
/// Every selected name is checked before any installer runs. The
/// continuation is called exactly once, and only if assembly succeeds.
pub fn assemble<R>(
    registry: &CapabilityRegistry,
    selector: impl Into<Selector>,
    continuation: impl FnOnce(Sandbox) -> R,
) -> SandboxResult<R> {
    Assembler::new(registry).select(selector).run(continuation)
}

/// Builder for configuring and running an assembly
pub struct Assembler<'a> {
    registry: &'a CapabilityRegistry,
    selector: Selector,
    collisions: CollisionPolicy,
}

impl<'a> Assembler<'a> {
    pub fn new(registry: &'a CapabilityRegistry) -> Self {
        Self {
            registry,
            selector: Selector::All,
            collisions: CollisionPolicy::default(),
        }
    }

    /// Create an assembler configured from a loaded definition
    pub fn from_definition(
        registry: &'a CapabilityRegistry,
        definition: &SandboxDefinition,
    ) -> Self {
        Self::new(registry)
            .select(definition.uses.clone())
            .collisions(definition.collisions)
    }

    pub fn select(mut self, selector: impl Into<Selector>) -> Self {
        self.selector = selector.into();
        self
    }

    pub fn collisions(mut self, policy: CollisionPolicy) -> Self {
        self.collisions = policy;
        self
    }

    /// Resolve the selector and check every name against the registry
    pub fn plan(&self) -> SandboxResult<AssemblyPlan> {
        let capabilities = self.selector.resolve(self.registry);
        if let Some(missing) = capabilities
            .iter()
            .find(|name| !self.registry.contains(name))
        {
            return Err(SandboxError::UnknownCapability {
                name: missing.clone(),
            });
        }
        Ok(AssemblyPlan {
            capabilities,
            collisions: self.collisions,
        })
    }

    /// Run the assembly and deliver the finished sandbox
    pub fn run<R>(self, continuation: impl FnOnce(Sandbox) -> R) -> SandboxResult<R> {
        let sandbox = self.build()?;
        Ok(continuation(sandbox))
    }

    /// Like [`Assembler::run`], for callers holding an optional continuation
    pub fn run_boxed<R>(self, continuation: Option<Continuation<'_, R>>) -> SandboxResult<R> {
        let continuation = continuation.ok_or(SandboxError::ContinuationRequired)?;
        self.run(continuation)
    }

    fn build(&self) -> SandboxResult<Sandbox> {
        let plan = self.plan()?;
        let mut sandbox = Sandbox::new(plan.collisions);

        for name in &plan.capabilities {
            let installer = self
                .registry
                .get_installer(name)
                .ok_or_else(|| SandboxError::UnknownCapability { name: name.clone() })?;

            tracing::debug!("Installing capability '{}'", name);
            sandbox.begin_install(name);
            if let Err(e) = installer(&mut sandbox) {
                return Err(match e.downcast::<SandboxError>() {
                    Ok(sandbox_error) => sandbox_error,
                    Err(source) => SandboxError::Installer {
                        capability: name.clone(),
                        source,
                    },
                });
            }
            sandbox.finish_install();
        }

        tracing::info!(
            "Assembled sandbox with capabilities {:?} ({} members)",
            sandbox.capabilities(),
            sandbox.member_names().len()
        );
        Ok(sandbox)
    }
}
