//! Capability Sandbox
//!
//! A registry of named capability installers and an assembler
//! that builds sandboxes from a selected set of capabilities.

pub use assembler::{Assembler, AssemblyPlan, Continuation, assemble};
pub use builtin::{builtin_registry, register_builtins};
pub use error::{SandboxError, SandboxResult};
pub use loader::{DefinitionSet, load_definitions};
pub use registry::{Capability, CapabilityRegistry, Installer};
pub use selector::Selector;
pub use types::{CollisionPolicy, DefinitionBase, Member, Sandbox, SandboxDefinition};

pub mod assembler;
pub mod builtin;
pub mod error;
pub mod loader;
pub mod registry;
pub mod selector;
mod types;
