//! Error types for registration and assembly.

/// Errors produced while registering capabilities or assembling a sandbox.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("unknown capability: '{name}'")]
    UnknownCapability { name: String },

    #[error("invalid registration for '{name}': {reason}")]
    InvalidRegistration { name: String, reason: String },

    #[error("assembly requires a continuation")]
    ContinuationRequired,

    #[error("member '{member}' from capability '{incoming}' collides with capability '{existing}'")]
    MemberCollision {
        member: String,
        existing: String,
        incoming: String,
    },

    #[error("member '{member}' is not attached or not callable")]
    MissingMember { member: String },

    #[error("installer for capability '{capability}' failed: {source}")]
    Installer {
        capability: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Result type for sandbox operations.
pub type SandboxResult<T> = std::result::Result<T, SandboxError>;
