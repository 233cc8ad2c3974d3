// src/utils/errors.rs
//! Error types for proxy generation and dispatch
//!
//! Generation-time failures surface once, from the call that triggered
//! synthesis or instantiation. Call-time failures raised by the engine itself
//! travel inside `anyhow::Error` so that errors from interceptors and real
//! implementations pass through untouched.

use thiserror::Error;

/// Result alias for generation-time operations
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Engine error
#[derive(Debug, Error)]
pub enum ProxyError {
    /// A member cannot be intercepted and the hook asked to abort
    #[error("member {member} on {type_name} cannot be intercepted: {reason}")]
    UnsupportedMemberKind {
        type_name: String,
        member: String,
        reason: String,
    },

    /// No base constructor accepts the supplied arguments
    #[error("no constructor of {type_name} accepts arguments ({arguments})")]
    ConstructorMismatch { type_name: String, arguments: String },

    /// A mixin instance does not match the slot recorded in the descriptor
    #[error("mixin slot {slot} expects {expected}, got {actual}")]
    MixinTypeMismatch {
        slot: usize,
        expected: String,
        actual: String,
    },

    /// Metadata could not be reconstructed on the synthesized member
    #[error("metadata {metadata} on {member} cannot be replicated: {reason}")]
    IrreplicableMetadata {
        member: String,
        metadata: String,
        reason: String,
    },

    /// Two contracts claim the same call shape with incompatible resolutions
    #[error("ambiguous resolution for {member}: {detail}")]
    AmbiguousMemberResolution { member: String, detail: String },

    /// The generation hook aborted synthesis
    #[error("generation aborted by hook at {type_name}.{member}")]
    GenerationAborted { type_name: String, member: String },

    /// A factory running under the synthesis lock asked the same cache for
    /// another implementation
    #[error("synthesis of {key} re-entered its own generation cache")]
    ReentrantSynthesis { key: String },

    /// Malformed contract definition
    #[error("invalid type {type_name}: {reason}")]
    InvalidType { type_name: String, reason: String },

    /// Contract combination cannot be proxied
    #[error("invalid proxy contract: {0}")]
    InvalidContract(String),

    /// Supplied target does not satisfy the proxied contract
    #[error("target of type {actual} does not implement {expected}")]
    TargetTypeMismatch { expected: String, actual: String },

    /// No exposed member matches the call
    #[error("no member {member} on {type_name} matches the call")]
    MemberNotFound { type_name: String, member: String },

    /// More than one overload matches the call
    #[error("call to {member} on {type_name} matches {candidates} overloads")]
    AmbiguousCall {
        type_name: String,
        member: String,
        candidates: usize,
    },

    /// Arguments do not fit the parameter shape
    #[error("arguments for {member} do not match its parameters: {reason}")]
    ArgumentMismatch { member: String, reason: String },

    /// The chain ran out and there is no real implementation
    #[error("the interceptor chain proceeded past {member}, which has no target")]
    NoImplementation { member: String },

    /// Interceptors neither set a return value nor reached an implementation
    #[error("interceptors failed to set a return value for {member}")]
    MissingReturnValue { member: String },

    /// Return slot holds a value the return type does not admit
    #[error("return value of {member} is {actual}, expected {expected}")]
    ReturnTypeMismatch {
        member: String,
        expected: String,
        actual: String,
    },

    /// Invocation target replacement is not allowed for this invocation kind
    #[error("invocation target of {member} cannot be changed")]
    TargetNotChangeable { member: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl ProxyError {
    /// True for errors that describe a failed synthesis (never cached)
    pub fn is_generation_error(&self) -> bool {
        matches!(
            self,
            ProxyError::UnsupportedMemberKind { .. }
                | ProxyError::IrreplicableMetadata { .. }
                | ProxyError::AmbiguousMemberResolution { .. }
                | ProxyError::GenerationAborted { .. }
                | ProxyError::ReentrantSynthesis { .. }
                | ProxyError::InvalidContract(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProxyError::NoImplementation {
            member: "IStore.Get".to_string(),
        };
        assert!(err.to_string().contains("IStore.Get"));
    }

    #[test]
    fn test_generation_error_classification() {
        let err = ProxyError::AmbiguousMemberResolution {
            member: "Run".to_string(),
            detail: "two mixins".to_string(),
        };
        assert!(err.is_generation_error());

        let err = ProxyError::ConstructorMismatch {
            type_name: "Calculator".to_string(),
            arguments: "Int".to_string(),
        };
        assert!(!err.is_generation_error());
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = ProxyError::MissingReturnValue {
            member: "Get".to_string(),
        }
        .into();
        assert!(matches!(
            err.downcast_ref::<ProxyError>(),
            Some(ProxyError::MissingReturnValue { .. })
        ));
    }
}
