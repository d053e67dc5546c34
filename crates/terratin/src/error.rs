//! Error taxonomy for TIN operations.
//!
//! Invalid arguments and illegal states are recoverable and surface at the
//! operation boundary. An internal invariant violation indicates the mesh
//! can no longer be trusted; the TIN must be cleared before further use.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TinError {
    /// A caller-supplied value was out of range or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not permitted in the TIN's current state.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// Mutation was attempted after `dispose`.
    #[error("the TIN has been disposed")]
    Disposed,

    /// Free vertex mutation was attempted after constraints were added.
    #[error("the TIN is locked: constraints have been added; clear() to reuse")]
    Locked,

    /// A structural invariant failed mid-operation. The TIN is corrupt and
    /// must be cleared before further use.
    #[error("internal invariant violation: {0}")]
    InternalInvariant(String),
}

impl TinError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        TinError::InvalidArgument(msg.into())
    }

    pub(crate) fn illegal(msg: impl Into<String>) -> Self {
        TinError::IllegalState(msg.into())
    }

    pub(crate) fn internal(msg: impl Into<String>) -> Self {
        TinError::InternalInvariant(msg.into())
    }
}
