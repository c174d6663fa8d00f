//! Error taxonomy for the RTOS awareness layer.

use thiserror::Error;

/// Errors surfaced by RTOS detection, thread-list refresh and register
/// retrieval.
///
/// Target I/O failures always abort the operation they occurred in; no
/// partial state is committed and no retries are attempted here. Retry
/// policy, if any, belongs to the transport layer.
#[derive(Debug, Error)]
pub enum RtosError {
    /// The connected target's architecture is not supported by this RTOS.
    #[error("target \"{0}\" is not in the NuttX compatibility list")]
    UnsupportedTarget(String),

    /// A required kernel symbol was not resolved to a non-zero address.
    #[error("required symbol {0} is not resolved")]
    MissingSymbol(&'static str),

    /// A target memory read failed mid-operation.
    #[error("failed to read {what}")]
    Io {
        /// What was being read when the transport failed.
        what: String,
        /// The underlying transport error.
        #[source]
        source: probe_rs::Error,
    },

    /// The live register cache could not produce the running context's
    /// registers.
    #[error("register cache read failed")]
    RegisterCache(#[source] probe_rs::Error),

    /// Invariant violation; unreachable in a correct build.
    #[error("internal error: {0}")]
    Logic(&'static str),
}

impl RtosError {
    pub(crate) fn io(what: impl Into<String>, source: probe_rs::Error) -> Self {
        Self::Io {
            what: what.into(),
            source,
        }
    }
}
