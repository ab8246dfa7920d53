/// Errors raised by grammar construction, grammar operations and the
/// recompression engine.
///
/// All variants are contract violations detected eagerly; none of them is
/// transient, so callers should not retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    /// A structural invariant does not hold: a non-terminal with several
    /// rules, a reference to a non-terminal without a rule, or a cycle.
    #[error("malformed grammar: {reason}")]
    MalformedGrammar { reason: String },

    /// The operation needs a singleton (or otherwise suitable) grammar.
    #[error("invalid operation: {reason}")]
    InvalidOperation { reason: String },

    /// A result was queried before the engine reached its final state.
    #[error("result not ready: {reason}")]
    NotReady { reason: String },
}

impl GrammarError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        GrammarError::MalformedGrammar {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        GrammarError::InvalidOperation {
            reason: reason.into(),
        }
    }

    pub(crate) fn not_ready(reason: impl Into<String>) -> Self {
        GrammarError::NotReady {
            reason: reason.into(),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, GrammarError>;
