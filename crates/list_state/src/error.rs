use thiserror::Error;

/// Errors a caller can provoke synchronously through a controller operation.
///
/// Fetch failures are not represented here; they live in the list state as
/// `ListStatus::Failed` plus a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListError {
    #[error("invalid argument `{argument}`: {reason}")]
    InvalidArgument {
        argument: &'static str,
        reason: String,
    },
}

impl ListError {
    pub(crate) fn invalid(argument: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument,
            reason: reason.into(),
        }
    }
}
