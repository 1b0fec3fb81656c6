use thiserror::Error;

/// Activation workflow errors reported synchronously to the caller.
///
/// 激活流程同步错误。远端失败不在此列，通过 [`crate::Outcome`] 投递。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivationError {
    #[error("activation code must be {expected} characters, got {actual}")]
    InvalidArgument { expected: usize, actual: usize },

    #[error("an activation request is already in flight")]
    AlreadyInProgress,

    #[error("activation workflow already finished")]
    Finished,

    #[error("no stored account at index {0}")]
    LinkedAccountNotFound(u32),

    #[error("no activation request is in flight")]
    UnexpectedResponse,
}
