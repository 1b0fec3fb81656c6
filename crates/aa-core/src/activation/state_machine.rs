//! Activation state machine.
//!
//! Defines a pure state transition function for the activation workflow.
//! Remote calls and presentation requests come out as [`ActivationAction`]s
//! that the orchestrator executes.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::activation::{
    AccountActivationResponse, ActivatedAccount, ActivationError, ActivationStatus,
    ActivationSubmission, LinkedAccount, Outcome,
};
use crate::code::is_complete;
use crate::request::{looks_like_phone_number, ActivationMode, ActivationRequest};

/// Activation workflow state.
///
/// 激活流程状态。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationState {
    /// Waiting for the first code.
    ///
    /// 等待输入验证码。
    Idle,
    /// One remote call is in flight.
    ///
    /// 请求进行中。
    Submitting {
        attempt: u64,
        submission: ActivationSubmission,
    },
    /// Account activated. Absorbing.
    Activated,
    /// Alias attached to the stored account. Absorbing.
    LinkEstablished,
    /// Service rejected the code. Retryable.
    InvalidCode,
    /// Service could not be reached or failed. Retryable.
    ServiceUnavailable,
}

impl ActivationState {
    pub fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting { .. })
    }

    /// Absorbing states end the workflow; the instance is not reused.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Activated | Self::LinkEstablished)
    }

    pub fn in_flight_attempt(&self) -> Option<u64> {
        match self {
            Self::Submitting { attempt, .. } => Some(*attempt),
            _ => None,
        }
    }
}

/// Events that drive the activation flow.
///
/// 驱动激活流程的事件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationEvent {
    /// User submits a code.
    ///
    /// `linked_account` is resolved by the orchestrator for link mode.
    SubmitCode {
        attempt: u64,
        code: String,
        linked_account: Option<LinkedAccount>,
    },
    /// Account activation answered (network).
    AccountActivationResponded { response: AccountActivationResponse },
    /// Alias activation answered (network).
    ///
    /// `derived_prefix` is filled by the orchestrator when the alias was activated.
    AliasActivationResponded {
        status: ActivationStatus,
        derived_prefix: Option<String>,
    },
}

/// Side-effects produced by state transitions.
///
/// 状态迁移产生的副作用。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationAction {
    SetSubmitEnabled {
        enabled: bool,
    },
    ActivateAccount {
        attempt: u64,
        submission: ActivationSubmission,
    },
    ActivateAlias {
        attempt: u64,
        submission: ActivationSubmission,
    },
    RequestLogin {
        account: ActivatedAccount,
    },
    Notify {
        outcome: Outcome,
    },
    RequestVerificationFlow {
        identity: String,
    },
    RequestFallbackLoginFlow {
        phone: String,
        dial_code: String,
    },
    PersistDerivedPrefix {
        account_index: u32,
        prefix: String,
    },
    ClearLinkReminderTimer,
}

/// Knobs that change how transitions behave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationPolicy {
    pub required_code_length: usize,
    /// Drop failed alias responses without an outcome, as older clients did.
    pub legacy_alias_failure_drop: bool,
}

/// Pure activation state machine bound to one request.
///
/// 纯状态机：不包含副作用。
#[derive(Debug, Clone)]
pub struct ActivationStateMachine {
    policy: ActivationPolicy,
    request: ActivationRequest,
}

impl ActivationStateMachine {
    pub fn new(policy: ActivationPolicy, request: ActivationRequest) -> Self {
        Self { policy, request }
    }

    pub fn request(&self) -> &ActivationRequest {
        &self.request
    }

    pub fn policy(&self) -> &ActivationPolicy {
        &self.policy
    }

    /// Checks whether `code` may be submitted from `state`.
    pub fn check_submit(&self, state: &ActivationState, code: &str) -> Result<(), ActivationError> {
        if state.is_submitting() {
            return Err(ActivationError::AlreadyInProgress);
        }
        if state.is_finished() {
            return Err(ActivationError::Finished);
        }
        let expected = self.policy.required_code_length;
        if !is_complete(code, expected) {
            return Err(ActivationError::InvalidArgument {
                expected,
                actual: code.chars().count(),
            });
        }
        Ok(())
    }

    pub fn transition(
        &self,
        state: ActivationState,
        event: ActivationEvent,
    ) -> Result<(ActivationState, Vec<ActivationAction>), ActivationError> {
        let is_link = matches!(self.request.mode(), ActivationMode::Link { .. });
        match (state, event) {
            (
                state,
                ActivationEvent::SubmitCode {
                    attempt,
                    code,
                    linked_account,
                },
            ) => {
                self.check_submit(&state, &code)?;
                self.submit(attempt, code, linked_account)
            }
            (
                ActivationState::Submitting { submission, .. },
                ActivationEvent::AccountActivationResponded { response },
            ) if !is_link => Ok(self.account_responded(submission, response)),
            (
                ActivationState::Submitting { .. },
                ActivationEvent::AliasActivationResponded {
                    status,
                    derived_prefix,
                },
            ) if is_link => Ok(self.alias_responded(status, derived_prefix)),
            (state, event) => {
                warn!(state = ?state, event = ?event, "activation response without matching request");
                Err(ActivationError::UnexpectedResponse)
            }
        }
    }

    fn submit(
        &self,
        attempt: u64,
        code: String,
        linked_account: Option<LinkedAccount>,
    ) -> Result<(ActivationState, Vec<ActivationAction>), ActivationError> {
        let phone = self.request.canonical_phone();
        let (submission, dispatch) = match self.request.mode() {
            ActivationMode::Link { account_index } => {
                // The alias belongs to the stored account, not to the identity typed earlier.
                let account =
                    linked_account.ok_or(ActivationError::LinkedAccountNotFound(account_index))?;
                let submission = ActivationSubmission {
                    username: account.username,
                    ha1: account.ha1,
                    phone,
                    activation_code: code,
                };
                let dispatch = ActivationAction::ActivateAlias {
                    attempt,
                    submission: submission.clone(),
                };
                (submission, dispatch)
            }
            ActivationMode::Normal | ActivationMode::Recover => {
                let submission = ActivationSubmission {
                    username: self.request.activation_subject(),
                    ha1: None,
                    phone,
                    activation_code: code,
                };
                let dispatch = ActivationAction::ActivateAccount {
                    attempt,
                    submission: submission.clone(),
                };
                (submission, dispatch)
            }
        };

        Ok((
            ActivationState::Submitting {
                attempt,
                submission,
            },
            vec![
                ActivationAction::SetSubmitEnabled { enabled: false },
                dispatch,
            ],
        ))
    }

    fn account_responded(
        &self,
        submission: ActivationSubmission,
        response: AccountActivationResponse,
    ) -> (ActivationState, Vec<ActivationAction>) {
        match response.status {
            ActivationStatus::Activated => {
                let identity = response
                    .identity
                    .filter(|identity| !identity.trim().is_empty())
                    .unwrap_or_else(|| submission.username.clone());
                let is_username = !looks_like_phone_number(&identity);
                let mut actions = vec![
                    ActivationAction::SetSubmitEnabled { enabled: true },
                    ActivationAction::RequestLogin {
                        account: ActivatedAccount {
                            username: submission.username,
                            phone: submission.phone,
                            ha1: submission.ha1,
                        },
                    },
                    ActivationAction::Notify {
                        outcome: Outcome::Activated {
                            identity: identity.clone(),
                            is_username,
                        },
                    },
                ];
                if !self.request.is_recovering() {
                    actions.push(ActivationAction::RequestVerificationFlow { identity });
                }
                (ActivationState::Activated, actions)
            }
            ActivationStatus::RequestFailed => (
                ActivationState::ServiceUnavailable,
                vec![
                    ActivationAction::SetSubmitEnabled { enabled: true },
                    ActivationAction::Notify {
                        outcome: Outcome::ServiceUnavailable,
                    },
                ],
            ),
            ActivationStatus::Other(_) => (
                ActivationState::InvalidCode,
                vec![
                    ActivationAction::SetSubmitEnabled { enabled: true },
                    ActivationAction::Notify {
                        outcome: Outcome::InvalidCode,
                    },
                    ActivationAction::RequestFallbackLoginFlow {
                        phone: self.request.phone_number().to_string(),
                        dial_code: self.request.dial_code().to_string(),
                    },
                ],
            ),
        }
    }

    fn alias_responded(
        &self,
        status: ActivationStatus,
        derived_prefix: Option<String>,
    ) -> (ActivationState, Vec<ActivationAction>) {
        let Some(account_index) = self.request.linked_account_index() else {
            return (ActivationState::Idle, Vec::new());
        };

        if status.is_activated() {
            let prefix = derived_prefix.unwrap_or_default();
            return (
                ActivationState::LinkEstablished,
                vec![
                    ActivationAction::PersistDerivedPrefix {
                        account_index,
                        prefix: prefix.clone(),
                    },
                    ActivationAction::ClearLinkReminderTimer,
                    ActivationAction::Notify {
                        outcome: Outcome::LinkEstablished {
                            derived_prefix: prefix,
                        },
                    },
                ],
            );
        }

        if self.policy.legacy_alias_failure_drop {
            warn!(%status, account_index, "alias activation failed, dropping response");
            return (ActivationState::Idle, Vec::new());
        }

        let (state, outcome) = match status {
            ActivationStatus::RequestFailed => {
                (ActivationState::ServiceUnavailable, Outcome::ServiceUnavailable)
            }
            _ => (ActivationState::InvalidCode, Outcome::InvalidCode),
        };
        (
            state,
            vec![
                ActivationAction::SetSubmitEnabled { enabled: true },
                ActivationAction::Notify { outcome },
            ],
        )
    }
}
