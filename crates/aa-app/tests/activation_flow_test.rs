use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use aa_app::{ActivationPorts, ActivationWorkflow, DisposableOutcomeSink, WorkflowError};
use aa_core::ports::{AccountCreatorPort, LinkedAccountStorePort, OutcomeSinkPort};
use aa_core::{
    AccountActivationResponse, ActivatedAccount, ActivationConfig, ActivationError,
    ActivationMode, ActivationRequest, ActivationState, ActivationStatus, ActivationSubmission,
    Outcome,
};
use aa_infra::linked_accounts::StoredAccount;
use aa_infra::{DialPlanPhoneNumbers, FileLinkedAccountStore};
use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::{mpsc, Notify};

static TRACE_INIT: Once = Once::new();

fn init_tracing() {
    TRACE_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone, PartialEq)]
enum SinkEvent {
    Enabled(bool),
    Login(ActivatedAccount),
    Notify(Outcome),
    Verify(String),
    Fallback(String, String),
    Prefix(u32, String),
    ClearReminder,
}

/// Forwards every sink call to a channel and applies store requests the way
/// the console front end does.
struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
    store: Arc<FileLinkedAccountStore>,
}

#[async_trait]
impl OutcomeSinkPort for ChannelSink {
    async fn notify(&self, outcome: Outcome) {
        let _ = self.tx.send(SinkEvent::Notify(outcome));
    }

    async fn submit_enabled_changed(&self, enabled: bool) {
        let _ = self.tx.send(SinkEvent::Enabled(enabled));
    }

    async fn request_login(&self, account: ActivatedAccount) {
        let _ = self.tx.send(SinkEvent::Login(account));
    }

    async fn request_verification_flow(&self, identity: String) {
        let _ = self.tx.send(SinkEvent::Verify(identity));
    }

    async fn request_fallback_login_flow(&self, phone: String, dial_code: String) {
        let _ = self.tx.send(SinkEvent::Fallback(phone, dial_code));
    }

    async fn persist_derived_prefix(&self, account_index: u32, prefix: String) {
        self.store.set_prefix(account_index, &prefix).await.unwrap();
        let _ = self.tx.send(SinkEvent::Prefix(account_index, prefix));
    }

    async fn clear_link_reminder_timer(&self) {
        self.store.clear_link_reminder().await.unwrap();
        let _ = self.tx.send(SinkEvent::ClearReminder);
    }
}

enum Reply {
    Account(AccountActivationResponse),
    Alias(ActivationStatus),
    TransportError,
}

/// Account service answering from a script and recording what it was sent.
#[derive(Default)]
struct ScriptedAccountCreator {
    replies: Mutex<VecDeque<Reply>>,
    submissions: Mutex<Vec<ActivationSubmission>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedAccountCreator {
    fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    fn gated(replies: Vec<Reply>, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(replies)
        }
    }

    fn submissions(&self) -> Vec<ActivationSubmission> {
        self.submissions.lock().unwrap().clone()
    }

    async fn next_reply(&self, submission: &ActivationSubmission) -> Reply {
        self.submissions.lock().unwrap().push(submission.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted reply left")
    }
}

#[async_trait]
impl AccountCreatorPort for ScriptedAccountCreator {
    async fn activate_account(
        &self,
        submission: &ActivationSubmission,
    ) -> anyhow::Result<AccountActivationResponse> {
        match self.next_reply(submission).await {
            Reply::Account(response) => Ok(response),
            Reply::TransportError => Err(anyhow::anyhow!("connection reset")),
            Reply::Alias(_) => panic!("alias reply scripted for account activation"),
        }
    }

    async fn activate_alias(
        &self,
        submission: &ActivationSubmission,
    ) -> anyhow::Result<ActivationStatus> {
        match self.next_reply(submission).await {
            Reply::Alias(status) => Ok(status),
            Reply::TransportError => Err(anyhow::anyhow!("connection reset")),
            Reply::Account(_) => panic!("account reply scripted for alias activation"),
        }
    }
}

struct Harness {
    workflow: ActivationWorkflow,
    creator: Arc<ScriptedAccountCreator>,
    store: Arc<FileLinkedAccountStore>,
    sink: Arc<DisposableOutcomeSink>,
    events: mpsc::UnboundedReceiver<SinkEvent>,
    _temp_dir: TempDir,
}

impl Harness {
    async fn new(request: ActivationRequest, creator: ScriptedAccountCreator) -> Self {
        Self::with_config(request, creator, config()).await
    }

    async fn with_config(
        request: ActivationRequest,
        creator: ScriptedAccountCreator,
        config: ActivationConfig,
    ) -> Self {
        init_tracing();
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(FileLinkedAccountStore::with_defaults(temp_dir.path()));
        store
            .save_account(
                2,
                StoredAccount {
                    username: "bob".to_string(),
                    ha1: Some("bob-ha1".to_string()),
                    prefix: None,
                },
            )
            .await
            .unwrap();
        store.set_link_reminder("1700000000").await.unwrap();

        let (tx, events) = mpsc::unbounded_channel();
        let sink = Arc::new(DisposableOutcomeSink::new(Arc::new(ChannelSink {
            tx,
            store: store.clone(),
        })));
        let creator = Arc::new(creator);
        let ports = ActivationPorts {
            account_creator: creator.clone(),
            outcome_sink: sink.clone(),
            linked_accounts: store.clone(),
            phone_numbers: Arc::new(DialPlanPhoneNumbers),
        };

        Self {
            workflow: ActivationWorkflow::new(request, &config, ports),
            creator,
            store,
            sink,
            events,
            _temp_dir: temp_dir,
        }
    }

    /// Collects sink events up to and including the next outcome.
    async fn until_outcome(&mut self) -> Vec<SinkEvent> {
        let mut seen = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), self.events.recv())
                .await
                .expect("timed out waiting for outcome")
                .expect("sink channel closed");
            let done = matches!(event, SinkEvent::Notify(_));
            seen.push(event);
            if done {
                return seen;
            }
        }
    }

    async fn wait_for_state(&self, expected: ActivationState) {
        for _ in 0..500 {
            if self.workflow.state().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "workflow never reached {expected:?}, last state {:?}",
            self.workflow.state().await
        );
    }
}

fn config() -> ActivationConfig {
    ActivationConfig {
        code_length: 4,
        response_timeout_secs: 5,
        ..ActivationConfig::default()
    }
}

fn normal_request() -> ActivationRequest {
    ActivationRequest::new(
        Some("alice".to_string()),
        "5551234",
        "+1",
        ActivationMode::Normal,
    )
    .unwrap()
}

fn link_request() -> ActivationRequest {
    ActivationRequest::new(
        None,
        "+33612345678",
        "33",
        ActivationMode::Link { account_index: 2 },
    )
    .unwrap()
}

#[tokio::test]
async fn normal_activation_logs_in_and_requests_verification() {
    let creator = ScriptedAccountCreator::new(vec![Reply::Account(
        AccountActivationResponse::new(ActivationStatus::Activated, Some("alice".to_string())),
    )]);
    let mut harness = Harness::new(normal_request(), creator).await;

    harness.workflow.submit_code("1234").await.unwrap();
    let events = harness.until_outcome().await;
    let trailing = harness.events.recv().await.unwrap();

    assert_eq!(
        events,
        vec![
            SinkEvent::Enabled(false),
            SinkEvent::Enabled(true),
            SinkEvent::Login(ActivatedAccount {
                username: "alice".to_string(),
                phone: "+15551234".to_string(),
                ha1: None,
            }),
            SinkEvent::Notify(Outcome::Activated {
                identity: "alice".to_string(),
                is_username: true,
            }),
        ]
    );
    assert_eq!(trailing, SinkEvent::Verify("alice".to_string()));
    assert_eq!(
        harness.creator.submissions(),
        vec![ActivationSubmission {
            username: "alice".to_string(),
            ha1: None,
            phone: "+15551234".to_string(),
            activation_code: "1234".to_string(),
        }]
    );
    assert_eq!(harness.workflow.state().await, ActivationState::Activated);
}

#[tokio::test]
async fn recovery_by_phone_skips_verification() {
    let request =
        ActivationRequest::new(None, "5551234", "1", ActivationMode::Recover).unwrap();
    let creator = ScriptedAccountCreator::new(vec![Reply::Account(
        AccountActivationResponse::new(ActivationStatus::Activated, None),
    )]);
    let mut harness = Harness::new(request, creator).await;

    harness.workflow.submit_code("9876").await.unwrap();
    let events = harness.until_outcome().await;

    assert_eq!(
        events.last(),
        Some(&SinkEvent::Notify(Outcome::Activated {
            identity: "+15551234".to_string(),
            is_username: false,
        }))
    );
    harness.wait_for_state(ActivationState::Activated).await;
    assert!(harness.events.try_recv().is_err());
}

#[tokio::test]
async fn wrong_code_offers_fallback_and_allows_retry() {
    let creator = ScriptedAccountCreator::new(vec![
        Reply::Account(AccountActivationResponse::new(
            ActivationStatus::Other("ERROR_KEY_DOESNT_MATCH".to_string()),
            None,
        )),
        Reply::Account(AccountActivationResponse::new(
            ActivationStatus::Activated,
            Some("alice".to_string()),
        )),
    ]);
    let mut harness = Harness::new(normal_request(), creator).await;

    harness.workflow.submit_code("0000").await.unwrap();
    let events = harness.until_outcome().await;
    assert_eq!(events.last(), Some(&SinkEvent::Notify(Outcome::InvalidCode)));
    let fallback = harness.events.recv().await.unwrap();
    assert_eq!(
        fallback,
        SinkEvent::Fallback("5551234".to_string(), "+1".to_string())
    );
    assert_eq!(harness.workflow.state().await, ActivationState::InvalidCode);

    harness.workflow.submit_code("1234").await.unwrap();
    let events = harness.until_outcome().await;

    assert!(matches!(
        events.last(),
        Some(SinkEvent::Notify(Outcome::Activated { .. }))
    ));
    let codes: Vec<_> = harness
        .creator
        .submissions()
        .into_iter()
        .map(|submission| submission.activation_code)
        .collect();
    assert_eq!(codes, vec!["0000", "1234"]);
}

#[tokio::test]
async fn transport_failure_is_service_unavailable_and_retryable() {
    let creator = ScriptedAccountCreator::new(vec![
        Reply::TransportError,
        Reply::Account(AccountActivationResponse::new(
            ActivationStatus::Activated,
            Some("alice".to_string()),
        )),
    ]);
    let mut harness = Harness::new(normal_request(), creator).await;

    harness.workflow.submit_code("1234").await.unwrap();
    let events = harness.until_outcome().await;
    assert_eq!(
        events,
        vec![
            SinkEvent::Enabled(false),
            SinkEvent::Enabled(true),
            SinkEvent::Notify(Outcome::ServiceUnavailable),
        ]
    );
    assert!(Outcome::ServiceUnavailable.is_retryable());

    harness.workflow.submit_code("1234").await.unwrap();
    let events = harness.until_outcome().await;

    assert!(matches!(
        events.last(),
        Some(SinkEvent::Notify(Outcome::Activated { .. }))
    ));
}

#[tokio::test]
async fn link_activation_persists_prefix_and_clears_reminder() {
    let creator = ScriptedAccountCreator::new(vec![Reply::Alias(ActivationStatus::Activated)]);
    let mut harness = Harness::new(link_request(), creator).await;

    harness.workflow.submit_code("4242").await.unwrap();
    let events = harness.until_outcome().await;

    assert_eq!(
        events,
        vec![
            SinkEvent::Enabled(false),
            SinkEvent::Prefix(2, "33".to_string()),
            SinkEvent::ClearReminder,
            SinkEvent::Notify(Outcome::LinkEstablished {
                derived_prefix: "33".to_string(),
            }),
        ]
    );
    assert_eq!(
        harness.creator.submissions(),
        vec![ActivationSubmission {
            username: "bob".to_string(),
            ha1: Some("bob-ha1".to_string()),
            phone: "+33612345678".to_string(),
            activation_code: "4242".to_string(),
        }]
    );

    let stored = harness.store.stored_account(2).await.unwrap().unwrap();
    assert_eq!(stored.prefix.as_deref(), Some("33"));
    assert_eq!(harness.store.link_reminder().await.unwrap(), None);
    assert_eq!(
        harness.workflow.state().await,
        ActivationState::LinkEstablished
    );
}

#[tokio::test]
async fn link_failure_reports_invalid_code() {
    let creator = ScriptedAccountCreator::new(vec![Reply::Alias(ActivationStatus::Other(
        "ERROR_ALIAS_DOESNT_EXIST".to_string(),
    ))]);
    let mut harness = Harness::new(link_request(), creator).await;

    harness.workflow.submit_code("4242").await.unwrap();
    let events = harness.until_outcome().await;

    assert_eq!(events.last(), Some(&SinkEvent::Notify(Outcome::InvalidCode)));
    let stored = harness.store.stored_account(2).await.unwrap().unwrap();
    assert_eq!(stored.prefix, None);
}

#[tokio::test]
async fn legacy_mode_drops_failed_link_silently() {
    let creator = ScriptedAccountCreator::new(vec![Reply::Alias(ActivationStatus::Other(
        "ERROR_ALIAS_DOESNT_EXIST".to_string(),
    ))]);
    let config = ActivationConfig {
        legacy_alias_failure_drop: true,
        ..config()
    };
    let mut harness = Harness::with_config(link_request(), creator, config).await;

    harness.workflow.submit_code("4242").await.unwrap();
    assert_eq!(harness.events.recv().await.unwrap(), SinkEvent::Enabled(false));
    harness.wait_for_state(ActivationState::Idle).await;

    assert!(harness.events.try_recv().is_err());
    assert_eq!(harness.creator.submissions().len(), 1);
}

#[tokio::test]
async fn second_submit_while_in_flight_is_rejected() {
    let gate = Arc::new(Notify::new());
    let creator = ScriptedAccountCreator::gated(
        vec![Reply::Account(AccountActivationResponse::new(
            ActivationStatus::Activated,
            Some("alice".to_string()),
        ))],
        gate.clone(),
    );
    let mut harness = Harness::new(normal_request(), creator).await;

    harness.workflow.submit_code("1234").await.unwrap();
    let err = harness.workflow.submit_code("1234").await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Activation(ActivationError::AlreadyInProgress)
    ));

    gate.notify_one();
    let events = harness.until_outcome().await;

    assert!(matches!(
        events.last(),
        Some(SinkEvent::Notify(Outcome::Activated { .. }))
    ));
    assert_eq!(harness.creator.submissions().len(), 1);

    let err = harness.workflow.submit_code("1234").await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Activation(ActivationError::Finished)
    ));
}

#[tokio::test]
async fn disposed_screen_receives_nothing_and_store_is_untouched() {
    let gate = Arc::new(Notify::new());
    let creator =
        ScriptedAccountCreator::gated(vec![Reply::Alias(ActivationStatus::Activated)], gate.clone());
    let mut harness = Harness::new(link_request(), creator).await;

    harness.workflow.submit_code("4242").await.unwrap();
    assert_eq!(harness.events.recv().await.unwrap(), SinkEvent::Enabled(false));

    harness.sink.dispose();
    gate.notify_one();
    harness
        .wait_for_state(ActivationState::LinkEstablished)
        .await;

    assert!(harness.events.try_recv().is_err());
    let stored = harness.store.stored_account(2).await.unwrap().unwrap();
    assert_eq!(stored.prefix, None);
    assert_eq!(
        harness.store.link_reminder().await.unwrap().as_deref(),
        Some("1700000000")
    );
}

#[tokio::test]
async fn short_code_never_reaches_the_service() {
    let mut harness = Harness::new(normal_request(), ScriptedAccountCreator::default()).await;

    assert!(!harness.workflow.code_changed("123").await);
    let err = harness.workflow.submit_code("123").await.unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::Activation(ActivationError::InvalidArgument {
            expected: 4,
            actual: 3
        })
    ));
    assert_eq!(harness.events.recv().await.unwrap(), SinkEvent::Enabled(false));
    assert!(harness.events.try_recv().is_err());
    assert!(harness.creator.submissions().is_empty());
}

#[tokio::test]
async fn settled_screen_has_every_follow_up_before_dispose() {
    let creator = ScriptedAccountCreator::new(vec![Reply::Account(
        AccountActivationResponse::new(ActivationStatus::Activated, Some("alice".to_string())),
    )]);
    let mut harness = Harness::new(normal_request(), creator).await;

    harness.workflow.submit_code("1234").await.unwrap();
    harness.until_outcome().await;
    harness.workflow.settled().await;
    harness.sink.dispose();

    assert_eq!(
        harness.events.try_recv().unwrap(),
        SinkEvent::Verify("alice".to_string())
    );
    assert!(harness.events.try_recv().is_err());
}
