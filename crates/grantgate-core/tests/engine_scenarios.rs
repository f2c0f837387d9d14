use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use grantgate_core::{
    AuthzEngine, EngineConfig, GrantEvent, TransferExecutor, TransferFailure, TransferReceipt,
    TransferRequest,
};
use grantgate_store::{GrantStore, MemoryGrantStore, SledGrantStore};
use grantgate_types::{
    Address, Allocation, Amount, AuthzError, ChannelId, Coin, Denom, GrantKey, PortId,
    TransferAction,
};

#[derive(Clone, Copy, Debug)]
enum Mode {
    Succeed,
    Fail,
    Hang,
}

/// Transfer executor whose behaviour the test controls
struct ScriptedExecutor {
    mode: Mutex<Mode>,
    delay: Duration,
    performed: AtomicUsize,
}

impl ScriptedExecutor {
    fn new(mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            mode: Mutex::new(mode),
            delay: Duration::ZERO,
            performed: AtomicUsize::new(0),
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            mode: Mutex::new(Mode::Succeed),
            delay,
            performed: AtomicUsize::new(0),
        })
    }

    fn set_mode(&self, mode: Mode) {
        *self.mode.lock().unwrap() = mode;
    }

    fn performed(&self) -> usize {
        self.performed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransferExecutor for ScriptedExecutor {
    async fn perform_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferReceipt, TransferFailure> {
        let mode = *self.mode.lock().unwrap();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match mode {
            Mode::Succeed => {
                self.performed.fetch_add(1, Ordering::SeqCst);
                Ok(TransferReceipt::new(format!("tx-{}", request.request_id)))
            }
            Mode::Fail => Err(TransferFailure::Rejected("counterparty closed".to_string())),
            Mode::Hang => std::future::pending().await,
        }
    }
}

fn addr(s: &str) -> Address {
    Address::parse(s).unwrap()
}

fn stake() -> Denom {
    Denom::parse("stake").unwrap()
}

const GRANTER: &str = "cosmos1granter";
const GRANTEE: &str = "cosmos1grantee";
const RECEIVER: &str = "osmo1receiver";

fn allocation(channel: &str, limit: u64) -> Allocation {
    Allocation::new(
        PortId::parse("transfer").unwrap(),
        ChannelId::parse(channel).unwrap(),
    )
    .with_limit(stake(), limit)
    .allow(addr(RECEIVER))
}

fn transfer(channel: &str, receiver: &str, amount: u64) -> TransferAction {
    TransferAction::new(
        PortId::parse("transfer").unwrap(),
        ChannelId::parse(channel).unwrap(),
        Coin::new(stake(), amount),
        addr(receiver),
    )
}

fn engine_with(executor: Arc<ScriptedExecutor>, config: EngineConfig) -> (AuthzEngine, MemoryGrantStore) {
    let store = MemoryGrantStore::new();
    let engine = AuthzEngine::new(Arc::new(store.clone()), executor, config);
    (engine, store)
}

fn engine(executor: Arc<ScriptedExecutor>) -> (AuthzEngine, MemoryGrantStore) {
    engine_with(executor, EngineConfig::default())
}

async fn remaining(engine: &AuthzEngine) -> Option<Amount> {
    engine
        .get(&addr(GRANTER), &addr(GRANTEE))
        .await
        .unwrap()
        .map(|r| r.grant.authorization.allocations[0].remaining(&stake()))
}

async fn execute(engine: &AuthzEngine, action: TransferAction) -> Result<grantgate_core::ActionOutcome, AuthzError> {
    engine.execute(&addr(GRANTER), &addr(GRANTEE), action).await
}

#[tokio::test]
async fn test_spend_down_to_deletion() {
    let executor = ScriptedExecutor::new(Mode::Succeed);
    let (engine, store) = engine(executor.clone());

    engine
        .grant(addr(GRANTER), addr(GRANTEE), vec![allocation("channel-0", 100)], None)
        .await
        .unwrap();

    let outcome = execute(&engine, transfer("channel-0", RECEIVER, 90)).await.unwrap();
    assert!(!outcome.grant_deleted());
    assert_eq!(remaining(&engine).await, Some(Amount::new(10)));

    let err = execute(&engine, transfer("channel-0", RECEIVER, 20)).await.unwrap_err();
    assert!(matches!(err, AuthzError::InsufficientSpendLimit { .. }));
    assert_eq!(remaining(&engine).await, Some(Amount::new(10)));
    assert_eq!(executor.performed(), 1);

    let outcome = execute(&engine, transfer("channel-0", RECEIVER, 10)).await.unwrap();
    assert!(outcome.grant_deleted());
    assert!(store.is_empty().await);

    let err = execute(&engine, transfer("channel-0", RECEIVER, 1)).await.unwrap_err();
    assert!(matches!(err, AuthzError::NoAuthorization { .. }));
    assert_eq!(executor.performed(), 2);
}

#[tokio::test]
async fn test_expired_grant_is_rejected_and_pruned() {
    let executor = ScriptedExecutor::new(Mode::Succeed);
    let (engine, store) = engine(executor.clone());
    let past = Utc::now() - chrono::Duration::minutes(5);

    engine
        .grant(addr(GRANTER), addr(GRANTEE), vec![allocation("channel-0", 100)], Some(past))
        .await
        .unwrap();

    // Hidden from queries but still stored until touched
    assert!(engine.query(&addr(GRANTER)).await.unwrap().is_empty());
    assert_eq!(store.len().await, 1);

    let err = execute(&engine, transfer("channel-0", RECEIVER, 1)).await.unwrap_err();
    assert!(matches!(err, AuthzError::AuthorizationExpired { .. }));
    assert!(store.is_empty().await);
    assert_eq!(executor.performed(), 0);

    let err = execute(&engine, transfer("channel-0", RECEIVER, 1)).await.unwrap_err();
    assert!(matches!(err, AuthzError::NoAuthorization { .. }));
}

#[tokio::test]
async fn test_failed_transfer_commits_nothing() {
    let executor = ScriptedExecutor::new(Mode::Fail);
    let (engine, store) = engine(executor.clone());

    let granted = engine
        .grant(addr(GRANTER), addr(GRANTEE), vec![allocation("channel-0", 100)], None)
        .await
        .unwrap();

    let err = execute(&engine, transfer("channel-0", RECEIVER, 40)).await.unwrap_err();
    assert!(matches!(err, AuthzError::GuardedActionFailed { .. }));

    let key = GrantKey::new(addr(GRANTER), addr(GRANTEE));
    assert_eq!(store.get(&key).await.unwrap(), Some(granted));
}

#[tokio::test]
async fn test_transfer_timeout_counts_as_failure() {
    let executor = ScriptedExecutor::new(Mode::Hang);
    let config = EngineConfig::default().with_transfer_timeout(Duration::from_millis(50));
    let (engine, _) = engine_with(executor.clone(), config);

    engine
        .grant(addr(GRANTER), addr(GRANTEE), vec![allocation("channel-0", 100)], None)
        .await
        .unwrap();

    let err = execute(&engine, transfer("channel-0", RECEIVER, 40)).await.unwrap_err();
    match err {
        AuthzError::GuardedActionFailed { reason } => assert!(reason.contains("timed out")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(remaining(&engine).await, Some(Amount::new(100)));

    // The pair's lock was released
    executor.set_mode(Mode::Succeed);
    execute(&engine, transfer("channel-0", RECEIVER, 40)).await.unwrap();
    assert_eq!(remaining(&engine).await, Some(Amount::new(60)));
}

#[tokio::test]
async fn test_cancelled_execution_commits_nothing() {
    let executor = ScriptedExecutor::new(Mode::Hang);
    let (engine, _) = engine(executor.clone());

    engine
        .grant(addr(GRANTER), addr(GRANTEE), vec![allocation("channel-0", 100)], None)
        .await
        .unwrap();

    let task = {
        let engine = engine.clone();
        tokio::spawn(async move { execute(&engine, transfer("channel-0", RECEIVER, 40)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    assert_eq!(remaining(&engine).await, Some(Amount::new(100)));

    executor.set_mode(Mode::Succeed);
    execute(&engine, transfer("channel-0", RECEIVER, 100)).await.unwrap();
    assert_eq!(remaining(&engine).await, None);
}

#[tokio::test]
async fn test_regrant_resets_limit() {
    let executor = ScriptedExecutor::new(Mode::Succeed);
    let (engine, _) = engine(executor);

    engine
        .grant(addr(GRANTER), addr(GRANTEE), vec![allocation("channel-0", 100)], None)
        .await
        .unwrap();
    execute(&engine, transfer("channel-0", RECEIVER, 90)).await.unwrap();
    assert_eq!(remaining(&engine).await, Some(Amount::new(10)));

    engine
        .grant(addr(GRANTER), addr(GRANTEE), vec![allocation("channel-0", 50)], None)
        .await
        .unwrap();
    assert_eq!(remaining(&engine).await, Some(Amount::new(50)));
}

#[tokio::test]
async fn test_unknown_recipient_looks_like_unknown_channel() {
    let executor = ScriptedExecutor::new(Mode::Succeed);
    let (engine, _) = engine(executor.clone());

    engine
        .grant(addr(GRANTER), addr(GRANTEE), vec![allocation("channel-0", 100)], None)
        .await
        .unwrap();

    let stranger = execute(&engine, transfer("channel-0", "osmo1stranger", 1)).await.unwrap_err();
    let elsewhere = execute(&engine, transfer("channel-7", RECEIVER, 1)).await.unwrap_err();

    assert_eq!(stranger.error_code(), "NO_MATCHING_ALLOCATION");
    assert_eq!(stranger.error_code(), elsewhere.error_code());
    assert_eq!(stranger.to_string(), elsewhere.to_string());
    assert_eq!(executor.performed(), 0);
}

#[tokio::test]
async fn test_revoked_grant_cannot_be_used() {
    let executor = ScriptedExecutor::new(Mode::Succeed);
    let (engine, _) = engine(executor);

    engine
        .grant(addr(GRANTER), addr(GRANTEE), vec![allocation("channel-0", 100)], None)
        .await
        .unwrap();
    assert!(engine.revoke(&addr(GRANTER), &addr(GRANTEE)).await.unwrap());
    assert!(!engine.revoke(&addr(GRANTER), &addr(GRANTEE)).await.unwrap());

    let err = execute(&engine, transfer("channel-0", RECEIVER, 1)).await.unwrap_err();
    assert!(matches!(err, AuthzError::NoAuthorization { .. }));
}

#[tokio::test]
async fn test_zero_amount_rejected_before_transfer() {
    let executor = ScriptedExecutor::new(Mode::Succeed);
    let (engine, _) = engine(executor.clone());

    engine
        .grant(addr(GRANTER), addr(GRANTEE), vec![allocation("channel-0", 100)], None)
        .await
        .unwrap();

    let err = execute(&engine, transfer("channel-0", RECEIVER, 0)).await.unwrap_err();
    assert!(matches!(err, AuthzError::InvalidAction { .. }));
    assert_eq!(executor.performed(), 0);
}

#[tokio::test]
async fn test_other_allocations_untouched() {
    let executor = ScriptedExecutor::new(Mode::Succeed);
    let (engine, _) = engine(executor);

    engine
        .grant(
            addr(GRANTER),
            addr(GRANTEE),
            vec![allocation("channel-0", 100), allocation("channel-1", 30)],
            None,
        )
        .await
        .unwrap();

    let outcome = execute(&engine, transfer("channel-1", RECEIVER, 30)).await.unwrap();
    let record = outcome.remaining.unwrap();
    assert_eq!(record.grant.authorization.allocations, vec![allocation("channel-0", 100)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_executions_never_overspend() {
    let executor = ScriptedExecutor::slow(Duration::from_millis(2));
    let (engine, store) = engine(executor.clone());

    engine
        .grant(addr(GRANTER), addr(GRANTEE), vec![allocation("channel-0", 100)], None)
        .await
        .unwrap();

    let tasks: Vec<_> = (0..25)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { execute(&engine, transfer("channel-0", RECEIVER, 10)).await })
        })
        .collect();

    let results = futures::future::join_all(tasks).await;
    let succeeded = results
        .into_iter()
        .map(|joined| joined.unwrap())
        .filter(|result| result.is_ok())
        .count();

    assert_eq!(succeeded, 10);
    assert_eq!(executor.performed(), 10);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_events_follow_grant_lifecycle() {
    let executor = ScriptedExecutor::new(Mode::Succeed);
    let (engine, _) = engine(executor.clone());
    let mut events = engine.subscribe();

    engine
        .grant(addr(GRANTER), addr(GRANTEE), vec![allocation("channel-0", 10)], None)
        .await
        .unwrap();
    executor.set_mode(Mode::Fail);
    execute(&engine, transfer("channel-0", RECEIVER, 5)).await.unwrap_err();
    executor.set_mode(Mode::Succeed);
    execute(&engine, transfer("channel-0", RECEIVER, 10)).await.unwrap();

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(event.kind());
    }
    assert_eq!(kinds, vec!["granted", "execution_failed", "executed", "depleted"]);
}

#[tokio::test]
async fn test_expiry_event_on_prune() {
    let executor = ScriptedExecutor::new(Mode::Succeed);
    let (engine, _) = engine(executor);
    let mut events = engine.subscribe();
    let now = Utc::now();

    engine
        .grant(
            addr(GRANTER),
            addr(GRANTEE),
            vec![allocation("channel-0", 10)],
            Some(now - chrono::Duration::seconds(1)),
        )
        .await
        .unwrap();

    let pruned = engine.prune_expired(now).await.unwrap();
    assert_eq!(pruned.len(), 1);

    let _granted = events.recv().await.unwrap();
    match events.recv().await.unwrap() {
        GrantEvent::Expired { granter, grantee, .. } => {
            assert_eq!(granter, GRANTER);
            assert_eq!(grantee, GRANTEE);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_grantee_query_spans_granters() {
    let executor = ScriptedExecutor::new(Mode::Succeed);
    let (engine, _) = engine(executor);

    for granter in ["cosmos1alice", "cosmos1bob"] {
        engine
            .grant(addr(granter), addr(GRANTEE), vec![allocation("channel-0", 10)], None)
            .await
            .unwrap();
    }

    let held = engine.query_grantee(&addr(GRANTEE)).await.unwrap();
    assert_eq!(held.len(), 2);
    assert!(engine.query(&addr("cosmos1alice")).await.unwrap().len() == 1);
}

#[tokio::test]
async fn test_sled_backed_engine_keeps_decrements() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grants");
    let executor = ScriptedExecutor::new(Mode::Succeed);

    {
        let store: Arc<dyn GrantStore> = Arc::new(SledGrantStore::open(&path).unwrap());
        let engine = AuthzEngine::new(store, executor.clone(), EngineConfig::default());
        engine
            .grant(addr(GRANTER), addr(GRANTEE), vec![allocation("channel-0", 100)], None)
            .await
            .unwrap();
        execute(&engine, transfer("channel-0", RECEIVER, 25)).await.unwrap();
    }

    let store: Arc<dyn GrantStore> = Arc::new(SledGrantStore::open(&path).unwrap());
    let engine = AuthzEngine::new(store, executor, EngineConfig::default());
    assert_eq!(remaining(&engine).await, Some(Amount::new(75)));
}
