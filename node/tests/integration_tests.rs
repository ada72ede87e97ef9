//! Cross-crate scenarios: ledger logic over both backends, and the node
//! façade end to end on the in-memory backend.

use std::sync::Arc;

use fedchain_crypto::keypair_from_seed;
use fedchain_ledger::{
    create_block, create_vote, get_last_voted_block, init_genesis, AdmissionValidator,
    BacklogManager, LedgerError,
};
use fedchain_node::node::default_registry;
use fedchain_node::{api, FedNode, NodeConfig};
use fedchain_nullables::{NullClock, NullRandom, NullStore};
use fedchain_store::{
    BackendKind, BacklogStore, BlockStore, LedgerStore, RetryPolicy, StoreError, TransactionIndex,
    VoteStore,
};
use fedchain_store_lmdb::LmdbStore;
use fedchain_transactions::{create, sign_transaction, to_inputs, transfer, OutputSpec};
use fedchain_types::{Block, BlockId, KeyPair, Operation, Timestamp, Transaction, TxId};
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Run `check` once against each backend.
fn each_backend(check: impl Fn(Arc<dyn LedgerStore>)) {
    check(Arc::new(NullStore::new()));

    let dir = tempfile::tempdir().expect("temp dir");
    let lmdb = LmdbStore::new(dir.path().join("ledger"), 64 * 1024 * 1024, RetryPolicy::immediate(1));
    check(Arc::new(lmdb));
}

fn mint(owner: &KeyPair, amount: u64) -> Transaction {
    let tx = create(
        vec![owner.public],
        vec![OutputSpec::new(vec![owner.public], amount)],
        None,
        None,
    )
    .unwrap();
    sign_transaction(tx, &[owner])
}

fn pay(from: &Transaction, owner: &KeyPair, to: &KeyPair, amount: u64) -> Transaction {
    let tx = transfer(
        to_inputs(from, None),
        vec![OutputSpec::new(vec![to.public], amount)],
        from.asset_id().unwrap(),
        None,
    )
    .unwrap();
    sign_transaction(tx, &[owner])
}

/// Write `txs` in a block signed by `node` and record `node`'s vote on it.
fn commit(
    store: &dyn LedgerStore,
    node: &KeyPair,
    previous: BlockId,
    txs: Vec<Transaction>,
    ts: u64,
) -> Block {
    let block = create_block(txs, node, vec![node.public], Timestamp::new(ts)).unwrap();
    assert!(store.write_block(&block).unwrap());
    let vote = create_vote(node, block.id, previous, None, Timestamp::new(ts)).unwrap();
    store.write_vote(&vote).unwrap();
    block
}

fn collect<T>(iter: fedchain_store::QueryIter<T>) -> Vec<T> {
    iter.collect::<Result<_, _>>().unwrap()
}

// ---------------------------------------------------------------------------
// 1. Store semantics on both backends
// ---------------------------------------------------------------------------

#[test]
fn duplicate_writes_leave_one_record() {
    each_backend(|store| {
        let node = keypair_from_seed(&[1; 32]);
        let backlog = BacklogManager::with_rng(
            Arc::clone(&store),
            vec![node.public],
            30,
            NullRandom::constant(0),
        );
        let tx = mint(&node, 5);
        assert!(backlog.insert(tx.clone(), Timestamp::new(1)).unwrap());
        assert!(!backlog.insert(tx.clone(), Timestamp::new(2)).unwrap());
        assert_eq!(store.count_backlog().unwrap(), 1);

        let block = create_block(vec![tx], &node, vec![node.public], Timestamp::new(3)).unwrap();
        assert!(store.write_block(&block).unwrap());
        assert!(!store.write_block(&block).unwrap());
        assert_eq!(store.count_blocks().unwrap(), 1);
    });
}

#[test]
fn block_round_trip() {
    each_backend(|store| {
        let node = keypair_from_seed(&[1; 32]);
        let txs = vec![mint(&node, 1), mint(&node, 2)];
        let block = create_block(txs, &node, vec![node.public], Timestamp::new(9)).unwrap();
        store.write_block(&block).unwrap();

        let read = store.get_block(&block.id).unwrap().expect("block written");
        assert_eq!(read, block);
        assert_eq!(read.tx_ids().collect::<Vec<_>>(), block.tx_ids().collect::<Vec<_>>());
        assert!(store.get_block(&BlockId::new([0xEE; 32])).unwrap().is_none());
    });
}

#[test]
fn get_spent_finds_exactly_the_spender() {
    each_backend(|store| {
        let alice = keypair_from_seed(&[2; 32]);
        let bob = keypair_from_seed(&[3; 32]);
        let minted = mint(&alice, 10);
        let payment = pay(&minted, &alice, &bob, 10);
        commit(&*store, &alice, BlockId::ZERO, vec![minted.clone()], 1);

        assert!(collect(store.get_spent(&minted.id, 0).unwrap()).is_empty());

        let block = create_block(vec![payment.clone()], &alice, vec![alice.public], Timestamp::new(2))
            .unwrap();
        store.write_block(&block).unwrap();

        let spenders = collect(store.get_spent(&minted.id, 0).unwrap());
        assert_eq!(spenders.len(), 1);
        assert_eq!(spenders[0].id, payment.id);
        assert!(collect(store.get_spent(&minted.id, 1).unwrap()).is_empty());
    });
}

#[test]
fn transactions_list_filters() {
    each_backend(|store| {
        let user1 = keypair_from_seed(&[4; 32]);
        let user2 = keypair_from_seed(&[5; 32]);

        let create1 = sign_transaction(
            create(vec![user1.public], vec![OutputSpec::new(vec![user2.public], 6)], None, None)
                .unwrap(),
            &[&user1],
        );
        let create2 = sign_transaction(
            create(
                vec![user2.public],
                vec![
                    OutputSpec::new(vec![user2.public], 5),
                    OutputSpec::new(vec![user1.public], 5),
                ],
                None,
                None,
            )
            .unwrap(),
            &[&user2],
        );
        let transfer1 = pay(&create1, &user2, &user1, 6);

        let genesis = init_genesis(&*store, &user1, vec![user1.public], Timestamp::new(0)).unwrap();
        let b1 = commit(&*store, &user1, genesis.id, vec![create1.clone(), create2.clone()], 1);
        commit(&*store, &user1, b1.id, vec![transfer1.clone()], 2);

        let mut by_asset = collect(store.get_transactions_list(Some(&create1.id), None).unwrap());
        by_asset.sort();
        let mut expected = vec![create1.id, transfer1.id];
        expected.sort();
        assert_eq!(by_asset, expected);

        let mut creates = collect(store.get_transactions_list(None, Some(Operation::Create)).unwrap());
        creates.sort();
        let mut expected = vec![create1.id, create2.id];
        expected.sort();
        assert_eq!(creates, expected);

        let narrowed = collect(
            store
                .get_transactions_list(Some(&create1.id), Some(Operation::Create))
                .unwrap(),
        );
        assert_eq!(narrowed, vec![create1.id]);
    });
}

// ---------------------------------------------------------------------------
// 2. Vote-chain resolution
// ---------------------------------------------------------------------------

#[test]
fn no_votes_resolves_to_genesis() {
    each_backend(|store| {
        let node = keypair_from_seed(&[1; 32]);
        let genesis = init_genesis(&*store, &node, vec![node.public], Timestamp::new(0)).unwrap();
        let tip = get_last_voted_block(&*store, &node.public).unwrap();
        assert_eq!(tip.id, genesis.id);
    });
}

#[test]
fn follows_votes_to_latest_block() {
    each_backend(|store| {
        let node = keypair_from_seed(&[1; 32]);
        let genesis = init_genesis(&*store, &node, vec![node.public], Timestamp::new(0)).unwrap();
        let b1 = commit(&*store, &node, genesis.id, vec![mint(&node, 1)], 1);
        let b2 = commit(&*store, &node, b1.id, vec![mint(&node, 2)], 2);

        let tip = get_last_voted_block(&*store, &node.public).unwrap();
        assert_eq!(tip.id, b2.id);
    });
}

#[test]
fn cyclic_votes_are_reported() {
    each_backend(|store| {
        let node = keypair_from_seed(&[1; 32]);
        init_genesis(&*store, &node, vec![node.public], Timestamp::new(0)).unwrap();
        let a = create_block(vec![mint(&node, 1)], &node, vec![node.public], Timestamp::new(1))
            .unwrap();
        let b = create_block(vec![mint(&node, 2)], &node, vec![node.public], Timestamp::new(2))
            .unwrap();
        store.write_block(&a).unwrap();
        store.write_block(&b).unwrap();
        for (from, to) in [(a.id, b.id), (b.id, a.id)] {
            let vote = create_vote(&node, to, from, None, Timestamp::new(3)).unwrap();
            store.write_vote(&vote).unwrap();
        }

        let err = get_last_voted_block(&*store, &node.public).unwrap_err();
        assert!(matches!(err, LedgerError::CyclicBlockchain { .. }));
    });
}

// ---------------------------------------------------------------------------
// 3. Admission
// ---------------------------------------------------------------------------

#[test]
fn double_spend_rejected_before_backlog() {
    each_backend(|store| {
        let alice = keypair_from_seed(&[2; 32]);
        let bob = keypair_from_seed(&[3; 32]);
        let minted = mint(&alice, 10);
        let b1 = commit(&*store, &alice, BlockId::ZERO, vec![minted.clone()], 1);
        commit(&*store, &alice, b1.id, vec![pay(&minted, &alice, &bob, 10)], 2);

        let validator = AdmissionValidator::new(Arc::clone(&store));
        let backlog = BacklogManager::with_rng(
            Arc::clone(&store),
            vec![alice.public],
            30,
            NullRandom::constant(0),
        );
        let again = pay(&minted, &alice, &alice, 10);
        let err = validator
            .admit(&serde_json::to_value(&again).unwrap(), &backlog, Timestamp::new(3))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Transaction(fedchain_transactions::TransactionError::DoubleSpend { .. })
        ));
        assert_eq!(store.count_backlog().unwrap(), 0);
    });
}

// ---------------------------------------------------------------------------
// 4. Node façade
// ---------------------------------------------------------------------------

fn memory_config(federation: Vec<fedchain_types::PublicKey>) -> NodeConfig {
    NodeConfig {
        backend: BackendKind::Memory,
        federation,
        max_tries: 1,
        backoff_base_ms: 0,
        ..NodeConfig::default()
    }
}

async fn memory_node(
    seed: u8,
    federation: Vec<fedchain_types::PublicKey>,
) -> (FedNode, Arc<NullClock>) {
    let clock = Arc::new(NullClock::new(1_000));
    let registry = default_registry().unwrap();
    let node = FedNode::with_parts(
        memory_config(federation),
        keypair_from_seed(&[seed; 32]),
        &registry,
        clock.clone(),
    )
    .await
    .unwrap();
    (node, clock)
}

#[tokio::test]
async fn node_writes_genesis_once() {
    let (node, _clock) = memory_node(1, vec![]).await;
    assert!(node.genesis().is_genesis());
    assert_eq!(node.federation(), &[node.public_key()]);
    assert_eq!(node.store().count_blocks().unwrap(), 1);
}

#[tokio::test]
async fn submit_then_lookup_from_backlog() {
    let (node, _clock) = memory_node(1, vec![]).await;
    let alice = keypair_from_seed(&[2; 32]);
    let tx = mint(&alice, 3);

    let accepted = api::submit_transaction(&node, serde_json::to_value(&tx).unwrap())
        .await
        .unwrap();
    assert_eq!(accepted["id"], json!(tx.id.to_string()));

    let found = api::get_transaction(&node, &tx.id.to_string().to_uppercase())
        .await
        .unwrap();
    assert_eq!(found["id"], json!(tx.id.to_string()));
    assert_eq!(node.metrics.transactions_admitted.get(), 1);

    let missing = api::get_transaction(&node, &TxId::new([9; 32]).to_string())
        .await
        .unwrap_err();
    assert_eq!(missing.status, 404);
}

#[tokio::test]
async fn submit_reports_rejections() {
    let (node, _clock) = memory_node(1, vec![]).await;
    let alice = keypair_from_seed(&[2; 32]);
    let bob = keypair_from_seed(&[3; 32]);

    let minted = mint(&alice, 10);
    let mut payload = serde_json::to_value(&minted).unwrap();
    payload["metadata"] = json!({});
    let err = api::submit_transaction(&node, payload).await.unwrap_err();
    assert_eq!(err.status, 400);
    assert!(err.message.starts_with("Invalid transaction schema: "));

    let orphan = pay(&minted, &alice, &bob, 10);
    let err = api::submit_transaction(&node, serde_json::to_value(&orphan).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.status, 400);
    assert!(err.message.starts_with("Invalid transaction (TransactionDoesNotExist): "));

    assert_eq!(node.metrics.transactions_rejected.get(), 2);
    assert_eq!(node.store().count_backlog().unwrap(), 0);
}

#[tokio::test]
async fn list_requires_a_filter() {
    let (node, _clock) = memory_node(1, vec![]).await;
    let err = api::list_transactions(&node, None, None).await.unwrap_err();
    assert_eq!(err.status, 400);

    let ids = api::list_transactions(&node, None, Some("CREATE")).await.unwrap();
    assert!(ids.is_empty());

    let err = api::list_transactions(&node, None, Some("GENESIS")).await.unwrap_err();
    assert_eq!(err.status, 400);
}

#[tokio::test]
async fn stale_backlog_is_reassigned() {
    let other = keypair_from_seed(&[7; 32]);
    let (node, clock) = memory_node(1, vec![other.public]).await;
    let alice = keypair_from_seed(&[2; 32]);
    api::submit_transaction(&node, serde_json::to_value(mint(&alice, 1)).unwrap())
        .await
        .unwrap();

    assert_eq!(node.reassign_once().await.unwrap().examined, 0);

    clock.advance(node.config.reassign_delay_secs + 1);
    let report = node.reassign_once().await.unwrap();
    assert_eq!(report.reassigned, 1);
    assert_eq!(node.metrics.backlog_reassigned.get(), 1);
}

#[tokio::test]
async fn background_task_stops_on_shutdown() {
    let (mut node, _clock) = memory_node(1, vec![]).await;
    node.start();
    node.stop().await;
}

#[test]
fn unreachable_store_is_a_connectivity_error() {
    let store = NullStore::flaky(5, RetryPolicy::immediate(2));
    let err = store.count_blocks().unwrap_err();
    assert!(matches!(err, StoreError::Connection(_)));
    let api_err: fedchain_node::ApiError = err.into();
    assert_eq!(api_err.status, 503);
}
