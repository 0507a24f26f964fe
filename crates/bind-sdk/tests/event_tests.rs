//! Event integration tests for bind-sdk
//!
//! Historical queries, topic filtering, live subscriptions and the log
//! iterator, all served by the in-memory logs of `MockTransport`.

use std::time::Duration;

use bind_sdk::abi::{encode, encode_topic, ContractMetadata, ParamType, Token, TupleFields};
use bind_sdk::types::Log;
use async_trait::async_trait;
use bind_sdk::{
    Address, BoundContract, ChainClient, ClientConfig, EthEvent, MockTransport, SdkError,
    SubscriptionItem, Transport, H256, U256,
};
use bytes::Bytes;
use futures_util::StreamExt;
use serde_json::Value;

const ABI: &str = r#"[
    {"type":"event","name":"FundsAdded","anonymous":false,"inputs":[
        {"name":"id","type":"uint256","indexed":true},
        {"name":"from","type":"address","indexed":true},
        {"name":"amount","type":"uint96","indexed":false}
    ]}
]"#;

#[derive(Debug, Clone, PartialEq, Eq)]
struct FundsAdded {
    id: U256,
    from: Address,
    amount: u128,
}

impl EthEvent for FundsAdded {
    const NAME: &'static str = "FundsAdded";

    fn from_tokens(tokens: Vec<Token>) -> Result<Self, SdkError> {
        let mut fields = TupleFields::from_vec(tokens, 3)?;
        Ok(Self {
            id: fields.next()?,
            from: fields.next()?,
            amount: fields.next()?,
        })
    }
}

fn registry() -> Address {
    Address::from_bytes([0x02; 20])
}

fn funder(byte: u8) -> Address {
    Address::from_bytes([byte; 20])
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn setup() -> (BoundContract, MockTransport) {
    init_tracing();
    let transport = MockTransport::new();
    let client = ChainClient::with_transport(transport.clone());
    let metadata = ContractMetadata::from_abi(ABI).unwrap();
    (BoundContract::new(registry(), &metadata, client), transport)
}

fn topic0(contract: &BoundContract) -> H256 {
    contract.abi().resolve_event("FundsAdded").unwrap().topic()
}

fn funds_added_log(
    contract: &BoundContract,
    id: u64,
    from: Address,
    amount: u128,
    block: u64,
) -> Log {
    let data = encode(&[ParamType::Uint(96)], &[Token::Uint(U256::from(amount))]).unwrap();
    Log {
        address: registry(),
        topics: vec![
            topic0(contract),
            encode_topic(&ParamType::Uint(256), &Token::Uint(U256::from(id))).unwrap(),
            encode_topic(&ParamType::Address, &Token::Address(from)).unwrap(),
        ],
        data: Bytes::from(data),
        block_number: Some(block),
        log_index: Some(0),
        ..Default::default()
    }
}

/// Same topics, but an amount that does not fit in uint96
fn undecodable_log(contract: &BoundContract, id: u64, block: u64) -> Log {
    Log {
        data: Bytes::from(vec![0xff; 32]),
        ..funds_added_log(contract, id, funder(1), 0, block)
    }
}

// ==================== Filter Construction Tests ====================

#[test]
fn test_filter_puts_signature_topic_first() {
    let (contract, _) = setup();
    let filter = contract
        .events::<FundsAdded>()
        .unwrap()
        .topic_values(0, vec![U256::from(42)])
        .filter()
        .unwrap();

    assert_eq!(filter.address, Some(registry()));
    assert_eq!(filter.topics[0], Some(vec![topic0(&contract)]));
    assert_eq!(
        filter.topics[1],
        Some(vec![encode_topic(&ParamType::Uint(256), &Token::Uint(U256::from(42))).unwrap()])
    );
    assert_eq!(filter.topics[2], None);
    assert_eq!(filter.topics[3], None);
}

#[test]
fn test_filter_rejects_mistyped_topic_value() {
    let (contract, _) = setup();
    let result = contract
        .events::<FundsAdded>()
        .unwrap()
        .topic(1, vec![Token::Bool(true)])
        .filter();
    assert!(matches!(result, Err(SdkError::AbiEncode(_))));
}

#[test]
fn test_filter_rejects_rule_past_indexed_arguments() {
    let (contract, _) = setup();
    let result = contract
        .events::<FundsAdded>()
        .unwrap()
        .topic(2, vec![Token::Uint(U256::from(1))])
        .filter();
    assert!(matches!(result, Err(SdkError::AbiEncode(_))));
}

#[test]
fn test_events_unknown_name() {
    #[derive(Debug)]
    struct Missing;

    impl EthEvent for Missing {
        const NAME: &'static str = "Missing";

        fn from_tokens(_: Vec<Token>) -> Result<Self, SdkError> {
            Ok(Missing)
        }
    }

    let (contract, _) = setup();
    assert!(matches!(
        contract.events::<Missing>(),
        Err(SdkError::UnknownSelector { kind: "event", .. })
    ));
}

// ==================== Historical Query Tests ====================

#[tokio::test]
async fn test_query_filters_by_indexed_value() {
    let (contract, transport) = setup();
    transport.push_log(funds_added_log(&contract, 41, funder(1), 10, 5));
    transport.push_log(funds_added_log(&contract, 42, funder(1), 20, 6));
    transport.push_log(funds_added_log(&contract, 42, funder(2), 30, 7));

    let records = contract
        .events::<FundsAdded>()
        .unwrap()
        .topic_values(0, vec![U256::from(42)])
        .topic(1, vec![])
        .from_block(0u64)
        .query()
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.event.id == U256::from(42)));
    assert_eq!(records[0].event.amount, 20);
    assert_eq!(records[1].event.from, funder(2));
    assert_eq!(records[1].block_number(), Some(7));

    // The wildcard for `from` is trimmed off the sent filter
    let sent = &transport.requests()[0];
    assert_eq!(sent.method, "eth_getLogs");
    assert_eq!(sent.params[0]["topics"].as_array().unwrap().len(), 2);
    assert_eq!(sent.params[0]["fromBlock"], "0x0");
}

#[tokio::test]
async fn test_query_ors_values_within_one_argument() {
    let (contract, transport) = setup();
    transport.push_log(funds_added_log(&contract, 1, funder(0xa), 1, 1));
    transport.push_log(funds_added_log(&contract, 2, funder(0xb), 2, 1));
    transport.push_log(funds_added_log(&contract, 3, funder(0xc), 3, 1));

    let records = contract
        .events::<FundsAdded>()
        .unwrap()
        .topic_values(1, vec![funder(0xa), funder(0xb)])
        .query()
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();

    let senders: Vec<Address> = records.iter().map(|r| r.event.from).collect();
    assert_eq!(senders, vec![funder(0xa), funder(0xb)]);
}

#[tokio::test]
async fn test_query_respects_block_range() {
    let (contract, transport) = setup();
    for block in 1..=5 {
        transport.push_log(funds_added_log(&contract, block, funder(1), 1, block));
    }

    let records = contract
        .events::<FundsAdded>()
        .unwrap()
        .from_block(2u64)
        .to_block(4u64)
        .query()
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();

    let blocks: Vec<Option<u64>> = records.iter().map(|r| r.block_number()).collect();
    assert_eq!(blocks, vec![Some(2), Some(3), Some(4)]);
}

#[tokio::test]
async fn test_query_encoding_error_sends_nothing() {
    let (contract, transport) = setup();
    let result = contract
        .events::<FundsAdded>()
        .unwrap()
        .topic(0, vec![Token::String("not a number".to_string())])
        .query()
        .await;

    assert!(matches!(result, Err(SdkError::AbiEncode(_))));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_query_propagates_rpc_error() {
    let (contract, transport) = setup();
    transport.fail_next("eth_getLogs", SdkError::Transport("connection reset".to_string()));

    let result = contract.events::<FundsAdded>().unwrap().query().await;
    assert!(matches!(result, Err(SdkError::Transport(_))));
}

// ==================== Iterator Tests ====================

#[tokio::test]
async fn test_iterator_stops_at_undecodable_log() {
    let (contract, transport) = setup();
    transport.push_log(funds_added_log(&contract, 1, funder(1), 100, 1));
    transport.push_log(undecodable_log(&contract, 2, 2));
    transport.push_log(funds_added_log(&contract, 3, funder(1), 300, 3));

    let mut logs = contract.events::<FundsAdded>().unwrap().query().await.unwrap();

    assert!(logs.advance().await);
    assert_eq!(logs.current().unwrap().event.id, U256::from(1));

    assert!(!logs.advance().await);
    assert!(matches!(logs.error(), Some(SdkError::AbiDecode(_))));
    assert!(logs.is_closed());
    // The last good record stays readable
    assert_eq!(logs.current().unwrap().event.amount, 100);

    assert!(!logs.advance().await);
}

#[tokio::test]
async fn test_iterator_collect_all_reports_error() {
    let (contract, transport) = setup();
    transport.push_log(funds_added_log(&contract, 1, funder(1), 1, 1));
    transport.push_log(undecodable_log(&contract, 2, 2));

    let logs = contract.events::<FundsAdded>().unwrap().query().await.unwrap();
    assert!(matches!(logs.collect_all().await, Err(SdkError::AbiDecode(_))));
}

#[tokio::test]
async fn test_iterator_release_discards_remaining() {
    let (contract, transport) = setup();
    transport.push_log(funds_added_log(&contract, 1, funder(1), 1, 1));
    transport.push_log(funds_added_log(&contract, 2, funder(1), 2, 1));

    let mut logs = contract.events::<FundsAdded>().unwrap().query().await.unwrap();
    assert!(logs.advance().await);
    logs.release();

    assert!(!logs.advance().await);
    assert!(logs.error().is_none());
    assert_eq!(logs.current().unwrap().event.id, U256::from(1));
}

#[tokio::test]
async fn test_iterator_empty_history() {
    let (contract, _) = setup();
    let mut logs = contract.events::<FundsAdded>().unwrap().query().await.unwrap();
    assert!(!logs.advance().await);
    assert!(logs.error().is_none());
    assert!(logs.current().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_query_then_subscribe_drains_before_error() {
    let (contract, transport) = setup();
    transport.push_log(funds_added_log(&contract, 1, funder(1), 1, 1));

    let mut logs = contract
        .events::<FundsAdded>()
        .unwrap()
        .from_block(0u64)
        .query_then_subscribe()
        .await
        .unwrap();

    // The live filter has no block bounds
    let new_filter = transport
        .requests()
        .into_iter()
        .find(|r| r.method == "eth_newFilter")
        .unwrap();
    assert!(new_filter.params[0].get("fromBlock").is_none());

    transport.push_log(funds_added_log(&contract, 2, funder(1), 2, 2));
    tokio::time::sleep(Duration::from_millis(1500)).await;
    transport.fail_next("eth_getFilterChanges", SdkError::Transport("node went away".to_string()));
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(logs.advance().await);
    assert_eq!(logs.current().unwrap().event.id, U256::from(1));
    assert!(logs.advance().await);
    assert_eq!(logs.current().unwrap().event.id, U256::from(2));
    assert!(!logs.advance().await);
    assert!(matches!(logs.error(), Some(SdkError::Transport(_))));

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(transport.installed_filters(), 0);
}

// ==================== Subscription Tests ====================

#[tokio::test(start_paused = true)]
async fn test_subscription_delivers_live_logs() {
    let (contract, transport) = setup();
    let mut sub = contract
        .events::<FundsAdded>()
        .unwrap()
        .topic_values(0, vec![U256::from(7)])
        .subscribe()
        .await
        .unwrap();
    assert_eq!(transport.installed_filters(), 1);

    transport.push_log(funds_added_log(&contract, 6, funder(1), 60, 10));
    transport.push_log(funds_added_log(&contract, 7, funder(1), 70, 11));

    match sub.recv().await {
        SubscriptionItem::Record(record) => {
            assert_eq!(record.event.id, U256::from(7));
            assert_eq!(record.event.amount, 70);
        }
        other => panic!("expected a record, got {:?}", other),
    }
    assert!(sub.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_subscription_release_then_emit() {
    let (contract, transport) = setup();
    let mut sub = contract.events::<FundsAdded>().unwrap().subscribe().await.unwrap();

    transport.push_log(funds_added_log(&contract, 1, funder(1), 1, 1));
    assert!(matches!(sub.recv().await, SubscriptionItem::Record(_)));

    sub.unsubscribe();
    transport.push_log(funds_added_log(&contract, 2, funder(1), 2, 2));
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(!sub.is_active());
    assert!(matches!(sub.recv().await, SubscriptionItem::Done));
    assert_eq!(transport.installed_filters(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_subscription_drop_uninstalls_filter() {
    let (contract, transport) = setup();
    let sub = contract.events::<FundsAdded>().unwrap().subscribe().await.unwrap();
    assert_eq!(transport.installed_filters(), 1);

    drop(sub);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(transport.installed_filters(), 0);
    assert_eq!(transport.request_count("eth_uninstallFilter"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_subscription_decode_error_then_done() {
    let (contract, transport) = setup();
    let mut sub = contract.events::<FundsAdded>().unwrap().subscribe().await.unwrap();

    transport.push_log(undecodable_log(&contract, 1, 1));
    transport.push_log(funds_added_log(&contract, 2, funder(1), 2, 2));

    assert!(matches!(sub.recv().await, SubscriptionItem::Error(SdkError::AbiDecode(_))));
    assert!(matches!(sub.recv().await, SubscriptionItem::Done));
    assert!(!sub.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_subscription_stream_ends_after_error() {
    let (contract, transport) = setup();
    let mut sub = contract.events::<FundsAdded>().unwrap().subscribe().await.unwrap();
    transport.fail_next("eth_getFilterChanges", SdkError::Transport("timeout".to_string()));

    assert!(matches!(sub.next().await, Some(Err(SdkError::Transport(_)))));
    assert!(sub.next().await.is_none());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(transport.installed_filters(), 0);
}

#[tokio::test]
async fn test_subscribe_fails_when_filter_install_fails() {
    let (contract, transport) = setup();
    transport.fail_next("eth_newFilter", SdkError::Rpc {
        code: -32000,
        message: "filters disabled".to_string(),
        data: None,
    });

    let result = contract.events::<FundsAdded>().unwrap().subscribe().await;
    assert!(matches!(result, Err(SdkError::Rpc { code: -32000, .. })));
    assert_eq!(transport.installed_filters(), 0);
}

/// Serves everything from the mock except filter polling, which panics
struct PanicOnPoll(MockTransport);

#[async_trait]
impl Transport for PanicOnPoll {
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        if method == "eth_getFilterChanges" {
            panic!("filter poll crashed");
        }
        self.0.request_json(method, params).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_subscription_reports_dead_poller() {
    let transport = MockTransport::new();
    let client = ChainClient::with_transport(PanicOnPoll(transport.clone()));
    let metadata = ContractMetadata::from_abi(ABI).unwrap();
    let contract = BoundContract::new(registry(), &metadata, client);
    let mut sub = contract.events::<FundsAdded>().unwrap().subscribe().await.unwrap();

    match sub.recv().await {
        SubscriptionItem::Error(SdkError::FeedAborted(reason)) => {
            assert!(reason.contains("panic"));
        }
        other => panic!("expected an aborted feed, got {:?}", other),
    }
    assert!(matches!(sub.recv().await, SubscriptionItem::Done));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(transport.installed_filters(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_subscription_with_zero_poll_interval() {
    init_tracing();
    let transport = MockTransport::new();
    let client = ChainClient::with_transport(transport.clone()).with_settings(&ClientConfig {
        poll_interval_ms: 0,
        ..Default::default()
    });
    let metadata = ContractMetadata::from_abi(ABI).unwrap();
    let contract = BoundContract::new(registry(), &metadata, client);
    let mut sub = contract.events::<FundsAdded>().unwrap().subscribe().await.unwrap();

    transport.push_log(funds_added_log(&contract, 3, funder(2), 30, 12));
    match sub.recv().await {
        SubscriptionItem::Record(record) => assert_eq!(record.event.amount, 30),
        other => panic!("expected a record, got {:?}", other),
    }

    sub.unsubscribe();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(transport.installed_filters(), 0);
}

// ==================== Log Parsing Tests ====================

#[test]
fn test_parse_log_typed_and_untyped() {
    let (contract, _) = setup();
    let log = funds_added_log(&contract, 9, funder(3), 900, 4);

    let record = contract.parse_log::<FundsAdded>(&log).unwrap();
    assert_eq!(
        record.event,
        FundsAdded {
            id: U256::from(9),
            from: funder(3),
            amount: 900
        }
    );

    let decoded = contract.parse_any_log(&log).unwrap();
    assert_eq!(decoded.event, "FundsAdded");
    assert_eq!(decoded.tokens[1], Token::Address(funder(3)));
}

#[test]
fn test_parse_log_missing_topic() {
    let (contract, _) = setup();
    let mut log = funds_added_log(&contract, 9, funder(3), 900, 4);
    log.topics.truncate(2);
    assert!(matches!(contract.parse_log::<FundsAdded>(&log), Err(SdkError::AbiDecode(_))));
}
