//! Keeper Registry binding tests against `MockTransport`

use std::time::Duration;

use bind_keeper::{
    FilterOpts, FundsAdded, KeeperRegistry, KeeperRegistryEvent, OnchainConfig, RegistryState,
    SignerInfo, State, UpkeepInfo, UpkeepPerformed,
};
use bind_sdk::abi::{
    encode, encode_topic, ContractMetadata, ContractRevert, ParamType, Token, Tokenizable,
};
use bind_sdk::types::Log;
use bind_sdk::{
    Address, ChainClient, MockTransport, NodeSubmitter, SdkError, SubscriptionItem, TransactOpts,
    H256, U256,
};
use bytes::Bytes;
use serde_json::json;

fn selector_of(metadata: &ContractMetadata, name: &str) -> [u8; 4] {
    metadata.abi.resolve_method(name).unwrap().selector()
}

fn registry_address() -> Address {
    Address::from_bytes([0x02; 20])
}

fn setup() -> (KeeperRegistry, MockTransport, ContractMetadata) {
    let transport = MockTransport::new();
    let client = ChainClient::with_transport(transport.clone());
    let metadata = KeeperRegistry::metadata().unwrap();
    (KeeperRegistry::new(registry_address(), &metadata, client), transport, metadata)
}

fn respond(transport: &MockTransport, types: &[ParamType], tokens: &[Token]) {
    let data = encode(types, tokens).unwrap();
    transport.set_response("eth_call", json!(format!("0x{}", hex::encode(data))));
}

fn onchain_config_type() -> ParamType {
    ParamType::Tuple(vec![
        ParamType::Uint(32),
        ParamType::Uint(32),
        ParamType::Uint(32),
        ParamType::Uint(24),
        ParamType::Uint(16),
        ParamType::Uint(96),
        ParamType::Uint(32),
        ParamType::Uint(32),
        ParamType::Uint(32),
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Address,
        ParamType::Address,
    ])
}

fn sent_calldata(transport: &MockTransport) -> String {
    let request = transport.requests().last().cloned().unwrap();
    request.params[0]["data"].as_str().unwrap().to_string()
}

// ==================== Metadata Tests ====================

#[test]
fn test_metadata_covers_registry_surface() {
    let metadata = KeeperRegistry::metadata().unwrap();
    for name in ["getState", "getUpkeep", "registerUpkeep", "transmit", "setConfig"] {
        assert!(metadata.abi.resolve_method(name).is_ok(), "{} missing", name);
    }
    assert_eq!(
        metadata.abi.resolve_method("transmit").unwrap().signature(),
        "transmit(bytes32[3],bytes,bytes32[],bytes32[],bytes32)"
    );
    assert_eq!(
        metadata.abi.resolve_event("UpkeepPerformed").unwrap().signature(),
        "UpkeepPerformed(uint256,bool,uint32,uint256,uint256,uint96)"
    );
}

// ==================== Read Tests ====================

#[tokio::test]
async fn test_get_upkeep_struct_output() {
    let (registry, transport, _) = setup();
    let info = UpkeepInfo {
        target: Address::from_bytes([0x11; 20]),
        execute_gas: 500_000,
        check_data: Bytes::from_static(b"check"),
        balance: 5_000_000_000_000_000_000,
        admin: Address::from_bytes([0x22; 20]),
        max_valid_blocknumber: u64::from(u32::MAX),
        last_perform_block_number: 17_000_000,
        amount_spent: 12_345,
        paused: false,
        offchain_config: Bytes::new(),
    };
    let upkeep_type = ParamType::Tuple(vec![
        ParamType::Address,
        ParamType::Uint(32),
        ParamType::Bytes,
        ParamType::Uint(96),
        ParamType::Address,
        ParamType::Uint(64),
        ParamType::Uint(32),
        ParamType::Uint(96),
        ParamType::Bool,
        ParamType::Bytes,
    ]);
    respond(&transport, &[upkeep_type], &[info.clone().into_token()]);

    assert_eq!(registry.get_upkeep(U256::from(42)).await.unwrap(), info);
}

#[tokio::test]
async fn test_get_state_five_outputs() {
    let (registry, transport, _) = setup();
    let expected = RegistryState {
        state: State {
            nonce: 3,
            num_upkeeps: U256::from(10),
            latest_config_digest: H256::from_bytes([0xcd; 32]),
            paused: true,
            ..Default::default()
        },
        config: OnchainConfig {
            check_gas_limit: 6_500_000,
            staleness_seconds: 90_000,
            registrar: Address::from_bytes([0x0b; 20]),
            ..Default::default()
        },
        signers: vec![Address::from_bytes([1; 20]), Address::from_bytes([2; 20])],
        transmitters: vec![Address::from_bytes([3; 20])],
        f: 1,
    };
    let state_type = ParamType::Tuple(vec![
        ParamType::Uint(32),
        ParamType::Uint(96),
        ParamType::Uint(256),
        ParamType::Uint(96),
        ParamType::Uint(256),
        ParamType::Uint(32),
        ParamType::Uint(32),
        ParamType::FixedBytes(32),
        ParamType::Uint(32),
        ParamType::Bool,
    ]);
    let outputs = expected.clone().into_token().into_tuple().unwrap();
    respond(
        &transport,
        &[
            state_type,
            onchain_config_type(),
            ParamType::Array(Box::new(ParamType::Address)),
            ParamType::Array(Box::new(ParamType::Address)),
            ParamType::Uint(8),
        ],
        &outputs,
    );

    assert_eq!(registry.get_state().await.unwrap(), expected);
}

#[tokio::test]
async fn test_scalar_and_multi_output_reads() {
    let (registry, transport, _) = setup();

    respond(
        &transport,
        &[ParamType::Bool, ParamType::Uint(8)],
        &[Token::Bool(true), Token::Uint(U256::from(4))],
    );
    assert_eq!(
        registry.get_signer_info(Address::from_bytes([9; 20])).await.unwrap(),
        SignerInfo { active: true, index: 4 }
    );

    respond(&transport, &[ParamType::String], &[Token::String("KeeperRegistry 2.0.0".to_string())]);
    assert_eq!(registry.type_and_version().await.unwrap(), "KeeperRegistry 2.0.0");

    respond(
        &transport,
        &[ParamType::Array(Box::new(ParamType::Uint(256)))],
        &[Token::Array(vec![Token::Uint(U256::from(7)), Token::Uint(U256::from(8))])],
    );
    let ids = registry.get_active_upkeep_ids(U256::zero(), U256::zero()).await.unwrap();
    assert_eq!(ids, vec![U256::from(7), U256::from(8)]);
}

#[tokio::test]
async fn test_call_check_upkeep_is_a_read() {
    let (registry, transport, _) = setup();
    respond(
        &transport,
        &[
            ParamType::Bool,
            ParamType::Bytes,
            ParamType::Uint(8),
            ParamType::Uint(256),
            ParamType::Uint(256),
            ParamType::Uint(256),
        ],
        &[
            Token::Bool(true),
            Token::Bytes(vec![0xab, 0xcd]),
            Token::Uint(U256::zero()),
            Token::Uint(U256::from(45_000)),
            Token::Uint(U256::from(30_000_000_000u64)),
            Token::Uint(U256::from(5_000_000_000_000_000u64)),
        ],
    );

    let result = registry.call_check_upkeep(U256::from(1)).await.unwrap();
    assert!(result.upkeep_needed);
    assert_eq!(result.perform_data.as_ref(), &[0xab, 0xcd]);
    assert_eq!(result.gas_used, U256::from(45_000));
    assert_eq!(transport.request_count("eth_call"), 1);
    assert_eq!(transport.request_count("eth_sendTransaction"), 0);
}

#[tokio::test]
async fn test_read_decode_error_surfaces() {
    let (registry, transport, _) = setup();
    transport.set_response("eth_call", json!("0x"));
    assert!(matches!(registry.get_link_address().await, Err(SdkError::AbiDecode(_))));
}

// ==================== Write Tests ====================

#[tokio::test]
async fn test_add_funds_calldata() {
    let (registry, transport, metadata) = setup();
    registry.add_funds(U256::from(42), 1_000).await.unwrap();

    let expected = format!(
        "0x{}{}{}",
        hex::encode(selector_of(&metadata, "addFunds")),
        hex::encode(encode(&[ParamType::Uint(256)], &[Token::Uint(U256::from(42))]).unwrap()),
        hex::encode(encode(&[ParamType::Uint(96)], &[Token::Uint(U256::from(1_000))]).unwrap()),
    );
    assert_eq!(sent_calldata(&transport), expected);
}

#[tokio::test]
async fn test_add_funds_rejects_amount_over_96_bits() {
    let (registry, transport, _) = setup();
    let result = registry.add_funds(U256::from(1), 1u128 << 96).await;
    assert!(matches!(result, Err(SdkError::AbiEncode(_))));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_write_uses_session_sender() {
    let (registry, transport, _) = setup();
    let admin = Address::from_bytes([0xad; 20]);
    let session = registry.with_transact_opts(TransactOpts::new().from(admin).gas_limit(200_000));

    session.pause_upkeep(U256::from(5)).await.unwrap();

    let request = transport.requests().pop().unwrap();
    assert_eq!(request.method, "eth_sendTransaction");
    assert_eq!(request.params[0]["from"], json!(admin.to_hex()));
    assert_eq!(request.params[0]["to"], json!(registry_address().to_hex()));
    assert_eq!(request.params[0]["gas"], json!("0x30d40"));
}

#[tokio::test]
async fn test_transmit_encodes_fixed_context() {
    let (registry, transport, metadata) = setup();
    let context = [H256::from_bytes([1; 32]), H256::from_bytes([2; 32]), H256::from_bytes([3; 32])];

    registry
        .transmit(
            context,
            Bytes::from_static(&[0xee]),
            vec![H256::from_bytes([4; 32])],
            vec![],
            H256::ZERO,
        )
        .await
        .unwrap();

    let data = sent_calldata(&transport);
    let body = hex::decode(&data[2..]).unwrap();
    let decoded = metadata.abi.resolve_method("transmit").unwrap().decode_input(&body).unwrap();
    assert_eq!(
        decoded[0],
        Token::FixedArray(
            context
                .iter()
                .map(|h| Token::FixedBytes(h.as_bytes().to_vec()))
                .collect()
        )
    );
    assert_eq!(decoded[1], Token::Bytes(vec![0xee]));
    assert_eq!(decoded[3], Token::Array(vec![]));
}

#[tokio::test]
async fn test_set_config_with_encoded_onchain_config() {
    let (registry, transport, metadata) = setup();
    let config = OnchainConfig {
        payment_premium_ppb: 250_000_000,
        max_perform_gas: 5_000_000,
        ..Default::default()
    };

    registry
        .set_config(
            vec![Address::from_bytes([1; 20])],
            vec![Address::from_bytes([2; 20])],
            1,
            config.abi_encode().unwrap(),
            1,
            Bytes::new(),
        )
        .await
        .unwrap();

    let data = sent_calldata(&transport);
    let body = hex::decode(&data[2..]).unwrap();
    let args = metadata.abi.resolve_method("setConfig").unwrap().decode_input(&body).unwrap();
    let Token::Bytes(onchain) = &args[3] else {
        panic!("onchainConfig is not bytes: {:?}", args[3]);
    };
    assert_eq!(OnchainConfig::abi_decode(onchain).unwrap(), config);
}

#[tokio::test]
async fn test_deploy_with_logic_address() {
    let transport = MockTransport::new();
    let client = ChainClient::with_transport(transport.clone());
    let metadata = KeeperRegistry::metadata().unwrap();
    let logic = Address::from_bytes([0x10; 20]);

    KeeperRegistry::deploy(&client, &NodeSubmitter, &TransactOpts::new(), &metadata, logic)
        .await
        .unwrap();

    let data = sent_calldata(&transport);
    let bytes = hex::decode(&data[2..]).unwrap();
    assert!(bytes.starts_with(&metadata.bytecode));
    assert_eq!(bytes.len(), metadata.bytecode.len() + 32);
    assert_eq!(&bytes[bytes.len() - 20..], logic.as_bytes());
}

#[tokio::test]
async fn test_fallback_reaches_logic_with_raw_calldata() {
    let (registry, transport, metadata) = setup();
    let mut calldata = vec![0xde, 0xad, 0x10, 0x61];
    calldata.extend_from_slice(&[0u8; 31]);
    calldata.push(0x2a);
    assert!(metadata.abi.function_by_selector([0xde, 0xad, 0x10, 0x61]).is_none());

    registry.fallback(Bytes::from(calldata.clone())).await.unwrap();

    assert_eq!(sent_calldata(&transport), format!("0x{}", hex::encode(&calldata)));
    let request = transport.requests().last().cloned().unwrap();
    assert_eq!(request.params[0]["to"], json!(registry_address().to_hex()));
}

// ==================== Event Tests ====================

fn event_log(
    metadata: &ContractMetadata,
    name: &str,
    topics: Vec<H256>,
    data: Vec<u8>,
    block: u64,
) -> Log {
    let mut all = vec![metadata.abi.resolve_event(name).unwrap().topic()];
    all.extend(topics);
    Log {
        address: registry_address(),
        topics: all,
        data: Bytes::from(data),
        block_number: Some(block),
        ..Default::default()
    }
}

fn funds_added(
    metadata: &ContractMetadata,
    id: u64,
    from: Address,
    amount: u64,
    block: u64,
) -> Log {
    event_log(
        metadata,
        "FundsAdded",
        vec![
            encode_topic(&ParamType::Uint(256), &Token::Uint(U256::from(id))).unwrap(),
            encode_topic(&ParamType::Address, &Token::Address(from)).unwrap(),
        ],
        encode(&[ParamType::Uint(96)], &[Token::Uint(U256::from(amount))]).unwrap(),
        block,
    )
}

fn upkeep_performed(metadata: &ContractMetadata, id: u64, success: bool, block: u64) -> Log {
    event_log(
        metadata,
        "UpkeepPerformed",
        vec![
            encode_topic(&ParamType::Uint(256), &Token::Uint(U256::from(id))).unwrap(),
            encode_topic(&ParamType::Bool, &Token::Bool(success)).unwrap(),
        ],
        encode(
            &[ParamType::Uint(32), ParamType::Uint(256), ParamType::Uint(256), ParamType::Uint(96)],
            &[
                Token::Uint(U256::from(block - 1)),
                Token::Uint(U256::from(80_000)),
                Token::Uint(U256::from(5_000)),
                Token::Uint(U256::from(1_000_000)),
            ],
        )
        .unwrap(),
        block,
    )
}

#[tokio::test]
async fn test_filter_funds_added_by_id() {
    let (registry, transport, metadata) = setup();
    let alice = Address::from_bytes([0xa1; 20]);
    transport.push_log(funds_added(&metadata, 41, alice, 10, 100));
    transport.push_log(funds_added(&metadata, 42, alice, 20, 101));
    transport.push_log(upkeep_performed(&metadata, 42, true, 102));

    let records = registry
        .filter_funds_added(&FilterOpts::new().from_block(100u64), vec![U256::from(42)], vec![])
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].event,
        FundsAdded {
            id: U256::from(42),
            from: alice,
            amount: 20
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_watch_upkeep_performed_failures_only() {
    let (registry, transport, metadata) = setup();
    let mut sub = registry
        .watch_upkeep_performed(&FilterOpts::default(), vec![], vec![false])
        .await
        .unwrap();

    transport.push_log(upkeep_performed(&metadata, 1, true, 200));
    transport.push_log(upkeep_performed(&metadata, 2, false, 201));

    match sub.recv().await {
        SubscriptionItem::Record(record) => {
            assert_eq!(record.event.id, U256::from(2));
            assert!(!record.event.success);
            assert_eq!(record.event.check_block_number, 200);
        }
        other => panic!("expected a record, got {:?}", other),
    }

    sub.unsubscribe();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(transport.installed_filters(), 0);
}

#[test]
fn test_parse_log_dispatches_on_topic() {
    let (registry, _, metadata) = setup();
    let log = upkeep_performed(&metadata, 9, true, 300);

    match registry.parse_log(&log).unwrap() {
        KeeperRegistryEvent::UpkeepPerformed(UpkeepPerformed {
            id,
            success,
            total_payment,
            ..
        }) => {
            assert_eq!(id, U256::from(9));
            assert!(success);
            assert_eq!(total_payment, 1_000_000);
        }
        other => panic!("wrong event: {}", other.name()),
    }

    let typed = registry.parse_upkeep_performed(&log).unwrap();
    assert_eq!(typed.block_number(), Some(300));
    assert!(registry.parse_funds_added(&log).is_err());
}

#[test]
fn test_parse_log_unknown_topic() {
    let (registry, _, _) = setup();
    let log = Log {
        address: registry_address(),
        topics: vec![H256::from_bytes([0x99; 32])],
        ..Default::default()
    };
    assert!(matches!(
        registry.parse_log(&log),
        Err(SdkError::UnknownSelector { kind: "event", .. })
    ));
}

// ==================== Revert Tests ====================

#[test]
fn test_decode_registry_errors() {
    let (registry, _, metadata) = setup();
    let not_needed = metadata
        .abi
        .errors()
        .find(|e| e.name == "UpkeepNotNeeded")
        .unwrap()
        .selector();
    let error = SdkError::Rpc {
        code: 3,
        message: "execution reverted".to_string(),
        data: Some(json!(format!("0x{}", hex::encode(not_needed)))),
    };
    assert_eq!(
        registry.decode_revert(&error),
        Some(ContractRevert::Custom {
            name: "UpkeepNotNeeded".to_string(),
            args: vec![],
        })
    );

    let reverted = metadata
        .abi
        .errors()
        .find(|e| e.name == "TargetCheckReverted")
        .unwrap()
        .selector();
    let mut data = reverted.to_vec();
    data.extend(encode(&[ParamType::Bytes], &[Token::Bytes(vec![1, 2, 3])]).unwrap());
    let error = SdkError::Rpc {
        code: 3,
        message: "execution reverted".to_string(),
        data: Some(json!(format!("0x{}", hex::encode(data)))),
    };
    assert_eq!(
        registry.decode_revert(&error),
        Some(ContractRevert::Custom {
            name: "TargetCheckReverted".to_string(),
            args: vec![Token::Bytes(vec![1, 2, 3])],
        })
    );
}
