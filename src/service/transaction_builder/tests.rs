//! 交易流水线测试：使用计数桩服务代替真实 provider

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;

use super::*;
use crate::{
    domain::{mnemonic::MnemonicManager, ton_cell::Cell},
    service::blockchain_service::{
        Balance, BlockId, BlockchainService, ChainBlock, ChainTransaction, EvmFeeData,
        FeeEstimateRequest, Subscription, Utxo,
    },
};

const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

const ETH_0: &str = "0x9858EfFD232B4033E47d90003D41EC34EcaEda94";
const ETH_1: &str = "0x6Fac4D18c912343BF86fa7049364Dd4E424Ab9C0";
const BTC_0: &str = "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu";
const BTC_1: &str = "bc1qnjg0jd8228aq7egyzacy8cys3knf9xvrerkf9g";
const DOGE_0: &str = "DBus3bamQjgJULBJtYXpEzDWQRwF5iwxgC";
const TON_0: &str = "EQC9LJL69GjPHMTyZ_9_P2QKTGnQhMWs2eRk6MVDiDina5Lf";
const TON_0_NON_BOUNCEABLE: &str = "UQC9LJL69GjPHMTyZ_9_P2QKTGnQhMWs2eRk6MVDiDina88a";
const USDT: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 桩服务
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct StubService {
    chain: Chain,
    state: NetworkState,
    /// 所有 provider 调用次数
    calls: AtomicUsize,
    broadcasts: AtomicUsize,
}

impl StubService {
    fn new(chain: Chain, state: NetworkState) -> Arc<Self> {
        Arc::new(Self {
            chain,
            state,
            calls: AtomicUsize::new(0),
            broadcasts: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn broadcasts(&self) -> usize {
        self.broadcasts.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlockchainService for StubService {
    fn chain(&self) -> Chain {
        self.chain
    }

    async fn get_balance(&self, address: &str) -> WalletResult<Balance> {
        self.hit();
        Ok(Balance {
            chain: self.chain,
            address: address.to_string(),
            native: "0".to_string(),
            tokens: Vec::new(),
        })
    }

    async fn get_transaction(&self, _hash: &str) -> WalletResult<Option<ChainTransaction>> {
        self.hit();
        Ok(None)
    }

    async fn get_block(&self, _id: &BlockId) -> WalletResult<Option<ChainBlock>> {
        self.hit();
        Ok(None)
    }

    async fn get_latest_block(&self) -> WalletResult<ChainBlock> {
        self.hit();
        Err(WalletError::network(self.chain, "get_latest_block", "stub"))
    }

    async fn get_transaction_history(
        &self,
        _address: &str,
        _limit: usize,
    ) -> WalletResult<Vec<ChainTransaction>> {
        self.hit();
        Ok(Vec::new())
    }

    async fn estimate_fee(&self, _request: &FeeEstimateRequest) -> WalletResult<String> {
        self.hit();
        Ok("0".to_string())
    }

    async fn broadcast_transaction(&self, _raw_transaction_hex: &str) -> WalletResult<String> {
        self.hit();
        self.broadcasts.fetch_add(1, Ordering::SeqCst);
        Ok("stub-hash".to_string())
    }

    fn validate_address(&self, _address: &str) -> bool {
        true
    }

    async fn subscribe_to_address(&self, _address: &str) -> WalletResult<Subscription> {
        Ok(Subscription::inactive(self.chain))
    }

    async fn subscribe_to_blocks(&self) -> WalletResult<Subscription> {
        Ok(Subscription::inactive(self.chain))
    }

    async fn fetch_network_state(&self, _request: &NetworkStateRequest) -> WalletResult<NetworkState> {
        self.hit();
        Ok(self.state.clone())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 辅助
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn key(chain: Chain, index: u32) -> KeyPair {
    let seed = MnemonicManager::with_iterations(1_000)
        .to_seed(PHRASE, None)
        .unwrap();
    DerivationStrategyFactory::create_strategy(chain, &ChainsConfig::default())
        .unwrap()
        .derive_private_key(&seed, index)
        .unwrap()
}

async fn service_with(stub: &Arc<StubService>) -> TransactionService {
    let factory = Arc::new(BlockchainServiceFactory::new(ChainsConfig::default()));
    factory
        .with_service(stub.chain, Arc::clone(stub) as Arc<dyn BlockchainService>)
        .await;
    TransactionService::new(factory)
}

fn request(chain: &str, from: &str, to: &str, value: &str) -> TransactionRequest {
    TransactionRequest {
        chain: chain.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        value: value.to_string(),
        token: None,
        fee: None,
        nonce: None,
    }
}

fn evm_state(gas_limit: u64) -> NetworkState {
    NetworkState::Evm {
        chain_id: 1,
        nonce: 3,
        fee: EvmFeeData::Eip1559 {
            max_fee_per_gas: 30_000_000_000,
            max_priority_fee_per_gas: 1_000_000_000,
        },
        gas_limit,
    }
}

fn utxo(n: u8, vout: u32, value: u64) -> Utxo {
    Utxo {
        txid: format!("{:02x}", n).repeat(32),
        vout,
        value,
    }
}

fn decode_utxo_tx(raw_hex: &str) -> bitcoin::Transaction {
    bitcoin::consensus::deserialize(&hex::decode(raw_hex).unwrap()).unwrap()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 金额
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[test]
fn test_to_minor_units() {
    assert_eq!(to_minor_units("1.5", 18).unwrap(), 1_500_000_000_000_000_000);
    assert_eq!(to_minor_units("0.00000001", 8).unwrap(), 1);
    assert_eq!(to_minor_units(" 1.50 ", 1).unwrap(), 15);
    assert_eq!(to_minor_units("42", 0).unwrap(), 42);
}

#[test]
fn test_to_minor_units_rejects_bad_values() {
    for value in ["-1", "0", "0.000", "abc", "", "1e5"] {
        assert!(
            matches!(to_minor_units(value, 8), Err(WalletError::InvalidAmount(_))),
            "{value}"
        );
    }
    assert!(matches!(
        to_minor_units("0.123", 2),
        Err(WalletError::InvalidAmount(_))
    ));
}

#[test]
fn test_request_wire_format() {
    let json = serde_json::json!({
        "chain": "ethereum",
        "from": ETH_0,
        "to": ETH_1,
        "value": "0.1",
        "token": { "address": USDT, "decimals": 6 },
        "fee": { "maxFeePerGas": "30000000000", "gasLimit": 65000 },
        "nonce": 9
    });
    let request: TransactionRequest = serde_json::from_value(json).unwrap();
    assert_eq!(request.token.as_ref().unwrap().decimals, 6);
    assert_eq!(request.fee.as_ref().unwrap().gas_limit, Some(65_000));
    assert_eq!(request.nonce, Some(9));

    let signed = SignedTransaction {
        chain: Chain::Bitcoin,
        raw_transaction_hex: "00".to_string(),
        transaction_hash: "ab".to_string(),
        fee: "1".to_string(),
    };
    let value = serde_json::to_value(&signed).unwrap();
    assert_eq!(value["rawTransactionHex"], "00");
    assert_eq!(value["transactionHash"], "ab");
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 校验阶段：失败时不访问 provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn test_negative_amount_rejected_before_network() {
    let stub = StubService::new(Chain::Ethereum, evm_state(21_000));
    let service = service_with(&stub).await;

    let result = service
        .build_and_sign(&request("ethereum", ETH_0, ETH_1, "-1"), &key(Chain::Ethereum, 0))
        .await;

    assert!(matches!(result, Err(WalletError::InvalidAmount(_))));
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_validation_failures_make_no_calls() {
    let stub = StubService::new(Chain::Bitcoin, NetworkState::Utxo { utxos: vec![], fee_rate: 1 });
    let service = service_with(&stub).await;
    let btc_key = key(Chain::Bitcoin, 0);

    // 链未知
    assert!(matches!(
        service.build_and_sign(&request("solana", BTC_0, BTC_1, "1"), &btc_key).await,
        Err(WalletError::UnsupportedChain(_))
    ));
    // 目标地址属于其他链
    assert!(matches!(
        service.build_and_sign(&request("bitcoin", BTC_0, ETH_1, "1"), &btc_key).await,
        Err(WalletError::InvalidAddress { .. })
    ));
    // 超过 8 位小数
    assert!(matches!(
        service
            .build_and_sign(&request("bitcoin", BTC_0, BTC_1, "0.000000001"), &btc_key)
            .await,
        Err(WalletError::InvalidAmount(_))
    ));
    // 代币只支持 EVM
    let mut token_request = request("bitcoin", BTC_0, BTC_1, "1");
    token_request.token = Some(TokenSpec {
        address: USDT.to_string(),
        decimals: 6,
    });
    assert!(matches!(
        service.build_and_sign(&token_request, &btc_key).await,
        Err(WalletError::InvalidRequest(_))
    ));
    // 密钥不控制发送地址
    assert!(matches!(
        service
            .build_and_sign(&request("bitcoin", BTC_0, BTC_1, "1"), &key(Chain::Bitcoin, 1))
            .await,
        Err(WalletError::InvalidRequest(_))
    ));
    // 密钥属于其他链
    assert!(matches!(
        service
            .build_and_sign(&request("bitcoin", BTC_0, BTC_1, "1"), &key(Chain::Ethereum, 0))
            .await,
        Err(WalletError::InvalidRequest(_))
    ));

    assert_eq!(stub.calls(), 0);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 各链构建
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn test_ethereum_eip1559_transfer() {
    let stub = StubService::new(Chain::Ethereum, evm_state(21_000));
    let service = service_with(&stub).await;

    // 发送地址大小写不影响校验
    let signed = service
        .build_and_sign(
            &request("eth", &ETH_0.to_lowercase(), ETH_1, "0.5"),
            &key(Chain::Ethereum, 0),
        )
        .await
        .unwrap();

    assert_eq!(signed.chain, Chain::Ethereum);
    assert!(signed.raw_transaction_hex.starts_with("0x02"));
    let raw = hex::decode(&signed.raw_transaction_hex[2..]).unwrap();
    assert_eq!(
        signed.transaction_hash,
        format!("0x{}", hex::encode(ethers::utils::keccak256(&raw)))
    );
    assert_eq!(signed.fee, (21_000u128 * 30_000_000_000u128).to_string());
    assert_eq!(stub.calls(), 1);
    assert_eq!(stub.broadcasts(), 0);
}

#[tokio::test]
async fn test_imported_private_key_signs_like_derived_key() {
    let stub = StubService::new(Chain::Ethereum, evm_state(21_000));
    let service = service_with(&stub).await;
    let derived = key(Chain::Ethereum, 0);

    let strategy =
        DerivationStrategyFactory::create_strategy(Chain::Ethereum, &ChainsConfig::default())
            .unwrap();
    let imported = KeyPair::from_private_key(
        strategy.as_ref(),
        zeroize::Zeroizing::new(derived.private_key().to_vec()),
    )
    .unwrap();

    let req = request("eth", ETH_0, ETH_1, "0.25");
    let from_import = service.build_and_sign(&req, &imported).await.unwrap();
    let from_seed = service.build_and_sign(&req, &derived).await.unwrap();

    // RFC6979 确定性签名
    assert_eq!(from_import.raw_transaction_hex, from_seed.raw_transaction_hex);
    assert_eq!(from_import.transaction_hash, from_seed.transaction_hash);
}

#[tokio::test]
async fn test_imported_key_for_other_address_is_rejected() {
    let stub = StubService::new(Chain::Ethereum, evm_state(21_000));
    let service = service_with(&stub).await;

    let strategy =
        DerivationStrategyFactory::create_strategy(Chain::Ethereum, &ChainsConfig::default())
            .unwrap();
    let imported =
        KeyPair::from_private_key(strategy.as_ref(), zeroize::Zeroizing::new(vec![0x11; 32]))
            .unwrap();

    let result = service
        .build_and_sign(&request("eth", ETH_0, ETH_1, "0.25"), &imported)
        .await;
    assert!(matches!(result, Err(WalletError::InvalidRequest(_))));
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_ethereum_token_transfer_uses_token_decimals() {
    let stub = StubService::new(Chain::Ethereum, evm_state(65_000));
    let service = service_with(&stub).await;

    let mut token_request = request("ethereum", ETH_0, ETH_1, "1.5");
    token_request.token = Some(TokenSpec {
        address: USDT.to_string(),
        decimals: 6,
    });
    let validated = service
        .validate(&token_request, &key(Chain::Ethereum, 0))
        .unwrap();
    assert_eq!(validated.amount, 1_500_000);

    let signed = service
        .build_and_sign(&token_request, &key(Chain::Ethereum, 0))
        .await
        .unwrap();
    // calldata 以 transfer 选择器开头
    assert!(signed.raw_transaction_hex.contains("a9059cbb"));
    assert_eq!(signed.fee, (65_000u128 * 30_000_000_000u128).to_string());
}

#[tokio::test]
async fn test_bitcoin_transfer_conserves_value() {
    let utxos = vec![utxo(1, 0, 50_000), utxo(1, 0, 50_000), utxo(2, 1, 80_000)];
    let stub = StubService::new(
        Chain::Bitcoin,
        NetworkState::Utxo {
            utxos,
            fee_rate: 10,
        },
    );
    let service = service_with(&stub).await;

    let signed = service
        .build_and_sign(&request("btc", BTC_0, BTC_1, "0.0006"), &key(Chain::Bitcoin, 0))
        .await
        .unwrap();

    let tx = decode_utxo_tx(&signed.raw_transaction_hex);
    assert_eq!(tx.txid().to_string(), signed.transaction_hash);

    // 重复的 outpoint 只花一次
    let outpoints: HashSet<_> = tx.input.iter().map(|i| i.previous_output).collect();
    assert_eq!(outpoints.len(), tx.input.len());
    assert_eq!(tx.input.len(), 2);

    let fee: u64 = signed.fee.parse().unwrap();
    let outputs: u64 = tx.output.iter().map(|o| o.value.to_sat()).sum();
    assert_eq!(outputs + fee, 130_000);
    assert_eq!(tx.output[0].value.to_sat(), 60_000);
    assert!(tx.input.iter().all(|i| i.witness.len() == 2));
}

#[tokio::test]
async fn test_bitcoin_insufficient_funds() {
    let stub = StubService::new(
        Chain::Bitcoin,
        NetworkState::Utxo {
            utxos: vec![utxo(1, 0, 10_000)],
            fee_rate: 10,
        },
    );
    let service = service_with(&stub).await;

    let result = service
        .build_and_sign(&request("bitcoin", BTC_0, BTC_1, "0.001"), &key(Chain::Bitcoin, 0))
        .await;
    assert!(matches!(
        result,
        Err(WalletError::InsufficientFunds {
            chain: Chain::Bitcoin,
            available: 10_000,
            ..
        })
    ));
}

#[tokio::test]
async fn test_dogecoin_legacy_transfer() {
    let stub = StubService::new(
        Chain::Dogecoin,
        NetworkState::Utxo {
            utxos: vec![utxo(3, 0, 300_000_000)],
            fee_rate: 1_000,
        },
    );
    let service = service_with(&stub).await;

    let signed = service
        .build_and_sign(&request("doge", DOGE_0, DOGE_0, "1"), &key(Chain::Dogecoin, 0))
        .await
        .unwrap();

    let tx = decode_utxo_tx(&signed.raw_transaction_hex);
    assert!(tx.input.iter().all(|i| !i.script_sig.is_empty() && i.witness.is_empty()));
    assert_eq!(tx.output[0].value.to_sat(), 100_000_000);

    let fee: u64 = signed.fee.parse().unwrap();
    let outputs: u64 = tx.output.iter().map(|o| o.value.to_sat()).sum();
    assert_eq!(outputs + fee, 300_000_000);
}

#[tokio::test]
async fn test_ton_first_transfer_carries_state_init() {
    let stub = StubService::new(Chain::Ton, NetworkState::Ton { seqno: 0 });
    let service = service_with(&stub).await;

    // 非 bounceable 形式的发送地址同样匹配
    let signed = service
        .build_and_sign(
            &request("ton", TON_0_NON_BOUNCEABLE, TON_0, "0.25"),
            &key(Chain::Ton, 0),
        )
        .await
        .unwrap();

    let cell = Cell::from_boc(&hex::decode(&signed.raw_transaction_hex).unwrap()).unwrap();
    assert_eq!(hex::encode(cell.hash()), signed.transaction_hash);
    assert_eq!(cell.refs().len(), 2);
    assert_eq!(signed.fee, TON_TRANSFER_FEE_ESTIMATE.to_string());
}

#[tokio::test]
async fn test_mismatched_network_state_is_an_error() {
    let stub = StubService::new(Chain::Ethereum, NetworkState::Ton { seqno: 1 });
    let service = service_with(&stub).await;

    let result = service
        .build_and_sign(&request("ethereum", ETH_0, ETH_1, "1"), &key(Chain::Ethereum, 0))
        .await;
    assert!(matches!(result, Err(WalletError::Network { .. })));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 广播
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn test_send_broadcasts_only_when_asked() {
    let stub = StubService::new(Chain::Ethereum, evm_state(21_000));
    let service = service_with(&stub).await;
    let req = request("ethereum", ETH_0, ETH_1, "0.01");
    let eth_key = key(Chain::Ethereum, 0);

    let offline = service.send(&req, &eth_key, false).await.unwrap();
    assert_eq!(stub.broadcasts(), 0);

    let online = service.send(&req, &eth_key, true).await.unwrap();
    assert_eq!(stub.broadcasts(), 1);
    // 同样的 nonce 与费用得到同一笔交易
    assert_eq!(offline, online);
}
