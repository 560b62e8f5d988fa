//! TON 服务（toncenter v2 HTTP API）
//!
//! 按哈希查询交易与区块需要配置 toncenter v3 index（`index_url`）。
//! 区块按主链 seqno 或 root hash 查询，未知区块返回 `None`。不支持推送，订阅为空操作。

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    config::{ChainsConfig, TonNetworkConfig},
    domain::{
        chain_config::Chain,
        derivation::{DerivationStrategy, DerivationStrategyFactory},
        transaction_status::TransactionStatus,
    },
    error::{WalletError, WalletResult},
    infrastructure::log_redact::redact_address,
    service::{
        blockchain_client::ProviderClient,
        blockchain_service::{
            Balance, BlockId, BlockchainService, ChainBlock, ChainTransaction, FeeEstimateRequest,
            NetworkState, NetworkStateRequest, Subscription,
        },
    },
};

/// 单笔钱包转账的手续费估算（nanoton）
pub const TON_TRANSFER_FEE_ESTIMATE: u64 = 10_000_000;

/// 主链 shard 标识
const MASTERCHAIN_SHARD: &str = "-9223372036854775808";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// toncenter 响应结构
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
struct TonResponse<T> {
    ok: bool,
    result: Option<T>,
    error: Option<String>,
    code: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct BlockIdExt {
    seqno: u64,
    root_hash: String,
}

#[derive(Debug, Deserialize)]
struct MasterchainInfo {
    last: BlockIdExt,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    id: BlockIdExt,
    gen_utime: Option<i64>,
    #[serde(default)]
    prev_blocks: Vec<BlockIdExt>,
}

#[derive(Debug, Deserialize)]
struct BlockTransactions {
    #[serde(default)]
    transactions: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct TonMessage {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    destination: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionId {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct TonTransaction {
    utime: i64,
    transaction_id: TransactionId,
    #[serde(default)]
    fee: String,
    #[serde(default)]
    in_msg: Option<TonMessage>,
    #[serde(default)]
    out_msgs: Vec<TonMessage>,
}

#[derive(Debug, Deserialize)]
struct IndexTransactions {
    #[serde(default)]
    transactions: Vec<IndexTransaction>,
}

#[derive(Debug, Deserialize)]
struct IndexTransaction {
    hash: String,
    now: i64,
    #[serde(default)]
    total_fees: String,
    mc_block_seqno: Option<u64>,
    #[serde(default)]
    in_msg: Option<TonMessage>,
    #[serde(default)]
    out_msgs: Vec<TonMessage>,
    #[serde(default)]
    description: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct IndexBlocks {
    #[serde(default)]
    blocks: Vec<IndexBlock>,
}

#[derive(Debug, Deserialize)]
struct IndexBlock {
    seqno: u64,
    root_hash: String,
    /// v3 index 以字符串或数字返回
    #[serde(default)]
    gen_utime: serde_json::Value,
    #[serde(default)]
    tx_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RunGetMethodResult {
    exit_code: i64,
    #[serde(default)]
    stack: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SendBocResult {
    hash: String,
}

/// toncenter 对未知或尚未应用的区块返回 `ok=false`
fn is_unknown_block(error: Option<&str>, code: Option<i64>) -> bool {
    if code == Some(404) {
        return true;
    }
    let error = error.unwrap_or_default().to_ascii_lowercase();
    ["not applied", "not found", "cannot load block", "not in db"]
        .iter()
        .any(|pattern| error.contains(pattern))
}

fn json_as_i64(value: &serde_json::Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn base64_to_hex(value: &str) -> Option<String> {
    base64::engine::general_purpose::STANDARD
        .decode(value)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(value))
        .ok()
        .map(hex::encode)
}

pub struct TonService {
    client: ProviderClient,
    api_url: String,
    index_url: Option<String>,
    strategy: Box<dyn DerivationStrategy>,
}

impl TonService {
    pub fn new(chains: &ChainsConfig) -> WalletResult<Self> {
        let ton: &TonNetworkConfig = &chains.ton;
        let mut headers = HeaderMap::new();
        if let Some(key) = &ton.api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|_| WalletError::Config("TON api_key is not a valid header value".to_string()))?;
            headers.insert("X-API-Key", value);
        }

        Ok(Self {
            client: ProviderClient::new(Chain::Ton, chains.request_timeout_secs, headers)?,
            api_url: ton.api_url.trim_end_matches('/').to_string(),
            index_url: ton.index_url.as_ref().map(|u| u.trim_end_matches('/').to_string()),
            strategy: DerivationStrategyFactory::create_strategy(Chain::Ton, chains)?,
        })
    }

    fn ensure_address(&self, address: &str) -> WalletResult<()> {
        if self.validate_address(address) {
            Ok(())
        } else {
            Err(WalletError::invalid_address(Chain::Ton, address))
        }
    }

    fn method_url(&self, method: &str, query: &[(&str, String)]) -> WalletResult<String> {
        let url = format!("{}/{}", self.api_url, method);
        reqwest::Url::parse_with_params(&url, query)
            .map(|u| u.to_string())
            .map_err(|e| WalletError::Config(format!("invalid TON api_url: {}", e)))
    }

    fn unwrap_response<T>(&self, method: &str, response: TonResponse<T>) -> WalletResult<T> {
        if !response.ok {
            return Err(WalletError::network(
                Chain::Ton,
                method,
                format!(
                    "toncenter error {}: {}",
                    response.code.unwrap_or_default(),
                    response.error.unwrap_or_default()
                ),
            ));
        }
        response
            .result
            .ok_or_else(|| WalletError::network(Chain::Ton, method, "missing result"))
    }

    async fn envelope<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> WalletResult<TonResponse<T>> {
        let (status, body) = self
            .client
            .get_with_status(&self.method_url(method, query)?, method)
            .await?;
        serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                WalletError::network(Chain::Ton, method, format!("invalid JSON: {}", e))
            } else {
                WalletError::network(Chain::Ton, method, format!("HTTP {}: {}", status, body))
            }
        })
    }

    async fn get<T: DeserializeOwned>(&self, method: &str, query: &[(&str, String)]) -> WalletResult<T> {
        let response = self.envelope(method, query).await?;
        self.unwrap_response(method, response)
    }

    /// 区块查询：未知区块为 `None`，其他错误照常返回
    async fn get_block_part<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> WalletResult<Option<T>> {
        let response: TonResponse<T> = self.envelope(method, query).await?;
        if !response.ok && is_unknown_block(response.error.as_deref(), response.code) {
            tracing::debug!(method, error = ?response.error, "toncenter reports unknown block");
            return Ok(None);
        }
        self.unwrap_response(method, response).map(Some)
    }

    /// 通过 v3 index 按 root hash 查询主链区块；未配置 index 时为 `None`
    async fn get_block_by_hash(&self, hash: &str) -> WalletResult<Option<ChainBlock>> {
        let Some(index_url) = &self.index_url else {
            tracing::debug!("ton.index_url not configured, block hash lookup unavailable");
            return Ok(None);
        };

        let url = reqwest::Url::parse_with_params(
            &format!("{}/blocks", index_url),
            &[
                ("workchain", "-1".to_string()),
                ("root_hash", hash.to_string()),
                ("limit", "1".to_string()),
            ],
        )
        .map_err(|e| WalletError::Config(format!("invalid TON index_url: {}", e)))?;

        let found: Option<IndexBlocks> = self.client.get_optional_json(url.as_str(), "get_block").await?;
        let Some(block) = found.and_then(|f| f.blocks.into_iter().next()) else {
            return Ok(None);
        };

        Ok(Some(ChainBlock {
            chain: Chain::Ton,
            number: block.seqno,
            hash: base64_to_hex(&block.root_hash).unwrap_or(block.root_hash),
            parent_hash: None,
            timestamp: json_as_i64(&block.gen_utime),
            transaction_count: block.tx_count.unwrap_or_default(),
        }))
    }

    async fn post<T: DeserializeOwned>(&self, method: &str, body: serde_json::Value) -> WalletResult<T> {
        let url = format!("{}/{}", self.api_url, method);
        let response: TonResponse<T> = self.client.post_json(&url, &body, method).await?;
        self.unwrap_response(method, response)
    }

    /// 钱包 seqno；合约未部署（get 方法失败）时为 0
    pub async fn get_seqno(&self, address: &str) -> WalletResult<u32> {
        self.ensure_address(address)?;
        let result: RunGetMethodResult = self
            .post(
                "runGetMethod",
                serde_json::json!({"address": address, "method": "seqno", "stack": []}),
            )
            .await?;

        if result.exit_code != 0 {
            tracing::debug!(
                address = %redact_address(address),
                exit_code = result.exit_code,
                "seqno get-method failed, treating wallet as undeployed"
            );
            return Ok(0);
        }

        // [["num", "0x5"]]
        let raw = result
            .stack
            .first()
            .and_then(|entry| entry.get(1))
            .and_then(|v| v.as_str())
            .ok_or_else(|| WalletError::network(Chain::Ton, "runGetMethod", "empty seqno stack"))?;
        u32::from_str_radix(raw.trim_start_matches("0x"), 16)
            .map_err(|e| WalletError::network(Chain::Ton, "runGetMethod", format!("bad seqno {}: {}", raw, e)))
    }

    fn transfer_direction(
        address: Option<&str>,
        in_msg: Option<TonMessage>,
        out_msgs: Vec<TonMessage>,
    ) -> (Option<String>, Option<String>, String) {
        // 外部消息没有 source
        let incoming = in_msg.filter(|m| m.source.as_deref().map_or(false, |s| !s.is_empty()));
        match incoming {
            Some(msg)
                if out_msgs.is_empty()
                    || address.map_or(false, |a| Some(a) == msg.destination.as_deref()) =>
            {
                (msg.source, msg.destination, msg.value.unwrap_or_else(|| "0".to_string()))
            }
            _ => {
                let total: u128 = out_msgs
                    .iter()
                    .filter_map(|m| m.value.as_deref().and_then(|v| v.parse::<u128>().ok()))
                    .sum();
                let to = out_msgs.first().and_then(|m| m.destination.clone());
                (address.map(str::to_string), to, total.to_string())
            }
        }
    }
}

#[async_trait]
impl BlockchainService for TonService {
    fn chain(&self) -> Chain {
        Chain::Ton
    }

    async fn get_balance(&self, address: &str) -> WalletResult<Balance> {
        self.ensure_address(address)?;
        let balance: String = self
            .get("getAddressBalance", &[("address", address.to_string())])
            .await?;
        Ok(Balance {
            chain: Chain::Ton,
            address: address.to_string(),
            native: balance,
            tokens: Vec::new(),
        })
    }

    async fn get_transaction(&self, hash: &str) -> WalletResult<Option<ChainTransaction>> {
        let Some(index_url) = &self.index_url else {
            return Err(WalletError::Config(
                "TON transaction lookup by hash requires ton.index_url".to_string(),
            ));
        };

        let url = reqwest::Url::parse_with_params(
            &format!("{}/transactions", index_url),
            &[("hash", hash.to_string()), ("limit", "1".to_string())],
        )
        .map_err(|e| WalletError::Config(format!("invalid TON index_url: {}", e)))?;

        let found: IndexTransactions = self.client.get_json(url.as_str(), "get_transaction").await?;
        let Some(tx) = found.transactions.into_iter().next() else {
            return Ok(None);
        };

        let aborted = tx.description.get("aborted").and_then(|v| v.as_bool()).unwrap_or(false);
        let (from, to, value) = Self::transfer_direction(None, tx.in_msg, tx.out_msgs);
        Ok(Some(ChainTransaction {
            chain: Chain::Ton,
            hash: base64_to_hex(&tx.hash).unwrap_or(tx.hash),
            from,
            to,
            value,
            fee: Some(tx.total_fees),
            block_number: tx.mc_block_seqno,
            block_hash: None,
            timestamp: Some(tx.now),
            status: if aborted {
                TransactionStatus::Failed
            } else {
                TransactionStatus::Confirmed
            },
        }))
    }

    async fn get_block(&self, id: &BlockId) -> WalletResult<Option<ChainBlock>> {
        let seqno = match id {
            BlockId::Number(seqno) => *seqno,
            BlockId::Hash(hash) => return self.get_block_by_hash(hash).await,
        };

        let query = [
            ("workchain", "-1".to_string()),
            ("shard", MASTERCHAIN_SHARD.to_string()),
            ("seqno", seqno.to_string()),
        ];
        let Some(header) = self.get_block_part::<BlockHeader>("getBlockHeader", &query).await? else {
            return Ok(None);
        };
        let transactions: BlockTransactions = self.get("getBlockTransactions", &query).await?;

        Ok(Some(ChainBlock {
            chain: Chain::Ton,
            number: header.id.seqno,
            hash: base64_to_hex(&header.id.root_hash).unwrap_or(header.id.root_hash),
            parent_hash: header
                .prev_blocks
                .into_iter()
                .next()
                .map(|b| base64_to_hex(&b.root_hash).unwrap_or(b.root_hash)),
            timestamp: header.gen_utime,
            transaction_count: transactions.transactions.len(),
        }))
    }

    async fn get_latest_block(&self) -> WalletResult<ChainBlock> {
        let info: MasterchainInfo = self.get("getMasterchainInfo", &[]).await?;
        self.get_block(&BlockId::Number(info.last.seqno))
            .await?
            .ok_or_else(|| WalletError::network(Chain::Ton, "getBlockHeader", "latest block not found"))
    }

    async fn get_transaction_history(
        &self,
        address: &str,
        limit: usize,
    ) -> WalletResult<Vec<ChainTransaction>> {
        self.ensure_address(address)?;
        let txs: Vec<TonTransaction> = self
            .get(
                "getTransactions",
                &[
                    ("address", address.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        Ok(txs
            .into_iter()
            .take(limit)
            .map(|tx| {
                let (from, to, value) =
                    Self::transfer_direction(Some(address), tx.in_msg, tx.out_msgs);
                ChainTransaction {
                    chain: Chain::Ton,
                    hash: base64_to_hex(&tx.transaction_id.hash).unwrap_or(tx.transaction_id.hash),
                    from,
                    to,
                    value,
                    fee: Some(tx.fee),
                    block_number: None,
                    block_hash: None,
                    timestamp: Some(tx.utime),
                    status: TransactionStatus::Confirmed,
                }
            })
            .collect())
    }

    async fn estimate_fee(&self, request: &FeeEstimateRequest) -> WalletResult<String> {
        if request.token.is_some() {
            return Err(WalletError::InvalidRequest(
                "token transfers are not supported on ton".to_string(),
            ));
        }
        self.ensure_address(&request.from)?;
        self.ensure_address(&request.to)?;
        Ok(TON_TRANSFER_FEE_ESTIMATE.to_string())
    }

    async fn broadcast_transaction(&self, raw_transaction_hex: &str) -> WalletResult<String> {
        let boc = hex::decode(raw_transaction_hex.trim_start_matches("0x"))
            .map_err(|_| WalletError::InvalidRequest("raw transaction must be BOC hex".to_string()))?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(boc);

        let result: SendBocResult = self
            .post("sendBocReturnHash", serde_json::json!({"boc": encoded}))
            .await?;
        let hash = base64_to_hex(&result.hash).unwrap_or(result.hash);

        tracing::info!(tx_hash = %hash, chain = %Chain::Ton, "message broadcast");
        Ok(hash)
    }

    fn validate_address(&self, address: &str) -> bool {
        self.strategy.validate_address(address)
    }

    async fn subscribe_to_address(&self, address: &str) -> WalletResult<Subscription> {
        self.ensure_address(address)?;
        Ok(Subscription::inactive(Chain::Ton))
    }

    async fn subscribe_to_blocks(&self) -> WalletResult<Subscription> {
        Ok(Subscription::inactive(Chain::Ton))
    }

    async fn fetch_network_state(&self, request: &NetworkStateRequest) -> WalletResult<NetworkState> {
        if request.token.is_some() {
            return Err(WalletError::InvalidRequest(
                "token transfers are not supported on ton".to_string(),
            ));
        }
        let seqno = match request.nonce {
            Some(nonce) => u32::try_from(nonce)
                .map_err(|_| WalletError::InvalidRequest(format!("seqno out of range: {}", nonce)))?,
            None => self.get_seqno(&request.from).await?,
        };
        Ok(NetworkState::Ton { seqno })
    }
}
