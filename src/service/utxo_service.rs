//! UTXO 链服务（Bitcoin / Dogecoin，Esplora 风格 REST）
//!
//! 两条链共用同一套 REST 接口，差异只在地址格式、粉尘阈值与费率来源。
//! 不支持推送，订阅为空操作。

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;

use crate::{
    config::{ChainsConfig, UtxoNetworkConfig},
    domain::{
        chain_config::{Chain, ChainConfig, ChainRegistry},
        derivation::{DerivationStrategy, DerivationStrategyFactory},
        transaction_status::TransactionStatus,
    },
    error::{WalletError, WalletResult},
    infrastructure::{log_redact::redact_address, rpc_validator},
    service::{
        blockchain_client::ProviderClient,
        blockchain_service::{
            Balance, BlockId, BlockchainService, ChainBlock, ChainTransaction, FeeEstimateRequest,
            NetworkState, NetworkStateRequest, Subscription, Utxo,
        },
        transaction_builder::utxo::{recipient_script, select_coins},
    },
};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Esplora 响应结构
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Default, Deserialize)]
struct AddressStats {
    funded_txo_sum: u64,
    spent_txo_sum: u64,
}

#[derive(Debug, Deserialize)]
struct AddressInfo {
    #[serde(default)]
    chain_stats: AddressStats,
    #[serde(default)]
    mempool_stats: AddressStats,
}

#[derive(Debug, Default, Deserialize)]
struct TxStatus {
    #[serde(default)]
    confirmed: bool,
    block_height: Option<u64>,
    block_hash: Option<String>,
    block_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TxOutput {
    scriptpubkey_address: Option<String>,
    value: u64,
}

#[derive(Debug, Deserialize)]
struct TxInput {
    prevout: Option<TxOutput>,
}

#[derive(Debug, Deserialize)]
struct EsploraTransaction {
    txid: String,
    #[serde(default)]
    vin: Vec<TxInput>,
    #[serde(default)]
    vout: Vec<TxOutput>,
    fee: Option<u64>,
    #[serde(default)]
    status: TxStatus,
}

#[derive(Debug, Deserialize)]
struct EsploraBlock {
    id: String,
    height: u64,
    previousblockhash: Option<String>,
    timestamp: i64,
    tx_count: usize,
}

#[derive(Debug, Deserialize)]
struct EsploraUtxo {
    txid: String,
    vout: u32,
    value: u64,
}

pub struct UtxoService {
    chain: Chain,
    client: ProviderClient,
    api_url: String,
    fee_target_blocks: u32,
    fallback_fee_rate: u64,
    chain_config: ChainConfig,
    strategy: Box<dyn DerivationStrategy>,
}

impl UtxoService {
    pub fn new(chain: Chain, chains: &ChainsConfig) -> WalletResult<Self> {
        let network: &UtxoNetworkConfig = match chain {
            Chain::Bitcoin => &chains.bitcoin,
            Chain::Dogecoin => &chains.dogecoin,
            other => {
                return Err(WalletError::UnsupportedChain(format!(
                    "{} is not a UTXO chain",
                    other
                )))
            }
        };

        let registry = ChainRegistry::from_config(chains);

        Ok(Self {
            chain,
            client: ProviderClient::new(chain, chains.request_timeout_secs, HeaderMap::new())?,
            api_url: network.api_url.trim_end_matches('/').to_string(),
            fee_target_blocks: network.fee_target_blocks,
            fallback_fee_rate: network.fallback_fee_rate,
            chain_config: registry.get(chain)?.clone(),
            strategy: DerivationStrategyFactory::from_registry(chain, &registry, chains)?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// 进入 URL 路径的 txid / 区块哈希：64 位十六进制，统一小写
    fn path_hash(&self, hash: &str) -> WalletResult<String> {
        rpc_validator::validate_tx_hash(hash.trim())
            .map(|h| h.trim_start_matches("0x").to_string())
            .map_err(|e| WalletError::InvalidRequest(format!("{} hash: {}", self.chain, e)))
    }

    fn ensure_address(&self, address: &str) -> WalletResult<()> {
        if self.validate_address(address) {
            Ok(())
        } else {
            Err(WalletError::invalid_address(self.chain, address))
        }
    }

    /// 未花费输出，保持 provider 返回顺序
    pub async fn list_unspent(&self, address: &str) -> WalletResult<Vec<Utxo>> {
        self.ensure_address(address)?;
        let utxos: Vec<EsploraUtxo> = self
            .client
            .get_json(&self.url(&format!("/address/{}/utxo", address)), "list_unspent")
            .await?;

        tracing::debug!(
            chain = %self.chain,
            address = %redact_address(address),
            count = utxos.len(),
            "fetched unspent outputs"
        );

        Ok(utxos
            .into_iter()
            .map(|u| Utxo {
                txid: u.txid,
                vout: u.vout,
                value: u.value,
            })
            .collect())
    }

    /// 目标确认块数对应的费率（最小单位 / vbyte，向上取整）
    ///
    /// 没有精确目标时取更大目标中最近的一档，都没有时使用配置的兜底费率
    pub async fn fee_rate(&self) -> WalletResult<u64> {
        let estimates: std::collections::HashMap<String, f64> = self
            .client
            .get_json(&self.url("/fee-estimates"), "fee_estimates")
            .await?;

        let rate = estimates
            .iter()
            .filter_map(|(target, rate)| target.parse::<u32>().ok().map(|t| (t, *rate)))
            .filter(|(target, _)| *target >= self.fee_target_blocks)
            .min_by_key(|(target, _)| *target)
            .map(|(_, rate)| rate);

        Ok(match rate {
            Some(rate) if rate.is_finite() && rate > 0.0 => (rate.ceil() as u64).max(1),
            _ => {
                tracing::debug!(
                    chain = %self.chain,
                    fallback = self.fallback_fee_rate,
                    "no fee estimate for target, using fallback rate"
                );
                self.fallback_fee_rate
            }
        })
    }

    fn to_chain_transaction(&self, tx: EsploraTransaction) -> ChainTransaction {
        let from = tx
            .vin
            .iter()
            .find_map(|i| i.prevout.as_ref().and_then(|p| p.scriptpubkey_address.clone()));
        let first_output = tx.vout.first();

        ChainTransaction {
            chain: self.chain,
            hash: tx.txid,
            from,
            to: first_output.and_then(|o| o.scriptpubkey_address.clone()),
            value: first_output.map_or(0, |o| o.value).to_string(),
            fee: tx.fee.map(|f| f.to_string()),
            block_number: tx.status.block_height,
            block_hash: tx.status.block_hash,
            timestamp: tx.status.block_time,
            status: if tx.status.confirmed {
                TransactionStatus::Confirmed
            } else {
                TransactionStatus::Pending
            },
        }
    }

    fn reject_token(&self, token: &Option<String>) -> WalletResult<()> {
        match token {
            Some(_) => Err(WalletError::InvalidRequest(format!(
                "token transfers are not supported on {}",
                self.chain
            ))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BlockchainService for UtxoService {
    fn chain(&self) -> Chain {
        self.chain
    }

    async fn get_balance(&self, address: &str) -> WalletResult<Balance> {
        self.ensure_address(address)?;
        let info: AddressInfo = self
            .client
            .get_json(&self.url(&format!("/address/{}", address)), "get_balance")
            .await?;

        // 已确认 + 内存池
        let funded = info.chain_stats.funded_txo_sum as i128 + info.mempool_stats.funded_txo_sum as i128;
        let spent = info.chain_stats.spent_txo_sum as i128 + info.mempool_stats.spent_txo_sum as i128;

        Ok(Balance {
            chain: self.chain,
            address: address.to_string(),
            native: (funded - spent).max(0).to_string(),
            tokens: Vec::new(),
        })
    }

    async fn get_transaction(&self, hash: &str) -> WalletResult<Option<ChainTransaction>> {
        let hash = self.path_hash(hash)?;
        let tx: Option<EsploraTransaction> = self
            .client
            .get_optional_json(&self.url(&format!("/tx/{}", hash)), "get_transaction")
            .await?;
        Ok(tx.map(|tx| self.to_chain_transaction(tx)))
    }

    async fn get_block(&self, id: &BlockId) -> WalletResult<Option<ChainBlock>> {
        let hash = match id {
            BlockId::Hash(hash) => self.path_hash(hash)?,
            BlockId::Number(height) => {
                match self
                    .client
                    .get_optional_text(&self.url(&format!("/block-height/{}", height)), "get_block")
                    .await?
                {
                    Some(hash) => hash.trim().to_string(),
                    None => return Ok(None),
                }
            }
        };

        let block: Option<EsploraBlock> = self
            .client
            .get_optional_json(&self.url(&format!("/block/{}", hash)), "get_block")
            .await?;

        Ok(block.map(|b| ChainBlock {
            chain: self.chain,
            number: b.height,
            hash: b.id,
            parent_hash: b.previousblockhash,
            timestamp: Some(b.timestamp),
            transaction_count: b.tx_count,
        }))
    }

    async fn get_latest_block(&self) -> WalletResult<ChainBlock> {
        let tip = self
            .client
            .get_text(&self.url("/blocks/tip/hash"), "get_latest_block")
            .await?;
        if rpc_validator::validate_tx_hash(tip.trim()).is_err() {
            return Err(WalletError::network(
                self.chain,
                "get_latest_block",
                format!("malformed tip hash: {}", tip.trim()),
            ));
        }
        self.get_block(&BlockId::Hash(tip.trim().to_string()))
            .await?
            .ok_or_else(|| WalletError::network(self.chain, "get_latest_block", "tip block not found"))
    }

    async fn get_transaction_history(
        &self,
        address: &str,
        limit: usize,
    ) -> WalletResult<Vec<ChainTransaction>> {
        self.ensure_address(address)?;
        let txs: Vec<EsploraTransaction> = self
            .client
            .get_json(
                &self.url(&format!("/address/{}/txs", address)),
                "get_transaction_history",
            )
            .await?;

        Ok(txs
            .into_iter()
            .take(limit)
            .map(|tx| self.to_chain_transaction(tx))
            .collect())
    }

    async fn estimate_fee(&self, request: &FeeEstimateRequest) -> WalletResult<String> {
        self.reject_token(&request.token)?;
        self.ensure_address(&request.to)?;
        let amount: u64 = request
            .amount
            .trim()
            .parse()
            .map_err(|_| WalletError::InvalidAmount(format!("not a minor-unit integer: {}", request.amount)))?;

        let utxos = self.list_unspent(&request.from).await?;
        let rate = self.fee_rate().await?;
        let recipient = recipient_script(&self.chain_config, &request.to)?;
        let selection = select_coins(
            self.chain,
            &utxos,
            amount,
            &recipient,
            rate,
            self.chain_config.dust_limit,
        )?;
        Ok(selection.fee.to_string())
    }

    async fn broadcast_transaction(&self, raw_transaction_hex: &str) -> WalletResult<String> {
        let raw = raw_transaction_hex.trim_start_matches("0x");
        if raw.is_empty() || hex::decode(raw).is_err() {
            return Err(WalletError::InvalidRequest(
                "raw transaction must be hex".to_string(),
            ));
        }

        let txid = self
            .client
            .post_text(&self.url("/tx"), raw.to_string(), "broadcast_transaction")
            .await?;
        tracing::info!(tx_hash = %txid, chain = %self.chain, "transaction broadcast");
        Ok(txid)
    }

    fn validate_address(&self, address: &str) -> bool {
        self.strategy.validate_address(address)
    }

    async fn subscribe_to_address(&self, address: &str) -> WalletResult<Subscription> {
        self.ensure_address(address)?;
        Ok(Subscription::inactive(self.chain))
    }

    async fn subscribe_to_blocks(&self) -> WalletResult<Subscription> {
        Ok(Subscription::inactive(self.chain))
    }

    async fn fetch_network_state(&self, request: &NetworkStateRequest) -> WalletResult<NetworkState> {
        self.reject_token(&request.token)?;

        let fee_rate = match request.fee.fee_rate {
            Some(rate) if rate > 0 => rate,
            Some(_) => {
                return Err(WalletError::InvalidRequest(
                    "feeRate must be positive".to_string(),
                ))
            }
            None => self.fee_rate().await?,
        };

        Ok(NetworkState::Utxo {
            utxos: self.list_unspent(&request.from).await?,
            fee_rate,
        })
    }
}
