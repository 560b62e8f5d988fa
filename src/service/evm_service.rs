//! EVM 区块链服务（JSON-RPC）
//!
//! 查询走 HTTP JSON-RPC；配置了 `ws_url` 时通过 ethers `Provider<Ws>` 推送新区块，
//! 地址订阅在每个新区块后比较余额。未配置 `ws_url` 时订阅为空操作。

use async_trait::async_trait;
use ethers::{
    providers::{Middleware, Provider, Ws},
    types::U256,
};
use futures::StreamExt;
use reqwest::header::HeaderMap;
use tokio::sync::mpsc;

use crate::{
    config::EvmNetworkConfig,
    domain::{
        chain_config::Chain, derivation::is_valid_evm_address,
        transaction_status::TransactionStatus,
    },
    error::{WalletError, WalletResult},
    infrastructure::{log_redact::redact_address, rpc_validator},
    service::{
        blockchain_client::ProviderClient,
        blockchain_service::{
            Balance, BlockId, BlockchainService, ChainBlock, ChainEvent, ChainTransaction,
            EvmFeeData, FeeEstimateRequest, NetworkState, NetworkStateRequest, Subscription,
            TokenBalance, SUBSCRIPTION_BUFFER,
        },
        transaction_builder::evm::erc20_transfer_data,
    },
};

/// ERC-20 balanceOf(address)
const BALANCE_OF_SELECTOR: &str = "70a08231";

/// 合约调用 gas 估算上浮比例（%）
const CONTRACT_GAS_MARGIN_PERCENT: u64 = 20;

/// 合约调用的 gas 余量（溢出时饱和）
fn with_contract_margin(gas: u64) -> u64 {
    gas.saturating_add(gas.saturating_mul(CONTRACT_GAS_MARGIN_PERCENT) / 100)
}

pub struct EvmService {
    client: ProviderClient,
    rpc_url: String,
    ws_url: Option<String>,
    chain_id: u64,
}

impl EvmService {
    pub fn new(config: &EvmNetworkConfig, timeout_secs: u64) -> WalletResult<Self> {
        Ok(Self {
            client: ProviderClient::new(Chain::Ethereum, timeout_secs, HeaderMap::new())?,
            rpc_url: config.rpc_url.clone(),
            ws_url: config.ws_url.clone(),
            chain_id: config.chain_id,
        })
    }

    async fn rpc(&self, method: &str, params: serde_json::Value) -> WalletResult<serde_json::Value> {
        self.client.json_rpc(&self.rpc_url, method, params).await
    }

    fn parse_u64(&self, operation: &str, value: &serde_json::Value) -> WalletResult<u64> {
        let s = value
            .as_str()
            .ok_or_else(|| WalletError::network(Chain::Ethereum, operation, "expected hex quantity"))?;
        rpc_validator::parse_quantity_u64(s).map_err(|e| WalletError::network(Chain::Ethereum, operation, e))
    }

    fn parse_u128(&self, operation: &str, value: &serde_json::Value) -> WalletResult<u128> {
        let s = value
            .as_str()
            .ok_or_else(|| WalletError::network(Chain::Ethereum, operation, "expected hex quantity"))?;
        rpc_validator::parse_quantity_u128(s).map_err(|e| WalletError::network(Chain::Ethereum, operation, e))
    }

    fn parse_block(&self, block: &serde_json::Value) -> WalletResult<ChainBlock> {
        let operation = "eth_getBlockByNumber";
        Ok(ChainBlock {
            chain: Chain::Ethereum,
            number: self.parse_u64(operation, &block["number"])?,
            hash: block["hash"].as_str().unwrap_or_default().to_string(),
            parent_hash: block["parentHash"].as_str().map(str::to_string),
            timestamp: block["timestamp"]
                .as_str()
                .and_then(|t| rpc_validator::parse_quantity_u64(t).ok())
                .and_then(|t| i64::try_from(t).ok()),
            transaction_count: block["transactions"].as_array().map_or(0, Vec::len),
        })
    }

    async fn estimate_gas(
        &self,
        from: &str,
        to: &str,
        value: U256,
        data: Option<&[u8]>,
    ) -> WalletResult<u64> {
        let mut call = serde_json::json!({
            "from": from,
            "to": to,
            "value": format!("{:#x}", value),
        });
        if let Some(data) = data {
            call["data"] = serde_json::Value::String(format!("0x{}", hex::encode(data)));
        }

        let gas = self.parse_u64("eth_estimateGas", &self.rpc("eth_estimateGas", serde_json::json!([call])).await?)?;
        Ok(match data {
            Some(_) => with_contract_margin(gas),
            None => gas,
        })
    }

    async fn gas_price(&self) -> WalletResult<u128> {
        let price = self.rpc("eth_gasPrice", serde_json::json!([])).await?;
        self.parse_u128("eth_gasPrice", &price)
    }

    /// 有 baseFee 时使用 EIP-1559：maxFee = 2 × baseFee + priorityFee
    async fn fee_data(&self) -> WalletResult<EvmFeeData> {
        let latest = self
            .rpc("eth_getBlockByNumber", serde_json::json!(["latest", false]))
            .await?;

        match latest.get("baseFeePerGas").filter(|v| !v.is_null()) {
            Some(base_fee) => {
                let base_fee = self.parse_u128("eth_getBlockByNumber", base_fee)?;
                let priority = self
                    .rpc("eth_maxPriorityFeePerGas", serde_json::json!([]))
                    .await?;
                let priority = self.parse_u128("eth_maxPriorityFeePerGas", &priority)?;
                Ok(EvmFeeData::Eip1559 {
                    max_fee_per_gas: base_fee.saturating_mul(2).saturating_add(priority),
                    max_priority_fee_per_gas: priority,
                })
            }
            None => Ok(EvmFeeData::Legacy {
                gas_price: self.gas_price().await?,
            }),
        }
    }
}

fn parse_amount(value: &str) -> WalletResult<U256> {
    U256::from_dec_str(value.trim())
        .map_err(|_| WalletError::InvalidAmount(format!("not a minor-unit integer: {}", value)))
}

fn parse_override(value: &str, field: &str) -> WalletResult<u128> {
    value
        .trim()
        .parse::<u128>()
        .map_err(|_| WalletError::InvalidRequest(format!("invalid {}: {}", field, value)))
}

async fn native_balance(client: &ProviderClient, url: &str, address: &str) -> WalletResult<String> {
    let result = client
        .json_rpc(url, "eth_getBalance", serde_json::json!([address, "latest"]))
        .await?;
    let hex_balance = result
        .as_str()
        .ok_or_else(|| WalletError::network(Chain::Ethereum, "eth_getBalance", "expected hex quantity"))?;
    rpc_validator::parse_quantity_decimal(hex_balance)
        .map_err(|e| WalletError::network(Chain::Ethereum, "eth_getBalance", e))
}

#[async_trait]
impl BlockchainService for EvmService {
    fn chain(&self) -> Chain {
        Chain::Ethereum
    }

    async fn get_balance(&self, address: &str) -> WalletResult<Balance> {
        if !self.validate_address(address) {
            return Err(WalletError::invalid_address(Chain::Ethereum, address));
        }
        Ok(Balance {
            chain: Chain::Ethereum,
            address: address.to_string(),
            native: native_balance(&self.client, &self.rpc_url, address).await?,
            tokens: Vec::new(),
        })
    }

    async fn get_token_balance(&self, address: &str, token: &str) -> WalletResult<TokenBalance> {
        for a in [address, token] {
            if !self.validate_address(a) {
                return Err(WalletError::invalid_address(Chain::Ethereum, a));
            }
        }

        // 参数：地址左侧补零到 32 字节
        let data = format!(
            "0x{}{:0>64}",
            BALANCE_OF_SELECTOR,
            address.trim_start_matches("0x").to_lowercase()
        );
        let result = self
            .rpc("eth_call", serde_json::json!([{"to": token, "data": data}, "latest"]))
            .await?;
        let raw = result.as_str().ok_or_else(|| {
            WalletError::network(Chain::Ethereum, "eth_call", "balanceOf returned no data")
        })?;
        let balance = rpc_validator::parse_quantity_decimal(raw)
            .map_err(|e| WalletError::network(Chain::Ethereum, "eth_call", e))?;

        Ok(TokenBalance {
            contract: token.to_string(),
            balance,
        })
    }

    async fn get_transaction(&self, hash: &str) -> WalletResult<Option<ChainTransaction>> {
        let tx = self
            .rpc("eth_getTransactionByHash", serde_json::json!([hash]))
            .await?;
        if tx.is_null() {
            return Ok(None);
        }

        let receipt = self
            .rpc("eth_getTransactionReceipt", serde_json::json!([hash]))
            .await?;

        let (status, fee) = if receipt.is_null() {
            (TransactionStatus::Pending, None)
        } else {
            let status = TransactionStatus::parse(receipt["status"].as_str().unwrap_or("0x1"));
            let gas_used = self.parse_u128("eth_getTransactionReceipt", &receipt["gasUsed"])?;
            let price = receipt
                .get("effectiveGasPrice")
                .filter(|v| !v.is_null())
                .unwrap_or(&tx["gasPrice"]);
            let price = self.parse_u128("eth_getTransactionReceipt", price)?;
            (status, gas_used.checked_mul(price).map(|f| f.to_string()))
        };

        let value = rpc_validator::parse_quantity_decimal(tx["value"].as_str().unwrap_or("0x0"))
            .map_err(|e| WalletError::network(Chain::Ethereum, "eth_getTransactionByHash", e))?;

        Ok(Some(ChainTransaction {
            chain: Chain::Ethereum,
            hash: tx["hash"].as_str().unwrap_or(hash).to_string(),
            from: tx["from"].as_str().map(str::to_string),
            to: tx["to"].as_str().map(str::to_string),
            value,
            fee,
            block_number: tx["blockNumber"]
                .as_str()
                .and_then(|n| rpc_validator::parse_quantity_u64(n).ok()),
            block_hash: tx["blockHash"].as_str().map(str::to_string),
            timestamp: None,
            status,
        }))
    }

    async fn get_block(&self, id: &BlockId) -> WalletResult<Option<ChainBlock>> {
        let block = match id {
            BlockId::Number(n) => {
                self.rpc(
                    "eth_getBlockByNumber",
                    serde_json::json!([format!("{:#x}", n), false]),
                )
                .await?
            }
            BlockId::Hash(h) => {
                self.rpc("eth_getBlockByHash", serde_json::json!([h, false]))
                    .await?
            }
        };
        if block.is_null() {
            return Ok(None);
        }
        self.parse_block(&block).map(Some)
    }

    async fn get_latest_block(&self) -> WalletResult<ChainBlock> {
        let number = self.rpc("eth_blockNumber", serde_json::json!([])).await?;
        let number = self.parse_u64("eth_blockNumber", &number)?;
        self.get_block(&BlockId::Number(number))
            .await?
            .ok_or_else(|| WalletError::network(Chain::Ethereum, "eth_getBlockByNumber", "latest block not found"))
    }

    async fn get_transaction_history(
        &self,
        address: &str,
        _limit: usize,
    ) -> WalletResult<Vec<ChainTransaction>> {
        // JSON-RPC 没有按地址索引的接口
        tracing::debug!(
            address = %redact_address(address),
            "EVM JSON-RPC has no address index, returning empty history"
        );
        Ok(Vec::new())
    }

    async fn estimate_fee(&self, request: &FeeEstimateRequest) -> WalletResult<String> {
        let amount = parse_amount(&request.amount)?;
        let gas_limit = match &request.token {
            Some(token) => {
                let data = erc20_transfer_data(&request.to, amount)?;
                self.estimate_gas(&request.from, token, U256::zero(), Some(&data))
                    .await?
            }
            None => {
                self.estimate_gas(&request.from, &request.to, amount, None)
                    .await?
            }
        };
        let price = self.gas_price().await?;
        Ok((U256::from(gas_limit) * U256::from(price)).to_string())
    }

    async fn broadcast_transaction(&self, raw_transaction_hex: &str) -> WalletResult<String> {
        let raw = if raw_transaction_hex.starts_with("0x") {
            raw_transaction_hex.to_string()
        } else {
            format!("0x{}", raw_transaction_hex)
        };

        let result = self
            .rpc("eth_sendRawTransaction", serde_json::json!([raw]))
            .await?;
        let hash = result.as_str().ok_or_else(|| {
            WalletError::network(Chain::Ethereum, "eth_sendRawTransaction", "missing transaction hash")
        })?;
        let hash = rpc_validator::validate_tx_hash(hash)
            .map_err(|e| WalletError::network(Chain::Ethereum, "eth_sendRawTransaction", e))?;

        tracing::info!(tx_hash = %hash, chain = %Chain::Ethereum, "transaction broadcast");
        Ok(hash)
    }

    fn validate_address(&self, address: &str) -> bool {
        is_valid_evm_address(address)
    }

    async fn subscribe_to_address(&self, address: &str) -> WalletResult<Subscription> {
        if !self.validate_address(address) {
            return Err(WalletError::invalid_address(Chain::Ethereum, address));
        }
        let Some(ws_url) = self.ws_url.clone() else {
            return Ok(Subscription::inactive(Chain::Ethereum));
        };

        let provider = Provider::<Ws>::connect(ws_url.as_str())
            .await
            .map_err(|e| WalletError::network(Chain::Ethereum, "eth_subscribe", e))?;
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let client = self.client.clone();
        let rpc_url = self.rpc_url.clone();
        let address = address.to_string();

        let handle = tokio::spawn(async move {
            let mut blocks = match provider.subscribe_blocks().await {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(error = %e, "newHeads subscription failed");
                    return;
                }
            };

            let mut last_balance: Option<String> = None;
            while blocks.next().await.is_some() {
                match native_balance(&client, &rpc_url, &address).await {
                    Ok(balance) if last_balance.as_ref() != Some(&balance) => {
                        last_balance = Some(balance.clone());
                        let event = ChainEvent::BalanceChanged {
                            chain: Chain::Ethereum,
                            address: address.clone(),
                            balance,
                        };
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(
                            address = %redact_address(&address),
                            error = %e,
                            "balance refresh failed"
                        );
                    }
                }
            }
        });

        Ok(Subscription::active(Chain::Ethereum, handle, rx))
    }

    async fn subscribe_to_blocks(&self) -> WalletResult<Subscription> {
        let Some(ws_url) = self.ws_url.clone() else {
            return Ok(Subscription::inactive(Chain::Ethereum));
        };

        let provider = Provider::<Ws>::connect(ws_url.as_str())
            .await
            .map_err(|e| WalletError::network(Chain::Ethereum, "eth_subscribe", e))?;
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);

        let handle = tokio::spawn(async move {
            let mut blocks = match provider.subscribe_blocks().await {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(error = %e, "newHeads subscription failed");
                    return;
                }
            };

            while let Some(block) = blocks.next().await {
                // pending 区块没有高度
                let Some(number) = block.number.and_then(|n| u64::try_from(n).ok()) else {
                    tracing::debug!("skipping block header without number");
                    continue;
                };
                let event = ChainEvent::NewBlock {
                    chain: Chain::Ethereum,
                    number,
                    hash: block.hash.map(|h| format!("{:?}", h)).unwrap_or_default(),
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        Ok(Subscription::active(Chain::Ethereum, handle, rx))
    }

    async fn fetch_network_state(&self, request: &NetworkStateRequest) -> WalletResult<NetworkState> {
        let nonce = match request.nonce {
            Some(nonce) => nonce,
            None => {
                let count = self
                    .rpc(
                        "eth_getTransactionCount",
                        serde_json::json!([request.from, "pending"]),
                    )
                    .await?;
                self.parse_u64("eth_getTransactionCount", &count)?
            }
        };

        let fee = &request.fee;
        let fee = match (&fee.max_fee_per_gas, &fee.max_priority_fee_per_gas, &fee.gas_price) {
            (Some(max_fee), priority, _) => {
                let max_fee_per_gas = parse_override(max_fee, "maxFeePerGas")?;
                let max_priority_fee_per_gas = match priority {
                    Some(p) => parse_override(p, "maxPriorityFeePerGas")?,
                    None => max_fee_per_gas.min(1_000_000_000),
                };
                if max_priority_fee_per_gas > max_fee_per_gas {
                    return Err(WalletError::InvalidRequest(
                        "maxPriorityFeePerGas exceeds maxFeePerGas".to_string(),
                    ));
                }
                EvmFeeData::Eip1559 {
                    max_fee_per_gas,
                    max_priority_fee_per_gas,
                }
            }
            (None, _, Some(gas_price)) => EvmFeeData::Legacy {
                gas_price: parse_override(gas_price, "gasPrice")?,
            },
            (None, _, None) => self.fee_data().await?,
        };

        let gas_limit = match request.fee.gas_limit {
            Some(limit) => limit,
            None => match &request.token {
                Some(token) => {
                    let data = erc20_transfer_data(&request.to, U256::from(request.amount))?;
                    self.estimate_gas(&request.from, token, U256::zero(), Some(&data))
                        .await?
                }
                None => {
                    self.estimate_gas(&request.from, &request.to, U256::from(request.amount), None)
                        .await?
                }
            },
        };

        Ok(NetworkState::Evm {
            chain_id: self.chain_id,
            nonce,
            fee,
            gas_limit,
        })
    }
}
