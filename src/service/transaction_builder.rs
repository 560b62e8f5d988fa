//! 统一交易构建与签名
//!
//! 流水线：Validated → Provisioned → Constructed → Signed → Broadcast。
//! 校验阶段不访问网络；链上数据只在 Provisioned 阶段获取一次。

pub mod evm;
pub mod ton;
pub mod utxo;

#[cfg(test)]
mod tests;

use std::{str::FromStr, sync::Arc};

use ethers::types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    config::ChainsConfig,
    domain::{
        chain_config::{Chain, ChainConfig, ChainRegistry},
        derivation::{
            BitcoinStrategy, DerivationStrategy, DerivationStrategyFactory, DogecoinStrategy,
            TonStrategy,
        },
        key_material::KeyPair,
        ton_cell::TonAddress,
        transaction_status::TransactionStage,
    },
    error::{WalletError, WalletResult},
    infrastructure::log_redact::{redact_address, redact_raw_transaction},
    service::{
        blockchain_factory::BlockchainServiceFactory,
        blockchain_service::{FeeOverride, NetworkState, NetworkStateRequest},
        ton_service::TON_TRANSFER_FEE_ESTIMATE,
    },
};

/// 代币最多支持的小数位（u128 最小单位可表示的范围内）
const MAX_TOKEN_DECIMALS: u32 = 36;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 请求 / 响应
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSpec {
    /// ERC-20 合约地址
    pub address: String,
    pub decimals: u32,
}

/// 转账请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub chain: String,
    pub from: String,
    pub to: String,
    /// 十进制金额（主单位，如 "0.5"）
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<FeeOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransaction {
    pub chain: Chain,
    pub raw_transaction_hex: String,
    pub transaction_hash: String,
    /// 手续费（最小单位）；EVM 为上限，TON 为估算值
    pub fee: String,
}

/// 通过本地校验的请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTransaction {
    pub chain: Chain,
    pub from: String,
    pub to: String,
    /// 最小单位
    pub amount: u128,
    pub token: Option<TokenSpec>,
    pub fee: FeeOverride,
    pub nonce: Option<u64>,
}

impl ValidatedTransaction {
    fn network_state_request(&self) -> NetworkStateRequest {
        NetworkStateRequest {
            from: self.from.clone(),
            to: self.to.clone(),
            amount: self.amount,
            token: self.token.as_ref().map(|t| t.address.clone()),
            nonce: self.nonce,
            fee: self.fee.clone(),
        }
    }
}

/// 十进制金额转最小单位：必须为正，小数位不超过 `decimals`
pub fn to_minor_units(value: &str, decimals: u32) -> WalletResult<u128> {
    let parsed = Decimal::from_str(value.trim())
        .map_err(|_| WalletError::InvalidAmount(format!("not a decimal number: {}", value)))?;
    if parsed <= Decimal::ZERO {
        return Err(WalletError::InvalidAmount(format!(
            "amount must be positive: {}",
            value
        )));
    }

    let parsed = parsed.normalize();
    if parsed.scale() > decimals {
        return Err(WalletError::InvalidAmount(format!(
            "more than {} decimal places: {}",
            decimals, value
        )));
    }

    let mantissa = u128::try_from(parsed.mantissa())
        .map_err(|_| WalletError::InvalidAmount(value.to_string()))?;
    10u128
        .checked_pow(decimals - parsed.scale())
        .and_then(|factor| mantissa.checked_mul(factor))
        .ok_or_else(|| WalletError::InvalidAmount(format!("amount too large: {}", value)))
}

/// 同一地址的不同书写形式视为相等（EVM 大小写、TON 友好格式标记）
fn same_address(chain: Chain, left: &str, right: &str) -> bool {
    match chain {
        Chain::Ethereum => left.trim().eq_ignore_ascii_case(right.trim()),
        Chain::Ton => match (TonAddress::parse(left), TonAddress::parse(right)) {
            (Ok(l), Ok(r)) => l.address == r.address,
            _ => false,
        },
        Chain::Bitcoin => left.trim().eq_ignore_ascii_case(right.trim()),
        Chain::Dogecoin => left.trim() == right.trim(),
    }
}

fn advance(chain: Chain, stage: &mut TransactionStage, next: TransactionStage) -> WalletResult<()> {
    if !stage.can_transition_to(&next) {
        return Err(WalletError::InvalidRequest(format!(
            "illegal stage transition {} -> {}",
            stage, next
        )));
    }
    tracing::debug!(chain = %chain, from = %stage, to = %next, "{}", next.description());
    *stage = next;
    Ok(())
}

fn unexpected_state(chain: Chain) -> WalletError {
    WalletError::network(chain, "fetch_network_state", "unexpected network state for chain")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TransactionService
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct TransactionService {
    factory: Arc<BlockchainServiceFactory>,
    registry: ChainRegistry,
    chains: ChainsConfig,
}

impl TransactionService {
    pub fn new(factory: Arc<BlockchainServiceFactory>) -> Self {
        let chains = factory.config().clone();
        Self {
            registry: ChainRegistry::from_config(&chains),
            chains,
            factory,
        }
    }

    fn chain_config(&self, chain: Chain) -> WalletResult<ChainConfig> {
        self.registry.get(chain).cloned()
    }

    fn strategy(&self, chain: Chain) -> WalletResult<Box<dyn DerivationStrategy>> {
        DerivationStrategyFactory::from_registry(chain, &self.registry, &self.chains)
    }

    /// 本地校验（不访问网络）
    pub fn validate(
        &self,
        request: &TransactionRequest,
        key: &KeyPair,
    ) -> WalletResult<ValidatedTransaction> {
        // 1. 链
        let chain: Chain = request.chain.parse()?;
        let config = self.chain_config(chain)?;
        let strategy = self.strategy(chain)?;

        // 2. 地址
        if !strategy.validate_address(&request.from) {
            return Err(WalletError::invalid_address(chain, &request.from));
        }
        if !strategy.validate_address(&request.to) {
            return Err(WalletError::invalid_address(chain, &request.to));
        }

        // 3. 代币
        let decimals = match &request.token {
            Some(token) => {
                if !chain.is_evm() {
                    return Err(WalletError::InvalidRequest(format!(
                        "token transfers are not supported on {}",
                        chain
                    )));
                }
                if !strategy.validate_address(&token.address) {
                    return Err(WalletError::invalid_address(chain, &token.address));
                }
                if token.decimals > MAX_TOKEN_DECIMALS {
                    return Err(WalletError::InvalidRequest(format!(
                        "token decimals {} exceed {}",
                        token.decimals, MAX_TOKEN_DECIMALS
                    )));
                }
                token.decimals
            }
            None => config.decimals,
        };

        // 4. 金额
        let amount = to_minor_units(&request.value, decimals)?;

        // 5. 密钥必须控制发送地址
        if key.chain != chain {
            return Err(WalletError::InvalidRequest(format!(
                "key pair belongs to {}, request is for {}",
                key.chain, chain
            )));
        }
        let key_address = strategy.address_from_public_key(&key.public_key)?;
        if !same_address(chain, &key_address, &request.from) {
            return Err(WalletError::InvalidRequest(
                "key pair does not control the sender address".to_string(),
            ));
        }

        Ok(ValidatedTransaction {
            chain,
            from: request.from.trim().to_string(),
            to: request.to.trim().to_string(),
            amount,
            token: request.token.clone(),
            fee: request.fee.clone().unwrap_or_default(),
            nonce: request.nonce,
        })
    }

    /// 获取 nonce / UTXO / seqno 与费用；已指定的覆盖项不再查询
    pub async fn provision(&self, validated: &ValidatedTransaction) -> WalletResult<NetworkState> {
        let service = self.factory.get(validated.chain).await?;
        service
            .fetch_network_state(&validated.network_state_request())
            .await
    }

    /// 按链构造并签名
    fn construct_and_sign(
        &self,
        validated: &ValidatedTransaction,
        state: NetworkState,
        key: &KeyPair,
        stage: &mut TransactionStage,
    ) -> WalletResult<SignedTransaction> {
        let chain = validated.chain;
        let config = self.chain_config(chain)?;

        match (chain, state) {
            (
                Chain::Ethereum,
                NetworkState::Evm {
                    chain_id,
                    nonce,
                    fee,
                    gas_limit,
                },
            ) => {
                let transfer = evm::EvmTransfer {
                    from: evm::parse_address(&validated.from)?,
                    to: evm::parse_address(&validated.to)?,
                    amount: U256::from(validated.amount),
                    token: validated
                        .token
                        .as_ref()
                        .map(|t| evm::parse_address(&t.address))
                        .transpose()?,
                };
                let params = evm::EvmTxParams {
                    chain_id,
                    nonce,
                    fee,
                    gas_limit,
                };
                let tx = transfer.to_typed_transaction(&params);
                advance(chain, stage, TransactionStage::Constructed)?;

                let signed = evm::sign_transaction(key, &tx, chain_id)?;
                advance(chain, stage, TransactionStage::Signed)?;

                Ok(SignedTransaction {
                    chain,
                    raw_transaction_hex: format!("0x{}", hex::encode(&signed.raw)),
                    transaction_hash: signed.hash,
                    fee: params.max_fee().to_string(),
                })
            }
            (Chain::Bitcoin | Chain::Dogecoin, NetworkState::Utxo { utxos, fee_rate }) => {
                let amount = u64::try_from(validated.amount).map_err(|_| {
                    WalletError::InvalidAmount(format!("amount too large: {}", validated.amount))
                })?;
                let recipient = utxo::recipient_script(&config, &validated.to)?;
                let selection = utxo::select_coins(
                    chain,
                    &utxos,
                    amount,
                    &recipient,
                    fee_rate,
                    config.dust_limit,
                )?;
                if selection.input_total() != selection.amount + selection.change + selection.fee {
                    return Err(WalletError::signing(chain, "inputs do not balance outputs and fee"));
                }
                advance(chain, stage, TransactionStage::Constructed)?;

                let signed = if chain == Chain::Bitcoin {
                    utxo::sign_bitcoin(&BitcoinStrategy::new(config), key, &validated.to, &selection)?
                } else {
                    utxo::sign_dogecoin(
                        &DogecoinStrategy::new(config),
                        key,
                        &validated.to,
                        &selection,
                    )?
                };
                advance(chain, stage, TransactionStage::Signed)?;

                Ok(SignedTransaction {
                    chain,
                    raw_transaction_hex: signed.raw_hex,
                    transaction_hash: signed.txid,
                    fee: selection.fee.to_string(),
                })
            }
            (Chain::Ton, NetworkState::Ton { seqno }) => {
                let now = chrono::Utc::now().timestamp();
                let valid_until = u32::try_from(now + i64::from(self.chains.ton.message_ttl_secs))
                    .unwrap_or(u32::MAX);
                let strategy = TonStrategy::new(config, &self.chains.ton);
                advance(chain, stage, TransactionStage::Constructed)?;

                let signed = ton::sign_transfer(
                    &strategy,
                    key,
                    &validated.to,
                    validated.amount,
                    seqno,
                    valid_until,
                )?;
                advance(chain, stage, TransactionStage::Signed)?;

                Ok(SignedTransaction {
                    chain,
                    raw_transaction_hex: signed.raw_hex(),
                    transaction_hash: signed.hash_hex(),
                    fee: TON_TRANSFER_FEE_ESTIMATE.to_string(),
                })
            }
            _ => Err(unexpected_state(chain)),
        }
    }

    /// 校验、准备、构造并签名，不广播
    pub async fn build_and_sign(
        &self,
        request: &TransactionRequest,
        key: &KeyPair,
    ) -> WalletResult<SignedTransaction> {
        self.run(request, key, false).await
    }

    /// 构建签名后按需广播；广播成功时哈希以本地计算值为准
    pub async fn send(
        &self,
        request: &TransactionRequest,
        key: &KeyPair,
        broadcast: bool,
    ) -> WalletResult<SignedTransaction> {
        self.run(request, key, broadcast).await
    }

    async fn run(
        &self,
        request: &TransactionRequest,
        key: &KeyPair,
        broadcast: bool,
    ) -> WalletResult<SignedTransaction> {
        // 1. 本地校验
        let validated = self.validate(request, key)?;
        let chain = validated.chain;
        let mut stage = TransactionStage::Validated;
        tracing::debug!(
            chain = %chain,
            from = %redact_address(&validated.from),
            to = %redact_address(&validated.to),
            "{}",
            stage.description()
        );

        // 2. 链上数据
        let state = self.provision(&validated).await?;
        advance(chain, &mut stage, TransactionStage::Provisioned)?;

        // 3. 构造 + 签名
        let signed = self.construct_and_sign(&validated, state, key, &mut stage)?;
        tracing::info!(
            chain = %chain,
            tx_hash = %signed.transaction_hash,
            fee = %signed.fee,
            "transaction signed"
        );

        if !broadcast {
            return Ok(signed);
        }

        // 4. 广播
        let service = self.factory.get(chain).await?;
        tracing::debug!(
            chain = %chain,
            raw = %redact_raw_transaction(&signed.raw_transaction_hex),
            "broadcasting transaction"
        );
        let provider_hash = service
            .broadcast_transaction(&signed.raw_transaction_hex)
            .await?;
        advance(chain, &mut stage, TransactionStage::Broadcast)?;
        if !provider_hash.eq_ignore_ascii_case(&signed.transaction_hash) {
            tracing::warn!(
                chain = %chain,
                local = %signed.transaction_hash,
                provider = %provider_hash,
                "provider returned a different transaction hash"
            );
        }

        Ok(signed)
    }
}
