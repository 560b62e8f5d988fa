//! EVM 交易构建与签名
//!
//! 有 EIP-1559 费用数据时构建 type 2 交易，否则构建 EIP-155 legacy 交易。
//! ERC-20 转账：`to` 为代币合约，value 为 0，data 为 `transfer(address,uint256)`。

use ethers::{
    abi::{encode, Token},
    signers::{LocalWallet, Signer},
    types::{
        transaction::eip2718::TypedTransaction, Address, Bytes, Eip1559TransactionRequest,
        Signature, TransactionRequest as LegacyTransactionRequest, U256,
    },
    utils::keccak256,
};

use crate::{
    domain::{chain_config::Chain, key_material::KeyPair},
    error::{WalletError, WalletResult},
    service::blockchain_service::EvmFeeData,
};

/// transfer(address,uint256)
pub const ERC20_TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

pub fn parse_address(value: &str) -> WalletResult<Address> {
    value
        .trim()
        .parse::<Address>()
        .map_err(|_| WalletError::invalid_address(Chain::Ethereum, value))
}

pub fn erc20_transfer_calldata(to: Address, amount: U256) -> Bytes {
    let mut data = ERC20_TRANSFER_SELECTOR.to_vec();
    data.extend(encode(&[Token::Address(to), Token::Uint(amount)]));
    data.into()
}

pub fn erc20_transfer_data(to: &str, amount: U256) -> WalletResult<Vec<u8>> {
    Ok(erc20_transfer_calldata(parse_address(to)?, amount).to_vec())
}

/// 已校验的转账参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmTransfer {
    pub from: Address,
    pub to: Address,
    /// wei 或代币最小单位
    pub amount: U256,
    /// ERC-20 合约
    pub token: Option<Address>,
}

/// Provisioned 阶段的链上参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvmTxParams {
    pub chain_id: u64,
    pub nonce: u64,
    pub fee: EvmFeeData,
    pub gas_limit: u64,
}

impl EvmTxParams {
    /// 最高手续费 = gas_limit × 单价上限
    pub fn max_fee(&self) -> U256 {
        U256::from(self.gas_limit) * U256::from(self.fee.max_price())
    }
}

impl EvmTransfer {
    pub fn to_typed_transaction(&self, params: &EvmTxParams) -> TypedTransaction {
        let (to, value, data) = match self.token {
            Some(token) => (
                token,
                U256::zero(),
                erc20_transfer_calldata(self.to, self.amount),
            ),
            None => (self.to, self.amount, Bytes::default()),
        };

        match params.fee {
            EvmFeeData::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => Eip1559TransactionRequest::new()
                .from(self.from)
                .to(to)
                .value(value)
                .data(data)
                .nonce(params.nonce)
                .gas(params.gas_limit)
                .max_fee_per_gas(U256::from(max_fee_per_gas))
                .max_priority_fee_per_gas(U256::from(max_priority_fee_per_gas))
                .chain_id(params.chain_id)
                .into(),
            EvmFeeData::Legacy { gas_price } => LegacyTransactionRequest::new()
                .from(self.from)
                .to(to)
                .value(value)
                .data(data)
                .nonce(params.nonce)
                .gas(params.gas_limit)
                .gas_price(U256::from(gas_price))
                .chain_id(params.chain_id)
                .into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEvmTransaction {
    pub raw: Bytes,
    /// 0x 前缀小写
    pub hash: String,
    pub signature: Signature,
}

/// 签名并编码；哈希为签名后 RLP 的 keccak256
pub fn sign_transaction(
    key: &KeyPair,
    tx: &TypedTransaction,
    chain_id: u64,
) -> WalletResult<SignedEvmTransaction> {
    let wallet = LocalWallet::from_bytes(key.private_key())
        .map_err(|e| WalletError::signing(Chain::Ethereum, e))?
        .with_chain_id(chain_id);

    if let Some(from) = tx.from() {
        if *from != wallet.address() {
            return Err(WalletError::signing(
                Chain::Ethereum,
                "key does not control the sender address",
            ));
        }
    }

    let signature = wallet
        .sign_transaction_sync(tx)
        .map_err(|e| WalletError::signing(Chain::Ethereum, e))?;
    let raw = tx.rlp_signed(&signature);
    let hash = format!("0x{}", hex::encode(keccak256(&raw)));

    Ok(SignedEvmTransaction {
        raw,
        hash,
        signature,
    })
}
