//! TON 钱包合约（v3）
//!
//! 地址 = StateInit(code, data) 的表示哈希，data = seqno(0) ‖ wallet_id ‖ 公钥。
//! 合约版本和 wallet_id 都会改变地址。

use std::{fmt, str::FromStr, sync::Arc};

use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};

use crate::domain::ton_cell::{Cell, CellBuilder, TonAddress, TonCodecError};

/// 主网钱包默认 subwallet id
pub const DEFAULT_WALLET_ID: u32 = 698_983_191;

/// 转账 send_mode：发送方付手续费 + 忽略错误
pub const SEND_MODE_PAY_FEES_SEPARATELY: u8 = 3;

const WALLET_V3R1_CODE: &str = "B5EE9C724101010100620000C0FF0020DD2082014C97BA9730ED44D0D70B1FE0A4F2608308D71820D31FD31FD31FF82313BBF263ED44D0D31FD31FD3FFD15132BAF2A15144BAF2A204F901541055F910F2A3F8009320D74A96D307D402FB00E8D101A4C8CB1FCB1FCBFFC9ED543FBE6EE0";
const WALLET_V3R2_CODE: &str = "B5EE9C724101010100710000DEFF0020DD2082014C97BA218201339CBAB19F71B0ED44D0D31FD31F31D70BFFE304E0A4F2608308D71820D31FD31FD31FF82313BBF263ED44D0D31FD31FD3FFD15132BAF2A15144BAF2A204F901541055F910F2A3F8009320D74A96D307D402FB00E8D101A4C8CB1FCB1FCBFFC9ED5410BD6DAD";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TonWalletVersion {
    V3R1,
    #[default]
    V3R2,
}

impl TonWalletVersion {
    pub fn code_cell(&self) -> Result<Arc<Cell>, TonCodecError> {
        let boc_hex = match self {
            TonWalletVersion::V3R1 => WALLET_V3R1_CODE,
            TonWalletVersion::V3R2 => WALLET_V3R2_CODE,
        };
        let bytes =
            hex::decode(boc_hex).map_err(|e| TonCodecError(format!("wallet code: {}", e)))?;
        Cell::from_boc(&bytes)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TonWalletVersion::V3R1 => "v3r1",
            TonWalletVersion::V3R2 => "v3r2",
        }
    }
}

impl fmt::Display for TonWalletVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TonWalletVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "v3r1" => Ok(TonWalletVersion::V3R1),
            "v3r2" | "v3" => Ok(TonWalletVersion::V3R2),
            other => Err(format!("unsupported TON wallet version: {}", other)),
        }
    }
}

/// 单笔转账参数
#[derive(Debug, Clone)]
pub struct TonTransfer {
    pub destination: TonAddress,
    /// nanoton
    pub amount: u128,
    pub bounce: bool,
    pub seqno: u32,
    /// unix 秒；seqno 为 0 时忽略
    pub valid_until: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletV3 {
    pub version: TonWalletVersion,
    pub wallet_id: u32,
    pub workchain: i8,
    pub public_key: [u8; 32],
}

impl WalletV3 {
    pub fn new(version: TonWalletVersion, wallet_id: u32, workchain: i8, public_key: [u8; 32]) -> Self {
        Self {
            version,
            wallet_id,
            workchain,
            public_key,
        }
    }

    /// 初始持久化数据：seqno(0) ‖ wallet_id ‖ 公钥
    pub fn data_cell(&self) -> Result<Arc<Cell>, TonCodecError> {
        let mut b = CellBuilder::new();
        b.store_uint(0, 32)?
            .store_uint(self.wallet_id as u128, 32)?
            .store_bytes(&self.public_key)?;
        Ok(b.build())
    }

    /// split_depth:none special:none code:just data:just library:none
    pub fn state_init(&self) -> Result<Arc<Cell>, TonCodecError> {
        let mut b = CellBuilder::new();
        b.store_uint(0b00110, 5)?
            .store_ref(self.version.code_cell()?)?
            .store_ref(self.data_cell()?)?;
        Ok(b.build())
    }

    pub fn address(&self) -> Result<TonAddress, TonCodecError> {
        Ok(TonAddress {
            workchain: self.workchain,
            hash: self.state_init()?.hash(),
        })
    }

    /// 签名前的消息体：wallet_id ‖ valid_until ‖ seqno ‖ mode + ^internal
    fn signing_payload(
        &self,
        seqno: u32,
        valid_until: u32,
        internal: &Arc<Cell>,
    ) -> Result<Arc<Cell>, TonCodecError> {
        let mut b = CellBuilder::new();
        b.store_uint(self.wallet_id as u128, 32)?
            .store_uint(valid_until as u128, 32)?
            .store_uint(seqno as u128, 32)?
            .store_uint(SEND_MODE_PAY_FEES_SEPARATELY as u128, 8)?
            .store_ref(Arc::clone(internal))?;
        Ok(b.build())
    }

    /// 构造并签名外部消息；seqno 为 0 时附带 StateInit 以部署合约
    pub fn external_message(
        &self,
        signing_key: &SigningKey,
        transfer: &TonTransfer,
    ) -> Result<Arc<Cell>, TonCodecError> {
        if signing_key.verifying_key().to_bytes() != self.public_key {
            return Err(TonCodecError("signing key does not match wallet".to_string()));
        }

        let internal = internal_message(&transfer.destination, transfer.amount, transfer.bounce)?;
        // 未部署的钱包不检查有效期
        let valid_until = if transfer.seqno == 0 {
            u32::MAX
        } else {
            transfer.valid_until
        };

        let payload = self.signing_payload(transfer.seqno, valid_until, &internal)?;
        let signature = signing_key.sign(&payload.hash());

        let mut body = CellBuilder::new();
        body.store_bytes(&signature.to_bytes())?
            .store_uint(self.wallet_id as u128, 32)?
            .store_uint(valid_until as u128, 32)?
            .store_uint(transfer.seqno as u128, 32)?
            .store_uint(SEND_MODE_PAY_FEES_SEPARATELY as u128, 8)?
            .store_ref(internal)?;
        let body = body.build();

        let mut msg = CellBuilder::new();
        // ext_in_msg_info$10 src:addr_none dest import_fee:0
        msg.store_uint(0b10, 2)?
            .store_address_none()?
            .store_address(&self.address()?)?
            .store_coins(0)?;
        if transfer.seqno == 0 {
            msg.store_bit(true)?.store_bit(true)?.store_ref(self.state_init()?)?;
        } else {
            msg.store_bit(false)?;
        }
        msg.store_bit(true)?.store_ref(body)?;
        Ok(msg.build())
    }
}

/// 不带 body 的内部转账消息
pub fn internal_message(
    destination: &TonAddress,
    amount: u128,
    bounce: bool,
) -> Result<Arc<Cell>, TonCodecError> {
    let mut b = CellBuilder::new();
    // int_msg_info$0 ihr_disabled bounce bounced
    b.store_bit(false)?
        .store_bit(true)?
        .store_bit(bounce)?
        .store_bit(false)?
        .store_address_none()?
        .store_address(destination)?
        .store_coins(amount)?
        .store_bit(false)? // extra currencies
        .store_coins(0)? // ihr_fee
        .store_coins(0)? // fwd_fee
        .store_uint(0, 64)? // created_lt
        .store_uint(0, 32)? // created_at
        .store_bit(false)? // init
        .store_bit(false)?; // body inline (empty)
    Ok(b.build())
}
