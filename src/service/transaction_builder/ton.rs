//! TON 钱包 v3 外部消息
//!
//! raw = 外部消息 BOC 的 hex，哈希 = 外部消息 cell 的标准哈希

use ed25519_dalek::SigningKey;

use crate::{
    domain::{
        chain_config::Chain,
        derivation::TonStrategy,
        key_material::KeyPair,
        ton_cell::TonAddress,
        ton_wallet::TonTransfer,
    },
    error::{WalletError, WalletResult},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTonMessage {
    pub boc: Vec<u8>,
    pub hash: [u8; 32],
}

impl SignedTonMessage {
    pub fn raw_hex(&self) -> String {
        hex::encode(&self.boc)
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

/// 构造并签名单笔转账；目标地址的 bounce 标记沿用用户友好格式中的标记
pub fn sign_transfer(
    strategy: &TonStrategy,
    key: &KeyPair,
    to: &str,
    amount: u128,
    seqno: u32,
    valid_until: u32,
) -> WalletResult<SignedTonMessage> {
    let destination =
        TonAddress::parse(to).map_err(|_| WalletError::invalid_address(Chain::Ton, to))?;

    let secret: [u8; 32] = key
        .private_key()
        .try_into()
        .map_err(|_| WalletError::signing(Chain::Ton, "ed25519 private key must be 32 bytes"))?;
    let signing_key = SigningKey::from_bytes(&secret);
    let wallet = strategy.wallet(signing_key.verifying_key().to_bytes());

    let transfer = TonTransfer {
        destination: destination.address,
        amount,
        bounce: destination.bounceable,
        seqno,
        valid_until,
    };
    let message = wallet
        .external_message(&signing_key, &transfer)
        .map_err(|e| WalletError::signing(Chain::Ton, e))?;

    Ok(SignedTonMessage {
        boc: message.to_boc(),
        hash: message.hash(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ChainsConfig,
        domain::{
            chain_config::ChainRegistry, derivation::DerivationStrategy,
            mnemonic::MnemonicManager, ton_cell::Cell,
        },
    };

    const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn strategy() -> TonStrategy {
        let chains = ChainsConfig::default();
        let registry = ChainRegistry::from_config(&chains);
        TonStrategy::new(registry.get(Chain::Ton).unwrap().clone(), &chains.ton)
    }

    fn key(strategy: &TonStrategy) -> KeyPair {
        let seed = MnemonicManager::with_iterations(1_000)
            .to_seed(PHRASE, None)
            .unwrap();
        strategy.derive_private_key(&seed, 0).unwrap()
    }

    #[test]
    fn test_signed_message_parses_back() {
        let strategy = strategy();
        let key = key(&strategy);

        let signed = sign_transfer(
            &strategy,
            &key,
            "UQC9LJL69GjPHMTyZ_9_P2QKTGnQhMWs2eRk6MVDiDina88a",
            1_000_000_000,
            5,
            1_700_000_000,
        )
        .unwrap();

        let parsed = Cell::from_boc(&signed.boc).unwrap();
        assert_eq!(parsed.hash(), signed.hash);
        // 已部署钱包不带 StateInit：只有 body 一个引用
        assert_eq!(parsed.refs().len(), 1);
        assert_eq!(signed.hash_hex().len(), 64);
    }

    #[test]
    fn test_first_transfer_deploys_wallet() {
        let strategy = strategy();
        let key = key(&strategy);

        let signed = sign_transfer(
            &strategy,
            &key,
            "0:bd2c92faf468cf1cc4f267ff7f3f640a4c69d084c5acd9e464e8c5438838a76b",
            1,
            0,
            0,
        )
        .unwrap();
        let parsed = Cell::from_boc(&signed.boc).unwrap();
        assert_eq!(parsed.refs().len(), 2);
    }

    #[test]
    fn test_invalid_destination() {
        let strategy = strategy();
        let key = key(&strategy);
        assert!(matches!(
            sign_transfer(&strategy, &key, "not-an-address", 1, 1, 1),
            Err(WalletError::InvalidAddress { .. })
        ));
    }
}
