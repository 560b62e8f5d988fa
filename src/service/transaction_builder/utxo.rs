//! UTXO 交易构建
//!
//! 贪心选币（按 provider 返回顺序，跳过重复 outpoint），费用 = 费率 × vsize，
//! vsize 按收款与找零输出的实际脚本长度估算，找零低于粉尘阈值时并入手续费。Bitcoin 使用 P2WPKH (BIP-143) 签名，
//! Dogecoin 使用传统 P2PKH 签名。

use std::collections::HashSet;

use bitcoin::{
    absolute::LockTime,
    consensus::encode::serialize_hex,
    ecdsa,
    hashes::Hash,
    script::Builder,
    secp256k1::{Message, PublicKey, Secp256k1, SecretKey},
    sighash::{EcdsaSighashType, SighashCache},
    transaction::Version,
    Amount, OutPoint, PubkeyHash, ScriptBuf, ScriptHash, Sequence, Transaction, TxIn, TxOut,
    Txid, Witness,
};

use crate::{
    domain::{
        chain_config::{Chain, ChainConfig},
        derivation::{Base58Payload, BitcoinStrategy, DogecoinStrategy},
        key_material::KeyPair,
    },
    error::{WalletError, WalletResult},
    service::blockchain_service::Utxo,
};

/// 输入脚本类型，决定 vsize 估算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputScript {
    P2wpkh,
    P2pkh,
}

impl InputScript {
    pub fn for_chain(chain: Chain) -> WalletResult<Self> {
        match chain {
            Chain::Bitcoin => Ok(InputScript::P2wpkh),
            Chain::Dogecoin => Ok(InputScript::P2pkh),
            other => Err(WalletError::UnsupportedChain(format!(
                "{} is not a UTXO chain",
                other
            ))),
        }
    }

    /// 找零输出（回到发送地址）的脚本长度
    pub fn change_script_len(&self) -> usize {
        match self {
            InputScript::P2wpkh => 22,
            InputScript::P2pkh => 25,
        }
    }

    /// 估算虚拟字节数；`output_script_lens` 为各输出 script_pubkey 的长度
    pub fn vsize(&self, inputs: usize, output_script_lens: &[usize]) -> u64 {
        let inputs = inputs as u64;
        let base = match self {
            InputScript::P2wpkh => 11 + 68 * inputs,
            InputScript::P2pkh => 10 + 148 * inputs,
        };
        base + output_script_lens.iter().map(|&len| output_size(len)).sum::<u64>()
    }
}

/// 金额 8 字节 + 脚本长度前缀 + 脚本
fn output_size(script_len: usize) -> u64 {
    let prefix = match script_len {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        _ => 5,
    };
    8 + prefix + script_len as u64
}

/// 收款地址对应的输出脚本
pub fn recipient_script(config: &ChainConfig, address: &str) -> WalletResult<ScriptBuf> {
    match config.chain {
        Chain::Bitcoin => Ok(BitcoinStrategy::new(config.clone())
            .parse_address(address)?
            .script_pubkey()),
        Chain::Dogecoin => Ok(match DogecoinStrategy::new(config.clone()).decode_address(address)? {
            Base58Payload::PubkeyHash(hash) => ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(hash)),
            Base58Payload::ScriptHash(hash) => ScriptBuf::new_p2sh(&ScriptHash::from_byte_array(hash)),
        }),
        other => Err(WalletError::UnsupportedChain(format!(
            "{} is not a UTXO chain",
            other
        ))),
    }
}

/// 选币结果；`input_total() == amount + change + fee`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinSelection {
    pub inputs: Vec<Utxo>,
    pub amount: u64,
    /// 0 表示无找零输出
    pub change: u64,
    pub fee: u64,
}

impl CoinSelection {
    pub fn input_total(&self) -> u64 {
        self.inputs.iter().map(|u| u.value).sum()
    }

    pub fn has_change(&self) -> bool {
        self.change > 0
    }
}

/// 贪心选币；`recipient` 为收款输出脚本，`dust` 为链参数表中的粉尘阈值
pub fn select_coins(
    chain: Chain,
    utxos: &[Utxo],
    amount: u64,
    recipient: &ScriptBuf,
    fee_rate: u64,
    dust: u64,
) -> WalletResult<CoinSelection> {
    let script = InputScript::for_chain(chain)?;
    let without_change = [recipient.len()];
    let with_change = [recipient.len(), script.change_script_len()];

    if amount < dust {
        return Err(WalletError::InvalidAmount(format!(
            "{} output below dust limit of {}",
            amount, dust
        )));
    }

    let mut seen = HashSet::new();
    let mut selected: Vec<Utxo> = Vec::new();
    let mut total: u64 = 0;
    let mut required = amount as u128;

    for utxo in utxos {
        if !seen.insert((utxo.txid.as_str(), utxo.vout)) {
            tracing::debug!(txid = %utxo.txid, vout = utxo.vout, "skipping duplicate outpoint");
            continue;
        }
        selected.push(utxo.clone());
        total = total
            .checked_add(utxo.value)
            .ok_or_else(|| WalletError::InvalidRequest("UTXO total overflows".to_string()))?;

        let fee_without_change = fee_rate.saturating_mul(script.vsize(selected.len(), &without_change));
        required = amount as u128 + fee_without_change as u128;
        if (total as u128) < required {
            continue;
        }

        let fee_with_change = fee_rate.saturating_mul(script.vsize(selected.len(), &with_change));
        let (change, fee) = match total.checked_sub(amount).and_then(|r| r.checked_sub(fee_with_change)) {
            Some(change) if change > dust => (change, fee_with_change),
            // 找零不超过粉尘阈值，并入手续费
            _ => (0, total - amount),
        };

        return Ok(CoinSelection {
            inputs: selected,
            amount,
            change,
            fee,
        });
    }

    Err(WalletError::InsufficientFunds {
        chain,
        required,
        available: total as u128,
    })
}

fn outpoint(chain: Chain, utxo: &Utxo) -> WalletResult<OutPoint> {
    let txid = utxo
        .txid
        .parse::<Txid>()
        .map_err(|e| WalletError::network(chain, "list_unspent", format!("invalid txid {}: {}", utxo.txid, e)))?;
    Ok(OutPoint::new(txid, utxo.vout))
}

fn unsigned_transaction(
    chain: Chain,
    selection: &CoinSelection,
    to_script: ScriptBuf,
    change_script: ScriptBuf,
) -> WalletResult<Transaction> {
    let input = selection
        .inputs
        .iter()
        .map(|utxo| {
            Ok(TxIn {
                previous_output: outpoint(chain, utxo)?,
                script_sig: ScriptBuf::new(),
                sequence: match chain {
                    Chain::Bitcoin => Sequence::ENABLE_RBF_NO_LOCKTIME,
                    _ => Sequence::MAX,
                },
                witness: Witness::new(),
            })
        })
        .collect::<WalletResult<Vec<_>>>()?;

    let mut output = vec![TxOut {
        value: Amount::from_sat(selection.amount),
        script_pubkey: to_script,
    }];
    if selection.has_change() {
        output.push(TxOut {
            value: Amount::from_sat(selection.change),
            script_pubkey: change_script,
        });
    }

    Ok(Transaction {
        version: match chain {
            Chain::Dogecoin => Version::ONE,
            _ => Version::TWO,
        },
        lock_time: LockTime::ZERO,
        input,
        output,
    })
}

fn signing_keys(chain: Chain, key: &KeyPair) -> WalletResult<(Secp256k1<bitcoin::secp256k1::All>, SecretKey, PublicKey)> {
    let secp = Secp256k1::new();
    let secret = SecretKey::from_slice(key.private_key()).map_err(|e| WalletError::signing(chain, e))?;
    let public = PublicKey::from_secret_key(&secp, &secret);
    Ok((secp, secret, public))
}

/// 已签名的原始交易（hex）与 txid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUtxoTransaction {
    pub raw_hex: String,
    pub txid: String,
}

/// Bitcoin P2WPKH 签名，找零回到发送地址
pub fn sign_bitcoin(
    strategy: &BitcoinStrategy,
    key: &KeyPair,
    to: &str,
    selection: &CoinSelection,
) -> WalletResult<SignedUtxoTransaction> {
    let chain = Chain::Bitcoin;
    let (secp, secret, public) = signing_keys(chain, key)?;
    let wpubkey_hash = bitcoin::PublicKey::new(public)
        .wpubkey_hash()
        .ok_or_else(|| WalletError::signing(chain, "uncompressed public key"))?;
    let from_script = ScriptBuf::new_p2wpkh(&wpubkey_hash);
    let to_script = recipient_script(strategy.config(), to)?;

    let mut tx = unsigned_transaction(chain, selection, to_script, from_script.clone())?;

    let mut witnesses = Vec::with_capacity(selection.inputs.len());
    {
        let mut cache = SighashCache::new(&tx);
        for (index, utxo) in selection.inputs.iter().enumerate() {
            let sighash = cache
                .p2wpkh_signature_hash(
                    index,
                    &from_script,
                    Amount::from_sat(utxo.value),
                    EcdsaSighashType::All,
                )
                .map_err(|e| WalletError::signing(chain, e))?;
            let signature = secp.sign_ecdsa(&Message::from(sighash), &secret);
            witnesses.push(Witness::p2wpkh(&ecdsa::Signature::sighash_all(signature), &public));
        }
    }
    for (input, witness) in tx.input.iter_mut().zip(witnesses) {
        input.witness = witness;
    }

    Ok(SignedUtxoTransaction {
        raw_hex: serialize_hex(&tx),
        txid: tx.txid().to_string(),
    })
}

/// Dogecoin P2PKH 签名，找零回到发送地址
pub fn sign_dogecoin(
    strategy: &DogecoinStrategy,
    key: &KeyPair,
    to: &str,
    selection: &CoinSelection,
) -> WalletResult<SignedUtxoTransaction> {
    let chain = Chain::Dogecoin;
    let (secp, secret, public) = signing_keys(chain, key)?;
    let public_key = bitcoin::PublicKey::new(public);
    let from_script = ScriptBuf::new_p2pkh(&public_key.pubkey_hash());
    let to_script = recipient_script(strategy.config(), to)?;

    let mut tx = unsigned_transaction(chain, selection, to_script, from_script.clone())?;

    let mut script_sigs = Vec::with_capacity(selection.inputs.len());
    {
        let cache = SighashCache::new(&tx);
        for index in 0..selection.inputs.len() {
            let sighash = cache
                .legacy_signature_hash(index, &from_script, EcdsaSighashType::All.to_u32())
                .map_err(|e| WalletError::signing(chain, e))?;
            let signature = ecdsa::Signature::sighash_all(secp.sign_ecdsa(&Message::from(sighash), &secret));
            let signature = bitcoin::script::PushBytesBuf::try_from(signature.serialize().to_vec())
                .map_err(|e| WalletError::signing(chain, e))?;
            script_sigs.push(
                Builder::new()
                    .push_slice(signature)
                    .push_key(&public_key)
                    .into_script(),
            );
        }
    }
    for (input, script_sig) in tx.input.iter_mut().zip(script_sigs) {
        input.script_sig = script_sig;
    }

    Ok(SignedUtxoTransaction {
        raw_hex: serialize_hex(&tx),
        txid: tx.txid().to_string(),
    })
}
