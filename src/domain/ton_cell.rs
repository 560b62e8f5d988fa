//! TON Cell / BOC 编解码
//!
//! 只支持普通 cell（level 0），足够覆盖钱包合约 StateInit 与转账消息：
//! - `CellBuilder` 按位写入（≤ 1023 bit, ≤ 4 refs）
//! - 表示哈希：SHA-256(d1 ‖ d2 ‖ 补位数据 ‖ 子 cell 深度 ‖ 子 cell 哈希)
//! - BOC 序列化（单根、CRC32C）与解析
//! - 地址：raw `wc:hex` 与用户友好格式（base64url + CRC16-XMODEM）

use std::{collections::HashMap, sync::Arc};

use base64::Engine;
use crc::{Crc, CRC_16_XMODEM, CRC_32_ISCSI};
use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};

pub const MAX_CELL_BITS: usize = 1023;
pub const MAX_CELL_REFS: usize = 4;

const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];
const CRC32C: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TEST_ONLY: u8 = 0x80;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TonCodecError(pub String);

fn codec_err(msg: impl Into<String>) -> TonCodecError {
    TonCodecError(msg.into())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cell
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
    hash: OnceCell<[u8; 32]>,
}

impl Cell {
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    /// 数据位（最后一个字节中超出 bit_len 的位为 0）
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn d1(&self) -> u8 {
        self.refs.len() as u8
    }

    fn d2(&self) -> u8 {
        (self.bit_len / 8 + (self.bit_len + 7) / 8) as u8
    }

    /// 数据字节，非整字节时追加完成标记位
    fn padded_data(&self) -> Vec<u8> {
        let mut out = self.data[..(self.bit_len + 7) / 8].to_vec();
        if self.bit_len % 8 != 0 {
            if let Some(last) = out.last_mut() {
                *last |= 0x80 >> (self.bit_len % 8);
            }
        }
        out
    }

    pub fn depth(&self) -> u16 {
        self.refs
            .iter()
            .map(|r| r.depth())
            .max()
            .map_or(0, |d| d + 1)
    }

    /// 表示哈希
    pub fn hash(&self) -> [u8; 32] {
        *self.hash.get_or_init(|| {
            let mut hasher = Sha256::new();
            hasher.update([self.d1(), self.d2()]);
            hasher.update(self.padded_data());
            for r in &self.refs {
                hasher.update(r.depth().to_be_bytes());
            }
            for r in &self.refs {
                hasher.update(r.hash());
            }
            hasher.finalize().into()
        })
    }

    /// 序列化为单根 BOC（带 CRC32C）
    pub fn to_boc(self: &Arc<Self>) -> Vec<u8> {
        // 逆后序 = 拓扑序：父 cell 的下标总小于子 cell
        fn visit(cell: &Arc<Cell>, seen: &mut HashMap<[u8; 32], ()>, post: &mut Vec<Arc<Cell>>) {
            if seen.insert(cell.hash(), ()).is_some() {
                return;
            }
            for r in &cell.refs {
                visit(r, seen, post);
            }
            post.push(Arc::clone(cell));
        }

        let mut seen = HashMap::new();
        let mut order = Vec::new();
        visit(self, &mut seen, &mut order);
        order.reverse();

        let index: HashMap<[u8; 32], usize> = order
            .iter()
            .enumerate()
            .map(|(i, c)| (c.hash(), i))
            .collect();

        let size_bytes = bytes_for(order.len());
        let mut cells_data = Vec::new();
        for cell in &order {
            cells_data.push(cell.d1());
            cells_data.push(cell.d2());
            cells_data.extend_from_slice(&cell.padded_data());
            for r in &cell.refs {
                let idx = index.get(&r.hash()).copied().unwrap_or_default();
                write_uint(&mut cells_data, idx, size_bytes);
            }
        }
        let offset_bytes = bytes_for(cells_data.len());

        let mut out = Vec::with_capacity(cells_data.len() + 32);
        out.extend_from_slice(&BOC_MAGIC);
        out.push(0x40 | size_bytes as u8);
        out.push(offset_bytes as u8);
        write_uint(&mut out, order.len(), size_bytes); // cells
        write_uint(&mut out, 1, size_bytes); // roots
        write_uint(&mut out, 0, size_bytes); // absent
        write_uint(&mut out, cells_data.len(), offset_bytes);
        write_uint(&mut out, 0, size_bytes); // root index
        out.extend_from_slice(&cells_data);

        let crc = CRC32C.checksum(&out);
        out.extend_from_slice(&crc.to_le_bytes());
        out
    }

    /// 解析 BOC，返回第一个根 cell
    pub fn from_boc(bytes: &[u8]) -> Result<Arc<Cell>, TonCodecError> {
        let mut r = Reader::new(bytes);
        if r.take(4)? != BOC_MAGIC {
            return Err(codec_err("bad BOC magic"));
        }

        let flags = r.u8()?;
        let has_idx = flags & 0x80 != 0;
        let has_crc = flags & 0x40 != 0;
        let size_bytes = (flags & 0x07) as usize;
        if !(1..=4).contains(&size_bytes) {
            return Err(codec_err("bad BOC size field"));
        }
        let offset_bytes = r.u8()? as usize;
        if !(1..=8).contains(&offset_bytes) {
            return Err(codec_err("bad BOC offset field"));
        }

        let body_len = if has_crc {
            if bytes.len() < 4 {
                return Err(codec_err("BOC too short"));
            }
            let split = bytes.len() - 4;
            let expected = u32::from_le_bytes([
                bytes[split],
                bytes[split + 1],
                bytes[split + 2],
                bytes[split + 3],
            ]);
            if CRC32C.checksum(&bytes[..split]) != expected {
                return Err(codec_err("BOC CRC32C mismatch"));
            }
            split
        } else {
            bytes.len()
        };
        r.limit(body_len)?;

        let cell_count = r.uint(size_bytes)?;
        let root_count = r.uint(size_bytes)?;
        let _absent = r.uint(size_bytes)?;
        let _total_size = r.uint(offset_bytes)?;
        if root_count == 0 || cell_count == 0 {
            return Err(codec_err("BOC has no root"));
        }
        // 每个 cell 至少 2 字节描述符
        if cell_count > body_len / 2 {
            return Err(codec_err("BOC cell count exceeds payload"));
        }

        let root_index = r.uint(size_bytes)?;
        for _ in 1..root_count {
            r.uint(size_bytes)?;
        }
        if has_idx {
            r.take(cell_count * offset_bytes)?;
        }

        let mut raw = Vec::with_capacity(cell_count);
        for i in 0..cell_count {
            let d1 = r.u8()?;
            let d2 = r.u8()?;
            let ref_count = (d1 & 0x07) as usize;
            if ref_count > MAX_CELL_REFS {
                return Err(codec_err("cell has too many refs"));
            }
            if d1 & 0x08 != 0 || d1 >> 5 != 0 {
                return Err(codec_err("exotic cells are not supported"));
            }

            let byte_len = (d2 as usize + 1) / 2;
            let mut data = r.take(byte_len)?.to_vec();
            let bit_len = if d2 % 2 == 1 {
                let last = data.last_mut().ok_or_else(|| codec_err("empty padded cell"))?;
                if *last == 0 {
                    return Err(codec_err("missing completion tag"));
                }
                let trailing = last.trailing_zeros() as usize;
                // 清除完成标记
                *last &= !(1u8 << trailing);
                byte_len * 8 - trailing - 1
            } else {
                byte_len * 8
            };

            let mut refs = Vec::with_capacity(ref_count);
            for _ in 0..ref_count {
                let idx = r.uint(size_bytes)?;
                if idx <= i || idx >= cell_count {
                    return Err(codec_err("cell reference out of order"));
                }
                refs.push(idx);
            }
            raw.push((data, bit_len, refs));
        }

        let mut built: Vec<Option<Arc<Cell>>> = vec![None; cell_count];
        for (i, (data, bit_len, refs)) in raw.into_iter().enumerate().rev() {
            let refs = refs
                .iter()
                .map(|&idx| built[idx].clone().ok_or_else(|| codec_err("dangling reference")))
                .collect::<Result<Vec<_>, _>>()?;
            built[i] = Some(Arc::new(Cell {
                data,
                bit_len,
                refs,
                hash: OnceCell::new(),
            }));
        }

        built
            .get(root_index)
            .cloned()
            .flatten()
            .ok_or_else(|| codec_err("root index out of range"))
    }
}

fn bytes_for(value: usize) -> usize {
    let mut n = 1;
    while n < 8 && value >> (8 * n) != 0 {
        n += 1;
    }
    n
}

fn write_uint(out: &mut Vec<u8>, value: usize, bytes: usize) {
    for i in (0..bytes).rev() {
        out.push((value >> (8 * i)) as u8);
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            end: bytes.len(),
        }
    }

    fn limit(&mut self, end: usize) -> Result<(), TonCodecError> {
        if end < self.pos || end > self.bytes.len() {
            return Err(codec_err("BOC truncated"));
        }
        self.end = end;
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], TonCodecError> {
        let stop = self
            .pos
            .checked_add(n)
            .filter(|&s| s <= self.end)
            .ok_or_else(|| codec_err("BOC truncated"))?;
        let slice = &self.bytes[self.pos..stop];
        self.pos = stop;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, TonCodecError> {
        Ok(self.take(1)?[0])
    }

    fn uint(&mut self, n: usize) -> Result<usize, TonCodecError> {
        Ok(self
            .take(n)?
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | *b as usize))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Builder
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self, TonCodecError> {
        if self.bit_len >= MAX_CELL_BITS {
            return Err(codec_err("cell bit overflow"));
        }
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let idx = self.bit_len / 8;
            self.data[idx] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
        Ok(self)
    }

    /// 大端写入无符号整数的低 `bits` 位
    pub fn store_uint(&mut self, value: u128, bits: usize) -> Result<&mut Self, TonCodecError> {
        if bits > 128 || (bits < 128 && value >> bits != 0) {
            return Err(codec_err(format!("value does not fit in {} bits", bits)));
        }
        if self.bit_len + bits > MAX_CELL_BITS {
            return Err(codec_err("cell bit overflow"));
        }
        for i in (0..bits).rev() {
            self.store_bit((value >> i) & 1 == 1)?;
        }
        Ok(self)
    }

    /// 补码写入有符号整数
    pub fn store_int(&mut self, value: i64, bits: usize) -> Result<&mut Self, TonCodecError> {
        if bits == 0 || bits > 64 {
            return Err(codec_err("signed width must be 1..=64"));
        }
        let min = -(1i128 << (bits - 1));
        let max = (1i128 << (bits - 1)) - 1;
        if (value as i128) < min || (value as i128) > max {
            return Err(codec_err(format!("value does not fit in {} signed bits", bits)));
        }
        let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
        self.store_uint(((value as u64) & mask) as u128, bits)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, TonCodecError> {
        if self.bit_len + bytes.len() * 8 > MAX_CELL_BITS {
            return Err(codec_err("cell bit overflow"));
        }
        for b in bytes {
            self.store_uint(*b as u128, 8)?;
        }
        Ok(self)
    }

    /// VarUInteger 16（Grams / Coins）
    pub fn store_coins(&mut self, amount: u128) -> Result<&mut Self, TonCodecError> {
        let len = (128 - amount.leading_zeros() as usize + 7) / 8;
        if len > 15 {
            return Err(codec_err("coin amount exceeds 120 bits"));
        }
        self.store_uint(len as u128, 4)?;
        self.store_uint(amount, len * 8)
    }

    /// addr_std$10 anycast:nothing workchain_id:int8 address:bits256
    pub fn store_address(&mut self, address: &TonAddress) -> Result<&mut Self, TonCodecError> {
        self.store_uint(0b100, 3)?;
        self.store_int(address.workchain as i64, 8)?;
        self.store_bytes(&address.hash)
    }

    /// addr_none$00
    pub fn store_address_none(&mut self) -> Result<&mut Self, TonCodecError> {
        self.store_uint(0, 2)
    }

    pub fn store_ref(&mut self, cell: Arc<Cell>) -> Result<&mut Self, TonCodecError> {
        if self.refs.len() >= MAX_CELL_REFS {
            return Err(codec_err("cell ref overflow"));
        }
        self.refs.push(cell);
        Ok(self)
    }

    pub fn build(&mut self) -> Arc<Cell> {
        Arc::new(Cell {
            data: std::mem::take(&mut self.data),
            bit_len: std::mem::take(&mut self.bit_len),
            refs: std::mem::take(&mut self.refs),
            hash: OnceCell::new(),
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 地址
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TonAddress {
    pub workchain: i8,
    pub hash: [u8; 32],
}

/// 解析后的地址及其用户友好格式标记
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedTonAddress {
    pub address: TonAddress,
    pub bounceable: bool,
    pub testnet: bool,
}

impl TonAddress {
    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }

    /// 用户友好格式：tag ‖ workchain ‖ hash ‖ crc16，base64url
    pub fn to_user_friendly(&self, bounceable: bool, testnet: bool) -> String {
        let mut tag = if bounceable {
            TAG_BOUNCEABLE
        } else {
            TAG_NON_BOUNCEABLE
        };
        if testnet {
            tag |= TAG_TEST_ONLY;
        }

        let mut raw = Vec::with_capacity(36);
        raw.push(tag);
        raw.push(self.workchain as u8);
        raw.extend_from_slice(&self.hash);
        let crc = CRC16.checksum(&raw);
        raw.extend_from_slice(&crc.to_be_bytes());

        base64::engine::general_purpose::URL_SAFE.encode(raw)
    }

    /// 接受 raw (`0:hex`) 与用户友好格式（url-safe 或标准 base64）
    pub fn parse(input: &str) -> Result<ParsedTonAddress, TonCodecError> {
        let input = input.trim();

        if let Some((wc, hash_hex)) = input.split_once(':') {
            let workchain: i8 = wc.parse().map_err(|_| codec_err("bad workchain"))?;
            let bytes = hex::decode(hash_hex).map_err(|_| codec_err("bad address hex"))?;
            let hash: [u8; 32] = bytes
                .try_into()
                .map_err(|_| codec_err("address hash must be 32 bytes"))?;
            return Ok(ParsedTonAddress {
                address: TonAddress { workchain, hash },
                bounceable: true,
                testnet: false,
            });
        }

        if input.len() != 48 {
            return Err(codec_err("user-friendly address must be 48 characters"));
        }
        let standard: String = input
            .chars()
            .map(|c| match c {
                '-' => '+',
                '_' => '/',
                other => other,
            })
            .collect();
        let raw = base64::engine::general_purpose::STANDARD
            .decode(standard)
            .map_err(|_| codec_err("bad base64"))?;
        if raw.len() != 36 {
            return Err(codec_err("user-friendly address must decode to 36 bytes"));
        }

        let crc = u16::from_be_bytes([raw[34], raw[35]]);
        if CRC16.checksum(&raw[..34]) != crc {
            return Err(codec_err("address checksum mismatch"));
        }

        let tag = raw[0];
        let bounceable = match tag & !TAG_TEST_ONLY {
            TAG_BOUNCEABLE => true,
            TAG_NON_BOUNCEABLE => false,
            _ => return Err(codec_err("unknown address tag")),
        };

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&raw[2..34]);

        Ok(ParsedTonAddress {
            address: TonAddress {
                workchain: raw[1] as i8,
                hash,
            },
            bounceable,
            testnet: tag & TAG_TEST_ONLY != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cell_hash() {
        // 空 cell 的标准哈希
        let cell = CellBuilder::new().build();
        assert_eq!(
            hex::encode(cell.hash()),
            "96a296d224f285c67bee93c30f8a309157f0daa35dc5b87e410b78630a09cfc7"
        );
        assert_eq!(cell.depth(), 0);
    }

    #[test]
    fn test_bit_packing_and_padding() {
        let mut b = CellBuilder::new();
        b.store_uint(0b00110, 5).unwrap();
        let cell = b.build();
        assert_eq!(cell.bit_len(), 5);
        assert_eq!(cell.d2(), 1);
        // 00110 + 完成标记 1 + 00
        assert_eq!(cell.padded_data(), vec![0b0011_0100]);
    }

    #[test]
    fn test_boc_round_trip_with_refs() {
        let mut leaf = CellBuilder::new();
        leaf.store_uint(0xdead_beef, 32).unwrap();
        let leaf = leaf.build();

        let mut root = CellBuilder::new();
        root.store_bit(true).unwrap();
        root.store_coins(1_000_000_000).unwrap();
        root.store_ref(leaf.clone()).unwrap();
        root.store_ref(leaf).unwrap();
        let root = root.build();

        let boc = root.to_boc();
        let parsed = Cell::from_boc(&boc).unwrap();
        assert_eq!(parsed.hash(), root.hash());
        assert_eq!(parsed.refs().len(), 2);
        assert_eq!(parsed.depth(), 1);

        // 相同子 cell 只序列化一次
        assert_eq!(boc[6], 2);
    }

    #[test]
    fn test_boc_rejects_corruption() {
        let mut b = CellBuilder::new();
        b.store_uint(42, 16).unwrap();
        let mut boc = b.build().to_boc();
        let mid = boc.len() / 2;
        boc[mid] ^= 0xff;
        assert!(Cell::from_boc(&boc).is_err());
        assert!(Cell::from_boc(&[0xb5, 0xee]).is_err());
        assert!(Cell::from_boc(&[]).is_err());
    }

    #[test]
    fn test_builder_limits() {
        let mut b = CellBuilder::new();
        assert!(b.store_bytes(&[0u8; 127]).is_ok());
        assert!(b.store_uint(0, 7).is_ok());
        assert!(b.store_bit(true).is_err());

        let mut b = CellBuilder::new();
        assert!(b.store_uint(256, 8).is_err());
        assert!(b.store_int(-129, 8).is_err());
        assert!(b.store_int(-1, 8).is_ok());

        let leaf = CellBuilder::new().build();
        let mut b = CellBuilder::new();
        for _ in 0..4 {
            b.store_ref(leaf.clone()).unwrap();
        }
        assert!(b.store_ref(leaf).is_err());
    }

    #[test]
    fn test_address_formats() {
        let address = TonAddress {
            workchain: 0,
            hash: [0x11; 32],
        };
        let friendly = address.to_user_friendly(true, false);
        assert_eq!(friendly.len(), 48);
        assert!(friendly.starts_with("EQ"));
        assert!(address.to_user_friendly(false, false).starts_with("UQ"));
        assert!(address.to_user_friendly(true, true).starts_with("kQ"));

        let parsed = TonAddress::parse(&friendly).unwrap();
        assert_eq!(parsed.address, address);
        assert!(parsed.bounceable);
        assert!(!parsed.testnet);

        let raw = TonAddress::parse(&address.to_raw()).unwrap();
        assert_eq!(raw.address, address);

        let masterchain = TonAddress {
            workchain: -1,
            hash: [0xab; 32],
        };
        assert!(masterchain.to_raw().starts_with("-1:"));
        assert_eq!(
            TonAddress::parse(&masterchain.to_user_friendly(true, false))
                .unwrap()
                .address,
            masterchain
        );
    }

    #[test]
    fn test_address_checksum_rejected() {
        let address = TonAddress {
            workchain: 0,
            hash: [0x22; 32],
        };
        let mut friendly = address.to_user_friendly(true, false).into_bytes();
        friendly[10] = if friendly[10] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(friendly).unwrap();
        assert!(TonAddress::parse(&tampered).is_err());
        assert!(TonAddress::parse("EQshort").is_err());
        assert!(TonAddress::parse("0:zz").is_err());
    }
}
