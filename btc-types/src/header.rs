use near_sdk::near;

use crate::hash::{double_sha256, H256};
use crate::u256::U256;

pub type Target = U256;
pub type Work = U256;

pub const TARGET_BLOCK_TIME_SECS: u64 = 10 * 60;
pub const DIFFICULTY_ADJUSTMENT_INTERVAL: u64 = 2016;
pub const EXPECTED_EPOCH_SECS: u64 = DIFFICULTY_ADJUSTMENT_INTERVAL * TARGET_BLOCK_TIME_SECS;
pub const MAX_ADJUSTMENT_FACTOR: u64 = 4;
pub const MAX_FUTURE_BLOCK_TIME_SECS: u64 = 2 * 60 * 60;
pub const MEDIAN_TIME_SPAN: usize = 11;
pub const MIN_BLOCK_VERSION: u32 = 4;
/// Timestamp of the Bitcoin genesis block, the median-time-past of an empty
/// timestamp history.
pub const GENESIS_BLOCK_TIME: u32 = 1_231_006_505;
/// Compact encoding of the easiest admissible difficulty (difficulty one).
pub const POW_LIMIT_BITS: u32 = 0x1d00_ffff;
pub const POW_LIMIT: U256 = U256::new(
    0x0000_0000_ffff_ffff_ffff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff_ffff_ffff_ffff_ffff,
);

/// Failures of the compact-bits decoding rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetError {
    /// Sign bit set, zero target, or overflowing exponent.
    BitsOutOfRange,
    /// Decoded fine but exceeds [`POW_LIMIT`].
    AbovePowLimit,
}

impl std::fmt::Display for TargetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetError::BitsOutOfRange => write!(f, "compact bits out of range"),
            TargetError::AbovePowLimit => write!(f, "target above proof-of-work limit"),
        }
    }
}

impl std::error::Error for TargetError {}

/// Decodes compact bits into a 256-bit target, following the semantics of
/// Bitcoin Core's `arith_uint256::SetCompact` and rejecting every encoding a
/// header is not allowed to carry.
pub fn decode_compact_target(bits: u32) -> Result<Target, TargetError> {
    let mantissa = bits & 0x00ff_ffff;
    let exponent = bits >> 24;

    // The mantissa is signed; a set sign bit would make the target negative.
    if mantissa > 0x007f_ffff {
        return Err(TargetError::BitsOutOfRange);
    }

    let target = if exponent < 3 {
        Target::from(mantissa >> (8 * (3 - exponent)))
    } else {
        let overflows = exponent > 34
            || (mantissa > 0xff && exponent > 33)
            || (mantissa > 0xffff && exponent > 32);
        if overflows {
            return Err(TargetError::BitsOutOfRange);
        }
        Target::from(mantissa) << (8 * (exponent - 3))
    };

    // A zero target can satisfy no hash.
    if target.is_zero() {
        return Err(TargetError::BitsOutOfRange);
    }
    if target > POW_LIMIT {
        return Err(TargetError::AbovePowLimit);
    }

    Ok(target)
}

/// Work contributed by a block mined at `target`, in difficulty-one units.
#[must_use]
pub fn work_from_target(target: &Target) -> Work {
    POW_LIMIT / *target
}

/// The proof-of-work condition: the header hash, read as a little-endian
/// integer, must not exceed the target.
#[must_use]
pub fn check_pow(hash: &H256, target: &Target) -> bool {
    U256::from_le_bytes(&hash.0) <= *target
}

/// A Bitcoin block header.
///
/// The borsh encoding of this struct is bit-exact the 80-byte wire layout
/// (little-endian integers, raw 32-byte hashes), so headers travel through
/// the redeemer unchanged.
#[near(serializers = [borsh, json])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    /// Block version, now repurposed for soft fork signalling.
    pub version: u32,
    /// Reference to the previous block in the chain.
    pub prev_block_hash: H256,
    /// The root hash of the merkle tree of transactions in the block.
    pub merkle_root: H256,
    /// The timestamp of the block, as claimed by the miner.
    pub time: u32,
    /// The target value below which the blockhash must lie.
    pub bits: u32,
    /// The nonce, selected to obtain a low enough blockhash.
    pub nonce: u32,
}

impl Header {
    /// Serialized length: version, prev_blockhash, merkle_root, time, bits, nonce.
    pub const SIZE: usize = 4 + 32 + 32 + 4 + 4 + 4; // 80

    /// Reads a header from its 80-byte wire form by fixed offsets.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        let word = |at: usize| {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(&bytes[at..at + 4]);
            u32::from_le_bytes(buf)
        };
        let hash = |at: usize| {
            let mut buf = [0u8; 32];
            buf.copy_from_slice(&bytes[at..at + 32]);
            H256(buf)
        };

        Header {
            version: word(0),
            prev_block_hash: hash(4),
            merkle_root: hash(36),
            time: word(68),
            bits: word(72),
            nonce: word(76),
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.version.to_le_bytes());
        bytes[4..36].copy_from_slice(&self.prev_block_hash.0);
        bytes[36..68].copy_from_slice(&self.merkle_root.0);
        bytes[68..72].copy_from_slice(&self.time.to_le_bytes());
        bytes[72..76].copy_from_slice(&self.bits.to_le_bytes());
        bytes[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        bytes
    }

    #[must_use]
    pub fn block_hash(&self) -> H256 {
        double_sha256(&self.to_bytes())
    }

    pub fn target(&self) -> Result<Target, TargetError> {
        decode_compact_target(self.bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The real genesis block header, in wire order.
    const GENESIS_HEADER_HEX: &str = "0100000000000000000000000000000000000000000000000000000000000000\
000000003ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a29ab5f49ffff001d1dac2b7c";

    fn genesis_header_bytes() -> [u8; Header::SIZE] {
        hex::decode(GENESIS_HEADER_HEX)
            .unwrap()
            .try_into()
            .unwrap()
    }

    #[test]
    fn parses_the_genesis_header_by_fixed_offsets() {
        let header = Header::from_bytes(&genesis_header_bytes());

        assert_eq!(header.version, 1);
        assert!(header.prev_block_hash.is_zero());
        assert_eq!(
            header.merkle_root.reversed().to_string(),
            "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b"
        );
        assert_eq!(header.time, GENESIS_BLOCK_TIME);
        assert_eq!(header.bits, POW_LIMIT_BITS);
        assert_eq!(header.nonce, 2_083_236_893);
        assert_eq!(header.to_bytes(), genesis_header_bytes());
    }

    #[test]
    fn genesis_header_hashes_to_the_known_block_hash() {
        let header = Header::from_bytes(&genesis_header_bytes());
        assert_eq!(
            header.block_hash().reversed().to_string(),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
    }

    #[test]
    fn borsh_encoding_is_the_wire_layout() {
        let header = Header::from_bytes(&genesis_header_bytes());
        let encoded = borsh::to_vec(&header).unwrap();
        assert_eq!(encoded.as_slice(), &genesis_header_bytes()[..]);
    }

    #[test]
    fn genesis_satisfies_its_own_target() {
        let header = Header::from_bytes(&genesis_header_bytes());
        let target = header.target().unwrap();
        assert!(check_pow(&header.block_hash(), &target));

        // Corrupting the nonce invalidates the work.
        let mut bad = header;
        bad.nonce += 1;
        assert!(!check_pow(&bad.block_hash(), &target));
    }

    #[test]
    fn compact_decoding_rules() {
        // Difficulty one.
        assert_eq!(
            decode_compact_target(POW_LIMIT_BITS).unwrap(),
            U256::from(0xffffu32) << 208
        );
        // Exponent below three shifts the mantissa down.
        assert_eq!(
            decode_compact_target(0x0200_8000).unwrap(),
            U256::from(0x80u32)
        );
        // Sign bit.
        assert_eq!(
            decode_compact_target(0x1d80_0000),
            Err(TargetError::BitsOutOfRange)
        );
        // Zero target.
        assert_eq!(
            decode_compact_target(0x1d00_0000),
            Err(TargetError::BitsOutOfRange)
        );
        // Overflowing exponents.
        assert_eq!(
            decode_compact_target(0x2300_00ff),
            Err(TargetError::BitsOutOfRange)
        );
        assert_eq!(
            decode_compact_target(0x2201_0000),
            Err(TargetError::BitsOutOfRange)
        );
        // In range of the encoding but above the limit.
        assert_eq!(
            decode_compact_target(0x1d01_0000),
            Err(TargetError::AbovePowLimit)
        );
    }

    #[test]
    fn compact_round_trips_through_encode() {
        for bits in [POW_LIMIT_BITS, 0x1703_0ecd, 0x1b03_fffc, 0x0200_8000] {
            let target = decode_compact_target(bits).unwrap();
            assert_eq!(target.target_to_bits(), bits);
        }
    }

    #[test]
    fn work_is_measured_in_difficulty_one_units() {
        let difficulty_one = decode_compact_target(POW_LIMIT_BITS).unwrap();
        assert_eq!(work_from_target(&difficulty_one), U256::ONE);

        // Halving the target doubles the work.
        let harder = difficulty_one >> 1;
        assert_eq!(work_from_target(&harder), U256::from(2u32));
    }
}
