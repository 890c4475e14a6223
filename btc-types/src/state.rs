use near_sdk::near;

use crate::hash::{blake2b_256, H256};
use crate::header::Work;

/// Confirmations a block needs below the canonical tip before it may mature.
pub const MATURATION_CONFIRMATIONS: u64 = 100;
/// How long a block must sit in the forks tree before it may mature. This is
/// the challenge period: honest parties get this long to submit the real
/// chain.
pub const CHALLENGE_AGING_SECS: u64 = 200 * 60;
/// Age past which a competing fork may be evicted when far behind on work.
pub const STALE_COMPETING_FORK_AGE_SECS: u64 = 400 * 60;
/// Chainwork gap (in difficulty-one units) for the stale-fork eviction rule.
pub const CHAINWORK_GAP_THRESHOLD: u64 = 10;
/// Hard bound on the number of branches kept in the forks tree.
pub const MAX_FORKS_TREE_SIZE: usize = 180;
/// Allowed skew between the redeemer time and the host validity interval.
pub const TIME_TOLERANCE_SECS: u64 = 36 * 60 * 60;

/// An admitted but not yet confirmed block.
#[near(serializers = [borsh, json])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockSummary {
    pub hash: H256,
    pub height: u64,
    /// Cumulative work up to and including this block, relative to the
    /// confirmed boundary.
    pub chainwork: Work,
    pub timestamp: u32,
    pub bits: u32,
    /// Host-chain time at which this block was admitted; drives the
    /// challenge-period clock.
    pub added_time: u64,
}

/// One unconfirmed branch above the confirmed tip.
///
/// `recent_blocks` is ordered newest first and covers the whole branch down
/// to (exclusive of) the block the branch is anchored at.
#[near(serializers = [borsh, json])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForkBranch {
    pub tip_hash: H256,
    pub tip_height: u64,
    pub tip_chainwork: Work,
    pub recent_blocks: Vec<BlockSummary>,
}

impl ForkBranch {
    /// A fresh branch holding a single block.
    #[must_use]
    pub fn from_block(summary: BlockSummary) -> Self {
        ForkBranch {
            tip_hash: summary.hash.clone(),
            tip_height: summary.height,
            tip_chainwork: summary.chainwork,
            recent_blocks: vec![summary],
        }
    }

    /// Appends a child of the current tip and moves the tip to it.
    pub fn extend(&mut self, summary: BlockSummary) {
        self.tip_hash = summary.hash.clone();
        self.tip_height = summary.height;
        self.tip_chainwork = summary.chainwork;
        self.recent_blocks.insert(0, summary);
    }

    #[must_use]
    pub fn oldest_block(&self) -> Option<&BlockSummary> {
        self.recent_blocks.last()
    }
}

/// The oracle datum: one confirmed tip plus the forest of candidate branches
/// above it.
#[near(serializers = [borsh, json])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainState {
    /// Height of the confirmed tip.
    pub block_height: u64,
    /// Hash of the confirmed tip, internal byte order.
    pub block_hash: H256,
    /// Compact bits in force at the confirmed tip.
    pub current_target: u32,
    /// Timestamp of the confirmed tip.
    pub block_timestamp: u32,
    /// Up to the last eleven confirmed timestamps, strictly descending.
    pub recent_timestamps: Vec<u32>,
    /// Timestamp of the last confirmed block at a retarget height.
    pub previous_difficulty_adjustment_timestamp: u32,
    /// Levels of the rolling merkle accumulator over every confirmed block
    /// hash, in promotion order. An all-zero slot is empty.
    pub confirmed_blocks_tree: Vec<H256>,
    pub forks_tree: Vec<ForkBranch>,
}

impl ChainState {
    /// Hash of the borsh-encoded datum, carried in the redeemer so the
    /// off-chain builder and the validator can agree on the input state.
    pub fn datum_hash(&self) -> H256 {
        let bytes = borsh::to_vec(self).unwrap_or_else(|_| {
            // Borsh serialization of a plain data struct cannot fail.
            unreachable!("ChainState is borsh-serializable")
        });
        blake2b_256(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(height: u64, n: u8) -> BlockSummary {
        BlockSummary {
            hash: H256([n; 32]),
            height,
            chainwork: Work::from(height),
            timestamp: 1_600_000_000,
            bits: 0x1d00_ffff,
            added_time: 0,
        }
    }

    #[test]
    fn extend_moves_the_tip_and_prepends() {
        let mut branch = ForkBranch::from_block(summary(10, 1));
        branch.extend(summary(11, 2));

        assert_eq!(branch.tip_height, 11);
        assert_eq!(branch.tip_hash, H256([2; 32]));
        assert_eq!(branch.recent_blocks.len(), 2);
        assert_eq!(branch.recent_blocks[0].height, 11);
        assert_eq!(branch.oldest_block().unwrap().height, 10);
    }

    #[test]
    fn datum_hash_tracks_content() {
        let state = ChainState {
            block_height: 0,
            block_hash: H256([1; 32]),
            current_target: 0x1d00_ffff,
            block_timestamp: 1_231_006_505,
            recent_timestamps: vec![1_231_006_505],
            previous_difficulty_adjustment_timestamp: 1_231_006_505,
            confirmed_blocks_tree: vec![H256([1; 32])],
            forks_tree: vec![],
        };
        let mut other = state.clone();

        assert_eq!(state.datum_hash(), other.datum_hash());
        other.block_height = 1;
        assert_ne!(state.datum_hash(), other.datum_hash());
    }
}
