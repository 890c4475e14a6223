use btc_types::hash::H256;
use btc_types::header::{
    check_pow, decode_compact_target, work_from_target, Header, DIFFICULTY_ADJUSTMENT_INTERVAL,
    MAX_FUTURE_BLOCK_TIME_SECS, MIN_BLOCK_VERSION,
};
use btc_types::state::{BlockSummary, ChainState, ForkBranch};

use crate::difficulty::{branch_median_time_past, expected_next_bits, median_time_past};
use crate::error::UpdateError;

/// Where a submitted header's parent was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParentRef {
    ConfirmedTip,
    /// `block` indexes into `recent_blocks`; zero is the branch tip.
    Branch { branch: usize, block: usize },
}

fn find_parent(confirmed_hash: &H256, forest: &[ForkBranch], parent_hash: &H256) -> Option<ParentRef> {
    if parent_hash == confirmed_hash {
        return Some(ParentRef::ConfirmedTip);
    }
    for (branch, candidate) in forest.iter().enumerate() {
        if let Some(block) = candidate
            .recent_blocks
            .iter()
            .position(|summary| &summary.hash == parent_hash)
        {
            return Some(ParentRef::Branch { branch, block });
        }
    }
    None
}

/// Index of the branch with the greatest tip chainwork; ties go to the first
/// encountered. `None` on an empty forest.
pub fn select_canonical_chain(forest: &[ForkBranch]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, branch) in forest.iter().enumerate() {
        match best {
            Some(current) if branch.tip_chainwork <= forest[current].tip_chainwork => {}
            _ => best = Some(index),
        }
    }
    best
}

/// The tip every new canonical extension must build on: the heaviest branch
/// tip, or the confirmed tip while the forest is empty.
#[must_use]
pub fn canonical_tip_hash(state: &ChainState) -> H256 {
    select_canonical_chain(&state.forks_tree)
        .map_or_else(|| state.block_hash.clone(), |index| state.forks_tree[index].tip_hash.clone())
}

/// Admits one header into the forest, enforcing proof-of-work, parentage,
/// difficulty, timestamp and version rules. `confirmed` supplies the scalars
/// at the confirmed boundary and is not modified.
pub fn add_block_to_forks_tree(
    confirmed: &ChainState,
    forest: &mut Vec<ForkBranch>,
    header: &Header,
    current_time: u64,
    skip_pow: bool,
) -> Result<(), UpdateError> {
    let target = decode_compact_target(header.bits)?;
    let hash = header.block_hash();
    if !skip_pow && !check_pow(&hash, &target) {
        return Err(UpdateError::InvalidPoW);
    }

    let parent = find_parent(&confirmed.block_hash, forest, &header.prev_block_hash)
        .ok_or(UpdateError::UnknownParent)?;

    let (parent_height, parent_chainwork, parent_mtp) = match parent {
        ParentRef::ConfirmedTip => {
            let expected = expected_next_bits(
                confirmed.block_height,
                confirmed.current_target,
                confirmed.block_timestamp,
                confirmed.previous_difficulty_adjustment_timestamp,
            )?;
            if header.bits != expected {
                return Err(UpdateError::BadDifficulty {
                    expected,
                    actual: header.bits,
                });
            }
            let confirmed_work = work_from_target(&decode_compact_target(confirmed.current_target)?);
            (
                confirmed.block_height,
                confirmed_work,
                median_time_past(&confirmed.recent_timestamps),
            )
        }
        ParentRef::Branch { branch, block } => {
            let summary = &forest[branch].recent_blocks[block];
            // Off retarget boundaries the target must carry over. At a
            // boundary the claimed bits are accepted: branches do not carry
            // their epoch-start timestamp.
            if (summary.height + 1) % DIFFICULTY_ADJUSTMENT_INTERVAL != 0
                && header.bits != summary.bits
            {
                return Err(UpdateError::BadDifficulty {
                    expected: summary.bits,
                    actual: header.bits,
                });
            }
            (
                summary.height,
                summary.chainwork,
                branch_median_time_past(&forest[branch], block),
            )
        }
    };

    if header.time <= parent_mtp {
        return Err(UpdateError::BadTimestamp);
    }
    if u64::from(header.time) > current_time + MAX_FUTURE_BLOCK_TIME_SECS {
        return Err(UpdateError::BadTimestamp);
    }
    if header.version < MIN_BLOCK_VERSION {
        return Err(UpdateError::OutdatedVersion);
    }

    let block_work = work_from_target(&target);
    let (chainwork, overflow) = parent_chainwork.overflowing_add(block_work);
    if overflow {
        return Err(UpdateError::ChainworkOverflow);
    }

    let summary = BlockSummary {
        hash,
        height: parent_height + 1,
        chainwork,
        timestamp: header.time,
        bits: header.bits,
        added_time: current_time,
    };

    match parent {
        // A child of the confirmed tip starts its own branch.
        ParentRef::ConfirmedTip => forest.push(ForkBranch::from_block(summary)),
        // A child of a branch tip extends that branch in place.
        ParentRef::Branch { branch, block: 0 } => forest[branch].extend(summary),
        // A fork out of a branch interior starts a new, independent branch.
        ParentRef::Branch { .. } => forest.push(ForkBranch::from_block(summary)),
    }

    Ok(())
}
