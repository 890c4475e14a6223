use btc_types::header::{
    decode_compact_target, Target, DIFFICULTY_ADJUSTMENT_INTERVAL, EXPECTED_EPOCH_SECS,
    GENESIS_BLOCK_TIME, MAX_ADJUSTMENT_FACTOR, MEDIAN_TIME_SPAN, POW_LIMIT,
};
use btc_types::state::ForkBranch;
use btc_types::U256;

use crate::error::UpdateError;

/// Compact bits the child of a block at `parent_height` must carry.
///
/// Off retarget boundaries the target is carried over unchanged; at a
/// boundary it is recomputed from the time the closing epoch actually took.
pub fn expected_next_bits(
    parent_height: u64,
    current_bits: u32,
    parent_time: u32,
    epoch_start_time: u32,
) -> Result<u32, UpdateError> {
    if (parent_height + 1) % DIFFICULTY_ADJUSTMENT_INTERVAL != 0 {
        return Ok(current_bits);
    }
    retarget(current_bits, parent_time, epoch_start_time)
}

fn retarget(current_bits: u32, last_block_time: u32, first_block_time: u32) -> Result<u32, UpdateError> {
    let last_target = decode_compact_target(current_bits)?;
    let timespan = modulated_timespan(i64::from(last_block_time) - i64::from(first_block_time));

    let (widened, overflow) = last_target.overflowing_mul(timespan);
    let mut next_target: Target = if overflow {
        POW_LIMIT
    } else {
        widened / U256::from(EXPECTED_EPOCH_SECS)
    };
    if next_target > POW_LIMIT {
        next_target = POW_LIMIT;
    }

    Ok(next_target.target_to_bits())
}

/// Clamps the epoch timespan into `[T/4, 4T]`; a backwards clock collapses
/// to the lower bound.
fn modulated_timespan(actual_timespan: i64) -> u64 {
    let timespan = u64::try_from(actual_timespan).unwrap_or(0);
    timespan.clamp(
        EXPECTED_EPOCH_SECS / MAX_ADJUSTMENT_FACTOR,
        EXPECTED_EPOCH_SECS * MAX_ADJUSTMENT_FACTOR,
    )
}

/// Median-time-past over a strictly descending timestamp list. The history
/// of a freshly bootstrapped chain is the genesis timestamp.
#[must_use]
pub fn median_time_past(sorted_descending: &[u32]) -> u32 {
    if sorted_descending.is_empty() {
        return GENESIS_BLOCK_TIME;
    }
    sorted_descending[sorted_descending.len() / 2]
}

/// Median-time-past of the block at `parent_index` within a branch, over the
/// up-to-eleven summaries ending at it.
#[must_use]
pub fn branch_median_time_past(branch: &ForkBranch, parent_index: usize) -> u32 {
    let mut timestamps: Vec<u32> = branch.recent_blocks[parent_index..]
        .iter()
        .take(MEDIAN_TIME_SPAN)
        .map(|block| block.timestamp)
        .collect();
    timestamps.sort_unstable_by(|a, b| b.cmp(a));
    median_time_past(&timestamps)
}
