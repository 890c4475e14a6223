use btc_types::contract_args::Action;
use btc_types::hash::H256;
use btc_types::header::{Header, DIFFICULTY_ADJUSTMENT_INTERVAL, MEDIAN_TIME_SPAN};
use btc_types::state::{BlockSummary, ChainState, TIME_TOLERANCE_SECS};

use crate::error::UpdateError;
use crate::fork_tree::{add_block_to_forks_tree, canonical_tip_hash};
use crate::promotion::{collect_garbage, promote_matured_blocks};

/// The deterministic core: folds a batch of headers into the prior state and
/// returns the next one. Identical inputs produce byte-identical output;
/// any rule violation rejects the whole submission.
pub fn compute_update_oracle_state(
    prev: &ChainState,
    headers: &[Header],
    current_time: u64,
    skip_pow: bool,
) -> Result<ChainState, UpdateError> {
    if headers.is_empty() {
        return Err(UpdateError::EmptySubmission);
    }
    check_submission_shape(prev, headers)?;

    let mut next = prev.clone();
    for header in headers {
        add_block_to_forks_tree(prev, &mut next.forks_tree, header, current_time, skip_pow)?;
    }

    let promoted = promote_matured_blocks(&mut next.forks_tree, current_time);
    let confirmed_height = promoted.last().map_or(prev.block_height, |block| block.height);
    collect_garbage(&mut next.forks_tree, confirmed_height, current_time);

    if !promoted.is_empty() {
        apply_promotion(&mut next, prev, &promoted);
    }

    Ok(next)
}

/// Rejects duplicate headers and fork-only submissions. Forks may only ride
/// along with at least one extension of the canonical tip, so a flood of
/// forks cannot stall the oracle.
fn check_submission_shape(prev: &ChainState, headers: &[Header]) -> Result<(), UpdateError> {
    let hashes: Vec<H256> = headers.iter().map(Header::block_hash).collect();
    for (index, hash) in hashes.iter().enumerate() {
        if hashes[..index].contains(hash) {
            return Err(UpdateError::DuplicateInBatch);
        }
    }

    let canonical_tip = canonical_tip_hash(prev);
    let mut has_extension = false;
    let mut has_fork = false;
    for header in headers {
        if header.prev_block_hash == canonical_tip {
            has_extension = true;
        } else {
            has_fork = true;
        }
    }
    if has_fork && !has_extension {
        return Err(UpdateError::MissingCanonicalExtension);
    }

    Ok(())
}

/// Installs the matured prefix: confirmed scalars move to the newest
/// promoted block, every promoted hash is appended to the accumulator in
/// order, and the timestamp history is rebuilt over the promoted segment.
fn apply_promotion(next: &mut ChainState, prev: &ChainState, promoted: &[BlockSummary]) {
    for block in promoted {
        merkle_tools::accumulator_append(&mut next.confirmed_blocks_tree, block.hash.clone());
    }

    if let Some(newest) = promoted.last() {
        next.block_height = newest.height;
        next.block_hash = newest.hash.clone();
        next.current_target = newest.bits;
        next.block_timestamp = newest.timestamp;
    }

    let mut timestamps: Vec<u32> = promoted.iter().map(|block| block.timestamp).collect();
    timestamps.extend(prev.recent_timestamps.iter().copied());
    timestamps.sort_unstable_by(|a, b| b.cmp(a));
    timestamps.dedup();
    timestamps.truncate(MEDIAN_TIME_SPAN);
    next.recent_timestamps = timestamps;

    if let Some(adjustment) = promoted
        .iter()
        .rev()
        .find(|block| block.height % DIFFICULTY_ADJUSTMENT_INTERVAL == 0)
    {
        next.previous_difficulty_adjustment_timestamp = adjustment.timestamp;
    }
}

/// Entry point used by the contract surface: checks the environment-facing
/// obligations (finite validity interval, redeemer-time tolerance, input
/// datum hash) before running the pure transition.
pub fn verify_update(
    prev: &ChainState,
    action: &Action,
    validity_interval_time: Option<u64>,
    skip_pow: bool,
) -> Result<ChainState, UpdateError> {
    let Action::UpdateOracle {
        block_headers,
        current_time,
        input_datum_hash,
    } = action;

    let validity_time = validity_interval_time.ok_or(UpdateError::NonFiniteValidity)?;
    if current_time.abs_diff(validity_time) > TIME_TOLERANCE_SECS {
        return Err(UpdateError::TimeOutOfTolerance);
    }
    if input_datum_hash != &prev.datum_hash() {
        return Err(UpdateError::InputDatumMismatch);
    }

    compute_update_oracle_state(prev, block_headers, *current_time, skip_pow)
}

/// Full validator verdict: recomputes the next state and requires it to
/// equal the datum the environment proposes on the continuing output.
pub fn check_transition(
    prev: &ChainState,
    action: &Action,
    validity_interval_time: Option<u64>,
    claimed_next: Option<&ChainState>,
    skip_pow: bool,
) -> Result<ChainState, UpdateError> {
    let next = verify_update(prev, action, validity_interval_time, skip_pow)?;
    match claimed_next {
        None => Err(UpdateError::OutputShape),
        Some(claimed) if claimed != &next => Err(UpdateError::StateMismatch),
        Some(_) => Ok(next),
    }
}
