use std::collections::HashSet;

use btc_types::header::{decode_compact_target, work_from_target, Work, POW_LIMIT_BITS};
use btc_types::state::{
    BlockSummary, ForkBranch, CHAINWORK_GAP_THRESHOLD, CHALLENGE_AGING_SECS,
    MATURATION_CONFIRMATIONS, MAX_FORKS_TREE_SIZE, STALE_COMPETING_FORK_AGE_SECS,
};
use btc_types::U256;

use crate::fork_tree::select_canonical_chain;

/// Removes the matured prefix of the canonical branch and returns it, oldest
/// first. A block matures once it is deep enough below the canonical tip and
/// has outlived the challenge period. A fully drained branch leaves the
/// forest.
pub fn promote_matured_blocks(forest: &mut Vec<ForkBranch>, current_time: u64) -> Vec<BlockSummary> {
    let Some(canonical) = select_canonical_chain(forest) else {
        return Vec::new();
    };
    let tip_height = forest[canonical].tip_height;
    let branch = &mut forest[canonical];

    let mut promoted = Vec::new();
    loop {
        let matured = branch.oldest_block().is_some_and(|oldest| {
            tip_height - oldest.height >= MATURATION_CONFIRMATIONS
                && current_time.saturating_sub(oldest.added_time) >= CHALLENGE_AGING_SECS
        });
        if !matured {
            break;
        }
        if let Some(block) = branch.recent_blocks.pop() {
            promoted.push(block);
        }
    }

    if branch.recent_blocks.is_empty() {
        forest.remove(canonical);
    }

    promoted
}

fn age_of(branch: &ForkBranch, current_time: u64) -> u64 {
    branch
        .oldest_block()
        .map_or(0, |oldest| current_time.saturating_sub(oldest.added_time))
}

fn gap_threshold() -> Work {
    // Ten difficulty-one blocks worth of work.
    match decode_compact_target(POW_LIMIT_BITS) {
        Ok(target) => {
            let (threshold, _) = work_from_target(&target).overflowing_mul(CHAINWORK_GAP_THRESHOLD);
            threshold
        }
        Err(_) => Work::from(CHAINWORK_GAP_THRESHOLD),
    }
}

/// Bounds the forest under adversarial fork submissions. Only runs once the
/// forest exceeds [`MAX_FORKS_TREE_SIZE`]; the canonical branch is never
/// evicted.
pub fn collect_garbage(forest: &mut Vec<ForkBranch>, confirmed_height: u64, current_time: u64) {
    if forest.len() <= MAX_FORKS_TREE_SIZE {
        return;
    }
    let Some(canonical) = select_canonical_chain(forest) else {
        return;
    };
    let canonical_tip = forest[canonical].tip_hash.clone();
    let canonical_height = forest[canonical].tip_height;
    let canonical_work = forest[canonical].tip_chainwork;
    let stale_gap = gap_threshold();

    forest.retain(|branch| {
        if branch.tip_hash == canonical_tip {
            return true;
        }
        let age = age_of(branch, current_time);
        let height_gap = canonical_height.saturating_sub(branch.tip_height);
        let work_gap = canonical_work.saturating_sub(branch.tip_chainwork);

        // Fell far behind and nobody extended it through a challenge period.
        let old_dead_fork =
            height_gap >= MATURATION_CONFIRMATIONS && age >= CHALLENGE_AGING_SECS;
        // Aged out while trailing by many difficulty-one blocks of work.
        let stale_competing_fork =
            age >= STALE_COMPETING_FORK_AGE_SECS && work_gap >= stale_gap;
        // Long enough to have matured, yet still lighter than the canon.
        let long_fork_past_challenge = age >= CHALLENGE_AGING_SECS
            && branch.tip_height >= confirmed_height + MATURATION_CONFIRMATIONS
            && work_gap > U256::ZERO;

        !(old_dead_fork || stale_competing_fork || long_fork_past_challenge)
    });

    if forest.len() > MAX_FORKS_TREE_SIZE {
        // Last resort: keep the heaviest tips, stable over submission order.
        let mut order: Vec<usize> = (0..forest.len()).collect();
        order.sort_by(|&a, &b| forest[b].tip_chainwork.cmp(&forest[a].tip_chainwork));
        let keep: HashSet<usize> = order.into_iter().take(MAX_FORKS_TREE_SIZE).collect();

        let mut index = 0;
        forest.retain(|_| {
            let retained = keep.contains(&index);
            index += 1;
            retained
        });
    }
}
