pub use btc_types::hash::{double_sha256, H256};

fn hash_pair(left: &H256, right: &H256) -> H256 {
    let mut concat = Vec::with_capacity(64);
    concat.extend(left.0);
    concat.extend(right.0);
    double_sha256(&concat)
}

/// Recomputes a merkle root from a leaf and its sibling path.
///
/// An empty proof returns the leaf unchanged.
pub fn compute_root_from_merkle_proof(leaf: &H256, index: u64, proof: &[H256]) -> H256 {
    let mut current = leaf.clone();
    let mut position = index;

    for sibling in proof {
        if position % 2 == 0 {
            current = hash_pair(&current, sibling);
        } else {
            current = hash_pair(sibling, &current);
        }
        position /= 2;
    }

    current
}

/// Builds the sibling path for the leaf at `position`, duplicating the last
/// node of odd levels the way Bitcoin block merkle trees do.
pub fn merkle_proof_calculator(leaves: &[H256], position: usize) -> Vec<H256> {
    let mut proof = Vec::new();
    let mut current = leaves.to_vec();
    let mut position = position;

    while current.len() > 1 {
        if current.len() % 2 == 1 {
            current.push(current[current.len() - 1].clone());
        }

        let sibling = if position % 2 == 1 {
            position - 1
        } else {
            position + 1
        };
        proof.push(current[sibling].clone());

        current = current
            .chunks(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
        position /= 2;
    }

    proof
}

/// Appends a hash to the rolling accumulator.
///
/// `levels[i]` holds the root of a pending complete subtree of 2^i leaves;
/// an all-zero slot is empty. A collision at a level combines the two
/// subtrees and carries the result upward.
pub fn accumulator_append(levels: &mut Vec<H256>, hash: H256) {
    let mut carry = hash;
    for slot in levels.iter_mut() {
        if slot.is_zero() {
            *slot = carry;
            return;
        }
        carry = hash_pair(slot, &carry);
        *slot = H256::ZERO;
    }
    levels.push(carry);
}

/// Folds the pending subtrees into a single root.
///
/// A dangling carry is lifted by pairing with itself, which makes the result
/// equal to the classic Bitcoin merkle root (odd nodes duplicated) over the
/// appended leaves. The root of an empty accumulator is all zeros; the root
/// of a single leaf is that leaf.
pub fn accumulator_root(levels: &[H256]) -> H256 {
    let mut current: Option<(H256, usize)> = None;

    for (level, slot) in levels.iter().enumerate() {
        if slot.is_zero() {
            continue;
        }
        current = Some(match current {
            None => (slot.clone(), level),
            Some((mut hash, mut at)) => {
                while at < level {
                    hash = hash_pair(&hash, &hash);
                    at += 1;
                }
                (hash_pair(slot, &hash), level + 1)
            }
        });
    }

    current.map_or(H256::ZERO, |(hash, _)| hash)
}

/// Number of leaves ever appended to the accumulator.
#[must_use]
pub fn accumulator_size(levels: &[H256]) -> u64 {
    levels
        .iter()
        .enumerate()
        .filter(|(_, slot)| !slot.is_zero())
        .map(|(level, _)| 1u64 << level)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_hex(hex: &str) -> H256 {
        hex.parse().unwrap()
    }

    fn leaf(n: u8) -> H256 {
        double_sha256(&[n])
    }

    // Hash pairs of items recursively until a single value is obtained,
    // duplicating the last item of odd levels.
    fn classic_merkle_root(hashes: &[H256]) -> H256 {
        if hashes.len() == 1 {
            return hashes[0].clone();
        }

        let mut level = hashes.to_vec();
        if level.len() % 2 == 1 {
            level.push(level[level.len() - 1].clone());
        }

        let next: Vec<H256> = level
            .chunks(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
        classic_merkle_root(&next)
    }

    fn block_100000_tx_hashes() -> Vec<H256> {
        // Transactions of mainnet block 100000, internal byte order.
        vec![
            decode_hex("876dd0a3ef4a2816ffd1c12ab649825a958b0ff3bb3d6f3e1250f13ddbf0148c"),
            decode_hex("c40297f730dd7b5a99567eb8d27b78758f607507c52292d02d4031895b52f2ff"),
            decode_hex("c46e239ab7d28e2c019b6d66ad8fae98a56ef1f21aeecb94d1b1718186f05963"),
            decode_hex("1d0cb83721529a062d9675b98d6e5c587e4a770fc84ed00abc5a5de04568a6e9"),
        ]
    }

    #[test]
    fn proof_round_trips_to_the_root() {
        let hashes = block_100000_tx_hashes();
        let root = classic_merkle_root(&hashes);

        for (position, hash) in hashes.iter().enumerate() {
            let proof = merkle_proof_calculator(&hashes, position);
            assert_eq!(proof.len(), 2);
            assert_eq!(
                compute_root_from_merkle_proof(hash, position as u64, &proof),
                root
            );
        }
    }

    #[test]
    fn block_100000_merkle_root_matches_mainnet() {
        let root = classic_merkle_root(&block_100000_tx_hashes());
        assert_eq!(
            root.reversed().to_string(),
            "f3e94742aca4b5ef85488dc37c06c3282295ffec960994b2c0d5ac2a25a95766"
        );
    }

    #[test]
    fn proof_round_trips_with_odd_leaf_counts() {
        let hashes: Vec<H256> = (0u8..5).map(leaf).collect();
        let root = classic_merkle_root(&hashes);

        for position in 0..hashes.len() {
            let proof = merkle_proof_calculator(&hashes, position);
            assert_eq!(
                compute_root_from_merkle_proof(&hashes[position], position as u64, &proof),
                root
            );
        }
    }

    #[test]
    fn empty_proof_returns_the_leaf() {
        let hash = leaf(9);
        assert_eq!(compute_root_from_merkle_proof(&hash, 0, &[]), hash);
    }

    #[test]
    fn accumulator_root_of_nothing_is_zero() {
        assert_eq!(accumulator_root(&[]), H256::ZERO);
        assert_eq!(accumulator_size(&[]), 0);
    }

    #[test]
    fn accumulator_root_of_one_leaf_is_the_leaf() {
        let mut levels = Vec::new();
        accumulator_append(&mut levels, leaf(1));
        assert_eq!(accumulator_root(&levels), leaf(1));
        assert_eq!(accumulator_size(&levels), 1);
    }

    #[test]
    fn rolling_root_equals_the_classic_root() {
        for count in 1u8..=16 {
            let leaves: Vec<H256> = (0..count).map(leaf).collect();

            let mut levels = Vec::new();
            for item in &leaves {
                accumulator_append(&mut levels, item.clone());
            }

            assert_eq!(
                accumulator_root(&levels),
                classic_merkle_root(&leaves),
                "mismatch at {count} leaves"
            );
            assert_eq!(accumulator_size(&levels), u64::from(count));
        }
    }

    #[test]
    fn accumulator_proofs_verify_against_the_rolling_root() {
        let leaves: Vec<H256> = (0u8..7).map(leaf).collect();
        let mut levels = Vec::new();
        for item in &leaves {
            accumulator_append(&mut levels, item.clone());
        }
        let root = accumulator_root(&levels);

        for position in 0..leaves.len() {
            let proof = merkle_proof_calculator(&leaves, position);
            assert_eq!(
                compute_root_from_merkle_proof(&leaves[position], position as u64, &proof),
                root
            );
        }
    }
}
