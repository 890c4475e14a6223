use near_sdk::near;

use crate::hash::H256;
use crate::header::Header;
use crate::state::ChainState;

/// Environment-supplied bootstrap of the oracle state.
#[near(serializers = [borsh, json])]
#[derive(Clone, Debug)]
pub struct InitArgs {
    pub block_height: u64,
    pub block_hash: H256,
    pub current_target: u32,
    pub block_timestamp: u32,
    pub previous_difficulty_adjustment_timestamp: u32,
    /// Should be `false` for standard use; `true` lets tests drive chains
    /// whose headers were never mined.
    pub skip_pow_verification: bool,
}

/// The redeemer. A closed sum type with a stable borsh discriminant.
#[near(serializers = [borsh, json])]
#[derive(Clone, Debug)]
pub enum Action {
    UpdateOracle {
        block_headers: Vec<Header>,
        /// Seconds since the Unix epoch, as claimed by the submitter.
        current_time: u64,
        /// Advisory blake2b-256 of the borsh-encoded prior state.
        input_datum_hash: H256,
    },
}

/// Two-level inclusion proof: a block into the confirmed accumulator and a
/// transaction into that block.
#[near(serializers = [borsh, json])]
#[derive(Clone, Debug)]
pub struct ProofArgs {
    /// Transaction id, internal byte order.
    pub tx_id: H256,
    pub tx_index: u64,
    /// Sibling hashes, leaf to root, into the block's tx merkle tree.
    pub tx_merkle_proof: Vec<H256>,
    /// Hash of the block claimed to contain the transaction.
    pub block_hash: H256,
    pub block_index: u64,
    /// Sibling hashes into the confirmed accumulator.
    pub block_merkle_proof: Vec<H256>,
    /// The raw header of the claimed block.
    pub block_header: Header,
}

/// Inputs of the validator-style transition check.
#[near(serializers = [borsh, json])]
#[derive(Clone, Debug)]
pub struct CheckTransitionArgs {
    pub prev_state: ChainState,
    pub action: Action,
    /// The next datum the environment proposes; the check recomputes it.
    pub claimed_state: Option<ChainState>,
}
