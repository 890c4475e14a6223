pub mod difficulty;
pub mod error;
pub mod fork_tree;
pub mod inclusion;
pub mod promotion;
pub mod transition;

use btc_types::contract_args::{Action, CheckTransitionArgs, InitArgs, ProofArgs};
use btc_types::hash::H256;
use btc_types::header::decode_compact_target;
use btc_types::state::ChainState;
use near_sdk::{env, log, near, PanicOnDefault};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Contract implementing the Binocular Bitcoin oracle: a single confirmed
/// tip with an append-only accumulator of confirmed block hashes below it,
/// and a bounded forest of candidate branches above it. Headers are relayed
/// in by an external off-chain service; every submission replays Bitcoin
/// consensus rules plus the delayed-finality discipline, deterministically.
#[near(contract_state)]
#[derive(PanicOnDefault)]
pub struct BtcOracleContract {
    chain_state: ChainState,
    // If we should run the proof-of-work check or not; testing only.
    skip_pow_verification: bool,
}

#[near]
impl BtcOracleContract {
    /// Bootstraps the oracle at an environment-chosen confirmed block. The
    /// bootstrap block counts as confirmed, so inclusion proofs can reach
    /// into it.
    #[init]
    #[private]
    #[must_use]
    pub fn init(args: InitArgs) -> Self {
        if let Err(err) = decode_compact_target(args.current_target) {
            env::panic_str(&err.to_string());
        }
        log!(
            "Init oracle with block hash {} at height {}",
            args.block_hash,
            args.block_height
        );

        let mut confirmed_blocks_tree = Vec::new();
        merkle_tools::accumulator_append(&mut confirmed_blocks_tree, args.block_hash.clone());

        Self {
            chain_state: ChainState {
                block_height: args.block_height,
                block_hash: args.block_hash,
                current_target: args.current_target,
                block_timestamp: args.block_timestamp,
                recent_timestamps: vec![args.block_timestamp],
                previous_difficulty_adjustment_timestamp: args
                    .previous_difficulty_adjustment_timestamp,
                confirmed_blocks_tree,
                forks_tree: Vec::new(),
            },
            skip_pow_verification: args.skip_pow_verification,
        }
    }

    /// Applies an [`Action::UpdateOracle`] redeemer. Panics with the reject
    /// verdict if the submission violates any rule; the state is replaced
    /// atomically otherwise.
    pub fn update_oracle(&mut self, #[serializer(borsh)] action: Action) {
        let validity_time = env::block_timestamp() / NANOS_PER_SEC;
        let next = transition::verify_update(
            &self.chain_state,
            &action,
            Some(validity_time),
            self.skip_pow_verification,
        )
        .unwrap_or_else(|err| env::panic_str(&err.to_string()));

        let confirmed = next.block_height - self.chain_state.block_height;
        if confirmed > 0 {
            log!(
                "Promoted {} block(s); confirmed tip now {} at height {}",
                confirmed,
                next.block_hash,
                next.block_height
            );
        }
        log!("Forks tree holds {} branch(es)", next.forks_tree.len());
        self.chain_state = next;
    }

    /// Validator verdict over explicit inputs: recomputes the transition and
    /// compares it with the claimed continuing datum. Read-only.
    pub fn is_valid_transition(&self, #[serializer(borsh)] args: CheckTransitionArgs) -> bool {
        let validity_time = env::block_timestamp() / NANOS_PER_SEC;
        transition::check_transition(
            &args.prev_state,
            &args.action,
            Some(validity_time),
            args.claimed_state.as_ref(),
            self.skip_pow_verification,
        )
        .is_ok()
    }

    /// Verifies that a transaction is included in a confirmed block.
    ///
    /// @param args two-level merkle proof: block into the confirmed
    /// accumulator, transaction into the block
    /// @return true iff every level of the proof checks out
    pub fn verify_transaction_inclusion(&self, #[serializer(borsh)] args: ProofArgs) -> bool {
        inclusion::verify_transaction_inclusion(&self.chain_state, &args)
    }

    pub fn get_chain_state(&self) -> ChainState {
        self.chain_state.clone()
    }

    pub fn get_confirmed_height(&self) -> u64 {
        self.chain_state.block_height
    }

    pub fn get_confirmed_block_hash(&self) -> H256 {
        self.chain_state.block_hash.clone()
    }

    /// Root of the accumulator over every confirmed block hash.
    pub fn get_confirmed_merkle_root(&self) -> H256 {
        merkle_tools::accumulator_root(&self.chain_state.confirmed_blocks_tree)
    }

    pub fn get_forks_count(&self) -> u64 {
        self.chain_state.forks_tree.len() as u64
    }
}

/*
 * The rest of this file holds the inline tests for the contract surface.
 * The end-to-end oracle scenarios live in tests/test_oracle.rs.
 */
