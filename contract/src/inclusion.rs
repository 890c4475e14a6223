use btc_types::contract_args::ProofArgs;
use btc_types::state::ChainState;
use merkle_tools::{accumulator_root, compute_root_from_merkle_proof};

/// Verifies a two-level inclusion proof against the confirmed accumulator:
/// the block must fold into the accumulator root, the header must hash to
/// the claimed block hash, and the transaction must fold into the header's
/// merkle root.
///
/// The caller is expected to know that `tx_id` is a real transaction hash;
/// a crafted inner-node preimage would also verify, as with any SPV check.
#[must_use]
pub fn verify_transaction_inclusion(state: &ChainState, args: &ProofArgs) -> bool {
    let confirmed_root = accumulator_root(&state.confirmed_blocks_tree);
    let block_root = compute_root_from_merkle_proof(
        &args.block_hash,
        args.block_index,
        &args.block_merkle_proof,
    );
    if block_root != confirmed_root {
        return false;
    }

    if args.block_header.block_hash() != args.block_hash {
        return false;
    }

    let tx_root =
        compute_root_from_merkle_proof(&args.tx_id, args.tx_index, &args.tx_merkle_proof);
    tx_root == args.block_header.merkle_root
}
