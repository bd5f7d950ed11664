use alloy::primitives::B256;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::events::compute_transfer_hash;

#[test]
fn transfer_hash_is_deterministic() {
    let tx_hash = B256::repeat_byte(0xab);
    assert_eq!(compute_transfer_hash(tx_hash, 3), compute_transfer_hash(tx_hash, 3));
}

#[rstest]
#[case::same_tx_different_index(B256::repeat_byte(1), 0, B256::repeat_byte(1), 1)]
#[case::different_tx_same_index(B256::repeat_byte(1), 7, B256::repeat_byte(2), 7)]
fn transfer_hash_distinguishes_inputs(
    #[case] tx_hash_a: B256,
    #[case] log_index_a: u64,
    #[case] tx_hash_b: B256,
    #[case] log_index_b: u64,
) {
    assert_ne!(
        compute_transfer_hash(tx_hash_a, log_index_a),
        compute_transfer_hash(tx_hash_b, log_index_b)
    );
}
