// Raffle Keeper - Utility Functions
use solana_program::{hash::hashv, pubkey::Pubkey};

use crate::state::CorrelationId;

/// Seed prefix of the raffle PDA
pub const RAFFLE_SEED: &[u8] = b"raffle";

/// Find the program derived address of the raffle created by `authority`
pub fn find_raffle_address(program_id: &Pubkey, authority: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[RAFFLE_SEED, authority.as_ref()], program_id)
}

/// Correlation id for the `request_count`-th randomness request of a raffle
pub fn derive_correlation_id(raffle: &Pubkey, request_count: u64, slot: u64) -> CorrelationId {
    hashv(&[
        RAFFLE_SEED,
        raffle.as_ref(),
        &request_count.to_le_bytes(),
        &slot.to_le_bytes(),
    ])
    .into()
}

/// Reduce a 32-byte VRF output to the random value used for winner selection
pub fn random_value_from_bytes(vrf_result: &[u8; 32]) -> u64 {
    u64::from_le_bytes(*arrayref::array_ref![vrf_result, 0, 8])
}
