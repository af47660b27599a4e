// Raffle Keeper
// An automated raffle on Solana: entries accumulate a pool, a keeper requests
// randomness once the draw interval passes, and the oracle's answer picks the winner.

// Raffle lifecycle
pub mod broker;
pub mod eligibility;
pub mod ledger;
pub mod machine;
pub mod settlement;

// Program surface
pub mod entrypoint;
pub mod error;
pub mod events;
pub mod instruction;
pub mod processor;
pub mod state;
pub mod utils;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

/// Instruction handler, shared by the on-chain entrypoint and program tests
pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}
