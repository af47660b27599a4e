// Raffle Keeper - Events
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{log::sol_log_data, msg, pubkey::Pubkey};

use crate::state::CorrelationId;

/// Observable outcome of a successful raffle operation
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum RaffleEvent {
    /// An entry was appended to the current cycle
    EntryRecorded { entrant: Pubkey, pool_amount: u64 },
    /// A randomness request was issued to the oracle
    DrawingRequested { correlation_id: CorrelationId },
    /// The cycle settled and the pool went to the winner
    WinnerPicked { winner: Pubkey, payout_amount: u64 },
}

/// Receives events in the order their operations complete
pub trait EventSink {
    fn publish(&mut self, event: RaffleEvent);
}

impl EventSink for Vec<RaffleEvent> {
    fn publish(&mut self, event: RaffleEvent) {
        self.push(event);
    }
}

/// Writes events to the program log, readable and as borsh program data
#[derive(Clone, Copy, Debug, Default)]
pub struct ProgramLog;

impl EventSink for ProgramLog {
    fn publish(&mut self, event: RaffleEvent) {
        match &event {
            RaffleEvent::EntryRecorded { entrant, pool_amount } => {
                msg!("EntryRecorded: entrant={}, pool={}", entrant, pool_amount);
            }
            RaffleEvent::DrawingRequested { correlation_id } => {
                msg!("DrawingRequested: correlation_id={}", correlation_id);
            }
            RaffleEvent::WinnerPicked {
                winner,
                payout_amount,
            } => {
                msg!("WinnerPicked: winner={}, payout={}", winner, payout_amount);
            }
        }
        if let Ok(data) = event.try_to_vec() {
            sol_log_data(&[&data]);
        }
    }
}
