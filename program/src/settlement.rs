// Raffle Keeper - Settlement
use solana_program::{clock::UnixTimestamp, msg, pubkey::Pubkey};

use crate::{
    error::RaffleError,
    events::RaffleEvent,
    state::{CorrelationId, RaffleCycle, RaffleState},
};

/// Moves the prize to the winner. Must report whether the transfer happened.
pub trait PayoutChannel {
    fn pay(&mut self, winner: &Pubkey, amount: u64) -> Result<(), RaffleError>;
}

/// Outcome of one settlement
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettlementResult {
    pub winner_index: usize,
    pub winner: Pubkey,
    pub payout_amount: u64,
}

/// Pick `entrants[random_value mod len]`
pub fn select_winner(entrants: &[Pubkey], random_value: u64) -> Option<(usize, Pubkey)> {
    if entrants.is_empty() {
        return None;
    }
    let index = (random_value % entrants.len() as u64) as usize;
    Some((index, entrants[index]))
}

/// Settle the cycle with the oracle's random value.
///
/// If the payout fails the cycle stays in `Drawing` with its request intact,
/// so the same delivery can be retried.
pub fn deliver_randomness<P: PayoutChannel + ?Sized>(
    cycle: &mut RaffleCycle,
    payout: &mut P,
    correlation_id: CorrelationId,
    random_value: u64,
    now: UnixTimestamp,
) -> Result<(SettlementResult, RaffleEvent), RaffleError> {
    match cycle.state {
        RaffleState::Drawing { request } if request.correlation_id == correlation_id => {}
        _ => {
            msg!("No pending randomness request for {}", correlation_id);
            return Err(RaffleError::UnknownRequest);
        }
    }

    let (winner_index, winner) = match select_winner(&cycle.entrants, random_value) {
        Some(selected) => selected,
        None => {
            msg!(
                "ALERT: drawing {} has no entrants, raffle needs operator attention",
                correlation_id
            );
            return Err(RaffleError::InvariantViolation);
        }
    };
    let payout_amount = cycle.pool_amount;

    if let Err(err) = payout.pay(&winner, payout_amount) {
        msg!(
            "Payout of {} to {} failed: {}; raffle stays drawing",
            payout_amount,
            winner,
            err
        );
        return Err(RaffleError::PayoutFailed);
    }

    cycle.entrants.clear();
    cycle.pool_amount = 0;
    cycle.last_draw_timestamp = now;
    cycle.recent_winner = Some(winner);
    cycle.state = RaffleState::Open;

    Ok((
        SettlementResult {
            winner_index,
            winner,
            payout_amount,
        },
        RaffleEvent::WinnerPicked {
            winner,
            payout_amount,
        },
    ))
}
