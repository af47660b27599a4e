// Raffle Keeper - Entry ledger
use solana_program::{msg, pubkey::Pubkey};

use crate::{error::RaffleError, events::RaffleEvent, state::RaffleCycle};

/// Record one entry of `stake` lamports for `entrant`.
///
/// Nothing is mutated unless every check passes. The same entrant may enter
/// any number of times, each entry occupying its own slot.
pub fn enter(
    cycle: &mut RaffleCycle,
    entrant: Pubkey,
    stake: u64,
) -> Result<RaffleEvent, RaffleError> {
    if stake < cycle.config.min_entry_stake {
        msg!(
            "Stake {} is below the minimum entry stake {}",
            stake,
            cycle.config.min_entry_stake
        );
        return Err(RaffleError::InsufficientStake);
    }

    if !cycle.is_open() {
        msg!("Raffle is drawing, entries are closed");
        return Err(RaffleError::RaffleNotOpen);
    }

    if cycle.entrants.len() >= cycle.config.max_entrants as usize {
        msg!("Raffle is full: {} entrants", cycle.entrants.len());
        return Err(RaffleError::RaffleFull);
    }

    let pool_amount = cycle
        .pool_amount
        .checked_add(stake)
        .ok_or(RaffleError::Overflow)?;

    cycle.entrants.push(entrant);
    cycle.pool_amount = pool_amount;

    Ok(RaffleEvent::EntryRecorded {
        entrant,
        pool_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{CorrelationId, PendingRandomnessRequest, RaffleConfig, RaffleState};

    fn open_cycle() -> RaffleCycle {
        RaffleCycle::new(RaffleConfig::new(30, 30, Pubkey::new_unique()), 0)
    }

    #[test]
    fn entries_accumulate_stake_and_keep_order() {
        let mut cycle = open_cycle();
        let entrants: Vec<Pubkey> = (0..5).map(|_| Pubkey::new_unique()).collect();
        let stakes = [30, 45, 30, 100, 31];

        for (entrant, stake) in entrants.iter().zip(stakes) {
            enter(&mut cycle, *entrant, stake).unwrap();
        }

        assert_eq!(cycle.pool_amount, stakes.iter().sum::<u64>());
        assert_eq!(cycle.entrants, entrants);
    }

    #[test]
    fn repeat_entries_occupy_separate_slots() {
        let mut cycle = open_cycle();
        let entrant = Pubkey::new_unique();
        enter(&mut cycle, entrant, 30).unwrap();
        let event = enter(&mut cycle, entrant, 30).unwrap();

        assert_eq!(cycle.entrants, vec![entrant, entrant]);
        assert_eq!(
            event,
            RaffleEvent::EntryRecorded {
                entrant,
                pool_amount: 60
            }
        );
    }

    #[test]
    fn stake_below_minimum_is_rejected_without_mutation() {
        let mut cycle = open_cycle();
        enter(&mut cycle, Pubkey::new_unique(), 30).unwrap();
        let before = cycle.clone();

        assert_eq!(
            enter(&mut cycle, Pubkey::new_unique(), 29),
            Err(RaffleError::InsufficientStake)
        );
        assert_eq!(cycle, before);
    }

    #[test]
    fn drawing_cycle_rejects_entries() {
        let mut cycle = open_cycle();
        enter(&mut cycle, Pubkey::new_unique(), 30).unwrap();
        cycle.state = RaffleState::Drawing {
            request: PendingRandomnessRequest {
                correlation_id: CorrelationId([1; 32]),
                issued_at: 31,
            },
        };
        let before = cycle.clone();

        assert_eq!(
            enter(&mut cycle, Pubkey::new_unique(), 30),
            Err(RaffleError::RaffleNotOpen)
        );
        assert_eq!(cycle, before);
    }

    #[test]
    fn low_stake_is_reported_before_closed_raffle() {
        let mut cycle = open_cycle();
        cycle.state = RaffleState::Drawing {
            request: PendingRandomnessRequest {
                correlation_id: CorrelationId([1; 32]),
                issued_at: 31,
            },
        };
        assert_eq!(
            enter(&mut cycle, Pubkey::new_unique(), 0),
            Err(RaffleError::InsufficientStake)
        );
    }

    #[test]
    fn capacity_and_overflow_are_enforced() {
        let mut config = RaffleConfig::new(1, 30, Pubkey::new_unique());
        config.max_entrants = 2;
        let mut cycle = RaffleCycle::new(config, 0);

        enter(&mut cycle, Pubkey::new_unique(), u64::MAX - 1).unwrap();
        assert_eq!(
            enter(&mut cycle, Pubkey::new_unique(), 2),
            Err(RaffleError::Overflow)
        );
        enter(&mut cycle, Pubkey::new_unique(), 1).unwrap();
        assert_eq!(
            enter(&mut cycle, Pubkey::new_unique(), 1),
            Err(RaffleError::RaffleFull)
        );
        assert_eq!(cycle.entrants.len(), 2);
        assert_eq!(cycle.pool_amount, u64::MAX);
    }
}
