// Raffle Keeper - Lifecycle orchestration
//
// OPEN    --request_drawing    [is_draw_due]                     --> DRAWING
// DRAWING --deliver_randomness [matching id, entrants, payout ok] --> OPEN
//
// A failed guard never transitions.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use solana_program::{clock::UnixTimestamp, msg, pubkey::Pubkey};

use crate::{
    broker::{self, RandomnessOracle},
    eligibility::{self, UpkeepCheck},
    error::RaffleError,
    events::EventSink,
    ledger,
    settlement::{self, PayoutChannel, SettlementResult},
    state::{CorrelationId, RaffleCycle},
};

/// Owns the current cycle and publishes one event per successful operation
pub struct RaffleMachine<E: EventSink> {
    cycle: RaffleCycle,
    events: E,
}

impl<E: EventSink> RaffleMachine<E> {
    pub fn new(cycle: RaffleCycle, events: E) -> Self {
        Self { cycle, events }
    }

    pub fn cycle(&self) -> &RaffleCycle {
        &self.cycle
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn into_cycle(self) -> RaffleCycle {
        self.cycle
    }

    pub fn enter(&mut self, entrant: Pubkey, stake: u64) -> Result<(), RaffleError> {
        let event = ledger::enter(&mut self.cycle, entrant, stake)?;
        self.events.publish(event);
        Ok(())
    }

    pub fn check_upkeep(&self, now: UnixTimestamp) -> UpkeepCheck {
        eligibility::check_upkeep(&self.cycle, now)
    }

    pub fn is_draw_due(&self, now: UnixTimestamp) -> bool {
        eligibility::is_draw_due(&self.cycle, now)
    }

    pub fn request_drawing<O: RandomnessOracle + ?Sized>(
        &mut self,
        oracle: &mut O,
        now: UnixTimestamp,
    ) -> Result<CorrelationId, RaffleError> {
        let event = broker::request_drawing(&mut self.cycle, oracle, now)?;
        let correlation_id = self
            .cycle
            .pending_request()
            .map(|request| request.correlation_id)
            .ok_or(RaffleError::InvariantViolation)?;
        self.events.publish(event);
        Ok(correlation_id)
    }

    pub fn deliver_randomness<P: PayoutChannel + ?Sized>(
        &mut self,
        payout: &mut P,
        correlation_id: CorrelationId,
        random_value: u64,
        now: UnixTimestamp,
    ) -> Result<SettlementResult, RaffleError> {
        let (result, event) =
            settlement::deliver_randomness(&mut self.cycle, payout, correlation_id, random_value, now)?;
        self.events.publish(event);
        Ok(result)
    }
}

struct Engine<O, P, E: EventSink> {
    machine: RaffleMachine<E>,
    oracle: O,
    payout: P,
}

/// Cloneable handle that serializes every raffle operation behind one lock
pub struct SharedRaffle<O, P, E: EventSink> {
    inner: Arc<Mutex<Engine<O, P, E>>>,
}

impl<O, P, E: EventSink> Clone for SharedRaffle<O, P, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O, P, E> SharedRaffle<O, P, E>
where
    O: RandomnessOracle,
    P: PayoutChannel,
    E: EventSink,
{
    pub fn new(cycle: RaffleCycle, oracle: O, payout: P, events: E) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Engine {
                machine: RaffleMachine::new(cycle, events),
                oracle,
                payout,
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Engine<O, P, E>>, RaffleError> {
        self.inner.lock().map_err(|_| {
            msg!("ALERT: raffle lock poisoned by a panicked operation");
            RaffleError::InvariantViolation
        })
    }

    pub fn enter(&self, entrant: Pubkey, stake: u64) -> Result<(), RaffleError> {
        self.lock()?.machine.enter(entrant, stake)
    }

    /// Read-only; a poisoned lock still yields the last committed cycle
    pub fn is_draw_due(&self, now: UnixTimestamp) -> bool {
        let engine = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        engine.machine.is_draw_due(now)
    }

    pub fn request_drawing(&self, now: UnixTimestamp) -> Result<CorrelationId, RaffleError> {
        let mut guard = self.lock()?;
        let engine = &mut *guard;
        engine.machine.request_drawing(&mut engine.oracle, now)
    }

    pub fn deliver_randomness(
        &self,
        correlation_id: CorrelationId,
        random_value: u64,
        now: UnixTimestamp,
    ) -> Result<SettlementResult, RaffleError> {
        let mut guard = self.lock()?;
        let engine = &mut *guard;
        engine
            .machine
            .deliver_randomness(&mut engine.payout, correlation_id, random_value, now)
    }

    pub fn snapshot(&self) -> RaffleCycle {
        let engine = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        engine.machine.cycle().clone()
    }

    pub fn with_events<R>(&self, f: impl FnOnce(&E) -> R) -> R {
        let engine = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(engine.machine.events())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        events::RaffleEvent,
        state::{RaffleConfig, RaffleState},
    };
    use std::thread;

    const START: UnixTimestamp = 1_700_000_000;

    #[derive(Default)]
    struct MockCoordinator {
        next: u64,
    }

    impl RandomnessOracle for MockCoordinator {
        fn request_randomness(&mut self) -> Result<CorrelationId, RaffleError> {
            self.next += 1;
            let mut id = [0u8; 32];
            id[..8].copy_from_slice(&self.next.to_le_bytes());
            Ok(CorrelationId(id))
        }
    }

    #[derive(Default)]
    struct Wallets {
        credits: Vec<(Pubkey, u64)>,
    }

    impl PayoutChannel for Wallets {
        fn pay(&mut self, winner: &Pubkey, amount: u64) -> Result<(), RaffleError> {
            self.credits.push((*winner, amount));
            Ok(())
        }
    }

    fn new_cycle() -> RaffleCycle {
        RaffleCycle::new(RaffleConfig::new(30, 30, Pubkey::new_unique()), START)
    }

    #[test]
    fn four_entrant_drawing_pays_third_entrant() {
        let mut machine = RaffleMachine::new(new_cycle(), Vec::new());
        let mut oracle = MockCoordinator::default();
        let mut wallets = Wallets::default();
        let entrants: Vec<Pubkey> = (0..4).map(|_| Pubkey::new_unique()).collect();

        for entrant in &entrants {
            machine.enter(*entrant, 30).unwrap();
        }
        assert_eq!(machine.cycle().pool_amount, 120);
        assert_eq!(machine.cycle().entrant_count(), 4);

        assert!(!machine.is_draw_due(START + 29));
        let now = START + 30;
        assert!(machine.is_draw_due(now));
        let request = machine.request_drawing(&mut oracle, now).unwrap();
        assert!(!machine.cycle().is_open());

        let result = machine
            .deliver_randomness(&mut wallets, request, 42, now + 5)
            .unwrap();

        assert_eq!(result.winner_index, 2);
        assert_eq!(result.winner, entrants[2]);
        assert_eq!(wallets.credits, vec![(entrants[2], 120)]);
        let cycle = machine.cycle();
        assert_eq!(cycle.state, RaffleState::Open);
        assert!(cycle.entrants.is_empty());
        assert_eq!(cycle.pool_amount, 0);
        assert_eq!(cycle.last_draw_timestamp, now + 5);
        assert_eq!(cycle.recent_winner, Some(entrants[2]));

        assert_eq!(
            machine.deliver_randomness(&mut wallets, request, 42, now + 6),
            Err(RaffleError::UnknownRequest)
        );
        assert_eq!(wallets.credits.len(), 1);
    }

    #[test]
    fn events_follow_completion_order() {
        let mut machine = RaffleMachine::new(new_cycle(), Vec::new());
        let mut oracle = MockCoordinator::default();
        let mut wallets = Wallets::default();
        let player = Pubkey::new_unique();

        machine.enter(player, 50).unwrap();
        assert!(machine.enter(player, 1).is_err());
        let request = machine.request_drawing(&mut oracle, START + 30).unwrap();
        assert!(machine.request_drawing(&mut oracle, START + 31).is_err());
        machine
            .deliver_randomness(&mut wallets, request, 0, START + 40)
            .unwrap();

        assert_eq!(
            machine.events(),
            &vec![
                RaffleEvent::EntryRecorded {
                    entrant: player,
                    pool_amount: 50
                },
                RaffleEvent::DrawingRequested {
                    correlation_id: request
                },
                RaffleEvent::WinnerPicked {
                    winner: player,
                    payout_amount: 50
                },
            ]
        );
    }

    #[test]
    fn settled_cycle_behaves_like_a_fresh_one() {
        let mut settled = RaffleMachine::new(new_cycle(), Vec::new());
        let mut oracle = MockCoordinator::default();
        let mut wallets = Wallets::default();
        settled.enter(Pubkey::new_unique(), 30).unwrap();
        let request = settled.request_drawing(&mut oracle, START + 30).unwrap();
        settled
            .deliver_randomness(&mut wallets, request, 9, START + 30)
            .unwrap();

        let mut fresh = RaffleMachine::new(
            RaffleCycle::new(settled.cycle().config, START + 30),
            Vec::new(),
        );

        let player = Pubkey::new_unique();
        for machine in [&mut settled, &mut fresh] {
            assert_eq!(machine.enter(player, 29), Err(RaffleError::InsufficientStake));
            machine.enter(player, 30).unwrap();
            machine.enter(player, 45).unwrap();
            assert!(!machine.is_draw_due(START + 59));
            assert!(machine.is_draw_due(START + 60));
        }
        assert_eq!(settled.cycle().entrants, fresh.cycle().entrants);
        assert_eq!(settled.cycle().pool_amount, fresh.cycle().pool_amount);
        assert_eq!(settled.cycle().state, fresh.cycle().state);
    }

    #[test]
    fn shared_raffle_loses_no_concurrent_entries() {
        let raffle = SharedRaffle::new(
            new_cycle(),
            MockCoordinator::default(),
            Wallets::default(),
            Vec::new(),
        );

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let raffle = raffle.clone();
                thread::spawn(move || {
                    let player = Pubkey::new_unique();
                    for _ in 0..25 {
                        raffle.enter(player, 30).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let cycle = raffle.snapshot();
        assert_eq!(cycle.entrants.len(), 200);
        assert_eq!(cycle.pool_amount, 200 * 30);
        assert_eq!(raffle.with_events(|events| events.len()), 200);
    }

    #[test]
    fn concurrent_triggers_issue_one_request() {
        let raffle = SharedRaffle::new(
            new_cycle(),
            MockCoordinator::default(),
            Wallets::default(),
            Vec::new(),
        );
        raffle.enter(Pubkey::new_unique(), 30).unwrap();

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let raffle = raffle.clone();
                thread::spawn(move || raffle.request_drawing(START + 30))
            })
            .collect();
        let outcomes: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .filter_map(|outcome| outcome.err())
            .all(|err| err == RaffleError::AlreadyDrawing));
        assert!(!raffle.is_draw_due(START + 30));

        let request = outcomes.iter().find_map(|outcome| outcome.ok()).unwrap();
        raffle.deliver_randomness(request, 3, START + 31).unwrap();
        assert!(raffle.snapshot().is_open());
    }
}
