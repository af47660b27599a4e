// Raffle Keeper - Instruction Processor
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};

use crate::{
    broker::RandomnessOracle,
    eligibility::check_upkeep,
    error::RaffleError,
    events::ProgramLog,
    instruction::RaffleInstruction,
    machine::RaffleMachine,
    settlement::PayoutChannel,
    state::{CorrelationId, RaffleAccount, RaffleConfig, RaffleCycle},
    utils::{derive_correlation_id, find_raffle_address, RAFFLE_SEED},
};

/// On-chain request side of the oracle.
///
/// Issues a fresh correlation id per request; the off-chain oracle watches
/// for `DrawingRequested` and answers with `DeliverRandomness`.
pub struct SequencedOracle<'a> {
    raffle: &'a Pubkey,
    slot: u64,
    request_count: &'a mut u64,
}

impl<'a> SequencedOracle<'a> {
    pub fn new(raffle: &'a Pubkey, slot: u64, request_count: &'a mut u64) -> Self {
        Self {
            raffle,
            slot,
            request_count,
        }
    }
}

impl RandomnessOracle for SequencedOracle<'_> {
    fn request_randomness(&mut self) -> Result<CorrelationId, RaffleError> {
        let next = self
            .request_count
            .checked_add(1)
            .ok_or(RaffleError::Overflow)?;
        let correlation_id = derive_correlation_id(self.raffle, *self.request_count, self.slot);
        *self.request_count = next;
        Ok(correlation_id)
    }
}

/// Pays the prize out of the raffle account's lamports
pub struct LamportPayout<'a, 'info> {
    raffle: &'a AccountInfo<'info>,
    winner: &'a AccountInfo<'info>,
    rent_floor: u64,
}

impl<'a, 'info> LamportPayout<'a, 'info> {
    pub fn new(raffle: &'a AccountInfo<'info>, winner: &'a AccountInfo<'info>, rent_floor: u64) -> Self {
        Self {
            raffle,
            winner,
            rent_floor,
        }
    }
}

impl PayoutChannel for LamportPayout<'_, '_> {
    fn pay(&mut self, winner: &Pubkey, amount: u64) -> Result<(), RaffleError> {
        if self.winner.key != winner {
            msg!("Winner account {} does not match drawn winner {}", self.winner.key, winner);
            return Err(RaffleError::PayoutFailed);
        }
        if !self.winner.is_writable {
            msg!("Winner account must be writable");
            return Err(RaffleError::PayoutFailed);
        }

        let remaining = self
            .raffle
            .lamports()
            .checked_sub(amount)
            .filter(|remaining| *remaining >= self.rent_floor)
            .ok_or_else(|| {
                msg!(
                    "Raffle holds {} lamports, cannot pay {} above rent floor {}",
                    self.raffle.lamports(),
                    amount,
                    self.rent_floor
                );
                RaffleError::PayoutFailed
            })?;
        let credited = self
            .winner
            .lamports()
            .checked_add(amount)
            .ok_or(RaffleError::Overflow)?;

        **self
            .raffle
            .try_borrow_mut_lamports()
            .map_err(|_| RaffleError::PayoutFailed)? = remaining;
        **self
            .winner
            .try_borrow_mut_lamports()
            .map_err(|_| RaffleError::PayoutFailed)? = credited;
        Ok(())
    }
}

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::InitializeRaffle { config } => {
                msg!("Instruction: Initialize Raffle");
                Self::process_initialize_raffle(program_id, accounts, config)
            }
            RaffleInstruction::EnterRaffle { stake } => {
                msg!("Instruction: Enter Raffle");
                Self::process_enter_raffle(program_id, accounts, stake)
            }
            RaffleInstruction::CheckUpkeep => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(program_id, accounts)
            }
            RaffleInstruction::RequestDrawing => {
                msg!("Instruction: Request Drawing");
                Self::process_request_drawing(program_id, accounts)
            }
            RaffleInstruction::DeliverRandomness {
                correlation_id,
                random_value,
            } => {
                msg!("Instruction: Deliver Randomness");
                Self::process_deliver_randomness(program_id, accounts, correlation_id, random_value)
            }
        }
    }

    fn process_initialize_raffle(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        config: RaffleConfig,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            msg!("Authority must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        config.validate()?;

        let (expected_raffle, bump) = find_raffle_address(program_id, authority_info.key);
        if *raffle_info.key != expected_raffle {
            msg!("Invalid raffle account address");
            return Err(ProgramError::InvalidArgument);
        }

        if raffle_info.owner == program_id {
            msg!("Raffle account is already initialized");
            return Err(ProgramError::AccountAlreadyInitialized);
        }

        let space = RaffleAccount::space(config.max_entrants);
        let rent_lamports = Rent::get()?.minimum_balance(space);
        invoke_signed(
            &system_instruction::create_account(
                authority_info.key,
                raffle_info.key,
                rent_lamports,
                space as u64,
                program_id,
            ),
            &[
                authority_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
            &[&[RAFFLE_SEED, authority_info.key.as_ref(), &[bump]]],
        )?;

        let now = Clock::get()?.unix_timestamp;
        let raffle = RaffleAccount {
            is_initialized: true,
            authority: *authority_info.key,
            bump,
            request_count: 0,
            cycle: RaffleCycle::new(config, now),
        };
        raffle.save(raffle_info)?;

        msg!(
            "Raffle initialized: MinStake={}, Interval={}s, Capacity={}, Oracle={}",
            config.min_entry_stake,
            config.draw_interval_seconds,
            config.max_entrants,
            config.oracle
        );
        Ok(())
    }

    fn process_enter_raffle(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        stake: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let entrant_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !entrant_info.is_signer {
            msg!("Entrant must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut raffle = RaffleAccount::load(raffle_info, program_id)?;

        let mut machine = RaffleMachine::new(raffle.cycle, ProgramLog);
        machine.enter(*entrant_info.key, stake)?;

        // Stake goes into the raffle account, which holds the pool until payout
        invoke(
            &system_instruction::transfer(entrant_info.key, raffle_info.key, stake),
            &[
                entrant_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        raffle.cycle = machine.into_cycle();
        raffle.save(raffle_info)?;

        msg!(
            "Entered raffle with {} lamports, {} entries, pool {}",
            stake,
            raffle.cycle.entrant_count(),
            raffle.cycle.pool_amount
        );
        Ok(())
    }

    fn process_check_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;

        let raffle = RaffleAccount::load(raffle_info, program_id)?;
        let now = Clock::get()?.unix_timestamp;

        let check = check_upkeep(&raffle.cycle, now);
        check.log();
        set_return_data(&[check.upkeep_needed() as u8]);

        msg!("Upkeep needed: {}", check.upkeep_needed());
        Ok(())
    }

    fn process_request_drawing(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;

        if !caller_info.is_signer {
            msg!("Caller must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut raffle = RaffleAccount::load(raffle_info, program_id)?;
        let clock = Clock::get()?;

        let mut machine = RaffleMachine::new(raffle.cycle, ProgramLog);
        let mut oracle = SequencedOracle::new(raffle_info.key, clock.slot, &mut raffle.request_count);
        let correlation_id = machine.request_drawing(&mut oracle, clock.unix_timestamp)?;

        raffle.cycle = machine.into_cycle();
        raffle.save(raffle_info)?;

        msg!(
            "Randomness requested: correlation_id={}, confirmations={}",
            correlation_id,
            raffle.cycle.config.request_confirmations
        );
        Ok(())
    }

    fn process_deliver_randomness(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        correlation_id: CorrelationId,
        random_value: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let oracle_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        if !oracle_info.is_signer {
            msg!("Oracle must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut raffle = RaffleAccount::load(raffle_info, program_id)?;

        if *oracle_info.key != raffle.cycle.config.oracle {
            msg!("Signer {} is not the raffle oracle", oracle_info.key);
            return Err(RaffleError::NotRaffleOracle.into());
        }

        let rent_floor = Rent::get()?.minimum_balance(raffle_info.data_len());
        let now = Clock::get()?.unix_timestamp;

        let mut machine = RaffleMachine::new(raffle.cycle, ProgramLog);
        let mut payout = LamportPayout::new(raffle_info, winner_info, rent_floor);
        let result = machine.deliver_randomness(&mut payout, correlation_id, random_value, now)?;

        raffle.cycle = machine.into_cycle();
        raffle.save(raffle_info)?;

        msg!(
            "Raffle settled: winner={} (entry {}), payout={}",
            result.winner,
            result.winner_index,
            result.payout_amount
        );
        Ok(())
    }
}
