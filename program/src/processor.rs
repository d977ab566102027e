//! Program state processor
use crate::{
    check_program_account,
    error::FlightSuretyError,
    instruction::FlightSuretyInstruction,
    payout,
    insurance::show_policy,
    state::{
        airline_seeds, ballot_seeds, flight_key, flight_seeds, policy_seeds, Airline, Ballot,
        Flight, FlightKey, FlightStatus, InsurancePolicy, Ledger, Record,
    },
};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction, system_program,
    sysvar::Sysvar,
};

/// Program state handler.
pub struct Processor;
impl Processor {
    /// Processes an [Instruction](enum.FlightSuretyInstruction.html).
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        check_program_account(program_id)?;

        let instruction = FlightSuretyInstruction::unpack(instruction_data)?;
        match instruction {
            FlightSuretyInstruction::InitializeLedger { oracle } => {
                msg!("Instruction: initialize ledger");
                Self::process_initialize_ledger(program_id, accounts, &oracle)
            }

            FlightSuretyInstruction::RegisterAirline { candidate } => {
                msg!("Instruction: register airline");
                Self::process_register_airline(program_id, accounts, &candidate)
            }

            FlightSuretyInstruction::CastVote { candidate } => {
                msg!("Instruction: cast vote");
                Self::process_cast_vote(program_id, accounts, &candidate)
            }

            FlightSuretyInstruction::FundAirline { amount } => {
                msg!("Instruction: fund airline");
                Self::process_fund_airline(program_id, accounts, amount)
            }

            FlightSuretyInstruction::RegisterFlight { code, departure } => {
                msg!("Instruction: register flight");
                Self::process_register_flight(program_id, accounts, &code, departure)
            }

            FlightSuretyInstruction::ResolveFlightStatus {
                airline,
                code,
                departure,
                status,
            } => {
                msg!("Instruction: resolve flight status");
                Self::process_resolve_flight_status(
                    program_id, accounts, &airline, &code, departure, status,
                )
            }

            FlightSuretyInstruction::BuyInsurance {
                airline,
                code,
                departure,
                premium,
            } => {
                msg!("Instruction: buy insurance");
                Self::process_buy_insurance(program_id, accounts, &airline, &code, departure, premium)
            }

            FlightSuretyInstruction::RefreshCredit {
                passenger,
                code,
                departure,
            } => {
                msg!("Instruction: refresh credit");
                Self::process_refresh_credit(program_id, accounts, &passenger, &code, departure)
            }

            FlightSuretyInstruction::Withdraw {
                flight_key,
                code,
                departure,
            } => {
                msg!("Instruction: withdraw");
                Self::process_withdraw(program_id, accounts, &flight_key, &code, departure)
            }
        }
    }


    pub fn process_initialize_ledger(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        oracle: &Pubkey,
    ) -> ProgramResult {
        let accounts_iter = &mut accounts.iter();
        let authority_info = next_account_info(accounts_iter)?;
        let ledger_info = next_account_info(accounts_iter)?;
        let genesis_info = next_account_info(accounts_iter)?;
        let rent_info = next_account_info(accounts_iter)?;
        let system_program_info = next_account_info(accounts_iter)?;

        Self::check_signer(authority_info)?;
        Self::check_ledger_owner(program_id, ledger_info)?;
        Self::check_system_program(system_program_info)?;

        let rent = Rent::from_account_info(rent_info)?;
        if !rent.is_exempt(ledger_info.lamports(), ledger_info.data_len()) {
            msg!("Rent exempt error for ledger account");
            return Err(ProgramError::AccountNotRentExempt);
        }

        let mut ledger = Ledger::unpack(&ledger_info.data.borrow())?;
        if ledger.is_initialized {
            msg!("Ledger account already initialized!");
            return Err(FlightSuretyError::AlreadyInitialized.into());
        }
        let genesis = ledger.initialize(authority_info.key, oracle)?;

        Self::store_new_record(
            program_id,
            &genesis,
            genesis_info,
            &airline_seeds(ledger_info.key, authority_info.key),
            authority_info,
            system_program_info,
            &rent,
        )?;
        Self::store_record(&ledger, ledger_info)
    }

    pub fn process_register_airline(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        candidate: &Pubkey,
    ) -> ProgramResult {
        Self::process_ballot(program_id, accounts, candidate, |ledger, voter, record, ballot| {
            let registered = ledger.register_airline(voter, record, ballot)?;
            msg!("Airline {} registered: {}", candidate, registered);
            Ok(())
        })
    }

    pub fn process_cast_vote(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        candidate: &Pubkey,
    ) -> ProgramResult {
        Self::process_ballot(program_id, accounts, candidate, |ledger, voter, record, ballot| {
            ledger.cast_vote(voter, record, ballot)?;
            Ok(())
        })
    }

    // Registration and votes read and write the same records, only the rule differs.
    fn process_ballot<F>(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        candidate: &Pubkey,
        apply: F,
    ) -> ProgramResult
    where
        F: FnOnce(&mut Ledger, &Airline, &mut Airline, &mut Ballot) -> Result<(), FlightSuretyError>,
    {
        let accounts_iter = &mut accounts.iter();
        let voter_info = next_account_info(accounts_iter)?;
        let ledger_info = next_account_info(accounts_iter)?;
        let voter_record_info = next_account_info(accounts_iter)?;
        let candidate_record_info = next_account_info(accounts_iter)?;
        let ballot_info = next_account_info(accounts_iter)?;
        let rent_info = next_account_info(accounts_iter)?;
        let system_program_info = next_account_info(accounts_iter)?;

        Self::check_signer(voter_info)?;
        Self::check_system_program(system_program_info)?;
        let rent = Rent::from_account_info(rent_info)?;
        let mut ledger = Self::load_ledger(program_id, ledger_info)?;

        let voter_seeds = airline_seeds(ledger_info.key, voter_info.key);
        let candidate_seeds = airline_seeds(ledger_info.key, candidate);
        let vote_seeds = ballot_seeds(ledger_info.key, candidate, voter_info.key);

        let voter = Self::load_record_at::<Airline>(program_id, voter_record_info, &voter_seeds)?
            .unwrap_or_else(|| Airline::new(voter_info.key));
        let mut record =
            Self::load_record_at::<Airline>(program_id, candidate_record_info, &candidate_seeds)?
                .unwrap_or_else(|| Airline::new(candidate));
        let mut ballot = Self::load_record_at::<Ballot>(program_id, ballot_info, &vote_seeds)?
            .unwrap_or_else(|| Ballot::new(candidate, voter_info.key));
        let already_cast = ballot.is_initialized;

        apply(&mut ledger, &voter, &mut record, &mut ballot)?;

        Self::store_new_record(
            program_id,
            &record,
            candidate_record_info,
            &candidate_seeds,
            voter_info,
            system_program_info,
            &rent,
        )?;
        if ballot.is_initialized && !already_cast {
            Self::store_new_record(
                program_id,
                &ballot,
                ballot_info,
                &vote_seeds,
                voter_info,
                system_program_info,
                &rent,
            )?;
        }
        Self::store_record(&ledger, ledger_info)
    }

    pub fn process_fund_airline(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: u64,
    ) -> ProgramResult {
        let accounts_iter = &mut accounts.iter();
        let airline_info = next_account_info(accounts_iter)?;
        let ledger_info = next_account_info(accounts_iter)?;
        let airline_record_info = next_account_info(accounts_iter)?;
        let rent_info = next_account_info(accounts_iter)?;
        let system_program_info = next_account_info(accounts_iter)?;

        Self::check_signer(airline_info)?;
        Self::check_system_program(system_program_info)?;
        let rent = Rent::from_account_info(rent_info)?;
        Self::load_ledger(program_id, ledger_info)?;

        let seeds = airline_seeds(ledger_info.key, airline_info.key);
        let mut airline = Self::load_record_at::<Airline>(program_id, airline_record_info, &seeds)?
            .unwrap_or_else(|| Airline::new(airline_info.key));
        airline.fund(amount)?;

        invoke(
            &system_instruction::transfer(airline_info.key, ledger_info.key, amount),
            &[
                airline_info.clone(),
                ledger_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        Self::store_new_record(
            program_id,
            &airline,
            airline_record_info,
            &seeds,
            airline_info,
            system_program_info,
            &rent,
        )
    }

    pub fn process_register_flight(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        code: &str,
        departure: i64,
    ) -> ProgramResult {
        let accounts_iter = &mut accounts.iter();
        let airline_info = next_account_info(accounts_iter)?;
        let ledger_info = next_account_info(accounts_iter)?;
        let airline_record_info = next_account_info(accounts_iter)?;
        let flight_info = next_account_info(accounts_iter)?;
        let rent_info = next_account_info(accounts_iter)?;
        let system_program_info = next_account_info(accounts_iter)?;

        Self::check_signer(airline_info)?;
        Self::check_system_program(system_program_info)?;
        let rent = Rent::from_account_info(rent_info)?;
        let mut ledger = Self::load_ledger(program_id, ledger_info)?;

        let airline = Self::load_record_at::<Airline>(
            program_id,
            airline_record_info,
            &airline_seeds(ledger_info.key, airline_info.key),
        )?
        .unwrap_or_else(|| Airline::new(airline_info.key));

        let key = flight_key(airline_info.key, code, departure);
        let seeds = flight_seeds(ledger_info.key, &key);
        let existing = Self::load_record_at::<Flight>(program_id, flight_info, &seeds)?;
        let flight = ledger.register_flight(&airline, existing.as_ref(), code, departure)?;

        Self::store_new_record(
            program_id,
            &flight,
            flight_info,
            &seeds,
            airline_info,
            system_program_info,
            &rent,
        )?;
        Self::store_record(&ledger, ledger_info)
    }

    pub fn process_resolve_flight_status(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        airline: &Pubkey,
        code: &str,
        departure: i64,
        status: FlightStatus,
    ) -> ProgramResult {
        let accounts_iter = &mut accounts.iter();
        let oracle_info = next_account_info(accounts_iter)?;
        let ledger_info = next_account_info(accounts_iter)?;
        let flight_info = next_account_info(accounts_iter)?;

        Self::check_signer(oracle_info)?;
        let ledger = Self::load_ledger(program_id, ledger_info)?;

        let key = flight_key(airline, code, departure);
        let flight = Self::load_record_at::<Flight>(
            program_id,
            flight_info,
            &flight_seeds(ledger_info.key, &key),
        )?;
        let flight = ledger.resolve_status(oracle_info.key, flight, status)?;

        Self::store_record(&flight, flight_info)
    }

    pub fn process_buy_insurance(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        airline: &Pubkey,
        code: &str,
        departure: i64,
        premium: u64,
    ) -> ProgramResult {
        let accounts_iter = &mut accounts.iter();
        let passenger_info = next_account_info(accounts_iter)?;
        let ledger_info = next_account_info(accounts_iter)?;
        let flight_info = next_account_info(accounts_iter)?;
        let policy_info = next_account_info(accounts_iter)?;
        let rent_info = next_account_info(accounts_iter)?;
        let system_program_info = next_account_info(accounts_iter)?;

        Self::check_signer(passenger_info)?;
        Self::check_system_program(system_program_info)?;
        let rent = Rent::from_account_info(rent_info)?;
        let mut ledger = Self::load_ledger(program_id, ledger_info)?;

        let key = flight_key(airline, code, departure);
        let flight = Self::load_record_at::<Flight>(
            program_id,
            flight_info,
            &flight_seeds(ledger_info.key, &key),
        )?;
        let seeds = policy_seeds(ledger_info.key, passenger_info.key, &key);
        let existing = Self::load_record_at::<InsurancePolicy>(program_id, policy_info, &seeds)?;

        let policy = ledger.buy_insurance(
            passenger_info.key,
            flight.as_ref(),
            existing.as_ref(),
            premium,
        )?;
        invoke(
            &system_instruction::transfer(passenger_info.key, ledger_info.key, premium),
            &[
                passenger_info.clone(),
                ledger_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        Self::store_new_record(
            program_id,
            &policy,
            policy_info,
            &seeds,
            passenger_info,
            system_program_info,
            &rent,
        )?;
        Self::store_record(&ledger, ledger_info)
    }

    pub fn process_refresh_credit(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        passenger: &Pubkey,
        code: &str,
        departure: i64,
    ) -> ProgramResult {
        let accounts_iter = &mut accounts.iter();
        let ledger_info = next_account_info(accounts_iter)?;
        let flight_info = next_account_info(accounts_iter)?;
        let policy_info = next_account_info(accounts_iter)?;

        Self::load_ledger(program_id, ledger_info)?;

        let policy = Self::load_record::<InsurancePolicy>(program_id, policy_info)?;
        let mut policy = show_policy(policy, passenger, code, departure)?;
        Self::check_address(
            program_id,
            policy_info,
            &policy_seeds(ledger_info.key, passenger, &policy.flight),
        )?;
        let flight = Self::load_record_at::<Flight>(
            program_id,
            flight_info,
            &flight_seeds(ledger_info.key, &policy.flight),
        )?
        .ok_or(FlightSuretyError::NotFound)?;

        let credited = policy.refresh_credit(&flight)?;
        msg!("Passenger {} holds a credit of {}", passenger, credited);

        Self::store_record(&policy, policy_info)
    }

    pub fn process_withdraw(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        flight_key: &FlightKey,
        code: &str,
        departure: i64,
    ) -> ProgramResult {
        let accounts_iter = &mut accounts.iter();
        let passenger_info = next_account_info(accounts_iter)?;
        let ledger_info = next_account_info(accounts_iter)?;
        let policy_info = next_account_info(accounts_iter)?;
        let rent_info = next_account_info(accounts_iter)?;

        Self::check_signer(passenger_info)?;
        let rent = Rent::from_account_info(rent_info)?;
        Self::load_ledger(program_id, ledger_info)?;

        let policy = Self::load_record_at::<InsurancePolicy>(
            program_id,
            policy_info,
            &policy_seeds(ledger_info.key, passenger_info.key, flight_key),
        )?;
        let mut policy = show_policy(policy, passenger_info.key, code, departure)?;
        let amount = policy.settle_withdrawal()?;
        // The policy is stored as paid before any lamports leave the vault.
        Self::store_record(&policy, policy_info)?;

        payout::release(ledger_info, passenger_info, amount, &rent)
    }

    fn check_signer(account_info: &AccountInfo) -> ProgramResult {
        if !account_info.is_signer {
            msg!("Missing signature of {}", account_info.key);
            return Err(ProgramError::MissingRequiredSignature);
        }
        Ok(())
    }

    fn check_ledger_owner(program_id: &Pubkey, ledger_info: &AccountInfo) -> ProgramResult {
        if ledger_info.owner != program_id {
            msg!("Invalid owner for ledger data account");
            return Err(ProgramError::IncorrectProgramId);
        }
        Ok(())
    }

    fn check_system_program(account_info: &AccountInfo) -> ProgramResult {
        if account_info.key != &system_program::id() {
            msg!("Expected the system program, got {}", account_info.key);
            return Err(ProgramError::IncorrectProgramId);
        }
        Ok(())
    }

    /// Checks that `account_info` is the record derived from `seeds` and
    /// returns its bump seed.
    fn check_address(
        program_id: &Pubkey,
        account_info: &AccountInfo,
        seeds: &[&[u8]],
    ) -> Result<u8, ProgramError> {
        let (address, bump) = Pubkey::find_program_address(seeds, program_id);
        if account_info.key != &address {
            msg!("Expected record {}, got {}", address, account_info.key);
            return Err(ProgramError::InvalidSeeds);
        }
        Ok(bump)
    }

    fn load_ledger(program_id: &Pubkey, ledger_info: &AccountInfo) -> Result<Ledger, ProgramError> {
        Self::check_ledger_owner(program_id, ledger_info)?;

        let ledger = Ledger::unpack(&ledger_info.data.borrow())?;
        if !ledger.is_initialized {
            msg!("Ledger account is not initialized!");
            return Err(FlightSuretyError::NotInitialized.into());
        }
        Ok(ledger)
    }

    /// Reads a record, `None` while its account has not been created.
    fn load_record<T: Record>(
        program_id: &Pubkey,
        record_info: &AccountInfo,
    ) -> Result<Option<T>, ProgramError> {
        if record_info.data_is_empty() {
            return Ok(None);
        }
        if record_info.owner != program_id {
            msg!("Invalid owner for record {}", record_info.key);
            return Err(ProgramError::IncorrectProgramId);
        }
        let record = T::unpack(&record_info.data.borrow())?;
        Ok(Some(record).filter(|record| record.is_initialized()))
    }

    fn load_record_at<T: Record>(
        program_id: &Pubkey,
        record_info: &AccountInfo,
        seeds: &[&[u8]],
    ) -> Result<Option<T>, ProgramError> {
        Self::check_address(program_id, record_info, seeds)?;
        Self::load_record(program_id, record_info)
    }

    fn store_record<T: Record>(record: &T, record_info: &AccountInfo) -> ProgramResult {
        record.pack(&mut record_info.data.borrow_mut()[..])
    }

    /// Writes a record, first creating its account at the derived address
    /// when it does not exist yet. `payer` covers the rent.
    fn store_new_record<'a, T: Record>(
        program_id: &Pubkey,
        record: &T,
        record_info: &AccountInfo<'a>,
        seeds: &[&[u8]],
        payer_info: &AccountInfo<'a>,
        system_program_info: &AccountInfo<'a>,
        rent: &Rent,
    ) -> ProgramResult {
        let bump = Self::check_address(program_id, record_info, seeds)?;
        if record_info.data_is_empty() {
            let bump = [bump];
            let mut signer_seeds = seeds.to_vec();
            signer_seeds.push(&bump[..]);
            let required_lamports = rent.minimum_balance(T::LEN);

            if record_info.lamports() == 0 {
                invoke_signed(
                    &system_instruction::create_account(
                        payer_info.key,
                        record_info.key,
                        required_lamports,
                        T::LEN as u64,
                        program_id,
                    ),
                    &[
                        payer_info.clone(),
                        record_info.clone(),
                        system_program_info.clone(),
                    ],
                    &[&signer_seeds[..]],
                )?;
            } else {
                // Someone already sent lamports to the address, create_account would fail
                let shortfall = required_lamports.saturating_sub(record_info.lamports());
                if shortfall > 0 {
                    invoke(
                        &system_instruction::transfer(payer_info.key, record_info.key, shortfall),
                        &[
                            payer_info.clone(),
                            record_info.clone(),
                            system_program_info.clone(),
                        ],
                    )?;
                }
                invoke_signed(
                    &system_instruction::allocate(record_info.key, T::LEN as u64),
                    &[record_info.clone(), system_program_info.clone()],
                    &[&signer_seeds[..]],
                )?;
                invoke_signed(
                    &system_instruction::assign(record_info.key, program_id),
                    &[record_info.clone(), system_program_info.clone()],
                    &[&signer_seeds[..]],
                )?;
            }
        }
        Self::store_record(record, record_info)
    }
}
