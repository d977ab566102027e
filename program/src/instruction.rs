//! Instruction types
use crate::{
    check_program_account,
    error::FlightSuretyError::InvalidInstruction,
    flights::check_flight_code,
    state::{
        find_airline_address, find_ballot_address, find_flight_address, find_policy_address,
        flight_key, FlightKey, FlightStatus,
    },
};
use arrayref::array_ref;
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program, sysvar,
};
use std::{
    convert::{TryFrom, TryInto},
    mem::size_of,
};

const PUBKEY_LEN: usize = 32;
const FLIGHT_KEY_LEN: usize = 32;

/// Instructions supported by the FlightSurety program.
#[repr(C)]
#[derive(Clone, Debug, PartialEq)]
pub enum FlightSuretyInstruction {
    /// Initializes the ledger and registers its authority as the first airline.
    ///
    /// Accounts expected by this instruction:
    /// `[signer, writable]` Ledger authority, pays for its airline record
    /// `[writable]` Ledger data account
    /// `[writable]` Authority airline record
    /// `[]` Rent system account
    /// `[]` System program
    InitializeLedger {
        /// Key allowed to resolve flight statuses
        oracle: Pubkey,
    },

    /// Registers an airline directly, or votes for it once the registry is full.
    ///
    /// Accounts expected by this instruction:
    /// `[signer, writable]` Sponsoring airline
    /// `[writable]` Ledger data account
    /// `[]` Sponsor airline record
    /// `[writable]` Candidate airline record
    /// `[writable]` Ballot of the sponsor for the candidate
    /// `[]` Rent system account
    /// `[]` System program
    RegisterAirline {
        /// Airline to register
        candidate: Pubkey,
    },

    /// Votes for a candidate airline.
    ///
    /// Accounts expected by this instruction:
    /// `[signer, writable]` Voting airline
    /// `[writable]` Ledger data account
    /// `[]` Voter airline record
    /// `[writable]` Candidate airline record
    /// `[writable]` Ballot of the voter for the candidate
    /// `[]` Rent system account
    /// `[]` System program
    CastVote {
        /// Airline to vote for
        candidate: Pubkey,
    },

    /// Pays airline funding into the ledger.
    ///
    /// Accounts expected by this instruction:
    /// `[signer, writable]` Airline
    /// `[writable]` Ledger data account
    /// `[writable]` Airline record
    /// `[]` Rent system account
    /// `[]` System program
    FundAirline {
        /// Lamports to pay in
        amount: u64,
    },

    /// Registers a flight of the signing airline.
    ///
    /// Accounts expected by this instruction:
    /// `[signer, writable]` Airline
    /// `[writable]` Ledger data account
    /// `[]` Airline record
    /// `[writable]` Flight record
    /// `[]` Rent system account
    /// `[]` System program
    RegisterFlight {
        /// Flight code
        code: String,
        /// Departure timestamp
        departure: i64,
    },

    /// Records a flight outcome.
    ///
    /// Accounts expected by this instruction:
    /// `[signer]` Oracle authority
    /// `[]` Ledger data account
    /// `[writable]` Flight record
    ResolveFlightStatus {
        /// Airline operating the flight
        airline: Pubkey,
        /// Flight code
        code: String,
        /// Departure timestamp
        departure: i64,
        /// Resolved status
        status: FlightStatus,
    },

    /// Buys insurance on an unresolved flight, paying the premium into the ledger.
    ///
    /// Accounts expected by this instruction:
    /// `[signer, writable]` Passenger
    /// `[writable]` Ledger data account
    /// `[]` Flight record
    /// `[writable]` Policy record
    /// `[]` Rent system account
    /// `[]` System program
    BuyInsurance {
        /// Airline operating the flight
        airline: Pubkey,
        /// Flight code
        code: String,
        /// Departure timestamp
        departure: i64,
        /// Premium in lamports
        premium: u64,
    },

    /// Recomputes a passenger's credit from the flight status.
    ///
    /// Accounts expected by this instruction:
    /// `[]` Ledger data account
    /// `[]` Flight record
    /// `[writable]` Policy record
    RefreshCredit {
        /// Insured passenger
        passenger: Pubkey,
        /// Flight code
        code: String,
        /// Departure timestamp
        departure: i64,
    },

    /// Withdraws a passenger's credit.
    ///
    /// Accounts expected by this instruction:
    /// `[signer, writable]` Passenger
    /// `[writable]` Ledger data account
    /// `[writable]` Policy record
    /// `[]` Rent system account
    Withdraw {
        /// Key of the insured flight
        flight_key: FlightKey,
        /// Flight code
        code: String,
        /// Departure timestamp
        departure: i64,
    },
}

impl FlightSuretyInstruction {
    /// Unpacks a byte buffer into a FlightSuretyInstruction.
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (&tag, rest) = input.split_first().ok_or(InvalidInstruction)?;
        Ok(match tag {
            0 => {
                let (oracle, _) = Self::unpack_pubkey(rest)?;
                Self::InitializeLedger { oracle }
            }
            1 => {
                let (candidate, _) = Self::unpack_pubkey(rest)?;
                Self::RegisterAirline { candidate }
            }
            2 => {
                let (candidate, _) = Self::unpack_pubkey(rest)?;
                Self::CastVote { candidate }
            }
            3 => {
                let (amount, _) = Self::unpack_u64(rest)?;
                Self::FundAirline { amount }
            }
            4 => {
                let (code, rest) = Self::unpack_string(rest)?;
                let (departure, _) = Self::unpack_i64(rest)?;
                Self::RegisterFlight { code, departure }
            }
            5 => {
                let (airline, rest) = Self::unpack_pubkey(rest)?;
                let (code, rest) = Self::unpack_string(rest)?;
                let (departure, rest) = Self::unpack_i64(rest)?;
                let status = rest
                    .first()
                    .copied()
                    .and_then(FlightStatus::from_code)
                    .ok_or(InvalidInstruction)?;
                Self::ResolveFlightStatus {
                    airline,
                    code,
                    departure,
                    status,
                }
            }
            6 => {
                let (airline, rest) = Self::unpack_pubkey(rest)?;
                let (code, rest) = Self::unpack_string(rest)?;
                let (departure, rest) = Self::unpack_i64(rest)?;
                let (premium, _) = Self::unpack_u64(rest)?;
                Self::BuyInsurance {
                    airline,
                    code,
                    departure,
                    premium,
                }
            }
            7 => {
                let (passenger, rest) = Self::unpack_pubkey(rest)?;
                let (code, rest) = Self::unpack_string(rest)?;
                let (departure, _) = Self::unpack_i64(rest)?;
                Self::RefreshCredit {
                    passenger,
                    code,
                    departure,
                }
            }
            8 => {
                let (flight_key, rest) = Self::unpack_flight_key(rest)?;
                let (code, rest) = Self::unpack_string(rest)?;
                let (departure, _) = Self::unpack_i64(rest)?;
                Self::Withdraw {
                    flight_key,
                    code,
                    departure,
                }
            }

            _ => return Err(InvalidInstruction.into()),
        })
    }

    /// Packs a FlightSuretyInstruction into a byte buffer.
    ///
    /// Fails on a string too long for its one byte length prefix.
    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        let mut buf = Vec::with_capacity(size_of::<Self>());
        match self {
            Self::InitializeLedger { oracle } => {
                buf.push(0);
                buf.extend_from_slice(oracle.as_ref());
            }
            Self::RegisterAirline { candidate } => {
                buf.push(1);
                buf.extend_from_slice(candidate.as_ref());
            }
            Self::CastVote { candidate } => {
                buf.push(2);
                buf.extend_from_slice(candidate.as_ref());
            }
            Self::FundAirline { amount } => {
                buf.push(3);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::RegisterFlight { code, departure } => {
                buf.push(4);
                Self::pack_string(&mut buf, code)?;
                buf.extend_from_slice(&departure.to_le_bytes());
            }
            Self::ResolveFlightStatus {
                airline,
                code,
                departure,
                status,
            } => {
                buf.push(5);
                buf.extend_from_slice(airline.as_ref());
                Self::pack_string(&mut buf, code)?;
                buf.extend_from_slice(&departure.to_le_bytes());
                buf.push(status.code());
            }
            Self::BuyInsurance {
                airline,
                code,
                departure,
                premium,
            } => {
                buf.push(6);
                buf.extend_from_slice(airline.as_ref());
                Self::pack_string(&mut buf, code)?;
                buf.extend_from_slice(&departure.to_le_bytes());
                buf.extend_from_slice(&premium.to_le_bytes());
            }
            Self::RefreshCredit {
                passenger,
                code,
                departure,
            } => {
                buf.push(7);
                buf.extend_from_slice(passenger.as_ref());
                Self::pack_string(&mut buf, code)?;
                buf.extend_from_slice(&departure.to_le_bytes());
            }
            Self::Withdraw {
                flight_key,
                code,
                departure,
            } => {
                buf.push(8);
                buf.extend_from_slice(flight_key);
                Self::pack_string(&mut buf, code)?;
                buf.extend_from_slice(&departure.to_le_bytes());
            }
        };
        Ok(buf)
    }

    fn unpack_pubkey(input: &[u8]) -> Result<(Pubkey, &[u8]), ProgramError> {
        if input.len() < PUBKEY_LEN {
            return Err(InvalidInstruction.into());
        }
        let (key, rest) = input.split_at(PUBKEY_LEN);
        let key = Pubkey::new_from_array(*array_ref![key, 0, PUBKEY_LEN]);
        Ok((key, rest))
    }

    fn unpack_flight_key(input: &[u8]) -> Result<(FlightKey, &[u8]), ProgramError> {
        if input.len() < FLIGHT_KEY_LEN {
            return Err(InvalidInstruction.into());
        }
        let (key, rest) = input.split_at(FLIGHT_KEY_LEN);
        Ok((*array_ref![key, 0, FLIGHT_KEY_LEN], rest))
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        if input.len() < 8 {
            return Err(InvalidInstruction.into());
        }
        let (value, rest) = input.split_at(8);
        let value = value
            .try_into()
            .ok()
            .map(u64::from_le_bytes)
            .ok_or(InvalidInstruction)?;
        Ok((value, rest))
    }

    fn unpack_i64(input: &[u8]) -> Result<(i64, &[u8]), ProgramError> {
        if input.len() < 8 {
            return Err(InvalidInstruction.into());
        }
        let (value, rest) = input.split_at(8);
        let value = value
            .try_into()
            .ok()
            .map(i64::from_le_bytes)
            .ok_or(InvalidInstruction)?;
        Ok((value, rest))
    }

    // Strings are a one byte length followed by UTF-8 bytes
    fn unpack_string(input: &[u8]) -> Result<(String, &[u8]), ProgramError> {
        let (&len, rest) = input.split_first().ok_or(InvalidInstruction)?;
        let len = len as usize;
        if rest.len() < len {
            return Err(InvalidInstruction.into());
        }
        let (value, rest) = rest.split_at(len);
        let value = String::from_utf8(value.to_vec()).map_err(|_| InvalidInstruction)?;
        Ok((value, rest))
    }

    fn pack_string(buf: &mut Vec<u8>, value: &str) -> Result<(), ProgramError> {
        let len = u8::try_from(value.len()).map_err(|_| InvalidInstruction)?;
        buf.push(len);
        buf.extend_from_slice(value.as_bytes());
        Ok(())
    }
}

/// Creates an `InitializeLedger` instruction
pub fn initialize_ledger(
    program_id: &Pubkey,
    authority: &Pubkey,
    ledger_account: &Pubkey,
    oracle: &Pubkey,
) -> Result<Instruction, ProgramError> {
    check_program_account(program_id)?;

    let data = FlightSuretyInstruction::InitializeLedger { oracle: *oracle }.pack()?;

    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new(*ledger_account, false),
        AccountMeta::new(
            find_airline_address(program_id, ledger_account, authority),
            false,
        ),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Creates a `RegisterAirline` instruction
pub fn register_airline(
    program_id: &Pubkey,
    sponsor: &Pubkey,
    ledger_account: &Pubkey,
    candidate: &Pubkey,
) -> Result<Instruction, ProgramError> {
    check_program_account(program_id)?;

    let data = FlightSuretyInstruction::RegisterAirline {
        candidate: *candidate,
    }
    .pack()?;

    Ok(vote_instruction(
        program_id,
        sponsor,
        ledger_account,
        candidate,
        data,
    ))
}

/// Creates a `CastVote` instruction
pub fn cast_vote(
    program_id: &Pubkey,
    voter: &Pubkey,
    ledger_account: &Pubkey,
    candidate: &Pubkey,
) -> Result<Instruction, ProgramError> {
    check_program_account(program_id)?;

    let data = FlightSuretyInstruction::CastVote {
        candidate: *candidate,
    }
    .pack()?;

    Ok(vote_instruction(
        program_id,
        voter,
        ledger_account,
        candidate,
        data,
    ))
}

/// Creates a `FundAirline` instruction
pub fn fund_airline(
    program_id: &Pubkey,
    airline: &Pubkey,
    ledger_account: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    check_program_account(program_id)?;

    let data = FlightSuretyInstruction::FundAirline { amount }.pack()?;

    let accounts = vec![
        AccountMeta::new(*airline, true),
        AccountMeta::new(*ledger_account, false),
        AccountMeta::new(
            find_airline_address(program_id, ledger_account, airline),
            false,
        ),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Creates a `RegisterFlight` instruction
pub fn register_flight(
    program_id: &Pubkey,
    airline: &Pubkey,
    ledger_account: &Pubkey,
    code: &str,
    departure: i64,
) -> Result<Instruction, ProgramError> {
    check_program_account(program_id)?;
    check_flight_code(code)?;

    let data = FlightSuretyInstruction::RegisterFlight {
        code: code.to_owned(),
        departure,
    }
    .pack()?;

    let key = flight_key(airline, code, departure);
    let accounts = vec![
        AccountMeta::new(*airline, true),
        AccountMeta::new(*ledger_account, false),
        AccountMeta::new_readonly(
            find_airline_address(program_id, ledger_account, airline),
            false,
        ),
        AccountMeta::new(find_flight_address(program_id, ledger_account, &key), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Creates a `ResolveFlightStatus` instruction
pub fn resolve_flight_status(
    program_id: &Pubkey,
    oracle: &Pubkey,
    ledger_account: &Pubkey,
    airline: &Pubkey,
    code: &str,
    departure: i64,
    status: FlightStatus,
) -> Result<Instruction, ProgramError> {
    check_program_account(program_id)?;
    check_flight_code(code)?;

    let data = FlightSuretyInstruction::ResolveFlightStatus {
        airline: *airline,
        code: code.to_owned(),
        departure,
        status,
    }
    .pack()?;

    let key = flight_key(airline, code, departure);
    let accounts = vec![
        AccountMeta::new_readonly(*oracle, true),
        AccountMeta::new_readonly(*ledger_account, false),
        AccountMeta::new(find_flight_address(program_id, ledger_account, &key), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Creates a `BuyInsurance` instruction
pub fn buy_insurance(
    program_id: &Pubkey,
    passenger: &Pubkey,
    ledger_account: &Pubkey,
    airline: &Pubkey,
    code: &str,
    departure: i64,
    premium: u64,
) -> Result<Instruction, ProgramError> {
    check_program_account(program_id)?;
    check_flight_code(code)?;

    let data = FlightSuretyInstruction::BuyInsurance {
        airline: *airline,
        code: code.to_owned(),
        departure,
        premium,
    }
    .pack()?;

    let key = flight_key(airline, code, departure);
    let accounts = vec![
        AccountMeta::new(*passenger, true),
        AccountMeta::new(*ledger_account, false),
        AccountMeta::new_readonly(find_flight_address(program_id, ledger_account, &key), false),
        AccountMeta::new(
            find_policy_address(program_id, ledger_account, passenger, &key),
            false,
        ),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Creates a `RefreshCredit` instruction
///
/// The airline only locates the flight and policy records, it is not part
/// of the instruction data.
pub fn refresh_credit(
    program_id: &Pubkey,
    ledger_account: &Pubkey,
    passenger: &Pubkey,
    airline: &Pubkey,
    code: &str,
    departure: i64,
) -> Result<Instruction, ProgramError> {
    check_program_account(program_id)?;
    check_flight_code(code)?;

    let data = FlightSuretyInstruction::RefreshCredit {
        passenger: *passenger,
        code: code.to_owned(),
        departure,
    }
    .pack()?;

    let key = flight_key(airline, code, departure);
    let accounts = vec![
        AccountMeta::new_readonly(*ledger_account, false),
        AccountMeta::new_readonly(find_flight_address(program_id, ledger_account, &key), false),
        AccountMeta::new(
            find_policy_address(program_id, ledger_account, passenger, &key),
            false,
        ),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Creates a `Withdraw` instruction
pub fn withdraw(
    program_id: &Pubkey,
    passenger: &Pubkey,
    ledger_account: &Pubkey,
    flight_key: &FlightKey,
    code: &str,
    departure: i64,
) -> Result<Instruction, ProgramError> {
    check_program_account(program_id)?;
    check_flight_code(code)?;

    let data = FlightSuretyInstruction::Withdraw {
        flight_key: *flight_key,
        code: code.to_owned(),
        departure,
    }
    .pack()?;

    let accounts = vec![
        AccountMeta::new(*passenger, true),
        AccountMeta::new(*ledger_account, false),
        AccountMeta::new(
            find_policy_address(program_id, ledger_account, passenger, flight_key),
            false,
        ),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

// Shape shared by registration and votes: the signer's ballot for the candidate
fn vote_instruction(
    program_id: &Pubkey,
    voter: &Pubkey,
    ledger_account: &Pubkey,
    candidate: &Pubkey,
    data: Vec<u8>,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*voter, true),
            AccountMeta::new(*ledger_account, false),
            AccountMeta::new_readonly(
                find_airline_address(program_id, ledger_account, voter),
                false,
            ),
            AccountMeta::new(
                find_airline_address(program_id, ledger_account, candidate),
                false,
            ),
            AccountMeta::new(
                find_ballot_address(program_id, ledger_account, candidate, voter),
                false,
            ),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::FlightSuretyError;

    #[test]
    fn test_instruction_packing() {
        let instructions = vec![
            FlightSuretyInstruction::InitializeLedger {
                oracle: Pubkey::new_unique(),
            },
            FlightSuretyInstruction::RegisterAirline {
                candidate: Pubkey::new_unique(),
            },
            FlightSuretyInstruction::CastVote {
                candidate: Pubkey::new_unique(),
            },
            FlightSuretyInstruction::FundAirline {
                amount: 10_000_000_000,
            },
            FlightSuretyInstruction::RegisterFlight {
                code: "ABC109".to_owned(),
                departure: 1_566_917_100_000,
            },
            FlightSuretyInstruction::ResolveFlightStatus {
                airline: Pubkey::new_unique(),
                code: "ABC109".to_owned(),
                departure: -1,
                status: FlightStatus::LateAirline,
            },
            FlightSuretyInstruction::BuyInsurance {
                airline: Pubkey::new_unique(),
                code: "ABC109".to_owned(),
                departure: 1_566_917_100_000,
                premium: 1_000_000_000,
            },
            FlightSuretyInstruction::RefreshCredit {
                passenger: Pubkey::new_unique(),
                code: "ABC109".to_owned(),
                departure: 1_566_917_100_000,
            },
            FlightSuretyInstruction::Withdraw {
                flight_key: [7; 32],
                code: "ABC109".to_owned(),
                departure: 1_566_917_100_000,
            },
        ];

        for (tag, instruction) in instructions.into_iter().enumerate() {
            let packed = instruction.pack().unwrap();
            assert_eq!(packed[0] as usize, tag);
            assert_eq!(FlightSuretyInstruction::unpack(&packed).unwrap(), instruction);
        }
    }

    #[test]
    fn test_register_flight_layout() {
        let packed = FlightSuretyInstruction::RegisterFlight {
            code: "AB1".to_owned(),
            departure: 2,
        }
        .pack()
        .unwrap();
        assert_eq!(packed, vec![4, 3, b'A', b'B', b'1', 2, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_unpack_rejects_malformed_input() {
        let invalid: ProgramError = FlightSuretyError::InvalidInstruction.into();

        assert_eq!(Err(invalid.clone()), FlightSuretyInstruction::unpack(&[]));
        assert_eq!(Err(invalid.clone()), FlightSuretyInstruction::unpack(&[9]));
        // Truncated public key
        assert_eq!(Err(invalid.clone()), FlightSuretyInstruction::unpack(&[1, 0, 0]));
        // Truncated amount
        assert_eq!(Err(invalid.clone()), FlightSuretyInstruction::unpack(&[3, 1, 2]));
        // String length past the end of the buffer
        assert_eq!(Err(invalid.clone()), FlightSuretyInstruction::unpack(&[4, 5, b'A']));
        // Invalid UTF-8 code
        assert_eq!(
            Err(invalid.clone()),
            FlightSuretyInstruction::unpack(&[4, 1, 0xff, 0, 0, 0, 0, 0, 0, 0, 0])
        );

        // Unknown status code
        let mut packed = FlightSuretyInstruction::ResolveFlightStatus {
            airline: Pubkey::new_unique(),
            code: "ABC109".to_owned(),
            departure: 0,
            status: FlightStatus::OnTime,
        }
        .pack()
        .unwrap();
        *packed.last_mut().unwrap() = 11;
        assert_eq!(Err(invalid), FlightSuretyInstruction::unpack(&packed));
    }

    #[test]
    fn test_pack_rejects_oversized_code() {
        let invalid: ProgramError = FlightSuretyError::InvalidInstruction.into();

        // A length that does not fit the one byte prefix must not wrap
        let instruction = FlightSuretyInstruction::RegisterFlight {
            code: "X".repeat(300),
            departure: 0,
        };
        assert_eq!(Err(invalid.clone()), instruction.pack());

        let instruction = FlightSuretyInstruction::Withdraw {
            flight_key: [1; 32],
            code: "X".repeat(256),
            departure: 0,
        };
        assert_eq!(Err(invalid), instruction.pack());

        let longest = FlightSuretyInstruction::RefreshCredit {
            passenger: Pubkey::new_unique(),
            code: "X".repeat(255),
            departure: 0,
        };
        let packed = longest.pack().unwrap();
        assert_eq!(FlightSuretyInstruction::unpack(&packed).unwrap(), longest);
    }

    #[test]
    fn test_withdraw_flight_key_layout() {
        let flight_key: FlightKey = {
            let mut key = [0u8; 32];
            for (i, byte) in key.iter_mut().enumerate() {
                *byte = i as u8;
            }
            key
        };
        let packed = FlightSuretyInstruction::Withdraw {
            flight_key,
            code: "AB1".to_owned(),
            departure: 2,
        }
        .pack()
        .unwrap();
        assert_eq!(packed[0], 8);
        assert_eq!(&packed[1..33], &flight_key[..]);

        match FlightSuretyInstruction::unpack(&packed).unwrap() {
            FlightSuretyInstruction::Withdraw {
                flight_key: unpacked,
                ..
            } => assert_eq!(unpacked, flight_key),
            other => panic!("unexpected instruction {:?}", other),
        }

        // BadCase: truncated flight key
        assert_eq!(
            Err(FlightSuretyError::InvalidInstruction.into()),
            FlightSuretyInstruction::unpack(&packed[..20])
        );
    }

    #[test]
    fn test_builders_address_records() {
        let program_id = crate::id();
        let ledger = Pubkey::new_unique();
        let airline = Pubkey::new_unique();
        let passenger = Pubkey::new_unique();
        let key = flight_key(&airline, "ABC109", 7);

        let instruction = register_airline(&program_id, &airline, &ledger, &passenger).unwrap();
        assert_eq!(
            instruction.accounts[2].pubkey,
            find_airline_address(&program_id, &ledger, &airline)
        );
        assert!(!instruction.accounts[2].is_writable);
        assert_eq!(
            instruction.accounts[3].pubkey,
            find_airline_address(&program_id, &ledger, &passenger)
        );
        assert_eq!(
            instruction.accounts[4].pubkey,
            find_ballot_address(&program_id, &ledger, &passenger, &airline)
        );

        let instruction =
            register_flight(&program_id, &airline, &ledger, "ABC109", 7).unwrap();
        assert_eq!(
            instruction.accounts[3].pubkey,
            find_flight_address(&program_id, &ledger, &key)
        );

        let bought = buy_insurance(&program_id, &passenger, &ledger, &airline, "ABC109", 7, 1)
            .unwrap();
        let refreshed =
            refresh_credit(&program_id, &ledger, &passenger, &airline, "ABC109", 7).unwrap();
        let withdrawn = withdraw(&program_id, &passenger, &ledger, &key, "ABC109", 7).unwrap();
        let policy = find_policy_address(&program_id, &ledger, &passenger, &key);
        assert_eq!(bought.accounts[3].pubkey, policy);
        assert_eq!(refreshed.accounts[2].pubkey, policy);
        assert_eq!(withdrawn.accounts[2].pubkey, policy);
    }

    #[test]
    fn test_builders_reject_bad_input() {
        let program_id = crate::id();
        let key = Pubkey::new_unique();

        assert_eq!(
            Err(ProgramError::IncorrectProgramId),
            register_airline(&Pubkey::new_unique(), &key, &key, &key)
        );
        assert_eq!(
            Err(FlightSuretyError::InvalidFlightCode.into()),
            register_flight(&program_id, &key, &key, &"X".repeat(300), 0)
        );
    }
}
