//! Flight ledger: registration and status resolution
use crate::{
    error::FlightSuretyError,
    state::{Airline, Flight, FlightStatus, Ledger, MAX_FLIGHT_CODE_LEN},
};
use solana_program::{msg, pubkey::Pubkey};

/// Checks that a flight code fits into a flight record.
pub fn check_flight_code(code: &str) -> Result<(), FlightSuretyError> {
    if code.is_empty() || code.len() > MAX_FLIGHT_CODE_LEN {
        msg!("Invalid flight code {:?}", code);
        return Err(FlightSuretyError::InvalidFlightCode);
    }
    Ok(())
}

impl Ledger {
    /// Registers a flight operated by a funded airline.
    ///
    /// `existing` is the record already stored under the flight's key, if any.
    pub fn register_flight(
        &mut self,
        airline: &Airline,
        existing: Option<&Flight>,
        code: &str,
        departure: i64,
    ) -> Result<Flight, FlightSuretyError> {
        airline.require_funded()?;
        check_flight_code(code)?;

        if existing.is_some() {
            msg!("Flight {} at {} already registered", code, departure);
            return Err(FlightSuretyError::Conflict);
        }
        self.number_of_flights = self
            .number_of_flights
            .checked_add(1)
            .ok_or(FlightSuretyError::AmountOverflow)?;

        msg!("Flight {} at {} registered by {}", code, departure, airline.id());
        Ok(Flight {
            is_initialized: true,
            airline: airline.id,
            code: code.to_owned(),
            departure,
            status: FlightStatus::Unknown,
        })
    }

    /// Records the outcome reported by the oracle and returns the updated flight.
    ///
    /// The status is written once. Payouts are not computed here, passengers
    /// pick up their credit through [`InsurancePolicy::refresh_credit`].
    ///
    /// [`InsurancePolicy::refresh_credit`]: crate::state::InsurancePolicy::refresh_credit
    pub fn resolve_status(
        &self,
        oracle: &Pubkey,
        flight: Option<Flight>,
        status: FlightStatus,
    ) -> Result<Flight, FlightSuretyError> {
        if oracle.to_bytes() != self.oracle {
            msg!("{} is not the oracle authority", oracle);
            return Err(FlightSuretyError::Unauthorized);
        }
        if status == FlightStatus::Unknown {
            return Err(FlightSuretyError::InvalidStatus);
        }

        let mut flight = flight.ok_or(FlightSuretyError::NotFound)?;
        if flight.status != FlightStatus::Unknown {
            msg!("Flight {} at {} already resolved", flight.code, flight.departure);
            return Err(FlightSuretyError::Conflict);
        }
        flight.status = status;

        msg!(
            "Flight {} at {} resolved to {}",
            flight.code,
            flight.departure,
            status.code()
        );
        Ok(flight)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::{flight_key, MIN_FUNDING};

    const DEPARTURE: i64 = 1_566_917_100_000;

    fn setup() -> (Ledger, Airline, Pubkey) {
        let airline = Pubkey::new_unique();
        let oracle = Pubkey::new_unique();
        let mut ledger = Ledger::default();
        let mut record = ledger.initialize(&airline, &oracle).unwrap();
        record.fund(MIN_FUNDING).unwrap();
        (ledger, record, oracle)
    }

    #[test]
    fn test_register_flight() {
        let (mut ledger, airline, _) = setup();

        let flight = ledger
            .register_flight(&airline, None, "ABC109", DEPARTURE)
            .unwrap();
        assert_eq!(ledger.number_of_flights, 1);
        assert!(flight.is_initialized);
        assert_eq!(flight.code, "ABC109");
        assert_eq!(flight.departure, DEPARTURE);
        assert_eq!(flight.airline(), airline.id());
        assert_eq!(flight.status, FlightStatus::Unknown);
        assert_eq!(flight.key(), flight_key(&airline.id(), "ABC109", DEPARTURE));

        // BadCase: a record already exists under the key
        assert_eq!(
            Err(FlightSuretyError::Conflict),
            ledger.register_flight(&airline, Some(&flight), "ABC109", DEPARTURE)
        );
        assert_eq!(ledger.number_of_flights, 1);
    }

    #[test]
    fn test_register_flight_rejections() {
        let (mut ledger, airline, _) = setup();

        // BadCase: registered airline without funding
        let unfunded = Airline {
            registered: true,
            ..Airline::new(&Pubkey::new_unique())
        };
        assert_eq!(
            Err(FlightSuretyError::Unauthorized),
            ledger.register_flight(&unfunded, None, "ABC109", DEPARTURE)
        );

        // BadCase: codes that do not fit
        assert_eq!(
            Err(FlightSuretyError::InvalidFlightCode),
            ledger.register_flight(&airline, None, "", DEPARTURE)
        );
        let long_code = "X".repeat(MAX_FLIGHT_CODE_LEN + 1);
        assert_eq!(
            Err(FlightSuretyError::InvalidFlightCode),
            ledger.register_flight(&airline, None, &long_code, DEPARTURE)
        );
        assert_eq!(ledger.number_of_flights, 0);
    }

    #[test]
    fn test_resolve_status() {
        let (mut ledger, airline, oracle) = setup();
        let flight = ledger
            .register_flight(&airline, None, "ABC109", DEPARTURE)
            .unwrap();

        // BadCase: caller is not the oracle
        assert_eq!(
            Err(FlightSuretyError::Unauthorized),
            ledger.resolve_status(&airline.id(), Some(flight.clone()), FlightStatus::LateAirline)
        );
        // BadCase: unknown flight
        assert_eq!(
            Err(FlightSuretyError::NotFound),
            ledger.resolve_status(&oracle, None, FlightStatus::LateAirline)
        );
        // BadCase: not a resolution
        assert_eq!(
            Err(FlightSuretyError::InvalidStatus),
            ledger.resolve_status(&oracle, Some(flight.clone()), FlightStatus::Unknown)
        );

        let resolved = ledger
            .resolve_status(&oracle, Some(flight), FlightStatus::LateAirline)
            .unwrap();
        assert_eq!(resolved.status, FlightStatus::LateAirline);

        // BadCase: second resolution
        assert_eq!(
            Err(FlightSuretyError::Conflict),
            ledger.resolve_status(&oracle, Some(resolved), FlightStatus::OnTime)
        );
    }
}
