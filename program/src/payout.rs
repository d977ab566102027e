//! Withdrawal of credited payouts
use crate::{error::FlightSuretyError, state::InsurancePolicy};
use solana_program::{
    account_info::AccountInfo, entrypoint::ProgramResult, msg, program_error::ProgramError,
    pubkey::Pubkey, rent::Rent,
};

impl InsurancePolicy {
    /// Closes out the policy and returns the amount owed to the passenger.
    ///
    /// The policy is marked paid and its credit zeroed here, so the record
    /// must be stored before the lamports are released with [`release`].
    pub fn settle_withdrawal(&mut self) -> Result<u64, FlightSuretyError> {
        let passenger = Pubkey::new_from_array(self.passenger);
        if self.paid {
            msg!("Policy of {} on {} already paid", passenger, self.code);
            return Err(FlightSuretyError::AlreadyPaid);
        }
        if self.credited_amount == 0 {
            return Err(FlightSuretyError::NothingDue);
        }

        let amount = self.credited_amount;
        self.paid = true;
        self.credited_amount = 0;

        msg!("Passenger {} withdraws {} on {}", passenger, amount, self.code);
        Ok(amount)
    }
}

/// Moves `amount` lamports out of the program-owned vault.
///
/// The vault has to stay rent exempt after the transfer.
pub fn release(
    vault: &AccountInfo,
    recipient: &AccountInfo,
    amount: u64,
    rent: &Rent,
) -> ProgramResult {
    let remaining = vault
        .lamports()
        .checked_sub(amount)
        .ok_or(ProgramError::InsufficientFunds)?;
    if !rent.is_exempt(remaining, vault.data_len()) {
        msg!("Vault cannot cover a payout of {}", amount);
        return Err(ProgramError::InsufficientFunds);
    }
    let credited = recipient
        .lamports()
        .checked_add(amount)
        .ok_or(FlightSuretyError::AmountOverflow)?;

    **vault.try_borrow_mut_lamports()? = remaining;
    **recipient.try_borrow_mut_lamports()? = credited;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::{FlightStatus, Ledger, MIN_FUNDING};
    use solana_program::native_token::LAMPORTS_PER_SOL;

    const DEPARTURE: i64 = 1_566_917_100_000;

    #[test]
    fn test_settle_withdrawal() {
        let oracle = Pubkey::new_unique();
        let passenger = Pubkey::new_unique();
        let mut ledger = Ledger::default();
        let mut airline = ledger.initialize(&Pubkey::new_unique(), &oracle).unwrap();
        airline.fund(MIN_FUNDING).unwrap();
        let flight = ledger
            .register_flight(&airline, None, "ABC109", DEPARTURE)
            .unwrap();
        let mut policy = ledger
            .buy_insurance(&passenger, Some(&flight), None, LAMPORTS_PER_SOL)
            .unwrap();
        let flight = ledger
            .resolve_status(&oracle, Some(flight), FlightStatus::LateAirline)
            .unwrap();
        policy.refresh_credit(&flight).unwrap();

        assert_eq!(policy.settle_withdrawal(), Ok(1_500_000_000));
        assert!(policy.paid);
        assert_eq!(policy.credited_amount, 0);

        // BadCase: second withdrawal
        assert_eq!(
            Err(FlightSuretyError::AlreadyPaid),
            policy.settle_withdrawal()
        );

        // A paid policy is never credited again
        policy.credit_applied = false;
        assert_eq!(policy.refresh_credit(&flight), Ok(0));
    }

    #[test]
    fn test_nothing_due() {
        let mut policy = InsurancePolicy {
            is_initialized: true,
            passenger: Pubkey::new_unique().to_bytes(),
            code: "ABC109".to_owned(),
            departure: DEPARTURE,
            premium: 1,
            credited_amount: 0,
            insured: true,
            ..InsurancePolicy::default()
        };

        assert_eq!(
            Err(FlightSuretyError::NothingDue),
            policy.settle_withdrawal()
        );
        assert!(!policy.paid);
    }

    #[test]
    fn test_release() {
        let rent = Rent::default();
        let program_id = Pubkey::new_unique();
        let vault_key = Pubkey::new_unique();
        let recipient_key = Pubkey::new_unique();
        let system_owner = Pubkey::default();
        let minimum = rent.minimum_balance(8);

        let mut vault_lamports = minimum + 10;
        let mut vault_data = vec![0u8; 8];
        let vault = AccountInfo::new(
            &vault_key,
            false,
            true,
            &mut vault_lamports,
            &mut vault_data,
            &program_id,
            false,
            0,
        );
        let mut recipient_lamports = 5;
        let mut recipient_data = vec![];
        let recipient = AccountInfo::new(
            &recipient_key,
            true,
            true,
            &mut recipient_lamports,
            &mut recipient_data,
            &system_owner,
            false,
            0,
        );

        // BadCase: would drop the vault below rent exemption
        assert_eq!(
            Err(ProgramError::InsufficientFunds),
            release(&vault, &recipient, 11, &rent)
        );

        release(&vault, &recipient, 10, &rent).unwrap();
        assert_eq!(vault.lamports(), minimum);
        assert_eq!(recipient.lamports(), 15);
    }
}
