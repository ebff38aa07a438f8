use std::{collections::BTreeMap, fmt::Display};

use thiserror::Error;

use crate::account::{Account, AccountNumber, Plan, Status, MAX_BALANCE};
use crate::codec::encode_account_line;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("account {0:010} not found")]
    NotFound(AccountNumber),
    #[error("account {0:010} already exists")]
    DuplicateAccount(AccountNumber),
    /// An approved mutation the ledger refused. Always a bug, never user error.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/**
 * Ordered by account number so that iteration, and the debug dump
 * written at logout, are deterministic.
 */
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Ledger {
    accounts: BTreeMap<AccountNumber, Account>,
}

impl Display for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for account in self.accounts.values() {
            writeln!(f, "{}", encode_account_line(account))?;
        }
        Ok(())
    }
}

impl Ledger {
    pub fn from_accounts(accounts: Vec<Account>) -> Result<Self, LedgerError> {
        let mut ledger = Ledger::default();
        for account in accounts {
            ledger.insert(account)?;
        }
        Ok(ledger)
    }

    pub fn get(&self, number: AccountNumber) -> Result<&Account, LedgerError> {
        self.accounts
            .get(&number)
            .ok_or(LedgerError::NotFound(number))
    }

    fn get_mut(&mut self, number: AccountNumber) -> Result<&mut Account, LedgerError> {
        self.accounts
            .get_mut(&number)
            .ok_or(LedgerError::NotFound(number))
    }

    pub fn contains(&self, number: AccountNumber) -> bool {
        self.accounts.contains_key(&number)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn insert(&mut self, account: Account) -> Result<(), LedgerError> {
        if self.accounts.contains_key(&account.number) {
            return Err(LedgerError::DuplicateAccount(account.number));
        }
        self.accounts.insert(account.number, account);
        Ok(())
    }

    pub fn remove(&mut self, number: AccountNumber) -> Result<Account, LedgerError> {
        self.accounts
            .remove(&number)
            .ok_or(LedgerError::NotFound(number))
    }

    /// Applies a signed delta and returns the new balance. Nothing changes on error.
    pub fn mutate_balance(
        &mut self,
        number: AccountNumber,
        delta: i64,
    ) -> Result<i64, LedgerError> {
        let account = self.get_mut(number)?;
        if delta != 0 && !account.is_active() {
            return Err(LedgerError::InvariantViolation(format!(
                "balance of disabled account {:010} is frozen",
                number
            )));
        }
        let balance = account
            .balance
            .checked_add(delta)
            .filter(|balance| (0..=MAX_BALANCE).contains(balance))
            .ok_or_else(|| {
                LedgerError::InvariantViolation(format!(
                    "balance of account {:010} would leave 0..={} after applying {}",
                    number, MAX_BALANCE, delta
                ))
            })?;
        account.balance = balance;
        Ok(balance)
    }

    pub fn set_status(&mut self, number: AccountNumber, status: Status) -> Result<(), LedgerError> {
        self.get_mut(number)?.status = status;
        Ok(())
    }

    pub fn set_plan(&mut self, number: AccountNumber, plan: Plan) -> Result<(), LedgerError> {
        self.get_mut(number)?.plan = plan;
        Ok(())
    }
}
