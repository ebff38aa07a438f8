//! Login/logout state machine driving the validator and the ledger.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::account::{is_valid_holder_name, Account, AccountNumber, Status};
use crate::codec::{self, FileError};
use crate::config::SessionConfig;
use crate::ledger::{Ledger, LedgerError};
use crate::transactions::{Misc, Transaction, TransactionType};
use crate::validator::{
    validate, Approved, Caller, Command, LoginMode, Rejection, SessionTotals,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("not logged in")]
    NotLoggedIn,
    #[error("rejected: {0}")]
    Rejected(#[from] Rejection),
    /// The ledger refused a mutation the validator approved.
    #[error("internal error: {0}")]
    Defect(#[from] LedgerError),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("already logged in")]
    AlreadyLoggedIn,
    #[error("not logged in")]
    NotLoggedIn,
    #[error("invalid holder name {0:?} for a standard login")]
    InvalidHolder(String),
    #[error(transparent)]
    File(#[from] FileError),
    #[error("account snapshot is inconsistent: {0}")]
    Ledger(#[from] LedgerError),
}

#[derive(Debug)]
struct ActiveSession {
    mode: LoginMode,
    ledger: Ledger,
    log: Vec<Transaction>,
    spent: SessionTotals,
}

#[derive(Debug)]
enum State {
    LoggedOut,
    LoggedIn(ActiveSession),
}

/**
 * Owns the ledger and the transaction log for exactly one
 * login/logout cycle. Both are built at login and dropped at logout.
 */
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    state: State,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: State::LoggedOut,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.state, State::LoggedIn(_))
    }

    pub fn ledger(&self) -> Option<&Ledger> {
        match &self.state {
            State::LoggedIn(active) => Some(&active.ledger),
            State::LoggedOut => None,
        }
    }

    /// Accepted transactions so far, in acceptance order.
    pub fn transactions(&self) -> &[Transaction] {
        match &self.state {
            State::LoggedIn(active) => &active.log,
            State::LoggedOut => &[],
        }
    }

    pub fn login(&mut self, accounts_path: &Path, mode: LoginMode) -> Result<(), SessionError> {
        if self.is_logged_in() {
            return Err(SessionError::AlreadyLoggedIn);
        }
        if let LoginMode::Standard { holder } = &mode {
            if !is_valid_holder_name(holder) {
                return Err(SessionError::InvalidHolder(holder.clone()));
            }
        }

        let ledger = Ledger::from_accounts(codec::load(accounts_path)?)?;
        info!(
            path = %accounts_path.display(),
            accounts = ledger.len(),
            ?mode,
            "session opened"
        );

        self.state = State::LoggedIn(ActiveSession {
            mode,
            ledger,
            log: Vec::new(),
            spent: SessionTotals::default(),
        });
        Ok(())
    }

    pub fn execute(&mut self, command: &Command) -> Result<Transaction, CommandError> {
        let active = match &mut self.state {
            State::LoggedIn(active) => active,
            State::LoggedOut => return Err(CommandError::NotLoggedIn),
        };

        let caller = Caller {
            mode: &active.mode,
            spent: active.spent,
            limits: &self.config.limits,
            max_balance: self.config.max_balance,
        };
        let approved = validate(&active.ledger, &caller, command).map_err(|rejection| {
            warn!(kind = %command.kind(), %rejection, "command rejected");
            rejection
        })?;

        let sequence = active.log.len() as u64;
        let transaction = apply(&mut active.ledger, &approved, sequence).map_err(|defect| {
            warn!(kind = %command.kind(), %defect, "approved command failed to apply");
            defect
        })?;

        match approved {
            Approved::Withdrawal { amount, .. } => active.spent.withdrawal += amount,
            Approved::Transfer { amount, .. } => active.spent.transfer += amount,
            Approved::Paybill { amount, .. } => active.spent.paybill += amount,
            _ => {}
        }

        debug!(?transaction, "transaction accepted");
        active.log.push(transaction.clone());
        Ok(transaction)
    }

    /// Writes the transaction file for `close_date` and ends the session.
    ///
    /// If the file cannot be written the session stays open with its log intact.
    pub fn logout(&mut self, close_date: NaiveDate) -> Result<PathBuf, SessionError> {
        let active = match &self.state {
            State::LoggedIn(active) => active,
            State::LoggedOut => return Err(SessionError::NotLoggedIn),
        };

        debug!("ledger at close:\n{}", active.ledger);
        let path = codec::write(&self.config.output_dir, close_date, &active.log)?;
        info!(
            path = %path.display(),
            transactions = active.log.len(),
            "session closed"
        );

        self.state = State::LoggedOut;
        Ok(path)
    }

    pub fn logout_today(&mut self) -> Result<PathBuf, SessionError> {
        self.logout(Local::now().date_naive())
    }
}

fn record(
    sequence: u64,
    r#type: TransactionType,
    source: &Account,
    target: Option<AccountNumber>,
    amount: i64,
    misc: Misc,
) -> Transaction {
    Transaction {
        sequence,
        r#type,
        source: source.number,
        target,
        amount,
        misc,
        holder: source.holder.clone(),
    }
}

/// Performs the ledger side of an approved command. Leaves the ledger untouched on error.
fn apply(
    ledger: &mut Ledger,
    approved: &Approved,
    sequence: u64,
) -> Result<Transaction, LedgerError> {
    use TransactionType::*;

    let transaction = match approved {
        Approved::Withdrawal { account, amount } => {
            ledger.mutate_balance(*account, -amount)?;
            let source = ledger.get(*account)?;
            record(sequence, WITHDRAWAL, source, None, *amount, Misc::None)
        }
        Approved::Transfer { from, to, amount } => {
            ledger.mutate_balance(*from, -amount)?;
            if let Err(err) = ledger.mutate_balance(*to, *amount) {
                ledger.mutate_balance(*from, *amount)?;
                return Err(err);
            }
            let source = ledger.get(*from)?;
            record(sequence, TRANSFER, source, Some(*to), *amount, Misc::None)
        }
        Approved::Paybill {
            account,
            payee,
            amount,
        } => {
            ledger.mutate_balance(*account, -amount)?;
            let source = ledger.get(*account)?;
            record(sequence, PAYBILL, source, None, *amount, Misc::Payee(*payee))
        }
        Approved::Deposit { account, amount } => {
            ledger.mutate_balance(*account, *amount)?;
            let source = ledger.get(*account)?;
            record(sequence, DEPOSIT, source, None, *amount, Misc::None)
        }
        Approved::Create(account) => {
            ledger.insert(account.clone())?;
            let misc = Misc::Plan(account.plan);
            record(sequence, CREATE, account, None, account.balance, misc)
        }
        Approved::Delete { account } => {
            let removed = ledger.remove(*account)?;
            record(sequence, DELETE, &removed, None, removed.balance, Misc::None)
        }
        Approved::Disable { account } => {
            ledger.set_status(*account, Status::Disabled)?;
            let source = ledger.get(*account)?;
            record(sequence, DISABLE, source, None, 0, Misc::None)
        }
        Approved::ChangePlan {
            account,
            plan,
            unchanged,
        } => {
            if !unchanged {
                ledger.set_plan(*account, *plan)?;
            }
            let source = ledger.get(*account)?;
            record(sequence, CHANGEPLAN, source, None, 0, Misc::Plan(*plan))
        }
    };
    Ok(transaction)
}
