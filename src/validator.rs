//! Business rules, one pure function per command kind.
//!
//! Rules only read the ledger. They answer with either the normalized
//! mutation the session should apply, or the reason the command is refused.

use thiserror::Error;

use crate::account::{
    is_valid_holder_name, Account, AccountNumber, Plan, Status, MAX_ACCOUNT_NUMBER,
};
use crate::config::Limits;
use crate::fixedpoint::fixed_point_to_string;
use crate::ledger::Ledger;
use crate::transactions::{Payee, TransactionType};

/// A command as issued, before any validation. Amounts are in cents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Withdrawal {
        account: AccountNumber,
        amount: i64,
    },
    Transfer {
        from: AccountNumber,
        to: AccountNumber,
        amount: i64,
    },
    Paybill {
        account: AccountNumber,
        payee: String,
        amount: i64,
    },
    Deposit {
        account: AccountNumber,
        amount: i64,
    },
    Create {
        account: AccountNumber,
        holder: String,
        plan: String,
        initial_balance: i64,
    },
    Delete {
        account: AccountNumber,
    },
    Disable {
        account: AccountNumber,
    },
    ChangePlan {
        account: AccountNumber,
        plan: String,
    },
}

impl Command {
    pub fn kind(&self) -> TransactionType {
        match self {
            Command::Withdrawal { .. } => TransactionType::WITHDRAWAL,
            Command::Transfer { .. } => TransactionType::TRANSFER,
            Command::Paybill { .. } => TransactionType::PAYBILL,
            Command::Deposit { .. } => TransactionType::DEPOSIT,
            Command::Create { .. } => TransactionType::CREATE,
            Command::Delete { .. } => TransactionType::DELETE,
            Command::Disable { .. } => TransactionType::DISABLE,
            Command::ChangePlan { .. } => TransactionType::CHANGEPLAN,
        }
    }
}

/// What an accepted command does to the ledger, with codes already parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Approved {
    Withdrawal {
        account: AccountNumber,
        amount: i64,
    },
    Transfer {
        from: AccountNumber,
        to: AccountNumber,
        amount: i64,
    },
    Paybill {
        account: AccountNumber,
        payee: Payee,
        amount: i64,
    },
    Deposit {
        account: AccountNumber,
        amount: i64,
    },
    Create(Account),
    Delete {
        account: AccountNumber,
    },
    Disable {
        account: AccountNumber,
    },
    /// `unchanged` marks a request for the plan the account already has.
    ChangePlan {
        account: AccountNumber,
        plan: Plan,
        unchanged: bool,
    },
}

fn money(cents: &i64) -> String {
    fixed_point_to_string(*cents)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("account {account:010} not found")]
    NotFound { account: AccountNumber },
    #[error("account {account:010} already exists")]
    DuplicateAccount { account: AccountNumber },
    #[error(
        "insufficient funds: balance is {}, requested {}",
        money(.balance),
        money(.requested)
    )]
    InsufficientFunds { balance: i64, requested: i64 },
    #[error("account {account:010} still holds {}", money(.balance))]
    NonZeroBalance { account: AccountNumber, balance: i64 },
    #[error("invalid plan code {code:?}")]
    InvalidPlanCode { code: String },
    #[error("account {account:010} is disabled")]
    AccountDisabled { account: AccountNumber },
    #[error("invalid amount {}", money(.amount))]
    InvalidAmount { amount: i64 },
    #[error("invalid payee code {code:?}, expected EC, CQ or FI")]
    InvalidPayee { code: String },
    #[error("invalid holder name {name:?}")]
    InvalidHolderName { name: String },
    #[error("account number {account} does not fit in 10 digits")]
    InvalidAccountNumber { account: AccountNumber },
    #[error("cannot transfer from account {account:010} to itself")]
    SameAccount { account: AccountNumber },
    #[error("{kind} is a privileged transaction, admin login required")]
    NotPermitted { kind: TransactionType },
    #[error("session {kind} limit of {} exceeded", money(.limit))]
    SessionLimitExceeded { kind: TransactionType, limit: i64 },
    #[error("account {account:010} would exceed the maximum balance")]
    BalanceLimitExceeded { account: AccountNumber },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginMode {
    Admin,
    Standard { holder: String },
}

/// Amounts already moved in this session, in cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionTotals {
    pub withdrawal: i64,
    pub transfer: i64,
    pub paybill: i64,
}

/// Read-only view of who is issuing the command.
#[derive(Debug, Clone, Copy)]
pub struct Caller<'a> {
    pub mode: &'a LoginMode,
    pub spent: SessionTotals,
    pub limits: &'a Limits,
    pub max_balance: i64,
}

impl Caller<'_> {
    fn require_admin(&self, kind: TransactionType) -> Result<(), Rejection> {
        match self.mode {
            LoginMode::Admin => Ok(()),
            LoginMode::Standard { .. } => Err(Rejection::NotPermitted { kind }),
        }
    }

    /// Standard logins only see their own accounts; anything else looks absent.
    fn lookup<'l>(
        &self,
        ledger: &'l Ledger,
        account: AccountNumber,
    ) -> Result<&'l Account, Rejection> {
        let found = ledger
            .get(account)
            .map_err(|_| Rejection::NotFound { account })?;
        match self.mode {
            LoginMode::Standard { holder } if found.holder != *holder => {
                Err(Rejection::NotFound { account })
            }
            _ => Ok(found),
        }
    }

    fn check_limit(&self, kind: TransactionType, amount: i64) -> Result<(), Rejection> {
        if matches!(self.mode, LoginMode::Admin) {
            return Ok(());
        }
        let (spent, limit) = match kind {
            TransactionType::WITHDRAWAL => (self.spent.withdrawal, self.limits.withdrawal),
            TransactionType::TRANSFER => (self.spent.transfer, self.limits.transfer),
            TransactionType::PAYBILL => (self.spent.paybill, self.limits.paybill),
            _ => return Ok(()),
        };
        if spent.saturating_add(amount) > limit {
            return Err(Rejection::SessionLimitExceeded { kind, limit });
        }
        Ok(())
    }

    fn check_room(&self, account: &Account, amount: i64) -> Result<(), Rejection> {
        match account.balance.checked_add(amount) {
            Some(balance) if balance <= self.max_balance => Ok(()),
            _ => Err(Rejection::BalanceLimitExceeded {
                account: account.number,
            }),
        }
    }
}

fn require_active(account: &Account) -> Result<(), Rejection> {
    if account.is_active() {
        Ok(())
    } else {
        Err(Rejection::AccountDisabled {
            account: account.number,
        })
    }
}

fn require_positive(amount: i64) -> Result<(), Rejection> {
    if amount > 0 {
        Ok(())
    } else {
        Err(Rejection::InvalidAmount { amount })
    }
}

fn require_funds(account: &Account, amount: i64) -> Result<(), Rejection> {
    if account.balance >= amount {
        Ok(())
    } else {
        Err(Rejection::InsufficientFunds {
            balance: account.balance,
            requested: amount,
        })
    }
}

fn parse_plan(code: &str) -> Result<Plan, Rejection> {
    Plan::parse(code).ok_or_else(|| Rejection::InvalidPlanCode {
        code: code.to_string(),
    })
}

pub fn validate(
    ledger: &Ledger,
    caller: &Caller,
    command: &Command,
) -> Result<Approved, Rejection> {
    match command {
        Command::Withdrawal { account, amount } => {
            validate_withdrawal(ledger, caller, *account, *amount)
        }
        Command::Transfer { from, to, amount } => {
            validate_transfer(ledger, caller, *from, *to, *amount)
        }
        Command::Paybill {
            account,
            payee,
            amount,
        } => validate_paybill(ledger, caller, *account, payee, *amount),
        Command::Deposit { account, amount } => validate_deposit(ledger, caller, *account, *amount),
        Command::Create {
            account,
            holder,
            plan,
            initial_balance,
        } => validate_create(ledger, caller, *account, holder, plan, *initial_balance),
        Command::Delete { account } => validate_delete(ledger, caller, *account),
        Command::Disable { account } => validate_disable(ledger, caller, *account),
        Command::ChangePlan { account, plan } => {
            validate_changeplan(ledger, caller, *account, plan)
        }
    }
}

pub fn validate_withdrawal(
    ledger: &Ledger,
    caller: &Caller,
    account: AccountNumber,
    amount: i64,
) -> Result<Approved, Rejection> {
    let source = caller.lookup(ledger, account)?;
    require_active(source)?;
    require_positive(amount)?;
    caller.check_limit(TransactionType::WITHDRAWAL, amount)?;
    require_funds(source, amount)?;
    Ok(Approved::Withdrawal { account, amount })
}

pub fn validate_transfer(
    ledger: &Ledger,
    caller: &Caller,
    from: AccountNumber,
    to: AccountNumber,
    amount: i64,
) -> Result<Approved, Rejection> {
    let source = caller.lookup(ledger, from)?;
    // Any existing account can receive a transfer, whoever holds it.
    let target = ledger
        .get(to)
        .map_err(|_| Rejection::NotFound { account: to })?;
    if from == to {
        return Err(Rejection::SameAccount { account: from });
    }
    require_active(source)?;
    require_active(target)?;
    require_positive(amount)?;
    caller.check_limit(TransactionType::TRANSFER, amount)?;
    require_funds(source, amount)?;
    caller.check_room(target, amount)?;
    Ok(Approved::Transfer { from, to, amount })
}

pub fn validate_paybill(
    ledger: &Ledger,
    caller: &Caller,
    account: AccountNumber,
    payee: &str,
    amount: i64,
) -> Result<Approved, Rejection> {
    let source = caller.lookup(ledger, account)?;
    require_active(source)?;
    let payee = Payee::parse(payee).ok_or_else(|| Rejection::InvalidPayee {
        code: payee.to_string(),
    })?;
    require_positive(amount)?;
    caller.check_limit(TransactionType::PAYBILL, amount)?;
    require_funds(source, amount)?;
    Ok(Approved::Paybill {
        account,
        payee,
        amount,
    })
}

pub fn validate_deposit(
    ledger: &Ledger,
    caller: &Caller,
    account: AccountNumber,
    amount: i64,
) -> Result<Approved, Rejection> {
    let target = caller.lookup(ledger, account)?;
    require_active(target)?;
    require_positive(amount)?;
    caller.check_room(target, amount)?;
    Ok(Approved::Deposit { account, amount })
}

pub fn validate_create(
    ledger: &Ledger,
    caller: &Caller,
    account: AccountNumber,
    holder: &str,
    plan: &str,
    initial_balance: i64,
) -> Result<Approved, Rejection> {
    caller.require_admin(TransactionType::CREATE)?;
    if account > MAX_ACCOUNT_NUMBER {
        return Err(Rejection::InvalidAccountNumber { account });
    }
    if ledger.contains(account) {
        return Err(Rejection::DuplicateAccount { account });
    }
    if !is_valid_holder_name(holder) {
        return Err(Rejection::InvalidHolderName {
            name: holder.to_string(),
        });
    }
    let plan = parse_plan(plan)?;
    if initial_balance < 0 {
        return Err(Rejection::InvalidAmount {
            amount: initial_balance,
        });
    }
    if initial_balance > caller.max_balance {
        return Err(Rejection::BalanceLimitExceeded { account });
    }
    Ok(Approved::Create(Account {
        number: account,
        holder: holder.to_string(),
        plan,
        status: Status::Active,
        balance: initial_balance,
    }))
}

pub fn validate_delete(
    ledger: &Ledger,
    caller: &Caller,
    account: AccountNumber,
) -> Result<Approved, Rejection> {
    caller.require_admin(TransactionType::DELETE)?;
    let existing = caller.lookup(ledger, account)?;
    if existing.balance != 0 {
        return Err(Rejection::NonZeroBalance {
            account,
            balance: existing.balance,
        });
    }
    Ok(Approved::Delete { account })
}

pub fn validate_disable(
    ledger: &Ledger,
    caller: &Caller,
    account: AccountNumber,
) -> Result<Approved, Rejection> {
    caller.require_admin(TransactionType::DISABLE)?;
    let existing = caller.lookup(ledger, account)?;
    require_active(existing)?;
    Ok(Approved::Disable { account })
}

pub fn validate_changeplan(
    ledger: &Ledger,
    caller: &Caller,
    account: AccountNumber,
    plan: &str,
) -> Result<Approved, Rejection> {
    caller.require_admin(TransactionType::CHANGEPLAN)?;
    let existing = caller.lookup(ledger, account)?;
    let plan = parse_plan(plan)?;
    Ok(Approved::ChangePlan {
        account,
        plan,
        unchanged: existing.plan == plan,
    })
}
