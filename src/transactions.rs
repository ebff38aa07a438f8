use std::fmt::Display;

use serde::Deserialize;

use crate::account::{AccountNumber, Plan};

#[derive(Debug, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    WITHDRAWAL,
    TRANSFER,
    PAYBILL,
    DEPOSIT,
    CREATE,
    DELETE,
    DISABLE,
    CHANGEPLAN,
}

impl TransactionType {
    /// Two digit symbol used in the transaction file.
    pub fn code(self) -> &'static str {
        match self {
            TransactionType::WITHDRAWAL => "01",
            TransactionType::TRANSFER => "02",
            TransactionType::PAYBILL => "03",
            TransactionType::DEPOSIT => "04",
            TransactionType::CREATE => "05",
            TransactionType::DELETE => "06",
            TransactionType::DISABLE => "07",
            TransactionType::CHANGEPLAN => "08",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransactionType::WITHDRAWAL => "withdrawal",
            TransactionType::TRANSFER => "transfer",
            TransactionType::PAYBILL => "paybill",
            TransactionType::DEPOSIT => "deposit",
            TransactionType::CREATE => "create",
            TransactionType::DELETE => "delete",
            TransactionType::DISABLE => "disable",
            TransactionType::CHANGEPLAN => "changeplan",
        };
        write!(f, "{}", name)
    }
}

/// Companies a bill can be paid to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Payee {
    /// The Bright Light Electric Company
    EC,
    /// Credit Card Company Q
    CQ,
    /// Fast Internet, Inc.
    FI,
}

impl Payee {
    pub fn code(self) -> &'static str {
        match self {
            Payee::EC => "EC",
            Payee::CQ => "CQ",
            Payee::FI => "FI",
        }
    }

    pub fn parse(code: &str) -> Option<Payee> {
        match code {
            "EC" => Some(Payee::EC),
            "CQ" => Some(Payee::CQ),
            "FI" => Some(Payee::FI),
            _ => None,
        }
    }
}

/// Trailing two column field of a transaction line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Misc {
    None,
    Payee(Payee),
    Plan(Plan),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub sequence: u64,
    pub r#type: TransactionType,
    pub source: AccountNumber,
    pub target: Option<AccountNumber>,
    pub amount: i64,
    pub misc: Misc,
    /// Holder of the source account.
    pub holder: String,
}
