use std::{fs::File, io::Read, path::Path};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::account::AccountNumber;
use crate::fixedpoint::{string_to_fixed_point, AmountError};
use crate::transactions::TransactionType::{self, *};
use crate::validator::Command;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("{command} needs a {field} column")]
    MissingField {
        command: TransactionType,
        field: &'static str,
    },
    #[error(transparent)]
    Amount(#[from] AmountError),
}

#[derive(Debug, Deserialize)]
struct DeserializedCommand {
    command: TransactionType,
    account: AccountNumber,
    target: Option<AccountNumber>,
    amount: Option<String>,
    plan: Option<String>,
    payee: Option<String>,
    holder: Option<String>,
}

fn required<T>(
    value: Option<T>,
    command: TransactionType,
    field: &'static str,
) -> Result<T, CommandParseError> {
    value.ok_or(CommandParseError::MissingField { command, field })
}

impl TryFrom<DeserializedCommand> for Command {
    type Error = CommandParseError;
    fn try_from(row: DeserializedCommand) -> Result<Self, Self::Error> {
        let kind = row.command;
        let amount = |text: Option<String>| -> Result<i64, CommandParseError> {
            Ok(string_to_fixed_point(&required(text, kind, "amount")?)?)
        };
        let account = row.account;

        Ok(match kind {
            WITHDRAWAL => Command::Withdrawal {
                account,
                amount: amount(row.amount)?,
            },
            TRANSFER => Command::Transfer {
                from: account,
                to: required(row.target, kind, "target")?,
                amount: amount(row.amount)?,
            },
            PAYBILL => Command::Paybill {
                account,
                payee: required(row.payee, kind, "payee")?,
                amount: amount(row.amount)?,
            },
            DEPOSIT => Command::Deposit {
                account,
                amount: amount(row.amount)?,
            },
            CREATE => Command::Create {
                account,
                holder: required(row.holder, kind, "holder")?,
                plan: required(row.plan, kind, "plan")?,
                initial_balance: match row.amount {
                    Some(text) => string_to_fixed_point(&text)?,
                    None => 0,
                },
            },
            DELETE => Command::Delete { account },
            DISABLE => Command::Disable { account },
            CHANGEPLAN => Command::ChangePlan {
                account,
                plan: required(row.plan, kind, "plan")?,
            },
        })
    }
}

/**
 * Rows that cannot be read or make no sense as a command are dropped
 * with a warning; the rest of the script still runs.
 */
pub fn csv_to_command_iterator<R: Read>(reader: R) -> impl Iterator<Item = Command> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    reader
        .into_deserialize()
        .filter_map(|row: Result<DeserializedCommand, csv::Error>| match row {
            Err(err) => {
                warn!(%err, "dropped unreadable command row");
                None
            }
            Ok(row) => match Command::try_from(row) {
                Err(err) => {
                    warn!(%err, "dropped command");
                    None
                }
                Ok(command) => Some(command),
            },
        })
}

pub fn commands_from_path(path: &Path) -> std::io::Result<impl Iterator<Item = Command>> {
    Ok(csv_to_command_iterator(File::open(path)?))
}
