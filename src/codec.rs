//! Fixed-width record codec.
//!
//! Both file formats are fixed-width ASCII, fields cut strictly by position.
//! Account lines are 37 columns:
//!
//! ```text
//! 0         1         2         3
//! 0123456789012345678901234567890123456
//! NNNNNNNNNN P S BBBBBBBBB HHHHHHHHHHHH
//! ```
//!
//! number, plan, status, balance in cents, holder name. Transaction lines
//! are 50 columns:
//!
//! ```text
//! 0         1         2         3         4
//! 01234567890123456789012345678901234567890123456789
//! TT SSSSSSSSSS DDDDDDDDDD AAAAAAAAA MM HHHHHHHHHHHH
//! ```
//!
//! type code, source account, destination account (zeros when absent),
//! amount in cents, misc (payee or plan), holder of the source account.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::account::{
    is_valid_holder_name, Account, AccountNumber, Plan, Status, HOLDER_NAME_WIDTH,
    MAX_ACCOUNT_NUMBER, MAX_BALANCE,
};
use crate::transactions::{Misc, Transaction};

pub const RECORD_WIDTH: usize = 37;
pub const TRANSACTION_WIDTH: usize = 50;

const ACCOUNT_SEPARATORS: [usize; 4] = [10, 12, 14, 24];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedRecordError {
    #[error("record is {found} characters long, expected 37")]
    Length { found: usize },
    #[error("record contains non-ASCII characters")]
    NonAscii,
    #[error("expected a space at column {column}")]
    Separator { column: usize },
    #[error("{field} contains a non-digit character")]
    NonDigit { field: &'static str },
    #[error("unknown plan code {0:?}")]
    UnknownPlan(char),
    #[error("unknown status code {0:?}")]
    UnknownStatus(char),
    #[error("holder name {0:?} is not valid")]
    InvalidHolder(String),
}

#[derive(Error, Debug)]
pub enum FileError {
    #[error("{}: line {line}: {source}", .path.display())]
    Format {
        path: PathBuf,
        line: usize,
        source: MalformedRecordError,
    },
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn parse_digits(field: &str, name: &'static str) -> Result<u64, MalformedRecordError> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MalformedRecordError::NonDigit { field: name });
    }
    // At most 10 digits, cannot overflow.
    Ok(field
        .bytes()
        .fold(0u64, |value, digit| value * 10 + u64::from(digit - b'0')))
}

pub fn decode_account_line(line: &str) -> Result<Account, MalformedRecordError> {
    if !line.is_ascii() {
        return Err(MalformedRecordError::NonAscii);
    }
    if line.len() != RECORD_WIDTH {
        return Err(MalformedRecordError::Length { found: line.len() });
    }

    let bytes = line.as_bytes();
    if let Some(&column) = ACCOUNT_SEPARATORS.iter().find(|&&c| bytes[c] != b' ') {
        return Err(MalformedRecordError::Separator { column });
    }

    let number: AccountNumber = parse_digits(&line[0..10], "account number")?;

    let plan_code = bytes[11] as char;
    let plan = Plan::from_code(plan_code).ok_or(MalformedRecordError::UnknownPlan(plan_code))?;

    let status_code = bytes[13] as char;
    let status =
        Status::from_code(status_code).ok_or(MalformedRecordError::UnknownStatus(status_code))?;

    // Nine digits always fit in an i64.
    let balance = parse_digits(&line[15..24], "balance")? as i64;

    let holder = line[25..].trim_end_matches(' ');
    if !is_valid_holder_name(holder) {
        return Err(MalformedRecordError::InvalidHolder(holder.to_string()));
    }

    Ok(Account {
        number,
        holder: holder.to_string(),
        plan,
        status,
        balance,
    })
}

pub fn encode_account_line(account: &Account) -> String {
    debug_assert!(account.number <= MAX_ACCOUNT_NUMBER);
    debug_assert!((0..=MAX_BALANCE).contains(&account.balance));
    format!(
        "{:010} {} {} {:09} {:<width$}",
        account.number,
        account.plan.code(),
        account.status.code(),
        account.balance,
        account.holder,
        width = HOLDER_NAME_WIDTH
    )
}

fn encode_misc(misc: Misc) -> String {
    match misc {
        Misc::None => "  ".to_string(),
        Misc::Payee(payee) => payee.code().to_string(),
        Misc::Plan(plan) => format!("{} ", plan.code()),
    }
}

/**
 * Never fails: the validator and ledger keep every amount and account
 * number inside its field, so an oversized value here is a bug upstream.
 */
pub fn encode_transaction(transaction: &Transaction) -> String {
    debug_assert!(transaction.source <= MAX_ACCOUNT_NUMBER);
    debug_assert!(transaction.target.map_or(true, |t| t <= MAX_ACCOUNT_NUMBER));
    debug_assert!((0..=MAX_BALANCE).contains(&transaction.amount));
    debug_assert!(transaction.holder.len() <= HOLDER_NAME_WIDTH);
    format!(
        "{} {:010} {:010} {:09} {} {:<width$}",
        transaction.r#type.code(),
        transaction.source,
        transaction.target.unwrap_or(0),
        transaction.amount,
        encode_misc(transaction.misc),
        transaction.holder,
        width = HOLDER_NAME_WIDTH
    )
}

pub fn transaction_file_name(close_date: NaiveDate) -> String {
    format!("transaction_file_{}.txt", close_date.format("%Y-%m-%d"))
}

/// Reads a whole account snapshot, failing on the first bad line.
pub fn load(path: &Path) -> Result<Vec<Account>, FileError> {
    let content = fs::read_to_string(path).map_err(|source| FileError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    content
        .lines()
        .enumerate()
        .map(|(index, line)| {
            decode_account_line(line).map_err(|source| FileError::Format {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            })
        })
        .collect()
}

/// Writes the session log to `dir`, returning the path of the new file.
///
/// The content is staged in a temporary file beside the target and renamed
/// into place, so readers never observe a half written log.
pub fn write(
    dir: &Path,
    close_date: NaiveDate,
    transactions: &[Transaction],
) -> Result<PathBuf, FileError> {
    let path = dir.join(transaction_file_name(close_date));
    let io_error = |source: std::io::Error| FileError::Io {
        path: path.clone(),
        source,
    };

    let mut content = String::with_capacity(transactions.len() * (TRANSACTION_WIDTH + 1));
    for transaction in transactions {
        content.push_str(&encode_transaction(transaction));
        content.push('\n');
    }

    let mut staged = NamedTempFile::new_in(dir).map_err(io_error)?;
    staged.write_all(content.as_bytes()).map_err(io_error)?;
    staged.as_file().sync_all().map_err(io_error)?;
    staged.persist(&path).map_err(|e| io_error(e.error))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transactions::{Payee, TransactionType::*};
    use proptest::prelude::*;

    const ADA_LINE: &str = "1000000000 C A 000100000 Ada Lovelace";
    const BOB_LINE: &str = "0000000042 S D 000000000 Bob         ";

    mod decode_account_line {
        use super::*;

        #[test]
        fn decodes_every_field() {
            let account = decode_account_line(ADA_LINE).unwrap();
            assert_eq!(
                account,
                Account {
                    number: 1_000_000_000,
                    holder: "Ada Lovelace".to_string(),
                    plan: Plan::Chequing,
                    status: Status::Active,
                    balance: 100_000,
                }
            );
        }

        #[test]
        fn zero_padded_fields_keep_their_value() {
            let account = decode_account_line(BOB_LINE).unwrap();
            assert_eq!(account.number, 42);
            assert_eq!(account.balance, 0);
            assert_eq!(account.holder, "Bob");
            assert_eq!(account.status, Status::Disabled);
        }

        #[test]
        fn wrong_length_is_rejected() {
            assert_eq!(
                decode_account_line(&ADA_LINE[..36]),
                Err(MalformedRecordError::Length { found: 36 })
            );
            assert_eq!(
                decode_account_line(&format!("{} ", ADA_LINE)),
                Err(MalformedRecordError::Length { found: 38 })
            );
        }

        #[test]
        fn space_padded_number_is_rejected() {
            let line = "    000042 S A 000000000 Bob         ";
            assert_eq!(
                decode_account_line(line),
                Err(MalformedRecordError::NonDigit {
                    field: "account number"
                })
            );
        }

        #[test]
        fn non_digit_balance_is_rejected() {
            let line = "1000000000 C A 0001000x0 Ada Lovelace";
            assert_eq!(
                decode_account_line(line),
                Err(MalformedRecordError::NonDigit { field: "balance" })
            );
        }

        #[test]
        fn unknown_codes_are_rejected() {
            let bad_plan = "1000000000 X A 000100000 Ada Lovelace";
            let bad_status = "1000000000 C Z 000100000 Ada Lovelace";
            assert_eq!(
                decode_account_line(bad_plan),
                Err(MalformedRecordError::UnknownPlan('X'))
            );
            assert_eq!(
                decode_account_line(bad_status),
                Err(MalformedRecordError::UnknownStatus('Z'))
            );
        }

        #[test]
        fn missing_separator_is_rejected() {
            let line = "1000000000C  A 000100000 Ada Lovelace";
            assert_eq!(
                decode_account_line(line),
                Err(MalformedRecordError::Separator { column: 10 })
            );
        }

        #[test]
        fn blank_holder_is_rejected() {
            let line = "1000000000 C A 000100000             ";
            assert_eq!(
                decode_account_line(line),
                Err(MalformedRecordError::InvalidHolder(String::new()))
            );
        }

        #[test]
        fn non_ascii_is_rejected() {
            let line = "1000000000 C A 000100000 Zoë        ";
            assert_eq!(
                decode_account_line(line),
                Err(MalformedRecordError::NonAscii)
            );
        }
    }

    fn account_line_strategy() -> impl Strategy<Value = String> {
        (
            0..=MAX_ACCOUNT_NUMBER,
            prop_oneof![Just('S'), Just('C'), Just('T')],
            prop_oneof![Just('A'), Just('D')],
            0..=MAX_BALANCE,
            "[A-Za-z]([A-Za-z .'-]{0,10}[A-Za-z])?",
        )
            .prop_map(|(number, plan, status, balance, holder)| {
                format!("{:010} {} {} {:09} {:<12}", number, plan, status, balance, holder)
            })
    }

    proptest! {
        #[test]
        fn account_line_round_trips(line in account_line_strategy()) {
            let account = decode_account_line(&line).unwrap();
            prop_assert_eq!(encode_account_line(&account), line);
        }
    }

    mod encode_transaction {
        use super::*;

        fn transaction(
            r#type: crate::transactions::TransactionType,
            target: Option<AccountNumber>,
            amount: i64,
            misc: Misc,
        ) -> Transaction {
            Transaction {
                sequence: 0,
                r#type,
                source: 1_000_000_000,
                target,
                amount,
                misc,
                holder: "Ada Lovelace".to_string(),
            }
        }

        #[test]
        fn withdrawal_line() {
            let line = encode_transaction(&transaction(WITHDRAWAL, None, 50_000, Misc::None));
            assert_eq!(line, "01 1000000000 0000000000 000050000    Ada Lovelace");
            assert_eq!(line.len(), TRANSACTION_WIDTH);
        }

        #[test]
        fn transfer_line_carries_destination() {
            let line = encode_transaction(&transaction(TRANSFER, Some(42), 1, Misc::None));
            assert_eq!(line, "02 1000000000 0000000042 000000001    Ada Lovelace");
        }

        #[test]
        fn paybill_line_carries_payee() {
            let line = encode_transaction(&transaction(
                PAYBILL,
                None,
                2_500,
                Misc::Payee(Payee::FI),
            ));
            assert_eq!(line, "03 1000000000 0000000000 000002500 FI Ada Lovelace");
        }

        #[test]
        fn changeplan_line_carries_plan() {
            let line = encode_transaction(&transaction(
                CHANGEPLAN,
                None,
                0,
                Misc::Plan(Plan::TaxFree),
            ));
            assert_eq!(line, "08 1000000000 0000000000 000000000 T  Ada Lovelace");
            assert_eq!(line.len(), TRANSACTION_WIDTH);
        }

        #[test]
        fn short_holder_is_padded() {
            let mut create = transaction(CREATE, None, 0, Misc::Plan(Plan::Savings));
            create.holder = "Carol".to_string();
            let line = encode_transaction(&create);
            assert_eq!(line, "05 1000000000 0000000000 000000000 S  Carol       ");
            assert_eq!(line.len(), TRANSACTION_WIDTH);
        }
    }

    mod files {
        use super::*;

        fn date() -> NaiveDate {
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
        }

        #[test]
        fn file_name_uses_iso_date() {
            assert_eq!(transaction_file_name(date()), "transaction_file_2024-03-09.txt");
        }

        #[test]
        fn load_reads_every_line() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("accounts.txt");
            fs::write(&path, format!("{}\r\n{}\n", ADA_LINE, BOB_LINE)).unwrap();

            let accounts = load(&path).unwrap();
            assert_eq!(accounts.len(), 2);
            assert_eq!(accounts[1].number, 42);
        }

        #[test]
        fn load_empty_file_is_empty_snapshot() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("accounts.txt");
            fs::write(&path, "").unwrap();

            assert!(load(&path).unwrap().is_empty());
        }

        #[test]
        fn load_stops_at_first_bad_line() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("accounts.txt");
            fs::write(&path, format!("{}\n\n{}\n", ADA_LINE, BOB_LINE)).unwrap();

            match load(&path) {
                Err(FileError::Format { line, source, .. }) => {
                    assert_eq!(line, 2);
                    assert_eq!(source, MalformedRecordError::Length { found: 0 });
                }
                other => panic!("expected a format error, got {:?}", other),
            }
        }

        #[test]
        fn load_missing_file_is_io_error() {
            let dir = tempfile::tempdir().unwrap();
            assert!(matches!(
                load(&dir.path().join("absent.txt")),
                Err(FileError::Io { .. })
            ));
        }

        #[test]
        fn write_empty_log_creates_empty_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = write(dir.path(), date(), &[]).unwrap();

            assert_eq!(path, dir.path().join("transaction_file_2024-03-09.txt"));
            assert_eq!(fs::read_to_string(&path).unwrap(), "");
        }

        #[test]
        fn write_keeps_sequence_order() {
            let dir = tempfile::tempdir().unwrap();
            let log = [
                Transaction {
                    sequence: 0,
                    r#type: DEPOSIT,
                    source: 7,
                    target: None,
                    amount: 100,
                    misc: Misc::None,
                    holder: "Gus".to_string(),
                },
                Transaction {
                    sequence: 1,
                    r#type: DISABLE,
                    source: 7,
                    target: None,
                    amount: 0,
                    misc: Misc::None,
                    holder: "Gus".to_string(),
                },
            ];
            let path = write(dir.path(), date(), &log).unwrap();

            let written = fs::read_to_string(path).unwrap();
            let lines: Vec<&str> = written.lines().collect();
            assert_eq!(
                lines,
                vec![
                    "04 0000000007 0000000000 000000100    Gus         ",
                    "07 0000000007 0000000000 000000000    Gus         ",
                ]
            );
        }

        #[test]
        fn write_into_missing_directory_fails() {
            let dir = tempfile::tempdir().unwrap();
            let missing = dir.path().join("nope");
            assert!(matches!(
                write(&missing, date(), &[]),
                Err(FileError::Io { .. })
            ));
            assert!(!missing.exists());
        }
    }
}
