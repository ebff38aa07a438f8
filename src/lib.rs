//! Single-session banking front end.
//!
//! A [`Session`] loads a fixed-width account snapshot at login, runs
//! [`Command`]s through the business rules against an in-memory [`Ledger`],
//! and writes every accepted [`Transaction`] to a fixed-width file at logout.

pub mod account;
pub mod codec;
pub mod commands;
pub mod config;
pub mod fixedpoint;
pub mod ledger;
pub mod session;
pub mod transactions;
pub mod validator;

pub use account::{Account, AccountNumber, Plan, Status};
pub use config::SessionConfig;
pub use ledger::Ledger;
pub use session::{CommandError, Session, SessionError};
pub use transactions::{Transaction, TransactionType};
pub use validator::{Command, LoginMode, Rejection};
