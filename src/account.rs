pub type AccountNumber = u64;

/// Largest number that fits the 10-digit account field.
pub const MAX_ACCOUNT_NUMBER: AccountNumber = 9_999_999_999;
/// Largest balance, in cents, that fits the 9-digit balance field.
pub const MAX_BALANCE: i64 = 999_999_999;
pub const HOLDER_NAME_WIDTH: usize = 12;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Plan {
    Savings,
    Chequing,
    TaxFree,
}

impl Plan {
    pub fn code(self) -> char {
        match self {
            Plan::Savings => 'S',
            Plan::Chequing => 'C',
            Plan::TaxFree => 'T',
        }
    }

    pub fn from_code(code: char) -> Option<Plan> {
        match code {
            'S' => Some(Plan::Savings),
            'C' => Some(Plan::Chequing),
            'T' => Some(Plan::TaxFree),
            _ => None,
        }
    }

    /// Parses a plan as typed by an operator: exactly one code character.
    pub fn parse(text: &str) -> Option<Plan> {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(code), None) => Plan::from_code(code),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    Active,
    Disabled,
}

impl Status {
    pub fn code(self) -> char {
        match self {
            Status::Active => 'A',
            Status::Disabled => 'D',
        }
    }

    pub fn from_code(code: char) -> Option<Status> {
        match code {
            'A' => Some(Status::Active),
            'D' => Some(Status::Disabled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub number: AccountNumber,
    pub holder: String,
    pub plan: Plan,
    pub status: Status,
    /// Cents.
    pub balance: i64,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }
}

/**
 * Holder names live in a 12 column, space padded field, so a name
 * with trailing (or leading) blanks could not survive a round trip.
 */
pub fn is_valid_holder_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= HOLDER_NAME_WIDTH
        && name.bytes().all(|b| b == b' ' || b.is_ascii_graphic())
        && !name.starts_with(' ')
        && !name.ends_with(' ')
}
