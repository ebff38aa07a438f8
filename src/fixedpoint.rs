use thiserror::Error;

/**
 * String to fixed point conversion for the amounts typed in at the
 * console or in a command script. Everything past this boundary works
 * in whole minor units (cents) so nothing downstream ever touches a float.
 *
 * Note: a bare integer ("7") is accepted and means 7.00, unlike the
 * fixed-width files where the balance field carries no separator at all.
 */
pub const FIXED_POINT_MAGNITUDE: i64 = 100;
const EXPECTED_PRECISION: usize = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount contains more than one dot")]
    TooManyDots,
    #[error("amount contains a non-digit character: {0:?}")]
    NonDigit(String),
    #[error("amount has more than two digits past the point")]
    TooPrecise,
    #[error("amount is too large")]
    Overflow,
}

pub fn string_to_fixed_point(string: &str) -> Result<i64, AmountError> {
    if string.is_empty() {
        return Err(AmountError::Empty);
    }

    let mut split_amount = string.split('.');
    let units_text = split_amount.next().unwrap_or_default();
    let fraction_text = split_amount.next().unwrap_or_default();
    if split_amount.next().is_some() {
        return Err(AmountError::TooManyDots);
    }

    if units_text.is_empty() && fraction_text.is_empty() {
        return Err(AmountError::Empty);
    }
    if !units_text.bytes().chain(fraction_text.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(AmountError::NonDigit(string.to_string()));
    }
    if fraction_text.len() > EXPECTED_PRECISION {
        return Err(AmountError::TooPrecise);
    }

    let units: i64 = if units_text.is_empty() {
        0
    } else {
        units_text.parse().map_err(|_| AmountError::Overflow)?
    };

    let mut cents: i64 = if fraction_text.is_empty() {
        0
    } else {
        fraction_text.parse().map_err(|_| AmountError::Overflow)?
    };
    cents *= 10i64.pow((EXPECTED_PRECISION - fraction_text.len()) as u32);

    units
        .checked_mul(FIXED_POINT_MAGNITUDE)
        .and_then(|whole| whole.checked_add(cents))
        .ok_or(AmountError::Overflow)
}

pub fn fixed_point_to_string(fixed_point: i64) -> String {
    let sign = if fixed_point < 0 { "-" } else { "" };
    let magnitude = fixed_point.unsigned_abs();
    let scale = FIXED_POINT_MAGNITUDE as u64;
    format!("{}{}.{:02}", sign, magnitude / scale, magnitude % scale)
}
