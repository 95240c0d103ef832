//! Conversion between API amounts and the integer minor units stored in the database.
//!
//! Balances and transaction amounts are stored as integer cents so that the
//! database can apply `balance = balance + delta` exactly.

use rust_decimal::Decimal;

use crate::Error;

/// The number of decimal places used for all amounts.
pub const MONEY_SCALE: u32 = 2;

/// Amounts and balances must be strictly smaller than this many cents in
/// magnitude, i.e. at most 13 whole digits.
pub const MINOR_UNITS_LIMIT: i64 = 1_000_000_000_000_000;

/// Convert a decimal amount into integer cents.
///
/// # Errors
/// Returns [Error::InvalidOperation] if `amount` has more than two decimal
/// places or its magnitude is not below [MINOR_UNITS_LIMIT] cents.
pub fn to_minor_units(amount: Decimal) -> Result<i64, Error> {
    let normalized = amount.normalize();
    if normalized.scale() > MONEY_SCALE {
        return Err(Error::InvalidOperation(format!(
            "Amount {amount} has more than {MONEY_SCALE} decimal places"
        )));
    }

    let mut scaled = normalized;
    scaled.rescale(MONEY_SCALE);

    i64::try_from(scaled.mantissa())
        .ok()
        .filter(|cents| cents.unsigned_abs() < MINOR_UNITS_LIMIT.unsigned_abs())
        .ok_or_else(|| Error::InvalidOperation(format!("Amount {amount} is too large")))
}

/// Convert integer cents into a decimal amount with two decimal places.
pub fn from_minor_units(cents: i64) -> Decimal {
    Decimal::new(cents, MONEY_SCALE)
}

/// Convert a sum of integer cents, which may exceed 64 bits, into a decimal amount.
///
/// # Errors
/// Returns [Error::InvalidOperation] if the sum does not fit into a [Decimal].
pub fn sum_from_minor_units(total: i128) -> Result<Decimal, Error> {
    Decimal::try_from_i128_with_scale(total, MONEY_SCALE)
        .map_err(|_| Error::InvalidOperation(format!("Total of {total} cents is too large")))
}

/// Validate an amount for a ledger mutation and convert it to cents.
///
/// # Errors
/// Returns [Error::InvalidOperation] if `amount` is zero, negative or has more
/// than two decimal places.
pub fn positive_minor_units(amount: Decimal) -> Result<i64, Error> {
    let cents = to_minor_units(amount)?;

    if cents <= 0 {
        return Err(Error::InvalidOperation(
            "Amount must be greater than zero".to_owned(),
        ));
    }

    Ok(cents)
}
