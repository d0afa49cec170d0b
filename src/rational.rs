//! Exact rational helpers.
//!
//! Scan geometry and move timing are carried as [`BigRational`] end to end.
//! Floating point only appears when a value leaves the crate: as fixed-point
//! wire text or as a [`std::time::Duration`].

use num::bigint::BigInt;
use num::rational::BigRational;
use num::{Integer, Signed, ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serializer};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RationalParseError {
    #[error("empty numeric value")]
    Empty,
    #[error("invalid number '{0}'")]
    Invalid(String),
    #[error("zero denominator in '{0}'")]
    ZeroDenominator(String),
}

/// Shorthand for an integral rational.
pub fn int(value: i64) -> BigRational {
    BigRational::from_integer(BigInt::from(value))
}

/// Parse `"130"`, `"97.5"`, `"-0.25"` or `"195/2"` into an exact rational.
pub fn parse_rational(text: &str) -> Result<BigRational, RationalParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(RationalParseError::Empty);
    }
    if let Some((numer, denom)) = text.split_once('/') {
        let numer = parse_decimal(numer.trim(), text)?;
        let denom = parse_decimal(denom.trim(), text)?;
        if denom.is_zero() {
            return Err(RationalParseError::ZeroDenominator(text.to_string()));
        }
        return Ok(numer / denom);
    }
    parse_decimal(text, text)
}

fn parse_decimal(part: &str, whole: &str) -> Result<BigRational, RationalParseError> {
    let invalid = || RationalParseError::Invalid(whole.to_string());
    let (negative, digits) = match part.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, part.strip_prefix('+').unwrap_or(part)),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let mantissa: BigInt = format!("{}{}", int_part, frac_part)
        .parse()
        .map_err(|_| invalid())?;
    let value = BigRational::new(mantissa, num::pow(BigInt::from(10), frac_part.len()));
    Ok(if negative { -value } else { value })
}

/// Render with exactly `digits` fractional digits, rounding half away from zero.
pub fn format_fixed(value: &BigRational, digits: usize) -> String {
    let scale = num::pow(BigInt::from(10), digits);
    let scaled = (value * BigRational::from_integer(scale.clone()))
        .round()
        .to_integer();
    let sign = if scaled.is_negative() { "-" } else { "" };
    let (whole, frac) = scaled.abs().div_rem(&scale);
    if digits == 0 {
        return format!("{}{}", sign, whole);
    }
    format!("{}{}.{:0>width$}", sign, whole, frac.to_string(), width = digits)
}

/// Lossy conversion for logging and timers.
pub fn to_f64(value: &BigRational) -> f64 {
    let numer = value.numer().to_f64().unwrap_or(f64::NAN);
    let denom = value.denom().to_f64().unwrap_or(f64::NAN);
    numer / denom
}

/// serde adapter: reads integers, decimals or `"a/b"` strings; writes a string.
pub mod serde_rational {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(i64),
        Float(f64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigRational, D::Error>
    where
        D: Deserializer<'de>,
    {
        let parsed = match Repr::deserialize(deserializer)? {
            Repr::Int(value) => Ok(int(value)),
            // Display for f64 is the shortest exact round-trip text and never uses exponents
            Repr::Float(value) => parse_rational(&value.to_string()),
            Repr::Text(text) => parse_rational(&text),
        };
        parsed.map_err(serde::de::Error::custom)
    }

    pub fn serialize<S>(value: &BigRational, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }
}
