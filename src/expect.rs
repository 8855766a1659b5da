//! Expectations used by the test bodies
//!
//! Every helper returns `Err(CheckError)` instead of panicking so the runner can
//! record the failure against the test and carry on with the rest of the run.

use std::cmp::Ordering;
use std::fmt::Debug;

use thiserror::Error;

use crate::api::bank::ApiError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CheckError {
    #[error("expected response to be OK, got: {0}")]
    NotOk(ApiError),
    #[error("expected response not to be OK, but it succeeded")]
    UnexpectedOk,
    #[error("expected an HTTP error response, got no response: {0}")]
    NoResponse(ApiError),
    #[error("{0}")]
    Failed(String),
    #[error("could not parse {0:?} as a number")]
    NotANumber(String),
}

/// Unwraps a successful response
pub fn expect_ok<T>(result: Result<T, ApiError>) -> Result<T, CheckError> {
    result.map_err(CheckError::NotOk)
}

/// Passes only for an HTTP error response. Transport failures don't count as "not OK".
pub fn expect_not_ok<T>(result: Result<T, ApiError>, message: &str) -> Result<(), CheckError> {
    match result {
        Ok(_) => Err(CheckError::Failed(format!(
            "{}: {}",
            message,
            CheckError::UnexpectedOk
        ))),
        Err(error) if error.status().is_some() => Ok(()),
        Err(error) => Err(CheckError::NoResponse(error)),
    }
}

pub fn expect_true(condition: bool, message: &str) -> Result<(), CheckError> {
    if condition {
        Ok(())
    } else {
        Err(CheckError::Failed(message.to_string()))
    }
}

pub fn expect_eq<T: PartialEq + Debug>(actual: T, expected: T, what: &str) -> Result<(), CheckError> {
    if actual == expected {
        Ok(())
    } else {
        Err(CheckError::Failed(format!(
            "{}: expected {:?}, received {:?}",
            what, expected, actual
        )))
    }
}

pub fn expect_gt<T: PartialOrd + Debug>(actual: T, bound: T, what: &str) -> Result<(), CheckError> {
    if actual > bound {
        Ok(())
    } else {
        Err(CheckError::Failed(format!(
            "{}: expected > {:?}, received {:?}",
            what, bound, actual
        )))
    }
}

pub fn expect_contains(haystack: &str, needle: &str, what: &str) -> Result<(), CheckError> {
    if haystack.contains(needle) {
        Ok(())
    } else {
        Err(CheckError::Failed(format!(
            "{}: expected {:?} to contain {:?}",
            what, haystack, needle
        )))
    }
}

/// Every value strictly less than the one after it
pub fn expect_strictly_increasing(values: &[f64], what: &str) -> Result<(), CheckError> {
    for (i, pair) in values.windows(2).enumerate() {
        if pair[0].partial_cmp(&pair[1]) != Some(Ordering::Less) {
            return Err(CheckError::Failed(format!(
                "{}: value {} ({}) is not less than value {} ({})",
                what,
                i,
                pair[0],
                i + 1,
                pair[1]
            )));
        }
    }
    Ok(())
}

/// Lenient number parsing for text scraped off a page.
///
/// Leading whitespace is skipped and the longest numeric prefix is used, so
/// `" 12.50 AUD"` reads as `12.5`. Text without a numeric prefix is an error.
pub fn parse_float(text: &str) -> Result<f64, CheckError> {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    if trimmed[end..].starts_with("Infinity") {
        let value = if trimmed.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
        return Ok(value);
    }

    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - digits_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }
    if mantissa_digits == 0 {
        return Err(CheckError::NotANumber(text.to_string()));
    }

    // exponent only counts if at least one digit follows it
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    trimmed[..end]
        .parse::<f64>()
        .map_err(|_| CheckError::NotANumber(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_float_prefixes() {
        assert_eq!(parse_float("12.5").unwrap(), 12.5);
        assert_eq!(parse_float("  -3 AUD").unwrap(), -3.0);
        assert_eq!(parse_float(".5").unwrap(), 0.5);
        assert_eq!(parse_float("7.").unwrap(), 7.0);
        assert_eq!(parse_float("1e3x").unwrap(), 1000.0);
        assert_eq!(parse_float("2e").unwrap(), 2.0);
        assert_eq!(parse_float("Infinity").unwrap(), f64::INFINITY);
        assert_eq!(parse_float("1,000").unwrap(), 1.0);
    }

    #[test]
    fn test_parse_float_rejects_text() {
        assert!(matches!(parse_float("$12"), Err(CheckError::NotANumber(_))));
        assert!(matches!(parse_float(""), Err(CheckError::NotANumber(_))));
        assert!(matches!(parse_float("-."), Err(CheckError::NotANumber(_))));
    }

    #[test]
    fn test_strictly_increasing() {
        assert!(expect_strictly_increasing(&[1.0, 2.0, 30.5], "col").is_ok());
        assert!(expect_strictly_increasing(&[1.0, 1.0, 2.0], "col").is_err());
        assert!(expect_strictly_increasing(&[3.0, 2.0], "col").is_err());
        assert!(expect_strictly_increasing(&[f64::NAN, 1.0], "col").is_err());
    }

    #[test]
    fn test_not_ok_needs_a_response() {
        let bad_request: Result<(), ApiError> = Err(ApiError::BadRequest("missing".into()));
        assert!(expect_not_ok(bad_request, "no params").is_ok());

        let refused: Result<(), ApiError> = Err(ApiError::RequestError("refused".into()));
        assert!(matches!(
            expect_not_ok(refused, "no params"),
            Err(CheckError::NoResponse(_))
        ));

        assert!(expect_not_ok(Ok::<(), ApiError>(()), "no params").is_err());
    }

    #[test]
    fn test_basic_expectations() {
        assert!(expect_contains("TXN-ID-882", "ID", "transaction id").is_ok());
        assert!(expect_contains("TXN-882", "ID", "transaction id").is_err());
        assert!(expect_gt(2usize, 0, "accounts").is_ok());
        assert!(expect_gt(0usize, 0, "accounts").is_err());
        assert!(expect_eq(50.0, 100.0 / 2.0, "amount").is_ok());
        assert!(expect_true(false, "visible").is_err());
    }
}
