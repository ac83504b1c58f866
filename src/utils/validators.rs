//! Registration field validation.
//!
//! Pure functions, no I/O. The same rules are duplicated in the
//! registration form's client-side script for early feedback; this module
//! is the authoritative gate.

use lazy_static::lazy_static;
use regex::Regex;

use crate::db::accounts::RegisterData;
use crate::utils::errors::ValidationError;

/// Simple `local@domain.tld` shape: no spaces, exactly one `@`, and a dot
/// in the domain part.
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// Fixed national mobile format: `(DD) DDDDD-DDDD`.
const PHONE_PATTERN: &str = r"^\(\d{2}\) \d{5}-\d{4}$";

/// Minimum password length in characters.
const MIN_PASSWORD_CHARS: usize = 6;

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(EMAIL_PATTERN).expect("Invalid regex for email");
    static ref PHONE_REGEX: Regex = Regex::new(PHONE_PATTERN).expect("Invalid regex for phone");
}

/// Validates a registration request.
///
/// Rules are applied in order and the first failure wins; no cumulative
/// error reporting.
pub fn validate_registration(data: &RegisterData) -> Result<(), ValidationError> {
    if data.full_name.is_empty()
        || data.email.is_empty()
        || data.phone.is_empty()
        || data.password.is_empty()
    {
        return Err(ValidationError::MissingFields);
    }
    if !EMAIL_REGEX.is_match(&data.email) {
        return Err(ValidationError::InvalidEmail);
    }
    if !PHONE_REGEX.is_match(&data.phone) {
        return Err(ValidationError::InvalidPhone);
    }
    if data.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}
