//! Input validation shared by the services

use std::sync::LazyLock;

use crate::{Error, Result};

/// Maximum user name length
pub const USER_NAME_MAX: usize = 50;
/// Maximum length of names, titles and class names
pub const NAME_MAX: usize = 100;
/// Maximum length of descriptions and contact messages
pub const TEXT_MAX: usize = 5000;
/// Minimum password length
pub const PASSWORD_MIN: usize = 1;
/// Maximum password length
pub const PASSWORD_MAX: usize = 128;

static EMAIL_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .unwrap_or_else(|e| unreachable!("email regex is a valid literal: {e}"))
});

/// Trimmed value of a required field, or `ER_MISSING_FIELDS`
pub fn required(value: Option<&str>) -> Result<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(missing_fields)
}

/// Trimmed optional value; blank becomes `None`
#[must_use]
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[must_use]
pub fn missing_fields() -> Error {
    Error::InvalidInput("ER_MISSING_FIELDS".to_string())
}

pub fn max_length(field: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(Error::InvalidInput(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

pub fn validate_user_name(user_name: &str) -> Result<()> {
    max_length("userName", user_name, USER_NAME_MAX)?;
    if user_name.chars().any(char::is_whitespace) {
        return Err(Error::InvalidInput(
            "userName cannot contain whitespace".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    if !EMAIL_REGEX.is_match(email) {
        return Err(Error::InvalidInput("ER_INVALID_EMAIL".to_string()));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
        return Err(Error::InvalidInput(format!(
            "password must be between {PASSWORD_MIN} and {PASSWORD_MAX} characters"
        )));
    }
    Ok(())
}
