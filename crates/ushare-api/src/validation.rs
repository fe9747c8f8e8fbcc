//! Input format rules for usernames, group names and passwords.
//!
//! Rules are checked in order and the first failing one is reported.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::ApiError;

struct Rule {
    regex: Lazy<Regex>,
    code: &'static str,
    message: &'static str,
}

macro_rules! rule {
    ($pattern:expr, $code:expr, $message:expr) => {
        Rule {
            regex: Lazy::new(|| Regex::new($pattern).expect("static pattern")),
            code: $code,
            message: $message,
        }
    };
}

static USERNAME_RULES: [Rule; 3] = [
    rule!(r"^.{8,20}$", "username_length", "Username should be between 8 and 20 symbols"),
    rule!(r"^[a-zA-Z]", "username_start", "Username should always begin only with a letter"),
    rule!(
        r"^[-_0-9a-zA-Z]+$",
        "username_charset",
        "Username cannot contain special symbols except \"-\" and \"_\""
    ),
];

static GROUP_NAME_RULES: [Rule; 3] = [
    rule!(r"^.{8,20}$", "group_name_length", "Group name should be between 8 and 20 symbols"),
    rule!(r"^[a-zA-Z]", "group_name_start", "Group name should always begin only with a letter"),
    rule!(
        r"^[-_0-9a-zA-Z]+$",
        "group_name_charset",
        "Group name cannot contain special symbols except \"-\" and \"_\""
    ),
];

static PASSWORD_RULES: [Rule; 3] = [
    rule!(r"^.{10,}$", "password_length", "Password should be greater than 9 symbols"),
    rule!(r"[0-9]", "password_digit", "Password should contain at least one number"),
    rule!(
        r"[^-_0-9a-zA-Z]",
        "password_special",
        "Password should contain at least one special char"
    ),
];

fn check(rules: &[Rule], value: &str) -> Result<(), ValidationError> {
    match rules.iter().find(|rule| !rule.regex.is_match(value)) {
        None => Ok(()),
        Some(rule) => {
            let mut err = ValidationError::new(rule.code);
            err.message = Some(Cow::Borrowed(rule.message));
            Err(err)
        }
    }
}

pub fn validate_username(value: &str) -> Result<(), ValidationError> {
    check(&USERNAME_RULES, value)
}

pub fn validate_group_name(value: &str) -> Result<(), ValidationError> {
    check(&GROUP_NAME_RULES, value)
}

pub fn validate_password(value: &str) -> Result<(), ValidationError> {
    check(&PASSWORD_RULES, value)
}

/// Run the derived validators and turn the first failure into a 400.
pub fn validated<T: Validate>(payload: T) -> Result<T, ApiError> {
    payload
        .validate()
        .map_err(|errors| ApiError::BadRequest(first_message(&errors)))?;
    Ok(payload)
}

fn first_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .first()
        .and_then(|(_, errs)| errs.first())
        .and_then(|e| e.message.as_ref())
        .map(|m| m.to_string())
        .unwrap_or_else(|| "Invalid input".to_string())
}
