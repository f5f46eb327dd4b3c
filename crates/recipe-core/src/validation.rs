//! Field-level validation rules shared by the registration, profile and
//! owned-resource endpoints.
//!
//! Errors are collected per field so a single response can report every
//! problem with a payload at once.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub const MAX_FIELD_LENGTH: usize = 255;
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_BLANK: &str = "This field may not be blank.";
pub const MSG_INVALID_EMAIL: &str = "Enter a valid email address.";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@(?:localhost|(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63})$",
    )
    .expect("email pattern is valid")
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Turns the collected errors into a `Result`, `Ok` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Records a required/blank error and returns the trimmed value when present.
pub fn require<'a>(errors: &mut ValidationErrors, field: &str, value: Option<&'a str>) -> Option<&'a str> {
    match value.map(str::trim) {
        None => {
            errors.add(field, MSG_REQUIRED);
            None
        }
        Some("") => {
            errors.add(field, MSG_BLANK);
            None
        }
        Some(v) => Some(v),
    }
}

/// Like [`require`] but keeps surrounding whitespace, as passwords must.
pub fn require_untrimmed<'a>(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&'a str>,
) -> Option<&'a str> {
    match value {
        None => {
            errors.add(field, MSG_REQUIRED);
            None
        }
        Some("") => {
            errors.add(field, MSG_BLANK);
            None
        }
        Some(v) => Some(v),
    }
}

pub fn check_max_length(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(
            field,
            format!("Ensure this field has no more than {} characters.", max),
        );
    }
}

pub fn check_min_length(errors: &mut ValidationErrors, field: &str, value: &str, min: usize) {
    if value.chars().count() < min {
        errors.add(
            field,
            format!("Ensure this field has at least {} characters.", min),
        );
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

pub fn check_email(errors: &mut ValidationErrors, field: &str, value: &str) {
    if !is_valid_email(value) {
        errors.add(field, MSG_INVALID_EMAIL);
    }
    check_max_length(errors, field, value, MAX_FIELD_LENGTH);
}

/// Validates the `name` of a tag or ingredient, returning the trimmed name.
pub fn validate_owned_name(name: Option<&str>) -> Result<String, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let name = require(&mut errors, "name", name).map(str::to_string);
    if let Some(ref n) = name {
        check_max_length(&mut errors, "name", n, MAX_FIELD_LENGTH);
    }
    errors.into_result()?;
    Ok(name.unwrap_or_default())
}
