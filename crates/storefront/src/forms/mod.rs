//! HTML form payloads and their validation.
//!
//! Each form deserializes every field as a string so that a bad value can be
//! re-rendered as typed, with field errors next to it.

pub mod account;
pub mod catalog;
pub mod review;

use std::collections::BTreeMap;
use std::fmt;

pub use account::{
    LoginForm, PasswordResetConfirmForm, PasswordResetRequestForm, Registration,
    RegistrationForm,
};
pub use catalog::{ProductForm, ProductInput, StoreForm, StoreInput, StoreOption, store_options};
pub use review::{ReviewForm, ReviewInput};

pub(crate) const REQUIRED: &str = "This field is required.";

/// Validation errors keyed by field name, plus form-wide errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<&'static str, Vec<String>>,
    non_field: Vec<String>,
}

impl FormErrors {
    /// Record an error against `field`.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    /// Record an error that belongs to the whole form.
    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    /// Errors for `field`, empty when it is valid.
    #[must_use]
    pub fn field(&self, name: &str) -> &[String] {
        self.fields.get(name).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        !self.field(name).is_empty()
    }

    #[must_use]
    pub fn non_field(&self) -> &[String] {
        &self.non_field
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    /// `Ok(value)` when no errors were recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` when any error was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for FormErrors {
    /// One `field: message` per line, form-wide errors first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let non_field = self.non_field.iter().map(|m| (None, m));
        let fields = self
            .fields
            .iter()
            .flat_map(|(name, messages)| messages.iter().map(move |m| (Some(*name), m)));

        for (i, (field, message)) in non_field.chain(fields).enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            match field {
                Some(name) => write!(f, "{name}: {message}")?,
                None => f.write_str(message)?,
            }
        }
        Ok(())
    }
}

/// Require a non-blank value of at most `max` characters. Returns the
/// trimmed value.
pub(crate) fn required_text(
    errors: &mut FormErrors,
    field: &'static str,
    raw: &str,
    max: usize,
) -> String {
    let value = raw.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    } else {
        check_max_length(errors, field, value, max);
    }
    value.to_owned()
}

/// Record an error if `value` is longer than `max` characters.
pub(crate) fn check_max_length(
    errors: &mut FormErrors,
    field: &'static str,
    value: &str,
    max: usize,
) {
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!("Ensure this value has at most {max} characters (it has {len})."),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_errors_collects_by_field() {
        let mut errors = FormErrors::default();
        assert!(errors.is_empty());

        errors.add("name", "first");
        errors.add("name", "second");
        errors.add_non_field("whole form");

        assert_eq!(errors.field("name"), ["first", "second"]);
        assert!(errors.field("other").is_empty());
        assert!(errors.has("name"));
        assert_eq!(errors.non_field(), ["whole form"]);
        assert!(errors.into_result(()).is_err());
    }

    #[test]
    fn test_form_errors_display() {
        let mut errors = FormErrors::default();
        errors.add("username", "Taken.");
        errors.add("email", "Invalid.");
        errors.add_non_field("Try again.");

        assert_eq!(errors.to_string(), "Try again.\nemail: Invalid.\nusername: Taken.");
    }

    #[test]
    fn test_required_text() {
        let mut errors = FormErrors::default();
        assert_eq!(required_text(&mut errors, "name", "  Shop  ", 10), "Shop");
        assert!(errors.is_empty());

        required_text(&mut errors, "name", "   ", 10);
        assert_eq!(errors.field("name"), [REQUIRED]);

        let mut errors = FormErrors::default();
        required_text(&mut errors, "name", "abcdef", 3);
        assert_eq!(
            errors.field("name"),
            ["Ensure this value has at most 3 characters (it has 6)."]
        );
    }
}
