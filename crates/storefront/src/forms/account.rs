//! Registration, login and password reset forms.

use serde::Deserialize;

use bazaar_core::Email;

use super::{FormErrors, REQUIRED, check_max_length};
use crate::db::{RepositoryError, UserRepository};
use crate::services::auth::{MIN_PASSWORD_LENGTH, password_problems};

const USERNAME_MAX: usize = 150;
const NAME_MAX: usize = 30;

const INVALID_EMAIL: &str = "Enter a valid email address.";
const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only letters, \
     numbers, and @/./+/-/_ characters.";

/// Whether `c` may appear in a username.
fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')
}

/// Parse an email field, recording an error on failure.
fn email_field(errors: &mut FormErrors, field: &'static str, raw: &str) -> Option<Email> {
    if raw.trim().is_empty() {
        errors.add(field, REQUIRED);
        return None;
    }
    match Email::parse(raw) {
        Ok(email) => Some(email),
        Err(_) => {
            errors.add(field, INVALID_EMAIL);
            None
        }
    }
}

/// Sign-up form shared by vendor and buyer registration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password1: String,
    pub password2: String,
}

/// A registration that passed field validation. Username and email
/// uniqueness are checked against the database separately.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl RegistrationForm {
    /// Validate every field.
    ///
    /// # Errors
    ///
    /// Returns the collected [`FormErrors`] when any field is invalid.
    pub fn validate(&self) -> Result<Registration, FormErrors> {
        let mut errors = FormErrors::default();

        let username = self.username.trim().to_owned();
        if username.is_empty() {
            errors.add("username", REQUIRED);
        } else {
            check_max_length(&mut errors, "username", &username, USERNAME_MAX);
            if !username.chars().all(is_username_char) {
                errors.add("username", INVALID_USERNAME);
            }
        }

        let email = email_field(&mut errors, "email", &self.email);

        let first_name = self.first_name.trim().to_owned();
        check_max_length(&mut errors, "first_name", &first_name, NAME_MAX);
        let last_name = self.last_name.trim().to_owned();
        check_max_length(&mut errors, "last_name", &last_name, NAME_MAX);

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if !self.password1.is_empty() {
            if self.password1 == self.password2 {
                for problem in password_problems(&self.password2) {
                    errors.add("password2", problem);
                }
            } else {
                errors.add("password2", "The two password fields didn't match.");
            }
        }

        match email {
            Some(email) if errors.is_empty() => Ok(Registration {
                username,
                email,
                first_name,
                last_name,
                password: self.password1.clone(),
            }),
            _ => Err(errors),
        }
    }

    /// Validate every field and check that the username and email are free.
    ///
    /// The outer error is a failed lookup; the inner one carries the form
    /// errors to show.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a uniqueness lookup fails.
    pub async fn validate_unique(
        &self,
        users: &UserRepository<'_>,
    ) -> Result<Result<Registration, FormErrors>, RepositoryError> {
        let validated = self.validate();
        let mut errors = validated.as_ref().err().cloned().unwrap_or_default();

        let username = self.username.trim();
        if !username.is_empty()
            && !errors.has("username")
            && users.username_exists(username).await?
        {
            errors.add("username", "A user with that username already exists.");
        }
        if !errors.has("email")
            && let Ok(email) = Email::parse(&self.email)
            && users.email_exists(&email).await?
        {
            errors.add("email", "This email is already registered.");
        }

        Ok(match validated {
            Ok(registration) if errors.is_empty() => Ok(registration),
            _ => Err(errors),
        })
    }
}

/// Login form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    /// Where to go after logging in.
    pub next: Option<String>,
}

/// Password reset request form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PasswordResetRequestForm {
    pub email: String,
}

impl PasswordResetRequestForm {
    /// Validate the email address.
    ///
    /// # Errors
    ///
    /// Returns [`FormErrors`] when the email is missing or malformed.
    pub fn validate(&self) -> Result<Email, FormErrors> {
        let mut errors = FormErrors::default();
        match email_field(&mut errors, "email", &self.email) {
            Some(email) => Ok(email),
            None => Err(errors),
        }
    }
}

/// New password form reached from a reset link.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PasswordResetConfirmForm {
    pub password1: String,
    pub password2: String,
}

impl PasswordResetConfirmForm {
    /// Validate both fields and that they match.
    ///
    /// # Errors
    ///
    /// Returns [`FormErrors`] for missing, short or mismatched passwords.
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();

        for (field, value) in [("password1", &self.password1), ("password2", &self.password2)] {
            let len = value.chars().count();
            if value.is_empty() {
                errors.add(field, REQUIRED);
            } else if len < MIN_PASSWORD_LENGTH {
                errors.add(
                    field,
                    format!(
                        "Ensure this value has at least {MIN_PASSWORD_LENGTH} characters (it has {len})."
                    ),
                );
            }
        }

        if errors.is_empty() && self.password1 != self.password2 {
            errors.add_non_field("Passwords do not match.");
        }

        errors.into_result(self.password1.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> RegistrationForm {
        RegistrationForm {
            username: "ada.l+shop".to_owned(),
            email: "ada@example.com".to_owned(),
            first_name: "Ada".to_owned(),
            last_name: "Lovelace".to_owned(),
            password1: "analytical-engine".to_owned(),
            password2: "analytical-engine".to_owned(),
        }
    }

    #[test]
    fn test_valid_registration() {
        let valid = registration().validate().expect("valid form");
        assert_eq!(valid.username, "ada.l+shop");
        assert_eq!(valid.email.as_str(), "ada@example.com");
        assert_eq!(valid.password, "analytical-engine");
    }

    #[test]
    fn test_registration_requires_fields() {
        let errors = RegistrationForm::default().validate().expect_err("empty form");
        for field in ["username", "email", "password1", "password2"] {
            assert_eq!(errors.field(field), [REQUIRED], "field {field}");
        }
        assert!(errors.field("first_name").is_empty());
    }

    #[test]
    fn test_registration_rejects_bad_username() {
        let mut form = registration();
        form.username = "ada lovelace!".to_owned();
        let errors = form.validate().expect_err("bad username");
        assert_eq!(errors.field("username"), [INVALID_USERNAME]);

        form.username = "a".repeat(151);
        let errors = form.validate().expect_err("long username");
        assert_eq!(
            errors.field("username"),
            ["Ensure this value has at most 150 characters (it has 151)."]
        );
    }

    #[test]
    fn test_registration_password_rules() {
        let mut form = registration();
        form.password2 = "something-else".to_owned();
        let errors = form.validate().expect_err("mismatch");
        assert_eq!(errors.field("password2"), ["The two password fields didn't match."]);

        form.password1 = "1234".to_owned();
        form.password2 = "1234".to_owned();
        let errors = form.validate().expect_err("weak password");
        assert_eq!(
            errors.field("password2"),
            [
                "This password is too short. It must contain at least 8 characters.",
                "This password is entirely numeric.",
            ]
        );
    }

    #[test]
    fn test_registration_rejects_invalid_email() {
        let mut form = registration();
        form.email = "not-an-email".to_owned();
        let errors = form.validate().expect_err("bad email");
        assert_eq!(errors.field("email"), [INVALID_EMAIL]);
    }

    #[test]
    fn test_reset_request_form() {
        let form = PasswordResetRequestForm {
            email: " someone@example.com ".to_owned(),
        };
        assert_eq!(form.validate().expect("valid").as_str(), "someone@example.com");

        let errors = PasswordResetRequestForm::default()
            .validate()
            .expect_err("missing");
        assert_eq!(errors.field("email"), [REQUIRED]);
    }

    #[test]
    fn test_reset_confirm_form() {
        let ok = PasswordResetConfirmForm {
            password1: "new-password".to_owned(),
            password2: "new-password".to_owned(),
        };
        assert_eq!(ok.validate().expect("valid"), "new-password");

        let mismatch = PasswordResetConfirmForm {
            password1: "new-password".to_owned(),
            password2: "new-passw0rd".to_owned(),
        };
        let errors = mismatch.validate().expect_err("mismatch");
        assert_eq!(errors.non_field(), ["Passwords do not match."]);

        let short = PasswordResetConfirmForm {
            password1: "short".to_owned(),
            password2: "short".to_owned(),
        };
        let errors = short.validate().expect_err("too short");
        assert_eq!(
            errors.field("password1"),
            ["Ensure this value has at least 8 characters (it has 5)."]
        );
    }
}
