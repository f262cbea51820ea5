//! User form

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::{required_text, FieldErrors, FormData, REQUIRED};
use crate::models::{User, UserInput};

const NAME_MAX: usize = 100;
const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 50;
const PASSWORD_MIN: usize = 6;

pub const PASSWORDS_DO_NOT_MATCH: &str = "Passwords do not match.";
pub const USERNAME_TAKEN: &str = "This username is already taken.";

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("Invalid username regex")
});

/// Add/edit user form.
///
/// Passwords are never serialized, so a re-rendered form always comes back
/// with empty password inputs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserForm {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    #[serde(skip)]
    pub password: String,
    #[serde(skip)]
    pub confirm_password: String,
    pub errors: FieldErrors,
}

impl UserForm {
    /// Bind submitted fields
    pub fn from_form(data: &FormData) -> Self {
        Self {
            first_name: data.text("first_name"),
            last_name: data.text("last_name"),
            username: data.text("username"),
            password: data.text("password"),
            confirm_password: data.text("confirm_password"),
            errors: FieldErrors::default(),
        }
    }

    /// Pre-fill from a stored user, leaving the password inputs empty
    pub fn from_user(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
            ..Self::default()
        }
    }

    /// Validate for a new user; a password is required.
    pub fn validate_create(&mut self) -> Option<UserInput> {
        self.validate(true)
    }

    /// Validate for an existing user; an empty password keeps the old one.
    pub fn validate_edit(&mut self) -> Option<UserInput> {
        self.validate(false)
    }

    /// Record that the username belongs to someone else
    pub fn reject_username(&mut self) {
        self.errors.add("username", USERNAME_TAKEN);
    }

    fn validate(&mut self, password_required: bool) -> Option<UserInput> {
        let mut errors = FieldErrors::default();

        let first_name = required_text(&mut errors, "first_name", &self.first_name, NAME_MAX);
        let last_name = required_text(&mut errors, "last_name", &self.last_name, NAME_MAX);
        let username = validate_username(&mut errors, &self.username);
        let password = validate_password(
            &mut errors,
            &self.password,
            &self.confirm_password,
            password_required,
        );

        self.errors = errors;
        if !self.errors.is_empty() {
            return None;
        }

        self.first_name = first_name.clone();
        self.last_name = last_name.clone();
        self.username = username.clone();

        Some(UserInput {
            first_name,
            last_name,
            username,
            password,
        })
    }
}

fn validate_username(errors: &mut FieldErrors, raw: &str) -> String {
    let username = raw.trim();
    let len = username.chars().count();

    if username.is_empty() {
        errors.add("username", REQUIRED);
    } else if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        errors.add(
            "username",
            format!(
                "Field must be between {} and {} characters long.",
                USERNAME_MIN, USERNAME_MAX
            ),
        );
    } else if !USERNAME_RE.is_match(username) {
        errors.add(
            "username",
            "Only letters, digits, underscores, dots and hyphens are allowed.",
        );
    }

    username.to_string()
}

// Passwords are taken as typed, surrounding whitespace included.
fn validate_password(
    errors: &mut FieldErrors,
    password: &str,
    confirm: &str,
    required: bool,
) -> Option<String> {
    if password.is_empty() && confirm.is_empty() {
        if required {
            errors.add("password", REQUIRED);
        }
        return None;
    }

    if password.is_empty() {
        errors.add("password", REQUIRED);
    } else if password.chars().count() < PASSWORD_MIN {
        errors.add(
            "password",
            format!("Field must be at least {} characters long.", PASSWORD_MIN),
        );
    }

    if password != confirm {
        errors.add("confirm_password", PASSWORDS_DO_NOT_MATCH);
        errors.add_form(PASSWORDS_DO_NOT_MATCH);
    }

    if errors.is_empty() {
        Some(password.to_string())
    } else {
        None
    }
}
