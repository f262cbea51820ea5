//! Form binding and validation
//!
//! Request bodies arrive as ordered key/value pairs ([`FormData`]). Each form
//! keeps the raw submitted strings so a failed submission can be rendered
//! again exactly as typed, next to per-field messages in [`FieldErrors`].
//! A form that validates yields a model input type for the services.

mod story;
mod user;

pub use story::{parse_creation_date, StoryForm, StoryFormChoices, CREATION_DATE_FORMAT};
pub use user::UserForm;

use serde::Serialize;
use std::collections::BTreeMap;

pub(crate) const REQUIRED: &str = "This field is required.";
pub(crate) const NOT_A_VALID_CHOICE: &str = "Not a valid choice";

/// Submitted `application/x-www-form-urlencoded` pairs, in order.
///
/// Keys may repeat, as they do for multi-select fields.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// First value submitted for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value submitted for `key`, in order
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// First value for `key`, or an empty string
    pub fn text(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    /// Whether `key` was submitted at all
    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }
}

impl From<Vec<(String, String)>> for FormData {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::new(pairs)
    }
}

/// Validation messages, per field and for the form as a whole.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct FieldErrors {
    fields: BTreeMap<String, Vec<String>>,
    form: Vec<String>,
}

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// A message not tied to a single field
    pub fn add_form(&mut self, message: impl Into<String>) {
        self.form.push(message.into());
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has(&self, field: &str) -> bool {
        !self.get(field).is_empty()
    }

    pub fn form_messages(&self) -> &[String] {
        &self.form
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.form.is_empty()
    }
}

/// One option of a select or checkbox list.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Choice {
    pub value: i64,
    pub label: String,
}

impl Choice {
    pub fn new(value: i64, label: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
        }
    }
}

/// Trimmed, required, at most `max` characters
pub(crate) fn required_text(errors: &mut FieldErrors, field: &str, value: &str, max: usize) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    } else if value.chars().count() > max {
        errors.add(field, format!("Field cannot be longer than {} characters.", max));
    }
    value.to_string()
}
