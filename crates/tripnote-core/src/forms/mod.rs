//! Input validation for the sign-in, trip and note forms.
//!
//! Each form reports at most one issue per field (the first rule it breaks),
//! keyed by the field's path as the form names it (`confirmPassword`, `endDate`, ...).

mod auth;
mod trip;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

pub use auth::{MagicLinkForm, SignInForm, SignUpForm};
pub use trip::{NoteForm, TripForm};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub field_path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render(.0))]
pub struct ValidationErrors(Vec<ValidationIssue>);

fn render(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("{}: {}", issue.field_path, issue.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.0
    }

    /// First message reported for `field_path`.
    pub fn message_for(&self, field_path: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|issue| issue.field_path == field_path)
            .map(|issue| issue.message.as_str())
    }
}

/// Collects issues while a form is checked.
#[derive(Default)]
struct Checker {
    issues: Vec<ValidationIssue>,
}

impl Checker {
    fn has_issue(&self, field_path: &str) -> bool {
        self.issues.iter().any(|issue| issue.field_path == field_path)
    }

    fn push(&mut self, field_path: &str, message: &str) {
        if !self.has_issue(field_path) {
            self.issues.push(ValidationIssue {
                field_path: field_path.to_owned(),
                message: message.to_owned(),
            });
        }
    }

    fn required(&mut self, field_path: &str, value: &str, message: &str) -> &mut Self {
        if value.is_empty() {
            self.push(field_path, message);
        }
        self
    }

    fn min_chars(&mut self, field_path: &str, value: &str, min: usize, message: &str) -> &mut Self {
        if value.chars().count() < min {
            self.push(field_path, message);
        }
        self
    }

    fn email(&mut self, field_path: &str, value: &str, message: &str) -> &mut Self {
        if !looks_like_email(value) {
            self.push(field_path, message);
        }
        self
    }

    /// Parse a `YYYY-MM-DD` date, recording `message` when it is malformed.
    fn date(&mut self, field_path: &str, value: &str, message: &str) -> Option<NaiveDate> {
        if self.has_issue(field_path) {
            return None;
        }
        match NaiveDate::parse_from_str(value.trim(), DATE_FORMAT) {
            Ok(date) => Some(date),
            Err(_) => {
                self.push(field_path, message);
                None
            }
        }
    }

    fn finish(self) -> Result<(), ValidationErrors> {
        self.into_result(Some(()))
    }

    /// `value` when no rule was broken.
    fn into_result<T>(self, value: Option<T>) -> Result<T, ValidationErrors> {
        match value {
            Some(value) if self.issues.is_empty() => Ok(value),
            _ => Err(ValidationErrors(self.issues)),
        }
    }
}

fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}
