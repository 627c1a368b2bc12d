//! Field validation shared by request types.
//!
//! Validators push messages into a [`FieldErrors`] collection so a single
//! response can report every invalid field at once.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{Datelike, Utc};
use regex::Regex;
use serde::Serialize;

use crate::error::AppError;

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const NAME_MAX_LENGTH: usize = 256;
pub const SLUG_MAX_LENGTH: usize = 50;
pub const PERSON_NAME_MAX_LENGTH: usize = 150;
pub const FORBIDDEN_USERNAME: &str = "me";
pub const MIN_YEAR: i32 = 1895;
pub const MIN_SCORE: i16 = 1;
pub const MAX_SCORE: i16 = 10;

const REQUIRED: &str = "This field is required.";
const NULL_CHARACTER: &str = "Null characters are not allowed.";

/// Validation messages keyed by field name.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error.
    pub fn finish(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }

    /// Records "required" for a missing value and passes present ones through.
    pub fn require<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.add(field, REQUIRED);
        }
        value
    }
}

fn username_regex() -> &'static Regex {
    static USERNAME_RE: OnceLock<Regex> = OnceLock::new();
    USERNAME_RE.get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("Invalid regex"))
}

fn slug_regex() -> &'static Regex {
    static SLUG_RE: OnceLock<Regex> = OnceLock::new();
    SLUG_RE.get_or_init(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("Invalid regex"))
}

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid regex")
    })
}

fn check_length(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(
            field,
            format!("Ensure this field has no more than {max} characters."),
        );
    }
}

/// PostgreSQL text cannot hold NUL. Records an error and returns `false`
/// when `value` contains one.
pub fn validate_no_null(errors: &mut FieldErrors, field: &str, value: &str) -> bool {
    if value.contains('\0') {
        errors.add(field, NULL_CHARACTER);
        false
    } else {
        true
    }
}

pub fn validate_username(errors: &mut FieldErrors, username: &str) {
    if username.is_empty() {
        errors.add("username", "This field may not be blank.");
        return;
    }
    check_length(errors, "username", username, USERNAME_MAX_LENGTH);
    if !username_regex().is_match(username) {
        errors.add(
            "username",
            "Username may contain only letters, digits and . @ + - _",
        );
    }
    if username.eq_ignore_ascii_case(FORBIDDEN_USERNAME) {
        errors.add(
            "username",
            format!("Username '{FORBIDDEN_USERNAME}' is not allowed."),
        );
    }
}

pub fn validate_email(errors: &mut FieldErrors, email: &str) {
    if email.is_empty() {
        errors.add("email", "This field may not be blank.");
        return;
    }
    check_length(errors, "email", email, EMAIL_MAX_LENGTH);
    if !validate_no_null(errors, "email", email) {
        return;
    }
    if !email_regex().is_match(email) {
        errors.add("email", "Enter a valid email address.");
    }
}

pub fn validate_person_name(errors: &mut FieldErrors, field: &str, value: &str) {
    check_length(errors, field, value, PERSON_NAME_MAX_LENGTH);
    validate_no_null(errors, field, value);
}

pub fn validate_name(errors: &mut FieldErrors, name: &str) {
    if name.trim().is_empty() {
        errors.add("name", "This field may not be blank.");
        return;
    }
    check_length(errors, "name", name, NAME_MAX_LENGTH);
    validate_no_null(errors, "name", name);
}

pub fn validate_slug(errors: &mut FieldErrors, slug: &str) {
    if slug.is_empty() {
        errors.add("slug", "This field may not be blank.");
        return;
    }
    check_length(errors, "slug", slug, SLUG_MAX_LENGTH);
    if !slug_regex().is_match(slug) {
        errors.add(
            "slug",
            "Slug may contain only latin letters, digits, hyphens and underscores.",
        );
    }
}

/// Release year must lie between the first film screening and this year.
pub fn validate_year(errors: &mut FieldErrors, year: i32) {
    let current_year = Utc::now().year();
    if !(MIN_YEAR..=current_year).contains(&year) {
        errors.add(
            "year",
            format!("Year must be between {MIN_YEAR} and {current_year}."),
        );
    }
}

pub fn validate_score(errors: &mut FieldErrors, score: i16) {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        errors.add(
            "score",
            format!("Score must be between {MIN_SCORE} and {MAX_SCORE}."),
        );
    }
}

pub fn validate_text(errors: &mut FieldErrors, text: &str) {
    if text.trim().is_empty() {
        errors.add("text", "This field may not be blank.");
        return;
    }
    validate_no_null(errors, "text", text);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn username_errors(username: &str) -> FieldErrors {
        let mut errors = FieldErrors::default();
        validate_username(&mut errors, username);
        errors
    }

    #[test]
    fn test_username_accepts_allowed_symbols() {
        assert!(username_errors("john.doe+test@site-name_1").is_empty());
        assert!(username_errors("пользователь").is_empty());
    }

    #[test]
    fn test_username_rejects_forbidden_and_invalid() {
        assert!(!username_errors("me").is_empty());
        assert!(!username_errors("ME").is_empty());
        assert!(!username_errors("bad name").is_empty());
        assert!(!username_errors("semi;colon").is_empty());
        assert!(!username_errors("").is_empty());
        assert!(!username_errors(&"a".repeat(151)).is_empty());
        assert!(username_errors(&"a".repeat(150)).is_empty());
    }

    #[test]
    fn test_email_shape() {
        let mut errors = FieldErrors::default();
        validate_email(&mut errors, "user@example.com");
        assert!(errors.is_empty());

        validate_email(&mut errors, "not-an-email");
        assert_eq!(errors.get("email").map(|m| m.len()), Some(1));
    }

    #[test]
    fn test_null_characters_rejected() {
        let mut errors = FieldErrors::default();
        validate_email(&mut errors, "a\0@b.cc");
        validate_name(&mut errors, "Dune\0");
        validate_text(&mut errors, "a\0b");
        validate_person_name(&mut errors, "first_name", "\0");
        validate_username(&mut errors, "a\0b");

        for field in ["email", "name", "text", "first_name", "username"] {
            assert!(errors.get(field).is_some(), "{field} should be rejected");
        }
        assert_eq!(
            errors.get("text"),
            Some(&["Null characters are not allowed.".to_string()][..])
        );
    }

    #[test]
    fn test_slug_pattern() {
        let mut errors = FieldErrors::default();
        validate_slug(&mut errors, "sci-fi_2");
        assert!(errors.is_empty());

        validate_slug(&mut errors, "sci fi");
        validate_slug(&mut errors, &"s".repeat(51));
        assert_eq!(errors.get("slug").map(|m| m.len()), Some(2));
    }

    #[test]
    fn test_year_bounds() {
        let current = Utc::now().year();
        let mut errors = FieldErrors::default();
        validate_year(&mut errors, MIN_YEAR);
        validate_year(&mut errors, current);
        assert!(errors.is_empty());

        validate_year(&mut errors, MIN_YEAR - 1);
        validate_year(&mut errors, current + 1);
        assert_eq!(errors.get("year").map(|m| m.len()), Some(2));
    }

    #[test]
    fn test_score_bounds() {
        let mut errors = FieldErrors::default();
        validate_score(&mut errors, 1);
        validate_score(&mut errors, 10);
        assert!(errors.is_empty());

        validate_score(&mut errors, 0);
        validate_score(&mut errors, 11);
        assert_eq!(errors.get("score").map(|m| m.len()), Some(2));
    }

    #[test]
    fn test_require_and_finish() {
        let mut errors = FieldErrors::default();
        assert_eq!(errors.require("name", Some("x")), Some("x"));
        assert!(errors.require::<String>("slug", None).is_none());
        assert!(matches!(errors.finish(), Err(AppError::Validation(_))));
    }
}
