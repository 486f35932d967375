// Field validation helpers.
//
// Handlers collect `FieldError`s into a `Validator` and turn the whole batch
// into one 400 response, so clients see every problem at once.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ApiError, FieldError};

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^\w+([.+-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,})+$").expect("static email regex")
    })
}

/// Lowercase and trim an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Whether a (normalized) email address is syntactically acceptable.
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && email_regex().is_match(email)
}

/// Default and maximum page sizes for list endpoints.
pub const DEFAULT_PAGE_LIMIT: u64 = 20;
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Resolved pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }

    /// Number of pages needed for `total` records.
    pub fn pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}

/// Accumulates field errors across a request.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Require a trimmed string with a char count in `min..=max`.
    /// Returns the trimmed value when valid.
    pub fn text(
        &mut self,
        field: &str,
        value: Option<&str>,
        min: usize,
        max: usize,
        message: &str,
    ) -> Option<String> {
        match value.map(str::trim) {
            Some(v) if (min..=max).contains(&v.chars().count()) => Some(v.to_string()),
            _ => {
                self.push(field, message);
                None
            }
        }
    }

    /// Require a syntactically valid email; returns it normalized.
    pub fn email(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        match value.map(normalize_email) {
            Some(v) if is_valid_email(&v) => Some(v),
            _ => {
                self.push(field, "Please provide a valid email");
                None
            }
        }
    }

    /// Require a value that parses as one of the `allowed` enum variants.
    pub fn one_of<T>(
        &mut self,
        field: &str,
        value: Option<&str>,
        parse: impl Fn(&str) -> Option<T>,
        message: &str,
    ) -> Option<T> {
        match value.and_then(&parse) {
            Some(v) => Some(v),
            None => {
                self.push(field, message);
                None
            }
        }
    }

    /// Parse optional `page` / `limit` query values.
    pub fn pagination(&mut self, page: Option<&str>, limit: Option<&str>) -> Pagination {
        let page = match page {
            None => 1,
            Some(raw) => match raw.parse::<u64>() {
                Ok(p) if p >= 1 => p,
                _ => {
                    self.push("page", "Page must be a positive integer");
                    1
                }
            },
        };
        let limit = match limit {
            None => DEFAULT_PAGE_LIMIT,
            Some(raw) => match raw.parse::<u64>() {
                Ok(l) if (1..=MAX_PAGE_LIMIT).contains(&l) => l,
                _ => {
                    self.push("limit", "Limit must be between 1 and 100");
                    DEFAULT_PAGE_LIMIT
                }
            },
        };
        Pagination { page, limit }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Unwrap the validated values, or fail with every collected error.
    /// `None` without a recorded error still fails validation.
    pub fn require<T>(self, values: Option<T>) -> Result<T, ApiError> {
        match values {
            Some(v) if self.errors.is_empty() => Ok(v),
            _ => Err(ApiError::validation(self.errors)),
        }
    }

    /// `Ok(())` if nothing failed, else a validation `ApiError`.
    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(self.errors))
        }
    }
}
