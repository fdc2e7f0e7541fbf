use std::fmt;

use shared::domain::{char_len, NAME_MAX_CHARS, NAME_MIN_CHARS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Per-field rule violations collected from one draft.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// First message recorded for `field`.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.fields.iter()
    }

    pub fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid form input")?;
        for (index, error) in self.fields.iter().enumerate() {
            let sep = if index == 0 { ": " } else { "; " };
            write!(f, "{sep}{} {}", error.field, error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Required text with the shared 3..=255 character bounds. Returns the trimmed value.
pub(crate) fn check_name(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    raw: &str,
) -> String {
    let value = raw.trim();
    let len = char_len(value);
    if len == 0 {
        errors.push(field, format!("{label} is required"));
    } else if len < NAME_MIN_CHARS {
        errors.push(
            field,
            format!("{label} must have at least {NAME_MIN_CHARS} characters"),
        );
    } else if len > NAME_MAX_CHARS {
        errors.push(
            field,
            format!("{label} must have at most {NAME_MAX_CHARS} characters"),
        );
    }
    value.to_string()
}

pub(crate) fn check_required_text(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    raw: &str,
    max_chars: usize,
) -> String {
    let value = raw.trim();
    let len = char_len(value);
    if len == 0 {
        errors.push(field, format!("{label} is required"));
    } else if len > max_chars {
        errors.push(
            field,
            format!("{label} must have at most {max_chars} characters"),
        );
    }
    value.to_string()
}
