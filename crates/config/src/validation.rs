//! Field checks shared by the config sections

pub use crate::error::ValidationError;
use crate::ConfigResult;
use std::fmt::Display;

/// A `[section]` of the config file
///
/// Sections validate themselves and accept string assignments for
/// `bedtime config set`, so a new section only has to be added to
/// [`Config`](crate::Config).
pub trait ConfigSection: Default {
    /// Checks every field, reporting all problems at once
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Takes every value from `other`
    fn merge(&mut self, other: Self);

    fn section_name(&self) -> &'static str;

    /// Parses `value` into the field named `field`
    fn set_field(&mut self, field: &str, value: &str) -> ConfigResult<()>;
}

/// Accumulates failed checks for one section
///
/// Field names are qualified with the section, so `check("volume")` in the
/// `session` section reports `session.volume`.
#[derive(Debug)]
pub struct FieldChecks {
    section: &'static str,
    errors: Vec<ValidationError>,
}

impl FieldChecks {
    pub fn new(section: &'static str) -> Self {
        Self {
            section,
            errors: Vec::new(),
        }
    }

    fn key(&self, field: &str) -> String {
        format!("{}.{}", self.section, field)
    }

    /// Fails `field` with `message` unless `ok` holds
    pub fn ensure(mut self, ok: bool, field: &str, message: &str) -> Self {
        if !ok {
            let key = self.key(field);
            self.errors.push(ValidationError::new(key, message));
        }
        self
    }

    /// Inclusive range check; NaN is always out of range
    pub fn within<T>(mut self, field: &str, value: T, min: T, max: T) -> Self
    where
        T: PartialOrd + Display + Copy,
    {
        let inside = value >= min && value <= max;
        if !inside {
            let key = self.key(field);
            self.errors.push(ValidationError::with_value(
                key,
                format!("must be between {min} and {max}"),
                value,
            ));
        }
        self
    }

    pub fn non_blank(self, field: &str, value: &str) -> Self {
        self.ensure(!value.trim().is_empty(), field, "must not be empty")
    }

    pub fn member_of<T>(mut self, field: &str, value: &T, allowed: &[T]) -> Self
    where
        T: PartialEq + Display,
    {
        if !allowed.contains(value) {
            let options = allowed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            let key = self.key(field);
            self.errors.push(ValidationError::with_value(
                key,
                format!("must be one of: {options}"),
                value,
            ));
        }
        self
    }

    pub fn finish(self) -> Result<(), Vec<ValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}
