//! Topic pattern validation and resolution.
//!
//! A topic pattern is the template stored with every MQTT topic of a device
//! profile, e.g. `devices/{deviceId}/telemetry`. Before a pattern is accepted it
//! goes through [`validate`]; when a concrete device is known, [`resolve`]
//! substitutes its identifier for every `{deviceId}` placeholder.
//!
//! ```text
//! "devices/{deviceId}/telemetry" ──resolve("sensor-1")──► "devices/sensor-1/telemetry"
//! ```
//!
//! Braces are accepted as plain characters. `devices/{deviceId` passes
//! validation and so does `{anything}`; only the literal `{deviceId}` token is
//! ever substituted.

use thiserror::Error;

use super::device_id::is_valid_device_id;

/// The token replaced by the device identifier during resolution.
pub const DEVICE_ID_PLACEHOLDER: &str = "{deviceId}";

/// Reason a pattern was rejected, without positional detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmptyPattern,
    IllegalCharacter,
    ConsecutiveSeparators,
}

/// Validation failure for a topic pattern.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicError {
    /// The pattern was empty
    #[error("Topic pattern is required")]
    EmptyPattern,

    /// A character outside `[a-zA-Z0-9/:._{}\-+#]` was found
    #[error(
        "Topic can only contain alphanumeric characters, /, :, ., _, -, +, # \
         and {{deviceId}}"
    )]
    IllegalCharacter {
        /// The offending character
        character: char,
        /// Character index within the pattern
        position: usize,
    },

    /// The pattern contains `//`
    #[error("Topic cannot contain consecutive slashes")]
    ConsecutiveSeparators {
        /// Character index of the first slash of the pair
        position: usize,
    },
}

impl TopicError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TopicError::EmptyPattern => ErrorKind::EmptyPattern,
            TopicError::IllegalCharacter { .. } => ErrorKind::IllegalCharacter,
            TopicError::ConsecutiveSeparators { .. } => ErrorKind::ConsecutiveSeparators,
        }
    }

    /// Character index the failure points at; `None` for an empty pattern.
    pub fn position(&self) -> Option<usize> {
        match self {
            TopicError::EmptyPattern => None,
            TopicError::IllegalCharacter { position, .. }
            | TopicError::ConsecutiveSeparators { position } => Some(*position),
        }
    }
}

/// Outcome of [`validate`], shaped for form feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub reason: Option<TopicError>,
}

impl ValidationResult {
    fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    fn rejected(reason: TopicError) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
        }
    }

    /// The bare error kind, if the pattern was rejected.
    pub fn kind(&self) -> Option<ErrorKind> {
        self.reason.as_ref().map(TopicError::kind)
    }

    pub fn into_result(self) -> Result<(), TopicError> {
        match self.reason {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }
}

/// Returns true for characters a topic pattern may contain.
pub fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '/' | ':' | '.' | '_' | '{' | '}' | '-' | '+' | '#')
}

/// Checks a pattern in order: emptiness, character set, consecutive slashes.
pub fn validate(pattern: &str) -> ValidationResult {
    match check(pattern) {
        Ok(()) => ValidationResult::ok(),
        Err(reason) => ValidationResult::rejected(reason),
    }
}

/// [`validate`] as a `Result`, for `?` at call sites.
pub fn check(pattern: &str) -> Result<(), TopicError> {
    if pattern.is_empty() {
        return Err(TopicError::EmptyPattern);
    }

    let illegal = pattern
        .chars()
        .enumerate()
        .find(|(_, c)| !is_allowed_char(*c));
    if let Some((position, character)) = illegal {
        return Err(TopicError::IllegalCharacter {
            character,
            position,
        });
    }

    // Only ASCII is left at this point, so byte offsets equal character indices.
    if let Some(position) = pattern.find("//") {
        return Err(TopicError::ConsecutiveSeparators { position });
    }

    Ok(())
}

/// Substitutes `device_id` for every `{deviceId}` in `pattern`.
///
/// A missing or empty pattern resolves to an empty string. Neither the device
/// identifier nor the result is validated, and the substitution is not
/// recursive: a device id that itself contains `{deviceId}` is inserted as is.
pub fn resolve(pattern: Option<&str>, device_id: &str) -> String {
    match pattern {
        Some(pattern) if !pattern.is_empty() => {
            pattern.replace(DEVICE_ID_PLACEHOLDER, device_id)
        }
        _ => String::new(),
    }
}

/// Strict resolution: the pattern must validate, and so must the topic that
/// comes out of it.
///
/// Device identifiers that pass [`is_valid_device_id`] can never make a valid
/// pattern invalid, so the second check only fires for unchecked identifiers.
pub fn resolve_checked(pattern: &str, device_id: &str) -> Result<String, TopicError> {
    check(pattern)?;
    let resolved = resolve(Some(pattern), device_id);
    if !is_valid_device_id(device_id) {
        check(&resolved)?;
    }
    Ok(resolved)
}

/// Number of `{deviceId}` placeholders in `pattern`.
pub fn placeholder_count(pattern: &str) -> usize {
    pattern.matches(DEVICE_ID_PLACEHOLDER).count()
}

#[cfg(test)]
#[path = "topic_pattern_tests.rs"]
mod tests;
