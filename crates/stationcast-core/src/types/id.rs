//! Newtype wrappers for the identifiers that travel through commands,
//! status keys, and artifact paths.
//!
//! Both identifiers end up inside storage keys (`<jobId>/<itemKey>.png`),
//! so they are restricted to `[A-Za-z0-9_-]` and at most
//! [`MAX_ID_LENGTH`] characters. Construction is the only place that
//! restriction is checked.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Maximum length of a job id or item key.
pub const MAX_ID_LENGTH: usize = 128;

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Macro to define a validated string identifier.
macro_rules! define_key {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap an identifier.
            pub fn parse(value: impl Into<String>) -> Result<Self, AppError> {
                let value = value.into();
                if value.is_empty() {
                    return Err(AppError::validation(concat!($label, " must not be empty")));
                }
                if value.len() > MAX_ID_LENGTH {
                    return Err(AppError::validation(format!(
                        "{} exceeds {MAX_ID_LENGTH} characters",
                        $label
                    )));
                }
                if !value.chars().all(is_key_char) {
                    return Err(AppError::validation(format!(
                        "{} '{value}' may only contain letters, digits, '-' and '_'",
                        $label
                    )));
                }
                Ok(Self(value))
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = AppError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_key!(
    /// Opaque, globally unique job identifier.
    JobId, "job id"
);

define_key!(
    /// Deterministic per-record key, used for dedup and artifact naming.
    ItemKey, "item key"
);

impl JobId {
    /// Generate a fresh random job id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl ItemKey {
    /// Derive an item key from a raw record value.
    ///
    /// Strings are trimmed, integers are rendered in decimal, and every
    /// character outside the allowed set is replaced with `_`. Returns
    /// `None` for any other JSON type or when nothing usable remains.
    pub fn derive(value: &serde_json::Value) -> Option<Self> {
        let raw = match value {
            serde_json::Value::String(s) => s.trim().to_string(),
            serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
            _ => return None,
        };
        let sanitized: String = raw
            .chars()
            .map(|c| if is_key_char(c) { c } else { '_' })
            .collect();
        if sanitized.is_empty() || sanitized.chars().all(|c| c == '_') {
            return None;
        }
        Self::parse(sanitized).ok()
    }
}
