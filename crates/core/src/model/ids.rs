use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing an identifier from a string.
///
/// Identifiers end up as URL path segments, so they must be non-empty and
/// free of `/` and whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
    raw: String,
}

impl ParseIdError {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {:?}", self.kind, self.raw)
    }
}

impl std::error::Error for ParseIdError {}

fn validate_segment(kind: &'static str, raw: String) -> Result<String, ParseIdError> {
    let valid = !raw.is_empty() && !raw.chars().any(|c| c == '/' || c.is_whitespace());
    if valid {
        Ok(raw)
    } else {
        Err(ParseIdError { kind, raw })
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, validating it as a path segment.
            ///
            /// # Errors
            ///
            /// Returns `ParseIdError` if the value is empty or contains `/` or whitespace.
            pub fn new(raw: impl Into<String>) -> Result<Self, ParseIdError> {
                validate_segment(stringify!($name), raw.into()).map(Self)
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseIdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

string_id! {
    /// Identifies an instructor; partitions content and progress into independent curricula.
    InstructorId
}

string_id! {
    /// Identifies a level within an instructor's curriculum.
    LevelId
}

string_id! {
    /// Identifies a lesson; unique within a level.
    LessonId
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
