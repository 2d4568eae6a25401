use std::fmt;

use tracing::error;

use crate::error::{Result, StorageError};

/// A caller-supplied object key that is safe to use as a single path
/// segment or storage key. Only [`ObjectId::parse`] constructs one, so every
/// backend call receives an identifier that has already been validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() || sanitize(raw) != raw {
            error!(id = ?raw, "Insecure identifier detected");
            return Err(StorageError::InvalidIdentifier(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reduce a string to its path-safe form: non-ASCII characters dropped
/// outright (no Unicode decomposition, so an accented letter vanishes rather
/// than becoming its base letter), path separators and whitespace runs
/// collapsed to `_`, anything outside `[A-Za-z0-9_.-]` dropped, and
/// leading/trailing `.` and `_` stripped. An id containing non-ASCII is
/// therefore never valid.
pub fn sanitize(raw: &str) -> String {
    let ascii: String = raw
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' { ' ' } else { c })
        .collect();
    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}
