use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};

pub const INITIAL_CURSOR: &str = "0";
/// Prefix on cursors carrying a native marker, so a marker equal to
/// [`INITIAL_CURSOR`] never reads as the first page.
const MARKER_PREFIX: &str = "m:";
pub const DEFAULT_MAX_LIMIT: usize = 1000;

/// Opaque listing position. Offset-based backends store a decimal item
/// count; token-based backends store the native continuation marker.
/// The initial marker always means "first page".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Wrap a native continuation marker (object name or token).
    pub fn from_marker(marker: impl AsRef<str>) -> Self {
        Self(format!("{MARKER_PREFIX}{}", marker.as_ref()))
    }

    pub fn initial() -> Self {
        Self(INITIAL_CURSOR.to_string())
    }

    pub fn is_initial(&self) -> bool {
        self.0 == INITIAL_CURSOR
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The native continuation marker, `None` for the first page.
    pub fn marker(&self) -> Option<&str> {
        if let Some(marker) = self.0.strip_prefix(MARKER_PREFIX) {
            return Some(marker);
        }
        if self.is_initial() || self.0.is_empty() {
            None
        } else {
            Some(&self.0)
        }
    }

    pub fn offset(&self) -> Result<u64> {
        self.0.parse().map_err(|_| {
            StorageError::MalformedRequest(format!("cursor {:?} is not a valid offset", self.0))
        })
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of identifiers. `next_cursor == None` ends the listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub ids: Vec<String>,
    pub next_cursor: Option<Cursor>,
}

/// Clamp a requested page size into `1..=max`.
pub fn clamp_limit(requested: usize, max: usize) -> usize {
    requested.clamp(1, max.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_cursor_has_no_marker() {
        assert!(Cursor::default().is_initial());
        assert_eq!(Cursor::initial().marker(), None);
        assert_eq!(Cursor::new("").marker(), None);
        assert_eq!(Cursor::new("obj-17").marker(), Some("obj-17"));
    }

    #[test]
    fn marker_named_like_initial_cursor_is_kept() {
        let cursor = Cursor::from_marker("0");
        assert!(!cursor.is_initial());
        assert_eq!(cursor.as_str(), "m:0");
        assert_eq!(cursor.marker(), Some("0"));
        assert_eq!(Cursor::from_marker("obj-17").marker(), Some("obj-17"));
    }

    #[test]
    fn offsets_must_be_numeric() {
        assert_eq!(Cursor::new("200").offset().unwrap(), 200);
        assert!(matches!(
            Cursor::new("abc").offset(),
            Err(StorageError::MalformedRequest(_))
        ));
        assert!(Cursor::new("-5").offset().is_err());
    }

    #[test]
    fn limits_are_clamped() {
        assert_eq!(clamp_limit(5000, DEFAULT_MAX_LIMIT), 1000);
        assert_eq!(clamp_limit(200, DEFAULT_MAX_LIMIT), 200);
        assert_eq!(clamp_limit(0, DEFAULT_MAX_LIMIT), 1);
        assert_eq!(clamp_limit(10, 0), 1);
    }
}
