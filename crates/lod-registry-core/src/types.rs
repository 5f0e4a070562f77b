//! Core type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{RegistryError, Result};

fn validate_identifier(kind: &str, raw: &str) -> Result<()> {
    if raw.is_empty() {
        return Err(RegistryError::InvalidIdentifier(format!(
            "{} cannot be empty",
            kind
        )));
    }
    if raw.trim() != raw {
        return Err(RegistryError::InvalidIdentifier(format!(
            "{} '{}' has leading or trailing whitespace",
            kind, raw
        )));
    }
    if raw.chars().any(char::is_control) {
        return Err(RegistryError::InvalidIdentifier(format!(
            "{} contains control characters",
            kind
        )));
    }
    Ok(())
}

/// Identifier of an asset collection owned by the external collection store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionId(String);

impl CollectionId {
    /// Create a collection identifier, rejecting empty or padded values
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate_identifier("Collection id", &id)?;
        Ok(Self(id))
    }

    /// Borrow the identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CollectionId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for CollectionId {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<CollectionId> for String {
    fn from(id: CollectionId) -> Self {
        id.0
    }
}

/// Opaque identifier of an asset owned by the external asset store
///
/// The registry never interprets the contents beyond equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetId(String);

impl AssetId {
    /// Create an asset identifier, rejecting empty or padded values
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate_identifier("Asset id", &id)?;
        Ok(Self(id))
    }

    /// Borrow the identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AssetId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for AssetId {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<AssetId> for String {
    fn from(id: AssetId) -> Self {
        id.0
    }
}

/// Detail level of an entry in a chain
///
/// Levels are non-negative; callers holding signed integers go through
/// [`Level::try_from_i64`] so negative input is rejected instead of wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(u32);

impl Level {
    /// The lowest level
    pub const ZERO: Level = Level(0);

    /// Validate a signed level
    pub fn try_from_i64(raw: i64) -> Result<Self> {
        u32::try_from(raw)
            .map(Self)
            .map_err(|_| RegistryError::InvalidLevel(raw))
    }

    /// Get the numeric value
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for Level {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Level {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        let raw: i64 = s
            .trim()
            .parse()
            .map_err(|_| RegistryError::InvalidIdentifier(format!("Level '{}' is not an integer", s)))?;
        Self::try_from_i64(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_validation() {
        assert!(CollectionId::new("c1").is_ok());
        assert!(CollectionId::new("").is_err());
        assert!(AssetId::new(" a1").is_err());
        assert!(AssetId::new("a\n1").is_err());
        assert_eq!(AssetId::new("mesh/lod-0").unwrap().as_str(), "mesh/lod-0");
    }

    #[test]
    fn test_level_rejects_negative() {
        assert_eq!(Level::try_from_i64(3).unwrap(), Level::from(3));
        assert_eq!(Level::try_from_i64(-1), Err(RegistryError::InvalidLevel(-1)));
        assert!(Level::try_from_i64(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("7".parse::<Level>().unwrap().get(), 7);
        assert!("-2".parse::<Level>().is_err());
        assert!("two".parse::<Level>().is_err());
    }

    #[test]
    fn test_identifier_deserialization_validates() {
        let ok: AssetId = serde_json::from_str("\"a1\"").unwrap();
        assert_eq!(ok.as_str(), "a1");
        assert!(serde_json::from_str::<AssetId>("\"\"").is_err());
    }
}
