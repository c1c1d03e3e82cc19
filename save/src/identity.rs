use std::fmt;

/// Stable identifier tying a saved record to a live entity.
///
/// Compared by exact string equality. An empty identifier means the entity
/// has never been saved; one is generated on its first save and kept from
/// then on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SaveIdentifier(String);

impl SaveIdentifier {
    /// A fresh, universally unique identifier (UUID v4).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The "not yet assigned" identifier.
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SaveIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SaveIdentifier {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for SaveIdentifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}
