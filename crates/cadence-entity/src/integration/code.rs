//! Integration (marketplace platform) identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper-case code of an external marketplace, e.g. `TAOBAO`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntegrationCode(String);

impl IntegrationCode {
    /// Create a code, normalising to upper case.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    /// Borrow the code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IntegrationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IntegrationCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_normalised() {
        assert_eq!(IntegrationCode::new(" taobao ").as_str(), "TAOBAO");
        assert_eq!(IntegrationCode::from("Douyin"), IntegrationCode::new("DOUYIN"));
    }
}
