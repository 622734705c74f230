//! Pod identifier parsing and validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{FlyError, FlyResult};

/// A validated pod identifier.
///
/// Pod identifiers are UUIDs. They name the pod's working directory and
/// show up in the mount points of every mount set up for the pod, which is
/// what the garbage collector keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PodId(uuid::Uuid);

impl PodId {
    /// Parse a pod identifier.
    ///
    /// # Errors
    ///
    /// Returns [`FlyError::InvalidPodId`] if the string is not a UUID.
    pub fn new(id: &str) -> FlyResult<Self> {
        uuid::Uuid::parse_str(id)
            .map(Self)
            .map_err(|_| FlyError::InvalidPodId { id: id.to_string() })
    }

    /// Generate a new random pod identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// The canonical (lowercase, hyphenated) form.
    #[must_use]
    pub fn to_canonical(&self) -> String {
        self.0.hyphenated().to_string()
    }
}

impl fmt::Display for PodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for PodId {
    type Err = FlyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_pod_ids() {
        assert!(PodId::new("6a9d3b4e-3c0f-4f38-9d5e-0f8b6f3e2a11").is_ok());
        assert!(PodId::new("6A9D3B4E-3C0F-4F38-9D5E-0F8B6F3E2A11").is_ok());
    }

    #[test]
    fn invalid_pod_ids() {
        assert!(PodId::new("").is_err());
        assert!(PodId::new("not-a-uuid").is_err());
        assert!(PodId::new("6a9d3b4e-3c0f-4f38-9d5e").is_err());
    }

    #[test]
    fn display_is_canonical() {
        let id: PodId = "6A9D3B4E-3C0F-4F38-9D5E-0F8B6F3E2A11".parse().unwrap();
        assert_eq!(id.to_string(), "6a9d3b4e-3c0f-4f38-9d5e-0f8b6f3e2a11");
        assert_eq!(id.to_canonical(), id.to_string());
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(PodId::generate(), PodId::generate());
    }

    proptest::proptest! {
        #[test]
        fn any_case_parses_to_canonical(bytes in proptest::prelude::any::<[u8; 16]>()) {
            let uuid = uuid::Uuid::from_bytes(bytes);
            let upper = uuid.hyphenated().to_string().to_uppercase();
            let id = PodId::new(&upper).unwrap();
            proptest::prop_assert_eq!(id.to_string(), upper.to_lowercase());
        }
    }
}
