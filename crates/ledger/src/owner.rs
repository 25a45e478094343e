//! Account owners.
//!
//! A transaction or balance belongs either to the anonymous local session or
//! to an authenticated account. The storage layer keeps the historical
//! sentinel `"local"` for the anonymous owner.

use serde::{Deserialize, Serialize};

const ANONYMOUS_SENTINEL: &str = "local";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    Anonymous,
    Authenticated(String),
}

impl Owner {
    /// The identifier used for this owner in the transactions table and in
    /// the balance document store.
    pub fn storage_id(&self) -> &str {
        match self {
            Self::Anonymous => ANONYMOUS_SENTINEL,
            Self::Authenticated(id) => id,
        }
    }

    /// Inverse of [`storage_id`](Self::storage_id).
    pub fn from_storage(id: &str) -> Self {
        if id == ANONYMOUS_SENTINEL {
            Self::Anonymous
        } else {
            Self::Authenticated(id.to_string())
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

impl std::fmt::Display for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.storage_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_round_trip() {
        assert_eq!(Owner::Anonymous.storage_id(), "local");
        assert_eq!(Owner::from_storage("local"), Owner::Anonymous);
        assert_eq!(
            Owner::from_storage("uid-42"),
            Owner::Authenticated("uid-42".to_string())
        );
        assert!(!Owner::Authenticated("uid-42".to_string()).is_anonymous());
    }
}
