//! Account records and roles.

use serde::{Deserialize, Serialize};

/// The two marketplace roles an account can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Provider,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Provider => "provider",
        }
    }

    /// Home dashboard path for this role (providers still go through readiness).
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Self::Client => "/client/dashboard",
            Self::Provider => "/provider/dashboard",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "provider" => Ok(Self::Provider),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A row from the `profiles` table.
///
/// `role` is `None` when the stored value is not a recognised role.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub user_id: String,
    pub role: Option<Role>,
    pub display_name: Option<String>,
}
