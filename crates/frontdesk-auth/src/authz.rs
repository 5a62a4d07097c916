//! Role-based authorization decisions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role carried by every identity and every session token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "front-desk")]
    FrontDesk,
    #[serde(rename = "clinician")]
    Clinician,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::FrontDesk, Role::Clinician];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::FrontDesk => "front-desk",
            Role::Clinician => "clinician",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role string that is neither `front-desk` nor `clinician`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Exact match only; no case folding or aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "front-desk" => Ok(Role::FrontDesk),
            "clinician" => Ok(Role::Clinician),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Allow iff `role` is a member of `required`. An empty set denies everyone.
pub fn authorize(role: Role, required: &[Role]) -> Decision {
    if required.contains(&role) {
        Decision::Allow
    } else {
        Decision::Deny
    }
}
