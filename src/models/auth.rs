use core::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role carried in the JWT issued by the external auth service.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Customer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Role::Admin => write!(f, "admin"),
            Role::Customer => write!(f, "customer"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Claim<'a> {
    /// User ID
    pub id: &'a str,
    /// User Email
    pub email: &'a str,
    /// Role of the user
    pub role: Role,
    /// Audience
    pub aud: &'a str,
    /// Expire Time
    pub exp: u64,
    /// Issue Time
    pub iat: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ClaimOwned {
    /// User ID
    pub id: String,
    /// User Email
    pub email: String,
    /// Role of the user
    pub role: Role,
    /// Audience
    pub aud: String,
    /// Expire Time
    pub exp: u64,
    /// Issue Time
    pub iat: u64,
}

impl ClaimOwned {
    pub fn as_claim(&self) -> Claim<'_> {
        Claim {
            id: &self.id,
            email: &self.email,
            role: self.role,
            aud: &self.aud,
            exp: self.exp,
            iat: self.iat,
        }
    }
}
