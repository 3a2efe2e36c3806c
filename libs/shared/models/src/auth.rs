use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

/// The two sides of the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Provider,
    Client,
}

impl Role {
    /// Accepts the legacy `doctor` / `patient` claim values as aliases.
    pub fn from_claim(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "provider" | "doctor" => Some(Role::Provider),
            "client" | "patient" => Some(Role::Client),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Provider => write!(f, "provider"),
            Role::Client => write!(f, "client"),
        }
    }
}

/// An authenticated, already-disambiguated actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub role: Role,
}

impl Principal {
    pub fn provider(id: i64) -> Self {
        Self { id, role: Role::Provider }
    }

    pub fn client(id: i64) -> Self {
        Self { id, role: Role::Client }
    }

    pub fn require(&self, role: Role) -> Result<i64, AppError> {
        if self.role == role {
            Ok(self.id)
        } else {
            Err(AppError::Forbidden(format!("This action requires the {} role", role)))
        }
    }
}
