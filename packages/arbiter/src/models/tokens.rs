use serde::{Deserialize, Serialize};

use super::side::Side;

pub const JOIN_TOKEN_KIND: &str = "join";
pub const ACCESS_TOKEN_KIND: &str = "access";
pub const ADMIN_ROLE: &str = "admin";

/// Bearer token claims. Issued by the credential service; verified here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccessClaims {
    pub sub: String, // user id
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default = "default_access_kind")]
    pub kind: String,
    pub exp: usize,
    pub iat: usize,
}

impl AccessClaims {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

fn default_role() -> String {
    "user".to_string()
}

fn default_access_kind() -> String {
    ACCESS_TOKEN_KIND.to_string()
}

/// Short-lived admission ticket for one player into one match.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct JoinClaims {
    pub sub: String,
    pub match_id: String,
    pub side: Side,
    pub kind: String,
    pub exp: usize,
    pub iat: usize,
}
