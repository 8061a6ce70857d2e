use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::Role;

/// JWT payload carried by the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,     // user ID
    pub email: String, // user email
    pub role: Role,    // access tier at sign-in time
    pub iat: usize,    // issued at (unix timestamp)
    pub exp: usize,    // expires at (unix timestamp)
    pub iss: String,   // issuer
    pub aud: String,   // audience
}

/// Outcome of resolving a request's credential. Decoding failures of any
/// kind collapse into `Anonymous`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Authenticated(Claims),
    Anonymous,
}

impl Session {
    pub fn has_role(&self, role: Role) -> bool {
        matches!(self, Session::Authenticated(c) if c.role == role)
    }
}
