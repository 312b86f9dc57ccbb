use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Action a signed link is scoped to. A token for one action is never valid
/// for another.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenAction {
    Accept,
    Decline,
    Complete,
    NoExperience,
}

/// Claims embedded in every signed action link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkClaims {
    /// Reservation id for accept/decline, booking id for complete/no-experience
    pub sub: Uuid,
    pub action: TokenAction,
    pub exp: usize,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Link is invalid or has expired")]
    Invalid,
    #[error("Link is not valid for this action")]
    WrongAction,
    #[error("Link does not match this record")]
    WrongSubject,
    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Signing boundary for accept/decline/complete/no-experience links.
pub trait TokenService: Send + Sync {
    fn sign(&self, claims: &LinkClaims) -> Result<String, TokenError>;

    /// Verify signature and expiry. Action and subject matching is the
    /// caller's job via [`LinkClaims::require`].
    fn verify(&self, token: &str) -> Result<LinkClaims, TokenError>;
}

impl LinkClaims {
    /// Enforce that verified claims are scoped to the expected subject and
    /// action before any mutation happens.
    pub fn require(&self, subject: Uuid, action: TokenAction) -> Result<(), TokenError> {
        if self.action != action {
            return Err(TokenError::WrongAction);
        }
        if self.sub != subject {
            return Err(TokenError::WrongSubject);
        }
        Ok(())
    }
}
