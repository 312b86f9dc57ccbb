use cove_core::token::{LinkClaims, TokenError, TokenService};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

/// HS256-signed action links. The claims carry the subject id, the action the
/// link is scoped to, and an expiry; `Validation::default` enforces `exp`.
pub struct JwtTokens {
    secret: String,
}

impl JwtTokens {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }
}

impl TokenService for JwtTokens {
    fn sign(&self, claims: &LinkClaims) -> Result<String, TokenError> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<LinkClaims, TokenError> {
        decode::<LinkClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| TokenError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use cove_core::token::TokenAction;
    use uuid::Uuid;

    fn claims(offset_hours: i64) -> LinkClaims {
        LinkClaims {
            sub: Uuid::new_v4(),
            action: TokenAction::Accept,
            exp: (Utc::now() + Duration::hours(offset_hours)).timestamp() as usize,
        }
    }

    #[test]
    fn round_trips_valid_claims() {
        let tokens = JwtTokens::new("secret");
        let claims = claims(48);
        let signed = tokens.sign(&claims).unwrap();
        let verified = tokens.verify(&signed).unwrap();
        assert_eq!(verified.sub, claims.sub);
        assert_eq!(verified.action, TokenAction::Accept);
    }

    #[test]
    fn rejects_expired_token() {
        let tokens = JwtTokens::new("secret");
        let signed = tokens.sign(&claims(-2)).unwrap();
        assert_eq!(tokens.verify(&signed), Err(TokenError::Invalid));
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let signer = JwtTokens::new("secret-a");
        let verifier = JwtTokens::new("secret-b");
        let signed = signer.sign(&claims(48)).unwrap();
        assert_eq!(verifier.verify(&signed), Err(TokenError::Invalid));
    }

    #[test]
    fn rejects_garbage() {
        let tokens = JwtTokens::new("secret");
        assert_eq!(tokens.verify("not-a-jwt"), Err(TokenError::Invalid));
    }
}
