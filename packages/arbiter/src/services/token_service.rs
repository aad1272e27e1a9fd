use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;

use crate::config::SigningKey;
use crate::models::side::Side;
use crate::models::tokens::{AccessClaims, JoinClaims, ACCESS_TOKEN_KIND, JOIN_TOKEN_KIND};
use crate::services::errors::token_service_errors::TokenServiceError;

/// Mints and checks HS256 tokens with an explicitly supplied key.
#[derive(Clone)]
pub struct TokenService {
    signing_key: SigningKey,
    join_ttl: Duration,
}

impl TokenService {
    pub fn new(signing_key: SigningKey, join_ttl: Duration) -> Self {
        TokenService {
            signing_key,
            join_ttl,
        }
    }

    fn sign<T: serde::Serialize>(&self, claims: &T) -> Result<String, TokenServiceError> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.signing_key.as_bytes()),
        )
        .map_err(|e| TokenServiceError::JwtError(e.to_string()))
    }

    fn open<T: DeserializeOwned>(&self, token: &str) -> Result<T, TokenServiceError> {
        let token = token
            .strip_prefix("Bearer ")
            .or_else(|| token.strip_prefix("bearer "))
            .unwrap_or(token);
        let decoding_key = DecodingKey::from_secret(self.signing_key.as_bytes());

        match decode::<T>(token, &decoding_key, &Validation::default()) {
            Ok(data) => Ok(data.claims),
            Err(err) => match err.kind() {
                ErrorKind::ExpiredSignature => Err(TokenServiceError::ExpiredToken),
                _ => Err(TokenServiceError::InvalidToken),
            },
        }
    }

    pub fn issue_join_token(
        &self,
        match_id: &str,
        player_id: &str,
        side: Side,
        now: DateTime<Utc>,
    ) -> Result<String, TokenServiceError> {
        let claims = JoinClaims {
            sub: player_id.to_string(),
            match_id: match_id.to_string(),
            side,
            kind: JOIN_TOKEN_KIND.to_string(),
            exp: (now + self.join_ttl).timestamp().max(0) as usize,
            iat: now.timestamp().max(0) as usize,
        };
        self.sign(&claims)
    }

    pub fn verify_join_token(&self, token: &str) -> Result<JoinClaims, TokenServiceError> {
        let claims: JoinClaims = self.open(token)?;
        if claims.kind != JOIN_TOKEN_KIND {
            return Err(TokenServiceError::WrongTokenKind);
        }
        Ok(claims)
    }

    pub fn issue_access_token(
        &self,
        user_id: &str,
        role: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenServiceError> {
        let claims = AccessClaims {
            sub: user_id.to_string(),
            role: role.to_string(),
            kind: ACCESS_TOKEN_KIND.to_string(),
            exp: (now + ttl).timestamp().max(0) as usize,
            iat: now.timestamp().max(0) as usize,
        };
        self.sign(&claims)
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenServiceError> {
        let claims: AccessClaims = self.open(token)?;
        if claims.kind != ACCESS_TOKEN_KIND {
            return Err(TokenServiceError::WrongTokenKind);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(
            SigningKey::new(format!("{:0<32}", secret)).unwrap(),
            Duration::minutes(10),
        )
    }

    #[test]
    fn test_join_token_round_trip() {
        let tokens = service("join");
        let token = tokens
            .issue_join_token("match-1", "player-1", Side::Black, Utc::now())
            .unwrap();

        let claims = tokens.verify_join_token(&token).unwrap();
        assert_eq!(claims.sub, "player-1");
        assert_eq!(claims.match_id, "match-1");
        assert_eq!(claims.side, Side::Black);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_access_token_accepts_bearer_prefix() {
        let tokens = service("access");
        let token = tokens
            .issue_access_token("user-1", "admin", Duration::hours(1), Utc::now())
            .unwrap();

        let claims = tokens
            .verify_access_token(&format!("Bearer {}", token))
            .unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(claims.is_admin());
    }

    #[test]
    fn test_join_token_is_not_an_access_token() {
        let tokens = service("kinds");
        let join = tokens
            .issue_join_token("match-1", "player-1", Side::White, Utc::now())
            .unwrap();
        let access = tokens
            .issue_access_token("user-1", "user", Duration::hours(1), Utc::now())
            .unwrap();

        assert_eq!(
            tokens.verify_access_token(&join),
            Err(TokenServiceError::WrongTokenKind)
        );
        assert_eq!(
            tokens.verify_join_token(&access),
            Err(TokenServiceError::InvalidToken)
        );
    }

    #[test]
    fn test_expired_token_is_reported() {
        let tokens = service("expiry");
        let issued = Utc::now() - Duration::hours(2);
        let token = tokens
            .issue_access_token("user-1", "user", Duration::minutes(5), issued)
            .unwrap();

        assert_eq!(
            tokens.verify_access_token(&token),
            Err(TokenServiceError::ExpiredToken)
        );
    }

    #[test]
    fn test_other_key_cannot_verify() {
        let ours = service("ours");
        let theirs = service("theirs");
        let token = theirs
            .issue_join_token("match-1", "player-1", Side::White, Utc::now())
            .unwrap();

        assert_eq!(
            ours.verify_join_token(&token),
            Err(TokenServiceError::InvalidToken)
        );
    }
}
