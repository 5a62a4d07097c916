//! JWT (JSON Web Token) handling for session and password-reset tokens

use chrono::{DateTime, Duration, SubsecRound, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::authz::{authorize, Decision, Role};

/// Suffix appended to the base secret to derive the reset-token secret
const RESET_SECRET_SUFFIX: &[u8] = b"-reset";

/// Claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    /// Identity the token was issued to
    #[serde(rename = "sub")]
    pub user_id: i32,
    /// Handle (email) at issuance time
    pub email: String,
    /// Role at issuance time
    pub role: Role,
    /// Issued at (timestamp)
    pub iat: i64,
    /// Expiration time (timestamp)
    pub exp: i64,
}

impl SessionClaims {
    /// Check this session's role against the roles an operation requires
    pub fn authorize(&self, required: &[Role]) -> Decision {
        authorize(self.role, required)
    }
}

/// Claims carried by a password-reset token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResetClaims {
    /// Identity whose password may be reset
    #[serde(rename = "sub")]
    pub user_id: i32,
    /// Handle (email) at issuance time
    pub email: String,
    /// Issued at (timestamp)
    pub iat: i64,
    /// Expiration time (timestamp)
    pub exp: i64,
}

/// Both claim kinds expose their expiry the same way
trait Expiring {
    fn exp(&self) -> i64;
}

impl Expiring for SessionClaims {
    fn exp(&self) -> i64 {
        self.exp
    }
}

impl Expiring for ResetClaims {
    fn exp(&self) -> i64 {
        self.exp
    }
}

/// A freshly signed token and the instant it stops being accepted
#[derive(Clone, PartialEq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// JWT errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("JWT encoding error: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,
}

/// Issues and validates the two token kinds
///
/// Session and reset tokens are signed with different keys. The reset key is
/// the base secret with `-reset` appended, so a reset token never verifies as
/// a session token (and the reverse) without any type field in the payload.
/// Keys are fixed at construction; rotating the secret means building a new
/// service, which immediately invalidates everything signed with the old one.
pub struct TokenService {
    session_encoding: EncodingKey,
    session_decoding: DecodingKey,
    reset_encoding: EncodingKey,
    reset_decoding: DecodingKey,
    validation: Validation,
    session_ttl: Duration,
    reset_ttl: Duration,
}

impl TokenService {
    /// Lifetime of a session token
    pub const SESSION_TTL_HOURS: i64 = 24;
    /// Lifetime of a password-reset token
    pub const RESET_TTL_HOURS: i64 = 1;

    /// Create a token service from the operator-managed base secret
    pub fn new(base_secret: &[u8]) -> Self {
        let mut reset_secret = base_secret.to_vec();
        reset_secret.extend_from_slice(RESET_SECRET_SUFFIX);

        // Signature and payload shape are checked by jsonwebtoken; expiry is
        // checked by hand against an explicit instant with no leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        Self {
            session_encoding: EncodingKey::from_secret(base_secret),
            session_decoding: DecodingKey::from_secret(base_secret),
            reset_encoding: EncodingKey::from_secret(&reset_secret),
            reset_decoding: DecodingKey::from_secret(&reset_secret),
            validation,
            session_ttl: Duration::hours(Self::SESSION_TTL_HOURS),
            reset_ttl: Duration::hours(Self::RESET_TTL_HOURS),
        }
    }

    /// Issue a session token valid for 24 hours from now
    pub fn issue_session(
        &self,
        user_id: i32,
        email: &str,
        role: Role,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_session_at(user_id, email, role, Utc::now())
    }

    /// Issue a session token as if the current instant were `now`
    ///
    /// JWT timestamps have one-second resolution, so `now` is truncated to
    /// the whole second before `iat` and `exp` are stamped. The returned
    /// `expires_at` is exactly the stamped `exp`.
    pub fn issue_session_at(
        &self,
        user_id: i32,
        email: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let issued_at = now.trunc_subsecs(0);
        let expires_at = issued_at + self.session_ttl;
        let claims = SessionClaims {
            user_id,
            email: email.to_string(),
            role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.session_encoding)?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Validate a session token against the current instant
    pub fn validate_session(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.validate_session_at(token, Utc::now())
    }

    /// Validate a session token against `now`
    ///
    /// Accepted iff `now < expires_at` of the issued token. The lifetime is
    /// measured from the truncated issuing second, so a token issued at
    /// `T + 0.9s` stops being accepted at `T + 24h`, not `T + 24h + 0.9s`.
    pub fn validate_session_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionClaims, TokenError> {
        self.decode_at(token, &self.session_decoding, now)
    }

    /// Issue a password-reset token valid for 1 hour from now
    pub fn issue_reset(&self, user_id: i32, email: &str) -> Result<IssuedToken, TokenError> {
        self.issue_reset_at(user_id, email, Utc::now())
    }

    /// Issue a password-reset token as if the current instant were `now`
    pub fn issue_reset_at(
        &self,
        user_id: i32,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let issued_at = now.trunc_subsecs(0);
        let expires_at = issued_at + self.reset_ttl;
        let claims = ResetClaims {
            user_id,
            email: email.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.reset_encoding)?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Validate a password-reset token against the current instant
    pub fn validate_reset(&self, token: &str) -> Result<ResetClaims, TokenError> {
        self.validate_reset_at(token, Utc::now())
    }

    /// Validate a password-reset token against `now`
    pub fn validate_reset_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<ResetClaims, TokenError> {
        self.decode_at(token, &self.reset_decoding, now)
    }

    fn decode_at<C>(&self, token: &str, key: &DecodingKey, now: DateTime<Utc>) -> Result<C, TokenError>
    where
        C: DeserializeOwned + Expiring,
    {
        let token_data =
            decode::<C>(token, key, &self.validation).map_err(|_| TokenError::InvalidToken)?;

        // exp is exclusive: a token is dead at its stamped expiry
        if now.timestamp() >= token_data.claims.exp() {
            return Err(TokenError::TokenExpired);
        }

        Ok(token_data.claims)
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("session_secret", &"<redacted>")
            .field("reset_secret", &"<redacted>")
            .field("session_ttl_hours", &self.session_ttl.num_hours())
            .field("reset_ttl_hours", &self.reset_ttl.num_hours())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const TEST_SECRET: &[u8] = b"test_secret_key_1234567890";

    fn service() -> TokenService {
        TokenService::new(TEST_SECRET)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_session_encode_decode() {
        let tokens = service();
        let issued = tokens
            .issue_session(7, "desk@clinic.test", Role::FrontDesk)
            .unwrap();

        let claims = tokens.validate_session(&issued.token).unwrap();

        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.email, "desk@clinic.test");
        assert_eq!(claims.role, Role::FrontDesk);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
        assert_eq!(issued.expires_at.timestamp(), claims.exp);
    }

    #[test]
    fn test_session_token_is_url_safe() {
        let issued = service()
            .issue_session(1, "doc@clinic.test", Role::Clinician)
            .unwrap();

        assert!(issued
            .token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'));
        assert_eq!(issued.token.matches('.').count(), 2);
    }

    #[test]
    fn test_session_valid_for_whole_window() {
        let tokens = service();
        let issued = tokens
            .issue_session_at(3, "doc@clinic.test", Role::Clinician, t0())
            .unwrap();

        assert!(tokens.validate_session_at(&issued.token, t0()).is_ok());
        assert!(tokens
            .validate_session_at(&issued.token, t0() + Duration::hours(12))
            .is_ok());
        assert!(tokens
            .validate_session_at(&issued.token, t0() + Duration::hours(24) - Duration::seconds(1))
            .is_ok());
    }

    #[test]
    fn test_session_rejected_at_and_after_expiry() {
        let tokens = service();
        let issued = tokens
            .issue_session_at(3, "doc@clinic.test", Role::Clinician, t0())
            .unwrap();

        let at_expiry = tokens.validate_session_at(&issued.token, t0() + Duration::hours(24));
        assert!(matches!(at_expiry, Err(TokenError::TokenExpired)));

        let later = tokens.validate_session_at(&issued.token, t0() + Duration::days(3));
        assert!(matches!(later, Err(TokenError::TokenExpired)));
    }

    #[test]
    fn test_session_rejected_with_wrong_secret() {
        let issued = service()
            .issue_session(1, "desk@clinic.test", Role::FrontDesk)
            .unwrap();

        let rotated = TokenService::new(b"another-secret");
        let result = rotated.validate_session(&issued.token);

        assert!(matches!(result, Err(TokenError::InvalidToken)));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let tokens = service();

        assert!(matches!(
            tokens.validate_session("not.a.jwt"),
            Err(TokenError::InvalidToken)
        ));
        assert!(matches!(
            tokens.validate_session(""),
            Err(TokenError::InvalidToken)
        ));
        assert!(matches!(
            tokens.validate_reset("still-not-a-jwt"),
            Err(TokenError::InvalidToken)
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let tokens = service();
        let issued = tokens
            .issue_session(1, "doc@clinic.test", Role::Clinician)
            .unwrap();

        // Swap in the payload of a front-desk token signed separately
        let other = tokens
            .issue_session(1, "doc@clinic.test", Role::FrontDesk)
            .unwrap();
        let mut parts: Vec<&str> = issued.token.split('.').collect();
        let other_parts: Vec<&str> = other.token.split('.').collect();
        parts[1] = other_parts[1];
        let forged = parts.join(".");

        assert!(matches!(
            tokens.validate_session(&forged),
            Err(TokenError::InvalidToken)
        ));
    }

    #[test]
    fn test_reset_token_roundtrip_and_lifetime() {
        let tokens = service();
        let issued = tokens.issue_reset_at(9, "desk@clinic.test", t0()).unwrap();

        let claims = tokens.validate_reset_at(&issued.token, t0()).unwrap();
        assert_eq!(claims.user_id, 9);
        assert_eq!(claims.exp - claims.iat, 3600);

        assert!(tokens
            .validate_reset_at(&issued.token, t0() + Duration::minutes(59))
            .is_ok());
        assert!(matches!(
            tokens.validate_reset_at(&issued.token, t0() + Duration::hours(1)),
            Err(TokenError::TokenExpired)
        ));
    }

    #[test]
    fn test_reset_token_not_accepted_as_session() {
        let tokens = service();
        let reset = tokens.issue_reset_at(9, "desk@clinic.test", t0()).unwrap();

        let result = tokens.validate_session_at(&reset.token, t0());
        assert!(matches!(result, Err(TokenError::InvalidToken)));
    }

    #[test]
    fn test_session_token_not_accepted_as_reset() {
        let tokens = service();
        let session = tokens
            .issue_session_at(9, "desk@clinic.test", Role::FrontDesk, t0())
            .unwrap();

        let result = tokens.validate_reset_at(&session.token, t0());
        assert!(matches!(result, Err(TokenError::InvalidToken)));
    }

    #[test]
    fn test_claims_authorize() {
        let tokens = service();
        let issued = tokens
            .issue_session(2, "doc@clinic.test", Role::Clinician)
            .unwrap();
        let claims = tokens.validate_session(&issued.token).unwrap();

        assert_eq!(claims.authorize(&[Role::FrontDesk]), Decision::Deny);
        assert_eq!(
            claims.authorize(&[Role::FrontDesk, Role::Clinician]),
            Decision::Allow
        );
    }

    #[test]
    fn test_subsecond_issue_expires_at_stamped_exp() {
        let tokens = service();
        let issued_at = t0() + Duration::milliseconds(900);
        let issued = tokens
            .issue_session_at(3, "doc@clinic.test", Role::Clinician, issued_at)
            .unwrap();

        let claims = tokens.validate_session_at(&issued.token, t0()).unwrap();
        assert_eq!(claims.iat, t0().timestamp());
        assert_eq!(issued.expires_at, t0() + Duration::hours(24));
        assert_eq!(issued.expires_at.timestamp(), claims.exp);

        assert!(tokens
            .validate_session_at(&issued.token, issued.expires_at - Duration::milliseconds(1))
            .is_ok());
        assert!(matches!(
            tokens.validate_session_at(&issued.token, issued.expires_at),
            Err(TokenError::TokenExpired)
        ));
    }

    #[test]
    fn test_subsecond_reset_issue_expires_at_stamped_exp() {
        let tokens = service();
        let issued = tokens
            .issue_reset_at(9, "desk@clinic.test", t0() + Duration::milliseconds(900))
            .unwrap();

        assert_eq!(issued.expires_at, t0() + Duration::hours(1));
        assert!(tokens
            .validate_reset_at(&issued.token, issued.expires_at - Duration::milliseconds(1))
            .is_ok());
        assert!(matches!(
            tokens.validate_reset_at(&issued.token, issued.expires_at),
            Err(TokenError::TokenExpired)
        ));
    }

    #[test]
    fn test_issued_token_debug_is_redacted() {
        let issued = service()
            .issue_session_at(1, "desk@clinic.test", Role::FrontDesk, t0())
            .unwrap();

        let debug = format!("{:?}", issued);

        assert!(!debug.contains(&issued.token));
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains("expires_at"));
    }

    #[test]
    fn test_debug_does_not_expose_secret() {
        let debug = format!("{:?}", TokenService::new(b"super-secret-signing-key"));

        assert!(!debug.contains("super-secret-signing-key"));
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains("session_ttl_hours: 24"));
        assert!(debug.contains("reset_ttl_hours: 1"));
    }
}
