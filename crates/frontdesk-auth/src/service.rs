//! Login, registration and password lifecycle

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::authz::{Role, UnknownRole};
use crate::jwt::{IssuedToken, TokenError, TokenService};
use crate::password::{PasswordError, PasswordHasher};
use crate::store::{CredentialStore, Identity, IdentityProfile, NewIdentity, StoreError};

/// Shortest password accepted by change/update flows, in characters
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Verified against when the handle is unknown, so a miss costs the same as a hit
const DUMMY_SECRET: &str = "frontdesk-dummy-secret";

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown handle, inactive identity or wrong secret. Deliberately indistinguishable.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account is deactivated")]
    Deactivated,

    #[error("user not found")]
    NotFound,

    #[error("email already registered")]
    DuplicateHandle,

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("current password is incorrect")]
    IncorrectCurrentPassword,

    #[error("invalid or expired reset token")]
    InvalidOrExpiredResetToken,

    #[error("invalid or expired token")]
    TokenInvalid,

    #[error("failed to issue token: {0}")]
    TokenIssuance(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("operation timed out")]
    Timeout,

    #[error("password hashing failed: {0}")]
    HashingFailure(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => AuthError::DuplicateHandle,
            StoreError::Backend(msg) => AuthError::Storage(msg),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::HashingFailure(err.to_string())
    }
}

impl From<UnknownRole> for AuthError {
    fn from(err: UnknownRole) -> Self {
        AuthError::InvalidRole(err.0)
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::EncodingError(e) => AuthError::TokenIssuance(e.to_string()),
            TokenError::TokenExpired | TokenError::InvalidToken => AuthError::TokenInvalid,
        }
    }
}

/// Orchestrates the credential store, hasher and token service
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<PasswordHasher>,
    tokens: Arc<TokenService>,
    dummy_hash: OnceCell<String>,
    #[cfg(test)]
    verify_calls: std::sync::atomic::AtomicUsize,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            store,
            hasher: Arc::new(hasher),
            tokens,
            dummy_hash: OnceCell::new(),
            #[cfg(test)]
            verify_calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    /// Authenticate a handle and secret, returning a fresh session token
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        deadline: Duration,
    ) -> Result<(IssuedToken, IdentityProfile), AuthError> {
        with_deadline(deadline, self.login_inner(email, password)).await
    }

    async fn login_inner(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(IssuedToken, IdentityProfile), AuthError> {
        let Some(identity) = self.store.find_by_handle(email).await? else {
            let dummy = self.dummy_hash().await?;
            self.verify(dummy, password.to_string()).await?;
            debug!("Login rejected: unknown handle");
            return Err(AuthError::InvalidCredentials);
        };

        // Inactive accounts pay for a full verify too
        let password_ok = self
            .verify(identity.password_hash.clone(), password.to_string())
            .await?;

        if !identity.is_active {
            warn!(user_id = identity.id, "Login rejected: account inactive");
            return Err(AuthError::InvalidCredentials);
        }

        if !password_ok {
            warn!(user_id = identity.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self
            .tokens
            .issue_session(identity.id, &identity.email, identity.role)?;
        info!(user_id = identity.id, role = %identity.role, "User logged in");

        Ok((token, identity.profile()))
    }

    /// Create a new active identity
    ///
    /// Password length is not checked here; shape rules belong to the caller.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: &str,
        deadline: Duration,
    ) -> Result<IdentityProfile, AuthError> {
        with_deadline(deadline, self.register_inner(email, password, name, role)).await
    }

    async fn register_inner(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: &str,
    ) -> Result<IdentityProfile, AuthError> {
        let role: Role = role.parse()?;

        if self.store.find_by_handle(email).await?.is_some() {
            return Err(AuthError::DuplicateHandle);
        }

        let password_hash = self.hash(password.to_string()).await?;

        // Concurrent registrations can both pass the lookup; the store's
        // uniqueness check maps the loser to DuplicateHandle.
        let identity = self
            .store
            .insert(NewIdentity {
                email: email.to_string(),
                password_hash,
                name: name.to_string(),
                role,
                is_active: true,
            })
            .await?;

        info!(user_id = identity.id, role = %identity.role, "User registered");
        Ok(identity.profile())
    }

    /// Current stored profile for an identity, active or not
    pub async fn profile(&self, user_id: i32) -> Result<IdentityProfile, AuthError> {
        self.store
            .find_by_id(user_id)
            .await?
            .map(|identity| identity.profile())
            .ok_or(AuthError::NotFound)
    }

    /// Issue a new session token for an existing, active identity
    ///
    /// Previously issued tokens stay valid until they expire.
    pub async fn refresh_token(&self, user_id: i32) -> Result<IssuedToken, AuthError> {
        let identity = self.active_identity(user_id).await?;
        let token = self
            .tokens
            .issue_session(identity.id, &identity.email, identity.role)?;
        debug!(user_id, "Session token refreshed");
        Ok(token)
    }

    pub async fn change_password(
        &self,
        user_id: i32,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let mut identity = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !self
            .verify(identity.password_hash.clone(), old_password.to_string())
            .await?
        {
            return Err(AuthError::IncorrectCurrentPassword);
        }
        check_strength(new_password)?;

        identity.password_hash = self.hash(new_password.to_string()).await?;
        self.store.save(&identity).await?;
        info!(user_id, "Password changed");
        Ok(())
    }

    /// Issue a reset token for an active handle
    ///
    /// Unknown and inactive handles yield `Ok(None)` so callers cannot enumerate
    /// which accounts exist.
    pub async fn reset_password(&self, email: &str) -> Result<Option<IssuedToken>, AuthError> {
        let identity = match self.store.find_by_handle(email).await? {
            Some(identity) if identity.is_active => identity,
            _ => {
                debug!("Password reset requested for unknown or inactive handle");
                return Ok(None);
            }
        };

        let token = self.tokens.issue_reset(identity.id, &identity.email)?;
        info!(user_id = identity.id, "Password reset token issued");
        Ok(Some(token))
    }

    pub async fn verify_reset_token(&self, token: &str) -> Result<IdentityProfile, AuthError> {
        let claims = self
            .tokens
            .validate_reset(token)
            .map_err(|_| AuthError::InvalidOrExpiredResetToken)?;

        match self.store.find_by_id(claims.user_id).await? {
            Some(identity) if identity.is_active => Ok(identity.profile()),
            _ => Err(AuthError::InvalidOrExpiredResetToken),
        }
    }

    /// Replace an identity's password without the old one
    pub async fn update_password(&self, user_id: i32, new_password: &str) -> Result<(), AuthError> {
        check_strength(new_password)?;

        let mut identity = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        identity.password_hash = self.hash(new_password.to_string()).await?;
        self.store.save(&identity).await?;
        info!(user_id, "Password updated");
        Ok(())
    }

    /// Verify a reset token and set the new password in one step
    pub async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let profile = self.verify_reset_token(token).await?;
        self.update_password(profile.id, new_password).await
    }

    async fn active_identity(&self, user_id: i32) -> Result<Identity, AuthError> {
        let identity = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !identity.is_active {
            return Err(AuthError::Deactivated);
        }
        Ok(identity)
    }

    async fn dummy_hash(&self) -> Result<String, AuthError> {
        self.dummy_hash
            .get_or_try_init(|| self.hash(DUMMY_SECRET.to_string()))
            .await
            .cloned()
    }

    async fn hash(&self, secret: String) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let hashed = tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| AuthError::HashingFailure(e.to_string()))??;
        Ok(hashed)
    }

    async fn verify(&self, hashed: String, secret: String) -> Result<bool, AuthError> {
        #[cfg(test)]
        self.verify_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.verify(&hashed, &secret))
            .await
            .map_err(|e| AuthError::HashingFailure(e.to_string()))
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("hasher", &self.hasher)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

fn check_strength(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

async fn with_deadline<T>(
    deadline: Duration,
    fut: impl Future<Output = Result<T, AuthError>>,
) -> Result<T, AuthError> {
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| AuthError::Timeout)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCredentialStore;
    use crate::password::HashParams;

    const DEADLINE: Duration = Duration::from_secs(30);

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(MemoryCredentialStore::new()),
            PasswordHasher::new(HashParams::low_cost()).unwrap(),
            Arc::new(TokenService::new(b"unit-test-secret")),
        )
    }

    #[test]
    fn test_check_strength_counts_characters() {
        assert!(check_strength("12345").is_err());
        assert!(check_strength("123456").is_ok());
        // six characters, more than six bytes
        assert!(check_strength("éééééé").is_ok());
    }

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            AuthError::from(StoreError::Duplicate),
            AuthError::DuplicateHandle
        ));
        assert!(matches!(
            AuthError::from(StoreError::Backend("down".into())),
            AuthError::Storage(_)
        ));
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let auth = service();
        let profile = auth
            .register("desk@clinic.test", "secret1", "Desk", "front-desk", DEADLINE)
            .await
            .unwrap();
        assert!(profile.is_active);
        assert_eq!(profile.role, Role::FrontDesk);

        let (token, user) = auth
            .login("desk@clinic.test", "secret1", DEADLINE)
            .await
            .unwrap();
        assert_eq!(user.id, profile.id);

        let claims = auth.tokens().validate_session(&token.token).unwrap();
        assert_eq!(claims.user_id, profile.id);
        assert_eq!(claims.role, Role::FrontDesk);
    }

    #[tokio::test]
    async fn test_dummy_hash_computed_once() {
        let auth = service();
        let first = auth.dummy_hash().await.unwrap();
        let second = auth.dummy_hash().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_every_login_outcome_runs_one_verify() {
        use std::sync::atomic::Ordering;

        let auth = service();
        let id = auth
            .register("doc@clinic.test", "secret1", "Doc", "clinician", DEADLINE)
            .await
            .unwrap()
            .id;
        let mut identity = auth.store.find_by_id(id).await.unwrap().unwrap();
        identity.is_active = false;
        auth.store.save(&identity).await.unwrap();

        for (email, password) in [
            ("doc@clinic.test", "secret1"),
            ("doc@clinic.test", "wrong-secret"),
            ("ghost@clinic.test", "secret1"),
        ] {
            let before = auth.verify_calls.load(Ordering::SeqCst);
            let result = auth.login(email, password, DEADLINE).await;

            assert!(matches!(result, Err(AuthError::InvalidCredentials)));
            assert_eq!(auth.verify_calls.load(Ordering::SeqCst) - before, 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapses() {
        let result: Result<(), AuthError> = with_deadline(Duration::from_millis(5), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(AuthError::Timeout)));
    }
}
