//! crates/docsum_core/src/access.rs
//!
//! The access gate: resolves a bearer token to the identity of an existing user.

use std::sync::Arc;
use tracing::debug;

use crate::domain::UserIdentity;
use crate::ports::{CredentialStore, PortError, TokenError, TokenService};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Access token required")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    /// Expired tokens are still invalid; the distinct variant lets clients prompt a re-login.
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid token - user not found")]
    UnknownUser,
    #[error("Failed to verify token: {0}")]
    Store(PortError),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => AuthError::InvalidToken,
            TokenError::Expired => AuthError::TokenExpired,
        }
    }
}

#[derive(Clone)]
pub struct AccessGate {
    tokens: Arc<dyn TokenService>,
    users: Arc<dyn CredentialStore>,
}

impl AccessGate {
    pub fn new(tokens: Arc<dyn TokenService>, users: Arc<dyn CredentialStore>) -> Self {
        Self { tokens, users }
    }

    /// Verifies `token` and loads the user it was issued for.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<UserIdentity, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let user_id = self.tokens.verify(token)?;

        match self.users.get_user_by_id(user_id).await {
            Ok(user) => Ok(UserIdentity::from(&user)),
            Err(PortError::NotFound(_)) => Err(AuthError::UnknownUser),
            Err(e) => Err(AuthError::Store(e)),
        }
    }

    /// Like [`authenticate`](Self::authenticate) but never fails: any error
    /// yields an anonymous caller.
    pub async fn authenticate_optional(&self, token: Option<&str>) -> Option<UserIdentity> {
        match self.authenticate(token).await {
            Ok(identity) => Some(identity),
            Err(e) => {
                debug!("Optional authentication fell back to anonymous: {}", e);
                None
            }
        }
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProfileUpdate, Role, User, UserCredentials};
    use crate::ports::PortResult;
    use async_trait::async_trait;
    use chrono::Utc;
    use uuid::Uuid;

    struct StaticTokens;

    impl TokenService for StaticTokens {
        fn issue(&self, user_id: Uuid) -> PortResult<String> {
            Ok(format!("valid:{}", user_id))
        }

        fn verify(&self, token: &str) -> Result<Uuid, TokenError> {
            if token == "expired" {
                return Err(TokenError::Expired);
            }
            token
                .strip_prefix("valid:")
                .and_then(|id| Uuid::parse_str(id).ok())
                .ok_or(TokenError::Invalid)
        }
    }

    struct OneUser(User);

    #[async_trait]
    impl CredentialStore for OneUser {
        async fn create_user(&self, _: &str, _: &str, _: &str) -> PortResult<User> {
            unimplemented!()
        }

        async fn get_user_by_email(&self, _: &str) -> PortResult<UserCredentials> {
            unimplemented!()
        }

        async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
            if user_id == self.0.id {
                Ok(self.0.clone())
            } else {
                Err(PortError::NotFound(format!("User {} not found", user_id)))
            }
        }

        async fn update_user(&self, _: Uuid, _: ProfileUpdate) -> PortResult<User> {
            unimplemented!()
        }
    }

    fn gate() -> (AccessGate, User) {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            role: Role::User,
            created_at: now,
            updated_at: now,
        };
        let gate = AccessGate::new(Arc::new(StaticTokens), Arc::new(OneUser(user.clone())));
        (gate, user)
    }

    #[tokio::test]
    async fn valid_token_resolves_identity() {
        let (gate, user) = gate();
        let token = format!("valid:{}", user.id);
        let identity = gate.authenticate(Some(&token)).await.unwrap();
        assert_eq!(identity.user_id, user.id);
        assert_eq!(identity.email, user.email);
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let (gate, _) = gate();
        assert!(matches!(gate.authenticate(None).await, Err(AuthError::MissingToken)));
        assert!(matches!(gate.authenticate(Some("  ")).await, Err(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn bad_and_expired_tokens_are_distinct() {
        let (gate, _) = gate();
        assert!(matches!(gate.authenticate(Some("garbage")).await, Err(AuthError::InvalidToken)));
        assert!(matches!(gate.authenticate(Some("expired")).await, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn token_for_deleted_user_is_rejected() {
        let (gate, _) = gate();
        let token = format!("valid:{}", Uuid::new_v4());
        assert!(matches!(gate.authenticate(Some(&token)).await, Err(AuthError::UnknownUser)));
    }

    #[tokio::test]
    async fn optional_authentication_never_fails() {
        let (gate, user) = gate();
        assert!(gate.authenticate_optional(None).await.is_none());
        assert!(gate.authenticate_optional(Some("expired")).await.is_none());
        let token = format!("valid:{}", user.id);
        assert_eq!(gate.authenticate_optional(Some(&token)).await.unwrap().user_id, user.id);
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
    }
}
