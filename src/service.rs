//! Session token service
//!
//! Registration, login, refresh and logout on top of the account store and
//! the session registry. Handlers stay thin and delegate here.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::db::AccountStore;
use crate::error::AuthError;
use crate::models::{required, Identity, LoginRequest, RefreshRequest, RegisterRequest, TokenResponse};
use crate::sessions::SessionRegistry;

pub struct TokenService {
    accounts: AccountStore,
    sessions: Arc<SessionRegistry>,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        Self {
            accounts: AccountStore::new(config.bcrypt_cost),
            sessions: Arc::new(SessionRegistry::new(config.token_ttl, config.token_bytes)),
        }
    }

    /// The registry shared with the background sweeper.
    pub fn sessions(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.sessions)
    }

    pub fn accounts(&self) -> &AccountStore {
        &self.accounts
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<TokenResponse, AuthError> {
        let username = required(&request.username, "username")?.trim();
        let password = required(&request.password, "password")?;
        let email = request
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_owned);

        let account = match self.accounts.add_user(username, password, email).await {
            Ok(account) => account,
            Err(err) => {
                warn!(username, error = %err, "Registration rejected");
                return Err(err);
            }
        };
        info!(username, account_id = %account.id, "Account registered");

        let (token, session) = self.sessions.issue(&account.username).await;
        Ok(TokenResponse {
            token,
            expires_at: session.expires_at,
        })
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<TokenResponse, AuthError> {
        let username = required(&request.username, "username")?.trim();
        let password = required(&request.password, "password")?;

        let account = match self.accounts.verify_credentials(username, password).await {
            Ok(account) => account,
            Err(err) => {
                warn!(username, "Login failed");
                return Err(err);
            }
        };

        let (token, session) = self.sessions.issue(&account.username).await;
        info!(username, "Login succeeded");
        Ok(TokenResponse {
            token,
            expires_at: session.expires_at,
        })
    }

    pub async fn refresh(&self, request: &RefreshRequest) -> Result<TokenResponse, AuthError> {
        let old_token = required(&request.token, "token")?;

        let (token, session) = self.sessions.rotate(old_token).await.map_err(|err| {
            warn!("Refresh rejected for unknown or expired token");
            err
        })?;
        info!(username = %session.username, "Session token refreshed");
        Ok(TokenResponse {
            token,
            expires_at: session.expires_at,
        })
    }

    /// Resolve a presented token to the identity it was issued for.
    pub async fn authorize(&self, token: &str) -> Result<Identity, AuthError> {
        let session = self.sessions.validate(token).await?;
        Ok(Identity {
            username: session.username,
            token: token.to_string(),
        })
    }

    pub async fn logout(&self, identity: &Identity) -> Result<(), AuthError> {
        if self.sessions.revoke(&identity.token).await {
            info!(username = %identity.username, "Session revoked");
            Ok(())
        } else {
            Err(AuthError::InvalidToken)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MIN_BCRYPT_COST;
    use std::time::Duration;

    fn test_config() -> Config {
        Config {
            bcrypt_cost: MIN_BCRYPT_COST,
            ..Config::default()
        }
    }

    fn register_request(username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            email: None,
        }
    }

    fn login_request(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[actix_web::test]
    async fn test_register_issues_token() {
        let service = TokenService::new(&test_config());
        let response = service
            .register(&register_request("alice", "secret123"))
            .await
            .unwrap();

        let identity = service.authorize(&response.token).await.unwrap();
        assert_eq!(identity.username, "alice");
    }

    #[actix_web::test]
    async fn test_register_duplicate_user() {
        let service = TokenService::new(&test_config());
        service
            .register(&register_request("alice", "secret123"))
            .await
            .unwrap();

        let result = service.register(&register_request("alice", "secret123")).await;
        assert_eq!(result.unwrap_err(), AuthError::DuplicateUser);
    }

    #[actix_web::test]
    async fn test_register_missing_fields() {
        let service = TokenService::new(&test_config());

        let result = service.register(&RegisterRequest::default()).await;
        assert_eq!(result.unwrap_err(), AuthError::MissingField("username"));

        let request = RegisterRequest {
            username: Some("alice".into()),
            ..RegisterRequest::default()
        };
        let result = service.register(&request).await;
        assert_eq!(result.unwrap_err(), AuthError::MissingField("password"));
        assert!(service.accounts().is_empty().await);
    }

    #[actix_web::test]
    async fn test_login_wrong_password() {
        let service = TokenService::new(&test_config());
        service
            .register(&register_request("alice", "secret123"))
            .await
            .unwrap();

        let result = service.login(&login_request("alice", "wrong")).await;
        assert_eq!(result.unwrap_err(), AuthError::InvalidCredentials);

        let result = service.login(&login_request("mallory", "secret123")).await;
        assert_eq!(result.unwrap_err(), AuthError::InvalidCredentials);
    }

    #[actix_web::test]
    async fn test_login_keeps_prior_sessions() {
        let service = TokenService::new(&test_config());
        let registered = service
            .register(&register_request("alice", "secret123"))
            .await
            .unwrap();
        let logged_in = service
            .login(&login_request("alice", "secret123"))
            .await
            .unwrap();

        assert_ne!(registered.token, logged_in.token);
        assert!(service.authorize(&registered.token).await.is_ok());
        assert!(service.authorize(&logged_in.token).await.is_ok());
    }

    #[actix_web::test]
    async fn test_refresh_rotates_token() {
        let service = TokenService::new(&test_config());
        let login = service
            .register(&register_request("alice", "secret123"))
            .await
            .unwrap();

        let refreshed = service
            .refresh(&RefreshRequest {
                token: Some(login.token.clone()),
            })
            .await
            .unwrap();

        assert_ne!(login.token, refreshed.token);
        assert_eq!(
            service.authorize(&login.token).await.unwrap_err(),
            AuthError::InvalidToken
        );
        assert_eq!(
            service.authorize(&refreshed.token).await.unwrap().username,
            "alice"
        );
    }

    #[actix_web::test]
    async fn test_refresh_unknown_and_missing_token() {
        let service = TokenService::new(&test_config());

        let result = service
            .refresh(&RefreshRequest {
                token: Some("deadbeef".into()),
            })
            .await;
        assert_eq!(result.unwrap_err(), AuthError::InvalidToken);

        let result = service.refresh(&RefreshRequest::default()).await;
        assert_eq!(result.unwrap_err(), AuthError::MissingField("token"));
    }

    #[actix_web::test]
    async fn test_logout_revokes_token() {
        let service = TokenService::new(&test_config());
        let login = service
            .register(&register_request("alice", "secret123"))
            .await
            .unwrap();

        let identity = service.authorize(&login.token).await.unwrap();
        service.logout(&identity).await.unwrap();

        assert!(service.authorize(&login.token).await.is_err());
        assert_eq!(
            service.logout(&identity).await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[actix_web::test]
    async fn test_expired_token_is_rejected() {
        let config = Config {
            token_ttl: Duration::ZERO,
            ..test_config()
        };
        let service = TokenService::new(&config);
        let login = service
            .register(&register_request("alice", "secret123"))
            .await
            .unwrap();

        assert_eq!(
            service.authorize(&login.token).await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[actix_web::test]
    async fn test_username_surrounding_whitespace_ignored() {
        let service = TokenService::new(&test_config());
        service
            .register(&register_request("alice", "secret123"))
            .await
            .unwrap();

        let result = service.register(&register_request(" alice ", "secret123")).await;
        assert_eq!(result.unwrap_err(), AuthError::DuplicateUser);
        assert_eq!(service.accounts().len().await, 1);

        let login = service
            .login(&login_request("  alice", "secret123"))
            .await
            .unwrap();
        assert_eq!(
            service.authorize(&login.token).await.unwrap().username,
            "alice"
        );

        // Passwords are taken verbatim.
        let result = service.login(&login_request("alice", " secret123 ")).await;
        assert_eq!(result.unwrap_err(), AuthError::InvalidCredentials);
    }

    #[actix_web::test]
    async fn test_concurrent_register_single_winner() {
        let service = std::sync::Arc::new(TokenService::new(&test_config()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = std::sync::Arc::clone(&service);
                actix_web::rt::spawn(async move {
                    service.register(&register_request("bob", "secret123")).await
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(err) => assert_eq!(err, AuthError::DuplicateUser),
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(service.accounts().len().await, 1);
        assert_eq!(service.sessions().len().await, 1);
    }
}
