use crate::error::AuthError;
use crate::models::Account;
use actix_web::web;
use bcrypt::{non_truncating_hash, non_truncating_verify};
use chrono::Utc;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tokio::sync::{Mutex, OnceCell};
use uuid::Uuid;

/// bcrypt only reads the first 72 bytes of its input.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// In-memory account store keyed by username.
///
/// Passwords are kept only as bcrypt hashes. Hashing runs on the blocking
/// pool, outside the lock.
pub struct AccountStore {
    users: Mutex<HashMap<String, Account>>,
    bcrypt_cost: u32,
    // Verified against for unknown usernames so a miss costs as much as a hit.
    dummy_hash: OnceCell<String>,
}

impl AccountStore {
    pub fn new(bcrypt_cost: u32) -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            bcrypt_cost,
            dummy_hash: OnceCell::new(),
        }
    }

    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_owned();
        let cost = self.bcrypt_cost;
        Ok(web::block(move || non_truncating_hash(password, cost)).await??)
    }

    async fn dummy_hash(&self) -> Result<&str, AuthError> {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| self.hash_password("trace-auth-dummy-password"))
            .await?;
        Ok(hash.as_str())
    }

    /// Create an account, failing with `DuplicateUser` if the name is taken.
    pub async fn add_user(
        &self,
        username: &str,
        password: &str,
        email: Option<String>,
    ) -> Result<Account, AuthError> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(AuthError::PasswordTooLong);
        }
        if self.users.lock().await.contains_key(username) {
            return Err(AuthError::DuplicateUser);
        }

        let hashed = self.hash_password(password).await?;

        let account = Account {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email,
            password_hash: hashed,
            created_at: Utc::now(),
        };

        // Re-checked under the lock: another registration may have won while hashing.
        match self.users.lock().await.entry(username.to_string()) {
            Entry::Occupied(_) => Err(AuthError::DuplicateUser),
            Entry::Vacant(slot) => Ok(slot.insert(account).clone()),
        }
    }

    /// Check a username/password pair. Unknown users and wrong passwords
    /// both yield `InvalidCredentials`, and both pay for one bcrypt verify.
    /// Passwords longer than bcrypt's input limit never match.
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Account, AuthError> {
        let account = self.users.lock().await.get(username).cloned();
        let stored = match &account {
            Some(account) => account.password_hash.clone(),
            None => self.dummy_hash().await?.to_owned(),
        };

        let password = password.to_owned();
        let matches =
            web::block(move || non_truncating_verify(password, &stored).unwrap_or(false)).await?;

        match account {
            Some(account) if matches => Ok(account),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.lock().await.is_empty()
    }
}
