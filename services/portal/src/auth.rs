//! Account registration and sign-in against the credential store

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use chrono::Utc;
use common::credentials::{Account, CredentialStore};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::AuthError;
use crate::validation::{sanitize_input, validate_email, validate_password, validate_username};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    // Serializes read-modify-write cycles on the store within this process.
    // Never held across password hashing.
    write_lock: Arc<Mutex<()>>,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Register a new account
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<Account, AuthError> {
        let username = sanitize_input(username);
        let email = sanitize_input(email);

        validate_username(&username)?;
        validate_email(&email)?;
        validate_password(password)?;

        if self.store.load().await?.contains_key(&username) {
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = hash_password(password).await?;

        let _guard = self.write_lock.lock().await;
        let mut accounts = self.store.load().await?;
        // Checked again, another registration may have won the race
        if accounts.contains_key(&username) {
            return Err(AuthError::UsernameTaken);
        }

        info!("Creating new account: {}", username);

        let account = Account::new(username.clone(), password_hash, email);
        accounts.insert(username, account.clone());
        self.store.save(&accounts).await?;

        Ok(account)
    }

    /// Check a username/password pair, recording the sign-in time on success
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        let username = sanitize_input(username);

        let Some(account) = self.store.load().await?.remove(&username) else {
            info!("Sign-in rejected for unknown user");
            return Ok(false);
        };

        if !verify_password(&account.password_hash, password).await? {
            info!("Sign-in rejected for user: {}", username);
            return Ok(false);
        }

        let _guard = self.write_lock.lock().await;
        let mut accounts = self.store.load().await?;
        if let Some(account) = accounts.get_mut(&username) {
            account.last_login = Some(Utc::now());
            self.store.save(&accounts).await?;
        }

        info!("User signed in: {}", username);
        Ok(true)
    }

    /// Replace the password of `username` after checking the current one
    pub async fn change_password(
        &self,
        username: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let verified_hash = self
            .store
            .load()
            .await?
            .remove(username)
            .map(|account| account.password_hash)
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&verified_hash, current_password).await? {
            return Err(AuthError::InvalidCredentials);
        }

        validate_password(new_password)?;
        let new_hash = hash_password(new_password).await?;

        let _guard = self.write_lock.lock().await;
        let mut accounts = self.store.load().await?;
        let account = accounts
            .get_mut(username)
            .filter(|account| account.password_hash == verified_hash)
            .ok_or(AuthError::InvalidCredentials)?;

        account.password_hash = new_hash;
        self.store.save(&accounts).await?;

        info!("Password changed for user: {}", username);
        Ok(())
    }
}

/// Hash a password with a fresh random salt on the blocking pool
async fn hash_password(password: &str) -> Result<String, AuthError> {
    let password = password.to_owned();

    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut rand::thread_rng());
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| AuthError::Hashing(e.to_string()))?
}

/// Verify a password against a stored hash on the blocking pool. An
/// unparseable hash never verifies.
async fn verify_password(stored_hash: &str, password: &str) -> Result<bool, AuthError> {
    let stored_hash = stored_hash.to_owned();
    let password = password.to_owned();

    tokio::task::spawn_blocking(move || {
        let parsed_hash = match PasswordHash::new(&stored_hash) {
            Ok(hash) => hash,
            Err(e) => {
                warn!("Stored password hash could not be parsed: {}", e);
                return false;
            }
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    })
    .await
    .map_err(|e| AuthError::Hashing(e.to_string()))
}
