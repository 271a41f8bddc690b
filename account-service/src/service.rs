//! Account service
//!
//! Business logic for registration, login, profiles and account management.
//! Authorization of the management operations happens before they are called;
//! this layer only enforces account invariants.

use std::sync::Arc;

use auth::{issue_token, validate_username, Identity, JwtConfig};
use error::{AppError, AuthError, DatabaseError};

use crate::models::{
    Account, AccountChanges, CreateAccount, NewAccount, ProfileChanges, MAX_USERNAME_LEN,
};
use crate::password::{hash_password_blocking, needs_rehash, verify_password_blocking};
use crate::repository::{AccountRepository, AdminGuarded, InMemoryAccountRepository};

/// Domain used for accounts without a stored email.
pub const DEFAULT_EMAIL_DOMAIN: &str = "dciukajuki.org";

/// Successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub account: Account,
    pub access_token: String,
}

/// Account service for business operations
#[derive(Clone)]
pub struct AccountService {
    repository: Arc<dyn AccountRepository>,
    jwt: JwtConfig,
    email_domain: String,
}

fn check_username(username: &str) -> Result<(), AppError> {
    if username.trim().is_empty() {
        return Err(AppError::Validation("Name/username is required".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::Validation(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }
    // Usernames travel inside identity subjects.
    validate_username(username)
        .map_err(|_| AppError::Validation("Username must not contain ':'".to_string()))
}

fn check_password(password: &str) -> Result<(), AppError> {
    if password.is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }
    Ok(())
}

fn not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

/// Storage conflicts surface as the messages the admin interface expects.
fn conflict(err: DatabaseError, what: &str) -> AppError {
    match err {
        DatabaseError::DuplicateEntry(_) => AppError::Conflict(format!("{} already exists", what)),
        DatabaseError::NotFound => not_found(),
        other => other.into(),
    }
}

impl AccountService {
    /// Create a service over an injected repository
    pub fn new(repository: Arc<dyn AccountRepository>, jwt: JwtConfig) -> Self {
        Self {
            repository,
            jwt,
            email_domain: DEFAULT_EMAIL_DOMAIN.to_string(),
        }
    }

    /// Create a service with an in-memory repository
    pub fn in_memory(jwt: JwtConfig) -> Self {
        Self::new(Arc::new(InMemoryAccountRepository::new()), jwt)
    }

    pub fn with_email_domain(mut self, domain: impl Into<String>) -> Self {
        self.email_domain = domain.into();
        self
    }

    pub fn email_domain(&self) -> &str {
        &self.email_domain
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt
    }

    /// Whether any account exists yet
    pub async fn has_accounts(&self) -> Result<bool, AppError> {
        Ok(self.repository.count().await? > 0)
    }

    /// Register a new administrator
    pub async fn register(&self, username: &str, password: &str) -> Result<Account, AppError> {
        check_username(username)?;
        check_password(password)?;

        if self.repository.find_by_username(username).await?.is_some() {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let password_hash = hash_password_blocking(password.to_string()).await?;
        let account = self
            .repository
            .create(&NewAccount {
                username: username.to_string(),
                email: None,
                password_hash,
                is_admin: true,
                active: true,
            })
            .await
            .map_err(|e| conflict(e, "Username"))?;

        tracing::info!(user_id = account.id, username = %account.username, "Administrator registered");
        Ok(account)
    }

    /// Verify credentials and issue a token from the account's current admin flag
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AppError> {
        let account = match self.repository.find_by_username(username).await? {
            Some(account) => account,
            None => {
                tracing::info!(username = %username, "Login failed: unknown username");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        let matches =
            verify_password_blocking(password.to_string(), account.password_hash.clone()).await?;
        if !matches {
            tracing::info!(user_id = account.id, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        if !account.active {
            tracing::info!(user_id = account.id, "Login refused: account disabled");
            return Err(AuthError::AccountDisabled.into());
        }

        let mut account = account;
        if needs_rehash(&account.password_hash) {
            account.password_hash = hash_password_blocking(password.to_string()).await?;
            tracing::info!(user_id = account.id, "Legacy password hash upgraded to Argon2id");
        }
        account.last_login = Some(chrono::Utc::now());
        let account = self.repository.update(&account).await?;

        let access_token = issue_token(&account.identity(), &self.jwt)?;
        tracing::info!(user_id = account.id, is_admin = account.is_admin, "Login succeeded");

        Ok(LoginOutcome {
            account,
            access_token,
        })
    }

    /// Load the caller's own account
    pub async fn profile(&self, identity: &Identity) -> Result<Account, AppError> {
        self.repository
            .find_by_id(identity.user_id)
            .await?
            .ok_or_else(not_found)
    }

    /// Update the caller's username and email
    ///
    /// Empty values are ignored. `last_login` is stamped on every update.
    pub async fn update_profile(
        &self,
        identity: &Identity,
        changes: ProfileChanges,
    ) -> Result<Account, AppError> {
        let mut account = self.profile(identity).await?;

        if let Some(username) = changes.username.filter(|u| !u.is_empty()) {
            check_username(&username)?;
            if let Some(existing) = self.repository.find_by_username(&username).await? {
                if existing.id != account.id {
                    return Err(AppError::Conflict("Username already exists".to_string()));
                }
            }
            account.username = username;
        }

        if let Some(email) = changes.email.filter(|e| !e.is_empty()) {
            if let Some(existing) = self.repository.find_by_email(&email).await? {
                if existing.id != account.id {
                    return Err(AppError::Conflict("Email already exists".to_string()));
                }
            }
            account.email = Some(email);
        }

        account.last_login = Some(chrono::Utc::now());
        self.repository
            .update(&account)
            .await
            .map_err(|e| conflict(e, "Username or email"))
    }

    /// All accounts
    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.repository.list().await?)
    }

    /// Create an account from the admin interface
    pub async fn create_account(&self, request: CreateAccount) -> Result<Account, AppError> {
        check_username(&request.username)?;
        check_password(&request.password)?;

        if self.repository.find_by_username(&request.username).await?.is_some() {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let password_hash = hash_password_blocking(request.password).await?;
        let account = self
            .repository
            .create(&NewAccount {
                username: request.username,
                email: None,
                password_hash,
                is_admin: request.is_admin,
                active: request.active,
            })
            .await
            .map_err(|e| conflict(e, "Username"))?;

        tracing::info!(user_id = account.id, is_admin = account.is_admin, "Account created");
        Ok(account)
    }

    /// Apply a partial update from the admin interface
    ///
    /// Revoking admin here does not touch tokens already issued to the
    /// account; they keep their admin flag until a new token is issued.
    pub async fn update_account(&self, id: i64, changes: AccountChanges) -> Result<Account, AppError> {
        let mut account = self.repository.find_by_id(id).await?.ok_or_else(not_found)?;

        if let Some(username) = changes.username {
            check_username(&username)?;
            if let Some(existing) = self.repository.find_by_username(&username).await? {
                if existing.id != id {
                    return Err(AppError::Conflict("Username already exists".to_string()));
                }
            }
            account.username = username;
        }

        if let Some(is_admin) = changes.is_admin {
            account.is_admin = is_admin;
        }

        if let Some(active) = changes.active {
            account.active = active;
        }

        if let Some(password) = changes.password.filter(|p| !p.is_empty()) {
            account.password_hash = hash_password_blocking(password).await?;
        }

        let account = match self
            .repository
            .update_unless_last_admin(&account)
            .await
            .map_err(|e| conflict(e, "Username"))?
        {
            AdminGuarded::Applied(account) => account,
            AdminGuarded::LastAdmin => {
                return Err(AppError::Validation(
                    "Cannot demote the last admin user".to_string(),
                ))
            }
        };
        tracing::info!(user_id = account.id, is_admin = account.is_admin, "Account updated");
        Ok(account)
    }

    /// Delete an account, refusing to remove the last administrator
    pub async fn delete_account(&self, id: i64) -> Result<(), AppError> {
        let outcome = self
            .repository
            .delete_unless_last_admin(id)
            .await
            .map_err(|e| conflict(e, "User"))?;
        if outcome == AdminGuarded::LastAdmin {
            return Err(AppError::Validation(
                "Cannot delete the last admin user".to_string(),
            ));
        }
        tracing::info!(user_id = id, "Account deleted");
        Ok(())
    }

    /// Flip the active flag of an account
    pub async fn toggle_status(&self, id: i64) -> Result<Account, AppError> {
        let mut account = self.repository.find_by_id(id).await?.ok_or_else(not_found)?;
        account.active = !account.active;

        let account = self.repository.update(&account).await.map_err(|e| conflict(e, "User"))?;
        tracing::info!(user_id = account.id, active = account.active, "Account status toggled");
        Ok(account)
    }
}
