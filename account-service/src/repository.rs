//! Account repository
//!
//! Storage operations for accounts. The service receives the repository as an
//! injected trait object; nothing here is a process-wide global.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use error::DatabaseError;
use tokio::sync::RwLock;

use crate::models::{Account, NewAccount};

/// Outcome of a write that must leave at least one administrator in place
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminGuarded<T> {
    /// The write went through
    Applied(T),
    /// Refused: the account is the only remaining administrator
    LastAdmin,
}

/// Account repository trait for storage operations
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Find an account by id
    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, DatabaseError>;

    /// Find an account by username
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, DatabaseError>;

    /// Find an account by stored email
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DatabaseError>;

    /// All accounts ordered by id
    async fn list(&self) -> Result<Vec<Account>, DatabaseError>;

    /// Insert a new account
    async fn create(&self, account: &NewAccount) -> Result<Account, DatabaseError>;

    /// Overwrite the mutable columns of an existing account, leaving the
    /// stored admin flag as it is
    async fn update(&self, account: &Account) -> Result<Account, DatabaseError>;

    /// Overwrite every mutable column, including the admin flag, unless that
    /// would demote the last administrator
    ///
    /// The admin check and the write happen atomically.
    async fn update_unless_last_admin(
        &self,
        account: &Account,
    ) -> Result<AdminGuarded<Account>, DatabaseError>;

    /// Delete an account unless it is the last administrator
    ///
    /// The admin check and the delete happen atomically.
    async fn delete_unless_last_admin(&self, id: i64) -> Result<AdminGuarded<()>, DatabaseError>;

    /// Number of accounts
    async fn count(&self) -> Result<u64, DatabaseError>;

    /// Number of accounts with the admin flag set
    async fn count_admins(&self) -> Result<u64, DatabaseError>;
}

/// In-memory repository for testing and development
pub struct InMemoryAccountRepository {
    accounts: RwLock<Vec<Account>>,
    next_id: AtomicI64,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryAccountRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// Emulates the unique keys of the `user` table.
fn check_unique(
    accounts: &[Account],
    id: Option<i64>,
    username: &str,
    email: Option<&str>,
) -> Result<(), DatabaseError> {
    let others = accounts.iter().filter(|a| Some(a.id) != id);
    for other in others {
        if other.username == username {
            return Err(DatabaseError::DuplicateEntry(format!("username '{}'", username)));
        }
        if email.is_some() && other.email.as_deref() == email {
            return Err(DatabaseError::DuplicateEntry("email".to_string()));
        }
    }
    Ok(())
}

fn admin_count(accounts: &[Account]) -> usize {
    accounts.iter().filter(|a| a.is_admin).count()
}

fn apply_update(
    accounts: &mut [Account],
    account: &Account,
    admin_flag: bool,
) -> Result<Account, DatabaseError> {
    check_unique(accounts, Some(account.id), &account.username, account.email.as_deref())?;

    let existing = accounts
        .iter_mut()
        .find(|a| a.id == account.id)
        .ok_or(DatabaseError::NotFound)?;
    existing.username = account.username.clone();
    existing.email = account.email.clone();
    existing.password_hash = account.password_hash.clone();
    if admin_flag {
        existing.is_admin = account.is_admin;
    }
    existing.active = account.active;
    existing.last_login = account.last_login;
    Ok(existing.clone())
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, DatabaseError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, DatabaseError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.iter().find(|a| a.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DatabaseError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .iter()
            .find(|a| a.email.as_deref() == Some(email))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Account>, DatabaseError> {
        Ok(self.accounts.read().await.clone())
    }

    async fn create(&self, account: &NewAccount) -> Result<Account, DatabaseError> {
        let mut accounts = self.accounts.write().await;
        check_unique(&accounts, None, &account.username, account.email.as_deref())?;

        let created = Account {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            username: account.username.clone(),
            email: account.email.clone(),
            password_hash: account.password_hash.clone(),
            is_admin: account.is_admin,
            active: account.active,
            created_at: Some(chrono::Utc::now()),
            last_login: None,
        };
        accounts.push(created.clone());
        Ok(created)
    }

    async fn update(&self, account: &Account) -> Result<Account, DatabaseError> {
        let mut accounts = self.accounts.write().await;
        apply_update(&mut accounts, account, false)
    }

    async fn update_unless_last_admin(
        &self,
        account: &Account,
    ) -> Result<AdminGuarded<Account>, DatabaseError> {
        // One write guard covers the admin count and the write.
        let mut accounts = self.accounts.write().await;
        let current = accounts
            .iter()
            .find(|a| a.id == account.id)
            .ok_or(DatabaseError::NotFound)?;
        if current.is_admin && !account.is_admin && admin_count(&accounts) <= 1 {
            return Ok(AdminGuarded::LastAdmin);
        }
        apply_update(&mut accounts, account, true).map(AdminGuarded::Applied)
    }

    async fn delete_unless_last_admin(&self, id: i64) -> Result<AdminGuarded<()>, DatabaseError> {
        let mut accounts = self.accounts.write().await;
        let index = accounts
            .iter()
            .position(|a| a.id == id)
            .ok_or(DatabaseError::NotFound)?;
        if accounts[index].is_admin && admin_count(&accounts) <= 1 {
            return Ok(AdminGuarded::LastAdmin);
        }
        accounts.remove(index);
        Ok(AdminGuarded::Applied(()))
    }

    async fn count(&self) -> Result<u64, DatabaseError> {
        Ok(self.accounts.read().await.len() as u64)
    }

    async fn count_admins(&self) -> Result<u64, DatabaseError> {
        let accounts = self.accounts.read().await;
        Ok(admin_count(&accounts) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account(username: &str, is_admin: bool) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            email: None,
            password_hash: "hash".to_string(),
            is_admin,
            active: true,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = InMemoryAccountRepository::new();

        let created = repo.create(&new_account("jane", true)).await.unwrap();
        assert_eq!(created.id, 1);
        assert!(created.created_at.is_some());

        let found = repo.find_by_username("jane").await.unwrap();
        assert_eq!(found, Some(created.clone()));
        assert_eq!(repo.find_by_id(created.id).await.unwrap(), Some(created));
        assert_eq!(repo.find_by_id(99).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let repo = InMemoryAccountRepository::new();
        repo.create(&new_account("jane", true)).await.unwrap();

        let result = repo.create(&new_account("jane", false)).await;
        assert!(matches!(result, Err(DatabaseError::DuplicateEntry(_))));
    }

    #[tokio::test]
    async fn test_update() {
        let repo = InMemoryAccountRepository::new();
        let mut created = repo.create(&new_account("bob", false)).await.unwrap();
        created.is_admin = true;
        created.email = Some("bob@example.org".to_string());

        // The plain update never touches the admin flag.
        let updated = repo.update(&created).await.unwrap();
        assert!(!updated.is_admin);
        assert_eq!(updated.email.as_deref(), Some("bob@example.org"));

        let promoted = repo.update_unless_last_admin(&created).await.unwrap();
        assert!(matches!(promoted, AdminGuarded::Applied(ref a) if a.is_admin));
        assert_eq!(
            repo.find_by_email("bob@example.org").await.unwrap().map(|a| a.id),
            Some(created.id)
        );
    }

    #[tokio::test]
    async fn test_update_rejects_taken_username() {
        let repo = InMemoryAccountRepository::new();
        repo.create(&new_account("jane", true)).await.unwrap();
        let mut bob = repo.create(&new_account("bob", false)).await.unwrap();
        bob.username = "jane".to_string();

        let result = repo.update(&bob).await;
        assert!(matches!(result, Err(DatabaseError::DuplicateEntry(_))));
    }

    #[tokio::test]
    async fn test_delete_and_counts() {
        let repo = InMemoryAccountRepository::new();
        let jane = repo.create(&new_account("jane", true)).await.unwrap();
        let bob = repo.create(&new_account("bob", false)).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);
        assert_eq!(repo.count_admins().await.unwrap(), 1);

        assert_eq!(
            repo.delete_unless_last_admin(jane.id).await.unwrap(),
            AdminGuarded::LastAdmin
        );
        assert_eq!(
            repo.delete_unless_last_admin(bob.id).await.unwrap(),
            AdminGuarded::Applied(())
        );
        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(matches!(
            repo.delete_unless_last_admin(bob.id).await,
            Err(DatabaseError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_demote_guard() {
        let repo = InMemoryAccountRepository::new();
        let mut jane = repo.create(&new_account("jane", true)).await.unwrap();
        let mut mary = repo.create(&new_account("mary", true)).await.unwrap();

        jane.is_admin = false;
        assert!(matches!(
            repo.update_unless_last_admin(&jane).await.unwrap(),
            AdminGuarded::Applied(_)
        ));

        mary.is_admin = false;
        assert_eq!(
            repo.update_unless_last_admin(&mary).await.unwrap(),
            AdminGuarded::LastAdmin
        );
        assert_eq!(repo.count_admins().await.unwrap(), 1);

        // Other columns of the last admin can still change.
        mary.is_admin = true;
        mary.active = false;
        assert!(matches!(
            repo.update_unless_last_admin(&mary).await.unwrap(),
            AdminGuarded::Applied(ref a) if !a.active
        ));
    }
}
