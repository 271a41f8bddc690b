//! MySQL-backed account repository over the shared `db` pool.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use db::DbPool;
use error::DatabaseError;

use crate::models::{Account, NewAccount};
use crate::repository::{AccountRepository, AdminGuarded};

const SELECT_COLUMNS: &str =
    "SELECT id, username, email, password_hash, is_admin, active, created_at, last_login FROM `user`";

/// Column layout of the `user` table.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: i64,
    username: String,
    email: Option<String>,
    password_hash: String,
    is_admin: Option<bool>,
    active: Option<bool>,
    created_at: Option<NaiveDateTime>,
    last_login: Option<NaiveDateTime>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            // Column defaults of the table when the value was never written.
            is_admin: row.is_admin.unwrap_or(false),
            active: row.active.unwrap_or(true),
            created_at: row.created_at.map(|t| t.and_utc()),
            last_login: row.last_login.map(|t| t.and_utc()),
        }
    }
}

fn map_err(e: sqlx::Error) -> DatabaseError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            DatabaseError::DuplicateEntry(db_err.message().to_string())
        }
        sqlx::Error::RowNotFound => DatabaseError::NotFound,
        _ => {
            tracing::error!("Account query failed: {}", e);
            DatabaseError::QueryFailed(e.to_string())
        }
    }
}

/// Account repository on a MySQL pool
pub struct MySqlAccountRepository {
    pool: DbPool,
}

impl MySqlAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create the `user` table when it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS `user` (
                id INTEGER NOT NULL AUTO_INCREMENT,
                username VARCHAR(80) NOT NULL,
                email VARCHAR(120) NULL,
                password_hash VARCHAR(255) NOT NULL,
                is_admin BOOLEAN DEFAULT FALSE,
                active BOOLEAN DEFAULT TRUE,
                created_at DATETIME NULL,
                last_login DATETIME NULL,
                PRIMARY KEY (id),
                UNIQUE KEY uq_user_username (username),
                UNIQUE KEY uq_user_email (email)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(map_err)?;

        tracing::info!("Account table ready");
        Ok(())
    }

    async fn fetch_one_where(
        &self,
        clause: &str,
        bind: impl Into<BindValue>,
    ) -> Result<Option<Account>, DatabaseError> {
        let sql = format!("{SELECT_COLUMNS} WHERE {clause} LIMIT 1");
        let query = sqlx::query_as::<_, AccountRow>(&sql);
        let query = match bind.into() {
            BindValue::Int(v) => query.bind(v),
            BindValue::Text(v) => query.bind(v),
        };
        let row = query.fetch_optional(&self.pool).await.map_err(map_err)?;
        Ok(row.map(Account::from))
    }
}

/// Locks every admin row plus the target row for the rest of the transaction
/// and reports whether the target currently holds the admin flag and whether
/// it is the only admin.
async fn lock_admin_rows(
    tx: &mut sqlx::Transaction<'_, sqlx::MySql>,
    id: i64,
) -> Result<Option<(bool, bool)>, DatabaseError> {
    let admin_ids: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM `user` WHERE is_admin = TRUE FOR UPDATE")
            .fetch_all(&mut **tx)
            .await
            .map_err(map_err)?;

    let target: Option<Option<bool>> =
        sqlx::query_scalar("SELECT is_admin FROM `user` WHERE id = ? FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_err)?;

    Ok(target.map(|is_admin| {
        let is_admin = is_admin.unwrap_or(false);
        (is_admin, is_admin && admin_ids.len() <= 1)
    }))
}

enum BindValue {
    Int(i64),
    Text(String),
}

impl From<i64> for BindValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for BindValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

#[async_trait]
impl AccountRepository for MySqlAccountRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, DatabaseError> {
        self.fetch_one_where("id = ?", id).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, DatabaseError> {
        self.fetch_one_where("username = ?", username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DatabaseError> {
        self.fetch_one_where("email = ?", email).await
    }

    async fn list(&self) -> Result<Vec<Account>, DatabaseError> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY id");
        let rows = sqlx::query_as::<_, AccountRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(rows.into_iter().map(Account::from).collect())
    }

    async fn create(&self, account: &NewAccount) -> Result<Account, DatabaseError> {
        let now = chrono::Utc::now().naive_utc();
        let result = sqlx::query(
            "INSERT INTO `user` (username, email, password_hash, is_admin, active, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.is_admin)
        .bind(account.active)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;

        let id = result.last_insert_id() as i64;
        self.find_by_id(id).await?.ok_or(DatabaseError::NotFound)
    }

    async fn update(&self, account: &Account) -> Result<Account, DatabaseError> {
        sqlx::query(
            "UPDATE `user` SET username = ?, email = ?, password_hash = ?, \
             active = ?, last_login = ? WHERE id = ?",
        )
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.active)
        .bind(account.last_login.map(|t| t.naive_utc()))
        .bind(account.id)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;

        // MySQL reports zero affected rows for no-op updates, so existence is
        // checked by reading the row back.
        self.find_by_id(account.id).await?.ok_or(DatabaseError::NotFound)
    }

    async fn update_unless_last_admin(
        &self,
        account: &Account,
    ) -> Result<AdminGuarded<Account>, DatabaseError> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        let (is_admin, sole_admin) = lock_admin_rows(&mut tx, account.id)
            .await?
            .ok_or(DatabaseError::NotFound)?;
        if is_admin && !account.is_admin && sole_admin {
            tx.rollback().await.map_err(map_err)?;
            return Ok(AdminGuarded::LastAdmin);
        }

        sqlx::query(
            "UPDATE `user` SET username = ?, email = ?, password_hash = ?, is_admin = ?, \
             active = ?, last_login = ? WHERE id = ?",
        )
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.is_admin)
        .bind(account.active)
        .bind(account.last_login.map(|t| t.naive_utc()))
        .bind(account.id)
        .execute(&mut *tx)
        .await
        .map_err(map_err)?;
        tx.commit().await.map_err(map_err)?;

        let updated = self.find_by_id(account.id).await?.ok_or(DatabaseError::NotFound)?;
        Ok(AdminGuarded::Applied(updated))
    }

    async fn delete_unless_last_admin(&self, id: i64) -> Result<AdminGuarded<()>, DatabaseError> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        let (_, sole_admin) = lock_admin_rows(&mut tx, id)
            .await?
            .ok_or(DatabaseError::NotFound)?;
        if sole_admin {
            tx.rollback().await.map_err(map_err)?;
            return Ok(AdminGuarded::LastAdmin);
        }

        sqlx::query("DELETE FROM `user` WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
        tx.commit().await.map_err(map_err)?;
        Ok(AdminGuarded::Applied(()))
    }

    async fn count(&self) -> Result<u64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM `user`")
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(count as u64)
    }

    async fn count_admins(&self) -> Result<u64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM `user` WHERE is_admin = TRUE")
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(count as u64)
    }
}
