use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    error::StoreError,
    repo_types::{NewUser, User, UserChanges, UserPage},
};

/// Persistence operations the user service relies on.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// A row whose email or phone number matches. A row matching the email
    /// is returned ahead of one that only matches the phone number.
    async fn find_by_email_or_phone(
        &self,
        email: &str,
        phonenumber: &str,
    ) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn id_exists(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Newest first.
    async fn list(&self, limit: i64, offset: i64) -> Result<UserPage, StoreError>;

    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    /// Returns `None` when the row is gone.
    async fn update(
        &self,
        id: Uuid,
        changes: &UserChanges,
        updated_at: i64,
    ) -> Result<Option<User>, StoreError>;

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        updated_at: i64,
    ) -> Result<bool, StoreError>;

    /// Hard delete. Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

const USER_COLUMNS: &str =
    "id, name, email, phonenumber, password, role, status, created_at, updated_at";

/// `users` table in Postgres.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email_or_phone(
        &self,
        email: &str,
        phonenumber: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE email = $1 OR phonenumber = $2
            ORDER BY (email = $1) DESC
            LIMIT 1
            "#
        ))
        .bind(email)
        .bind(phonenumber)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn id_exists(&self, id: Uuid) -> Result<bool, StoreError> {
        let found = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)"#,
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        Ok(found)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<UserPage, StoreError> {
        // count and page must come from the same snapshot
        let mut tx = self.db.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;
        let total = sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM users"#)
            .fetch_one(&mut *tx)
            .await?;
        let rows = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            ORDER BY created_at DESC, id
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(UserPage { total, rows })
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, name, email, phonenumber, password, role, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phonenumber)
        .bind(&user.password_hash)
        .bind(&user.role)
        .bind(user.status.as_str())
        .bind(user.created_at)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &UserChanges,
        updated_at: i64,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET name        = COALESCE($2, name),
                   email       = COALESCE($3, email),
                   phonenumber = COALESCE($4, phonenumber),
                   role        = COALESCE($5, role),
                   updated_at  = $6
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.phonenumber.as_deref())
        .bind(changes.role.as_deref())
        .bind(updated_at)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        updated_at: i64,
    ) -> Result<bool, StoreError> {
        let done = sqlx::query(r#"UPDATE users SET password = $2, updated_at = $3 WHERE id = $1"#)
            .bind(id)
            .bind(password_hash)
            .bind(updated_at)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let done = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}
