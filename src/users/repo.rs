use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use super::repo_types::{BannedRelation, NewUser, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Entry point to the record store. Every operation runs inside a
/// [`UserTx`]; dropping one without calling [`UserTx::commit`] rolls it back.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UserTx>, StoreError>;
}

/// One unit of work against users and ban relations.
///
/// Reads only ever see active (not soft-deleted) rows.
#[async_trait]
pub trait UserTx: Send {
    async fn insert_user(&mut self, user: NewUser) -> Result<User, StoreError>;
    async fn find_active(&mut self, id: i64) -> Result<Option<User>, StoreError>;
    async fn find_active_by_login(&mut self, login: &str) -> Result<Option<User>, StoreError>;
    /// Logins containing `fragment`, optionally only discoverable ones.
    async fn search_login(
        &mut self,
        fragment: &str,
        visible_only: bool,
    ) -> Result<Vec<User>, StoreError>;
    async fn list_active(&mut self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError>;
    async fn count_active(&mut self) -> Result<i64, StoreError>;
    async fn update_flags(
        &mut self,
        id: i64,
        find_vision: bool,
        add_friend: bool,
    ) -> Result<Option<User>, StoreError>;
    /// Returns false when there was no active user to delete.
    async fn soft_delete(&mut self, id: i64) -> Result<bool, StoreError>;
    /// Appends `friend_id` unless already present.
    async fn add_friend(&mut self, user_id: i64, friend_id: i64) -> Result<(), StoreError>;
    async fn remove_friend(&mut self, user_id: i64, friend_id: i64) -> Result<(), StoreError>;
    async fn find_ban(
        &mut self,
        user_id: i64,
        banned_user_id: i64,
    ) -> Result<Option<BannedRelation>, StoreError>;
    /// Creates the relation, or revives a soft-deleted one.
    async fn upsert_ban(&mut self, user_id: i64, banned_user_id: i64) -> Result<(), StoreError>;
    async fn lift_ban(&mut self, user_id: i64, banned_user_id: i64) -> Result<(), StoreError>;
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Escape LIKE metacharacters so `fragment` matches literally.
pub(crate) fn like_escape(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

struct PgUserTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn begin(&self) -> Result<Box<dyn UserTx>, StoreError> {
        let tx = self.pool.begin().await.context("begin tx")?;
        Ok(Box::new(PgUserTx { tx }))
    }
}

#[async_trait]
impl UserTx for PgUserTx {
    async fn insert_user(&mut self, user: NewUser) -> Result<User, StoreError> {
        let res = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (login, email, password_hash, secret_word_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&user.login)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.secret_word_hash)
        .bind(i16::from(user.role))
        .fetch_one(&mut *self.tx)
        .await;

        match res {
            Ok(u) => Ok(u),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::Conflict("login already taken".into()))
            }
            Err(e) => Err(anyhow::Error::new(e).context("insert user").into()),
        }
    }

    async fn find_active(&mut self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL"#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn find_active_by_login(&mut self, login: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT * FROM users WHERE login = $1 AND deleted_at IS NULL"#,
        )
        .bind(login)
        .fetch_optional(&mut *self.tx)
        .await
        .context("find user by login")?;
        Ok(user)
    }

    async fn search_login(
        &mut self,
        fragment: &str,
        visible_only: bool,
    ) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
             WHERE deleted_at IS NULL
               AND login LIKE '%' || $1 || '%' ESCAPE '\'
               AND (NOT $2 OR find_vision)
             ORDER BY id
            "#,
        )
        .bind(like_escape(fragment))
        .bind(visible_only)
        .fetch_all(&mut *self.tx)
        .await
        .context("search users by login")?;
        Ok(rows)
    }

    async fn list_active(&mut self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
             WHERE deleted_at IS NULL
             ORDER BY id
             LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await
        .context("list users")?;
        Ok(rows)
    }

    async fn count_active(&mut self) -> Result<i64, StoreError> {
        let n = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM users WHERE deleted_at IS NULL"#,
        )
        .fetch_one(&mut *self.tx)
        .await
        .context("count users")?;
        Ok(n)
    }

    async fn update_flags(
        &mut self,
        id: i64,
        find_vision: bool,
        add_friend: bool,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET find_vision = $2,
                   add_friend = $3
             WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(find_vision)
        .bind(add_friend)
        .fetch_optional(&mut *self.tx)
        .await
        .context("update user flags")?;
        Ok(user)
    }

    async fn soft_delete(&mut self, id: i64) -> Result<bool, StoreError> {
        let res = sqlx::query(
            r#"UPDATE users SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL"#,
        )
        .bind(id)
        .execute(&mut *self.tx)
        .await
        .context("soft delete user")?;
        Ok(res.rows_affected() > 0)
    }

    async fn add_friend(&mut self, user_id: i64, friend_id: i64) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
               SET friends = array_append(friends, $2)
             WHERE id = $1
               AND deleted_at IS NULL
               AND NOT ($2 = ANY(friends))
            "#,
        )
        .bind(user_id)
        .bind(friend_id)
        .execute(&mut *self.tx)
        .await
        .context("add friend")?;
        Ok(())
    }

    async fn remove_friend(&mut self, user_id: i64, friend_id: i64) -> Result<(), StoreError> {
        sqlx::query(r#"UPDATE users SET friends = array_remove(friends, $2) WHERE id = $1"#)
            .bind(user_id)
            .bind(friend_id)
            .execute(&mut *self.tx)
            .await
            .context("remove friend")?;
        Ok(())
    }

    async fn find_ban(
        &mut self,
        user_id: i64,
        banned_user_id: i64,
    ) -> Result<Option<BannedRelation>, StoreError> {
        let ban = sqlx::query_as::<_, BannedRelation>(
            r#"
            SELECT id, user_id, banned_user_id, created_at, deleted_at
              FROM users_banned
             WHERE user_id = $1 AND banned_user_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(banned_user_id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("find ban relation")?;
        Ok(ban)
    }

    async fn upsert_ban(&mut self, user_id: i64, banned_user_id: i64) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users_banned (user_id, banned_user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, banned_user_id) DO UPDATE SET deleted_at = NULL
            "#,
        )
        .bind(user_id)
        .bind(banned_user_id)
        .execute(&mut *self.tx)
        .await
        .context("insert ban relation")?;
        Ok(())
    }

    async fn lift_ban(&mut self, user_id: i64, banned_user_id: i64) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users_banned
               SET deleted_at = now()
             WHERE user_id = $1 AND banned_user_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(banned_user_id)
        .execute(&mut *self.tx)
        .await
        .context("lift ban relation")?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.context("commit tx")?;
        Ok(())
    }
}
