use chrono::{DateTime, Utc};
use pantry::{
    models::{NewUser, User},
    Error, Result,
};
use uuid::Uuid;

use crate::{errors::classify, store::PgStore};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    user_id: Uuid,
    email: String,
    username: String,
    first_name: String,
    last_name: String,
    is_staff: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            user_id: row.user_id,
            email: row.email,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            is_staff: row.is_staff,
            created_at: row.created_at,
        }
    }
}

impl PgStore {
    pub(crate) async fn insert_user(&self, user: NewUser) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users (email, username, first_name, last_name, is_staff)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING user_id, email, username, first_name, last_name, is_staff, created_at
            ",
        )
        .bind(user.email)
        .bind(user.username)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.is_staff)
        .fetch_one(self.pool())
        .await
        .map_err(|e| classify(e, "user with this email or username"))?;

        Ok(row.into())
    }

    pub(crate) async fn user_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT user_id, email, username, first_name, last_name, is_staff, created_at
            FROM users
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(Error::storage)?;

        Ok(row.map(User::from))
    }

    pub(crate) async fn all_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT user_id, email, username, first_name, last_name, is_staff, created_at
            FROM users
            ORDER BY created_at, user_id
            ",
        )
        .fetch_all(self.pool())
        .await
        .map_err(Error::storage)?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    pub(crate) async fn insert_token(&self, user_id: Uuid) -> Result<String> {
        let token = Uuid::new_v4().simple().to_string();

        sqlx::query("INSERT INTO api_tokens (token, user_id) VALUES ($1, $2)")
            .bind(&token)
            .bind(user_id)
            .execute(self.pool())
            .await
            .map_err(|e| classify(e, "token"))?;

        Ok(token)
    }

    pub(crate) async fn token_owner(&self, token: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT u.user_id, u.email, u.username, u.first_name, u.last_name, u.is_staff,
                   u.created_at
            FROM api_tokens t
            JOIN users u ON u.user_id = t.user_id
            WHERE t.token = $1
            ",
        )
        .bind(token)
        .fetch_optional(self.pool())
        .await
        .map_err(Error::storage)?;

        Ok(row.map(User::from))
    }
}
