use std::collections::{HashMap, HashSet};

use crate::{
    authentication::{
        cryptography::{generate_access_token, hash_password, verify_password},
        jwt::SessionKeys,
    },
    error::{Error, HtmlError, QueryError},
    pagination::{PageContext, PageParams},
    schema::{User, UserRow, UserRowPartial, Uuid},
    serializers::{PasswordPayload, UserPayload},
};

use sqlx::{Pool, Postgres};

const INVALID_CREDENTIALS: &str = "Unable to log in with provided credentials";

pub async fn get_user_by_email(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Uuid) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_row(pool: &Pool<Postgres>, user_id: Uuid) -> Result<UserRow, Error> {
    let row: Option<UserRow> = sqlx::query_as(
        "SELECT id, email, username, first_name, last_name FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    row.ok_or_else(|| HtmlError::NotFound.new("User not found"))
}

pub async fn list_user_rows(
    pool: &Pool<Postgres>,
    user_ids: &[Uuid],
) -> Result<HashMap<Uuid, UserRow>, Error> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "SELECT id, email, username, first_name, last_name FROM users WHERE id = ANY($1)",
    )
    .bind(user_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| (row.id, row)).collect())
}

pub async fn fetch_users(
    params: PageParams,
    pool: &Pool<Postgres>,
) -> Result<PageContext<UserRow>, Error> {
    let rows: Vec<UserRowPartial> = sqlx::query_as(
        "
        SELECT id, email, username, first_name, last_name, COUNT(*) OVER() AS count
        FROM users
        ORDER BY id
        LIMIT $1 OFFSET $2
    ",
    )
    .bind(params.limit)
    .bind(params.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|p| p.count).unwrap_or(0);
    let rows: Vec<UserRow> = rows.into_iter().map(UserRow::from).collect();

    PageContext::from_rows(rows, total_count, params, "/api/users")
}

/// Creates a user; the password is stored as an argon2 hash.
pub async fn register_user(payload: UserPayload, pool: &Pool<Postgres>) -> Result<UserRow, Error> {
    payload.validate()?;

    let password = hash_password(&payload.password).map_err(|e| {
        log::error!("Failed to hash password: {e}");
        HtmlError::InternalServerError.default()
    })?;

    let row: Option<UserRow> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING
        RETURNING id, email, username, first_name, last_name
    ",
    )
    .bind(payload.email.to_lowercase())
    .bind(&payload.username)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(password)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match row {
        Some(user) => {
            log::info!("Registered user {} ({})", user.username, user.id);
            Ok(user)
        }
        None => Err(HtmlError::InvalidRequest
            .new("A user with that email or username already exists")),
    }
}

pub async fn set_password(
    user_id: Uuid,
    payload: PasswordPayload,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    payload.validate()?;

    let user = get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("User not found"))?;

    if !verify_password(&payload.current_password, &user.password).unwrap_or(false) {
        return Err(HtmlError::InvalidRequest.new("Invalid password"));
    }

    let password = hash_password(&payload.new_password).map_err(|e| {
        log::error!("Failed to hash password: {e}");
        HtmlError::InternalServerError.default()
    })?;

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

/// Removes a user together with everything they own.
pub async fn delete_user(user_id: Uuid, pool: &Pool<Postgres>) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::NotFound.new("User not found"));
    }

    log::info!("Deleted user {user_id}");
    Ok(())
}

pub async fn login_user(
    email: &str,
    password: &str,
    keys: &SessionKeys,
    pool: &Pool<Postgres>,
) -> Result<String, Error> {
    let user = get_user_by_email(pool, email)
        .await?
        .ok_or_else(|| HtmlError::InvalidRequest.new(INVALID_CREDENTIALS))?;

    let authenticated = verify_password(password, &user.password).map_err(|e| {
        log::error!("Stored password hash for user {} is unreadable: {e}", user.id);
        HtmlError::InternalServerError.default()
    })?;
    if !authenticated {
        return Err(HtmlError::InvalidRequest.new(INVALID_CREDENTIALS));
    }

    let token_id = generate_access_token();
    sqlx::query("INSERT INTO auth_tokens (token_id, user_id) VALUES ($1, $2)")
        .bind(&token_id)
        .bind(user.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    keys.generate_jwt_session(&user, token_id)
}

pub async fn logout_user(token_id: &str, pool: &Pool<Postgres>) -> Result<(), Error> {
    sqlx::query("DELETE FROM auth_tokens WHERE token_id = $1")
        .bind(token_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

/// Owner of a login token, if the token has not been revoked.
pub async fn get_token_user(token_id: &str, pool: &Pool<Postgres>) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as(
        "
        SELECT u.*
        FROM auth_tokens a
        INNER JOIN users u ON u.id = a.user_id
        WHERE a.token_id = $1
    ",
    )
    .bind(token_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

/// Which of `author_ids` the user is subscribed to.
pub async fn subscribed_author_ids(
    user_id: Uuid,
    author_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Uuid>, Error> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        "SELECT author_id FROM subscriptions WHERE user_id = $1 AND author_id = ANY($2)",
    )
    .bind(user_id)
    .bind(author_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}
