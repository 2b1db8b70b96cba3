use std::collections::HashMap;

use crate::{
    authentication::permissions::ActionType,
    error::{Error, HtmlError, QueryError},
    jwt::SessionData,
    media::MediaStore,
    pagination::{PageContext, PageParams},
    schema::{Recipe, UserRow, UserRowPartial, Uuid},
    serializers::{RecipeBrief, SubscriptionView},
};

use super::get_user_row;

use sqlx::{Pool, Postgres};

/// Recipes of each author, newest first, cut to `recipes_limit` per author,
/// plus the full count per author.
async fn author_recipes(
    author_ids: &[Uuid],
    recipes_limit: Option<i64>,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, (Vec<RecipeBrief>, i64)>, Error> {
    let rows: Vec<Recipe> = sqlx::query_as(
        "
        SELECT * FROM recipes
        WHERE author_id = ANY($1)
        ORDER BY pub_date DESC, id DESC
    ",
    )
    .bind(author_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut hashmap: HashMap<Uuid, (Vec<RecipeBrief>, i64)> = HashMap::new();
    for recipe in rows {
        let (recipes, count) = hashmap.entry(recipe.author_id).or_default();
        *count += 1;
        if recipes_limit.map_or(true, |limit| (recipes.len() as i64) < limit) {
            recipes.push(RecipeBrief::from_recipe(&recipe, media));
        }
    }

    Ok(hashmap)
}

pub async fn subscription_view(
    author: UserRow,
    recipes_limit: Option<i64>,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<SubscriptionView, Error> {
    let (recipes, count) = author_recipes(&[author.id], recipes_limit, media, pool)
        .await?
        .remove(&author.id)
        .unwrap_or_default();

    Ok(SubscriptionView::new(author, recipes, count))
}

/// Authors the caller follows, ordered by when the subscription was made.
pub async fn fetch_subscriptions(
    session: &SessionData,
    params: PageParams,
    recipes_limit: Option<i64>,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<PageContext<SubscriptionView>, Error> {
    session.authenticate(ActionType::ManageOwnLists)?;

    let rows: Vec<UserRowPartial> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name, COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY s.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(session.user_id)
    .bind(params.limit)
    .bind(params.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|p| p.count).unwrap_or(0);
    let authors: Vec<UserRow> = rows.into_iter().map(UserRow::from).collect();
    let author_ids: Vec<Uuid> = authors.iter().map(|a| a.id).collect();

    let mut recipes = if author_ids.is_empty() {
        HashMap::new()
    } else {
        author_recipes(&author_ids, recipes_limit, media, pool).await?
    };

    let views: Vec<SubscriptionView> = authors
        .into_iter()
        .map(|author| {
            let (briefs, count) = recipes.remove(&author.id).unwrap_or_default();
            SubscriptionView::new(author, briefs, count)
        })
        .collect();

    PageContext::from_rows(views, total_count, params, "/api/users/subscriptions")
}

pub async fn subscribe(
    author_id: Uuid,
    recipes_limit: Option<i64>,
    session: &SessionData,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<SubscriptionView, Error> {
    session.authenticate(ActionType::ManageOwnLists)?;
    let author = get_user_row(pool, author_id).await?;

    if author.id == session.user_id {
        return Err(HtmlError::InvalidRequest.new("Can't subscribe to yourself"));
    }

    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(session.user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new("Already subscribed to this author"));
    }

    log::debug!("User {} subscribed to {author_id}", session.user_id);
    subscription_view(author, recipes_limit, media, pool).await
}

pub async fn unsubscribe(
    author_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    session.authenticate(ActionType::ManageOwnLists)?;
    get_user_row(pool, author_id).await?;

    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(session.user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new("Not subscribed to this author"));
    }

    Ok(())
}
