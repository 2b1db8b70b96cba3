use std::collections::HashSet;

use crate::{
    authentication::permissions::ActionType,
    error::{Error, HtmlError, QueryError},
    jwt::SessionData,
    media::MediaStore,
    schema::{CartIngredientRow, Uuid},
    serializers::RecipeBrief,
    shopping_list::ShoppingList,
};

use super::get_recipe;

use sqlx::{Pool, Postgres};

pub async fn in_cart_recipe_ids(
    user_id: Uuid,
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Uuid>, Error> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        "SELECT recipe_id FROM shopping_carts WHERE user_id = $1 AND recipe_id = ANY($2)",
    )
    .bind(user_id)
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

pub async fn add_to_cart(
    recipe_id: Uuid,
    session: &SessionData,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<RecipeBrief, Error> {
    session.authenticate(ActionType::ManageOwnLists)?;
    let recipe = get_recipe(recipe_id, pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("Recipe not found"))?;

    let result = sqlx::query(
        "INSERT INTO shopping_carts (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(session.user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new("Recipe is already in the shopping list"));
    }

    Ok(RecipeBrief::from_recipe(&recipe, media))
}

pub async fn remove_from_cart(
    recipe_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    session.authenticate(ActionType::ManageOwnLists)?;
    if get_recipe(recipe_id, pool).await?.is_none() {
        return Err(HtmlError::NotFound.new("Recipe not found"));
    }

    let result = sqlx::query("DELETE FROM shopping_carts WHERE user_id = $1 AND recipe_id = $2")
        .bind(session.user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new("Recipe is not in the shopping list"));
    }

    Ok(())
}

/// One row per ingredient line of every recipe in the user's cart.
pub async fn list_cart_ingredients(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartIngredientRow>, Error> {
    let rows: Vec<CartIngredientRow> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount::BIGINT AS amount
        FROM shopping_carts c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn build_shopping_list(
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<ShoppingList, Error> {
    session.authenticate(ActionType::ManageOwnLists)?;

    let list = ShoppingList::from_rows(list_cart_ingredients(session.user_id, pool).await?);
    if list.is_empty() {
        return Err(HtmlError::InvalidRequest.new("Add recipes to the shopping list first"));
    }

    log::debug!(
        "Built shopping list of {} items for user {}",
        list.len(),
        session.user_id
    );
    Ok(list)
}
