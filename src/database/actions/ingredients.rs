use std::collections::HashSet;

use crate::{
    error::{Error, HtmlError, QueryError},
    schema::{Ingredient, Uuid},
    serializers::{IngredientPayload, WriteMode},
};

use sqlx::{Pool, Postgres};

const INGREDIENT_EXISTS: &str = "An ingredient with that name and measurement unit already exists";

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Ingredients whose name starts with `search`, case-insensitively.
pub async fn fetch_ingredients(
    search: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let pattern = format!("{}%", escape_like(search.unwrap_or_default()));

    let rows: Vec<Ingredient> =
        sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name, id")
            .bind(pattern)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn get_ingredient(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn create_ingredient(
    payload: IngredientPayload,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, Error> {
    payload.validate(WriteMode::Create)?;
    let ingredient = payload.into_ingredient(None)?;

    let row: Option<Ingredient> = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING RETURNING *
    ",
    )
    .bind(&ingredient.name)
    .bind(&ingredient.measurement_unit)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    row.ok_or_else(|| HtmlError::InvalidRequest.new(INGREDIENT_EXISTS))
}

pub async fn update_ingredient(
    id: Uuid,
    payload: IngredientPayload,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, Error> {
    payload.validate(WriteMode::Update)?;
    let existing = get_ingredient(id, pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("Ingredient not found"))?;
    let ingredient = payload.into_ingredient(Some(existing))?;

    let row: Ingredient = sqlx::query_as(
        "UPDATE ingredients SET name = $1, measurement_unit = $2 WHERE id = $3 RETURNING *",
    )
    .bind(&ingredient.name)
    .bind(&ingredient.measurement_unit)
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(|e| Error::from(QueryError::from(e)).or_validation(INGREDIENT_EXISTS))?;

    Ok(row)
}

/// Ingredients referenced by any recipe can't be deleted.
pub async fn delete_ingredient(id: Uuid, pool: &Pool<Postgres>) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)).or_validation("Ingredient is used by recipes"))?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::NotFound.new("Ingredient not found"));
    }
    Ok(())
}

/// Fails with the first id in `ids` that names no ingredient.
pub async fn ensure_ingredients_exist(ids: &[Uuid], pool: &Pool<Postgres>) -> Result<(), Error> {
    if ids.is_empty() {
        return Ok(());
    }

    let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;
    let found: HashSet<Uuid> = rows.into_iter().map(|row| row.0).collect();

    match ids.iter().find(|id| !found.contains(id)) {
        Some(id) => Err(HtmlError::InvalidRequest.new(&format!("Ingredient {id} does not exist"))),
        None => Ok(()),
    }
}

/// Replaces the whole catalog with `records` in one transaction. Returns the
/// number of ingredients inserted.
pub async fn replace_catalog(
    records: Vec<IngredientPayload>,
    pool: &Pool<Postgres>,
) -> Result<u64, Error> {
    let mut names = Vec::with_capacity(records.len());
    let mut units = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        record.validate(WriteMode::Create).map_err(|e| {
            HtmlError::InvalidRequest.new(&format!("Record {index}: {}", e.message()))
        })?;
        let ingredient = record.into_ingredient(None)?;
        names.push(ingredient.name);
        units.push(ingredient.measurement_unit);
    }

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let removed = sqlx::query("DELETE FROM ingredients")
        .execute(&mut *tr)
        .await
        .map_err(|e| Error::from(QueryError::from(e)).or_validation("Catalog can't be replaced while recipes use its ingredients"))?;

    let inserted = sqlx::query(
        "
        INSERT INTO ingredients (name, measurement_unit)
        SELECT * FROM UNNEST($1::VARCHAR[], $2::VARCHAR[])
        ON CONFLICT DO NOTHING
    ",
    )
    .bind(&names)
    .bind(&units)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!(
        "Replaced ingredient catalog: {} removed, {} inserted",
        removed.rows_affected(),
        inserted.rows_affected()
    );
    Ok(inserted.rows_affected())
}
