use std::collections::{HashMap, HashSet};

use crate::{
    error::{Error, HtmlError, QueryError},
    schema::{LinkedRecipeTag, Tag, Uuid},
    serializers::{TagPayload, WriteMode},
};

use sqlx::{Pool, Postgres};

const TAG_EXISTS: &str = "A tag with that name, color or slug already exists";

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn get_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Tag>, Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn create_tag(payload: TagPayload, pool: &Pool<Postgres>) -> Result<Tag, Error> {
    payload.validate(WriteMode::Create)?;
    let tag = payload.into_tag(None)?;

    let row: Option<Tag> = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING RETURNING *",
    )
    .bind(&tag.name)
    .bind(&tag.color)
    .bind(&tag.slug)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    row.ok_or_else(|| HtmlError::InvalidRequest.new(TAG_EXISTS))
}

pub async fn update_tag(id: Uuid, payload: TagPayload, pool: &Pool<Postgres>) -> Result<Tag, Error> {
    payload.validate(WriteMode::Update)?;
    let existing = get_tag(id, pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("Tag not found"))?;
    let tag = payload.into_tag(Some(existing))?;

    let row: Tag =
        sqlx::query_as("UPDATE tags SET name = $1, color = $2, slug = $3 WHERE id = $4 RETURNING *")
            .bind(&tag.name)
            .bind(&tag.color)
            .bind(&tag.slug)
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(|e| Error::from(QueryError::from(e)).or_validation(TAG_EXISTS))?;

    Ok(row)
}

pub async fn delete_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM tags WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::NotFound.new("Tag not found"));
    }
    Ok(())
}

/// Fails with the first id in `ids` that names no tag.
pub async fn ensure_tags_exist(ids: &[Uuid], pool: &Pool<Postgres>) -> Result<(), Error> {
    if ids.is_empty() {
        return Ok(());
    }

    let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;
    let found: HashSet<Uuid> = rows.into_iter().map(|row| row.0).collect();

    match ids.iter().find(|id| !found.contains(id)) {
        Some(id) => Err(HtmlError::InvalidRequest.new(&format!("Tag {id} does not exist"))),
        None => Ok(()),
    }
}

pub async fn list_recipe_tags(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, Vec<Tag>>, Error> {
    let rows: Vec<LinkedRecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id AS recipe_id, t.id AS id, t.name AS name, t.color AS color, t.slug AS slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut hashmap: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    rows.into_iter().for_each(|row| {
        hashmap.entry(row.recipe_id).or_default().push(row.into());
    });

    Ok(hashmap)
}
