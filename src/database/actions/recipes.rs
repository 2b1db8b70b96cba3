use std::collections::{HashMap, HashSet};

use crate::{
    authentication::permissions::{authorize, ActionType, Target},
    error::{Error, HtmlError, QueryError, TypeError},
    form::Form,
    jwt::SessionData,
    media::{is_data_uri, MediaStore},
    pagination::{PageContext, PageParams},
    schema::{Recipe, RecipePart, RecipeRowPartial, Uuid},
    serializers::{RecipeBrief, RecipeDraft, RecipePayload, RecipeRelations, RecipeView, WriteMode},
};

use super::{
    ensure_ingredients_exist, ensure_tags_exist, in_cart_recipe_ids, list_recipe_tags,
    list_user_rows, subscribed_author_ids,
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

/// Listing filters accepted by `GET /api/recipes`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub author: Option<Uuid>,
    pub tags: Vec<String>,
}

impl RecipeFilter {
    pub fn from_form(form: &Form) -> Result<Self, TypeError> {
        let mut tags = form.get_all("tags");
        tags.retain(|slug| !slug.is_empty());

        Ok(Self {
            is_favorited: form.get_bool("is_favorited")?.unwrap_or(false),
            is_in_shopping_cart: form.get_bool("is_in_shopping_cart")?.unwrap_or(false),
            author: form.get_number("author")?,
            tags,
        })
    }
}

/// Newest first. Favorite and cart filters only apply to authenticated
/// callers.
pub async fn fetch_recipes(
    filter: RecipeFilter,
    session: Option<&SessionData>,
    params: PageParams,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeView>, Error> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags)
            .push("))");
    }
    if let Some(session) = session {
        if filter.is_favorited {
            query
                .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(session.user_id)
                .push(")");
        }
        if filter.is_in_shopping_cart {
            query
                .push(" AND EXISTS (SELECT 1 FROM shopping_carts c WHERE c.recipe_id = r.id AND c.user_id = ")
                .push_bind(session.user_id)
                .push(")");
        }
    }

    query
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(params.limit)
        .push(" OFFSET ")
        .push_bind(params.offset());

    let rows: Vec<RecipeRowPartial> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|p| p.count).unwrap_or(0);
    let recipes: Vec<Recipe> = rows.into_iter().map(Recipe::from).collect();
    let views = recipe_views(recipes, session, media, pool).await?;

    PageContext::from_rows(views, total_count, params, "/api/recipes")
}

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Loads a recipe the caller is allowed to change.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("Recipe not found"))?;

    authorize(
        Some(session),
        ActionType::ManageOwnRecipes,
        Target::OwnedBy(recipe.author_id),
    )?;

    Ok(recipe)
}

pub async fn list_recipe_parts(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, Vec<RecipePart>>, Error> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name,
               i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut hashmap: HashMap<Uuid, Vec<RecipePart>> = HashMap::new();
    rows.into_iter().for_each(|row| {
        hashmap.entry(row.recipe_id).or_default().push(row);
    });

    Ok(hashmap)
}

pub async fn favorited_recipe_ids(
    user_id: Uuid,
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Uuid>, Error> {
    let rows: Vec<(Uuid,)> =
        sqlx::query_as("SELECT recipe_id FROM favorites WHERE user_id = $1 AND recipe_id = ANY($2)")
            .bind(user_id)
            .bind(recipe_ids)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Batch-loads everything the read shape of `recipes` needs.
pub async fn load_relations(
    recipes: &[Recipe],
    session: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<RecipeRelations, Error> {
    let recipe_ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();
    let mut author_ids: Vec<Uuid> = recipes.iter().map(|r| r.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let mut relations = RecipeRelations {
        parts: list_recipe_parts(&recipe_ids, pool).await?,
        tags: list_recipe_tags(&recipe_ids, pool).await?,
        authors: list_user_rows(pool, &author_ids).await?,
        ..Default::default()
    };

    if let Some(session) = session {
        relations.favorited = favorited_recipe_ids(session.user_id, &recipe_ids, pool).await?;
        relations.in_cart = in_cart_recipe_ids(session.user_id, &recipe_ids, pool).await?;
        relations.subscribed = subscribed_author_ids(session.user_id, &author_ids, pool).await?;
    }

    Ok(relations)
}

pub async fn recipe_views(
    recipes: Vec<Recipe>,
    session: Option<&SessionData>,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeView>, Error> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let relations = load_relations(&recipes, session, pool).await?;
    recipes
        .into_iter()
        .map(|recipe| relations.to_view(recipe, media))
        .collect()
}

pub async fn get_recipe_view(
    id: Uuid,
    session: Option<&SessionData>,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, Error> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("Recipe not found"))?;

    recipe_views(vec![recipe], session, media, pool)
        .await?
        .pop()
        .ok_or_else(|| HtmlError::NotFound.new("Recipe not found"))
}

/// Inserts the ingredient and tag rows of `draft`. Updates clear the old rows
/// first.
async fn write_associations(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    draft: &RecipeDraft,
) -> Result<(), Error> {
    if !draft.ingredients.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
        );
        query_builder.push_values(draft.ingredients.iter(), |mut b, part| {
            b.push_bind(recipe_id).push_bind(part.id).push_bind(part.amount);
        });
        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    if !draft.tags.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
        query_builder.push_values(draft.tags.iter(), |mut b, tag_id| {
            b.push_bind(recipe_id).push_bind(*tag_id);
        });
        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    Ok(())
}

async fn check_references(payload: &RecipePayload, pool: &Pool<Postgres>) -> Result<(), Error> {
    if let Some(ingredients) = &payload.ingredients {
        let ids: Vec<Uuid> = ingredients.iter().map(|i| i.id).collect();
        ensure_ingredients_exist(&ids, pool).await?;
    }
    if let Some(tags) = &payload.tags {
        ensure_tags_exist(tags, pool).await?;
    }
    Ok(())
}

async fn insert_recipe(
    author_id: Uuid,
    draft: &RecipeDraft,
    pool: &Pool<Postgres>,
) -> Result<Uuid, Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let id: (Uuid,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&draft.name)
    .bind(&draft.text)
    .bind(&draft.image)
    .bind(draft.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    write_associations(&mut *tr, id.0, draft).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    Ok(id.0)
}

pub async fn create_recipe(
    payload: RecipePayload,
    session: &SessionData,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, Error> {
    session.authenticate(ActionType::CreateRecipes)?;
    payload.validate(WriteMode::Create)?;
    check_references(&payload, pool).await?;

    let uploaded = payload.image.as_deref().is_some_and(is_data_uri);
    let image = match payload.image.as_deref() {
        Some(value) => media.resolve(value, None).await?,
        None => return Err(HtmlError::InvalidRequest.new("Field 'image' is required")),
    };
    let draft = payload.into_draft(None, Some(image))?;

    let id = match insert_recipe(session.user_id, &draft, pool).await {
        Ok(id) => id,
        Err(e) => {
            if uploaded {
                media.remove(&draft.image).await;
            }
            return Err(e);
        }
    };

    log::info!("User {} created recipe {id}", session.user_id);
    get_recipe_view(id, Some(session), media, pool).await
}

async fn store_update(id: Uuid, draft: &RecipeDraft, pool: &Pool<Postgres>) -> Result<(), Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    sqlx::query(
        "UPDATE recipes SET name = $1, text = $2, image = $3, cooking_time = $4 WHERE id = $5",
    )
    .bind(&draft.name)
    .bind(&draft.text)
    .bind(&draft.image)
    .bind(draft.cooking_time)
    .bind(id)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    write_associations(&mut *tr, id, draft).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    Ok(())
}

pub async fn update_recipe(
    id: Uuid,
    payload: RecipePayload,
    session: &SessionData,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, Error> {
    let existing = get_recipe_mut(id, session, pool).await?;
    payload.validate(WriteMode::Update)?;
    check_references(&payload, pool).await?;

    let uploaded = payload.image.as_deref().is_some_and(is_data_uri);
    let image = match payload.image.as_deref() {
        Some(value) => Some(media.resolve(value, Some(&existing.image)).await?),
        None => None,
    };
    let draft = payload.into_draft(Some(&existing), image)?;

    if let Err(e) = store_update(id, &draft, pool).await {
        if uploaded {
            media.remove(&draft.image).await;
        }
        return Err(e);
    }

    if draft.image != existing.image {
        media.remove(&existing.image).await;
    }

    log::info!("User {} updated recipe {id}", session.user_id);
    get_recipe_view(id, Some(session), media, pool).await
}

pub async fn delete_recipe(
    id: Uuid,
    session: &SessionData,
    media: &MediaStore,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let recipe = get_recipe_mut(id, session, pool).await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    media.remove(&recipe.image).await;
    log::info!("User {} deleted recipe {id}", session.user_id);
    Ok(())
}

pub async fn add_to_favorites(
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
        "INSERT INTO favorites (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(session.user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new("Recipe is already in favorites"));
    }

    Ok(RecipeBrief::from_recipe(&recipe, media))
}

pub async fn remove_from_favorites(
    recipe_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    session.authenticate(ActionType::ManageOwnLists)?;
    if get_recipe(recipe_id, pool).await?.is_none() {
        return Err(HtmlError::NotFound.new("Recipe not found"));
    }

    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND recipe_id = $2")
        .bind(session.user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new("Recipe is not in favorites"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> Form {
        Form::from_data(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn filter_reads_flags_author_and_tags() {
        let filter = RecipeFilter::from_form(&form(&[
            ("is_favorited", "1"),
            ("author", "4"),
            ("tags", "breakfast"),
            ("tags", "lunch"),
        ]))
        .unwrap();

        assert!(filter.is_favorited);
        assert!(!filter.is_in_shopping_cart);
        assert_eq!(filter.author, Some(4));
        assert_eq!(filter.tags, vec!["breakfast", "lunch"]);
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert_eq!(RecipeFilter::from_form(&form(&[])).unwrap(), RecipeFilter::default());
    }

    #[test]
    fn malformed_filter_is_rejected() {
        assert!(RecipeFilter::from_form(&form(&[("author", "me")])).is_err());
        assert!(RecipeFilter::from_form(&form(&[("is_in_shopping_cart", "yes")])).is_err());
    }
}
