#![allow(dead_code)]

use cookbook_sdk::{
    actions::{create_ingredient, create_recipe, create_tag, get_user_by_id, register_user},
    jwt::SessionData,
    media::MediaStore,
    schema::{Ingredient, Tag, UserRole},
    serializers::{IngredientPayload, RecipePayload, RecipeView, TagPayload, UserPayload},
};
use serde_json::json;
use sqlx::PgPool;

// 1x1 transparent png
pub const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

pub fn media() -> (tempfile::TempDir, MediaStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = MediaStore::new(dir.path(), "/media");
    (dir, store)
}

pub async fn user(pool: &PgPool, name: &str) -> SessionData {
    let row = register_user(
        UserPayload {
            email: format!("{name}@example.com"),
            username: name.to_string(),
            first_name: name.to_string(),
            last_name: "Cook".to_string(),
            password: "correct-horse".to_string(),
        },
        pool,
    )
    .await
    .unwrap();

    let user = get_user_by_id(pool, row.id).await.unwrap().unwrap();
    SessionData::from_user(&user, format!("token-{name}"))
}

pub async fn admin(pool: &PgPool, name: &str) -> SessionData {
    let session = user(pool, name).await;
    sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
        .bind(UserRole::Admin)
        .bind(session.user_id)
        .execute(pool)
        .await
        .unwrap();

    let user = get_user_by_id(pool, session.user_id).await.unwrap().unwrap();
    SessionData::from_user(&user, session.token_id)
}

pub async fn ingredient(pool: &PgPool, name: &str, unit: &str) -> Ingredient {
    create_ingredient(
        IngredientPayload {
            name: Some(name.to_string()),
            measurement_unit: Some(unit.to_string()),
        },
        pool,
    )
    .await
    .unwrap()
}

pub async fn tag(pool: &PgPool, slug: &str, color: &str) -> Tag {
    create_tag(
        TagPayload {
            name: Some(slug.to_uppercase()),
            color: Some(color.to_string()),
            slug: Some(slug.to_string()),
        },
        pool,
    )
    .await
    .unwrap()
}

pub async fn recipe(
    pool: &PgPool,
    media: &MediaStore,
    author: &SessionData,
    name: &str,
    ingredients: &[(i32, i32)],
    tags: &[i32],
) -> RecipeView {
    let ingredients: Vec<_> = ingredients
        .iter()
        .map(|(id, amount)| json!({"id": id, "amount": amount}))
        .collect();
    let payload: RecipePayload = serde_json::from_value(json!({
        "ingredients": ingredients,
        "tags": tags,
        "image": PIXEL,
        "name": name,
        "text": "Mix and cook.",
        "cooking_time": 15
    }))
    .unwrap();

    create_recipe(payload, author, media, pool).await.unwrap()
}
