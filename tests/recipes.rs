mod common;

use std::collections::HashSet;

use cookbook_sdk::{
    actions::{
        add_to_cart, add_to_favorites, build_shopping_list, create_recipe, delete_ingredient,
        delete_recipe, fetch_recipes, get_recipe_view, remove_from_cart, remove_from_favorites,
        update_recipe, RecipeFilter,
    },
    pagination::PageParams,
    serializers::RecipePayload,
};
use serde_json::json;
use sqlx::PgPool;

use common::{ingredient, media, recipe, tag, user};

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn created_recipe_reads_back_what_was_submitted(pool: PgPool) {
    let (_dir, media) = media();
    let author = user(&pool, "ann").await;
    let flour = ingredient(&pool, "flour", "g").await;
    let milk = ingredient(&pool, "milk", "ml").await;
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;
    let lunch = tag(&pool, "lunch", "#49B64E").await;

    let created = recipe(
        &pool,
        &media,
        &author,
        "Pancakes",
        &[(milk.id, 300), (flour.id, 200)],
        &[lunch.id, breakfast.id],
    )
    .await;

    let fetched = get_recipe_view(created.id, None, &media, &pool).await.unwrap();
    let ingredient_ids: HashSet<i32> = fetched.ingredients.iter().map(|i| i.id).collect();
    let tag_ids: HashSet<i32> = fetched.tags.iter().map(|t| t.id).collect();

    assert_eq!(ingredient_ids, HashSet::from([flour.id, milk.id]));
    assert_eq!(tag_ids, HashSet::from([breakfast.id, lunch.id]));
    assert_eq!(fetched.author.id, author.user_id);
    assert!(fetched.image.starts_with("/media/recipes/"));
    assert_eq!(created, fetched);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn anonymous_readers_see_no_personal_flags(pool: PgPool) {
    let (_dir, media) = media();
    let author = user(&pool, "ann").await;
    let flour = ingredient(&pool, "flour", "g").await;
    let created = recipe(&pool, &media, &author, "Bread", &[(flour.id, 500)], &[]).await;

    add_to_favorites(created.id, &author, &media, &pool).await.unwrap();
    add_to_cart(created.id, &author, &media, &pool).await.unwrap();

    let own = get_recipe_view(created.id, Some(&author), &media, &pool).await.unwrap();
    assert!(own.is_favorited);
    assert!(own.is_in_shopping_cart);

    let page = fetch_recipes(RecipeFilter::default(), None, PageParams::default(), &media, &pool)
        .await
        .unwrap();
    assert_eq!(page.count, 1);
    assert!(!page.results[0].is_favorited);
    assert!(!page.results[0].is_in_shopping_cart);
    assert!(!page.results[0].author.is_subscribed);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn favorites_toggle_once(pool: PgPool) {
    let (_dir, media) = media();
    let author = user(&pool, "ann").await;
    let flour = ingredient(&pool, "flour", "g").await;
    let created = recipe(&pool, &media, &author, "Bread", &[(flour.id, 500)], &[]).await;

    let brief = add_to_favorites(created.id, &author, &media, &pool).await.unwrap();
    assert_eq!(brief.name, "Bread");
    let error = add_to_favorites(created.id, &author, &media, &pool).await.unwrap_err();
    assert_eq!(error.message(), "Recipe is already in favorites");

    remove_from_favorites(created.id, &author, &pool).await.unwrap();
    let error = remove_from_favorites(created.id, &author, &pool).await.unwrap_err();
    assert_eq!(error.message(), "Recipe is not in favorites");

    let error = add_to_favorites(created.id + 100, &author, &media, &pool).await.unwrap_err();
    assert_eq!(error.code, 404);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn cart_toggles_once(pool: PgPool) {
    let (_dir, media) = media();
    let author = user(&pool, "ann").await;
    let flour = ingredient(&pool, "flour", "g").await;
    let created = recipe(&pool, &media, &author, "Bread", &[(flour.id, 500)], &[]).await;

    add_to_cart(created.id, &author, &media, &pool).await.unwrap();
    assert!(add_to_cart(created.id, &author, &media, &pool).await.is_err());

    remove_from_cart(created.id, &author, &pool).await.unwrap();
    let error = remove_from_cart(created.id, &author, &pool).await.unwrap_err();
    assert_eq!(error.message(), "Recipe is not in the shopping list");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn shopping_list_sums_across_recipes(pool: PgPool) {
    let (_dir, media) = media();
    let cook = user(&pool, "ann").await;
    let flour = ingredient(&pool, "flour", "g").await;
    let eggs = ingredient(&pool, "eggs", "pcs").await;

    let a = recipe(&pool, &media, &cook, "A", &[(flour.id, 200), (eggs.id, 2)], &[]).await;
    let b = recipe(&pool, &media, &cook, "B", &[(flour.id, 100)], &[]).await;
    add_to_cart(a.id, &cook, &media, &pool).await.unwrap();
    add_to_cart(b.id, &cook, &media, &pool).await.unwrap();

    let list = build_shopping_list(&cook, &pool).await.unwrap();
    assert_eq!(
        list.render(),
        "SHOPPING LIST:\neggs (pcs) - 2\nflour (g) - 300\n"
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn empty_cart_has_no_document(pool: PgPool) {
    let cook = user(&pool, "ann").await;

    let error = build_shopping_list(&cook, &pool).await.unwrap_err();
    assert!(error.is_validation());
    assert_eq!(error.message(), "Add recipes to the shopping list first");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn only_the_author_may_edit(pool: PgPool) {
    let (_dir, media) = media();
    let author = user(&pool, "ann").await;
    let stranger = user(&pool, "bob").await;
    let flour = ingredient(&pool, "flour", "g").await;
    let lunch = tag(&pool, "lunch", "#49B64E").await;
    let created = recipe(&pool, &media, &author, "Bread", &[(flour.id, 500)], &[lunch.id]).await;

    let payload: RecipePayload = serde_json::from_value(json!({"name": "Rye bread"})).unwrap();
    let error = update_recipe(created.id, payload.clone(), &stranger, &media, &pool)
        .await
        .unwrap_err();
    assert_eq!(error.code, 403);

    let updated = update_recipe(created.id, payload, &author, &media, &pool).await.unwrap();
    assert_eq!(updated.name, "Rye bread");
    assert_eq!(updated.cooking_time, created.cooking_time);
    assert!(updated.ingredients.is_empty());
    assert!(updated.tags.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn tag_filter_matches_any_slug_once(pool: PgPool) {
    let (_dir, media) = media();
    let author = user(&pool, "ann").await;
    let flour = ingredient(&pool, "flour", "g").await;
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;
    let lunch = tag(&pool, "lunch", "#49B64E").await;
    let dinner = tag(&pool, "dinner", "#8775D2").await;

    recipe(&pool, &media, &author, "Both", &[(flour.id, 1)], &[breakfast.id, lunch.id]).await;
    recipe(&pool, &media, &author, "Dinner", &[(flour.id, 1)], &[dinner.id]).await;

    let filter = RecipeFilter {
        tags: vec!["breakfast".to_string(), "lunch".to_string()],
        ..Default::default()
    };
    let page = fetch_recipes(filter, None, PageParams::default(), &media, &pool)
        .await
        .unwrap();

    assert_eq!(page.count, 1);
    assert_eq!(page.results[0].name, "Both");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn used_ingredients_cannot_be_deleted(pool: PgPool) {
    let (_dir, media) = media();
    let author = user(&pool, "ann").await;
    let flour = ingredient(&pool, "flour", "g").await;
    recipe(&pool, &media, &author, "Bread", &[(flour.id, 500)], &[]).await;

    let error = delete_ingredient(flour.id, &pool).await.unwrap_err();
    assert_eq!(error.message(), "Ingredient is used by recipes");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn images_of_other_recipes_cannot_be_claimed(pool: PgPool) {
    let (dir, media) = media();
    let alice = user(&pool, "alice").await;
    let bob = user(&pool, "bob").await;
    let flour = ingredient(&pool, "flour", "g").await;
    let cake = recipe(&pool, &media, &alice, "Cake", &[(flour.id, 200)], &[]).await;
    let bread = recipe(&pool, &media, &bob, "Bread", &[(flour.id, 500)], &[]).await;

    let payload: RecipePayload = serde_json::from_value(json!({
        "ingredients": [{"id": flour.id, "amount": 1}],
        "tags": [],
        "image": cake.image,
        "name": "Copy",
        "text": "Mix.",
        "cooking_time": 5
    }))
    .unwrap();
    let error = create_recipe(payload, &bob, &media, &pool).await.unwrap_err();
    assert!(error.is_validation());

    let payload: RecipePayload =
        serde_json::from_value(json!({"name": "Bread", "image": cake.image})).unwrap();
    let error = update_recipe(bread.id, payload, &bob, &media, &pool)
        .await
        .unwrap_err();
    assert!(error.is_validation());

    // Resubmitting the recipe's own image keeps it.
    let payload: RecipePayload =
        serde_json::from_value(json!({"name": "Rye", "image": bread.image})).unwrap();
    let updated = update_recipe(bread.id, payload, &bob, &media, &pool).await.unwrap();
    assert_eq!(updated.image, bread.image);

    delete_recipe(bread.id, &bob, &media, &pool).await.unwrap();
    let cake_file = cake.image.trim_start_matches("/media/");
    assert!(dir.path().join(cake_file).exists());
}
