use warp::{reject::Rejection, Filter, Reply};

use crate::{
    actions::{
        add_to_cart, add_to_favorites, build_shopping_list, create_recipe, delete_recipe,
        fetch_recipes, get_recipe_view, remove_from_cart, remove_from_favorites, update_recipe,
        RecipeFilter,
    },
    constants::SHOPPING_LIST_FILENAME,
    form::Form,
    jwt::SessionData,
    middleware::{with_possible_session, with_session, with_state},
    pagination::PageParams,
    permissions::{authorize, ActionType, Target},
    schema::Uuid,
    serializers::RecipePayload,
    state::AppState,
};

use super::{created, json_body, no_content, query_form};

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::path!("recipes")
        .and(warp::get())
        .and(query_form())
        .and(with_possible_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(list_recipes);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(json_body::<RecipePayload>())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(new_recipe);

    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(download_shopping_cart);

    let retrieve = warp::path!("recipes" / Uuid)
        .and(warp::get())
        .and(with_possible_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(one_recipe);

    let update = warp::path!("recipes" / Uuid)
        .and(warp::patch())
        .and(json_body::<RecipePayload>())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(change_recipe);

    let destroy = warp::path!("recipes" / Uuid)
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(remove_recipe);

    let favorite = warp::path!("recipes" / Uuid / "favorite")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(mark_favorite);

    let unfavorite = warp::path!("recipes" / Uuid / "favorite")
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(unmark_favorite);

    let to_cart = warp::path!("recipes" / Uuid / "shopping_cart")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(put_in_cart);

    let from_cart = warp::path!("recipes" / Uuid / "shopping_cart")
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state))
        .and_then(take_from_cart);

    list.or(create)
        .or(download)
        .or(retrieve)
        .or(update)
        .or(destroy)
        .or(favorite)
        .or(unfavorite)
        .or(to_cart)
        .or(from_cart)
}

async fn list_recipes(
    form: Form,
    session: Option<SessionData>,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    authorize(session.as_ref(), ActionType::ReadRecipes, Target::Any)?;
    let params = PageParams::from_form(&form)?;
    let filter = RecipeFilter::from_form(&form)?;

    let page = fetch_recipes(filter, session.as_ref(), params, &state.media, &state.pool).await?;
    Ok(warp::reply::json(&page))
}

async fn new_recipe(
    payload: RecipePayload,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let recipe = create_recipe(payload, &session, &state.media, &state.pool).await?;
    Ok(created(&recipe))
}

async fn one_recipe(
    id: Uuid,
    session: Option<SessionData>,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    authorize(session.as_ref(), ActionType::ReadRecipes, Target::Any)?;
    let recipe = get_recipe_view(id, session.as_ref(), &state.media, &state.pool).await?;
    Ok(warp::reply::json(&recipe))
}

async fn change_recipe(
    id: Uuid,
    payload: RecipePayload,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let recipe = update_recipe(id, payload, &session, &state.media, &state.pool).await?;
    Ok(warp::reply::json(&recipe))
}

async fn remove_recipe(
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    delete_recipe(id, &session, &state.media, &state.pool).await?;
    Ok(no_content())
}

async fn mark_favorite(id: Uuid, session: SessionData, state: AppState) -> Result<impl Reply, Rejection> {
    let recipe = add_to_favorites(id, &session, &state.media, &state.pool).await?;
    Ok(created(&recipe))
}

async fn unmark_favorite(
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    remove_from_favorites(id, &session, &state.pool).await?;
    Ok(no_content())
}

async fn put_in_cart(
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let recipe = add_to_cart(id, &session, &state.media, &state.pool).await?;
    Ok(created(&recipe))
}

async fn take_from_cart(
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    remove_from_cart(id, &session, &state.pool).await?;
    Ok(no_content())
}

async fn download_shopping_cart(
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let list = build_shopping_list(&session, &state.pool).await?;

    let reply = warp::reply::with_header(list.render(), "content-type", "text/plain; charset=utf-8");
    Ok(warp::reply::with_header(
        reply,
        "content-disposition",
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    ))
}
