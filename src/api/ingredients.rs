use warp::{reject::Rejection, Filter, Reply};

use crate::{
    actions::{
        create_ingredient, delete_ingredient, fetch_ingredients, get_ingredient, update_ingredient,
    },
    error::HtmlError,
    form::Form,
    jwt::SessionData,
    middleware::{with_possible_session, with_session, with_state},
    permissions::{authorize, ActionType, Target},
    schema::Uuid,
    serializers::IngredientPayload,
    state::AppState,
};

use super::{created, json_body, no_content, query_form};

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::path!("ingredients")
        .and(warp::get())
        .and(query_form())
        .and(with_possible_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(search_ingredients);

    let create = warp::path!("ingredients")
        .and(warp::post())
        .and(json_body::<IngredientPayload>())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(new_ingredient);

    let retrieve = warp::path!("ingredients" / Uuid)
        .and(warp::get())
        .and(with_possible_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(one_ingredient);

    let update = warp::path!("ingredients" / Uuid)
        .and(warp::patch())
        .and(json_body::<IngredientPayload>())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(change_ingredient);

    let destroy = warp::path!("ingredients" / Uuid)
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state))
        .and_then(remove_ingredient);

    list.or(create).or(retrieve).or(update).or(destroy)
}

async fn search_ingredients(
    form: Form,
    session: Option<SessionData>,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    authorize(session.as_ref(), ActionType::ReadCatalog, Target::Any)?;
    let ingredients = fetch_ingredients(form.get_str("name"), &state.pool).await?;
    Ok(warp::reply::json(&ingredients))
}

async fn new_ingredient(
    payload: IngredientPayload,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageCatalog)?;
    let ingredient = create_ingredient(payload, &state.pool).await?;
    Ok(created(&ingredient))
}

async fn one_ingredient(
    id: Uuid,
    session: Option<SessionData>,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    authorize(session.as_ref(), ActionType::ReadCatalog, Target::Any)?;
    let ingredient = get_ingredient(id, &state.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("Ingredient not found"))?;
    Ok(warp::reply::json(&ingredient))
}

async fn change_ingredient(
    id: Uuid,
    payload: IngredientPayload,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageCatalog)?;
    let ingredient = update_ingredient(id, payload, &state.pool).await?;
    Ok(warp::reply::json(&ingredient))
}

async fn remove_ingredient(
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageCatalog)?;
    delete_ingredient(id, &state.pool).await?;
    Ok(no_content())
}
