use warp::{reject::Rejection, Filter, Reply};

use crate::{
    actions::{create_tag, delete_tag, get_tag, list_tags, update_tag},
    error::HtmlError,
    jwt::SessionData,
    middleware::{with_possible_session, with_session, with_state},
    permissions::{authorize, ActionType, Target},
    schema::Uuid,
    serializers::TagPayload,
    state::AppState,
};

use super::{created, json_body, no_content};

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::path!("tags")
        .and(warp::get())
        .and(with_possible_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(all_tags);

    let create = warp::path!("tags")
        .and(warp::post())
        .and(json_body::<TagPayload>())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(new_tag);

    let retrieve = warp::path!("tags" / Uuid)
        .and(warp::get())
        .and(with_possible_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(one_tag);

    let update = warp::path!("tags" / Uuid)
        .and(warp::patch())
        .and(json_body::<TagPayload>())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(change_tag);

    let destroy = warp::path!("tags" / Uuid)
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state))
        .and_then(remove_tag);

    list.or(create).or(retrieve).or(update).or(destroy)
}

async fn all_tags(session: Option<SessionData>, state: AppState) -> Result<impl Reply, Rejection> {
    authorize(session.as_ref(), ActionType::ReadCatalog, Target::Any)?;
    let tags = list_tags(&state.pool).await?;
    Ok(warp::reply::json(&tags))
}

async fn new_tag(
    payload: TagPayload,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageCatalog)?;
    let tag = create_tag(payload, &state.pool).await?;
    log::info!("Tag {} created by {}", tag.slug, session.username);
    Ok(created(&tag))
}

async fn one_tag(
    id: Uuid,
    session: Option<SessionData>,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    authorize(session.as_ref(), ActionType::ReadCatalog, Target::Any)?;
    let tag = get_tag(id, &state.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("Tag not found"))?;
    Ok(warp::reply::json(&tag))
}

async fn change_tag(
    id: Uuid,
    payload: TagPayload,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageCatalog)?;
    let tag = update_tag(id, payload, &state.pool).await?;
    Ok(warp::reply::json(&tag))
}

async fn remove_tag(id: Uuid, session: SessionData, state: AppState) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageCatalog)?;
    delete_tag(id, &state.pool).await?;
    Ok(no_content())
}
