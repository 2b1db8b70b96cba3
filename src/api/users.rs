use warp::{reject::Rejection, Filter, Reply};

use crate::{
    actions::{
        delete_user, fetch_subscriptions, fetch_users, get_user_row, register_user, set_password,
        subscribe, subscribed_author_ids, unsubscribe,
    },
    error::TypeError,
    form::Form,
    jwt::SessionData,
    middleware::{with_possible_session, with_session, with_state},
    pagination::PageParams,
    permissions::{authorize, ActionType, Target},
    schema::{UserRow, Uuid},
    serializers::{PasswordPayload, UserPayload, UserView},
    state::AppState,
};

use super::{created, json_body, no_content, query_form};

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::path!("users")
        .and(warp::get())
        .and(query_form())
        .and(with_possible_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(list_users);

    let register = warp::path!("users")
        .and(warp::post())
        .and(json_body::<UserPayload>())
        .and(with_possible_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(create_user);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(current_user);

    let password = warp::path!("users" / "set_password")
        .and(warp::post())
        .and(json_body::<PasswordPayload>())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(change_password);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(query_form())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(list_subscriptions);

    let retrieve = warp::path!("users" / Uuid)
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(retrieve_user);

    let destroy = warp::path!("users" / Uuid)
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(destroy_user);

    let follow = warp::path!("users" / Uuid / "subscribe")
        .and(warp::post())
        .and(query_form())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(create_subscription);

    let unfollow = warp::path!("users" / Uuid / "subscribe")
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state))
        .and_then(destroy_subscription);

    list.or(register)
        .or(me)
        .or(password)
        .or(subscriptions)
        .or(retrieve)
        .or(destroy)
        .or(follow)
        .or(unfollow)
}

/// `recipes_limit` caps the recipes embedded per author; absent means all.
fn recipes_limit(form: &Form) -> Result<Option<i64>, TypeError> {
    match form.get_number::<i64>("recipes_limit")? {
        Some(limit) if limit < 0 => Err(TypeError::new("Invalid recipes_limit")),
        limit => Ok(limit),
    }
}

async fn list_users(
    form: Form,
    session: Option<SessionData>,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    authorize(session.as_ref(), ActionType::ListUsers, Target::Any)?;
    let params = PageParams::from_form(&form)?;
    let page = fetch_users(params, &state.pool).await?;

    let subscribed = match &session {
        Some(session) => {
            let ids: Vec<Uuid> = page.results.iter().map(|u| u.id).collect();
            subscribed_author_ids(session.user_id, &ids, &state.pool).await?
        }
        None => Default::default(),
    };

    let page = page.map(|row: UserRow| {
        let is_subscribed = subscribed.contains(&row.id);
        UserView::from_row(row, is_subscribed)
    });
    Ok(warp::reply::json(&page))
}

async fn create_user(
    payload: UserPayload,
    session: Option<SessionData>,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    authorize(session.as_ref(), ActionType::RegisterUsers, Target::Any)?;
    let user = register_user(payload, &state.pool).await?;
    Ok(created(&user))
}

async fn current_user(session: SessionData, state: AppState) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnLists)?;
    let user = get_user_row(&state.pool, session.user_id).await?;
    Ok(warp::reply::json(&UserView::from_row(user, false)))
}

async fn change_password(
    payload: PasswordPayload,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnLists)?;
    set_password(session.user_id, payload, &state.pool).await?;
    Ok(no_content())
}

async fn list_subscriptions(
    form: Form,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let params = PageParams::from_form(&form)?;
    let limit = recipes_limit(&form)?;

    let page = fetch_subscriptions(&session, params, limit, &state.media, &state.pool).await?;
    Ok(warp::reply::json(&page))
}

async fn retrieve_user(
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ViewProfiles)?;
    let user = get_user_row(&state.pool, id).await?;
    let is_subscribed = subscribed_author_ids(session.user_id, &[id], &state.pool)
        .await?
        .contains(&id);

    Ok(warp::reply::json(&UserView::from_row(user, is_subscribed)))
}

async fn destroy_user(
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageUsers)?;
    delete_user(id, &state.pool).await?;
    Ok(no_content())
}

async fn create_subscription(
    id: Uuid,
    form: Form,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let limit = recipes_limit(&form)?;
    let view = subscribe(id, limit, &session, &state.media, &state.pool).await?;
    Ok(created(&view))
}

async fn destroy_subscription(
    id: Uuid,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    unsubscribe(id, &session, &state.pool).await?;
    Ok(no_content())
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
    fn recipes_limit_is_optional_and_non_negative() {
        assert_eq!(recipes_limit(&form(&[])).unwrap(), None);
        assert_eq!(recipes_limit(&form(&[("recipes_limit", "3")])).unwrap(), Some(3));
        assert!(recipes_limit(&form(&[("recipes_limit", "-1")])).is_err());
    }
}
