use warp::{reject::Rejection, Filter, Reply};

use crate::{
    actions::{login_user, logout_user},
    jwt::SessionData,
    middleware::{with_session, with_state},
    serializers::{LoginPayload, TokenView},
    state::AppState,
};

use super::{json_body, no_content};

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let login = warp::path!("auth" / "token" / "login")
        .and(warp::post())
        .and(json_body::<LoginPayload>())
        .and(with_state(state.clone()))
        .and_then(create_token);

    let logout = warp::path!("auth" / "token" / "logout")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(with_state(state))
        .and_then(destroy_token);

    login.or(logout)
}

async fn create_token(payload: LoginPayload, state: AppState) -> Result<impl Reply, Rejection> {
    let auth_token = login_user(&payload.email, &payload.password, &state.keys, &state.pool).await?;
    Ok(warp::reply::json(&TokenView { auth_token }))
}

async fn destroy_token(session: SessionData, state: AppState) -> Result<impl Reply, Rejection> {
    logout_user(&session.token_id, &state.pool).await?;
    log::debug!("User {} logged out", session.user_id);
    Ok(no_content())
}
