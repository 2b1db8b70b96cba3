use std::convert::Infallible;

use warp::{reject::Rejection, Filter};

use crate::{
    actions::get_token_user,
    error::HtmlError,
    state::AppState,
};

use super::jwt::SessionData;

pub fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Accepts `Token <jwt>` and `Bearer <jwt>`.
fn token_from_header(header: &str) -> Option<&str> {
    header
        .strip_prefix("Token ")
        .or_else(|| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn resolve_session(
    header: Option<String>,
    state: AppState,
) -> Result<Option<SessionData>, Rejection> {
    let header = match header {
        Some(header) => header,
        None => return Ok(None),
    };

    let token = token_from_header(&header)
        .ok_or_else(|| HtmlError::InvalidSession.new("Invalid token header"))?;
    let claims = state.keys.verify_jwt_session(token)?;

    // Logged out tokens are gone from storage even while the signature holds.
    let user = get_token_user(&claims.jti, &state.pool)
        .await?
        .filter(|user| user.id == claims.user_id)
        .ok_or_else(|| HtmlError::InvalidSession.new("Invalid token"))?;

    Ok(Some(SessionData::from_user(&user, claims.jti)))
}

/// Anonymous when no `Authorization` header is sent; a header carrying a bad
/// token is refused.
pub fn with_possible_session(
    state: AppState,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_state(state))
        .and_then(resolve_session)
}

pub fn with_session(
    state: AppState,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    with_possible_session(state).and_then(|session: Option<SessionData>| async move {
        session.ok_or_else(|| Rejection::from(HtmlError::Unauthorized.default()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_prefixes() {
        assert_eq!(token_from_header("Token abc"), Some("abc"));
        assert_eq!(token_from_header("Bearer abc"), Some("abc"));
        assert_eq!(token_from_header("Basic abc"), None);
        assert_eq!(token_from_header("Token "), None);
    }
}
