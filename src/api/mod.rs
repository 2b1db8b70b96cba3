//! HTTP surface. Every resource module exposes a `routes` filter; this
//! module mounts them under `/api`, serves uploaded media and turns
//! rejections into JSON error bodies.

use std::convert::Infallible;

use serde::{de::DeserializeOwned, Serialize};
use warp::{
    http::StatusCode,
    reject::Rejection,
    reply::{Json, WithStatus},
    Filter, Reply,
};

use crate::{
    constants::BODY_LIMIT,
    error::Error,
    form::{Form, FormData},
    state::AppState,
};

pub mod auth;
pub mod ingredients;
pub mod recipes;
pub mod tags;
pub mod users;

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let media = warp::path("media").and(warp::fs::dir(state.media.root().to_path_buf()));

    let api = warp::path("api").and(
        auth::routes(state.clone())
            .or(users::routes(state.clone()))
            .or(tags::routes(state.clone()))
            .or(ingredients::routes(state.clone()))
            .or(recipes::routes(state)),
    );

    api.or(media)
        .with(warp::log("cookbook::api"))
        .recover(handle_rejection)
}

pub(crate) fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(BODY_LIMIT).and(warp::body::json())
}

/// Query string as a [`Form`]; repeated keys are kept.
pub(crate) fn query_form() -> impl Filter<Extract = (Form,), Error = Rejection> + Clone {
    warp::query::<FormData>().map(Form::from_data)
}

pub(crate) fn created<T: Serialize>(value: &T) -> WithStatus<Json> {
    warp::reply::with_status(warp::reply::json(value), StatusCode::CREATED)
}

pub(crate) fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    errors: &'a str,
}

fn error_reply(code: StatusCode, message: &str) -> WithStatus<Json> {
    warp::reply::with_status(warp::reply::json(&ErrorBody { errors: message }), code)
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(e) = err.find::<Error>() {
        let code = StatusCode::from_u16(e.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (code, e.message().to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid request body: {e}"))
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query string".to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidHeader>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large".to_string())
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Content length required".to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Unsupported media type".to_string(),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        log::error!("Unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    if code.is_server_error() {
        log::error!("Request failed with {code}: {message}");
    }

    Ok(error_reply(code, &message))
}
