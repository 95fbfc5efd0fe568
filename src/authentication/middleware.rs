use std::convert::Infallible;

use serde::Serialize;
use warp::{
    http::StatusCode,
    reject::{self, Rejection},
    reply::Reply,
    Filter,
};

use crate::constants::SESSION_COOKIE;
use crate::error::Error;

use super::jwt::{verify_jwt_session, JwtSessionData};

#[derive(Debug)]
struct Unauthorized;

impl reject::Reject for Unauthorized {}

/// Gate for authenticated-only pages; unauthenticated requests are
/// redirected to the auth screen by `handle_rejection`.
pub fn with_auth() -> impl Filter<Extract = ((),), Error = Rejection> + Copy {
    warp::cookie::<String>(SESSION_COOKIE).and_then(|session: String| async move {
        match verify_jwt_session(session) {
            Ok(_) => Ok(()),
            Err(e) => Err(Rejection::from(e.with_redirect("/auth"))),
        }
    })
}

pub fn with_session() -> impl Filter<Extract = (JwtSessionData,), Error = Rejection> + Copy {
    warp::cookie::<String>(SESSION_COOKIE).and_then(|session: String| async move {
        if let Ok(data) = verify_jwt_session(session) {
            Ok(data)
        } else {
            Err(reject::custom(Unauthorized))
        }
    })
}

pub fn with_possible_session(
) -> impl Filter<Extract = (Option<JwtSessionData>,), Error = Infallible> + Copy {
    warp::cookie::optional::<String>(SESSION_COOKIE).map(|session: Option<String>| {
        session.and_then(|session| verify_jwt_session(session).ok())
    })
}

#[derive(Serialize)]
struct ErrorReply {
    code: u16,
    message: String,
}

/// Renders crate errors as JSON replies (or a redirect when one is set);
/// mount with `.recover(handle_rejection)` on the route tree.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message, redirect) = if err.is_not_found() {
        (404, String::from("Not found"), None)
    } else if let Some(e) = err.find::<Error>() {
        (
            e.code,
            e.info.clone().unwrap_or_else(|| String::from("Request failed")),
            e.redirect.clone(),
        )
    } else if err.find::<Unauthorized>().is_some() {
        (401, String::from("Unauthorized"), None)
    } else {
        (500, String::from("Internal server error"), None)
    };

    if let Some(location) = redirect {
        let reply = warp::reply::with_header(StatusCode::SEE_OTHER, "location", location);
        return Ok(reply.into_response());
    }

    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let json = warp::reply::json(&ErrorReply { code, message });

    Ok(warp::reply::with_status(json, status).into_response())
}
