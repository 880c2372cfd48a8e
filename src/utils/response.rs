use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Body of every non-record response: confirmations and errors alike.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ApiMessage {
    pub message: String,
}

pub fn success<T>(data: T) -> Response
where
    T: Serialize,
{
    (StatusCode::OK, Json(data)).into_response()
}

pub fn created<T>(data: T) -> Response
where
    T: Serialize,
{
    (StatusCode::CREATED, Json(data)).into_response()
}

pub fn empty_success(message: impl Into<String>) -> Response {
    let body = ApiMessage {
        message: message.into(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn error(message: impl Into<String>, status: StatusCode) -> Response {
    let body = ApiMessage {
        message: message.into(),
    };
    (status, Json(body)).into_response()
}
