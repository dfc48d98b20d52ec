//! Finrec is a small web service for keeping financial records.
//!
//! This library provides a JSON REST API for creating, listing, updating and
//! deleting records, backed by an SQLite database.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
mod auth;
mod database_id;
mod db;
mod endpoints;
mod logging;
mod password;
mod record;
mod routing;
mod user;

pub use app_state::AppState;
pub use auth::{IssuedToken, issue_token};
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, MAX_REQUEST_BODY_BYTES, logging_middleware};
pub use password::{PasswordHash, ValidatedPassword};
pub use record::{FieldKind, FieldSpec, RecordSchema};
pub use routing::build_router;
pub use user::{NewUser, User, UserID, create_user, get_user_by_id};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The route exists but does not accept the request's method.
    #[error("the request method is not supported for this resource")]
    MethodNotAllowed,

    /// The request body exceeded [MAX_REQUEST_BODY_BYTES] or could not be read.
    #[error("the request body is too large")]
    PayloadTooLarge,

    /// The request body could not be parsed as JSON.
    #[error("the request body is not valid JSON: {0}")]
    MalformedJson(String),

    /// The request did not declare a JSON body via the content-type header.
    #[error("expected request with `Content-Type: application/json`")]
    UnsupportedMediaType,

    /// The request body was valid JSON but did not fit the expected shape,
    /// e.g. an unknown record field or a value of the wrong type.
    #[error("{0}")]
    InvalidPayload(String),

    /// The database rejected a write because it broke a table constraint.
    #[error("the record conflicts with existing data")]
    ConstraintViolation,

    /// The request lacked a valid bearer token.
    #[error("a valid bearer token is required")]
    Unauthorized,

    /// The record schema could not be loaded or is inconsistent.
    #[error("invalid record schema: {0}")]
    InvalidSchema(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while serializing or deserializing stored JSON.
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(sql_error, _)
                if sql_error.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                tracing::warn!("a write was rejected by a table constraint: {sql_error}");
                Error::ConstraintViolation
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::JSONSerializationError(value.to_string())
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(error) => Error::InvalidPayload(error.body_text()),
            JsonRejection::JsonSyntaxError(error) => Error::MalformedJson(error.body_text()),
            JsonRejection::MissingJsonContentType(_) => Error::UnsupportedMediaType,
            rejection => Error::MalformedJson(rejection.body_text()),
        }
    }
}

/// A path parameter that does not parse as an ID cannot name an existing
/// resource.
impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!("Rejected path parameter: {}", rejection.body_text());
        Error::NotFound
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Error::MalformedJson(_) | Error::TooWeak(_) | Error::InvalidSchema(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::InvalidPayload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::ConstraintViolation => StatusCode::CONFLICT,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::HashingError(_)
            | Error::SqlError(_)
            | Error::JSONSerializationError(_)
            | Error::DatabaseLockError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status.is_server_error() {
            // Internal details are for the server logs only.
            tracing::error!("An unexpected error occurred: {}", self);
            "An unexpected error occurred, check the server logs for more details.".to_owned()
        } else {
            self.to_string()
        };

        let body = Json(json!({ "error": message }));

        match self {
            Error::Unauthorized => (
                status,
                [(axum::http::header::WWW_AUTHENTICATE, "Bearer")],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}
