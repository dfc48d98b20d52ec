//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};

use crate::{
    AppState, Error,
    auth::bearer_auth_guard,
    endpoints,
    record::{
        create_record_endpoint, delete_multiple_records_endpoint, delete_record_endpoint,
        list_records_endpoint, update_record_endpoint,
    },
    user::get_current_user,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(
            endpoints::FINANCIAL_RECORDS,
            get(list_records_endpoint).post(create_record_endpoint),
        )
        .route(
            endpoints::FINANCIAL_RECORD,
            put(update_record_endpoint).delete(delete_record_endpoint),
        )
        .route(
            endpoints::DELETE_MULTIPLE_FINANCIAL_RECORDS,
            post(delete_multiple_records_endpoint),
        );

    let protected_routes = Router::new()
        .route(endpoints::CURRENT_USER, get(get_current_user))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            bearer_auth_guard,
        ));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .method_not_allowed_fallback(get_405_method_not_allowed)
        .with_state(state)
}

async fn get_404_not_found() -> Response {
    Error::NotFound.into_response()
}

async fn get_405_method_not_allowed() -> Response {
    Error::MethodNotAllowed.into_response()
}


#[cfg(test)]
mod current_user_route_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{
        AppState, PasswordHash, RecordSchema, build_router, endpoints, issue_token,
        user::{NewUser, create_user},
    };

    fn get_test_server_and_token() -> (TestServer, String) {
        let connection = Connection::open_in_memory().expect("Could not open in-memory database");
        let state = AppState::new(connection, RecordSchema::default())
            .expect("Could not create app state");

        let token = {
            let connection = state.db_connection.lock().unwrap();
            let user = create_user(
                NewUser {
                    name: "Alice".to_owned(),
                    email: "alice@example.com".to_owned(),
                    password_hash: PasswordHash::new_unchecked("hunter2"),
                },
                &connection,
            )
            .unwrap();

            issue_token(user.id, "test", &connection).unwrap()
        };

        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");

        (server, token.plain_text)
    }

    #[tokio::test]
    async fn returns_token_owner() {
        let (server, token) = get_test_server_and_token();

        let response = server
            .get(endpoints::CURRENT_USER)
            .authorization_bearer(token)
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({"id": 1, "name": "Alice", "email": "alice@example.com"}));
    }

    #[tokio::test]
    async fn requires_token() {
        let (server, _) = get_test_server_and_token();

        let response = server.get(endpoints::CURRENT_USER).await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn record_routes_do_not_require_token() {
        let (server, _) = get_test_server_and_token();

        server
            .get(endpoints::FINANCIAL_RECORDS)
            .await
            .assert_status_ok();
    }
}
