//! Bearer-token authentication for the API.

mod middleware;
mod token;

pub use middleware::{AuthState, bearer_auth_guard};
pub use token::{IssuedToken, create_personal_access_token_table, issue_token};
