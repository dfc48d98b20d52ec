//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/financial-records/{record_id}', use [format_endpoint].

/// The route to list and create financial records.
pub const FINANCIAL_RECORDS: &str = "/financial-records";
/// The route to update or delete a single financial record.
pub const FINANCIAL_RECORD: &str = "/financial-records/{record_id}";
/// The route to delete several financial records at once.
pub const DELETE_MULTIPLE_FINANCIAL_RECORDS: &str = "/financial-records/delete-multiple";
/// The route to get the user who owns the request's bearer token.
pub const CURRENT_USER: &str = "/user";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace and ends with a right
/// brace. For example, in the endpoint path '/users/{user_id}', '{user_id}' is
/// the parameter.
///
/// This function assumes that an endpoint path contains at most one parameter.
/// If no parameter is found in `endpoint_path`, the function returns the
/// original `endpoint_path`.
#[cfg(test)]
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::FINANCIAL_RECORDS);
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::FINANCIAL_RECORD, 1));
        assert_endpoint_is_valid_uri(endpoints::DELETE_MULTIPLE_FINANCIAL_RECORDS);
        assert_endpoint_is_valid_uri(endpoints::CURRENT_USER);
    }

    #[test]
    fn format_endpoint_replaces_parameter() {
        assert_eq!(
            format_endpoint(endpoints::FINANCIAL_RECORD, 42),
            "/financial-records/42"
        );
    }

    #[test]
    fn format_endpoint_keeps_text_after_parameter() {
        assert_eq!(format_endpoint("/users/{user_id}/edit", 7), "/users/7/edit");
    }

    #[test]
    fn format_endpoint_without_parameter_is_unchanged() {
        assert_eq!(
            format_endpoint(endpoints::FINANCIAL_RECORDS, 1),
            endpoints::FINANCIAL_RECORDS
        );
    }
}
