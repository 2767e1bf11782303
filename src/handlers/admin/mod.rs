//! # Administrative Handlers
//!
//! Staff-only CRUD over clients, servers, tools, routines and validations.
//! Every route here sits behind both the bearer identity middleware and
//! [`require_staff`](crate::auth::require_staff).

pub mod clients;
pub mod routines;
pub mod tools;
pub mod validations;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::server::AppState;

/// Parse an optional numeric query value; empty strings count as absent.
pub(crate) fn optional_id(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<i32>, crate::error::ApiError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<i32>()
            .map(Some)
            .map_err(|_| crate::error::field_error(field, &format!("Invalid id '{value}'"))),
    }
}

/// Routes mounted under `/admin`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/clients", get(clients::list_clients).post(clients::create_client))
        .route(
            "/clients/{client_id}",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        .route("/clients/{client_id}/servers", post(clients::create_server))
        .route(
            "/servers/{server_id}",
            put(clients::update_server).delete(clients::delete_server),
        )
        .route("/tools", get(tools::list_tools).post(tools::create_tool))
        .route("/tools/{tool_id}", delete(tools::delete_tool))
        .route("/routines", get(routines::list_routines).post(routines::create_routine))
        .route(
            "/routines/{routine_id}",
            get(routines::get_routine)
                .put(routines::update_routine)
                .delete(routines::delete_routine),
        )
        .route("/validations", get(validations::list_validations))
        .route(
            "/validations/{validation_id}",
            get(validations::get_validation)
                .put(validations::update_validation)
                .delete(validations::delete_validation),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_id_treats_blank_as_absent() {
        assert_eq!(optional_id("client_id", None).unwrap(), None);
        assert_eq!(optional_id("client_id", Some("  ")).unwrap(), None);
        assert_eq!(optional_id("client_id", Some("7")).unwrap(), Some(7));
    }

    #[test]
    fn optional_id_rejects_garbage() {
        let err = optional_id("tool_id", Some("abc")).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(&*err.code, "VALIDATION_FAILED");
    }
}
