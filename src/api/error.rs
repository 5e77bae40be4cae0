//! Error to HTTP response mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::EcommerceError;

impl EcommerceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidArgument(_) | Self::InvalidReference(_) => StatusCode::BAD_REQUEST,
            Self::ConcurrencyConflict(_) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Gateway(_) => StatusCode::BAD_GATEWAY,
            Self::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EcommerceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::ConcurrencyConflict(entity) => {
                warn!(entity = %entity, "Concurrent modification rejected");
                format!("{entity} was modified by another request. Please try again.")
            }
            Self::StorageError(detail) => {
                error!(error = %detail, "Request failed");
                "An error occurred. Please try again.".to_string()
            }
            Self::Gateway(detail) => {
                error!(error = %detail, "Payment gateway call failed");
                "Payment provider is unavailable.".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message, "retryable": self.is_retryable() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Entity;

    #[test]
    fn test_status_mapping() {
        assert_eq!(EcommerceError::NotFound(Entity::Cart).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(EcommerceError::invalid("q").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(EcommerceError::InvalidReference(Entity::User).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(EcommerceError::ConcurrencyConflict(Entity::CartItem).status_code(), StatusCode::CONFLICT);
        assert_eq!(EcommerceError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(EcommerceError::Gateway("down".into()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(EcommerceError::storage("pool timed out").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_storage_errors_do_not_leak_details() {
        let response = EcommerceError::storage("relation \"carts\" does not exist").into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("carts"));
    }
}
