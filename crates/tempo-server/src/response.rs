//! Response types and helpers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Pagination metadata attached to list responses.
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub limit: i64,
    pub offset: i64,
    pub returned: usize,
}

/// A plain `200 OK` JSON body.
pub struct SuccessResponse<T: Serialize>(pub T);

impl<T: Serialize> IntoResponse for SuccessResponse<T> {
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}

/// A paginated list response.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T: Serialize> IntoResponse for PaginatedResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// `201 Created` with the created resource as the body.
pub struct Created<T: Serialize>(pub T);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self.0)).into_response()
    }
}

/// `204 No Content`, for successful deletes.
pub struct NoContent;

impl IntoResponse for NoContent {
    fn into_response(self) -> Response {
        StatusCode::NO_CONTENT.into_response()
    }
}

pub fn paginated<T: Serialize>(data: Vec<T>, limit: i64, offset: i64) -> PaginatedResponse<T> {
    let returned = data.len();
    PaginatedResponse {
        data,
        meta: PaginationMeta { limit, offset, returned },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginated_meta_reports_returned_count() {
        let response = paginated(vec!["a", "b", "c"], 10, 0);
        assert_eq!(response.meta.returned, 3);
        assert_eq!(response.meta.limit, 10);
    }
}
