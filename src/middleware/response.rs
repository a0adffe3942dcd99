use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

/// Wrapper for API responses that adds the `{"success": true, "data": ...}` envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: StatusCode,
    cookies: Vec<HeaderValue>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::with_status(data, StatusCode::OK)
    }

    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self {
            data,
            status_code,
            cookies: Vec::new(),
        }
    }

    pub fn created(data: T) -> Self {
        Self::with_status(data, StatusCode::CREATED)
    }

    /// Attach a `Set-Cookie` header. `None` (an unencodable cookie) is skipped.
    pub fn with_cookie(mut self, cookie: Option<HeaderValue>) -> Self {
        match cookie {
            Some(cookie) => self.cookies.push(cookie),
            None => tracing::warn!("Dropping cookie that could not be encoded as a header"),
        }
        self
    }
}

impl ApiResponse<()> {
    /// 204 No Content; the body is omitted
    pub fn no_content() -> Self {
        Self::with_status((), StatusCode::NO_CONTENT)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let mut response = if self.status_code == StatusCode::NO_CONTENT {
            self.status_code.into_response()
        } else {
            match serde_json::to_value(&self.data) {
                Ok(data) => (self.status_code, Json(json!({ "success": true, "data": data }))).into_response(),
                Err(e) => {
                    tracing::error!("Failed to serialize response data: {}", e);
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({
                            "success": false,
                            "error": "Failed to serialize response data",
                            "code": "INTERNAL_SERVER_ERROR"
                        })),
                    )
                        .into_response();
                }
            }
        };

        for cookie in self.cookies {
            response.headers_mut().append(header::SET_COOKIE, cookie);
        }
        response
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
