use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::core::ConversionError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Conversion(#[from] ConversionError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Conversion(ConversionError::InvalidCurrency) => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
