use std::path::Path;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    handler::HandlerWithoutStateExt,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::debug;

use super::AppState;
use super::error::{ApiError, ApiResult};
use crate::conversion::Conversion;
use crate::core::ConversionError;

#[derive(Debug, Deserialize)]
struct ConvertParams {
    base: Option<String>,
    /// Comma separated target codes.
    to: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SupportedCurrencies {
    supported_currencies: Vec<String>,
}

async fn convert(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ConvertParams>, QueryRejection>,
) -> ApiResult<Json<Conversion>> {
    let Query(params) = params.map_err(|rejection| {
        debug!(error = %rejection, "Rejecting malformed conversion query");
        ConversionError::InvalidCurrency
    })?;
    let base = params.base.unwrap_or_default();
    let to = params.to.unwrap_or_default();
    if base.is_empty() || to.is_empty() {
        return Err(ConversionError::InvalidCurrency.into());
    }

    let targets: Vec<&str> = to.split(',').collect();
    let conversion = state.conversions.convert(&base, &targets)?;
    Ok(Json(conversion))
}

async fn list_currencies(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<SupportedCurrencies>> {
    let supported_currencies = state.conversions.list_supported()?;
    Ok(Json(SupportedCurrencies {
        supported_currencies,
    }))
}

/// Every request the API does not understand gets the invalid currency reply.
async fn invalid_request() -> ApiError {
    ConversionError::InvalidCurrency.into()
}

pub fn app_router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .route("/convert", get(convert).fallback(invalid_request))
        .route("/list", get(list_currencies).fallback(invalid_request));

    let router = match static_dir {
        Some(dir) => router.fallback_service(
            ServeDir::new(dir)
                .call_fallback_on_method_not_allowed(true)
                .fallback(invalid_request.into_service()),
        ),
        None => router.fallback(invalid_request),
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
