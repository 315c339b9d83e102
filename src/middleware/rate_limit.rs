// src/middleware/rate_limit.rs

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{
    common::error::AppError, config::AppState, middleware::client_ip::ClientIdentity,
    services::rate_limit::Bucket,
};

/// Conta a requisição antes do handler. Estourou a janela: 429.
pub async fn rate_limit_guard(
    State((app_state, bucket)): State<(AppState, Bucket)>,
    client: ClientIdentity,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !app_state.rate_limiter.allow(bucket, &client.0).await? {
        return Err(AppError::RateLimitExceeded);
    }

    Ok(next.run(request).await)
}
