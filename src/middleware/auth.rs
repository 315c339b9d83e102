// src/middleware/auth.rs

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{common::error::AppError, config::AppState};

/// Protege as rotas `/admin` com o token estático `ADMIN_API_TOKEN`.
/// Sem token configurado, tudo é recusado.
pub async fn admin_guard(
    State(app_state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = app_state.settings.admin_api_token.as_deref() else {
        return Err(AppError::Unauthorized);
    };

    match bearer {
        Some(TypedHeader(Authorization(token))) if token_matches(token.token(), expected) => {
            Ok(next.run(request).await)
        }
        _ => {
            tracing::warn!("Acesso admin recusado");
            Err(AppError::Unauthorized)
        }
    }
}

// Comparação sem saída antecipada no primeiro byte diferente.
fn token_matches(given: &str, expected: &str) -> bool {
    given.len() == expected.len()
        && given
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
