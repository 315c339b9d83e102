// src/handlers/hr.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Form, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    models::tenancy::{MessageResponse, RegisterHrPayload},
};

// POST /hr/register
pub async fn register(
    State(app_state): State<AppState>,
    Form(payload): Form<RegisterHrPayload>,
) -> Result<impl IntoResponse, AppError> {
    app_state.tenant_directory.register(payload).await?;

    // Mesma resposta para conta nova e existente; o código vai só por e-mail.
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "Registration received. Your access code has been sent to your email.".to_string(),
        }),
    ))
}
