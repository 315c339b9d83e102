// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::common::codes::CodeKind;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Código errado e código desativado são indistinguíveis para quem chama.
    #[error("Código de acesso inválido")]
    InvalidAccessCode,

    #[error("Formato de recibo inválido")]
    InvalidReceiptCode,

    #[error("Recibo não encontrado")]
    ReceiptNotFound,

    #[error("Submissão não encontrada")]
    SubmissionNotFound,

    #[error("Tenant não encontrado")]
    TenantNotFound,

    #[error("Resposta não encontrada")]
    ResponseNotFound,

    #[error("A submissão já possui uma resposta")]
    ResponseAlreadyExists,

    #[error("Token de administração inválido ou ausente")]
    Unauthorized,

    #[error("Limite de requisições excedido")]
    RateLimitExceeded,

    #[error("Não foi possível gerar um código {kind:?} único após {attempts} tentativas")]
    CodeGenerationExhausted { kind: CodeKind, attempts: u32 },

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro no contador de rate limit: {0}")]
    CounterStoreError(#[from] redis::RedisError),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidAccessCode
            | AppError::InvalidReceiptCode => StatusCode::BAD_REQUEST,
            AppError::ReceiptNotFound
            | AppError::SubmissionNotFound
            | AppError::TenantNotFound
            | AppError::ResponseNotFound => StatusCode::NOT_FOUND,
            AppError::ResponseAlreadyExists => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::CodeGenerationExhausted { .. }
            | AppError::DatabaseError(_)
            | AppError::CounterStoreError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let error_message = match self {
            // Retorna todos os erros de campo juntos, não só o primeiro.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::BTreeMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "One or more fields are invalid.",
                    "details": details,
                }));
                return (status, body).into_response();
            }
            AppError::InvalidAccessCode => "Invalid access code. Please check and try again.",
            AppError::InvalidReceiptCode => {
                "Invalid receipt code format. It should be 10 digits (e.g., 12345-67890)."
            }
            AppError::ReceiptNotFound => {
                "Receipt code not found. Please double-check your code and try again."
            }
            AppError::SubmissionNotFound => "Submission not found.",
            AppError::TenantNotFound => "Access code record not found.",
            AppError::ResponseNotFound => "This submission has no response yet.",
            AppError::ResponseAlreadyExists => "This submission already has a response.",
            AppError::Unauthorized => "Missing or invalid admin token.",
            AppError::RateLimitExceeded => "Too many requests. Please try again later.",

            // Erros internos: o detalhe fica no log, o cliente recebe uma mensagem opaca.
            ref e => {
                tracing::error!(error = %e, "Erro Interno do Servidor");
                "An error occurred. Please try again."
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
