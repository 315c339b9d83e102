// src/models/submission.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "submission_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionType {
    Issue,
    Concern,
    Question,
    Suggestion,
}

impl SubmissionType {
    pub const ALL: [SubmissionType; 4] = [
        SubmissionType::Issue,
        SubmissionType::Concern,
        SubmissionType::Question,
        SubmissionType::Suggestion,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SubmissionType::Issue => "Issue",
            SubmissionType::Concern => "Concern",
            SubmissionType::Question => "Question",
            SubmissionType::Suggestion => "Suggestion",
        }
    }
}

impl FromStr for SubmissionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ISSUE" => Ok(SubmissionType::Issue),
            "CONCERN" => Ok(SubmissionType::Concern),
            "QUESTION" => Ok(SubmissionType::Question),
            "SUGGESTION" => Ok(SubmissionType::Suggestion),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SubmissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "submission_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    New,
    InReview,
    Responded,
    Closed,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 4] = [
        SubmissionStatus::New,
        SubmissionStatus::InReview,
        SubmissionStatus::Responded,
        SubmissionStatus::Closed,
    ];

    /// Status depois que o RH cria ou edita uma resposta.
    /// CLOSED já passou de RESPONDED e não volta.
    pub fn after_response(self) -> Self {
        match self {
            SubmissionStatus::New | SubmissionStatus::InReview => SubmissionStatus::Responded,
            other => other,
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(SubmissionStatus::New),
            "IN_REVIEW" => Ok(SubmissionStatus::InReview),
            "RESPONDED" => Ok(SubmissionStatus::Responded),
            "CLOSED" => Ok(SubmissionStatus::Closed),
            _ => Err(()),
        }
    }
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub receipt_code: String,
    #[serde(rename = "type")]
    pub kind: SubmissionType,
    pub title: String,
    pub body: String,
    pub status: SubmissionStatus,
    pub tenant_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dados já validados e desescapados, prontos para persistir.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub receipt_code: String,
    pub kind: SubmissionType,
    pub title: String,
    pub body: String,
    pub tenant_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HrResponse {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// Payloads (formulários públicos)
// ---

#[derive(Debug, Deserialize)]
pub struct SubmitForm {
    #[serde(default)]
    pub access_code: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusLookupForm {
    #[serde(default)]
    pub receipt_code: String,
}

// ---
// Payloads (RH)
// ---

#[derive(Debug, Deserialize)]
pub struct ResponsePayload {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkStatusPayload {
    pub ids: Vec<Uuid>,
    pub status: SubmissionStatus,
}

/// Query string de `GET /admin/submissions`. Valor vazio = sem filtro.
#[derive(Debug, Default, Deserialize)]
pub struct SubmissionListQuery {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub q: Option<String>,
    pub page: Option<u32>,
}

/// Filtros da listagem já interpretados.
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub status: Option<SubmissionStatus>,
    pub kind: Option<SubmissionType>,
    // Busca parcial, sem diferenciar maiúsculas, em recibo, título e corpo.
    pub search: Option<String>,
}

// ---
// Respostas
// ---

/// O que o submissor anônimo enxerga ao consultar o recibo.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionView {
    pub receipt_code: String,
    #[serde(rename = "type")]
    pub kind: SubmissionType,
    pub title: String,
    pub body: String,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub response: Option<ResponseView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseView {
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubmissionView {
    pub fn new(submission: Submission, response: Option<HrResponse>) -> Self {
        Self {
            receipt_code: submission.receipt_code,
            kind: submission.kind,
            title: submission.title,
            body: submission.body,
            status: submission.status,
            created_at: submission.created_at,
            updated_at: submission.updated_at,
            response: response.map(|r| ResponseView {
                body: r.body,
                created_at: r.created_at,
                updated_at: r.updated_at,
            }),
        }
    }
}

/// Visão completa para o RH.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDetail {
    #[serde(flatten)]
    pub submission: Submission,
    pub response: Option<HrResponse>,
}

/// Linha da listagem e do dashboard: sem o corpo.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    pub id: Uuid,
    pub receipt_code: String,
    #[serde(rename = "type")]
    pub kind: SubmissionType,
    pub title: String,
    pub status: SubmissionStatus,
    pub has_response: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedView {
    pub receipt_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkStatusResult {
    pub updated: u64,
}
