// src/models/tenancy.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidateEmail, ValidationError, ValidationErrors};

// ---
// 1. HrOwner (A conta de RH)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HrOwner {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 2. Tenant (O escopo de um código de acesso)
// ---
// `owner_email` vem do JOIN com hr_owners.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub access_code: String,
    pub owner_id: Uuid,
    pub owner_email: String,
    pub notification_email: Option<String>,
    pub is_active: bool,
    pub company_name: String,
    pub company_website: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Alterações parciais de um tenant. `None` deixa o campo como está.
#[derive(Debug, Clone, Default)]
pub struct TenantChanges {
    pub is_active: Option<bool>,
    // `Some(None)` remove o override e a notificação volta ao dono.
    pub notification_email: Option<Option<String>>,
}

/// Dados para inserir um tenant novo.
#[derive(Debug, Clone)]
pub struct NewTenant {
    pub access_code: String,
    pub owner_id: Uuid,
    pub company_name: String,
    pub company_website: String,
}

// ---
// 3. Resolução de um código de acesso
// ---
#[derive(Debug, Clone)]
pub enum Resolution {
    Found(Tenant),
    NotFound,
}

/// Para onde uma submissão vai depois de validar o código.
#[derive(Debug, Clone)]
pub enum SubmissionRoute {
    Tenant(Tenant),
    // O código estático antigo: sem tenant, notifica a lista padrão.
    Legacy,
}

// ---
// 4. Payloads
// ---
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterHrPayload {
    #[serde(default)]
    #[validate(length(min = 2, max = 150, message = "Company name must be between 2 and 150 characters."))]
    pub company_name: String,
    #[serde(default)]
    #[validate(email(message = "Please enter a valid email address."))]
    pub email: String,
    #[validate(url(message = "Please enter a valid website URL."))]
    pub website: Option<String>,
}

impl RegisterHrPayload {
    /// Trim em tudo e trata website vazio como ausente (formulários mandam "").
    /// Sem esquema, o site ganha `https://`: "acme.com" é um site válido.
    pub fn normalized(self) -> Self {
        Self {
            company_name: self.company_name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            website: self
                .website
                .map(|w| w.trim().to_string())
                .filter(|w| !w.is_empty())
                .map(|w| if w.contains("://") { w } else { format!("https://{w}") }),
        }
    }
}

/// Corpo do `PATCH /admin/tenants/{id}`. Campo ausente não muda nada;
/// `notificationEmail: ""` remove o override.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTenantPayload {
    pub is_active: Option<bool>,
    pub notification_email: Option<String>,
}

impl UpdateTenantPayload {
    pub fn into_changes(self) -> Result<TenantChanges, ValidationErrors> {
        let notification_email = match self.notification_email.map(|e| e.trim().to_lowercase()) {
            None => None,
            Some(email) if email.is_empty() => Some(None),
            Some(email) if email.validate_email() => Some(Some(email)),
            Some(_) => {
                let mut error = ValidationError::new("email");
                error.message = Some("Please enter a valid email address.".into());
                let mut errors = ValidationErrors::new();
                errors.add("notificationEmail", error);
                return Err(errors);
            }
        };

        Ok(TenantChanges { is_active: self.is_active, notification_email })
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
