// src/services/submission_service.rs

use std::borrow::Cow;
use std::sync::Arc;

use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::{
    common::{
        codes::{ensure_unique, normalize_receipt, AttemptBudget, CodeKind},
        error::AppError,
        sanitize::{char_len, sanitize_input, unescape_html},
    },
    db::{Insert, SubmissionStore},
    models::{
        submission::{
            HrResponse, NewSubmission, Page, Submission, SubmissionDetail, SubmissionFilter,
            SubmissionListQuery, SubmissionStatus, SubmissionSummary, SubmissionType, SubmissionView,
            SubmitForm,
        },
        tenancy::SubmissionRoute,
    },
    services::{
        notification::{Notification, NotificationQueue},
        tenancy_service::TenantDirectory,
    },
};

pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 255;
pub const BODY_MIN: usize = 10;
pub const BODY_MAX: usize = 5000;
pub const RESPONSE_MAX: usize = 5000;
pub const PAGE_SIZE: u32 = 25;

/// Campos que passaram na validação, ainda escapados.
#[derive(Debug)]
struct ValidatedFields {
    kind: SubmissionType,
    title: String,
    body: String,
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Valida todos os campos e devolve todos os erros juntos.
fn validate_fields(form: &SubmitForm) -> Result<ValidatedFields, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let kind = form.kind.trim().parse::<SubmissionType>().ok();
    if kind.is_none() {
        errors.add("type", field_error("choice", "Please select a valid submission type."));
    }

    // O corte em max_length acontece antes do escape, então o texto escapado
    // pode passar do limite e ser rejeitado aqui.
    let title = sanitize_input(&form.title, TITLE_MAX);
    let title_len = char_len(&title);
    if title_len < TITLE_MIN {
        errors.add("title", field_error("length", "Title must be at least 3 characters long."));
    } else if title_len > TITLE_MAX {
        errors.add("title", field_error("length", "Title is too long (maximum 255 characters)."));
    }

    let body = sanitize_input(&form.body, BODY_MAX);
    let body_len = char_len(&body);
    if body_len < BODY_MIN {
        errors.add("body", field_error("length", "Description must be at least 10 characters long."));
    } else if body_len > BODY_MAX {
        errors.add("body", field_error("length", "Description is too long (maximum 5000 characters)."));
    }

    match kind {
        Some(kind) if errors.is_empty() => Ok(ValidatedFields { kind, title, body }),
        _ => Err(errors),
    }
}

fn validate_response_body(body: &str) -> Result<String, ValidationErrors> {
    let body = body.trim();
    let len = char_len(body);

    if len == 0 || len > RESPONSE_MAX {
        let mut errors = ValidationErrors::new();
        errors.add(
            "body",
            field_error("length", "Response must be between 1 and 5000 characters."),
        );
        return Err(errors);
    }

    Ok(body.to_string())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Interpreta a query da listagem. Status ou tipo desconhecido é erro, não filtro vazio.
fn parse_filter(query: &SubmissionListQuery) -> Result<SubmissionFilter, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let status = non_blank(query.status.as_deref()).and_then(|raw| {
        let parsed = raw.parse::<SubmissionStatus>().ok();
        if parsed.is_none() {
            errors.add("status", field_error("choice", "Unknown status filter."));
        }
        parsed
    });

    let kind = non_blank(query.kind.as_deref()).and_then(|raw| {
        let parsed = raw.parse::<SubmissionType>().ok();
        if parsed.is_none() {
            errors.add("type", field_error("choice", "Unknown type filter."));
        }
        parsed
    });

    // Um recibo digitado sem traço ainda encontra a forma armazenada.
    let search = non_blank(query.q.as_deref())
        .map(|q| normalize_receipt(q).unwrap_or_else(|| q.to_string()));

    if errors.is_empty() {
        Ok(SubmissionFilter { status, kind, search })
    } else {
        Err(errors)
    }
}

/// Recebe submissões anônimas e as entrega ao RH certo.
#[derive(Clone)]
pub struct SubmissionRouter {
    store: Arc<dyn SubmissionStore>,
    directory: TenantDirectory,
    notifications: NotificationQueue,
    // Destinatários das submissões feitas com o código legado.
    default_recipients: Arc<Vec<String>>,
    public_base_url: Option<String>,
}

impl SubmissionRouter {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        directory: TenantDirectory,
        notifications: NotificationQueue,
        default_recipients: Vec<String>,
        public_base_url: Option<String>,
    ) -> Self {
        Self {
            store,
            directory,
            notifications,
            default_recipients: Arc::new(default_recipients),
            public_base_url,
        }
    }

    pub async fn submit(&self, form: SubmitForm) -> Result<Submission, AppError> {
        // 1. Código de acesso primeiro. A mensagem é sempre a mesma, exista o
        //    tenant, esteja inativo ou não.
        let route = self
            .directory
            .route(&form.access_code)
            .await?
            .ok_or(AppError::InvalidAccessCode)?;

        // 2. Campos
        let fields = validate_fields(&form)?;

        // 3. Persiste (o banco guarda o texto original)
        let tenant_id = match &route {
            SubmissionRoute::Tenant(tenant) => Some(tenant.id),
            SubmissionRoute::Legacy => None,
        };
        let submission = self
            .insert_with_fresh_receipt(fields.kind, unescape_html(&fields.title), unescape_html(&fields.body), tenant_id)
            .await?;

        tracing::info!(
            submission_id = %submission.id,
            tenant_id = ?submission.tenant_id,
            kind = %submission.kind,
            "Submissão recebida"
        );

        // 4. Notifica sem esperar; falha aqui nunca volta para o submissor
        self.notify_new_submission(&route, &submission);

        Ok(submission)
    }

    async fn insert_with_fresh_receipt(
        &self,
        kind: SubmissionType,
        title: String,
        body: String,
        tenant_id: Option<Uuid>,
    ) -> Result<Submission, AppError> {
        // Um orçamento só para checagens e colisões no INSERT.
        let mut budget = AttemptBudget::new(CodeKind::Receipt);

        loop {
            let store = self.store.clone();
            let receipt_code = ensure_unique(
                &mut budget,
                || CodeKind::Receipt.generate(),
                |candidate| {
                    let store = store.clone();
                    async move { store.receipt_code_exists(&candidate).await }
                },
            )
            .await?;

            let new_submission = NewSubmission {
                receipt_code,
                kind,
                title: title.clone(),
                body: body.clone(),
                tenant_id,
            };

            match self.store.insert_submission(&new_submission).await? {
                Insert::Created(submission) => return Ok(submission),
                Insert::CodeTaken => {
                    tracing::warn!(attempts = budget.used(), "Recibo colidiu no INSERT, gerando outro");
                }
            }
        }
    }

    fn notify_new_submission(&self, route: &SubmissionRoute, submission: &Submission) {
        let recipients = match route {
            SubmissionRoute::Tenant(tenant) => {
                vec![TenantDirectory::notification_address(tenant).to_string()]
            }
            SubmissionRoute::Legacy => self.default_recipients.to_vec(),
        };

        if recipients.is_empty() {
            tracing::warn!(submission_id = %submission.id, "Submissão legada sem HR_NOTIFY_EMAILS, ninguém será avisado");
            return;
        }

        let mut body = format!(
            "A new anonymous submission was received.\n\n\
             Type: {kind}\n\
             Title: {title}\n\
             Receipt: {receipt}\n\
             Submitted: {at}\n",
            kind = submission.kind.label(),
            title = submission.title,
            receipt = submission.receipt_code,
            at = submission.created_at.format("%Y-%m-%d %H:%M UTC"),
        );
        if let Some(base) = &self.public_base_url {
            body.push_str(&format!("\nView it at: {base}/admin/submissions/{}\n", submission.id));
        }

        self.notifications.enqueue(Notification {
            recipients,
            subject: format!("New anonymous submission: {}", submission.kind.label()),
            body,
        });
    }

    /// Consulta anônima pelo recibo. Aceita com ou sem traço.
    pub async fn lookup_status(&self, receipt_input: &str) -> Result<SubmissionView, AppError> {
        let receipt_code = normalize_receipt(receipt_input).ok_or(AppError::InvalidReceiptCode)?;

        let (submission, response) = self
            .store
            .find_by_receipt(&receipt_code)
            .await?
            .ok_or(AppError::ReceiptNotFound)?;

        Ok(SubmissionView::new(submission, response))
    }

    /// Listagem do RH: 25 por página, mais novas primeiro.
    pub async fn list(&self, query: SubmissionListQuery) -> Result<Page<SubmissionSummary>, AppError> {
        let filter = parse_filter(&query)?;
        let page = query.page.unwrap_or(1).max(1);
        let offset = i64::from(page - 1) * i64::from(PAGE_SIZE);

        let (items, total) = self
            .store
            .list_submissions(&filter, i64::from(PAGE_SIZE), offset)
            .await?;

        Ok(Page { items, page, per_page: PAGE_SIZE, total })
    }

    pub async fn find_by_id(&self, submission_id: Uuid) -> Result<SubmissionDetail, AppError> {
        let (submission, response) = self
            .store
            .find_by_id(submission_id)
            .await?
            .ok_or(AppError::SubmissionNotFound)?;

        Ok(SubmissionDetail { submission, response })
    }

    pub async fn create_response(&self, submission_id: Uuid, body: &str) -> Result<HrResponse, AppError> {
        let body = validate_response_body(body)?;
        let response = self.store.create_response(submission_id, &body).await?;
        tracing::info!(%submission_id, "Resposta do RH criada");
        Ok(response)
    }

    pub async fn update_response(&self, submission_id: Uuid, body: &str) -> Result<HrResponse, AppError> {
        let body = validate_response_body(body)?;
        let response = self.store.update_response(submission_id, &body).await?;
        tracing::info!(%submission_id, "Resposta do RH atualizada");
        Ok(response)
    }

    pub async fn set_status(&self, ids: &[Uuid], status: SubmissionStatus) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let updated = self.store.set_status(ids, status).await?;
        tracing::info!(requested = ids.len(), updated, ?status, "Status alterado em lote");
        Ok(updated)
    }
}
