pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod submission_repo;
pub use submission_repo::SubmissionRepository;
pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        submission::{
            HrResponse, NewSubmission, Submission, SubmissionFilter, SubmissionStatus, SubmissionSummary,
        },
        tenancy::{HrOwner, NewTenant, Tenant, TenantChanges},
    },
};

/// Resultado de um INSERT numa tabela com código único.
#[derive(Debug)]
pub enum Insert<T> {
    Created(T),
    // A constraint única do código disparou: gere outro e tente de novo.
    CodeTaken,
}

/// Persistência de contas de RH e tenants.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Só encontra tenants com `is_active = true`.
    async fn find_active_by_code(&self, access_code: &str) -> Result<Option<Tenant>, AppError>;

    async fn access_code_exists(&self, access_code: &str) -> Result<bool, AppError>;

    async fn find_by_id(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AppError>;

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<Tenant>, AppError>;

    async fn find_owner_by_email(&self, email: &str) -> Result<Option<HrOwner>, AppError>;

    /// Cria a conta ou devolve a existente com o mesmo e-mail.
    async fn get_or_create_owner(&self, email: &str) -> Result<HrOwner, AppError>;

    /// `Ok(None)` quando o dono já tem um tenant (corrida entre dois cadastros).
    async fn insert_tenant(&self, new: &NewTenant) -> Result<Option<Insert<Tenant>>, AppError>;

    /// Mais novos primeiro.
    async fn list_tenants(&self) -> Result<Vec<Tenant>, AppError>;

    async fn update_tenant(
        &self,
        tenant_id: Uuid,
        changes: &TenantChanges,
    ) -> Result<Option<Tenant>, AppError>;

    async fn replace_access_code(
        &self,
        tenant_id: Uuid,
        access_code: &str,
    ) -> Result<Option<Insert<Tenant>>, AppError>;
}

/// Persistência de submissões e respostas do RH.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn receipt_code_exists(&self, receipt_code: &str) -> Result<bool, AppError>;

    async fn insert_submission(&self, new: &NewSubmission) -> Result<Insert<Submission>, AppError>;

    async fn find_by_receipt(
        &self,
        receipt_code: &str,
    ) -> Result<Option<(Submission, Option<HrResponse>)>, AppError>;

    async fn find_by_id(
        &self,
        submission_id: Uuid,
    ) -> Result<Option<(Submission, Option<HrResponse>)>, AppError>;

    /// Cria a resposta e move o status para RESPONDED na mesma transação.
    async fn create_response(&self, submission_id: Uuid, body: &str) -> Result<HrResponse, AppError>;

    async fn update_response(&self, submission_id: Uuid, body: &str) -> Result<HrResponse, AppError>;

    async fn set_status(&self, ids: &[Uuid], status: SubmissionStatus) -> Result<u64, AppError>;

    /// Uma página da listagem, mais novas primeiro, e o total que casa com o filtro.
    async fn list_submissions(
        &self,
        filter: &SubmissionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SubmissionSummary>, i64), AppError>;
}
