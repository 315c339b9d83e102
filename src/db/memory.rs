// src/db/memory.rs

// Stores em memória para os testes dos serviços.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Mutex,
};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{Insert, SubmissionStore, TenantStore},
    models::{
        submission::{
            HrResponse, NewSubmission, Submission, SubmissionFilter, SubmissionStatus, SubmissionSummary,
        },
        tenancy::{HrOwner, NewTenant, Tenant, TenantChanges},
    },
};

#[derive(Default)]
pub struct MemoryTenantStore {
    owners: Mutex<Vec<HrOwner>>,
    tenants: Mutex<Vec<Tenant>>,
    /// Quantos INSERTs seguintes devem falhar como se o código já existisse.
    pub forced_collisions: AtomicU32,
    /// Quantas checagens de existência seguintes respondem "já existe".
    pub forced_exists: AtomicU32,
}

impl MemoryTenantStore {
    pub fn tenants(&self) -> Vec<Tenant> {
        self.tenants.lock().unwrap().clone()
    }

    pub fn owners(&self) -> Vec<HrOwner> {
        self.owners.lock().unwrap().clone()
    }
}

fn take_collision(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

// Mais novos primeiro; empate no relógio mantém a ordem de inserção invertida.
fn newest_first<T>(items: &[T], created_at: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<&T> {
    let mut sorted: Vec<&T> = items.iter().rev().collect();
    sorted.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    sorted
}

#[async_trait]
impl TenantStore for MemoryTenantStore {
    async fn find_active_by_code(&self, access_code: &str) -> Result<Option<Tenant>, AppError> {
        let tenants = self.tenants.lock().unwrap();
        Ok(tenants
            .iter()
            .find(|t| t.access_code == access_code && t.is_active)
            .cloned())
    }

    async fn access_code_exists(&self, access_code: &str) -> Result<bool, AppError> {
        if take_collision(&self.forced_exists) {
            return Ok(true);
        }
        let tenants = self.tenants.lock().unwrap();
        Ok(tenants.iter().any(|t| t.access_code == access_code))
    }

    async fn find_by_id(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AppError> {
        let tenants = self.tenants.lock().unwrap();
        Ok(tenants.iter().find(|t| t.id == tenant_id).cloned())
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<Tenant>, AppError> {
        let tenants = self.tenants.lock().unwrap();
        Ok(tenants.iter().find(|t| t.owner_id == owner_id).cloned())
    }

    async fn find_owner_by_email(&self, email: &str) -> Result<Option<HrOwner>, AppError> {
        let owners = self.owners.lock().unwrap();
        Ok(owners
            .iter()
            .find(|o| o.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get_or_create_owner(&self, email: &str) -> Result<HrOwner, AppError> {
        let mut owners = self.owners.lock().unwrap();
        if let Some(existing) = owners.iter().find(|o| o.email.eq_ignore_ascii_case(email)) {
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let owner = HrOwner { id: Uuid::new_v4(), email: email.to_string(), created_at: now, updated_at: now };
        owners.push(owner.clone());
        Ok(owner)
    }

    async fn insert_tenant(&self, new: &NewTenant) -> Result<Option<Insert<Tenant>>, AppError> {
        if take_collision(&self.forced_collisions) {
            return Ok(Some(Insert::CodeTaken));
        }

        let owner_email = self
            .owners
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == new.owner_id)
            .map(|o| o.email.clone())
            .ok_or(AppError::TenantNotFound)?;

        let mut tenants = self.tenants.lock().unwrap();
        if tenants.iter().any(|t| t.owner_id == new.owner_id) {
            return Ok(None);
        }
        if tenants.iter().any(|t| t.access_code == new.access_code) {
            return Ok(Some(Insert::CodeTaken));
        }

        let now = Utc::now();
        let tenant = Tenant {
            id: Uuid::new_v4(),
            access_code: new.access_code.clone(),
            owner_id: new.owner_id,
            owner_email,
            notification_email: None,
            is_active: true,
            company_name: new.company_name.clone(),
            company_website: new.company_website.clone(),
            created_at: now,
            updated_at: now,
        };
        tenants.push(tenant.clone());
        Ok(Some(Insert::Created(tenant)))
    }

    async fn list_tenants(&self) -> Result<Vec<Tenant>, AppError> {
        let tenants = self.tenants.lock().unwrap();
        Ok(newest_first(tenants.as_slice(), |t| t.created_at).into_iter().cloned().collect())
    }

    async fn update_tenant(
        &self,
        tenant_id: Uuid,
        changes: &TenantChanges,
    ) -> Result<Option<Tenant>, AppError> {
        let mut tenants = self.tenants.lock().unwrap();
        Ok(tenants.iter_mut().find(|t| t.id == tenant_id).map(|t| {
            if let Some(is_active) = changes.is_active {
                t.is_active = is_active;
            }
            if let Some(email) = &changes.notification_email {
                t.notification_email = email.clone();
            }
            t.updated_at = Utc::now();
            t.clone()
        }))
    }

    async fn replace_access_code(
        &self,
        tenant_id: Uuid,
        access_code: &str,
    ) -> Result<Option<Insert<Tenant>>, AppError> {
        let mut tenants = self.tenants.lock().unwrap();
        if tenants.iter().any(|t| t.access_code == access_code) {
            return Ok(Some(Insert::CodeTaken));
        }
        Ok(tenants.iter_mut().find(|t| t.id == tenant_id).map(|t| {
            t.access_code = access_code.to_string();
            t.updated_at = Utc::now();
            Insert::Created(t.clone())
        }))
    }
}

#[derive(Default)]
pub struct MemorySubmissionStore {
    submissions: Mutex<Vec<Submission>>,
    responses: Mutex<Vec<HrResponse>>,
    pub forced_collisions: AtomicU32,
    pub forced_exists: AtomicU32,
}

impl MemorySubmissionStore {
    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    fn find_with_response(
        &self,
        predicate: impl Fn(&Submission) -> bool,
    ) -> Option<(Submission, Option<HrResponse>)> {
        let submissions = self.submissions.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        submissions.iter().find(|s| predicate(s)).map(|s| {
            let response = responses.iter().find(|r| r.submission_id == s.id).cloned();
            (s.clone(), response)
        })
    }
}

#[async_trait]
impl SubmissionStore for MemorySubmissionStore {
    async fn receipt_code_exists(&self, receipt_code: &str) -> Result<bool, AppError> {
        if take_collision(&self.forced_exists) {
            return Ok(true);
        }
        let submissions = self.submissions.lock().unwrap();
        Ok(submissions.iter().any(|s| s.receipt_code == receipt_code))
    }

    async fn insert_submission(&self, new: &NewSubmission) -> Result<Insert<Submission>, AppError> {
        if take_collision(&self.forced_collisions) {
            return Ok(Insert::CodeTaken);
        }

        let mut submissions = self.submissions.lock().unwrap();
        if submissions.iter().any(|s| s.receipt_code == new.receipt_code) {
            return Ok(Insert::CodeTaken);
        }

        let now = Utc::now();
        let submission = Submission {
            id: Uuid::new_v4(),
            receipt_code: new.receipt_code.clone(),
            kind: new.kind,
            title: new.title.clone(),
            body: new.body.clone(),
            status: SubmissionStatus::New,
            tenant_id: new.tenant_id,
            created_at: now,
            updated_at: now,
        };
        submissions.push(submission.clone());
        Ok(Insert::Created(submission))
    }

    async fn find_by_receipt(
        &self,
        receipt_code: &str,
    ) -> Result<Option<(Submission, Option<HrResponse>)>, AppError> {
        Ok(self.find_with_response(|s| s.receipt_code == receipt_code))
    }

    async fn find_by_id(
        &self,
        submission_id: Uuid,
    ) -> Result<Option<(Submission, Option<HrResponse>)>, AppError> {
        Ok(self.find_with_response(|s| s.id == submission_id))
    }

    async fn create_response(&self, submission_id: Uuid, body: &str) -> Result<HrResponse, AppError> {
        let mut submissions = self.submissions.lock().unwrap();
        let mut responses = self.responses.lock().unwrap();

        let submission = submissions
            .iter_mut()
            .find(|s| s.id == submission_id)
            .ok_or(AppError::SubmissionNotFound)?;
        if responses.iter().any(|r| r.submission_id == submission_id) {
            return Err(AppError::ResponseAlreadyExists);
        }

        let now = Utc::now();
        let response = HrResponse { id: Uuid::new_v4(), submission_id, body: body.to_string(), created_at: now, updated_at: now };
        responses.push(response.clone());
        submission.status = submission.status.after_response();
        submission.updated_at = now;
        Ok(response)
    }

    async fn update_response(&self, submission_id: Uuid, body: &str) -> Result<HrResponse, AppError> {
        let mut submissions = self.submissions.lock().unwrap();
        let mut responses = self.responses.lock().unwrap();

        let submission = submissions
            .iter_mut()
            .find(|s| s.id == submission_id)
            .ok_or(AppError::SubmissionNotFound)?;
        let response = responses
            .iter_mut()
            .find(|r| r.submission_id == submission_id)
            .ok_or(AppError::ResponseNotFound)?;

        let now = Utc::now();
        response.body = body.to_string();
        response.updated_at = now;
        submission.status = submission.status.after_response();
        submission.updated_at = now;
        Ok(response.clone())
    }

    async fn set_status(&self, ids: &[Uuid], status: SubmissionStatus) -> Result<u64, AppError> {
        let mut submissions = self.submissions.lock().unwrap();
        let mut updated = 0;
        for s in submissions.iter_mut().filter(|s| ids.contains(&s.id)) {
            s.status = status;
            s.updated_at = Utc::now();
            updated += 1;
        }
        Ok(updated)
    }

    async fn list_submissions(
        &self,
        filter: &SubmissionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SubmissionSummary>, i64), AppError> {
        let submissions = self.submissions.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let needle = filter.search.as_deref().map(str::to_lowercase);

        let matching: Vec<&Submission> = newest_first(submissions.as_slice(), |s| s.created_at)
            .into_iter()
            .filter(|s| filter.status.is_none_or(|status| s.status == status))
            .filter(|s| filter.kind.is_none_or(|kind| s.kind == kind))
            .filter(|s| {
                needle.as_deref().is_none_or(|needle| {
                    [&s.receipt_code, &s.title, &s.body]
                        .iter()
                        .any(|field| field.to_lowercase().contains(needle))
                })
            })
            .collect();

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|s| SubmissionSummary {
                id: s.id,
                receipt_code: s.receipt_code.clone(),
                kind: s.kind,
                title: s.title.clone(),
                status: s.status,
                has_response: responses.iter().any(|r| r.submission_id == s.id),
                created_at: s.created_at,
            })
            .collect();

        Ok((items, total))
    }
}
