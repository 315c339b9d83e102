// src/services/tenancy_service.rs

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        codes::{ensure_unique, AttemptBudget, CodeKind},
        error::AppError,
    },
    db::{Insert, TenantStore},
    models::tenancy::{
        HrOwner, NewTenant, RegisterHrPayload, Resolution, SubmissionRoute, Tenant, UpdateTenantPayload,
    },
    services::notification::{Notification, NotificationQueue},
};

/// Diretório de tenants: código de acesso -> RH dono.
#[derive(Clone)]
pub struct TenantDirectory {
    store: Arc<dyn TenantStore>,
    // Código estático antigo, aceito sem tenant. Só é avaliado depois da busca
    // por tenant falhar.
    legacy_access_code: Option<String>,
    notifications: NotificationQueue,
}

impl TenantDirectory {
    pub fn new(
        store: Arc<dyn TenantStore>,
        legacy_access_code: Option<String>,
        notifications: NotificationQueue,
    ) -> Self {
        Self { store, legacy_access_code, notifications }
    }

    /// Só tenants ativos. Inativo e inexistente dão o mesmo `NotFound`.
    pub async fn resolve(&self, access_code: &str) -> Result<Resolution, AppError> {
        let access_code = access_code.trim();
        if access_code.is_empty() {
            return Ok(Resolution::NotFound);
        }

        Ok(match self.store.find_active_by_code(access_code).await? {
            Some(tenant) => Resolution::Found(tenant),
            None => Resolution::NotFound,
        })
    }

    /// Busca por tenant primeiro; o código legado é o fallback explícito.
    pub async fn route(&self, access_code: &str) -> Result<Option<SubmissionRoute>, AppError> {
        if let Resolution::Found(tenant) = self.resolve(access_code).await? {
            return Ok(Some(SubmissionRoute::Tenant(tenant)));
        }

        let matches_legacy = self
            .legacy_access_code
            .as_deref()
            .is_some_and(|legacy| legacy == access_code.trim());

        Ok(matches_legacy.then_some(SubmissionRoute::Legacy))
    }

    /// Endereço que recebe as notificações do tenant.
    pub fn notification_address(tenant: &Tenant) -> &str {
        tenant
            .notification_email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .unwrap_or(&tenant.owner_email)
    }

    /// Um tenant por dono: chamar de novo devolve o existente.
    pub async fn create_for_owner(
        &self,
        owner: &HrOwner,
        company_name: &str,
        company_website: &str,
    ) -> Result<Tenant, AppError> {
        if let Some(existing) = self.store.find_by_owner(owner.id).await? {
            return Ok(existing);
        }

        let mut budget = AttemptBudget::new(CodeKind::Access);
        loop {
            let access_code = self.unused_access_code(&mut budget).await?;

            let new_tenant = NewTenant {
                access_code,
                owner_id: owner.id,
                company_name: company_name.to_string(),
                company_website: company_website.to_string(),
            };

            match self.store.insert_tenant(&new_tenant).await? {
                Some(Insert::Created(tenant)) => {
                    tracing::info!(tenant_id = %tenant.id, owner_id = %owner.id, "Tenant criado");
                    return Ok(tenant);
                }
                Some(Insert::CodeTaken) => {
                    tracing::warn!(owner_id = %owner.id, attempts = budget.used(), "Código de acesso colidiu no INSERT, tentando outro");
                }
                // Um cadastro concorrente criou o tenant deste dono.
                None => {
                    return self
                        .store
                        .find_by_owner(owner.id)
                        .await?
                        .ok_or(AppError::TenantNotFound);
                }
            }
        }
    }

    /// Cadastro self-service do RH. Reaproveita conta e tenant do mesmo
    /// e-mail e manda o código de acesso por e-mail.
    pub async fn register(&self, payload: RegisterHrPayload) -> Result<Tenant, AppError> {
        let payload = payload.normalized();
        payload.validate()?;

        let owner = self.store.get_or_create_owner(&payload.email).await?;
        let tenant = self
            .create_for_owner(
                &owner,
                &payload.company_name,
                payload.website.as_deref().unwrap_or_default(),
            )
            .await?;

        self.send_access_code(&tenant);

        Ok(tenant)
    }

    pub async fn list(&self) -> Result<Vec<Tenant>, AppError> {
        self.store.list_tenants().await
    }

    /// Ativa/desativa e troca o e-mail de notificação. Valida antes de tocar no banco.
    pub async fn update(&self, tenant_id: Uuid, payload: UpdateTenantPayload) -> Result<Tenant, AppError> {
        let changes = payload.into_changes()?;
        let tenant = self
            .store
            .update_tenant(tenant_id, &changes)
            .await?
            .ok_or(AppError::TenantNotFound)?;

        tracing::info!(
            tenant_id = %tenant.id,
            is_active = tenant.is_active,
            notification_override = tenant.notification_email.is_some(),
            "Tenant atualizado"
        );
        Ok(tenant)
    }

    /// Troca explícita do código. O antigo deixa de funcionar na hora.
    pub async fn rotate_access_code(&self, tenant_id: Uuid) -> Result<Tenant, AppError> {
        if self.store.find_by_id(tenant_id).await?.is_none() {
            return Err(AppError::TenantNotFound);
        }

        let mut budget = AttemptBudget::new(CodeKind::Access);
        loop {
            let access_code = self.unused_access_code(&mut budget).await?;

            match self.store.replace_access_code(tenant_id, &access_code).await? {
                Some(Insert::Created(tenant)) => {
                    tracing::info!(tenant_id = %tenant.id, "Código de acesso rotacionado");
                    self.send_access_code(&tenant);
                    return Ok(tenant);
                }
                Some(Insert::CodeTaken) => {
                    tracing::warn!(%tenant_id, attempts = budget.used(), "Código de acesso colidiu no UPDATE, tentando outro");
                }
                None => return Err(AppError::TenantNotFound),
            }
        }
    }

    async fn unused_access_code(&self, budget: &mut AttemptBudget) -> Result<String, AppError> {
        let store = self.store.clone();
        ensure_unique(
            budget,
            || CodeKind::Access.generate(),
            |candidate| {
                let store = store.clone();
                async move { store.access_code_exists(&candidate).await }
            },
        )
        .await
    }

    fn send_access_code(&self, tenant: &Tenant) {
        let company = if tenant.company_name.is_empty() { "your company" } else { &tenant.company_name };

        self.notifications.enqueue(Notification {
            recipients: vec![tenant.owner_email.clone()],
            subject: "Your anonymous feedback access code".to_string(),
            body: format!(
                "Hello,\n\n\
                 Here is the access code for {company}:\n\n    {code}\n\n\
                 Share it with your employees so they can send anonymous feedback.\n\
                 Submissions made with this code are routed only to you.\n",
                code = tenant.access_code,
            ),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use tokio::sync::mpsc;

    use super::*;
    use crate::db::memory::MemoryTenantStore;

    fn directory(
        legacy: Option<&str>,
    ) -> (TenantDirectory, Arc<MemoryTenantStore>, mpsc::Receiver<Notification>) {
        let store = Arc::new(MemoryTenantStore::default());
        let (queue, receiver) = NotificationQueue::detached(16);
        let directory = TenantDirectory::new(store.clone(), legacy.map(str::to_string), queue);
        (directory, store, receiver)
    }

    async fn deactivate(directory: &TenantDirectory, tenant_id: Uuid) -> Tenant {
        directory
            .update(tenant_id, UpdateTenantPayload { is_active: Some(false), ..Default::default() })
            .await
            .unwrap()
    }

    fn acme() -> RegisterHrPayload {
        RegisterHrPayload {
            company_name: "Acme".into(),
            email: "hr@acme.com".into(),
            website: None,
        }
    }

    #[tokio::test]
    async fn registering_twice_reuses_the_tenant() {
        let (directory, store, mut emails) = directory(None);

        let first = directory.register(acme()).await.unwrap();
        let second = directory
            .register(RegisterHrPayload { email: "HR@acme.com".into(), ..acme() })
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.access_code, second.access_code);
        assert_eq!(store.tenants().len(), 1);
        assert_eq!(store.owners().len(), 1);

        // Os dois cadastros reenviam o código para o dono.
        let mail = emails.recv().await.unwrap();
        assert_eq!(mail.recipients, vec!["hr@acme.com".to_string()]);
        assert!(mail.body.contains(&first.access_code));
        assert!(emails.recv().await.is_some());
    }

    #[tokio::test]
    async fn register_rejects_invalid_payload_before_touching_the_store() {
        let (directory, store, _emails) = directory(None);

        let result = directory
            .register(RegisterHrPayload { email: "nope".into(), ..acme() })
            .await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
        assert!(store.owners().is_empty());
    }

    #[tokio::test]
    async fn inactive_tenants_do_not_resolve() {
        let (directory, _store, _emails) = directory(None);
        let tenant = directory.register(acme()).await.unwrap();

        assert!(matches!(directory.resolve(&tenant.access_code).await.unwrap(), Resolution::Found(_)));

        deactivate(&directory, tenant.id).await;
        assert!(matches!(directory.resolve(&tenant.access_code).await.unwrap(), Resolution::NotFound));
        assert!(directory.route(&tenant.access_code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn legacy_code_is_only_a_fallback() {
        let (directory, _store, _emails) = directory(Some("999999"));
        let tenant = directory.register(acme()).await.unwrap();

        assert!(matches!(directory.route("999999").await.unwrap(), Some(SubmissionRoute::Legacy)));
        assert!(matches!(
            directory.route(&tenant.access_code).await.unwrap(),
            Some(SubmissionRoute::Tenant(_))
        ));
        assert!(directory.route("000000").await.unwrap().is_none());
        assert!(directory.route("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn notification_address_prefers_override() {
        let (directory, store, _emails) = directory(None);
        let tenant = directory.register(acme()).await.unwrap();
        assert_eq!(TenantDirectory::notification_address(&tenant), "hr@acme.com");

        let tenant = directory
            .update(
                tenant.id,
                UpdateTenantPayload { notification_email: Some("alerts@acme.com".into()), ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(TenantDirectory::notification_address(&tenant), "alerts@acme.com");
        assert_eq!(store.tenants()[0].notification_email.as_deref(), Some("alerts@acme.com"));

        // Só mexer no is_active preserva o override.
        let tenant = deactivate(&directory, tenant.id).await;
        assert_eq!(tenant.notification_email.as_deref(), Some("alerts@acme.com"));

        let tenant = directory
            .update(tenant.id, UpdateTenantPayload { notification_email: Some("".into()), ..Default::default() })
            .await
            .unwrap();
        assert!(tenant.notification_email.is_none());
        assert_eq!(TenantDirectory::notification_address(&tenant), "hr@acme.com");
    }

    #[tokio::test]
    async fn invalid_notification_email_is_rejected_untouched() {
        let (directory, store, _emails) = directory(None);
        let tenant = directory.register(acme()).await.unwrap();

        let result = directory
            .update(
                tenant.id,
                UpdateTenantPayload { is_active: Some(false), notification_email: Some("nope".into()) },
            )
            .await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
        let stored = &store.tenants()[0];
        assert!(stored.is_active);
        assert!(stored.notification_email.is_none());

        assert!(matches!(
            directory.update(Uuid::new_v4(), UpdateTenantPayload::default()).await,
            Err(AppError::TenantNotFound)
        ));
    }

    #[tokio::test]
    async fn list_shows_every_tenant_newest_first() {
        let (directory, _store, _emails) = directory(None);
        let first = directory.register(acme()).await.unwrap();
        let second = directory
            .register(RegisterHrPayload { email: "people@globex.com".into(), ..acme() })
            .await
            .unwrap();
        deactivate(&directory, first.id).await;

        let tenants = directory.list().await.unwrap();
        let ids: Vec<Uuid> = tenants.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert!(!tenants[1].is_active);
    }

    #[tokio::test]
    async fn insert_collisions_are_retried() {
        let (directory, store, _emails) = directory(None);
        store.forced_collisions.store(3, Ordering::SeqCst);

        let tenant = directory.register(acme()).await.unwrap();
        assert_eq!(tenant.access_code.len(), 6);
        assert_eq!(store.tenants().len(), 1);
    }

    #[tokio::test]
    async fn existence_checks_and_insert_collisions_share_one_budget() {
        let (directory, store, _emails) = directory(None);
        // 50 "já existe" + 50 colisões no INSERT = 100 tentativas, nenhuma sobra.
        store.forced_exists.store(50, Ordering::SeqCst);
        store.forced_collisions.store(50, Ordering::SeqCst);

        let result = directory.register(acme()).await;
        assert!(matches!(
            result,
            Err(AppError::CodeGenerationExhausted { kind: CodeKind::Access, attempts: 100 })
        ));
        assert!(store.tenants().is_empty());
    }

    #[tokio::test]
    async fn last_attempt_of_the_shared_budget_still_succeeds() {
        let (directory, store, _emails) = directory(None);
        store.forced_exists.store(49, Ordering::SeqCst);
        store.forced_collisions.store(50, Ordering::SeqCst);

        let tenant = directory.register(acme()).await.unwrap();
        assert_eq!(tenant.access_code.len(), 6);
        assert_eq!(store.forced_exists.load(Ordering::SeqCst), 0);
        assert_eq!(store.forced_collisions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn persistent_collisions_exhaust_the_bound() {
        let (directory, store, _emails) = directory(None);
        store.forced_collisions.store(u32::MAX, Ordering::SeqCst);

        let result = directory.register(acme()).await;
        assert!(matches!(
            result,
            Err(AppError::CodeGenerationExhausted { kind: CodeKind::Access, .. })
        ));
    }

    #[tokio::test]
    async fn rotation_replaces_the_code() {
        let (directory, _store, mut emails) = directory(None);
        let tenant = directory.register(acme()).await.unwrap();
        let _registration_mail = emails.recv().await.unwrap();

        let rotated = directory.rotate_access_code(tenant.id).await.unwrap();

        assert_ne!(rotated.access_code, tenant.access_code);
        assert!(matches!(directory.resolve(&tenant.access_code).await.unwrap(), Resolution::NotFound));
        assert!(emails.recv().await.unwrap().body.contains(&rotated.access_code));

        assert!(matches!(
            directory.rotate_access_code(Uuid::new_v4()).await,
            Err(AppError::TenantNotFound)
        ));
    }
}
