// src/db/tenancy_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{is_unique_violation_on, TENANT_ACCESS_CODE_KEY},
        error::AppError,
    },
    db::{Insert, TenantStore},
    models::tenancy::{HrOwner, NewTenant, Tenant, TenantChanges},
};

// O dono sempre vem junto: a notificação cai no e-mail dele por padrão.
const TENANT_SELECT: &str = r#"
    SELECT t.id, t.access_code, t.owner_id, o.email AS owner_email,
           t.notification_email, t.is_active, t.company_name, t.company_website,
           t.created_at, t.updated_at
    FROM tenants t
    JOIN hr_owners o ON o.id = t.owner_id
"#;

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, clause: &str, id: Uuid) -> Result<Option<Tenant>, AppError> {
        let sql = format!("{TENANT_SELECT} WHERE {clause}");
        let tenant = sqlx::query_as::<_, Tenant>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }
}

#[async_trait]
impl TenantStore for TenantRepository {
    async fn find_active_by_code(&self, access_code: &str) -> Result<Option<Tenant>, AppError> {
        let sql = format!("{TENANT_SELECT} WHERE t.access_code = $1 AND t.is_active = TRUE");
        let tenant = sqlx::query_as::<_, Tenant>(&sql)
            .bind(access_code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }

    async fn access_code_exists(&self, access_code: &str) -> Result<bool, AppError> {
        // Inativos também contam: o código continua reservado.
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tenants WHERE access_code = $1)")
                .bind(access_code)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn find_by_id(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AppError> {
        self.fetch_one_where("t.id = $1", tenant_id).await
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<Tenant>, AppError> {
        self.fetch_one_where("t.owner_id = $1", owner_id).await
    }

    async fn find_owner_by_email(&self, email: &str) -> Result<Option<HrOwner>, AppError> {
        let owner = sqlx::query_as::<_, HrOwner>(
            "SELECT * FROM hr_owners WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(owner)
    }

    async fn get_or_create_owner(&self, email: &str) -> Result<HrOwner, AppError> {
        let inserted = sqlx::query_as::<_, HrOwner>(
            r#"
            INSERT INTO hr_owners (email)
            VALUES ($1)
            ON CONFLICT ((lower(email))) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(owner) => Ok(owner),
            // Outro cadastro chegou primeiro; a linha dele é a nossa.
            None => self
                .find_owner_by_email(email)
                .await?
                .ok_or_else(|| {
                    AppError::InternalServerError(anyhow::anyhow!(
                        "hr_owner sumiu após conflito: {email}"
                    ))
                }),
        }
    }

    async fn insert_tenant(&self, new: &NewTenant) -> Result<Option<Insert<Tenant>>, AppError> {
        let result = sqlx::query_as::<_, Tenant>(
            r#"
            WITH inserted AS (
                INSERT INTO tenants (access_code, owner_id, company_name, company_website)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT ON CONSTRAINT tenants_owner_id_key DO NOTHING
                RETURNING *
            )
            SELECT t.id, t.access_code, t.owner_id, o.email AS owner_email,
                   t.notification_email, t.is_active, t.company_name, t.company_website,
                   t.created_at, t.updated_at
            FROM inserted t
            JOIN hr_owners o ON o.id = t.owner_id
            "#,
        )
        .bind(&new.access_code)
        .bind(new.owner_id)
        .bind(&new.company_name)
        .bind(&new.company_website)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(tenant)) => Ok(Some(Insert::Created(tenant))),
            Ok(None) => Ok(None),
            Err(e) if is_unique_violation_on(&e, TENANT_ACCESS_CODE_KEY) => Ok(Some(Insert::CodeTaken)),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_tenants(&self) -> Result<Vec<Tenant>, AppError> {
        let sql = format!("{TENANT_SELECT} ORDER BY t.created_at DESC");
        let tenants = sqlx::query_as::<_, Tenant>(&sql).fetch_all(&self.pool).await?;
        Ok(tenants)
    }

    async fn update_tenant(
        &self,
        tenant_id: Uuid,
        changes: &TenantChanges,
    ) -> Result<Option<Tenant>, AppError> {
        // $3 diz se o override muda; $4 NULL com $3 verdadeiro limpa o campo.
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            WITH updated AS (
                UPDATE tenants SET
                    is_active = COALESCE($2::boolean, is_active),
                    notification_email = CASE WHEN $3 THEN $4::text ELSE notification_email END,
                    updated_at = now()
                WHERE id = $1
                RETURNING *
            )
            SELECT t.id, t.access_code, t.owner_id, o.email AS owner_email,
                   t.notification_email, t.is_active, t.company_name, t.company_website,
                   t.created_at, t.updated_at
            FROM updated t
            JOIN hr_owners o ON o.id = t.owner_id
            "#,
        )
        .bind(tenant_id)
        .bind(changes.is_active)
        .bind(changes.notification_email.is_some())
        .bind(changes.notification_email.clone().flatten())
        .fetch_optional(&self.pool)
        .await?;
        Ok(tenant)
    }

    async fn replace_access_code(
        &self,
        tenant_id: Uuid,
        access_code: &str,
    ) -> Result<Option<Insert<Tenant>>, AppError> {
        let result = sqlx::query_as::<_, Tenant>(
            r#"
            WITH updated AS (
                UPDATE tenants SET access_code = $2, updated_at = now()
                WHERE id = $1
                RETURNING *
            )
            SELECT t.id, t.access_code, t.owner_id, o.email AS owner_email,
                   t.notification_email, t.is_active, t.company_name, t.company_website,
                   t.created_at, t.updated_at
            FROM updated t
            JOIN hr_owners o ON o.id = t.owner_id
            "#,
        )
        .bind(tenant_id)
        .bind(access_code)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(tenant)) => Ok(Some(Insert::Created(tenant))),
            Ok(None) => Ok(None),
            Err(e) if is_unique_violation_on(&e, TENANT_ACCESS_CODE_KEY) => Ok(Some(Insert::CodeTaken)),
            Err(e) => Err(e.into()),
        }
    }
}
