// src/db/submission_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{
            contains_pattern, is_unique_violation_on, RESPONSE_SUBMISSION_KEY, SUBMISSION_RECEIPT_CODE_KEY,
        },
        error::AppError,
    },
    db::{Insert, SubmissionStore},
    models::submission::{
        HrResponse, NewSubmission, Submission, SubmissionFilter, SubmissionStatus, SubmissionSummary,
    },
};

// Filtro compartilhado pela contagem e pela página. NULL = sem filtro.
const LIST_WHERE: &str = r#"
    WHERE ($1::submission_status IS NULL OR s.status = $1)
      AND ($2::submission_type IS NULL OR s.kind = $2)
      AND ($3::text IS NULL
           OR s.receipt_code ILIKE $3
           OR s.title ILIKE $3
           OR s.body ILIKE $3)
"#;

#[derive(Clone)]
pub struct SubmissionRepository {
    pool: PgPool,
}

impl SubmissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn with_response(
        &self,
        submission: Option<Submission>,
    ) -> Result<Option<(Submission, Option<HrResponse>)>, AppError> {
        let Some(submission) = submission else {
            return Ok(None);
        };

        let response =
            sqlx::query_as::<_, HrResponse>("SELECT * FROM hr_responses WHERE submission_id = $1")
                .bind(submission.id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(Some((submission, response)))
    }
}

#[async_trait]
impl SubmissionStore for SubmissionRepository {
    async fn receipt_code_exists(&self, receipt_code: &str) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM submissions WHERE receipt_code = $1)")
                .bind(receipt_code)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn insert_submission(&self, new: &NewSubmission) -> Result<Insert<Submission>, AppError> {
        let result = sqlx::query_as::<_, Submission>(
            r#"
            INSERT INTO submissions (receipt_code, kind, title, body, tenant_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&new.receipt_code)
        .bind(new.kind)
        .bind(&new.title)
        .bind(&new.body)
        .bind(new.tenant_id)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(submission) => Ok(Insert::Created(submission)),
            // Corrida entre a checagem e o INSERT: quem chama gera outro recibo.
            Err(e) if is_unique_violation_on(&e, SUBMISSION_RECEIPT_CODE_KEY) => Ok(Insert::CodeTaken),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_receipt(
        &self,
        receipt_code: &str,
    ) -> Result<Option<(Submission, Option<HrResponse>)>, AppError> {
        let submission =
            sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE receipt_code = $1")
                .bind(receipt_code)
                .fetch_optional(&self.pool)
                .await?;

        self.with_response(submission).await
    }

    async fn find_by_id(
        &self,
        submission_id: Uuid,
    ) -> Result<Option<(Submission, Option<HrResponse>)>, AppError> {
        let submission = sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE id = $1")
            .bind(submission_id)
            .fetch_optional(&self.pool)
            .await?;

        self.with_response(submission).await
    }

    async fn create_response(&self, submission_id: Uuid, body: &str) -> Result<HrResponse, AppError> {
        // 1. Inicia a transação e trava a submissão
        let mut tx = self.pool.begin().await?;

        let status: SubmissionStatus =
            sqlx::query_scalar("SELECT status FROM submissions WHERE id = $1 FOR UPDATE")
                .bind(submission_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AppError::SubmissionNotFound)?;

        // 2. Cria a resposta (no máximo uma por submissão)
        let response = sqlx::query_as::<_, HrResponse>(
            "INSERT INTO hr_responses (submission_id, body) VALUES ($1, $2) RETURNING *",
        )
        .bind(submission_id)
        .bind(body)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation_on(&e, RESPONSE_SUBMISSION_KEY) {
                return AppError::ResponseAlreadyExists;
            }
            e.into()
        })?;

        // 3. Atualiza o status
        sqlx::query("UPDATE submissions SET status = $2, updated_at = now() WHERE id = $1")
            .bind(submission_id)
            .bind(status.after_response())
            .execute(&mut *tx)
            .await?;

        // 4. Commit
        tx.commit().await?;

        Ok(response)
    }

    async fn update_response(&self, submission_id: Uuid, body: &str) -> Result<HrResponse, AppError> {
        let mut tx = self.pool.begin().await?;

        let status: SubmissionStatus =
            sqlx::query_scalar("SELECT status FROM submissions WHERE id = $1 FOR UPDATE")
                .bind(submission_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AppError::SubmissionNotFound)?;

        let response = sqlx::query_as::<_, HrResponse>(
            r#"
            UPDATE hr_responses SET body = $2, updated_at = now()
            WHERE submission_id = $1
            RETURNING *
            "#,
        )
        .bind(submission_id)
        .bind(body)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::ResponseNotFound)?;

        sqlx::query("UPDATE submissions SET status = $2, updated_at = now() WHERE id = $1")
            .bind(submission_id)
            .bind(status.after_response())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(response)
    }

    async fn set_status(&self, ids: &[Uuid], status: SubmissionStatus) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE submissions SET status = $1, updated_at = now() WHERE id = ANY($2)",
        )
        .bind(status)
        .bind(ids)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn list_submissions(
        &self,
        filter: &SubmissionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SubmissionSummary>, i64), AppError> {
        let pattern = filter.search.as_deref().map(contains_pattern);

        // Contagem e página no mesmo snapshot
        let mut tx = self.pool.begin().await?;

        let count_sql = format!("SELECT COUNT(*) FROM submissions s {LIST_WHERE}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(filter.status)
            .bind(filter.kind)
            .bind(pattern.as_deref())
            .fetch_one(&mut *tx)
            .await?;

        let page_sql = format!(
            r#"
            SELECT s.id, s.receipt_code, s.kind, s.title, s.status,
                   (r.id IS NOT NULL) AS has_response, s.created_at
            FROM submissions s
            LEFT JOIN hr_responses r ON r.submission_id = s.id
            {LIST_WHERE}
            ORDER BY s.created_at DESC, s.id
            LIMIT $4 OFFSET $5
            "#
        );
        let items = sqlx::query_as::<_, SubmissionSummary>(&page_sql)
            .bind(filter.status)
            .bind(filter.kind)
            .bind(pattern.as_deref())
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok((items, total))
    }
}
