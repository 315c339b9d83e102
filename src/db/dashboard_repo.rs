// src/db/dashboard_repo.rs

use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::dashboard::{DashboardStats, StatusCount, TypeCount},
    models::submission::{SubmissionStatus, SubmissionSummary, SubmissionType},
};

#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_stats(&self) -> Result<DashboardStats, AppError> {
        // Snapshot consistente: todas as contagens na mesma transação
        let mut tx = self.pool.begin().await?;

        // A. Total
        let total_submissions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM submissions")
            .fetch_one(&mut *tx)
            .await?;

        // B. Por status
        let status_rows = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM submissions GROUP BY status",
        )
        .fetch_all(&mut *tx)
        .await?;

        // C. Por tipo
        let type_rows = sqlx::query_as::<_, TypeCount>(
            "SELECT kind, COUNT(*) AS count FROM submissions GROUP BY kind",
        )
        .fetch_all(&mut *tx)
        .await?;

        // D. As 5 mais recentes
        let recent_submissions = sqlx::query_as::<_, SubmissionSummary>(
            r#"
            SELECT s.id, s.receipt_code, s.kind, s.title, s.status,
                   (r.id IS NOT NULL) AS has_response, s.created_at
            FROM submissions s
            LEFT JOIN hr_responses r ON r.submission_id = s.id
            ORDER BY s.created_at DESC
            LIMIT 5
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(DashboardStats {
            total_submissions,
            by_status: fill_statuses(&status_rows),
            by_type: fill_types(&type_rows),
            recent_submissions,
        })
    }
}

// GROUP BY omite as contagens zero; o painel mostra todos os valores.
fn fill_statuses(rows: &[StatusCount]) -> Vec<StatusCount> {
    SubmissionStatus::ALL
        .iter()
        .map(|status| StatusCount {
            status: *status,
            count: rows.iter().find(|r| r.status == *status).map_or(0, |r| r.count),
        })
        .collect()
}

fn fill_types(rows: &[TypeCount]) -> Vec<TypeCount> {
    SubmissionType::ALL
        .iter()
        .map(|kind| TypeCount {
            kind: *kind,
            count: rows.iter().find(|r| r.kind == *kind).map_or(0, |r| r.count),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_groups_count_as_zero() {
        let rows = vec![StatusCount { status: SubmissionStatus::Closed, count: 3 }];
        let filled = fill_statuses(&rows);

        assert_eq!(filled.len(), 4);
        assert_eq!(filled[0].status, SubmissionStatus::New);
        assert_eq!(filled[0].count, 0);
        assert_eq!(filled[3].count, 3);

        let types = fill_types(&[]);
        assert!(types.iter().all(|t| t.count == 0));
    }
}
