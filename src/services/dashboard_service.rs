// src/services/dashboard_service.rs

use crate::{common::error::AppError, db::DashboardRepository, models::dashboard::DashboardStats};

/// Leitura sob demanda: nada é pré-calculado, cada chamada consulta o banco.
#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
}

impl DashboardService {
    pub fn new(repo: DashboardRepository) -> Self {
        Self { repo }
    }

    pub async fn get_stats(&self) -> Result<DashboardStats, AppError> {
        self.repo.get_stats().await
    }
}
