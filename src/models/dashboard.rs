// src/models/dashboard.rs

use serde::Serialize;
use sqlx::FromRow;

use crate::models::submission::{SubmissionStatus, SubmissionSummary, SubmissionType};

// 1. Os cards do topo
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_submissions: i64,
    pub by_status: Vec<StatusCount>,
    pub by_type: Vec<TypeCount>,
    // As 5 mais recentes
    pub recent_submissions: Vec<SubmissionSummary>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: SubmissionStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub kind: SubmissionType,
    pub count: i64,
}
