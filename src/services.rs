pub mod dashboard_service;
pub mod notification;
pub mod rate_limit;
pub mod submission_service;
pub mod tenancy_service;
