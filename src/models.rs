pub mod dashboard;
pub mod submission;
pub mod tenancy;
