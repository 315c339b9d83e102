pub mod admin;
pub mod hr;
pub mod submissions;
