pub mod admin_service;
mod lookups;
pub mod quiz_attempt_service;
pub mod quiz_service;
pub mod scoring;
pub mod user_service;
