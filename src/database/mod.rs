pub mod issues_repo;
pub mod schema_repo;
pub mod verifications_repo;
