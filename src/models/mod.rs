pub mod issues;
pub mod verifications;

pub use issues::{IssueStatus, IssuesRow};
pub use verifications::VerificationsRow;
