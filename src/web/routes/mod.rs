pub mod auth;
pub mod dashboard;
pub mod issues;
pub mod realtime;
