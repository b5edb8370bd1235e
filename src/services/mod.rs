pub mod auth_service;
pub mod geo_service;
pub mod issue_cache_service;
pub mod map_service;
pub mod realtime_service;
pub mod report_service;
pub mod storage_service;
pub mod verification_service;
