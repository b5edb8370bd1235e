#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VerificationsRow {
    pub id: i64,
    pub issue_id: i64,
    pub verifier_id: String,
    pub created_at: String,
}
