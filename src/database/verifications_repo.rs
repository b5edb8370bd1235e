use sqlx::SqlitePool;

use crate::models::VerificationsRow;

const SQL_INSERT_VERIFICATION: &str = r#"
INSERT INTO verifications (
  issue_id,
  verifier_id
) VALUES (?, ?)
RETURNING
  id,
  issue_id,
  verifier_id,
  created_at
"#;

pub struct NewVerification<'a> {
    pub issue_id: i64,
    pub verifier_id: &'a str,
}

pub async fn insert_verification(
    pool: &SqlitePool,
    verification: NewVerification<'_>,
) -> sqlx::Result<VerificationsRow> {
    sqlx::query_as::<_, VerificationsRow>(SQL_INSERT_VERIFICATION)
        .bind(verification.issue_id)
        .bind(verification.verifier_id)
        .fetch_one(pool)
        .await
}

pub fn is_duplicate(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
