use sqlx::SqlitePool;

const SQL_CREATE_ISSUES: &str = r#"
CREATE TABLE IF NOT EXISTS issues (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
  title TEXT NOT NULL,
  description TEXT,
  image_url TEXT,
  latitude REAL NOT NULL,
  longitude REAL NOT NULL,
  status TEXT NOT NULL DEFAULT 'UNVERIFIED'
    CHECK (status IN ('UNVERIFIED', 'VERIFIED')),
  reporter_id TEXT NOT NULL
)
"#;

const SQL_CREATE_VERIFICATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS verifications (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  issue_id INTEGER NOT NULL REFERENCES issues (id),
  verifier_id TEXT NOT NULL,
  created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
  UNIQUE (issue_id, verifier_id)
)
"#;

pub async fn ensure_schema(pool: &SqlitePool) -> sqlx::Result<()> {
    sqlx::query(SQL_CREATE_ISSUES).execute(pool).await?;
    sqlx::query(SQL_CREATE_VERIFICATIONS).execute(pool).await?;
    Ok(())
}
