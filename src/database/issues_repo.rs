use sqlx::SqlitePool;

use crate::models::{IssueStatus, IssuesRow};

const SQL_LIST_ISSUES: &str = r#"
SELECT
  id,
  created_at,
  title,
  description,
  image_url,
  latitude,
  longitude,
  status,
  reporter_id
FROM issues
ORDER BY id ASC
"#;

pub async fn list_issues(pool: &SqlitePool) -> sqlx::Result<Vec<IssuesRow>> {
    sqlx::query_as::<_, IssuesRow>(SQL_LIST_ISSUES)
        .fetch_all(pool)
        .await
}

const SQL_LOAD_ISSUE: &str = r#"
SELECT
  id,
  created_at,
  title,
  description,
  image_url,
  latitude,
  longitude,
  status,
  reporter_id
FROM issues
WHERE id = ?1
LIMIT 1
"#;

pub async fn load_issue(pool: &SqlitePool, issue_id: i64) -> sqlx::Result<Option<IssuesRow>> {
    sqlx::query_as::<_, IssuesRow>(SQL_LOAD_ISSUE)
        .bind(issue_id)
        .fetch_optional(pool)
        .await
}

const SQL_INSERT_ISSUE: &str = r#"
INSERT INTO issues (
  title,
  description,
  image_url,
  latitude,
  longitude,
  reporter_id
) VALUES (?, ?, ?, ?, ?, ?)
"#;

pub struct NewIssue<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub image_url: &'a str,
    pub latitude: f64,
    pub longitude: f64,
    pub reporter_id: &'a str,
}

pub async fn insert_issue(pool: &SqlitePool, issue: NewIssue<'_>) -> sqlx::Result<i64> {
    let res = sqlx::query(SQL_INSERT_ISSUE)
        .bind(issue.title)
        .bind(issue.description)
        .bind(issue.image_url)
        .bind(issue.latitude)
        .bind(issue.longitude)
        .bind(issue.reporter_id)
        .execute(pool)
        .await?;
    Ok(res.last_insert_rowid())
}

const SQL_UPDATE_ISSUE_STATUS: &str = r#"
UPDATE issues
SET status = ?
WHERE id = ?
"#;

pub async fn update_issue_status(
    pool: &SqlitePool,
    issue_id: i64,
    status: IssueStatus,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_UPDATE_ISSUE_STATUS)
        .bind(status.as_str())
        .bind(issue_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
