#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IssuesRow {
    pub id: i64,
    pub created_at: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub status: String,
    pub reporter_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueStatus {
    Unverified,
    Verified,
}

impl IssueStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueStatus::Unverified => "UNVERIFIED",
            IssueStatus::Verified => "VERIFIED",
        }
    }

    // Anything that is not VERIFIED is treated as still open.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "VERIFIED" => IssueStatus::Verified,
            _ => IssueStatus::Unverified,
        }
    }
}

impl IssuesRow {
    pub fn status(&self) -> IssueStatus {
        IssueStatus::parse(&self.status)
    }
}
