use serde::{Deserialize, Serialize};
use shared::PainPoint;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PainPointRecord {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub slug: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<PainPointRecord> for PainPoint {
    fn from(record: PainPointRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            body: record.body,
            slug: record.slug,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PainPointIssueRecord {
    pub pain_point_id: i64,
    pub repository: String,
    pub issue_number: i64,
    pub issue_url: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
