use serde::{Deserialize, Serialize};
use shared::{ActivitySummary, BulkCreateStats, PainPointId, SetupError, Signal};
use utoipa::ToSchema;

use crate::db::types::{PainPointIssueRecord, PainPointRecord};

pub const MAX_BULK_IDS: usize = 100;
pub const DEFAULT_ACTIVITY_DAYS: u32 = 7;
pub const MAX_ACTIVITY_DAYS: u32 = 90;

#[derive(Clone, Debug, Serialize, Deserialize, Default, ToSchema)]
#[aliases(PaginatedPainPointResponse = PaginatedResponse<PainPointResponse>)]
pub struct PaginatedResponse<T: Serialize> {
    pub records: Vec<T>,
    pub page: u64,
    pub total_pages: u64,
    pub limit: u64,
    pub total_records: u64,
}

impl<T: Serialize> PaginatedResponse<T> {
    pub fn new(records: Vec<T>, page: u64, limit: u64, total_records: u64) -> Self {
        let limit = limit.max(1);
        let extra_page = if total_records % limit == 0 { 0 } else { 1 };
        let total_pages = (total_records / limit) + extra_page;
        Self {
            records,
            page,
            total_pages,
            limit,
            total_records,
        }
    }
}

/// Row offset of a zero-based page. Pages past the addressable range map to an
/// offset no table reaches, so they come back empty.
pub fn page_offset(page: u64, limit: u64) -> i64 {
    page.checked_mul(limit)
        .and_then(|offset| i64::try_from(offset).ok())
        .unwrap_or(i64::MAX)
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LinkedIssue {
    pub repository: String,
    pub number: u64,
    pub url: String,
}

impl From<PainPointIssueRecord> for LinkedIssue {
    fn from(record: PainPointIssueRecord) -> Self {
        Self {
            repository: record.repository,
            number: record.issue_number as u64,
            url: record.issue_url,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PainPointResponse {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub slug: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<LinkedIssue>,
}

impl From<PainPointRecord> for PainPointResponse {
    fn from(record: PainPointRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            body: record.body,
            slug: record.slug,
            created_at: record.created_at,
            issues: vec![],
        }
    }
}

impl PainPointResponse {
    pub fn with_issues(mut self, issues: Vec<PainPointIssueRecord>) -> Self {
        self.issues = issues.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatePainPointRequest {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BulkCreateRequest {
    pub pain_point_ids: Vec<PainPointId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BulkCreateResponse {
    Completed {
        created: u32,
        skipped: u32,
        errors: u32,
    },
    Failed {
        reason: String,
    },
}

impl From<BulkCreateStats> for BulkCreateResponse {
    fn from(stats: BulkCreateStats) -> Self {
        Self::Completed {
            created: stats.created,
            skipped: stats.skipped,
            errors: stats.errors,
        }
    }
}

impl From<&SetupError> for BulkCreateResponse {
    fn from(error: &SetupError) -> Self {
        Self::Failed {
            reason: error.to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SignificanceResponse {
    pub significant: bool,
    pub signals: Vec<String>,
}

impl From<&ActivitySummary> for SignificanceResponse {
    fn from(summary: &ActivitySummary) -> Self {
        let signals = summary.signals();
        Self {
            significant: !signals.is_empty(),
            signals: signals.iter().map(Signal::to_string).collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActivityResponse {
    Scanned {
        repository: String,
        days: u32,
        significant: bool,
        signals: Vec<String>,
        #[schema(value_type = Object)]
        summary: ActivitySummary,
    },
    Failed {
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginated_response_counts_pages() {
        let response = PaginatedResponse::new(vec![1, 2, 3], 1, 50, 120);
        assert_eq!(response.total_pages, 3);

        let response = PaginatedResponse::new(Vec::<u32>::new(), 1, 50, 100);
        assert_eq!(response.total_pages, 2);

        let response = PaginatedResponse::new(Vec::<u32>::new(), 1, 0, 0);
        assert_eq!(response.total_pages, 0);
        assert_eq!(response.limit, 1);
    }

    #[test]
    fn huge_pages_saturate_the_offset() {
        assert_eq!(page_offset(0, 50), 0);
        assert_eq!(page_offset(3, 50), 150);
        assert_eq!(page_offset(u64::MAX, 50), i64::MAX);
        assert_eq!(page_offset(i64::MAX as u64, 1), i64::MAX);
        assert_eq!(page_offset(i64::MAX as u64 + 1, 1), i64::MAX);
    }

    #[test]
    fn bulk_response_is_tagged() {
        let completed = BulkCreateResponse::from(BulkCreateStats {
            created: 2,
            skipped: 1,
            errors: 0,
        });
        assert_eq!(
            serde_json::to_value(&completed).unwrap(),
            serde_json::json!({"status": "completed", "created": 2, "skipped": 1, "errors": 0})
        );

        let failed = BulkCreateResponse::from(&SetupError::MissingToken);
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({"status": "failed", "reason": "no access token provided"})
        );
    }

    #[test]
    fn significance_lists_signals() {
        let summary = ActivitySummary {
            releases: vec![shared::ReleaseInfo {
                tag: "v1.0.0".to_string(),
                name: None,
                published_at: None,
                url: "https://github.com/acme/app/releases/tag/v1.0.0".to_string(),
            }],
            ..Default::default()
        };
        let response = SignificanceResponse::from(&summary);
        assert!(response.significant);
        assert_eq!(response.signals, vec!["releases".to_string()]);

        let response = SignificanceResponse::from(&ActivitySummary::default());
        assert!(!response.significant);
        assert!(response.signals.is_empty());
    }
}
