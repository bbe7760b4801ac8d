use std::{fmt, str::FromStr, sync::Arc};

use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use tracing::{info, instrument, warn};

use crate::text::IssueTemplate;

pub type PainPointId = i64;

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryId {
    pub owner: String,
    pub repo: String,
}

impl RepositoryId {
    pub fn new(owner: &str, repo: &str) -> Result<Self, SetupError> {
        let valid = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        if !valid(owner) || !valid(repo) {
            return Err(SetupError::InvalidRepository(format!("{owner}/{repo}")));
        }
        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }
}

impl FromStr for RepositoryId {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, repo)) => Self::new(owner, repo),
            None => Err(SetupError::InvalidRepository(s.to_string())),
        }
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PainPoint {
    pub id: PainPointId,
    pub title: String,
    pub body: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    pub number: u64,
    pub url: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkCreateStats {
    pub created: u32,
    pub skipped: u32,
    pub errors: u32,
}

impl BulkCreateStats {
    pub fn total(&self) -> u32 {
        self.created + self.skipped + self.errors
    }

    fn record(mut self, outcome: ItemOutcome) -> Self {
        match outcome {
            ItemOutcome::Created => self.created += 1,
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::Failed => self.errors += 1,
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ItemOutcome {
    Created,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    #[error("access token was rejected")]
    Unauthorized,
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("resource not found")]
    NotFound,
    #[error("network failure: {0}")]
    Network(String),
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Failures that make the whole batch impossible. Nothing is processed when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("no access token provided")]
    MissingToken,
    #[error("invalid repository id: {0}")]
    InvalidRepository(String),
    #[error("repository {repository} is unusable: {source}")]
    Repository {
        repository: String,
        #[source]
        source: TrackerError,
    },
    #[error("failed to build issue tracker client: {0}")]
    Client(String),
}

#[async_trait::async_trait]
pub trait IssueTracker: Send + Sync {
    async fn ensure_repository(&self, repository: &RepositoryId) -> Result<(), TrackerError>;

    async fn create_issue(
        &self,
        repository: &RepositoryId,
        title: &str,
        body: &str,
    ) -> Result<IssueRef, TrackerError>;
}

#[async_trait::async_trait]
pub trait PainPointStore: Send + Sync {
    async fn pain_point(&self, id: PainPointId) -> anyhow::Result<Option<PainPoint>>;
}

/// Remembers which pain points already have an issue in which repository.
#[async_trait::async_trait]
pub trait DuplicateCheck: Send + Sync {
    async fn existing_issue(
        &self,
        repository: &RepositoryId,
        id: PainPointId,
    ) -> anyhow::Result<Option<IssueRef>>;

    async fn record_issue(
        &self,
        repository: &RepositoryId,
        id: PainPointId,
        issue: &IssueRef,
    ) -> anyhow::Result<()>;
}

pub struct BulkIssueCreator {
    tracker: Arc<dyn IssueTracker>,
    store: Arc<dyn PainPointStore>,
    duplicates: Arc<dyn DuplicateCheck>,
    template: IssueTemplate,
    concurrency: usize,
}

impl BulkIssueCreator {
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        store: Arc<dyn PainPointStore>,
        duplicates: Arc<dyn DuplicateCheck>,
    ) -> Self {
        Self {
            tracker,
            store,
            duplicates,
            template: IssueTemplate::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_template(mut self, template: IssueTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Creates one issue per pain point. Individual failures end up in the
    /// returned stats, only a repository that can't be used at all is an error.
    #[instrument(skip(self, ids), fields(repository = %repository, amount = ids.len()))]
    pub async fn bulk_create_issues(
        &self,
        repository: &RepositoryId,
        ids: &[PainPointId],
    ) -> Result<BulkCreateStats, SetupError> {
        if ids.is_empty() {
            return Ok(BulkCreateStats::default());
        }

        self.tracker
            .ensure_repository(repository)
            .await
            .map_err(|source| SetupError::Repository {
                repository: repository.to_string(),
                source,
            })?;

        let unique = ids.iter().copied().unique().collect_vec();
        let repeated = ids.len() - unique.len();
        if repeated > 0 {
            info!("Skipping {repeated} repeated pain point ids");
        }
        let initial = (0..repeated).fold(BulkCreateStats::default(), |stats, _| {
            stats.record(ItemOutcome::Skipped)
        });

        let stats = stream::iter(unique)
            .map(|id| self.process(repository, id))
            .buffer_unordered(self.concurrency)
            .fold(initial, |stats, outcome| async move { stats.record(outcome) })
            .await;

        info!(
            "Bulk issue creation for {repository} finished: {} created, {} skipped, {} errors",
            stats.created, stats.skipped, stats.errors
        );
        Ok(stats)
    }

    async fn process(&self, repository: &RepositoryId, id: PainPointId) -> ItemOutcome {
        let pain_point = match self.store.pain_point(id).await {
            Ok(Some(pain_point)) => pain_point,
            Ok(None) => {
                info!("Pain point {id} not found. Skipping");
                return ItemOutcome::Skipped;
            }
            Err(e) => {
                warn!("Failed to load pain point {id}: {e:#}");
                return ItemOutcome::Failed;
            }
        };

        match self.duplicates.existing_issue(repository, id).await {
            Ok(Some(issue)) => {
                info!(
                    "Pain point {id} already has issue #{} in {repository}. Skipping",
                    issue.number
                );
                return ItemOutcome::Skipped;
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Failed to check existing issue for pain point {id}: {e:#}");
                return ItemOutcome::Failed;
            }
        }

        let (title, body) = self.template.render(&pain_point);
        let issue = match self.tracker.create_issue(repository, &title, &body).await {
            Ok(issue) => issue,
            Err(e) => {
                warn!("Failed to create issue for pain point {id} in {repository}: {e}");
                return ItemOutcome::Failed;
            }
        };

        if let Err(e) = self.duplicates.record_issue(repository, id, &issue).await {
            warn!(
                "Issue #{} was created for pain point {id} but the mapping wasn't stored: {e:#}",
                issue.number
            );
        }

        ItemOutcome::Created
    }
}
