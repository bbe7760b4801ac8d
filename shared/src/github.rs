use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use octocrab::{models::pulls::PullRequest, Octocrab, Page};
use serde::{de::IgnoredAny, Deserialize};
use tracing::{instrument, warn};

use crate::{
    ActivitySummary, CommitInfo, IssueInfo, IssueRef, IssueTracker, PullRequestInfo,
    ReleaseInfo, RepositoryId, SetupError, TrackerError,
};

/// Per-commit detail requests are expensive, so files are only collected for the newest commits.
pub const MAX_COMMITS_WITH_FILES: usize = 20;
/// Upper bound for a single listing, protects the rate limit on very busy repositories.
pub const MAX_ITEMS_PER_LISTING: usize = 500;

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawGitAuthor {
    name: String,
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RawCommitDetails {
    message: String,
    author: Option<RawGitAuthor>,
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    sha: String,
    html_url: String,
    commit: RawCommitDetails,
    author: Option<RawUser>,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    filename: String,
}

#[derive(Debug, Deserialize)]
struct RawCommitFiles {
    #[serde(default)]
    files: Vec<RawFile>,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    number: u64,
    title: String,
    html_url: String,
    closed_at: Option<DateTime<Utc>>,
    pull_request: Option<IgnoredAny>,
}

#[derive(Debug, Deserialize)]
struct RawRelease {
    tag_name: String,
    name: Option<String>,
    html_url: String,
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    draft: bool,
}

impl From<RawCommit> for CommitInfo {
    fn from(commit: RawCommit) -> Self {
        let (name, timestamp) = commit
            .commit
            .author
            .map(|author| (author.name, author.date))
            .unwrap_or_default();
        Self {
            id: commit.sha,
            message: commit.commit.message,
            author: commit.author.map(|user| user.login).unwrap_or(name),
            timestamp: timestamp.unwrap_or_default(),
            url: commit.html_url,
        }
    }
}

impl From<octocrab::Error> for TrackerError {
    fn from(error: octocrab::Error) -> Self {
        match error {
            octocrab::Error::GitHub { source, .. } => {
                let message = source.message.to_lowercase();
                match source.status_code.as_u16() {
                    429 => TrackerError::RateLimited,
                    403 if message.contains("rate limit") => TrackerError::RateLimited,
                    401 | 403 => TrackerError::Unauthorized,
                    404 => TrackerError::NotFound,
                    _ => TrackerError::Rejected(source.message),
                }
            }
            other => TrackerError::Network(other.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct GithubClient {
    octocrab: Octocrab,
}

impl GithubClient {
    pub fn new(github_token: String) -> Result<Self, SetupError> {
        if github_token.trim().is_empty() {
            return Err(SetupError::MissingToken);
        }
        let octocrab = Octocrab::builder()
            .personal_token(github_token)
            .build()
            .map_err(|e| SetupError::Client(e.to_string()))?;
        Ok(Self { octocrab })
    }

    /// Collects the activity window `[since, until)` for the repository.
    #[instrument(skip(self), fields(repository = %repository))]
    pub async fn activity_summary(
        &self,
        repository: &RepositoryId,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> anyhow::Result<ActivitySummary> {
        let in_window = |at: DateTime<Utc>| at >= since && at < until;
        let (commits, pull_requests, issues, releases) = futures::try_join!(
            self.commits_since(repository, since, until),
            self.merged_pull_requests_since(repository, since),
            self.closed_issues_since(repository, since),
            self.releases_since(repository, since),
        )?;
        let pull_requests = pull_requests
            .into_iter()
            .filter(|pr| pr.merged_at.map_or(false, in_window))
            .collect::<Vec<_>>();
        let issues = issues
            .into_iter()
            .filter(|issue| issue.closed_at.map_or(false, in_window))
            .collect();
        let releases = releases
            .into_iter()
            .filter(|release| release.published_at.map_or(false, in_window))
            .collect();

        let files_changed = self
            .files_changed(repository, &commits)
            .await
            .into_iter()
            .collect();

        let contributors = commits
            .iter()
            .map(|commit| commit.author.clone())
            .chain(
                pull_requests
                    .iter()
                    .filter_map(|pr| pr.user.as_ref().map(|user| user.login.clone())),
            )
            .filter(|login| !login.is_empty())
            .collect::<BTreeSet<_>>();

        let pull_requests = pull_requests
            .into_iter()
            .map(|pr| PullRequestInfo {
                number: pr.number,
                title: pr.title.unwrap_or_default(),
                merged_at: pr.merged_at,
                url: pr.html_url.map(|url| url.to_string()).unwrap_or_default(),
            })
            .collect();

        Ok(ActivitySummary {
            commits,
            pull_requests,
            issues,
            releases,
            contributors,
            files_changed,
        })
    }

    async fn commits_since(
        &self,
        repository: &RepositoryId,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> anyhow::Result<Vec<CommitInfo>> {
        let route = format!("/repos/{}/{}/commits", repository.owner, repository.repo);
        let params = [
            ("since", since.to_rfc3339()),
            ("until", until.to_rfc3339()),
            ("per_page", "100".to_string()),
        ];
        let page: Page<RawCommit> = self.octocrab.get(route, Some(&params)).await?;
        let commits = self.collect_pages(page, |_| true).await?;
        Ok(commits.into_iter().map(CommitInfo::from).collect())
    }

    /// Walks pages sorted by update time and stops once the window is left behind.
    async fn merged_pull_requests_since(
        &self,
        repository: &RepositoryId,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<PullRequest>> {
        let page = self
            .octocrab
            .pulls(&repository.owner, &repository.repo)
            .list()
            .state(octocrab::params::State::Closed)
            .sort(octocrab::params::pulls::Sort::Updated)
            .direction(octocrab::params::Direction::Descending)
            .per_page(100)
            .send()
            .await?;
        let prs = self
            .collect_pages(page, |pr: &PullRequest| {
                pr.updated_at.or(pr.created_at).unwrap_or_default() >= since
            })
            .await?;

        Ok(prs
            .into_iter()
            .filter(|pr| pr.merged_at.map_or(false, |merged| merged >= since))
            .collect())
    }

    async fn closed_issues_since(
        &self,
        repository: &RepositoryId,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<IssueInfo>> {
        let route = format!("/repos/{}/{}/issues", repository.owner, repository.repo);
        let params = [
            ("state", "closed".to_string()),
            ("since", since.to_rfc3339()),
            ("per_page", "100".to_string()),
        ];
        let page: Page<RawIssue> = self.octocrab.get(route, Some(&params)).await?;
        let issues = self.collect_pages(page, |_| true).await?;

        Ok(issues
            .into_iter()
            // The issues endpoint lists pull requests as well
            .filter(|issue| issue.pull_request.is_none())
            .filter(|issue| issue.closed_at.map_or(false, |closed| closed >= since))
            .map(|issue| IssueInfo {
                number: issue.number,
                title: issue.title,
                closed_at: issue.closed_at,
                url: issue.html_url,
            })
            .collect())
    }

    async fn releases_since(
        &self,
        repository: &RepositoryId,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ReleaseInfo>> {
        let route = format!("/repos/{}/{}/releases", repository.owner, repository.repo);
        let params = [("per_page", "100")];
        let page: Page<RawRelease> = self.octocrab.get(route, Some(&params)).await?;
        // Drafts have no publish date, keep walking past them
        let releases = self
            .collect_pages(page, |release: &RawRelease| {
                release.published_at.map_or(true, |published| published >= since)
            })
            .await?;

        Ok(releases
            .into_iter()
            .filter(|release| !release.draft)
            .filter(|release| release.published_at.map_or(false, |p| p >= since))
            .map(|release| ReleaseInfo {
                tag: release.tag_name,
                name: release.name,
                published_at: release.published_at,
                url: release.html_url,
            })
            .collect())
    }

    async fn files_changed(&self, repository: &RepositoryId, commits: &[CommitInfo]) -> Vec<String> {
        let futures = commits
            .iter()
            .take(MAX_COMMITS_WITH_FILES)
            .map(|commit| async move {
                let route = format!(
                    "/repos/{}/{}/commits/{}",
                    repository.owner, repository.repo, commit.id
                );
                match self
                    .octocrab
                    .get::<RawCommitFiles, _, _>(route, None::<&()>)
                    .await
                {
                    Ok(details) => details.files.into_iter().map(|f| f.filename).collect(),
                    Err(e) => {
                        warn!("Failed to load files for commit {}: {e}", commit.id);
                        vec![]
                    }
                }
            });

        join_all(futures).await.into_iter().flatten().collect()
    }

    /// Follows `next` links while the last item on the page still satisfies `keep_going`.
    async fn collect_pages<T, F>(&self, mut page: Page<T>, keep_going: F) -> anyhow::Result<Vec<T>>
    where
        T: serde::de::DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let mut items = page.take_items();
        while items.last().map_or(false, &keep_going) && items.len() < MAX_ITEMS_PER_LISTING {
            match self.octocrab.get_page::<T>(&page.next).await? {
                Some(mut next) => {
                    items.append(&mut next.take_items());
                    page = next;
                }
                None => break,
            }
        }
        items.truncate(MAX_ITEMS_PER_LISTING);
        Ok(items)
    }

    pub async fn rate_limit_used(&self) -> anyhow::Result<i64> {
        Ok(self.octocrab.ratelimit().get().await?.resources.core.used as i64)
    }
}

#[async_trait::async_trait]
impl IssueTracker for GithubClient {
    #[instrument(skip(self), fields(repository = %repository))]
    async fn ensure_repository(&self, repository: &RepositoryId) -> Result<(), TrackerError> {
        let repo = self
            .octocrab
            .repos(&repository.owner, &repository.repo)
            .get()
            .await?;
        if repo.has_issues == Some(false) {
            return Err(TrackerError::Rejected(format!(
                "issues are disabled for {repository}"
            )));
        }
        if repo.archived == Some(true) {
            return Err(TrackerError::Rejected(format!("{repository} is archived")));
        }
        Ok(())
    }

    #[instrument(skip(self, body), fields(repository = %repository))]
    async fn create_issue(
        &self,
        repository: &RepositoryId,
        title: &str,
        body: &str,
    ) -> Result<IssueRef, TrackerError> {
        let issue = self
            .octocrab
            .issues(&repository.owner, &repository.repo)
            .create(title)
            .body(body)
            .send()
            .await?;
        Ok(IssueRef {
            number: issue.number,
            url: issue.html_url.to_string(),
        })
    }
}
