use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::GithubHandle;

/// Amount of commits in a window that is enough on its own to call it significant.
pub const SIGNIFICANT_COMMIT_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub id: String,
    pub message: String,
    pub author: GithubHandle,
    pub timestamp: DateTime<Utc>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestInfo {
    pub number: u64,
    pub title: String,
    pub merged_at: Option<DateTime<Utc>>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueInfo {
    pub number: u64,
    pub title: String,
    pub closed_at: Option<DateTime<Utc>>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub tag: String,
    pub name: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub url: String,
}

/// Recent activity of a single repository over some window.
///
/// Produced by the repository scanner and consumed once, nothing here is persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySummary {
    #[serde(default)]
    pub commits: Vec<CommitInfo>,
    #[serde(default)]
    pub pull_requests: Vec<PullRequestInfo>,
    #[serde(default)]
    pub issues: Vec<IssueInfo>,
    #[serde(default)]
    pub releases: Vec<ReleaseInfo>,
    #[serde(default)]
    pub contributors: BTreeSet<GithubHandle>,
    #[serde(default)]
    pub files_changed: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Signal {
    Commits,
    MergedPullRequests,
    ClosedIssues,
    Releases,
}

impl ActivitySummary {
    pub fn merged_pull_requests(&self) -> impl Iterator<Item = &PullRequestInfo> {
        self.pull_requests.iter().filter(|pr| pr.merged_at.is_some())
    }

    pub fn closed_issues(&self) -> impl Iterator<Item = &IssueInfo> {
        self.issues.iter().filter(|issue| issue.closed_at.is_some())
    }

    /// Every signal that fired for this window, in a stable order.
    pub fn signals(&self) -> Vec<Signal> {
        let mut signals = Vec::new();
        if self.commits.len() >= SIGNIFICANT_COMMIT_COUNT {
            signals.push(Signal::Commits);
        }
        if self.merged_pull_requests().next().is_some() {
            signals.push(Signal::MergedPullRequests);
        }
        if self.closed_issues().next().is_some() {
            signals.push(Signal::ClosedIssues);
        }
        if !self.releases.is_empty() {
            signals.push(Signal::Releases);
        }
        signals
    }

    pub fn is_significant(&self) -> bool {
        is_significant_activity(self)
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
            && self.pull_requests.is_empty()
            && self.issues.is_empty()
            && self.releases.is_empty()
    }
}

/// Any single signal is enough: a burst in one channel (e.g. a release with no
/// commits in the window) still counts.
pub fn is_significant_activity(summary: &ActivitySummary) -> bool {
    !summary.signals().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(id: u32) -> CommitInfo {
        CommitInfo {
            id: format!("sha{id}"),
            message: format!("commit {id}"),
            author: "octocat".to_string(),
            timestamp: Utc::now(),
            url: format!("https://github.com/acme/app/commit/sha{id}"),
        }
    }

    fn merged_pr(number: u64) -> PullRequestInfo {
        PullRequestInfo {
            number,
            title: "Fix login".to_string(),
            merged_at: Some(Utc::now()),
            url: format!("https://github.com/acme/app/pull/{number}"),
        }
    }

    fn closed_issue(number: u64) -> IssueInfo {
        IssueInfo {
            number,
            title: "Login is slow".to_string(),
            closed_at: Some(Utc::now()),
            url: format!("https://github.com/acme/app/issues/{number}"),
        }
    }

    fn release(tag: &str) -> ReleaseInfo {
        ReleaseInfo {
            tag: tag.to_string(),
            name: Some(format!("Release {tag}")),
            published_at: Some(Utc::now()),
            url: format!("https://github.com/acme/app/releases/tag/{tag}"),
        }
    }

    fn with_commits(amount: u32) -> ActivitySummary {
        ActivitySummary {
            commits: (0..amount).map(commit).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_summary_is_never_significant() {
        let summary = ActivitySummary::default();
        assert!(summary.is_empty());
        assert!(!is_significant_activity(&summary));
        assert!(summary.signals().is_empty());
    }

    #[test]
    fn commit_threshold_is_exact() {
        assert!(!is_significant_activity(&with_commits(1)));
        assert!(!is_significant_activity(&with_commits(2)));
        assert!(is_significant_activity(&with_commits(3)));
        assert!(is_significant_activity(&with_commits(10)));
    }

    #[test]
    fn single_channel_is_enough() {
        let pr_only = ActivitySummary {
            pull_requests: vec![merged_pr(1)],
            ..Default::default()
        };
        assert_eq!(pr_only.signals(), vec![Signal::MergedPullRequests]);

        let issue_only = ActivitySummary {
            issues: vec![closed_issue(7)],
            ..Default::default()
        };
        assert_eq!(issue_only.signals(), vec![Signal::ClosedIssues]);

        let release_only = ActivitySummary {
            releases: vec![release("v1.0.0")],
            ..Default::default()
        };
        assert_eq!(release_only.signals(), vec![Signal::Releases]);
    }

    #[test]
    fn unmerged_and_open_items_do_not_count() {
        let mut open_pr = merged_pr(2);
        open_pr.merged_at = None;
        let mut open_issue = closed_issue(3);
        open_issue.closed_at = None;

        let summary = ActivitySummary {
            commits: vec![commit(0)],
            pull_requests: vec![open_pr],
            issues: vec![open_issue],
            ..Default::default()
        };
        assert!(!summary.is_significant());
    }

    #[test]
    fn busy_window_reports_every_signal() {
        let summary = ActivitySummary {
            commits: (0..5).map(commit).collect(),
            pull_requests: vec![merged_pr(1)],
            issues: vec![closed_issue(1)],
            releases: vec![release("v2.0.0")],
            ..Default::default()
        };
        assert!(is_significant_activity(&summary));
        assert_eq!(
            summary.signals(),
            vec![
                Signal::Commits,
                Signal::MergedPullRequests,
                Signal::ClosedIssues,
                Signal::Releases
            ]
        );
    }

    #[test]
    fn lone_commit_is_not_significant() {
        let summary = with_commits(1);
        assert!(!is_significant_activity(&summary));
    }

    #[test]
    fn summary_deserializes_with_missing_sections() {
        let summary: ActivitySummary = serde_json::from_str(
            r#"{"releases":[{"tag":"v0.1.0","name":null,"published_at":null,"url":"u"}]}"#,
        )
        .unwrap();
        assert!(summary.is_significant());
        assert!(summary.contributors.is_empty());
    }
}
