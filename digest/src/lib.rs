use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use shared::{github::GithubClient, telegram::TelegramSubscriber, RepositoryId};
use tracing::{error, info, instrument};

pub mod config;
pub mod digest;
pub mod prometheus;

use crate::{config::WatchList, prometheus::PrometheusClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Failed,
    Quiet,
    Notified,
}

impl ScanOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, ScanOutcome::Failed)
    }
}

/// Start of the next activity window for every watched repository.
/// A window only moves forward after it was scanned successfully.
#[derive(Debug, Clone)]
pub struct ScanWindows {
    starts: HashMap<RepositoryId, DateTime<Utc>>,
}

impl ScanWindows {
    pub fn new(repositories: &[RepositoryId], start: DateTime<Utc>) -> Self {
        Self {
            starts: repositories
                .iter()
                .map(|repository| (repository.clone(), start))
                .collect(),
        }
    }

    pub fn since(&self, repository: &RepositoryId) -> Option<DateTime<Utc>> {
        self.starts.get(repository).copied()
    }

    pub fn complete(
        &mut self,
        repository: &RepositoryId,
        outcome: ScanOutcome,
        until: DateTime<Utc>,
    ) {
        if !outcome.is_success() {
            return;
        }
        if let Some(start) = self.starts.get_mut(repository) {
            *start = until;
        }
    }
}

#[derive(Clone)]
pub struct Context {
    pub github: Arc<GithubClient>,
    pub telegram: Arc<TelegramSubscriber>,
    pub prometheus: Arc<PrometheusClient>,
    pub watch_list: Arc<WatchList>,
}

impl Context {
    /// Scans every watched repository up to `until` and advances the windows
    /// of the repositories that were scanned successfully.
    pub async fn scan_all(&self, windows: &mut ScanWindows, until: DateTime<Utc>) -> Vec<ScanOutcome> {
        let futures = self
            .watch_list
            .repositories
            .iter()
            .filter_map(|repository| Some((repository, windows.since(repository)?)))
            .map(|(repository, since)| async move {
                (repository, self.scan(repository, since, until).await)
            })
            .collect::<Vec<_>>();

        let results = join_all(futures).await;
        for (repository, outcome) in &results {
            windows.complete(repository, *outcome, until);
        }
        results.into_iter().map(|(_, outcome)| outcome).collect()
    }

    #[instrument(skip(self), fields(repository = %repository))]
    async fn scan(
        &self,
        repository: &RepositoryId,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> ScanOutcome {
        let started = Utc::now();
        let summary = match self.github.activity_summary(repository, since, until).await {
            Ok(summary) => summary,
            Err(e) => {
                error!("Failed to scan activity of {repository}, retrying from {since} next time: {e:#}");
                self.prometheus
                    .record_scan(repository, false, false, started);
                return ScanOutcome::Failed;
            }
        };

        let significant = summary.is_significant();
        self.prometheus
            .record_scan(repository, significant, true, started);
        if !significant {
            info!("No significant activity in {repository} between {since} and {until}");
            return ScanOutcome::Quiet;
        }

        info!(
            "Significant activity in {repository}: {:?}",
            summary.signals()
        );
        self.telegram
            .send_digest(digest::render_digest(repository, &summary));
        self.prometheus.add_notification();
        ScanOutcome::Notified
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn repositories() -> Vec<RepositoryId> {
        vec!["acme/app".parse().unwrap(), "acme/docs".parse().unwrap()]
    }

    #[test]
    fn failed_scan_keeps_its_window() {
        let repositories = repositories();
        let start = Utc::now() - Duration::hours(1);
        let until = start + Duration::hours(1);
        let mut windows = ScanWindows::new(&repositories, start);

        windows.complete(&repositories[0], ScanOutcome::Notified, until);
        windows.complete(&repositories[1], ScanOutcome::Failed, until);

        assert_eq!(windows.since(&repositories[0]), Some(until));
        assert_eq!(windows.since(&repositories[1]), Some(start));

        let later = until + Duration::hours(1);
        windows.complete(&repositories[1], ScanOutcome::Quiet, later);
        assert_eq!(windows.since(&repositories[1]), Some(later));
    }

    #[test]
    fn unknown_repository_has_no_window() {
        let mut windows = ScanWindows::new(&repositories(), Utc::now());
        let other: RepositoryId = "acme/other".parse().unwrap();

        windows.complete(&other, ScanOutcome::Quiet, Utc::now());

        assert_eq!(windows.since(&other), None);
    }
}
