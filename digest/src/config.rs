use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use shared::RepositoryId;

#[derive(Debug, Deserialize)]
struct RepositoriesFile {
    repositories: Vec<String>,
}

/// Repositories the worker keeps an eye on.
#[derive(Debug, Clone)]
pub struct WatchList {
    pub repositories: Vec<RepositoryId>,
}

impl WatchList {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let file: RepositoriesFile = toml::from_str(content)?;
        let mut repositories = Vec::with_capacity(file.repositories.len());
        for repository in file.repositories {
            let repository: RepositoryId = repository.trim().parse()?;
            if !repositories.contains(&repository) {
                repositories.push(repository);
            }
        }
        if repositories.is_empty() {
            anyhow::bail!("No repositories to watch");
        }
        Ok(Self { repositories })
    }
}

pub const DEFAULT_POLL_INTERVAL_MINUTES: u64 = 60;
// One year
pub const MAX_POLL_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

/// Turns `POLL_INTERVAL_MINUTES` into a scan period.
pub fn poll_interval(minutes: Option<u64>) -> anyhow::Result<Duration> {
    let minutes = minutes.unwrap_or(DEFAULT_POLL_INTERVAL_MINUTES);
    if minutes == 0 {
        anyhow::bail!("POLL_INTERVAL_MINUTES must be at least 1");
    }
    if minutes > MAX_POLL_INTERVAL_MINUTES {
        anyhow::bail!(
            "POLL_INTERVAL_MINUTES must be at most {MAX_POLL_INTERVAL_MINUTES}, got {minutes}"
        );
    }
    let seconds = minutes
        .checked_mul(60)
        .ok_or_else(|| anyhow::anyhow!("POLL_INTERVAL_MINUTES is too large: {minutes}"))?;
    Ok(Duration::from_secs(seconds))
}
