use std::path::Path;

use shared::{IssueTemplate, DEFAULT_CONCURRENCY};

pub mod auth;
pub mod db;
pub mod metrics;
pub mod types;

/// How bulk issue creation renders issues and how many it creates at once.
#[derive(Debug, Clone)]
pub struct BulkSettings {
    pub template: IssueTemplate,
    pub concurrency: usize,
}

impl BulkSettings {
    pub fn load(template_file: Option<&Path>, concurrency: Option<usize>) -> anyhow::Result<Self> {
        let template = match template_file {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str(&content)?
            }
            None => IssueTemplate::default(),
        };

        Ok(Self {
            template,
            concurrency: concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1),
        })
    }
}
