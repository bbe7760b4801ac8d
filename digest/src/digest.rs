use itertools::Itertools;
use shared::{ActivitySummary, RepositoryId};

const MAX_LINES_PER_SECTION: usize = 5;

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim()
}

fn section(out: &mut Vec<String>, header: String, lines: impl Iterator<Item = String>) {
    let lines = lines.collect_vec();
    if lines.is_empty() {
        return;
    }
    out.push(String::new());
    out.push(header);
    let hidden = lines.len().saturating_sub(MAX_LINES_PER_SECTION);
    out.extend(
        lines
            .into_iter()
            .take(MAX_LINES_PER_SECTION)
            .map(|line| format!("• {line}")),
    );
    if hidden > 0 {
        out.push(format!("…and {hidden} more"));
    }
}

/// Plain-text digest of a significant window. Escaping is left to the transport.
pub fn render_digest(repository: &RepositoryId, summary: &ActivitySummary) -> String {
    let signals = summary.signals().iter().join(", ");
    let mut out = vec![
        format!("Significant activity in {repository} ({signals})"),
        format!(
            "{} commits, {} merged pull requests, {} closed issues, {} releases, {} contributors",
            summary.commits.len(),
            summary.merged_pull_requests().count(),
            summary.closed_issues().count(),
            summary.releases.len(),
            summary.contributors.len(),
        ),
    ];

    section(
        &mut out,
        "Releases:".to_string(),
        summary.releases.iter().map(|release| {
            format!(
                "{} {}",
                release.tag,
                release.name.as_deref().unwrap_or_default()
            )
            .trim_end()
            .to_string()
        }),
    );
    section(
        &mut out,
        "Merged pull requests:".to_string(),
        summary
            .merged_pull_requests()
            .map(|pr| format!("#{} {}", pr.number, pr.title)),
    );
    section(
        &mut out,
        "Closed issues:".to_string(),
        summary
            .closed_issues()
            .map(|issue| format!("#{} {}", issue.number, issue.title)),
    );
    section(
        &mut out,
        "Commits:".to_string(),
        summary.commits.iter().map(|commit| {
            let short = commit.id.chars().take(7).collect::<String>();
            format!("{short} {} ({})", first_line(&commit.message), commit.author)
        }),
    );

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use shared::{CommitInfo, PullRequestInfo, ReleaseInfo};

    use super::*;

    fn repo() -> RepositoryId {
        "acme/app".parse().unwrap()
    }

    #[test]
    fn digest_lists_signals_and_items() {
        let summary = ActivitySummary {
            pull_requests: vec![PullRequestInfo {
                number: 12,
                title: "Add CSV export".to_string(),
                merged_at: Some(Utc::now()),
                url: "https://github.com/acme/app/pull/12".to_string(),
            }],
            releases: vec![ReleaseInfo {
                tag: "v1.4.0".to_string(),
                name: None,
                published_at: Some(Utc::now()),
                url: "https://github.com/acme/app/releases/tag/v1.4.0".to_string(),
            }],
            ..Default::default()
        };

        let text = render_digest(&repo(), &summary);
        let expected = "Significant activity in acme/app (merged_pull_requests, releases)\n\
            0 commits, 1 merged pull requests, 0 closed issues, 1 releases, 0 contributors\n\
            \n\
            Releases:\n\
            • v1.4.0\n\
            \n\
            Merged pull requests:\n\
            • #12 Add CSV export";
        assert_eq!(text, expected);
    }

    #[test]
    fn long_sections_are_truncated() {
        let summary = ActivitySummary {
            commits: (0..8)
                .map(|i| CommitInfo {
                    id: format!("abcdef123456{i}"),
                    message: format!("Commit {i}\n\nLonger description"),
                    author: "octocat".to_string(),
                    timestamp: Utc::now(),
                    url: String::new(),
                })
                .collect(),
            ..Default::default()
        };

        let text = render_digest(&repo(), &summary);
        assert!(text.contains("• abcdef1 Commit 0 (octocat)"));
        assert!(text.contains("• abcdef1 Commit 4 (octocat)"));
        assert!(!text.contains("Commit 5"));
        assert!(text.ends_with("…and 3 more"));
        assert!(!text.contains("Longer description"));
    }
}
