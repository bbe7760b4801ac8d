use discovery_server::{
    auth::{setup_status, GithubToken},
    metrics::DiscoveryMetrics,
    types::{ActivityResponse, SignificanceResponse, DEFAULT_ACTIVITY_DAYS, MAX_ACTIVITY_DAYS},
};
use rocket::{http::Status, serde::json::Json, State};
use shared::{github::GithubClient, ActivitySummary, RepositoryId, SetupError};
use tracing::instrument;

#[utoipa::path(context_path = "/api/activity", responses(
    (status = 200, description = "Classify an activity summary", body = SignificanceResponse)
))]
#[post("/significance", data = "<summary>")]
pub(super) async fn evaluate_significance(
    summary: Json<ActivitySummary>,
    metrics: &State<DiscoveryMetrics>,
) -> Json<SignificanceResponse> {
    let response = SignificanceResponse::from(&*summary);
    metrics.record_significance(response.significant);
    Json(response)
}

#[utoipa::path(context_path = "/api/repos", responses(
    (status = 200, description = "Scan recent repository activity", body = ActivityResponse),
    (status = 401, description = "Missing or rejected GitHub token", body = ActivityResponse),
    (status = 502, description = "GitHub could not be reached", body = ActivityResponse)
))]
#[get("/<owner>/<repo>/activity?<days>")]
#[instrument(skip(token, metrics))]
pub(super) async fn repository_activity(
    owner: &str,
    repo: &str,
    days: Option<u32>,
    token: Result<GithubToken, SetupError>,
    metrics: &State<DiscoveryMetrics>,
) -> (Status, Json<ActivityResponse>) {
    let days = days.unwrap_or(DEFAULT_ACTIVITY_DAYS).clamp(1, MAX_ACTIVITY_DAYS);

    let setup = RepositoryId::new(owner, repo).and_then(|repository| {
        let github = GithubClient::new(token?.0)?;
        Ok((repository, github))
    });
    let (repository, github) = match setup {
        Ok(value) => value,
        Err(e) => {
            return (
                setup_status(&e),
                Json(ActivityResponse::Failed {
                    reason: e.to_string(),
                }),
            )
        }
    };

    let until = chrono::Utc::now();
    let since = until - chrono::Duration::days(days as i64);
    let summary = match github.activity_summary(&repository, since, until).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Failed to scan activity of {repository}: {e:#}");
            return (
                Status::BadGateway,
                Json(ActivityResponse::Failed {
                    reason: format!("failed to scan {repository}"),
                }),
            );
        }
    };

    let significance = SignificanceResponse::from(&summary);
    metrics.record_significance(significance.significant);
    (
        Status::Ok,
        Json(ActivityResponse::Scanned {
            repository: repository.to_string(),
            days,
            significant: significance.significant,
            signals: significance.signals,
            summary,
        }),
    )
}

pub fn stage() -> rocket::fairing::AdHoc {
    rocket::fairing::AdHoc::on_ignite("Installing activity entrypoints", |rocket| async {
        rocket
            .mount("/api/activity", rocket::routes![evaluate_significance])
            .mount("/api/repos", rocket::routes![repository_activity])
    })
}
