use std::sync::Arc;

use discovery_server::{
    auth::{setup_status, GithubToken},
    db::DB,
    metrics::DiscoveryMetrics,
    types::{BulkCreateRequest, BulkCreateResponse, MAX_BULK_IDS},
    BulkSettings,
};
use rocket::{http::Status, serde::json::Json, State};
use shared::{
    github::GithubClient, BulkCreateStats, BulkIssueCreator, RepositoryId, SetupError,
};
use tracing::instrument;

#[utoipa::path(context_path = "/api/repos", request_body = BulkCreateRequest, responses(
    (status = 200, description = "Batch processed, per item failures are counted", body = BulkCreateResponse),
    (status = 401, description = "Missing or rejected GitHub token", body = BulkCreateResponse),
    (status = 404, description = "Repository not found", body = BulkCreateResponse),
    (status = 422, description = "Invalid repository or too many pain points", body = BulkCreateResponse)
))]
#[post("/<owner>/<repo>/issues/bulk", data = "<request>")]
#[instrument(skip(token, request, db, settings, metrics))]
pub(super) async fn bulk_create_issues(
    owner: &str,
    repo: &str,
    token: Result<GithubToken, SetupError>,
    request: Json<BulkCreateRequest>,
    db: &State<DB>,
    settings: &State<BulkSettings>,
    metrics: &State<DiscoveryMetrics>,
) -> (Status, Json<BulkCreateResponse>) {
    if request.pain_point_ids.len() > MAX_BULK_IDS {
        return (
            Status::UnprocessableEntity,
            Json(BulkCreateResponse::Failed {
                reason: format!("at most {MAX_BULK_IDS} pain points can be sent at once"),
            }),
        );
    }

    match create(owner, repo, token, &request.pain_point_ids, db, settings).await {
        Ok(stats) => {
            metrics.record_bulk(&stats);
            (Status::Ok, Json(stats.into()))
        }
        Err(e) => {
            tracing::warn!("Bulk issue creation for {owner}/{repo} failed: {e}");
            metrics.record_setup_failure();
            (setup_status(&e), Json(BulkCreateResponse::from(&e)))
        }
    }
}

async fn create(
    owner: &str,
    repo: &str,
    token: Result<GithubToken, SetupError>,
    ids: &[i64],
    db: &DB,
    settings: &BulkSettings,
) -> Result<BulkCreateStats, SetupError> {
    let repository = RepositoryId::new(owner, repo)?;
    if ids.is_empty() {
        return Ok(BulkCreateStats::default());
    }

    let github = GithubClient::new(token?.0)?;
    let db = Arc::new(db.clone());
    BulkIssueCreator::new(Arc::new(github), db.clone(), db)
        .with_template(settings.template.clone())
        .with_concurrency(settings.concurrency)
        .bulk_create_issues(&repository, ids)
        .await
}

pub fn stage() -> rocket::fairing::AdHoc {
    rocket::fairing::AdHoc::on_ignite("Installing issue entrypoints", |rocket| async {
        rocket.mount("/api/repos", rocket::routes![bulk_create_issues])
    })
}
