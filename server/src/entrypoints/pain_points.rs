use discovery_server::{
    db::DB,
    types::{page_offset, CreatePainPointRequest, PaginatedResponse, PainPointResponse},
};
use rocket::{http::Status, response::status, serde::json::Json, State};
use shared::slugify;

#[utoipa::path(context_path = "/api/pain-points", responses(
    (status = 200, description = "List recorded pain points", body = PaginatedPainPointResponse)
))]
#[get("/?<page>&<limit>")]
pub(super) async fn list_pain_points(
    db: &State<DB>,
    page: Option<u64>,
    limit: Option<u64>,
) -> Option<Json<PaginatedResponse<PainPointResponse>>> {
    let page = page.unwrap_or(0);
    let limit = limit.unwrap_or(50).clamp(1, 100);
    let (records, total) = match db.get_pain_points(page_offset(page, limit), limit as i64).await {
        Err(e) => {
            tracing::error!("Failed to get pain points: {e}");
            return None;
        }
        Ok(value) => value,
    };
    Some(Json(PaginatedResponse::new(
        records.into_iter().map(Into::into).collect(),
        page.saturating_add(1),
        limit,
        total,
    )))
}

#[utoipa::path(context_path = "/api/pain-points", responses(
    (status = 200, description = "Get a pain point with the issues created from it", body = PainPointResponse),
    (status = 404, description = "Pain point not found")
))]
#[get("/<id>")]
pub(super) async fn get_pain_point(id: i64, db: &State<DB>) -> Option<Json<PainPointResponse>> {
    let record = match db.get_pain_point(id).await {
        Err(e) => {
            tracing::error!("Failed to get pain point {id}: {e}");
            return None;
        }
        Ok(value) => value?,
    };
    let issues = match db.get_pain_point_issues(id).await {
        Err(e) => {
            tracing::error!("Failed to get issues of pain point {id}: {e}");
            return None;
        }
        Ok(value) => value,
    };

    Some(Json(PainPointResponse::from(record).with_issues(issues)))
}

#[utoipa::path(context_path = "/api/pain-points", request_body = CreatePainPointRequest, responses(
    (status = 201, description = "Pain point recorded", body = PainPointResponse),
    (status = 422, description = "Title is empty")
))]
#[post("/", data = "<request>")]
pub(super) async fn create_pain_point(
    request: Json<CreatePainPointRequest>,
    db: &State<DB>,
) -> Result<status::Created<Json<PainPointResponse>>, Status> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(Status::UnprocessableEntity);
    }

    let record = db
        .insert_pain_point(title, request.body.trim(), &slugify(title))
        .await
        .map_err(|e| {
            tracing::error!("Failed to store pain point: {e}");
            Status::InternalServerError
        })?;

    let location = format!("/api/pain-points/{}", record.id);
    Ok(status::Created::new(location).body(Json(record.into())))
}

pub fn stage() -> rocket::fairing::AdHoc {
    rocket::fairing::AdHoc::on_ignite("Installing pain point entrypoints", |rocket| async {
        rocket.mount(
            "/api/pain-points",
            rocket::routes![list_pain_points, get_pain_point, create_pain_point],
        )
    })
}
