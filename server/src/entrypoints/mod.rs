use discovery_server::types::{
    ActivityResponse, BulkCreateRequest, BulkCreateResponse, CreatePainPointRequest, LinkedIssue,
    PaginatedPainPointResponse, PainPointResponse, SignificanceResponse,
};
use rocket::fairing::AdHoc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod activity;
pub mod issues;
pub mod pain_points;

#[derive(OpenApi)]
#[openapi(
    info(title = "Customer discovery API"),
    paths(
        pain_points::list_pain_points,
        pain_points::get_pain_point,
        pain_points::create_pain_point,
        issues::bulk_create_issues,
        activity::evaluate_significance,
        activity::repository_activity,
    ),
    components(schemas(
        PainPointResponse,
        PaginatedPainPointResponse,
        CreatePainPointRequest,
        LinkedIssue,
        BulkCreateRequest,
        BulkCreateResponse,
        SignificanceResponse,
        ActivityResponse,
    ))
)]
struct ApiDoc;

pub fn stage() -> AdHoc {
    AdHoc::on_ignite("Installing entrypoints", |rocket| async {
        rocket
            .attach(pain_points::stage())
            .attach(issues::stage())
            .attach(activity::stage())
            .mount(
                "/",
                SwaggerUi::new("/swagger-ui/<_..>").url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
}
