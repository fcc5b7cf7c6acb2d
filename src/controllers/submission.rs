use super::{created, message, ok};
use crate::error::AppResult;
use crate::middleware::{AdminUser, AnyUser, RegularUser};
use crate::models::product::{CreateSubmissionRequest, ProductListQuery, UpdateSubmissionRequest};
use crate::services::submission::Decision;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use log::info;
use uuid::Uuid;

pub async fn list_submissions(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<ProductListQuery>,
) -> AppResult<HttpResponse> {
    let products = state.submissions.list(query.into_inner()).await?;
    Ok(ok("Submissions retrieved", products))
}

pub async fn list_my_submissions(
    state: web::Data<AppState>,
    user: RegularUser,
    query: web::Query<ProductListQuery>,
) -> AppResult<HttpResponse> {
    let products = state.submissions.list_for_user(user.actor(), query.into_inner()).await?;
    Ok(ok("Submissions retrieved", products))
}

pub async fn get_submission(
    state: web::Data<AppState>,
    user: AnyUser,
    id: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let product = state.submissions.get(user.actor(), id.into_inner()).await?;
    Ok(ok("Submission retrieved", product))
}

pub async fn create_submission(
    state: web::Data<AppState>,
    user: RegularUser,
    body: web::Json<CreateSubmissionRequest>,
) -> AppResult<HttpResponse> {
    let result = state.submissions.create(user.actor(), body.into_inner()).await?;
    info!("🎫 {} submitted {} ({})", user.email, result.product.name, result.product.status);

    let msg = if result.payment_url.is_some() {
        "Submission created, please complete the submission fee payment"
    } else {
        "Submission created and waiting for review"
    };
    Ok(created(msg, result))
}

pub async fn update_submission(
    state: web::Data<AppState>,
    user: RegularUser,
    id: web::Path<Uuid>,
    body: web::Json<UpdateSubmissionRequest>,
) -> AppResult<HttpResponse> {
    let product = state
        .submissions
        .update(user.actor(), id.into_inner(), body.into_inner())
        .await?;
    Ok(ok("Submission updated", product))
}

pub async fn decide_submission(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<(Uuid, String)>,
) -> AppResult<HttpResponse> {
    let (id, status) = path.into_inner();
    let decision: Decision = status.parse()?;
    let product = state.submissions.decide(id, decision).await?;
    info!("📝 {} set submission {} to {}", admin.email, id, product.status);
    Ok(ok("Submission status updated", product))
}

pub async fn cancel_submission(
    state: web::Data<AppState>,
    user: RegularUser,
    id: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state.submissions.cancel(user.actor(), id.into_inner()).await?;
    Ok(message("Submission cancelled"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/submissions")
            .route(web::get().to(list_submissions))
            .route(web::post().to(create_submission)),
    )
    .route("/submissions/user", web::get().to(list_my_submissions))
    .service(
        web::resource("/submissions/{id}")
            .route(web::get().to(get_submission))
            .route(web::put().to(update_submission))
            .route(web::delete().to(cancel_submission)),
    )
    .route("/submissions/{id}/{status}", web::put().to(decide_submission));
}
