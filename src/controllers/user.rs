use super::{message, ok};
use crate::error::AppResult;
use crate::middleware::{AdminUser, AnyUser};
use crate::models::user::UpdateProfileRequest;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use log::info;
use uuid::Uuid;

pub async fn get_profile(state: web::Data<AppState>, user: AnyUser) -> AppResult<HttpResponse> {
    let profile = state.users.get(user.id).await?;
    Ok(ok("Profile retrieved", profile))
}

pub async fn update_profile(
    state: web::Data<AppState>,
    user: AnyUser,
    body: web::Json<UpdateProfileRequest>,
) -> AppResult<HttpResponse> {
    let profile = state.users.update_profile(user.id, body.into_inner()).await?;
    info!("✅ Profile updated for {}", profile.email);
    Ok(ok("Profile updated", profile))
}

pub async fn list_users(state: web::Data<AppState>, _admin: AdminUser) -> AppResult<HttpResponse> {
    let users = state.users.list().await?;
    Ok(ok("Users retrieved", users))
}

pub async fn get_user(state: web::Data<AppState>, _admin: AdminUser, id: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let user = state.users.get(id.into_inner()).await?;
    Ok(ok("User retrieved", user))
}

pub async fn delete_user(state: web::Data<AppState>, admin: AdminUser, id: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let id = id.into_inner();
    state.users.delete(id).await?;
    info!("🗑️ {} deleted user {}", admin.email, id);
    Ok(message("User deleted"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/users/profile")
            .route(web::get().to(get_profile))
            .route(web::put().to(update_profile)),
    )
    .route("/users", web::get().to(list_users))
    .service(
        web::resource("/users/{id}")
            .route(web::get().to(get_user))
            .route(web::delete().to(delete_user)),
    );
}
