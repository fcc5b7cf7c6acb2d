use super::ok;
use crate::error::AppResult;
use crate::middleware::AnyUser;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use uuid::Uuid;

pub async fn list_notifications(state: web::Data<AppState>, user: AnyUser) -> AppResult<HttpResponse> {
    let notifications = state.notifications.list_for_user(user.id).await?;
    Ok(ok("Notifications retrieved", notifications))
}

pub async fn get_notification(
    state: web::Data<AppState>,
    user: AnyUser,
    id: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let notification = state.notifications.get_for_user(user.actor(), id.into_inner()).await?;
    Ok(ok("Notification retrieved", notification))
}

pub async fn mark_read(state: web::Data<AppState>, user: AnyUser, id: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let notification = state.notifications.mark_read(user.actor(), id.into_inner()).await?;
    Ok(ok("Notification marked as read", notification))
}

// Registered ahead of the user routes so "/users/notifications" never
// reaches "/users/{id}".
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/users/notifications", web::get().to(list_notifications))
        .route("/users/notifications/{id}", web::get().to(get_notification))
        .route("/users/notifications/{id}/read", web::put().to(mark_read));
}
