use super::ok;
use crate::error::AppResult;
use crate::services::payment::MidtransNotification;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use log::info;
use serde_json::json;

/// Midtrans payment notification. Public; authenticity comes from the
/// signature key in the body.
pub async fn midtrans_notification(
    state: web::Data<AppState>,
    body: web::Json<MidtransNotification>,
) -> AppResult<HttpResponse> {
    let notification = body.into_inner();
    info!(
        "📨 Midtrans notification for {} ({})",
        notification.order_id, notification.transaction_status
    );

    let order_id = notification.order_id.clone();
    let outcome = state.payments.handle_notification(notification).await?;

    Ok(ok(
        outcome.message(),
        json!({ "order_id": order_id, "outcome": outcome }),
    ))
}

/// Target of the QR code printed on each ticket.
pub async fn check_in(state: web::Data<AppState>, order_id: web::Path<String>) -> AppResult<HttpResponse> {
    let result = state.tickets.check_in(&order_id).await?;
    Ok(ok("Check-in successful", result))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/webhook/midtrans", web::post().to(midtrans_notification))
        .route("/checkin/{order_id}", web::get().to(check_in));
}
