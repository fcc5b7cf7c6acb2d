use super::ok;
use crate::error::AppResult;
use crate::middleware::{AdminUser, RegularUser};
use crate::models::product::ProductListQuery;
use crate::models::transaction::CheckoutRequest;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use log::info;
use uuid::Uuid;

pub async fn list_tickets(state: web::Data<AppState>, query: web::Query<ProductListQuery>) -> AppResult<HttpResponse> {
    let products = state.tickets.list(query.into_inner()).await?;
    Ok(ok("Tickets retrieved", products))
}

pub async fn get_ticket(state: web::Data<AppState>, id: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let product = state.tickets.get(id.into_inner()).await?;
    Ok(ok("Ticket retrieved", product))
}

/// Body is optional; a missing quantity buys one seat.
pub async fn checkout(
    state: web::Data<AppState>,
    user: RegularUser,
    product_id: web::Path<Uuid>,
    body: Option<web::Json<CheckoutRequest>>,
) -> AppResult<HttpResponse> {
    let req = body.map(web::Json::into_inner).unwrap_or_default();
    let response = state.tickets.checkout(user.actor(), product_id.into_inner(), req).await?;
    info!("🛒 {} checked out {}", user.email, response.transaction.order_id);

    let msg = if response.payment_url.is_some() {
        "Checkout created, please complete the payment"
    } else {
        "Ticket issued"
    };
    Ok(ok(msg, response))
}

pub async fn confirm_payment(
    state: web::Data<AppState>,
    admin: AdminUser,
    id: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let tx = state.payments.confirm_payment(id.into_inner()).await?;
    info!("💰 {} confirmed payment for {}", admin.email, tx.order_id);
    Ok(ok("Payment confirmed", tx))
}

pub async fn checkout_link(
    state: web::Data<AppState>,
    user: RegularUser,
    token: web::Path<String>,
) -> AppResult<HttpResponse> {
    let link = state.payments.reissue_checkout_link(user.actor(), &token).await?;
    Ok(ok("Payment link created", link))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/tickets", web::get().to(list_tickets))
        .route("/tickets/{id}", web::get().to(get_ticket))
        .route("/tickets/{id}/checkout", web::post().to(checkout))
        .route("/tickets/{id}/payment", web::put().to(confirm_payment))
        .route("/payment/checkout/{token}", web::get().to(checkout_link));
}
