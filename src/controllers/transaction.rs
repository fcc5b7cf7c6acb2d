use super::ok;
use crate::error::AppResult;
use crate::middleware::{AdminUser, AnyUser, RegularUser};
use crate::models::transaction::TransactionListQuery;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use uuid::Uuid;

pub async fn list_transactions(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<TransactionListQuery>,
) -> AppResult<HttpResponse> {
    let transactions = state.transactions.list_all(query.into_inner()).await?;
    Ok(ok("Transactions retrieved", transactions))
}

pub async fn list_my_transactions(
    state: web::Data<AppState>,
    user: RegularUser,
    query: web::Query<TransactionListQuery>,
) -> AppResult<HttpResponse> {
    let transactions = state
        .transactions
        .list_for_user(user.actor(), query.into_inner())
        .await?;
    Ok(ok("Transactions retrieved", transactions))
}

pub async fn get_transaction(
    state: web::Data<AppState>,
    user: AnyUser,
    id: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let tx = state.transactions.get(user.actor(), id.into_inner()).await?;
    Ok(ok("Transaction retrieved", tx))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/transactions", web::get().to(list_transactions))
        .route("/transactions/user", web::get().to(list_my_transactions))
        .route("/transactions/{id}", web::get().to(get_transaction));
}
