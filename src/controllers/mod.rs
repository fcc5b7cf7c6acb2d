pub mod auth;
pub mod notification;
pub mod submission;
pub mod ticket;
pub mod transaction;
pub mod user;
pub mod webhook;

use crate::config::AccessPolicy;
use actix_web::{error::InternalError, web, HttpResponse};
use log::warn;
use serde::Serialize;
use serde_json::json;

/// Mounts every API route under `/api/v1` with the given role policy.
pub fn configure_routes(access: AccessPolicy) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::new(access))
            .app_data(json_config())
            .service(
                web::scope("/api/v1")
                    .configure(auth::configure)
                    .configure(webhook::configure)
                    .configure(submission::configure)
                    .configure(ticket::configure)
                    .configure(transaction::configure)
                    .configure(notification::configure)
                    .configure(user::configure),
            );
    }
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(1024 * 1024)
        .error_handler(|err, _req| {
            warn!("Rejected JSON payload: {}", err);
            let message = err.to_string();
            InternalError::from_response(
                err,
                HttpResponse::BadRequest().json(json!({ "error": message })),
            )
            .into()
        })
}

pub(crate) fn ok<T: Serialize>(message: &str, data: T) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": message, "data": data }))
}

pub(crate) fn created<T: Serialize>(message: &str, data: T) -> HttpResponse {
    HttpResponse::Created().json(json!({ "message": message, "data": data }))
}

pub(crate) fn message(message: &str) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": message }))
}
