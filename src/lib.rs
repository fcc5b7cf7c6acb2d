pub mod config;
pub mod controllers;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;

use actix_web::{HttpResponse, Responder};
use serde_json::json;

pub use config::Config;
pub use controllers::configure_routes;
pub use state::AppState;

pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "fasttix-api",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn api_info() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "FastTix API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Event submission and ticketing marketplace with Midtrans payments",
        "endpoints": {
            "health": "/health",
            "api_docs": "/api",
            "auth": "/api/v1/{register,login,verify-email,request-reset-password,reset-password}",
            "submissions": "/api/v1/submissions/*",
            "tickets": "/api/v1/tickets/*",
            "payments": "/api/v1/payment/checkout/{token}",
            "transactions": "/api/v1/transactions/*",
            "users": "/api/v1/users/*",
            "webhook": "/api/v1/webhook/midtrans",
            "checkin": "/api/v1/checkin/{order_id}"
        }
    }))
}

pub async fn not_found() -> impl Responder {
    HttpResponse::NotFound().json(json!({
        "error": "Endpoint not found",
        "message": "See /api for the list of endpoints"
    }))
}
