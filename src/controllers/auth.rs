use super::{created, message, ok};
use crate::error::AppResult;
use crate::models::user::{LoginRequest, RegisterRequest, RequestPasswordResetRequest, ResetPasswordRequest};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use log::info;

pub async fn register(state: web::Data<AppState>, body: web::Json<RegisterRequest>) -> AppResult<HttpResponse> {
    let user = state.auth.register(body.into_inner()).await?;
    info!("🎉 Registered {}", user.email);
    Ok(created("Registration successful, please check your email to verify your account", user))
}

pub async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> AppResult<HttpResponse> {
    let response = state.auth.login(body.into_inner()).await?;
    Ok(ok("Login successful", response))
}

pub async fn verify_email(state: web::Data<AppState>, token: web::Path<String>) -> AppResult<HttpResponse> {
    let user = state.auth.verify_email(&token).await?;
    Ok(ok("Email verified successfully", user))
}

pub async fn request_password_reset(
    state: web::Data<AppState>,
    body: web::Json<RequestPasswordResetRequest>,
) -> AppResult<HttpResponse> {
    state.auth.request_password_reset(&body.email).await?;
    Ok(message("If that email is registered, a password reset link has been sent"))
}

pub async fn reset_password(
    state: web::Data<AppState>,
    body: web::Json<ResetPasswordRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    state.auth.reset_password(&req.token, &req.new_password).await?;
    Ok(message("Password has been reset successfully"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/register", web::post().to(register))
        .route("/login", web::post().to(login))
        .route("/verify-email/{token}", web::get().to(verify_email))
        .route("/request-reset-password", web::post().to(request_password_reset))
        .route("/reset-password", web::post().to(reset_password));
}
