// registration, login, email verification and password resets

use crate::error::{AppError, AppResult};
use crate::models::generate_random_token;
use crate::models::user::{LoginRequest, RegisterRequest};
use crate::models::{NewUser, Role, User};
use crate::repositories::UserRepository;
use crate::services::email::EmailService;
use crate::services::token::TokenService;
use anyhow::anyhow;
use bcrypt::{hash, verify};
use chrono::Utc;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;

pub const BCRYPT_COST: u32 = 10;
pub const MIN_PASSWORD_LEN: usize = 8;
const EMAIL_TOKEN_LEN: usize = 32;

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

pub fn hash_password(password: &str) -> AppResult<String> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    hash(password, BCRYPT_COST).map_err(|e| AppError::Internal(anyhow!("bcrypt failed: {}", e)))
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    email: Arc<EmailService>,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, email: Arc<EmailService>, tokens: Arc<TokenService>) -> Self {
        Self { users, email, tokens }
    }

    pub async fn register(&self, req: RegisterRequest) -> AppResult<User> {
        let email = req.email.trim().to_lowercase();
        info!("🚀 Starting registration for email: {}", email);

        if req.full_name.trim().is_empty() {
            return Err(AppError::validation("Full name is required"));
        }
        if !email.contains('@') {
            return Err(AppError::validation("A valid email is required"));
        }
        if self.users.find_by_email(&email).await?.is_some() {
            warn!("❌ Registration failed: Email {} already exists", email);
            return Err(AppError::validation("Email already registered"));
        }

        let password_hash = hash_password(&req.password)?;
        let verification_token = generate_random_token(EMAIL_TOKEN_LEN);

        let user = self
            .users
            .create(NewUser {
                full_name: req.full_name.trim().to_string(),
                gender: req.gender.filter(|g| !g.trim().is_empty()),
                email,
                password_hash,
                role: Role::User,
                verification_token: Some(verification_token.clone()),
            })
            .await?;
        info!("✅ User created with ID: {}", user.id);

        self.email.send_verification_email(&user, &verification_token).await?;

        Ok(user)
    }

    pub async fn login(&self, req: LoginRequest) -> AppResult<LoginResponse> {
        info!("🔑 Login attempt for email: {}", req.email);

        let user = self
            .users
            .find_by_email(req.email.trim())
            .await?
            .ok_or_else(|| {
                warn!("❌ Login failed: User not found for email {}", req.email);
                AppError::unauthorized("Invalid email or password")
            })?;

        let password_ok = verify(&req.password, &user.password_hash).unwrap_or(false);
        if !password_ok {
            warn!("❌ Login failed: Invalid password for user {}", user.id);
            return Err(AppError::unauthorized("Invalid email or password"));
        }

        if !user.email_verified {
            warn!("❌ Login failed: Email not verified for user {}", user.id);
            return Err(AppError::forbidden(
                "Email not verified. Please verify your email before logging in.",
            ));
        }

        let token = self.tokens.issue(&user)?;
        info!("🎉 User {} logged in (role: {})", user.id, user.role);

        Ok(LoginResponse { token, user })
    }

    pub async fn verify_email(&self, token: &str) -> AppResult<User> {
        let user = self
            .users
            .verify_email(token)
            .await?
            .ok_or_else(|| AppError::validation("Invalid or expired verification token"))?;

        info!("✅ Email verified for user: {} ({})", user.id, user.email);
        Ok(user)
    }

    /// Always succeeds from the caller's point of view so the endpoint can't
    /// be used to probe which emails are registered.
    pub async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        let Some(user) = self.users.find_by_email(email.trim()).await? else {
            info!("Password reset requested for unknown email {}", email);
            return Ok(());
        };

        let token = generate_random_token(EMAIL_TOKEN_LEN);
        self.users
            .set_reset_token(user.id, &token, User::reset_expiry_from(Utc::now()))
            .await?;
        self.email.send_password_reset_email(&user, &token).await?;

        info!("🔐 Password reset issued for user {}", user.id);
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> AppResult<()> {
        let password_hash = hash_password(new_password)?;

        let user = self
            .users
            .reset_password(token, &password_hash)
            .await?
            .ok_or_else(|| AppError::validation("Invalid or expired reset token"))?;

        info!("🔐 Password reset completed for user {}", user.id);
        Ok(())
    }
}
