use crate::error::{AppError, AppResult};
use crate::models::user::UpdateProfileRequest;
use crate::models::User;
use crate::repositories::UserRepository;
use crate::services::auth::hash_password;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        Ok(self.users.list().await?)
    }

    pub async fn update_profile(&self, id: Uuid, req: UpdateProfileRequest) -> AppResult<User> {
        let mut user = self.get(id).await?;

        if let Some(name) = req.full_name.filter(|n| !n.trim().is_empty()) {
            user.full_name = name.trim().to_string();
        }
        if let Some(gender) = req.gender.filter(|g| !g.trim().is_empty()) {
            user.gender = Some(gender);
        }
        if let Some(email) = req.email.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty()) {
            if email != user.email {
                if !email.contains('@') {
                    return Err(AppError::validation("A valid email is required"));
                }
                if self.users.find_by_email(&email).await?.is_some() {
                    return Err(AppError::validation("Email already registered"));
                }
                user.email = email;
            }
        }
        if let Some(password) = req.password.filter(|p| !p.is_empty()) {
            user.password_hash = hash_password(&password)?;
        }

        let user = self.users.save(&user).await?;
        info!("👤 Profile updated for user {}", user.id);
        Ok(user)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.users.delete(id).await? {
            return Err(AppError::not_found("User not found"));
        }
        info!("🗑️ User {} deleted", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, Role};
    use crate::repositories::Repositories;

    async fn seeded() -> (UserService, User, User) {
        let repos = Repositories::in_memory();
        let mk = |name: &str, email: &str| NewUser {
            full_name: name.to_string(),
            gender: None,
            email: email.to_string(),
            password_hash: "x".to_string(),
            role: Role::User,
            verification_token: None,
        };
        let a = repos.users.create(mk("Ana", "ana@example.com")).await.unwrap();
        let b = repos.users.create(mk("Bayu", "bayu@example.com")).await.unwrap();
        (UserService::new(repos.users), a, b)
    }

    #[tokio::test]
    async fn partial_profile_update() {
        let (svc, ana, _) = seeded().await;
        let updated = svc
            .update_profile(
                ana.id,
                UpdateProfileRequest {
                    full_name: Some("Ana Putri".to_string()),
                    email: Some(" ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.full_name, "Ana Putri");
        assert_eq!(updated.email, "ana@example.com");
    }

    #[tokio::test]
    async fn email_must_stay_unique() {
        let (svc, ana, _) = seeded().await;
        let err = svc
            .update_profile(
                ana.id,
                UpdateProfileRequest {
                    email: Some("BAYU@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_missing_user_is_not_found() {
        let (svc, ana, _) = seeded().await;
        svc.delete(ana.id).await.unwrap();
        assert!(matches!(svc.delete(ana.id).await, Err(AppError::NotFound(_))));
    }
}
