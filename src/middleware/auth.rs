use crate::config::AccessPolicy;
use crate::error::AppError;
use crate::models::{Actor, Role};
use crate::state::AppState;
use actix_web::{dev::Payload, http, web, FromRequest, HttpRequest};
use log::{debug, error, warn};
use std::future::{ready, Ready};
use std::marker::PhantomData;
use std::ops::Deref;
use uuid::Uuid;

/// Roles admitted to a group of routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedRoles(Vec<Role>);

impl AllowedRoles {
    pub fn new(roles: Vec<Role>) -> Self {
        Self(roles)
    }

    pub fn permits(&self, role: Role) -> bool {
        self.0.contains(&role)
    }
}

#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub role: Role,
    pub email: String,
}

impl AuthenticatedUser {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            role: self.role,
        }
    }

    fn from_http(req: &HttpRequest) -> Result<Self, AppError> {
        let auth_header = req
            .headers()
            .get(http::header::AUTHORIZATION)
            .ok_or_else(|| {
                warn!("❌ Request without authorization header: {}", req.path());
                AppError::unauthorized("Authorization header required")
            })?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::unauthorized("Invalid authorization header format"))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::unauthorized("Bearer token required"))?;

        let state = req.app_data::<web::Data<AppState>>().ok_or_else(|| {
            error!("AppState not found in app data");
            AppError::Internal(anyhow::anyhow!("application state not configured"))
        })?;

        let claims = state.tokens.verify(token)?;
        let user = AuthenticatedUser {
            id: claims.user_id()?,
            role: claims.role,
            email: claims.email,
        };
        debug!("🎉 Authenticated {} ({})", user.id, user.role);

        Ok(user)
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Self::from_http(req))
    }
}

/// Picks the role list for a class of routes out of the `AccessPolicy`.
pub trait RouteGroup {
    fn allowed(policy: &AccessPolicy) -> &AllowedRoles;
}

pub struct AdminOnly;
pub struct UserOnly;
pub struct AllRoles;

impl RouteGroup for AdminOnly {
    fn allowed(policy: &AccessPolicy) -> &AllowedRoles {
        &policy.admin_only
    }
}

impl RouteGroup for UserOnly {
    fn allowed(policy: &AccessPolicy) -> &AllowedRoles {
        &policy.user_only
    }
}

impl RouteGroup for AllRoles {
    fn allowed(policy: &AccessPolicy) -> &AllowedRoles {
        &policy.all_roles
    }
}

/// An authenticated caller whose role is admitted by route group `G`.
pub struct Authorized<G: RouteGroup> {
    user: AuthenticatedUser,
    _group: PhantomData<G>,
}

pub type AdminUser = Authorized<AdminOnly>;
pub type RegularUser = Authorized<UserOnly>;
pub type AnyUser = Authorized<AllRoles>;

impl<G: RouteGroup> Deref for Authorized<G> {
    type Target = AuthenticatedUser;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl<G: RouteGroup> FromRequest for Authorized<G> {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = AuthenticatedUser::from_http(req).and_then(|user| {
            let policy = req.app_data::<web::Data<AccessPolicy>>().ok_or_else(|| {
                error!("AccessPolicy not found in app data");
                AppError::Internal(anyhow::anyhow!("access policy not configured"))
            })?;

            if !G::allowed(policy).permits(user.role) {
                warn!("🚫 {} ({}) denied access to {}", user.id, user.role, req.path());
                return Err(AppError::forbidden(
                    "You do not have permission to access this resource",
                ));
            }

            Ok(Authorized {
                user,
                _group: PhantomData,
            })
        });

        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_partitions_roles() {
        let policy = AccessPolicy::default();

        assert!(AdminOnly::allowed(&policy).permits(Role::Administrator));
        assert!(!AdminOnly::allowed(&policy).permits(Role::User));
        assert!(UserOnly::allowed(&policy).permits(Role::User));
        assert!(!UserOnly::allowed(&policy).permits(Role::Administrator));
        assert!(AllRoles::allowed(&policy).permits(Role::User));
        assert!(AllRoles::allowed(&policy).permits(Role::Administrator));
    }
}
