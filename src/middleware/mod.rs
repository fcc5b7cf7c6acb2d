pub mod auth;

pub use auth::{
    AdminUser, AllowedRoles, AnyUser, AuthenticatedUser, Authorized, RegularUser, RouteGroup,
};
