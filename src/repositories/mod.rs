//! Storage seams. Services only ever see these traits, so the same workflow
//! code runs against Postgres in production and the in-memory store in tests.

use crate::models::{
    NewProduct, NewTransaction, NewUser, Notification, Product, ProductFilter, Transaction,
    TransactionListQuery, TransactionStatus, User,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

#[async_trait::async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create(&self, new: NewProduct) -> Result<Product>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Product>>;
    async fn search(&self, filter: &ProductFilter) -> Result<Vec<Product>>;
    async fn save(&self, product: &Product) -> Result<Product>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    /// Decrements remaining stock (clamped at zero) and bumps `sold`.
    async fn consume_inventory(&self, id: Uuid, quantity: i32) -> Result<Option<Product>>;
}

#[async_trait::async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn create(&self, new: NewTransaction) -> Result<Transaction>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>>;
    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Transaction>>;
    async fn find_by_verification_token(&self, token: &str) -> Result<Option<Transaction>>;
    async fn list(&self, user_id: Option<Uuid>, query: &TransactionListQuery) -> Result<Vec<Transaction>>;
    async fn update_status(&self, id: Uuid, status: TransactionStatus) -> Result<Option<Transaction>>;
    async fn mark_checked_in(&self, id: Uuid) -> Result<Option<Transaction>>;
}

#[async_trait::async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, new: NewUser) -> Result<User>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list(&self) -> Result<Vec<User>>;
    async fn verify_email(&self, token: &str) -> Result<Option<User>>;
    async fn set_reset_token(&self, id: Uuid, token: &str, expires: DateTime<Utc>) -> Result<()>;
    async fn reset_password(&self, token: &str, password_hash: &str) -> Result<Option<User>>;
    async fn save(&self, user: &User) -> Result<User>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: Notification) -> Result<Notification>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>>;
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Notification>>;
    async fn mark_read(&self, id: Uuid) -> Result<Option<Notification>>;
}

#[derive(Clone)]
pub struct Repositories {
    pub products: Arc<dyn ProductRepository>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub users: Arc<dyn UserRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self::from_store(Arc::new(PostgresStore::new(pool)))
    }

    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemoryStore::default()))
    }

    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ProductRepository + TransactionRepository + UserRepository + NotificationRepository + 'static,
    {
        Self {
            products: store.clone(),
            transactions: store.clone(),
            users: store.clone(),
            notifications: store,
        }
    }
}
