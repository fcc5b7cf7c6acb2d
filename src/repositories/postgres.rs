use super::{NotificationRepository, ProductRepository, TransactionRepository, UserRepository};
use crate::models::{
    NewProduct, NewTransaction, NewUser, Notification, Product, ProductFilter, Transaction,
    TransactionListQuery, TransactionStatus, User,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Thin adapter from the repository traits to the model query methods.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProductRepository for PostgresStore {
    async fn create(&self, new: NewProduct) -> Result<Product> {
        Product::create(&self.pool, new).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>> {
        Product::find_by_id(&self.pool, id).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Product>> {
        Product::find_by_name(&self.pool, name).await
    }

    async fn search(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        Product::search(&self.pool, filter).await
    }

    async fn save(&self, product: &Product) -> Result<Product> {
        product.save(&self.pool).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Product::delete(&self.pool, id).await
    }

    async fn consume_inventory(&self, id: Uuid, quantity: i32) -> Result<Option<Product>> {
        Product::consume_inventory(&self.pool, id, quantity).await
    }
}

#[async_trait::async_trait]
impl TransactionRepository for PostgresStore {
    async fn create(&self, new: NewTransaction) -> Result<Transaction> {
        Transaction::create(&self.pool, new).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>> {
        Transaction::find_by_id(&self.pool, id).await
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Transaction>> {
        Transaction::find_by_order_id(&self.pool, order_id).await
    }

    async fn find_by_verification_token(&self, token: &str) -> Result<Option<Transaction>> {
        Transaction::find_by_verification_token(&self.pool, token).await
    }

    async fn list(&self, user_id: Option<Uuid>, query: &TransactionListQuery) -> Result<Vec<Transaction>> {
        Transaction::list(&self.pool, user_id, query).await
    }

    async fn update_status(&self, id: Uuid, status: TransactionStatus) -> Result<Option<Transaction>> {
        Transaction::update_status(&self.pool, id, status).await
    }

    async fn mark_checked_in(&self, id: Uuid) -> Result<Option<Transaction>> {
        Transaction::mark_checked_in(&self.pool, id).await
    }
}

#[async_trait::async_trait]
impl UserRepository for PostgresStore {
    async fn create(&self, new: NewUser) -> Result<User> {
        User::create(&self.pool, new).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        User::find_by_id(&self.pool, id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        User::find_by_email(&self.pool, email).await
    }

    async fn list(&self) -> Result<Vec<User>> {
        User::list(&self.pool).await
    }

    async fn verify_email(&self, token: &str) -> Result<Option<User>> {
        User::verify_email(&self.pool, token).await
    }

    async fn set_reset_token(&self, id: Uuid, token: &str, expires: DateTime<Utc>) -> Result<()> {
        User::set_reset_token(&self.pool, id, token, expires).await
    }

    async fn reset_password(&self, token: &str, password_hash: &str) -> Result<Option<User>> {
        User::reset_password(&self.pool, token, password_hash).await
    }

    async fn save(&self, user: &User) -> Result<User> {
        user.save(&self.pool).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        User::delete(&self.pool, id).await
    }
}

#[async_trait::async_trait]
impl NotificationRepository for PostgresStore {
    async fn insert(&self, notification: Notification) -> Result<Notification> {
        notification.insert(&self.pool).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>> {
        Notification::find_by_id(&self.pool, id).await
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        Notification::list_by_user(&self.pool, user_id).await
    }

    async fn mark_read(&self, id: Uuid) -> Result<Option<Notification>> {
        Notification::mark_read(&self.pool, id).await
    }
}
