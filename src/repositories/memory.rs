use super::{NotificationRepository, ProductRepository, TransactionRepository, UserRepository};
use crate::models::{
    NewProduct, NewTransaction, NewUser, Notification, Product, ProductFilter, Transaction,
    TransactionListQuery, TransactionStatus, User,
};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local store with the same observable behaviour as the Postgres
/// tables, including the unique order id and email constraints.
#[derive(Default)]
pub struct InMemoryStore {
    products: RwLock<HashMap<Uuid, Product>>,
    transactions: RwLock<HashMap<Uuid, Transaction>>,
    users: RwLock<HashMap<Uuid, User>>,
    notifications: RwLock<HashMap<Uuid, Notification>>,
}

fn paginate<T>(items: Vec<T>, offset: i64, limit: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryStore {
    async fn create(&self, new: NewProduct) -> Result<Product> {
        let product = new.into_product(Uuid::new_v4(), Utc::now());
        self.products.write().await.insert(product.id, product.clone());
        Ok(product)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Product>> {
        let name = name.trim().to_lowercase();
        Ok(self
            .products
            .read()
            .await
            .values()
            .find(|p| p.name.to_lowercase() == name)
            .cloned())
    }

    async fn search(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let mut matched: Vec<Product> = self
            .products
            .read()
            .await
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        matched.sort_by(|a, b| filter.compare(a, b));
        Ok(paginate(matched, filter.offset, filter.limit))
    }

    async fn save(&self, product: &Product) -> Result<Product> {
        let mut products = self.products.write().await;
        let Some(stored) = products.get_mut(&product.id) else {
            bail!("product {} does not exist", product.id);
        };
        *stored = product.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.products.write().await.remove(&id).is_some())
    }

    async fn consume_inventory(&self, id: Uuid, quantity: i32) -> Result<Option<Product>> {
        let mut products = self.products.write().await;
        Ok(products.get_mut(&id).map(|p| {
            p.quantity = (p.quantity - quantity).max(0);
            p.sold += quantity;
            p.updated_at = Utc::now();
            p.clone()
        }))
    }
}

#[async_trait::async_trait]
impl TransactionRepository for InMemoryStore {
    async fn create(&self, new: NewTransaction) -> Result<Transaction> {
        let mut transactions = self.transactions.write().await;
        if transactions.values().any(|t| t.order_id == new.order_id) {
            bail!("duplicate order id {}", new.order_id);
        }
        let tx = new.into_transaction(Uuid::new_v4(), Utc::now());
        transactions.insert(tx.id, tx.clone());
        Ok(tx)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>> {
        Ok(self.transactions.read().await.get(&id).cloned())
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Transaction>> {
        Ok(self
            .transactions
            .read()
            .await
            .values()
            .find(|t| t.order_id == order_id)
            .cloned())
    }

    async fn find_by_verification_token(&self, token: &str) -> Result<Option<Transaction>> {
        Ok(self
            .transactions
            .read()
            .await
            .values()
            .filter(|t| t.verification_token == token)
            .max_by_key(|t| t.created_at)
            .cloned())
    }

    async fn list(&self, user_id: Option<Uuid>, query: &TransactionListQuery) -> Result<Vec<Transaction>> {
        let mut matched: Vec<Transaction> = self
            .transactions
            .read()
            .await
            .values()
            .filter(|t| user_id.map_or(true, |u| t.user_id == u) && query.matches(t))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(matched, query.offset(), query.limit()))
    }

    async fn update_status(&self, id: Uuid, status: TransactionStatus) -> Result<Option<Transaction>> {
        let mut transactions = self.transactions.write().await;
        Ok(transactions.get_mut(&id).map(|t| {
            t.status = status;
            t.updated_at = Utc::now();
            t.clone()
        }))
    }

    async fn mark_checked_in(&self, id: Uuid) -> Result<Option<Transaction>> {
        let mut transactions = self.transactions.write().await;
        Ok(transactions
            .get_mut(&id)
            .filter(|t| t.status == TransactionStatus::Success && !t.checked_in)
            .map(|t| {
                t.checked_in = true;
                t.updated_at = Utc::now();
                t.clone()
            }))
    }
}

#[async_trait::async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, new: NewUser) -> Result<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email.eq_ignore_ascii_case(&new.email)) {
            bail!("duplicate email {}", new.email);
        }
        let user = new.into_user(Uuid::new_v4(), Utc::now());
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn verify_email(&self, token: &str) -> Result<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users
            .values_mut()
            .find(|u| u.verification_token.as_deref() == Some(token))
            .map(|u| {
                u.email_verified = true;
                u.verification_token = None;
                u.updated_at = Utc::now();
                u.clone()
            }))
    }

    async fn set_reset_token(&self, id: Uuid, token: &str, expires: DateTime<Utc>) -> Result<()> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.reset_token = Some(token.to_string());
            user.reset_token_expires = Some(expires);
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn reset_password(&self, token: &str, password_hash: &str) -> Result<Option<User>> {
        let now = Utc::now();
        let mut users = self.users.write().await;
        Ok(users
            .values_mut()
            .find(|u| u.reset_token_valid(token, now))
            .map(|u| {
                u.password_hash = password_hash.to_string();
                u.reset_token = None;
                u.reset_token_expires = None;
                u.updated_at = now;
                u.clone()
            }))
    }

    async fn save(&self, user: &User) -> Result<User> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.id != user.id && u.email.eq_ignore_ascii_case(&user.email))
        {
            bail!("duplicate email {}", user.email);
        }
        let Some(stored) = users.get_mut(&user.id) else {
            bail!("user {} does not exist", user.id);
        };
        *stored = user.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.users.write().await.remove(&id).is_some())
    }
}

#[async_trait::async_trait]
impl NotificationRepository for InMemoryStore {
    async fn insert(&self, notification: Notification) -> Result<Notification> {
        self.notifications
            .write()
            .await
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>> {
        Ok(self.notifications.read().await.get(&id).cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        let mut items: Vec<Notification> = self
            .notifications
            .read()
            .await
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn mark_read(&self, id: Uuid) -> Result<Option<Notification>> {
        let mut notifications = self.notifications.write().await;
        Ok(notifications.get_mut(&id).map(|n| {
            n.is_read = true;
            n.updated_at = Utc::now();
            n.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{
        NewTransaction, TransactionKind, TransactionListQuery, TransactionStatus,
    };
    use crate::repositories::Repositories;
    use bigdecimal::BigDecimal;
    use uuid::Uuid;

    fn purchase(order_id: &str) -> NewTransaction {
        NewTransaction::new(
            TransactionKind::Purchase,
            TransactionStatus::Pending,
            order_id.to_string(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            1,
            BigDecimal::from(10000),
        )
    }

    #[tokio::test]
    async fn rejects_duplicate_order_ids() {
        let repos = Repositories::in_memory();
        repos.transactions.create(purchase("order_id-AAAAAAAAAA")).await.unwrap();
        assert!(repos.transactions.create(purchase("order_id-AAAAAAAAAA")).await.is_err());
    }

    #[tokio::test]
    async fn check_in_requires_success_and_happens_once() {
        let repos = Repositories::in_memory();
        let tx = repos.transactions.create(purchase("order_id-BBBBBBBBBB")).await.unwrap();

        assert!(repos.transactions.mark_checked_in(tx.id).await.unwrap().is_none());

        repos
            .transactions
            .update_status(tx.id, TransactionStatus::Success)
            .await
            .unwrap();
        let checked = repos.transactions.mark_checked_in(tx.id).await.unwrap().unwrap();
        assert!(checked.checked_in);
        assert!(repos.transactions.mark_checked_in(tx.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lists_newest_first_per_user() {
        let repos = Repositories::in_memory();
        let mut first = purchase("order_id-CCCCCCCCCC");
        let owner = first.user_id;
        repos.transactions.create(first.clone()).await.unwrap();
        first.order_id = "order_id-DDDDDDDDDD".to_string();
        repos.transactions.create(first).await.unwrap();
        repos.transactions.create(purchase("order_id-EEEEEEEEEE")).await.unwrap();

        let mine = repos
            .transactions
            .list(Some(owner), &TransactionListQuery::default())
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine[0].created_at >= mine[1].created_at);

        let all = repos
            .transactions
            .list(None, &TransactionListQuery::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }
}
