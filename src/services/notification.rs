use crate::error::{AppError, AppResult};
use crate::models::{Actor, Notification, Product, Transaction};
use crate::repositories::NotificationRepository;
use log::debug;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionEvent {
    Created,
    Updated,
    Accepted,
    Rejected,
    Cancelled,
}

impl SubmissionEvent {
    fn message(&self, product_name: &str) -> String {
        match self {
            SubmissionEvent::Created => format!("You submitted the event {} for review", product_name),
            SubmissionEvent::Updated => format!("You updated the event submission {}", product_name),
            SubmissionEvent::Accepted => format!("Your event submission {} was accepted by an administrator", product_name),
            SubmissionEvent::Rejected => format!("Your event submission {} was rejected by an administrator", product_name),
            SubmissionEvent::Cancelled => format!("You cancelled the event submission {}", product_name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionEvent {
    Checkout,
    Payment,
}

impl TransactionEvent {
    fn message(&self, product_name: &str, order_id: &str) -> String {
        match self {
            TransactionEvent::Checkout => format!("You checked out tickets for {} with order {}", product_name, order_id),
            TransactionEvent::Payment => format!("Your payment for order {} was received", order_id),
        }
    }
}

#[derive(Clone)]
pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>) -> Self {
        Self { repo }
    }

    pub async fn record_submission(&self, user_id: Uuid, event: SubmissionEvent, product: &Product) -> AppResult<Notification> {
        self.insert(user_id, event.message(&product.name)).await
    }

    pub async fn record_transaction(
        &self,
        user_id: Uuid,
        event: TransactionEvent,
        product: &Product,
        transaction: &Transaction,
    ) -> AppResult<Notification> {
        self.insert(user_id, event.message(&product.name, &transaction.order_id)).await
    }

    async fn insert(&self, user_id: Uuid, message: String) -> AppResult<Notification> {
        let notification = self.repo.insert(Notification::new(user_id, message)).await?;
        debug!("🔔 Notification {} recorded for {}", notification.id, user_id);
        Ok(notification)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Notification>> {
        Ok(self.repo.list_by_user(user_id).await?)
    }

    pub async fn get_for_user(&self, actor: Actor, id: Uuid) -> AppResult<Notification> {
        self.repo
            .find_by_id(id)
            .await?
            .filter(|n| n.user_id == actor.id)
            .ok_or_else(|| AppError::not_found("Notification not found"))
    }

    pub async fn mark_read(&self, actor: Actor, id: Uuid) -> AppResult<Notification> {
        self.get_for_user(actor, id).await?;
        self.repo
            .mark_read(id)
            .await?
            .ok_or_else(|| AppError::not_found("Notification not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::repositories::InMemoryStore;

    #[tokio::test]
    async fn only_owner_can_read_and_mark() {
        let svc = NotificationService::new(Arc::new(InMemoryStore::default()));
        let owner = Actor { id: Uuid::new_v4(), role: Role::User };
        let other = Actor { id: Uuid::new_v4(), role: Role::User };

        let n = svc.insert(owner.id, "hello".to_string()).await.unwrap();

        assert!(matches!(svc.get_for_user(other, n.id).await, Err(AppError::NotFound(_))));
        assert!(svc.mark_read(other, n.id).await.is_err());

        let read = svc.mark_read(owner, n.id).await.unwrap();
        assert!(read.is_read);
        assert_eq!(svc.list_for_user(owner.id).await.unwrap().len(), 1);
        assert!(svc.list_for_user(other.id).await.unwrap().is_empty());
    }

    #[test]
    fn messages_name_the_event() {
        assert!(SubmissionEvent::Accepted.message("Jazz Night").contains("accepted"));
        assert!(TransactionEvent::Checkout
            .message("Jazz Night", "order_id-abc")
            .contains("order_id-abc"));
    }
}
