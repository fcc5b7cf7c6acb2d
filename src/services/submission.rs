use crate::error::{AppError, AppResult};
use crate::models::{
    Actor, CreateSubmissionRequest, NewProduct, NewTransaction, Product, ProductFilter,
    ProductListQuery, ProductStatus, Transaction, TransactionKind, TransactionStatus,
    UpdateSubmissionRequest, User,
};
use crate::repositories::{ProductRepository, TransactionRepository, UserRepository};
use crate::services::email::EmailService;
use crate::services::notification::{NotificationService, SubmissionEvent};
use crate::services::payment::PaymentService;
use crate::services::payment_gateway::to_rupiah;
use bigdecimal::{BigDecimal, Zero};
use log::info;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct SubmissionCreated {
    pub product: Product,
    pub transaction: Option<Transaction>,
    pub payment_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl std::str::FromStr for Decision {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Decision::Approve),
            "reject" => Ok(Decision::Reject),
            _ => Err(AppError::validation("Status must be either approve or reject")),
        }
    }
}

pub fn submission_fee(price: &BigDecimal, percent: u32) -> BigDecimal {
    to_rupiah(&(price * BigDecimal::from(percent) / BigDecimal::from(100)))
}

#[derive(Clone)]
pub struct SubmissionService {
    products: Arc<dyn ProductRepository>,
    transactions: Arc<dyn TransactionRepository>,
    users: Arc<dyn UserRepository>,
    payments: Arc<PaymentService>,
    email: Arc<EmailService>,
    notifications: NotificationService,
    fee_percent: u32,
}

impl SubmissionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        products: Arc<dyn ProductRepository>,
        transactions: Arc<dyn TransactionRepository>,
        users: Arc<dyn UserRepository>,
        payments: Arc<PaymentService>,
        email: Arc<EmailService>,
        notifications: NotificationService,
        fee_percent: u32,
    ) -> Self {
        Self {
            products,
            transactions,
            users,
            payments,
            email,
            notifications,
            fee_percent,
        }
    }

    async fn ensure_name_free(&self, name: &str, except: Option<Uuid>) -> AppResult<()> {
        if let Some(existing) = self.products.find_by_name(name).await? {
            if Some(existing.id) != except {
                return Err(AppError::validation(format!("An event named {} already exists", name.trim())));
            }
        }
        Ok(())
    }

    async fn owner(&self, id: Uuid) -> AppResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    async fn find(&self, id: Uuid) -> AppResult<Product> {
        self.products
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Submission not found"))
    }

    fn ensure_owner(actor: Actor, product: &Product) -> AppResult<()> {
        if product.user_id != actor.id {
            return Err(AppError::forbidden("You can only manage your own submissions"));
        }
        Ok(())
    }

    pub async fn create(&self, actor: Actor, req: CreateSubmissionRequest) -> AppResult<SubmissionCreated> {
        req.validate().map_err(AppError::Validation)?;
        self.ensure_name_free(&req.name, None).await?;
        let user = self.owner(actor.id).await?;

        let created = if req.price.is_zero() {
            let product = self
                .products
                .create(NewProduct::from_request(req, user.id, ProductStatus::Pending, None))
                .await?;
            self.email.send_submission_received(&user, &product).await?;

            SubmissionCreated {
                product,
                transaction: None,
                payment_url: None,
            }
        } else {
            let order_id = TransactionKind::Submission.new_order_id();
            let product = self
                .products
                .create(NewProduct::from_request(
                    req,
                    user.id,
                    ProductStatus::Unpaid,
                    Some(order_id.clone()),
                ))
                .await?;

            let transaction = self
                .transactions
                .create(NewTransaction::new(
                    TransactionKind::Submission,
                    TransactionStatus::Pending,
                    order_id,
                    user.id,
                    product.id,
                    1,
                    submission_fee(&product.price, self.fee_percent),
                ))
                .await?;

            let payment_url = self
                .payments
                .request_payment_link(&user, &product, &transaction)
                .await?;

            SubmissionCreated {
                product,
                transaction: Some(transaction),
                payment_url: Some(payment_url),
            }
        };

        self.notifications
            .record_submission(user.id, SubmissionEvent::Created, &created.product)
            .await?;

        info!(
            "📝 Submission {} created by {} ({})",
            created.product.id, user.id, created.product.status
        );
        Ok(created)
    }

    pub async fn update(&self, actor: Actor, id: Uuid, req: UpdateSubmissionRequest) -> AppResult<Product> {
        let mut product = self.find(id).await?;
        Self::ensure_owner(actor, &product)?;

        if !product.status.is_editable() {
            return Err(AppError::validation(format!(
                "Submission can no longer be edited (status: {})",
                product.status
            )));
        }
        if let Some(name) = req.name.as_deref().filter(|n| !n.trim().is_empty()) {
            self.ensure_name_free(name, Some(product.id)).await?;
        }

        product.apply_update(req);
        if product.quantity < 1 {
            return Err(AppError::validation("quantity must be at least 1"));
        }

        let product = self.products.save(&product).await?;
        self.notifications
            .record_submission(actor.id, SubmissionEvent::Updated, &product)
            .await?;

        info!("✏️ Submission {} updated", product.id);
        Ok(product)
    }

    pub async fn decide(&self, id: Uuid, decision: Decision) -> AppResult<Product> {
        let mut product = self.find(id).await?;

        if product.status != ProductStatus::Pending {
            return Err(AppError::validation(format!(
                "Submission is not awaiting review (status: {})",
                product.status
            )));
        }

        let (status, event) = match decision {
            Decision::Approve => (ProductStatus::Accepted, SubmissionEvent::Accepted),
            Decision::Reject => (ProductStatus::Rejected, SubmissionEvent::Rejected),
        };
        product.status = status;
        let product = self.products.save(&product).await?;

        let owner = self.owner(product.user_id).await?;
        self.email
            .send_submission_decision(&owner, &product, decision == Decision::Approve)
            .await?;
        self.notifications
            .record_submission(owner.id, event, &product)
            .await?;

        info!("⚖️ Submission {} is now {}", product.id, product.status);
        Ok(product)
    }

    pub async fn cancel(&self, actor: Actor, id: Uuid) -> AppResult<()> {
        let product = self.find(id).await?;
        Self::ensure_owner(actor, &product)?;

        if product.status != ProductStatus::Pending {
            return Err(AppError::validation(format!(
                "Only pending submissions can be cancelled (status: {})",
                product.status
            )));
        }

        self.products.delete(product.id).await?;
        self.notifications
            .record_submission(actor.id, SubmissionEvent::Cancelled, &product)
            .await?;

        info!("🗑️ Submission {} cancelled", product.id);
        Ok(())
    }

    pub async fn list(&self, query: ProductListQuery) -> AppResult<Vec<Product>> {
        Ok(self.products.search(&ProductFilter::from_query(query)).await?)
    }

    pub async fn list_for_user(&self, actor: Actor, query: ProductListQuery) -> AppResult<Vec<Product>> {
        let filter = ProductFilter::from_query(query).owned_by(actor.id);
        Ok(self.products.search(&filter).await?)
    }

    pub async fn get(&self, actor: Actor, id: Uuid) -> AppResult<Product> {
        let product = self.find(id).await?;
        if !actor.can_access(product.user_id) {
            return Err(AppError::forbidden("You can only view your own submissions"));
        }
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionListQuery;
    use crate::services::payment_gateway::to_gross_amount;
    use crate::services::testing::{submission_request, Harness};

    #[test]
    fn fee_is_a_share_of_price() {
        assert_eq!(submission_fee(&BigDecimal::from(100000), 25), BigDecimal::from(25000));
        // 24999.75 is charged as whole rupiah, so the stored fee matches the gateway amount.
        let fee = submission_fee(&BigDecimal::from(99999), 25);
        assert_eq!(fee, BigDecimal::from(25000));
        assert_eq!(to_gross_amount(&fee).unwrap(), 25000);
    }

    #[test]
    fn decision_parses_path_values() {
        assert_eq!("approve".parse::<Decision>().unwrap(), Decision::Approve);
        assert_eq!("reject".parse::<Decision>().unwrap(), Decision::Reject);
        assert!("accepted".parse::<Decision>().is_err());
    }

    #[tokio::test]
    async fn free_submission_is_pending_without_transaction() {
        let h = Harness::new().await;
        let seller = h.user("seller@example.com").await;

        let created = h
            .state
            .submissions
            .create(seller.actor(), submission_request("Workshop A", 0))
            .await
            .unwrap();

        assert_eq!(created.product.status, ProductStatus::Pending);
        assert!(created.transaction.is_none());
        assert!(h
            .repos
            .transactions
            .list(None, &TransactionListQuery::default())
            .await
            .unwrap()
            .is_empty());
        assert_eq!(h.repos.notifications.list_by_user(seller.id).await.unwrap().len(), 1);
        assert_eq!(h.mailer.subjects().await, vec!["FastTix : Submission Event!".to_string()]);
    }

    #[tokio::test]
    async fn paid_submission_opens_fee_transaction() {
        let h = Harness::new().await;
        let seller = h.user("seller@example.com").await;

        let created = h
            .state
            .submissions
            .create(seller.actor(), submission_request("Jazz Night", 100000))
            .await
            .unwrap();

        assert_eq!(created.product.status, ProductStatus::Unpaid);
        let tx = created.transaction.unwrap();
        assert_eq!(tx.amount, BigDecimal::from(25000));
        assert_eq!(tx.kind, TransactionKind::Submission);
        assert!(tx.order_id.starts_with("daftar_id-"));
        assert_eq!(created.product.order_id.as_deref(), Some(tx.order_id.as_str()));
        assert_eq!(created.payment_url.as_deref(), Some(h.gateway.url_for(&tx.order_id).as_str()));
        assert_eq!(h.gateway.requests().await[0].gross_amount, 25000);
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let h = Harness::new().await;
        let seller = h.user("seller@example.com").await;
        h.state
            .submissions
            .create(seller.actor(), submission_request("Workshop A", 0))
            .await
            .unwrap();

        let err = h
            .state
            .submissions
            .create(seller.actor(), submission_request("workshop a", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn approval_requires_pending() {
        let h = Harness::new().await;
        let seller = h.user("seller@example.com").await;

        let unpaid = h
            .state
            .submissions
            .create(seller.actor(), submission_request("Paid Gig", 100000))
            .await
            .unwrap()
            .product;
        assert!(matches!(
            h.state.submissions.decide(unpaid.id, Decision::Approve).await,
            Err(AppError::Validation(_))
        ));

        let free = h
            .state
            .submissions
            .create(seller.actor(), submission_request("Free Gig", 0))
            .await
            .unwrap()
            .product;
        let accepted = h.state.submissions.decide(free.id, Decision::Approve).await.unwrap();
        assert_eq!(accepted.status, ProductStatus::Accepted);
        assert!(matches!(
            h.state.submissions.decide(free.id, Decision::Reject).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn owner_edits_only_while_editable() {
        let h = Harness::new().await;
        let seller = h.user("seller@example.com").await;
        let stranger = h.user("stranger@example.com").await;
        let product = h
            .state
            .submissions
            .create(seller.actor(), submission_request("Workshop B", 0))
            .await
            .unwrap()
            .product;

        let edit = UpdateSubmissionRequest {
            description: Some("Updated".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            h.state.submissions.update(stranger.actor(), product.id, edit.clone()).await,
            Err(AppError::Forbidden(_))
        ));
        let updated = h
            .state
            .submissions
            .update(seller.actor(), product.id, edit.clone())
            .await
            .unwrap();
        assert_eq!(updated.description, "Updated");

        h.state.submissions.decide(product.id, Decision::Reject).await.unwrap();
        assert!(matches!(
            h.state.submissions.update(seller.actor(), product.id, edit).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn cancel_only_while_pending() {
        let h = Harness::new().await;
        let seller = h.user("seller@example.com").await;

        let keep = h
            .state
            .submissions
            .create(seller.actor(), submission_request("Keep Me", 0))
            .await
            .unwrap()
            .product;
        h.state.submissions.decide(keep.id, Decision::Approve).await.unwrap();
        assert!(matches!(
            h.state.submissions.cancel(seller.actor(), keep.id).await,
            Err(AppError::Validation(_))
        ));

        let drop = h
            .state
            .submissions
            .create(seller.actor(), submission_request("Drop Me", 0))
            .await
            .unwrap()
            .product;
        h.state.submissions.cancel(seller.actor(), drop.id).await.unwrap();
        assert!(h.repos.products.find_by_id(drop.id).await.unwrap().is_none());
    }
}
