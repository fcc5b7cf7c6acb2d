use crate::error::{AppError, AppResult};
use crate::models::{
    Actor, CheckoutRequest, NewTransaction, Product, ProductFilter, ProductListQuery,
    ProductStatus, Transaction, TransactionKind, TransactionStatus,
};
use crate::repositories::{ProductRepository, TransactionRepository, UserRepository};
use crate::services::notification::{NotificationService, TransactionEvent};
use crate::services::payment::PaymentService;
use crate::services::payment_gateway::to_rupiah;
use crate::services::qr::QrService;
use bigdecimal::BigDecimal;
use log::info;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub transaction: Transaction,
    pub payment_url: Option<String>,
    /// Present once the ticket is paid (free events).
    pub qr_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckInResult {
    pub order_id: String,
    pub event: String,
    pub quantity: i32,
    pub checked_in: bool,
}

#[derive(Clone)]
pub struct TicketService {
    products: Arc<dyn ProductRepository>,
    transactions: Arc<dyn TransactionRepository>,
    users: Arc<dyn UserRepository>,
    payments: Arc<PaymentService>,
    notifications: NotificationService,
    qr: QrService,
}

impl TicketService {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        transactions: Arc<dyn TransactionRepository>,
        users: Arc<dyn UserRepository>,
        payments: Arc<PaymentService>,
        notifications: NotificationService,
        qr: QrService,
    ) -> Self {
        Self {
            products,
            transactions,
            users,
            payments,
            notifications,
            qr,
        }
    }

    /// Events currently on sale.
    pub async fn list(&self, query: ProductListQuery) -> AppResult<Vec<Product>> {
        let filter = ProductFilter::from_query(query).with_statuses(&[ProductStatus::Accepted]);
        Ok(self.products.search(&filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Product> {
        self.products
            .find_by_id(id)
            .await?
            .filter(|p| p.status == ProductStatus::Accepted)
            .ok_or_else(|| AppError::not_found("Event not found"))
    }

    pub async fn checkout(&self, actor: Actor, product_id: Uuid, req: CheckoutRequest) -> AppResult<CheckoutResponse> {
        let product = self
            .products
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Event not found"))?;

        if product.status != ProductStatus::Accepted {
            return Err(AppError::validation("Tickets for this event are not on sale"));
        }

        let quantity = req.quantity.unwrap_or(1);
        if quantity < 1 {
            return Err(AppError::validation("quantity must be at least 1"));
        }
        if quantity > product.quantity {
            return Err(AppError::validation(format!(
                "Only {} tickets left for {}",
                product.quantity, product.name
            )));
        }

        let user = self
            .users
            .find_by_id(actor.id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let free = product.is_free();
        let amount = to_rupiah(&(&product.price * BigDecimal::from(quantity)));
        let status = if free {
            TransactionStatus::Success
        } else {
            TransactionStatus::Pending
        };

        let transaction = self
            .transactions
            .create(NewTransaction::new(
                TransactionKind::Purchase,
                status,
                TransactionKind::Purchase.new_order_id(),
                user.id,
                product.id,
                quantity,
                amount,
            ))
            .await?;

        let (payment_url, qr_code) = if free {
            self.payments
                .fulfil_purchase(&user, &product, &transaction)
                .await?;
            (None, Some(self.qr.data_uri(&transaction.order_id)?))
        } else {
            let url = self
                .payments
                .request_payment_link(&user, &product, &transaction)
                .await?;
            (Some(url), None)
        };

        self.notifications
            .record_transaction(user.id, TransactionEvent::Checkout, &product, &transaction)
            .await?;

        info!(
            "🎫 {} checked out {} x {} ({})",
            user.id, quantity, product.name, transaction.order_id
        );
        Ok(CheckoutResponse {
            transaction,
            payment_url,
            qr_code,
        })
    }

    /// Redeems a ticket at the door. Each paid order checks in once.
    pub async fn check_in(&self, order_id: &str) -> AppResult<CheckInResult> {
        if TransactionKind::from_order_id(order_id) != Some(TransactionKind::Purchase) {
            return Err(AppError::validation("Not a ticket order"));
        }

        let transaction = self
            .transactions
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Ticket not found"))?;

        if transaction.status != TransactionStatus::Success {
            return Err(AppError::validation("Ticket has not been paid"));
        }
        if transaction.checked_in {
            return Err(AppError::validation("Ticket already used"));
        }

        let transaction = self
            .transactions
            .mark_checked_in(transaction.id)
            .await?
            .ok_or_else(|| AppError::validation("Ticket already used"))?;

        let event = self
            .products
            .find_by_id(transaction.product_id)
            .await?
            .map(|p| p.name)
            .unwrap_or_default();

        info!("🚪 {} checked in", transaction.order_id);
        Ok(CheckInResult {
            order_id: transaction.order_id,
            event,
            quantity: transaction.quantity,
            checked_in: transaction.checked_in,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::Harness;

    #[tokio::test]
    async fn free_checkout_is_paid_immediately() {
        let h = Harness::new().await;
        let product = h.accepted_product(BigDecimal::from(0), 5).await;
        let buyer = h.user("buyer@example.com").await;

        let resp = h
            .state
            .tickets
            .checkout(buyer.actor(), product.id, CheckoutRequest { quantity: Some(2) })
            .await
            .unwrap();

        assert_eq!(resp.transaction.status, TransactionStatus::Success);
        assert!(resp.payment_url.is_none());
        assert!(resp.qr_code.is_some());
        let product = h.repos.products.find_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(product.quantity, 3);
    }

    #[tokio::test]
    async fn paid_checkout_waits_for_confirmation() {
        let h = Harness::new().await;
        let product = h.accepted_product(BigDecimal::from(75000), 5).await;
        let buyer = h.user("buyer@example.com").await;

        let resp = h
            .state
            .tickets
            .checkout(buyer.actor(), product.id, CheckoutRequest { quantity: Some(2) })
            .await
            .unwrap();

        assert_eq!(resp.transaction.status, TransactionStatus::Pending);
        assert_eq!(resp.transaction.amount, BigDecimal::from(150000));
        assert!(resp.transaction.order_id.starts_with("order_id-"));
        assert!(resp.payment_url.is_some());
        let product = h.repos.products.find_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(product.quantity, 5);
    }

    #[tokio::test]
    async fn rejects_more_than_inventory() {
        let h = Harness::new().await;
        let product = h.accepted_product(BigDecimal::from(75000), 2).await;
        let buyer = h.user("buyer@example.com").await;

        let err = h
            .state
            .tickets
            .checkout(buyer.actor(), product.id, CheckoutRequest { quantity: Some(3) })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn check_in_once() {
        let h = Harness::new().await;
        let product = h.accepted_product(BigDecimal::from(0), 5).await;
        let buyer = h.user("buyer@example.com").await;
        let order_id = h
            .state
            .tickets
            .checkout(buyer.actor(), product.id, CheckoutRequest::default())
            .await
            .unwrap()
            .transaction
            .order_id;

        let first = h.state.tickets.check_in(&order_id).await.unwrap();
        assert!(first.checked_in);
        assert!(matches!(
            h.state.tickets.check_in(&order_id).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            h.state.tickets.check_in("daftar_id-AAAAAAAAAA").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn unpaid_ticket_cannot_check_in() {
        let h = Harness::new().await;
        let (_, tx) = h.pending_purchase(BigDecimal::from(50000), 1).await;
        assert!(matches!(
            h.state.tickets.check_in(&tx.order_id).await,
            Err(AppError::Validation(_))
        ));
    }
}
