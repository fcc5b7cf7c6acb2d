use crate::config::{MidtransConfig, WebhookPolicy};
use crate::error::{AppError, AppResult};
use crate::models::{
    Actor, Product, ProductStatus, Transaction, TransactionKind, TransactionStatus, User,
};
use crate::repositories::{ProductRepository, TransactionRepository, UserRepository};
use crate::services::email::EmailService;
use crate::services::notification::{NotificationService, TransactionEvent};
use crate::services::payment_gateway::{to_gross_amount, PaymentGateway, PaymentLinkRequest};
use crate::services::qr::QrService;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::sync::Arc;
use uuid::Uuid;

/// Payment notification body posted by Midtrans. Only the fields the
/// reconciliation reads are typed; the rest of the payload is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MidtransNotification {
    pub order_id: String,
    pub transaction_status: String,
    pub status_code: Option<String>,
    pub gross_amount: Option<String>,
    pub signature_key: Option<String>,
    pub fraud_status: Option<String>,
    pub payment_type: Option<String>,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStatus {
    Paid,
    Failed,
    Unchanged,
}

impl GatewayStatus {
    pub fn from_midtrans(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "capture" | "settlement" | "success" => GatewayStatus::Paid,
            "deny" | "cancel" | "expire" | "failure" => GatewayStatus::Failed,
            _ => GatewayStatus::Unchanged,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookOutcome {
    Paid,
    Failed,
    Ignored,
    Duplicate,
}

impl WebhookOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            WebhookOutcome::Paid => "Payment confirmed",
            WebhookOutcome::Failed => "Payment marked as failed",
            WebhookOutcome::Ignored => "Notification acknowledged",
            WebhookOutcome::Duplicate => "Notification already processed",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckoutLink {
    pub transaction: Transaction,
    pub payment_url: String,
}

pub fn midtrans_signature(order_id: &str, status_code: &str, gross_amount: &str, server_key: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Everything between "a transaction exists" and "the buyer holds a paid
/// ticket": gateway links, webhook reconciliation, manual confirmation.
#[derive(Clone)]
pub struct PaymentService {
    products: Arc<dyn ProductRepository>,
    transactions: Arc<dyn TransactionRepository>,
    users: Arc<dyn UserRepository>,
    gateway: Arc<dyn PaymentGateway>,
    email: Arc<EmailService>,
    notifications: NotificationService,
    qr: QrService,
    server_key: String,
    verify_signature: bool,
    policy: WebhookPolicy,
}

impl PaymentService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        products: Arc<dyn ProductRepository>,
        transactions: Arc<dyn TransactionRepository>,
        users: Arc<dyn UserRepository>,
        gateway: Arc<dyn PaymentGateway>,
        email: Arc<EmailService>,
        notifications: NotificationService,
        qr: QrService,
        config: &MidtransConfig,
    ) -> Self {
        Self {
            products,
            transactions,
            users,
            gateway,
            email,
            notifications,
            qr,
            server_key: config.server_key.clone(),
            verify_signature: config.verify_signature,
            policy: config.webhook_policy,
        }
    }

    fn item_name(kind: TransactionKind, product: &Product) -> String {
        match kind {
            TransactionKind::Submission => format!("Submission fee: {}", product.name),
            TransactionKind::Purchase => product.name.clone(),
        }
    }

    /// Opens a Snap page for `transaction` and emails the link to `user`.
    pub async fn request_payment_link(&self, user: &User, product: &Product, transaction: &Transaction) -> AppResult<String> {
        let item_name = Self::item_name(transaction.kind, product);
        let request = PaymentLinkRequest {
            order_id: transaction.order_id.clone(),
            gross_amount: to_gross_amount(&transaction.amount)?,
            customer_name: user.full_name.clone(),
            customer_email: user.email.clone(),
        };

        let url = self.gateway.create_payment_link(request).await.map_err(|e| {
            error!("❌ Payment link for {} failed: {:#}", transaction.order_id, e);
            AppError::external(format!("payment gateway error: {}", e))
        })?;
        info!(
            "🔗 Payment link for {} opened via {}",
            transaction.order_id,
            self.gateway.gateway_name()
        );

        self.email
            .send_payment_link(user, &item_name, transaction, &url)
            .await?;

        Ok(url)
    }

    pub async fn reissue_checkout_link(&self, actor: Actor, token: &str) -> AppResult<CheckoutLink> {
        let transaction = self
            .transactions
            .find_by_verification_token(token)
            .await?
            .ok_or_else(|| AppError::not_found("Transaction not found"))?;

        if transaction.user_id != actor.id {
            return Err(AppError::forbidden("This transaction belongs to another user"));
        }
        if transaction.status != TransactionStatus::Pending {
            return Err(AppError::validation("Transaction is no longer awaiting payment"));
        }

        let product = self.product(transaction.product_id).await?;
        let user = self.user(transaction.user_id).await?;
        let payment_url = self.request_payment_link(&user, &product, &transaction).await?;

        info!("🔁 Checkout link re-issued for {}", transaction.order_id);
        Ok(CheckoutLink {
            transaction,
            payment_url,
        })
    }

    fn check_signature(&self, notification: &MidtransNotification) -> AppResult<()> {
        if !self.verify_signature {
            return Ok(());
        }

        let (Some(status_code), Some(gross_amount), Some(signature)) = (
            notification.status_code.as_deref(),
            notification.gross_amount.as_deref(),
            notification.signature_key.as_deref(),
        ) else {
            warn!("⚠️ Webhook for {} missing signature fields", notification.order_id);
            return Err(AppError::unauthorized("Missing notification signature"));
        };

        let expected = midtrans_signature(&notification.order_id, status_code, gross_amount, &self.server_key);
        if !expected.eq_ignore_ascii_case(signature) {
            warn!("⚠️ Webhook for {} has an invalid signature", notification.order_id);
            return Err(AppError::unauthorized("Invalid notification signature"));
        }

        Ok(())
    }

    pub async fn handle_notification(&self, notification: MidtransNotification) -> AppResult<WebhookOutcome> {
        info!(
            "📬 Midtrans notification: order={} status={} type={}",
            notification.order_id,
            notification.transaction_status,
            notification.payment_type.as_deref().unwrap_or("-")
        );

        self.check_signature(&notification)?;

        if TransactionKind::from_order_id(&notification.order_id).is_none() {
            return Err(AppError::validation(format!(
                "Unrecognised order id: {}",
                notification.order_id
            )));
        }

        let transaction = self
            .transactions
            .find_by_order_id(&notification.order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Transaction not found"))?;

        let status = GatewayStatus::from_midtrans(&notification.transaction_status);
        if status == GatewayStatus::Unchanged {
            return Ok(WebhookOutcome::Ignored);
        }

        if transaction.status.is_settled() && self.policy == WebhookPolicy::Dedupe {
            info!("⏭️ {} already {}, skipping", transaction.order_id, transaction.status);
            return Ok(WebhookOutcome::Duplicate);
        }

        match status {
            GatewayStatus::Paid => {
                if transaction.status == TransactionStatus::Failed {
                    warn!("⚠️ Ignoring payment for already failed order {}", transaction.order_id);
                    return Ok(WebhookOutcome::Duplicate);
                }
                self.apply_paid(transaction).await?;
                Ok(WebhookOutcome::Paid)
            }
            GatewayStatus::Failed => {
                if transaction.status == TransactionStatus::Success {
                    warn!("⚠️ Ignoring failure for already paid order {}", transaction.order_id);
                    return Ok(WebhookOutcome::Duplicate);
                }
                self.transactions
                    .update_status(transaction.id, TransactionStatus::Failed)
                    .await?;
                info!("💥 Payment for {} failed", transaction.order_id);
                Ok(WebhookOutcome::Failed)
            }
            GatewayStatus::Unchanged => Ok(WebhookOutcome::Ignored),
        }
    }

    /// Administrator override for payments settled outside the gateway.
    pub async fn confirm_payment(&self, transaction_id: Uuid) -> AppResult<Transaction> {
        let transaction = self
            .transactions
            .find_by_id(transaction_id)
            .await?
            .ok_or_else(|| AppError::not_found("Transaction not found"))?;

        if transaction.status != TransactionStatus::Pending {
            return Err(AppError::validation(format!(
                "Transaction is already {}",
                transaction.status
            )));
        }

        self.apply_paid(transaction).await
    }

    /// Seats are only taken on the pending to success transition; a
    /// re-delivered payment repeats the emails and the notification.
    async fn apply_paid(&self, transaction: Transaction) -> AppResult<Transaction> {
        let first_settlement = transaction.status == TransactionStatus::Pending;
        let transaction = self
            .transactions
            .update_status(transaction.id, TransactionStatus::Success)
            .await?
            .ok_or_else(|| AppError::not_found("Transaction not found"))?;

        let product = self.product(transaction.product_id).await?;
        let user = self.user(transaction.user_id).await?;

        match transaction.kind {
            TransactionKind::Submission => {
                if product.status == ProductStatus::Unpaid {
                    let mut product = product.clone();
                    product.status = ProductStatus::Pending;
                    self.products.save(&product).await?;
                }
                self.email.send_submission_received(&user, &product).await?;
            }
            TransactionKind::Purchase => {
                self.email
                    .send_payment_success(&user, &product, &transaction)
                    .await?;
                if first_settlement {
                    self.fulfil_purchase(&user, &product, &transaction).await?;
                } else {
                    self.send_ticket(&user, &product, &transaction).await?;
                }
            }
        }

        self.notifications
            .record_transaction(user.id, TransactionEvent::Payment, &product, &transaction)
            .await?;

        info!("✅ {} settled ({})", transaction.order_id, transaction.kind.as_str());
        Ok(transaction)
    }

    /// Takes the seats out of inventory and mails the ticket with its QR code.
    pub async fn fulfil_purchase(&self, user: &User, product: &Product, transaction: &Transaction) -> AppResult<Product> {
        if transaction.quantity > product.quantity {
            warn!(
                "⚠️ Oversell on {}: {} requested, {} left",
                product.id, transaction.quantity, product.quantity
            );
        }

        let updated = self
            .products
            .consume_inventory(product.id, transaction.quantity)
            .await?
            .ok_or_else(|| AppError::not_found("Event not found"))?;

        self.send_ticket(user, &updated, transaction).await?;
        Ok(updated)
    }

    async fn send_ticket(&self, user: &User, product: &Product, transaction: &Transaction) -> AppResult<()> {
        let qr_png = self.qr.render_png(&transaction.order_id)?;
        self.email.send_ticket(user, product, transaction, qr_png).await
    }

    async fn product(&self, id: Uuid) -> AppResult<Product> {
        self.products
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Event not found"))
    }

    async fn user(&self, id: Uuid) -> AppResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{submission_request, Harness};
    use bigdecimal::BigDecimal;

    fn settlement(order_id: &str) -> MidtransNotification {
        MidtransNotification {
            order_id: order_id.to_string(),
            transaction_status: "settlement".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn maps_gateway_statuses() {
        for s in ["capture", "settlement", "success", "SETTLEMENT"] {
            assert_eq!(GatewayStatus::from_midtrans(s), GatewayStatus::Paid);
        }
        for s in ["deny", "cancel", "expire", "failure"] {
            assert_eq!(GatewayStatus::from_midtrans(s), GatewayStatus::Failed);
        }
        assert_eq!(GatewayStatus::from_midtrans("pending"), GatewayStatus::Unchanged);
    }

    #[test]
    fn signature_is_sha512_hex() {
        let sig = midtrans_signature("order_id-1", "200", "10000.00", "key");
        assert_eq!(sig.len(), 128);
        assert_eq!(sig, midtrans_signature("order_id-1", "200", "10000.00", "key"));
        assert_ne!(sig, midtrans_signature("order_id-1", "200", "10000.00", "other"));
    }

    #[tokio::test]
    async fn rejects_bad_signature_when_verifying() {
        let h = Harness::with_policy(WebhookPolicy::Reapply, true).await;
        let (_, tx) = h.pending_purchase(BigDecimal::from(50000), 2).await;

        let mut n = settlement(&tx.order_id);
        n.status_code = Some("200".to_string());
        n.gross_amount = Some("100000.00".to_string());
        n.signature_key = Some("deadbeef".to_string());
        assert!(matches!(
            h.state.payments.handle_notification(n.clone()).await,
            Err(AppError::Unauthorized(_))
        ));

        n.signature_key = Some(midtrans_signature(&tx.order_id, "200", "100000.00", "server-key"));
        assert_eq!(h.state.payments.handle_notification(n).await.unwrap(), WebhookOutcome::Paid);
    }

    #[tokio::test]
    async fn unknown_prefix_is_rejected() {
        let h = Harness::new().await;
        let err = h
            .state
            .payments
            .handle_notification(settlement("invoice-123"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn paid_purchase_decrements_inventory_and_sends_ticket() {
        let h = Harness::new().await;
        let (product, tx) = h.pending_purchase(BigDecimal::from(50000), 3).await;

        let outcome = h.state.payments.handle_notification(settlement(&tx.order_id)).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::Paid);

        let product = h.repos.products.find_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(product.quantity, 7);
        assert_eq!(product.sold, 3);

        let subjects = h.mailer.subjects().await;
        assert!(subjects.iter().any(|s| s.starts_with("FastTix : Ticket")));
        assert!(h.mailer.sent().await.iter().any(|m| m.inline_image.is_some()));
    }

    #[tokio::test]
    async fn dedupe_skips_redelivery() {
        let h = Harness::with_policy(WebhookPolicy::Dedupe, false).await;
        let (product, tx) = h.pending_purchase(BigDecimal::from(50000), 1).await;

        h.state.payments.handle_notification(settlement(&tx.order_id)).await.unwrap();
        let sent = h.mailer.sent().await.len();
        let again = h.state.payments.handle_notification(settlement(&tx.order_id)).await.unwrap();

        assert_eq!(again, WebhookOutcome::Duplicate);
        assert_eq!(h.mailer.sent().await.len(), sent);
        let product = h.repos.products.find_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(product.quantity, 9);
    }

    #[tokio::test]
    async fn failure_marks_transaction_failed_without_side_effects() {
        let h = Harness::new().await;
        let (product, tx) = h.pending_purchase(BigDecimal::from(50000), 1).await;
        let before = h.mailer.sent().await.len();

        let mut n = settlement(&tx.order_id);
        n.transaction_status = "expire".to_string();
        assert_eq!(h.state.payments.handle_notification(n).await.unwrap(), WebhookOutcome::Failed);

        let tx = h.repos.transactions.find_by_id(tx.id).await.unwrap().unwrap();
        assert_eq!(tx.status, TransactionStatus::Failed);
        assert_eq!(h.mailer.sent().await.len(), before);
        let product = h.repos.products.find_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(product.quantity, 10);
    }

    #[tokio::test]
    async fn payment_after_failure_does_not_reopen() {
        let h = Harness::new().await;
        let (product, tx) = h.pending_purchase(BigDecimal::from(50000), 2).await;

        let mut expire = settlement(&tx.order_id);
        expire.transaction_status = "expire".to_string();
        assert_eq!(h.state.payments.handle_notification(expire).await.unwrap(), WebhookOutcome::Failed);
        let sent = h.mailer.sent().await.len();

        let late = h.state.payments.handle_notification(settlement(&tx.order_id)).await.unwrap();
        assert_eq!(late, WebhookOutcome::Duplicate);

        let tx = h.repos.transactions.find_by_id(tx.id).await.unwrap().unwrap();
        assert_eq!(tx.status, TransactionStatus::Failed);
        assert_eq!(h.mailer.sent().await.len(), sent);
        let product = h.repos.products.find_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(product.quantity, 10);
        assert_eq!(product.sold, 0);
    }

    #[tokio::test]
    async fn capture_then_settlement_takes_seats_once() {
        let h = Harness::new().await;
        let (product, tx) = h.pending_purchase(BigDecimal::from(50000), 3).await;

        let mut capture = settlement(&tx.order_id);
        capture.transaction_status = "capture".to_string();
        assert_eq!(h.state.payments.handle_notification(capture).await.unwrap(), WebhookOutcome::Paid);
        assert_eq!(
            h.state.payments.handle_notification(settlement(&tx.order_id)).await.unwrap(),
            WebhookOutcome::Paid
        );

        let product = h.repos.products.find_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(product.quantity, 7);
        assert_eq!(product.sold, 3);

        let tickets = h
            .mailer
            .subjects()
            .await
            .into_iter()
            .filter(|s| s.starts_with("FastTix : Ticket"))
            .count();
        assert_eq!(tickets, 2, "the ticket email is sent again on re-delivery");
    }

    #[tokio::test]
    async fn reapply_repeats_submission_side_effects() {
        let h = Harness::new().await;
        let seller = h.user("seller@example.com").await;
        let created = h
            .state
            .submissions
            .create(seller.actor(), submission_request("Jazz Night", 100000))
            .await
            .unwrap();
        let tx = created.transaction.unwrap();

        for _ in 0..2 {
            let outcome = h.state.payments.handle_notification(settlement(&tx.order_id)).await.unwrap();
            assert_eq!(outcome, WebhookOutcome::Paid);
        }

        let received = h
            .mailer
            .subjects()
            .await
            .into_iter()
            .filter(|s| s == "FastTix : Submission Event!")
            .count();
        assert_eq!(received, 2);

        let product = h.repos.products.find_by_id(created.product.id).await.unwrap().unwrap();
        assert_eq!(product.status, ProductStatus::Pending);
        let notifications = h.repos.notifications.list_by_user(seller.id).await.unwrap();
        assert_eq!(notifications.len(), 3);
    }

    #[tokio::test]
    async fn pending_status_is_acknowledged_only() {
        let h = Harness::new().await;
        let (_, tx) = h.pending_purchase(BigDecimal::from(50000), 1).await;

        let mut n = settlement(&tx.order_id);
        n.transaction_status = "pending".to_string();
        assert_eq!(h.state.payments.handle_notification(n).await.unwrap(), WebhookOutcome::Ignored);
    }

    #[tokio::test]
    async fn manual_confirmation_only_for_pending() {
        let h = Harness::new().await;
        let (_, tx) = h.pending_purchase(BigDecimal::from(50000), 1).await;

        let confirmed = h.state.payments.confirm_payment(tx.id).await.unwrap();
        assert_eq!(confirmed.status, TransactionStatus::Success);
        assert!(matches!(
            h.state.payments.confirm_payment(tx.id).await,
            Err(AppError::Validation(_))
        ));
    }
}
