use crate::error::{AppError, AppResult};
use crate::models::{Product, Transaction, User};
use anyhow::Result;
use log::{error, info};
use serde_json::json;
use std::sync::Arc;

pub mod providers;
pub mod templates;

pub use providers::{LogMailer, SmtpMailer};

/// An image embedded in the HTML body and referenced as `cid:<content_id>`.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub content_id: String,
    pub content_type: String,
    pub filename: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    pub inline_image: Option<InlineImage>,
}

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<()>;
    fn transport_name(&self) -> &'static str;
}

/// Renders the FastTix emails and hands them to the configured mailer.
#[derive(Clone)]
pub struct EmailService {
    mailer: Arc<dyn Mailer>,
    renderer: templates::TemplateRenderer,
    app_url: String,
}

impl std::fmt::Debug for EmailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailService")
            .field("mailer", &self.mailer.transport_name())
            .field("app_url", &self.app_url)
            .finish()
    }
}

impl EmailService {
    pub fn new(mailer: Arc<dyn Mailer>, app_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            mailer,
            renderer: templates::TemplateRenderer::new()?,
            app_url: app_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn deliver(
        &self,
        user: &User,
        subject: String,
        template: &str,
        data: serde_json::Value,
        text_body: String,
        inline_image: Option<InlineImage>,
    ) -> AppResult<()> {
        let html_body = self.renderer.render(template, &subject, &data)?;

        let message = EmailMessage {
            to: user.email.clone(),
            to_name: Some(user.full_name.clone()),
            subject,
            html_body,
            text_body,
            inline_image,
        };

        match self.mailer.send(message).await {
            Ok(()) => {
                info!("📧 {} email sent to {} via {}", template, user.email, self.mailer.transport_name());
                Ok(())
            }
            Err(e) => {
                error!("❌ Failed to send {} email to {}: {:#}", template, user.email, e);
                Err(AppError::external(format!("failed to send email: {}", e)))
            }
        }
    }

    pub async fn send_verification_email(&self, user: &User, token: &str) -> AppResult<()> {
        let verification_url = format!("{}/api/v1/verify-email/{}", self.app_url, token);
        let text = format!(
            "Hi {},\n\nPlease verify your email by opening this link: {}\n\nFastTix",
            user.full_name, verification_url
        );

        self.deliver(
            user,
            "FastTix : Verify your email".to_string(),
            "email_verification",
            json!({ "full_name": user.full_name, "verification_url": verification_url }),
            text,
            None,
        )
        .await
    }

    pub async fn send_password_reset_email(&self, user: &User, token: &str) -> AppResult<()> {
        let reset_url = format!("{}/reset-password?token={}", self.app_url, token);
        let text = format!(
            "Hi {},\n\nReset your password with this link: {}\nIt expires in 24 hours.\n\nFastTix",
            user.full_name, reset_url
        );

        self.deliver(
            user,
            "FastTix : Reset password request".to_string(),
            "password_reset",
            json!({ "full_name": user.full_name, "reset_url": reset_url }),
            text,
            None,
        )
        .await
    }

    pub async fn send_submission_received(&self, user: &User, product: &Product) -> AppResult<()> {
        let text = format!(
            "Hi {},\n\nYour event {} has been submitted and is waiting for review.\n\nFastTix",
            user.full_name, product.name
        );

        self.deliver(
            user,
            "FastTix : Submission Event!".to_string(),
            "submission_received",
            json!({ "full_name": user.full_name, "product_name": product.name }),
            text,
            None,
        )
        .await
    }

    pub async fn send_payment_link(
        &self,
        user: &User,
        item_name: &str,
        transaction: &Transaction,
        payment_url: &str,
    ) -> AppResult<()> {
        let text = format!(
            "Hi {},\n\nPlease pay Rp {} for {} (order {}) here: {}\n\nFastTix",
            user.full_name, transaction.amount, item_name, transaction.order_id, payment_url
        );

        self.deliver(
            user,
            format!("FastTix : Payment for {}", item_name),
            "payment_link",
            json!({
                "full_name": user.full_name,
                "item_name": item_name,
                "order_id": transaction.order_id,
                "amount": transaction.amount.to_string(),
                "payment_url": payment_url,
            }),
            text,
            None,
        )
        .await
    }

    pub async fn send_submission_decision(&self, user: &User, product: &Product, accepted: bool) -> AppResult<()> {
        let verdict = if accepted { "approved" } else { "rejected" };
        let text = format!(
            "Hi {},\n\nYour event {} has been {}.\n\nFastTix",
            user.full_name, product.name, verdict
        );

        self.deliver(
            user,
            "FastTix : Approval!".to_string(),
            "submission_decision",
            json!({ "full_name": user.full_name, "product_name": product.name, "accepted": accepted }),
            text,
            None,
        )
        .await
    }

    pub async fn send_payment_success(&self, user: &User, product: &Product, transaction: &Transaction) -> AppResult<()> {
        let text = format!(
            "Hi {},\n\nWe received your payment of Rp {} for order {}.\n\nFastTix",
            user.full_name, transaction.amount, transaction.order_id
        );

        self.deliver(
            user,
            format!("FastTix : Payment received for {}", product.name),
            "payment_success",
            json!({
                "full_name": user.full_name,
                "order_id": transaction.order_id,
                "product_name": product.name,
                "quantity": transaction.quantity,
                "amount": transaction.amount.to_string(),
            }),
            text,
            None,
        )
        .await
    }

    /// Sends the ticket itself with the check-in QR code embedded inline.
    pub async fn send_ticket(
        &self,
        user: &User,
        product: &Product,
        transaction: &Transaction,
        qr_png: Vec<u8>,
    ) -> AppResult<()> {
        let content_id = format!("qr-{}", transaction.order_id);
        let text = format!(
            "Hi {},\n\nYour ticket for {} on {} at {} ({}), order {}.\nOpen the HTML version of this email to see the QR code.\n\nFastTix",
            user.full_name,
            product.name,
            product.event_date,
            product.event_time.format("%H:%M"),
            product.address,
            transaction.order_id
        );

        self.deliver(
            user,
            format!("FastTix : Ticket {}!", product.name),
            "ticket",
            json!({
                "product_name": product.name,
                "event_date": product.event_date.to_string(),
                "event_time": product.event_time.format("%H:%M").to_string(),
                "address": product.address,
                "quantity": transaction.quantity,
                "order_id": transaction.order_id,
                "qr_content_id": content_id,
            }),
            text,
            Some(InlineImage {
                content_id,
                content_type: "image/png".to_string(),
                filename: format!("{}.png", transaction.order_id),
                content: qr_png,
            }),
        )
        .await
    }
}
