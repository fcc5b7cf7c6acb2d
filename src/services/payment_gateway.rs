use crate::config::MidtransConfig;
use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine};
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use log::{error, info};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PaymentLinkRequest {
    pub order_id: String,
    pub gross_amount: i64,
    pub customer_name: String,
    pub customer_email: String,
}

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a hosted payment page for the order and returns its URL.
    async fn create_payment_link(&self, request: PaymentLinkRequest) -> Result<String>;
    fn gateway_name(&self) -> &'static str;
}

/// Rupiah has no minor unit on the gateway side. Amounts are rounded once
/// with this before they are stored.
pub fn to_rupiah(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(0, RoundingMode::HalfUp)
}

pub fn to_gross_amount(amount: &BigDecimal) -> Result<i64> {
    to_rupiah(amount)
        .to_i64()
        .ok_or_else(|| anyhow!("amount {} does not fit a gateway amount", amount))
}

#[derive(Debug, Deserialize)]
struct SnapResponse {
    redirect_url: Option<String>,
    error_messages: Option<Vec<String>>,
}

pub struct MidtransGateway {
    client: Client,
    base_url: String,
    server_key: String,
}

impl MidtransGateway {
    pub fn new(config: &MidtransConfig) -> Result<Self> {
        Self::with_base_url(config, config.environment.snap_base_url())
    }

    pub fn with_base_url(config: &MidtransConfig, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            server_key: config.server_key.clone(),
        })
    }

    fn authorization(&self) -> String {
        format!(
            "Basic {}",
            general_purpose::STANDARD.encode(format!("{}:", self.server_key))
        )
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MidtransGateway {
    async fn create_payment_link(&self, request: PaymentLinkRequest) -> Result<String> {
        let payload = json!({
            "transaction_details": {
                "order_id": request.order_id,
                "gross_amount": request.gross_amount,
            },
            "customer_details": {
                "first_name": request.customer_name,
                "email": request.customer_email,
            },
        });

        let response = self
            .client
            .post(format!("{}/snap/v1/transactions", self.base_url))
            .header("Authorization", self.authorization())
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body: SnapResponse = response.json().await?;

        match body.redirect_url {
            Some(url) if status.is_success() => {
                info!("💳 Snap payment link created for {}", request.order_id);
                Ok(url)
            }
            _ => {
                let reason = body
                    .error_messages
                    .map(|m| m.join("; "))
                    .unwrap_or_else(|| format!("unexpected status {}", status));
                error!("❌ Snap rejected order {}: {}", request.order_id, reason);
                Err(anyhow!("Midtrans Snap error: {}", reason))
            }
        }
    }

    fn gateway_name(&self) -> &'static str {
        "midtrans"
    }
}
