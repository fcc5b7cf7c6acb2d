use super::{generate_random_token, UnknownVariant};
use anyhow::Result;
use bigdecimal::{BigDecimal, Signed};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

pub const SUBMISSION_ORDER_PREFIX: &str = "daftar_id-";
pub const PURCHASE_ORDER_PREFIX: &str = "order_id-";
const ORDER_SUFFIX_LEN: usize = 10;
const VERIFICATION_TOKEN_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl TryFrom<String> for TransactionStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "success" => Ok(TransactionStatus::Success),
            "failed" => Ok(TransactionStatus::Failed),
            _ => Err(UnknownVariant {
                kind: "transaction status",
                value,
            }),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a transaction pays for. Encoded in the order id prefix so the
/// gateway callback can be routed without a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Submission,
    Purchase,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Submission => "submission",
            TransactionKind::Purchase => "purchase",
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            TransactionKind::Submission => SUBMISSION_ORDER_PREFIX,
            TransactionKind::Purchase => PURCHASE_ORDER_PREFIX,
        }
    }

    pub fn from_order_id(order_id: &str) -> Option<Self> {
        if order_id.starts_with(SUBMISSION_ORDER_PREFIX) {
            Some(TransactionKind::Submission)
        } else if order_id.starts_with(PURCHASE_ORDER_PREFIX) {
            Some(TransactionKind::Purchase)
        } else {
            None
        }
    }

    pub fn new_order_id(&self) -> String {
        format!("{}{}", self.prefix(), generate_random_token(ORDER_SUFFIX_LEN))
    }
}

impl TryFrom<String> for TransactionKind {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "submission" => Ok(TransactionKind::Submission),
            "purchase" => Ok(TransactionKind::Purchase),
            _ => Err(UnknownVariant {
                kind: "transaction kind",
                value,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: TransactionStatus,
    #[sqlx(try_from = "String")]
    pub kind: TransactionKind,
    pub quantity: i32,
    pub amount: BigDecimal,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub order_id: String,
    pub verification_token: String,
    pub checked_in: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutRequest {
    pub quantity: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionListQuery {
    pub status: Option<TransactionStatus>,
    pub kind: Option<TransactionKind>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl TransactionListQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        (self.page.unwrap_or(1).max(1) - 1).saturating_mul(self.limit())
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.status.map_or(true, |s| s == tx.status) && self.kind.map_or(true, |k| k == tx.kind)
    }
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub quantity: i32,
    pub amount: BigDecimal,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub order_id: String,
    pub verification_token: String,
}

impl NewTransaction {
    /// Fills in a fresh verification token. `order_id` is passed in because a
    /// submission shares its order id with the product row.
    pub fn new(
        kind: TransactionKind,
        status: TransactionStatus,
        order_id: String,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        amount: BigDecimal,
    ) -> Self {
        Self {
            kind,
            status,
            quantity,
            amount,
            user_id,
            product_id,
            order_id,
            verification_token: generate_random_token(VERIFICATION_TOKEN_LEN),
        }
    }

    pub fn into_transaction(self, id: Uuid, now: DateTime<Utc>) -> Transaction {
        Transaction {
            id,
            status: self.status,
            kind: self.kind,
            quantity: self.quantity,
            amount: self.amount,
            user_id: self.user_id,
            product_id: self.product_id,
            order_id: self.order_id,
            verification_token: self.verification_token,
            checked_in: false,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Transaction {
    pub async fn create(pool: &PgPool, new: NewTransaction) -> Result<Self> {
        if new.amount.is_negative() {
            anyhow::bail!("Transaction amount cannot be negative");
        }

        let now = Utc::now();

        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (
                id, status, kind, quantity, amount, user_id, product_id,
                order_id, verification_token, checked_in, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, false, $10, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.status.as_str())
        .bind(new.kind.as_str())
        .bind(new.quantity)
        .bind(&new.amount)
        .bind(new.user_id)
        .bind(new.product_id)
        .bind(&new.order_id)
        .bind(&new.verification_token)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(transaction)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let tx = sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(tx)
    }

    pub async fn find_by_order_id(pool: &PgPool, order_id: &str) -> Result<Option<Self>> {
        let tx = sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(pool)
            .await?;

        Ok(tx)
    }

    pub async fn find_by_verification_token(pool: &PgPool, token: &str) -> Result<Option<Self>> {
        let tx = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE verification_token = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(token)
        .fetch_optional(pool)
        .await?;

        Ok(tx)
    }

    pub async fn list(pool: &PgPool, user_id: Option<Uuid>, query: &TransactionListQuery) -> Result<Vec<Self>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM transactions WHERE 1=1");

        if let Some(user_id) = user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(kind) = query.kind {
            builder.push(" AND kind = ").push_bind(kind.as_str());
        }

        builder.push(" ORDER BY created_at DESC");
        builder.push(" LIMIT ").push_bind(query.limit());
        builder.push(" OFFSET ").push_bind(query.offset());

        let txs = builder.build_query_as::<Transaction>().fetch_all(pool).await?;

        Ok(txs)
    }

    pub async fn update_status(pool: &PgPool, id: Uuid, status: TransactionStatus) -> Result<Option<Self>> {
        let tx = sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions
            SET status = $1, updated_at = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(tx)
    }

    /// Flips `checked_in` for a paid ticket. Returns `None` when the row is
    /// missing, unpaid, or already used.
    pub async fn mark_checked_in(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let tx = sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions
            SET checked_in = true, updated_at = $1
            WHERE id = $2 AND status = 'success' AND checked_in = false
            RETURNING *
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_ids_carry_their_kind() {
        let submission = TransactionKind::Submission.new_order_id();
        let purchase = TransactionKind::Purchase.new_order_id();

        assert!(submission.starts_with("daftar_id-"));
        assert_eq!(submission.len(), "daftar_id-".len() + 10);
        assert!(purchase.starts_with("order_id-"));

        assert_eq!(TransactionKind::from_order_id(&submission), Some(TransactionKind::Submission));
        assert_eq!(TransactionKind::from_order_id(&purchase), Some(TransactionKind::Purchase));
        assert_eq!(TransactionKind::from_order_id("invoice-123"), None);
    }

    #[test]
    fn new_transaction_gets_six_char_token() {
        let new = NewTransaction::new(
            TransactionKind::Purchase,
            TransactionStatus::Pending,
            TransactionKind::Purchase.new_order_id(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            2,
            BigDecimal::from(100000),
        );
        assert_eq!(new.verification_token.len(), 6);
        assert!(new.verification_token.chars().all(|c| c.is_ascii_alphanumeric()));

        let tx = new.into_transaction(Uuid::new_v4(), Utc::now());
        assert!(!tx.checked_in);
        assert_eq!(tx.quantity, 2);
    }

    #[test]
    fn huge_page_saturates_offset() {
        let query = TransactionListQuery {
            page: Some(i64::MAX),
            limit: Some(10),
            ..Default::default()
        };
        assert_eq!(query.offset(), i64::MAX);
        assert_eq!(TransactionListQuery::default().offset(), 0);
    }

    #[test]
    fn settled_statuses() {
        assert!(!TransactionStatus::Pending.is_settled());
        assert!(TransactionStatus::Success.is_settled());
        assert!(TransactionStatus::Failed.is_settled());
    }

    #[test]
    fn list_query_filters() {
        let tx = NewTransaction::new(
            TransactionKind::Submission,
            TransactionStatus::Pending,
            TransactionKind::Submission.new_order_id(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            1,
            BigDecimal::from(25000),
        )
        .into_transaction(Uuid::new_v4(), Utc::now());

        assert!(TransactionListQuery::default().matches(&tx));
        let wrong_kind = TransactionListQuery {
            kind: Some(TransactionKind::Purchase),
            ..Default::default()
        };
        assert!(!wrong_kind.matches(&tx));

        let paged = TransactionListQuery {
            page: Some(2),
            limit: Some(10),
            ..Default::default()
        };
        assert_eq!(paged.offset(), 10);
    }
}
