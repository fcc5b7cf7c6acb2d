use super::UnknownVariant;
use anyhow::Result;
use bigdecimal::{BigDecimal, Signed, Zero};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::cmp::Ordering;
use uuid::Uuid;

/// A product is a submission until an admin accepts it, after which it is
/// sold as a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Pending,
    Unpaid,
    Accepted,
    Rejected,
    Unaccepted,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Pending => "pending",
            ProductStatus::Unpaid => "unpaid",
            ProductStatus::Accepted => "accepted",
            ProductStatus::Rejected => "rejected",
            ProductStatus::Unaccepted => "unaccepted",
        }
    }

    /// Owners may still edit while the submission hasn't been reviewed.
    pub fn is_editable(&self) -> bool {
        matches!(self, ProductStatus::Pending | ProductStatus::Unpaid)
    }
}

impl TryFrom<String> for ProductStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(ProductStatus::Pending),
            "unpaid" => Ok(ProductStatus::Unpaid),
            "accepted" => Ok(ProductStatus::Accepted),
            "rejected" => Ok(ProductStatus::Rejected),
            "unaccepted" => Ok(ProductStatus::Unaccepted),
            _ => Err(UnknownVariant {
                kind: "product status",
                value,
            }),
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub event_date: NaiveDate,
    pub event_time: NaiveTime,
    pub price: BigDecimal,
    pub sold: i32,
    pub description: String,
    pub category: String,
    pub quantity: i32,
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: ProductStatus,
    pub order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubmissionRequest {
    pub name: String,
    pub address: String,
    pub event_date: NaiveDate,
    pub event_time: NaiveTime,
    pub price: BigDecimal,
    pub description: String,
    pub category: String,
    pub quantity: i32,
}

impl CreateSubmissionRequest {
    pub fn validate(&self) -> Result<(), String> {
        let required = [
            ("name", &self.name),
            ("address", &self.address),
            ("description", &self.description),
            ("category", &self.category),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(format!("{} is required", field));
            }
        }
        if self.price.is_negative() {
            return Err("price cannot be negative".to_string());
        }
        if self.quantity < 1 {
            return Err("quantity must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Fields an owner may change. Blank strings and a zero quantity leave the
/// stored value alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSubmissionRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub event_time: Option<NaiveTime>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub address: String,
    pub event_date: NaiveDate,
    pub event_time: NaiveTime,
    pub price: BigDecimal,
    pub description: String,
    pub category: String,
    pub quantity: i32,
    pub user_id: Uuid,
    pub status: ProductStatus,
    pub order_id: Option<String>,
}

impl NewProduct {
    pub fn from_request(req: CreateSubmissionRequest, user_id: Uuid, status: ProductStatus, order_id: Option<String>) -> Self {
        Self {
            name: req.name.trim().to_string(),
            address: req.address,
            event_date: req.event_date,
            event_time: req.event_time,
            price: req.price,
            description: req.description,
            category: req.category,
            quantity: req.quantity,
            user_id,
            status,
            order_id,
        }
    }

    pub fn into_product(self, id: Uuid, now: DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name,
            address: self.address,
            event_date: self.event_date,
            event_time: self.event_time,
            price: self.price,
            sold: 0,
            description: self.description,
            category: self.category,
            quantity: self.quantity,
            user_id: self.user_id,
            status: self.status,
            order_id: self.order_id,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    CreatedAt,
    Name,
    Price,
    EventDate,
    Quantity,
}

impl SortField {
    fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Name => "name",
            SortField::Price => "price",
            SortField::EventDate => "event_date",
            SortField::Quantity => "quantity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Query string accepted by the listing endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductListQuery {
    pub status: Option<ProductStatus>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort_by: Option<SortField>,
    pub order: Option<SortOrder>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ProductFilter {
    pub statuses: Vec<ProductStatus>,
    pub user_id: Option<Uuid>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort_by: SortField,
    pub order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self::from_query(ProductListQuery::default())
    }
}

impl ProductFilter {
    pub fn from_query(query: ProductListQuery) -> Self {
        let limit = query.limit.unwrap_or(20).clamp(1, 100);
        let page = query.page.unwrap_or(1).max(1);

        Self {
            statuses: query.status.into_iter().collect(),
            user_id: None,
            search: query
                .search
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty()),
            category: query
                .category
                .map(|c| c.trim().to_lowercase())
                .filter(|c| !c.is_empty()),
            sort_by: query.sort_by.unwrap_or(SortField::CreatedAt),
            order: query.order.unwrap_or(SortOrder::Desc),
            limit,
            offset: (page - 1).saturating_mul(limit),
        }
    }

    /// Restrict to exactly these statuses, whatever the query asked for.
    pub fn with_statuses(mut self, statuses: &[ProductStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub fn owned_by(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn matches(&self, product: &Product) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&product.status) {
            return false;
        }
        if let Some(user_id) = self.user_id {
            if product.user_id != user_id {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if product.category.to_lowercase() != *category {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let hit = [&product.name, &product.category, &product.address]
                .iter()
                .any(|field| field.to_lowercase().contains(search.as_str()));
            if !hit {
                return false;
            }
        }
        true
    }

    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let ordering = match self.sort_by {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Name => a.name.cmp(&b.name),
            SortField::Price => a.price.cmp(&b.price),
            SortField::EventDate => a.event_date.cmp(&b.event_date),
            SortField::Quantity => a.quantity.cmp(&b.quantity),
        };
        self.order.apply(ordering)
    }
}

impl Product {
    pub fn is_free(&self) -> bool {
        self.price.is_zero()
    }

    /// Merge an owner's edit into the record.
    pub fn apply_update(&mut self, update: UpdateSubmissionRequest) {
        fn merge(target: &mut String, value: Option<String>) {
            if let Some(v) = value {
                if !v.trim().is_empty() {
                    *target = v;
                }
            }
        }

        merge(&mut self.name, update.name.map(|n| n.trim().to_string()));
        merge(&mut self.address, update.address);
        merge(&mut self.description, update.description);
        merge(&mut self.category, update.category);
        if let Some(date) = update.event_date {
            self.event_date = date;
        }
        if let Some(time) = update.event_time {
            self.event_time = time;
        }
        if let Some(quantity) = update.quantity {
            if quantity != 0 {
                self.quantity = quantity;
            }
        }
    }

    pub async fn create(pool: &PgPool, new: NewProduct) -> Result<Self> {
        let now = Utc::now();

        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                id, name, address, event_date, event_time, price, sold,
                description, category, quantity, user_id, status, order_id,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $8, $9, $10, $11, $12, $13, $13)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.address)
        .bind(new.event_date)
        .bind(new.event_time)
        .bind(&new.price)
        .bind(&new.description)
        .bind(&new.category)
        .bind(new.quantity)
        .bind(new.user_id)
        .bind(new.status.as_str())
        .bind(&new.order_id)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(product)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(product)
    }

    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE LOWER(name) = LOWER($1) LIMIT 1",
        )
        .bind(name.trim())
        .fetch_optional(pool)
        .await?;

        Ok(product)
    }

    pub async fn search(pool: &PgPool, filter: &ProductFilter) -> Result<Vec<Self>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM products WHERE 1=1");

        if !filter.statuses.is_empty() {
            let statuses: Vec<String> = filter.statuses.iter().map(|s| s.as_str().to_string()).collect();
            query.push(" AND status = ANY(").push_bind(statuses).push(")");
        }
        if let Some(user_id) = filter.user_id {
            query.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(category) = &filter.category {
            query.push(" AND LOWER(category) = ").push_bind(category.clone());
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            query
                .push(" AND (LOWER(name) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR LOWER(category) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR LOWER(address) LIKE ")
                .push_bind(pattern)
                .push(")");
        }

        query.push(format!(" ORDER BY {} {}", filter.sort_by.column(), filter.order.sql()));
        query.push(" LIMIT ").push_bind(filter.limit);
        query.push(" OFFSET ").push_bind(filter.offset);

        let products = query.build_query_as::<Product>().fetch_all(pool).await?;

        Ok(products)
    }

    pub async fn save(&self, pool: &PgPool) -> Result<Self> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET
                name = $1, address = $2, event_date = $3, event_time = $4,
                price = $5, sold = $6, description = $7, category = $8,
                quantity = $9, status = $10, order_id = $11, updated_at = $12
            WHERE id = $13
            RETURNING *
            "#,
        )
        .bind(&self.name)
        .bind(&self.address)
        .bind(self.event_date)
        .bind(self.event_time)
        .bind(&self.price)
        .bind(self.sold)
        .bind(&self.description)
        .bind(&self.category)
        .bind(self.quantity)
        .bind(self.status.as_str())
        .bind(&self.order_id)
        .bind(Utc::now())
        .bind(self.id)
        .fetch_one(pool)
        .await?;

        Ok(product)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Take `quantity` seats off the remaining stock, never going below zero.
    pub async fn consume_inventory(pool: &PgPool, id: Uuid, quantity: i32) -> Result<Option<Self>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET quantity = GREATEST(quantity - $1, 0), sold = sold + $1, updated_at = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(quantity)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(product)
    }
}
