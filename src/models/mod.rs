pub mod notification;
pub mod product;
pub mod transaction;
pub mod user;

use rand::{distr::Alphanumeric, rng, Rng};
use thiserror::Error;

pub use notification::Notification;
pub use product::{
    CreateSubmissionRequest, NewProduct, Product, ProductFilter, ProductListQuery, ProductStatus,
    SortOrder, UpdateSubmissionRequest,
};
pub use transaction::{
    CheckoutRequest, NewTransaction, Transaction, TransactionKind, TransactionListQuery,
    TransactionStatus,
};
pub use user::{Actor, NewUser, Role, User};

/// A status column held a value this build doesn't know about.
#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

pub fn generate_random_token(length: usize) -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
