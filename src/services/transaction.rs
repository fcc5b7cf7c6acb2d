use crate::error::{AppError, AppResult};
use crate::models::{Actor, Transaction, TransactionListQuery};
use crate::repositories::TransactionRepository;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct TransactionService {
    transactions: Arc<dyn TransactionRepository>,
}

impl TransactionService {
    pub fn new(transactions: Arc<dyn TransactionRepository>) -> Self {
        Self { transactions }
    }

    pub async fn list_all(&self, query: TransactionListQuery) -> AppResult<Vec<Transaction>> {
        Ok(self.transactions.list(None, &query).await?)
    }

    pub async fn list_for_user(&self, actor: Actor, query: TransactionListQuery) -> AppResult<Vec<Transaction>> {
        Ok(self.transactions.list(Some(actor.id), &query).await?)
    }

    pub async fn get(&self, actor: Actor, id: Uuid) -> AppResult<Transaction> {
        let tx = self
            .transactions
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Transaction not found"))?;

        if !actor.can_access(tx.user_id) {
            return Err(AppError::forbidden("You can only view your own transactions"));
        }
        Ok(tx)
    }
}
