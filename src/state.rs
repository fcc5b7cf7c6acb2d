use crate::config::Config;
use crate::repositories::Repositories;
use crate::services::{
    AuthService, EmailService, Mailer, NotificationService, PaymentGateway, PaymentService,
    QrService, SubmissionService, TicketService, TokenService, TransactionService, UserService,
};
use anyhow::Result;
use std::sync::Arc;

/// Every service, built once at start-up and shared by all workers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub tokens: Arc<TokenService>,
    pub users: Arc<UserService>,
    pub submissions: Arc<SubmissionService>,
    pub tickets: Arc<TicketService>,
    pub payments: Arc<PaymentService>,
    pub transactions: Arc<TransactionService>,
    pub notifications: Arc<NotificationService>,
}

impl AppState {
    pub fn new(
        config: &Config,
        repos: Repositories,
        mailer: Arc<dyn Mailer>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Result<Self> {
        let email = Arc::new(EmailService::new(mailer, config.app_url.clone())?);
        let tokens = Arc::new(TokenService::new(&config.jwt));
        let qr = QrService::new(config.app_url.clone());
        let notifications = NotificationService::new(repos.notifications.clone());

        let payments = Arc::new(PaymentService::new(
            repos.products.clone(),
            repos.transactions.clone(),
            repos.users.clone(),
            gateway,
            email.clone(),
            notifications.clone(),
            qr.clone(),
            &config.midtrans,
        ));

        let submissions = Arc::new(SubmissionService::new(
            repos.products.clone(),
            repos.transactions.clone(),
            repos.users.clone(),
            payments.clone(),
            email.clone(),
            notifications.clone(),
            config.submission_fee_percent,
        ));

        let tickets = Arc::new(TicketService::new(
            repos.products.clone(),
            repos.transactions.clone(),
            repos.users.clone(),
            payments.clone(),
            notifications.clone(),
            qr,
        ));

        Ok(Self {
            auth: Arc::new(AuthService::new(repos.users.clone(), email, tokens.clone())),
            tokens,
            users: Arc::new(UserService::new(repos.users.clone())),
            submissions,
            tickets,
            payments,
            transactions: Arc::new(TransactionService::new(repos.transactions.clone())),
            notifications: Arc::new(notifications),
        })
    }
}
