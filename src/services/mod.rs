pub mod auth;
pub mod email;
pub mod notification;
pub mod payment;
pub mod payment_gateway;
pub mod qr;
pub mod submission;
pub mod ticket;
pub mod token;
pub mod transaction;
pub mod user;

pub use auth::AuthService;
pub use email::{EmailService, Mailer};
pub use notification::NotificationService;
pub use payment::PaymentService;
pub use payment_gateway::{MidtransGateway, PaymentGateway};
pub use qr::QrService;
pub use submission::SubmissionService;
pub use ticket::TicketService;
pub use token::TokenService;
pub use transaction::TransactionService;
pub use user::UserService;
