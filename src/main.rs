use actix_cors::Cors;
use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{
    middleware::{Compress, DefaultHeaders, Logger},
    web, App, HttpServer,
};
use dotenv::dotenv;
use fasttix::repositories::Repositories;
use fasttix::services::email::providers::{LogMailer, SmtpMailer};
use fasttix::services::{Mailer, MidtransGateway, PaymentGateway};
use fasttix::{api_info, configure_routes, health_check, not_found, AppState, Config};
use log::{error, info, warn};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    info!("Starting FastTix API v{}", env!("CARGO_PKG_VERSION"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Connecting to database...");
    let db_pool = match PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            error!("Database connection failed: {}", e);
            std::process::exit(1);
        }
    };

    info!("Running database migrations...");
    match sqlx::migrate!("./migrations").run(&db_pool).await {
        Ok(_) => info!("Database migrations completed successfully"),
        Err(e) => {
            error!("Database migration failed: {}", e);
            std::process::exit(1);
        }
    }

    let mailer: Arc<dyn Mailer> = if config.is_production() {
        match SmtpMailer::new(&config.smtp) {
            Ok(mailer) => Arc::new(mailer),
            Err(e) => {
                error!("SMTP transport setup failed: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        warn!("Development mode: emails are logged instead of sent");
        Arc::new(LogMailer)
    };

    let gateway: Arc<dyn PaymentGateway> = match MidtransGateway::new(&config.midtrans) {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            error!("Payment gateway setup failed: {}", e);
            std::process::exit(1);
        }
    };
    if config.midtrans.server_key.is_empty() {
        warn!("MIDTRANS_SERVER_KEY is not set, payment links and webhook signatures will fail");
    }

    let state = match AppState::new(&config, Repositories::postgres(db_pool), mailer, gateway) {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            error!("Failed to build application state: {}", e);
            std::process::exit(1);
        }
    };

    let governor_conf = match GovernorConfigBuilder::default()
        .requests_per_minute(config.server.rate_limit_per_minute)
        .burst_size(20)
        .finish()
    {
        Some(conf) => conf,
        None => {
            error!("Invalid rate limit configuration");
            std::process::exit(1);
        }
    };

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting HTTP server on {}", bind_addr);
    info!("API documentation available at: http://{}/api", bind_addr);

    let cors_origins = config.server.cors_allowed_origins.clone();
    let access = config.access.clone();

    HttpServer::new(move || {
        let origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                origins
                    .iter()
                    .any(|allowed| allowed.as_str() == origin.to_str().unwrap_or(""))
            })
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec!["Content-Type", "Authorization", "Accept", "Origin"])
            .max_age(3600)
            .supports_credentials();

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(Governor::new(&governor_conf))
            .wrap(Compress::default())
            .wrap(Logger::new(r#"%a "%r" %s %b "%{User-Agent}i" %T"#))
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin")),
            )
            .configure(configure_routes(access.clone()))
            .route("/health", web::get().to(health_check))
            .route("/api", web::get().to(api_info))
            .default_service(web::route().to(not_found))
    })
    .bind(bind_addr)?
    .workers(num_cpus::get())
    .shutdown_timeout(30)
    .run()
    .await
}
