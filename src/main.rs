use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use chrono::Duration;
use dotenv::dotenv;
use payment_gateway::{
    audit::AuditLog,
    config::Config,
    handlers,
    services::GatewayService,
    storage::postgres::PostgresStorage,
    throttle::LoginThrottle,
    tokens::TokenIssuer,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .init();

    let config = Config::from_env().expect("Failed to load configuration");
    config.validate().expect("Invalid configuration");

    info!("Starting Payment Gateway on port {}", config.server.port);

    let store = Arc::new(
        PostgresStorage::new(&config.database.url, config.database.max_connections)
            .await
            .expect("Failed to connect to database"),
    );
    store
        .init_schema()
        .await
        .expect("Failed to initialize database schema");

    let throttle = Arc::new(LoginThrottle::new(
        config.auth.max_login_attempts,
        Duration::seconds(config.auth.lockout_window_secs),
    ));
    throttle
        .clone()
        .start_cleanup_task(std::time::Duration::from_secs(60));

    let tokens = Arc::new(TokenIssuer::new(
        &config.auth.token_secret,
        Duration::minutes(config.auth.token_ttl_minutes),
    ));

    let audit = Arc::new(
        AuditLog::open(Path::new(&config.audit.log_path)).expect("Failed to open audit log"),
    );

    let service = Arc::new(
        GatewayService::new(store, throttle, tokens).with_audit_log(audit),
    );

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            .app_data(web::Data::new(service.clone()))
            .configure(|cfg| handlers::configure_routes(cfg, service.clone()))
    })
    .workers(config.server.workers)
    .bind((config.server.host.clone(), config.server.port))?
    .run()
    .await
}
