use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local;
use env_logger::{Env, Target};
use std::io::Write;
use std::sync::Arc;

use realty_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::create_sms_sender,
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    store,
    swagger::swagger_config,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let store = store::connect(&config.redis)
        .await
        .expect("Failed to connect to key-value store");

    let sms_sender = create_sms_sender(&config.sms, config.is_development())
        .expect("Failed to create SMS sender");

    let jwt_service = JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expire_minutes,
        config.jwt.refresh_token_expire_days,
    );

    let user_service = UserService::new(pool.clone());
    let users: Arc<dyn UserDirectory> = Arc::new(user_service);
    let profile_service = ProfileService::new(users.clone());
    let verification_service =
        VerificationService::from_config(store.clone(), sms_sender, &config.verification);
    let token_service = TokenService::new(jwt_service, store, users.clone());
    let auth_service = AuthService::new(users, verification_service, token_service.clone());

    log::info!(
        "Starting HTTP server at {}:{} ({})",
        config.server.host,
        config.server.port,
        config.environment
    );

    let cors_config = config.cors.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors(&cors_config))
            .wrap(AuthMiddleware::new(token_service.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(profile_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::auth_config)
                    .configure(handlers::user_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
