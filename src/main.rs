use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use apihub::auth::AuthMiddleware;
use apihub::config::Config;
use apihub::db::{MemoryStore, PgStore, SoftDeleteStore, Store};
use apihub::{error, routes};

fn cors(origin: &str) -> Cors {
    let cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .supports_credentials()
        .max_age(3600);
    if origin == "*" {
        cors.allowed_origin_fn(|_, _| true)
    } else {
        origin
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .fold(cors, |cors, o| cors.allowed_origin(o))
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    error::set_expose_details(!config.is_production());

    let backend: Arc<dyn Store> = match &config.database_url {
        Some(url) => Arc::new(
            PgStore::connect(url)
                .await
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?,
        ),
        None => {
            log::warn!("DATABASE_URL is not set; using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };
    let store = web::Data::new(SoftDeleteStore::new(backend));

    log::info!("Starting server at {}", config.server_url());
    let bind = (config.server_host.clone(), config.server_port);
    let config = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .app_data(store.clone())
            .app_data(config.clone())
            .wrap(cors(&config.cors_origin))
            .wrap(Logger::default())
            .service(
                web::scope("/api/v1")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            )
    })
    .bind(bind)?
    .run()
    .await
}
