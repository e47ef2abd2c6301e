use actix_web::{middleware::Logger, web, App, HttpServer};
use among_legends_server::{config::settings, http, hub::Hub, metrics, registry::Registry, ws};
use std::env;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".into());

    let hub = Hub::new();
    let registry = Registry::new(settings().clone(), hub);

    log::info!("among-legends server listening on {server_addr}");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(metrics::METRICS.clone())
            .app_data(web::Data::new(registry.clone()))
            .configure(http::routes::init_routes)
            .configure(ws::routes::init_routes)
    })
    .bind(&server_addr)?
    .run()
    .await?;

    Ok(())
}
